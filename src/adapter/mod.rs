use std::path::Path;

use crate::error::Result;

pub mod dir;
pub mod skopeo;

/// An image reference pinned to the content it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub reference: String,
    pub id: String,
}

/// The image store the engine reads sources from and publishes results to.
pub trait ExternalStore {
    /// Checks the tooling this store shells out to is usable.
    fn ensure_deps(&self) -> Result<()>;

    /// Fails with `NotFound` for zero matches and `Ambiguous` for several.
    fn resolve(&self, reference: &str) -> Result<ResolvedImage>;

    /// Materializes the image as a directory-transport layout in `target`.
    fn dump(&self, image: &ResolvedImage, target: &Path) -> Result<()>;

    fn publish(&self, layout: &Path, tag: &str) -> Result<()>;
}

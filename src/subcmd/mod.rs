use std::path::PathBuf;

use colored::Colorize;
use tempfile::TempDir;

use crate::adapter::{ExternalStore, ResolvedImage};
use crate::config::cmd::ImageSource;
use crate::container::layout::ImageLayout;
use crate::container::RegDigest;
use crate::error::{MixError, Result};

pub mod merge;
pub mod show_info;
pub mod slice;
pub mod unpack;

/// What a merge or slice published.
#[derive(Debug)]
pub struct Recomposed {
    pub output_tag: String,
    pub layers: usize,
    pub config_digest: RegDigest,
}

fn print_success(title: &str, summary: &Recomposed) {
    println!(
        r#"
{} successful!
{:8}: {}
{:8}: {}
{:8}: {}
"#,
        title,
        "IMAGE".blue(),
        summary.output_tag.green(),
        "LAYERS".blue(),
        summary.layers.to_string().green(),
        "CONFIG".blue(),
        summary.config_digest.to_string().green()
    );
}

/// Prints the failure of a subcommand before the process exits.
pub fn print_failed(title: &str, err: &anyhow::Error) {
    eprintln!(
        r#"
{} failed.
{}
"#,
        title,
        format!("{:#}", err).red()
    );
}

/// Hands out scratch directories that are removed when dropped, whichever
/// way the invocation ends.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Workspace {
        Workspace { root: root.into() }
    }

    pub fn scratch(&self, label: &str) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(&format!("layermix-{}-", label))
            .tempdir_in(&self.root)
            .map_err(|e| MixError::write_failure(&self.root, e))
    }
}

/// Dumps `image` into a fresh scratch directory and reads it back. The
/// layout is only valid while the returned directory is alive.
fn dump_layout(store: &dyn ExternalStore, workspace: &Workspace, image: &ResolvedImage) -> Result<(TempDir, ImageLayout)> {
    let scratch = workspace.scratch("source")?;
    store.dump(image, scratch.path())?;
    let layout = ImageLayout::read(scratch.path())?;
    Ok((scratch, layout))
}

/// Opens a layout given on the command line, dumping it from the store when
/// it is a reference. The scratch directory, if any, must outlive the layout.
fn open_source(
    source: &ImageSource,
    store: &dyn ExternalStore,
    workspace: &Workspace,
) -> Result<(Option<TempDir>, ImageLayout)> {
    match source {
        ImageSource::Layout(path) => Ok((None, ImageLayout::read(path)?)),
        ImageSource::Reference(reference) => {
            store.ensure_deps()?;
            let image = store.resolve(reference)?;
            let (scratch, layout) = dump_layout(store, workspace, &image)?;
            Ok((Some(scratch), layout))
        }
    }
}

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::info;

use crate::adapter::{ExternalStore, ResolvedImage};
use crate::container::layout::{ImageLayout, MANIFEST_FILE};
use crate::error::{MixError, Result};
use crate::util::file::copy_dir;

const DEFAULT_TAG: &str = "latest";

/// A plain directory tree of layouts: `name[:tag]` lives in `<root>/name/tag`.
///
/// The content ID of an image is its config digest, which is what a docker
/// daemon reports as the image ID as well.
pub struct DirectoryStore {
    pub root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryStore {
        DirectoryStore { root: root.into() }
    }

    pub fn layout_path(&self, reference: &str) -> Result<PathBuf> {
        let (name, tag) = split_reference(reference);
        let relative = Path::new(name).join(tag);
        let valid = !name.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(MixError::store_failure("resolve", format!("invalid reference '{}'", reference)));
        }
        Ok(self.root.join(relative))
    }
}

/// `host:5000/name:tag` splits on the last colon after the last slash.
fn split_reference(reference: &str) -> (&str, &str) {
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => (&reference[..name_start + i], &reference[name_start + i + 1..]),
        None => (reference, DEFAULT_TAG),
    }
}

impl ExternalStore for DirectoryStore {
    fn ensure_deps(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(MixError::DependencyMissing {
                tool: "store directory".to_string(),
                detail: format!("{} does not exist", self.root.display()),
            })
        }
    }

    fn resolve(&self, reference: &str) -> Result<ResolvedImage> {
        let path = self.layout_path(reference)?;
        if !path.join(MANIFEST_FILE).is_file() {
            return Err(MixError::NotFound(reference.to_string()));
        }
        let layout = ImageLayout::read(&path)?;
        Ok(ResolvedImage {
            reference: reference.to_string(),
            id: layout.config_digest.digest,
        })
    }

    fn dump(&self, image: &ResolvedImage, target: &Path) -> Result<()> {
        let path = self.layout_path(&image.reference)?;
        info!("Dumping {} image to: {}", image.reference, target.display());
        copy_dir(&path, target).map_err(|e| MixError::store_failure("dump", format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn publish(&self, layout: &Path, tag: &str) -> Result<()> {
        let dest = self.layout_path(tag)?;
        info!("Publishing image to {}", dest.display());
        let failed = |e: std::io::Error| MixError::store_failure("publish", format!("{}: {}", dest.display(), e));
        let parent = dest.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent).map_err(failed)?;
        // stage next to the destination so the final swap is a rename
        let staging = tempfile::Builder::new()
            .prefix(".publish-")
            .tempdir_in(parent)
            .map_err(failed)?;
        copy_dir(layout, staging.path()).map_err(failed)?;
        // the previous image moves aside and is only dropped once the new one is in place
        let replaced = tempfile::Builder::new()
            .prefix(".replaced-")
            .tempdir_in(parent)
            .map_err(failed)?;
        let previous = replaced.path().join("layout");
        let had_previous = dest.exists();
        if had_previous {
            fs::rename(&dest, &previous).map_err(failed)?;
        }
        if let Err(e) = fs::rename(staging.path(), &dest) {
            if had_previous {
                let _ = fs::rename(&previous, &dest);
            }
            return Err(failed(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixture::LayoutBuilder;

    #[test]
    fn reference_paths() -> anyhow::Result<()> {
        let store = DirectoryStore::new("/store");
        assert_eq!(store.layout_path("merge-test:a")?, PathBuf::from("/store/merge-test/a"));
        assert_eq!(store.layout_path("alpine")?, PathBuf::from("/store/alpine/latest"));
        assert_eq!(store.layout_path("localhost:5000/team/app:1.0")?, PathBuf::from("/store/localhost:5000/team/app/1.0"));
        assert!(store.layout_path("../escape:a").is_err());
        assert!(store.layout_path(":a").is_err());
        Ok(())
    }

    #[test]
    fn resolve_dump_publish() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = DirectoryStore::new(root.path());
        store.ensure_deps()?;
        LayoutBuilder::new()
            .layer("ADD file:abc in /", &[("a", "a")])
            .write(&root.path().join("app/1.0"))?;

        let image = store.resolve("app:1.0")?;
        let layout = ImageLayout::read(&root.path().join("app/1.0"))?;
        assert_eq!(image.id, layout.config_digest.digest);
        assert!(matches!(store.resolve("app:2.0"), Err(MixError::NotFound(_))));

        let scratch = tempfile::tempdir()?;
        store.dump(&image, scratch.path())?;
        assert_eq!(ImageLayout::read(scratch.path())?.manifest, layout.manifest);

        store.publish(scratch.path(), "app:copy")?;
        store.publish(scratch.path(), "app:copy")?;
        assert_eq!(store.resolve("app:copy")?.id, image.id);
        let leftovers = fs::read_dir(root.path().join("app"))?.count();
        assert_eq!(leftovers, 2);
        Ok(())
    }

    #[test]
    fn publish_replaces_existing_tag() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = DirectoryStore::new(root.path());
        LayoutBuilder::new().layer("ADD file:abc in /", &[("a", "a")]).write(&root.path().join("app/1.0"))?;
        LayoutBuilder::new().layer("ADD file:def in /", &[("b", "b")]).write(&root.path().join("app/2.0"))?;
        let first = store.resolve("app:1.0")?;
        let second = store.resolve("app:2.0")?;

        store.publish(&root.path().join("app/1.0"), "app:latest")?;
        assert_eq!(store.resolve("app")?.id, first.id);
        store.publish(&root.path().join("app/2.0"), "app:latest")?;
        assert_eq!(store.resolve("app")?.id, second.id);

        let mut names = fs::read_dir(root.path().join("app"))?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<String>>>()?;
        names.sort();
        assert_eq!(names, vec!["1.0", "2.0", "latest"]);
        Ok(())
    }

    #[test]
    fn failed_publish_keeps_previous_image() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = DirectoryStore::new(root.path());
        LayoutBuilder::new().layer("ADD file:abc in /", &[("a", "a")]).write(&root.path().join("app/1.0"))?;
        let before = store.resolve("app:1.0")?;

        assert!(store.publish(&root.path().join("missing"), "app:1.0").is_err());
        assert_eq!(store.resolve("app:1.0")?.id, before.id);
        Ok(())
    }

    #[test]
    fn missing_root() {
        let store = DirectoryStore::new("/nonexistent/layermix-store");
        assert!(matches!(store.ensure_deps(), Err(MixError::DependencyMissing { .. })));
    }
}

use std::path::Path;

use anyhow::Result;
use log::info;

use crate::adapter::ExternalStore;
use crate::config::cmd::SliceCmdArgs;
use crate::config::StoreConfig;
use crate::container::layer::align;
use crate::container::layout::{write_layout, ImageLayout};
use crate::container::rebuild::{rebuild, RebuiltImage};
use crate::error;
use crate::select::slice::slice_select;
use crate::subcmd::{dump_layout, print_success, Recomposed, Workspace};

pub struct SliceCommand {}

impl SliceCommand {
    pub fn slice(slice_args: &SliceCmdArgs) -> Result<()> {
        let config = StoreConfig::from(&slice_args.store);
        let store = config.open();
        let workspace = Workspace::new(&config.work_dir);
        let summary = slice_image(
            store.as_ref(),
            &workspace,
            &slice_args.output_tag,
            &slice_args.input_tag,
            &slice_args.filters,
        )?;
        print_success("Slice", &summary);
        Ok(())
    }
}

pub fn slice_image(
    store: &dyn ExternalStore,
    workspace: &Workspace,
    output_tag: &str,
    input_tag: &str,
    filters: &[String],
) -> Result<Recomposed> {
    store.ensure_deps()?;
    let image = store.resolve(input_tag)?;
    let (_source, layout) = dump_layout(store, workspace, &image)?;

    let output = workspace.scratch("output")?;
    let (image, layers) = slice_layout(&layout, filters, output.path())?;
    store.publish(output.path(), output_tag)?;
    Ok(Recomposed {
        output_tag: output_tag.to_string(),
        layers,
        config_digest: image.config_blob.digest,
    })
}

/// Writes the slice of `layout` selected by `filters` into `output_dir`.
pub fn slice_layout(layout: &ImageLayout, filters: &[String], output_dir: &Path) -> error::Result<(RebuiltImage, usize)> {
    let records = align(layout)?;
    let total = records.len();
    let kept = slice_select(records, filters);
    info!("Keeping {} of {} layers", kept.len(), total);

    let image = rebuild(&layout.config, &layout.manifest, &kept)?;
    write_layout(output_dir, &image, &kept, &layout.version_path())?;
    Ok((image, kept.len()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::adapter::dir::DirectoryStore;
    use crate::container::rootfs::unpack_layout;
    use crate::error::MixError;
    use crate::test_fixture::LayoutBuilder;

    const ALPINE: &str = "/bin/sh -c #(nop) ADD file:093f0723fa46f6cdbd6f7bd146448bb70ecce54254c35701feeceb956414622f in / ";

    fn source(store_root: &Path) -> anyhow::Result<()> {
        LayoutBuilder::new()
            .layer(ALPINE, &[("etc/alpine-release", "3.7.0\n")])
            .empty("/bin/sh -c #(nop)  CMD [\"/bin/sh\"]")
            .layer("/bin/sh -c echo \"foo\" > /tmp/a", &[("tmp/a", "foo\n")])
            .layer("/bin/sh -c echo \"bar\" > /tmp/b", &[("tmp/b", "bar\n")])
            .gzip_layer("/bin/sh -c echo \"baz\" > /tmp/c", &[("tmp/c", "baz\n")])
            .write(&store_root.join("slice-test/latest"))
    }

    fn slice(store_root: &Path, work_root: &Path, output_tag: &str, filters: &[&str]) -> Result<Recomposed> {
        let filters = filters.iter().map(|f| f.to_string()).collect::<Vec<String>>();
        let store = DirectoryStore::new(store_root);
        slice_image(&store, &Workspace::new(work_root), output_tag, "slice-test:latest", &filters)
    }

    #[test]
    fn keeps_base_and_matching_layers() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        source(store_root.path())?;

        let summary = slice(store_root.path(), work_root.path(), "slice-test:bar", &["bar"])?;
        assert_eq!(summary.layers, 2);

        let sliced = ImageLayout::read(&store_root.path().join("slice-test/bar"))?;
        let history = sliced.config.history.iter().map(|h| h.command()).collect::<Vec<&str>>();
        assert_eq!(history, vec![ALPINE, "/bin/sh -c echo \"bar\" > /tmp/b"]);
        assert_eq!(sliced.config_digest, summary.config_digest);

        let rootfs = tempfile::tempdir()?;
        unpack_layout(&sliced, rootfs.path())?;
        assert_eq!(fs::read_to_string(rootfs.path().join("tmp/b"))?, "bar\n");
        assert!(!rootfs.path().join("tmp/a").exists());
        assert!(!rootfs.path().join("tmp/c").exists());
        assert!(rootfs.path().join("etc/alpine-release").exists());
        assert_eq!(fs::read_dir(work_root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn no_filters_keeps_only_base() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        source(store_root.path())?;

        let summary = slice(store_root.path(), work_root.path(), "slice-test:base", &[])?;
        assert_eq!(summary.layers, 1);
        let sliced = ImageLayout::read(&store_root.path().join("slice-test/base"))?;
        assert_eq!(sliced.manifest.layers.len(), 1);
        assert_eq!(sliced.config.rootfs.diff_ids.len(), 1);
        Ok(())
    }

    #[test]
    fn filter_matching_everything_keeps_everything() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        source(store_root.path())?;

        let summary = slice(store_root.path(), work_root.path(), "slice-test:all", &["/bin/sh -c"])?;
        assert_eq!(summary.layers, 4);
        Ok(())
    }

    #[test]
    fn filters_are_case_sensitive() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        source(store_root.path())?;

        let summary = slice(store_root.path(), work_root.path(), "slice-test:upper", &["BAR", "Foo"])?;
        assert_eq!(summary.layers, 1);
        Ok(())
    }

    #[test]
    fn missing_input_fails_before_dump() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        let err = slice(store_root.path(), work_root.path(), "slice-test:bar", &["bar"]).unwrap_err();
        assert!(matches!(err.downcast_ref::<MixError>(), Some(MixError::NotFound(_))));
        assert_eq!(fs::read_dir(work_root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn slice_layout_directly() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        source(dir.path())?;
        let layout = ImageLayout::read(&dir.path().join("slice-test/latest"))?;
        let output = tempfile::tempdir()?;
        let (image, layers) = slice_layout(&layout, &["foo".to_string(), "baz".to_string()], output.path())?;
        assert_eq!(layers, 3);
        assert_eq!(ImageLayout::read(output.path())?.config_digest, image.config_blob.digest);
        // the base config fields survive
        assert_eq!(image.config.architecture(), Some("amd64"));
        Ok(())
    }
}

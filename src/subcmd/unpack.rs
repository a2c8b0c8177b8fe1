use anyhow::{bail, Result};
use log::info;

use crate::config::cmd::UnpackCmdArgs;
use crate::config::StoreConfig;
use crate::container::rootfs::unpack_layout;
use crate::subcmd::{open_source, Workspace};

pub struct UnpackCommand {}

impl UnpackCommand {
    pub fn unpack(unpack_args: &UnpackCmdArgs) -> Result<()> {
        let target = &unpack_args.target;
        if target.exists() && target.read_dir()?.next().is_some() {
            bail!("target directory {} is not empty", target.display());
        }
        let config = StoreConfig::from(&unpack_args.store);
        let store = config.open();
        let workspace = Workspace::new(&config.work_dir);
        let (_scratch, layout) = open_source(&unpack_args.source, store.as_ref(), &workspace)?;
        info!("Unpacking {} into {}", layout.config_digest.short_hash(), target.display());
        let layers = unpack_layout(&layout, target)?;
        println!(
            r#"
Unpack successful!
{} layers unpacked into {}
"#,
            layers,
            target.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::config::cmd::{ImageSource, StoreArgs};
    use crate::config::StoreKind;
    use crate::test_fixture::LayoutBuilder;

    fn args(store_root: PathBuf, work_dir: PathBuf, source: ImageSource, target: PathBuf) -> UnpackCmdArgs {
        UnpackCmdArgs {
            source,
            target,
            store: StoreArgs {
                store: StoreKind::Directory(store_root),
                skopeo: "skopeo".to_string(),
                docker: "docker".to_string(),
                timeout: 60,
                work_dir: Some(work_dir),
            },
        }
    }

    #[test]
    fn unpack_from_store() -> anyhow::Result<()> {
        let store_root = tempfile::tempdir()?;
        let work_root = tempfile::tempdir()?;
        let target = tempfile::tempdir()?;
        LayoutBuilder::new()
            .layer("ADD file:abc in /", &[("etc/os-release", "alpine")])
            .layer("RUN echo hi > /hi", &[("hi", "hi\n")])
            .write(&store_root.path().join("app/1.0"))?;

        let rootfs = target.path().join("rootfs");
        UnpackCommand::unpack(&args(
            store_root.path().to_path_buf(),
            work_root.path().to_path_buf(),
            ImageSource::Reference("app:1.0".to_string()),
            rootfs.clone(),
        ))?;
        assert_eq!(fs::read_to_string(rootfs.join("hi"))?, "hi\n");
        assert_eq!(fs::read_dir(work_root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn refuses_non_empty_target() -> anyhow::Result<()> {
        let layout = tempfile::tempdir()?;
        LayoutBuilder::new().layer("ADD file:abc in /", &[("a", "a")]).write(layout.path())?;
        let target = tempfile::tempdir()?;
        fs::write(target.path().join("keep"), "")?;

        let result = UnpackCommand::unpack(&args(
            PathBuf::from("/nonexistent"),
            std::env::temp_dir(),
            ImageSource::Layout(layout.path().to_path_buf()),
            target.path().to_path_buf(),
        ));
        assert!(result.is_err());
        assert!(!target.path().join("a").exists());
        Ok(())
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Error;

use crate::adapter::dir::DirectoryStore;
use crate::adapter::skopeo::SkopeoStore;
use crate::adapter::ExternalStore;
use crate::config::cmd::StoreArgs;

pub mod cmd;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreKind {
    /// docker daemon, reached through the docker CLI and skopeo
    Docker,
    Directory(PathBuf),
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        match arg {
            "docker" => Ok(StoreKind::Docker),
            _ => match arg.strip_prefix("dir:") {
                Some(path) if !path.is_empty() => Ok(StoreKind::Directory(PathBuf::from(path))),
                _ => Err(Error::msg(format!("unknown store type: {}", arg))),
            },
        }
    }
}

/// Everything needed to reach the image store and stage layouts.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub skopeo_bin: String,
    pub docker_bin: String,
    pub timeout: Duration,
    pub work_dir: PathBuf,
}

impl StoreConfig {
    pub fn open(&self) -> Box<dyn ExternalStore> {
        match &self.kind {
            StoreKind::Docker => Box::new(SkopeoStore {
                skopeo_bin: self.skopeo_bin.clone(),
                docker_bin: self.docker_bin.clone(),
                timeout: self.timeout,
            }),
            StoreKind::Directory(root) => Box::new(DirectoryStore::new(root.clone())),
        }
    }
}

impl From<&StoreArgs> for StoreConfig {
    fn from(args: &StoreArgs) -> Self {
        StoreConfig {
            kind: args.store.clone(),
            skopeo_bin: args.skopeo.clone(),
            docker_bin: args.docker.clone(),
            timeout: Duration::from_secs(args.timeout),
            work_dir: args.work_dir.clone().unwrap_or_else(std::env::temp_dir),
        }
    }
}

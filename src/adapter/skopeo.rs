use std::path::Path;
use std::time::Duration;

use log::info;

use crate::adapter::{ExternalStore, ResolvedImage};
use crate::error::{MixError, Result};
use crate::util::process::{run, ProcessOutput};

const SKOPEO_INSTALL_HINT: &str =
    "See: https://github.com/containers/skopeo\nInstall on Mac with: 'brew install skopeo'";

/// Docker daemon as the image store: the docker CLI resolves references,
/// skopeo moves images between the daemon and directory layouts.
///
/// Only tag references are supported, the daemon has no digest for an image
/// until it has been pushed somewhere.
pub struct SkopeoStore {
    pub skopeo_bin: String,
    pub docker_bin: String,
    pub timeout: Duration,
}

impl SkopeoStore {
    fn skopeo(&self, operation: &str, args: &[&str]) -> Result<ProcessOutput> {
        let mut full_args = Vec::with_capacity(args.len() + 2);
        if log::log_enabled!(log::Level::Debug) {
            full_args.push("--debug");
        }
        full_args.push("--insecure-policy");
        full_args.extend_from_slice(args);
        let output = run(&self.skopeo_bin, &full_args, self.timeout)?;
        if !output.success {
            return Err(MixError::store_failure(
                operation,
                format!("{} exited with {:?}: {}", self.skopeo_bin, output.code, output.stderr_tail()),
            ));
        }
        Ok(output)
    }
}

impl ExternalStore for SkopeoStore {
    fn ensure_deps(&self) -> Result<()> {
        let missing = |detail: String| MixError::DependencyMissing {
            tool: "skopeo".to_string(),
            detail: format!("{}\n{}", detail, SKOPEO_INSTALL_HINT),
        };
        let output = run(&self.skopeo_bin, &["--version"], self.timeout).map_err(|e| missing(e.to_string()))?;
        if !output.success {
            return Err(missing(format!("'{} --version' failed", self.skopeo_bin)));
        }
        check_skopeo_version(&output.stdout).map_err(missing)
    }

    fn resolve(&self, reference: &str) -> Result<ResolvedImage> {
        info!("Looking up image ID for {}...", reference);
        let filter = format!("--filter=reference={}", reference);
        let output = run(&self.docker_bin, &["images", &filter, "-q"], self.timeout)?;
        if !output.success {
            return Err(MixError::store_failure(
                "resolve",
                format!("{} images exited with {:?}: {}", self.docker_bin, output.code, output.stderr_tail()),
            ));
        }
        let id = single_image_id(reference, &output.stdout)?;
        Ok(ResolvedImage {
            reference: reference.to_string(),
            id,
        })
    }

    fn dump(&self, image: &ResolvedImage, target: &Path) -> Result<()> {
        info!("Dumping {} image to: {}", image.reference, target.display());
        let source = format!("docker-daemon:{}", image.reference);
        let dest = format!("dir:{}/", target.display());
        self.skopeo("dump", &["copy", &source, &dest])?;
        Ok(())
    }

    fn publish(&self, layout: &Path, tag: &str) -> Result<()> {
        info!("Pushing image to docker-daemon:{}...", tag);
        let source = format!("dir:{}/", layout.display());
        let dest = format!("docker-daemon:{}", tag);
        self.skopeo("publish", &["copy", &source, &dest])?;
        Ok(())
    }
}

fn check_skopeo_version(stdout: &str) -> std::result::Result<(), String> {
    if stdout.contains("skopeo version") {
        Ok(())
    } else {
        Err(format!("unexpected version output: '{}'", stdout.trim()))
    }
}

/// The same image listed twice (several tags match) is still one image.
fn single_image_id(reference: &str, stdout: &str) -> Result<String> {
    let mut ids = Vec::<&str>::new();
    for id in stdout.split_whitespace() {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    match ids.as_slice() {
        [] => Err(MixError::NotFound(reference.to_string())),
        [id] => Ok(id.to_string()),
        many => Err(MixError::Ambiguous {
            reference: reference.to_string(),
            count: many.len(),
        }),
    }
}

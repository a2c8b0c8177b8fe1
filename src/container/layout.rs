use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::container::image::ConfigBlob;
use crate::container::layer::LayerRecord;
use crate::container::manifest::Manifest;
use crate::container::rebuild::RebuiltImage;
use crate::container::RegDigest;
use crate::error::{MixError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const VERSION_FILE: &str = "version";

/// A directory-transport layout loaded into memory:
///
/// ```text
/// <dir>/version          transport version text
/// <dir>/manifest.json    manifest
/// <dir>/<hex>            config and layer blobs, named by digest
/// ```
#[derive(Debug, Clone)]
pub struct ImageLayout {
    pub dir: PathBuf,
    pub manifest: Manifest,
    pub config: ConfigBlob,
    pub config_digest: RegDigest,
}

impl ImageLayout {
    pub fn read(dir: &Path) -> Result<ImageLayout> {
        let manifest = read_json::<Manifest>(&dir.join(MANIFEST_FILE))?;
        let config_digest = RegDigest::parse(manifest.config_digest())
            .ok_or_else(|| MixError::malformed(dir, format!("invalid config digest '{}'", manifest.config_digest())))?;
        for layer in &manifest.layers {
            if RegDigest::parse(&layer.digest).is_none() {
                return Err(MixError::malformed(dir, format!("invalid layer digest '{}'", layer.digest)));
            }
        }
        let config = read_json::<ConfigBlob>(&dir.join(&config_digest.sha256))?;
        if !dir.join(VERSION_FILE).is_file() {
            return Err(MixError::malformed(dir, "version file not found"));
        }
        debug!(
            "Read layout {} ({} layers, config {})",
            dir.display(),
            manifest.layers.len(),
            config_digest.short_hash()
        );
        Ok(ImageLayout {
            dir: dir.to_path_buf(),
            manifest,
            config,
            config_digest,
        })
    }

    pub fn version_path(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let body = fs::read(path).map_err(|e| MixError::malformed(path, e.to_string()))?;
    serde_json::from_slice::<T>(&body).map_err(|e| MixError::malformed(path, e.to_string()))
}

/// Materializes a rebuilt image into `output_dir`.
///
/// Layer blobs are copied from the layout each record came from, each digest
/// at most once. The manifest is written last. On failure everything written
/// so far is removed before the error is returned, `output_dir` included when
/// this call created it.
pub fn write_layout(output_dir: &Path, image: &RebuiltImage, layers: &[LayerRecord], version_source: &Path) -> Result<()> {
    let created_dir = !output_dir.exists();
    let mut written = Vec::<PathBuf>::new();
    let result = write_all(output_dir, image, layers, version_source, &mut written);
    if result.is_err() {
        for path in written.iter().rev() {
            let _ = fs::remove_file(path);
        }
        if created_dir {
            let _ = fs::remove_dir(output_dir);
        }
    }
    result
}

fn write_all(
    output_dir: &Path,
    image: &RebuiltImage,
    layers: &[LayerRecord],
    version_source: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| MixError::write_failure(output_dir, e))?;

    let version_path = output_dir.join(VERSION_FILE);
    fs::copy(version_source, &version_path).map_err(|e| MixError::write_failure(&version_path, e))?;
    written.push(version_path);

    let mut copied = HashSet::<&str>::with_capacity(layers.len());
    for record in layers {
        let digest = &record.digest;
        if !copied.insert(digest.sha256.as_str()) {
            continue;
        }
        let target = output_dir.join(&digest.sha256);
        debug!("Copy layer {} from {}", digest.short_hash(), record.source_dir.display());
        fs::copy(record.blob_path(), &target).map_err(|e| MixError::write_failure(&target, e))?;
        written.push(target);
    }

    let config_path = output_dir.join(&image.config_blob.digest.sha256);
    fs::write(&config_path, &image.config_blob.json_str).map_err(|e| MixError::write_failure(&config_path, e))?;
    written.push(config_path);

    let manifest_path = output_dir.join(MANIFEST_FILE);
    let manifest_json = serde_json::to_string(&image.manifest)
        .map_err(|e| MixError::write_failure(&manifest_path, e.into()))?;
    fs::write(&manifest_path, manifest_json).map_err(|e| MixError::write_failure(&manifest_path, e))?;
    written.push(manifest_path);

    info!("Wrote layout with {} layers to {}", copied.len(), output_dir.display());
    Ok(())
}

use serde_json::Map;

use crate::container::image::{ConfigBlob, ConfigBlobSerialize, History};
use crate::container::layer::LayerRecord;
use crate::container::manifest::Manifest;
use crate::container::{Descriptor, RegContentType};
use crate::error::{MixError, Result};

/// New config and manifest for a recomposed image plus the exact config
/// bytes the manifest points at.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuiltImage {
    pub config: ConfigBlob,
    pub manifest: Manifest,
    pub config_blob: ConfigBlobSerialize,
}

/// Builds a config/manifest pair whose history, diff ids and layers follow
/// `layers` exactly. The base values are never modified.
pub fn rebuild(base_config: &ConfigBlob, base_manifest: &Manifest, layers: &[LayerRecord]) -> Result<RebuiltImage> {
    let history = layers.iter().map(|l| l.history.clone()).collect::<Vec<History>>();
    let diff_ids = layers.iter().map(|l| l.descriptor.digest.clone()).collect::<Vec<String>>();
    let config = base_config.with_layers(history, diff_ids);

    // digest is taken over the final bytes, after history and diff ids are in place
    let config_blob = config
        .serialize()
        .map_err(|e| MixError::malformed("config", e.to_string()))?;
    let config_descriptor = Descriptor {
        media_type: RegContentType::DOCKER_CONTAINER_IMAGE.val().to_string(),
        size: config_blob.size,
        digest: config_blob.digest.digest.clone(),
        extra: Map::new(),
    };
    let manifest = base_manifest.with_content(config_descriptor, layers.iter().map(|l| l.descriptor.clone()).collect());
    Ok(RebuiltImage {
        config,
        manifest,
        config_blob,
    })
}

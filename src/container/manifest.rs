use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::container::{Descriptor, RegContentType};

/// Image manifest of a directory-transport layout.
///
/// `layers[i]` pairs with the i-th non-empty history entry of the config.
/// Fields the engine does not interpret (annotations and the like) ride along
/// in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn config_digest(&self) -> &str {
        &self.config.digest
    }

    pub fn manifest_type(&self) -> &str {
        match self.media_type.as_deref() {
            Some(t) if t == RegContentType::OCI_MANIFEST.val() => "OCI",
            Some(t) if t == RegContentType::DOCKER_MANIFEST.val() => "Docker V2,Schema2",
            Some(other) => other,
            None => "OCI (untyped)",
        }
    }

    /// Copy of this manifest with a new config descriptor and layer list.
    pub fn with_content(&self, config: Descriptor, layers: Vec<Descriptor>) -> Manifest {
        Manifest {
            schema_version: self.schema_version,
            media_type: self.media_type.clone(),
            config,
            layers,
            extra: self.extra.clone(),
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::container::RegDigest;
use crate::util::sha::bytes_sha256;

/// Image config blob. Only `history` and `rootfs` are interpreted; every
/// other top-level field (architecture, env, created...) is carried through
/// untouched.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBlob {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub rootfs: Rootfs,
    pub history: Vec<History>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_layer: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl History {
    pub fn is_empty_layer(&self) -> bool {
        self.empty_layer.unwrap_or(false)
    }

    pub fn command(&self) -> &str {
        self.created_by.as_deref().unwrap_or_default()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rootfs {
    pub diff_ids: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_field: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigBlob {
    pub fn architecture(&self) -> Option<&str> {
        self.extra.get("architecture").and_then(Value::as_str)
    }

    pub fn os(&self) -> Option<&str> {
        self.extra.get("os").and_then(Value::as_str)
    }

    /// Copy of this config with history and diff ids replaced.
    pub fn with_layers(&self, history: Vec<History>, diff_ids: Vec<String>) -> ConfigBlob {
        ConfigBlob {
            extra: self.extra.clone(),
            rootfs: Rootfs {
                diff_ids,
                type_field: self.rootfs.type_field.clone(),
                extra: self.rootfs.extra.clone(),
            },
            history,
        }
    }

    pub fn serialize(&self) -> serde_json::Result<ConfigBlobSerialize> {
        let json_str = serde_json::to_string(self)?;
        let digest = RegDigest::new_with_sha256(bytes_sha256(json_str.as_bytes()));
        let size = json_str.len() as u64;
        Ok(ConfigBlobSerialize { json_str, digest, size })
    }
}

/// Exact bytes of a config blob together with their digest.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBlobSerialize {
    pub json_str: String,
    pub digest: RegDigest,
    pub size: u64,
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod image;
pub mod layer;
pub mod layout;
pub mod manifest;
pub mod rebuild;
pub mod rootfs;

const SHA256_PREFIX: &str = "sha256:";

/// A content blob reference as it appears in a manifest. `urls`,
/// `annotations`, `platform` and the like are kept verbatim in `extra`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub size: u64,
    pub digest: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegDigest {
    /// Bare hex, also the blob's file name inside a layout
    pub sha256: String,
    /// `sha256:<hex>`
    pub digest: String,
}

impl RegDigest {
    pub fn new_with_sha256(sha256: String) -> RegDigest {
        RegDigest {
            digest: format!("{}{}", SHA256_PREFIX, &sha256),
            sha256,
        }
    }

    /// Accepts only `sha256:` followed by 64 lowercase hex characters.
    pub fn parse(digest: &str) -> Option<RegDigest> {
        let hex = digest.strip_prefix(SHA256_PREFIX)?;
        let valid = hex.len() == 64 && hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));
        if !valid {
            return None;
        }
        Some(RegDigest {
            sha256: hex.to_string(),
            digest: digest.to_string(),
        })
    }

    pub fn short_hash(&self) -> &str {
        &self.sha256[..12]
    }
}

impl Display for RegDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.digest)
    }
}

#[derive(Debug)]
pub struct RegContentType(pub &'static str);

impl RegContentType {
    pub const DOCKER_MANIFEST: Self = Self("application/vnd.docker.distribution.manifest.v2+json");
    pub const DOCKER_CONTAINER_IMAGE: Self = Self("application/vnd.docker.container.image.v1+json");
    pub const OCI_MANIFEST: Self = Self("application/vnd.oci.image.manifest.v1+json");

    pub fn val(&self) -> &'static str {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressType {
    Tar,
    Tgz,
    Zstd,
}

impl CompressType {
    /// Layouts dumped from a daemon often label plain tars as gzip, so the
    /// blob's leading bytes are trusted over its media type.
    pub fn sniff(header: &[u8]) -> CompressType {
        if header.starts_with(&[0x1f, 0x8b]) {
            CompressType::Tgz
        } else if header.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            CompressType::Zstd
        } else {
            CompressType::Tar
        }
    }
}

impl Display for CompressType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompressType::Tar => "TAR",
            CompressType::Tgz => "TGZ",
            CompressType::Zstd => "ZSTD",
        })
    }
}

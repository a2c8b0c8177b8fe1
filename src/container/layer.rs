use std::path::PathBuf;

use crate::container::image::History;
use crate::container::layout::ImageLayout;
use crate::container::{Descriptor, RegDigest};
use crate::error::{MixError, Result};

/// A manifest layer paired with the history entry that produced it and the
/// layout directory its blob currently lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub descriptor: Descriptor,
    pub digest: RegDigest,
    pub history: History,
    pub source_dir: PathBuf,
}

impl LayerRecord {
    pub fn blob_path(&self) -> PathBuf {
        self.source_dir.join(&self.digest.sha256)
    }
}

/// Zips the non-empty history entries of a layout with its manifest layers.
pub fn align(layout: &ImageLayout) -> Result<Vec<LayerRecord>> {
    let histories = layout
        .config
        .history
        .iter()
        .filter(|h| !h.is_empty_layer())
        .collect::<Vec<&History>>();
    let layers = &layout.manifest.layers;
    if histories.len() != layers.len() {
        return Err(MixError::HistoryMismatch {
            path: layout.dir.clone(),
            history: histories.len(),
            layers: layers.len(),
        });
    }
    histories
        .into_iter()
        .zip(layers)
        .map(|(history, descriptor)| {
            let digest = RegDigest::parse(&descriptor.digest)
                .ok_or_else(|| MixError::malformed(&layout.dir, format!("invalid layer digest '{}'", descriptor.digest)))?;
            Ok(LayerRecord {
                descriptor: descriptor.clone(),
                digest,
                history: history.clone(),
                source_dir: layout.dir.clone(),
            })
        })
        .collect()
}

use log::debug;

use crate::container::layer::LayerRecord;
use crate::error::{MixError, Result};
use crate::select::{OrderedDigestSet, SourceLayers};

#[derive(Debug, Clone)]
pub struct MergeSelection {
    /// Position of the source whose config, manifest and version file seed the output
    pub base: usize,
    pub layers: Vec<LayerRecord>,
}

/// Concatenates the layers of every source in order, keeping only the first
/// occurrence of each digest.
pub fn merge_select(sources: &[SourceLayers]) -> Result<MergeSelection> {
    let base = sources.first().ok_or(MixError::NoImagesToMerge)?.position;
    let mut selected = OrderedDigestSet::<LayerRecord>::new();
    for source in sources {
        for record in &source.records {
            if let Some(index) = selected.position(&record.digest.digest) {
                debug!("Source {}: skip layer {}, already at {}", source.position, record.digest.short_hash(), index);
                continue;
            }
            selected.push(&record.digest.digest, record.clone());
            debug!("Source {}: keep layer {}", source.position, record.digest.short_hash());
        }
    }
    if selected.is_empty() {
        return Err(MixError::NoImagesToMerge);
    }
    debug!("Selected {} unique layers from {} sources", selected.len(), sources.len());
    Ok(MergeSelection {
        base,
        layers: selected.into_items(),
    })
}

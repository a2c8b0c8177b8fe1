use log::debug;

use crate::container::layer::LayerRecord;

/// Keeps the base layer plus every later layer whose build command contains
/// one of `filters` (case-sensitive substring match).
pub fn slice_select(records: Vec<LayerRecord>, filters: &[String]) -> Vec<LayerRecord> {
    records
        .into_iter()
        .enumerate()
        .filter(|(index, record)| {
            let keep = *index == 0 || filters.iter().any(|f| record.history.command().contains(f.as_str()));
            debug!("Layer {} ({}): {}", index, record.digest.short_hash(), if keep { "keep" } else { "drop" });
            keep
        })
        .map(|(_, record)| record)
        .collect()
}

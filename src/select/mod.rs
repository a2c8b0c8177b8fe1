use std::collections::HashMap;

use crate::container::layer::LayerRecord;

pub mod merge;
pub mod slice;

/// Insertion-ordered set keyed by digest: the first item pushed under a
/// digest is kept at the position it arrived, later ones are refused.
#[derive(Debug)]
pub struct OrderedDigestSet<T> {
    positions: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> OrderedDigestSet<T> {
    pub fn new() -> OrderedDigestSet<T> {
        OrderedDigestSet {
            positions: HashMap::new(),
            items: vec![],
        }
    }

    /// Returns false when the digest was already present.
    pub fn push(&mut self, digest: &str, item: T) -> bool {
        if self.positions.contains_key(digest) {
            return false;
        }
        self.positions.insert(digest.to_string(), self.items.len());
        self.items.push(item);
        true
    }

    pub fn position(&self, digest: &str) -> Option<usize> {
        self.positions.get(digest).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for OrderedDigestSet<T> {
    fn default() -> Self {
        OrderedDigestSet::new()
    }
}

/// The layers of one source layout, tagged with the position the caller
/// supplied it at.
#[derive(Debug, Clone)]
pub struct SourceLayers {
    pub position: usize,
    pub records: Vec<LayerRecord>,
}

// Anomalous receiver detection
//
// A receiver that produces images against many distinct transmitters in one
// run more likely has duplicate or defective hardware than one that images
// repeatedly against a single strong signal. The tally therefore counts
// distinct transmitters per receiver, never reports.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::report::PairKey;

#[derive(Debug, Default)]
pub struct AnomalousReceiverDetector {
    transmitters: HashMap<String, HashSet<String>>,
}

impl AnomalousReceiverDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a group that produced at least one accepted image.
    ///
    /// The same (transmitter, receiver) pair counts once no matter how many
    /// windows it images in.
    pub fn record(&mut self, key: &PairKey) {
        let added = self
            .transmitters
            .entry(key.receiver_id.clone())
            .or_default()
            .insert(key.transmitter_id.clone());
        if added {
            debug!("Receiver {} now images against {}", key.receiver_id, key.transmitter_id);
        }
    }

    /// Distinct transmitters `receiver_id` has produced images against
    pub fn tally(&self, receiver_id: &str) -> usize {
        self.transmitters.get(receiver_id).map_or(0, HashSet::len)
    }

    /// Receivers whose tally strictly exceeds `threshold`, sorted
    pub fn flagged(&self, threshold: usize) -> BTreeSet<String> {
        self.transmitters
            .iter()
            .filter(|(_, txs)| txs.len() > threshold)
            .map(|(rx, _)| rx.clone())
            .collect()
    }

    /// Number of receivers with at least one image
    pub fn receiver_count(&self) -> usize {
        self.transmitters.len()
    }
}

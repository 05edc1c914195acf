use tracing::{trace, warn};

use super::record::{Frame, classify, preview};
use crate::store::MergeStore;

/// Per-stream record counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntakeStats {
    /// Records inserted into the store.
    pub accepted: u64,
    /// Lines whose index prefix did not parse.
    pub malformed: u64,
    /// Records whose index was already present (first writer wins).
    pub duplicates: u64,
    /// Lines that arrived after this stream's sentinel.
    pub after_sentinel: u64,
}

impl IntakeStats {
    pub fn discarded(&self) -> u64 {
        self.malformed + self.duplicates + self.after_sentinel
    }
}

/// Routes the complete lines of one stream: the sentinel flips
/// `sentinel_received`, indexed records go into the store, and anything
/// malformed or duplicated is logged and dropped without disturbing the rest
/// of the stream.
#[derive(Debug)]
pub struct Intake {
    peer: String,
    sentinel_received: bool,
    stats: IntakeStats,
}

impl Intake {
    pub fn new(peer: impl Into<String>) -> Self {
        Intake {
            peer: peer.into(),
            sentinel_received: false,
            stats: IntakeStats::default(),
        }
    }

    pub fn accept(&mut self, payload: Vec<u8>, store: &mut MergeStore) {
        if self.sentinel_received {
            warn!(peer = %self.peer, line = %preview(&payload), "discarding data after EOF");
            self.stats.after_sentinel += 1;
            return;
        }

        match classify(payload) {
            Frame::Sentinel => {
                trace!(peer = %self.peer, "EOF received");
                self.sentinel_received = true;
            }
            Frame::Malformed(error, payload) => {
                warn!(
                    peer = %self.peer,
                    %error,
                    line = %preview(&payload),
                    "discarding malformed record"
                );
                self.stats.malformed += 1;
            }
            Frame::Record(record) => match store.insert(record) {
                Ok(()) => self.stats.accepted += 1,
                Err(dup) => {
                    warn!(
                        peer = %self.peer,
                        index = dup.index(),
                        "duplicate line index, keeping the first record"
                    );
                    self.stats.duplicates += 1;
                }
            },
        }
    }

    #[inline]
    pub fn sentinel_received(&self) -> bool {
        self.sentinel_received
    }

    #[inline]
    pub fn stats(&self) -> IntakeStats {
        self.stats
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

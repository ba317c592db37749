//! Data sets waiting for their template.
//!
//! UDP gives no ordering between template and data sets, so a data set
//! whose template is unknown is copied out of the packet and replayed
//! once a template for the same key has been seen.

use crate::cache::TemplateKey;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Predicate telling whether a template for the key is now available.
pub type TemplateKnown = Box<dyn Fn(&TemplateKey) -> bool + Send + Sync>;

/// Raw data set body plus the packet context needed to decode it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedDataSet {
    pub set_id: u16,
    /// Set body without the set header.
    pub payload: Vec<u8>,
    pub export_time_ms: i64,
    pub sequence_number: u32,
}

pub struct MissingTemplateBuffer {
    entries: Mutex<VecDeque<(TemplateKey, BufferedDataSet)>>,
    template_known: TemplateKnown,
    max_pending_sets: usize,
}

impl fmt::Debug for MissingTemplateBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MissingTemplateBuffer")
            .field("pending", &self.len())
            .field("max_pending_sets", &self.max_pending_sets)
            .finish()
    }
}

impl MissingTemplateBuffer {
    /// `max_pending_sets == 0` keeps every set until its template arrives.
    pub fn new(template_known: TemplateKnown, max_pending_sets: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            template_known,
            max_pending_sets,
        }
    }

    /// Buffers a data set. Returns the key of the oldest entry if it had
    /// to be evicted to respect the bound.
    pub fn put(&self, key: TemplateKey, set: BufferedDataSet) -> Option<TemplateKey> {
        let mut entries = self.entries.lock();
        entries.push_back((key, set));
        if self.max_pending_sets > 0 && entries.len() > self.max_pending_sets {
            let (evicted, _) = entries.pop_front()?;
            tracing::debug!(
                source = %evicted.source,
                observation_domain_id = evicted.observation_domain_id,
                template_id = evicted.template_id,
                "evicting buffered data set, pending limit {} reached",
                self.max_pending_sets
            );
            return Some(evicted);
        }
        None
    }

    /// Replays every buffered set whose template is now known.
    ///
    /// Ready entries are removed under the lock and replayed outside it.
    /// A failed replay is logged and the entry dropped. Returns the
    /// number of sets replayed successfully.
    pub fn check_templates<F>(&self, mut replay: F) -> usize
    where
        F: FnMut(&TemplateKey, &BufferedDataSet) -> Result<()>,
    {
        let ready = {
            let mut entries = self.entries.lock();
            if entries.is_empty() {
                return 0;
            }
            let (ready, waiting): (VecDeque<_>, VecDeque<_>) = entries
                .drain(..)
                .partition(|(key, _)| (self.template_known)(key));
            *entries = waiting;
            ready
        };

        let mut replayed = 0;
        for (key, set) in ready {
            match replay(&key, &set) {
                Ok(()) => replayed += 1,
                Err(err) => {
                    tracing::warn!(
                        source = %key.source,
                        observation_domain_id = key.observation_domain_id,
                        template_id = key.template_id,
                        "dropping buffered data set: {}",
                        err
                    );
                }
            }
        }
        replayed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

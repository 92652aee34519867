use std::sync::atomic::{AtomicU32, Ordering};

use progress_events::UploadId;
use tracing::warn;

use crate::config::IdStrategy;

/// Mints the id each upload is tagged with on the progress channel.
#[derive(Debug)]
pub struct IdGenerator {
    strategy: IdStrategy,
    next: AtomicU32,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            next: AtomicU32::new(1),
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    pub fn next_id(&self) -> UploadId {
        match self.strategy {
            IdStrategy::Random => match getrandom::u32() {
                Ok(id) => UploadId::new(id),
                Err(e) => {
                    warn!("OS random source unavailable ({e}); using a sequential upload id.");
                    self.next_sequential()
                },
            },
            IdStrategy::Sequential => self.next_sequential(),
        }
    }

    // Wraps at u32::MAX.
    fn next_sequential(&self) -> UploadId {
        UploadId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

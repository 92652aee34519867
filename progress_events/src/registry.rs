use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::{ProgressHandler, UploadId};

/// Maps in-flight upload ids to the progress handler of the upload that owns them.
///
/// Safe to share across threads. Handlers are cloned out before being called so that
/// the lock is never held while user code runs; a handler may therefore start another
/// upload (and register into this same registry) without deadlocking.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<UploadId, ProgressHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts the handler for `id`, returning the handler it displaced if the id was already taken.
    ///
    /// A displaced handler means two live uploads drew the same id; progress for the
    /// older one will now be delivered to the newer handler.
    pub fn insert(&self, id: UploadId, handler: ProgressHandler) -> Option<ProgressHandler> {
        let previous = self.handlers.lock().insert(id, handler);
        if previous.is_some() {
            warn!(%id, "Upload id collision; previous progress handler displaced.");
        }
        previous
    }

    /// Registers the handler and returns a guard that removes it again when dropped.
    pub fn register(self: &Arc<Self>, id: UploadId, handler: ProgressHandler) -> HandlerRegistration {
        self.insert(id, handler.clone());
        HandlerRegistration {
            registry: self.clone(),
            id,
            handler,
            release_on_drop: true,
        }
    }

    pub fn remove(&self, id: UploadId) -> Option<ProgressHandler> {
        self.handlers.lock().remove(&id)
    }

    pub fn get(&self, id: UploadId) -> Option<ProgressHandler> {
        self.handlers.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: UploadId) -> bool {
        self.handlers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Looks up the handler for `id` and calls it with (progress, total).
    ///
    /// Returns false if no handler is registered for the id, in which case the event is dropped.
    pub fn dispatch(&self, id: UploadId, progress: u64, total: u64) -> bool {
        match self.get(id) {
            Some(handler) => {
                handler(progress, total);
                true
            },
            None => false,
        }
    }
}

/// Keeps a progress handler registered for as long as the owning upload is running.
///
/// Dropping the registration removes the entry, unless the slot has since been taken
/// over by a different handler under the same id.
pub struct HandlerRegistration {
    registry: Arc<HandlerRegistry>,
    id: UploadId,
    handler: ProgressHandler,
    release_on_drop: bool,
}

impl HandlerRegistration {
    pub fn id(&self) -> UploadId {
        self.id
    }

    /// Leaves the handler registered after this guard is dropped.
    pub fn persist(mut self) {
        self.release_on_drop = false;
    }
}

impl Drop for HandlerRegistration {
    fn drop(&mut self) {
        if !self.release_on_drop {
            return;
        }

        let mut handlers = self.registry.handlers.lock();
        if handlers.get(&self.id).is_some_and(|h| Arc::ptr_eq(h, &self.handler)) {
            handlers.remove(&self.id);
        }
    }
}

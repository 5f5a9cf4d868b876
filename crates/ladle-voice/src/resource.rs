//! Transient playable-audio resources held in an arena of one.
//!
//! An [`AudioResource`] owns a synthesized payload. Audio units never see the
//! resource itself, only a [`ResourceLocator`], which resolves to the bytes for
//! as long as the resource is alive. Releasing the resource revokes every
//! locator handed out for it.
//!
//! [`ResourceSlot`] enforces the ownership rule: materializing a new resource
//! releases the previous one first, so at most one is ever live per slot.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Identifier unique within one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ladle-audio:{}", self.0)
    }
}

// ── Locator ────────────────────────────────────────────────────────

/// Address an audio unit binds to.
#[derive(Clone)]
pub struct ResourceLocator {
    id: ResourceId,
    mime: String,
    bytes: Weak<[u8]>,
}

impl ResourceLocator {
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// The payload, or `None` once the resource has been released.
    pub fn resolve(&self) -> Option<Arc<[u8]>> {
        self.bytes.upgrade()
    }

    pub fn is_live(&self) -> bool {
        self.bytes.strong_count() > 0
    }
}

impl fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("live", &self.is_live())
            .finish()
    }
}

// ── Resource ───────────────────────────────────────────────────────

/// Owned handle to one synthesized payload. Not `Clone`.
pub struct AudioResource {
    id: ResourceId,
    mime: String,
    bytes: Arc<[u8]>,
    live: Arc<AtomicUsize>,
}

impl AudioResource {
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn locator(&self) -> ResourceLocator {
        ResourceLocator {
            id: self.id,
            mime: self.mime.clone(),
            bytes: Arc::downgrade(&self.bytes),
        }
    }
}

impl Drop for AudioResource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(resource = %self.id, "audio resource released");
    }
}

impl fmt::Debug for AudioResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioResource")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ── Slot ───────────────────────────────────────────────────────────

/// Single named slot owning at most one [`AudioResource`].
#[derive(Debug, Default)]
pub struct ResourceSlot {
    current: Option<AudioResource>,
    next_id: u64,
    live: Arc<AtomicUsize>,
}

impl ResourceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release the current resource (if any), then take ownership of `bytes`.
    pub fn materialize(&mut self, bytes: Vec<u8>, mime: impl Into<String>) -> ResourceLocator {
        self.release();

        self.next_id += 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        let resource = AudioResource {
            id: ResourceId(self.next_id),
            mime: mime.into(),
            bytes: Arc::from(bytes),
            live: Arc::clone(&self.live),
        };
        tracing::trace!(resource = %resource.id, bytes = resource.len(), "audio resource materialized");

        let locator = resource.locator();
        self.current = Some(resource);
        locator
    }

    /// Release the current resource. Returns whether one was held.
    pub fn release(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub const fn current(&self) -> Option<&AudioResource> {
        self.current.as_ref()
    }

    pub const fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    /// Resources created by this slot that have not been dropped yet.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::context::{NO_ACTIVE_CHARACTER, SessionContext};

/// Shared cell holding the identifier of the logged-in character.
///
/// The host glue stores the identifier on login and clears it on logout; the
/// persistence engine only ever reads it.
#[derive(Default)]
pub struct SharedSession {
    active: AtomicU64,
}

impl SharedSession {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(NO_ACTIVE_CHARACTER),
        }
    }

    pub fn set_active(&self, id: u64) {
        self.active.store(id, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.active.store(NO_ACTIVE_CHARACTER, Ordering::Relaxed);
    }
}

impl SessionContext for SharedSession {
    fn active_character(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }
}

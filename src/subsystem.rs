//! Process-wide socket subsystem bookkeeping.
//!
//! Every connect acquires the subsystem and every cleanup releases it. The
//! first acquisition initializes the subsystem and the last release tears it
//! down. On the platforms `std::net` supports, the runtime performs the
//! actual socket library start-up itself, so the transitions only record
//! state and log.

use parking_lot::{const_mutex, Mutex};
use tracing::debug;

static GLOBAL: Subsystem = Subsystem::new();

/// Reference-counted socket subsystem state.
#[derive(Debug)]
pub struct Subsystem {
    users: Mutex<usize>,
}

impl Subsystem {
    /// Create an independent, uninitialized subsystem.
    pub const fn new() -> Self {
        Self {
            users: const_mutex(0),
        }
    }

    /// The subsystem shared by every client in the process.
    pub fn global() -> &'static Subsystem {
        &GLOBAL
    }

    /// Take a reference, initializing on the first one.
    pub fn acquire(&self) -> SubsystemGuard<'_> {
        let mut users = self.users.lock();
        if *users == 0 {
            debug!("socket subsystem initialized");
        }
        *users += 1;
        SubsystemGuard { subsystem: self }
    }

    /// Number of outstanding references.
    pub fn users(&self) -> usize {
        *self.users.lock()
    }

    /// Check if at least one reference is outstanding.
    pub fn is_initialized(&self) -> bool {
        self.users() > 0
    }

    fn release(&self) {
        let mut users = self.users.lock();
        *users = users.saturating_sub(1);
        if *users == 0 {
            debug!("socket subsystem torn down");
        }
    }
}

impl Default for Subsystem {
    fn default() -> Self {
        Self::new()
    }
}

/// One reference to a [`Subsystem`]; released on drop.
#[derive(Debug)]
#[must_use = "the subsystem reference is released as soon as the guard is dropped"]
pub struct SubsystemGuard<'a> {
    subsystem: &'a Subsystem,
}

impl Drop for SubsystemGuard<'_> {
    fn drop(&mut self) {
        self.subsystem.release();
    }
}

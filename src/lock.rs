//! Selectable lock strategy.
//!
//! A [`LockPolicy`] is chosen once when a client is built and every lock the
//! client (and the packets it produces) uses is created from it. Locks order
//! operations; they do not own the data they order.

use std::fmt;

use parking_lot::{Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};

/// Which primitive backs the locks of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockPolicy {
    /// Plain mutual exclusion for short critical sections.
    #[default]
    Mutex,
    /// Mutual exclusion that the owning thread may re-acquire.
    Reentrant,
    /// No locking at all, for single-threaded embedding.
    None,
}

impl LockPolicy {
    /// Create a new lock following this policy.
    pub fn create_lock(self) -> Box<dyn Lock> {
        match self {
            LockPolicy::Mutex => Box::new(MutexLock::new()),
            LockPolicy::Reentrant => Box::new(ReentrantLock::new()),
            LockPolicy::None => Box::new(NoLock),
        }
    }
}

/// Acquire/release contract shared by all policies.
///
/// Only mutual exclusion is guaranteed; acquisition order is not fair.
/// Release happens when the returned guard is dropped.
pub trait Lock: Send + Sync + fmt::Debug {
    /// Block until the lock is held.
    fn lock(&self) -> LockGuard<'_>;

    /// Take the lock if it is free.
    fn try_lock(&self) -> Option<LockGuard<'_>>;

    /// The policy this lock was built from.
    fn policy(&self) -> LockPolicy;
}

/// Scoped ownership of a [`Lock`].
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    held: Held<'a>,
}

enum Held<'a> {
    Mutex(MutexGuard<'a, ()>),
    Reentrant(ReentrantMutexGuard<'a, ()>),
    Nothing,
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.held {
            Held::Mutex(_) => "Mutex",
            Held::Reentrant(_) => "Reentrant",
            Held::Nothing => "None",
        };
        f.debug_struct("LockGuard").field("policy", &kind).finish()
    }
}

/// [`LockPolicy::Mutex`].
#[derive(Debug)]
pub struct MutexLock(Mutex<()>);

impl MutexLock {
    pub fn new() -> Self {
        Self(Mutex::new(()))
    }
}

impl Default for MutexLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for MutexLock {
    fn lock(&self) -> LockGuard<'_> {
        LockGuard {
            held: Held::Mutex(self.0.lock()),
        }
    }

    fn try_lock(&self) -> Option<LockGuard<'_>> {
        self.0.try_lock().map(|guard| LockGuard {
            held: Held::Mutex(guard),
        })
    }

    fn policy(&self) -> LockPolicy {
        LockPolicy::Mutex
    }
}

/// [`LockPolicy::Reentrant`].
#[derive(Debug)]
pub struct ReentrantLock(ReentrantMutex<()>);

impl ReentrantLock {
    pub fn new() -> Self {
        Self(ReentrantMutex::new(()))
    }
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for ReentrantLock {
    fn lock(&self) -> LockGuard<'_> {
        LockGuard {
            held: Held::Reentrant(self.0.lock()),
        }
    }

    fn try_lock(&self) -> Option<LockGuard<'_>> {
        self.0.try_lock().map(|guard| LockGuard {
            held: Held::Reentrant(guard),
        })
    }

    fn policy(&self) -> LockPolicy {
        LockPolicy::Reentrant
    }
}

/// [`LockPolicy::None`]: every acquisition succeeds immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

impl Lock for NoLock {
    fn lock(&self) -> LockGuard<'_> {
        LockGuard {
            held: Held::Nothing,
        }
    }

    fn try_lock(&self) -> Option<LockGuard<'_>> {
        Some(self.lock())
    }

    fn policy(&self) -> LockPolicy {
        LockPolicy::None
    }
}

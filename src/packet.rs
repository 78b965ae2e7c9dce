//! Byte buffer carrying frame payloads.
//!
//! A [`Packet`] either owns its bytes or views bytes owned elsewhere. The
//! mode is fixed at construction and decides what cloning, reassignment and
//! release do:
//!
//! | Mode | Construction | Clone | Drop |
//! |------|--------------|-------|------|
//! | [`Ownership::Owned`] | allocate + copy (or zero-fill) | deep copy | frees storage |
//! | [`Ownership::View`] | borrow, no copy | shares the borrow | frees nothing |
//!
//! A view packet carries the lifetime of the bytes it borrows, so it can
//! never outlive them.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::error::{EngineError, Result};
use crate::lock::{Lock, LockPolicy};

/// Whether a packet owns its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Storage is allocated and copied in; freed on release.
    Owned,
    /// Storage is borrowed from the caller; never copied or freed.
    View,
}

/// A reference-counted packet.
pub type SharedPacket<'a> = Arc<Packet<'a>>;

enum Storage<'a> {
    Owned(Box<[u8]>),
    View(&'a [u8]),
}

impl Storage<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(buf) => &buf[..],
            Storage::View(slice) => *slice,
        }
    }

    fn ownership(&self) -> Ownership {
        match self {
            Storage::Owned(_) => Ownership::Owned,
            Storage::View(_) => Ownership::View,
        }
    }
}

impl<'a> Storage<'a> {
    fn duplicate(&self) -> Storage<'a> {
        match self {
            Storage::Owned(buf) => Storage::Owned(buf.clone()),
            Storage::View(slice) => Storage::View(*slice),
        }
    }
}

/// A byte buffer with owned or borrowed storage.
pub struct Packet<'a> {
    storage: RwLock<Storage<'a>>,
    lock: Box<dyn Lock>,
}

impl Packet<'static> {
    /// Allocate a packet holding a copy of `bytes`.
    pub fn owned(bytes: &[u8]) -> Self {
        Self::from_storage(Storage::Owned(bytes.into()))
    }

    /// Allocate a zero-filled packet of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::from_storage(Storage::Owned(vec![0u8; len].into_boxed_slice()))
    }

    /// Adopt an existing allocation without copying it.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::from_storage(Storage::Owned(bytes.into_boxed_slice()))
    }
}

impl<'a> Packet<'a> {
    /// Borrow `bytes` without copying them.
    pub fn view(bytes: &'a [u8]) -> Self {
        Self::from_storage(Storage::View(bytes))
    }

    /// Build a packet of `len` bytes.
    ///
    /// Owned packets copy up to `len` bytes from `initial` and zero-fill the
    /// rest. View packets borrow at most `len` bytes of `initial`; without
    /// `initial` a view is empty.
    pub fn create(initial: Option<&'a [u8]>, len: usize, ownership: Ownership) -> Self {
        let storage = match ownership {
            Ownership::Owned => {
                let mut buf = vec![0u8; len];
                if let Some(src) = initial {
                    let n = src.len().min(len);
                    buf[..n].copy_from_slice(&src[..n]);
                }
                Storage::Owned(buf.into_boxed_slice())
            }
            Ownership::View => {
                let slice = initial.map_or(&[][..], |src| &src[..src.len().min(len)]);
                Storage::View(slice)
            }
        };
        Self::from_storage(storage)
    }

    fn from_storage(storage: Storage<'a>) -> Self {
        Self {
            storage: RwLock::new(storage),
            lock: LockPolicy::default().create_lock(),
        }
    }

    /// Replace the packet's lock with one built from `policy`.
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock = policy.create_lock();
        self
    }

    /// The policy of the packet's lock.
    pub fn lock_policy(&self) -> LockPolicy {
        self.lock.policy()
    }

    /// Get the ownership mode.
    pub fn ownership(&self) -> Ownership {
        self.storage.read().ownership()
    }

    /// Check if the packet owns its storage.
    pub fn is_owned(&self) -> bool {
        self.ownership() == Ownership::Owned
    }

    /// Number of bytes in the packet.
    pub fn len(&self) -> usize {
        self.storage.read().as_slice().len()
    }

    /// Check if the packet is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the content.
    ///
    /// The content cannot change while the guard is alive; a concurrent
    /// [`set_content`](Self::set_content) waits for it to drop.
    pub fn bytes(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.storage.read(), |storage| storage.as_slice())
    }

    /// Copy the content into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }

    /// Copy the content into a new [`Bytes`].
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.bytes())
    }

    /// Replace the content wholesale.
    ///
    /// Owned packets reallocate and copy `bytes`; view packets re-point to
    /// them. `bytes` must live as long as the packet's `'a`, so a
    /// `Packet<'static>` only accepts `'static` data here; use
    /// [`copy_from`](Self::copy_from) to copy shorter-lived bytes into an
    /// owned packet.
    pub fn set_content(&self, bytes: &'a [u8]) {
        let _guard = self.lock.lock();
        let mut storage = self.storage.write();
        match &mut *storage {
            Storage::Owned(buf) => *buf = bytes.into(),
            Storage::View(slice) => *slice = bytes,
        }
    }

    /// Copy `bytes` into an owned packet, whatever their lifetime.
    ///
    /// Fails for view packets, which cannot allocate.
    pub fn copy_from(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.lock.lock();
        let mut storage = self.storage.write();
        match &mut *storage {
            Storage::Owned(buf) => {
                *buf = bytes.into();
                Ok(())
            }
            Storage::View(_) => Err(EngineError::BorrowedStorage),
        }
    }

    /// Replace the content with `len` zero bytes.
    ///
    /// Fails for view packets, which cannot allocate.
    pub fn set_zeroed(&self, len: usize) -> Result<()> {
        let _guard = self.lock.lock();
        let mut storage = self.storage.write();
        match &mut *storage {
            Storage::Owned(buf) => {
                *buf = vec![0u8; len].into_boxed_slice();
                Ok(())
            }
            Storage::View(_) => Err(EngineError::BorrowedStorage),
        }
    }

    /// Take on the mode and content of `other`.
    ///
    /// Owned content is deep-copied; a view is shared.
    pub fn assign_from(&self, other: &Packet<'a>) {
        if ptr::eq(self, other) {
            return;
        }
        let snapshot = {
            let _guard = other.lock.lock();
            other.storage.read().duplicate()
        };
        let _guard = self.lock.lock();
        *self.storage.write() = snapshot;
    }

    /// Move the packet behind a reference count.
    pub fn into_shared(self) -> SharedPacket<'a> {
        Arc::new(self)
    }
}

impl Clone for Packet<'_> {
    fn clone(&self) -> Self {
        let _guard = self.lock.lock();
        let storage = self.storage.read().duplicate();
        Self {
            storage: RwLock::new(storage),
            lock: self.lock.policy().create_lock(),
        }
    }
}

impl Default for Packet<'_> {
    fn default() -> Self {
        Self::from_storage(Storage::Owned(Box::default()))
    }
}

impl From<Vec<u8>> for Packet<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

impl PartialEq for Packet<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other) || *self.bytes() == *other.bytes()
    }
}

impl Eq for Packet<'_> {}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage.read();
        f.debug_struct("Packet")
            .field("ownership", &storage.ownership())
            .field("len", &storage.as_slice().len())
            .field("lock", &self.lock.policy())
            .finish()
    }
}

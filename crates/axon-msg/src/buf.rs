//! Lock-counted payload buffers.
//!
//! Payload bytes are handed to producers and consumers across the
//! boundary without copying; the lock count records how many external
//! raw views are outstanding so the buffer cannot be mutated or
//! reclaimed underneath one.

use crate::MsgError;

/// A payload buffer with an explicit external-view lock count.
///
/// `lock()` registers an outstanding raw view; while any view is
/// registered, mutation and release fail with
/// [`MsgError::BufLocked`]. Locks are not carried across clones: a
/// cloned buffer owns fresh storage nobody has a view of.
///
/// # Example
///
/// ```
/// use axon_msg::Buf;
///
/// let mut buf = Buf::new(vec![1, 2, 3]);
/// buf.lock();
/// assert!(buf.data_mut().is_err()); // view outstanding
/// buf.unlock().unwrap();
/// buf.data_mut().unwrap().push(4); // free again
/// ```
#[derive(Debug, Default)]
pub struct Buf {
    data: Vec<u8>,
    locks: u32,
}

impl Buf {
    /// Creates a buffer owning `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, locks: 0 }
    }

    /// Number of payload bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shared view of the payload. Always allowed.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the payload.
    ///
    /// # Errors
    ///
    /// [`MsgError::BufLocked`] while any external view is registered.
    pub fn data_mut(&mut self) -> Result<&mut Vec<u8>, MsgError> {
        if self.locks > 0 {
            return Err(MsgError::BufLocked);
        }
        Ok(&mut self.data)
    }

    /// Registers an outstanding external view.
    pub fn lock(&mut self) {
        self.locks += 1;
    }

    /// Removes one outstanding external view.
    ///
    /// # Errors
    ///
    /// [`MsgError::BufNotLocked`] when no view is registered.
    pub fn unlock(&mut self) -> Result<(), MsgError> {
        if self.locks == 0 {
            return Err(MsgError::BufNotLocked);
        }
        self.locks -= 1;
        Ok(())
    }

    /// Returns `true` while any external view is registered.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locks > 0
    }

    /// Takes the payload out, leaving the buffer empty.
    ///
    /// # Errors
    ///
    /// [`MsgError::BufLocked`] while any external view is registered.
    pub fn take(&mut self) -> Result<Vec<u8>, MsgError> {
        if self.locks > 0 {
            return Err(MsgError::BufLocked);
        }
        Ok(std::mem::take(&mut self.data))
    }
}

impl Clone for Buf {
    /// Deep-copies the payload with a fresh zero lock count.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            locks: 0,
        }
    }
}

impl From<Vec<u8>> for Buf {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

// Equality compares payload bytes only; the lock count is transient
// bookkeeping, not message content.
impl PartialEq for Buf {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Buf {}

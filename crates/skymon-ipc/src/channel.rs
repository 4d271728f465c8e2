//! Named shared-memory channels with an atomic-frame contract.
//!
//! A channel is one named region plus one cross-process mutex. The region
//! starts with the mutex, followed by an 8-byte-aligned frame header
//! (`version: u64`, `len: u64`) and a fixed-capacity payload area. Readers and
//! writers always hold the mutex for the whole copy, so a frame is observed
//! completely or not at all - never mid-write.
//!
//! The version counter increments on every publish, letting a reader skip
//! frames it has already consumed without any cross-channel coordination.

use raw_sync::locks::{LockImpl, LockInit, Mutex};
use shared_memory::{Shmem, ShmemConf, ShmemError};
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Bytes reserved at the start of the region for the cross-process mutex.
/// Generous for every platform raw_sync supports; the real size is measured
/// after mapping.
const LOCK_RESERVED: usize = 128;

/// Frame header: version counter followed by payload length, both `u64`.
const FRAME_HEADER_LEN: usize = 16;

/// One complete frame copied out of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Publish counter at the time of the read.
    pub version: u64,

    /// The payload bytes, exactly as written.
    pub payload: Vec<u8>,
}

/// A named fixed-capacity shared-memory channel.
///
/// Opening the same name from several processes attaches them all to one
/// region; the embedded mutex serializes every access. The mapping is
/// released on drop (or [`Channel::close`]); the name survives until some
/// process calls [`Channel::destroy`].
pub struct Channel {
    // Declared before `shmem` so the lock handle drops while the region it
    // points into is still mapped.
    lock: Box<dyn LockImpl>,
    shmem: Shmem,
    name: String,
    capacity: usize,
    /// Offset of the frame header from the region base.
    data_offset: usize,
}

// SAFETY: every access to the mapped region goes through the cross-process
// mutex, which provides the necessary ordering; the raw pointers stay valid
// for the lifetime of `shmem`, which the channel owns. The `&self` write
// methods mutate only memory guarded by that mutex.
unsafe impl Send for Channel {}
unsafe impl Sync for Channel {}

impl Channel {
    /// Creates or attaches the named channel.
    ///
    /// The first creator zero-initializes the region and its mutex; later
    /// opens attach to the existing region. Creation and attachment can race
    /// between processes, so a create that loses the race falls back to
    /// attaching.
    pub fn open(name: &str, capacity: usize) -> Result<Self, ChannelError> {
        let requested = LOCK_RESERVED + FRAME_HEADER_LEN + capacity;

        let conf = ShmemConf::new().os_id(name).size(requested);
        match conf.create() {
            Ok(mut shmem) => {
                // The region must outlive its creator; teardown is explicit
                // via destroy().
                let _ = shmem.set_owner(false);
                Self::from_mapping(shmem, name, capacity, true)
            }
            Err(ShmemError::MappingIdExists) => Self::attach(name, capacity),
            Err(e) => Err(ChannelError::OpenFailure {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn attach(name: &str, capacity: usize) -> Result<Self, ChannelError> {
        let shmem = ShmemConf::new()
            .os_id(name)
            .open()
            .map_err(|e| ChannelError::OpenFailure {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_mapping(shmem, name, capacity, false)
    }

    fn from_mapping(
        shmem: Shmem,
        name: &str,
        capacity: usize,
        init: bool,
    ) -> Result<Self, ChannelError> {
        let base = shmem.as_ptr();
        let lock_len = Mutex::size_of(Some(base));
        // 8-byte alignment for the frame header.
        let data_offset = (lock_len + 7) & !7;

        let usable = shmem.len().saturating_sub(data_offset + FRAME_HEADER_LEN);
        if usable < capacity {
            return Err(ChannelError::RegionTooSmall {
                name: name.to_string(),
                usable,
                capacity,
            });
        }

        // SAFETY: base points at the mapped region, data_offset is in bounds
        // (checked above), and the mutex region is exclusively ours to
        // initialize on first creation.
        let data_ptr = unsafe { base.add(data_offset) };
        let lock = if init {
            unsafe { Mutex::new(base, data_ptr) }
        } else {
            unsafe { Mutex::from_existing(base, data_ptr) }
        }
        .map_err(|e| ChannelError::Lock {
            name: name.to_string(),
            reason: e.to_string(),
        })?
        .0;

        debug!(
            channel = name,
            capacity,
            region_len = shmem.len(),
            created = init,
            "channel opened"
        );

        Ok(Self {
            lock,
            shmem,
            name: name.to_string(),
            capacity,
            data_offset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publishes a whole frame: zero the payload area, copy `bytes`, bump the
    /// version. Rejects with `FrameTooLarge` when `bytes.len() >= capacity`,
    /// leaving the prior frame untouched.
    ///
    /// Returns the new version.
    pub fn write_frame(&self, bytes: &[u8]) -> Result<u64, ChannelError> {
        if bytes.len() >= self.capacity {
            return Err(ChannelError::FrameTooLarge {
                len: bytes.len(),
                capacity: self.capacity,
            });
        }

        let guard = self.acquire()?;
        let data = *guard as *mut u8;
        // SAFETY: the mutex is held and data points at the frame header with
        // capacity payload bytes behind it (validated at open).
        unsafe {
            let payload = data.add(FRAME_HEADER_LEN);
            std::ptr::write_bytes(payload, 0, self.capacity);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), payload, bytes.len());

            let version = (data as *mut u64).read().wrapping_add(1);
            (data as *mut u64).write(version);
            (data.add(8) as *mut u64).write(bytes.len() as u64);
            Ok(version)
        }
    }

    /// Copies out the current frame.
    ///
    /// Returns `StaleOrEmptyFrame` when nothing has been published yet (or the
    /// slot was consumed). Two reads with no intervening write return
    /// identical payloads and versions.
    pub fn read_frame(&self) -> Result<Frame, ChannelError> {
        let guard = self.acquire()?;
        let data = *guard as *mut u8;
        // SAFETY: mutex held; header and payload bounds validated at open.
        unsafe { self.copy_out(data, false) }
    }

    /// Copies out the current frame and clears the slot - consume semantics
    /// for single-slot command channels. The version counter is untouched; it
    /// counts publishes, not consumptions.
    pub fn take_frame(&self) -> Result<Frame, ChannelError> {
        let guard = self.acquire()?;
        let data = *guard as *mut u8;
        // SAFETY: mutex held; header and payload bounds validated at open.
        unsafe { self.copy_out(data, true) }
    }

    /// Atomic read-modify-write: passes the current payload (empty when
    /// nothing is published) to `f` and publishes its result, all under one
    /// lock acquisition. Required by multi-writer channels where concurrent
    /// updates must never lose each other's records.
    ///
    /// Returns the new version.
    pub fn update_frame<F>(&self, f: F) -> Result<u64, ChannelError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, ChannelError>,
    {
        let guard = self.acquire()?;
        let data = *guard as *mut u8;

        // SAFETY: mutex held for the whole read-modify-write; bounds validated
        // at open.
        unsafe {
            let len = self.stored_len(data);
            let payload = data.add(FRAME_HEADER_LEN);
            let current = std::slice::from_raw_parts(payload as *const u8, len);

            let updated = f(current)?;
            if updated.len() >= self.capacity {
                return Err(ChannelError::FrameTooLarge {
                    len: updated.len(),
                    capacity: self.capacity,
                });
            }

            std::ptr::write_bytes(payload, 0, self.capacity);
            std::ptr::copy_nonoverlapping(updated.as_ptr(), payload, updated.len());

            let version = (data as *mut u64).read().wrapping_add(1);
            (data as *mut u64).write(version);
            (data.add(8) as *mut u64).write(updated.len() as u64);
            Ok(version)
        }
    }

    /// Current publish counter, without copying the payload.
    pub fn version(&self) -> Result<u64, ChannelError> {
        let guard = self.acquire()?;
        let data = *guard as *const u8;
        // SAFETY: mutex held; the header is within the mapping.
        Ok(unsafe { (data as *const u64).read() })
    }

    /// Releases the local mapping. The named region stays available to peers.
    pub fn close(self) {
        debug!(channel = %self.name, "channel closed");
        drop(self);
    }

    /// Releases the local mapping and removes the name system-wide. Only the
    /// final teardown owner calls this, after the termination coordinator has
    /// confirmed every peer is done.
    pub fn destroy(mut self) {
        debug!(channel = %self.name, "channel destroyed");
        let _ = self.shmem.set_owner(true);
        drop(self);
    }

    fn acquire(&self) -> Result<raw_sync::locks::LockGuard<'_>, ChannelError> {
        self.lock.lock().map_err(|e| ChannelError::Lock {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }

    /// Stored payload length, clamped against corruption.
    ///
    /// # Safety
    /// Caller must hold the channel mutex; `data` must be the frame header.
    unsafe fn stored_len(&self, data: *const u8) -> usize {
        let len = (data.add(8) as *const u64).read() as usize;
        if len > self.capacity {
            // A foreign writer with a different capacity; treat as empty
            // rather than read out of bounds.
            warn!(
                channel = %self.name,
                len,
                capacity = self.capacity,
                "stored frame length exceeds capacity, treating as empty"
            );
            0
        } else {
            len
        }
    }

    /// # Safety
    /// Caller must hold the channel mutex; `data` must be the frame header.
    unsafe fn copy_out(&self, data: *mut u8, consume: bool) -> Result<Frame, ChannelError> {
        let version = (data as *const u64).read();
        let len = self.stored_len(data);
        if len == 0 {
            return Err(ChannelError::StaleOrEmptyFrame);
        }

        let payload_ptr = data.add(FRAME_HEADER_LEN) as *const u8;
        let payload = std::slice::from_raw_parts(payload_ptr, len).to_vec();

        if consume {
            (data.add(8) as *mut u64).write(0);
        }

        Ok(Frame { version, payload })
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("data_offset", &self.data_offset)
            .finish()
    }
}

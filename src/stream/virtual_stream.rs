//! Seekable view over an ordered sequence of stored objects.

#![allow(clippy::cast_possible_truncation)]

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use super::error::{StreamError, StreamResult};
use super::segment::Segment;
use crate::store::ObjectStore;

/// Reference point for [`VirtualStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// Absolute offset from the start of the stream.
    Start = 0,
    /// Relative to the current cursor.
    Current = 1,
    /// Relative to the total size.
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    fn try_from(value: i32) -> StreamResult<Self> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidWhence(other)),
        }
    }
}

/// Many stored objects presented as one contiguous, seekable byte stream.
///
/// Objects are concatenated in the order their keys were given. Positional
/// reads ([`read_at`](Self::read_at)) are lock-free and may run concurrently;
/// sequential reads and seeks share one cursor behind a mutex that is held
/// for the whole operation, including the network fetches of a read.
///
/// Object sizes are looked up once in [`open`](Self::open) and treated as
/// immutable afterwards.
pub struct VirtualStream<S: ObjectStore> {
    store: Arc<S>,
    bucket: Arc<str>,
    segments: Vec<Segment<S>>,
    total_size: u64,
    cursor: Mutex<u64>,
}

impl<S: ObjectStore> VirtualStream<S> {
    /// Opens a stream over `keys` in `bucket`.
    ///
    /// Performs one size lookup per key, in order.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Metadata`] for the first key whose lookup fails;
    /// later keys are not looked up.
    pub fn open<I, K>(store: Arc<S>, bucket: impl Into<Arc<str>>, keys: I) -> StreamResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let bucket = bucket.into();
        let segments = keys
            .into_iter()
            .map(|key| Segment::open(Arc::clone(&store), Arc::clone(&bucket), key.into()))
            .collect::<StreamResult<Vec<_>>>()?;

        let total_size: u64 = segments.iter().map(Segment::size).sum();
        debug!(
            "opened virtual stream over {} objects in '{bucket}': {total_size} bytes",
            segments.len()
        );

        Ok(Self {
            store,
            bucket,
            segments,
            total_size,
            cursor: Mutex::new(0),
        })
    }

    /// Sum of all object sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> u64 {
        *self.lock_cursor()
    }

    /// Segments in concatenation order.
    #[must_use]
    pub fn segments(&self) -> &[Segment<S>] {
        &self.segments
    }

    /// Bucket every segment lives in.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Shared handle to the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Finds the segment holding logical `offset` and the offset inside it.
    ///
    /// Empty segments are never returned. `None` at or past the end.
    #[must_use]
    pub fn locate(&self, offset: u64) -> Option<(usize, u64)> {
        let mut off = offset;
        for (index, segment) in self.segments.iter().enumerate() {
            if off < segment.size() {
                return Some((index, off));
            }
            off -= segment.size();
        }
        None
    }

    /// Reads into `buf` starting at logical `offset`, leaving the cursor alone.
    ///
    /// A range crossing object boundaries turns into one fetch per touched
    /// object, in order, each filling its own slice of `buf`. A range running
    /// past the end is clamped and the short count is returned. An empty `buf`
    /// inside the stream returns `Ok(0)` without fetching.
    ///
    /// # Errors
    ///
    /// - [`StreamError::EndOfStream`] if `offset` is at or past the end, even
    ///   for an empty `buf`.
    /// - [`StreamError::Fetch`] / [`StreamError::ShortRead`] if a fetch fails;
    ///   [`StreamError::bytes_read`] reports what landed in `buf` before it.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> StreamResult<usize> {
        if offset >= self.total_size {
            return Err(StreamError::EndOfStream { offset });
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut off = offset;
        let mut p_off = 0usize;
        let mut n = 0usize;

        for segment in &self.segments {
            if off >= segment.size() {
                off -= segment.size();
                continue;
            }

            let remaining = (buf.len() - p_off) as u64;
            if off.saturating_add(remaining) > segment.size() {
                // Only the tail of this object; the rest comes from the next ones.
                let tail = (segment.size() - off) as usize;
                let m = segment
                    .fetch(&mut buf[p_off..p_off + tail], off)
                    .map_err(|e| e.with_prior_bytes(n))?;
                p_off += tail;
                n += m;
                off = 0;
                continue;
            }

            let m = segment
                .fetch(&mut buf[p_off..], off)
                .map_err(|e| e.with_prior_bytes(n))?;
            return Ok(n + m);
        }

        if n == 0 {
            return Err(StreamError::EndOfStream { offset });
        }
        Ok(n)
    }

    /// Fills all of `buf` from logical `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`read_at`](Self::read_at), plus [`StreamError::EndOfStream`]
    /// when the stream ends before `buf` is full.
    pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> StreamResult<()> {
        let n = self.read_at(buf, offset)?;
        if n < buf.len() {
            return Err(StreamError::EndOfStream {
                offset: offset + n as u64,
            });
        }
        Ok(())
    }

    /// Reads at the cursor and advances it by the bytes read.
    ///
    /// # Errors
    ///
    /// Same as [`read_at`](Self::read_at). The cursor does not move on error.
    pub fn read(&self, buf: &mut [u8]) -> StreamResult<usize> {
        let mut cursor = self.lock_cursor();
        let n = self.read_at(buf, *cursor)?;
        *cursor += n as u64;
        Ok(n)
    }

    /// Moves the cursor and returns its new absolute position.
    ///
    /// Seeking past the end is allowed; reads there report end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidOffset`] if the target would be negative.
    /// The cursor is unchanged on error.
    pub fn seek(&self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let mut cursor = self.lock_cursor();
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => i128::from(*cursor),
            Whence::End => i128::from(self.total_size),
        };
        let target = base + i128::from(offset);
        let position = u64::try_from(target).map_err(|_| StreamError::InvalidOffset(target))?;
        *cursor = position;
        Ok(position)
    }

    /// [`seek`](Self::seek) with a raw `0`/`1`/`2` whence value.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidWhence`] for any other whence, otherwise
    /// as [`seek`](Self::seek).
    pub fn seek_raw(&self, offset: i64, whence: i32) -> StreamResult<u64> {
        self.seek(offset, Whence::try_from(whence)?)
    }

    fn lock_cursor(&self) -> MutexGuard<'_, u64> {
        // The guarded value is always committed whole, so a poisoned lock is still consistent.
        self.cursor.lock().unwrap_or_else(|poisoned| {
            warn!("cursor lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn io_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match Self::read(self, buf) {
            Ok(n) => Ok(n),
            Err(StreamError::EndOfStream { .. }) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn io_seek(&self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (
                i64::try_from(offset).map_err(|_| StreamError::InvalidOffset(offset.into()))?,
                Whence::Start,
            ),
            SeekFrom::Current(offset) => (offset, Whence::Current),
            SeekFrom::End(offset) => (offset, Whence::End),
        };
        Ok(Self::seek(self, offset, whence)?)
    }
}

impl<S: ObjectStore> std::fmt::Debug for VirtualStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualStream")
            .field("bucket", &self.bucket)
            .field("segments", &self.segments)
            .field("total_size", &self.total_size)
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> Read for VirtualStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io_read(buf)
    }
}

impl<S: ObjectStore> Read for &VirtualStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io_read(buf)
    }
}

impl<S: ObjectStore> Seek for VirtualStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.io_seek(pos)
    }
}

impl<S: ObjectStore> Seek for &VirtualStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.io_seek(pos)
    }
}

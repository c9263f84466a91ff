//! Bounded, replayable request body buffering.
//!
//! The body is read from its source exactly once, up to a configured capacity. The buffered bytes can then be
//! digested and handed to downstream consumers as many times as needed. If the source yields more than the capacity
//! the buffer is marked as overflowed; this is not an error until something needs the full body (digest
//! validation or SNWS2 content hashing), at which point it is reported as
//! [`SignatureError::ContentTooLarge`][crate::SignatureError::ContentTooLarge].

use {
    crate::{constants::MSG_CONTENT_TOO_LARGE, SignatureError},
    bytes::{Buf, Bytes, BytesMut},
    http_body::Body,
    http_body_util::{BodyExt, Full},
    log::{debug, error, trace},
    std::{
        fmt::{Debug, Formatter, Result as FmtResult},
        io::{ErrorKind, Read},
    },
    tower::BoxError,
};

/// A request body buffered in memory, up to a fixed capacity.
#[derive(Clone, PartialEq, Eq)]
pub struct BufferedBody {
    bytes: Bytes,
    capacity: usize,
    overflowed: bool,
}

impl BufferedBody {
    /// An empty body.
    pub fn empty(capacity: usize) -> Self {
        Self {
            bytes: Bytes::new(),
            capacity,
            overflowed: false,
        }
    }

    /// Buffer an in-memory body. Bytes beyond `capacity` are discarded and the buffer is marked as overflowed.
    pub fn from_bytes(bytes: impl Into<Bytes>, capacity: usize) -> Self {
        let mut bytes: Bytes = bytes.into();
        let overflowed = bytes.len() > capacity;
        if overflowed {
            debug!("Body of {} bytes exceeds buffer capacity of {} bytes", bytes.len(), capacity);
            bytes.truncate(capacity);
        }

        Self {
            bytes,
            capacity,
            overflowed,
        }
    }

    /// Buffer a body from a reader in a single pass. At most `capacity + 1` bytes are read from the reader; any
    /// bytes after that are left unread.
    pub fn from_reader<R: Read>(reader: &mut R, capacity: usize) -> std::io::Result<Self> {
        let mut buf = Vec::with_capacity(capacity.min(8192));
        let limit = u64::try_from(capacity).unwrap_or(u64::MAX).saturating_add(1);
        loop {
            match reader.by_ref().take(limit - buf.len() as u64).read_to_end(&mut buf) {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Failed to read request body: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(Self::from_bytes(buf, capacity))
    }

    /// Buffer an HTTP body frame by frame. Reading stops as soon as the capacity is exceeded; the remainder of the
    /// body is not consumed.
    pub async fn from_body<B>(body: B, capacity: usize) -> Result<Self, SignatureError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let mut body = std::pin::pin!(body);
        let mut buf = BytesMut::new();
        let mut overflowed = false;

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| {
                let e: BoxError = e.into();
                error!("Body read error: {}", e);
                SignatureError::from(e)
            })?;

            if let Ok(mut data) = frame.into_data() {
                let remaining = capacity - buf.len();
                let len = data.remaining();
                let chunk = data.copy_to_bytes(len);
                trace!("Body frame received: {} bytes", chunk.len());

                if chunk.len() > remaining {
                    buf.extend_from_slice(&chunk[..remaining]);
                    overflowed = true;
                    debug!("Body exceeds buffer capacity of {} bytes; no longer buffering", capacity);
                    break;
                }

                buf.extend_from_slice(&chunk);
            }
        }

        Ok(Self {
            bytes: buf.freeze(),
            capacity,
            overflowed,
        })
    }

    /// The buffered bytes. If the body overflowed this is only the first `capacity` bytes.
    #[inline]
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// The buffered bytes as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bytes buffered.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes were buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The maximum number of bytes this buffer holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the source body was larger than the capacity.
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Return the full body bytes, or `ContentTooLarge` if only a prefix was buffered.
    pub fn complete_bytes(&self) -> Result<&[u8], SignatureError> {
        if self.overflowed {
            Err(SignatureError::ContentTooLarge(MSG_CONTENT_TOO_LARGE.to_string()))
        } else {
            Ok(&self.bytes)
        }
    }

    /// Produce a fresh HTTP body for downstream consumers. This can be called any number of times.
    pub fn replay_body(&self) -> Result<Full<Bytes>, SignatureError> {
        self.complete_bytes()?;
        Ok(Full::new(self.bytes()))
    }
}

impl Debug for BufferedBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BufferedBody")
            .field("len", &self.bytes.len())
            .field("capacity", &self.capacity)
            .field("overflowed", &self.overflowed)
            .finish()
    }
}

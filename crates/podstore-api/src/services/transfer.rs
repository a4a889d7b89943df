//! Transfer strategy selection
//!
//! Small payloads go to the store in one request. Payloads above the
//! streaming threshold are fed to the backend's streaming upload so they are
//! never fully resident in memory.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use podstore_core::constants::{
    METADATA_CATEGORY, METADATA_ORIGINAL_FILENAME, METADATA_TENANT_ID, METADATA_UPLOADED_BY,
};
use podstore_core::{FileCategory, Principal};
use podstore_storage::{ObjectMetadata, ObjectReader, Storage, StorageError, StorageResult};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Object metadata values must be plain ASCII on S3.
const METADATA_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    /// Single `put_object` request
    Buffered,
    /// Chunked `put_object_stream` upload
    Streamed,
}

impl TransferStrategy {
    pub fn select(byte_count: u64, threshold: u64) -> Self {
        if byte_count <= threshold {
            TransferStrategy::Buffered
        } else {
            TransferStrategy::Streamed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStrategy::Buffered => "buffered",
            TransferStrategy::Streamed => "streamed",
        }
    }
}

/// Upload body as handed to the transfer step.
pub enum Payload {
    Buffered(Bytes),
    Streamed {
        reader: ObjectReader,
        content_length: u64,
    },
}

impl Payload {
    pub fn len(&self) -> u64 {
        match self {
            Payload::Buffered(bytes) => bytes.len() as u64,
            Payload::Streamed { content_length, .. } => *content_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reader that fails unless exactly `expected` bytes come out of `inner`.
///
/// EOF before `expected` bytes is `UnexpectedEof`; any byte past `expected`
/// is `InvalidData`.
pub struct LengthCheckedReader<R> {
    inner: R,
    expected: u64,
    read: u64,
}

impl<R> LengthCheckedReader<R> {
    pub fn new(inner: R, expected: u64) -> Self {
        Self {
            inner,
            expected,
            read: 0,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for LengthCheckedReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let this = &mut *self;
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let n = (buf.filled().len() - before) as u64;

        if n == 0 {
            if this.read < this.expected {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "body ended after {} of {} declared bytes",
                        this.read, this.expected
                    ),
                )));
            }
            return Poll::Ready(Ok(()));
        }

        this.read += n;
        if this.read > this.expected {
            buf.set_filled(before);
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("body is longer than the declared {} bytes", this.expected),
            )));
        }

        Poll::Ready(Ok(()))
    }
}

/// Provenance metadata attached to every stored object.
pub fn provenance_metadata(
    principal: &Principal,
    original_filename: &str,
    category: Option<FileCategory>,
) -> ObjectMetadata {
    let mut metadata = ObjectMetadata::new();
    metadata.insert(
        METADATA_ORIGINAL_FILENAME.to_string(),
        utf8_percent_encode(original_filename, METADATA_VALUE).to_string(),
    );
    metadata.insert(
        METADATA_UPLOADED_BY.to_string(),
        utf8_percent_encode(&principal.user_id, METADATA_VALUE).to_string(),
    );
    metadata.insert(
        METADATA_TENANT_ID.to_string(),
        utf8_percent_encode(&principal.tenant_id, METADATA_VALUE).to_string(),
    );
    if let Some(category) = category {
        metadata.insert(METADATA_CATEGORY.to_string(), category.as_str().to_string());
    }
    metadata
}

/// Write `payload` under `key` using the strategy its size selects.
///
/// Returns the chosen strategy and the number of bytes stored.
pub async fn write_object(
    storage: &dyn Storage,
    key: &str,
    payload: Payload,
    content_type: &str,
    metadata: &ObjectMetadata,
    threshold: u64,
) -> StorageResult<(TransferStrategy, u64)> {
    let byte_count = payload.len();
    let strategy = TransferStrategy::select(byte_count, threshold);

    let written = match (strategy, payload) {
        (TransferStrategy::Buffered, Payload::Buffered(bytes)) => {
            storage
                .put_object(key, bytes, content_type, metadata)
                .await?;
            byte_count
        }
        (TransferStrategy::Buffered, Payload::Streamed { reader, content_length }) => {
            // Bounded by the threshold, so reading it fully is fine.
            let mut buffer = Vec::with_capacity(content_length as usize);
            LengthCheckedReader::new(reader, content_length)
                .read_to_end(&mut buffer)
                .await
                .map_err(StorageError::IoError)?;
            storage
                .put_object(key, Bytes::from(buffer), content_type, metadata)
                .await?;
            byte_count
        }
        (TransferStrategy::Streamed, Payload::Buffered(bytes)) => {
            let reader: ObjectReader = Box::pin(io::Cursor::new(bytes));
            storage
                .put_object_stream(key, reader, byte_count, content_type, metadata)
                .await?
        }
        (TransferStrategy::Streamed, Payload::Streamed { reader, content_length }) => {
            let reader: ObjectReader = Box::pin(LengthCheckedReader::new(reader, content_length));
            storage
                .put_object_stream(key, reader, content_length, content_type, metadata)
                .await?
        }
    };

    tracing::debug!(
        key = %key,
        size_bytes = written,
        strategy = strategy.as_str(),
        "Object transferred"
    );

    Ok((strategy, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{Call, RecordingStorage};
    use podstore_core::Role;

    const THRESHOLD: u64 = 1024;

    fn stream(data: Vec<u8>) -> ObjectReader {
        Box::pin(io::Cursor::new(data))
    }

    #[test]
    fn test_select_boundary() {
        assert_eq!(TransferStrategy::select(0, THRESHOLD), TransferStrategy::Buffered);
        assert_eq!(
            TransferStrategy::select(THRESHOLD, THRESHOLD),
            TransferStrategy::Buffered
        );
        assert_eq!(
            TransferStrategy::select(THRESHOLD + 1, THRESHOLD),
            TransferStrategy::Streamed
        );
    }

    #[tokio::test]
    async fn test_length_checked_reader_exact() {
        let mut out = Vec::new();
        let n = LengthCheckedReader::new(io::Cursor::new(vec![7u8; 100]), 100)
            .read_to_end(&mut out)
            .await
            .unwrap();
        assert_eq!(n, 100);
    }

    #[tokio::test]
    async fn test_length_checked_reader_short_body() {
        let mut out = Vec::new();
        let err = LengthCheckedReader::new(io::Cursor::new(vec![7u8; 99]), 100)
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_length_checked_reader_long_body() {
        let mut out = Vec::new();
        let err = LengthCheckedReader::new(io::Cursor::new(vec![7u8; 101]), 100)
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(out.len() <= 100, "kept {} bytes", out.len());
    }

    #[tokio::test]
    async fn test_overlong_read_leaves_buffer_untouched() {
        let mut reader = LengthCheckedReader::new(io::Cursor::new(vec![7u8; 64]), 10);
        let mut bytes = [0u8; 128];
        let mut buf = ReadBuf::new(&mut bytes);

        let err = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_read(cx, &mut buf))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(buf.filled().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_small_stream_stores_nothing() {
        let storage = RecordingStorage::new();
        let err = write_object(
            &storage,
            "t1/d.png",
            Payload::Streamed {
                reader: stream(vec![4u8; 250]),
                content_length: 200,
            },
            "image/png",
            &ObjectMetadata::new(),
            THRESHOLD,
        )
        .await
        .unwrap_err();

        match err {
            StorageError::IoError(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_small_stream_sent_buffered() {
        let storage = RecordingStorage::new();
        let (strategy, written) = write_object(
            &storage,
            "t1/a.png",
            Payload::Streamed {
                reader: stream(vec![1u8; 10]),
                content_length: 10,
            },
            "image/png",
            &ObjectMetadata::new(),
            THRESHOLD,
        )
        .await
        .unwrap();

        assert_eq!(strategy, TransferStrategy::Buffered);
        assert_eq!(written, 10);
        assert_eq!(storage.calls(), vec![Call::Put("t1/a.png".to_string())]);
        assert_eq!(storage.object("t1/a.png").unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_large_buffer_sent_streamed() {
        let storage = RecordingStorage::new();
        let data = Bytes::from(vec![2u8; THRESHOLD as usize + 1]);
        let (strategy, written) = write_object(
            &storage,
            "t1/b.mp3",
            Payload::Buffered(data),
            "audio/mpeg",
            &ObjectMetadata::new(),
            THRESHOLD,
        )
        .await
        .unwrap();

        assert_eq!(strategy, TransferStrategy::Streamed);
        assert_eq!(written, THRESHOLD + 1);
        assert_eq!(storage.calls(), vec![Call::PutStream("t1/b.mp3".to_string())]);
    }

    #[tokio::test]
    async fn test_truncated_stream_stores_nothing() {
        let storage = RecordingStorage::new();
        let err = write_object(
            &storage,
            "t1/c.mp3",
            Payload::Streamed {
                reader: stream(vec![3u8; 2000]),
                content_length: 4000,
            },
            "audio/mpeg",
            &ObjectMetadata::new(),
            THRESHOLD,
        )
        .await
        .unwrap_err();

        match err {
            StorageError::IoError(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(storage.object("t1/c.mp3").is_none());
    }

    #[test]
    fn test_provenance_metadata_is_ascii() {
        let principal = Principal::new("t1", "u1", Role::Member);
        let metadata =
            provenance_metadata(&principal, "épisode 1.mp3", Some(FileCategory::Audio));
        assert_eq!(metadata[METADATA_ORIGINAL_FILENAME], "%C3%A9pisode 1.mp3");
        assert_eq!(metadata[METADATA_UPLOADED_BY], "u1");
        assert_eq!(metadata[METADATA_TENANT_ID], "t1");
        assert_eq!(metadata[METADATA_CATEGORY], "audio");
    }
}

//! Streaming `multipart/form-data` encoding for single-file uploads.
//!
//! The encoded body is produced incrementally by a background task and handed
//! to the HTTP client through a bounded channel, so a file of any size is sent
//! without holding more than a few chunks in memory. The request's
//! content length is known up front: the envelope around the file is measured
//! by encoding it once with an empty payload.

use std::io::{self, Write};

use bytes::Bytes;
use futures_util::StreamExt;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::ArchiveError;

/// Form field linkding expects the uploaded file in.
pub const FILE_FIELD: &str = "file";

/// Chunks buffered between the encoder task and the HTTP body.
const CHANNEL_CAPACITY: usize = 8;

type Chunk = io::Result<Bytes>;

/// Headers and boundaries surrounding one file part.
#[derive(Debug, Clone)]
pub struct MultipartEnvelope {
    boundary: String,
    field_name: String,
    file_name: String,
    mime_type: String,
}

impl MultipartEnvelope {
    /// Create an envelope with a random boundary.
    #[must_use]
    pub fn new(field_name: &str, file_name: &str, mime_type: &str) -> Self {
        let boundary: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();
        Self::with_boundary(boundary, field_name, file_name, mime_type)
    }

    #[must_use]
    pub fn with_boundary(
        boundary: impl Into<String>,
        field_name: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Self {
        Self {
            boundary: boundary.into(),
            field_name: field_name.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write the opening boundary and part headers.
    ///
    /// The mime type is set explicitly instead of the usual
    /// `application/octet-stream` for file fields.
    pub fn write_part_header(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "--{}\r\n", self.boundary)?;
        write!(
            out,
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quotes(&self.field_name),
            escape_quotes(&self.file_name)
        )?;
        write!(out, "Content-Type: {}\r\n\r\n", self.mime_type)
    }

    /// Write the closing boundary that terminates the body.
    pub fn write_closing(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "\r\n--{}--\r\n", self.boundary)
    }

    /// Length of the body with a zero-length file.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Upload`] if encoding into memory fails.
    pub fn empty_length(&self) -> Result<u64, ArchiveError> {
        let mut sink = Vec::new();
        self.write_part_header(&mut sink)
            .and_then(|()| self.write_closing(&mut sink))
            .map_err(|e| ArchiveError::Upload(format!("failed to measure envelope: {e}")))?;
        Ok(sink.len() as u64)
    }

    /// Exact body length for a file of `file_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Upload`] if the envelope cannot be measured.
    pub fn content_length(&self, file_size: u64) -> Result<u64, ArchiveError> {
        Ok(self.empty_length()? + file_size)
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// An upload body being produced by a background encoder.
pub struct StreamingUpload {
    pub content_type: String,
    pub content_length: u64,
    pub body: reqwest::Body,
    pub encoder: Encoder,
}

impl StreamingUpload {
    /// Spawn the encoder for `file` and return the body that drains it.
    ///
    /// Exactly `file_size` bytes are copied from the file's current position.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Upload`] if the envelope cannot be measured.
    pub fn start(
        envelope: MultipartEnvelope,
        file: File,
        file_size: u64,
    ) -> Result<Self, ArchiveError> {
        let content_type = envelope.content_type();
        let content_length = envelope.content_length(file_size)?;
        let (rx, handle) = spawn_encoder(envelope, file, file_size);

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });

        Ok(Self {
            content_type,
            content_length,
            body: reqwest::Body::wrap_stream(stream),
            encoder: Encoder(handle),
        })
    }
}

/// Handle to the task writing an upload body.
pub struct Encoder(JoinHandle<Result<(), ArchiveError>>);

impl Encoder {
    /// Wait for the encoder to finish and report its outcome.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error, or [`ArchiveError::Upload`] if it panicked.
    pub async fn finish(self) -> Result<(), ArchiveError> {
        self.0
            .await
            .map_err(|e| ArchiveError::Upload(format!("encoder task failed: {e}")))?
    }

    /// Stop the encoder without waiting for it.
    pub fn abort(self) {
        self.0.abort();
    }
}

fn spawn_encoder(
    envelope: MultipartEnvelope,
    file: File,
    file_size: u64,
) -> (mpsc::Receiver<Chunk>, JoinHandle<Result<(), ArchiveError>>) {
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);
    let encoder = tokio::spawn(encode(envelope, file, file_size, tx));
    (rx, encoder)
}

/// Encode the whole body into `tx`.
///
/// On failure the error is also pushed into the channel so the HTTP body
/// fails instead of ending early.
async fn encode(
    envelope: MultipartEnvelope,
    file: File,
    file_size: u64,
    tx: mpsc::Sender<Chunk>,
) -> Result<(), ArchiveError> {
    let result = encode_inner(&envelope, file, file_size, &tx).await;

    if let Err(e) = &result {
        debug!(error = %e, "Aborting multipart body");
        let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
    }

    result
}

async fn encode_inner(
    envelope: &MultipartEnvelope,
    file: File,
    file_size: u64,
    tx: &mpsc::Sender<Chunk>,
) -> Result<(), ArchiveError> {
    let mut header = Vec::new();
    envelope
        .write_part_header(&mut header)
        .map_err(|e| ArchiveError::Upload(format!("failed to write part header: {e}")))?;
    send(tx, Bytes::from(header)).await?;

    let mut copied: u64 = 0;
    let mut chunks = ReaderStream::new(file.take(file_size));
    while let Some(chunk) = chunks.next().await {
        let chunk =
            chunk.map_err(|e| ArchiveError::Upload(format!("failed to read media file: {e}")))?;
        copied += chunk.len() as u64;
        send(tx, chunk).await?;
    }

    if copied != file_size {
        return Err(ArchiveError::Upload(format!(
            "media file ended after {copied} of {file_size} bytes"
        )));
    }

    let mut closing = Vec::new();
    envelope
        .write_closing(&mut closing)
        .map_err(|e| ArchiveError::Upload(format!("failed to write closing boundary: {e}")))?;
    send(tx, Bytes::from(closing)).await
}

async fn send(tx: &mpsc::Sender<Chunk>, chunk: Bytes) -> Result<(), ArchiveError> {
    tx.send(Ok(chunk))
        .await
        .map_err(|_| ArchiveError::Upload("request body was dropped before completion".to_string()))
}

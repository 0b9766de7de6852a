//! Upload operations for OneDrive.
//!
//! Empty files go through a single `PUT .../content` request. Everything else
//! goes through an upload session: the content is sent as consecutive
//! fragments, each declaring its range with `Content-Range`, and the response
//! to the final fragment carries the new item.
//!
//! # Example
//! ```no_run
//! use integrations_onedrive::{Address, NameConflictBehavior, OneDriveClient};
//!
//! # async fn example(client: OneDriveClient) -> Result<(), Box<dyn std::error::Error>> {
//! let file = tokio::fs::File::open("report.pdf").await?;
//! let size = file.metadata().await?.len();
//!
//! let item = client
//!     .uploads()
//!     .upload(&Address::root(), "report.pdf", NameConflictBehavior::Rename, file, size)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::address::{Address, AddressKind};
use crate::client::{ApiRequest, RequestExecutor};
use crate::errors::{OneDriveError, OneDriveResult, RequestError, UploadError};
use crate::services::ItemsService;
use crate::transport::HttpMethod;
use crate::types::{CreateSessionBody, Item, NameConflictBehavior, UploadSession};
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderValue, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Service for uploads.
#[derive(Clone)]
pub struct UploadService {
    executor: Arc<RequestExecutor>,
}

impl UploadService {
    /// Creates a new upload service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Uploads `size` bytes from `content` as `name` below `parent`.
    ///
    /// Zero-byte uploads use a simple upload; anything larger uses an upload
    /// session with fragments of at most the configured fragment size.
    ///
    /// A path-typed address names the target file itself rather than its
    /// parent, and is only accepted for session uploads.
    pub async fn upload<R>(
        &self,
        parent: &Address,
        name: &str,
        conflict_behavior: NameConflictBehavior,
        content: R,
        size: u64,
    ) -> OneDriveResult<Item>
    where
        R: AsyncRead + Unpin + Send,
    {
        if size == 0 {
            self.upload_simple(parent, name, conflict_behavior, content)
                .await
        } else {
            self.upload_session(parent, name, conflict_behavior, content, size)
                .await
        }
    }

    /// Creates an empty file with a single request.
    ///
    /// The conflict policy is applied locally: `fail` and `rename` list the
    /// parent's children first. Only id-addressed parents are supported.
    async fn upload_simple<R>(
        &self,
        parent: &Address,
        name: &str,
        conflict_behavior: NameConflictBehavior,
        mut content: R,
    ) -> OneDriveResult<Item>
    where
        R: AsyncRead + Unpin + Send,
    {
        if parent.kind() != AddressKind::Id {
            return Err(UploadError::NotSupported(
                "simple upload requires an id-addressed parent".to_string(),
            )
            .into());
        }

        let mut extra = [0u8; 1];
        if content.read(&mut extra).await.map_err(read_error)? != 0 {
            return Err(OneDriveError::invalid_state(
                "content is longer than the declared size of 0 bytes",
            ));
        }

        let name = self.resolve_name(parent, name, conflict_behavior).await?;

        let path = self
            .executor
            .render(&parent.subpath(&format!(":/{}:/content", name)));
        let item: Item = self
            .executor
            .execute(
                ApiRequest::path(HttpMethod::Put, path)
                    .bytes(Bytes::new())
                    .expect(&[StatusCode::OK, StatusCode::CREATED]),
            )
            .await?;

        info!(item_id = %item.id, name = %item.name, "Simple upload completed");
        Ok(item)
    }

    /// Uploads content through an upload session.
    pub async fn upload_session<R>(
        &self,
        parent: &Address,
        name: &str,
        conflict_behavior: NameConflictBehavior,
        content: R,
        size: u64,
    ) -> OneDriveResult<Item>
    where
        R: AsyncRead + Unpin + Send,
    {
        if size == 0 {
            return Err(UploadError::NotSupported(
                "upload sessions need at least one byte of content".to_string(),
            )
            .into());
        }

        let body = CreateSessionBody::new(self.executor.dialect(), name, conflict_behavior);
        let session = self.create_session(parent, &body).await?;

        let fragment_size = self.executor.config().max_fragment_size;
        let mut reader = FragmentReader::new(content);
        let mut uploaded = 0u64;

        while !reader.is_eof() {
            let start = uploaded;
            let remaining = size - uploaded;
            let last = remaining <= fragment_size;
            let part = if last { remaining } else { fragment_size };
            let end = start + part - 1;

            let fragment = reader.read_fragment(part).await.map_err(read_error)?;
            if (fragment.len() as u64) < part {
                return Err(OneDriveError::invalid_state(format!(
                    "content ended after {} of {} declared bytes",
                    start + fragment.len() as u64,
                    size
                )));
            }
            uploaded += part;

            if last {
                if !reader.probe_eof().await.map_err(read_error)? {
                    return Err(OneDriveError::invalid_state(format!(
                        "content is longer than the declared {} bytes",
                        size
                    )));
                }
                let item = self
                    .finish_fragment(&session, fragment, start, end, size)
                    .await?;
                info!(item_id = %item.id, size, "Session upload completed");
                return Ok(item);
            }

            self.append_fragment(&session, fragment, start, end, size)
                .await?;
        }

        Err(OneDriveError::invalid_state(
            "content ended before the final fragment was sent",
        ))
    }

    /// Opens an upload session.
    ///
    /// For id-addressed parents the session targets `body.name()` below the
    /// parent. A path-typed address is used as the target as is.
    pub async fn create_session(
        &self,
        parent: &Address,
        body: &CreateSessionBody,
    ) -> OneDriveResult<UploadSession> {
        let action = self.executor.dialect().create_session_action();
        let target = match parent.kind() {
            AddressKind::Id => parent.subpath(&format!(":/{}:/{}", body.name(), action)),
            AddressKind::Path => parent.subpath(&format!("/{}", action)),
        };
        let path = self.executor.render(&target);

        let session: UploadSession = self
            .executor
            .execute(
                ApiRequest::path(HttpMethod::Post, path)
                    .json(body)?
                    .expect(&[StatusCode::OK, StatusCode::PARTIAL_CONTENT]),
            )
            .await?;

        info!(
            name = %body.name(),
            conflict_behavior = %body.conflict_behavior(),
            expires = ?session.expiration_date_time,
            "Upload session created"
        );
        Ok(session)
    }

    /// Sends a non-final fragment covering `start..=end` of `total` bytes.
    pub async fn append_fragment(
        &self,
        session: &UploadSession,
        fragment: Bytes,
        start: u64,
        end: u64,
        total: u64,
    ) -> OneDriveResult<()> {
        debug!(start, end, total, "Uploading fragment");

        let request = fragment_request(session, fragment, start, end, total)?
            .expect(&[StatusCode::ACCEPTED]);
        self.executor.send(request).await?;
        Ok(())
    }

    /// Sends the final fragment and returns the uploaded item.
    pub async fn finish_fragment(
        &self,
        session: &UploadSession,
        fragment: Bytes,
        start: u64,
        end: u64,
        total: u64,
    ) -> OneDriveResult<Item> {
        debug!(start, end, total, "Uploading final fragment");

        self.executor
            .execute(
                fragment_request(session, fragment, start, end, total)?
                    .expect(&[StatusCode::OK, StatusCode::CREATED]),
            )
            .await
    }

    async fn resolve_name(
        &self,
        parent: &Address,
        name: &str,
        conflict_behavior: NameConflictBehavior,
    ) -> OneDriveResult<String> {
        if conflict_behavior == NameConflictBehavior::Replace {
            return Ok(name.to_string());
        }

        let children = ItemsService::new(self.executor.clone())
            .list_all_children(parent)
            .await?;
        let taken: HashSet<String> = children.into_iter().map(|item| item.name).collect();

        if !taken.contains(name) {
            return Ok(name.to_string());
        }

        if conflict_behavior == NameConflictBehavior::Fail {
            warn!(name = %name, "Upload target already exists");
            return Err(UploadError::NameConflict(name.to_string()).into());
        }

        let max_retries = self.executor.config().unused_filename_max_retries;
        let renamed = unused_filename(|candidate| taken.contains(candidate), name, max_retries)
            .ok_or_else(|| UploadError::RenameExhausted {
                name: name.to_string(),
                attempts: max_retries,
            })?;

        debug!(name = %name, renamed = %renamed, "Picked unused name");
        Ok(renamed)
    }
}

/// Finds a free variant of `name`.
///
/// Returns `name` itself when `exists` rejects it, then tries `stem 1.ext`,
/// `stem 2.ext` and so on up to `max_retries` candidates. Names without an
/// extension get the number appended.
pub fn unused_filename<F>(exists: F, name: &str, max_retries: u32) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if !exists(name) {
        return Some(name.to_string());
    }

    let (stem, extension) = match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    };

    (1..=max_retries)
        .map(|i| format!("{} {}{}", stem, i, extension))
        .find(|candidate| !exists(candidate))
}

fn fragment_request(
    session: &UploadSession,
    fragment: Bytes,
    start: u64,
    end: u64,
    total: u64,
) -> OneDriveResult<ApiRequest> {
    let range = HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, total)).map_err(
        |e| OneDriveError::Request(RequestError::InvalidHeader(format!("Invalid range: {}", e))),
    )?;

    Ok(ApiRequest::url(HttpMethod::Put, session.upload_url.as_str())
        .header(CONTENT_RANGE, range)
        .header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        )
        .bytes(fragment))
}

fn read_error(err: io::Error) -> OneDriveError {
    UploadError::Io(err.to_string()).into()
}

/// Reads fixed-size fragments from a stream, remembering when it ran dry.
struct FragmentReader<R> {
    inner: R,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FragmentReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, eof: false }
    }

    fn is_eof(&self) -> bool {
        self.eof
    }

    /// Reads up to `len` bytes. A short result means the stream ended.
    async fn read_fragment(&mut self, len: u64) -> io::Result<Bytes> {
        let capacity = usize::try_from(len).unwrap_or(usize::MAX);
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut limited = (&mut self.inner).take(len);

        loop {
            if limited.read_buf(&mut buffer).await? == 0 {
                break;
            }
        }

        if (buffer.len() as u64) < len {
            self.eof = true;
        }
        Ok(buffer.freeze())
    }

    /// Returns true if the stream has no bytes left.
    async fn probe_eof(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(true);
        }
        let mut byte = [0u8; 1];
        if self.inner.read(&mut byte).await? == 0 {
            self.eof = true;
        }
        Ok(self.eof)
    }
}

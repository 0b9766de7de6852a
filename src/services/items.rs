//! Item metadata and content operations.

use crate::address::Address;
use crate::client::{location, ApiRequest, RequestExecutor};
use crate::errors::{OneDriveError, OneDriveResult, RequestError, ResponseError};
use crate::pagination::PageIterator;
use crate::transport::{ByteStream, HttpMethod, StreamingResponse};
use crate::types::{ByteRange, Item, ItemCollectionPage, ItemCreateBody, ItemUpdateBody};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderValue, RANGE};
use reqwest::StatusCode;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// Service for item operations.
#[derive(Clone)]
pub struct ItemsService {
    executor: Arc<RequestExecutor>,
}

impl ItemsService {
    /// Creates a new items service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Gets item metadata.
    pub async fn get(&self, address: &Address) -> OneDriveResult<Item> {
        let path = self.executor.render(address);
        self.executor
            .execute(ApiRequest::path(HttpMethod::Get, path))
            .await
    }

    /// Checks whether an item exists.
    pub async fn exists(&self, address: &Address) -> OneDriveResult<bool> {
        let path = self.executor.render(address);
        let response = self
            .executor
            .send(
                ApiRequest::path(HttpMethod::Head, path)
                    .expect(&[StatusCode::OK, StatusCode::NOT_FOUND]),
            )
            .await?;
        Ok(response.status == StatusCode::OK)
    }

    /// Renames or moves an item.
    pub async fn update(&self, address: &Address, body: &ItemUpdateBody) -> OneDriveResult<Item> {
        let path = self.executor.render(address);
        let item: Item = self
            .executor
            .execute(ApiRequest::path(HttpMethod::Patch, path).json(body)?)
            .await?;

        debug!(item_id = %item.id, name = %item.name, "Item updated");
        Ok(item)
    }

    /// Deletes an item.
    pub async fn delete(&self, address: &Address) -> OneDriveResult<()> {
        let path = self.executor.render(address);
        self.executor
            .send(ApiRequest::path(HttpMethod::Delete, path).expect(&[StatusCode::NO_CONTENT]))
            .await?;

        info!(address = %address, "Item deleted");
        Ok(())
    }

    /// Creates a child item, typically a folder.
    pub async fn create(&self, parent: &Address, body: &ItemCreateBody) -> OneDriveResult<Item> {
        let path = self.executor.render(&parent.subpath("/children"));
        let item: Item = self
            .executor
            .execute(
                ApiRequest::path(HttpMethod::Post, path)
                    .json(body)?
                    .expect(&[StatusCode::CREATED]),
            )
            .await?;

        info!(item_id = %item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Lists one page of children.
    ///
    /// A non-empty `link` (a previous page's next link) is requested verbatim;
    /// otherwise the first page of `address`'s children is fetched.
    pub async fn list_children(
        &self,
        address: &Address,
        link: Option<&str>,
    ) -> OneDriveResult<ItemCollectionPage> {
        let request = match link.filter(|l| !l.is_empty()) {
            Some(link) => ApiRequest::url(HttpMethod::Get, link),
            None => ApiRequest::path(
                HttpMethod::Get,
                self.executor.render(&address.subpath("/children")),
            ),
        };
        self.executor.execute(request).await
    }

    /// Lists every child, following next links until the collection ends.
    pub async fn list_all_children(&self, address: &Address) -> OneDriveResult<Vec<Item>> {
        let mut pages = PageIterator::new(|link: Option<String>| {
            let service = self.clone();
            let address = address.clone();
            async move { service.list_children(&address, link.as_deref()).await }
        })
        .stop_on_empty_page();

        let items = pages.collect_all().await?;
        debug!(address = %address, count = items.len(), "Listed children");
        Ok(items)
    }

    /// Downloads item content, optionally limited to a byte range.
    ///
    /// The service usually answers with a redirect to a pre-authenticated
    /// download URL. That single redirect is followed without the bearer token.
    pub async fn content(
        &self,
        address: &Address,
        range: Option<ByteRange>,
    ) -> OneDriveResult<ContentStream> {
        let path = self.executor.render(&address.subpath("/content"));
        let success = content_status(range);

        let mut accepted = REDIRECT_STATUSES.to_vec();
        accepted.push(success);
        let request = with_range(
            ApiRequest::path(HttpMethod::Get, path)
                .no_redirects()
                .expect(&accepted),
            range,
        )?;

        let response = self.executor.send_streaming(request).await?;
        if !response.status.is_redirection() {
            return Ok(ContentStream::new(response));
        }

        let target = location(&response.headers).ok_or_else(|| {
            OneDriveError::Response(ResponseError::MissingHeader(
                "Location on content redirect".to_string(),
            ))
        })?;
        drop(response);

        debug!(address = %address, "Following content redirect");

        let request = with_range(
            ApiRequest::url(HttpMethod::Get, target)
                .anonymous()
                .no_redirects()
                .expect(&[success]),
            range,
        )?;
        let response = self.executor.send_streaming(request).await?;
        Ok(ContentStream::new(response))
    }
}

fn content_status(range: Option<ByteRange>) -> StatusCode {
    if range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    }
}

fn with_range(request: ApiRequest, range: Option<ByteRange>) -> OneDriveResult<ApiRequest> {
    match range {
        Some(range) => {
            let value = HeaderValue::from_str(&range.header_value()).map_err(|e| {
                OneDriveError::Request(RequestError::InvalidHeader(format!(
                    "Invalid range: {}",
                    e
                )))
            })?;
            Ok(request.header(RANGE, value))
        }
        None => Ok(request),
    }
}

/// Downloaded item content.
pub struct ContentStream {
    status: StatusCode,
    content_length: Option<u64>,
    body: ByteStream,
}

impl ContentStream {
    fn new(response: StreamingResponse) -> Self {
        Self {
            status: response.status,
            content_length: response.content_length,
            body: response.body,
        }
    }

    /// Declared body length, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns true if the server answered with a partial range.
    pub fn is_partial(&self) -> bool {
        self.status == StatusCode::PARTIAL_CONTENT
    }

    /// The body as a stream of chunks.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }

    /// The body as an `AsyncRead`.
    pub fn into_async_read(self) -> impl AsyncRead + Send + Unpin {
        StreamReader::new(
            self.body
                .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))),
        )
    }

    /// Reads the whole body into memory.
    pub async fn bytes(self) -> OneDriveResult<Bytes> {
        Ok(self.body.collect_bytes().await?)
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

//! Server-side asynchronous copy.
//!
//! A copy request is accepted with `202 Accepted` and a monitor URL in the
//! `Location` header. The monitor is polled until it reports an outcome.
//!
//! The two dialects poll differently. The legacy monitor is authenticated and
//! answers `303 See Other` pointing at the new item once done. The Graph
//! monitor is pre-authenticated, always answers with a status document and
//! never hands out the new item, so a completed Graph copy surfaces as
//! [`CopyError::CompletedNoItem`].

use crate::address::Address;
use crate::client::{decode, location, ApiRequest, RequestExecutor};
use crate::errors::{CopyError, OneDriveError, OneDriveResult, ResponseError};
use crate::transport::HttpMethod;
use crate::types::{AsyncOperationState, AsyncOperationStatus, CopyStatus, Item, ItemCopyBody};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Service for copy operations.
#[derive(Clone)]
pub struct CopyService {
    executor: Arc<RequestExecutor>,
}

impl CopyService {
    /// Creates a new copy service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Starts copying an item and returns the monitor URL.
    pub async fn copy(&self, address: &Address, body: &ItemCopyBody) -> OneDriveResult<String> {
        let path = self
            .executor
            .render(&address.subpath(self.executor.dialect().copy_action()));

        let response = self
            .executor
            .send(
                ApiRequest::path(HttpMethod::Post, path)
                    .header(
                        HeaderName::from_static("prefer"),
                        HeaderValue::from_static("respond-async"),
                    )
                    .json(body)?
                    .expect(&[StatusCode::ACCEPTED]),
            )
            .await?;

        let monitor = location(&response.headers)
            .ok_or(OneDriveError::Copy(CopyError::MissingMonitorUrl))?;

        info!(address = %address, "Copy accepted");
        Ok(monitor)
    }

    /// Polls a copy monitor once.
    pub async fn copy_status(&self, monitor_url: &str) -> OneDriveResult<CopyStatus> {
        if self.executor.dialect().is_graph() {
            let response = self
                .executor
                .send(
                    ApiRequest::url(HttpMethod::Get, monitor_url)
                        .anonymous()
                        .no_redirects()
                        .expect(&[StatusCode::OK, StatusCode::ACCEPTED]),
                )
                .await?;
            return Ok(CopyStatus::Pending(decode(&response.body)?));
        }

        let response = self
            .executor
            .send(
                ApiRequest::url(HttpMethod::Get, monitor_url)
                    .no_redirects()
                    .expect(&[StatusCode::ACCEPTED, StatusCode::SEE_OTHER]),
            )
            .await?;

        if response.status == StatusCode::ACCEPTED {
            return Ok(CopyStatus::Pending(decode(&response.body)?));
        }

        let item_url = location(&response.headers).ok_or_else(|| {
            OneDriveError::Response(ResponseError::MissingHeader(
                "Location on completed copy".to_string(),
            ))
        })?;
        let item: Item = self
            .executor
            .execute(ApiRequest::url(HttpMethod::Get, item_url))
            .await?;
        Ok(CopyStatus::Done(item))
    }

    /// Polls a copy monitor until the copy finishes, fails or the poll budget
    /// runs out.
    pub async fn copy_await(&self, monitor_url: &str) -> OneDriveResult<Item> {
        self.poll_until_done(monitor_url, None).await
    }

    /// Like [`copy_await`](Self::copy_await), returning
    /// [`CopyError::Cancelled`] as soon as `cancel` fires.
    pub async fn copy_await_with_cancellation(
        &self,
        monitor_url: &str,
        cancel: &CancellationToken,
    ) -> OneDriveResult<Item> {
        self.poll_until_done(monitor_url, Some(cancel)).await
    }

    async fn poll_until_done(
        &self,
        monitor_url: &str,
        cancel: Option<&CancellationToken>,
    ) -> OneDriveResult<Item> {
        let config = self.executor.config();
        let interval = config.copy_poll_interval;
        let max_attempts = config.copy_poll_max_attempts;
        let is_graph = config.dialect.is_graph();

        for attempt in 1..=max_attempts {
            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            debug!(attempt, "Copy polling cancelled");
                            return Err(CopyError::Cancelled.into());
                        }
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                None => tokio::time::sleep(interval).await,
            }

            match self.copy_status(monitor_url).await? {
                CopyStatus::Done(item) => {
                    info!(item_id = %item.id, attempt, "Copy finished");
                    return Ok(item);
                }
                CopyStatus::Pending(status) => {
                    if let Some(err) = terminal_error(&status, is_graph) {
                        warn!(status = ?status.status, attempt, "Copy ended without an item");
                        return Err(err.into());
                    }
                    debug!(
                        status = ?status.status,
                        percentage = status.percentage_complete,
                        attempt,
                        "Copy in progress"
                    );
                }
            }
        }

        Err(CopyError::Timeout {
            attempts: max_attempts,
        }
        .into())
    }
}

fn terminal_error(status: &AsyncOperationStatus, is_graph: bool) -> Option<CopyError> {
    if status.status.is_failed() {
        return Some(CopyError::Failed(format!(
            "operation {} reported {:?}",
            status.operation.as_deref().unwrap_or("copy"),
            status.status
        )));
    }
    if is_graph && status.status == AsyncOperationState::Completed {
        return Some(CopyError::CompletedNoItem {
            resource_id: status.resource_id.clone(),
        });
    }
    None
}

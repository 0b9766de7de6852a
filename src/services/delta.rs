//! Change enumeration.
//!
//! A delta enumeration walks every change below an item. The final page hands
//! out a cursor (`@delta.token`, also embedded in `@odata.deltaLink`) that a
//! later enumeration resumes from. When the service rejects a cursor the error
//! reports [`OneDriveError::is_resync_required`](crate::OneDriveError::is_resync_required)
//! and the caller restarts from an empty token.

use crate::address::Address;
use crate::client::{ApiRequest, RequestExecutor};
use crate::errors::OneDriveResult;
use crate::pagination::{PageIterator, Paginated};
use crate::transport::HttpMethod;
use crate::types::{DeltaPage, DeltaResult};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Service for delta enumeration.
#[derive(Clone)]
pub struct DeltaService {
    executor: Arc<RequestExecutor>,
}

impl DeltaService {
    /// Creates a new delta service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Fetches one page of changes.
    ///
    /// A non-empty `link` is requested verbatim. Otherwise the first page is
    /// requested, resuming from `token` when it is non-empty.
    pub async fn delta(
        &self,
        address: &Address,
        link: Option<&str>,
        token: Option<&str>,
    ) -> OneDriveResult<DeltaPage> {
        let request = match link.filter(|l| !l.is_empty()) {
            Some(link) => ApiRequest::url(HttpMethod::Get, link),
            None => {
                let path = self
                    .executor
                    .render(&address.subpath(self.executor.dialect().delta_action()));
                let request = ApiRequest::path(HttpMethod::Get, path);
                match token.filter(|t| !t.is_empty()) {
                    Some(token) => request.query("token", token),
                    None => request,
                }
            }
        };

        self.executor.execute(request).await
    }

    /// Walks every delta page and returns the concatenated items together
    /// with the cursor of the final page.
    pub async fn list_all_delta(
        &self,
        address: &Address,
        token: Option<&str>,
    ) -> OneDriveResult<DeltaResult> {
        let mut pages = PageIterator::new(|link: Option<String>| {
            let service = self.clone();
            let address = address.clone();
            let token = token.map(str::to_string);
            async move {
                service
                    .delta(&address, link.as_deref(), token.as_deref())
                    .await
            }
        });

        let mut result = DeltaResult::default();
        let mut page_count = 0usize;
        while let Some(page) = pages.next_page().await? {
            page_count += 1;
            if page.token.is_some() {
                result.token = page.token.clone();
            }
            if page.delta_link.is_some() {
                result.delta_link = page.delta_link.clone();
            }
            result.items.extend(page.into_items());
        }

        if result.token.is_none() {
            result.token = result.delta_link.as_deref().and_then(token_from_link);
        }

        debug!(
            address = %address,
            pages = page_count,
            items = result.items.len(),
            "Delta enumeration complete"
        );
        Ok(result)
    }
}

/// Graph only carries the cursor inside the delta link's `token` parameter.
fn token_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let token = url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned());
    token
}

//! Drive metadata service.

use crate::client::{ApiRequest, RequestExecutor};
use crate::errors::OneDriveResult;
use crate::transport::HttpMethod;
use crate::types::Drive;
use std::sync::Arc;

/// Service for drive-level operations.
#[derive(Clone)]
pub struct DrivesService {
    executor: Arc<RequestExecutor>,
}

impl DrivesService {
    /// Creates a new drives service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Gets the configured drive: the user's default drive, or the drive
    /// named by the configured drive id on Graph.
    pub async fn get(&self) -> OneDriveResult<Drive> {
        let config = self.executor.config();
        let path = config.dialect.drive_path(&config.drive_id);
        self.executor
            .execute(ApiRequest::path(HttpMethod::Get, path))
            .await
    }
}

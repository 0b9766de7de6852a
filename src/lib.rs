//! OneDrive Integration Module
//!
//! This module provides a type-safe async client for the drive-items API of
//! OneDrive. It speaks both the legacy OneDrive API and Microsoft Graph, and
//! refreshes OAuth2 tokens on its own.
//!
//! # Features
//!
//! - **Item Operations**: Get, probe, update, move, delete items and create folders
//! - **Listing**: Follow `@odata.nextLink` pages across a folder's children
//! - **Download Streaming**: Ranged downloads through pre-authenticated redirects
//! - **Uploads**: Simple uploads with name conflict handling, and fragmented session uploads
//! - **Copy**: Server-side copies with monitor polling and cancellation
//! - **Change Tracking**: Delta enumeration with resumable cursors
//! - **Authentication**: OAuth2 refresh-token flow with a persistence callback
//!
//! # Example
//!
//! ```no_run
//! use integrations_onedrive::{
//!     Address, Dialect, OAuthCredentials, OneDriveAuth, OneDriveClient, OneDriveConfig,
//!     TokenState,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = OneDriveAuth::new(
//!     OAuthCredentials::new("client_id", "client_secret", "https://localhost/callback"),
//!     TokenState::new("access", "refresh", chrono::Utc::now()),
//!     Dialect::Graph,
//! )?;
//!
//! let config = OneDriveConfig::builder()
//!     .auth_provider(auth)
//!     .dialect(Dialect::Graph)
//!     .build()?;
//!
//! let client = OneDriveClient::new(config)?;
//!
//! for item in client.items().list_all_children(&Address::root()).await? {
//!     println!("{}: {}", item.name, item.id);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Core modules
pub mod address;
pub mod auth;
pub mod client;
pub mod config;
pub mod dialect;
pub mod errors;
pub mod pagination;
pub mod services;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use address::{Address, AddressKind};
pub use auth::{AuthProvider, OAuthCredentials, OneDriveAuth, TokenState};
pub use client::{OneDriveClient, OneDriveClientBuilder};
pub use config::{OneDriveConfig, OneDriveConfigBuilder};
pub use dialect::Dialect;
pub use errors::{OneDriveError, OneDriveResult};
pub use services::{ContentStream, CopyService, DeltaService, DrivesService, ItemsService, UploadService};
pub use types::{ByteRange, DeltaResult, Item, ItemReference, NameConflictBehavior};

/// Prelude module with commonly used types and traits.
///
/// ```no_run
/// use integrations_onedrive::prelude::*;
/// ```
pub mod prelude {
    // Client
    pub use crate::client::{OneDriveClient, OneDriveClientBuilder};

    // Configuration
    pub use crate::config::{OneDriveConfig, OneDriveConfigBuilder};
    pub use crate::dialect::Dialect;

    // Authentication
    pub use crate::auth::{AuthProvider, OAuthCredentials, OneDriveAuth, TokenState};

    // Services
    pub use crate::services::{
        ContentStream, CopyService, DeltaService, DrivesService, ItemsService, UploadService,
    };

    // Common types
    pub use crate::address::Address;
    pub use crate::types::{
        ByteRange, CopyStatus, DeltaPage, DeltaResult, Drive, Item, ItemCollectionPage,
        ItemCopyBody, ItemCreateBody, ItemReference, ItemUpdateBody, NameConflictBehavior,
        UploadSession,
    };

    // Errors
    pub use crate::errors::{OneDriveError, OneDriveResult};

    // Pagination
    pub use crate::pagination::{PageIterator, Paginated};
}

//! Service dialects.
//!
//! OneDrive is reachable through two API surfaces that share item shapes but
//! differ in endpoint names, base URLs and how copy monitors are polled.

use std::fmt;

/// Base URL of the legacy OneDrive API.
pub const LEGACY_BASE_URL: &str = "https://api.onedrive.com/v1.0";

/// Base URL of Microsoft Graph.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Token endpoint of the legacy OneDrive API.
pub const LEGACY_TOKEN_URL: &str = "https://login.live.com/oauth20_token.srf";

/// Token endpoint of Microsoft Graph.
pub const GRAPH_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// The API surface a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// `api.onedrive.com`.
    #[default]
    Legacy,
    /// Microsoft Graph.
    Graph,
}

impl Dialect {
    /// Returns true for Microsoft Graph.
    pub fn is_graph(self) -> bool {
        matches!(self, Dialect::Graph)
    }

    /// Default API base URL.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Dialect::Legacy => LEGACY_BASE_URL,
            Dialect::Graph => GRAPH_BASE_URL,
        }
    }

    /// Default OAuth2 token endpoint.
    pub fn token_url(self) -> &'static str {
        match self {
            Dialect::Legacy => LEGACY_TOKEN_URL,
            Dialect::Graph => GRAPH_TOKEN_URL,
        }
    }

    /// Path of the drive resource.
    ///
    /// Graph scopes to an explicit drive when `drive_id` is set and to the
    /// signed-in user's drive otherwise.
    pub fn drive_path(self, drive_id: &str) -> String {
        match self {
            Dialect::Legacy => "/drive".to_string(),
            Dialect::Graph if drive_id.is_empty() => "/me/drive".to_string(),
            Dialect::Graph => format!("/drives/{}", drive_id),
        }
    }

    /// Item action starting an asynchronous copy.
    pub fn copy_action(self) -> &'static str {
        match self {
            Dialect::Legacy => "/action.copy",
            Dialect::Graph => "/copy",
        }
    }

    /// Item action enumerating changes.
    pub fn delta_action(self) -> &'static str {
        match self {
            Dialect::Legacy => "/view.delta",
            Dialect::Graph => "/delta",
        }
    }

    /// Item action opening an upload session.
    pub fn create_session_action(self) -> &'static str {
        match self {
            Dialect::Legacy => "upload.createSession",
            Dialect::Graph => "createUploadSession",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy => write!(f, "legacy"),
            Dialect::Graph => write!(f, "graph"),
        }
    }
}

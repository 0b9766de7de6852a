//! Type definitions for the OneDrive API.

use crate::dialect::Dialect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A file or folder in a drive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item ID.
    #[serde(default)]
    pub id: String,

    /// Item name.
    #[serde(default)]
    pub name: String,

    /// Size in bytes. Folders report the size of their contents.
    #[serde(default)]
    pub size: u64,

    /// Entity tag.
    #[serde(rename = "eTag", skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,

    /// Content tag.
    #[serde(rename = "cTag", skip_serializing_if = "Option::is_none")]
    pub c_tag: Option<String>,

    /// Item description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation time on the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,

    /// Last modification time on the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,

    /// Creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<IdentitySet>,

    /// Last modifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<IdentitySet>,

    /// Parent folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ItemReference>,

    /// Link to view in a browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,

    /// Present when the item was deleted (delta results only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeletedFacet>,

    /// Present on files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,

    /// Client-side timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_system_info: Option<FileSystemInfo>,

    /// Present on folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderFacet>,

    /// Short-lived pre-authenticated download URL.
    #[serde(
        rename = "@microsoft.graph.downloadUrl",
        alias = "@content.downloadUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,
}

impl Item {
    /// Returns true if the item is a folder.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    /// Returns true if the item is a file.
    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }

    /// Returns true if the item was reported as deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

/// Reference to an item, usually a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    /// Drive ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,

    /// Item ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Path below the drive root, e.g. `/drive/root:/Documents`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ItemReference {
    /// Reference by item id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Reference by path.
    pub fn by_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Sets the drive id.
    pub fn in_drive(mut self, drive_id: impl Into<String>) -> Self {
        self.drive_id = Some(drive_id.into());
        self
    }
}

/// Actors involved in a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySet {
    /// Application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Identity>,

    /// Device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Identity>,

    /// User.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

/// A single actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Timestamps as reported by the client that wrote the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemInfo {
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,

    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

/// Folder facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    /// Number of direct children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u64>,
}

/// File facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    /// Content hashes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,

    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Content hashes. Which ones are present depends on the drive type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hashes {
    /// CRC32, little-endian hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc32_hash: Option<String>,

    /// SHA1, hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,

    /// QuickXorHash, base64.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_xor_hash: Option<String>,
}

/// Deleted facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFacet {
    /// Deletion state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A drive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    /// Drive ID.
    #[serde(default)]
    pub id: String,

    /// `personal`, `business` or `documentLibrary`.
    #[serde(default)]
    pub drive_type: String,

    /// Owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<IdentitySet>,

    /// Storage quota.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<Quota>,
}

/// Storage quota in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Bytes in the recycle bin.
    #[serde(default)]
    pub deleted: u64,
    /// Bytes left.
    #[serde(default)]
    pub remaining: u64,
    /// `normal`, `nearing`, `critical` or `exceeded`.
    #[serde(default)]
    pub state: String,
    /// Total bytes.
    #[serde(default)]
    pub total: u64,
    /// Bytes used.
    #[serde(default)]
    pub used: u64,
}

/// PATCH body for renaming or moving an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdateBody {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ItemReference>,
}

impl ItemUpdateBody {
    /// Renames the item.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Moves the item below another parent.
    pub fn move_to(parent: ItemReference) -> Self {
        Self {
            parent_reference: Some(parent),
            ..Default::default()
        }
    }
}

/// POST body for creating a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemCreateBody {
    /// Folder name.
    pub name: String,

    /// Marks the new item as a folder.
    pub folder: FolderFacet,
}

impl ItemCreateBody {
    /// A new folder with the given name.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: FolderFacet::default(),
        }
    }
}

/// POST body for copying an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCopyBody {
    /// Name of the copy. Defaults to the source name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Destination folder. Defaults to the source's parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ItemReference>,
}

/// One page of a children listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemCollectionPage {
    /// Items on this page.
    #[serde(default)]
    pub value: Vec<Item>,

    /// Link to the next page.
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// One page of a delta enumeration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaPage {
    /// Changed items on this page.
    #[serde(default)]
    pub value: Vec<Item>,

    /// Link to the next page.
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,

    /// Link to resume from after the last page.
    #[serde(rename = "@odata.deltaLink")]
    pub delta_link: Option<String>,

    /// Cursor to resume from.
    #[serde(rename = "@delta.token")]
    pub token: Option<String>,
}

/// Result of enumerating all delta pages.
#[derive(Debug, Clone, Default)]
pub struct DeltaResult {
    /// Items from every page, in page order.
    pub items: Vec<Item>,

    /// Cursor from the final page.
    pub token: Option<String>,

    /// Delta link from the final page.
    pub delta_link: Option<String>,
}

/// Resumable upload session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Absolute URL accepting fragment PUTs.
    pub upload_url: String,

    /// Session expiry.
    pub expiration_date_time: Option<DateTime<Utc>>,

    /// Ranges the service still expects, e.g. `["0-"]`.
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// What the service does when the target name is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameConflictBehavior {
    /// Fail the request.
    #[default]
    Fail,
    /// Replace the existing item.
    Replace,
    /// Pick a free name.
    Rename,
}

impl NameConflictBehavior {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            NameConflictBehavior::Fail => "fail",
            NameConflictBehavior::Replace => "replace",
            NameConflictBehavior::Rename => "rename",
        }
    }
}

impl fmt::Display for NameConflictBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body for creating an upload session.
///
/// The legacy API names the item in the body. Graph carries the name in the
/// request path, so its descriptor only holds the conflict behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSessionBody {
    /// Legacy API descriptor.
    Legacy {
        /// Target name.
        name: String,
        /// Conflict behavior.
        conflict_behavior: NameConflictBehavior,
    },
    /// Graph descriptor.
    Graph {
        /// Target name.
        name: String,
        /// Conflict behavior.
        conflict_behavior: NameConflictBehavior,
    },
}

impl CreateSessionBody {
    /// Builds the descriptor for a dialect.
    pub fn new(
        dialect: Dialect,
        name: impl Into<String>,
        conflict_behavior: NameConflictBehavior,
    ) -> Self {
        let name = name.into();
        match dialect {
            Dialect::Legacy => CreateSessionBody::Legacy {
                name,
                conflict_behavior,
            },
            Dialect::Graph => CreateSessionBody::Graph {
                name,
                conflict_behavior,
            },
        }
    }

    /// Target name.
    pub fn name(&self) -> &str {
        match self {
            CreateSessionBody::Legacy { name, .. } | CreateSessionBody::Graph { name, .. } => name,
        }
    }

    /// Conflict behavior.
    pub fn conflict_behavior(&self) -> NameConflictBehavior {
        match self {
            CreateSessionBody::Legacy {
                conflict_behavior, ..
            }
            | CreateSessionBody::Graph {
                conflict_behavior, ..
            } => *conflict_behavior,
        }
    }
}

impl Serialize for CreateSessionBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Envelope<T> {
            item: T,
        }

        #[derive(Serialize)]
        struct LegacyItem<'a> {
            #[serde(rename = "@name.conflictBehavior")]
            conflict_behavior: NameConflictBehavior,
            name: &'a str,
        }

        #[derive(Serialize)]
        struct GraphItem {
            #[serde(rename = "@microsoft.graph.conflictBehavior")]
            conflict_behavior: NameConflictBehavior,
        }

        match self {
            CreateSessionBody::Legacy {
                name,
                conflict_behavior,
            } => Envelope {
                item: LegacyItem {
                    conflict_behavior: *conflict_behavior,
                    name,
                },
            }
            .serialize(serializer),
            CreateSessionBody::Graph {
                conflict_behavior, ..
            } => Envelope {
                item: GraphItem {
                    conflict_behavior: *conflict_behavior,
                },
            }
            .serialize(serializer),
        }
    }
}

/// Progress report of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncOperationStatus {
    /// Operation type, e.g. `ItemCopy`.
    pub operation: Option<String>,

    /// Completion percentage.
    #[serde(default)]
    pub percentage_complete: f64,

    /// Current state.
    pub status: AsyncOperationState,

    /// ID of the resulting item, when the service reports it.
    pub resource_id: Option<String>,
}

/// States of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AsyncOperationState {
    /// Queued.
    NotStarted,
    /// Running.
    InProgress,
    /// Finished.
    Completed,
    /// Updating.
    Updating,
    /// Failed.
    Failed,
    /// Delete queued.
    DeletePending,
    /// Delete failed.
    DeleteFailed,
    /// Waiting.
    Waiting,
    /// A state this library does not know.
    #[serde(other)]
    Unknown,
}

impl AsyncOperationState {
    /// Returns true if the operation reached a failure state.
    pub fn is_failed(self) -> bool {
        matches!(
            self,
            AsyncOperationState::Failed | AsyncOperationState::DeleteFailed
        )
    }
}

/// Outcome of one copy status poll.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyStatus {
    /// The copy has not produced an item yet.
    Pending(AsyncOperationStatus),
    /// The copy finished and produced this item.
    Done(Item),
}

/// Inclusive byte range for partial downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte.
    pub start: u64,
    /// Last byte, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Creates a range covering `start..=end`.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered.
    pub fn byte_count(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    /// `Range` header value.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

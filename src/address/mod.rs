//! Item addressing.
//!
//! An [`Address`] names an item either by its stable id or by its path below
//! the drive root. Addresses are stored in the legacy shape (`/drive/...`) and
//! rendered for a dialect and drive scope when a request is built.

use crate::dialect::Dialect;
use std::fmt;

const DRIVE_PREFIX: &str = "/drive";

/// How an address locates its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// By item id (`/drive/items/{id}`).
    Id,
    /// By path (`/drive/root:{path}:`).
    Path,
}

/// Immutable reference to an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    address: String,
    kind: AddressKind,
}

impl Address {
    /// The drive root.
    pub fn root() -> Self {
        Self {
            address: format!("{}/items/root", DRIVE_PREFIX),
            kind: AddressKind::Id,
        }
    }

    /// An item by id.
    pub fn by_id(id: impl AsRef<str>) -> Self {
        Self {
            address: format!("{}/items/{}", DRIVE_PREFIX, id.as_ref()),
            kind: AddressKind::Id,
        }
    }

    /// An item by path, normalized with [`normalize_path`].
    pub fn by_path(path: impl AsRef<str>) -> Self {
        Self {
            address: format!("{}/root:{}:", DRIVE_PREFIX, normalize_path(path.as_ref())),
            kind: AddressKind::Path,
        }
    }

    /// Appends a suffix to the address. The kind is kept.
    pub fn subpath(&self, suffix: &str) -> Self {
        Self {
            address: format!("{}{}", self.address, suffix),
            kind: self.kind,
        }
    }

    /// The address in its stored, dialect-neutral form.
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// How the address locates its item.
    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    /// Returns true for path-typed addresses.
    pub fn is_path(&self) -> bool {
        self.kind == AddressKind::Path
    }

    /// Renders the request path for a dialect and drive scope.
    pub fn render(&self, dialect: Dialect, drive_id: &str) -> String {
        let rest = self
            .address
            .strip_prefix(DRIVE_PREFIX)
            .unwrap_or(&self.address);
        format!("{}{}", dialect.drive_path(drive_id), rest)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Cleans a slash-separated path and roots it at `/`.
///
/// Repeated slashes collapse, `.` segments drop and `..` removes the previous
/// segment without climbing above the root. The result never ends with a slash
/// unless it is the root itself, so the function is idempotent.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

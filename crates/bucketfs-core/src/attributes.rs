//! Attribute snapshots for objects and virtual directories.
//!
//! A snapshot is a point-in-time copy of an object's metadata in one of two
//! views. The POSIX-extended view is a superset of the basic view for the
//! same object, which is why a POSIX fetch warms both cache entries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::FsError;
use crate::store::{Acl, AclPermission, ObjectMeta};

/// Which attribute view a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Size, timestamps, file type.
    Basic,
    /// Basic plus owner, group and permissions.
    #[serde(rename = "posix")]
    PosixExtended,
}

impl AttributeKind {
    /// Both kinds, basic first.
    pub const ALL: [AttributeKind; 2] = [AttributeKind::Basic, AttributeKind::PosixExtended];

    /// Tag appended to cache keys and used as the attribute-map view name.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::PosixExtended => "posix",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AttributeKind {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "posix" => Ok(Self::PosixExtended),
            other => Err(FsError::unsupported(format!("attribute view {other:?}"))),
        }
    }
}

/// POSIX permission bits. The store only knows owners, so only the owner
/// bits are ever produced from ACLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PosixPermission {
    OwnerRead,
    OwnerWrite,
    OwnerExecute,
    GroupRead,
    GroupWrite,
    GroupExecute,
    OthersRead,
    OthersWrite,
    OthersExecute,
}

impl PosixPermission {
    const ORDERED: [PosixPermission; 9] = [
        Self::OwnerRead,
        Self::OwnerWrite,
        Self::OwnerExecute,
        Self::GroupRead,
        Self::GroupWrite,
        Self::GroupExecute,
        Self::OthersRead,
        Self::OthersWrite,
        Self::OthersExecute,
    ];

    fn symbol(self) -> char {
        match self {
            Self::OwnerRead | Self::GroupRead | Self::OthersRead => 'r',
            Self::OwnerWrite | Self::GroupWrite | Self::OthersWrite => 'w',
            Self::OwnerExecute | Self::GroupExecute | Self::OthersExecute => 'x',
        }
    }

    /// Owner bits granted by a single ACL permission.
    ///
    /// `READ_ACP` reads as owner read and `WRITE_ACP` as owner execute.
    pub fn from_acl(permission: AclPermission) -> &'static [PosixPermission] {
        match permission {
            AclPermission::FullControl => &[Self::OwnerRead, Self::OwnerWrite, Self::OwnerExecute],
            AclPermission::Write => &[Self::OwnerWrite],
            AclPermission::Read | AclPermission::ReadAcp => &[Self::OwnerRead],
            AclPermission::WriteAcp => &[Self::OwnerExecute],
        }
    }
}

/// Union of the owner bits for every grant in `acl`.
pub fn permissions_from_acl(acl: &Acl) -> BTreeSet<PosixPermission> {
    acl.grants
        .iter()
        .flat_map(|grant| PosixPermission::from_acl(grant.permission))
        .copied()
        .collect()
}

/// Renders permissions in `ls -l` form, e.g. `rwx------`.
pub fn permissions_to_string(permissions: &BTreeSet<PosixPermission>) -> String {
    PosixPermission::ORDERED
        .iter()
        .map(|p| if permissions.contains(p) { p.symbol() } else { '-' })
        .collect()
}

/// Point-in-time view of an object's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    pub kind: AttributeKind,
    /// Key the attributes were read from (`dir/` for directory markers).
    pub file_key: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
    pub is_directory: bool,
    /// A key ending in `/` is reported as both a directory and a regular file.
    pub is_regular_file: bool,
    /// PosixExtended only.
    pub permissions: Option<BTreeSet<PosixPermission>>,
    /// PosixExtended only, `"<id>:<display name>"`.
    pub owner: Option<String>,
    /// PosixExtended only. Object stores have no groups.
    pub group: Option<String>,
}

impl AttributeSnapshot {
    fn basic(
        file_key: String,
        size: u64,
        last_modified: Option<SystemTime>,
        is_directory: bool,
        is_regular_file: bool,
    ) -> Self {
        AttributeSnapshot {
            kind: AttributeKind::Basic,
            file_key,
            size,
            last_modified,
            is_directory,
            is_regular_file,
            permissions: None,
            owner: None,
            group: None,
        }
    }

    /// A regular object.
    pub fn file(meta: &ObjectMeta) -> Self {
        Self::basic(meta.key.clone(), meta.size, Some(meta.last_modified), false, true)
    }

    /// An explicit directory marker object (`dir/`).
    pub fn directory_marker(meta: &ObjectMeta) -> Self {
        Self::basic(meta.key.clone(), meta.size, Some(meta.last_modified), true, true)
    }

    /// A directory implied by deeper keys. Never cached.
    pub fn implicit_directory(key: &str) -> Self {
        let mut file_key = key.to_owned();
        if !file_key.ends_with('/') {
            file_key.push('/');
        }
        Self::basic(file_key, 0, None, true, false)
    }

    /// The root of a bucket.
    pub fn bucket_root() -> Self {
        Self::basic("/".to_owned(), 0, None, true, false)
    }

    /// Upgrades to the PosixExtended view using the owner and grants of `acl`.
    #[must_use]
    pub fn with_posix(mut self, acl: &Acl) -> Self {
        self.kind = AttributeKind::PosixExtended;
        self.owner = Some(acl.owner.principal());
        self.permissions = Some(permissions_from_acl(acl));
        self.group = None;
        self
    }

    /// Projects down to the basic view.
    #[must_use]
    pub fn to_basic(&self) -> Self {
        Self::basic(
            self.file_key.clone(),
            self.size,
            self.last_modified,
            self.is_directory,
            self.is_regular_file,
        )
    }

    /// True if this snapshot can answer a request for `kind`.
    pub fn satisfies(&self, kind: AttributeKind) -> bool {
        kind == AttributeKind::Basic || self.kind == AttributeKind::PosixExtended
    }
}

/// A single value in an attribute map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Size(u64),
    Time(Option<SystemTime>),
    Text(Option<String>),
    Permissions(Option<String>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Size(n) => write!(f, "{n}"),
            Self::Time(Some(t)) => match t.duration_since(SystemTime::UNIX_EPOCH) {
                Ok(d) => write!(f, "{}", d.as_secs()),
                Err(_) => f.write_str("-"),
            },
            Self::Text(Some(s)) | Self::Permissions(Some(s)) => f.write_str(s),
            Self::Time(None) | Self::Text(None) | Self::Permissions(None) => f.write_str("-"),
        }
    }
}

pub(crate) const BASIC_ATTRIBUTES: [&str; 8] = [
    "size",
    "lastModifiedTime",
    "lastAccessTime",
    "creationTime",
    "isDirectory",
    "isRegularFile",
    "isSymbolicLink",
    "isOther",
];

pub(crate) const POSIX_ATTRIBUTES: [&str; 3] = ["owner", "group", "permissions"];

impl AttributeSnapshot {
    /// Value of a named attribute, `None` if the name is not part of the view.
    ///
    /// Object stores only track modification time, so access and creation
    /// time report the same value.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        let value = match name {
            "size" => AttributeValue::Size(self.size),
            "lastModifiedTime" | "lastAccessTime" | "creationTime" => {
                AttributeValue::Time(self.last_modified)
            }
            "isDirectory" => AttributeValue::Bool(self.is_directory),
            "isRegularFile" => AttributeValue::Bool(self.is_regular_file),
            "isSymbolicLink" | "isOther" => AttributeValue::Bool(false),
            "fileKey" => AttributeValue::Text(Some(self.file_key.clone())),
            "owner" if self.kind == AttributeKind::PosixExtended => {
                AttributeValue::Text(self.owner.clone())
            }
            "group" if self.kind == AttributeKind::PosixExtended => {
                AttributeValue::Text(self.group.clone())
            }
            "permissions" if self.kind == AttributeKind::PosixExtended => {
                AttributeValue::Permissions(self.permissions.as_ref().map(permissions_to_string))
            }
            _ => return None,
        };
        Some(value)
    }
}

//! Buckets seen as file stores.
//!
//! Every bucket is one file store and one root directory. Capacity is not
//! something an object store reports, so the space queries answer
//! `u64::MAX`.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::attributes::AttributeValue;
use crate::path::BucketPath;
use crate::store::{BucketInfo, Owner};

/// Type name reported for every bucket-backed store.
pub const FILE_STORE_TYPE: &str = "S3Bucket";

/// Names answered by [`FileStore::attribute`].
pub const FILE_STORE_ATTRIBUTES: [&str; 4] =
    ["name", "creationDate", "ownerId", "ownerDisplayName"];

/// One bucket viewed as a file store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    name: String,
    creation_date: SystemTime,
    owner: Owner,
}

impl FileStore {
    pub(crate) fn new(info: BucketInfo, owner: Owner) -> Self {
        FileStore {
            name: info.name,
            creation_date: info.creation_date,
            owner,
        }
    }

    /// The bucket name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner of the bucket, from its ACL.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn creation_date(&self) -> SystemTime {
        self.creation_date
    }

    /// `/<name>`, the directory every path in this store lives under.
    pub fn root_directory(&self) -> BucketPath {
        BucketPath::bucket_root(self.name.as_str())
    }

    /// Value of a named store attribute, `None` for unknown names.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        let value = match name {
            "name" => AttributeValue::Text(Some(self.name.clone())),
            "creationDate" => AttributeValue::Time(Some(self.creation_date)),
            "ownerId" => AttributeValue::Text(Some(self.owner.id.clone())),
            "ownerDisplayName" => AttributeValue::Text(Some(self.owner.display_name.clone())),
            _ => return None,
        };
        Some(value)
    }

    /// Every store attribute by name.
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        FILE_STORE_ATTRIBUTES
            .into_iter()
            .filter_map(|name| Some((name.to_owned(), self.attribute(name)?)))
            .collect()
    }
}

// Every bucket answers these the same way.
#[allow(clippy::unused_self)]
impl FileStore {
    pub fn store_type(&self) -> &'static str {
        FILE_STORE_TYPE
    }

    pub fn is_read_only(&self) -> bool {
        false
    }

    pub fn total_space(&self) -> u64 {
        u64::MAX
    }

    pub fn usable_space(&self) -> u64 {
        u64::MAX
    }

    pub fn unallocated_space(&self) -> u64 {
        u64::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        FileStore::new(
            BucketInfo {
                name: "photos".to_string(),
                creation_date: SystemTime::UNIX_EPOCH,
            },
            Owner::new("u1", "alice"),
        )
    }

    #[test]
    fn test_root_directory_is_bucket_root() {
        let root = store().root_directory();
        assert!(root.is_bucket_root());
        assert_eq!(root.to_string(), "/photos/");
    }

    #[test]
    fn test_store_is_unbounded_and_writable() {
        let store = store();
        assert_eq!(store.store_type(), "S3Bucket");
        assert!(!store.is_read_only());
        assert_eq!(store.usable_space(), u64::MAX);
    }

    #[test]
    fn test_named_attributes() {
        let store = store();
        assert_eq!(
            store.attribute("ownerDisplayName"),
            Some(AttributeValue::Text(Some("alice".to_string())))
        );
        assert_eq!(
            store.attribute("creationDate"),
            Some(AttributeValue::Time(Some(SystemTime::UNIX_EPOCH)))
        );
        assert_eq!(store.attribute("size"), None);
        assert_eq!(store.attributes().len(), FILE_STORE_ATTRIBUTES.len());
    }
}

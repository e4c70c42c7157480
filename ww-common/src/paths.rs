//! Document store paths
//!
//! Collections alternate with documents: `users/{uid}/devices/{id}` is the
//! document `{id}` inside the sub-collection `users/{uid}/devices`.
//! The last segment of a collection path is its collection id, which is what
//! collection group queries match on.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Top-level collection of users (parent of each user's `devices`)
pub const USERS: &str = "users";
/// Per-user sub-collection of device submissions
pub const DEVICES: &str = "devices";
pub const COLLECTION_REQUESTS: &str = "collection_requests";
pub const RECYCLED_PARTS: &str = "recycled_parts";
pub const PART_SALES: &str = "part_sales";
pub const DELIVERY_PARTNER_TRANSACTIONS: &str = "delivery_partner_transactions";

/// Path of a collection (odd number of segments)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path of a single document (even number of segments)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(Error::InvalidInput(format!(
            "Invalid path segment: {:?}",
            segment
        )));
    }
    Ok(())
}

impl CollectionPath {
    /// Top-level collection
    pub fn root(name: &str) -> Result<Self> {
        validate_segment(name)?;
        Ok(Self {
            segments: vec![name.to_string()],
        })
    }

    /// Sub-collection nested under a document
    pub fn nested(parent: &DocPath, name: &str) -> Result<Self> {
        validate_segment(name)?;
        let mut segments = parent.segments();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    /// Collection id (last segment), used by collection group queries
    pub fn collection_id(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Document inside this collection
    pub fn doc(&self, id: &str) -> Result<DocPath> {
        validate_segment(id)?;
        Ok(DocPath {
            collection: self.clone(),
            id: id.to_string(),
        })
    }
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn segments(&self) -> Vec<String> {
        let mut segments = self.collection.segments.clone();
        segments.push(self.id.clone());
        segments
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl FromStr for CollectionPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<String> = s.split('/').map(str::to_string).collect();
        if segments.len() % 2 == 0 {
            return Err(Error::InvalidInput(format!("Not a collection path: {}", s)));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }
}

impl FromStr for DocPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (collection, id) = s
            .rsplit_once('/')
            .ok_or_else(|| Error::InvalidInput(format!("Not a document path: {}", s)))?;
        collection.parse::<CollectionPath>()?.doc(id)
    }
}

// ========================================
// Well-known collections
// ========================================

/// `users/{user_id}/devices`
pub fn user_devices(user_id: &str) -> Result<CollectionPath> {
    CollectionPath::nested(&CollectionPath::root(USERS)?.doc(user_id)?, DEVICES)
}

/// `users/{user_id}/devices/{device_id}`
pub fn device(user_id: &str, device_id: &str) -> Result<DocPath> {
    user_devices(user_id)?.doc(device_id)
}

pub fn collection_requests() -> CollectionPath {
    CollectionPath {
        segments: vec![COLLECTION_REQUESTS.to_string()],
    }
}

pub fn recycled_parts() -> CollectionPath {
    CollectionPath {
        segments: vec![RECYCLED_PARTS.to_string()],
    }
}

pub fn part_sales() -> CollectionPath {
    CollectionPath {
        segments: vec![PART_SALES.to_string()],
    }
}

pub fn delivery_partner_transactions() -> CollectionPath {
    CollectionPath {
        segments: vec![DELIVERY_PARTNER_TRANSACTIONS.to_string()],
    }
}

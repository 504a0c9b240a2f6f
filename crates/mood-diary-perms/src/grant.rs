//! Access grants.
//!
//! A grant says that one identity may decrypt the aggregates of one diary.
//! Grants are never revoked: once issued they hold for the life of the diary.

use serde::{Deserialize, Serialize};

use mood_diary_core::{Identity, ResourceId};

use crate::error::{PermsError, Result};

/// How a grant first came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantOrigin {
    /// Issued implicitly to a submitter.
    Submission,
    /// Issued by an explicit access request.
    Request,
}

impl GrantOrigin {
    pub fn to_u8(self) -> u8 {
        match self {
            GrantOrigin::Submission => 1,
            GrantOrigin::Request => 2,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(GrantOrigin::Submission),
            2 => Ok(GrantOrigin::Request),
            other => Err(PermsError::UnknownOrigin(other)),
        }
    }
}

/// Permission for `grantee` to decrypt the aggregates of `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// The diary this grant covers.
    pub resource: ResourceId,

    /// Who holds the grant.
    pub grantee: Identity,

    /// What issued it first.
    pub origin: GrantOrigin,

    /// Entry count of the diary when the grant was first issued.
    pub granted_at_entry: u64,
}

impl AccessGrant {
    pub fn new(
        resource: ResourceId,
        grantee: Identity,
        origin: GrantOrigin,
        granted_at_entry: u64,
    ) -> Self {
        Self {
            resource,
            grantee,
            origin,
            granted_at_entry,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::Serialization(e.to_string()))
    }
}

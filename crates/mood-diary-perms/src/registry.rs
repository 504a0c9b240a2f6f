//! The grant registry.
//!
//! `(resource, grantee) → AccessGrant` as a monotone set. There is no
//! removal path: `is_granted` can only ever flip from false to true.

use std::collections::{BTreeSet, HashMap};

use mood_diary_core::{Identity, ResourceId};

use crate::grant::{AccessGrant, GrantOrigin};

/// Result of issuing a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The grant did not exist and was created.
    Created,
    /// The grant already existed; nothing changed.
    Confirmed,
}

impl GrantOutcome {
    pub fn is_created(self) -> bool {
        matches!(self, GrantOutcome::Created)
    }
}

/// In-memory index of access grants.
///
/// Rebuilt from persisted grants with [`AccessGrantRegistry::apply`].
#[derive(Debug, Default, Clone)]
pub struct AccessGrantRegistry {
    /// All grants by (resource, grantee).
    grants: HashMap<(ResourceId, Identity), AccessGrant>,

    /// Index: resource -> grantees.
    by_resource: HashMap<ResourceId, BTreeSet<Identity>>,
}

impl AccessGrantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from existing grants.
    pub fn from_grants(grants: impl IntoIterator<Item = AccessGrant>) -> Self {
        let mut registry = Self::new();
        for grant in grants {
            registry.apply(grant);
        }
        registry
    }

    /// Issue a grant, or confirm an existing one.
    ///
    /// An existing grant keeps its original origin and entry count.
    pub fn grant(
        &mut self,
        resource: ResourceId,
        grantee: Identity,
        origin: GrantOrigin,
        at_entry: u64,
    ) -> GrantOutcome {
        self.apply(AccessGrant::new(resource, grantee, origin, at_entry))
    }

    /// Insert a fully formed grant. The first grant for a pair wins.
    pub fn apply(&mut self, grant: AccessGrant) -> GrantOutcome {
        let key = (grant.resource, grant.grantee);
        if self.grants.contains_key(&key) {
            return GrantOutcome::Confirmed;
        }

        self.by_resource
            .entry(grant.resource)
            .or_default()
            .insert(grant.grantee);
        self.grants.insert(key, grant);

        GrantOutcome::Created
    }

    pub fn is_granted(&self, resource: &ResourceId, grantee: &Identity) -> bool {
        self.grants.contains_key(&(*resource, *grantee))
    }

    pub fn get(&self, resource: &ResourceId, grantee: &Identity) -> Option<&AccessGrant> {
        self.grants.get(&(*resource, *grantee))
    }

    /// Every grantee of a resource, in identity order.
    pub fn grantees(&self, resource: &ResourceId) -> Vec<Identity> {
        self.by_resource
            .get(resource)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

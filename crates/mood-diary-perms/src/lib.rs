//! # Mood Diary Permissions
//!
//! Access grants: which identities may decrypt the aggregates of which diary.
//!
//! A grant is issued implicitly when an identity submits an entry, or
//! explicitly when it requests access. Grants are monotone. There is no
//! revocation, and issuing a grant twice is a no-op that reports
//! [`GrantOutcome::Confirmed`].
//!
//! ## Key Types
//!
//! - [`AccessGrant`] - One `(resource, grantee)` permission with its audit fields
//! - [`GrantOrigin`] - Whether the grant came from a submission or a request
//! - [`AccessGrantRegistry`] - Indexed set of grants

pub mod error;
pub mod grant;
pub mod registry;

pub use error::{PermsError, Result};
pub use grant::{AccessGrant, GrantOrigin};
pub use registry::{AccessGrantRegistry, GrantOutcome};

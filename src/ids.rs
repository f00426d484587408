//! Newtype identifiers used throughout the migration engine.
//!
//! Mirrors the newtype-with-`Display`-and-`From` shape used for entity IDs
//! elsewhere in this workspace (stream/offset identifiers): a thin wrapper
//! around a primitive, cheap to copy, with no implicit conversion between
//! unrelated ID kinds.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Wraps an owned string as an identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(ObjectId, "Identifies a logical object whose event stream is being migrated.");
string_id!(StreamIdentifier, "Identifies a physical event stream (source or target incarnation).");
string_id!(MigrationId, "Identifies one saga invocation.");
string_id!(BackupId, "Identifies a backup handle produced by a [`crate::providers::BackupProvider`].");
string_id!(LockKey, "A distributed-lock key, scoped to one object.");
string_id!(PlanId, "Identifies a dry-run feasibility plan.");

/// Event version: a dense, zero-based position within a stream.
pub type EventVersion = u64;

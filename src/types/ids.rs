//! Opaque, time-sortable entity identifiers (spec §3).
//!
//! Every entity id wraps a UUIDv7 so the compiler rejects cross-entity mixups
//! (a `LeadId` cannot be passed where an `AssignmentId` is expected) while the
//! underlying value still sorts by creation time — useful for the allocator's
//! "oldest first" candidate scans and the activity journal's ordering.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a newtype wrapper around [`Uuid`] with the conversions and trait
/// impls every entity id needs (`Display`, serde, SQLite binding via the
/// underlying string/blob representation).
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new, time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID (e.g. read back from storage).
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> <sqlx::Sqlite as sqlx::Database>::TypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.to_string(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
                Ok(Self(Uuid::parse_str(&s)?))
            }
        }
    };
}

entity_id!(TenantId);
entity_id!(LeadId);
entity_id!(AssignmentId);
entity_id!(CampaignId);
entity_id!(ResourceId);
entity_id!(ActivityId);
entity_id!(SuppressionId);
entity_id!(ThreadId);
entity_id!(MessageId);
entity_id!(MeetingId);
entity_id!(DealId);
entity_id!(PatternId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_time_ordered() {
        let a = LeadId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = LeadId::new();
        assert!(a.as_uuid() < b.as_uuid(), "uuidv7 should sort by creation time");
    }

    #[test]
    fn roundtrips_through_display_and_fromstr() {
        let id = AssignmentId::new();
        let s = id.to_string();
        let parsed: AssignmentId = s.parse().expect("valid uuid string");
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_id_types_do_not_unify() {
        // This is a compile-time guarantee; the test documents the intent.
        let lead = LeadId::new();
        let assignment = AssignmentId::new();
        assert_ne!(lead.as_uuid(), assignment.as_uuid());
    }
}

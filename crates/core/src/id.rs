//! Unique identifiers for Pathway entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a new identifier
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a Program
    ProgramId
);

entity_id!(
    /// Unique identifier for a ContentItem
    ContentId
);

entity_id!(
    /// Unique identifier for a ContentInteraction
    InteractionId
);

entity_id!(
    /// Unique identifier for an ActivityGrade
    GradeId
);

entity_id!(
    /// Unique identifier for a ProgramUser (a learner's membership in a program)
    ProgramUserId
);

entity_id!(
    /// Unique identifier for a ProgramEnrollment
    EnrollmentId
);

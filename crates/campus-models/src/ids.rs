//! Strongly-typed ID newtypes for domain entities.
//!
//! Every table keyed by a UUID gets its own newtype, so a `StudentId` can
//! never be bound where an `EnrollmentId` is expected.
//!
//! ```ignore
//! use campus_models::ids::{EnrollmentId, StudentId};
//!
//! fn enrollments_of(student: StudentId) { /* ... */ }
//!
//! enrollments_of(StudentId::new());      // OK
//! // enrollments_of(EnrollmentId::new()); // type mismatch
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Declares a `Uuid` newtype with the serde, sqlx and OpenAPI impls every id needs.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
        #[schema(value_type = String, format = "uuid")]
        pub struct $name(pub Uuid);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// For compile-time constants such as the system role ids.
            #[inline]
            pub const fn from_u128(v: u128) -> Self {
                Self(Uuid::from_u128(v))
            }

            #[inline]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <Uuid as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <Uuid as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <Uuid as PgHasArrayType>::array_type_info()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Uuid::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_id!(
    /// Id of User entities.
    UserId
);

define_id!(
    /// Id of Role entities.
    RoleId
);

define_id!(
    /// Id of Permission entities.
    PermissionId
);

define_id!(
    /// Id of audit log entries.
    AuditLogId
);

define_id!(
    /// Id of academic years.
    AcademicYearId
);

define_id!(
    /// Id of faculties.
    FacultyId
);

define_id!(
    /// Id of departments.
    DepartmentId
);

define_id!(
    /// Id of programs.
    ProgramId
);

define_id!(
    /// Id of subjects.
    SubjectId
);

define_id!(
    /// Id of students.
    StudentId
);

define_id!(
    /// Id of enrollments.
    EnrollmentId
);

define_id!(
    /// Id of teachers.
    TeacherId
);

define_id!(
    /// Id of teaching assignments.
    AssignmentId
);

define_id!(
    /// Id of evaluation types.
    EvaluationTypeId
);

define_id!(
    /// Id of evaluations.
    EvaluationId
);

define_id!(
    /// Id of grades.
    GradeId
);

define_id!(
    /// Id of subject results.
    ResultId
);

define_id!(
    /// Id of deliberation sessions.
    DeliberationId
);

define_id!(
    /// Id of jury members.
    JuryMemberId
);

define_id!(
    /// Id of jury decisions.
    DecisionId
);

define_id!(
    /// Id of buildings.
    BuildingId
);

define_id!(
    /// Id of rooms.
    RoomId
);

define_id!(
    /// Id of time slots.
    TimeSlotId
);

define_id!(
    /// Id of scheduled courses.
    CourseId
);

define_id!(
    /// Id of schedule conflicts.
    ConflictId
);

define_id!(
    /// Id of tuition fees.
    FeeId
);

define_id!(
    /// Id of payments.
    PaymentId
);

define_id!(
    /// Id of scholarships.
    ScholarshipId
);

define_id!(
    /// Id of invoices.
    InvoiceId
);

define_id!(
    /// Id of document templates.
    TemplateId
);

define_id!(
    /// Id of official documents.
    DocumentId
);

define_id!(
    /// Id of announcements.
    AnnouncementId
);

define_id!(
    /// Id of notifications.
    NotificationId
);

define_id!(
    /// Id of messages.
    MessageId
);

define_id!(
    /// Id of notification preferences.
    PreferenceId
);

define_id!(
    /// Id of equipment.
    EquipmentId
);

define_id!(
    /// Id of reservations.
    ReservationId
);

define_id!(
    /// Id of reservation lines.
    ReservationItemId
);

define_id!(
    /// Id of maintenance operations.
    MaintenanceId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_ids_are_distinct() {
        let mut set = HashSet::new();
        set.insert(StudentId::new());
        set.insert(StudentId::new());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_u128_constant() {
        const ADMIN: RoleId = RoleId::from_u128(2);
        assert_eq!(
            ADMIN.to_string(),
            "00000000-0000-0000-0000-000000000002"
        );
    }

    #[test]
    fn test_debug_names_the_type() {
        let id = EnrollmentId::from_u128(0x12345678_1234_1234_1234_123456789abc);
        assert_eq!(
            format!("{:?}", id),
            "EnrollmentId(12345678-1234-1234-1234-123456789abc)"
        );
    }

    #[test]
    fn test_parse_and_serde_are_transparent() {
        let id: CourseId = "12345678-1234-1234-1234-123456789abc".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""12345678-1234-1234-1234-123456789abc""#);

        let back: CourseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!("not-a-uuid".parse::<CourseId>().is_err());
    }

    #[test]
    fn test_uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id: InvoiceId = uuid.into();
        assert_eq!(Uuid::from(id), uuid);
        assert_eq!(id.into_inner(), uuid);
    }
}

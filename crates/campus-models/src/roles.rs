//! Roles and permissions.
//!
//! Roles are fixed: four system roles seeded by migration with stable ids.
//! Permissions are `area:action` strings granted to roles.

use crate::ids::{PermissionId, RoleId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}

pub mod system_roles {
    use crate::ids::RoleId;

    pub mod slugs {
        pub const SYSTEM_ADMIN: &str = "system_admin";
        pub const ADMIN: &str = "admin";
        pub const TEACHER: &str = "teacher";
        pub const STUDENT: &str = "student";
    }

    /// Full access, created from the CLI only
    pub const SYSTEM_ADMIN: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000001);
    /// Registrar and finance office staff
    pub const ADMIN: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000002);
    pub const TEACHER: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000003);
    pub const STUDENT: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000004);

    pub fn all() -> [RoleId; 4] {
        [SYSTEM_ADMIN, ADMIN, TEACHER, STUDENT]
    }

    pub fn is_system_role(role_id: &RoleId) -> bool {
        all().contains(role_id)
    }

    pub fn slug(role_id: &RoleId) -> Option<&'static str> {
        match *role_id {
            id if id == SYSTEM_ADMIN => Some(slugs::SYSTEM_ADMIN),
            id if id == ADMIN => Some(slugs::ADMIN),
            id if id == TEACHER => Some(slugs::TEACHER),
            id if id == STUDENT => Some(slugs::STUDENT),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::system_roles;
    use crate::ids::RoleId;

    #[test]
    fn test_system_role_lookup() {
        assert!(system_roles::is_system_role(&system_roles::TEACHER));
        assert!(!system_roles::is_system_role(&RoleId::new()));
        assert_eq!(system_roles::slug(&system_roles::STUDENT), Some("student"));
        assert_eq!(system_roles::slug(&RoleId::new()), None);
    }

    #[test]
    fn test_system_role_ids_are_stable() {
        assert_eq!(
            system_roles::ADMIN.to_string(),
            "00000000-0000-0000-0000-000000000002"
        );
    }
}

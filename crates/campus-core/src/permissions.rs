//! Permission constants for the Campus API.
//!
//! Permission names follow `area:action`. The migrations seed exactly this
//! set and grant it to the system roles.
//!
//! ```ignore
//! use campus_core::permissions;
//!
//! if auth_user.has_permission(permissions::GRADES_WRITE) {
//!     // enter grades
//! }
//! ```

// =============================================================================
// Users, roles, audit
// =============================================================================

pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";
pub const ROLES_READ: &str = "roles:read";
pub const AUDIT_READ: &str = "audit:read";

// =============================================================================
// Academic structure
// =============================================================================

pub const ACADEMIC_READ: &str = "academic:read";
pub const ACADEMIC_WRITE: &str = "academic:write";

// =============================================================================
// Students, enrollments, teachers
// =============================================================================

pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_WRITE: &str = "students:write";
pub const ENROLLMENTS_READ: &str = "enrollments:read";
pub const ENROLLMENTS_WRITE: &str = "enrollments:write";
pub const TEACHERS_READ: &str = "teachers:read";
pub const TEACHERS_WRITE: &str = "teachers:write";

// =============================================================================
// Evaluations, grades, results, deliberations
// =============================================================================

pub const EVALUATIONS_READ: &str = "evaluations:read";
pub const EVALUATIONS_WRITE: &str = "evaluations:write";
pub const GRADES_READ: &str = "grades:read";
pub const GRADES_WRITE: &str = "grades:write";
pub const RESULTS_READ: &str = "results:read";
pub const RESULTS_COMPUTE: &str = "results:compute";
pub const DELIBERATIONS_READ: &str = "deliberations:read";
pub const DELIBERATIONS_WRITE: &str = "deliberations:write";
pub const DELIBERATIONS_VALIDATE: &str = "deliberations:validate";

// =============================================================================
// Scheduling
// =============================================================================

pub const SCHEDULE_READ: &str = "schedule:read";
pub const SCHEDULE_WRITE: &str = "schedule:write";

// =============================================================================
// Finance
// =============================================================================

pub const FINANCE_READ: &str = "finance:read";
pub const FINANCE_WRITE: &str = "finance:write";
pub const PAYMENTS_VALIDATE: &str = "payments:validate";

// =============================================================================
// Documents and communications
// =============================================================================

pub const DOCUMENTS_READ: &str = "documents:read";
pub const DOCUMENTS_WRITE: &str = "documents:write";
pub const ANNOUNCEMENTS_WRITE: &str = "announcements:write";
pub const NOTIFICATIONS_SEND: &str = "notifications:send";

// =============================================================================
// Resources
// =============================================================================

pub const RESOURCES_READ: &str = "resources:read";
pub const RESOURCES_WRITE: &str = "resources:write";
pub const RESERVATIONS_VALIDATE: &str = "reservations:validate";

/// Every permission known to the API, in seeding order.
pub const ALL: &[&str] = &[
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    ROLES_READ,
    AUDIT_READ,
    ACADEMIC_READ,
    ACADEMIC_WRITE,
    STUDENTS_READ,
    STUDENTS_WRITE,
    ENROLLMENTS_READ,
    ENROLLMENTS_WRITE,
    TEACHERS_READ,
    TEACHERS_WRITE,
    EVALUATIONS_READ,
    EVALUATIONS_WRITE,
    GRADES_READ,
    GRADES_WRITE,
    RESULTS_READ,
    RESULTS_COMPUTE,
    DELIBERATIONS_READ,
    DELIBERATIONS_WRITE,
    DELIBERATIONS_VALIDATE,
    SCHEDULE_READ,
    SCHEDULE_WRITE,
    FINANCE_READ,
    FINANCE_WRITE,
    PAYMENTS_VALIDATE,
    DOCUMENTS_READ,
    DOCUMENTS_WRITE,
    ANNOUNCEMENTS_WRITE,
    NOTIFICATIONS_SEND,
    RESOURCES_READ,
    RESOURCES_WRITE,
    RESERVATIONS_VALIDATE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permissions_are_unique() {
        let set: HashSet<_> = ALL.iter().collect();
        assert_eq!(set.len(), ALL.len());
    }

    #[test]
    fn test_permissions_follow_area_action_format() {
        for permission in ALL {
            let parts: Vec<_> = permission.split(':').collect();
            assert_eq!(parts.len(), 2, "{permission}");
            assert!(parts.iter().all(|p| !p.is_empty()));
        }
    }
}

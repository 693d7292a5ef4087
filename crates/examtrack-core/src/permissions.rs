//! Permission constants.
//!
//! Access tokens carry the permission strings granted by the user's role.
//! Handlers check them through the `Require*` extractors instead of comparing
//! string literals.
//!
//! ```ignore
//! use examtrack_core::permissions;
//!
//! if auth_user.has_permission(permissions::TRANSFERS_REQUEST) {
//!     // hand over a batch
//! }
//! ```

// =============================================================================
// Users
// =============================================================================

pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";

// =============================================================================
// Students
// =============================================================================

pub const STUDENTS_CREATE: &str = "students:create";
pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_UPDATE: &str = "students:update";
pub const STUDENTS_DELETE: &str = "students:delete";

// =============================================================================
// Exam sessions
// =============================================================================

pub const EXAM_SESSIONS_CREATE: &str = "exam_sessions:create";
pub const EXAM_SESSIONS_READ: &str = "exam_sessions:read";
pub const EXAM_SESSIONS_UPDATE: &str = "exam_sessions:update";
pub const EXAM_SESSIONS_DELETE: &str = "exam_sessions:delete";

// =============================================================================
// Batch transfers
// =============================================================================

pub const TRANSFERS_READ: &str = "transfers:read";
/// Hand a batch over to another handler
pub const TRANSFERS_REQUEST: &str = "transfers:request";
/// Confirm, reject or flag discrepancies on a batch
pub const TRANSFERS_RESPOND: &str = "transfers:respond";

// =============================================================================
// Incidents
// =============================================================================

pub const INCIDENTS_CREATE: &str = "incidents:create";
pub const INCIDENTS_READ: &str = "incidents:read";
pub const INCIDENTS_UPDATE: &str = "incidents:update";
pub const INCIDENTS_DELETE: &str = "incidents:delete";

// =============================================================================
// Class attendance
// =============================================================================

pub const ATTENDANCE_READ: &str = "attendance:read";
/// Open and close class sessions, issue QR tokens, mark records
pub const ATTENDANCE_MANAGE: &str = "attendance:manage";

// =============================================================================
// Reporting
// =============================================================================

pub const ANALYTICS_VIEW: &str = "analytics:view";
pub const AUDIT_READ: &str = "audit:read";

/// Every permission known to the system.
pub const ALL: &[&str] = &[
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    STUDENTS_CREATE,
    STUDENTS_READ,
    STUDENTS_UPDATE,
    STUDENTS_DELETE,
    EXAM_SESSIONS_CREATE,
    EXAM_SESSIONS_READ,
    EXAM_SESSIONS_UPDATE,
    EXAM_SESSIONS_DELETE,
    TRANSFERS_READ,
    TRANSFERS_REQUEST,
    TRANSFERS_RESPOND,
    INCIDENTS_CREATE,
    INCIDENTS_READ,
    INCIDENTS_UPDATE,
    INCIDENTS_DELETE,
    ATTENDANCE_READ,
    ATTENDANCE_MANAGE,
    ANALYTICS_VIEW,
    AUDIT_READ,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permissions_are_unique() {
        let unique: HashSet<_> = ALL.iter().collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn test_permissions_are_namespaced() {
        for permission in ALL {
            let (resource, action) = permission.split_once(':').unwrap();
            assert!(!resource.is_empty());
            assert!(!action.is_empty());
        }
    }
}

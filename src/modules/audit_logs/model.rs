pub use campus_models::users::{
    AuditAction, AuditLog, AuditLogFilterParams, PaginatedAuditLogsResponse,
};

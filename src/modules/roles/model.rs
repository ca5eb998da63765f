pub use campus_models::roles::{Permission, Role, RoleWithPermissions, system_roles};

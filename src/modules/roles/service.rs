use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{RoleId, UserId};

use super::model::{Role, RoleWithPermissions};

#[instrument(skip(db))]
pub async fn get_roles(db: &PgPool) -> Result<Vec<RoleWithPermissions>, AppError> {
    let roles = sqlx::query_as::<_, Role>(
        r#"SELECT id, name, slug, description, is_system_role, created_at
           FROM roles ORDER BY name"#,
    )
    .fetch_all(db)
    .await?;

    let links = sqlx::query_as::<_, (RoleId, String)>(
        r#"SELECT rp.role_id, p.name
           FROM role_permissions rp
           INNER JOIN permissions p ON p.id = rp.permission_id
           ORDER BY p.category, p.name"#,
    )
    .fetch_all(db)
    .await?;

    Ok(roles
        .into_iter()
        .map(|role| {
            let permissions = links
                .iter()
                .filter(|(role_id, _)| *role_id == role.id)
                .map(|(_, name)| name.clone())
                .collect();
            RoleWithPermissions { role, permissions }
        })
        .collect())
}

#[instrument(skip(db))]
pub async fn get_user_role_ids(db: &PgPool, user_id: UserId) -> Result<Vec<RoleId>, AppError> {
    let role_ids = sqlx::query_scalar::<_, RoleId>(
        "SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY assigned_at",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(role_ids)
}

/// Distinct permission names granted through any of the user's roles.
#[instrument(skip(db))]
pub async fn get_user_permissions(db: &PgPool, user_id: UserId) -> Result<Vec<String>, AppError> {
    let permissions = sqlx::query_scalar::<_, String>(
        r#"SELECT DISTINCT p.name
           FROM permissions p
           INNER JOIN role_permissions rp ON p.id = rp.permission_id
           INNER JOIN user_roles ur ON rp.role_id = ur.role_id
           WHERE ur.user_id = $1
           ORDER BY p.name"#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

/// Replaces the user's roles inside the caller's transaction.
#[instrument(skip(tx))]
pub async fn set_user_roles(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    role_ids: &[RoleId],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    if role_ids.is_empty() {
        return Ok(());
    }

    let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles WHERE id = ANY($1)")
        .bind(role_ids)
        .fetch_one(&mut **tx)
        .await?;

    let mut unique = role_ids.to_vec();
    unique.sort();
    unique.dedup();

    if known != unique.len() as i64 {
        return Err(AppError::bad_request(anyhow!("One or more roles do not exist")));
    }

    sqlx::query(
        r#"INSERT INTO user_roles (user_id, role_id)
           SELECT $1, UNNEST($2::uuid[])"#,
    )
    .bind(user_id)
    .bind(&unique)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

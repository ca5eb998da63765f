use anyhow::anyhow;
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;

use campus_core::{AppError, hash_password};
use campus_models::ids::{RoleId, UserId};

use crate::metrics;
use crate::modules::audit_logs::{AuditAction, AuditService, ClientInfo};
use crate::modules::roles::service as roles;

use super::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams, UserWithRoles,
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, is_active, created_at, updated_at";
const DUPLICATE_EMAIL: &str = "A user with this email already exists";

pub struct UserService;

impl UserService {
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create_user(
        db: &PgPool,
        dto: CreateUserDto,
        actor: UserId,
        client: &ClientInfo,
    ) -> Result<UserWithRoles, AppError> {
        let hashed_password = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (first_name, last_name, email, password)
               VALUES ($1, $2, LOWER($3), $4)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_EMAIL, "Invalid reference"))?;

        roles::set_user_roles(&mut tx, user.id, &dto.role_ids).await?;
        tx.commit().await?;

        AuditService::record(
            db,
            Some(actor),
            AuditAction::Create,
            "users",
            Some(user.id.to_string()),
            json!({ "email": user.email, "role_ids": dto.role_ids }),
            client,
        )
        .await;
        metrics::track_user_created();

        Self::with_roles(db, user).await
    }

    #[instrument(skip(db))]
    pub async fn get_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let mut where_clause = String::from(" WHERE 1=1");
        let mut idx = 0;

        if filters.role_id.is_some() {
            idx += 1;
            where_clause.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = u.id AND ur.role_id = ${})",
                idx
            ));
        }
        if filters.is_active.is_some() {
            idx += 1;
            where_clause.push_str(&format!(" AND u.is_active = ${}", idx));
        }
        if filters.search.is_some() {
            idx += 1;
            where_clause.push_str(&format!(
                " AND (u.first_name ILIKE ${0} OR u.last_name ILIKE ${0} OR u.email ILIKE ${0})",
                idx
            ));
        }
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM users u{}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(role_id) = filters.role_id {
            count_query = count_query.bind(role_id);
        }
        if let Some(is_active) = filters.is_active {
            count_query = count_query.bind(is_active);
        }
        if let Some(search) = &search {
            count_query = count_query.bind(search);
        }
        let total = count_query.fetch_one(db).await?;

        let data_sql = format!(
            r#"SELECT u.id, u.first_name, u.last_name, u.email, u.is_active, u.created_at, u.updated_at
               FROM users u{} ORDER BY u.created_at DESC{}"#,
            where_clause,
            filters.pagination.sql_suffix()
        );
        let mut data_query = sqlx::query_as::<_, User>(&data_sql);
        if let Some(role_id) = filters.role_id {
            data_query = data_query.bind(role_id);
        }
        if let Some(is_active) = filters.is_active {
            data_query = data_query.bind(is_active);
        }
        if let Some(search) = &search {
            data_query = data_query.bind(search);
        }
        let data = data_query.fetch_all(db).await?;

        Ok(PaginatedUsersResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_user_with_roles(db: &PgPool, id: UserId) -> Result<UserWithRoles, AppError> {
        let user = Self::get_user(db, id).await?;
        Self::with_roles(db, user).await
    }

    #[instrument(skip(db, dto))]
    pub async fn update_user(
        db: &PgPool,
        id: UserId,
        dto: UpdateUserDto,
        actor: UserId,
        client: &ClientInfo,
    ) -> Result<UserWithRoles, AppError> {
        let existing = Self::get_user(db, id).await?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
               SET first_name = $1, last_name = $2, email = LOWER($3), is_active = $4, updated_at = NOW()
               WHERE id = $5
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(dto.first_name.as_deref().unwrap_or(&existing.first_name))
        .bind(dto.last_name.as_deref().unwrap_or(&existing.last_name))
        .bind(dto.email.as_deref().unwrap_or(&existing.email))
        .bind(dto.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_EMAIL, "Invalid reference"))?;

        if let Some(role_ids) = &dto.role_ids {
            roles::set_user_roles(&mut tx, id, role_ids).await?;
        }
        tx.commit().await?;

        AuditService::record(
            db,
            Some(actor),
            AuditAction::Update,
            "users",
            Some(id.to_string()),
            json!({
                "is_active": user.is_active,
                "roles_changed": dto.role_ids.is_some(),
            }),
            client,
        )
        .await;

        Self::with_roles(db, user).await
    }

    #[instrument(skip(db))]
    pub async fn delete_user(
        db: &PgPool,
        id: UserId,
        actor: UserId,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        if id == actor {
            return Err(AppError::bad_request(anyhow!("You cannot delete your own account")));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(
                    e,
                    DUPLICATE_EMAIL,
                    "User is still referenced by academic records",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        AuditService::record(
            db,
            Some(actor),
            AuditAction::Delete,
            "users",
            Some(id.to_string()),
            json!({}),
            client,
        )
        .await;

        Ok(())
    }

    /// Creates a login with a single role inside the caller's transaction.
    ///
    /// Used when a student or teacher profile is created together with its account.
    pub(crate) async fn insert_account(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        role_id: RoleId,
    ) -> Result<UserId, AppError> {
        let hashed_password = hash_password(password)?;

        let user_id = sqlx::query_scalar::<_, UserId>(
            r#"INSERT INTO users (first_name, last_name, email, password)
               VALUES ($1, $2, LOWER($3), $4)
               RETURNING id"#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(&hashed_password)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_EMAIL, "Invalid reference"))?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut **tx)
            .await?;

        Ok(user_id)
    }

    async fn with_roles(db: &PgPool, user: User) -> Result<UserWithRoles, AppError> {
        let role_ids = roles::get_user_role_ids(db, user.id).await?;
        let permissions = roles::get_user_permissions(db, user.id).await?;
        Ok(UserWithRoles {
            user,
            role_ids,
            permissions,
        })
    }
}

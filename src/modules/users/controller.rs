use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::UserId;

use crate::middleware::auth::{
    AuthUser, RequireUsersCreate, RequireUsersDelete, RequireUsersRead, RequireUsersUpdate,
};
use crate::modules::audit_logs::ClientInfo;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, UserFilterParams, UserWithRoles,
};
use super::service::UserService;

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = UserWithRoles),
        (status = 400, description = "Email already exists or unknown role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires users:create permission"),
        (status = 422, description = "Validation error")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, headers, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireUsersCreate(auth_user): RequireUsersCreate,
    headers: HeaderMap,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<UserWithRoles>), AppError> {
    let client = ClientInfo::from_headers(&headers);
    let user = UserService::create_user(&state.db, dto, auth_user.user_id()?, &client).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Users, newest first", body = PaginatedUsersResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires users:read permission")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    RequireUsersRead(_auth_user): RequireUsersRead,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let users = UserService::get_users(&state.db, filters).await?;
    Ok(Json(users))
}

/// Current user with roles and permissions
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = UserWithRoles),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserWithRoles>, AppError> {
    let user = UserService::get_user_with_roles(&state.db, auth_user.user_id()?).await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserWithRoles),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires users:read permission"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireUsersRead(_auth_user): RequireUsersRead,
    Path(id): Path<UserId>,
) -> Result<Json<UserWithRoles>, AppError> {
    let user = UserService::get_user_with_roles(&state.db, id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = UserWithRoles),
        (status = 400, description = "Email already exists or unknown role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires users:update permission"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, headers, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireUsersUpdate(auth_user): RequireUsersUpdate,
    headers: HeaderMap,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<UserWithRoles>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let user = UserService::update_user(&state.db, id, dto, auth_user.user_id()?, &client).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Own account or still referenced"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires users:delete permission"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, headers))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireUsersDelete(auth_user): RequireUsersDelete,
    headers: HeaderMap,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    let client = ClientInfo::from_headers(&headers);
    UserService::delete_user(&state.db, id, auth_user.user_id()?, &client).await?;
    Ok(StatusCode::NO_CONTENT)
}


use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{AnnouncementId, MessageId, NotificationId};

use crate::middleware::auth::{AuthUser, RequireAnnouncementsWrite, RequireNotificationsSend};
use crate::state::AppState;
use crate::utils::email::EmailService;
use crate::validator::ValidatedJson;

use super::model::{
    Announcement, AnnouncementFilterParams, AnnouncementStatistics, BroadcastNotificationDto,
    BroadcastResponse, CreateAnnouncementDto, CreateNotificationDto, MarkedReadResponse, Message,
    MessageFilterParams, MessageStatistics, Notification, NotificationFilterParams,
    NotificationPreference, NotificationStatistics, PaginatedAnnouncementsResponse,
    PaginatedMessagesResponse, PaginatedNotificationsResponse, ReplyMessageDto, SendMessageDto,
    UpdateAnnouncementDto, UpdatePreferencesDto,
};
use super::service::{
    AnnouncementService, Mailbox, MessageService, NotificationService, PreferenceService,
};

// =============================================================================
// Announcements
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = CreateAnnouncementDto,
    responses((status = 201, description = "Announcement created as a draft", body = Announcement)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_announcement(
    State(state): State<AppState>,
    RequireAnnouncementsWrite(auth_user): RequireAnnouncementsWrite,
    ValidatedJson(dto): ValidatedJson<CreateAnnouncementDto>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let author_id = auth_user.user_id()?;
    let announcement = AnnouncementService::create(&state.db, author_id, dto).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/announcements",
    params(AnnouncementFilterParams),
    responses((status = 200, description = "Announcements", body = PaginatedAnnouncementsResponse)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_announcements(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<AnnouncementFilterParams>,
) -> Result<Json<PaginatedAnnouncementsResponse>, AppError> {
    Ok(Json(AnnouncementService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/announcements/published",
    responses((status = 200, description = "Published, unexpired announcements", body = Vec<Announcement>)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_published_announcements(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Announcement>>, AppError> {
    Ok(Json(AnnouncementService::published(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/announcements/urgent",
    responses((status = 200, description = "Published urgent announcements", body = Vec<Announcement>)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_urgent_announcements(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Announcement>>, AppError> {
    Ok(Json(AnnouncementService::urgent(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/announcements/statistics",
    responses((status = 200, description = "Announcement statistics", body = AnnouncementStatistics)),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_announcement_statistics(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<AnnouncementStatistics>, AppError> {
    Ok(Json(AnnouncementService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/announcements/{id}",
    params(("id" = String, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_announcement(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(AnnouncementService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/announcements/{id}",
    params(("id" = String, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_announcement(
    State(state): State<AppState>,
    RequireAnnouncementsWrite(_auth_user): RequireAnnouncementsWrite,
    Path(id): Path<AnnouncementId>,
    ValidatedJson(dto): ValidatedJson<UpdateAnnouncementDto>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(AnnouncementService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = String, Path, description = "Announcement ID")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    RequireAnnouncementsWrite(_auth_user): RequireAnnouncementsWrite,
    Path(id): Path<AnnouncementId>,
) -> Result<StatusCode, AppError> {
    AnnouncementService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/announcements/{id}/publish",
    params(("id" = String, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement published", body = Announcement),
        (status = 400, description = "Already published"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn publish_announcement(
    State(state): State<AppState>,
    RequireAnnouncementsWrite(_auth_user): RequireAnnouncementsWrite,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(AnnouncementService::publish(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/announcements/{id}/archive",
    params(("id" = String, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement archived", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn archive_announcement(
    State(state): State<AppState>,
    RequireAnnouncementsWrite(_auth_user): RequireAnnouncementsWrite,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(AnnouncementService::archive(&state.db, id).await?))
}

// =============================================================================
// Notifications
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationDto,
    responses(
        (status = 201, description = "Notification stored and delivered where possible", body = Notification),
        (status = 400, description = "Unknown recipient")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_notification(
    State(state): State<AppState>,
    RequireNotificationsSend(_auth_user): RequireNotificationsSend,
    ValidatedJson(dto): ValidatedJson<CreateNotificationDto>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let mailer = EmailService::new(state.email_config.clone());
    let notification = NotificationService::send(&state.db, &mailer, dto).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    request_body = BroadcastNotificationDto,
    responses(
        (status = 201, description = "Notifications sent", body = BroadcastResponse),
        (status = 422, description = "No audience given")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    RequireNotificationsSend(_auth_user): RequireNotificationsSend,
    ValidatedJson(dto): ValidatedJson<BroadcastNotificationDto>,
) -> Result<(StatusCode, Json<BroadcastResponse>), AppError> {
    let mailer = EmailService::new(state.email_config.clone());
    let response = NotificationService::broadcast(&state.db, &mailer, dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/notifications/mine",
    params(NotificationFilterParams),
    responses((status = 200, description = "Current user's notifications", body = PaginatedNotificationsResponse)),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<NotificationFilterParams>,
) -> Result<Json<PaginatedNotificationsResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(NotificationService::mine(&state.db, user_id, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread",
    responses((status = 200, description = "Unread notifications", body = Vec<Notification>)),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_unread_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(NotificationService::unread(&state.db, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<Notification>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(NotificationService::mark_read(&state.db, id, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "Notifications marked read", body = MarkedReadResponse)),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MarkedReadResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(NotificationService::mark_all_read(&state.db, user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/notifications/statistics",
    responses((status = 200, description = "Current user's notification statistics", body = NotificationStatistics)),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_notification_statistics(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<NotificationStatistics>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(NotificationService::statistics(&state.db, user_id).await?))
}

// =============================================================================
// Messages
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = SendMessageDto,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Unknown recipient or message to self")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn send_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<SendMessageDto>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let sender_id = auth_user.user_id()?;
    let message = MessageService::send(&state.db, sender_id, dto).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_mailbox(
    state: &AppState,
    auth_user: &AuthUser,
    mailbox: Mailbox,
    filters: MessageFilterParams,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    let page = MessageService::mailbox(&state.db, user_id, mailbox, filters.pagination).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/messages/inbox",
    params(MessageFilterParams),
    responses((status = 200, description = "Received, unarchived messages", body = PaginatedMessagesResponse)),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_inbox(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<MessageFilterParams>,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    list_mailbox(&state, &auth_user, Mailbox::Inbox, filters).await
}

#[utoipa::path(
    get,
    path = "/api/messages/sent",
    params(MessageFilterParams),
    responses((status = 200, description = "Sent messages", body = PaginatedMessagesResponse)),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_sent_messages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<MessageFilterParams>,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    list_mailbox(&state, &auth_user, Mailbox::Sent, filters).await
}

#[utoipa::path(
    get,
    path = "/api/messages/unread",
    params(MessageFilterParams),
    responses((status = 200, description = "Unread received messages", body = PaginatedMessagesResponse)),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_unread_messages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<MessageFilterParams>,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    list_mailbox(&state, &auth_user, Mailbox::Unread, filters).await
}

#[utoipa::path(
    get,
    path = "/api/messages/archived",
    params(MessageFilterParams),
    responses((status = 200, description = "Archived messages", body = PaginatedMessagesResponse)),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_archived_messages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<MessageFilterParams>,
) -> Result<Json<PaginatedMessagesResponse>, AppError> {
    list_mailbox(&state, &auth_user, Mailbox::Archived, filters).await
}

#[utoipa::path(
    get,
    path = "/api/messages/statistics",
    responses((status = 200, description = "Current user's message statistics", body = MessageStatistics)),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_message_statistics(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MessageStatistics>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::statistics(&state.db, user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    params(("id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message; marked read when opened by its recipient", body = Message),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<Message>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::get(&state.db, id, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/messages/{id}/read",
    params(("id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked read", body = Message),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_message_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<Message>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::mark_read(&state.db, id, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/messages/{id}/archive",
    params(("id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message archived", body = Message),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn archive_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<Message>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::set_archived(&state.db, id, user_id, true).await?))
}

#[utoipa::path(
    post,
    path = "/api/messages/{id}/unarchive",
    params(("id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message restored to the inbox", body = Message),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn unarchive_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<Message>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::set_archived(&state.db, id, user_id, false).await?))
}

#[utoipa::path(
    post,
    path = "/api/messages/{id}/reply",
    params(("id" = String, Path, description = "Message ID")),
    request_body = ReplyMessageDto,
    responses(
        (status = 201, description = "Reply sent", body = Message),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn reply_to_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
    ValidatedJson(dto): ValidatedJson<ReplyMessageDto>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let user_id = auth_user.user_id()?;
    let reply = MessageService::reply(&state.db, id, user_id, dto).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}/thread",
    params(("id" = String, Path, description = "Any message in the conversation")),
    responses(
        (status = 200, description = "Whole conversation, oldest first", body = Vec<Message>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Message not found")
    ),
    tag = "Messages",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_message_thread(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<Vec<Message>>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(MessageService::thread(&state.db, id, user_id).await?))
}

// =============================================================================
// Preferences
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/notification-preferences/mine",
    responses((status = 200, description = "Current user's preferences", body = NotificationPreference)),
    tag = "Notification Preferences",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_preferences(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<NotificationPreference>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(PreferenceService::mine(&state.db, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/notification-preferences/mine",
    request_body = UpdatePreferencesDto,
    responses((status = 200, description = "Preferences updated", body = NotificationPreference)),
    tag = "Notification Preferences",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_my_preferences(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdatePreferencesDto>,
) -> Result<Json<NotificationPreference>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(PreferenceService::update(&state.db, user_id, dto).await?))
}

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    archive_announcement, archive_message, broadcast_notification, create_announcement,
    create_notification, delete_announcement, get_announcement, get_announcement_statistics,
    get_announcements, get_archived_messages, get_inbox, get_message, get_message_statistics,
    get_message_thread, get_my_notifications, get_my_preferences, get_notification_statistics,
    get_published_announcements, get_sent_messages, get_unread_messages,
    get_unread_notifications, get_urgent_announcements, mark_all_notifications_read,
    mark_message_read, mark_notification_read, publish_announcement, reply_to_message,
    send_message, unarchive_message, update_announcement, update_my_preferences,
};

pub fn init_announcements_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_announcement).get(get_announcements))
        .route("/published", get(get_published_announcements))
        .route("/urgent", get(get_urgent_announcements))
        .route("/statistics", get(get_announcement_statistics))
        .route(
            "/{id}",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
        .route("/{id}/publish", post(publish_announcement))
        .route("/{id}/archive", post(archive_announcement))
}

pub fn init_notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_notification))
        .route("/broadcast", post(broadcast_notification))
        .route("/mine", get(get_my_notifications))
        .route("/unread", get(get_unread_notifications))
        .route("/read-all", post(mark_all_notifications_read))
        .route("/statistics", get(get_notification_statistics))
        .route("/{id}/read", post(mark_notification_read))
}

pub fn init_messages_router() -> Router<AppState> {
    Router::new()
        .route("/", post(send_message))
        .route("/inbox", get(get_inbox))
        .route("/sent", get(get_sent_messages))
        .route("/unread", get(get_unread_messages))
        .route("/archived", get(get_archived_messages))
        .route("/statistics", get(get_message_statistics))
        .route("/{id}", get(get_message))
        .route("/{id}/read", post(mark_message_read))
        .route("/{id}/archive", post(archive_message))
        .route("/{id}/unarchive", post(unarchive_message))
        .route("/{id}/reply", post(reply_to_message))
        .route("/{id}/thread", get(get_message_thread))
}

pub fn init_notification_preferences_router() -> Router<AppState> {
    Router::new().route("/mine", get(get_my_preferences).put(update_my_preferences))
}

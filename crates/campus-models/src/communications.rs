//! Announcements, notifications, private messages and notification
//! preferences.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{AnnouncementId, MessageId, NotificationId, PreferenceId, RoleId, UserId};
use campus_core::serde::deserialize_optional_bool;
use campus_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

// =============================================================================
// Announcements
// =============================================================================

define_enum!(
    AnnouncementKind {
        General => "GENERAL",
        Students => "STUDENTS",
        Teachers => "TEACHERS",
        Administration => "ADMINISTRATION",
        Urgent => "URGENT",
    }
);

define_enum!(
    AnnouncementStatus {
        Draft => "DRAFT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub status: AnnouncementStatus,
    pub is_priority: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Computed at read time
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at < now)
}

fn default_kind() -> AnnouncementKind {
    AnnouncementKind::General
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAnnouncementDto {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[serde(default = "default_kind")]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub is_priority: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    pub kind: Option<AnnouncementKind>,
    pub is_priority: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnnouncementFilterParams {
    pub kind: Option<AnnouncementKind>,
    pub status: Option<AnnouncementStatus>,
    /// Matches title or content
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAnnouncementsResponse {
    pub data: Vec<Announcement>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_kind: Vec<LabelCount>,
    /// Published and not expired
    pub visible: i64,
}

// =============================================================================
// Notifications
// =============================================================================

define_enum!(
    NotificationKind {
        Info => "INFO",
        Success => "SUCCESS",
        Alert => "ALERT",
        Error => "ERROR",
    }
);

define_enum!(
    NotificationChannel {
        App => "APP",
        Email => "EMAIL",
        Sms => "SMS",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub channel: NotificationChannel,
    /// One of the preference categories, e.g. `grades` or `payments`
    pub category: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_notification_kind() -> NotificationKind {
    NotificationKind::Info
}

fn default_channel() -> NotificationChannel {
    NotificationChannel::App
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateNotificationDto {
    pub recipient_id: UserId,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default = "default_notification_kind")]
    pub kind: NotificationKind,
    #[serde(default = "default_channel")]
    pub channel: NotificationChannel,
    pub category: Option<String>,
    pub link: Option<String>,
}

fn validate_audience(dto: &BroadcastNotificationDto) -> Result<(), ValidationError> {
    let has_recipients = dto.recipient_ids.as_ref().is_some_and(|ids| !ids.is_empty());
    if !has_recipients && dto.role_id.is_none() {
        let mut err = ValidationError::new("audience");
        err.message = Some("recipient_ids or role_id is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_audience"))]
pub struct BroadcastNotificationDto {
    pub recipient_ids: Option<Vec<UserId>>,
    /// Every active user holding this role
    pub role_id: Option<RoleId>,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default = "default_notification_kind")]
    pub kind: NotificationKind,
    #[serde(default = "default_channel")]
    pub channel: NotificationChannel,
    pub category: Option<String>,
    pub link: Option<String>,
}

impl BroadcastNotificationDto {
    pub fn for_recipient(&self, recipient_id: UserId) -> CreateNotificationDto {
        CreateNotificationDto {
            recipient_id,
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind,
            channel: self.channel,
            category: self.category.clone(),
            link: self.link.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub recipients: i64,
    pub sent: i64,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_read: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedNotificationsResponse {
    pub data: Vec<Notification>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationStatistics {
    pub total: i64,
    pub unread: i64,
    pub by_kind: Vec<LabelCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedReadResponse {
    pub updated: i64,
}

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub subject: String,
    pub body: String,
    pub parent_id: Option<MessageId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

/// `Re: ` is added once, never stacked.
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re: ") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendMessageDto {
    pub recipient_id: UserId,
    #[validate(length(min = 1, max = 200, message = "subject must be 1-200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplyMessageDto {
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageFilterParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedMessagesResponse {
    pub data: Vec<Message>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MessageStatistics {
    pub received: i64,
    pub sent: i64,
    pub unread: i64,
    pub archived: i64,
}

// =============================================================================
// Preferences
// =============================================================================

define_enum!(
    DigestFrequency {
        Immediate => "IMMEDIATE",
        Daily => "DAILY",
        Weekly => "WEEKLY",
    }
);

/// Per-user opt-outs checked before a notification is delivered.
///
/// `absences` and `library` have no producer in this service. They gate
/// notifications created through the API with those categories and keep the
/// preference record compatible with attendance and library clients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NotificationPreference {
    pub id: PreferenceId,
    pub user_id: UserId,
    pub grades: bool,
    pub absences: bool,
    pub payments: bool,
    pub library: bool,
    pub timetable: bool,
    pub announcements: bool,
    pub messages: bool,
    pub email: bool,
    pub sms: bool,
    pub push: bool,
    pub digest_frequency: DigestFrequency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Category flag and channel flag must both be on. `APP` follows the
    /// push flag; a missing or unknown category counts as enabled.
    pub fn should_notify(&self, category: Option<&str>, channel: NotificationChannel) -> bool {
        let category_enabled = match category {
            Some("grades") => self.grades,
            Some("absences") => self.absences,
            Some("payments") => self.payments,
            Some("library") => self.library,
            Some("timetable") => self.timetable,
            Some("announcements") => self.announcements,
            Some("messages") => self.messages,
            _ => true,
        };
        let channel_enabled = match channel {
            NotificationChannel::App => self.push,
            NotificationChannel::Email => self.email,
            NotificationChannel::Sms => self.sms,
        };
        category_enabled && channel_enabled
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdatePreferencesDto {
    pub grades: Option<bool>,
    pub absences: Option<bool>,
    pub payments: Option<bool>,
    pub library: Option<bool>,
    pub timetable: Option<bool>,
    pub announcements: Option<bool>,
    pub messages: Option<bool>,
    pub email: Option<bool>,
    pub sms: Option<bool>,
    pub push: Option<bool>,
    pub digest_frequency: Option<DigestFrequency>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn preferences() -> NotificationPreference {
        NotificationPreference {
            id: PreferenceId::new(),
            user_id: UserId::new(),
            grades: true,
            absences: true,
            payments: false,
            library: true,
            timetable: true,
            announcements: true,
            messages: true,
            email: true,
            sms: false,
            push: true,
            digest_frequency: DigestFrequency::Immediate,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_should_notify_requires_category_and_channel() {
        let prefs = preferences();
        assert!(prefs.should_notify(Some("grades"), NotificationChannel::Email));
        assert!(!prefs.should_notify(Some("payments"), NotificationChannel::Email));
        assert!(!prefs.should_notify(Some("grades"), NotificationChannel::Sms));
        assert!(prefs.should_notify(Some("grades"), NotificationChannel::App));
    }

    #[test]
    fn test_should_notify_missing_category_is_enabled() {
        let prefs = preferences();
        assert!(prefs.should_notify(None, NotificationChannel::Email));
        assert!(prefs.should_notify(Some("unknown"), NotificationChannel::App));

        let muted = NotificationPreference {
            push: false,
            ..prefs
        };
        assert!(!muted.should_notify(None, NotificationChannel::App));
    }

    #[test]
    fn test_external_categories_are_honoured() {
        let prefs = NotificationPreference {
            absences: false,
            ..preferences()
        };
        assert!(!prefs.should_notify(Some("absences"), NotificationChannel::App));
        assert!(prefs.should_notify(Some("library"), NotificationChannel::App));
    }

    #[test]
    fn test_reply_subject_is_not_stacked() {
        assert_eq!(reply_subject("Exam dates"), "Re: Exam dates");
        assert_eq!(reply_subject("Re: Exam dates"), "Re: Exam dates");
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(!is_expired(None, now));
        assert!(is_expired(Some(now - Duration::hours(1)), now));
        assert!(!is_expired(Some(now + Duration::hours(1)), now));
    }

    #[test]
    fn test_broadcast_requires_audience() {
        let dto: BroadcastNotificationDto =
            serde_json::from_str(r#"{"title":"Closure","message":"Campus closed"}"#).unwrap();
        assert!(dto.validate().is_err());

        let with_role = BroadcastNotificationDto {
            role_id: Some(RoleId::new()),
            ..dto.clone()
        };
        assert!(with_role.validate().is_ok());

        let empty_list = BroadcastNotificationDto {
            recipient_ids: Some(vec![]),
            ..dto
        };
        assert!(empty_list.validate().is_err());
    }

    #[test]
    fn test_message_involves_participants() {
        let sender = UserId::new();
        let recipient = UserId::new();
        let message = Message {
            id: MessageId::new(),
            sender_id: sender,
            recipient_id: recipient,
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            parent_id: None,
            is_read: false,
            read_at: None,
            is_archived: false,
            created_at: Utc::now(),
        };
        assert!(message.involves(sender));
        assert!(message.involves(recipient));
        assert!(!message.involves(UserId::new()));
    }
}

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use campus_core::{AppError, PaginationParams};
use campus_models::LabelCount;
use campus_models::ids::{AnnouncementId, MessageId, NotificationId, UserId};

use crate::metrics;
use crate::modules::search_pattern;
use crate::utils::email::EmailService;

use super::model::{
    Announcement, AnnouncementFilterParams, AnnouncementStatistics, AnnouncementStatus,
    BroadcastNotificationDto, BroadcastResponse, CreateAnnouncementDto, CreateNotificationDto,
    MarkedReadResponse, Message, MessageStatistics, Notification, NotificationChannel,
    NotificationFilterParams, NotificationPreference, NotificationStatistics,
    PaginatedAnnouncementsResponse, PaginatedMessagesResponse, PaginatedNotificationsResponse,
    ReplyMessageDto, SendMessageDto, UpdateAnnouncementDto, UpdatePreferencesDto, reply_subject,
};

const ANNOUNCEMENT_COLUMNS: &str = "id, author_id, title, content, kind, status, is_priority, \
     published_at, expires_at, (expires_at IS NOT NULL AND expires_at < NOW()) AS is_expired, \
     created_at, updated_at";

const ANNOUNCEMENT_ORDER: &str = "is_priority DESC, COALESCE(published_at, created_at) DESC";

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, title, message, kind, channel, category, \
     link, is_read, read_at, sent, sent_at, created_at";

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, subject, body, parent_id, is_read, \
     read_at, is_archived, created_at";

const PREFERENCE_COLUMNS: &str = "id, user_id, grades, absences, payments, library, timetable, \
     announcements, messages, email, sms, push, digest_frequency, created_at, updated_at";

// =============================================================================
// Announcements
// =============================================================================

pub struct AnnouncementService;

impl AnnouncementService {
    #[instrument(skip(db, dto))]
    pub async fn create(
        db: &PgPool,
        author_id: UserId,
        dto: CreateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(&format!(
            r#"INSERT INTO announcements (author_id, title, content, kind, is_priority, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {ANNOUNCEMENT_COLUMNS}"#
        ))
        .bind(author_id)
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(dto.kind)
        .bind(dto.is_priority)
        .bind(dto.expires_at)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Announcement already exists", "Unknown author"))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: AnnouncementFilterParams,
    ) -> Result<PaginatedAnnouncementsResponse, AppError> {
        const WHERE: &str = r#" WHERE ($1::TEXT IS NULL OR kind = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR title ILIKE $3 OR content ILIKE $3)"#;

        let search = search_pattern(filters.search.as_deref());

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM announcements{WHERE}"))
                .bind(filters.kind)
                .bind(filters.status)
                .bind(&search)
                .fetch_one(db)
                .await?;

        let data = sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements{WHERE} ORDER BY {ANNOUNCEMENT_ORDER}{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.kind)
        .bind(filters.status)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedAnnouncementsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    /// Published and not yet expired.
    #[instrument(skip(db))]
    pub async fn published(db: &PgPool) -> Result<Vec<Announcement>, AppError> {
        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            r#"SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
               WHERE status = 'PUBLISHED' AND (expires_at IS NULL OR expires_at >= NOW())
               ORDER BY {ANNOUNCEMENT_ORDER}"#
        ))
        .fetch_all(db)
        .await?;
        Ok(announcements)
    }

    #[instrument(skip(db))]
    pub async fn urgent(db: &PgPool) -> Result<Vec<Announcement>, AppError> {
        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            r#"SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
               WHERE status = 'PUBLISHED' AND kind = 'URGENT'
               ORDER BY {ANNOUNCEMENT_ORDER}"#
        ))
        .fetch_all(db)
        .await?;
        Ok(announcements)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: AnnouncementId) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: AnnouncementId,
        dto: UpdateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(&format!(
            r#"UPDATE announcements
               SET title = COALESCE($1, title),
                   content = COALESCE($2, content),
                   kind = COALESCE($3, kind),
                   is_priority = COALESCE($4, is_priority),
                   expires_at = COALESCE($5, expires_at),
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {ANNOUNCEMENT_COLUMNS}"#
        ))
        .bind(&dto.title)
        .bind(&dto.content)
        .bind(dto.kind)
        .bind(dto.is_priority)
        .bind(dto.expires_at)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: AnnouncementId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn publish(db: &PgPool, id: AnnouncementId) -> Result<Announcement, AppError> {
        let current = Self::get(db, id).await?;
        if current.status == AnnouncementStatus::Published {
            return Err(AppError::bad_request(anyhow!(
                "Announcement is already published"
            )));
        }

        let announcement = sqlx::query_as::<_, Announcement>(&format!(
            r#"UPDATE announcements
               SET status = 'PUBLISHED', published_at = NOW(), updated_at = NOW()
               WHERE id = $1
               RETURNING {ANNOUNCEMENT_COLUMNS}"#
        ))
        .bind(id)
        .fetch_one(db)
        .await?;

        info!(announcement.id = %id, "Announcement published");
        Ok(announcement)
    }

    #[instrument(skip(db))]
    pub async fn archive(db: &PgPool, id: AnnouncementId) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(&format!(
            r#"UPDATE announcements
               SET status = 'ARCHIVED', updated_at = NOW()
               WHERE id = $1
               RETURNING {ANNOUNCEMENT_COLUMNS}"#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<AnnouncementStatistics, AppError> {
        let (total, visible) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*),
                      COUNT(*) FILTER (
                          WHERE status = 'PUBLISHED' AND (expires_at IS NULL OR expires_at >= NOW())
                      )
               FROM announcements"#,
        )
        .fetch_one(db)
        .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM announcements GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_kind = sqlx::query_as::<_, LabelCount>(
            r#"SELECT kind AS label, COUNT(*) AS count FROM announcements
               GROUP BY kind ORDER BY count DESC, kind"#,
        )
        .fetch_all(db)
        .await?;

        Ok(AnnouncementStatistics {
            total,
            by_status,
            by_kind,
            visible,
        })
    }
}

// =============================================================================
// Notifications
// =============================================================================

pub struct NotificationService;

impl NotificationService {
    /// Stores the notification, then delivers it on its channel. A failed
    /// e-mail leaves the notification stored and unsent.
    #[instrument(skip(db, mailer, dto), fields(recipient_id = %dto.recipient_id, channel = %dto.channel))]
    pub async fn send(
        db: &PgPool,
        mailer: &EmailService,
        dto: CreateNotificationDto,
    ) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"INSERT INTO notifications (recipient_id, title, message, kind, channel, category, link)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(dto.recipient_id)
        .bind(&dto.title)
        .bind(&dto.message)
        .bind(dto.kind)
        .bind(dto.channel)
        .bind(&dto.category)
        .bind(&dto.link)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Notification already exists", "Unknown recipient"))?;

        let delivered = match notification.channel {
            NotificationChannel::App => true,
            NotificationChannel::Email => Self::deliver_email(db, mailer, &notification).await?,
            NotificationChannel::Sms => false,
        };

        metrics::track_notification_sent(notification.channel.as_str(), delivered);

        if !delivered {
            return Ok(notification);
        }

        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"UPDATE notifications SET sent = TRUE, sent_at = NOW()
               WHERE id = $1
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(notification.id)
        .fetch_one(db)
        .await?;

        Ok(notification)
    }

    async fn deliver_email(
        db: &PgPool,
        mailer: &EmailService,
        notification: &Notification,
    ) -> Result<bool, AppError> {
        if !mailer.is_enabled() {
            return Ok(false);
        }

        let preferences = PreferenceService::mine(db, notification.recipient_id).await?;
        if !preferences.should_notify(notification.category.as_deref(), notification.channel) {
            return Ok(false);
        }

        let (email, name) = sqlx::query_as::<_, (String, String)>(
            "SELECT email, first_name || ' ' || last_name FROM users WHERE id = $1",
        )
        .bind(notification.recipient_id)
        .fetch_one(db)
        .await?;

        match mailer
            .send_notification(
                &email,
                &name,
                &notification.title,
                &notification.message,
                notification.link.as_deref(),
            )
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(notification.id = %notification.id, error = ?e, "E-mail delivery failed");
                Ok(false)
            }
        }
    }

    /// Sends one copy per resolved recipient. Unknown or inactive users are skipped.
    #[instrument(skip(db, mailer, dto))]
    pub async fn broadcast(
        db: &PgPool,
        mailer: &EmailService,
        dto: BroadcastNotificationDto,
    ) -> Result<BroadcastResponse, AppError> {
        let recipients = sqlx::query_scalar::<_, UserId>(
            r#"SELECT u.id FROM users u
               WHERE u.is_active
                 AND (u.id = ANY($1)
                      OR ($2::UUID IS NOT NULL
                          AND u.id IN (SELECT user_id FROM user_roles WHERE role_id = $2)))
               ORDER BY u.id"#,
        )
        .bind(dto.recipient_ids.clone().unwrap_or_default())
        .bind(dto.role_id)
        .fetch_all(db)
        .await?;

        let mut sent = 0;
        for recipient_id in &recipients {
            let notification = Self::send(db, mailer, dto.for_recipient(*recipient_id)).await?;
            if notification.sent {
                sent += 1;
            }
        }

        info!(recipients = recipients.len(), sent, "Broadcast notification");
        Ok(BroadcastResponse {
            recipients: recipients.len() as i64,
            sent,
        })
    }

    #[instrument(skip(db))]
    pub async fn mine(
        db: &PgPool,
        user_id: UserId,
        filters: NotificationFilterParams,
    ) -> Result<PaginatedNotificationsResponse, AppError> {
        const WHERE: &str = " WHERE recipient_id = $1 AND ($2::BOOLEAN IS NULL OR is_read = $2)";

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM notifications{WHERE}"))
                .bind(user_id)
                .bind(filters.is_read)
                .fetch_one(db)
                .await?;

        let data = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(user_id)
        .bind(filters.is_read)
        .fetch_all(db)
        .await?;

        Ok(PaginatedNotificationsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn unread(db: &PgPool, user_id: UserId) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"SELECT {NOTIFICATION_COLUMNS} FROM notifications
               WHERE recipient_id = $1 AND NOT is_read
               ORDER BY created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(notifications)
    }

    #[instrument(skip(db))]
    pub async fn mark_read(
        db: &PgPool,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Notification, AppError> {
        let recipient_id = sqlx::query_scalar::<_, UserId>(
            "SELECT recipient_id FROM notifications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Notification not found")))?;

        if recipient_id != user_id {
            return Err(AppError::forbidden(
                "Only the recipient can mark a notification as read",
            ));
        }

        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"UPDATE notifications
               SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
               WHERE id = $1
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(notification)
    }

    #[instrument(skip(db))]
    pub async fn mark_all_read(db: &PgPool, user_id: UserId) -> Result<MarkedReadResponse, AppError> {
        let result = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE, read_at = NOW()
               WHERE recipient_id = $1 AND NOT is_read"#,
        )
        .bind(user_id)
        .execute(db)
        .await?;

        Ok(MarkedReadResponse {
            updated: result.rows_affected() as i64,
        })
    }

    #[instrument(skip(db))]
    pub async fn statistics(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<NotificationStatistics, AppError> {
        let (total, unread) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT is_read)
               FROM notifications WHERE recipient_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;

        let by_kind = sqlx::query_as::<_, LabelCount>(
            r#"SELECT kind AS label, COUNT(*) AS count FROM notifications
               WHERE recipient_id = $1
               GROUP BY kind ORDER BY count DESC, kind"#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(NotificationStatistics {
            total,
            unread,
            by_kind,
        })
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Which of the current user's mailboxes to list.
#[derive(Debug, Clone, Copy)]
pub enum Mailbox {
    Inbox,
    Sent,
    Unread,
    Archived,
}

impl Mailbox {
    fn condition(self) -> &'static str {
        match self {
            Mailbox::Inbox => "recipient_id = $1 AND NOT is_archived",
            Mailbox::Sent => "sender_id = $1",
            Mailbox::Unread => "recipient_id = $1 AND NOT is_read AND NOT is_archived",
            Mailbox::Archived => "recipient_id = $1 AND is_archived",
        }
    }
}

pub struct MessageService;

impl MessageService {
    #[instrument(skip(db, dto))]
    pub async fn send(
        db: &PgPool,
        sender_id: UserId,
        dto: SendMessageDto,
    ) -> Result<Message, AppError> {
        if dto.recipient_id == sender_id {
            return Err(AppError::bad_request(anyhow!(
                "Cannot send a message to yourself"
            )));
        }
        insert_message(db, sender_id, dto.recipient_id, &dto.subject, &dto.body, None).await
    }

    #[instrument(skip(db))]
    pub async fn mailbox(
        db: &PgPool,
        user_id: UserId,
        mailbox: Mailbox,
        pagination: PaginationParams,
    ) -> Result<PaginatedMessagesResponse, AppError> {
        let condition = mailbox.condition();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM messages WHERE {condition}"
        ))
        .bind(user_id)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE {condition} ORDER BY created_at DESC{}",
            pagination.sql_suffix()
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(PaginatedMessagesResponse {
            data,
            meta: pagination.meta(total),
        })
    }

    /// Opening a message as its recipient marks it read.
    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: MessageId, user_id: UserId) -> Result<Message, AppError> {
        let message = load_involving(db, id, user_id).await?;
        if message.recipient_id == user_id && !message.is_read {
            return set_read(db, id).await;
        }
        Ok(message)
    }

    #[instrument(skip(db))]
    pub async fn mark_read(db: &PgPool, id: MessageId, user_id: UserId) -> Result<Message, AppError> {
        load_as_recipient(db, id, user_id).await?;
        set_read(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn set_archived(
        db: &PgPool,
        id: MessageId,
        user_id: UserId,
        archived: bool,
    ) -> Result<Message, AppError> {
        load_as_recipient(db, id, user_id).await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "UPDATE messages SET is_archived = $1 WHERE id = $2 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(archived)
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(message)
    }

    /// Replies to the other participant under a `Re:` subject.
    #[instrument(skip(db, dto))]
    pub async fn reply(
        db: &PgPool,
        id: MessageId,
        user_id: UserId,
        dto: ReplyMessageDto,
    ) -> Result<Message, AppError> {
        let original = load_involving(db, id, user_id).await?;
        let other = if original.sender_id == user_id {
            original.recipient_id
        } else {
            original.sender_id
        };

        insert_message(
            db,
            user_id,
            other,
            &reply_subject(&original.subject),
            &dto.body,
            Some(original.id),
        )
        .await
    }

    /// The root of the conversation and every reply below it, oldest first.
    #[instrument(skip(db))]
    pub async fn thread(
        db: &PgPool,
        id: MessageId,
        user_id: UserId,
    ) -> Result<Vec<Message>, AppError> {
        load_involving(db, id, user_id).await?;

        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"WITH RECURSIVE ancestors AS (
                   SELECT id, parent_id FROM messages WHERE id = $1
                   UNION ALL
                   SELECT m.id, m.parent_id FROM messages m JOIN ancestors a ON m.id = a.parent_id
               ),
               thread AS (
                   SELECT m.* FROM messages m
                   WHERE m.id IN (SELECT id FROM ancestors WHERE parent_id IS NULL)
                   UNION ALL
                   SELECT m.* FROM messages m JOIN thread t ON m.parent_id = t.id
               )
               SELECT {MESSAGE_COLUMNS} FROM thread ORDER BY created_at, id"#
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(messages)
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool, user_id: UserId) -> Result<MessageStatistics, AppError> {
        let stats = sqlx::query_as::<_, MessageStatistics>(
            r#"SELECT COUNT(*) FILTER (WHERE recipient_id = $1) AS received,
                      COUNT(*) FILTER (WHERE sender_id = $1) AS sent,
                      COUNT(*) FILTER (WHERE recipient_id = $1 AND NOT is_read) AS unread,
                      COUNT(*) FILTER (WHERE recipient_id = $1 AND is_archived) AS archived
               FROM messages
               WHERE sender_id = $1 OR recipient_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(stats)
    }
}

async fn insert_message(
    db: &PgPool,
    sender_id: UserId,
    recipient_id: UserId,
    subject: &str,
    body: &str,
    parent_id: Option<MessageId>,
) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>(&format!(
        r#"INSERT INTO messages (sender_id, recipient_id, subject, body, parent_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING {MESSAGE_COLUMNS}"#
    ))
    .bind(sender_id)
    .bind(recipient_id)
    .bind(subject)
    .bind(body)
    .bind(parent_id)
    .fetch_one(db)
    .await
    .map_err(|e| AppError::from_db(e, "Message already exists", "Unknown recipient"))
}

async fn load_involving(db: &PgPool, id: MessageId, user_id: UserId) -> Result<Message, AppError> {
    let message = sqlx::query_as::<_, Message>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Message not found")))?;

    if !message.involves(user_id) {
        return Err(AppError::forbidden("You are not a participant in this message"));
    }
    Ok(message)
}

async fn load_as_recipient(
    db: &PgPool,
    id: MessageId,
    user_id: UserId,
) -> Result<Message, AppError> {
    let message = load_involving(db, id, user_id).await?;
    if message.recipient_id != user_id {
        return Err(AppError::forbidden(
            "Only the recipient can change this message",
        ));
    }
    Ok(message)
}

async fn set_read(db: &PgPool, id: MessageId) -> Result<Message, AppError> {
    let message = sqlx::query_as::<_, Message>(&format!(
        r#"UPDATE messages SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
           WHERE id = $1
           RETURNING {MESSAGE_COLUMNS}"#
    ))
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(message)
}

// =============================================================================
// Preferences
// =============================================================================

pub struct PreferenceService;

impl PreferenceService {
    /// Creates the default row on first access.
    #[instrument(skip(db))]
    pub async fn mine(db: &PgPool, user_id: UserId) -> Result<NotificationPreference, AppError> {
        sqlx::query(
            "INSERT INTO notification_preferences (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(db)
        .await
        .map_err(|e| AppError::from_db(e, "Preferences already exist", "Unknown user"))?;

        let preferences = sqlx::query_as::<_, NotificationPreference>(&format!(
            "SELECT {PREFERENCE_COLUMNS} FROM notification_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(preferences)
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        user_id: UserId,
        dto: UpdatePreferencesDto,
    ) -> Result<NotificationPreference, AppError> {
        Self::mine(db, user_id).await?;

        let preferences = sqlx::query_as::<_, NotificationPreference>(&format!(
            r#"UPDATE notification_preferences
               SET grades = COALESCE($1, grades),
                   absences = COALESCE($2, absences),
                   payments = COALESCE($3, payments),
                   library = COALESCE($4, library),
                   timetable = COALESCE($5, timetable),
                   announcements = COALESCE($6, announcements),
                   messages = COALESCE($7, messages),
                   email = COALESCE($8, email),
                   sms = COALESCE($9, sms),
                   push = COALESCE($10, push),
                   digest_frequency = COALESCE($11, digest_frequency),
                   updated_at = NOW()
               WHERE user_id = $12
               RETURNING {PREFERENCE_COLUMNS}"#
        ))
        .bind(dto.grades)
        .bind(dto.absences)
        .bind(dto.payments)
        .bind(dto.library)
        .bind(dto.timetable)
        .bind(dto.announcements)
        .bind(dto.messages)
        .bind(dto.email)
        .bind(dto.sms)
        .bind(dto.push)
        .bind(dto.digest_frequency)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(preferences)
    }
}

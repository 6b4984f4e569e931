use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::NotificationStatus;
use crate::db::models::notification::{
    NewNotification, Notification, NotificationFilter, NotificationTemplate,
};
use crate::schema::{notification_templates, notifications};

pub struct NotificationRepo;

/// 收件箱里可见：未删除、已到发送时间且未过期
fn visible<'a>(recipient: Uuid, now: DateTime<Utc>) -> notifications::BoxedQuery<'a, Pg> {
    notifications::table
        .filter(notifications::recipient_id.eq(recipient))
        .filter(notifications::is_deleted.eq(false))
        .filter(notifications::scheduled_at.le(now))
        .filter(
            notifications::expires_at
                .is_null()
                .or(notifications::expires_at.gt(now)),
        )
        .into_boxed()
}

impl NotificationRepo {
    pub fn insert_many(
        conn: &mut PgConnection,
        rows: &[NewNotification],
    ) -> Result<Vec<Notification>, diesel::result::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        diesel::insert_into(notifications::table)
            .values(rows)
            .returning(Notification::as_returning())
            .get_results(conn)
    }

    /// 仅返回收件人自己的、未删除的通知
    pub fn find_for_recipient(
        conn: &mut PgConnection,
        notification_id: Uuid,
        recipient: Uuid,
    ) -> Result<Option<Notification>, diesel::result::Error> {
        notifications::table
            .find(notification_id)
            .filter(notifications::recipient_id.eq(recipient))
            .filter(notifications::is_deleted.eq(false))
            .select(Notification::as_select())
            .first(conn)
            .optional()
    }

    fn filtered<'a>(
        recipient: Uuid,
        filter: &NotificationFilter,
        now: DateTime<Utc>,
    ) -> notifications::BoxedQuery<'a, Pg> {
        let mut query = visible(recipient, now);
        if let Some(status) = filter.status {
            query = query.filter(notifications::status.eq(status));
        }
        if let Some(kind) = filter.notification_type {
            query = query.filter(notifications::notification_type.eq(kind));
        }
        if filter.unread_only {
            query = query.filter(notifications::read_at.is_null());
        }
        query
    }

    pub fn list(
        conn: &mut PgConnection,
        recipient: Uuid,
        filter: &NotificationFilter,
        now: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64), diesel::result::Error> {
        let total = Self::filtered(recipient, filter, now).count().get_result(conn)?;
        let items = Self::filtered(recipient, filter, now)
            .order((notifications::priority.desc(), notifications::created_at.desc()))
            .offset(offset)
            .limit(limit)
            .select(Notification::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    /// (总数, 未读, 待确认)
    pub fn counts(
        conn: &mut PgConnection,
        recipient: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(i64, i64, i64), diesel::result::Error> {
        let total = visible(recipient, now).count().get_result(conn)?;
        let unread = visible(recipient, now)
            .filter(notifications::read_at.is_null())
            .count()
            .get_result(conn)?;
        let pending_confirm = visible(recipient, now)
            .filter(notifications::require_confirm.eq(true))
            .filter(notifications::confirmed_at.is_null())
            .count()
            .get_result(conn)?;
        Ok((total, unread, pending_confirm))
    }

    pub fn mark_read(
        conn: &mut PgConnection,
        notification_id: Uuid,
        status: NotificationStatus,
        at: DateTime<Utc>,
    ) -> Result<Notification, diesel::result::Error> {
        diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::read_at.eq(Some(at)),
                notifications::status.eq(status),
                notifications::updated_at.eq(at),
            ))
            .returning(Notification::as_returning())
            .get_result(conn)
    }

    /// 已发送的改为已读；发送失败的只记阅读时间
    pub fn mark_all_read(
        conn: &mut PgConnection,
        recipient: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient))
                .filter(notifications::is_deleted.eq(false))
                .filter(notifications::read_at.is_null())
                .filter(notifications::status.eq(NotificationStatus::Sent)),
        )
        .set(notifications::status.eq(NotificationStatus::Read))
        .execute(conn)?;
        diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient))
                .filter(notifications::is_deleted.eq(false))
                .filter(notifications::scheduled_at.le(at))
                .filter(notifications::read_at.is_null()),
        )
        .set((
            notifications::read_at.eq(Some(at)),
            notifications::updated_at.eq(at),
        ))
        .execute(conn)
    }

    pub fn confirm(
        conn: &mut PgConnection,
        notification_id: Uuid,
        status: NotificationStatus,
        at: DateTime<Utc>,
    ) -> Result<Notification, diesel::result::Error> {
        diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::confirmed_at.eq(Some(at)),
                notifications::read_at.eq(Some(at)),
                notifications::status.eq(status),
                notifications::updated_at.eq(at),
            ))
            .returning(Notification::as_returning())
            .get_result(conn)
    }

    pub fn soft_delete(
        conn: &mut PgConnection,
        notification_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(notifications::table.find(notification_id))
            .set((
                notifications::is_deleted.eq(true),
                notifications::deleted_at.eq(Some(at)),
                notifications::updated_at.eq(at),
            ))
            .execute(conn)
    }

    /// 到期待发送的通知
    pub fn due_pending(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, diesel::result::Error> {
        notifications::table
            .filter(notifications::status.eq(NotificationStatus::Pending))
            .filter(notifications::is_deleted.eq(false))
            .filter(notifications::scheduled_at.le(now))
            .order(notifications::scheduled_at.asc())
            .select(Notification::as_select())
            .for_update()
            .skip_locked()
            .load(conn)
    }

    pub fn retryable_failed(
        conn: &mut PgConnection,
        max_retries: i32,
    ) -> Result<Vec<Notification>, diesel::result::Error> {
        notifications::table
            .filter(notifications::status.eq(NotificationStatus::Failed))
            .filter(notifications::retry_count.lt(max_retries))
            .filter(notifications::is_deleted.eq(false))
            .order(notifications::created_at.asc())
            .select(Notification::as_select())
            .for_update()
            .skip_locked()
            .load(conn)
    }

    /// 记录一次投递结果；失败时累加重试次数
    pub fn record_delivery(
        conn: &mut PgConnection,
        notification_id: Uuid,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        let target = notifications::table.find(notification_id);
        match error {
            None => diesel::update(target)
                .set((
                    notifications::status.eq(NotificationStatus::Sent),
                    notifications::sent_at.eq(Some(at)),
                    notifications::error_message.eq(None::<String>),
                    notifications::updated_at.eq(at),
                ))
                .execute(conn),
            Some(message) => diesel::update(target)
                .set((
                    notifications::status.eq(NotificationStatus::Failed),
                    notifications::error_message.eq(Some(message)),
                    notifications::retry_count.eq(notifications::retry_count + 1),
                    notifications::updated_at.eq(at),
                ))
                .execute(conn),
        }
    }

    pub fn delete_expired(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<usize, diesel::result::Error> {
        diesel::update(
            notifications::table
                .filter(notifications::is_deleted.eq(false))
                .filter(notifications::expires_at.lt(now)),
        )
        .set((
            notifications::is_deleted.eq(true),
            notifications::deleted_at.eq(Some(now)),
            notifications::updated_at.eq(now),
        ))
        .execute(conn)
    }

    pub fn enabled_template(
        conn: &mut PgConnection,
        template_code: &str,
    ) -> Result<Option<NotificationTemplate>, diesel::result::Error> {
        notification_templates::table
            .filter(notification_templates::code.eq(template_code))
            .filter(notification_templates::is_enabled.eq(true))
            .select(NotificationTemplate::as_select())
            .first(conn)
            .optional()
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{AlertLevel, AlertType, NotificationChannel, NotificationStatus, NotificationType},
    db::models::api::{Page, PageParams, error_codes},
    db::models::notification::*,
    db::repositories::notifications::NotificationRepo,
    error::{AppError, AppResult},
    monitoring::rules::{AlertCandidate, AlertSubject},
    services::context::{RequestContext, permissions},
};

/// 发送失败后最多重试的次数
pub const MAX_DELIVERY_RETRIES: i32 = 3;
const DEFAULT_PRIORITY: i32 = 1;
const ALERT_PRIORITY: i32 = 3;

pub struct NotificationsService;

/// `{name}` 占位符替换为变量值，未提供的占位符原样保留
pub fn render_template(template: &str, variables: &Value) -> String {
    let Value::Object(vars) = variables else {
        return template.to_string();
    };
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        let replacement = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        text.replace(&format!("{{{}}}", key), &replacement)
    })
}

/// 站内渠道直接投递；外部渠道未接入网关，投递失败
pub fn delivery_error(channels: &Value) -> Option<String> {
    let names = match channels.as_array() {
        Some(names) if !names.is_empty() => names,
        _ => return Some("No delivery channel".to_string()),
    };
    for name in names {
        let channel = match name.as_str().map(str::parse::<NotificationChannel>) {
            Some(Ok(channel)) => channel,
            Some(Err(e)) => return Some(e),
            None => return Some(format!("Invalid channel entry: {}", name)),
        };
        if channel != NotificationChannel::System {
            return Some(format!("{} delivery is not configured", channel));
        }
    }
    None
}

/// 立即发送或等待预定时间
pub fn initial_delivery(mut row: NewNotification, now: DateTime<Utc>) -> NewNotification {
    if row.scheduled_at > now {
        row.status = NotificationStatus::Pending;
        return row;
    }
    match delivery_error(&row.channels) {
        None => {
            row.status = NotificationStatus::Sent;
            row.sent_at = Some(now);
        }
        Some(message) => {
            row.status = NotificationStatus::Failed;
            row.error_message = Some(message);
        }
    }
    row
}

/// 阅读后的状态：已发送的变为已读，其余不变
pub fn read_status(current: NotificationStatus) -> NotificationStatus {
    match current {
        NotificationStatus::Sent | NotificationStatus::Read => NotificationStatus::Read,
        other => other,
    }
}

fn channel_list(channels: &[NotificationChannel]) -> Value {
    json!(channels.iter().map(|c| c.as_str()).collect::<Vec<_>>())
}

/// 新产生的预警中需要提醒到人的部分：
/// 事项类预警发给事项创建人，任务逾期发给承办人，工作负荷发给本人
pub fn alert_notifications(
    created: &[AlertCandidate],
    item_owners: &HashMap<Uuid, Uuid>,
    task_assignees: &HashMap<Uuid, Uuid>,
    now: DateTime<Utc>,
) -> Vec<NewNotification> {
    created
        .iter()
        .filter_map(|alert| {
            let threshold = match alert.alert_type {
                AlertType::UpcomingDeadline | AlertType::HighWorkload => AlertLevel::Critical,
                _ => AlertLevel::Warning,
            };
            if alert.alert_level < threshold {
                return None;
            }
            let (recipient, related_id, related_type) = match alert.subject {
                AlertSubject::Item(id) => (item_owners.get(&id).copied()?, Some(id), "supervision_item"),
                AlertSubject::Task(id) => (task_assignees.get(&id).copied()?, Some(id), "task_assignment"),
                AlertSubject::User(id) => (id, None, "workload_warning"),
            };
            let notification_type = if alert.alert_type == AlertType::UpcomingDeadline {
                NotificationType::Reminder
            } else {
                NotificationType::Warning
            };
            Some(NewNotification {
                title: alert.title.clone(),
                content: alert.message.clone(),
                notification_type,
                status: NotificationStatus::Sent,
                channels: channel_list(&[NotificationChannel::System]),
                sender_id: None,
                recipient_id: recipient,
                related_id,
                related_type: Some(related_type.to_string()),
                priority: ALERT_PRIORITY,
                require_confirm: false,
                scheduled_at: now,
                sent_at: Some(now),
                expires_at: None,
                error_message: None,
                extra_data: Some(json!({
                    "alert_type": alert.alert_type,
                    "alert_level": alert.alert_level,
                })),
            })
        })
        .collect()
}

/// 每个收件人一条；模板提供标题、内容、类型与渠道，请求里的显式值优先
pub fn compose_bulk(
    req: &SendBulkRequest,
    template: Option<&NotificationTemplate>,
    sender: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Vec<NewNotification>> {
    let variables = req.variables.clone().unwrap_or(Value::Null);
    let rendered = |field: &Option<String>, from_template: Option<&str>| {
        field
            .clone()
            .or_else(|| from_template.map(|t| render_template(t, &variables)))
    };
    let title = rendered(&req.title, template.map(|t| t.title_template.as_str()))
        .ok_or_else(|| AppError::validation("Either title or template_code is required"))?;
    let content = rendered(&req.content, template.map(|t| t.content_template.as_str()))
        .ok_or_else(|| AppError::validation("Either content or template_code is required"))?;

    if let Some(expires_at) = req.expires_at {
        if expires_at <= req.scheduled_at.unwrap_or(now) {
            return Err(AppError::validation("expires_at must be after the send time"));
        }
    }

    let channels = match (&req.channels, template) {
        (Some(channels), _) => channel_list(channels),
        (None, Some(t)) => t.channels.clone(),
        (None, None) => channel_list(&[NotificationChannel::System]),
    };
    let notification_type = req
        .notification_type
        .or(template.map(|t| t.notification_type))
        .unwrap_or(NotificationType::System);

    let mut recipients = req.recipient_ids.clone();
    recipients.sort();
    recipients.dedup();

    Ok(recipients
        .into_iter()
        .map(|recipient_id| {
            initial_delivery(
                NewNotification {
                    title: title.clone(),
                    content: content.clone(),
                    notification_type,
                    status: NotificationStatus::Pending,
                    channels: channels.clone(),
                    sender_id: Some(sender),
                    recipient_id,
                    related_id: req.related_id,
                    related_type: req.related_type.clone(),
                    priority: req.priority.unwrap_or(DEFAULT_PRIORITY),
                    require_confirm: req.require_confirm,
                    scheduled_at: req.scheduled_at.unwrap_or(now),
                    sent_at: None,
                    expires_at: req.expires_at,
                    error_message: None,
                    extra_data: req.template_code.as_ref().map(|code| json!({ "template_code": code })),
                },
                now,
            )
        })
        .collect())
}

impl NotificationsService {
    pub fn list(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &NotificationFilter,
        page: PageParams,
    ) -> AppResult<Page<Notification>> {
        let (items, total) =
            NotificationRepo::list(conn, ctx.user_id, filter, Utc::now(), page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    pub fn stats(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<NotificationStats> {
        let (total, unread, pending_confirm) = NotificationRepo::counts(conn, ctx.user_id, Utc::now())?;
        Ok(NotificationStats {
            total,
            unread,
            pending_confirm,
        })
    }

    fn own(conn: &mut PgConnection, ctx: &RequestContext, notification_id: Uuid) -> AppResult<Notification> {
        NotificationRepo::find_for_recipient(conn, notification_id, ctx.user_id)?
            .ok_or_else(|| AppError::not_found("notification"))
    }

    /// 已读的直接返回
    pub fn mark_read(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        notification_id: Uuid,
    ) -> AppResult<Notification> {
        let notification = Self::own(conn, ctx, notification_id)?;
        if notification.read_at.is_some() {
            return Ok(notification);
        }
        Ok(NotificationRepo::mark_read(
            conn,
            notification_id,
            read_status(notification.status),
            Utc::now(),
        )?)
    }

    pub fn mark_all_read(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<usize> {
        let count = conn.transaction(|conn| NotificationRepo::mark_all_read(conn, ctx.user_id, Utc::now()))?;
        tracing::debug!(user_id = %ctx.user_id, count, "Notifications marked read");
        Ok(count)
    }

    /// 确认同时视为已读；不需要确认的通知拒绝
    pub fn confirm(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        notification_id: Uuid,
    ) -> AppResult<Notification> {
        let notification = Self::own(conn, ctx, notification_id)?;
        if !notification.require_confirm {
            return Err(AppError::invalid_state(
                "Notification does not require confirmation",
                error_codes::NOTIFICATION_CONFIRM_NOT_REQUIRED,
            ));
        }
        if notification.confirmed_at.is_some() {
            return Ok(notification);
        }
        Ok(NotificationRepo::confirm(
            conn,
            notification_id,
            read_status(notification.status),
            Utc::now(),
        )?)
    }

    pub fn delete(conn: &mut PgConnection, ctx: &RequestContext, notification_id: Uuid) -> AppResult<()> {
        Self::own(conn, ctx, notification_id)?;
        NotificationRepo::soft_delete(conn, notification_id, Utc::now())?;
        Ok(())
    }

    pub fn send_bulk(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &SendBulkRequest,
    ) -> AppResult<BulkSendResult> {
        ctx.require(permissions::SYSTEM_CONFIG)?;
        let template = match req.template_code.as_deref() {
            Some(code) => Some(
                NotificationRepo::enabled_template(conn, code)?
                    .ok_or_else(|| AppError::not_found("notification template"))?,
            ),
            None => None,
        };
        let rows = compose_bulk(req, template.as_ref(), ctx.user_id, Utc::now())?;
        let inserted = NotificationRepo::insert_many(conn, &rows)?;

        let count_of = |status: NotificationStatus| inserted.iter().filter(|n| n.status == status).count();
        let result = BulkSendResult {
            count: inserted.len(),
            sent: count_of(NotificationStatus::Sent),
            failed: count_of(NotificationStatus::Failed),
            scheduled: count_of(NotificationStatus::Pending),
        };
        tracing::info!(
            sender = %ctx.user_id,
            count = result.count,
            failed = result.failed,
            scheduled = result.scheduled,
            "Bulk notification sent"
        );
        Ok(result)
    }

    fn deliver(conn: &mut PgConnection, batch: &[Notification], now: DateTime<Utc>) -> AppResult<DispatchSummary> {
        let mut summary = DispatchSummary::default();
        for notification in batch {
            let error = delivery_error(&notification.channels);
            NotificationRepo::record_delivery(conn, notification.id, error.as_deref(), now)?;
            match error {
                None => summary.sent += 1,
                Some(e) => {
                    tracing::warn!(notification_id = %notification.id, error = %e, "Notification delivery failed");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// 发送已到预定时间的通知
    pub fn dispatch_due(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<DispatchSummary> {
        ctx.require(permissions::SYSTEM_CONFIG)?;
        let now = Utc::now();
        conn.transaction(|conn| {
            let due = NotificationRepo::due_pending(conn, now)?;
            Self::deliver(conn, &due, now)
        })
    }

    pub fn retry_failed(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<DispatchSummary> {
        ctx.require(permissions::SYSTEM_CONFIG)?;
        let now = Utc::now();
        let summary = conn.transaction(|conn| {
            let failed = NotificationRepo::retryable_failed(conn, MAX_DELIVERY_RETRIES)?;
            Self::deliver(conn, &failed, now)
        })?;
        tracing::info!(sent = summary.sent, failed = summary.failed, "Failed notifications retried");
        Ok(summary)
    }

    pub fn cleanup_expired(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<usize> {
        ctx.require(permissions::SYSTEM_CONFIG)?;
        let count = NotificationRepo::delete_expired(conn, Utc::now())?;
        if count > 0 {
            tracing::info!(count, "Expired notifications removed");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn candidate(alert_type: AlertType, level: AlertLevel, subject: AlertSubject) -> AlertCandidate {
        AlertCandidate {
            alert_type,
            alert_level: level,
            subject,
            supervision_item_id: None,
            title: "督办事项逾期".into(),
            message: "已逾期 3 天".into(),
            details: json!({}),
        }
    }

    fn template() -> NotificationTemplate {
        NotificationTemplate {
            id: Uuid::new_v4(),
            name: "办理提醒".into(),
            code: "handle_reminder".into(),
            description: None,
            notification_type: NotificationType::Reminder,
            channels: json!(["system"]),
            title_template: "请办理「{title}」".into(),
            content_template: "{title} 将于 {days} 天后到期".into(),
            is_enabled: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_render_template() {
        let text = render_template("{name} 有 {count} 条待办，{missing}", &json!({"name": "张三", "count": 2}));
        assert_eq!(text, "张三 有 2 条待办，{missing}");
        assert_eq!(render_template("{a}", &Value::Null), "{a}");
    }

    #[test]
    fn test_delivery_by_channel() {
        assert_eq!(delivery_error(&json!(["system"])), None);
        assert_eq!(
            delivery_error(&json!(["system", "email"])),
            Some("email delivery is not configured".to_string())
        );
        assert!(delivery_error(&json!(["pigeon"])).is_some());
        assert!(delivery_error(&json!([])).is_some());
        assert!(delivery_error(&json!("system")).is_some());
    }

    #[test]
    fn test_read_status() {
        assert_eq!(read_status(NotificationStatus::Sent), NotificationStatus::Read);
        assert_eq!(read_status(NotificationStatus::Failed), NotificationStatus::Failed);
        assert_eq!(read_status(NotificationStatus::Pending), NotificationStatus::Pending);
    }

    #[test]
    fn test_alert_recipients() {
        let item = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let task = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let busy = Uuid::new_v4();
        let owners = HashMap::from([(item, owner)]);
        let assignees = HashMap::from([(task, assignee)]);

        let created = vec![
            candidate(AlertType::Overdue, AlertLevel::Warning, AlertSubject::Item(item)),
            candidate(AlertType::TaskOverdue, AlertLevel::Critical, AlertSubject::Task(task)),
            candidate(AlertType::HighWorkload, AlertLevel::Critical, AlertSubject::User(busy)),
            // 低于提醒级别
            candidate(AlertType::UpcomingDeadline, AlertLevel::Warning, AlertSubject::Item(item)),
            candidate(AlertType::SlowProgress, AlertLevel::Attention, AlertSubject::Item(item)),
            // 找不到创建人
            candidate(AlertType::Overdue, AlertLevel::Critical, AlertSubject::Item(Uuid::new_v4())),
        ];
        let rows = alert_notifications(&created, &owners, &assignees, now());
        let recipients: Vec<Uuid> = rows.iter().map(|n| n.recipient_id).collect();
        assert_eq!(recipients, vec![owner, assignee, busy]);
        assert!(rows.iter().all(|n| n.status == NotificationStatus::Sent && n.sender_id.is_none()));
        assert_eq!(rows[0].related_type.as_deref(), Some("supervision_item"));
        assert_eq!(rows[2].related_id, None);
    }

    #[test]
    fn test_upcoming_deadline_reminds_when_critical() {
        let item = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let created = vec![candidate(AlertType::UpcomingDeadline, AlertLevel::Critical, AlertSubject::Item(item))];
        let rows = alert_notifications(&created, &HashMap::from([(item, owner)]), &HashMap::new(), now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notification_type, NotificationType::Reminder);
    }

    #[test]
    fn test_bulk_from_template() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let req = SendBulkRequest {
            template_code: Some("handle_reminder".into()),
            variables: Some(json!({"title": "河道整治", "days": 3})),
            recipient_ids: vec![a, b, a],
            ..Default::default()
        };
        let rows = compose_bulk(&req, Some(&template()), Uuid::new_v4(), now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "请办理「河道整治」");
        assert_eq!(rows[0].content, "河道整治 将于 3 天后到期");
        assert_eq!(rows[0].notification_type, NotificationType::Reminder);
        assert!(rows.iter().all(|n| n.status == NotificationStatus::Sent && n.sent_at == Some(now())));
    }

    #[test]
    fn test_bulk_requires_text_or_template() {
        let req = SendBulkRequest {
            recipient_ids: vec![Uuid::new_v4()],
            ..Default::default()
        };
        assert!(matches!(
            compose_bulk(&req, None, Uuid::new_v4(), now()),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_bulk_scheduling_and_channels() {
        let req = SendBulkRequest {
            title: Some("停电通知".into()),
            content: Some("周六检修".into()),
            recipient_ids: vec![Uuid::new_v4()],
            scheduled_at: Some(now() + Duration::hours(2)),
            ..Default::default()
        };
        let rows = compose_bulk(&req, None, Uuid::new_v4(), now()).unwrap();
        assert_eq!(rows[0].status, NotificationStatus::Pending);
        assert_eq!(rows[0].channels, json!(["system"]));

        let req = SendBulkRequest {
            channels: Some(vec![NotificationChannel::Sms]),
            scheduled_at: None,
            ..req
        };
        let rows = compose_bulk(&req, None, Uuid::new_v4(), now()).unwrap();
        assert_eq!(rows[0].status, NotificationStatus::Failed);
        assert_eq!(rows[0].error_message.as_deref(), Some("sms delivery is not configured"));
    }

    #[test]
    fn test_bulk_expiry_must_follow_send_time() {
        let req = SendBulkRequest {
            title: Some("t".into()),
            content: Some("c".into()),
            recipient_ids: vec![Uuid::new_v4()],
            expires_at: Some(now() - Duration::minutes(1)),
            ..Default::default()
        };
        assert!(compose_bulk(&req, None, Uuid::new_v4(), now()).is_err());
    }
}

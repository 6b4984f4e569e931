use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::enums::{NotificationChannel, NotificationStatus, NotificationType};

// Notification models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    /// 渠道名称数组，如 `["system"]`
    pub channels: serde_json::Value,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
    pub priority: i32,
    pub require_confirm: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub extra_data: Option<serde_json::Value>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification {
    pub title: String,
    pub content: String,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub channels: serde_json::Value,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
    pub priority: i32,
    pub require_confirm: bool,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub extra_data: Option<serde_json::Value>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::notification_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationTemplate {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub notification_type: NotificationType,
    pub channels: serde_json::Value,
    pub title_template: String,
    pub content_template: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NotificationStats {
    pub total: i64,
    pub unread: i64,
    pub pending_confirm: i64,
}

/// 直接给出标题与内容，或者指定模板编码与变量
#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
pub struct SendBulkRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,
    pub template_code: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub notification_type: Option<NotificationType>,
    #[validate(length(min = 1, max = 1000, message = "Between 1 and 1000 recipients are required"))]
    pub recipient_ids: Vec<Uuid>,
    pub channels: Option<Vec<NotificationChannel>>,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i32>,
    #[serde(default)]
    pub require_confirm: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BulkSendResult {
    pub count: usize,
    pub sent: usize,
    pub failed: usize,
    pub scheduled: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

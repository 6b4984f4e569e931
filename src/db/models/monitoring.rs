use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::enums::{AlertLevel, AlertType};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::monitoring_alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MonitoringAlert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub alert_level: AlertLevel,
    pub title: String,
    pub message: String,
    pub supervision_item_id: Option<Uuid>,
    pub task_assignment_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub is_resolved: bool,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::monitoring_alerts)]
pub struct NewMonitoringAlert {
    pub alert_type: AlertType,
    pub alert_level: AlertLevel,
    pub title: String,
    pub message: String,
    pub supervision_item_id: Option<Uuid>,
    pub task_assignment_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub is_resolved: bool,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AlertFilter {
    pub alert_type: Option<AlertType>,
    pub alert_level: Option<AlertLevel>,
    pub is_resolved: Option<bool>,
    pub supervision_item_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AlertCounts {
    pub total: i64,
    pub attention: i64,
    pub warning: i64,
    pub critical: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MonitoringStats {
    pub unresolved: AlertCounts,
    pub by_type: Vec<AlertTypeCount>,
    pub overdue_items: i64,
    pub upcoming_deadline_items: i64,
    pub overloaded_users: i64,
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlertTypeCount {
    pub alert_type: AlertType,
    pub count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepartmentRisk {
    pub department_id: Uuid,
    pub department_name: String,
    pub total_items: i64,
    pub overdue_items: i64,
    pub slow_items: i64,
    pub urgent_items: i64,
    pub risk_score: i64,
    pub risk_level: AlertLevel,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub created: usize,
    pub refreshed: usize,
    pub resolved: usize,
    pub marked_overdue: usize,
    /// 随新预警发出的站内通知数
    #[serde(default)]
    pub notified: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MonitoringDashboard {
    pub stats: MonitoringStats,
    pub recent_alerts: Vec<MonitoringAlert>,
    pub department_risks: Vec<DepartmentRisk>,
}

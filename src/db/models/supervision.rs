use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::enums::{StatusAction, SupervisionStatus, SupervisionType, TaskStatus, Urgency};

// Supervision item models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::supervision_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupervisionItem {
    pub id: Uuid,
    pub number: String,
    pub title: String,
    pub content: String,
    pub item_type: SupervisionType,
    pub urgency: Urgency,
    pub status: SupervisionStatus,
    pub creator_id: Uuid,
    pub responsible_department_id: Option<Uuid>,
    pub cooperating_departments: serde_json::Value,
    pub source: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub completion_rate: i32,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub quality_score: Option<f64>,
    pub efficiency_score: Option<f64>,
    pub satisfaction_score: Option<f64>,
    pub overall_score: Option<f64>,
    pub evaluation_comment: Option<String>,
    pub is_public: bool,
    pub is_key: bool,
    pub tags: serde_json::Value,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 不再参与逾期判断的状态
pub const CLOSED_STATUSES: [SupervisionStatus; 2] =
    [SupervisionStatus::Completed, SupervisionStatus::Cancelled];

/// 未办结、未撤销且已过截止时间；与 `SupervisionRepo::overdue_items` 的查询条件一致
pub fn is_past_deadline(
    status: SupervisionStatus,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    !CLOSED_STATUSES.contains(&status) && deadline.is_some_and(|d| d < now)
}

impl SupervisionItem {
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        is_past_deadline(self.status, self.deadline, now)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::supervision_items)]
pub struct NewSupervisionItem {
    pub number: String,
    pub title: String,
    pub content: String,
    pub item_type: SupervisionType,
    pub urgency: Urgency,
    pub status: SupervisionStatus,
    pub creator_id: Uuid,
    pub responsible_department_id: Option<Uuid>,
    pub cooperating_departments: serde_json::Value,
    pub source: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_rate: i32,
    pub expected_result: Option<String>,
    pub is_public: bool,
    pub is_key: bool,
    pub tags: serde_json::Value,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::supervision_items)]
pub struct UpdateSupervisionItem {
    pub title: Option<String>,
    pub content: Option<String>,
    pub item_type: Option<SupervisionType>,
    pub urgency: Option<Urgency>,
    pub responsible_department_id: Option<Uuid>,
    pub cooperating_departments: Option<serde_json::Value>,
    pub source: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub is_public: Option<bool>,
    pub is_key: Option<bool>,
    pub tags: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Task assignment models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::task_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskAssignment {
    pub id: Uuid,
    pub supervision_item_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub assigned_department_id: Option<Uuid>,
    pub assigner_id: Uuid,
    pub status: TaskStatus,
    pub priority: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub completion_rate: i32,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::task_assignments)]
pub struct NewTaskAssignment {
    pub supervision_item_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub assigned_department_id: Option<Uuid>,
    pub assigner_id: Uuid,
    pub status: TaskStatus,
    pub priority: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_rate: i32,
    pub estimated_hours: Option<f64>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::task_assignments)]
pub struct UpdateTaskAssignment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub assigned_department_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub completion_rate: Option<i32>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Progress report models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::progress_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressReport {
    pub id: Uuid,
    pub supervision_item_id: Uuid,
    pub task_assignment_id: Option<Uuid>,
    pub reporter_id: Uuid,
    pub title: String,
    pub content: String,
    pub progress_rate: i32,
    pub completed_work: Option<String>,
    pub next_plan: Option<String>,
    pub issues: Option<String>,
    pub support_needed: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub risk_assessment: Option<String>,
    pub is_important: bool,
    pub report_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::progress_reports)]
pub struct NewProgressReport {
    pub supervision_item_id: Uuid,
    pub task_assignment_id: Option<Uuid>,
    pub reporter_id: Uuid,
    pub title: String,
    pub content: String,
    pub progress_rate: i32,
    pub completed_work: Option<String>,
    pub next_plan: Option<String>,
    pub issues: Option<String>,
    pub support_needed: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub risk_assessment: Option<String>,
    pub is_important: bool,
    pub report_date: DateTime<Utc>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::progress_reports)]
pub struct UpdateProgressReport {
    pub title: Option<String>,
    pub content: Option<String>,
    pub progress_rate: Option<i32>,
    pub completed_work: Option<String>,
    pub next_plan: Option<String>,
    pub issues: Option<String>,
    pub support_needed: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub risk_assessment: Option<String>,
    pub is_important: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Status log models
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::status_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusLog {
    pub id: Uuid,
    pub supervision_item_id: Uuid,
    pub operator_id: Option<Uuid>,
    pub action_type: StatusAction,
    pub old_status: Option<SupervisionStatus>,
    pub new_status: Option<SupervisionStatus>,
    pub reason: Option<String>,
    pub action_time: DateTime<Utc>,
    pub extra_data: Option<serde_json::Value>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::status_logs)]
pub struct NewStatusLog {
    pub supervision_item_id: Uuid,
    pub operator_id: Option<Uuid>,
    pub action_type: StatusAction,
    pub old_status: Option<SupervisionStatus>,
    pub new_status: Option<SupervisionStatus>,
    pub reason: Option<String>,
    pub action_time: DateTime<Utc>,
    pub extra_data: Option<serde_json::Value>,
}

// Request DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateSupervisionRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    pub item_type: Option<SupervisionType>,
    pub urgency: Option<Urgency>,
    pub responsible_department_id: Option<Uuid>,
    #[serde(default)]
    pub cooperating_departments: Vec<Uuid>,
    pub source: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub expected_result: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize, Serialize, Validate, Default, Debug, Clone)]
pub struct UpdateSupervisionRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
    pub item_type: Option<SupervisionType>,
    pub urgency: Option<Urgency>,
    pub responsible_department_id: Option<Uuid>,
    pub cooperating_departments: Option<Vec<Uuid>>,
    pub source: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub is_public: Option<bool>,
    pub is_key: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChangeStatusRequest {
    pub status: SupervisionStatus,
    pub reason: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct EvaluateRequest {
    #[validate(range(min = 0.0, max = 5.0, message = "Score must be between 0 and 5"))]
    pub quality_score: f64,
    #[validate(range(min = 0.0, max = 5.0, message = "Score must be between 0 and 5"))]
    pub efficiency_score: f64,
    #[validate(range(min = 0.0, max = 5.0, message = "Score must be between 0 and 5"))]
    pub satisfaction_score: f64,
    pub evaluation_comment: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Uuid,
    pub assigned_department_id: Option<Uuid>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
}

#[derive(Deserialize, Serialize, Validate, Default, Debug, Clone)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub assigned_department_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i32>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(range(min = 0, max = 100, message = "Completion rate must be between 0 and 100"))]
    pub completion_rate: Option<i32>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct CompleteTaskAssignmentRequest {
    pub actual_hours: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateReportRequest {
    pub task_assignment_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(range(min = 0, max = 100, message = "Progress rate must be between 0 and 100"))]
    pub progress_rate: i32,
    pub completed_work: Option<String>,
    pub next_plan: Option<String>,
    pub issues: Option<String>,
    pub support_needed: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub is_important: bool,
}

#[derive(Deserialize, Serialize, Validate, Default, Debug, Clone)]
pub struct UpdateReportRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Progress rate must be between 0 and 100"))]
    pub progress_rate: Option<i32>,
    pub completed_work: Option<String>,
    pub next_plan: Option<String>,
    pub issues: Option<String>,
    pub support_needed: Option<String>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub risk_assessment: Option<String>,
    pub is_important: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct SupervisionFilter {
    pub search: Option<String>,
    pub item_type: Option<SupervisionType>,
    pub status: Option<SupervisionStatus>,
    pub urgency: Option<Urgency>,
    pub creator_id: Option<Uuid>,
    pub responsible_department_id: Option<Uuid>,
    pub is_key: Option<bool>,
    pub start_date_from: Option<DateTime<Utc>>,
    pub start_date_to: Option<DateTime<Utc>>,
    pub deadline_from: Option<DateTime<Utc>>,
    pub deadline_to: Option<DateTime<Utc>>,
}

// Statistics
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SupervisionStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
    pub completion_rate: f64,
    pub avg_efficiency: f64,
    pub urgent: i64,
    pub key: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepartmentSupervisionStats {
    pub department_id: Uuid,
    pub department_name: String,
    pub total: i64,
    pub completed: i64,
    pub overdue: i64,
    pub completion_rate: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SupervisionDetail {
    #[serde(flatten)]
    pub item: SupervisionItem,
    pub tasks: Vec<TaskAssignment>,
    pub recent_reports: Vec<ProgressReport>,
}

/// 统计用的精简行
#[derive(Queryable, Debug, Clone)]
pub struct ItemStatRow {
    pub status: SupervisionStatus,
    pub urgency: Urgency,
    pub is_key: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub efficiency_score: Option<f64>,
    pub responsible_department_id: Option<Uuid>,
    pub completion_rate: i32,
}

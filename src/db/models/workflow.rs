use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::enums::{NodeStatus, NodeType, WorkflowStatus};

// Workflow template models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub template_type: String,
    pub version: String,
    pub is_enabled: bool,
    pub is_builtin: bool,
    pub definition: serde_json::Value,
    pub form_config: Option<serde_json::Value>,
    pub permission_config: Option<serde_json::Value>,
    pub notification_config: Option<serde_json::Value>,
    pub sort_order: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_templates)]
pub struct NewWorkflowTemplate {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub template_type: String,
    pub version: String,
    pub is_enabled: bool,
    pub is_builtin: bool,
    pub definition: serde_json::Value,
    pub form_config: Option<serde_json::Value>,
    pub permission_config: Option<serde_json::Value>,
    pub notification_config: Option<serde_json::Value>,
    pub sort_order: i32,
    pub created_by: Option<Uuid>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::workflow_templates)]
pub struct UpdateWorkflowTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_type: Option<String>,
    pub version: Option<String>,
    pub is_enabled: Option<bool>,
    pub definition: Option<serde_json::Value>,
    pub form_config: Option<serde_json::Value>,
    pub permission_config: Option<serde_json::Value>,
    pub notification_config: Option<serde_json::Value>,
    pub sort_order: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Workflow instance models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub number: String,
    pub title: String,
    pub template_id: Uuid,
    pub initiator_id: Uuid,
    pub business_id: Option<String>,
    pub business_type: Option<String>,
    pub business_data: Option<serde_json::Value>,
    pub variables: serde_json::Value,
    pub status: WorkflowStatus,
    pub current_nodes: serde_json::Value,
    pub priority: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_instances)]
pub struct NewWorkflowInstance {
    pub number: String,
    pub title: String,
    pub template_id: Uuid,
    pub initiator_id: Uuid,
    pub business_id: Option<String>,
    pub business_type: Option<String>,
    pub business_data: Option<serde_json::Value>,
    pub variables: serde_json::Value,
    pub status: WorkflowStatus,
    pub current_nodes: serde_json::Value,
    pub priority: i32,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::workflow_instances)]
pub struct UpdateWorkflowInstance {
    pub status: Option<WorkflowStatus>,
    pub variables: Option<serde_json::Value>,
    pub current_nodes: Option<serde_json::Value>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Workflow node (task instance) models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_nodes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowNode {
    pub id: Uuid,
    pub workflow_instance_id: Uuid,
    pub node_id: String,
    pub name: String,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub assignee_id: Option<Uuid>,
    pub assignee_role_id: Option<Uuid>,
    pub assignee_department_id: Option<Uuid>,
    pub processor_id: Option<Uuid>,
    pub enter_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub node_data: Option<serde_json::Value>,
    pub form_data: Option<serde_json::Value>,
    pub result: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_nodes)]
pub struct NewWorkflowNode {
    pub workflow_instance_id: Uuid,
    pub node_id: String,
    pub name: String,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub assignee_id: Option<Uuid>,
    pub assignee_role_id: Option<Uuid>,
    pub assignee_department_id: Option<Uuid>,
    pub node_data: Option<serde_json::Value>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::workflow_nodes)]
pub struct UpdateWorkflowNode {
    pub status: Option<NodeStatus>,
    pub processor_id: Option<Uuid>,
    pub enter_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub form_data: Option<serde_json::Value>,
    pub result: Option<String>,
    pub comment: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Transition log
#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_transitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowTransition {
    pub id: Uuid,
    pub workflow_instance_id: Uuid,
    pub from_node_id: Option<String>,
    pub to_node_id: String,
    pub name: Option<String>,
    pub executor_id: Option<Uuid>,
    pub comment: Option<String>,
    pub execute_time: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_transitions)]
pub struct NewWorkflowTransition {
    pub workflow_instance_id: Uuid,
    pub from_node_id: Option<String>,
    pub to_node_id: String,
    pub name: Option<String>,
    pub executor_id: Option<Uuid>,
    pub comment: Option<String>,
    pub execute_time: DateTime<Utc>,
}

// Request DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 128, message = "Template name must be between 1 and 128 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 32, message = "Template code must be between 1 and 32 characters"))]
    pub code: String,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Template type is required"))]
    pub template_type: String,

    pub version: Option<String>,
    pub is_enabled: Option<bool>,
    pub definition: serde_json::Value,
    pub form_config: Option<serde_json::Value>,
    pub permission_config: Option<serde_json::Value>,
    pub notification_config: Option<serde_json::Value>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Deserialize, Serialize, Validate, Default, Debug, Clone)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 128, message = "Template name must be between 1 and 128 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_type: Option<String>,
    pub version: Option<String>,
    pub is_enabled: Option<bool>,
    pub definition: Option<serde_json::Value>,
    pub form_config: Option<serde_json::Value>,
    pub permission_config: Option<serde_json::Value>,
    pub notification_config: Option<serde_json::Value>,
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct TemplateFilter {
    pub search: Option<String>,
    pub template_type: Option<String>,
    pub is_enabled: Option<bool>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateInstanceRequest {
    pub template_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    pub business_id: Option<String>,
    pub business_type: Option<String>,
    pub business_data: Option<serde_json::Value>,
    pub variables: Option<serde_json::Value>,

    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct InstanceFilter {
    pub template_id: Option<Uuid>,
    pub status: Option<WorkflowStatus>,
    pub initiator_id: Option<Uuid>,
    pub business_type: Option<String>,
    pub business_id: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct CompleteTaskRequest {
    pub result: Option<String>,
    pub comment: Option<String>,
    pub form_data: Option<serde_json::Value>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct LifecycleRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct MyTaskFilter {
    pub status: Option<NodeStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InstanceDetail {
    #[serde(flatten)]
    pub instance: WorkflowInstance,
    pub template_name: String,
    pub nodes: Vec<WorkflowNode>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MyTask {
    #[serde(flatten)]
    pub node: WorkflowNode,
    pub instance_number: String,
    pub instance_title: String,
    pub instance_priority: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowStats {
    pub templates: i64,
    pub enabled_templates: i64,
    pub instances: i64,
    pub active: i64,
    pub suspended: i64,
    pub completed: i64,
    pub terminated: i64,
    pub pending_tasks: i64,
}

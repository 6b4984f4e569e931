use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use super::{ApiClient, ClientResult, HttpRequest, ListQuery, Transport};
use crate::db::models::{
    api::Page,
    auth::{User, UserInfo},
    department::Department,
    monitoring::{DepartmentRisk, MonitoringAlert, MonitoringDashboard, MonitoringStats, ScanSummary},
    notification::{BulkSendResult, Notification, NotificationStats, SendBulkRequest},
    supervision::*,
    workflow::*,
};
use crate::services::analytics_service::AnalyticsOverview;

// 督办事项
impl<T: Transport> ApiClient<T> {
    pub async fn list_items(&self, query: &ListQuery) -> ClientResult<Page<SupervisionItem>> {
        self.get("supervision", query).await
    }

    pub async fn get_item(&self, id: Uuid) -> ClientResult<SupervisionDetail> {
        self.get(&format!("supervision/{}", id), &ListQuery::new()).await
    }

    pub async fn create_item(&self, req: &CreateSupervisionRequest) -> ClientResult<SupervisionItem> {
        self.post("supervision", req).await
    }

    pub async fn update_item(&self, id: Uuid, req: &UpdateSupervisionRequest) -> ClientResult<SupervisionItem> {
        self.put(&format!("supervision/{}", id), req).await
    }

    pub async fn delete_item(&self, id: Uuid) -> ClientResult<()> {
        self.send_unit(HttpRequest::new(Method::DELETE, format!("supervision/{}", id)))
            .await
    }

    pub async fn change_item_status(&self, id: Uuid, req: &ChangeStatusRequest) -> ClientResult<SupervisionItem> {
        self.post(&format!("supervision/{}/status", id), req).await
    }

    pub async fn evaluate_item(&self, id: Uuid, req: &EvaluateRequest) -> ClientResult<SupervisionItem> {
        self.post(&format!("supervision/{}/evaluate", id), req).await
    }

    pub async fn item_tasks(&self, id: Uuid) -> ClientResult<Vec<TaskAssignment>> {
        self.get(&format!("supervision/{}/tasks", id), &ListQuery::new()).await
    }

    pub async fn assign_task(&self, id: Uuid, req: &CreateTaskRequest) -> ClientResult<TaskAssignment> {
        self.post(&format!("supervision/{}/tasks", id), req).await
    }

    pub async fn complete_assignment(
        &self,
        task_id: Uuid,
        req: &CompleteTaskAssignmentRequest,
    ) -> ClientResult<TaskAssignment> {
        self.post(&format!("supervision/tasks/{}/complete", task_id), req).await
    }

    pub async fn item_reports(&self, id: Uuid, query: &ListQuery) -> ClientResult<Page<ProgressReport>> {
        self.get(&format!("supervision/{}/reports", id), query).await
    }

    pub async fn submit_report(&self, id: Uuid, req: &CreateReportRequest) -> ClientResult<ProgressReport> {
        self.post(&format!("supervision/{}/reports", id), req).await
    }

    pub async fn overdue_items(&self) -> ClientResult<Vec<SupervisionItem>> {
        self.get("supervision/overdue", &ListQuery::new()).await
    }

    pub async fn urgent_items(&self) -> ClientResult<Vec<SupervisionItem>> {
        self.get("supervision/urgent", &ListQuery::new()).await
    }

    pub async fn supervision_stats(&self, department_id: Option<Uuid>) -> ClientResult<SupervisionStats> {
        let query = match department_id {
            Some(id) => ListQuery::new().param("department_id", id),
            None => ListQuery::new(),
        };
        self.get("supervision/stats/overview", &query).await
    }
}

// 工作流
impl<T: Transport> ApiClient<T> {
    pub async fn list_templates(&self, query: &ListQuery) -> ClientResult<Page<WorkflowTemplate>> {
        self.get("workflow/templates", query).await
    }

    pub async fn get_template(&self, id: Uuid) -> ClientResult<WorkflowTemplate> {
        self.get(&format!("workflow/templates/{}", id), &ListQuery::new()).await
    }

    pub async fn create_template(&self, req: &CreateTemplateRequest) -> ClientResult<WorkflowTemplate> {
        self.post("workflow/templates", req).await
    }

    pub async fn list_instances(&self, query: &ListQuery) -> ClientResult<Page<WorkflowInstance>> {
        self.get("workflow/instances", query).await
    }

    pub async fn get_instance(&self, id: Uuid) -> ClientResult<InstanceDetail> {
        self.get(&format!("workflow/instances/{}", id), &ListQuery::new()).await
    }

    pub async fn create_instance(&self, req: &CreateInstanceRequest) -> ClientResult<WorkflowInstance> {
        self.post("workflow/instances", req).await
    }

    pub async fn start_instance(&self, id: Uuid) -> ClientResult<WorkflowInstance> {
        self.post(&format!("workflow/instances/{}/start", id), &Value::Null).await
    }

    pub async fn my_tasks(&self, query: &ListQuery) -> ClientResult<Page<MyTask>> {
        self.get("workflow/my-tasks", query).await
    }

    pub async fn complete_task(&self, node_id: Uuid, req: &CompleteTaskRequest) -> ClientResult<WorkflowInstance> {
        self.post(&format!("workflow/tasks/{}/complete", node_id), req).await
    }
}

// 部门、用户
impl<T: Transport> ApiClient<T> {
    pub async fn list_departments(&self, query: &ListQuery) -> ClientResult<Page<Department>> {
        self.get("departments", query).await
    }

    pub async fn get_department(&self, id: Uuid) -> ClientResult<Department> {
        self.get(&format!("departments/{}", id), &ListQuery::new()).await
    }

    pub async fn list_users(&self, query: &ListQuery) -> ClientResult<Page<User>> {
        self.get("users", query).await
    }

    pub async fn get_user(&self, id: Uuid) -> ClientResult<UserInfo> {
        self.get(&format!("users/{}", id), &ListQuery::new()).await
    }

    pub async fn me(&self) -> ClientResult<UserInfo> {
        self.get("auth/me", &ListQuery::new()).await
    }
}

// 监控与统计
impl<T: Transport> ApiClient<T> {
    pub async fn monitoring_stats(&self) -> ClientResult<MonitoringStats> {
        self.get("monitoring/stats", &ListQuery::new()).await
    }

    pub async fn list_alerts(&self, query: &ListQuery) -> ClientResult<Page<MonitoringAlert>> {
        self.get("monitoring/alerts", query).await
    }

    pub async fn resolve_alert(&self, id: Uuid) -> ClientResult<MonitoringAlert> {
        self.put(&format!("monitoring/alerts/{}/resolve", id), &Value::Null).await
    }

    pub async fn run_scan(&self) -> ClientResult<ScanSummary> {
        self.post("monitoring/scan", &Value::Null).await
    }

    pub async fn department_risk(&self, department_id: Uuid) -> ClientResult<DepartmentRisk> {
        self.get(
            &format!("monitoring/risk-analysis/department/{}", department_id),
            &ListQuery::new(),
        )
        .await
    }

    pub async fn monitoring_dashboard(&self) -> ClientResult<MonitoringDashboard> {
        self.get("monitoring/dashboard", &ListQuery::new()).await
    }

    pub async fn analytics_overview(&self) -> ClientResult<AnalyticsOverview> {
        self.get("analytics/overview", &ListQuery::new()).await
    }

    /// CSV 原始字节
    pub async fn export_items(&self, query: &ListQuery) -> ClientResult<Vec<u8>> {
        self.send_bytes(HttpRequest::new(Method::GET, "analytics/export").with_query(query.pairs().to_vec()))
            .await
    }
}

// 通知
impl<T: Transport> ApiClient<T> {
    /// `unread_only` 等过滤条件通过 query 传入
    pub async fn list_notifications(&self, query: &ListQuery) -> ClientResult<Page<Notification>> {
        self.get("notifications", query).await
    }

    pub async fn notification_stats(&self) -> ClientResult<NotificationStats> {
        self.get("notifications/stats", &ListQuery::new()).await
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> ClientResult<Notification> {
        self.post(&format!("notifications/{}/read", id), &Value::Null).await
    }

    pub async fn confirm_notification(&self, id: Uuid) -> ClientResult<Notification> {
        self.post(&format!("notifications/{}/confirm", id), &Value::Null).await
    }

    pub async fn delete_notification(&self, id: Uuid) -> ClientResult<()> {
        self.send_unit(HttpRequest::new(Method::DELETE, format!("notifications/{}", id)))
            .await
    }

    pub async fn send_bulk_notification(&self, req: &SendBulkRequest) -> ClientResult<BulkSendResult> {
        self.post("notifications/send-bulk", req).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::*;
    use super::*;
    use crate::db::enums::SupervisionStatus;

    #[tokio::test]
    async fn start_instance_rejection_is_surfaced() {
        let (client, _) = client_with(
            vec![failure(422, "Workflow is active, only draft workflows can be started")],
            Some("token"),
        );
        let err = client.start_instance(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(err.user_message().contains("only draft workflows"));
    }

    #[tokio::test]
    async fn list_items_sends_page_and_filters() {
        let (client, _) = client_with(
            vec![ok(json!({ "items": [], "total": 41, "page": 5, "size": 10, "pages": 5 }))],
            Some("token"),
        );
        let page = client
            .list_items(&ListQuery::new().page(5, 10).param("status", SupervisionStatus::Overdue))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 41);

        let sent = client.transport.sent();
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].path, "supervision");
        assert!(sent[0].query.contains(&("status".to_string(), "overdue".to_string())));
    }

    #[tokio::test]
    async fn export_returns_raw_csv() {
        let csv = "\u{feff}编号,标题\r\nDB1,测试\r\n";
        let (client, _) = client_with(
            vec![super::super::HttpResponse {
                status: 200,
                body: csv.as_bytes().to_vec(),
            }],
            Some("token"),
        );
        let bytes = client.export_items(&ListQuery::new()).await.unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), csv);
    }

    #[tokio::test]
    async fn unread_inbox_and_stats() {
        let (client, _) = client_with(
            vec![
                ok(json!({ "items": [], "total": 0, "page": 1, "size": 20, "pages": 0 })),
                ok(json!({ "total": 7, "unread": 2, "pending_confirm": 1 })),
            ],
            Some("token"),
        );
        client
            .list_notifications(&ListQuery::new().param("unread_only", true))
            .await
            .unwrap();
        let stats = client.notification_stats().await.unwrap();
        assert_eq!(stats, NotificationStats { total: 7, unread: 2, pending_confirm: 1 });

        let sent = client.transport.sent();
        assert_eq!(sent[0].path, "notifications");
        assert!(sent[0].query.contains(&("unread_only".to_string(), "true".to_string())));
        assert_eq!(sent[1].path, "notifications/stats");
    }

    #[tokio::test]
    async fn confirming_plain_notification_is_rejected() {
        let (client, _) = client_with(
            vec![failure(422, "Notification does not require confirmation")],
            Some("token"),
        );
        let err = client.confirm_notification(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), Some(422));
        let sent = client.transport.sent();
        assert_eq!(sent[0].method, Method::POST);
        assert!(sent[0].path.ends_with("/confirm"));
    }

    #[tokio::test]
    async fn completing_someone_elses_task_is_forbidden() {
        let (client, _) = client_with(
            vec![failure(403, "Only the assignee can complete this task")],
            Some("token"),
        );
        let err = client
            .complete_task(Uuid::new_v4(), &CompleteTaskRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.user_message(), "Only the assignee can complete this task");
    }
}

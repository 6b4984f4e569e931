use chrono::{DateTime, Duration, Utc};
use supervision_backend::config::MonitoringConfig;
use supervision_backend::db::enums::{AlertLevel, AlertType, SupervisionStatus, TaskStatus, Urgency};
use supervision_backend::monitoring::rules::{self, department_risk_score, overdue_sweep_targets};
use supervision_backend::monitoring::{AlertSubject, ItemSnapshot, TaskSnapshot, WorkloadSnapshot};
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn item(status: SupervisionStatus, deadline: Option<DateTime<Utc>>) -> ItemSnapshot {
    ItemSnapshot {
        id: Uuid::new_v4(),
        number: "DB17607780000000001".to_string(),
        title: "老旧小区改造".to_string(),
        status,
        urgency: Urgency::Medium,
        start_date: None,
        deadline,
        completion_rate: 0,
        created_at: now() - Duration::days(1),
        updated_at: now() - Duration::hours(1),
        status_changes: 0,
    }
}

#[test]
fn level_thresholds() {
    assert_eq!(rules::overdue_level(0), AlertLevel::Warning);
    assert_eq!(rules::overdue_level(1), AlertLevel::Warning);
    assert_eq!(rules::overdue_level(2), AlertLevel::Critical);

    assert_eq!(rules::upcoming_level(3), AlertLevel::Attention);
    assert_eq!(rules::upcoming_level(1), AlertLevel::Warning);
    assert_eq!(rules::upcoming_level(0), AlertLevel::Critical);

    assert_eq!(rules::slow_progress_level(20.0), AlertLevel::Attention);
    assert_eq!(rules::slow_progress_level(40.0), AlertLevel::Warning);
    assert_eq!(rules::slow_progress_level(40.5), AlertLevel::Critical);

    assert_eq!(rules::workload_level(9, 10), None);
    assert_eq!(rules::workload_level(10, 10), Some(AlertLevel::Attention));
    assert_eq!(rules::workload_level(15, 10), Some(AlertLevel::Warning));
    assert_eq!(rules::workload_level(20, 10), Some(AlertLevel::Critical));
}

#[test]
fn pending_item_past_deadline_raises_overdue_alert() {
    let overdue = item(SupervisionStatus::Pending, Some(now() - Duration::days(3)));
    let on_time = item(SupervisionStatus::Pending, Some(now() + Duration::days(30)));
    let settings = MonitoringConfig::default();

    let alerts = rules::evaluate(&[overdue.clone(), on_time.clone()], &[], &[], &settings, now());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Overdue);
    assert_eq!(alerts[0].alert_level, AlertLevel::Critical);
    assert_eq!(alerts[0].subject, AlertSubject::Item(overdue.id));

    assert_eq!(overdue_sweep_targets(&[overdue.clone(), on_time], now()), vec![overdue.id]);
}

#[test]
fn completed_items_are_never_flagged() {
    let done = item(SupervisionStatus::Completed, Some(now() - Duration::days(10)));
    let alerts = rules::evaluate(&[done.clone()], &[], &[], &MonitoringConfig::default(), now());
    assert!(alerts.is_empty());
    assert!(overdue_sweep_targets(&[done], now()).is_empty());
}

#[test]
fn overdue_tasks_and_busy_users() {
    let item_id = Uuid::new_v4();
    let task = TaskSnapshot {
        id: Uuid::new_v4(),
        supervision_item_id: item_id,
        title: "现场核查".to_string(),
        assignee_id: Uuid::new_v4(),
        status: TaskStatus::InProgress,
        deadline: Some(now() - Duration::hours(5)),
    };
    let busy = WorkloadSnapshot {
        user_id: Uuid::new_v4(),
        real_name: "李明".to_string(),
        active_tasks: 12,
    };
    let idle = WorkloadSnapshot {
        user_id: Uuid::new_v4(),
        real_name: "王芳".to_string(),
        active_tasks: 2,
    };
    let settings = MonitoringConfig {
        workload_threshold: 10,
        ..MonitoringConfig::default()
    };

    let alerts = rules::evaluate(&[], &[task.clone()], &[busy.clone(), idle], &settings, now());
    assert_eq!(alerts.len(), 2);

    let task_alert = alerts.iter().find(|a| a.alert_type == AlertType::TaskOverdue).unwrap();
    assert_eq!(task_alert.supervision_item_id, Some(item_id));
    assert_eq!(task_alert.alert_level, AlertLevel::Warning);

    let workload = alerts.iter().find(|a| a.alert_type == AlertType::HighWorkload).unwrap();
    assert_eq!(workload.subject, AlertSubject::User(busy.user_id));
    assert_eq!(workload.alert_level, AlertLevel::Attention);
}

#[test]
fn department_risk_levels() {
    assert_eq!(department_risk_score(10, 0, 0, 0), (0, AlertLevel::Normal));
    assert_eq!(department_risk_score(10, 1, 0, 0), (10, AlertLevel::Attention));
    assert_eq!(department_risk_score(10, 2, 1, 0), (25, AlertLevel::Warning));
    // 紧急占比 50% 额外加 10 分
    assert_eq!(department_risk_score(10, 4, 0, 5), (50, AlertLevel::Critical));
}

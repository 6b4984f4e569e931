use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::config::MonitoringConfig;
use crate::db::enums::{AlertLevel, AlertType, SupervisionStatus, TaskStatus, Urgency};

/// 预警规则所需的督办事项快照
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub number: String,
    pub title: String,
    pub status: SupervisionStatus,
    pub urgency: Urgency,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completion_rate: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_changes: i64,
}

#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub supervision_item_id: Uuid,
    pub title: String,
    pub assignee_id: Uuid,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct WorkloadSnapshot {
    pub user_id: Uuid,
    pub real_name: String,
    pub active_tasks: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertSubject {
    Item(Uuid),
    Task(Uuid),
    User(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub alert_level: AlertLevel,
    pub subject: AlertSubject,
    /// 任务类预警同时关联所属督办事项
    pub supervision_item_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AlertCandidate {
    pub fn key(&self) -> (AlertType, AlertSubject) {
        (self.alert_type, self.subject)
    }
}

const QUALITY_RISK_STATUS_CHANGES: i64 = 5;
const SLOW_PROGRESS_RATIO: f64 = 0.7;
const DEPARTMENT_SLOW_RATE: i32 = 30;

pub fn overdue_level(days_overdue: i64) -> AlertLevel {
    if days_overdue <= 1 {
        AlertLevel::Warning
    } else {
        AlertLevel::Critical
    }
}

pub fn upcoming_level(days_remaining: i64) -> AlertLevel {
    match days_remaining {
        d if d >= 2 => AlertLevel::Attention,
        1 => AlertLevel::Warning,
        _ => AlertLevel::Critical,
    }
}

pub fn slow_progress_level(gap: f64) -> AlertLevel {
    if gap <= 20.0 {
        AlertLevel::Attention
    } else if gap <= 40.0 {
        AlertLevel::Warning
    } else {
        AlertLevel::Critical
    }
}

pub fn workload_level(active_tasks: i64, threshold: i64) -> Option<AlertLevel> {
    if threshold <= 0 || active_tasks < threshold {
        return None;
    }
    Some(if active_tasks * 2 >= threshold * 4 {
        AlertLevel::Critical
    } else if active_tasks * 2 >= threshold * 3 {
        AlertLevel::Warning
    } else {
        AlertLevel::Attention
    })
}

/// 按时间进度推算的应完成比例（0-100）
pub fn expected_progress(item: &ItemSnapshot, now: DateTime<Utc>) -> Option<f64> {
    let deadline = item.deadline?;
    let start = item.start_date.unwrap_or(item.created_at);
    let total = (deadline - start).num_seconds();
    if total <= 0 {
        return None;
    }
    let elapsed = (now - start).num_seconds().max(0);
    Some((elapsed as f64 / total as f64 * 100.0).min(100.0))
}

/// 进度滞后：完成率低于应完成比例的 70%，返回 (应完成比例, 差距)
pub fn progress_gap(item: &ItemSnapshot, now: DateTime<Utc>) -> Option<(f64, f64)> {
    if item.status != SupervisionStatus::InProgress {
        return None;
    }
    let expected = expected_progress(item, now)?;
    let actual = item.completion_rate as f64;
    if actual < expected * SLOW_PROGRESS_RATIO {
        Some((expected, expected - actual))
    } else {
        None
    }
}

pub fn is_past_deadline(item: &ItemSnapshot, now: DateTime<Utc>) -> bool {
    item.status.is_open() && item.deadline.is_some_and(|d| d < now)
}

/// 逾期状态扫描需要改为 overdue 的事项
pub fn overdue_sweep_targets(items: &[ItemSnapshot], now: DateTime<Utc>) -> Vec<Uuid> {
    items
        .iter()
        .filter(|i| is_past_deadline(i, now))
        .map(|i| i.id)
        .collect()
}

pub fn evaluate(
    items: &[ItemSnapshot],
    tasks: &[TaskSnapshot],
    workloads: &[WorkloadSnapshot],
    settings: &MonitoringConfig,
    now: DateTime<Utc>,
) -> Vec<AlertCandidate> {
    let mut alerts = Vec::new();

    for item in items {
        alerts.extend(item_alerts(item, settings, now));
    }

    for task in tasks {
        let Some(deadline) = task.deadline else { continue };
        if !task.status.is_active() || deadline >= now {
            continue;
        }
        let days = (now - deadline).num_days();
        alerts.push(AlertCandidate {
            alert_type: AlertType::TaskOverdue,
            alert_level: overdue_level(days),
            subject: AlertSubject::Task(task.id),
            supervision_item_id: Some(task.supervision_item_id),
            title: format!("任务逾期：{}", task.title),
            message: format!("任务已超过截止时间 {} 天", days),
            details: json!({
                "assignee_id": task.assignee_id,
                "deadline": deadline,
                "overdue_days": days,
            }),
        });
    }

    for workload in workloads {
        let Some(level) = workload_level(workload.active_tasks, settings.workload_threshold)
        else {
            continue;
        };
        alerts.push(AlertCandidate {
            alert_type: AlertType::HighWorkload,
            alert_level: level,
            subject: AlertSubject::User(workload.user_id),
            supervision_item_id: None,
            title: format!("工作负荷过高：{}", workload.real_name),
            message: format!("当前有 {} 项进行中的任务", workload.active_tasks),
            details: json!({
                "active_tasks": workload.active_tasks,
                "threshold": settings.workload_threshold,
            }),
        });
    }

    alerts
}

fn item_alerts(
    item: &ItemSnapshot,
    settings: &MonitoringConfig,
    now: DateTime<Utc>,
) -> Vec<AlertCandidate> {
    let mut alerts = Vec::new();
    let subject = AlertSubject::Item(item.id);
    let candidate = |alert_type, alert_level, title: String, message: String, details| {
        AlertCandidate {
            alert_type,
            alert_level,
            subject,
            supervision_item_id: Some(item.id),
            title,
            message,
            details,
        }
    };

    // 已被扫描标记为 overdue 的事项继续保持逾期预警
    let tracks_deadline = item.status.is_open() || item.status == SupervisionStatus::Overdue;
    if let Some(deadline) = item.deadline.filter(|_| tracks_deadline) {
        if deadline < now {
            let days = (now - deadline).num_days();
            alerts.push(candidate(
                AlertType::Overdue,
                overdue_level(days),
                format!("督办事项逾期：{}", item.title),
                format!("事项 {} 已超过截止时间 {} 天", item.number, days),
                json!({"deadline": deadline, "overdue_days": days}),
            ));
        } else if deadline <= now + Duration::days(settings.upcoming_days) {
            let days = (deadline - now).num_days();
            alerts.push(candidate(
                AlertType::UpcomingDeadline,
                upcoming_level(days),
                format!("督办事项即将到期：{}", item.title),
                format!("事项 {} 距截止还有 {} 天", item.number, days),
                json!({"deadline": deadline, "remaining_days": days}),
            ));
        }
    }

    if let Some((expected, gap)) = progress_gap(item, now) {
        alerts.push(candidate(
            AlertType::SlowProgress,
            slow_progress_level(gap),
            format!("进度滞后：{}", item.title),
            format!(
                "当前完成率 {}%，按时间应完成约 {:.0}%",
                item.completion_rate, expected
            ),
            json!({
                "completion_rate": item.completion_rate,
                "expected_rate": expected.round(),
                "gap": gap.round(),
            }),
        ));
    }

    let idle_cutoff = now - Duration::hours(settings.urgent_idle_hours);
    if item.urgency == Urgency::High && item.status.is_open() && item.updated_at < idle_cutoff {
        let idle_hours = (now - item.updated_at).num_hours();
        alerts.push(candidate(
            AlertType::UrgentNoProgress,
            AlertLevel::Critical,
            format!("紧急事项无进展：{}", item.title),
            format!("紧急事项已 {} 小时未更新", idle_hours),
            json!({"idle_hours": idle_hours}),
        ));
    }

    if item.status_changes >= QUALITY_RISK_STATUS_CHANGES && !item.status.is_terminal() {
        alerts.push(candidate(
            AlertType::QualityRisk,
            AlertLevel::Warning,
            format!("质量风险：{}", item.title),
            format!("事项状态已变更 {} 次", item.status_changes),
            json!({"status_changes": item.status_changes}),
        ));
    }

    alerts
}

/// 部门风险评分：逾期×10 + 低进度×5 + 紧急占比超过 30% 时的附加分
pub fn department_risk_score(total: i64, overdue: i64, slow: i64, urgent: i64) -> (i64, AlertLevel) {
    let mut score = overdue * 10 + slow * 5;
    if total > 0 {
        let urgent_ratio = urgent as f64 / total as f64;
        if urgent_ratio > 0.3 {
            score += (urgent_ratio * 20.0) as i64;
        }
    }

    let level = match score {
        s if s >= 50 => AlertLevel::Critical,
        s if s >= 25 => AlertLevel::Warning,
        s if s >= 10 => AlertLevel::Attention,
        _ => AlertLevel::Normal,
    };
    (score, level)
}

pub fn is_department_slow_item(status: SupervisionStatus, completion_rate: i32) -> bool {
    status == SupervisionStatus::InProgress && completion_rate < DEPARTMENT_SLOW_RATE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn item(status: SupervisionStatus) -> ItemSnapshot {
        ItemSnapshot {
            id: Uuid::new_v4(),
            number: "DB1".into(),
            title: "Road repair".into(),
            status,
            urgency: Urgency::Medium,
            start_date: None,
            deadline: None,
            completion_rate: 0,
            created_at: now() - Duration::days(10),
            updated_at: now(),
            status_changes: 1,
        }
    }

    fn types(alerts: &[AlertCandidate]) -> Vec<AlertType> {
        alerts.iter().map(|a| a.alert_type).collect()
    }

    #[test]
    fn test_levels() {
        assert_eq!(overdue_level(0), AlertLevel::Warning);
        assert_eq!(overdue_level(1), AlertLevel::Warning);
        assert_eq!(overdue_level(2), AlertLevel::Critical);
        assert_eq!(upcoming_level(3), AlertLevel::Attention);
        assert_eq!(upcoming_level(2), AlertLevel::Attention);
        assert_eq!(upcoming_level(1), AlertLevel::Warning);
        assert_eq!(upcoming_level(0), AlertLevel::Critical);
        assert_eq!(slow_progress_level(20.0), AlertLevel::Attention);
        assert_eq!(slow_progress_level(35.0), AlertLevel::Warning);
        assert_eq!(slow_progress_level(41.0), AlertLevel::Critical);
        assert_eq!(workload_level(9, 10), None);
        assert_eq!(workload_level(10, 10), Some(AlertLevel::Attention));
        assert_eq!(workload_level(15, 10), Some(AlertLevel::Warning));
        assert_eq!(workload_level(20, 10), Some(AlertLevel::Critical));
    }

    #[test]
    fn test_overdue_item() {
        let mut i = item(SupervisionStatus::InProgress);
        i.completion_rate = 95;
        i.deadline = Some(now() - Duration::days(3));
        let alerts = evaluate(&[i.clone()], &[], &[], &MonitoringConfig::default(), now());
        assert_eq!(types(&alerts), vec![AlertType::Overdue]);
        assert_eq!(alerts[0].alert_level, AlertLevel::Critical);
        assert_eq!(alerts[0].subject, AlertSubject::Item(i.id));

        i.status = SupervisionStatus::Overdue;
        let alerts = evaluate(&[i.clone()], &[], &[], &MonitoringConfig::default(), now());
        assert_eq!(types(&alerts), vec![AlertType::Overdue]);

        // closed items never alert on deadline
        i.status = SupervisionStatus::Completed;
        assert!(evaluate(&[i], &[], &[], &MonitoringConfig::default(), now()).is_empty());
    }

    #[test]
    fn test_upcoming_deadline_window() {
        let mut i = item(SupervisionStatus::Pending);
        i.deadline = Some(now() + Duration::hours(30));
        let alerts = evaluate(&[i.clone()], &[], &[], &MonitoringConfig::default(), now());
        assert_eq!(types(&alerts), vec![AlertType::UpcomingDeadline]);
        assert_eq!(alerts[0].alert_level, AlertLevel::Warning);

        i.deadline = Some(now() + Duration::days(10));
        assert!(evaluate(&[i], &[], &[], &MonitoringConfig::default(), now()).is_empty());
    }

    #[test]
    fn test_slow_progress() {
        let mut i = item(SupervisionStatus::InProgress);
        i.start_date = Some(now() - Duration::days(8));
        i.deadline = Some(now() + Duration::days(12));
        // 40% of time elapsed, 10% done: 10 < 28 so slow, gap 30
        i.completion_rate = 10;
        let (expected, gap) = progress_gap(&i, now()).unwrap();
        assert!((expected - 40.0).abs() < 0.01);
        assert!((gap - 30.0).abs() < 0.01);
        let alerts = evaluate(&[i.clone()], &[], &[], &MonitoringConfig::default(), now());
        assert_eq!(types(&alerts), vec![AlertType::SlowProgress]);
        assert_eq!(alerts[0].alert_level, AlertLevel::Warning);

        i.completion_rate = 30;
        assert!(progress_gap(&i, now()).is_none());
    }

    #[test]
    fn test_urgent_idle_and_quality_risk() {
        let mut i = item(SupervisionStatus::Pending);
        i.urgency = Urgency::High;
        i.updated_at = now() - Duration::hours(30);
        i.status_changes = 6;
        let alerts = evaluate(&[i], &[], &[], &MonitoringConfig::default(), now());
        assert_eq!(
            types(&alerts),
            vec![AlertType::UrgentNoProgress, AlertType::QualityRisk]
        );
        assert_eq!(alerts[0].alert_level, AlertLevel::Critical);
    }

    #[test]
    fn test_task_and_workload_alerts() {
        let task = TaskSnapshot {
            id: Uuid::new_v4(),
            supervision_item_id: Uuid::new_v4(),
            title: "Collect data".into(),
            assignee_id: Uuid::new_v4(),
            status: TaskStatus::Accepted,
            deadline: Some(now() - Duration::hours(5)),
        };
        let mut done = task.clone();
        done.id = Uuid::new_v4();
        done.status = TaskStatus::Completed;

        let workloads = vec![
            WorkloadSnapshot { user_id: Uuid::new_v4(), real_name: "Li".into(), active_tasks: 16 },
            WorkloadSnapshot { user_id: Uuid::new_v4(), real_name: "Wang".into(), active_tasks: 3 },
        ];
        let alerts = evaluate(&[], &[task.clone(), done], &workloads, &MonitoringConfig::default(), now());
        assert_eq!(types(&alerts), vec![AlertType::TaskOverdue, AlertType::HighWorkload]);
        assert_eq!(alerts[0].alert_level, AlertLevel::Warning);
        assert_eq!(alerts[0].supervision_item_id, Some(task.supervision_item_id));
        assert_eq!(alerts[1].alert_level, AlertLevel::Warning);
    }

    #[test]
    fn test_overdue_sweep_targets() {
        let mut late = item(SupervisionStatus::InProgress);
        late.deadline = Some(now() - Duration::minutes(1));
        let mut suspended = item(SupervisionStatus::Suspended);
        suspended.deadline = Some(now() - Duration::days(1));
        let mut future = item(SupervisionStatus::Pending);
        future.deadline = Some(now() + Duration::days(1));

        let targets = overdue_sweep_targets(&[late.clone(), suspended, future], now());
        assert_eq!(targets, vec![late.id]);
    }

    #[test]
    fn test_department_risk_score() {
        assert_eq!(department_risk_score(10, 0, 0, 0), (0, AlertLevel::Normal));
        assert_eq!(department_risk_score(10, 1, 0, 0), (10, AlertLevel::Attention));
        assert_eq!(department_risk_score(10, 2, 1, 0), (25, AlertLevel::Warning));
        // urgent ratio 0.5 adds 10
        assert_eq!(department_risk_score(10, 4, 0, 5), (50, AlertLevel::Critical));
        assert_eq!(department_risk_score(0, 0, 0, 0), (0, AlertLevel::Normal));
        assert!(is_department_slow_item(SupervisionStatus::InProgress, 20));
        assert!(!is_department_slow_item(SupervisionStatus::Pending, 20));
    }
}

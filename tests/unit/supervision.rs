use chrono::{Duration, TimeZone, Utc};
use supervision_backend::db::enums::{SupervisionStatus, TaskStatus, Urgency};
use supervision_backend::db::models::supervision::{ItemStatRow, is_past_deadline};
use supervision_backend::services::supervision_service::{
    compute_stats, derive_completion_rate, generate_number, overall_score, task_transition_allowed,
};
use supervision_backend::validation::supervision::{validate_evaluation_scores, validate_schedule};

fn row(status: SupervisionStatus, deadline_offset_days: Option<i64>) -> ItemStatRow {
    let now = Utc::now();
    ItemStatRow {
        status,
        urgency: Urgency::Medium,
        is_key: false,
        deadline: deadline_offset_days.map(|d| now + Duration::days(d)),
        efficiency_score: None,
        responsible_department_id: None,
        completion_rate: 0,
    }
}

#[test]
fn item_with_past_deadline_counts_as_overdue() {
    let rows = vec![
        row(SupervisionStatus::Pending, Some(-2)),
        row(SupervisionStatus::InProgress, Some(5)),
        // 已办结的事项即使过了截止时间也不算逾期
        row(SupervisionStatus::Completed, Some(-10)),
        row(SupervisionStatus::Overdue, None),
    ];
    let stats = compute_stats(&rows, Utc::now());
    assert_eq!(stats.total, 4);
    assert_eq!(stats.overdue, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.completion_rate, 25.0);
}

#[test]
fn status_machine_forbids_leaving_terminal_states() {
    use SupervisionStatus::*;
    assert!(Draft.can_transition_to(Pending));
    assert!(Pending.can_transition_to(InProgress));
    assert!(InProgress.can_transition_to(Completed));
    assert!(Overdue.can_transition_to(InProgress));

    assert!(!Draft.can_transition_to(Completed));
    for next in SupervisionStatus::ALL {
        assert!(!Completed.can_transition_to(*next));
        assert!(!Cancelled.can_transition_to(*next));
    }
}

#[test]
fn task_statuses_follow_assignment_lifecycle() {
    use TaskStatus::*;
    assert!(task_transition_allowed(Assigned, Accepted));
    assert!(task_transition_allowed(Accepted, InProgress));
    assert!(task_transition_allowed(InProgress, Completed));
    assert!(!task_transition_allowed(Completed, InProgress));
    assert!(!task_transition_allowed(Rejected, Accepted));
    assert!(!task_transition_allowed(InProgress, Accepted));
}

#[test]
fn completion_rate_prefers_tasks_over_reports() {
    assert_eq!(derive_completion_rate(&[100, 50, 0], Some(90)), Some(50));
    assert_eq!(derive_completion_rate(&[], Some(35)), Some(35));
    assert_eq!(derive_completion_rate(&[], None), None);
}

#[test]
fn evaluation_scores() {
    assert_eq!(overall_score(5.0, 4.0, 4.0), 4.33);
    assert!(validate_evaluation_scores(&[0.0, 2.5, 5.0]).is_ok());
    assert!(validate_evaluation_scores(&[5.5]).is_err());
    assert!(validate_evaluation_scores(&[f64::NAN]).is_err());
}

#[test]
fn numbers_carry_prefix_and_timestamp() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let number = generate_number(now);
    assert!(number.starts_with(&format!("DB{}", now.timestamp_millis())));
    assert_eq!(number.len(), 2 + now.timestamp_millis().to_string().len() + 4);
}

#[test]
fn schedule_requires_deadline_after_start() {
    let start = Utc::now();
    assert!(validate_schedule(Some(start), Some(start + Duration::days(1))).is_ok());
    assert!(validate_schedule(Some(start), Some(start)).is_err());
    assert!(validate_schedule(None, Some(start)).is_ok());
}

#[test]
fn past_deadline_items_count_as_overdue() {
    let now = Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap();
    let yesterday = Some(now - Duration::days(1));
    let tomorrow = Some(now + Duration::days(1));

    assert!(is_past_deadline(SupervisionStatus::InProgress, yesterday, now));
    assert!(is_past_deadline(SupervisionStatus::Pending, yesterday, now));
    assert!(is_past_deadline(SupervisionStatus::Overdue, yesterday, now));
    assert!(!is_past_deadline(SupervisionStatus::InProgress, tomorrow, now));
    assert!(!is_past_deadline(SupervisionStatus::InProgress, None, now));
    assert!(!is_past_deadline(SupervisionStatus::InProgress, Some(now), now));
    assert!(!is_past_deadline(SupervisionStatus::Completed, yesterday, now));
    assert!(!is_past_deadline(SupervisionStatus::Cancelled, yesterday, now));
}

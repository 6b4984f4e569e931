use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::enums::{StatusAction, SupervisionStatus, SupervisionType, TaskStatus, Urgency},
    db::models::api::{Page, PageParams, error_codes},
    db::models::department::Department,
    db::models::supervision::*,
    db::repositories::{departments::DepartmentRepo, supervision::SupervisionRepo},
    error::{AppError, AppResult},
    services::context::{RequestContext, permissions},
    validation::supervision::{validate_evaluation_scores, validate_schedule},
};

const RECENT_REPORTS: i64 = 5;
const NUMBER_ATTEMPTS: usize = 3;

pub struct SupervisionService;

/// 督办编号：DB + 毫秒时间戳 + 4 位随机数
pub fn generate_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("DB{}{:04}", now.timestamp_millis(), suffix)
}

/// 有任务时取任务完成率均值，否则取最新进度报告
pub fn derive_completion_rate(task_rates: &[i32], latest_report: Option<i32>) -> Option<i32> {
    if task_rates.is_empty() {
        return latest_report.map(|r| r.clamp(0, 100));
    }
    let sum: i64 = task_rates.iter().map(|r| *r as i64).sum();
    let mean = (sum as f64 / task_rates.len() as f64).round() as i32;
    Some(mean.clamp(0, 100))
}

pub fn overall_score(quality: f64, efficiency: f64, satisfaction: f64) -> f64 {
    let mean = (quality + efficiency + satisfaction) / 3.0;
    (mean * 100.0).round() / 100.0
}

/// 任务状态流转：completed、rejected 为终态
pub fn task_transition_allowed(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    if from == to {
        return false;
    }
    match from {
        Completed | Rejected => false,
        Assigned => matches!(to, Accepted | InProgress | Completed | Rejected | Overdue),
        Accepted => matches!(to, InProgress | Completed | Overdue),
        InProgress => matches!(to, Completed | Overdue),
        Overdue => matches!(to, InProgress | Completed),
    }
}

fn row_is_overdue(row: &ItemStatRow, now: DateTime<Utc>) -> bool {
    row.status == SupervisionStatus::Overdue || is_past_deadline(row.status, row.deadline, now)
}

fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64 * 10_000.0).round() / 100.0
    }
}

pub fn compute_stats(rows: &[ItemStatRow], now: DateTime<Utc>) -> SupervisionStats {
    let count = |f: &dyn Fn(&ItemStatRow) -> bool| rows.iter().filter(|r| f(r)).count() as i64;

    let total = rows.len() as i64;
    let completed = count(&|r| r.status == SupervisionStatus::Completed);
    let scores: Vec<f64> = rows.iter().filter_map(|r| r.efficiency_score).collect();
    let avg_efficiency = if scores.is_empty() {
        0.0
    } else {
        (scores.iter().sum::<f64>() / scores.len() as f64 * 100.0).round() / 100.0
    };

    SupervisionStats {
        total,
        pending: count(&|r| r.status == SupervisionStatus::Pending),
        in_progress: count(&|r| r.status == SupervisionStatus::InProgress),
        completed,
        overdue: count(&|r| row_is_overdue(r, now)),
        completion_rate: percentage(completed, total),
        avg_efficiency,
        urgent: count(&|r| r.urgency == Urgency::High && !r.status.is_terminal()),
        key: count(&|r| r.is_key),
    }
}

/// 按承办部门汇总，未指定部门的事项不计入
pub fn department_breakdown(
    rows: &[ItemStatRow],
    departments: &[Department],
    now: DateTime<Utc>,
) -> Vec<DepartmentSupervisionStats> {
    let mut grouped: HashMap<Uuid, Vec<&ItemStatRow>> = HashMap::new();
    for row in rows {
        if let Some(dept) = row.responsible_department_id {
            grouped.entry(dept).or_default().push(row);
        }
    }

    departments
        .iter()
        .map(|dept| {
            let items = grouped.get(&dept.id).map(Vec::as_slice).unwrap_or(&[]);
            let total = items.len() as i64;
            let completed = items
                .iter()
                .filter(|r| r.status == SupervisionStatus::Completed)
                .count() as i64;
            let overdue = items.iter().filter(|r| row_is_overdue(r, now)).count() as i64;
            DepartmentSupervisionStats {
                department_id: dept.id,
                department_name: dept.name.clone(),
                total,
                completed,
                overdue,
                completion_rate: percentage(completed, total),
            }
        })
        .collect()
}

fn ids_json(ids: &[Uuid]) -> serde_json::Value {
    json!(ids)
}

impl SupervisionService {
    // ---- items ----

    pub fn list(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &SupervisionFilter,
        page: PageParams,
    ) -> AppResult<Page<SupervisionItem>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let (items, total) = SupervisionRepo::list_items(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    fn load(conn: &mut PgConnection, item_id: Uuid) -> AppResult<SupervisionItem> {
        SupervisionRepo::find_item(conn, item_id)?
            .ok_or_else(|| AppError::not_found("supervision item"))
    }

    fn ensure_open(item: &SupervisionItem) -> AppResult<()> {
        if item.status.is_terminal() {
            return Err(AppError::invalid_state(
                format!("Supervision item is {}", item.status),
                error_codes::SUPERVISION_CLOSED,
            ));
        }
        Ok(())
    }

    pub fn get(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
    ) -> AppResult<SupervisionDetail> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let item = Self::load(conn, item_id)?;
        let tasks = SupervisionRepo::tasks_for_item(conn, item_id)?;
        let (recent_reports, _) = SupervisionRepo::reports_for_item(conn, item_id, 0, RECENT_REPORTS)?;
        Ok(SupervisionDetail {
            item,
            tasks,
            recent_reports,
        })
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateSupervisionRequest,
    ) -> AppResult<SupervisionItem> {
        ctx.require(permissions::SUPERVISION_CREATE)?;
        validate_schedule(req.start_date, req.deadline)?;
        if let Some(dept_id) = req.responsible_department_id {
            DepartmentRepo::find_by_id(conn, dept_id)?
                .ok_or_else(|| AppError::validation("Responsible department does not exist"))?;
        }

        let now = Utc::now();
        let mut number = generate_number(now);
        for _ in 1..NUMBER_ATTEMPTS {
            if !SupervisionRepo::number_exists(conn, &number)? {
                break;
            }
            number = generate_number(Utc::now());
        }

        let new_item = NewSupervisionItem {
            number,
            title: req.title.trim().to_string(),
            content: req.content.clone(),
            item_type: req.item_type.unwrap_or(SupervisionType::Regular),
            urgency: req.urgency.unwrap_or(Urgency::Medium),
            status: SupervisionStatus::Draft,
            creator_id: ctx.user_id,
            responsible_department_id: req.responsible_department_id,
            cooperating_departments: ids_json(&req.cooperating_departments),
            source: req.source.clone(),
            start_date: req.start_date,
            deadline: req.deadline,
            completion_rate: 0,
            expected_result: req.expected_result.clone(),
            is_public: req.is_public,
            is_key: req.is_key,
            tags: json!(req.tags),
        };

        let item = conn.transaction(|conn| {
            let item = SupervisionRepo::insert_item(conn, &new_item)?;
            SupervisionRepo::insert_log(
                conn,
                &NewStatusLog {
                    supervision_item_id: item.id,
                    operator_id: Some(ctx.user_id),
                    action_type: StatusAction::Create,
                    old_status: None,
                    new_status: Some(item.status),
                    reason: None,
                    action_time: now,
                    extra_data: None,
                },
            )?;
            Ok::<_, AppError>(item)
        })?;

        tracing::info!(item_id = %item.id, number = %item.number, "Supervision item created");
        Ok(item)
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        req: &UpdateSupervisionRequest,
    ) -> AppResult<SupervisionItem> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        let item = Self::load(conn, item_id)?;
        Self::ensure_open(&item)?;
        validate_schedule(
            req.start_date.or(item.start_date),
            req.deadline.or(item.deadline),
        )?;

        let changes = UpdateSupervisionItem {
            title: req.title.as_ref().map(|t| t.trim().to_string()),
            content: req.content.clone(),
            item_type: req.item_type,
            urgency: req.urgency,
            responsible_department_id: req.responsible_department_id,
            cooperating_departments: req.cooperating_departments.as_deref().map(ids_json),
            source: req.source.clone(),
            start_date: req.start_date,
            deadline: req.deadline,
            expected_result: req.expected_result.clone(),
            actual_result: req.actual_result.clone(),
            is_public: req.is_public,
            is_key: req.is_key,
            tags: req.tags.as_ref().map(|t| json!(t)),
            updated_at: Some(Utc::now()),
        };
        Ok(SupervisionRepo::update_item(conn, item_id, &changes)?)
    }

    pub fn delete(conn: &mut PgConnection, ctx: &RequestContext, item_id: Uuid) -> AppResult<()> {
        ctx.require(permissions::SUPERVISION_DELETE)?;
        Self::load(conn, item_id)?;
        SupervisionRepo::soft_delete_item(conn, item_id, Utc::now())?;
        tracing::info!(item_id = %item_id, operator = %ctx.user_id, "Supervision item deleted");
        Ok(())
    }

    pub fn change_status(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        req: &ChangeStatusRequest,
    ) -> AppResult<SupervisionItem> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;

        conn.transaction(|conn| {
            let item = SupervisionRepo::lock_item(conn, item_id)?
                .ok_or_else(|| AppError::not_found("supervision item"))?;

            if !item.status.can_transition_to(req.status) {
                return Err(AppError::invalid_state(
                    format!("Cannot change status from {} to {}", item.status, req.status),
                    error_codes::SUPERVISION_INVALID_TRANSITION,
                ));
            }

            let now = Utc::now();
            let updated = SupervisionRepo::set_status(conn, item_id, req.status, now)?;
            SupervisionRepo::insert_log(
                conn,
                &NewStatusLog {
                    supervision_item_id: item_id,
                    operator_id: Some(ctx.user_id),
                    action_type: StatusAction::StatusChange,
                    old_status: Some(item.status),
                    new_status: Some(req.status),
                    reason: req.reason.clone(),
                    action_time: now,
                    extra_data: None,
                },
            )?;

            tracing::info!(
                item_id = %item_id,
                from = %item.status,
                to = %req.status,
                "Supervision status changed"
            );
            Ok(updated)
        })
    }

    pub fn evaluate(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        req: &EvaluateRequest,
    ) -> AppResult<SupervisionItem> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        validate_evaluation_scores(&[
            req.quality_score,
            req.efficiency_score,
            req.satisfaction_score,
        ])?;
        let item = Self::load(conn, item_id)?;
        if item.status != SupervisionStatus::Completed {
            return Err(AppError::invalid_state(
                "Only completed items can be evaluated",
                error_codes::SUPERVISION_INVALID_TRANSITION,
            ));
        }

        let overall = overall_score(req.quality_score, req.efficiency_score, req.satisfaction_score);
        let now = Utc::now();
        conn.transaction(|conn| {
            let updated = SupervisionRepo::set_evaluation(
                conn,
                item_id,
                (req.quality_score, req.efficiency_score, req.satisfaction_score, overall),
                req.evaluation_comment.clone(),
                now,
            )?;
            SupervisionRepo::insert_log(
                conn,
                &NewStatusLog {
                    supervision_item_id: item_id,
                    operator_id: Some(ctx.user_id),
                    action_type: StatusAction::Evaluate,
                    old_status: Some(item.status),
                    new_status: Some(item.status),
                    reason: req.evaluation_comment.clone(),
                    action_time: now,
                    extra_data: Some(json!({
                        "quality_score": req.quality_score,
                        "efficiency_score": req.efficiency_score,
                        "satisfaction_score": req.satisfaction_score,
                        "overall_score": overall,
                    })),
                },
            )?;
            Ok(updated)
        })
    }

    pub fn logs(conn: &mut PgConnection, ctx: &RequestContext, item_id: Uuid) -> AppResult<Vec<StatusLog>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        Self::load(conn, item_id)?;
        Ok(SupervisionRepo::logs_for_item(conn, item_id)?)
    }

    pub fn overdue_items(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<Vec<SupervisionItem>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        Ok(SupervisionRepo::overdue_items(conn, Utc::now())?)
    }

    pub fn urgent_items(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<Vec<SupervisionItem>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        Ok(SupervisionRepo::urgent_items(conn)?)
    }

    pub fn stats(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        department_id: Option<Uuid>,
    ) -> AppResult<SupervisionStats> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let rows = SupervisionRepo::stat_rows(conn, department_id)?;
        Ok(compute_stats(&rows, Utc::now()))
    }

    pub fn department_stats(
        conn: &mut PgConnection,
        ctx: &RequestContext,
    ) -> AppResult<Vec<DepartmentSupervisionStats>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let rows = SupervisionRepo::stat_rows(conn, None)?;
        let departments = DepartmentRepo::list_enabled(conn)?;
        Ok(department_breakdown(&rows, &departments, Utc::now()))
    }

    /// 重新计算事项完成率，已办结事项保持 100
    fn refresh_completion_rate(conn: &mut PgConnection, item_id: Uuid) -> AppResult<()> {
        let item = Self::load(conn, item_id)?;
        if item.status == SupervisionStatus::Completed {
            return Ok(());
        }
        let rates = SupervisionRepo::task_rates_for_item(conn, item_id)?;
        let latest = if rates.is_empty() {
            SupervisionRepo::latest_report_rate(conn, item_id)?
        } else {
            None
        };
        if let Some(rate) = derive_completion_rate(&rates, latest) {
            if rate != item.completion_rate {
                SupervisionRepo::set_completion_rate(conn, item_id, rate, Utc::now())?;
            }
        }
        Ok(())
    }

    // ---- tasks ----

    pub fn list_tasks(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
    ) -> AppResult<Vec<TaskAssignment>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        Self::load(conn, item_id)?;
        Ok(SupervisionRepo::tasks_for_item(conn, item_id)?)
    }

    pub fn create_task(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        req: &CreateTaskRequest,
    ) -> AppResult<TaskAssignment> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        let item = Self::load(conn, item_id)?;
        Self::ensure_open(&item)?;
        validate_schedule(req.start_date, req.deadline)?;

        conn.transaction(|conn| {
            let task = SupervisionRepo::insert_task(
                conn,
                &NewTaskAssignment {
                    supervision_item_id: item_id,
                    title: req.title.trim().to_string(),
                    description: req.description.clone(),
                    assignee_id: req.assignee_id,
                    assigned_department_id: req.assigned_department_id,
                    assigner_id: ctx.user_id,
                    status: TaskStatus::Assigned,
                    priority: req.priority.unwrap_or(3),
                    start_date: req.start_date,
                    deadline: req.deadline,
                    completion_rate: 0,
                    estimated_hours: req.estimated_hours,
                },
            )?;
            Self::refresh_completion_rate(conn, item_id)?;
            Ok(task)
        })
    }

    fn load_task(conn: &mut PgConnection, task_id: Uuid) -> AppResult<TaskAssignment> {
        SupervisionRepo::find_task(conn, task_id)?.ok_or_else(|| AppError::not_found("task"))
    }

    fn check_task_transition(task: &TaskAssignment, to: TaskStatus) -> AppResult<()> {
        if !task_transition_allowed(task.status, to) {
            return Err(AppError::invalid_state(
                format!("Cannot change task status from {} to {}", task.status, to),
                error_codes::TASK_INVALID_TRANSITION,
            ));
        }
        Ok(())
    }

    pub fn update_task(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        task_id: Uuid,
        req: &UpdateTaskRequest,
    ) -> AppResult<TaskAssignment> {
        let task = Self::load_task(conn, task_id)?;
        // 承办人可以更新自己任务的进度
        if task.assignee_id != ctx.user_id {
            ctx.require(permissions::SUPERVISION_UPDATE)?;
        }
        if let Some(status) = req.status {
            Self::check_task_transition(&task, status)?;
        }

        let now = Utc::now();
        let completing = req.status == Some(TaskStatus::Completed);
        let changes = UpdateTaskAssignment {
            title: req.title.as_ref().map(|t| t.trim().to_string()),
            description: req.description.clone(),
            assignee_id: req.assignee_id,
            assigned_department_id: req.assigned_department_id,
            status: req.status,
            priority: req.priority,
            start_date: None,
            deadline: req.deadline,
            completion_date: completing.then_some(now),
            completion_rate: if completing { Some(100) } else { req.completion_rate },
            estimated_hours: req.estimated_hours,
            actual_hours: req.actual_hours,
            notes: req.notes.clone(),
            updated_at: Some(now),
        };

        conn.transaction(|conn| {
            let updated = SupervisionRepo::update_task(conn, task_id, &changes)?;
            Self::refresh_completion_rate(conn, updated.supervision_item_id)?;
            Ok(updated)
        })
    }

    pub fn accept_task(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        task_id: Uuid,
    ) -> AppResult<TaskAssignment> {
        let task = Self::load_task(conn, task_id)?;
        if task.assignee_id != ctx.user_id {
            return Err(AppError::forbidden("Only the assignee can accept this task"));
        }
        Self::check_task_transition(&task, TaskStatus::Accepted)?;

        let now = Utc::now();
        Ok(SupervisionRepo::update_task(
            conn,
            task_id,
            &UpdateTaskAssignment {
                status: Some(TaskStatus::Accepted),
                start_date: task.start_date.or(Some(now)),
                updated_at: Some(now),
                ..Default::default()
            },
        )?)
    }

    pub fn complete_task(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        task_id: Uuid,
        req: &CompleteTaskAssignmentRequest,
    ) -> AppResult<TaskAssignment> {
        let task = Self::load_task(conn, task_id)?;
        if task.assignee_id != ctx.user_id {
            return Err(AppError::forbidden("Only the assignee can complete this task"));
        }
        Self::check_task_transition(&task, TaskStatus::Completed)?;

        let now = Utc::now();
        conn.transaction(|conn| {
            let updated = SupervisionRepo::update_task(
                conn,
                task_id,
                &UpdateTaskAssignment {
                    status: Some(TaskStatus::Completed),
                    completion_date: Some(now),
                    completion_rate: Some(100),
                    actual_hours: req.actual_hours,
                    notes: req.notes.clone(),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            Self::refresh_completion_rate(conn, updated.supervision_item_id)?;
            Ok(updated)
        })
    }

    // ---- progress reports ----

    pub fn list_reports(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        page: PageParams,
    ) -> AppResult<Page<ProgressReport>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        Self::load(conn, item_id)?;
        let (items, total) = SupervisionRepo::reports_for_item(conn, item_id, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    pub fn create_report(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        item_id: Uuid,
        req: &CreateReportRequest,
    ) -> AppResult<ProgressReport> {
        let item = Self::load(conn, item_id)?;
        Self::ensure_open(&item)?;

        if let Some(task_id) = req.task_assignment_id {
            let task = Self::load_task(conn, task_id)?;
            if task.supervision_item_id != item_id {
                return Err(AppError::validation("Task does not belong to this supervision item"));
            }
            if task.assignee_id != ctx.user_id {
                ctx.require(permissions::SUPERVISION_UPDATE)?;
            }
        } else {
            ctx.require(permissions::SUPERVISION_UPDATE)?;
        }

        let new_report = NewProgressReport {
            supervision_item_id: item_id,
            task_assignment_id: req.task_assignment_id,
            reporter_id: ctx.user_id,
            title: req.title.trim().to_string(),
            content: req.content.clone(),
            progress_rate: req.progress_rate,
            completed_work: req.completed_work.clone(),
            next_plan: req.next_plan.clone(),
            issues: req.issues.clone(),
            support_needed: req.support_needed.clone(),
            estimated_completion: req.estimated_completion,
            risk_assessment: req.risk_assessment.clone(),
            is_important: req.is_important,
            report_date: Utc::now(),
        };

        conn.transaction(|conn| {
            let report = SupervisionRepo::insert_report(conn, &new_report)?;
            if let Some(task_id) = report.task_assignment_id {
                SupervisionRepo::update_task(
                    conn,
                    task_id,
                    &UpdateTaskAssignment {
                        completion_rate: Some(report.progress_rate),
                        updated_at: Some(report.report_date),
                        ..Default::default()
                    },
                )?;
            }
            Self::refresh_completion_rate(conn, item_id)?;
            Ok(report)
        })
    }

    pub fn update_report(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        report_id: Uuid,
        req: &UpdateReportRequest,
    ) -> AppResult<ProgressReport> {
        let report = SupervisionRepo::find_report(conn, report_id)?
            .ok_or_else(|| AppError::not_found("progress report"))?;
        if report.reporter_id != ctx.user_id {
            ctx.require(permissions::SUPERVISION_UPDATE)?;
        }

        let changes = UpdateProgressReport {
            title: req.title.as_ref().map(|t| t.trim().to_string()),
            content: req.content.clone(),
            progress_rate: req.progress_rate,
            completed_work: req.completed_work.clone(),
            next_plan: req.next_plan.clone(),
            issues: req.issues.clone(),
            support_needed: req.support_needed.clone(),
            estimated_completion: req.estimated_completion,
            risk_assessment: req.risk_assessment.clone(),
            is_important: req.is_important,
            updated_at: Some(Utc::now()),
        };

        conn.transaction(|conn| {
            let updated = SupervisionRepo::update_report(conn, report_id, &changes)?;
            if req.progress_rate.is_some() {
                Self::refresh_completion_rate(conn, updated.supervision_item_id)?;
            }
            Ok(updated)
        })
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

    fn row(status: SupervisionStatus) -> ItemStatRow {
        ItemStatRow {
            status,
            urgency: Urgency::Medium,
            is_key: false,
            deadline: None,
            efficiency_score: None,
            responsible_department_id: None,
            completion_rate: 0,
        }
    }

    #[test]
    fn test_number_format() {
        let number = generate_number(now());
        let millis = now().timestamp_millis().to_string();
        assert!(number.starts_with(&format!("DB{}", millis)));
        assert_eq!(number.len(), 2 + millis.len() + 4);
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_completion_rate_derivation() {
        assert_eq!(derive_completion_rate(&[50, 100, 0], Some(10)), Some(50));
        assert_eq!(derive_completion_rate(&[33, 34], None), Some(34));
        assert_eq!(derive_completion_rate(&[], Some(70)), Some(70));
        assert_eq!(derive_completion_rate(&[], None), None);
    }

    #[test]
    fn test_overall_score_is_mean() {
        assert_eq!(overall_score(5.0, 4.0, 3.0), 4.0);
        assert_eq!(overall_score(4.5, 4.0, 4.0), 4.17);
    }

    #[test]
    fn test_task_transitions() {
        assert!(task_transition_allowed(TaskStatus::Assigned, TaskStatus::Accepted));
        assert!(task_transition_allowed(TaskStatus::Accepted, TaskStatus::Completed));
        assert!(!task_transition_allowed(TaskStatus::Completed, TaskStatus::InProgress));
        assert!(!task_transition_allowed(TaskStatus::Accepted, TaskStatus::Accepted));
        assert!(!task_transition_allowed(TaskStatus::Rejected, TaskStatus::Accepted));
    }

    #[test]
    fn test_compute_stats() {
        let mut late = row(SupervisionStatus::InProgress);
        late.deadline = Some(now() - Duration::days(1));
        late.urgency = Urgency::High;
        let mut done = row(SupervisionStatus::Completed);
        done.deadline = Some(now() - Duration::days(5));
        done.efficiency_score = Some(4.0);
        done.is_key = true;
        let mut flagged = row(SupervisionStatus::Overdue);
        flagged.efficiency_score = Some(3.0);
        let pending = row(SupervisionStatus::Pending);

        let stats = compute_stats(&[late, done, flagged, pending], now());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.completion_rate, 25.0);
        assert_eq!(stats.avg_efficiency, 3.5);
        assert_eq!(stats.urgent, 1);
        assert_eq!(stats.key, 1);
    }

    #[test]
    fn test_empty_stats() {
        let stats = compute_stats(&[], now());
        assert_eq!(stats, SupervisionStats::default());
    }

    #[test]
    fn test_department_breakdown() {
        let dept = Department {
            id: Uuid::new_v4(),
            name: "财政局".into(),
            code: "FIN".into(),
            short_name: None,
            parent_id: None,
            level: 1,
            function_desc: None,
            manager_id: None,
            phone: None,
            email: None,
            address: None,
            sort_order: 0,
            is_enabled: true,
            created_at: now(),
            updated_at: now(),
        };
        let mut a = row(SupervisionStatus::Completed);
        a.responsible_department_id = Some(dept.id);
        let mut b = row(SupervisionStatus::InProgress);
        b.responsible_department_id = Some(dept.id);
        b.deadline = Some(now() - Duration::hours(2));
        let orphan = row(SupervisionStatus::Pending);

        let stats = department_breakdown(&[a, b, orphan], &[dept.clone()], now());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].department_name, "财政局");
        assert_eq!(stats[0].total, 2);
        assert_eq!(stats[0].completed, 1);
        assert_eq!(stats[0].overdue, 1);
        assert_eq!(stats[0].completion_rate, 50.0);
    }
}

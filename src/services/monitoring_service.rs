use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    config::MonitoringConfig,
    db::enums::{AlertLevel, AlertType, StatusAction, SupervisionStatus, Urgency},
    db::models::api::{Page, PageParams},
    db::models::department::Department,
    db::models::monitoring::*,
    db::models::supervision::{ItemStatRow, NewStatusLog, SupervisionItem},
    db::repositories::{
        departments::DepartmentRepo, monitoring::AlertRepo, notifications::NotificationRepo,
        supervision::SupervisionRepo, users::UserRepo,
    },
    error::{AppError, AppResult},
    monitoring::rules::{self, AlertCandidate, AlertSubject, ItemSnapshot, TaskSnapshot, WorkloadSnapshot},
    services::context::{RequestContext, permissions},
    services::notifications_service::alert_notifications,
};

const DASHBOARD_RECENT_ALERTS: i64 = 10;

pub struct MonitoringService;

/// 一次扫描需要执行的写操作
#[derive(Debug, Default, PartialEq)]
pub struct ScanPlan {
    pub create: Vec<AlertCandidate>,
    pub refresh: Vec<(Uuid, AlertCandidate)>,
    pub resolve: Vec<Uuid>,
}

fn alert_key(alert: &MonitoringAlert) -> Option<(AlertType, AlertSubject)> {
    let subject = match alert.alert_type {
        AlertType::TaskOverdue => alert.task_assignment_id.map(AlertSubject::Task),
        AlertType::HighWorkload => alert.user_id.map(AlertSubject::User),
        _ => alert.supervision_item_id.map(AlertSubject::Item),
    }?;
    Some((alert.alert_type, subject))
}

/// 每个 (类型, 对象) 只保留一条未处理预警：命中则刷新，新出现则创建，不再成立则关闭
pub fn plan_scan(existing: &[MonitoringAlert], candidates: Vec<AlertCandidate>) -> ScanPlan {
    let mut plan = ScanPlan::default();
    let mut open: HashMap<(AlertType, AlertSubject), Uuid> = HashMap::new();
    for alert in existing {
        match alert_key(alert) {
            Some(key) if !open.contains_key(&key) => {
                open.insert(key, alert.id);
            }
            _ => plan.resolve.push(alert.id),
        }
    }

    let mut seen = std::collections::HashSet::new();
    for candidate in candidates {
        let key = candidate.key();
        if !seen.insert(key) {
            continue;
        }
        match open.remove(&key) {
            Some(alert_id) => plan.refresh.push((alert_id, candidate)),
            None => plan.create.push(candidate),
        }
    }

    plan.resolve.extend(open.into_values());
    plan.resolve.sort();
    plan
}

fn new_alert(candidate: &AlertCandidate) -> NewMonitoringAlert {
    let (task_assignment_id, user_id) = match candidate.subject {
        AlertSubject::Task(id) => (Some(id), None),
        AlertSubject::User(id) => (None, Some(id)),
        AlertSubject::Item(_) => (None, None),
    };
    NewMonitoringAlert {
        alert_type: candidate.alert_type,
        alert_level: candidate.alert_level,
        title: candidate.title.clone(),
        message: candidate.message.clone(),
        supervision_item_id: candidate.supervision_item_id,
        task_assignment_id,
        user_id,
        details: Some(candidate.details.clone()),
        is_resolved: false,
    }
}

fn snapshot(item: &SupervisionItem, status_changes: i64) -> ItemSnapshot {
    ItemSnapshot {
        id: item.id,
        number: item.number.clone(),
        title: item.title.clone(),
        status: item.status,
        urgency: item.urgency,
        start_date: item.start_date,
        deadline: item.deadline,
        completion_rate: item.completion_rate,
        created_at: item.created_at,
        updated_at: item.updated_at,
        status_changes,
    }
}

pub fn build_stats(
    by_level: &[(AlertLevel, i64)],
    by_type: &[(AlertType, i64)],
    items: &[ItemSnapshot],
    workloads: &[(Uuid, i64)],
    settings: &MonitoringConfig,
    now: DateTime<Utc>,
) -> MonitoringStats {
    let level = |wanted: AlertLevel| {
        by_level
            .iter()
            .filter(|(l, _)| *l == wanted)
            .map(|(_, n)| *n)
            .sum::<i64>()
    };
    let upcoming_cutoff = now + Duration::days(settings.upcoming_days);

    let mut types: Vec<AlertTypeCount> = by_type
        .iter()
        .map(|(alert_type, count)| AlertTypeCount {
            alert_type: *alert_type,
            count: *count,
        })
        .collect();
    types.sort_by(|a, b| b.count.cmp(&a.count).then(a.alert_type.cmp(&b.alert_type)));

    MonitoringStats {
        unresolved: AlertCounts {
            total: by_level.iter().map(|(_, n)| *n).sum(),
            attention: level(AlertLevel::Attention),
            warning: level(AlertLevel::Warning),
            critical: level(AlertLevel::Critical),
        },
        by_type: types,
        overdue_items: items
            .iter()
            .filter(|i| i.status == SupervisionStatus::Overdue || rules::is_past_deadline(i, now))
            .count() as i64,
        upcoming_deadline_items: items
            .iter()
            .filter(|i| {
                i.status.is_open() && i.deadline.is_some_and(|d| d >= now && d <= upcoming_cutoff)
            })
            .count() as i64,
        overloaded_users: workloads
            .iter()
            .filter(|(_, n)| rules::workload_level(*n, settings.workload_threshold).is_some())
            .count() as i64,
        generated_at: Some(now),
    }
}

pub fn department_risk(dept: &Department, rows: &[ItemStatRow], now: DateTime<Utc>) -> DepartmentRisk {
    let live: Vec<&ItemStatRow> = rows
        .iter()
        .filter(|r| r.responsible_department_id == Some(dept.id) && !r.status.is_terminal())
        .collect();
    let total = live.len() as i64;
    let overdue = live
        .iter()
        .filter(|r| {
            r.status == SupervisionStatus::Overdue || r.deadline.is_some_and(|d| d < now)
        })
        .count() as i64;
    let slow = live
        .iter()
        .filter(|r| rules::is_department_slow_item(r.status, r.completion_rate))
        .count() as i64;
    let urgent = live.iter().filter(|r| r.urgency == Urgency::High).count() as i64;
    let (risk_score, risk_level) = rules::department_risk_score(total, overdue, slow, urgent);

    DepartmentRisk {
        department_id: dept.id,
        department_name: dept.name.clone(),
        total_items: total,
        overdue_items: overdue,
        slow_items: slow,
        urgent_items: urgent,
        risk_score,
        risk_level,
    }
}

impl MonitoringService {
    /// 逾期状态扫描：pending/in_progress 且已过截止时间的事项改为 overdue
    fn sweep_overdue(conn: &mut PgConnection, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let items = SupervisionRepo::overdue_items(conn, now)?;
        let mut swept = Vec::new();
        for item in items.iter().filter(|i| i.status.is_open()) {
            SupervisionRepo::set_status(conn, item.id, SupervisionStatus::Overdue, now)?;
            SupervisionRepo::insert_log(
                conn,
                &NewStatusLog {
                    supervision_item_id: item.id,
                    operator_id: None,
                    action_type: StatusAction::AutoStatusChange,
                    old_status: Some(item.status),
                    new_status: Some(SupervisionStatus::Overdue),
                    reason: Some("Deadline passed".to_string()),
                    action_time: now,
                    extra_data: None,
                },
            )?;
            swept.push(item.id);
        }
        Ok(swept)
    }

    pub fn update_overdue_status(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<usize> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        let now = Utc::now();
        let swept = conn.transaction(|conn| Self::sweep_overdue(conn, now))?;
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "Supervision items marked overdue");
        }
        Ok(swept.len())
    }

    pub fn scan(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        settings: &MonitoringConfig,
    ) -> AppResult<ScanSummary> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        let now = Utc::now();

        let summary = conn.transaction(|conn| {
            let swept = Self::sweep_overdue(conn, now)?;

            let changes: HashMap<Uuid, i64> =
                SupervisionRepo::status_change_counts(conn)?.into_iter().collect();
            let open_items = SupervisionRepo::open_items(conn)?;
            let items: Vec<ItemSnapshot> = open_items
                .iter()
                .map(|i| snapshot(i, changes.get(&i.id).copied().unwrap_or(0)))
                .collect();
            let owners: HashMap<Uuid, Uuid> = open_items.iter().map(|i| (i.id, i.creator_id)).collect();

            let tasks: Vec<TaskSnapshot> = SupervisionRepo::active_tasks(conn)?
                .into_iter()
                .map(|t| TaskSnapshot {
                    id: t.id,
                    supervision_item_id: t.supervision_item_id,
                    title: t.title,
                    assignee_id: t.assignee_id,
                    status: t.status,
                    deadline: t.deadline,
                })
                .collect();

            let counts = SupervisionRepo::workloads(conn)?;
            let busy: Vec<Uuid> = counts
                .iter()
                .filter(|(_, n)| *n >= settings.workload_threshold)
                .map(|(id, _)| *id)
                .collect();
            let names: HashMap<Uuid, String> = UserRepo::names_by_ids(conn, &busy)?.into_iter().collect();
            let workloads: Vec<WorkloadSnapshot> = counts
                .into_iter()
                .map(|(user_id, active_tasks)| WorkloadSnapshot {
                    user_id,
                    real_name: names.get(&user_id).cloned().unwrap_or_default(),
                    active_tasks,
                })
                .collect();

            let candidates = rules::evaluate(&items, &tasks, &workloads, settings, now);
            let existing = AlertRepo::unresolved(conn)?;
            let plan = plan_scan(&existing, candidates);

            let rows: Vec<NewMonitoringAlert> = plan.create.iter().map(new_alert).collect();
            AlertRepo::insert_many(conn, &rows)?;
            for (alert_id, candidate) in &plan.refresh {
                AlertRepo::refresh(
                    conn,
                    *alert_id,
                    candidate.alert_level,
                    &candidate.title,
                    &candidate.message,
                    &candidate.details,
                    now,
                )?;
            }
            AlertRepo::resolve_many(conn, &plan.resolve, now)?;

            let assignees: HashMap<Uuid, Uuid> = tasks.iter().map(|t| (t.id, t.assignee_id)).collect();
            let notices = alert_notifications(&plan.create, &owners, &assignees, now);
            let notified = NotificationRepo::insert_many(conn, &notices)?.len();

            Ok::<_, AppError>(ScanSummary {
                created: plan.create.len(),
                refreshed: plan.refresh.len(),
                resolved: plan.resolve.len(),
                marked_overdue: swept.len(),
                notified,
            })
        })?;

        tracing::info!(
            created = summary.created,
            refreshed = summary.refreshed,
            resolved = summary.resolved,
            marked_overdue = summary.marked_overdue,
            notified = summary.notified,
            "Monitoring scan finished"
        );
        Ok(summary)
    }

    pub fn stats(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        settings: &MonitoringConfig,
    ) -> AppResult<MonitoringStats> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let by_level = AlertRepo::unresolved_by_level(conn)?;
        let by_type = AlertRepo::unresolved_by_type(conn)?;
        let items: Vec<ItemSnapshot> = SupervisionRepo::open_items(conn)?
            .iter()
            .map(|i| snapshot(i, 0))
            .collect();
        let workloads = SupervisionRepo::workloads(conn)?;
        Ok(build_stats(&by_level, &by_type, &items, &workloads, settings, Utc::now()))
    }

    pub fn list_alerts(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &AlertFilter,
        page: PageParams,
    ) -> AppResult<Page<MonitoringAlert>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let (items, total) = AlertRepo::list(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    /// 已处理的预警直接返回
    pub fn resolve_alert(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        alert_id: Uuid,
    ) -> AppResult<MonitoringAlert> {
        ctx.require(permissions::SUPERVISION_UPDATE)?;
        let alert = AlertRepo::find_by_id(conn, alert_id)?.ok_or_else(|| AppError::not_found("alert"))?;
        if alert.is_resolved {
            return Ok(alert);
        }
        Ok(AlertRepo::resolve(conn, alert_id, Some(ctx.user_id), Utc::now())?)
    }

    pub fn department_risk(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        dept_id: Uuid,
    ) -> AppResult<DepartmentRisk> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let dept = DepartmentRepo::find_by_id(conn, dept_id)?
            .ok_or_else(|| AppError::not_found("department"))?;
        let rows = SupervisionRepo::stat_rows(conn, Some(dept_id))?;
        Ok(department_risk(&dept, &rows, Utc::now()))
    }

    /// 风险由高到低排列
    pub fn department_risks(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<Vec<DepartmentRisk>> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let rows = SupervisionRepo::stat_rows(conn, None)?;
        let now = Utc::now();
        let mut grouped: BTreeMap<Uuid, Vec<ItemStatRow>> = BTreeMap::new();
        for row in rows {
            if let Some(dept) = row.responsible_department_id {
                grouped.entry(dept).or_default().push(row);
            }
        }
        let mut risks: Vec<DepartmentRisk> = DepartmentRepo::list_enabled(conn)?
            .iter()
            .map(|d| department_risk(d, grouped.get(&d.id).map(Vec::as_slice).unwrap_or(&[]), now))
            .collect();
        risks.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
        Ok(risks)
    }

    pub fn dashboard(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        settings: &MonitoringConfig,
    ) -> AppResult<MonitoringDashboard> {
        let stats = Self::stats(conn, ctx, settings)?;
        let recent_alerts = AlertRepo::recent(conn, DASHBOARD_RECENT_ALERTS)?;
        let department_risks = Self::department_risks(conn, ctx)?;
        Ok(MonitoringDashboard {
            stats,
            recent_alerts,
            department_risks,
        })
    }
}

use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{StatusAction, SupervisionStatus, TaskStatus, Urgency};
use crate::db::models::supervision::{
    CLOSED_STATUSES, ItemStatRow, NewProgressReport, NewStatusLog, NewSupervisionItem,
    NewTaskAssignment, ProgressReport, StatusLog, SupervisionFilter, SupervisionItem,
    TaskAssignment, UpdateProgressReport, UpdateSupervisionItem, UpdateTaskAssignment,
};
use crate::schema::{progress_reports, status_logs, supervision_items, task_assignments};

const ACTIVE_TASK_STATUSES: [TaskStatus; 3] = [
    TaskStatus::Assigned,
    TaskStatus::Accepted,
    TaskStatus::InProgress,
];

pub struct SupervisionRepo;

impl SupervisionRepo {
    // ---- supervision items ----

    pub fn find_item(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Option<SupervisionItem>, diesel::result::Error> {
        supervision_items::table
            .find(item_id)
            .filter(supervision_items::is_deleted.eq(false))
            .select(SupervisionItem::as_select())
            .first(conn)
            .optional()
    }

    /// 行锁读取，用于状态变更等需要串行化的写操作
    pub fn lock_item(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Option<SupervisionItem>, diesel::result::Error> {
        supervision_items::table
            .find(item_id)
            .filter(supervision_items::is_deleted.eq(false))
            .select(SupervisionItem::as_select())
            .for_update()
            .first(conn)
            .optional()
    }

    pub fn number_exists(
        conn: &mut PgConnection,
        item_number: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::supervision_items::dsl::*;
        diesel::select(diesel::dsl::exists(supervision_items.filter(number.eq(item_number))))
            .get_result(conn)
    }

    pub fn insert_item(
        conn: &mut PgConnection,
        new_item: &NewSupervisionItem,
    ) -> Result<SupervisionItem, diesel::result::Error> {
        diesel::insert_into(supervision_items::table)
            .values(new_item)
            .returning(SupervisionItem::as_returning())
            .get_result(conn)
    }

    pub fn update_item(
        conn: &mut PgConnection,
        item_id: Uuid,
        changes: &UpdateSupervisionItem,
    ) -> Result<SupervisionItem, diesel::result::Error> {
        diesel::update(supervision_items::table.find(item_id))
            .set(changes)
            .returning(SupervisionItem::as_returning())
            .get_result(conn)
    }

    pub fn soft_delete_item(
        conn: &mut PgConnection,
        item_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::supervision_items::dsl::*;
        diesel::update(supervision_items.find(item_id))
            .set((is_deleted.eq(true), deleted_at.eq(Some(at)), updated_at.eq(at)))
            .execute(conn)
    }

    pub fn set_status(
        conn: &mut PgConnection,
        item_id: Uuid,
        new_status: SupervisionStatus,
        at: DateTime<Utc>,
    ) -> Result<SupervisionItem, diesel::result::Error> {
        use crate::schema::supervision_items::dsl::*;
        if new_status == SupervisionStatus::Completed {
            return diesel::update(supervision_items.find(item_id))
                .set((
                    status.eq(new_status),
                    actual_completion_date.eq(Some(at)),
                    completion_rate.eq(100),
                    updated_at.eq(at),
                ))
                .returning(SupervisionItem::as_returning())
                .get_result(conn);
        }
        diesel::update(supervision_items.find(item_id))
            .set((status.eq(new_status), updated_at.eq(at)))
            .returning(SupervisionItem::as_returning())
            .get_result(conn)
    }

    pub fn set_completion_rate(
        conn: &mut PgConnection,
        item_id: Uuid,
        rate: i32,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::supervision_items::dsl::*;
        diesel::update(supervision_items.find(item_id))
            .set((completion_rate.eq(rate), updated_at.eq(at)))
            .execute(conn)
    }

    pub fn set_evaluation(
        conn: &mut PgConnection,
        item_id: Uuid,
        scores: (f64, f64, f64, f64),
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<SupervisionItem, diesel::result::Error> {
        use crate::schema::supervision_items::dsl::*;
        diesel::update(supervision_items.find(item_id))
            .set((
                quality_score.eq(Some(scores.0)),
                efficiency_score.eq(Some(scores.1)),
                satisfaction_score.eq(Some(scores.2)),
                overall_score.eq(Some(scores.3)),
                evaluation_comment.eq(comment),
                updated_at.eq(at),
            ))
            .returning(SupervisionItem::as_returning())
            .get_result(conn)
    }

    fn filtered<'a>(filter: &'a SupervisionFilter) -> supervision_items::BoxedQuery<'a, Pg> {
        let mut query = supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .into_boxed();
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                supervision_items::title
                    .ilike(pattern.clone())
                    .or(supervision_items::number.ilike(pattern.clone()))
                    .or(supervision_items::content.ilike(pattern)),
            );
        }
        if let Some(kind) = filter.item_type {
            query = query.filter(supervision_items::item_type.eq(kind));
        }
        if let Some(state) = filter.status {
            query = query.filter(supervision_items::status.eq(state));
        }
        if let Some(level) = filter.urgency {
            query = query.filter(supervision_items::urgency.eq(level));
        }
        if let Some(creator) = filter.creator_id {
            query = query.filter(supervision_items::creator_id.eq(creator));
        }
        if let Some(dept) = filter.responsible_department_id {
            query = query.filter(supervision_items::responsible_department_id.eq(dept));
        }
        if let Some(key) = filter.is_key {
            query = query.filter(supervision_items::is_key.eq(key));
        }
        if let Some(from) = filter.start_date_from {
            query = query.filter(supervision_items::start_date.ge(from));
        }
        if let Some(to) = filter.start_date_to {
            query = query.filter(supervision_items::start_date.le(to));
        }
        if let Some(from) = filter.deadline_from {
            query = query.filter(supervision_items::deadline.ge(from));
        }
        if let Some(to) = filter.deadline_to {
            query = query.filter(supervision_items::deadline.le(to));
        }
        query
    }

    pub fn list_items(
        conn: &mut PgConnection,
        filter: &SupervisionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<SupervisionItem>, i64), diesel::result::Error> {
        let total = Self::filtered(filter).count().get_result(conn)?;
        let items = Self::filtered(filter)
            .order(supervision_items::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(SupervisionItem::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    /// 满足 [`is_past_deadline`](crate::db::models::supervision::is_past_deadline) 的事项，按截止时间升序
    pub fn overdue_items(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<Vec<SupervisionItem>, diesel::result::Error> {
        supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .filter(supervision_items::status.ne_all(CLOSED_STATUSES.to_vec()))
            .filter(supervision_items::deadline.lt(now))
            .order(supervision_items::deadline.asc())
            .select(SupervisionItem::as_select())
            .load(conn)
    }

    pub fn urgent_items(conn: &mut PgConnection) -> Result<Vec<SupervisionItem>, diesel::result::Error> {
        supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .filter(supervision_items::urgency.eq(Urgency::High))
            .filter(supervision_items::status.eq_any(vec![
                SupervisionStatus::Pending,
                SupervisionStatus::InProgress,
            ]))
            .order(supervision_items::deadline.asc().nulls_last())
            .select(SupervisionItem::as_select())
            .load(conn)
    }

    /// 未结束（非 completed/cancelled）的全部事项，供预警扫描使用
    pub fn open_items(conn: &mut PgConnection) -> Result<Vec<SupervisionItem>, diesel::result::Error> {
        supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .filter(supervision_items::status.ne_all(CLOSED_STATUSES.to_vec()))
            .select(SupervisionItem::as_select())
            .load(conn)
    }

    pub fn stat_rows(
        conn: &mut PgConnection,
        department: Option<Uuid>,
    ) -> Result<Vec<ItemStatRow>, diesel::result::Error> {
        let mut query = supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .into_boxed();
        if let Some(dept) = department {
            query = query.filter(supervision_items::responsible_department_id.eq(dept));
        }
        query
            .select((
                supervision_items::status,
                supervision_items::urgency,
                supervision_items::is_key,
                supervision_items::deadline,
                supervision_items::efficiency_score,
                supervision_items::responsible_department_id,
                supervision_items::completion_rate,
            ))
            .load(conn)
    }

    pub fn count_live_by_department(
        conn: &mut PgConnection,
        dept_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        supervision_items::table
            .filter(supervision_items::is_deleted.eq(false))
            .filter(supervision_items::responsible_department_id.eq(dept_id))
            .count()
            .get_result(conn)
    }

    // ---- task assignments ----

    pub fn insert_task(
        conn: &mut PgConnection,
        new_task: &NewTaskAssignment,
    ) -> Result<TaskAssignment, diesel::result::Error> {
        diesel::insert_into(task_assignments::table)
            .values(new_task)
            .returning(TaskAssignment::as_returning())
            .get_result(conn)
    }

    pub fn find_task(
        conn: &mut PgConnection,
        task_id: Uuid,
    ) -> Result<Option<TaskAssignment>, diesel::result::Error> {
        task_assignments::table
            .find(task_id)
            .select(TaskAssignment::as_select())
            .first(conn)
            .optional()
    }

    pub fn update_task(
        conn: &mut PgConnection,
        task_id: Uuid,
        changes: &UpdateTaskAssignment,
    ) -> Result<TaskAssignment, diesel::result::Error> {
        diesel::update(task_assignments::table.find(task_id))
            .set(changes)
            .returning(TaskAssignment::as_returning())
            .get_result(conn)
    }

    pub fn tasks_for_item(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Vec<TaskAssignment>, diesel::result::Error> {
        task_assignments::table
            .filter(task_assignments::supervision_item_id.eq(item_id))
            .order(task_assignments::created_at.asc())
            .select(TaskAssignment::as_select())
            .load(conn)
    }

    pub fn task_rates_for_item(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Vec<i32>, diesel::result::Error> {
        task_assignments::table
            .filter(task_assignments::supervision_item_id.eq(item_id))
            .filter(task_assignments::status.ne(TaskStatus::Rejected))
            .select(task_assignments::completion_rate)
            .load(conn)
    }

    pub fn active_tasks(conn: &mut PgConnection) -> Result<Vec<TaskAssignment>, diesel::result::Error> {
        task_assignments::table
            .filter(task_assignments::status.eq_any(ACTIVE_TASK_STATUSES.to_vec()))
            .select(TaskAssignment::as_select())
            .load(conn)
    }

    /// 每位承办人进行中的任务数
    pub fn workloads(conn: &mut PgConnection) -> Result<Vec<(Uuid, i64)>, diesel::result::Error> {
        task_assignments::table
            .filter(task_assignments::status.eq_any(ACTIVE_TASK_STATUSES.to_vec()))
            .group_by(task_assignments::assignee_id)
            .select((task_assignments::assignee_id, count_star()))
            .load(conn)
    }

    // ---- progress reports ----

    pub fn insert_report(
        conn: &mut PgConnection,
        new_report: &NewProgressReport,
    ) -> Result<ProgressReport, diesel::result::Error> {
        diesel::insert_into(progress_reports::table)
            .values(new_report)
            .returning(ProgressReport::as_returning())
            .get_result(conn)
    }

    pub fn find_report(
        conn: &mut PgConnection,
        report_id: Uuid,
    ) -> Result<Option<ProgressReport>, diesel::result::Error> {
        progress_reports::table
            .find(report_id)
            .select(ProgressReport::as_select())
            .first(conn)
            .optional()
    }

    pub fn update_report(
        conn: &mut PgConnection,
        report_id: Uuid,
        changes: &UpdateProgressReport,
    ) -> Result<ProgressReport, diesel::result::Error> {
        diesel::update(progress_reports::table.find(report_id))
            .set(changes)
            .returning(ProgressReport::as_returning())
            .get_result(conn)
    }

    pub fn reports_for_item(
        conn: &mut PgConnection,
        item_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ProgressReport>, i64), diesel::result::Error> {
        let total = progress_reports::table
            .filter(progress_reports::supervision_item_id.eq(item_id))
            .count()
            .get_result(conn)?;
        let items = progress_reports::table
            .filter(progress_reports::supervision_item_id.eq(item_id))
            .order((progress_reports::report_date.desc(), progress_reports::created_at.desc()))
            .offset(offset)
            .limit(limit)
            .select(ProgressReport::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn latest_report_rate(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Option<i32>, diesel::result::Error> {
        progress_reports::table
            .filter(progress_reports::supervision_item_id.eq(item_id))
            .order((progress_reports::report_date.desc(), progress_reports::created_at.desc()))
            .select(progress_reports::progress_rate)
            .first(conn)
            .optional()
    }

    // ---- status logs ----

    pub fn insert_log(
        conn: &mut PgConnection,
        log: &NewStatusLog,
    ) -> Result<usize, diesel::result::Error> {
        diesel::insert_into(status_logs::table)
            .values(log)
            .execute(conn)
    }

    pub fn logs_for_item(
        conn: &mut PgConnection,
        item_id: Uuid,
    ) -> Result<Vec<StatusLog>, diesel::result::Error> {
        status_logs::table
            .filter(status_logs::supervision_item_id.eq(item_id))
            .order(status_logs::action_time.desc())
            .select(StatusLog::as_select())
            .load(conn)
    }

    /// 每个事项的人工状态变更次数
    pub fn status_change_counts(
        conn: &mut PgConnection,
    ) -> Result<Vec<(Uuid, i64)>, diesel::result::Error> {
        status_logs::table
            .filter(status_logs::action_type.eq(StatusAction::StatusChange))
            .group_by(status_logs::supervision_item_id)
            .select((status_logs::supervision_item_id, count_star()))
            .load(conn)
    }
}

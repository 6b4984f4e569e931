use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{AlertLevel, AlertType};
use crate::db::models::monitoring::{AlertFilter, MonitoringAlert, NewMonitoringAlert};
use crate::schema::monitoring_alerts;

pub struct AlertRepo;

impl AlertRepo {
    pub fn unresolved(conn: &mut PgConnection) -> Result<Vec<MonitoringAlert>, diesel::result::Error> {
        monitoring_alerts::table
            .filter(monitoring_alerts::is_resolved.eq(false))
            .select(MonitoringAlert::as_select())
            .load(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        alert_id: Uuid,
    ) -> Result<Option<MonitoringAlert>, diesel::result::Error> {
        monitoring_alerts::table
            .find(alert_id)
            .select(MonitoringAlert::as_select())
            .first(conn)
            .optional()
    }

    pub fn insert_many(
        conn: &mut PgConnection,
        rows: &[NewMonitoringAlert],
    ) -> Result<usize, diesel::result::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(monitoring_alerts::table)
            .values(rows)
            .execute(conn)
    }

    /// 同一对象的同类预警再次命中时刷新级别与内容
    pub fn refresh(
        conn: &mut PgConnection,
        alert_id: Uuid,
        level: AlertLevel,
        title: &str,
        message: &str,
        details: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(monitoring_alerts::table.find(alert_id))
            .set((
                monitoring_alerts::alert_level.eq(level),
                monitoring_alerts::title.eq(title),
                monitoring_alerts::message.eq(message),
                monitoring_alerts::details.eq(Some(details)),
                monitoring_alerts::updated_at.eq(at),
            ))
            .execute(conn)
    }

    pub fn resolve(
        conn: &mut PgConnection,
        alert_id: Uuid,
        resolver: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<MonitoringAlert, diesel::result::Error> {
        diesel::update(monitoring_alerts::table.find(alert_id))
            .set((
                monitoring_alerts::is_resolved.eq(true),
                monitoring_alerts::resolved_by.eq(resolver),
                monitoring_alerts::resolved_at.eq(Some(at)),
                monitoring_alerts::updated_at.eq(at),
            ))
            .returning(MonitoringAlert::as_returning())
            .get_result(conn)
    }

    /// 条件不再成立的预警自动关闭（resolved_by 为空）
    pub fn resolve_many(
        conn: &mut PgConnection,
        ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        diesel::update(monitoring_alerts::table.filter(monitoring_alerts::id.eq_any(ids)))
            .set((
                monitoring_alerts::is_resolved.eq(true),
                monitoring_alerts::resolved_at.eq(Some(at)),
                monitoring_alerts::updated_at.eq(at),
            ))
            .execute(conn)
    }

    fn filtered<'a>(filter: &'a AlertFilter) -> monitoring_alerts::BoxedQuery<'a, Pg> {
        let mut query = monitoring_alerts::table.into_boxed();
        if let Some(kind) = filter.alert_type {
            query = query.filter(monitoring_alerts::alert_type.eq(kind));
        }
        if let Some(level) = filter.alert_level {
            query = query.filter(monitoring_alerts::alert_level.eq(level));
        }
        if let Some(resolved) = filter.is_resolved {
            query = query.filter(monitoring_alerts::is_resolved.eq(resolved));
        }
        if let Some(item) = filter.supervision_item_id {
            query = query.filter(monitoring_alerts::supervision_item_id.eq(item));
        }
        query
    }

    pub fn list(
        conn: &mut PgConnection,
        filter: &AlertFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<MonitoringAlert>, i64), diesel::result::Error> {
        let total = Self::filtered(filter).count().get_result(conn)?;
        let items = Self::filtered(filter)
            .order(monitoring_alerts::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(MonitoringAlert::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn unresolved_by_level(
        conn: &mut PgConnection,
    ) -> Result<Vec<(AlertLevel, i64)>, diesel::result::Error> {
        monitoring_alerts::table
            .filter(monitoring_alerts::is_resolved.eq(false))
            .group_by(monitoring_alerts::alert_level)
            .select((monitoring_alerts::alert_level, count_star()))
            .load(conn)
    }

    pub fn unresolved_by_type(
        conn: &mut PgConnection,
    ) -> Result<Vec<(AlertType, i64)>, diesel::result::Error> {
        monitoring_alerts::table
            .filter(monitoring_alerts::is_resolved.eq(false))
            .group_by(monitoring_alerts::alert_type)
            .select((monitoring_alerts::alert_type, count_star()))
            .load(conn)
    }

    pub fn recent(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<MonitoringAlert>, diesel::result::Error> {
        monitoring_alerts::table
            .filter(monitoring_alerts::is_resolved.eq(false))
            .order((monitoring_alerts::updated_at.desc(), monitoring_alerts::created_at.desc()))
            .limit(limit)
            .select(MonitoringAlert::as_select())
            .load(conn)
    }
}

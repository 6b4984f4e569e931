use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::models::supervision::{
        DepartmentSupervisionStats, SupervisionFilter, SupervisionItem, SupervisionStats,
    },
    db::models::workflow::WorkflowStats,
    db::repositories::{
        departments::DepartmentRepo, supervision::SupervisionRepo, workflows::WorkflowRepo,
    },
    error::AppResult,
    services::context::{RequestContext, permissions},
    services::supervision_service::{compute_stats, department_breakdown},
};

/// 单次导出的最大行数
const EXPORT_LIMIT: i64 = 10_000;

const CSV_HEADER: [&str; 11] = [
    "编号",
    "标题",
    "类型",
    "紧急程度",
    "状态",
    "承办部门",
    "开始时间",
    "截止时间",
    "完成率",
    "综合评分",
    "创建时间",
];

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalyticsOverview {
    pub supervision: SupervisionStats,
    pub workflow: WorkflowStats,
    pub departments: Vec<DepartmentSupervisionStats>,
}

pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

pub struct AnalyticsService;

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = fields
        .into_iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// 督办事项导出为 CSV，带 BOM 以便表格软件识别 UTF-8
pub fn items_to_csv(items: &[SupervisionItem], departments: &HashMap<Uuid, String>) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str(&csv_line(CSV_HEADER));

    let time = |t: Option<chrono::DateTime<Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };
    for item in items {
        let department = item
            .responsible_department_id
            .and_then(|id| departments.get(&id).cloned())
            .unwrap_or_default();
        out.push_str(&csv_line([
            item.number.clone(),
            item.title.clone(),
            item.item_type.to_string(),
            item.urgency.to_string(),
            item.status.to_string(),
            department,
            time(item.start_date),
            time(item.deadline),
            format!("{}%", item.completion_rate),
            item.overall_score.map(|s| format!("{:.2}", s)).unwrap_or_default(),
            time(Some(item.created_at)),
        ]));
    }
    out
}

impl AnalyticsService {
    pub fn overview(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<AnalyticsOverview> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let now = Utc::now();
        let rows = SupervisionRepo::stat_rows(conn, None)?;
        let departments = DepartmentRepo::list_enabled(conn)?;
        Ok(AnalyticsOverview {
            supervision: compute_stats(&rows, now),
            workflow: WorkflowRepo::stats(conn)?,
            departments: department_breakdown(&rows, &departments, now),
        })
    }

    pub fn export(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &SupervisionFilter,
    ) -> AppResult<CsvExport> {
        ctx.require(permissions::SUPERVISION_READ)?;
        let (items, total) = SupervisionRepo::list_items(conn, filter, 0, EXPORT_LIMIT)?;
        if total > EXPORT_LIMIT {
            tracing::warn!(total, limit = EXPORT_LIMIT, "Export truncated");
        }
        let departments: HashMap<Uuid, String> = DepartmentRepo::list_enabled(conn)?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        Ok(CsvExport {
            filename: format!("supervision_{}.csv", Utc::now().format("%Y%m%d%H%M%S")),
            content: items_to_csv(&items, &departments),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{SupervisionStatus, SupervisionType, Urgency};
    use serde_json::json;

    fn item() -> SupervisionItem {
        let created = chrono::DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        SupervisionItem {
            id: Uuid::new_v4(),
            number: "DB17000000000001234".into(),
            title: "道路修缮, 二期".into(),
            content: "content".into(),
            item_type: SupervisionType::Key,
            urgency: Urgency::High,
            status: SupervisionStatus::InProgress,
            creator_id: Uuid::new_v4(),
            responsible_department_id: None,
            cooperating_departments: json!([]),
            source: None,
            start_date: None,
            deadline: Some(created),
            actual_completion_date: None,
            completion_rate: 40,
            expected_result: None,
            actual_result: None,
            quality_score: None,
            efficiency_score: None,
            satisfaction_score: None,
            overall_score: Some(4.5),
            evaluation_comment: None,
            is_public: false,
            is_key: true,
            tags: json!([]),
            is_deleted: false,
            deleted_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_items_to_csv() {
        let dept = Uuid::new_v4();
        let mut it = item();
        it.responsible_department_id = Some(dept);
        let names = HashMap::from([(dept, "交通局".to_string())]);

        let csv = items_to_csv(&[it], &names);
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert!(lines[0].starts_with("编号,标题"));
        assert_eq!(
            lines[1],
            "DB17000000000001234,\"道路修缮, 二期\",key,high,in_progress,交通局,,2024-05-01 08:30,40%,4.50,2024-05-01 08:30"
        );
        assert_eq!(lines[2], "");
    }
}

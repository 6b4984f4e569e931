use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{NodeStatus, WorkflowStatus};
use crate::db::models::workflow::{
    InstanceFilter, MyTask, NewWorkflowInstance, NewWorkflowNode, NewWorkflowTemplate,
    NewWorkflowTransition, TemplateFilter, UpdateWorkflowInstance, UpdateWorkflowNode,
    UpdateWorkflowTemplate, WorkflowInstance, WorkflowNode, WorkflowStats, WorkflowTemplate,
    WorkflowTransition,
};
use crate::schema::{workflow_instances, workflow_nodes, workflow_templates, workflow_transitions};

/// 仍在流转中的实例状态，模板被这些实例引用时不可删除
pub const LIVE_INSTANCE_STATUSES: [WorkflowStatus; 3] = [
    WorkflowStatus::Draft,
    WorkflowStatus::Active,
    WorkflowStatus::Suspended,
];

pub struct WorkflowRepo;

impl WorkflowRepo {
    // ---- templates ----

    fn filtered_templates<'a>(
        filter: &'a TemplateFilter,
    ) -> workflow_templates::BoxedQuery<'a, Pg> {
        let mut query = workflow_templates::table.into_boxed();
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                workflow_templates::name
                    .ilike(pattern.clone())
                    .or(workflow_templates::code.ilike(pattern)),
            );
        }
        if let Some(ref kind) = filter.template_type {
            query = query.filter(workflow_templates::template_type.eq(kind));
        }
        if let Some(enabled) = filter.is_enabled {
            query = query.filter(workflow_templates::is_enabled.eq(enabled));
        }
        query
    }

    pub fn list_templates(
        conn: &mut PgConnection,
        filter: &TemplateFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<WorkflowTemplate>, i64), diesel::result::Error> {
        let total = Self::filtered_templates(filter).count().get_result(conn)?;
        let items = Self::filtered_templates(filter)
            .order((workflow_templates::sort_order.asc(), workflow_templates::created_at.desc()))
            .offset(offset)
            .limit(limit)
            .select(WorkflowTemplate::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn find_template(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<Option<WorkflowTemplate>, diesel::result::Error> {
        workflow_templates::table
            .find(template_id)
            .select(WorkflowTemplate::as_select())
            .first(conn)
            .optional()
    }

    pub fn template_code_exists(
        conn: &mut PgConnection,
        template_code: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::workflow_templates::dsl::*;
        diesel::select(diesel::dsl::exists(
            workflow_templates.filter(code.eq(template_code)),
        ))
        .get_result(conn)
    }

    pub fn insert_template(
        conn: &mut PgConnection,
        new_template: &NewWorkflowTemplate,
    ) -> Result<WorkflowTemplate, diesel::result::Error> {
        diesel::insert_into(workflow_templates::table)
            .values(new_template)
            .returning(WorkflowTemplate::as_returning())
            .get_result(conn)
    }

    pub fn update_template(
        conn: &mut PgConnection,
        template_id: Uuid,
        changes: &UpdateWorkflowTemplate,
    ) -> Result<WorkflowTemplate, diesel::result::Error> {
        diesel::update(workflow_templates::table.find(template_id))
            .set(changes)
            .returning(WorkflowTemplate::as_returning())
            .get_result(conn)
    }

    pub fn delete_template(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(workflow_templates::table.find(template_id)).execute(conn)
    }

    pub fn count_instances_of_template(
        conn: &mut PgConnection,
        template: Uuid,
        statuses: &[WorkflowStatus],
    ) -> Result<i64, diesel::result::Error> {
        let mut query = workflow_instances::table
            .filter(workflow_instances::template_id.eq(template))
            .into_boxed();
        if !statuses.is_empty() {
            query = query.filter(workflow_instances::status.eq_any(statuses.to_vec()));
        }
        query.count().get_result(conn)
    }

    // ---- instances ----

    pub fn insert_instance(
        conn: &mut PgConnection,
        new_instance: &NewWorkflowInstance,
    ) -> Result<WorkflowInstance, diesel::result::Error> {
        diesel::insert_into(workflow_instances::table)
            .values(new_instance)
            .returning(WorkflowInstance::as_returning())
            .get_result(conn)
    }

    pub fn find_instance(
        conn: &mut PgConnection,
        instance_id: Uuid,
    ) -> Result<Option<WorkflowInstance>, diesel::result::Error> {
        workflow_instances::table
            .find(instance_id)
            .select(WorkflowInstance::as_select())
            .first(conn)
            .optional()
    }

    /// 加行锁，保证同一实例的推进操作串行执行
    pub fn lock_instance(
        conn: &mut PgConnection,
        instance_id: Uuid,
    ) -> Result<Option<WorkflowInstance>, diesel::result::Error> {
        workflow_instances::table
            .find(instance_id)
            .select(WorkflowInstance::as_select())
            .for_update()
            .first(conn)
            .optional()
    }

    pub fn update_instance(
        conn: &mut PgConnection,
        instance_id: Uuid,
        changes: &UpdateWorkflowInstance,
    ) -> Result<WorkflowInstance, diesel::result::Error> {
        diesel::update(workflow_instances::table.find(instance_id))
            .set(changes)
            .returning(WorkflowInstance::as_returning())
            .get_result(conn)
    }

    fn filtered_instances<'a>(
        filter: &'a InstanceFilter,
    ) -> workflow_instances::BoxedQuery<'a, Pg> {
        let mut query = workflow_instances::table.into_boxed();
        if let Some(template) = filter.template_id {
            query = query.filter(workflow_instances::template_id.eq(template));
        }
        if let Some(state) = filter.status {
            query = query.filter(workflow_instances::status.eq(state));
        }
        if let Some(initiator) = filter.initiator_id {
            query = query.filter(workflow_instances::initiator_id.eq(initiator));
        }
        if let Some(ref kind) = filter.business_type {
            query = query.filter(workflow_instances::business_type.eq(kind));
        }
        if let Some(ref business) = filter.business_id {
            query = query.filter(workflow_instances::business_id.eq(business));
        }
        query
    }

    pub fn list_instances(
        conn: &mut PgConnection,
        filter: &InstanceFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<WorkflowInstance>, i64), diesel::result::Error> {
        let total = Self::filtered_instances(filter).count().get_result(conn)?;
        let items = Self::filtered_instances(filter)
            .order(workflow_instances::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(WorkflowInstance::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    /// 以给定前缀开头的实例编号数量，用于生成当日流水号
    pub fn count_numbers_with_prefix(
        conn: &mut PgConnection,
        prefix: &str,
    ) -> Result<i64, diesel::result::Error> {
        workflow_instances::table
            .filter(workflow_instances::number.like(format!("{}%", prefix)))
            .count()
            .get_result(conn)
    }

    // ---- nodes ----

    pub fn insert_nodes(
        conn: &mut PgConnection,
        nodes: &[NewWorkflowNode],
    ) -> Result<Vec<WorkflowNode>, diesel::result::Error> {
        diesel::insert_into(workflow_nodes::table)
            .values(nodes)
            .returning(WorkflowNode::as_returning())
            .get_results(conn)
    }

    pub fn nodes_for_instance(
        conn: &mut PgConnection,
        instance_id: Uuid,
    ) -> Result<Vec<WorkflowNode>, diesel::result::Error> {
        workflow_nodes::table
            .filter(workflow_nodes::workflow_instance_id.eq(instance_id))
            .order(workflow_nodes::created_at.asc())
            .select(WorkflowNode::as_select())
            .load(conn)
    }

    pub fn find_node(
        conn: &mut PgConnection,
        node_row_id: Uuid,
    ) -> Result<Option<WorkflowNode>, diesel::result::Error> {
        workflow_nodes::table
            .find(node_row_id)
            .select(WorkflowNode::as_select())
            .first(conn)
            .optional()
    }

    pub fn update_node(
        conn: &mut PgConnection,
        node_row_id: Uuid,
        changes: &UpdateWorkflowNode,
    ) -> Result<WorkflowNode, diesel::result::Error> {
        diesel::update(workflow_nodes::table.find(node_row_id))
            .set(changes)
            .returning(WorkflowNode::as_returning())
            .get_result(conn)
    }

    /// 当前用户可办理的节点：直接指派、按角色或按部门指派，且所属实例处于流转中
    pub fn my_tasks(
        conn: &mut PgConnection,
        user_id: Uuid,
        role_ids: &[Uuid],
        department_id: Option<Uuid>,
        status: NodeStatus,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<MyTask>, i64), diesel::result::Error> {
        let assigned = || {
            workflow_nodes::assignee_id
                .eq(user_id)
                .or(workflow_nodes::assignee_role_id.eq_any(role_ids.to_vec()))
                .or(workflow_nodes::assignee_department_id.eq(department_id))
        };

        let total = workflow_nodes::table
            .inner_join(workflow_instances::table)
            .filter(workflow_instances::status.eq(WorkflowStatus::Active))
            .filter(workflow_nodes::status.eq(status))
            .filter(assigned())
            .count()
            .get_result(conn)?;

        let rows: Vec<(WorkflowNode, String, String, i32)> = workflow_nodes::table
            .inner_join(workflow_instances::table)
            .filter(workflow_instances::status.eq(WorkflowStatus::Active))
            .filter(workflow_nodes::status.eq(status))
            .filter(assigned())
            .order((
                workflow_instances::priority.desc(),
                workflow_nodes::enter_time.asc().nulls_last(),
            ))
            .offset(offset)
            .limit(limit)
            .select((
                WorkflowNode::as_select(),
                workflow_instances::number,
                workflow_instances::title,
                workflow_instances::priority,
            ))
            .load(conn)?;

        let tasks = rows
            .into_iter()
            .map(|(node, instance_number, instance_title, instance_priority)| MyTask {
                node,
                instance_number,
                instance_title,
                instance_priority,
            })
            .collect();
        Ok((tasks, total))
    }

    // ---- transitions ----

    pub fn insert_transitions(
        conn: &mut PgConnection,
        rows: &[NewWorkflowTransition],
    ) -> Result<usize, diesel::result::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(workflow_transitions::table)
            .values(rows)
            .execute(conn)
    }

    pub fn transitions_for_instance(
        conn: &mut PgConnection,
        instance_id: Uuid,
    ) -> Result<Vec<WorkflowTransition>, diesel::result::Error> {
        workflow_transitions::table
            .filter(workflow_transitions::workflow_instance_id.eq(instance_id))
            .order(workflow_transitions::execute_time.asc())
            .select(WorkflowTransition::as_select())
            .load(conn)
    }

    // ---- stats ----

    pub fn stats(conn: &mut PgConnection) -> Result<WorkflowStats, diesel::result::Error> {
        let templates = workflow_templates::table.count().get_result(conn)?;
        let enabled_templates = workflow_templates::table
            .filter(workflow_templates::is_enabled.eq(true))
            .count()
            .get_result(conn)?;
        let instances = workflow_instances::table.count().get_result(conn)?;

        let by_status: Vec<(WorkflowStatus, i64)> = workflow_instances::table
            .group_by(workflow_instances::status)
            .select((workflow_instances::status, diesel::dsl::count_star()))
            .load(conn)?;
        let of = |wanted: WorkflowStatus| {
            by_status
                .iter()
                .find(|(status, _)| *status == wanted)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        let pending_tasks = workflow_nodes::table
            .inner_join(workflow_instances::table)
            .filter(workflow_instances::status.eq(WorkflowStatus::Active))
            .filter(workflow_nodes::status.eq(NodeStatus::Active))
            .count()
            .get_result(conn)?;

        Ok(WorkflowStats {
            templates,
            enabled_templates,
            instances,
            active: of(WorkflowStatus::Active),
            suspended: of(WorkflowStatus::Suspended),
            completed: of(WorkflowStatus::Completed),
            terminated: of(WorkflowStatus::Terminated),
            pending_tasks,
        })
    }
}

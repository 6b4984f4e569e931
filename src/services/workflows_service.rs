use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{NodeStatus, NodeType, WorkflowStatus},
    db::models::api::{Page, PageParams, error_codes},
    db::models::workflow::*,
    db::repositories::workflows::{LIVE_INSTANCE_STATUSES, WorkflowRepo},
    error::{AppError, AppResult},
    services::context::{RequestContext, permissions},
    validation::workflow::{validate_template_code, validate_variables},
    workflow::{NodeChange, NodeStatuses, Outcome, WorkflowDefinition, engine},
};

const DEFAULT_TEMPLATE_VERSION: &str = "1.0";
const DEFAULT_PRIORITY: i32 = 3;

pub struct WorkflowsService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Suspend,
    Resume,
    Terminate,
}

/// 挂起、恢复、终止对应的目标状态
pub fn lifecycle_target(action: Lifecycle, current: WorkflowStatus) -> AppResult<WorkflowStatus> {
    let target = match (action, current) {
        (Lifecycle::Suspend, WorkflowStatus::Active) => WorkflowStatus::Suspended,
        (Lifecycle::Resume, WorkflowStatus::Suspended) => WorkflowStatus::Active,
        (Lifecycle::Terminate, WorkflowStatus::Active | WorkflowStatus::Suspended) => {
            WorkflowStatus::Terminated
        }
        _ => {
            return Err(AppError::invalid_state(
                format!("Cannot {:?} a workflow that is {}", action, current).to_lowercase(),
                error_codes::WORKFLOW_INVALID_TRANSITION,
            ));
        }
    };
    Ok(target)
}

/// 只有草稿状态的实例可以启动
pub fn ensure_startable(status: WorkflowStatus) -> AppResult<()> {
    if status != WorkflowStatus::Draft {
        return Err(AppError::invalid_state(
            format!("Workflow is {}, only draft workflows can be started", status),
            error_codes::WORKFLOW_INVALID_TRANSITION,
        ));
    }
    Ok(())
}

/// 实例编号：模板编码 + 日期 + 4 位当日流水号
pub fn instance_number(template_code: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}{}{:04}", template_code, date.format("%Y%m%d"), seq)
}

/// 表单数据并入流程变量，办理结果记为 `result`
pub fn merge_variables(variables: &Value, form_data: Option<&Value>, result: Option<&str>) -> Value {
    let mut merged = match variables {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Some(Value::Object(form)) = form_data {
        for (key, value) in form {
            merged.insert(key.clone(), value.clone());
        }
    }
    if let Some(result) = result {
        merged.insert("result".to_string(), Value::String(result.to_string()));
    }
    Value::Object(merged)
}

/// 节点办理权限：直接指派、角色或部门匹配；未指派的节点由发起人或流程管理员办理
pub fn can_handle(node: &WorkflowNode, ctx: &RequestContext, initiator_id: Uuid) -> bool {
    if ctx.is_superuser {
        return true;
    }
    if node.assignee_id.is_none()
        && node.assignee_role_id.is_none()
        && node.assignee_department_id.is_none()
    {
        return ctx.user_id == initiator_id || ctx.has_permission(permissions::WORKFLOW_MANAGE);
    }
    node.assignee_id == Some(ctx.user_id)
        || node
            .assignee_role_id
            .is_some_and(|role| ctx.role_ids.contains(&role))
        || (node.assignee_department_id.is_some()
            && node.assignee_department_id == ctx.department_id)
}

/// 进入时间加上办理时限；超出时间范围时不设截止时间
pub fn node_deadline(entered: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|d| entered.checked_add_signed(d))
}

/// 把推进结果折叠为每个节点一次更新：进入时间、截止时间与完成时间
pub fn node_updates(
    changes: &[NodeChange],
    definition: &WorkflowDefinition,
    now: DateTime<Utc>,
) -> BTreeMap<String, UpdateWorkflowNode> {
    let mut updates: BTreeMap<String, UpdateWorkflowNode> = BTreeMap::new();
    for change in changes {
        let update = updates.entry(change.node_id.clone()).or_default();
        update.status = Some(change.status);
        update.updated_at = Some(now);
        match change.status {
            NodeStatus::Active => {
                update.enter_time = Some(now);
                update.start_time = Some(now);
                update.deadline = definition
                    .node(&change.node_id)
                    .and_then(|n| n.deadline_hours)
                    .and_then(|hours| node_deadline(now, hours));
            }
            NodeStatus::Completed | NodeStatus::Skipped => {
                update.complete_time = Some(now);
            }
            _ => {}
        }
    }
    updates
}

fn statuses_of(nodes: &[WorkflowNode]) -> NodeStatuses {
    nodes.iter().map(|n| (n.node_id.clone(), n.status)).collect()
}

fn parse_definition(template: &WorkflowTemplate) -> AppResult<WorkflowDefinition> {
    Ok(WorkflowDefinition::parse(&template.definition)?)
}

impl WorkflowsService {
    // ---- templates ----

    pub fn list_templates(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        filter: &TemplateFilter,
        page: PageParams,
    ) -> AppResult<Page<WorkflowTemplate>> {
        let (items, total) = WorkflowRepo::list_templates(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    pub fn get_template(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        template_id: Uuid,
    ) -> AppResult<WorkflowTemplate> {
        WorkflowRepo::find_template(conn, template_id)?
            .ok_or_else(|| AppError::not_found("workflow template"))
    }

    pub fn create_template(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateTemplateRequest,
    ) -> AppResult<WorkflowTemplate> {
        ctx.require(permissions::WORKFLOW_MANAGE)?;
        validate_template_code(&req.code)?;
        WorkflowDefinition::parse(&req.definition)?;

        if WorkflowRepo::template_code_exists(conn, &req.code)? {
            return Err(AppError::conflict_with_code(
                "Template code already exists",
                Some("code".to_string()),
                error_codes::WORKFLOW_TEMPLATE_CODE_EXISTS,
            ));
        }

        let template = WorkflowRepo::insert_template(
            conn,
            &NewWorkflowTemplate {
                name: req.name.clone(),
                code: req.code.clone(),
                description: req.description.clone(),
                template_type: req.template_type.clone(),
                version: req
                    .version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TEMPLATE_VERSION.to_string()),
                is_enabled: req.is_enabled.unwrap_or(true),
                is_builtin: false,
                definition: req.definition.clone(),
                form_config: req.form_config.clone(),
                permission_config: req.permission_config.clone(),
                notification_config: req.notification_config.clone(),
                sort_order: req.sort_order,
                created_by: Some(ctx.user_id),
            },
        )?;
        tracing::info!(template_id = %template.id, code = %template.code, "Workflow template created");
        Ok(template)
    }

    pub fn update_template(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
        req: &UpdateTemplateRequest,
    ) -> AppResult<WorkflowTemplate> {
        ctx.require(permissions::WORKFLOW_MANAGE)?;
        let template = Self::get_template(conn, ctx, template_id)?;

        if let Some(ref definition) = req.definition {
            if template.is_builtin {
                return Err(AppError::invalid_state(
                    "Built-in template definitions cannot be changed",
                    error_codes::WORKFLOW_TEMPLATE_BUILTIN,
                ));
            }
            WorkflowDefinition::parse(definition)?;
            // 已有实例按旧定义运行，定义不可再改
            if WorkflowRepo::count_instances_of_template(conn, template_id, &[])? > 0 {
                return Err(AppError::conflict_with_code(
                    "Template already has instances, create a new version instead",
                    Some("definition".to_string()),
                    error_codes::WORKFLOW_TEMPLATE_IN_USE,
                ));
            }
        }

        let changes = UpdateWorkflowTemplate {
            name: req.name.clone(),
            description: req.description.clone(),
            template_type: req.template_type.clone(),
            version: req.version.clone(),
            is_enabled: req.is_enabled,
            definition: req.definition.clone(),
            form_config: req.form_config.clone(),
            permission_config: req.permission_config.clone(),
            notification_config: req.notification_config.clone(),
            sort_order: req.sort_order,
            updated_at: Some(Utc::now()),
        };
        Ok(WorkflowRepo::update_template(conn, template_id, &changes)?)
    }

    pub fn delete_template(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
    ) -> AppResult<()> {
        ctx.require(permissions::WORKFLOW_MANAGE)?;
        let template = Self::get_template(conn, ctx, template_id)?;
        if template.is_builtin {
            return Err(AppError::invalid_state(
                "Built-in templates cannot be deleted",
                error_codes::WORKFLOW_TEMPLATE_BUILTIN,
            ));
        }

        let live = WorkflowRepo::count_instances_of_template(conn, template_id, &LIVE_INSTANCE_STATUSES)?;
        if live > 0 {
            return Err(AppError::conflict_with_code(
                format!("Template has {} running instances", live),
                None,
                error_codes::WORKFLOW_TEMPLATE_IN_USE,
            ));
        }
        if WorkflowRepo::count_instances_of_template(conn, template_id, &[])? > 0 {
            return Err(AppError::conflict_with_code(
                "Template has finished instances, disable it instead",
                None,
                error_codes::WORKFLOW_TEMPLATE_IN_USE,
            ));
        }

        WorkflowRepo::delete_template(conn, template_id)?;
        tracing::info!(template_id = %template_id, operator = %ctx.user_id, "Workflow template deleted");
        Ok(())
    }

    // ---- instances ----

    pub fn create_instance(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateInstanceRequest,
    ) -> AppResult<WorkflowInstance> {
        let template = Self::get_template(conn, ctx, req.template_id)?;
        if !template.is_enabled {
            return Err(AppError::invalid_state(
                "Workflow template is disabled",
                error_codes::WORKFLOW_TEMPLATE_DISABLED,
            ));
        }
        let definition = parse_definition(&template)?;
        let variables = req.variables.clone().unwrap_or_else(|| json!({}));
        validate_variables(&variables)?;

        conn.transaction(|conn| {
            let now = Utc::now();
            let prefix = format!("{}{}", template.code, now.format("%Y%m%d"));
            let seq = WorkflowRepo::count_numbers_with_prefix(conn, &prefix)? + 1;

            let instance = WorkflowRepo::insert_instance(
                conn,
                &NewWorkflowInstance {
                    number: instance_number(&template.code, now.date_naive(), seq),
                    title: req.title.trim().to_string(),
                    template_id: template.id,
                    initiator_id: ctx.user_id,
                    business_id: req.business_id.clone(),
                    business_type: req.business_type.clone(),
                    business_data: req.business_data.clone(),
                    variables,
                    status: WorkflowStatus::Draft,
                    current_nodes: json!([]),
                    priority: req.priority.unwrap_or(DEFAULT_PRIORITY),
                },
            )?;

            let nodes: Vec<NewWorkflowNode> = definition
                .nodes
                .iter()
                .map(|n| NewWorkflowNode {
                    workflow_instance_id: instance.id,
                    node_id: n.id.clone(),
                    name: n.name.clone(),
                    node_type: n.node_type,
                    status: NodeStatus::Pending,
                    assignee_id: n.assignee_id,
                    assignee_role_id: n.assignee_role_id,
                    assignee_department_id: n.assignee_department_id,
                    node_data: n.data.clone(),
                })
                .collect();
            WorkflowRepo::insert_nodes(conn, &nodes)?;

            tracing::info!(instance_id = %instance.id, number = %instance.number, "Workflow instance created");
            Ok(instance)
        })
    }

    fn require_owner_or_manager(ctx: &RequestContext, instance: &WorkflowInstance) -> AppResult<()> {
        if instance.initiator_id == ctx.user_id {
            return Ok(());
        }
        ctx.require(permissions::WORKFLOW_MANAGE)
    }

    fn lock(conn: &mut PgConnection, instance_id: Uuid) -> AppResult<WorkflowInstance> {
        WorkflowRepo::lock_instance(conn, instance_id)?
            .ok_or_else(|| AppError::not_found("workflow instance"))
    }

    /// 持久化推进结果：节点状态与流转记录
    #[allow(clippy::too_many_arguments)]
    fn apply_outcome(
        conn: &mut PgConnection,
        instance: &WorkflowInstance,
        definition: &WorkflowDefinition,
        nodes: &[WorkflowNode],
        outcome: &Outcome,
        executor: Uuid,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let rows: BTreeMap<&str, Uuid> = nodes.iter().map(|n| (n.node_id.as_str(), n.id)).collect();
        for (node_id, changes) in node_updates(&outcome.changes, definition, now) {
            let row_id = rows
                .get(node_id.as_str())
                .ok_or_else(|| AppError::internal(format!("node {} was not materialised", node_id)))?;
            WorkflowRepo::update_node(conn, *row_id, &changes)?;
        }

        let transitions: Vec<NewWorkflowTransition> = outcome
            .moves
            .iter()
            .map(|m| NewWorkflowTransition {
                workflow_instance_id: instance.id,
                from_node_id: m.from.clone(),
                to_node_id: m.to.clone(),
                name: m.name.clone(),
                executor_id: Some(executor),
                comment: comment.clone(),
                execute_time: now,
            })
            .collect();
        WorkflowRepo::insert_transitions(conn, &transitions)?;
        Ok(())
    }

    /// 仅 draft 状态可启动
    pub fn start_instance(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        instance_id: Uuid,
    ) -> AppResult<WorkflowInstance> {
        conn.transaction(|conn| {
            let instance = Self::lock(conn, instance_id)?;
            Self::require_owner_or_manager(ctx, &instance)?;
            ensure_startable(instance.status)?;

            let template = WorkflowRepo::find_template(conn, instance.template_id)?
                .ok_or_else(|| AppError::not_found("workflow template"))?;
            let definition = parse_definition(&template)?;
            let nodes = WorkflowRepo::nodes_for_instance(conn, instance_id)?;
            let mut statuses = statuses_of(&nodes);

            let outcome = engine::start(&definition, &mut statuses, &instance.variables)?;
            let now = Utc::now();
            Self::apply_outcome(conn, &instance, &definition, &nodes, &outcome, ctx.user_id, None, now)?;

            let updated = WorkflowRepo::update_instance(
                conn,
                instance_id,
                &UpdateWorkflowInstance {
                    status: Some(if outcome.completed {
                        WorkflowStatus::Completed
                    } else {
                        WorkflowStatus::Active
                    }),
                    current_nodes: Some(json!(outcome.current_nodes)),
                    start_time: Some(now),
                    end_time: outcome.completed.then_some(now),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            tracing::info!(instance_id = %instance_id, current = ?outcome.current_nodes, "Workflow started");
            Ok(updated)
        })
    }

    /// 办理任务节点并推进流程
    pub fn complete_task(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        node_row_id: Uuid,
        req: &CompleteTaskRequest,
    ) -> AppResult<WorkflowInstance> {
        conn.transaction(|conn| {
            let node = WorkflowRepo::find_node(conn, node_row_id)?
                .ok_or_else(|| AppError::not_found("workflow task"))?;
            let instance = Self::lock(conn, node.workflow_instance_id)?;
            // 加锁后重新读取，并发办理时以最新状态为准
            let node = WorkflowRepo::find_node(conn, node_row_id)?
                .ok_or_else(|| AppError::not_found("workflow task"))?;

            if instance.status != WorkflowStatus::Active {
                return Err(AppError::invalid_state(
                    format!("Workflow is {}", instance.status),
                    error_codes::WORKFLOW_INVALID_TRANSITION,
                ));
            }
            if node.node_type != NodeType::Task || node.status != NodeStatus::Active {
                return Err(AppError::invalid_state(
                    format!("Node {} is not an active task", node.node_id),
                    error_codes::WORKFLOW_NODE_NOT_ACTIVE,
                ));
            }
            if !can_handle(&node, ctx, instance.initiator_id) {
                return Err(AppError::forbidden("You are not the assignee of this task"));
            }

            let template = WorkflowRepo::find_template(conn, instance.template_id)?
                .ok_or_else(|| AppError::not_found("workflow template"))?;
            let definition = parse_definition(&template)?;
            let nodes = WorkflowRepo::nodes_for_instance(conn, instance.id)?;
            let mut statuses = statuses_of(&nodes);

            let variables = merge_variables(
                &instance.variables,
                req.form_data.as_ref(),
                req.result.as_deref(),
            );
            let outcome = engine::complete_task(&definition, &mut statuses, &node.node_id, &variables)?;

            let now = Utc::now();
            WorkflowRepo::update_node(
                conn,
                node.id,
                &UpdateWorkflowNode {
                    processor_id: Some(ctx.user_id),
                    form_data: req.form_data.clone(),
                    result: req.result.clone(),
                    comment: req.comment.clone(),
                    ..Default::default()
                },
            )?;
            Self::apply_outcome(
                conn,
                &instance,
                &definition,
                &nodes,
                &outcome,
                ctx.user_id,
                req.comment.clone(),
                now,
            )?;

            let updated = WorkflowRepo::update_instance(
                conn,
                instance.id,
                &UpdateWorkflowInstance {
                    status: outcome.completed.then_some(WorkflowStatus::Completed),
                    variables: Some(variables),
                    current_nodes: Some(json!(outcome.current_nodes)),
                    end_time: outcome.completed.then_some(now),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            tracing::info!(
                instance_id = %instance.id,
                node = %node.node_id,
                completed = outcome.completed,
                "Workflow task completed"
            );
            Ok(updated)
        })
    }

    pub fn change_lifecycle(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        instance_id: Uuid,
        action: Lifecycle,
        req: &LifecycleRequest,
    ) -> AppResult<WorkflowInstance> {
        conn.transaction(|conn| {
            let instance = Self::lock(conn, instance_id)?;
            Self::require_owner_or_manager(ctx, &instance)?;
            let target = lifecycle_target(action, instance.status)?;
            let now = Utc::now();

            let mut changes = UpdateWorkflowInstance {
                status: Some(target),
                updated_at: Some(now),
                ..Default::default()
            };

            if target == WorkflowStatus::Terminated {
                let nodes = WorkflowRepo::nodes_for_instance(conn, instance_id)?;
                let mut statuses = statuses_of(&nodes);
                let skipped = engine::skip_open_nodes(&mut statuses);
                let template = WorkflowRepo::find_template(conn, instance.template_id)?
                    .ok_or_else(|| AppError::not_found("workflow template"))?;
                let definition = parse_definition(&template)?;
                let outcome = Outcome {
                    changes: skipped,
                    ..Default::default()
                };
                Self::apply_outcome(conn, &instance, &definition, &nodes, &outcome, ctx.user_id, None, now)?;
                changes.current_nodes = Some(json!([]));
                changes.end_time = Some(now);
            }

            let updated = WorkflowRepo::update_instance(conn, instance_id, &changes)?;
            tracing::info!(
                instance_id = %instance_id,
                from = %instance.status,
                to = %target,
                reason = req.reason.as_deref().unwrap_or(""),
                "Workflow lifecycle changed"
            );
            Ok(updated)
        })
    }

    pub fn get_instance(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        instance_id: Uuid,
    ) -> AppResult<InstanceDetail> {
        let instance = WorkflowRepo::find_instance(conn, instance_id)?
            .ok_or_else(|| AppError::not_found("workflow instance"))?;
        let template_name = WorkflowRepo::find_template(conn, instance.template_id)?
            .map(|t| t.name)
            .unwrap_or_default();
        let nodes = WorkflowRepo::nodes_for_instance(conn, instance_id)?;
        Ok(InstanceDetail {
            instance,
            template_name,
            nodes,
        })
    }

    pub fn list_instances(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        filter: &InstanceFilter,
        page: PageParams,
    ) -> AppResult<Page<WorkflowInstance>> {
        let (items, total) = WorkflowRepo::list_instances(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    pub fn nodes(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        instance_id: Uuid,
    ) -> AppResult<Vec<WorkflowNode>> {
        WorkflowRepo::find_instance(conn, instance_id)?
            .ok_or_else(|| AppError::not_found("workflow instance"))?;
        Ok(WorkflowRepo::nodes_for_instance(conn, instance_id)?)
    }

    pub fn transitions(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        instance_id: Uuid,
    ) -> AppResult<Vec<WorkflowTransition>> {
        WorkflowRepo::find_instance(conn, instance_id)?
            .ok_or_else(|| AppError::not_found("workflow instance"))?;
        Ok(WorkflowRepo::transitions_for_instance(conn, instance_id)?)
    }

    pub fn my_tasks(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &MyTaskFilter,
        page: PageParams,
    ) -> AppResult<Page<MyTask>> {
        let (items, total) = WorkflowRepo::my_tasks(
            conn,
            ctx.user_id,
            &ctx.role_ids,
            ctx.department_id,
            filter.status.unwrap_or(NodeStatus::Active),
            page.offset,
            page.size,
        )?;
        Ok(Page::new(items, total, page))
    }

    pub fn stats(conn: &mut PgConnection, _ctx: &RequestContext) -> AppResult<WorkflowStats> {
        Ok(WorkflowRepo::stats(conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(user_id: Uuid) -> RequestContext {
        RequestContext {
            user_id,
            department_id: None,
            role_ids: vec![],
            permissions: vec![],
            is_superuser: false,
        }
    }

    fn node() -> WorkflowNode {
        let now = Utc::now();
        WorkflowNode {
            id: Uuid::new_v4(),
            workflow_instance_id: Uuid::new_v4(),
            node_id: "review".into(),
            name: "Review".into(),
            node_type: NodeType::Task,
            status: NodeStatus::Active,
            assignee_id: None,
            assignee_role_id: None,
            assignee_department_id: None,
            processor_id: None,
            enter_time: Some(now),
            start_time: Some(now),
            complete_time: None,
            deadline: None,
            node_data: None,
            form_data: None,
            result: None,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lifecycle_targets() {
        use WorkflowStatus::*;
        assert_eq!(lifecycle_target(Lifecycle::Suspend, Active).unwrap(), Suspended);
        assert_eq!(lifecycle_target(Lifecycle::Resume, Suspended).unwrap(), Active);
        assert_eq!(lifecycle_target(Lifecycle::Terminate, Active).unwrap(), Terminated);
        assert_eq!(lifecycle_target(Lifecycle::Terminate, Suspended).unwrap(), Terminated);
        assert!(lifecycle_target(Lifecycle::Suspend, Draft).is_err());
        assert!(lifecycle_target(Lifecycle::Resume, Active).is_err());
        assert!(lifecycle_target(Lifecycle::Terminate, Completed).is_err());
    }

    #[test]
    fn test_instance_number() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(instance_number("SUP_FLOW", date, 7), "SUP_FLOW202403090007");
    }

    #[test]
    fn test_merge_variables() {
        let merged = merge_variables(
            &json!({"amount": 10, "region": "east"}),
            Some(&json!({"amount": 12, "note": "ok"})),
            Some("approved"),
        );
        assert_eq!(
            merged,
            json!({"amount": 12, "region": "east", "note": "ok", "result": "approved"})
        );
        assert_eq!(merge_variables(&Value::Null, None, None), json!({}));
    }

    #[test]
    fn test_can_handle_assignment_kinds() {
        let user = Uuid::new_v4();
        let initiator = Uuid::new_v4();

        let mut direct = node();
        direct.assignee_id = Some(user);
        assert!(can_handle(&direct, &ctx(user), initiator));
        assert!(!can_handle(&direct, &ctx(Uuid::new_v4()), initiator));

        let role = Uuid::new_v4();
        let mut by_role = node();
        by_role.assignee_role_id = Some(role);
        let mut member = ctx(user);
        member.role_ids = vec![role];
        assert!(can_handle(&by_role, &member, initiator));
        assert!(!can_handle(&by_role, &ctx(user), initiator));

        let dept = Uuid::new_v4();
        let mut by_dept = node();
        by_dept.assignee_department_id = Some(dept);
        let mut colleague = ctx(user);
        colleague.department_id = Some(dept);
        assert!(can_handle(&by_dept, &colleague, initiator));
        assert!(!can_handle(&by_dept, &ctx(user), initiator));

        let unassigned = node();
        assert!(can_handle(&unassigned, &ctx(initiator), initiator));
        assert!(!can_handle(&unassigned, &ctx(user), initiator));

        let mut admin = ctx(Uuid::new_v4());
        admin.is_superuser = true;
        assert!(can_handle(&direct, &admin, initiator));
    }

    #[test]
    fn test_node_updates_set_deadlines() {
        let definition = WorkflowDefinition::parse(&json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "handle", "name": "Handle", "type": "task", "deadline_hours": 48},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "handle"},
                {"from": "handle", "to": "end"}
            ]
        }))
        .unwrap();
        let mut statuses = engine::initial_statuses(&definition);
        let outcome = engine::start(&definition, &mut statuses, &json!({})).unwrap();

        let now = Utc::now();
        let updates = node_updates(&outcome.changes, &definition, now);

        let start = &updates["start"];
        assert_eq!(start.status, Some(NodeStatus::Completed));
        assert_eq!(start.complete_time, Some(now));

        let handle = &updates["handle"];
        assert_eq!(handle.status, Some(NodeStatus::Active));
        assert_eq!(handle.enter_time, Some(now));
        assert_eq!(handle.deadline, Some(now + Duration::hours(48)));
        assert!(!updates.contains_key("end"));
    }

    #[test]
    fn test_only_drafts_can_start() {
        assert!(ensure_startable(WorkflowStatus::Draft).is_ok());
        for status in [
            WorkflowStatus::Active,
            WorkflowStatus::Suspended,
            WorkflowStatus::Completed,
            WorkflowStatus::Terminated,
        ] {
            let err = ensure_startable(status).unwrap_err();
            assert!(matches!(err, AppError::InvalidState { .. }), "{status:?}");
        }
    }

    #[test]
    fn test_unrepresentable_deadline_is_dropped() {
        let now = Utc::now();
        assert_eq!(node_deadline(now, 2), Some(now + Duration::hours(2)));
        assert_eq!(node_deadline(now, 9_000_000_000_000_000), None);
        assert_eq!(node_deadline(now, i64::MAX), None);
    }
}

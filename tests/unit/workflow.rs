use chrono::NaiveDate;
use serde_json::{Value, json};
use supervision_backend::db::enums::{NodeStatus, WorkflowStatus};
use supervision_backend::services::workflows_service::{
    Lifecycle, instance_number, lifecycle_target, merge_variables,
};
use supervision_backend::validation::workflow::validate_template_code;
use supervision_backend::workflow::{EngineError, WorkflowDefinition, definition::DefinitionError, engine};

/// 承办 -> 审核 -> 按审核结果结束或退回重办
fn approval_definition() -> WorkflowDefinition {
    WorkflowDefinition::parse(&json!({
        "nodes": [
            {"id": "start", "name": "发起", "type": "start"},
            {"id": "handle", "name": "承办", "type": "task"},
            {"id": "review", "name": "审核", "type": "task", "deadline_hours": 48},
            {"id": "route", "name": "审核结果", "type": "decision"},
            {"id": "end", "name": "办结", "type": "end"}
        ],
        "transitions": [
            {"from": "start", "to": "handle"},
            {"from": "handle", "to": "review"},
            {"from": "review", "to": "route"},
            {"from": "route", "to": "end", "condition": "result == approved", "name": "通过"},
            {"from": "route", "to": "handle", "condition": "result == rejected", "name": "退回"}
        ]
    }))
    .unwrap()
}

#[test]
fn approval_flow_with_one_rejection() {
    let def = approval_definition();
    let mut statuses = engine::initial_statuses(&def);
    let mut variables = json!({"item": "DB1"});

    let out = engine::start(&def, &mut statuses, &variables).unwrap();
    assert_eq!(out.current_nodes, vec!["handle"]);

    let out = engine::complete_task(&def, &mut statuses, "handle", &variables).unwrap();
    assert_eq!(out.current_nodes, vec!["review"]);

    variables = merge_variables(&variables, Some(&json!({"comment": "材料不全"})), Some("rejected"));
    let out = engine::complete_task(&def, &mut statuses, "review", &variables).unwrap();
    assert_eq!(out.current_nodes, vec!["handle"]);
    assert_eq!(out.moves.last().and_then(|m| m.name.as_deref()), Some("退回"));
    assert!(!out.completed);

    let out = engine::complete_task(&def, &mut statuses, "handle", &variables).unwrap();
    assert_eq!(out.current_nodes, vec!["review"]);

    variables = merge_variables(&variables, None, Some("approved"));
    let out = engine::complete_task(&def, &mut statuses, "review", &variables).unwrap();
    assert!(out.completed);
    assert!(out.current_nodes.is_empty());
    assert_eq!(statuses["end"], NodeStatus::Completed);
    assert_eq!(variables["comment"], Value::String("材料不全".into()));
}

#[test]
fn starting_twice_is_rejected() {
    let def = approval_definition();
    let mut statuses = engine::initial_statuses(&def);
    engine::start(&def, &mut statuses, &json!({})).unwrap();
    assert_eq!(
        engine::start(&def, &mut statuses, &json!({})),
        Err(EngineError::AlreadyStarted)
    );
}

#[test]
fn terminating_skips_open_nodes() {
    let def = approval_definition();
    let mut statuses = engine::initial_statuses(&def);
    engine::start(&def, &mut statuses, &json!({})).unwrap();

    let changes = engine::skip_open_nodes(&mut statuses);
    assert!(changes.iter().all(|c| c.status == NodeStatus::Skipped));
    assert_eq!(statuses["handle"], NodeStatus::Skipped);
    assert_eq!(statuses["start"], NodeStatus::Completed);
    assert!(engine::active_nodes(&def, &statuses).is_empty());
}

#[test]
fn definitions_need_one_start_and_an_end() {
    let two_starts = json!({
        "nodes": [
            {"id": "a", "name": "A", "type": "start"},
            {"id": "b", "name": "B", "type": "start"},
            {"id": "end", "name": "End", "type": "end"}
        ],
        "transitions": [{"from": "a", "to": "end"}, {"from": "b", "to": "end"}]
    });
    assert_eq!(
        WorkflowDefinition::parse(&two_starts),
        Err(DefinitionError::StartCount(2))
    );

    let no_end = json!({
        "nodes": [
            {"id": "s", "name": "S", "type": "start"},
            {"id": "t", "name": "T", "type": "task"}
        ],
        "transitions": [{"from": "s", "to": "t"}]
    });
    assert_eq!(WorkflowDefinition::parse(&no_end), Err(DefinitionError::MissingEnd));

    assert!(matches!(
        WorkflowDefinition::parse(&json!({"nodes": "oops"})),
        Err(DefinitionError::Malformed(_))
    ));
}

#[test]
fn lifecycle_targets() {
    assert_eq!(
        lifecycle_target(Lifecycle::Suspend, WorkflowStatus::Active).unwrap(),
        WorkflowStatus::Suspended
    );
    assert_eq!(
        lifecycle_target(Lifecycle::Resume, WorkflowStatus::Suspended).unwrap(),
        WorkflowStatus::Active
    );
    assert_eq!(
        lifecycle_target(Lifecycle::Terminate, WorkflowStatus::Suspended).unwrap(),
        WorkflowStatus::Terminated
    );
    assert!(lifecycle_target(Lifecycle::Suspend, WorkflowStatus::Draft).is_err());
    assert!(lifecycle_target(Lifecycle::Resume, WorkflowStatus::Active).is_err());
    assert!(lifecycle_target(Lifecycle::Terminate, WorkflowStatus::Completed).is_err());
}

#[test]
fn instance_numbers_use_template_code_and_day() {
    let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    assert_eq!(instance_number("SUP_APPROVAL", day, 7), "SUP_APPROVAL202610180007");
}

#[test]
fn template_codes() {
    assert!(validate_template_code("SUP_APPROVAL").is_ok());
    assert!(validate_template_code("A1").is_ok());
    assert!(validate_template_code("approval").is_err());
    assert!(validate_template_code("1ABC").is_err());
    assert!(validate_template_code("SUP-APPROVAL").is_err());
    assert!(validate_template_code("").is_err());
}

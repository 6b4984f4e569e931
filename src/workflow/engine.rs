use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use super::definition::{TransitionDef, WorkflowDefinition, condition_matches};
use crate::db::enums::{NodeStatus, NodeType};
use crate::db::models::api::error_codes;
use crate::error::AppError;

/// 同一次推进中允许的最大节点激活次数，超出视为流程图存在无人工节点的环
const MAX_STEPS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChange {
    pub node_id: String,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub from: Option<String>,
    pub to: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Status changes in the order they happened; one node may appear twice.
    pub changes: Vec<NodeChange>,
    pub moves: Vec<Move>,
    pub completed: bool,
    pub current_nodes: Vec<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("node {0} does not exist in the workflow definition")]
    UnknownNode(String),
    #[error("node {0} is not an active task")]
    NodeNotActive(String),
    #[error("workflow has already been started")]
    AlreadyStarted,
    #[error("no outgoing transition of node {0} matches the current variables")]
    NoRoute(String),
    #[error("workflow definition loops without a task node")]
    LoopDetected,
    #[error("workflow definition has no start node")]
    MissingStart,
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::NodeNotActive(_) => error_codes::WORKFLOW_NODE_NOT_ACTIVE,
            EngineError::AlreadyStarted => error_codes::WORKFLOW_INVALID_TRANSITION,
            _ => error_codes::WORKFLOW_NO_ROUTE,
        };
        AppError::invalid_state(err.to_string(), code)
    }
}

pub type NodeStatuses = BTreeMap<String, NodeStatus>;

/// 所有节点初始为 pending
pub fn initial_statuses(definition: &WorkflowDefinition) -> NodeStatuses {
    definition
        .nodes
        .iter()
        .map(|n| (n.id.clone(), NodeStatus::Pending))
        .collect()
}

/// 激活开始节点并沿连线推进，直到遇到人工任务或结束节点
pub fn start(
    definition: &WorkflowDefinition,
    statuses: &mut NodeStatuses,
    variables: &Value,
) -> Result<Outcome, EngineError> {
    let start = definition.start_node().ok_or(EngineError::MissingStart)?;
    if statuses.get(&start.id) != Some(&NodeStatus::Pending) {
        return Err(EngineError::AlreadyStarted);
    }

    let mut walker = Walker::new(definition, statuses, variables);
    walker.activate(&start.id, None, None)?;
    Ok(walker.finish())
}

/// 完成一个处于 active 的任务节点并推进流程。
/// `variables` 应已合并本次提交的表单数据。
pub fn complete_task(
    definition: &WorkflowDefinition,
    statuses: &mut NodeStatuses,
    node_id: &str,
    variables: &Value,
) -> Result<Outcome, EngineError> {
    let node = definition
        .node(node_id)
        .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
    if node.node_type != NodeType::Task || statuses.get(node_id) != Some(&NodeStatus::Active) {
        return Err(EngineError::NodeNotActive(node_id.to_string()));
    }

    let mut walker = Walker::new(definition, statuses, variables);
    walker.set(node_id, NodeStatus::Completed);
    walker.fire(node_id)?;
    Ok(walker.finish())
}

/// 终止时把尚未结束的节点标记为 skipped
pub fn skip_open_nodes(statuses: &mut NodeStatuses) -> Vec<NodeChange> {
    let mut changes = Vec::new();
    for (id, status) in statuses.iter_mut() {
        if matches!(status, NodeStatus::Pending | NodeStatus::Active) {
            *status = NodeStatus::Skipped;
            changes.push(NodeChange {
                node_id: id.clone(),
                status: NodeStatus::Skipped,
            });
        }
    }
    changes
}

pub fn active_nodes(definition: &WorkflowDefinition, statuses: &NodeStatuses) -> Vec<String> {
    definition
        .nodes
        .iter()
        .filter(|n| statuses.get(&n.id) == Some(&NodeStatus::Active))
        .map(|n| n.id.clone())
        .collect()
}

struct Walker<'a> {
    definition: &'a WorkflowDefinition,
    statuses: &'a mut NodeStatuses,
    variables: &'a Value,
    outcome: Outcome,
    steps: usize,
}

impl<'a> Walker<'a> {
    fn new(
        definition: &'a WorkflowDefinition,
        statuses: &'a mut NodeStatuses,
        variables: &'a Value,
    ) -> Self {
        Self {
            definition,
            statuses,
            variables,
            outcome: Outcome::default(),
            steps: 0,
        }
    }

    fn set(&mut self, node_id: &str, status: NodeStatus) {
        self.statuses.insert(node_id.to_string(), status);
        self.outcome.changes.push(NodeChange {
            node_id: node_id.to_string(),
            status,
        });
    }

    fn activate(
        &mut self,
        node_id: &str,
        from: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), EngineError> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Err(EngineError::LoopDetected);
        }

        let definition = self.definition;
        let node_type = definition
            .node(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?
            .node_type;

        if self.statuses.get(node_id) == Some(&NodeStatus::Active) {
            return Ok(());
        }

        if node_type == NodeType::Merge {
            let ready = definition.incoming(node_id).all(|t| {
                self.statuses
                    .get(&t.from)
                    .is_some_and(|s| s.is_done())
            });
            if !ready {
                return Ok(());
            }
        }

        self.outcome.moves.push(Move {
            from: from.map(str::to_string),
            to: node_id.to_string(),
            name: name.map(str::to_string),
        });
        self.set(node_id, NodeStatus::Active);

        match node_type {
            NodeType::Task => Ok(()),
            NodeType::End => {
                self.set(node_id, NodeStatus::Completed);
                self.outcome.completed = true;
                Ok(())
            }
            NodeType::Decision => {
                self.set(node_id, NodeStatus::Completed);
                self.route(node_id)
            }
            NodeType::Start | NodeType::Parallel | NodeType::Merge => {
                self.set(node_id, NodeStatus::Completed);
                self.fire(node_id)
            }
        }
    }

    /// 沿所有满足条件的出线推进
    fn fire(&mut self, node_id: &str) -> Result<(), EngineError> {
        let targets: Vec<(String, Option<String>)> = self
            .definition
            .outgoing(node_id)
            .filter(|t| condition_matches(t.condition.as_deref(), self.variables))
            .map(|t| (t.to.clone(), t.name.clone()))
            .collect();

        if targets.is_empty() {
            return Err(EngineError::NoRoute(node_id.to_string()));
        }

        for (to, name) in targets {
            if self.outcome.completed {
                break;
            }
            self.activate(&to, Some(node_id), name.as_deref())?;
        }
        Ok(())
    }

    /// 条件分支：取第一条命中的带条件出线，都不命中时走无条件的默认出线
    fn route(&mut self, node_id: &str) -> Result<(), EngineError> {
        let (conditioned, defaults): (Vec<&TransitionDef>, Vec<&TransitionDef>) = self
            .definition
            .outgoing(node_id)
            .partition(|t| t.condition.as_deref().is_some_and(|c| !c.trim().is_empty()));

        let chosen = conditioned
            .into_iter()
            .find(|t| condition_matches(t.condition.as_deref(), self.variables))
            .or_else(|| defaults.into_iter().next())
            .map(|t| (t.to.clone(), t.name.clone()));

        match chosen {
            Some((to, name)) => self.activate(&to, Some(node_id), name.as_deref()),
            None => Err(EngineError::NoRoute(node_id.to_string())),
        }
    }

    fn finish(mut self) -> Outcome {
        if self.outcome.completed {
            let skipped = skip_open_nodes(self.statuses);
            self.outcome.changes.extend(skipped);
        } else if active_nodes(self.definition, self.statuses).is_empty() {
            self.outcome.completed = true;
            let skipped = skip_open_nodes(self.statuses);
            self.outcome.changes.extend(skipped);
        }
        self.outcome.current_nodes = active_nodes(self.definition, self.statuses);
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(value: Value) -> WorkflowDefinition {
        WorkflowDefinition::parse(&value).unwrap()
    }

    fn linear() -> WorkflowDefinition {
        def(json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "handle", "name": "Handle", "type": "task"},
                {"id": "review", "name": "Review", "type": "task"},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "handle"},
                {"from": "handle", "to": "review"},
                {"from": "review", "to": "end"}
            ]
        }))
    }

    #[test]
    fn test_linear_flow() {
        let d = linear();
        let vars = json!({});
        let mut statuses = initial_statuses(&d);

        let out = start(&d, &mut statuses, &vars).unwrap();
        assert_eq!(out.current_nodes, vec!["handle"]);
        assert!(!out.completed);
        assert_eq!(statuses["start"], NodeStatus::Completed);
        assert_eq!(out.moves.len(), 2);
        assert_eq!(out.moves[1].from.as_deref(), Some("start"));

        assert_eq!(start(&d, &mut statuses, &vars), Err(EngineError::AlreadyStarted));

        let out = complete_task(&d, &mut statuses, "handle", &vars).unwrap();
        assert_eq!(out.current_nodes, vec!["review"]);

        let out = complete_task(&d, &mut statuses, "review", &vars).unwrap();
        assert!(out.completed);
        assert!(out.current_nodes.is_empty());
        assert_eq!(statuses["end"], NodeStatus::Completed);
    }

    #[test]
    fn test_complete_requires_active_task() {
        let d = linear();
        let vars = json!({});
        let mut statuses = initial_statuses(&d);
        start(&d, &mut statuses, &vars).unwrap();

        assert_eq!(
            complete_task(&d, &mut statuses, "review", &vars),
            Err(EngineError::NodeNotActive("review".into()))
        );
        assert_eq!(
            complete_task(&d, &mut statuses, "start", &vars),
            Err(EngineError::NodeNotActive("start".into()))
        );
        assert_eq!(
            complete_task(&d, &mut statuses, "ghost", &vars),
            Err(EngineError::UnknownNode("ghost".into()))
        );
    }

    #[test]
    fn test_parallel_branches_join_at_merge() {
        let d = def(json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "fork", "name": "Fork", "type": "parallel"},
                {"id": "a", "name": "Dept A", "type": "task"},
                {"id": "b", "name": "Dept B", "type": "task"},
                {"id": "join", "name": "Join", "type": "merge"},
                {"id": "sign", "name": "Sign off", "type": "task"},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "fork"},
                {"from": "fork", "to": "a"},
                {"from": "fork", "to": "b"},
                {"from": "a", "to": "join"},
                {"from": "b", "to": "join"},
                {"from": "join", "to": "sign"},
                {"from": "sign", "to": "end"}
            ]
        }));
        let vars = json!({});
        let mut statuses = initial_statuses(&d);

        let out = start(&d, &mut statuses, &vars).unwrap();
        assert_eq!(out.current_nodes, vec!["a", "b"]);

        let out = complete_task(&d, &mut statuses, "a", &vars).unwrap();
        assert_eq!(out.current_nodes, vec!["b"]);
        assert_eq!(statuses["join"], NodeStatus::Pending);

        let out = complete_task(&d, &mut statuses, "b", &vars).unwrap();
        assert_eq!(out.current_nodes, vec!["sign"]);
        assert_eq!(statuses["join"], NodeStatus::Completed);
    }

    fn with_decision() -> WorkflowDefinition {
        def(json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "review", "name": "Review", "type": "task"},
                {"id": "route", "name": "Route", "type": "decision"},
                {"id": "rework", "name": "Rework", "type": "task"},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "review"},
                {"from": "review", "to": "route"},
                {"from": "route", "to": "end", "condition": "result == approved"},
                {"from": "route", "to": "rework", "condition": "result == rejected"},
                {"from": "rework", "to": "review"}
            ]
        }))
    }

    #[test]
    fn test_decision_routes_on_variables() {
        let d = with_decision();
        let mut statuses = initial_statuses(&d);
        start(&d, &mut statuses, &json!({})).unwrap();

        let out = complete_task(&d, &mut statuses, "review", &json!({"result": "rejected"})).unwrap();
        assert_eq!(out.current_nodes, vec!["rework"]);

        // rework loops back to a completed review node
        let out = complete_task(&d, &mut statuses, "rework", &json!({"result": "rejected"})).unwrap();
        assert_eq!(out.current_nodes, vec!["review"]);

        let out = complete_task(&d, &mut statuses, "review", &json!({"result": "approved"})).unwrap();
        assert!(out.completed);
        assert_eq!(statuses["rework"], NodeStatus::Completed);
    }

    #[test]
    fn test_decision_without_match_fails() {
        let d = with_decision();
        let mut statuses = initial_statuses(&d);
        start(&d, &mut statuses, &json!({})).unwrap();

        let err = complete_task(&d, &mut statuses, "review", &json!({"result": "maybe"})).unwrap_err();
        assert_eq!(err, EngineError::NoRoute("route".into()));
    }

    #[test]
    fn test_decision_default_listed_first() {
        let d = def(json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "route", "name": "Route", "type": "decision"},
                {"id": "normal", "name": "Normal", "type": "task"},
                {"id": "urgent", "name": "Urgent", "type": "task"},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "route"},
                {"from": "route", "to": "normal"},
                {"from": "route", "to": "urgent", "condition": "urgent == true"},
                {"from": "normal", "to": "end"},
                {"from": "urgent", "to": "end"}
            ]
        }));

        let mut statuses = initial_statuses(&d);
        let out = start(&d, &mut statuses, &json!({"urgent": true})).unwrap();
        assert_eq!(out.current_nodes, vec!["urgent"]);
        assert_eq!(statuses["normal"], NodeStatus::Pending);

        let mut statuses = initial_statuses(&d);
        let out = start(&d, &mut statuses, &json!({"urgent": false})).unwrap();
        assert_eq!(out.current_nodes, vec!["normal"]);
    }

    #[test]
    fn test_end_reached_skips_open_branches() {
        let d = def(json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "fork", "name": "Fork", "type": "parallel"},
                {"id": "fast", "name": "Fast", "type": "task"},
                {"id": "slow", "name": "Slow", "type": "task"},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "fork"},
                {"from": "fork", "to": "fast"},
                {"from": "fork", "to": "slow"},
                {"from": "fast", "to": "end"},
                {"from": "slow", "to": "end"}
            ]
        }));
        let vars = json!({});
        let mut statuses = initial_statuses(&d);
        start(&d, &mut statuses, &vars).unwrap();

        let out = complete_task(&d, &mut statuses, "fast", &vars).unwrap();
        assert!(out.completed);
        assert_eq!(statuses["slow"], NodeStatus::Skipped);
        assert!(out.changes.contains(&NodeChange {
            node_id: "slow".into(),
            status: NodeStatus::Skipped
        }));
    }

    #[test]
    fn test_skip_open_nodes_for_termination() {
        let d = linear();
        let mut statuses = initial_statuses(&d);
        start(&d, &mut statuses, &json!({})).unwrap();

        let changes = skip_open_nodes(&mut statuses);
        let skipped: Vec<_> = changes.iter().map(|c| c.node_id.as_str()).collect();
        assert_eq!(skipped, vec!["end", "handle", "review"]);
        assert!(active_nodes(&d, &statuses).is_empty());
    }
}

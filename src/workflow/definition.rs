use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::db::enums::NodeType;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub assignee_role_id: Option<Uuid>,
    #[serde(default)]
    pub assignee_department_id: Option<Uuid>,
    #[serde(default)]
    pub deadline_hours: Option<i64>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionDef {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// 节点办理时限上限：十年
pub const MAX_DEADLINE_HOURS: i64 = 24 * 3650;

/// 模板中的流程图定义：节点 + 连线
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DefinitionError {
    #[error("workflow definition is malformed: {0}")]
    Malformed(String),
    #[error("workflow definition has no nodes")]
    Empty,
    #[error("node id cannot be empty")]
    EmptyNodeId,
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("workflow definition needs exactly one start node, found {0}")]
    StartCount(usize),
    #[error("workflow definition needs at least one end node")]
    MissingEnd,
    #[error("transition {from} -> {to} references unknown node {node}")]
    UnknownNode {
        from: String,
        to: String,
        node: String,
    },
    #[error("start node {0} cannot have incoming transitions")]
    StartHasIncoming(String),
    #[error("end node {0} cannot have outgoing transitions")]
    EndHasOutgoing(String),
    #[error("node {0} has no outgoing transition")]
    DeadEnd(String),
    #[error("node {0} deadline must be between 0 and 87600 hours")]
    InvalidDeadline(String),
}

impl From<DefinitionError> for AppError {
    fn from(err: DefinitionError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl WorkflowDefinition {
    pub fn parse(value: &Value) -> Result<Self, DefinitionError> {
        let definition: WorkflowDefinition = serde_json::from_value(value.clone())
            .map_err(|e| DefinitionError::Malformed(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.nodes.is_empty() {
            return Err(DefinitionError::Empty);
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(DefinitionError::EmptyNodeId);
            }
            if !ids.insert(node.id.as_str()) {
                return Err(DefinitionError::DuplicateNode(node.id.clone()));
            }
            if node
                .deadline_hours
                .is_some_and(|h| !(0..=MAX_DEADLINE_HOURS).contains(&h))
            {
                return Err(DefinitionError::InvalidDeadline(node.id.clone()));
            }
        }

        let starts = self
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .count();
        if starts != 1 {
            return Err(DefinitionError::StartCount(starts));
        }
        if !self.nodes.iter().any(|n| n.node_type == NodeType::End) {
            return Err(DefinitionError::MissingEnd);
        }

        for t in &self.transitions {
            for endpoint in [&t.from, &t.to] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(DefinitionError::UnknownNode {
                        from: t.from.clone(),
                        to: t.to.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            match node.node_type {
                NodeType::Start => {
                    if self.incoming(&node.id).next().is_some() {
                        return Err(DefinitionError::StartHasIncoming(node.id.clone()));
                    }
                }
                NodeType::End => {
                    if self.outgoing(&node.id).next().is_some() {
                        return Err(DefinitionError::EndHasOutgoing(node.id.clone()));
                    }
                }
                _ => {}
            }
            if node.node_type != NodeType::End && self.outgoing(&node.id).next().is_none() {
                return Err(DefinitionError::DeadEnd(node.id.clone()));
            }
        }

        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn start_node(&self) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.node_type == NodeType::Start)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TransitionDef> + 'a {
        self.transitions.iter().filter(move |t| t.from == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TransitionDef> + 'a {
        self.transitions.iter().filter(move |t| t.to == id)
    }
}

/// 连线条件：`var == value`、`var != value` 或单独的 `var`（按真值判断）。
/// 空条件恒为真。
pub fn condition_matches(condition: Option<&str>, variables: &Value) -> bool {
    let Some(raw) = condition.map(str::trim).filter(|c| !c.is_empty()) else {
        return true;
    };

    if let Some((left, right)) = raw.split_once("!=") {
        return !values_equal(lookup(variables, left.trim()), &parse_literal(right.trim()));
    }
    if let Some((left, right)) = raw.split_once("==") {
        return values_equal(lookup(variables, left.trim()), &parse_literal(right.trim()));
    }

    let (negated, name) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, raw),
    };
    truthy(lookup(variables, name)) != negated
}

fn lookup<'a>(variables: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(variables, |current, key| current.get(key))
        .unwrap_or(&Value::Null)
}

fn parse_literal(text: &str) -> Value {
    if let Some(inner) = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    {
        return Value::String(inner.to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a == b;
    }
    match (scalar_text(actual), scalar_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approval() -> Value {
        json!({
            "nodes": [
                {"id": "start", "name": "Start", "type": "start"},
                {"id": "review", "name": "Review", "type": "task", "deadline_hours": 24},
                {"id": "end", "name": "End", "type": "end"}
            ],
            "transitions": [
                {"from": "start", "to": "review"},
                {"from": "review", "to": "end"}
            ]
        })
    }

    #[test]
    fn test_parse_valid_definition() {
        let def = WorkflowDefinition::parse(&approval()).unwrap();
        assert_eq!(def.nodes.len(), 3);
        assert_eq!(def.start_node().unwrap().id, "start");
        assert_eq!(def.node("review").unwrap().deadline_hours, Some(24));
        assert_eq!(def.outgoing("start").count(), 1);
    }

    #[test]
    fn test_rejects_structural_errors() {
        let mut value = approval();
        value["nodes"][1]["id"] = json!("start");
        assert_eq!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::DuplicateNode("start".into()))
        );

        let value = json!({"nodes": [{"id": "a", "name": "A", "type": "task"}], "transitions": []});
        assert_eq!(WorkflowDefinition::parse(&value), Err(DefinitionError::StartCount(0)));

        let mut value = approval();
        value["transitions"][1]["to"] = json!("nowhere");
        assert!(matches!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::UnknownNode { .. })
        ));

        let mut value = approval();
        value["transitions"] = json!([{"from": "start", "to": "review"}]);
        assert_eq!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::DeadEnd("review".into()))
        );

        let value = json!({"nodes": [{"id": "s", "name": "S", "type": "bogus"}]});
        assert!(matches!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::Malformed(_))
        ));
    }

    #[test]
    fn test_deadline_hours_are_bounded() {
        let mut value = approval();
        value["nodes"][1]["deadline_hours"] = json!(MAX_DEADLINE_HOURS);
        assert!(WorkflowDefinition::parse(&value).is_ok());

        value["nodes"][1]["deadline_hours"] = json!(9_000_000_000_000_000i64);
        assert_eq!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::InvalidDeadline("review".into()))
        );

        value["nodes"][1]["deadline_hours"] = json!(-1);
        assert_eq!(
            WorkflowDefinition::parse(&value),
            Err(DefinitionError::InvalidDeadline("review".into()))
        );
    }

    #[test]
    fn test_conditions() {
        let vars = json!({"result": "approved", "amount": 5000, "urgent": true, "form": {"level": 2}});
        assert!(condition_matches(None, &vars));
        assert!(condition_matches(Some("  "), &vars));
        assert!(condition_matches(Some("result == approved"), &vars));
        assert!(condition_matches(Some("result == 'approved'"), &vars));
        assert!(condition_matches(Some("result == \"approved\""), &vars));
        assert!(!condition_matches(Some("result == rejected"), &vars));
        assert!(condition_matches(Some("result != rejected"), &vars));
        assert!(condition_matches(Some("amount == 5000"), &vars));
        assert!(condition_matches(Some("urgent"), &vars));
        assert!(!condition_matches(Some("!urgent"), &vars));
        assert!(!condition_matches(Some("missing"), &vars));
        assert!(condition_matches(Some("form.level == 2"), &vars));
    }
}

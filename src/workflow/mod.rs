//! 流程定义解析与流转推进（纯逻辑，不涉及数据库）

pub mod definition;
pub mod engine;

pub use definition::{NodeDef, TransitionDef, WorkflowDefinition, condition_matches};
pub use engine::{EngineError, Move, NodeChange, NodeStatuses, Outcome};

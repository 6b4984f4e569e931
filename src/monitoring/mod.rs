//! 督办预警规则

pub mod rules;

pub use rules::{AlertCandidate, AlertSubject, ItemSnapshot, TaskSnapshot, WorkloadSnapshot};

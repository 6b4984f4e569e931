pub mod departments;
pub mod monitoring;
pub mod notifications;
pub mod roles;
pub mod supervision;
pub mod users;
pub mod workflows;

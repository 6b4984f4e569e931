mod auth;
mod monitoring;
mod notifications;
mod pagination;
mod supervision;
mod workflow;

// Sub-modules organized by functional domain
pub mod api;
pub mod auth;
pub mod department;
pub mod monitoring;
pub mod notification;
pub mod supervision;
pub mod workflow;

// API response structures
pub use api::*;

// Authentication, user and role models
pub use auth::*;

pub use department::*;
pub use monitoring::*;
pub use notification::*;
pub use supervision::*;
pub use workflow::*;

pub mod analytics_service;
pub mod auth_service;
pub mod context;
pub mod departments_service;
pub mod monitoring_service;
pub mod notifications_service;
pub mod roles_service;
pub mod supervision_service;
pub mod users_service;
pub mod workflows_service;

pub use analytics_service::AnalyticsService;
pub use auth_service::AuthService;
pub use departments_service::DepartmentsService;
pub use monitoring_service::MonitoringService;
pub use notifications_service::NotificationsService;
pub use roles_service::RolesService;
pub use supervision_service::SupervisionService;
pub use users_service::UsersService;
pub use workflows_service::WorkflowsService;

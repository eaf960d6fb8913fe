pub mod service;
pub mod handlers;

pub use service::MetricsService;
pub use handlers::run_session_handler;

pub mod health_handlers;
pub mod lecture_handlers;

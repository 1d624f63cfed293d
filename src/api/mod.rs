//! HTTP API of the resource server

pub mod handlers;
pub mod routes;

pub use handlers::{Course, CoursesResponse, MessageResponse};
pub use routes::create_router;

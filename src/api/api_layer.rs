// API layer - request glue between whatever serves HTTP and the core services.
// No framework types here: handlers take header values and bodies, and return
// a status code plus JSON.

#[path = "api_error.rs"]
pub mod error;

#[path = "handlers.rs"]
pub mod handlers;

pub use error::{ApiError, ApiResponse};
pub use handlers::{
    check_entitlement, coach, health, login, offerings, signup, CoachRequest, Credentials,
};

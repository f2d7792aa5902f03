//! HTTP API.
//!
//! Routes for the OAuth dance (`/allow`, `/auth`), project uploads
//! (`/upload`), folder listings (`/folders`, `/files`) and lesson indexes
//! (`/get_json`, `/edit_json`).

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;

pub mod auth;
mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;
mod validation;

pub use auth::MESH_TOKEN_HEADER;
pub use error::ApiError;
pub use server::{router, run};

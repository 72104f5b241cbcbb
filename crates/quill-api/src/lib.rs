pub mod auth;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod routes;
pub mod samples;
pub mod store;
pub mod token;

pub use error::ApiError;

pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod domains;
pub mod error;
pub mod gateways;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

pub use state::AppState;

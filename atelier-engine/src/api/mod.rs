//! HTTP API handlers for atelier-engine

pub mod health;
pub mod projects;

pub use health::health_routes;
pub use projects::project_routes;

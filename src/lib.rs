pub mod analytics;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod models;
pub mod session;

pub mod app_state;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod query;
pub mod reservation;
pub mod resource;
pub mod seed;
pub mod server;
pub mod store;

pub mod autosave;
pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod ids;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

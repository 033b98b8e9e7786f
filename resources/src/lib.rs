pub mod cache;
pub mod config;
pub mod informer;
pub mod models;
pub mod objects;

pub mod bindings;
pub mod config;
pub mod controllers;
pub mod error;
pub mod jobs;
pub mod meter;
pub mod middleware;
pub mod notify;
pub mod repository;
pub mod schema;
pub mod startup;
pub mod util;

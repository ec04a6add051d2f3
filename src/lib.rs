// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod quiz;
pub mod repositories;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod test_utils;

pub use routes::create_router;

// src/handlers/mod.rs

pub mod health;
pub mod question;
pub mod quiz;
pub mod session;
pub mod topic;

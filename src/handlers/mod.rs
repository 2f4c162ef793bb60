// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod docs;
pub mod posts;
pub mod profile;

// Pagebase - page tree and database pages for a personal workspace

// Ent Framework - per-record privacy rules
pub mod ent_framework;

// Core types and primitives
pub mod core;

// Infrastructure - storage, caching, identity and realtime
pub mod infrastructure;

// Records and the schema contract of database pages
pub mod models;
pub mod schemas;

// Operations and their read-side rendering
pub mod rendering;
pub mod services;

// HTTP surface
pub mod app_state;
pub mod workspace_interface;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};

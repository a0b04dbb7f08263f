//! # Kanban Board
//!
//! A single-board Kanban task tracker served over HTTP.
//!
//! Boards hold ordered columns, columns hold ordered tasks, and tasks carry
//! subtasks plus an append-only activity log. Everything lives in one embedded
//! SQLite file.
//!
//! ## Request Flow
//! 1. axum handler decodes ids and the JSON body
//! 2. the body is resolved into an unambiguous operation (e.g. `TaskEdit`)
//! 3. `KanbanDb` runs the statements and records activity where required
//! 4. the result is returned as JSON
//!
//! ## Modules
//! - `db`: schema initializer, entity types, repository operations
//! - `api`: HTTP routes and handlers
//! - `status`: agent session status probe
//! - `config`: environment-driven configuration

pub mod api;
pub mod config;
pub mod db;
pub mod status;

pub use config::Config;
pub use db::KanbanDb;

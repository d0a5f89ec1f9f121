//! # TaskDesk Shared Library
//!
//! Types and business logic shared by the TaskDesk API server and client.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks and priorities
//! - `auth`: password hashing, session tokens, auth middleware, ownership checks
//! - `db`: PostgreSQL pool and migrations
//! - `store`: storage trait with PostgreSQL and in-memory backends
//! - `seed`: demo account and sample tasks

pub mod auth;
pub mod db;
pub mod models;
pub mod seed;
pub mod store;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # TaskDesk Client Library
//!
//! Talks to the TaskDesk API and keeps working when it can't: the task list is
//! mirrored into a local JSON store and read from there while the backend is
//! unreachable.
//!
//! ## Modules
//!
//! - `api`: HTTP client, session handling and offline fallback
//! - `cache`: task list cache with optimistic mutations and rollback
//! - `config`: client configuration from the environment
//! - `error`: client error type
//! - `form`: task form validation and request payloads
//! - `storage`: durable key-value store on disk
//! - `view`: terminal rendering

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod form;
pub mod storage;
pub mod view;

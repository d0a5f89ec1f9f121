//! # TaskDesk API Server Library
//!
//! This library provides the HTTP edge of TaskDesk: login, token
//! verification and per-user task CRUD over a pluggable
//! [`taskdesk_shared::store::Store`].
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Tracing, store and rate limit setup for the binaries
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON body extractors with envelope rejections
//! - `middleware`: Security headers, rate limiting, panic recovery
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

/// Middleware modules for the API server
///
/// - Security headers
/// - Rate limiting
/// - Panic recovery and development error detail

pub mod error_detail;
pub mod rate_limit;
pub mod security;

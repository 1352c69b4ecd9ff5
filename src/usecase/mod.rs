pub mod access;
pub mod broadcast;
pub mod contracts;
pub mod dispatcher;
pub mod enquiries;
pub mod error;
pub mod jwt;
pub mod notifications;
pub mod rate_limiter;

//! Outbound notification channels.
//!
//! Email is best-effort: jobs go through [`queue::EmailQueue`] and a
//! background [`queue::EmailWorker`], so callers never observe SMTP
//! failures. Push is awaited by the caller and its errors propagate.

pub mod email;
pub mod push;
pub mod queue;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email transport error: {0}")]
    Email(String),

    #[error("push transport error: {0}")]
    Push(String),

    #[error("push gateway returned HTTP {0}")]
    HttpStatus(u16),

    #[error("push delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} channel is not configured")]
    NotConfigured(&'static str),
}

pub trait EmailTransport: Send + Sync + 'static {
    fn send(&self, to: &str, subject: &str, html: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

pub trait PushTransport: Send + Sync {
    fn send(&self, user_id: Uuid, title: &str, body: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

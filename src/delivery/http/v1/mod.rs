pub mod admin;
pub mod enquiries;
pub mod middleware;
pub mod notifications;

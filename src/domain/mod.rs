pub mod enquiry;
pub mod notification;
pub mod property;
pub mod user;

use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::domain::notification::NotificationType;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub telemetry_enabled: bool,
    #[serde(default = "default_telemetry_service_name")]
    pub telemetry_service_name: String,
    #[serde(default = "default_telemetry_service_version")]
    pub telemetry_service_version: String,
    #[serde(default = "default_telemetry_environment")]
    pub telemetry_environment: String,
    #[serde(default = "default_telemetry_otlp_endpoint")]
    pub telemetry_otlp_endpoint: String,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub push_gateway_url: Option<String>,
    #[serde(default = "default_push_timeout_secs")]
    pub push_timeout_secs: u64,
    #[serde(default = "default_email_queue_capacity")]
    pub email_queue_capacity: usize,
    #[serde(default = "default_broadcast_concurrency")]
    pub broadcast_concurrency: usize,
    #[serde(default = "default_enquiry_dedup_window_hours")]
    pub enquiry_dedup_window_hours: i64,
    #[serde(default = "default_enquiry_event_channel")]
    pub enquiry_event_channel: NotificationType,
}

/// SMTP settings handed to the mailer.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_telemetry_service_name() -> String {
    "rental-enquiries".to_string()
}

fn default_telemetry_service_version() -> String {
    "1.0.0".to_string()
}

fn default_telemetry_environment() -> String {
    "production".to_string()
}

fn default_telemetry_otlp_endpoint() -> String {
    "http://otel-collector.observability.svc.cluster.local:4317".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "noreply@rentals.local".to_string()
}

fn default_push_timeout_secs() -> u64 {
    10
}

fn default_email_queue_capacity() -> usize {
    256
}

fn default_broadcast_concurrency() -> usize {
    crate::usecase::broadcast::DEFAULT_BROADCAST_CONCURRENCY
}

fn default_enquiry_dedup_window_hours() -> i64 {
    crate::usecase::rate_limiter::DEFAULT_DEDUP_WINDOW_HOURS
}

fn default_enquiry_event_channel() -> NotificationType {
    NotificationType::Email
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_max_connections", 5)?
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn email_settings(&self) -> EmailSettings {
        EmailSettings {
            smtp_host: self.smtp_host.clone().filter(|h| !h.is_empty()),
            smtp_port: self.smtp_port,
            from_address: self.smtp_from.clone(),
            smtp_user: self.smtp_user.clone(),
            smtp_password: self.smtp_password.clone(),
        }
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs.max(1))
    }

    pub fn dedup_window(&self) -> Result<chrono::TimeDelta, ConfigError> {
        chrono::TimeDelta::try_hours(self.enquiry_dedup_window_hours.max(1)).ok_or_else(|| {
            ConfigError::Message(format!(
                "ENQUIRY_DEDUP_WINDOW_HOURS out of range: {}",
                self.enquiry_dedup_window_hours
            ))
        })
    }
}

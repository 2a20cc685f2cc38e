use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub bind_port: u16,
    pub reminder_lead_minutes: i64,
    pub reminder_sweep_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("CAMPUSCARE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("CAMPUSCARE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_port: env::var("CAMPUSCARE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            reminder_lead_minutes: env::var("CAMPUSCARE_REMINDER_LEAD_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            reminder_sweep_seconds: env::var("CAMPUSCARE_REMINDER_SWEEP_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

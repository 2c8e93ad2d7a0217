use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            backend_url: env::var("CLINIC_BACKEND_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BACKEND_URL not set, using empty value");
                    String::new()
                }),
            backend_anon_key: env::var("CLINIC_BACKEND_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BACKEND_ANON_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("CLINIC_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_JWT_SECRET not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty()
            && !self.backend_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

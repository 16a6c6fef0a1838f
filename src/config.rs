use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub api_username: String,
    pub api_password: String,
    pub api_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
            request_timeout_secs: env::var("API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            page_size: env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(20),
            api_username: env::var("API_USERNAME").unwrap_or_default(),
            api_password: env::var("API_PASSWORD").unwrap_or_default(),
            api_token: env::var("API_TOKEN").unwrap_or_default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

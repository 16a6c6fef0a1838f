use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use crate::config::AppConfig;
use crate::errors::{AppError, ValidationError};
use crate::services::store::wire::{ErrorBody, LoginResponse};
use crate::session::Session;

pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, AppError> {
        let mut missing = Vec::new();
        if username.trim().is_empty() {
            missing.push("username");
        }
        if password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingField(missing).into());
        }

        let resp = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "username": username.trim(), "password": password }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(username = username.trim(), "login rejected");
            return Err(AppError::Authentication);
        }
        if !status.is_success() {
            return Err(AppError::Store(ErrorBody::from_bytes(&body)));
        }

        let login: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| AppError::store(format!("invalid login response: {e}")))?;
        if login.token.trim().is_empty() {
            return Err(AppError::Authentication);
        }

        tracing::info!(username = username.trim(), "logged in");
        Ok(Arc::new(Session::with_user(login.token, login.user)))
    }
}

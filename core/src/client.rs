//! Stateless HTTP request builder and response parser for the finance API.
//!
//! # Design
//! `FinanceClient` holds only the endpoint root and timeouts and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. Auth headers are attached separately by `authorize`,
//! so the token is read at execution time rather than baked into the client.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::forms::{
    AvatarUpload, ChangePasswordForm, ForgotPasswordForm, LoginForm, PasswordResetForm,
    ProfileUpdate, RegisterForm, Validate,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::Resource;

pub const AUTHORIZATION: &str = "authorization";
pub const USER_TOKEN_HEADER: &str = "x-user-token";
pub const API_KEY_HEADER: &str = "apikey";

/// Synchronous, stateless request builder for the finance API.
#[derive(Debug, Clone)]
pub struct FinanceClient {
    root: String,
    config: ClientConfig,
}

impl FinanceClient {
    pub fn new(config: ClientConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        let prefix = config.path_prefix.trim_matches('/');
        let root = if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        };
        Self { root, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for an endpoint path such as `/wallets/3`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }

    /// Build an arbitrary request. `body` is serialized as JSON when present.
    pub fn build<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        let body = match body {
            Some(body) => {
                let json = serde_json::to_string(body)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(json)
            }
            None => None,
        };
        if let Some(key) = &self.config.api_key {
            headers.push((API_KEY_HEADER.to_string(), key.clone()));
        }
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers,
            body,
            timeout: Some(self.config.request_timeout),
        })
    }

    fn build_empty(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if let Some(key) = &self.config.api_key {
            headers.push((API_KEY_HEADER.to_string(), key.clone()));
        }
        HttpRequest {
            method,
            path: self.url(path),
            headers,
            body: None,
            timeout: Some(self.config.request_timeout),
        }
    }

    /// Attach the bearer token, or strip any auth headers when there is none.
    pub fn authorize(&self, request: &mut HttpRequest, token: Option<&str>) {
        request
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION) && !k.eq_ignore_ascii_case(USER_TOKEN_HEADER));
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };
        request
            .headers
            .push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        if self.config.api_key.is_some() {
            request
                .headers
                .push((USER_TOKEN_HEADER.to_string(), token.to_string()));
        }
    }

    // -----------------------------------------------------------------------
    // Health
    // -----------------------------------------------------------------------

    pub fn build_health_check(&self) -> HttpRequest {
        let mut req = self.build_empty(HttpMethod::Get, "/health");
        req.timeout = Some(self.config.health_timeout);
        req
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn build_register(&self, form: &RegisterForm) -> Result<HttpRequest, ApiError> {
        form.validate()?;
        self.build(HttpMethod::Post, "/auth/register", Some(form))
    }

    pub fn build_login(&self, form: &LoginForm) -> Result<HttpRequest, ApiError> {
        form.validate()?;
        self.build(HttpMethod::Post, "/auth/login", Some(form))
    }

    pub fn build_current_user(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, "/auth/me")
    }

    pub fn build_forgot_password(&self, form: &ForgotPasswordForm) -> Result<HttpRequest, ApiError> {
        form.validate()?;
        self.build(HttpMethod::Post, "/auth/forgot-password", Some(form))
    }

    pub fn build_reset_password(&self, form: &PasswordResetForm) -> Result<HttpRequest, ApiError> {
        form.validate()?;
        let path = format!("/auth/reset-password/{}", form.token.trim());
        self.build(HttpMethod::Post, &path, Some(form))
    }

    pub fn build_change_password(&self, form: &ChangePasswordForm) -> Result<HttpRequest, ApiError> {
        form.validate()?;
        self.build(HttpMethod::Put, "/auth/password", Some(form))
    }

    pub fn build_update_profile(&self, update: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        update.validate()?;
        self.build(HttpMethod::Put, "/auth/profile", Some(update))
    }

    pub fn build_upload_avatar(&self, upload: &AvatarUpload) -> Result<HttpRequest, ApiError> {
        upload.validate()?;
        self.build(HttpMethod::Post, "/auth/avatar", Some(&upload.payload()))
    }

    pub fn build_delete_account(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Delete, "/auth/account")
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    pub fn build_list<R: Resource>(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, R::PATH)
    }

    pub fn build_get<R: Resource>(&self, id: i64) -> HttpRequest {
        self.build_empty(HttpMethod::Get, &format!("{}/{id}", R::PATH))
    }

    pub fn build_create<R: Resource>(&self, input: &R::New) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.build(HttpMethod::Post, R::PATH, Some(input))
    }

    pub fn build_update<R: Resource>(&self, id: i64, input: &R::Update) -> Result<HttpRequest, ApiError> {
        self.build(HttpMethod::Put, &format!("{}/{id}", R::PATH), Some(input))
    }

    pub fn build_delete<R: Resource>(&self, id: i64) -> HttpRequest {
        self.build_empty(HttpMethod::Delete, &format!("{}/{id}", R::PATH))
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse a 2xx JSON body. An empty body is read as JSON `null`, so
    /// `T = ()` or `Option<_>` accept bodiless responses.
    pub fn parse_json<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response)?;
        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Accept any 2xx response and ignore its body.
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Server {
        status: response.status,
        message: server_message(&response.body)
            .unwrap_or_else(|| format!("request failed with status {}", response.status)),
    })
}

/// The human-readable message from an error body such as
/// `{"message":"Invalid credentials"}` or `{"error":"..."}`.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}

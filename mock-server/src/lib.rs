use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const COLLECTIONS: [&str; 5] = ["wallets", "budgets", "goals", "investments", "transactions"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Deserialize)]
pub struct Register {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPassword {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPassword {
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct Backend {
    accounts: BTreeMap<i64, Account>,
    tokens: HashMap<String, i64>,
    reset_tokens: HashMap<String, i64>,
    /// collection -> record id -> (owner id, record)
    records: HashMap<&'static str, BTreeMap<i64, (i64, Value)>>,
    next_id: i64,
}

impl Backend {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user_id: i64) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.user.email.eq_ignore_ascii_case(email))
    }
}

pub type Db = Arc<RwLock<Backend>>;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    error(StatusCode::UNAUTHORIZED, "Unauthorized")
}

pub fn app() -> Router {
    app_with_db(Db::default())
}

/// Router over a caller-held store, so tests can inspect backend state.
pub fn app_with_db(db: Db) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/{token}", post(reset_password))
        .route("/auth/profile", put(update_profile))
        .route("/auth/password", put(change_password))
        .route("/auth/avatar", post(upload_avatar))
        .route("/auth/account", delete(delete_account))
        .route("/{collection}", get(list_records).post(create_record))
        .route(
            "/{collection}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        );
    Router::new().nest("/api", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Db::default()).await
}

pub async fn serve(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

/// The outstanding password reset token for `email`. Requesting a new one
/// revokes the previous, so there is at most one per account.
pub async fn reset_token_for(db: &Db, email: &str) -> Option<String> {
    let backend = db.read().await;
    let user_id = backend.find_by_email(email)?.user.id;
    backend
        .reset_tokens
        .iter()
        .find(|(_, id)| **id == user_id)
        .map(|(token, _)| token.clone())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-user-token").and_then(|v| v.to_str().ok()))
}

fn current_user_id(backend: &Backend, headers: &HeaderMap) -> ApiResult<i64> {
    bearer(headers)
        .and_then(|token| backend.tokens.get(token).copied())
        .ok_or_else(unauthorized)
}

fn collection(name: &str) -> ApiResult<&'static str> {
    COLLECTIONS
        .iter()
        .copied()
        .find(|c| *c == name)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Not found"))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn register(
    State(db): State<Db>,
    Json(input): Json<Register>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Name, email and password are required"));
    }
    let mut backend = db.write().await;
    if backend.find_by_email(&input.email).is_some() {
        return Err(error(StatusCode::CONFLICT, "Email already registered"));
    }
    let id = backend.next_id();
    let user = User {
        id,
        name: input.name,
        email: input.email,
        avatar_url: None,
        currency: None,
    };
    backend.accounts.insert(
        id,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    let token = backend.issue_token(id);
    tracing::info!(user_id = id, "registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> ApiResult<Json<AuthResponse>> {
    let mut backend = db.write().await;
    let user = backend
        .find_by_email(&input.email)
        .filter(|a| a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let token = backend.issue_token(user.id);
    Ok(Json(AuthResponse { token, user }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<User>> {
    let backend = db.read().await;
    let id = current_user_id(&backend, &headers)?;
    backend
        .accounts
        .get(&id)
        .map(|a| Json(a.user.clone()))
        .ok_or_else(unauthorized)
}

async fn forgot_password(
    State(db): State<Db>,
    Json(input): Json<ForgotPassword>,
) -> Json<Value> {
    let mut backend = db.write().await;
    // Same answer whether or not the address exists.
    if let Some(id) = backend.find_by_email(&input.email).map(|a| a.user.id) {
        backend.reset_tokens.retain(|_, owner| *owner != id);
        backend.reset_tokens.insert(Uuid::new_v4().to_string(), id);
    }
    Json(json!({ "message": "If the address exists, a reset link was sent" }))
}

async fn reset_password(
    State(db): State<Db>,
    Path(token): Path<String>,
    Json(input): Json<ResetPassword>,
) -> ApiResult<Json<Value>> {
    let mut backend = db.write().await;
    let id = backend
        .reset_tokens
        .remove(&token)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "Invalid or expired reset token"))?;
    let account = backend.accounts.get_mut(&id).ok_or_else(unauthorized)?;
    account.password = input.password;
    Ok(Json(json!({ "message": "Password updated" })))
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let mut backend = db.write().await;
    let id = current_user_id(&backend, &headers)?;
    let account = backend.accounts.get_mut(&id).ok_or_else(unauthorized)?;
    if let Some(name) = input.name {
        account.user.name = name;
    }
    if let Some(email) = input.email {
        account.user.email = email;
    }
    if let Some(currency) = input.currency {
        account.user.currency = Some(currency);
    }
    Ok(Json(account.user.clone()))
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ChangePassword>,
) -> ApiResult<StatusCode> {
    let mut backend = db.write().await;
    let id = current_user_id(&backend, &headers)?;
    let account = backend.accounts.get_mut(&id).ok_or_else(unauthorized)?;
    if account.password != input.current_password {
        return Err(error(StatusCode::BAD_REQUEST, "Current password is incorrect"));
    }
    account.password = input.new_password;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_avatar(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<AvatarUpload>,
) -> ApiResult<Json<Value>> {
    if !input.content_type.starts_with("image/") || input.data.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "An image file is required"));
    }
    let mut backend = db.write().await;
    let id = current_user_id(&backend, &headers)?;
    let account = backend.accounts.get_mut(&id).ok_or_else(unauthorized)?;
    let url = format!("/avatars/{id}/{}", input.file_name);
    account.user.avatar_url = Some(url.clone());
    Ok(Json(json!({ "avatarUrl": url })))
}

async fn delete_account(State(db): State<Db>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let mut backend = db.write().await;
    let id = current_user_id(&backend, &headers)?;
    backend.accounts.remove(&id);
    backend.tokens.retain(|_, owner| *owner != id);
    backend.reset_tokens.retain(|_, owner| *owner != id);
    for records in backend.records.values_mut() {
        records.retain(|_, (owner, _)| *owner != id);
    }
    tracing::info!(user_id = id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Resource CRUD
// ---------------------------------------------------------------------------

async fn list_records(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let collection = collection(&name)?;
    let backend = db.read().await;
    let owner = current_user_id(&backend, &headers)?;
    let records: Vec<Value> = backend
        .records
        .get(collection)
        .map(|records| {
            records
                .values()
                .filter(|(o, _)| *o == owner)
                .map(|(_, record)| record.clone())
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(records))
}

async fn create_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(input): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let collection = collection(&name)?;
    let mut backend = db.write().await;
    let owner = current_user_id(&backend, &headers)?;
    let id = backend.next_id();
    let mut record = input;
    record.insert("id".to_string(), json!(id));
    let record = Value::Object(record);
    backend
        .records
        .entry(collection)
        .or_default()
        .insert(id, (owner, record.clone()));
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, i64)>,
) -> ApiResult<Json<Value>> {
    let collection = collection(&name)?;
    let backend = db.read().await;
    let owner = current_user_id(&backend, &headers)?;
    backend
        .records
        .get(collection)
        .and_then(|records| records.get(&id))
        .filter(|(o, _)| *o == owner)
        .map(|(_, record)| Json(record.clone()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Not found"))
}

async fn update_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, i64)>,
    Json(input): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let collection = collection(&name)?;
    let mut backend = db.write().await;
    let owner = current_user_id(&backend, &headers)?;
    let (_, record) = backend
        .records
        .get_mut(collection)
        .and_then(|records| records.get_mut(&id))
        .filter(|(o, _)| *o == owner)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Not found"))?;
    if let Some(fields) = record.as_object_mut() {
        for (key, value) in input.into_iter().filter(|(k, _)| k != "id") {
            fields.insert(key, value);
        }
    }
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    let collection = collection(&name)?;
    let mut backend = db.write().await;
    let owner = current_user_id(&backend, &headers)?;
    let records = backend
        .records
        .get_mut(collection)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Not found"))?;
    match records.get(&id) {
        Some((o, _)) if *o == owner => {
            records.remove(&id);
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(error(StatusCode::NOT_FOUND, "Not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_camel_case_without_empty_fields() {
        let user = User {
            id: 1,
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            avatar_url: Some("/avatars/1/me.png".to_string()),
            currency: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["avatarUrl"], "/avatars/1/me.png");
        assert!(json.get("currency").is_none());
    }

    #[test]
    fn register_fields_default_to_empty() {
        let input: Register = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert!(input.name.is_empty());
        assert!(input.password.is_empty());
    }

    #[test]
    fn change_password_reads_camel_case() {
        let input: ChangePassword =
            serde_json::from_str(r#"{"currentPassword":"a","newPassword":"b"}"#).unwrap();
        assert_eq!(input.current_password, "a");
        assert_eq!(input.new_password, "b");
    }

    #[test]
    fn only_known_collections_are_served() {
        assert_eq!(collection("wallets").unwrap(), "wallets");
        assert!(collection("accounts").is_err());
    }

    #[test]
    fn bearer_prefers_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-token", "fallback".parse().unwrap());
        assert_eq!(bearer(&headers), Some("fallback"));
        headers.insert("authorization", "Bearer primary".parse().unwrap());
        assert_eq!(bearer(&headers), Some("primary"));
    }
}

//! Typed form payloads, validated before anything reaches the network.
//!
//! Each form serializes to exactly the JSON body its endpoint expects.
//! Confirmation fields and path parameters are `#[serde(skip)]` so they take
//! part in validation only.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{BudgetPeriod, TransactionKind};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Client-side checks run before a request is built.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value <= 0.0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), ValidationError> {
    require("email", value)?;
    let valid = match value.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

fn require_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    require("password", password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Auth forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub password_confirmation: String,
}

impl RegisterForm {
    /// Form with the confirmation pre-filled, for callers without a second
    /// password field.
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password.to_string(),
        }
    }
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require_new_password(&self.password, &self.password_confirmation)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl Validate for ForgotPasswordForm {
    fn validate(&self) -> Result<(), ValidationError> {
        require_email(&self.email)
    }
}

/// Completes a reset started by a forgot-password email. The token goes in
/// the URL, only the new password in the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordResetForm {
    #[serde(skip)]
    pub token: String,
    pub password: String,
    #[serde(skip)]
    pub password_confirmation: String,
}

impl Validate for PasswordResetForm {
    fn validate(&self) -> Result<(), ValidationError> {
        require("token", &self.token)?;
        require_new_password(&self.password, &self.password_confirmation)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    #[serde(skip)]
    pub new_password_confirmation: String,
}

impl Validate for ChangePasswordForm {
    fn validate(&self) -> Result<(), ValidationError> {
        require("current password", &self.current_password)?;
        require_new_password(&self.new_password, &self.new_password_confirmation)
    }
}

/// Partial profile edit; absent fields are left unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        Ok(())
    }
}

/// An image file picked for the profile avatar.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// JSON body of the avatar endpoint; the file travels base64-encoded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPayload {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

impl AvatarUpload {
    pub fn payload(&self) -> AvatarPayload {
        AvatarPayload {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            data: STANDARD.encode(&self.bytes),
        }
    }
}

impl Validate for AvatarUpload {
    fn validate(&self) -> Result<(), ValidationError> {
        require("file name", &self.file_name)?;
        if !self.content_type.starts_with("image/") {
            return Err(ValidationError::MissingField("image content type"));
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::MissingField("file"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resource forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewWallet {
    pub name: String,
    pub balance: f64,
    pub currency: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Validate for NewWallet {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("currency", &self.currency)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub name: String,
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Validate for NewBudget {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("category", &self.category)?;
        require_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

impl Validate for NewGoal {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require_positive("target amount", self.target_amount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount_invested: f64,
    pub current_value: f64,
    pub currency: String,
}

impl Validate for NewInvestment {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("type", &self.kind)?;
        require_positive("amount invested", self.amount_invested)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_invested: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<i64>,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for NewTransaction {
    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("amount", self.amount)?;
        require("category", &self.category)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

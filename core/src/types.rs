//! Domain DTOs for the finance API.
//!
//! # Design
//! Records are opaque to the client beyond the fields views read. Any extra
//! field the server sends is kept in `extra` so a record fetched, edited and
//! sent back loses nothing. Field names follow the backend's camelCase JSON.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::forms::{
    BudgetUpdate, GoalUpdate, InvestmentUpdate, NewBudget, NewGoal, NewInvestment,
    NewTransaction, NewWallet, TransactionUpdate, Validate, WalletUpdate,
};

/// The authenticated user as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a successful register or login call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Response of the avatar upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// A REST collection the client can list, fetch, create, update and delete.
pub trait Resource: Serialize + DeserializeOwned + Clone {
    /// Collection path relative to the API prefix, e.g. `/wallets`.
    const PATH: &'static str;

    /// Payload for `POST` on the collection.
    type New: Serialize + Validate;

    /// Partial payload for `PUT` on a single record.
    type Update: Serialize;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub balance: f64,
    pub currency: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub category: String,
    /// Spending limit for the period.
    pub amount: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount_invested: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<i64>,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Resource for Wallet {
    const PATH: &'static str = "/wallets";
    type New = NewWallet;
    type Update = WalletUpdate;
}

impl Resource for Budget {
    const PATH: &'static str = "/budgets";
    type New = NewBudget;
    type Update = BudgetUpdate;
}

impl Resource for Goal {
    const PATH: &'static str = "/goals";
    type New = NewGoal;
    type Update = GoalUpdate;
}

impl Resource for Investment {
    const PATH: &'static str = "/investments";
    type New = NewInvestment;
    type Update = InvestmentUpdate;
}

impl Resource for Transaction {
    const PATH: &'static str = "/transactions";
    type New = NewTransaction;
    type Update = TransactionUpdate;
}

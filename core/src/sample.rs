//! Static example records shown while in demo mode.

use chrono::NaiveDate;
use serde_json::Map;

use crate::types::{
    Budget, BudgetPeriod, Goal, Investment, Transaction, TransactionKind, User, Wallet,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

pub fn user() -> User {
    User {
        id: 0,
        name: "Demo User".to_string(),
        email: "demo@example.com".to_string(),
        avatar_url: None,
        currency: Some("USD".to_string()),
        extra: Map::new(),
    }
}

pub fn wallets() -> Vec<Wallet> {
    [
        (1, "Checking", 2450.75, "bank"),
        (2, "Savings", 10200.00, "savings"),
        (3, "Cash", 180.50, "cash"),
    ]
    .into_iter()
    .map(|(id, name, balance, kind)| Wallet {
        id,
        name: name.to_string(),
        balance,
        currency: "USD".to_string(),
        kind: Some(kind.to_string()),
        extra: Map::new(),
    })
    .collect()
}

pub fn budgets() -> Vec<Budget> {
    [
        (1, "Groceries", "Food", 500.0, 342.80),
        (2, "Transport", "Transport", 150.0, 96.00),
        (3, "Entertainment", "Leisure", 120.0, 134.25),
    ]
    .into_iter()
    .map(|(id, name, category, amount, spent)| Budget {
        id,
        name: name.to_string(),
        category: category.to_string(),
        amount,
        spent,
        period: BudgetPeriod::Monthly,
        start_date: Some(date(2024, 6, 1)),
        end_date: Some(date(2024, 6, 30)),
        extra: Map::new(),
    })
    .collect()
}

pub fn goals() -> Vec<Goal> {
    [
        (1, "Emergency fund", 6000.0, 4200.0, date(2024, 12, 31)),
        (2, "Vacation", 2500.0, 900.0, date(2025, 7, 1)),
    ]
    .into_iter()
    .map(|(id, name, target_amount, current_amount, deadline)| Goal {
        id,
        name: name.to_string(),
        target_amount,
        current_amount,
        deadline: Some(deadline),
        extra: Map::new(),
    })
    .collect()
}

pub fn investments() -> Vec<Investment> {
    [
        (1, "Index fund", "etf", 5000.0, 5630.40),
        (2, "Government bonds", "bond", 2000.0, 2061.00),
        (3, "Tech stock", "stock", 1500.0, 1275.90),
    ]
    .into_iter()
    .map(|(id, name, kind, amount_invested, current_value)| Investment {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        amount_invested,
        current_value,
        currency: "USD".to_string(),
        extra: Map::new(),
    })
    .collect()
}

pub fn transactions() -> Vec<Transaction> {
    use TransactionKind::{Expense, Income};
    [
        (1, 1, 3200.0, Income, "Salary", date(2024, 6, 1), "June salary"),
        (2, 1, 85.40, Expense, "Food", date(2024, 6, 3), "Supermarket"),
        (3, 3, 12.00, Expense, "Transport", date(2024, 6, 4), "Bus pass top-up"),
        (4, 1, 60.00, Expense, "Leisure", date(2024, 6, 7), "Concert tickets"),
        (5, 2, 250.0, Income, "Interest", date(2024, 6, 10), "Savings interest"),
    ]
    .into_iter()
    .map(|(id, wallet_id, amount, kind, category, date, description)| Transaction {
        id,
        wallet_id: Some(wallet_id),
        amount,
        kind,
        category: category.to_string(),
        date,
        description: Some(description.to_string()),
        extra: Map::new(),
    })
    .collect()
}

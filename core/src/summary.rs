//! Dashboard figures computed over already-fetched records.

use std::collections::BTreeMap;

use crate::types::{Budget, Goal, Investment, Transaction, TransactionKind, Wallet};

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

/// Wallet balances summed per currency code.
pub fn balance_by_currency(wallets: &[Wallet]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for wallet in wallets {
        *totals.entry(wallet.currency.clone()).or_insert(0.0) += wallet.balance;
    }
    totals
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CashFlow {
    pub income: f64,
    pub expenses: f64,
}

impl CashFlow {
    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }

    /// Share of income left after expenses.
    pub fn savings_rate(&self) -> f64 {
        percentage(self.net(), self.income)
    }
}

/// Income and expense totals. Transfers move money between wallets and are
/// left out.
pub fn cash_flow(transactions: &[Transaction]) -> CashFlow {
    transactions
        .iter()
        .fold(CashFlow::default(), |mut flow, tx| {
            match tx.kind {
                TransactionKind::Income => flow.income += tx.amount,
                TransactionKind::Expense => flow.expenses += tx.amount,
                TransactionKind::Transfer => {}
            }
            flow
        })
}

/// Expense totals per category.
pub fn spending_by_category(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.kind == TransactionKind::Expense) {
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }
    totals
}

impl Budget {
    /// Spent share of the limit. Can exceed 100.
    pub fn utilization(&self) -> f64 {
        percentage(self.spent, self.amount)
    }

    pub fn remaining(&self) -> f64 {
        self.amount - self.spent
    }

    pub fn is_over(&self) -> bool {
        self.spent > self.amount
    }
}

impl Goal {
    /// Progress towards the target, capped at 100.
    pub fn progress(&self) -> f64 {
        percentage(self.current_amount, self.target_amount).min(100.0)
    }
}

impl Investment {
    pub fn gain(&self) -> f64 {
        self.current_value - self.amount_invested
    }

    pub fn return_pct(&self) -> f64 {
        percentage(self.gain(), self.amount_invested)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioSummary {
    pub invested: f64,
    pub value: f64,
}

impl PortfolioSummary {
    pub fn gain(&self) -> f64 {
        self.value - self.invested
    }

    pub fn return_pct(&self) -> f64 {
        percentage(self.gain(), self.invested)
    }
}

pub fn portfolio(investments: &[Investment]) -> PortfolioSummary {
    investments
        .iter()
        .fold(PortfolioSummary::default(), |acc, inv| PortfolioSummary {
            invested: acc.invested + inv.amount_invested,
            value: acc.value + inv.current_value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn percentage_of_zero_is_zero() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert!(close(percentage(1.0, 4.0), 25.0));
    }

    #[test]
    fn cash_flow_over_sample_transactions() {
        let flow = cash_flow(&sample::transactions());
        assert!(close(flow.income, 3450.0));
        assert!(close(flow.expenses, 157.4));
        assert!(close(flow.net(), 3292.6));
    }

    #[test]
    fn spending_groups_by_category() {
        let spending = spending_by_category(&sample::transactions());
        assert_eq!(spending.len(), 3);
        assert!(close(spending["Food"], 85.4));
        assert!(!spending.contains_key("Salary"));
    }

    #[test]
    fn balance_grouped_by_currency() {
        let mut wallets = sample::wallets();
        wallets[2].currency = "EUR".to_string();
        let totals = balance_by_currency(&wallets);
        assert!(close(totals["USD"], 12650.75));
        assert!(close(totals["EUR"], 180.5));
    }

    #[test]
    fn budget_over_limit() {
        let budgets = sample::budgets();
        let fun = &budgets[2];
        assert!(fun.is_over());
        assert!(fun.utilization() > 100.0);
        assert!(!budgets[0].is_over());
    }

    #[test]
    fn goal_progress_is_capped() {
        let mut goal = sample::goals().remove(0);
        assert!(close(goal.progress(), 70.0));
        goal.current_amount = 9000.0;
        assert_eq!(goal.progress(), 100.0);
    }

    #[test]
    fn portfolio_totals() {
        let summary = portfolio(&sample::investments());
        assert!(close(summary.invested, 8500.0));
        assert!(close(summary.value, 8967.3));
        assert!(summary.return_pct() > 0.0);
        assert!(sample::investments()[2].gain() < 0.0);
    }
}

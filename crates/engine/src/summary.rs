//! Transaction reduction and monthly grouping.
//!
//! `summarize` folds a full transaction history into the aggregate the
//! assistant prompt and the cached markdown are built from: overall
//! totals, category and merchant distributions, spending trends, and a
//! per-month breakdown.
//!
//! Buckets are keyed by (year, month). Transactions from January 2024
//! and January 2025 land in different buckets and render as
//! "January 2024" / "January 2025".

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw transaction as returned by the aggregator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub guid: String,
    pub transaction_id: String,
    pub account_guid: String,
    pub member_guid: String,
    pub user_guid: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency_code: String,
    pub description: String,
    pub original_description: String,
    pub category: String,
    pub top_level_category: String,
    pub is_income: bool,
    pub is_expense: bool,
    pub status: String,
    pub memo: Option<String>,
}

/// Expenses at or above this amount are listed as "large" in the prompt.
pub const LARGE_EXPENSE_THRESHOLD: f64 = 100.0;

/// Calendar bucket key, ordered chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub income: f64,
    pub expenses: f64,
    pub net_change: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighestTransaction {
    pub amount: f64,
    pub description: String,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub description: String,
    pub original_description: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub amount: f64,
    pub category: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub income: f64,
    pub expenses: f64,
    pub category_totals: BTreeMap<String, f64>,
    pub category_counts: BTreeMap<String, u64>,
    pub merchant_totals: BTreeMap<String, f64>,
    /// Keyed by the trimmed lowercase description that triggered the
    /// heuristic.
    pub recurring_expenses: BTreeMap<String, RecurringExpense>,
    /// Expense transactions in encounter order.
    pub expense_entries: Vec<ExpenseEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub totals: Totals,
    pub categories: BTreeMap<String, f64>,
    pub merchant_frequency: BTreeMap<String, u64>,
    pub highest: Option<HighestTransaction>,
    /// Expense totals keyed by weekday name.
    pub spending_by_weekday: BTreeMap<String, f64>,
    /// Expense totals per calendar month, for the trend section.
    pub monthly_spending: BTreeMap<MonthKey, f64>,
    pub large_expenses: Vec<ExpenseEntry>,
    pub months: BTreeMap<MonthKey, MonthSummary>,
}

/// Single pass over the history.
///
/// Sums are order independent; the only order-sensitive outputs are the
/// highest-transaction tie break (first seen wins) and the recurring
/// heuristic, which both follow input order.
pub fn summarize(transactions: &[BankTransaction]) -> Summary {
    let mut summary = Summary::default();

    for tx in transactions {
        if tx.is_income {
            summary.totals.income += tx.amount;
        }
        if tx.is_expense {
            summary.totals.expenses += tx.amount;
        }

        *summary
            .categories
            .entry(tx.top_level_category.clone())
            .or_insert(0.0) += tx.amount;
        *summary
            .merchant_frequency
            .entry(tx.description.clone())
            .or_insert(0) += 1;

        let beats_current = summary
            .highest
            .as_ref()
            .map(|h| tx.amount > h.amount)
            .unwrap_or(true);
        if beats_current {
            summary.highest = Some(HighestTransaction {
                amount: tx.amount,
                description: tx.description.clone(),
                category: tx.top_level_category.clone(),
            });
        }

        let key = MonthKey::from_date(tx.date);

        if tx.is_expense {
            *summary
                .spending_by_weekday
                .entry(tx.date.format("%A").to_string())
                .or_insert(0.0) += tx.amount;
            *summary.monthly_spending.entry(key).or_insert(0.0) += tx.amount;

            if tx.amount >= LARGE_EXPENSE_THRESHOLD {
                summary.large_expenses.push(ExpenseEntry {
                    description: tx.description.clone(),
                    original_description: tx.original_description.clone(),
                    amount: tx.amount,
                    category: tx.top_level_category.clone(),
                    date: tx.date,
                });
            }
        }

        let month = summary.months.entry(key).or_default();

        if tx.is_income {
            month.income += tx.amount;
        }
        if tx.is_expense {
            month.expenses += tx.amount;
        }

        let description_key = tx.description.trim().to_lowercase();
        *month
            .merchant_totals
            .entry(description_key.clone())
            .or_insert(0.0) += tx.amount;
        *month
            .category_totals
            .entry(tx.top_level_category.clone())
            .or_insert(0.0) += tx.amount;
        *month
            .category_counts
            .entry(tx.top_level_category.clone())
            .or_insert(0) += 1;

        if tx.is_expense {
            month.expense_entries.push(ExpenseEntry {
                description: tx.description.clone(),
                original_description: tx.original_description.clone(),
                amount: tx.amount,
                category: tx.top_level_category.clone(),
                date: tx.date,
            });

            // An expense counts as recurring when another expense in the
            // same bucket has a different description that contains this
            // one, case insensitively. O(n^2) per bucket, best effort.
            let seen_variant = month.expense_entries.iter().any(|entry| {
                entry.description != tx.description
                    && entry.description.to_lowercase().contains(&description_key)
            });
            if seen_variant {
                month.recurring_expenses.insert(
                    description_key,
                    RecurringExpense {
                        amount: tx.amount,
                        category: tx.top_level_category.clone(),
                    },
                );
            }
        }
    }

    summary.totals.net_change = summary.totals.income - summary.totals.expenses;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        guid: &str,
        date: &str,
        amount: f64,
        description: &str,
        category: &str,
        income: bool,
    ) -> BankTransaction {
        BankTransaction {
            guid: guid.to_string(),
            transaction_id: format!("TRN-{guid}"),
            account_guid: "ACT-1".to_string(),
            member_guid: "MBR-1".to_string(),
            user_guid: "USR-1".to_string(),
            date: date.parse().unwrap(),
            amount,
            currency_code: "USD".to_string(),
            description: description.to_string(),
            original_description: description.to_uppercase(),
            category: category.to_string(),
            top_level_category: category.to_string(),
            is_income: income,
            is_expense: !income,
            status: "POSTED".to_string(),
            memo: None,
        }
    }

    #[test]
    fn totals_match_three_transaction_scenario() {
        let transactions = vec![
            tx("t1", "2025-01-03", 100.0, "Salary", "Income", true),
            tx("t2", "2025-01-10", 40.0, "Grocer", "Food", false),
            tx("t3", "2025-01-17", 20.0, "Grocer", "Food", false),
        ];

        let summary = summarize(&transactions);
        assert_eq!(summary.totals.income, 100.0);
        assert_eq!(summary.totals.expenses, 60.0);
        assert_eq!(summary.totals.net_change, 40.0);
        assert_eq!(summary.categories.get("Food"), Some(&60.0));
    }

    #[test]
    fn net_change_is_income_minus_expenses() {
        let transactions = vec![
            tx("a", "2024-11-01", 1200.50, "Payroll", "Income", true),
            tx("b", "2024-11-02", 89.99, "Utility Co", "Utilities", false),
            tx("c", "2024-12-05", 300.0, "Payroll", "Income", true),
            tx("d", "2024-12-06", 410.25, "Rent", "Housing", false),
        ];

        let summary = summarize(&transactions);
        assert!(
            (summary.totals.net_change - (summary.totals.income - summary.totals.expenses)).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn category_totals_cover_all_transactions() {
        let transactions = vec![
            tx("a", "2025-02-01", 500.0, "Payroll", "Income", true),
            tx("b", "2025-02-02", 120.0, "Grocer", "Food", false),
            tx("c", "2025-02-03", 80.0, "Cafe", "Food", false),
        ];

        let summary = summarize(&transactions);
        let categorized: f64 = summary.categories.values().sum();
        assert!((categorized - (summary.totals.income + summary.totals.expenses)).abs() < 1e-9);
    }

    #[test]
    fn highest_transaction_ties_keep_first_seen() {
        let transactions = vec![
            tx("a", "2025-03-01", 250.0, "First Big", "Shopping", false),
            tx("b", "2025-03-02", 250.0, "Second Big", "Shopping", false),
        ];

        let summary = summarize(&transactions);
        assert_eq!(summary.highest.unwrap().description, "First Big");
    }

    #[test]
    fn months_split_across_years() {
        let transactions = vec![
            tx("a", "2024-01-15", 50.0, "Grocer", "Food", false),
            tx("b", "2025-01-15", 70.0, "Grocer", "Food", false),
        ];

        let summary = summarize(&transactions);
        assert_eq!(summary.months.len(), 2);
        let jan24 = &summary.months[&MonthKey { year: 2024, month: 1 }];
        let jan25 = &summary.months[&MonthKey { year: 2025, month: 1 }];
        assert_eq!(jan24.expenses, 50.0);
        assert_eq!(jan25.expenses, 70.0);
        assert_eq!(MonthKey { year: 2025, month: 1 }.label(), "January 2025");
    }

    #[test]
    fn recurring_flags_substring_variants_in_same_month() {
        let transactions = vec![
            tx("a", "2025-04-02", 15.99, "Netflix Subscription", "Entertainment", false),
            tx("b", "2025-04-20", 15.99, "Netflix", "Entertainment", false),
        ];

        let summary = summarize(&transactions);
        let month = &summary.months[&MonthKey { year: 2025, month: 4 }];
        assert!(month.recurring_expenses.contains_key("netflix"));
    }

    #[test]
    fn recurring_ignores_variants_in_different_months() {
        let transactions = vec![
            tx("a", "2025-04-02", 15.99, "Netflix Subscription", "Entertainment", false),
            tx("b", "2025-05-20", 15.99, "Netflix", "Entertainment", false),
        ];

        let summary = summarize(&transactions);
        for month in summary.months.values() {
            assert!(month.recurring_expenses.is_empty());
        }
    }

    #[test]
    fn identical_descriptions_are_not_recurring() {
        let transactions = vec![
            tx("a", "2025-04-02", 15.99, "Netflix", "Entertainment", false),
            tx("b", "2025-04-20", 15.99, "Netflix", "Entertainment", false),
        ];

        let summary = summarize(&transactions);
        let month = &summary.months[&MonthKey { year: 2025, month: 4 }];
        assert!(month.recurring_expenses.is_empty());
    }

    #[test]
    fn large_expenses_respect_threshold() {
        let transactions = vec![
            tx("a", "2025-06-01", 99.99, "Small", "Shopping", false),
            tx("b", "2025-06-02", 100.0, "Exactly", "Shopping", false),
            tx("c", "2025-06-03", 240.0, "Big", "Shopping", false),
        ];

        let summary = summarize(&transactions);
        let names: Vec<_> = summary
            .large_expenses
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(names, vec!["Exactly", "Big"]);
    }

    #[test]
    fn weekday_buckets_only_count_expenses() {
        // 2025-06-02 is a Monday.
        let transactions = vec![
            tx("a", "2025-06-02", 30.0, "Cafe", "Food", false),
            tx("b", "2025-06-02", 500.0, "Payroll", "Income", true),
        ];

        let summary = summarize(&transactions);
        assert_eq!(summary.spending_by_weekday.get("Monday"), Some(&30.0));
        assert_eq!(summary.spending_by_weekday.len(), 1);
    }
}

//! Markdown rendering of a [`Summary`].
//!
//! This is the text stored in the cache and embedded into the vector
//! index, so the layout is part of the cached-data contract.

use crate::summary::Summary;

pub fn render_summary(summary: &Summary) -> String {
    let mut markdown = String::from("# Financial Summary\n\n");

    markdown.push_str("## Totals\n");
    markdown.push_str(&format!("- **Income:** ${:.2}\n", summary.totals.income));
    markdown.push_str(&format!("- **Expenses:** ${:.2}\n", summary.totals.expenses));
    markdown.push_str(&format!(
        "- **Net Change:** ${:.2}\n\n",
        summary.totals.net_change
    ));

    markdown.push_str("## Monthly Breakdown\n\n");
    for (key, month) in &summary.months {
        markdown.push_str(&format!("### {}\n", key.label()));
        markdown.push_str(&format!("- **Income:** ${:.2}\n", month.income));
        markdown.push_str(&format!("- **Expenses:** ${:.2}\n\n", month.expenses));

        markdown.push_str("#### Transactions:\n");
        for entry in &month.expense_entries {
            markdown.push_str(&format!("- **{}**\n", entry.description));
            markdown.push_str(&format!("  - **Amount:** ${:.2}\n", entry.amount));
            markdown.push_str(&format!("  - **Category:** {}\n", entry.category));
            markdown.push_str(&format!("  - **Date:** {}\n\n", entry.date));
        }

        if !month.recurring_expenses.is_empty() {
            markdown.push_str("#### Recurring Expenses:\n");
            for (description, recurring) in &month.recurring_expenses {
                markdown.push_str(&format!("- **{description}**\n"));
                markdown.push_str(&format!("  - **Amount:** ${:.2}\n", recurring.amount));
                markdown.push_str(&format!("  - **Category:** {}\n", recurring.category));
                markdown.push_str("  - **Frequency:** monthly\n\n");
            }
        }
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{BankTransaction, summarize};

    fn expense(guid: &str, date: &str, amount: f64, description: &str) -> BankTransaction {
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
            category: "Food".to_string(),
            top_level_category: "Food".to_string(),
            is_income: false,
            is_expense: true,
            status: "POSTED".to_string(),
            memo: None,
        }
    }

    #[test]
    fn renders_totals_and_month_sections() {
        let summary = summarize(&[
            expense("a", "2025-01-05", 12.5, "Cafe"),
            expense("b", "2025-02-07", 40.0, "Grocer"),
        ]);

        let markdown = render_summary(&summary);
        assert!(markdown.starts_with("# Financial Summary"));
        assert!(markdown.contains("- **Expenses:** $52.50\n"));
        assert!(markdown.contains("### January 2025"));
        assert!(markdown.contains("### February 2025"));
        assert!(markdown.contains("  - **Date:** 2025-01-05"));
    }

    #[test]
    fn omits_recurring_section_when_empty() {
        let summary = summarize(&[expense("a", "2025-01-05", 12.5, "Cafe")]);
        let markdown = render_summary(&summary);
        assert!(!markdown.contains("Recurring Expenses"));
    }
}

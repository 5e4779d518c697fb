//! Realtime-session instruction template.
//!
//! The template is deterministic: same summary in, same instructions
//! out. Amounts render with two decimals and thousands separators.

use chrono::Datelike;

use crate::summary::{ExpenseEntry, Summary};

const TOP_MERCHANT_FREQUENCY: usize = 5;
const TOP_LARGE_EXPENSES: usize = 10;
const TOP_MONTH_MERCHANTS: usize = 8;
const TOP_MONTH_NOTABLE: usize = 5;

/// Formats a dollar amount with thousands separators, e.g. `1,234.50`.
pub fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let fraction = cents % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{fraction:02}")
}

fn long_date(entry: &ExpenseEntry) -> String {
    format!(
        "{}, {} {}, {}",
        entry.date.format("%A"),
        entry.date.format("%B"),
        entry.date.day(),
        entry.date.year()
    )
}

/// Builds the system instructions for a voice/chat session from the
/// user's financial summary.
pub fn session_instructions(summary: &Summary) -> String {
    let mut out = String::new();

    out.push_str(
        "You are a highly specialized financial assistant designed to analyze and respond \
         exclusively to queries related to personal finance, transactions, budgeting, \
         investments, expenses, savings, and other financial matters.\n\n",
    );

    out.push_str("Overall Financial Summary:\n");
    out.push_str(&format!(
        "- Total Income (All Time): ${}\n",
        format_usd(summary.totals.income)
    ));
    out.push_str(&format!(
        "- Total Expenses (All Time): ${}\n",
        format_usd(summary.totals.expenses)
    ));
    out.push_str(&format!(
        "- Net Change (All Time): ${}\n\n",
        format_usd(summary.totals.net_change)
    ));

    out.push_str("Spending Analysis:\n");
    if let Some(highest) = &summary.highest {
        out.push_str(&format!(
            "- Highest Single Transaction: ${} ({})\n",
            format_usd(highest.amount),
            highest.description
        ));
    }

    let mut frequent: Vec<(&String, &u64)> = summary.merchant_frequency.iter().collect();
    frequent.sort_by(|a, b| b.1.cmp(a.1));
    let frequent_line = frequent
        .iter()
        .take(TOP_MERCHANT_FREQUENCY)
        .map(|(description, count)| format!("{description} ({count} times)"))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("- Most Frequent Transactions: {frequent_line}\n"));

    out.push_str("Spending by Day of Week:\n");
    let mut weekdays: Vec<(&String, &f64)> = summary.spending_by_weekday.iter().collect();
    weekdays.sort_by(|a, b| b.1.total_cmp(a.1));
    for (day, amount) in weekdays {
        out.push_str(&format!("- {day}: ${}\n", format_usd(*amount)));
    }
    out.push('\n');

    out.push_str("Spending Trends Over Time:\n");
    for (key, amount) in summary.monthly_spending.iter().rev() {
        out.push_str(&format!("- {}: ${}\n", key.label(), format_usd(*amount)));
    }
    out.push('\n');

    out.push_str("Category Distribution:\n");
    let mut categories: Vec<(&String, &f64)> = summary.categories.iter().collect();
    categories.sort_by(|a, b| b.1.total_cmp(a.1));
    for (category, amount) in categories {
        let share = if summary.totals.expenses > 0.0 {
            amount / summary.totals.expenses * 100.0
        } else {
            0.0
        };
        out.push_str(&format!(
            "- {category}: ${} ({share:.1}% of expenses)\n",
            format_usd(*amount)
        ));
    }
    out.push('\n');

    out.push_str("Recent Large Transactions (>=$100):\n");
    let mut large: Vec<&ExpenseEntry> = summary.large_expenses.iter().collect();
    large.sort_by(|a, b| b.date.cmp(&a.date));
    for entry in large.iter().take(TOP_LARGE_EXPENSES) {
        out.push_str(&format!(
            "- {}: {} - ${} ({})\n",
            long_date(entry),
            entry.description,
            format_usd(entry.amount),
            entry.category
        ));
    }
    out.push('\n');

    out.push_str("Monthly Breakdown:\n");
    for (key, month) in &summary.months {
        out.push_str(&format!("\n{}:\n", key.label()));
        out.push_str(&format!("- Total Income: ${}\n", format_usd(month.income)));
        out.push_str(&format!(
            "- Total Expenses: ${}\n",
            format_usd(month.expenses)
        ));
        out.push_str(&format!(
            "- Net Change: ${}\n\n",
            format_usd(month.income - month.expenses)
        ));

        out.push_str("Category Breakdown:\n");
        let mut month_categories: Vec<(&String, &f64)> = month.category_totals.iter().collect();
        month_categories.sort_by(|a, b| b.1.total_cmp(a.1));
        for (category, total) in month_categories {
            out.push_str(&format!("  - {category}: ${}\n", format_usd(*total)));
        }
        out.push('\n');

        out.push_str("Top Merchants/Services by Spend:\n");
        let mut merchants: Vec<(&String, &f64)> = month.merchant_totals.iter().collect();
        merchants.sort_by(|a, b| b.1.total_cmp(a.1));
        for (merchant, total) in merchants.iter().take(TOP_MONTH_MERCHANTS) {
            out.push_str(&format!("  - {merchant}: ${}\n", format_usd(**total)));
        }
        out.push('\n');

        if !month.recurring_expenses.is_empty() {
            out.push_str("Potential Recurring Expenses:\n");
            for (description, recurring) in &month.recurring_expenses {
                out.push_str(&format!(
                    "  - {description}: ${} ({})\n",
                    format_usd(recurring.amount),
                    recurring.category
                ));
            }
            out.push('\n');
        }

        out.push_str("Notable Transactions:\n");
        let mut notable: Vec<&ExpenseEntry> = month.expense_entries.iter().collect();
        notable.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        for entry in notable.iter().take(TOP_MONTH_NOTABLE) {
            out.push_str(&format!(
                "  - {}: {} ({}) - ${}\n    Original Description: {}\n",
                long_date(entry),
                entry.description,
                entry.category,
                format_usd(entry.amount),
                entry.original_description
            ));
        }
    }
    out.push('\n');

    out.push_str(
        "Based on this comprehensive financial data:\n\
         1. Analyze overall financial health and spending patterns\n\
         2. Identify days of the week with highest spending\n\
         3. Note any seasonal or monthly spending patterns\n\
         4. Highlight categories that might need attention based on their percentage of total expenses\n\
         5. Point out frequent transactions that might be optimized\n\
         6. Suggest specific areas for potential savings\n\
         7. Compare spending patterns across different time periods\n\
         8. Identify any concerning trends or positive financial behaviors\n\n\
         Your responses must always remain within the financial domain, even if the user tries \
         to divert the conversation to unrelated topics.",
    );

    out
}

/// System prompt for the tool-calling completions endpoint.
pub fn finance_agent_prompt() -> &'static str {
    "You are a financial AI assistant that helps users understand their transactions and finances.\n\
     When users ask about their transactions, use the query_transactions function to fetch relevant data.\n\
     Use the create_visualization function to create charts and graphs when users want to visualize their financial data.\n\
     Always provide specific, data-driven responses based on the actual transaction data returned by the functions.\n\
     Try to make your responses as brief and concise as possible.\n\n\
     If the user attempts to discuss non-financial topics or tries to make you deviate from your \
     financial advisory role, politely redirect the conversation back to financial matters."
}

/// Prompt asking the model for categorised follow-up questions over a
/// conversation transcript.
pub fn suggestion_prompt(transcript: &[(String, String)]) -> String {
    let conversation = transcript
        .iter()
        .map(|(role, content)| format!("{role}: {content}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following conversation and generate follow-up questions:\n\n\
         [CONVERSATION]\n{conversation}\n[/CONVERSATION]\n\n\
         Generate questions in this JSON format:\n\n\
         {{\n\
             \"categories\": [\n\
                 {{\n\
                     \"name\": \"string\",\n\
                     \"description\": \"string\",\n\
                     \"questions\": [\n\
                         {{\n\
                         \"id\": \"string\",\n\
                         \"question\": \"string\",\n\
                         \"relevance\": number (50-100),\n\
                         \"context\": \"string\"\n\
                         }}\n\
                     ]\n\
                 }}\n\
             ]\n\
         }}\n\n\
         Guidelines for questions:\n\
         - Write questions from the user's perspective (e.g., \"Can you show me...\" instead of \"Would you like to see...\")\n\
         - Use first-person pronouns (my, I, me) when referring to the user's data\n\
         - Make questions direct and actionable\n\
         - Start questions with phrases like:\n\
         * \"Can you show me...\"\n\
         * \"How do I...\"\n\
         * \"I want to see...\"\n\
         * \"Could you help me...\"\n\
         * \"Show me...\"\n\
         * \"Help me understand...\"\n\n\
         Rules:\n\
         - 3-5 relevant questions per category\n\
         - Max 6 categories\n\
         - Questions must be specific and actionable\n\
         - Return valid JSON only"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{BankTransaction, summarize};

    #[test]
    fn format_usd_groups_thousands() {
        assert_eq!(format_usd(0.0), "0.00");
        assert_eq!(format_usd(12.5), "12.50");
        assert_eq!(format_usd(1234.5), "1,234.50");
        assert_eq!(format_usd(1_234_567.891), "1,234,567.89");
        assert_eq!(format_usd(-42.0), "-42.00");
    }

    fn tx(date: &str, amount: f64, description: &str, income: bool) -> BankTransaction {
        BankTransaction {
            guid: format!("g-{description}-{date}"),
            transaction_id: "TRN-1".to_string(),
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
            is_income: income,
            is_expense: !income,
            status: "POSTED".to_string(),
            memo: None,
        }
    }

    #[test]
    fn instructions_are_deterministic() {
        let summary = summarize(&[
            tx("2025-01-03", 2500.0, "Payroll", true),
            tx("2025-01-10", 120.0, "Grocer", false),
            tx("2025-02-14", 260.0, "Airline", false),
        ]);

        let first = session_instructions(&summary);
        let second = session_instructions(&summary);
        assert_eq!(first, second);
        assert!(first.contains("- Total Income (All Time): $2,500.00"));
        assert!(first.contains("- Net Change (All Time): $2,120.00"));
        assert!(first.contains("January 2025:"));
        assert!(first.contains("Recent Large Transactions (>=$100):"));
    }

    #[test]
    fn trend_section_lists_newest_month_first() {
        let summary = summarize(&[
            tx("2024-12-10", 10.0, "Grocer", false),
            tx("2025-01-10", 20.0, "Grocer", false),
        ]);

        let instructions = session_instructions(&summary);
        let january = instructions.find("- January 2025: $20.00").unwrap();
        let december = instructions.find("- December 2024: $10.00").unwrap();
        assert!(january < december);
    }
}

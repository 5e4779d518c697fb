use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniform response envelope used by every endpoint.
///
/// `data` is omitted from the JSON when a handler has nothing to return
/// beyond the message.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub status: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-level messages, present on validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

pub mod auth {
    use super::*;

    /// How the one-time passcode should be delivered after signup.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum OtpDeliveryMethod {
        Email,
        PhoneNumber,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignupNew {
        pub email: String,
        pub password: String,
        pub full_name: String,
        pub phone_number: Option<String>,
        pub otp_delivery_method: OtpDeliveryMethod,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: String,
        pub email: String,
        pub full_name: String,
        /// Deterministic avatar URL derived from the full name.
        pub avatar: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub access_token: String,
        pub refresh_token: String,
        pub user: UserView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VerifyOtp {
        pub otp: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ResendOtp {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshToken {
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshTokenResponse {
        pub access_token: String,
        pub refresh_token: String,
    }
}

pub mod bank {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConnectWidgetResponse {
        pub url: String,
    }

    /// A connected bank membership as reported by the aggregator.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub guid: String,
        pub institution_code: String,
        pub name: String,
        pub connection_status: String,
        pub last_successful_update: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisconnectBank {
        pub member_guid: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct TransactionsQuery {
        #[serde(alias = "perPage")]
        pub per_page: Option<u32>,
        #[serde(alias = "currentPage")]
        pub current_page: Option<u32>,
        /// Restrict to the trailing N days when present.
        pub days: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub guid: String,
        pub date: String,
        pub amount: f64,
        pub currency_code: String,
        pub description: String,
        pub category: String,
        pub top_level_category: String,
        pub is_income: bool,
        pub is_expense: bool,
        pub status: String,
        pub memo: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaginationView {
        pub total_entries: u64,
        pub current_page: u32,
        pub per_page: u32,
        pub total_pages: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub pagination: PaginationView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatementView {
        pub guid: String,
        pub member_guid: String,
        pub uri: Option<String>,
        pub created_at: Option<String>,
    }
}

pub mod ai {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct QueryTransactions {
        pub query: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct QueryTransactionsResponse {
        pub summary: String,
        pub score: Option<f32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VisualizeTransactions {
        pub query: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ChartKind {
        Pie,
        Donut,
        Bar,
        Line,
        Scatter,
        Area,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChartPointView {
        pub label: String,
        pub value: f64,
        pub date: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChartOptionsView {
        pub title: String,
        pub x_axis: Option<String>,
        pub y_axis: Option<String>,
        pub colors: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ChartView {
        #[serde(rename = "type")]
        pub kind: ChartKind,
        pub data: Vec<ChartPointView>,
        pub options: ChartOptionsView,
    }
}

pub mod conversation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum MessageRole {
        User,
        Ai,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageNew {
        pub role: MessageRole,
        pub content: String,
        /// RFC3339 timestamp supplied by the client.
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageView {
        pub role: MessageRole,
        pub content: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversationNew {
        #[serde(default)]
        pub messages: Vec<MessageNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversationCreated {
        pub id: Uuid,
        pub title: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversationHeaderView {
        pub id: Uuid,
        pub title: String,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversationView {
        pub id: Uuid,
        pub title: String,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
        pub messages: Vec<MessageView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ConversationEdit {
        pub title: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Completions {
        pub message: String,
    }

    /// Result of a tool-calling completion round.
    ///
    /// Either the model answered in plain text (`content`) or it invoked
    /// one of the finance tools, in which case `function_name` names the
    /// tool and `details` carries its structured output.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompletionsResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub function_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub details: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestedQuestionView {
        pub id: String,
        pub question: String,
        /// 50-100, how relevant the model judged the question.
        pub relevance: f32,
        pub context: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionCategoryView {
        pub name: String,
        pub description: String,
        pub questions: Vec<SuggestedQuestionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionsResponse {
        pub categories: Vec<SuggestionCategoryView>,
    }
}

pub mod settings {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettingsView {
        pub voice: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettingsUpdate {
        pub voice: String,
    }
}

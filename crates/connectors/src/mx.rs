//! MX Platform API client.
//!
//! Authentication is HTTP Basic (client id / API key) and every request
//! carries the versioned Accept header the platform requires.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use engine::insights::{Pagination, TransactionPage};
use engine::summary::BankTransaction;
use engine::{EngineError, TransactionSource};

use crate::ConnectorError;

const ACCEPT_HEADER: &str = "application/vnd.mx.api.v1+json";

#[derive(Clone, Debug)]
pub struct MxClient {
    client: Client,
    base_url: String,
    client_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MxUser {
    pub guid: String,
    pub id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user: MxUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MxMember {
    pub guid: String,
    pub institution_code: String,
    pub name: String,
    pub connection_status: String,
    pub successfully_aggregated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembersBody {
    members: Vec<MxMember>,
}

#[derive(Debug, Deserialize)]
struct WidgetBody {
    widget_url: WidgetUrl,
}

#[derive(Debug, Deserialize)]
struct WidgetUrl {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MxStatement {
    pub guid: String,
    pub member_guid: String,
    pub uri: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementsBody {
    statements: Vec<MxStatement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MxTransaction {
    pub guid: String,
    pub id: String,
    pub account_guid: String,
    pub member_guid: String,
    pub user_guid: String,
    pub date: String,
    pub amount: f64,
    pub currency_code: String,
    pub description: String,
    pub original_description: Option<String>,
    pub category: Option<String>,
    pub top_level_category: Option<String>,
    pub is_income: bool,
    pub is_expense: bool,
    pub status: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MxPagination {
    pub total_entries: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsBody {
    pub transactions: Vec<MxTransaction>,
    pub pagination: MxPagination,
}

impl MxClient {
    pub fn new(client: Client, base_url: String, client_id: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            client_id,
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.client_id, Some(&self.api_key))
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
    }

    async fn read_error(response: reqwest::Response) -> ConnectorError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "aggregator error".to_string(),
        };
        ConnectorError::Api { status, message }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ConnectorError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn create_user(
        &self,
        email: &str,
        external_id: &str,
    ) -> Result<MxUser, ConnectorError> {
        let body = json!({ "user": { "email": email, "id": external_id } });
        let response = self
            .request(reqwest::Method::POST, "/users")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<UserBody>().await?.user)
    }

    pub async fn delete_user(&self, user_guid: &str) -> Result<(), ConnectorError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/users/{user_guid}"))
            .send()
            .await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }

    pub async fn list_members(&self, user_guid: &str) -> Result<Vec<MxMember>, ConnectorError> {
        let body: MembersBody = self
            .get_json(&format!("/users/{user_guid}/members"), &[])
            .await?;
        Ok(body.members)
    }

    pub async fn delete_member(
        &self,
        user_guid: &str,
        member_guid: &str,
    ) -> Result<(), ConnectorError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/users/{user_guid}/members/{member_guid}"),
            )
            .send()
            .await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }

    /// Requests a connect-widget URL in verification mode with
    /// transactions included.
    pub async fn request_widget_url(&self, user_guid: &str) -> Result<String, ConnectorError> {
        let body = json!({
            "widget_url": {
                "include_transactions": true,
                "is_mobile_webview": false,
                "mode": "verification",
                "ui_message_version": 4,
                "widget_type": "connect_widget",
            }
        });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/users/{user_guid}/widget_urls"),
            )
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json::<WidgetBody>().await?.widget_url.url)
    }

    pub async fn list_statements_by_member(
        &self,
        user_guid: &str,
        member_guid: &str,
    ) -> Result<Vec<MxStatement>, ConnectorError> {
        let body: StatementsBody = self
            .get_json(
                &format!("/users/{user_guid}/members/{member_guid}/statements"),
                &[],
            )
            .await?;
        Ok(body.statements)
    }

    pub async fn list_transactions(
        &self,
        user_guid: &str,
        page: u32,
        per_page: u32,
    ) -> Result<TransactionsBody, ConnectorError> {
        self.get_json(
            &format!("/users/{user_guid}/transactions"),
            &[
                ("page", page.to_string()),
                ("records_per_page", per_page.to_string()),
            ],
        )
        .await
    }
}

/// Maps one feed row into the engine's transaction record.
pub(crate) fn map_transaction(tx: MxTransaction) -> Result<BankTransaction, ConnectorError> {
    let date = NaiveDate::parse_from_str(&tx.date, "%Y-%m-%d")
        .map_err(|_| ConnectorError::Decode(format!("invalid transaction date: {}", tx.date)))?;
    Ok(BankTransaction {
        guid: tx.guid,
        transaction_id: tx.id,
        account_guid: tx.account_guid,
        member_guid: tx.member_guid,
        user_guid: tx.user_guid,
        date,
        amount: tx.amount,
        currency_code: tx.currency_code,
        description: tx.description.clone(),
        original_description: tx.original_description.unwrap_or(tx.description),
        category: tx.category.unwrap_or_default(),
        top_level_category: tx.top_level_category.unwrap_or_default(),
        is_income: tx.is_income,
        is_expense: tx.is_expense,
        status: tx.status.unwrap_or_default(),
        memo: tx.memo,
    })
}

#[async_trait]
impl TransactionSource for MxClient {
    async fn list_transactions(
        &self,
        mx_user_guid: &str,
        page: u32,
        per_page: u32,
    ) -> Result<TransactionPage, EngineError> {
        let body = MxClient::list_transactions(self, mx_user_guid, page, per_page)
            .await
            .map_err(|err| {
                tracing::error!("error occurred in request to MX transactions API: {err}");
                EngineError::Upstream("error fetching transactions from MX".to_string())
            })?;

        let transactions = body
            .transactions
            .into_iter()
            .map(map_transaction)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                tracing::error!("error occurred while decoding MX transactions: {err}");
                EngineError::Upstream("error fetching transactions from MX".to_string())
            })?;

        Ok(TransactionPage {
            transactions,
            pagination: Pagination {
                total_entries: body.pagination.total_entries,
                current_page: body.pagination.current_page,
                per_page: body.pagination.per_page,
                total_pages: body.pagination.total_pages,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_row() -> MxTransaction {
        MxTransaction {
            guid: "TRN-1".to_string(),
            id: "1".to_string(),
            account_guid: "ACT-1".to_string(),
            member_guid: "MBR-1".to_string(),
            user_guid: "USR-1".to_string(),
            date: "2025-03-14".to_string(),
            amount: 42.5,
            currency_code: "USD".to_string(),
            description: "Grocer".to_string(),
            original_description: None,
            category: Some("Groceries".to_string()),
            top_level_category: Some("Food".to_string()),
            is_income: false,
            is_expense: true,
            status: Some("POSTED".to_string()),
            memo: None,
        }
    }

    #[test]
    fn maps_feed_rows() {
        let tx = map_transaction(feed_row()).unwrap();
        assert_eq!(tx.guid, "TRN-1");
        assert_eq!(tx.date, "2025-03-14".parse().unwrap());
        // Missing original description falls back to the display one.
        assert_eq!(tx.original_description, "Grocer");
    }

    #[test]
    fn rejects_unparseable_dates() {
        let mut row = feed_row();
        row.date = "14/03/2025".to_string();
        assert!(map_transaction(row).is_err());
    }

    #[test]
    fn transactions_body_deserializes_platform_payload() {
        let body: TransactionsBody = serde_json::from_str(
            r#"{
                "transactions": [{
                    "guid": "TRN-1", "id": "1", "account_guid": "ACT-1",
                    "member_guid": "MBR-1", "user_guid": "USR-1",
                    "date": "2025-03-14", "amount": 42.5, "currency_code": "USD",
                    "description": "Grocer", "is_income": false, "is_expense": true
                }],
                "pagination": {
                    "total_entries": 1, "current_page": 1,
                    "per_page": 1000, "total_pages": 1
                }
            }"#,
        )
        .unwrap();
        assert_eq!(body.transactions.len(), 1);
        assert_eq!(body.pagination.total_entries, 1);
    }
}

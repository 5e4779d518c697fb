//! Bank aggregation endpoints.

use api_types::Envelope;
use api_types::bank::{
    ConnectWidgetResponse, DisconnectBank, MemberView, PaginationView, StatementView,
    TransactionListResponse, TransactionView, TransactionsQuery,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};

use engine::summary::BankTransaction;
use engine::{EngineError, TransactionSource, User};

use crate::{ServerError, ServerState, ok};

const DEFAULT_PER_PAGE: u32 = 25;

fn map_transaction(tx: BankTransaction) -> TransactionView {
    TransactionView {
        guid: tx.guid,
        date: tx.date.to_string(),
        amount: tx.amount,
        currency_code: tx.currency_code,
        description: tx.description,
        category: tx.category,
        top_level_category: tx.top_level_category,
        is_income: tx.is_income,
        is_expense: tx.is_expense,
        status: tx.status,
        memo: tx.memo,
    }
}

pub async fn connect(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<Envelope<ConnectWidgetResponse>>), ServerError> {
    let mx_user_guid = user.mx_user_guid()?;
    let url = state
        .mx
        .request_widget_url(mx_user_guid)
        .await
        .map_err(|err| {
            tracing::error!("error creating widget: {err}");
            EngineError::Upstream("error creating widget in MX".to_string())
        })?;

    Ok(ok(ConnectWidgetResponse { url }))
}

pub async fn current(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<Envelope<Vec<MemberView>>>), ServerError> {
    let mx_user_guid = user.mx_user_guid()?;
    let members = state.mx.list_members(mx_user_guid).await.map_err(|err| {
        tracing::error!("error fetching members: {err}");
        EngineError::Upstream("error fetching members from MX".to_string())
    })?;

    let members = members
        .into_iter()
        .map(|member| MemberView {
            guid: member.guid,
            institution_code: member.institution_code,
            name: member.name,
            connection_status: member.connection_status,
            last_successful_update: member.successfully_aggregated_at,
        })
        .collect();

    Ok(ok(members))
}

pub async fn disconnect(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<DisconnectBank>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    if payload.member_guid.trim().is_empty() {
        return Err(ServerError::field("member_guid is required", "member_guid"));
    }

    let mx_user_guid = user.mx_user_guid()?;
    state
        .mx
        .delete_member(mx_user_guid, &payload.member_guid)
        .await
        .map_err(|err| {
            tracing::error!("error disconnecting member: {err}");
            EngineError::Upstream("error disconnecting bank from MX".to_string())
        })?;

    Ok(crate::ok_message("Bank disconnected"))
}

pub async fn transactions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<(StatusCode, Json<Envelope<TransactionListResponse>>), ServerError> {
    let mx_user_guid = user.mx_user_guid()?;
    let page = TransactionSource::list_transactions(
        &state.mx,
        mx_user_guid,
        query.current_page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .await?;

    let cutoff = query
        .days
        .map(|days| (Utc::now() - Duration::days(days)).date_naive());
    let transactions = page
        .transactions
        .into_iter()
        .filter(|tx| cutoff.is_none_or(|cutoff| tx.date >= cutoff))
        .map(map_transaction)
        .collect();

    Ok(ok(TransactionListResponse {
        transactions,
        pagination: PaginationView {
            total_entries: page.pagination.total_entries,
            current_page: page.pagination.current_page,
            per_page: page.pagination.per_page,
            total_pages: page.pagination.total_pages,
        },
    }))
}

pub async fn statements(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(member_guid): Path<String>,
) -> Result<(StatusCode, Json<Envelope<Vec<StatementView>>>), ServerError> {
    let mx_user_guid = user.mx_user_guid()?;
    let statements = state
        .mx
        .list_statements_by_member(mx_user_guid, &member_guid)
        .await
        .map_err(|err| {
            tracing::error!("error fetching statements: {err}");
            EngineError::Upstream("error fetching statements from MX".to_string())
        })?;

    let statements = statements
        .into_iter()
        .map(|statement| StatementView {
            guid: statement.guid,
            member_guid: statement.member_guid,
            uri: statement.uri,
            created_at: statement.created_at,
        })
        .collect();

    Ok(ok(statements))
}

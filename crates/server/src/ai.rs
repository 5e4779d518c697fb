//! Assistant endpoints: realtime session creation, semantic transaction
//! queries, and visualization generation.

use api_types::Envelope;
use api_types::ai::{
    ChartKind, ChartOptionsView, ChartPointView, ChartView, QueryTransactions,
    QueryTransactionsResponse, VisualizeTransactions,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use engine::chart::{ChartSpec, ChartType};
use engine::{Embedder, User, VectorStore, prompt};

use crate::{ServerError, ServerState, ok};

/// Tool declarations for the realtime session (flat tool shape, unlike
/// chat completions).
fn realtime_tools() -> Vec<Value> {
    vec![json!({
        "type": "function",
        "name": "analyze_transactions",
        "description": "Analyze user transactions for insights",
        "parameters": {
            "type": "object",
            "properties": {
                "transactions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "amount": { "type": "number" },
                            "description": { "type": "string" },
                            "date": { "type": "string" },
                            "category": { "type": "string" },
                        }
                    }
                }
            }
        }
    })]
}

pub async fn create_session(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<Envelope<Value>>), ServerError> {
    let settings = state.engine.settings_for_user(user.id).await?;

    let mx_user_guid = user.mx_user_guid()?;
    let (_, summary) = state.insights.summary(mx_user_guid).await?;
    let instructions = prompt::session_instructions(&summary);

    let session = state
        .openai
        .create_realtime_session(&settings.voice, &instructions, realtime_tools())
        .await?;

    Ok(ok(session))
}

pub async fn query_transactions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<QueryTransactions>,
) -> Result<(StatusCode, Json<Envelope<QueryTransactionsResponse>>), ServerError> {
    if payload.query.trim().is_empty() {
        return Err(ServerError::field("query is required", "query"));
    }

    let mx_user_guid = user.mx_user_guid()?;
    let answer = state
        .semantic
        .query(user.id, mx_user_guid, &payload.query)
        .await?;

    Ok(ok(QueryTransactionsResponse {
        summary: answer.summary,
        score: answer.score,
    }))
}

pub async fn visualize_transactions(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<VisualizeTransactions>,
) -> Result<(StatusCode, Json<Envelope<ChartView>>), ServerError> {
    if payload.query.trim().is_empty() {
        return Err(ServerError::field("query is required", "query"));
    }

    let chart = generate_chart(&state, &user, &payload.query).await?;
    Ok(ok(map_chart(chart)))
}

fn chart_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type", "data", "options"],
        "additionalProperties": false,
        "properties": {
            "type": { "type": "string", "enum": ["bar", "line", "pie", "area", "scatter", "donut"] },
            "data": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["label", "value", "date"],
                    "additionalProperties": false,
                    "properties": {
                        "label": { "type": "string" },
                        "value": { "type": "number" },
                        "date": { "type": "string" }
                    }
                }
            },
            "options": {
                "type": "object",
                "required": ["title", "xAxis", "yAxis", "colors"],
                "additionalProperties": false,
                "properties": {
                    "title": { "type": "string" },
                    "xAxis": { "type": "string" },
                    "yAxis": { "type": "string" },
                    "colors": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    })
}

/// Embeds the query, pulls the matching summary context, and asks the
/// model for a chart spec, which is validated before use.
pub(crate) async fn generate_chart(
    state: &ServerState,
    user: &User,
    query: &str,
) -> Result<ChartSpec, ServerError> {
    let embedding = state.openai.embed(query).await?;
    let matches = state
        .pinecone
        .query(&embedding, 10, &user.id.to_string())
        .await?;

    let context = matches
        .iter()
        .filter_map(|m| m.metadata.get("summary"))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    let analysis_prompt = format!(
        "Based on the following user query and transaction data, determine the best \
         visualization parameters:\n\n\
         Query: \"{query}\"\n\n\
         Transaction Data:\n{context}\n\n\
         Choose the chart type (bar, line, pie, area, scatter, or donut), group the data to \
         match the query, give the chart a title and axis labels, and pick an array of color \
         hex codes appropriate for this visualization."
    );

    let value = state
        .openai
        .structured_completion(&analysis_prompt, "graph", chart_schema())
        .await?;

    Ok(ChartSpec::from_value(value)?)
}

pub(crate) fn map_chart(spec: ChartSpec) -> ChartView {
    ChartView {
        kind: match spec.kind {
            ChartType::Pie => ChartKind::Pie,
            ChartType::Donut => ChartKind::Donut,
            ChartType::Bar => ChartKind::Bar,
            ChartType::Line => ChartKind::Line,
            ChartType::Scatter => ChartKind::Scatter,
            ChartType::Area => ChartKind::Area,
        },
        data: spec
            .data
            .into_iter()
            .map(|point| ChartPointView {
                label: point.label,
                value: point.value,
                date: point.date,
            })
            .collect(),
        options: ChartOptionsView {
            title: spec.options.title,
            x_axis: spec.options.x_axis,
            y_axis: spec.options.y_axis,
            colors: spec.options.colors,
        },
    }
}

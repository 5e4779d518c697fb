//! Pinecone data-plane client.
//!
//! One index, one vector per user; queries filter on the record id so a
//! user can only ever match their own summary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};

use engine::{EngineError, VectorMatch, VectorRecord, VectorStore};

use crate::ConnectorError;

#[derive(Clone, Debug)]
pub struct PineconeClient {
    client: Client,
    index_host: String,
    api_key: String,
}

impl PineconeClient {
    pub fn new(client: Client, index_host: String, api_key: String) -> Self {
        Self {
            client,
            index_host,
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.index_host.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ConnectorError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api { status, message });
        }
        Ok(response.json().await?)
    }
}

fn metadata_to_value(metadata: &BTreeMap<String, String>) -> Value {
    let map: Map<String, Value> = metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

fn metadata_from_value(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, EngineError> {
        let response = self
            .client
            .get(self.url("/vectors/fetch"))
            .header("Api-Key", &self.api_key)
            .query(&ids.iter().map(|id| ("ids", id.as_str())).collect::<Vec<_>>())
            .send()
            .await
            .map_err(ConnectorError::from)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api { status, message }.into());
        }

        let payload: Value = response.json().await.map_err(ConnectorError::from)?;
        let vectors = payload["vectors"].as_object().cloned().unwrap_or_default();
        let records = vectors
            .into_iter()
            .map(|(id, record)| VectorRecord {
                id,
                values: record["values"]
                    .as_array()
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect()
                    })
                    .unwrap_or_default(),
                metadata: metadata_from_value(&record["metadata"]),
            })
            .collect();
        Ok(records)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), EngineError> {
        let vectors: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.values,
                    "metadata": metadata_to_value(&record.metadata),
                })
            })
            .collect();

        self.post("/vectors/upsert", &json!({ "vectors": vectors }))
            .await
            .map_err(|err| {
                tracing::error!("vector upsert failed: {err}");
                EngineError::from(err)
            })?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: u32,
        user_id: &str,
    ) -> Result<Vec<VectorMatch>, EngineError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "filter": { "id": { "$eq": user_id } },
            "includeMetadata": true,
        });

        let payload = self.post("/query", &body).await.map_err(|err| {
            tracing::error!("vector query failed: {err}");
            EngineError::from(err)
        })?;

        let matches = payload["matches"]
            .as_array()
            .map(|matches| {
                matches
                    .iter()
                    .map(|m| VectorMatch {
                        id: m["id"].as_str().unwrap_or_default().to_string(),
                        score: m["score"].as_f64().unwrap_or_default() as f32,
                        metadata: metadata_from_value(&m["metadata"]),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_through_json() {
        let mut metadata = BTreeMap::new();
        metadata.insert("summary".to_string(), "# Financial Summary".to_string());

        let value = metadata_to_value(&metadata);
        assert_eq!(metadata_from_value(&value), metadata);
    }

    #[test]
    fn non_string_metadata_values_are_rendered() {
        let value = json!({ "score": 3, "nested": { "a": 1 } });
        let metadata = metadata_from_value(&value);
        assert_eq!(metadata["score"], "3");
        assert_eq!(metadata["nested"], "{\"a\":1}");
    }
}

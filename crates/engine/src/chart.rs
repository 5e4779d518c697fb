//! Chart specifications returned by the visualization tool.
//!
//! Model output is untrusted: payloads are validated here before they
//! are forwarded to the caller.

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Pie,
    Donut,
    Bar,
    Line,
    Scatter,
    Area,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub title: String,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartType,
    pub data: Vec<ChartPoint>,
    pub options: ChartOptions,
}

impl ChartSpec {
    /// Parses and validates a model-produced payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        let spec: ChartSpec = serde_json::from_value(value)
            .map_err(|err| EngineError::Validation(format!("malformed chart payload: {err}")))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.data.is_empty() {
            return Err(EngineError::Validation(
                "chart data must not be empty".to_string(),
            ));
        }
        if self.options.title.trim().is_empty() {
            return Err(EngineError::Validation(
                "chart title is required".to_string(),
            ));
        }
        for point in &self.data {
            if point.label.trim().is_empty() {
                return Err(EngineError::Validation(
                    "chart data labels must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_well_formed_pie_chart() {
        let spec = ChartSpec::from_value(json!({
            "type": "pie",
            "data": [
                {"label": "Food", "value": 320.5},
                {"label": "Housing", "value": 1200.0, "date": "2025-01-01"}
            ],
            "options": {"title": "Spending by category", "colors": ["#336699"]}
        }))
        .unwrap();

        assert_eq!(spec.kind, ChartType::Pie);
        assert_eq!(spec.data.len(), 2);
    }

    #[test]
    fn rejects_unknown_chart_types() {
        let err = ChartSpec::from_value(json!({
            "type": "sankey",
            "data": [{"label": "Food", "value": 1.0}],
            "options": {"title": "t"}
        }))
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn rejects_empty_data() {
        let err = ChartSpec::from_value(json!({
            "type": "bar",
            "data": [],
            "options": {"title": "t"}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("chart data must not be empty".to_string())
        );
    }

    #[test]
    fn rejects_missing_title() {
        let err = ChartSpec::from_value(json!({
            "type": "line",
            "data": [{"label": "Food", "value": 1.0}],
            "options": {"title": "  "}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("chart title is required".to_string())
        );
    }
}

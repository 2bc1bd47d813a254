use serde::{Deserialize, Serialize};

use crate::chart::{ChartType, ColorScheme};

pub const REFUSAL_OUT_OF_SCOPE: &str =
    "I can only help you create bar or line charts. Please ask me to make a chart with some data!";
pub const REFUSAL_NO_PREVIOUS_STYLE: &str =
    "I couldn't find previous chart data to apply the new style to. Please provide the data again.";
pub const REFUSAL_NO_PREVIOUS_DATA: &str =
    "I couldn't find previous chart data. Please provide the data points.";
pub const REFUSAL_NO_DATA: &str =
    "I couldn't find any data to chart. Please provide data in format like: A=10, B=20, C=30";

/// The outcome of interpreting one chat message.
///
/// Built fresh per request and never mutated afterwards. Field names match
/// the JSON contract shared with model-backed interpreters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartRequestDecision {
    pub is_valid: bool,
    #[serde(default, alias = "reason")]
    pub refusal_reason: Option<String>,
    #[serde(default)]
    pub chart_type: Option<ChartType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "x_label")]
    pub x_axis_label: Option<String>,
    #[serde(default, alias = "y_label")]
    pub y_axis_label: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub x_labels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub y_values: Vec<f64>,
    #[serde(default)]
    pub color_scheme: Option<ColorScheme>,
}

/// Labelled numeric series, index-aligned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub x_labels: Vec<String>,
    pub y_values: Vec<f64>,
}

impl ChartSeries {
    /// `None` when the two sides differ in length.
    pub fn new(x_labels: Vec<String>, y_values: Vec<f64>) -> Option<Self> {
        (x_labels.len() == y_values.len()).then_some(Self { x_labels, y_values })
    }

    pub fn len(&self) -> usize {
        self.x_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_labels.is_empty()
    }
}

impl ChartRequestDecision {
    pub fn refuse(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            refusal_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn accept(
        series: ChartSeries,
        chart_type: ChartType,
        title: impl Into<String>,
        axis_labels: (&str, &str),
        color_scheme: Option<ColorScheme>,
    ) -> Self {
        Self {
            is_valid: true,
            refusal_reason: None,
            chart_type: Some(chart_type),
            title: Some(title.into()),
            x_axis_label: Some(axis_labels.0.to_string()),
            y_axis_label: Some(axis_labels.1.to_string()),
            x_labels: series.x_labels,
            y_values: series.y_values,
            color_scheme,
        }
    }

    /// The data carried by this decision, if both sides are present and aligned.
    pub fn series(&self) -> Option<ChartSeries> {
        if self.x_labels.is_empty() || self.y_values.is_empty() {
            return None;
        }
        ChartSeries::new(self.x_labels.clone(), self.y_values.clone())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_rejects_misaligned_lengths() {
        assert!(ChartSeries::new(vec!["A".into()], vec![1.0, 2.0]).is_none());
        assert_eq!(ChartSeries::new(vec!["A".into()], vec![1.0]).unwrap().len(), 1);
    }

    #[test]
    fn test_refusal_has_no_payload() {
        let decision = ChartRequestDecision::refuse(REFUSAL_NO_DATA);
        assert!(!decision.is_valid);
        assert_eq!(decision.refusal_reason.as_deref(), Some(REFUSAL_NO_DATA));
        assert!(decision.chart_type.is_none());
        assert!(decision.series().is_none());
    }

    #[test]
    fn test_parses_model_json_with_nulls_and_aliases() {
        let raw = r#"{
            "is_valid": true,
            "reason": null,
            "chart_type": "line",
            "title": "Sales",
            "x_label": "Month",
            "y_label": "EUR",
            "x_labels": ["Jan", "Feb"],
            "y_values": [1, 2.5],
            "color_scheme": null
        }"#;
        let decision: ChartRequestDecision = serde_json::from_str(raw).unwrap();
        assert_eq!(decision.chart_type, Some(ChartType::Line));
        assert_eq!(decision.x_axis_label.as_deref(), Some("Month"));
        assert_eq!(decision.y_values, vec![1.0, 2.5]);
        assert_eq!(decision.color_scheme, None);

        let refusal: ChartRequestDecision =
            serde_json::from_str(r#"{"is_valid": false, "reason": "no", "x_labels": null}"#).unwrap();
        assert!(refusal.x_labels.is_empty());
        assert_eq!(refusal.refusal_reason.as_deref(), Some("no"));
    }
}

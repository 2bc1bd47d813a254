use tracing::debug;

use crate::decision::ChartSeries;
use crate::patterns::KEY_VALUE;

/// Fewer pairs than this is not worth charting.
pub const MIN_DATA_POINTS: usize = 2;

/// Why a message did not yield a chartable series.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionFailure {
    TooFewPairs(usize),
    /// A matched value that is not a finite float. Fails the whole message.
    MalformedNumber { label: String, token: String },
}

/// Pull ordered `label=value` pairs out of free text.
///
/// Labels are trimmed and kept in source order; duplicates pass through.
pub fn try_extract(text: &str) -> Result<ChartSeries, ExtractionFailure> {
    let mut x_labels = Vec::new();
    let mut y_values = Vec::new();

    for caps in KEY_VALUE.captures_iter(text) {
        let label = caps[1].trim();
        let token = &caps[2];
        let value = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ExtractionFailure::MalformedNumber {
                label: label.to_string(),
                token: token.to_string(),
            })?;
        x_labels.push(label.to_string());
        y_values.push(value);
    }

    if x_labels.len() < MIN_DATA_POINTS {
        return Err(ExtractionFailure::TooFewPairs(x_labels.len()));
    }

    ChartSeries::new(x_labels, y_values).ok_or(ExtractionFailure::TooFewPairs(0))
}

pub fn extract(text: &str) -> Option<ChartSeries> {
    match try_extract(text) {
        Ok(series) => Some(series),
        Err(failure) => {
            debug!(?failure, "no chart data in message");
            None
        }
    }
}

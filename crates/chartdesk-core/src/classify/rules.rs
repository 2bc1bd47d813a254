use tracing::{debug, info};

use super::chart_type::{classify_chart_type, synthesize_title};
use super::color::classify_color_scheme;
use super::conversation::{find_previous_chart_data, has_back_reference, is_style_change_request};
use super::extract::extract;
use crate::decision::{
    ChartRequestDecision, ChartSeries, REFUSAL_NO_DATA, REFUSAL_NO_PREVIOUS_DATA,
    REFUSAL_NO_PREVIOUS_STYLE, REFUSAL_OUT_OF_SCOPE,
};
use crate::patterns::REFUSAL_KEYWORDS;
use crate::state::ConversationTurn;

/// Interpret `message` against `history` without any model.
///
/// Pure and total: every input ends in a decision, never an error.
pub fn classify(message: &str, history: &[ConversationTurn]) -> ChartRequestDecision {
    let lowered = message.to_lowercase();

    if let Some(keyword) = REFUSAL_KEYWORDS.find(&lowered) {
        info!(keyword, "refusing out-of-scope request");
        return ChartRequestDecision::refuse(REFUSAL_OUT_OF_SCOPE);
    }

    if is_style_change_request(message) {
        return match find_previous_chart_data(history) {
            Some(series) => {
                debug!(points = series.len(), "restyling previous chart data");
                build_decision(message, series)
            }
            None => ChartRequestDecision::refuse(REFUSAL_NO_PREVIOUS_STYLE),
        };
    }

    let series = match extract(message) {
        Some(series) => series,
        None if has_back_reference(message) => match find_previous_chart_data(history) {
            Some(series) => {
                debug!(points = series.len(), "reusing previous chart data");
                series
            }
            None => return ChartRequestDecision::refuse(REFUSAL_NO_PREVIOUS_DATA),
        },
        None => return ChartRequestDecision::refuse(REFUSAL_NO_DATA),
    };

    build_decision(message, series)
}

/// Chart type and scheme always come from the current message, even when the
/// data was recovered from an earlier turn.
fn build_decision(message: &str, series: ChartSeries) -> ChartRequestDecision {
    let chart_type = classify_chart_type(message, &series.x_labels);
    let color_scheme = classify_color_scheme(message);
    let title = synthesize_title(chart_type, &series.x_labels);

    ChartRequestDecision::accept(
        series,
        chart_type,
        title,
        chart_type.default_axis_labels(),
        color_scheme,
    )
}

use tracing::debug;

use super::extract::extract;
use crate::decision::ChartSeries;
use crate::patterns::{self, BACK_REFERENCE_CUES, STYLE_CHANGE_KEYWORDS};
use crate::state::{ConversationTurn, TurnRole};

/// Most recent chart data in `history`.
///
/// Assistant turns carrying chart metadata are preferred; failing that, the
/// newest user turn whose text still parses as key=value data is used.
pub fn find_previous_chart_data(history: &[ConversationTurn]) -> Option<ChartSeries> {
    let from_assistant = history
        .iter()
        .rev()
        .filter(|turn| turn.role == TurnRole::Assistant)
        .find_map(|turn| {
            let (labels, values) = turn.chart_data()?;
            ChartSeries::new(labels.to_vec(), values.to_vec())
        });
    if from_assistant.is_some() {
        debug!("previous chart data found in assistant metadata");
        return from_assistant;
    }

    let from_user = history
        .iter()
        .rev()
        .filter(|turn| turn.role == TurnRole::User)
        .find_map(|turn| extract(&turn.content));
    if from_user.is_some() {
        debug!("previous chart data re-extracted from a user turn");
    }
    from_user
}

/// A request to restyle earlier data: it names a style and a brand but
/// carries no data of its own.
pub fn is_style_change_request(message: &str) -> bool {
    let lowered = message.to_lowercase();
    STYLE_CHANGE_KEYWORDS.is_match(&lowered)
        && patterns::has_brand_keyword(&lowered)
        && extract(message).is_none()
}

/// "the same data", "previous numbers", ...
pub fn has_back_reference(message: &str) -> bool {
    BACK_REFERENCE_CUES.is_match(&message.to_lowercase())
}

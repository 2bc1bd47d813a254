use crate::chart::ChartType;
use crate::patterns::{self, first_match, CHART_TYPE_RULES, QUARTER_LABEL, TIME_INDICATORS, YEAR_LABEL};

/// At or above this many points a line reads better than bars.
pub const LINE_CHART_MIN_POINTS: usize = 10;

/// Pick bar or line for `message` over `x_labels`.
///
/// An explicit request in the message always wins; only then does the shape
/// of the labels decide.
pub fn classify_chart_type(message: &str, x_labels: &[String]) -> ChartType {
    if let Some(explicit) = explicit_chart_type(message) {
        return explicit;
    }
    if is_time_series(x_labels) {
        return ChartType::Line;
    }
    if x_labels.len() >= LINE_CHART_MIN_POINTS {
        return ChartType::Line;
    }
    ChartType::Bar
}

pub fn explicit_chart_type(message: &str) -> Option<ChartType> {
    first_match(&CHART_TYPE_RULES, message)
}

pub fn is_time_series(labels: &[String]) -> bool {
    if labels.is_empty() {
        return false;
    }

    let combined = labels.join(" ").to_lowercase();
    if patterns::matches_any(&TIME_INDICATORS, &combined) {
        return true;
    }

    labels.iter().all(|l| QUARTER_LABEL.is_match(l.trim()))
        || labels.iter().all(|l| YEAR_LABEL.is_match(l.trim()))
}

/// Title used when none was supplied with the data.
pub fn synthesize_title(chart_type: ChartType, x_labels: &[String]) -> String {
    if is_time_series(x_labels) {
        format!("{} Chart Over Time", chart_type.display_name())
    } else {
        format!("{} Chart Comparison", chart_type.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_bar_beats_time_series() {
        let quarters = labels(&["Q1", "Q2", "Q3", "Q4"]);
        assert_eq!(classify_chart_type("Create a bar chart", &quarters), ChartType::Bar);
        assert_eq!(classify_chart_type("I need a bar graph", &quarters), ChartType::Bar);
    }

    #[test]
    fn test_explicit_line_beats_categories() {
        let fruit = labels(&["Apple", "Banana", "Orange"]);
        assert_eq!(classify_chart_type("Make a line chart", &fruit), ChartType::Line);
        assert_eq!(classify_chart_type("show the trend", &fruit), ChartType::Line);
    }

    #[test]
    fn test_bar_checked_before_line() {
        let fruit = labels(&["Apple", "Banana"]);
        assert_eq!(classify_chart_type("bar chart, not a line chart", &fruit), ChartType::Bar);
    }

    #[test]
    fn test_time_labels_default_to_line() {
        assert_eq!(classify_chart_type("Chart this", &labels(&["Jan", "Feb", "Mar"])), ChartType::Line);
        assert_eq!(classify_chart_type("Chart this", &labels(&["2020", "2021"])), ChartType::Line);
        assert_eq!(
            classify_chart_type("Chart this", &labels(&["Monday", "Tuesday"])),
            ChartType::Line
        );
    }

    #[test]
    fn test_many_points_default_to_line() {
        let many: Vec<String> = ('A'..='J').map(|c| c.to_string()).collect();
        assert_eq!(classify_chart_type("Chart this", &many), ChartType::Line);
        assert_eq!(classify_chart_type("Chart this", &many[..9]), ChartType::Bar);
    }

    #[test]
    fn test_categories_default_to_bar() {
        let products = labels(&["ProductA", "ProductB", "ProductC"]);
        assert_eq!(classify_chart_type("Compare products", &products), ChartType::Bar);
    }

    #[test]
    fn test_online_is_not_a_line_request() {
        let media = labels(&["Print", "Online", "TV"]);
        assert_eq!(classify_chart_type("media coverage: Online=450", &media), ChartType::Bar);
    }

    #[test]
    fn test_is_time_series_whole_label_rules() {
        assert!(is_time_series(&labels(&["q1", " Q2 "])));
        assert!(is_time_series(&labels(&["1999", "2000"])));
        assert!(!is_time_series(&labels(&["Dogs", "Cats"])));
        assert!(!is_time_series(&[]));
    }

    #[test]
    fn test_synthesized_titles() {
        assert_eq!(
            synthesize_title(ChartType::Line, &labels(&["Jan", "Feb"])),
            "Line Chart Over Time"
        );
        assert_eq!(
            synthesize_title(ChartType::Bar, &labels(&["Dogs", "Cats"])),
            "Bar Chart Comparison"
        );
    }
}

//! Keyword and regex tables used by the rule-based interpreter.
//!
//! Every table is compiled once on first use and is read-only afterwards, so
//! the classifiers can run from any number of threads without locking.
//! Keyword sets match whole words or whole phrases, case-insensitively: "line"
//! matches "a line chart" but not "online" or "baseline". Noun tables also
//! accept a plural ending, so "trends" and "markets" still count.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chart::{ChartType, ColorScheme};

const PLURAL_SUFFIX: &str = "(?:es|s)?";

/// A list of keywords compiled into a single case-insensitive matcher.
pub struct KeywordSet {
    matcher: Regex,
}

impl KeywordSet {
    /// Matches the keywords exactly as listed.
    pub fn new(keywords: &[&str]) -> Self {
        Self::compile(keywords, "")
    }

    /// Matches the keywords and their plurals ("bar charts", "profits").
    pub fn nouns(keywords: &[&str]) -> Self {
        Self::compile(keywords, PLURAL_SUFFIX)
    }

    fn compile(keywords: &[&str], suffix: &str) -> Self {
        let mut ordered: Vec<&str> = keywords.to_vec();
        // Longest first so "bar chart" is reported instead of "bar".
        ordered.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = ordered
            .iter()
            .map(|k| regex::escape(k).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!(r"(?i)\b(?:{}){}\b", alternation, suffix))
            .unwrap_or_else(|e| panic!("invalid keyword table {:?}: {}", keywords, e));

        Self { matcher }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// The first keyword occurrence in `text`, as written in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.matcher.find(text).map(|m| m.as_str())
    }
}

/// A tagged rule: when `when` matches, the outcome is `then`.
pub struct Rule<T: 'static> {
    pub when: &'static Lazy<KeywordSet>,
    pub then: T,
}

/// Evaluate `rules` in order and return the outcome of the first match.
pub fn first_match<T: Copy>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules
        .iter()
        .find(|rule| rule.when.is_match(text))
        .map(|rule| rule.then)
}

/// `<label>=<number>` or `<label>:<number>`.
pub static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9\s\-/]+)\s*[=:]\s*([0-9]+\.?[0-9]*)").expect("key=value pattern")
});

pub static TIME_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)\b",
        r"\b(january|february|march|april|june|july|august|september|october|november|december)\b",
        r"\b(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)\b",
        r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
        r"\bq[1-4]\b",
        r"\b(19|20)\d{2}\b",
        r"\b(years?|months?|quarters?|weeks?|days?|hours?|minutes?)\b",
        r"\b(trend|timeline|historical|forecast|growth)\b",
        r"\bover\s+time\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("time indicator pattern"))
    .collect()
});

pub static CATEGORY_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(products?|categor(y|ies)|regions?|departments?|countr(y|ies)|cit(y|ies)|teams?|compan(y|ies))\b",
        r"\b(compar\w*|versus|vs|breakdown|distribution)\b",
        r"\bby\s+category\b",
        r"\b(top|rank\w*|best|worst)\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("category indicator pattern"))
    .collect()
});

pub static QUARTER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^q[1-4]$").expect("quarter label"));
pub static YEAR_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(20|19)\d{2}$").expect("year label"));

pub static EXPLICIT_BAR: Lazy<KeywordSet> =
    Lazy::new(|| KeywordSet::nouns(&["bar chart", "bar graph", "bar"]));
pub static EXPLICIT_LINE: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::nouns(&["line chart", "line graph", "line", "trend", "over time", "timeline"])
});

pub static FD_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::nouns(&[
        "fd",
        "teal",
        "financial",
        "market",
        "investment",
        "economy",
        "business",
        "corporate",
        "revenue",
        "profit",
        "financieele dagblad",
    ])
});

pub static BNR_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::nouns(&[
        "bnr",
        "yellow",
        "news",
        "radio",
        "broadcast",
        "media",
        "social",
        "entertainment",
        "lifestyle",
        "news radio",
        "broadcasting",
    ])
});

pub static REFUSAL_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::nouns(&[
        "weather",
        "essay",
        "joke",
        "homework",
        "write",
        "story",
        "code",
        "program",
        "calculate",
        "what is",
        "help me with",
        "pie chart",
        "scatter plot",
        "scatter chart",
        "histogram",
        "donut chart",
        "doughnut chart",
        "area chart",
        "radar chart",
        "bubble chart",
        "heatmap",
        "heat map",
        "treemap",
        "box plot",
        "gantt chart",
    ])
});

pub static STYLE_CHANGE_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new(&["change color", "change style", "use", "colors", "style", "make it"])
});

pub static BACK_REFERENCE_CUES: Lazy<KeywordSet> =
    Lazy::new(|| KeywordSet::new(&["previous", "same", "earlier", "last", "that"]));

/// Explicit chart requests; bar is checked before line.
pub static CHART_TYPE_RULES: [Rule<ChartType>; 2] = [
    Rule { when: &EXPLICIT_BAR, then: ChartType::Bar },
    Rule { when: &EXPLICIT_LINE, then: ChartType::Line },
];

/// Brand keywords; BNR is checked before FD.
pub static COLOR_SCHEME_RULES: [Rule<ColorScheme>; 2] = [
    Rule { when: &BNR_KEYWORDS, then: ColorScheme::Bnr },
    Rule { when: &FD_KEYWORDS, then: ColorScheme::Fd },
];

pub fn has_brand_keyword(text: &str) -> bool {
    BNR_KEYWORDS.is_match(text) || FD_KEYWORDS.is_match(text)
}

pub fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

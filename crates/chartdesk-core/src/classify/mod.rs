//! Chat message interpretation.
//!
//! `rules::classify` is the deterministic engine; `strategy` lets a
//! model-backed interpreter sit in front of it with the rules as fallback.

pub mod chart_type;
pub mod color;
pub mod conversation;
pub mod extract;
pub mod rules;
pub mod strategy;

pub use chart_type::{classify_chart_type, is_time_series};
pub use color::classify_color_scheme;
pub use conversation::{find_previous_chart_data, is_style_change_request};
pub use extract::extract;
pub use rules::classify;
pub use strategy::{ChartInterpreter, RuleBasedInterpreter, WithFallback};

pub mod chart;
pub mod classify;
pub mod config;
pub mod decision;
pub mod error;
pub mod patterns;
pub mod render;
pub mod service;
pub mod session;
pub mod spreadsheet;
pub mod state;

// Re-export main types for convenience
pub use chart::{ChartType, ColorScheme, Palette};
pub use classify::{classify, ChartInterpreter, RuleBasedInterpreter, WithFallback};
pub use config::Config;
pub use decision::{ChartRequestDecision, ChartSeries};
pub use error::{ChartError, ChartResult, StoreError, UpstreamError};
pub use render::{smart_sample, ChartFormat, ChartRenderer, ChartSpec, RenderedChart};
pub use service::{ChartService, ChatReply};
pub use session::{JsonFileStore, MemoryStore, SessionLocks, SessionRecord, SessionStore};
pub use spreadsheet::{suggest_chart_type, Table};
pub use state::{ChartMetadata, ConversationTurn, TurnMetadata, TurnRole};

//! Request pipeline: session bookkeeping, interpretation, rendering.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chart::{ChartType, ColorScheme};
use crate::classify::chart_type::LINE_CHART_MIN_POINTS;
use crate::classify::{ChartInterpreter, RuleBasedInterpreter, WithFallback};
use crate::config::Config;
use crate::decision::{ChartRequestDecision, REFUSAL_OUT_OF_SCOPE};
use crate::error::{ChartError, ChartResult};
use crate::render::{ChartRenderer, ChartSpec};
use crate::session::{SessionLocks, SessionRecord, SessionStore};
use crate::spreadsheet::{self, Table};
use crate::state::{recent_turns, ChartMetadata, ConversationTurn, TurnMetadata, TurnRole};

pub const CLARIFICATION: &str = "I understood you want a chart, but I need more information about the data. Could you provide the specific values you want to chart?";
pub const UPLOAD_NOT_CHARTABLE: &str = "I couldn't automatically determine how to chart this data. The spreadsheet should have clear columns with labels and numeric values.";

pub const SOURCE_CHAT: &str = "chat";
pub const SOURCE_SPREADSHEET_AUTO: &str = "spreadsheet_auto_detect";
pub const SOURCE_SPREADSHEET_INTERPRET: &str = "spreadsheet_interpret";

/// What the user sees after a chat message or upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub chart_id: Option<String>,
    pub chart_path: Option<PathBuf>,
    pub color_scheme: Option<ColorScheme>,
}

impl ChatReply {
    fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            chart_id: None,
            chart_path: None,
            color_scheme: None,
        }
    }

    pub fn has_chart(&self) -> bool {
        self.chart_id.is_some()
    }
}

/// Chart type for a decision that came back without one.
fn default_chart_type(points: usize) -> ChartType {
    if points >= LINE_CHART_MIN_POINTS {
        ChartType::Line
    } else {
        ChartType::Bar
    }
}

pub struct ChartService<I, S> {
    interpreter: WithFallback<I>,
    store: S,
    renderer: ChartRenderer,
    locks: SessionLocks,
    history_window: usize,
    default_style: ColorScheme,
}

impl<S: SessionStore> ChartService<RuleBasedInterpreter, S> {
    pub fn rules_only(store: S, config: &Config) -> Self {
        Self::with_interpreter(WithFallback::rules_only(), store, config)
    }
}

impl<I: ChartInterpreter, S: SessionStore> ChartService<I, S> {
    /// `primary` answers first; the rules take over whenever it fails.
    pub fn new(primary: I, store: S, config: &Config) -> Self {
        Self::with_interpreter(WithFallback::new(primary), store, config)
    }

    fn with_interpreter(interpreter: WithFallback<I>, store: S, config: &Config) -> Self {
        Self {
            interpreter,
            store,
            renderer: ChartRenderer::new(
                config.charts_dir(),
                config.max_points,
                config.keep_latest_only,
            ),
            locks: SessionLocks::new(),
            history_window: config.history_window,
            default_style: config.default_style,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn renderer(&self) -> &ChartRenderer {
        &self.renderer
    }

    /// Stored style of an existing session.
    fn stored_style(&self, session_id: &str) -> ChartResult<Option<ColorScheme>> {
        Ok(self.store.get(session_id)?.map(|record| record.style))
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> ChartResult<ChatReply> {
        let _guard = self.locks.acquire(session_id).await?;

        self.store.update_last_used(session_id)?;
        let session_style = self
            .stored_style(session_id)?
            .unwrap_or(self.default_style);
        let history = self.store.history(session_id)?;
        self.store
            .append(session_id, ConversationTurn::user(message))?;

        let context = recent_turns(&history, self.history_window);
        let decision = self.interpreter.decide(message, context).await;
        debug!(
            session_id,
            is_valid = decision.is_valid,
            chart_type = ?decision.chart_type,
            points = decision.x_labels.len(),
            "interpreted chat message"
        );

        if !decision.is_valid {
            let text = decision
                .refusal_reason
                .clone()
                .unwrap_or_else(|| REFUSAL_OUT_OF_SCOPE.to_string());
            return self.reply_text(session_id, text);
        }

        let Some(spec) = self.spec_for(&decision) else {
            info!(session_id, "valid request without usable data, asking for values");
            return self.reply_text(session_id, CLARIFICATION);
        };

        let style = match decision.color_scheme {
            Some(scheme) => {
                self.store.set_last_color_scheme(scheme)?;
                scheme
            }
            None => session_style,
        };

        let response = format!("I've created a {} chart for you!", spec.chart_type.as_str());
        self.render_and_record(session_id, spec, style, SOURCE_CHAT, response)
            .await
    }

    /// Chart an uploaded spreadsheet. Extension and size are checked before
    /// anything is recorded.
    pub async fn upload(&self, session_id: &str, filename: &str, bytes: &[u8]) -> ChartResult<ChatReply> {
        let file_size = bytes.len() as u64;
        spreadsheet::check_upload(filename, file_size)?;
        info!(session_id, filename, file_size, "received spreadsheet upload");

        let _guard = self.locks.acquire(session_id).await?;

        let session_style = self.stored_style(session_id)?;
        self.store.append(
            session_id,
            ConversationTurn::new(
                TurnRole::User,
                format!("Uploaded spreadsheet: {}", filename),
                Some(TurnMetadata::FileUpload {
                    filename: filename.to_string(),
                    file_size,
                }),
            ),
        )?;

        let table = match Table::parse(bytes) {
            Ok(table) => table,
            Err(e) => {
                warn!(filename, error = %e, "failed to parse spreadsheet");
                return self.reply_text(session_id, format!("Error reading spreadsheet: {}", e));
            }
        };

        if let Some(detected) = table.auto_detect(filename) {
            info!(chart_type = detected.chart_type.as_str(), "auto-detected spreadsheet chart");
            let style = match session_style {
                Some(style) => style,
                None => self.store.last_color_scheme()?.unwrap_or(self.default_style),
            };
            let spec = ChartSpec {
                chart_type: detected.chart_type,
                title: format!("Chart from {}", filename),
                x_label: Some(detected.x_label),
                y_label: Some(detected.y_label),
                x_labels: detected.x_labels,
                y_values: detected.y_values,
            };
            return self
                .render_and_record(
                    session_id,
                    spec,
                    style,
                    SOURCE_SPREADSHEET_AUTO,
                    "I've created a chart from your spreadsheet!".to_string(),
                )
                .await;
        }

        info!("auto-detection failed, interpreting spreadsheet as text");
        let history = self.store.history(session_id)?;
        let prompt = format!("Create a chart from this spreadsheet data:\n{}", table.to_text());
        let decision = self
            .interpreter
            .decide(&prompt, recent_turns(&history, self.history_window))
            .await;

        let Some(mut spec) = self.spec_for(&decision) else {
            return self.reply_text(session_id, UPLOAD_NOT_CHARTABLE);
        };
        if decision.title.is_none() {
            spec.title = format!("Chart from {}", filename);
        }

        if let Some(scheme) = decision.color_scheme {
            self.store.set_last_color_scheme(scheme)?;
        }
        let style = match decision.color_scheme.or(session_style) {
            Some(style) => style,
            None => self.store.last_color_scheme()?.unwrap_or(self.default_style),
        };

        let response = format!(
            "I've created a {} chart from your spreadsheet!",
            spec.chart_type.as_str()
        );
        self.render_and_record(session_id, spec, style, SOURCE_SPREADSHEET_INTERPRET, response)
            .await
    }

    /// Style of the session, or the configured default for unknown sessions.
    pub async fn style(&self, session_id: &str) -> ChartResult<ColorScheme> {
        Ok(self
            .stored_style(session_id)?
            .unwrap_or(self.default_style))
    }

    pub async fn set_style(&self, session_id: &str, scheme: ColorScheme) -> ChartResult<SessionRecord> {
        let _guard = self.locks.acquire(session_id).await?;
        let record = self.store.set_style(session_id, scheme)?;
        info!(session_id, style = scheme.as_str(), "updated session style");
        Ok(record)
    }

    pub async fn history(&self, session_id: &str) -> ChartResult<Vec<ConversationTurn>> {
        Ok(self.store.history(session_id)?)
    }

    pub async fn clear_history(&self, session_id: &str) -> ChartResult<()> {
        let _guard = self.locks.acquire(session_id).await?;
        self.store.clear_history(session_id)?;
        info!(session_id, "cleared chat history");
        Ok(())
    }

    /// Returns whether the session existed.
    pub async fn delete_session(&self, session_id: &str) -> ChartResult<bool> {
        let removed = {
            let _guard = self.locks.acquire(session_id).await?;
            self.store.delete(session_id)?
        };
        self.locks.forget(session_id)?;
        info!(session_id, removed, "deleted session");
        Ok(removed)
    }

    pub fn chart_path(&self, chart_id: &str, format: &str) -> ChartResult<PathBuf> {
        self.renderer.chart_path(chart_id, format)
    }

    fn spec_for(&self, decision: &ChartRequestDecision) -> Option<ChartSpec> {
        ChartSpec::from_decision(decision, default_chart_type(decision.x_labels.len()))
    }

    fn reply_text(&self, session_id: &str, text: impl Into<String>) -> ChartResult<ChatReply> {
        let text = text.into();
        self.store
            .append(session_id, ConversationTurn::assistant(text.clone()))?;
        Ok(ChatReply::text(text))
    }

    async fn render_and_record(
        &self,
        session_id: &str,
        spec: ChartSpec,
        style: ColorScheme,
        source: &str,
        response: String,
    ) -> ChartResult<ChatReply> {
        let renderer = self.renderer.clone();
        let job = spec.clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&job, style))
            .await
            .map_err(|e| ChartError::Render(format!("render task failed: {}", e)))?;

        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(session_id, error = %e, "chart generation failed");
                return self.reply_text(
                    session_id,
                    format!(
                        "I understood your request, but encountered an error generating the chart: {}",
                        e
                    ),
                );
            }
        };

        let metadata = TurnMetadata::Chart(ChartMetadata {
            chart_id: rendered.chart_id.clone(),
            chart_type: spec.chart_type,
            x_labels: spec.x_labels,
            y_values: spec.y_values,
            title: Some(spec.title),
            source: Some(source.to_string()),
        });
        self.store.append(
            session_id,
            ConversationTurn::assistant(response.clone()).with_metadata(metadata),
        )?;

        Ok(ChatReply {
            response,
            chart_id: Some(rendered.chart_id),
            chart_path: Some(rendered.path),
            color_scheme: Some(style),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{REFUSAL_NO_PREVIOUS_STYLE, REFUSAL_OUT_OF_SCOPE};
    use crate::error::UpstreamError;
    use crate::session::MemoryStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::new();
        config.data_dir = Some(dir.path().to_path_buf());
        config.keep_latest_only = false;
        config
    }

    fn service(dir: &TempDir) -> ChartService<RuleBasedInterpreter, MemoryStore> {
        ChartService::rules_only(MemoryStore::new(), &config(dir))
    }

    #[tokio::test]
    async fn test_chat_renders_and_records() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let reply = service
            .chat("s1", "Chart: Apple=25, Banana=30, Orange=20")
            .await
            .unwrap();
        assert_eq!(reply.response, "I've created a bar chart for you!");
        assert_eq!(reply.color_scheme, Some(ColorScheme::Fd));
        let path = reply.chart_path.clone().unwrap();
        assert!(path.is_file());
        assert_eq!(
            service.chart_path(reply.chart_id.as_deref().unwrap(), "svg").unwrap(),
            path
        );

        let history = service.history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        match &history[1].metadata {
            Some(TurnMetadata::Chart(chart)) => {
                assert_eq!(chart.chart_id, reply.chart_id.clone().unwrap());
                assert_eq!(chart.x_labels, vec!["Apple", "Banana", "Orange"]);
                assert_eq!(chart.source.as_deref(), Some(SOURCE_CHAT));
            }
            other => panic!("expected chart metadata, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refusal_is_recorded_without_chart() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let reply = service.chat("s1", "What's the weather like today?").await.unwrap();
        assert_eq!(reply.response, REFUSAL_OUT_OF_SCOPE);
        assert!(!reply.has_chart());
        assert_eq!(service.history("s1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_style_change_reuses_previous_data() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let reply = service.chat("s1", "Use BNR colors").await.unwrap();
        assert_eq!(reply.response, REFUSAL_NO_PREVIOUS_STYLE);

        service
            .chat("s1", "Sales: Q1=100, Q2=150, Q3=120, Q4=180")
            .await
            .unwrap();
        let reply = service.chat("s1", "Use BNR colors").await.unwrap();
        assert!(reply.has_chart());
        assert_eq!(reply.color_scheme, Some(ColorScheme::Bnr));
        assert_eq!(service.store().last_color_scheme().unwrap(), Some(ColorScheme::Bnr));

        let history = service.history("s1").await.unwrap();
        let (labels, values) = history.last().unwrap().chart_data().unwrap();
        assert_eq!(labels, &["Q1", "Q2", "Q3", "Q4"]);
        assert_eq!(values, &[100.0, 150.0, 120.0, 180.0]);
    }

    #[tokio::test]
    async fn test_session_style_applies_without_explicit_scheme() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        service.set_style("s1", ColorScheme::Bnr).await.unwrap();
        assert_eq!(service.style("s1").await.unwrap(), ColorScheme::Bnr);
        assert_eq!(service.style("other").await.unwrap(), ColorScheme::Fd);

        let reply = service.chat("s1", "A=1, B=2").await.unwrap();
        assert_eq!(reply.color_scheme, Some(ColorScheme::Bnr));
        assert_eq!(service.store().last_color_scheme().unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_and_delete() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        service.chat("s1", "A=1, B=2").await.unwrap();
        service.clear_history("s1").await.unwrap();
        assert!(service.history("s1").await.unwrap().is_empty());

        assert!(service.delete_session("s1").await.unwrap());
        assert!(!service.delete_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_auto_detect() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let reply = service
            .upload("s1", "regions.csv", b"Region,Sales\nNorth,10\nSouth,20\n")
            .await
            .unwrap();
        assert_eq!(reply.response, "I've created a chart from your spreadsheet!");
        assert_eq!(reply.color_scheme, Some(ColorScheme::Fd));

        let history = service.history("s1").await.unwrap();
        assert!(matches!(
            &history[0].metadata,
            Some(TurnMetadata::FileUpload { filename, file_size: 31 }) if filename == "regions.csv"
        ));
        match &history[1].metadata {
            Some(TurnMetadata::Chart(chart)) => {
                assert_eq!(chart.chart_type, ChartType::Bar);
                assert_eq!(chart.title.as_deref(), Some("Chart from regions.csv"));
                assert_eq!(chart.source.as_deref(), Some(SOURCE_SPREADSHEET_AUTO));
            }
            other => panic!("expected chart metadata, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_uses_last_scheme_for_new_session() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        service.chat("s1", "A=1, B=2 in BNR colors").await.unwrap();
        let reply = service
            .upload("s2", "data.csv", b"Name,Score\nAnn,3\nBob,4\n")
            .await
            .unwrap();
        assert_eq!(reply.color_scheme, Some(ColorScheme::Bnr));
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        assert!(matches!(
            service.upload("s1", "report.xlsx", b"x").await,
            Err(ChartError::UnsupportedFile(_))
        ));
        assert!(service.history("s1").await.unwrap().is_empty());

        let reply = service
            .upload("s1", "wide.csv", b"Name,Score,Team\nAnn,3,Red\n")
            .await
            .unwrap();
        assert_eq!(reply.response, UPLOAD_NOT_CHARTABLE);
        assert_eq!(service.history("s1").await.unwrap().len(), 2);
    }

    struct Failing;

    #[async_trait]
    impl ChartInterpreter for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn interpret(
            &self,
            _message: &str,
            _history: &[ConversationTurn],
        ) -> Result<ChartRequestDecision, UpstreamError> {
            Err(UpstreamError::Unavailable("offline".to_string()))
        }
    }

    struct NoType;

    #[async_trait]
    impl ChartInterpreter for NoType {
        fn name(&self) -> &'static str {
            "no-type"
        }

        async fn interpret(
            &self,
            _message: &str,
            _history: &[ConversationTurn],
        ) -> Result<ChartRequestDecision, UpstreamError> {
            Ok(ChartRequestDecision {
                is_valid: true,
                x_labels: (1..=12).map(|i| format!("P{}", i)).collect(),
                y_values: (1..=12).map(f64::from).collect(),
                ..Default::default()
            })
        }
    }

    struct NoData;

    #[async_trait]
    impl ChartInterpreter for NoData {
        fn name(&self) -> &'static str {
            "no-data"
        }

        async fn interpret(
            &self,
            _message: &str,
            _history: &[ConversationTurn],
        ) -> Result<ChartRequestDecision, UpstreamError> {
            Ok(ChartRequestDecision {
                is_valid: true,
                chart_type: Some(ChartType::Bar),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_to_rules() {
        let dir = TempDir::new().unwrap();
        let service = ChartService::new(Failing, MemoryStore::new(), &config(&dir));
        let reply = service.chat("s1", "A=1, B=2").await.unwrap();
        assert_eq!(reply.response, "I've created a bar chart for you!");
    }

    #[tokio::test]
    async fn test_missing_chart_type_is_inferred() {
        let dir = TempDir::new().unwrap();
        let service = ChartService::new(NoType, MemoryStore::new(), &config(&dir));
        let reply = service.chat("s1", "anything").await.unwrap();
        assert_eq!(reply.response, "I've created a line chart for you!");
    }

    #[tokio::test]
    async fn test_valid_without_data_asks_for_values() {
        let dir = TempDir::new().unwrap();
        let service = ChartService::new(NoData, MemoryStore::new(), &config(&dir));
        let reply = service.chat("s1", "a chart please").await.unwrap();
        assert_eq!(reply.response, CLARIFICATION);
        assert!(!reply.has_chart());
    }
}

use async_trait::async_trait;
use tracing::{debug, warn};

use super::rules;
use crate::decision::ChartRequestDecision;
use crate::error::UpstreamError;
use crate::state::ConversationTurn;

/// Anything that can turn a chat message into a chart decision.
///
/// Model-backed implementations may fail; the rule-based one never does.
#[async_trait]
pub trait ChartInterpreter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn interpret(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<ChartRequestDecision, UpstreamError>;
}

/// The deterministic keyword/regex interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInterpreter;

#[async_trait]
impl ChartInterpreter for RuleBasedInterpreter {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn interpret(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<ChartRequestDecision, UpstreamError> {
        Ok(rules::classify(message, history))
    }
}

/// Runs `primary` and answers with the rule-based engine whenever it fails.
pub struct WithFallback<P> {
    primary: Option<P>,
}

impl<P: ChartInterpreter> WithFallback<P> {
    pub fn new(primary: P) -> Self {
        Self { primary: Some(primary) }
    }

    /// No primary configured: every request goes straight to the rules.
    pub fn rules_only() -> Self {
        Self { primary: None }
    }

    /// Always yields a decision.
    pub async fn decide(&self, message: &str, history: &[ConversationTurn]) -> ChartRequestDecision {
        let Some(primary) = &self.primary else {
            debug!("no primary interpreter configured, using rules");
            return rules::classify(message, history);
        };

        match primary.interpret(message, history).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(interpreter = primary.name(), error = %e, "interpreter failed, falling back to rules");
                rules::classify(message, history)
            }
        }
    }
}

#[async_trait]
impl<P: ChartInterpreter> ChartInterpreter for WithFallback<P> {
    fn name(&self) -> &'static str {
        match &self.primary {
            Some(primary) => primary.name(),
            None => "rules",
        }
    }

    async fn interpret(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<ChartRequestDecision, UpstreamError> {
        Ok(self.decide(message, history).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: AtomicUsize,
    }

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
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Unavailable("connection refused".to_string()))
        }
    }

    struct Canned(ChartRequestDecision);

    #[async_trait]
    impl ChartInterpreter for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn interpret(
            &self,
            _message: &str,
            _history: &[ConversationTurn],
        ) -> Result<ChartRequestDecision, UpstreamError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_rules() {
        let interpreter = WithFallback::new(Failing { calls: AtomicUsize::new(0) });
        let decision = interpreter.decide("Chart: Apple=25, Banana=30", &[]).await;
        assert!(decision.is_valid);
        assert_eq!(decision.chart_type, Some(ChartType::Bar));
        assert_eq!(interpreter.primary.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_answer_is_used_verbatim() {
        let canned = ChartRequestDecision::refuse("model says no");
        let interpreter = WithFallback::new(Canned(canned.clone()));
        let decision = interpreter.decide("Chart: Apple=25, Banana=30", &[]).await;
        assert_eq!(decision, canned);
    }

    #[tokio::test]
    async fn test_rules_only_matches_direct_classification() {
        let interpreter: WithFallback<RuleBasedInterpreter> = WithFallback::rules_only();
        let message = "Show me a chart with Jan=50, Feb=60, Mar=70";
        let decision = interpreter.interpret(message, &[]).await.unwrap();
        assert_eq!(decision, rules::classify(message, &[]));
        assert_eq!(interpreter.name(), "rules");
    }
}

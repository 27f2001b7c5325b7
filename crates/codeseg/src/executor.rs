//! Runs a [`StrategyPlan`] against the registry, advancing the fallback
//! chain until some strategy produces chunks.

use crate::config::StrategyConfig;
use crate::error::SegmenterError;
use crate::selector::StrategyPlan;
use crate::strategy::{
    EmergencyStrategy, SplitContext, SplitRequest, SplitStrategy, StrategyName, StrategyRegistry,
};
use crate::types::CodeChunk;
use serde::Serialize;

/// Per-file processing states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Detecting,
    Selecting,
    Executing,
    Failure,
    Success,
    PostProcessing,
    Emergency,
    Done,
}

/// What one strategy attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "detail")]
pub enum AttemptOutcome {
    Produced(usize),
    Empty,
    Failed(String),
    /// `can_handle` declined, or the strategy is not registered
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub strategy: StrategyName,
    pub outcome: AttemptOutcome,
}

/// State transitions and attempts of one `split()` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    pub states: Vec<ExecutionState>,
    pub attempts: Vec<Attempt>,
    /// Post-processing rounds actually run
    pub processing_rounds: usize,
    /// Processors that failed, by name
    pub processor_failures: Vec<String>,
}

impl ExecutionTrace {
    pub fn enter(&mut self, state: ExecutionState) {
        self.states.push(state);
    }

    /// Strategies that ran, in order
    pub fn tried(&self) -> Vec<StrategyName> {
        self.attempts.iter().map(|a| a.strategy).collect()
    }

    /// Strategy whose output was used
    pub fn winner(&self) -> Option<StrategyName> {
        self.attempts
            .iter()
            .rev()
            .find(|a| matches!(a.outcome, AttemptOutcome::Produced(_)))
            .map(|a| a.strategy)
    }
}

/// Walks a plan strictly in order. Never fails: when the chain is exhausted
/// the emergency strategy returns the whole content.
pub struct FallbackExecutor<'r> {
    registry: &'r StrategyRegistry,
}

impl<'r> FallbackExecutor<'r> {
    pub const fn new(registry: &'r StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn run(
        &self,
        plan: &StrategyPlan,
        request: &SplitRequest<'_>,
        trace: &mut ExecutionTrace,
    ) -> Vec<CodeChunk> {
        let context = SplitContext::of(request);

        for name in plan.sequence().filter(|n| *n != StrategyName::Emergency) {
            trace.enter(ExecutionState::Executing);
            let outcome = match self.registry.get(name) {
                Some(strategy) if strategy.can_handle(&context) => match strategy.split(request) {
                    Ok(chunks) if !chunks.is_empty() => {
                        trace.attempts.push(Attempt {
                            strategy: name,
                            outcome: AttemptOutcome::Produced(chunks.len()),
                        });
                        trace.enter(ExecutionState::Success);
                        return chunks;
                    }
                    Ok(_) => AttemptOutcome::Empty,
                    Err(e) => {
                        log::debug!("Strategy {name} failed, falling back: {e}");
                        AttemptOutcome::Failed(e.to_string())
                    }
                },
                _ => AttemptOutcome::Skipped,
            };
            trace.attempts.push(Attempt {
                strategy: name,
                outcome,
            });
            trace.enter(ExecutionState::Failure);
        }

        trace.enter(ExecutionState::Emergency);
        let chunks = self.emergency(request);
        trace.attempts.push(Attempt {
            strategy: StrategyName::Emergency,
            outcome: if chunks.is_empty() {
                AttemptOutcome::Empty
            } else {
                AttemptOutcome::Produced(chunks.len())
            },
        });
        if !request.content.is_empty() {
            log::warn!(
                "{} for {}, using a single emergency chunk",
                SegmenterError::StrategyExhausted,
                request.file_path.unwrap_or("<memory>")
            );
        }
        chunks
    }

    fn emergency(&self, request: &SplitRequest<'_>) -> Vec<CodeChunk> {
        let registered = self
            .registry
            .get(StrategyName::Emergency)
            .and_then(|strategy| strategy.split(request).ok())
            .filter(|chunks| !chunks.is_empty() || request.content.is_empty());
        registered.unwrap_or_else(|| {
            let bare = EmergencyStrategy::new(StrategyConfig::new(
                StrategyName::Emergency,
                StrategyName::Emergency.default_priority(),
                &["*"],
            ));
            bare.split(request).unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SyntaxParser;
    use crate::config::ProcessingConfig;
    use crate::error::{Result, SegmenterError};
    use crate::language::Language;
    use crate::selector::SelectionReason;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Always fails, under a borrowed name
    struct Failing(StrategyName);

    impl SplitStrategy for Failing {
        fn name(&self) -> StrategyName {
            self.0
        }
        fn priority(&self) -> u32 {
            1
        }
        fn supported_languages(&self) -> &[String] {
            &[]
        }
        fn options(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
        fn can_handle(&self, _context: &SplitContext<'_>) -> bool {
            true
        }
        fn split(&self, _request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
            Err(SegmenterError::strategy_failed(self.0, "forced"))
        }
    }

    fn plan(primary: StrategyName, chain: &[StrategyName]) -> StrategyPlan {
        StrategyPlan {
            primary,
            fallback_chain: chain.to_vec(),
            reason: SelectionReason::GlobalTable,
        }
    }

    #[test]
    fn test_primary_success() {
        let registry = StrategyRegistry::from_config(&ProcessingConfig::default(), |s| s);
        let mut trace = ExecutionTrace::default();
        let chunks = FallbackExecutor::new(&registry).run(
            &plan(StrategyName::LineBased, &[StrategyName::Emergency]),
            &SplitRequest::new("a\nb", "text"),
            &mut trace,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(trace.winner(), Some(StrategyName::LineBased));
        assert_eq!(
            trace.states,
            vec![ExecutionState::Executing, ExecutionState::Success]
        );
    }

    #[test]
    fn test_fallback_follows_chain_in_order() {
        let mut registry = StrategyRegistry::from_config(&ProcessingConfig::default(), |s| s);
        registry.register(Arc::new(Failing(StrategyName::SyntaxAware)));
        registry.register(Arc::new(Failing(StrategyName::Semantic)));

        let mut trace = ExecutionTrace::default();
        let chunks = FallbackExecutor::new(&registry).run(
            &plan(
                StrategyName::SyntaxAware,
                &[
                    StrategyName::Semantic,
                    StrategyName::LineBased,
                    StrategyName::Emergency,
                ],
            ),
            &SplitRequest::new("x = 1\ny = 2", "python"),
            &mut trace,
        );

        assert!(!chunks.is_empty());
        assert_eq!(
            trace.tried(),
            vec![
                StrategyName::SyntaxAware,
                StrategyName::Semantic,
                StrategyName::LineBased
            ]
        );
        assert_eq!(trace.winner(), Some(StrategyName::LineBased));
    }

    #[test]
    fn test_malformed_ast_falls_back() {
        let code = "fn broken( {\n    let x = ;\n";
        let parse = SyntaxParser::parse(code, Language::Rust);
        let registry = StrategyRegistry::from_config(&ProcessingConfig::default(), |s| s);
        let request = SplitRequest::new(code, "rust").with_parse(Some(&parse));

        let mut trace = ExecutionTrace::default();
        let chunks = FallbackExecutor::new(&registry).run(
            &plan(
                StrategyName::AstStructural,
                &[StrategyName::LineBased, StrategyName::Emergency],
            ),
            &request,
            &mut trace,
        );
        assert!(!chunks.is_empty());
        assert!(matches!(
            trace.attempts[0].outcome,
            AttemptOutcome::Failed(_) | AttemptOutcome::Skipped
        ));
    }

    #[test]
    fn test_exhaustion_runs_emergency() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Failing(StrategyName::BracketBalanced)));
        registry.register(Arc::new(Failing(StrategyName::LineBased)));

        let mut trace = ExecutionTrace::default();
        let chunks = FallbackExecutor::new(&registry).run(
            &StrategyPlan::universal(),
            &SplitRequest::new("{ unbalanced", "text"),
            &mut trace,
        );

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].strategy(), "emergency");
        assert_eq!(trace.states.last(), Some(&ExecutionState::Emergency));
        assert_eq!(trace.winner(), Some(StrategyName::Emergency));
    }
}

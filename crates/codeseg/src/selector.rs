//! Strategy selection: picks a primary strategy and its fallback chain.

use crate::config::{OverrideMatch, ProcessingConfig};
use crate::detection::DetectionResult;
use crate::language::Language;
use crate::strategy::StrategyName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

static TEST_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|/)(tests?|__tests__|specs?)/|(^|/)test_[^/]+$|[._-](test|spec)\.[A-Za-z0-9]+$")
        .expect("test path regex is valid")
});

/// Why a plan was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionReason {
    /// File above the size limit
    Oversized,
    /// Language confidence too low, or no table knows the language
    Universal,
    FileOverride,
    DetectorHint,
    LanguageTable,
    GlobalTable,
}

/// Primary strategy plus the ordered strategies tried after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPlan {
    pub primary: StrategyName,
    pub fallback_chain: Vec<StrategyName>,
    pub reason: SelectionReason,
}

impl StrategyPlan {
    /// Bracket-balanced, then line-based, then emergency
    pub fn universal() -> Self {
        Self {
            primary: StrategyName::BracketBalanced,
            fallback_chain: vec![StrategyName::LineBased, StrategyName::Emergency],
            reason: SelectionReason::Universal,
        }
    }

    /// Primary first, then the chain
    pub fn sequence(&self) -> impl Iterator<Item = StrategyName> + '_ {
        std::iter::once(self.primary).chain(self.fallback_chain.iter().copied())
    }

    pub fn involves(&self, name: StrategyName) -> bool {
        self.sequence().any(|s| s == name)
    }
}

/// Facts about one file that selection looks at
#[derive(Debug, Clone, Copy)]
pub struct SelectionInput<'a> {
    pub detection: &'a DetectionResult,
    pub file_path: Option<&'a str>,
    pub line_count: usize,
    pub content_length: usize,
}

impl<'a> SelectionInput<'a> {
    /// Input for `content` as described by `detection`
    pub fn new(detection: &'a DetectionResult, content: &str, file_path: Option<&'a str>) -> Self {
        Self {
            detection,
            file_path,
            line_count: content.lines().count(),
            content_length: content.len(),
        }
    }
}

/// Deterministic strategy selection over a [`ProcessingConfig`]
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector<'c> {
    config: &'c ProcessingConfig,
}

impl<'c> StrategySelector<'c> {
    pub const fn new(config: &'c ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, input: &SelectionInput<'_>) -> StrategyPlan {
        let plan = self.choose(input);
        log::debug!(
            "Selected {} for {} ({:?}), fallback {:?}",
            plan.primary,
            input.file_path.unwrap_or("<memory>"),
            plan.reason,
            plan.fallback_chain
        );
        plan
    }

    fn choose(&self, input: &SelectionInput<'_>) -> StrategyPlan {
        let detection = input.detection;
        let known = Language::from_name(&detection.language);
        let language = language_key(&detection.language, known);

        if input.content_length > self.config.performance.max_file_size {
            return self.plan(StrategyName::LineBased, SelectionReason::Oversized);
        }

        if detection.confidence < self.config.selection.min_language_confidence {
            return StrategyPlan::universal();
        }

        if let Some(strategy) = self.file_override(input) {
            return self.plan(strategy, SelectionReason::FileOverride);
        }

        if let Some(hint) = detection.processing_strategy_hint {
            if detection.confidence >= self.config.selection.hint_confidence && self.enabled(hint) {
                return self.plan(self.refine(hint, input), SelectionReason::DetectorHint);
            }
        }

        let language_table = self.config.language_priorities.get(&language);
        let (mut candidates, reason): (Vec<(StrategyName, u32)>, _) = match language_table {
            Some(entries) => (
                entries.iter().map(|e| (e.strategy, e.priority)).collect(),
                SelectionReason::LanguageTable,
            ),
            None if known == Language::Unknown => return StrategyPlan::universal(),
            None => (
                self.config
                    .strategies
                    .iter()
                    .map(|s| (s.name, s.priority))
                    .collect(),
                SelectionReason::GlobalTable,
            ),
        };

        candidates.retain(|(name, _)| {
            *name != StrategyName::Emergency && self.eligible(*name, &language, known, input)
        });
        // Stable: ties keep declaration order.
        candidates.sort_by_key(|(_, priority)| *priority);

        match candidates.first() {
            Some((primary, _)) => self.plan(self.refine(*primary, input), reason),
            None => StrategyPlan::universal(),
        }
    }

    fn plan(&self, primary: StrategyName, reason: SelectionReason) -> StrategyPlan {
        StrategyPlan {
            primary,
            fallback_chain: self.config.fallback_paths.chain_for(primary),
            reason,
        }
    }

    /// Medium-sized files get the fine semantic mode
    fn refine(&self, primary: StrategyName, input: &SelectionInput<'_>) -> StrategyName {
        let semantic = &self.config.semantic;
        let medium = (semantic.fine_mode_min_lines..=semantic.fine_mode_max_lines)
            .contains(&input.line_count);
        if primary == StrategyName::Semantic
            && semantic.enable_fine_mode
            && medium
            && self.enabled(StrategyName::SemanticFine)
        {
            StrategyName::SemanticFine
        } else {
            primary
        }
    }

    fn file_override(&self, input: &SelectionInput<'_>) -> Option<StrategyName> {
        let extension = input
            .file_path
            .and_then(|path| Path::new(path).extension())
            .and_then(|ext| ext.to_str());
        let is_test = input.detection.features.is_test_file
            || input.file_path.is_some_and(is_test_path);

        self.config
            .file_overrides
            .iter()
            .find(|o| match &o.matcher {
                OverrideMatch::Extension(wanted) => {
                    extension.is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
                }
                OverrideMatch::TestFile => is_test,
            })
            .map(|o| o.strategy)
            .filter(|strategy| self.enabled(*strategy))
    }

    /// Strategies missing from the global table count as enabled
    fn enabled(&self, name: StrategyName) -> bool {
        self.config.strategy(name).map_or(true, |s| s.enabled)
    }

    fn eligible(
        &self,
        name: StrategyName,
        language: &str,
        known: Language,
        input: &SelectionInput<'_>,
    ) -> bool {
        let Some(profile) = self.config.strategy(name) else {
            return true;
        };
        if !profile.enabled || !profile.supports(language) {
            return false;
        }
        if name.needs_ast() {
            return known.supports_ast() && input.line_count <= self.config.performance.max_ast_lines;
        }
        true
    }
}

/// Canonical table key for a detector language name
fn language_key(raw: &str, known: Language) -> String {
    if known == Language::Unknown {
        raw.trim().to_lowercase()
    } else {
        known.as_str().to_string()
    }
}

/// Path looks like a test file
pub fn is_test_path(path: &str) -> bool {
    TEST_PATH_RE.is_match(&path.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::FileFeatures;
    use pretty_assertions::assert_eq;

    fn select(
        config: &ProcessingConfig,
        detection: &DetectionResult,
        path: Option<&str>,
        lines: usize,
    ) -> StrategyPlan {
        let input = SelectionInput {
            detection,
            file_path: path,
            line_count: lines,
            content_length: lines * 40,
        };
        StrategySelector::new(config).select(&input)
    }

    #[test]
    fn test_rust_prefers_ast() {
        let config = ProcessingConfig::default();
        let plan = select(&config, &DetectionResult::new("rust", 0.95), Some("src/lib.rs"), 120);
        assert_eq!(plan.primary, StrategyName::AstStructural);
        assert_eq!(plan.reason, SelectionReason::GlobalTable);
        assert_eq!(
            plan.fallback_chain,
            vec![
                StrategyName::SyntaxAware,
                StrategyName::Semantic,
                StrategyName::BracketBalanced,
                StrategyName::LineBased,
                StrategyName::Emergency,
            ]
        );
    }

    #[test]
    fn test_low_confidence_is_universal() {
        let config = ProcessingConfig::default();
        let plan = select(&config, &DetectionResult::new("rust", 0.3), None, 10);
        assert_eq!(plan, StrategyPlan::universal());
    }

    #[test]
    fn test_unknown_language_is_universal() {
        let config = ProcessingConfig::default();
        let plan = select(&config, &DetectionResult::new("cobol", 0.9), None, 10);
        assert_eq!(plan.primary, StrategyName::BracketBalanced);
        assert_eq!(plan.reason, SelectionReason::Universal);
    }

    #[test]
    fn test_extension_override_beats_everything() {
        let config = ProcessingConfig::default();
        let detection = DetectionResult::new("javascript", 0.99).with_hint(StrategyName::Semantic);
        let plan = select(&config, &detection, Some("package.json"), 10);
        assert_eq!(plan.primary, StrategyName::BracketBalanced);
        assert_eq!(plan.reason, SelectionReason::FileOverride);
    }

    #[test]
    fn test_test_files_use_semantic() {
        let config = ProcessingConfig::default();
        let plan = select(
            &config,
            &DetectionResult::new("python", 0.9),
            Some("pkg/tests/test_api.py"),
            20,
        );
        assert_eq!(plan.primary, StrategyName::Semantic);

        let flagged = DetectionResult::new("go", 0.9).with_features(FileFeatures {
            is_test_file: true,
            ..FileFeatures::default()
        });
        assert_eq!(select(&config, &flagged, None, 20).primary, StrategyName::Semantic);
    }

    #[test]
    fn test_hint_needs_confidence() {
        let config = ProcessingConfig::default();
        let confident = DetectionResult::new("rust", 0.9).with_hint(StrategyName::BracketBalanced);
        assert_eq!(
            select(&config, &confident, None, 10).primary,
            StrategyName::BracketBalanced
        );

        let unsure = DetectionResult::new("rust", 0.6).with_hint(StrategyName::BracketBalanced);
        assert_eq!(
            select(&config, &unsure, None, 10).primary,
            StrategyName::AstStructural
        );
    }

    #[test]
    fn test_language_table() {
        let config = ProcessingConfig::default();
        let plan = select(&config, &DetectionResult::new("md", 0.9), Some("README.md"), 40);
        assert_eq!(plan.primary, StrategyName::Markdown);
        assert_eq!(plan.reason, SelectionReason::LanguageTable);
    }

    #[test]
    fn test_yaml_gets_fine_mode_in_range() {
        let config = ProcessingConfig::default();
        let detection = DetectionResult::new("yaml", 0.9);
        assert_eq!(select(&config, &detection, None, 120).primary, StrategyName::SemanticFine);
        assert_eq!(select(&config, &detection, None, 20).primary, StrategyName::Semantic);
        assert_eq!(select(&config, &detection, None, 900).primary, StrategyName::Semantic);
    }

    #[test]
    fn test_large_files_skip_ast() {
        let config = ProcessingConfig::default();
        let lines = config.performance.max_ast_lines + 1;
        let plan = select(&config, &DetectionResult::new("rust", 0.9), None, lines);
        assert_eq!(plan.primary, StrategyName::SyntaxAware);
    }

    #[test]
    fn test_oversized_goes_line_based() {
        let config = ProcessingConfig::default();
        let detection = DetectionResult::new("rust", 0.9);
        let input = SelectionInput {
            detection: &detection,
            file_path: None,
            line_count: 10,
            content_length: config.performance.max_file_size + 1,
        };
        let plan = StrategySelector::new(&config).select(&input);
        assert_eq!(plan.primary, StrategyName::LineBased);
        assert_eq!(plan.fallback_chain, vec![StrategyName::Emergency]);
    }

    #[test]
    fn test_disabled_strategies_are_skipped() {
        let plan = select(
            &ProcessingConfig::fast(),
            &DetectionResult::new("rust", 0.9),
            None,
            30,
        );
        assert_eq!(plan.primary, StrategyName::Semantic);
    }

    #[test]
    fn test_test_path_patterns() {
        assert!(is_test_path("src/__tests__/app.js"));
        assert!(is_test_path("foo/bar.test.ts"));
        assert!(is_test_path("pkg/server_test.go"));
        assert!(is_test_path("test_utils.py"));
        assert!(!is_test_path("src/contest.rs"));
        assert!(!is_test_path("src/latest/mod.rs"));
    }
}

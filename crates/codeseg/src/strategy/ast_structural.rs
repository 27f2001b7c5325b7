use super::{declared, SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::ast::AstNode;
use crate::config::{AstConfig, KindThresholds, StrategyConfig};
use crate::error::{Result, SegmenterError};
use crate::text::SourceLines;
use crate::tracker::NodeUsageTracker;
use crate::type_map::{LanguageFamily, NodeRole, StructuralType, ThresholdKind};
use crate::types::{ChunkType, CodeChunk};
use std::collections::BTreeSet;

/// Extractor sub-passes, run in this order over one shared tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Imports,
    Types,
    Functions,
    Variables,
    Exports,
}

impl Pass {
    const ORDER: [Self; 5] = [
        Self::Imports,
        Self::Types,
        Self::Functions,
        Self::Variables,
        Self::Exports,
    ];

    fn accepts(self, structural: StructuralType, level: Level) -> bool {
        use StructuralType as S;
        match self {
            Self::Imports => structural == S::Import,
            Self::Types => matches!(
                structural,
                S::Class
                    | S::Struct
                    | S::Trait
                    | S::Interface
                    | S::Impl
                    | S::Enum
                    | S::Union
                    | S::Module
                    | S::Namespace
                    | S::TypeAlias
                    | S::TypeDef
            ),
            Self::Functions => {
                structural.is_callable() || (level == Level::Inner && structural == S::ControlFlow)
            }
            Self::Variables => matches!(structural, S::Constant | S::Variable | S::ConfigEntry),
            Self::Exports => structural == S::Export,
        }
    }
}

/// Nesting level of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    TopLevel,
    /// Members of classes, impls, modules
    Nested,
    /// Inside function bodies
    Inner,
}

/// Enclosing declaration while walking
#[derive(Debug, Clone)]
struct Scope {
    name: Option<String>,
    structural: StructuralType,
}

#[derive(Debug)]
struct Candidate {
    start_line: usize,
    end_line: usize,
    structural: StructuralType,
    symbol: Option<String>,
    parent_scope: Option<String>,
    node_ids: BTreeSet<String>,
}

/// Read-only state of one extraction
struct Walk<'a> {
    content: &'a str,
    source: &'a SourceLines<'a>,
    family: LanguageFamily,
    config: &'a AstConfig,
}

impl Walk<'_> {
    fn level_enabled(&self, level: Level) -> bool {
        match level {
            Level::TopLevel => self.config.levels.top_level,
            Level::Nested => self.config.levels.nested,
            Level::Inner => self.config.levels.inner,
        }
    }

    fn thresholds(&self, kind: ThresholdKind) -> &KindThresholds {
        match kind {
            ThresholdKind::Function => &self.config.function,
            ThresholdKind::Class => &self.config.class,
            ThresholdKind::Import => &self.config.import,
            ThresholdKind::Other => &self.config.other,
        }
    }

    /// Start line, start byte and ids of `node` plus the comments and
    /// attributes directly above it
    fn attached_range(&self, node: AstNode<'_>) -> (usize, usize, BTreeSet<String>) {
        let mut start_line = node.start_line();
        let mut start_byte = node.start_byte();
        let mut ids = BTreeSet::from([node.id()]);

        if !self.config.attach_comments {
            return (start_line, start_byte, ids);
        }
        let Some(parent) = node.parent() else {
            return (start_line, start_byte, ids);
        };

        let siblings = parent.children();
        let Some(position) = siblings.iter().position(|s| s.id() == node.id()) else {
            return (start_line, start_byte, ids);
        };

        // Attachments may not share a line with the previous real sibling.
        let floor = siblings[..position]
            .iter()
            .rev()
            .find(|s| s.is_named() && !self.is_attachable(**s))
            .map_or(0, AstNode::end_line);

        for prev in siblings[..position].iter().rev() {
            if !prev.is_named() {
                continue;
            }
            if !self.is_attachable(*prev) || prev.end_line() + 1 < start_line {
                break;
            }
            if prev.start_line() <= floor {
                break;
            }
            start_line = prev.start_line();
            start_byte = prev.start_byte();
            ids.insert(prev.id());
        }

        (start_line, start_byte, ids)
    }

    fn is_attachable(&self, node: AstNode<'_>) -> bool {
        matches!(
            self.family.classify(node.kind()),
            NodeRole::Declaration(structural) if structural.is_attachable()
        )
    }

    fn run(
        &self,
        pass: Pass,
        node: AstNode<'_>,
        level: Level,
        scope: Option<&Scope>,
        tracker: &mut NodeUsageTracker,
        found: &mut Vec<Candidate>,
    ) {
        for child in node.children() {
            if !child.is_named() {
                continue;
            }
            let Some(decl) = declared(child, self.family) else {
                // Bodies, blocks, statement wrappers: look through them.
                self.run(pass, child, level, scope, tracker, found);
                continue;
            };
            if decl.structural.is_attachable() || tracker.contains_id(&decl.outer.id()) {
                continue;
            }

            let structural = match (decl.structural, scope) {
                (StructuralType::Function, Some(s)) if s.structural.is_class_like() => {
                    StructuralType::Method
                }
                (other, _) => other,
            };

            let (start_line, start_byte, node_ids) = self.attached_range(decl.outer);
            let end_line = decl.outer.end_line().max(start_line);
            let lines = end_line - start_line + 1;
            let size = self.source.slice_len(start_line, end_line);
            let fits = self.thresholds(structural.threshold_kind()).accepts(lines, size);

            if pass.accepts(structural, level) && self.level_enabled(level) && fits {
                if tracker.claim(&decl.outer.id(), (start_byte, decl.outer.end_byte())) {
                    found.push(Candidate {
                        start_line,
                        end_line,
                        structural,
                        symbol: decl.inner.symbol_name(self.content),
                        parent_scope: scope.and_then(|s| s.name.clone()),
                        node_ids,
                    });
                }
                continue;
            }

            let inner_scope = Scope {
                name: decl.inner.symbol_name(self.content),
                structural,
            };
            if structural.is_container() && level != Level::Inner {
                if self.config.levels.nested {
                    self.run(pass, decl.inner, Level::Nested, Some(&inner_scope), tracker, found);
                }
            } else if structural.is_callable() && !fits {
                if self.config.levels.inner {
                    self.run(pass, decl.inner, Level::Inner, Some(&inner_scope), tracker, found);
                }
            } else if level == Level::Inner
                || matches!(structural, StructuralType::ControlFlow | StructuralType::Block)
            {
                // `if __name__ == "__main__":`, `try:` and friends hold
                // declarations at the level they appear on.
                self.run(pass, decl.inner, level, scope, tracker, found);
            }
        }
    }
}

/// Collapse adjacent import candidates while the group stays within the
/// import size limit
fn group_imports(
    candidates: Vec<Candidate>,
    source: &SourceLines<'_>,
    limits: &KindThresholds,
) -> Vec<Candidate> {
    let mut grouped: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(last) = grouped.last_mut() {
            let adjacent = candidate.start_line <= last.end_line + 1;
            let fits = source.slice_len(last.start_line, candidate.end_line) <= limits.max_size;
            if adjacent && fits && last.parent_scope == candidate.parent_scope {
                last.end_line = last.end_line.max(candidate.end_line);
                last.symbol = None;
                last.node_ids.extend(candidate.node_ids);
                continue;
            }
        }
        grouped.push(candidate);
    }
    grouped
}

/// Declaration-level chunks from a successful parse
pub struct AstStructuralStrategy {
    profile: StrategyConfig,
    config: AstConfig,
}

impl AstStructuralStrategy {
    pub fn new(profile: StrategyConfig, config: &AstConfig) -> Self {
        Self {
            profile,
            config: config.clone(),
        }
    }
}

impl SplitStrategy for AstStructuralStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::AstStructural
    }

    fn priority(&self) -> u32 {
        self.profile.priority
    }

    fn supported_languages(&self) -> &[String] {
        &self.profile.supported_languages
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({ "profile": self.profile, "config": self.config })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        context.known_language.supports_ast() && self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        if source.is_empty() {
            return Ok(Vec::new());
        }

        let parse = request.successful_parse().ok_or_else(|| {
            SegmenterError::parse_unavailable(format!(
                "no successful parse for {}",
                request.file_path.unwrap_or("<memory>")
            ))
        })?;
        let family = LanguageFamily::for_language(parse.language()).ok_or_else(|| {
            SegmenterError::parse_unavailable(format!("no node table for {}", parse.language()))
        })?;
        let root = parse
            .root()
            .ok_or_else(|| SegmenterError::parse_unavailable("parse result has no tree"))?;

        let walk = Walk {
            content: request.content,
            source: &source,
            family,
            config: &self.config,
        };

        let mut tracker = NodeUsageTracker::new();
        let mut found = Vec::new();
        for pass in Pass::ORDER {
            let mut extracted = Vec::new();
            walk.run(pass, root, Level::TopLevel, None, &mut tracker, &mut extracted);
            if pass == Pass::Imports && self.config.group_imports {
                extracted.sort_by_key(|c| c.start_line);
                extracted = group_imports(extracted, &source, &self.config.import);
            }
            found.extend(extracted);
        }

        if found.is_empty() {
            return Err(SegmenterError::NoEligibleNodes {
                strategy: self.name(),
            });
        }

        found.sort_by_key(|c| (c.start_line, c.end_line));
        log::debug!(
            "ast-structural: {} chunks from {} claimed nodes",
            found.len(),
            tracker.len()
        );

        Ok(found
            .into_iter()
            .map(|c| {
                let metadata = request
                    .metadata(c.start_line, c.end_line, ChunkType::from(c.structural), self.name())
                    .symbol_name(c.symbol)
                    .parent_scope(c.parent_scope)
                    .node_ids(c.node_ids);
                CodeChunk::from_lines(&source, metadata)
            })
            .collect())
    }
}

use super::{declared, SizeLimits, SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::ast::AstNode;
use crate::config::{ProcessingConfig, StrategyConfig};
use crate::error::{Result, SegmenterError};
use crate::language::Language;
use crate::text::{self, SourceLines};
use crate::tracker::NodeUsageTracker;
use crate::type_map::{LanguageFamily, StructuralType};
use crate::types::{ChunkType, CodeChunk};
use once_cell::sync::Lazy;
use regex::Regex;

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:pub(?:\([^)]*\))?|export|default|async|unsafe|static|public|private|protected|internal|final|override|virtual|const)\s+)*(?:fn|def|func|function)\*?\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("function regex is valid")
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|override|virtual|async|synchronized)\s+)+[\w<>\[\],.?]+\s+([A-Za-z_]\w*)\s*\(",
    )
    .expect("method regex is valid")
});

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:pub(?:\([^)]*\))?|export|default|abstract|public|private|protected|internal|static|final|sealed|partial|data|unsafe)\s+)*(class|struct|interface|trait|enum|impl|module|namespace|union)\b(?:\s*<[^>]*>)?\s*([A-Za-z_][A-Za-z0-9_:]*)?",
    )
    .expect("class regex is valid")
});

static GO_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*type\s+([A-Za-z_]\w*)\s+(struct|interface)\b").expect("go type regex is valid")
});

/// Declaration found by one sub-pass
#[derive(Debug)]
struct Found {
    start_line: usize,
    end_line: usize,
    chunk_type: ChunkType,
    symbol: Option<String>,
}

/// Function, class and import sub-passes followed by a merge of small
/// neighbours. Uses the syntax tree when there is one, line patterns
/// otherwise.
pub struct SyntaxAwareStrategy {
    profile: StrategyConfig,
    limits: SizeLimits,
    small_chunk_size: usize,
}

impl SyntaxAwareStrategy {
    pub fn new(profile: StrategyConfig, config: &ProcessingConfig) -> Self {
        let limits = SizeLimits::resolve(&profile, &config.chunking);
        Self {
            profile,
            limits,
            small_chunk_size: config.syntax.small_chunk_size,
        }
    }

    fn from_tree(
        root: AstNode<'_>,
        family: LanguageFamily,
        content: &str,
        tracker: &mut NodeUsageTracker,
    ) -> Vec<Found> {
        let nodes = root.descendants();
        let mut found = Vec::new();

        // Functions outside containers.
        for node in &nodes {
            let Some(decl) = declared(*node, family) else {
                continue;
            };
            if !decl.structural.is_callable() || inside_container(decl.outer, family) {
                continue;
            }
            if tracker.claim(&decl.outer.id(), (decl.outer.start_byte(), decl.outer.end_byte())) {
                found.push(Found {
                    start_line: decl.outer.start_line(),
                    end_line: decl.outer.end_line(),
                    chunk_type: ChunkType::from(decl.structural),
                    symbol: decl.inner.symbol_name(content),
                });
            }
        }

        // Outermost type-like declarations.
        for node in &nodes {
            let Some(decl) = declared(*node, family) else {
                continue;
            };
            let type_like = decl.structural.is_container()
                || matches!(decl.structural, StructuralType::Enum | StructuralType::Union);
            if !type_like {
                continue;
            }
            if tracker.claim(&decl.outer.id(), (decl.outer.start_byte(), decl.outer.end_byte())) {
                found.push(Found {
                    start_line: decl.outer.start_line(),
                    end_line: decl.outer.end_line(),
                    chunk_type: ChunkType::from(decl.structural),
                    symbol: decl.inner.symbol_name(content),
                });
            }
        }

        // Imports, adjacent ones grouped.
        let mut imports: Vec<(usize, usize)> = Vec::new();
        for node in &nodes {
            let Some(decl) = declared(*node, family) else {
                continue;
            };
            if decl.structural != StructuralType::Import {
                continue;
            }
            if tracker.claim(&decl.outer.id(), (decl.outer.start_byte(), decl.outer.end_byte())) {
                imports.push((decl.outer.start_line(), decl.outer.end_line()));
            }
        }
        found.extend(group_lines(imports).into_iter().map(|(start, end)| Found {
            start_line: start,
            end_line: end,
            chunk_type: ChunkType::Import,
            symbol: None,
        }));

        found
    }

    fn from_patterns(
        source: &SourceLines<'_>,
        language: Language,
        tracker: &mut NodeUsageTracker,
    ) -> Vec<Found> {
        let indent_scoped = matches!(language, Language::Python | Language::Ruby);
        let span = |start: usize, end: usize| {
            (source.line_start_byte(start), source.line_end_byte(end))
        };

        let mut classes = Vec::new();
        let mut functions = Vec::new();
        for (idx, line) in source.lines().iter().enumerate() {
            let n = idx + 1;
            if let Some((chunk_type, symbol)) = class_start(line) {
                classes.push((n, extent(source, n, indent_scoped), chunk_type, symbol));
            } else if let Some(symbol) = function_start(line, language) {
                functions.push((n, extent(source, n, indent_scoped), symbol));
            }
        }

        let mut found = Vec::new();
        for (start, end, symbol) in functions {
            let in_class = classes
                .iter()
                .any(|(c_start, c_end, _, _)| *c_start < start && start <= *c_end);
            if in_class {
                continue;
            }
            if tracker.claim(&format!("function:{start}-{end}"), span(start, end)) {
                found.push(Found {
                    start_line: start,
                    end_line: end,
                    chunk_type: ChunkType::Function,
                    symbol: Some(symbol),
                });
            }
        }
        for (start, end, chunk_type, symbol) in classes {
            if tracker.claim(&format!("class:{start}-{end}"), span(start, end)) {
                found.push(Found {
                    start_line: start,
                    end_line: end,
                    chunk_type,
                    symbol,
                });
            }
        }

        let patterns = language.import_patterns();
        let mut imports = Vec::new();
        for (idx, line) in source.lines().iter().enumerate() {
            let n = idx + 1;
            let trimmed = line.trim_start();
            if patterns.iter().any(|p| trimmed.starts_with(p))
                && tracker.claim(&format!("import:{n}"), span(n, n))
            {
                imports.push((n, n));
            }
        }
        found.extend(group_lines(imports).into_iter().map(|(start, end)| Found {
            start_line: start,
            end_line: end,
            chunk_type: ChunkType::Import,
            symbol: None,
        }));

        found
    }

    /// Merge neighbouring small chunks separated only by blank lines
    fn merge_small(&self, chunks: Vec<CodeChunk>, source: &SourceLines<'_>) -> Vec<CodeChunk> {
        let mut merged: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if let Some(prev) = merged.last() {
                let both_small =
                    prev.size() < self.small_chunk_size && chunk.size() < self.small_chunk_size;
                let gap_blank = prev.end_line() < chunk.start_line()
                    && (prev.end_line() + 1..chunk.start_line())
                        .all(|n| source.line(n).map_or(true, text::is_blank));
                let fits = source.slice_len(prev.start_line(), chunk.end_line()) <= self.limits.max_size;
                if both_small && gap_blank && fits {
                    let union = CodeChunk::merged(prev, &chunk, source);
                    merged.pop();
                    merged.push(union);
                    continue;
                }
            }
            merged.push(chunk);
        }
        merged
    }
}

impl SplitStrategy for SyntaxAwareStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::SyntaxAware
    }

    fn priority(&self) -> u32 {
        self.profile.priority
    }

    fn supported_languages(&self) -> &[String] {
        &self.profile.supported_languages
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile,
            "limits": self.limits,
            "smallChunkSize": self.small_chunk_size,
        })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        if source.is_empty() {
            return Ok(Vec::new());
        }

        let language = request.lang();
        let mut tracker = NodeUsageTracker::new();
        let tree = request.successful_parse().and_then(|parse| {
            LanguageFamily::for_language(parse.language()).zip(parse.root())
        });
        let mut found = match tree {
            Some((family, root)) => Self::from_tree(root, family, request.content, &mut tracker),
            None => Self::from_patterns(&source, language, &mut tracker),
        };

        if found.is_empty() {
            return Err(SegmenterError::strategy_failed(
                self.name(),
                "no functions, classes or imports found",
            ));
        }

        found.sort_by_key(|f| f.start_line);
        let chunks = found
            .into_iter()
            .map(|f| {
                let metadata = request
                    .metadata(f.start_line, f.end_line, f.chunk_type, self.name())
                    .symbol_name(f.symbol);
                CodeChunk::from_lines(&source, metadata)
            })
            .collect();

        Ok(self.merge_small(chunks, &source))
    }
}

/// Whether some ancestor of `node` is a container declaration
fn inside_container(node: AstNode<'_>, family: LanguageFamily) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if declared(ancestor, family).is_some_and(|d| d.structural.is_container()) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

fn function_start(line: &str, language: Language) -> Option<String> {
    if let Some(caps) = FUNCTION_RE.captures(line) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if matches!(
        language,
        Language::Java | Language::CSharp | Language::Cpp | Language::C | Language::TypeScript
    ) {
        if let Some(caps) = METHOD_RE.captures(line) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

fn class_start(line: &str) -> Option<(ChunkType, Option<String>)> {
    if let Some(caps) = GO_TYPE_RE.captures(line) {
        let chunk_type = if caps.get(2).is_some_and(|m| m.as_str() == "interface") {
            ChunkType::Interface
        } else {
            ChunkType::Class
        };
        return Some((chunk_type, caps.get(1).map(|m| m.as_str().to_string())));
    }

    let caps = CLASS_RE.captures(line)?;
    let chunk_type = match caps.get(1).map_or("", |m| m.as_str()) {
        "interface" | "trait" => ChunkType::Interface,
        "enum" => ChunkType::Enum,
        "union" => ChunkType::Union,
        "module" | "namespace" => ChunkType::Module,
        _ => ChunkType::Class,
    };
    Some((chunk_type, caps.get(2).map(|m| m.as_str().to_string())))
}

/// Last line of the declaration starting at `start`
fn extent(source: &SourceLines<'_>, start: usize, indent_scoped: bool) -> usize {
    if indent_scoped {
        return indent_extent(source, start);
    }

    let mut depth = 0i64;
    let mut opened = false;
    for n in start..=source.len() {
        let line = source.line(n).unwrap_or("");
        if !opened && n > start + 3 {
            // Signature ran on with no body in sight.
            return start;
        }
        if !opened && line.trim_end().ends_with(';') && !line.contains('{') {
            return n;
        }
        if line.contains('{') {
            opened = true;
        }
        depth += text::line_brace_delta(line);
        if opened && depth <= 0 {
            return n;
        }
    }
    source.len()
}

fn indent_extent(source: &SourceLines<'_>, start: usize) -> usize {
    let base = source.line(start).map_or(0, text::indent_width);
    let mut end = start;
    for n in start + 1..=source.len() {
        let line = source.line(n).unwrap_or("");
        if text::is_blank(line) {
            continue;
        }
        if text::indent_width(line) > base {
            end = n;
        } else {
            if line.trim() == "end" {
                end = n;
            }
            break;
        }
    }
    end
}

/// Collapse runs of adjacent line ranges
fn group_lines(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_unstable();
    let mut grouped: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        match grouped.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => grouped.push((start, end)),
        }
    }
    grouped
}

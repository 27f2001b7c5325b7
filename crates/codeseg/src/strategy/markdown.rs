use super::{SizeLimits, SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::{ProcessingConfig, StrategyConfig};
use crate::error::{Result, SegmenterError};
use crate::language::Language;
use crate::text::{self, SourceLines};
use crate::types::{ChunkType, CodeChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Prose,
    List,
    Table,
    Fence,
}

impl BlockKind {
    fn chunk_type(self) -> ChunkType {
        match self {
            Self::Fence => ChunkType::Block,
            Self::Heading | Self::Prose | Self::List | Self::Table => ChunkType::Documentation,
        }
    }

    /// Atomic blocks are never split, however large
    fn is_atomic(self) -> bool {
        matches!(self, Self::Fence | Self::Table | Self::List)
    }
}

#[derive(Debug)]
struct Block {
    start: usize,
    end: usize,
    kind: BlockKind,
    section: usize,
}

/// Section-based markdown splitting: headings open sections, fenced code
/// is atomic, tables and lists stay whole, then same-section same-type
/// neighbours are merged.
pub struct MarkdownStrategy {
    profile: StrategyConfig,
    limits: SizeLimits,
    split_heading_level: usize,
    merge_sections: bool,
}

impl MarkdownStrategy {
    pub fn new(profile: StrategyConfig, config: &ProcessingConfig) -> Self {
        let limits = SizeLimits::resolve(&profile, &config.chunking);
        Self {
            profile,
            limits,
            split_heading_level: config.markdown.split_heading_level,
            merge_sections: config.markdown.merge_sections,
        }
    }

    /// Cut the file into blocks and record section titles
    fn blocks(&self, source: &SourceLines<'_>) -> (Vec<Block>, Vec<Option<String>>) {
        let total = source.len();
        let mut blocks = Vec::new();
        let mut titles: Vec<Option<String>> = vec![None];
        let mut section = 0;

        let mut n = 1;
        while n <= total {
            let line = source.line(n).unwrap_or("");
            if text::is_blank(line) {
                n += 1;
                continue;
            }

            if let Some(marker) = fence_marker(line) {
                let end = (n + 1..=total)
                    .find(|&i| {
                        source
                            .line(i)
                            .is_some_and(|l| l.trim_start().starts_with(marker))
                    })
                    .unwrap_or(total);
                blocks.push(Block {
                    start: n,
                    end,
                    kind: BlockKind::Fence,
                    section,
                });
                n = end + 1;
                continue;
            }

            if let Some((level, title)) = heading(line) {
                if level <= self.split_heading_level {
                    section += 1;
                    titles.push(Some(title));
                }
                blocks.push(Block {
                    start: n,
                    end: n,
                    kind: BlockKind::Heading,
                    section,
                });
                n += 1;
                continue;
            }

            let kind = if is_table_row(line) {
                BlockKind::Table
            } else if text::is_list_item(line) {
                BlockKind::List
            } else {
                BlockKind::Prose
            };
            let mut end = n;
            while end < total {
                let next = source.line(end + 1).unwrap_or("");
                let continues = match kind {
                    BlockKind::Table => is_table_row(next),
                    BlockKind::List => {
                        !text::is_blank(next)
                            && (text::is_list_item(next) || text::indent_width(next) > 0)
                    }
                    _ => {
                        !text::is_blank(next)
                            && heading(next).is_none()
                            && fence_marker(next).is_none()
                            && !is_table_row(next)
                            && !text::is_list_item(next)
                    }
                };
                if !continues {
                    break;
                }
                end += 1;
            }
            blocks.push(Block {
                start: n,
                end,
                kind,
                section,
            });
            n = end + 1;
        }

        (blocks, titles)
    }

    /// Prose longer than the limit is cut at line boundaries
    fn split_oversized(&self, block: Block, source: &SourceLines<'_>) -> Vec<Block> {
        if block.kind.is_atomic() || source.slice_len(block.start, block.end) <= self.limits.max_size
        {
            return vec![block];
        }
        let mut pieces = Vec::new();
        let mut start = block.start;
        for n in block.start..=block.end {
            if n > start && source.slice_len(start, n) > self.limits.max_size {
                pieces.push(Block {
                    start,
                    end: n - 1,
                    ..block
                });
                start = n;
            }
        }
        pieces.push(Block { start, ..block });
        pieces
    }
}

impl SplitStrategy for MarkdownStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Markdown
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
            "splitHeadingLevel": self.split_heading_level,
            "mergeSections": self.merge_sections,
        })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        context.known_language == Language::Markdown || self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        if source.is_empty() {
            return Ok(Vec::new());
        }

        let (blocks, titles) = self.blocks(&source);
        if blocks.is_empty() {
            return Err(SegmenterError::strategy_failed(
                self.name(),
                "document has no content blocks",
            ));
        }

        let blocks: Vec<Block> = blocks
            .into_iter()
            .flat_map(|block| self.split_oversized(block, &source))
            .collect();

        let mut chunks: Vec<(CodeChunk, usize)> = Vec::with_capacity(blocks.len());
        for block in blocks {
            let title = titles.get(block.section).cloned().flatten();
            let chunk_type = block.kind.chunk_type();
            let chunk = CodeChunk::from_lines(
                &source,
                request
                    .metadata(block.start, block.end, chunk_type, self.name())
                    .parent_scope(title),
            );

            if self.merge_sections {
                if let Some((prev, section)) = chunks.last() {
                    let mergeable = *section == block.section
                        && prev.chunk_type() == chunk_type
                        && source.slice_len(prev.start_line(), block.end) <= self.limits.max_size;
                    if mergeable {
                        let merged = CodeChunk::merged(prev, &chunk, &source);
                        chunks.pop();
                        chunks.push((merged, block.section));
                        continue;
                    }
                }
            }
            chunks.push((chunk, block.section));
        }

        Ok(chunks.into_iter().map(|(chunk, _)| chunk).collect())
    }
}

/// Opening fence marker (```` ``` ```` or `~~~`)
fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// ATX heading level and title
fn heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim().to_string()))
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

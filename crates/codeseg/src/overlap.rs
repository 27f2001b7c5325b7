//! Context overlap between neighbouring chunks, shared by the overlap
//! decorator and the overlap post-processor.

use crate::config::OverlapConfig;
use crate::text::SourceLines;
use crate::types::{CodeChunk, OVERLAP_LEADING, OVERLAP_TRAILING};

/// Inject leading (and optionally trailing) context lines.
///
/// Leading context comes from the source lines right above a chunk and never
/// reaches past the previous chunk's start; trailing context mirrors that
/// toward the next chunk. The added text is capped by `config.lines`, by
/// `max_overlap_ratio` of the chunk size and by `max_chunk_size`; when over
/// budget the line farthest from the chunk is dropped first. Chunks that
/// already carry overlap are left alone.
pub fn apply_overlap(
    chunks: &[CodeChunk],
    source: &SourceLines<'_>,
    config: &OverlapConfig,
    max_chunk_size: usize,
) -> Vec<CodeChunk> {
    if config.lines == 0 || chunks.len() < 2 {
        return chunks.to_vec();
    }

    let mut result = Vec::with_capacity(chunks.len());
    for (idx, chunk) in chunks.iter().enumerate() {
        if chunk.has_overlap() {
            result.push(chunk.clone());
            continue;
        }

        let mut budget = budget_for(chunk, config, max_chunk_size);

        let leading = match idx.checked_sub(1).map(|p| &chunks[p]) {
            Some(prev) if prev.start_line() < chunk.start_line() => {
                let floor = prev.start_line().max(chunk.start_line().saturating_sub(config.lines));
                take_lines((floor..chunk.start_line()).rev(), source, &mut budget)
            }
            _ => 0,
        };

        let trailing = match chunks.get(idx + 1) {
            Some(next) if config.trailing && next.end_line() > chunk.end_line() => {
                let ceiling = next.end_line().min(chunk.end_line() + config.lines);
                take_lines(chunk.end_line() + 1..=ceiling, source, &mut budget)
            }
            _ => 0,
        };

        if leading == 0 && trailing == 0 {
            result.push(chunk.clone());
            continue;
        }

        let mut widened =
            chunk.with_range(source, chunk.start_line() - leading, chunk.end_line() + trailing);
        if leading > 0 {
            widened = widened.with_extension(OVERLAP_LEADING, leading);
        }
        if trailing > 0 {
            widened = widened.with_extension(OVERLAP_TRAILING, trailing);
        }
        result.push(widened);
    }
    result
}

/// Bytes of context a chunk may still take
fn budget_for(chunk: &CodeChunk, config: &OverlapConfig, max_chunk_size: usize) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let by_ratio = (chunk.size() as f64 * config.max_overlap_ratio).floor() as usize;
    by_ratio.min(max_chunk_size.saturating_sub(chunk.size()))
}

/// Take lines nearest-first while each fits the remaining budget
fn take_lines(
    lines: impl Iterator<Item = usize>,
    source: &SourceLines<'_>,
    budget: &mut usize,
) -> usize {
    let mut taken = 0;
    for n in lines {
        // +1 for the joining newline
        let cost = source.line(n).map_or(0, str::len) + 1;
        if cost > *budget {
            break;
        }
        *budget -= cost;
        taken += 1;
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, ChunkType};

    fn chunks_of(source: &SourceLines<'_>, ranges: &[(usize, usize)]) -> Vec<CodeChunk> {
        ranges
            .iter()
            .map(|&(start, end)| {
                CodeChunk::from_lines(
                    source,
                    ChunkMetadata::new(start, end, "text", ChunkType::Generic, "line-based"),
                )
            })
            .collect()
    }

    fn config(lines: usize, ratio: f64, trailing: bool) -> OverlapConfig {
        OverlapConfig {
            lines,
            max_overlap_ratio: ratio,
            trailing,
        }
    }

    const TEXT: &str = "aaaa\nbbbb\ncccc\ndddd\neeee\nffff\ngggg\nhhhh";

    #[test]
    fn test_leading_overlap_from_previous_region() {
        let source = SourceLines::new(TEXT);
        let chunks = chunks_of(&source, &[(1, 4), (5, 8)]);
        let out = apply_overlap(&chunks, &source, &config(2, 1.0, false), 1000);

        assert_eq!(out[0], chunks[0]);
        assert_eq!((out[1].start_line(), out[1].end_line()), (3, 8));
        assert!(out[1].content().starts_with("cccc\ndddd\neeee"));
        assert_eq!(
            out[1].metadata().extensions.get(OVERLAP_LEADING),
            Some(&serde_json::json!(2))
        );
    }

    #[test]
    fn test_ratio_caps_overlap_dropping_oldest_line() {
        let source = SourceLines::new(TEXT);
        let chunks = chunks_of(&source, &[(1, 4), (5, 8)]);
        // 19 bytes * 0.3 = 5 bytes: room for one 4-char line plus newline.
        let out = apply_overlap(&chunks, &source, &config(3, 0.3, false), 1000);
        assert_eq!(out[1].start_line(), 4);
    }

    #[test]
    fn test_trailing_overlap() {
        let source = SourceLines::new(TEXT);
        let chunks = chunks_of(&source, &[(1, 4), (5, 8)]);
        let out = apply_overlap(&chunks, &source, &config(1, 1.0, true), 1000);
        assert_eq!((out[0].start_line(), out[0].end_line()), (1, 5));
        assert!(out[0].has_overlap());
    }

    #[test]
    fn test_second_application_is_a_no_op() {
        let source = SourceLines::new(TEXT);
        let chunks = chunks_of(&source, &[(1, 4), (5, 8)]);
        let once = apply_overlap(&chunks, &source, &config(2, 1.0, false), 1000);
        let twice = apply_overlap(&once, &source, &config(2, 1.0, false), 1000);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_max_chunk_size_caps_overlap() {
        let source = SourceLines::new(TEXT);
        let chunks = chunks_of(&source, &[(1, 4), (5, 8)]);
        let out = apply_overlap(&chunks, &source, &config(2, 1.0, false), 19);
        assert_eq!(out[1], chunks[1]);
    }
}

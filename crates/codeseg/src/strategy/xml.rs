use super::{SizeLimits, SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::config::{ProcessingConfig, StrategyConfig};
use crate::error::Result;
use crate::text::{self, SourceLines};
use crate::types::{ChunkType, CodeChunk};

/// Regions whose content never counts toward element depth
const IGNORED_REGIONS: [(&str, &str); 2] = [("<!--", "-->"), ("<![CDATA[", "]]>")];

/// Splits markup where element depth returns to `split_depth`
pub struct XmlStrategy {
    profile: StrategyConfig,
    limits: SizeLimits,
    split_depth: i64,
}

impl XmlStrategy {
    pub fn new(profile: StrategyConfig, config: &ProcessingConfig) -> Self {
        let limits = SizeLimits::resolve(&profile, &config.chunking);
        Self {
            profile,
            limits,
            split_depth: i64::try_from(config.xml.split_depth).unwrap_or(i64::MAX),
        }
    }
}

/// Remove comment and CDATA regions from `line`. `open` carries the
/// closing marker of a region still open from a previous line.
fn strip_ignored(line: &str, open: &mut Option<&'static str>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if let Some(close) = *open {
            match rest.find(close) {
                Some(pos) => {
                    rest = &rest[pos + close.len()..];
                    *open = None;
                }
                None => return out,
            }
        }
        let next = IGNORED_REGIONS
            .iter()
            .filter_map(|(start, end)| rest.find(start).map(|pos| (pos, *start, *end)))
            .min_by_key(|(pos, _, _)| *pos);
        match next {
            Some((pos, start, end)) => {
                out.push_str(&rest[..pos]);
                rest = &rest[pos + start.len()..];
                *open = Some(end);
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

impl SplitStrategy for XmlStrategy {
    fn name(&self) -> StrategyName {
        StrategyName::Xml
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
            "splitDepth": self.split_depth,
        })
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        context.known_language.is_markup() || self.profile.supports(context.language)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        let source = SourceLines::new(request.content);
        let total = source.len();
        let mut chunks: Vec<CodeChunk> = Vec::new();

        let mut open_region = None;
        let mut start = 1;
        let mut depth = 0i64;
        for (idx, line) in source.lines().iter().enumerate() {
            let n = idx + 1;

            if n > start && source.slice_len(start, n) > self.limits.max_size {
                chunks.push(request.chunk(&source, start, n - 1, ChunkType::Block, self.name()));
                start = n;
            }

            let effective = strip_ignored(line, &mut open_region);
            depth = (depth + text::tag_delta(&effective)).max(0);
            let closes_element = effective.contains("</") || effective.contains("/>");
            let size = source.slice_len(start, n);
            let lines = n - start + 1;

            let at_boundary =
                depth <= self.split_depth && closes_element && size >= self.limits.min_size;
            if at_boundary || lines >= self.limits.max_lines {
                chunks.push(request.chunk(&source, start, n, ChunkType::Block, self.name()));
                start = n + 1;
            }
        }

        if start <= total {
            // A short tail (usually the closing root tag) joins the last chunk.
            let tail_small = source.slice_len(start, total) < self.limits.min_size;
            match chunks.pop() {
                Some(last)
                    if tail_small
                        && source.slice_len(last.start_line(), total) <= self.limits.max_size =>
                {
                    chunks.push(last.with_range(&source, last.start_line(), total));
                }
                last => {
                    chunks.extend(last);
                    chunks.push(request.chunk(&source, start, total, ChunkType::Block, self.name()));
                }
            }
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"<?xml version="1.0"?>
<catalog>
  <!-- first
       <book> in a comment -->
  <book id="1">
    <title>A</title>
  </book>
  <book id="2">
    <title>B</title>
  </book>
</catalog>
"#;

    fn strategy(min: usize) -> XmlStrategy {
        let mut config = ProcessingConfig::default();
        config.chunking.min_chunk_size = min;
        XmlStrategy::new(StrategyConfig::new(StrategyName::Xml, 1, &["xml"]), &config)
    }

    #[test]
    fn test_splits_between_top_level_elements() {
        let chunks = strategy(20)
            .split(&SplitRequest::new(CATALOG, "xml"))
            .unwrap();
        let ranges: Vec<_> = chunks
            .iter()
            .map(|c| (c.start_line(), c.end_line()))
            .collect();
        assert_eq!(ranges, vec![(1, 7), (8, 11)]);
        assert!(chunks.iter().all(|c| c.chunk_type() == ChunkType::Block));
    }

    #[test]
    fn test_high_minimum_keeps_one_chunk() {
        let chunks = strategy(10_000)
            .split(&SplitRequest::new(CATALOG, "xml"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line(), 11);
    }

    #[test]
    fn test_strip_ignored_spans_lines() {
        let mut open = None;
        assert_eq!(strip_ignored("<a><!-- x", &mut open), "<a>");
        assert_eq!(open, Some("-->"));
        assert_eq!(strip_ignored("<b> --></a>", &mut open), "</a>");
        assert_eq!(open, None);
        assert_eq!(strip_ignored("<![CDATA[<x>]]><y/>", &mut open), "<y/>");
    }
}

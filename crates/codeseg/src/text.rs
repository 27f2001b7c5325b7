//! Line-oriented view of a file plus the small text heuristics shared by
//! strategies and processors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static DECISION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(if|elif|for|while|match|case|catch|except|loop|switch)\b|&&|\|\|")
        .expect("decision regex is valid")
});

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier regex is valid"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([A-Za-z][\w:.-]*)[^<>]*?(/?)>").expect("tag regex is valid")
});

static INLINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--.*?-->").expect("markup comment regex is valid"));

/// HTML elements that never take a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Lines of one file with their byte offsets. Line numbers are 1-based.
#[derive(Debug, Clone)]
pub struct SourceLines<'a> {
    lines: Vec<&'a str>,
    offsets: Vec<usize>,
    /// `widths[i]` is the summed length of the first `i` lines
    widths: Vec<usize>,
}

impl<'a> SourceLines<'a> {
    #[must_use]
    pub fn new(content: &'a str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let mut offsets = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for raw in content.split_inclusive('\n') {
            offsets.push(offset);
            offset += raw.len();
        }
        offsets.truncate(lines.len());
        let widths = std::iter::once(0)
            .chain(lines.iter().scan(0, |total, line| {
                *total += line.len();
                Some(*total)
            }))
            .collect();
        Self {
            lines,
            offsets,
            widths,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `n` (1-based)
    #[must_use]
    pub fn line(&self, n: usize) -> Option<&'a str> {
        n.checked_sub(1).and_then(|idx| self.lines.get(idx).copied())
    }

    #[must_use]
    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Lines `start..=end` joined with `\n`, clamped to the file
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start = start.max(1);
        let end = end.min(self.lines.len());
        if start > end {
            return String::new();
        }
        self.lines[start - 1..end].join("\n")
    }

    /// Byte offset where line `n` starts
    #[must_use]
    pub fn line_start_byte(&self, n: usize) -> usize {
        n.checked_sub(1)
            .and_then(|idx| self.offsets.get(idx).copied())
            .unwrap_or(0)
    }

    /// Byte offset just past the last character of line `n`
    #[must_use]
    pub fn line_end_byte(&self, n: usize) -> usize {
        self.line_start_byte(n) + self.line(n).map_or(0, str::len)
    }

    /// Length of `slice(start, end)` without building it
    #[must_use]
    pub fn slice_len(&self, start: usize, end: usize) -> usize {
        let start = start.max(1);
        let end = end.min(self.lines.len());
        if start > end {
            return 0;
        }
        self.widths[end] - self.widths[start - 1] + (end - start)
    }
}

#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Comment line in any of the C, hash, or markup comment styles
#[must_use]
pub fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with("* ")
        || trimmed == "*"
        || trimmed.starts_with("*/")
        || trimmed.starts_with("<!--")
        || (trimmed.starts_with('#') && !trimmed.starts_with("#[") && !trimmed.starts_with("#!["))
}

/// A line holding nothing but closing punctuation, e.g. `}` or `});`
#[must_use]
pub fn is_closing_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.starts_with(['}', ')', ']'])
        && trimmed.chars().all(|c| matches!(c, '}' | ')' | ']' | ';' | ','))
}

/// Net bracket depth change of `text`, ignoring double-quoted and backtick
/// strings and line comments.
#[must_use]
pub fn bracket_delta(text: &str) -> i64 {
    let mut delta = 0i64;
    for line in text.lines() {
        delta += line_bracket_delta(line);
    }
    delta
}

#[must_use]
pub fn line_bracket_delta(line: &str) -> i64 {
    scan_delta(line, &['{', '(', '['], &['}', ')', ']'])
}

/// Like [`line_bracket_delta`] but only for curly braces
#[must_use]
pub fn line_brace_delta(line: &str) -> i64 {
    scan_delta(line, &['{'], &['}'])
}

fn scan_delta(line: &str, opens: &[char], closes: &[char]) -> i64 {
    let mut delta = 0i64;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';
    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '"' | '`' => quote = Some(c),
            '/' if prev == '/' => break,
            c if opens.contains(&c) => delta += 1,
            c if closes.contains(&c) => delta -= 1,
            _ => {}
        }
        prev = c;
    }
    delta
}

/// Net element depth change of one markup line. Comments on the line,
/// processing instructions and void elements do not count.
#[must_use]
pub fn tag_delta(line: &str) -> i64 {
    let stripped = INLINE_COMMENT_RE.replace_all(line, "");
    let mut delta = 0i64;
    for caps in TAG_RE.captures_iter(&stripped) {
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map_or("", |m| m.as_str()).to_ascii_lowercase();
        if closing {
            delta -= 1;
        } else if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            delta += 1;
        }
    }
    delta
}

/// Markdown-style list item (`- `, `* `, `+ `, `1. `)
#[must_use]
pub fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && trimmed[digits..].starts_with(". ")
}

/// Leading whitespace width, tabs counted as four columns
#[must_use]
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Cyclomatic-style estimate: 1 + decision points + extra nesting depth
#[must_use]
pub fn complexity(content: &str) -> u32 {
    let decisions = DECISION_RE.find_iter(content).count();
    let mut depth = 0i64;
    let mut max_depth = 0i64;
    for line in content.lines() {
        depth = (depth + line_bracket_delta(line)).max(0);
        max_depth = max_depth.max(depth);
    }
    let nesting = usize::try_from(max_depth.saturating_sub(1)).unwrap_or(0);
    u32::try_from(1 + decisions + nesting).unwrap_or(u32::MAX)
}

/// Lowercased identifiers longer than two characters
#[must_use]
pub fn identifiers(content: &str) -> BTreeSet<String> {
    IDENT_RE
        .find_iter(content)
        .map(|m| m.as_str())
        .filter(|ident| ident.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Whether a chunk holds anything beyond whitespace and punctuation
#[must_use]
pub fn has_substance(content: &str) -> bool {
    content.chars().any(char::is_alphanumeric)
}

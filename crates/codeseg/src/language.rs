use serde::{Deserialize, Serialize};

/// Languages the core has tables for. Anything else is `Unknown` and takes
/// the universal fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Markdown,
    Xml,
    Html,
    Json,
    Yaml,
    Unknown,
}

impl Language {
    /// Map a detector-supplied language name onto a known language
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "rust" | "rs" => Self::Rust,
            "python" | "py" => Self::Python,
            "javascript" | "js" | "jsx" => Self::JavaScript,
            "typescript" | "ts" | "tsx" => Self::TypeScript,
            "go" | "golang" => Self::Go,
            "java" => Self::Java,
            "c" => Self::C,
            "cpp" | "c++" | "cxx" => Self::Cpp,
            "csharp" | "c#" | "cs" => Self::CSharp,
            "ruby" | "rb" => Self::Ruby,
            "markdown" | "md" => Self::Markdown,
            "xml" | "svg" => Self::Xml,
            "html" | "htm" => Self::Html,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Unknown,
        }
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Markdown => "markdown",
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this language has a grammar wired in for AST parsing
    pub fn supports_ast(self) -> bool {
        matches!(
            self,
            Self::Rust | Self::Python | Self::JavaScript | Self::TypeScript
        )
    }

    /// Markup languages balanced by tags rather than braces
    pub fn is_markup(self) -> bool {
        matches!(self, Self::Xml | Self::Html)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Option<tree_sitter::Language> {
        match self {
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => None,
        }
    }

    /// Get import/use statement prefixes for this language
    pub fn import_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["use ", "extern crate "],
            Self::Python => &["import ", "from "],
            Self::JavaScript | Self::TypeScript => &["import ", "require("],
            Self::Go | Self::Java => &["import "],
            Self::CSharp => &["using "],
            Self::Ruby => &["require ", "include "],
            Self::C | Self::Cpp => &["#include "],
            _ => &[],
        }
    }

    /// Keyword weights feeding the semantic boundary score
    pub fn keyword_weights(self) -> &'static [(&'static str, f32)] {
        match self {
            Self::Rust => &[
                ("fn", 3.0),
                ("impl", 3.0),
                ("struct", 3.0),
                ("enum", 3.0),
                ("trait", 3.0),
                ("mod", 2.5),
                ("match", 1.5),
                ("if", 1.0),
                ("for", 1.0),
                ("while", 1.0),
                ("loop", 1.0),
                ("return", 0.5),
            ],
            Self::Python => &[
                ("def", 3.0),
                ("class", 3.0),
                ("async", 1.0),
                ("if", 1.0),
                ("elif", 1.0),
                ("for", 1.0),
                ("while", 1.0),
                ("try", 1.0),
                ("with", 1.0),
                ("return", 0.5),
            ],
            Self::JavaScript | Self::TypeScript => &[
                ("function", 3.0),
                ("class", 3.0),
                ("interface", 3.0),
                ("export", 1.5),
                ("const", 1.0),
                ("if", 1.0),
                ("for", 1.0),
                ("while", 1.0),
                ("switch", 1.5),
                ("return", 0.5),
            ],
            Self::Go => &[
                ("func", 3.0),
                ("type", 2.5),
                ("struct", 2.0),
                ("if", 1.0),
                ("for", 1.0),
                ("switch", 1.5),
                ("return", 0.5),
            ],
            Self::Java | Self::CSharp | Self::C | Self::Cpp => &[
                ("class", 3.0),
                ("interface", 3.0),
                ("struct", 3.0),
                ("namespace", 2.5),
                ("public", 1.0),
                ("private", 1.0),
                ("static", 1.0),
                ("if", 1.0),
                ("for", 1.0),
                ("while", 1.0),
                ("switch", 1.5),
                ("return", 0.5),
            ],
            Self::Ruby => &[
                ("def", 3.0),
                ("class", 3.0),
                ("module", 2.5),
                ("if", 1.0),
                ("end", 1.0),
            ],
            _ => &[
                ("function", 2.0),
                ("class", 2.0),
                ("if", 1.0),
                ("for", 1.0),
                ("return", 0.5),
            ],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Language::from_name("rust"), Language::Rust);
        assert_eq!(Language::from_name("RS"), Language::Rust);
        assert_eq!(Language::from_name("py"), Language::Python);
        assert_eq!(Language::from_name("TypeScript"), Language::TypeScript);
        assert_eq!(Language::from_name("md"), Language::Markdown);
        assert_eq!(Language::from_name("cobol"), Language::Unknown);
    }

    #[test]
    fn test_supports_ast() {
        assert!(Language::Rust.supports_ast());
        assert!(Language::Python.supports_ast());
        assert!(Language::JavaScript.supports_ast());
        assert!(Language::TypeScript.supports_ast());
        assert!(!Language::Go.supports_ast());
        assert!(!Language::Unknown.supports_ast());
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::Rust.tree_sitter_language().is_some());
        assert!(Language::TypeScript.tree_sitter_language().is_some());
        assert!(Language::Go.tree_sitter_language().is_none());
    }

    #[test]
    fn test_import_patterns() {
        assert!(Language::Rust.import_patterns().contains(&"use "));
        assert!(Language::Python.import_patterns().contains(&"import "));
        assert!(Language::Markdown.import_patterns().is_empty());
    }

    #[test]
    fn test_keyword_weights_present() {
        assert!(Language::Rust
            .keyword_weights()
            .iter()
            .any(|(kw, _)| *kw == "fn"));
        assert!(!Language::Unknown.keyword_weights().is_empty());
    }
}

//! Read-only view over a syntax tree owned by the parsing collaborator.

use crate::language::Language;
use tree_sitter::{Node, Parser, Tree};

/// Outcome of the external parse step
pub struct ParseResult {
    success: bool,
    tree: Option<Tree>,
    language: Language,
}

impl ParseResult {
    /// Wrap a parsed tree. Trees containing error nodes count as failed parses.
    pub fn from_tree(tree: Tree, language: Language) -> Self {
        let success = !tree.root_node().has_error();
        Self {
            success,
            tree: Some(tree),
            language,
        }
    }

    /// A parse that produced nothing usable
    pub fn failed(language: Language) -> Self {
        Self {
            success: false,
            tree: None,
            language,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.tree.is_some()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Root node, only for successful parses
    pub fn root(&self) -> Option<AstNode<'_>> {
        if !self.success {
            return None;
        }
        self.tree.as_ref().map(|tree| AstNode::new(tree.root_node()))
    }
}

impl std::fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseResult")
            .field("success", &self.success)
            .field("has_tree", &self.tree.is_some())
            .field("language", &self.language)
            .finish()
    }
}

/// Node lookup handle. Copying it never copies the tree.
#[derive(Clone, Copy, Debug)]
pub struct AstNode<'t> {
    node: Node<'t>,
}

impl<'t> AstNode<'t> {
    const fn new(node: Node<'t>) -> Self {
        Self { node }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// 1-based first line
    pub fn start_line(&self) -> usize {
        self.node.start_position().row + 1
    }

    /// 1-based last line. A node ending at column 0 ends on the previous line.
    pub fn end_line(&self) -> usize {
        let end = self.node.end_position();
        if end.column == 0 && end.row > self.node.start_position().row {
            end.row
        } else {
            end.row + 1
        }
    }

    pub fn start_byte(&self) -> usize {
        self.node.start_byte()
    }

    pub fn end_byte(&self) -> usize {
        self.node.end_byte()
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start_byte()..self.end_byte()).unwrap_or("")
    }

    pub fn children(&self) -> Vec<AstNode<'t>> {
        let mut cursor = self.node.walk();
        self.node.children(&mut cursor).map(AstNode::new).collect()
    }

    pub fn parent(&self) -> Option<AstNode<'t>> {
        self.node.parent().map(AstNode::new)
    }

    pub fn child_by_field(&self, field: &str) -> Option<AstNode<'t>> {
        self.node.child_by_field_name(field).map(AstNode::new)
    }

    pub fn is_named(&self) -> bool {
        self.node.is_named()
    }

    /// Stable id within one tree: kind plus byte span
    pub fn id(&self) -> String {
        format!("{}:{}-{}", self.kind(), self.start_byte(), self.end_byte())
    }

    /// Name of the declared symbol, if the node declares one
    pub fn symbol_name(&self, source: &str) -> Option<String> {
        if let Some(name) = self.child_by_field("name") {
            return Some(name.text(source).to_string());
        }

        // impl blocks: `impl<T> Target<T>` is named after Target
        if let Some(target) = self.child_by_field("type") {
            let base = target
                .children()
                .into_iter()
                .find(|child| child.kind() == "type_identifier")
                .unwrap_or(target);
            return Some(base.text(source).to_string());
        }

        let children = self.children();
        if let Some(declarator) = children
            .iter()
            .find(|child| child.kind() == "variable_declarator")
        {
            return declarator.symbol_name(source);
        }
        children
            .into_iter()
            .find(|child| {
                matches!(
                    child.kind(),
                    "identifier" | "name" | "type_identifier" | "field_identifier"
                )
            })
            .map(|child| child.text(source).to_string())
    }

    /// Every node below this one, depth-first
    pub fn descendants(&self) -> Vec<AstNode<'t>> {
        let mut out = Vec::new();
        let mut stack = self.children();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children = node.children();
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

/// Thin adapter over tree-sitter producing [`ParseResult`]s
pub struct SyntaxParser;

impl SyntaxParser {
    /// Parse `content`. Languages without a grammar yield a failed result.
    pub fn parse(content: &str, language: Language) -> ParseResult {
        let Some(ts_language) = language.tree_sitter_language() else {
            return ParseResult::failed(language);
        };

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&ts_language) {
            log::warn!("Failed to set {language} grammar: {e}");
            return ParseResult::failed(language);
        }

        match parser.parse(content, None) {
            Some(tree) => ParseResult::from_tree(tree, language),
            None => ParseResult::failed(language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rust() {
        let code = "fn main() {\n    println!(\"hi\");\n}\n";
        let parsed = SyntaxParser::parse(code, Language::Rust);
        assert!(parsed.is_success());

        let root = parsed.root().unwrap();
        let func = root.children().into_iter().next().unwrap();
        assert_eq!(func.kind(), "function_item");
        assert_eq!(func.start_line(), 1);
        assert_eq!(func.end_line(), 3);
        assert_eq!(func.symbol_name(code).as_deref(), Some("main"));
        assert!(func.parent().is_some());
    }

    #[test]
    fn test_malformed_input_is_not_success() {
        let parsed = SyntaxParser::parse("fn broken( {{{ let", Language::Rust);
        assert!(!parsed.is_success());
        assert!(parsed.root().is_none());
    }

    #[test]
    fn test_language_without_grammar() {
        let parsed = SyntaxParser::parse("package main", Language::Go);
        assert!(!parsed.is_success());
    }

    #[test]
    fn test_node_ids_are_unique_per_span() {
        let code = "fn a() {}\nfn b() {}\n";
        let parsed = SyntaxParser::parse(code, Language::Rust);
        let root = parsed.root().unwrap();
        let ids: Vec<String> = root.children().iter().map(AstNode::id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}

//! Structural types recognised in syntax trees and their single mapping
//! onto [`ChunkType`].

use crate::language::Language;
use crate::types::ChunkType;
use serde::{Deserialize, Serialize};

/// Source-level construct a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralType {
    Function,
    Method,
    Constructor,
    Class,
    Struct,
    Trait,
    Interface,
    Impl,
    Enum,
    Import,
    Export,
    TypeAlias,
    TypeDef,
    Module,
    Namespace,
    Constant,
    Variable,
    Union,
    Decorator,
    Macro,
    Comment,
    DocComment,
    ControlFlow,
    Expression,
    Block,
    Call,
    ConfigEntry,
}

impl From<StructuralType> for ChunkType {
    fn from(value: StructuralType) -> Self {
        // No wildcard arm: a new StructuralType must be mapped here to compile.
        match value {
            StructuralType::Function => Self::Function,
            StructuralType::Method | StructuralType::Constructor => Self::Method,
            StructuralType::Class | StructuralType::Struct | StructuralType::Impl => Self::Class,
            StructuralType::Trait | StructuralType::Interface => Self::Interface,
            StructuralType::Enum => Self::Enum,
            StructuralType::Import => Self::Import,
            StructuralType::Export => Self::Export,
            StructuralType::TypeAlias => Self::Type,
            StructuralType::TypeDef => Self::TypeDef,
            StructuralType::Module | StructuralType::Namespace => Self::Module,
            StructuralType::Constant | StructuralType::Variable => Self::Variable,
            StructuralType::Union => Self::Union,
            StructuralType::Decorator => Self::Annotation,
            StructuralType::Macro => Self::Function,
            StructuralType::Comment => Self::Comment,
            StructuralType::DocComment => Self::Documentation,
            StructuralType::ControlFlow => Self::ControlFlow,
            StructuralType::Expression => Self::Expression,
            StructuralType::Block => Self::Block,
            StructuralType::Call => Self::Call,
            StructuralType::ConfigEntry => Self::ConfigItem,
        }
    }
}

impl StructuralType {
    /// Declarations whose bodies hold member declarations
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Struct
                | Self::Trait
                | Self::Interface
                | Self::Impl
                | Self::Module
                | Self::Namespace
        )
    }

    /// Containers whose member functions are methods
    pub const fn is_class_like(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Trait | Self::Interface | Self::Impl
        )
    }

    pub const fn is_callable(self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::Constructor | Self::Macro
        )
    }

    /// Nodes glued onto the declaration that follows them
    pub const fn is_attachable(self) -> bool {
        matches!(self, Self::Comment | Self::DocComment | Self::Decorator)
    }

    /// Which per-kind threshold set applies
    pub const fn threshold_kind(self) -> ThresholdKind {
        match self {
            Self::Function | Self::Method | Self::Constructor | Self::Macro => {
                ThresholdKind::Function
            }
            Self::Class
            | Self::Struct
            | Self::Trait
            | Self::Interface
            | Self::Impl
            | Self::Enum
            | Self::Union
            | Self::Module
            | Self::Namespace => ThresholdKind::Class,
            Self::Import => ThresholdKind::Import,
            _ => ThresholdKind::Other,
        }
    }
}

/// Threshold buckets configured in `AstConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    Function,
    Class,
    Import,
    Other,
}

/// Role of a node kind within one language family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Declaration(StructuralType),
    /// Export/decorator wrappers: the declaration sits inside
    Wrapper,
    Other,
}

/// Grammar families with node tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    Rust,
    Python,
    JavaScript,
    TypeScript,
}

impl LanguageFamily {
    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Rust => Some(Self::Rust),
            Language::Python => Some(Self::Python),
            Language::JavaScript => Some(Self::JavaScript),
            Language::TypeScript => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Classify a tree-sitter node kind
    pub fn classify(self, kind: &str) -> NodeRole {
        use StructuralType as S;

        let structural = match self {
            Self::Rust => match kind {
                "function_item" => S::Function,
                "function_signature_item" => S::Method,
                "struct_item" => S::Struct,
                "enum_item" => S::Enum,
                "union_item" => S::Union,
                "trait_item" => S::Trait,
                "impl_item" => S::Impl,
                "mod_item" => S::Module,
                "type_item" => S::TypeAlias,
                "const_item" => S::Constant,
                "static_item" => S::Variable,
                "use_declaration" | "extern_crate_declaration" => S::Import,
                "macro_definition" => S::Macro,
                "attribute_item" | "inner_attribute_item" => S::Decorator,
                "line_comment" | "block_comment" => S::Comment,
                "if_expression" | "match_expression" | "for_expression"
                | "while_expression" | "loop_expression" => S::ControlFlow,
                "macro_invocation" | "call_expression" => S::Call,
                _ => return NodeRole::Other,
            },
            Self::Python => match kind {
                "function_definition" => S::Function,
                "class_definition" => S::Class,
                "decorated_definition" => return NodeRole::Wrapper,
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    S::Import
                }
                "decorator" => S::Decorator,
                "comment" => S::Comment,
                "if_statement" | "for_statement" | "while_statement" | "try_statement"
                | "with_statement" | "match_statement" => S::ControlFlow,
                "call" => S::Call,
                _ => return NodeRole::Other,
            },
            Self::JavaScript | Self::TypeScript => match kind {
                "function_declaration" | "generator_function_declaration" => S::Function,
                "class_declaration" => S::Class,
                "method_definition" => S::Method,
                "import_statement" => S::Import,
                "export_statement" => return NodeRole::Wrapper,
                "lexical_declaration" | "variable_declaration" => S::Variable,
                "comment" => S::Comment,
                "decorator" => S::Decorator,
                "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
                | "do_statement" | "switch_statement" | "try_statement" => S::ControlFlow,
                "call_expression" => S::Call,
                _ if self == Self::TypeScript => match kind {
                    "interface_declaration" => S::Interface,
                    "enum_declaration" => S::Enum,
                    "type_alias_declaration" => S::TypeAlias,
                    "abstract_class_declaration" => S::Class,
                    "internal_module" | "module" => S::Namespace,
                    "function_signature" => S::Function,
                    "method_signature" | "abstract_method_signature" => S::Method,
                    "ambient_declaration" => return NodeRole::Wrapper,
                    _ => return NodeRole::Other,
                },
                _ => return NodeRole::Other,
            },
        };

        NodeRole::Declaration(structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [StructuralType; 27] = [
        StructuralType::Function,
        StructuralType::Method,
        StructuralType::Constructor,
        StructuralType::Class,
        StructuralType::Struct,
        StructuralType::Trait,
        StructuralType::Interface,
        StructuralType::Impl,
        StructuralType::Enum,
        StructuralType::Import,
        StructuralType::Export,
        StructuralType::TypeAlias,
        StructuralType::TypeDef,
        StructuralType::Module,
        StructuralType::Namespace,
        StructuralType::Constant,
        StructuralType::Variable,
        StructuralType::Union,
        StructuralType::Decorator,
        StructuralType::Macro,
        StructuralType::Comment,
        StructuralType::DocComment,
        StructuralType::ControlFlow,
        StructuralType::Expression,
        StructuralType::Block,
        StructuralType::Call,
        StructuralType::ConfigEntry,
    ];

    #[test]
    fn test_every_structural_type_maps() {
        for structural in ALL {
            let chunk_type = ChunkType::from(structural);
            if !matches!(
                structural,
                StructuralType::Block | StructuralType::Expression | StructuralType::ControlFlow
            ) {
                assert!(chunk_type.is_structural(), "{structural:?} -> {chunk_type}");
            }
        }
    }

    #[test]
    fn test_specific_mappings() {
        assert_eq!(ChunkType::from(StructuralType::Struct), ChunkType::Class);
        assert_eq!(ChunkType::from(StructuralType::Trait), ChunkType::Interface);
        assert_eq!(ChunkType::from(StructuralType::TypeAlias), ChunkType::Type);
        assert_eq!(ChunkType::from(StructuralType::TypeDef), ChunkType::TypeDef);
        assert_eq!(ChunkType::from(StructuralType::Decorator), ChunkType::Annotation);
    }

    #[test]
    fn test_classify_rust() {
        let family = LanguageFamily::Rust;
        assert_eq!(
            family.classify("function_item"),
            NodeRole::Declaration(StructuralType::Function)
        );
        assert_eq!(
            family.classify("use_declaration"),
            NodeRole::Declaration(StructuralType::Import)
        );
        assert_eq!(family.classify("expression_statement"), NodeRole::Other);
    }

    #[test]
    fn test_typescript_extends_javascript() {
        assert_eq!(
            LanguageFamily::TypeScript.classify("interface_declaration"),
            NodeRole::Declaration(StructuralType::Interface)
        );
        assert_eq!(
            LanguageFamily::JavaScript.classify("interface_declaration"),
            NodeRole::Other
        );
        assert_eq!(
            LanguageFamily::TypeScript.classify("export_statement"),
            NodeRole::Wrapper
        );
    }
}

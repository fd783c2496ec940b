//! Parsed syntax consumed by the linker.
//!
//! The parser lives outside this workspace; these types are its output
//! contract. A library arrives as one or more [`ParsedUnit`]s, each holding a
//! [`CompilationUnit`] with directives, top-level declarations, and the
//! expression arena their initializers, arguments, and bodies point into.
//!
//! Only the declaration-level shape is modelled in detail. Expressions carry
//! enough structure for constant evaluation, macro arguments, top-level
//! inference, and the super-invocation scan of mixin bodies.

mod decls;
mod directives;
mod expr;
mod types;

pub use decls::{
    Annotation, ClassDecl, ClassModifiers, ConstructorDecl, ConstructorInitializer, Declaration,
    EnumConstantDecl, EnumDecl, FieldDecl, FunctionDecl, Member, MethodDecl, MethodKind,
    MixinDecl, Param, ParamKind, TypeAliasDecl, TypeParam, VariableDecl,
};
pub use directives::{Combinator, Directive, ExportDirective, ImportDirective, PartDirective};
pub use expr::{Argument, BinaryOp, CollectionElement, Expr, ExprArena, ExprId, ExprKind};
pub use types::TypeAnnotation;

use crate::Name;

/// One compilation unit: directives, declarations, and their expressions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilationUnit {
    /// Import, export, and part directives in source order.
    pub directives: Vec<Directive>,
    /// Top-level declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Storage for every expression referenced from this unit.
    pub arena: ExprArena,
}

impl CompilationUnit {
    /// Create an empty unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate import directives.
    pub fn imports(&self) -> impl Iterator<Item = &ImportDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Import(import) => Some(import),
            _ => None,
        })
    }

    /// Iterate export directives.
    pub fn exports(&self) -> impl Iterator<Item = &ExportDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Export(export) => Some(export),
            _ => None,
        })
    }

    /// Iterate part directives.
    pub fn parts(&self) -> impl Iterator<Item = &PartDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Part(part) => Some(part),
            _ => None,
        })
    }
}

/// A parsed unit as handed to the linker.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedUnit {
    /// URI of the unit (the library URI for the defining unit).
    pub uri: Name,
    /// Raw source text, when the caller kept it.
    pub text: Option<String>,
    /// Whether the unit was synthesized rather than read from disk.
    pub is_synthetic: bool,
    /// The syntax tree.
    pub unit: CompilationUnit,
}

impl ParsedUnit {
    /// Create a non-synthetic unit without source text.
    pub fn new(uri: Name, unit: CompilationUnit) -> Self {
        Self {
            uri,
            text: None,
            is_synthetic: false,
            unit,
        }
    }
}

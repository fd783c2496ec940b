//! Elk IR - Names and Parsed Syntax
//!
//! This crate contains the data the linker consumes:
//! - Names for interned identifiers, URIs, and string literals
//! - Spans for source locations
//! - The parsed syntax model (units, directives, declarations, type
//!   annotations) produced by an external parser
//! - Arena allocation for expressions
//! - Stack growth for recursive walks over that syntax
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → Name(u32)
//! - **Flatten Expressions**: No Box<Expr>, use ExprId(u32) indices
//! - **Syntax Is Read-Only**: the linker never rewrites a parsed unit; it
//!   only records paths into it until elements are detached.
//!
//! Types that contain floats store them as u64 bits for Hash compatibility.

pub mod ast;
mod interner;
mod name;
mod span;
pub mod stack;

pub use ast::{
    Annotation, Argument, BinaryOp, ClassDecl, ClassModifiers, CollectionElement, Combinator,
    CompilationUnit, ConstructorDecl, ConstructorInitializer, Declaration, Directive,
    EnumConstantDecl, EnumDecl, ExportDirective, Expr, ExprArena, ExprId, ExprKind, FieldDecl,
    FunctionDecl, ImportDirective, Member, MethodDecl, MethodKind, MixinDecl, Param, ParamKind,
    ParsedUnit, PartDirective, TypeAliasDecl, TypeAnnotation, TypeParam, VariableDecl,
};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::Span;
pub use stack::ensure_sufficient_stack;

//! Type annotations as written in source.

use crate::{Name, Span};

/// A type annotation.
///
/// Names are unresolved: `prefix.Name<Args>?` is just three interned names
/// and a list of nested annotations until the linker's types pass runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeAnnotation {
    /// `Name`, `prefix.Name<A, B>`, `Name?`.
    Named {
        prefix: Option<Name>,
        name: Name,
        args: Vec<TypeAnnotation>,
        nullable: bool,
        span: Span,
    },
    /// `R Function(P1, P2)`.
    Function {
        return_type: Box<TypeAnnotation>,
        params: Vec<TypeAnnotation>,
        nullable: bool,
        span: Span,
    },
}

impl TypeAnnotation {
    /// Non-nullable, unprefixed reference without type arguments.
    pub fn named(name: Name) -> Self {
        TypeAnnotation::Named {
            prefix: None,
            name,
            args: Vec::new(),
            nullable: false,
            span: Span::DUMMY,
        }
    }

    /// Non-nullable, unprefixed reference with type arguments.
    pub fn generic(name: Name, args: Vec<TypeAnnotation>) -> Self {
        TypeAnnotation::Named {
            prefix: None,
            name,
            args,
            nullable: false,
            span: Span::DUMMY,
        }
    }

    /// Function type annotation.
    pub fn function(return_type: TypeAnnotation, params: Vec<TypeAnnotation>) -> Self {
        TypeAnnotation::Function {
            return_type: Box::new(return_type),
            params,
            nullable: false,
            span: Span::DUMMY,
        }
    }

    /// The same annotation marked nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        match &mut self {
            TypeAnnotation::Named { nullable, .. } | TypeAnnotation::Function { nullable, .. } => {
                *nullable = true;
            }
        }
        self
    }

    /// Source span.
    pub fn span(&self) -> Span {
        match self {
            TypeAnnotation::Named { span, .. } | TypeAnnotation::Function { span, .. } => *span,
        }
    }
}

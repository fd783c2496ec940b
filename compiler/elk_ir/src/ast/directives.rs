//! Library directives.

use crate::{Name, Span};

/// A directive at the top of a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Import(ImportDirective),
    Export(ExportDirective),
    Part(PartDirective),
}

/// `import 'uri' as prefix show A hide B;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDirective {
    pub uri: Name,
    pub prefix: Option<Name>,
    pub combinators: Vec<Combinator>,
    pub span: Span,
}

/// `export 'uri' show A hide B;`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportDirective {
    pub uri: Name,
    pub combinators: Vec<Combinator>,
    pub span: Span,
}

/// `part 'uri';`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartDirective {
    pub uri: Name,
    pub span: Span,
}

/// A `show` or `hide` clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Combinator {
    Show(Vec<Name>),
    Hide(Vec<Name>),
}

impl ImportDirective {
    /// Unprefixed import without combinators.
    pub fn new(uri: Name) -> Self {
        Self {
            uri,
            prefix: None,
            combinators: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

impl ExportDirective {
    /// Export without combinators.
    pub fn new(uri: Name) -> Self {
        Self {
            uri,
            combinators: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

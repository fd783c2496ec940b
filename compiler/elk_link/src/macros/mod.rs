//! Macro type phase.
//!
//! The linker applies user macros to classes before export scopes are
//! computed, so declarations a macro generates are visible to importers like
//! any other declaration.
//!
//! # Data Flow
//!
//! ```text
//! class C with @Gen(x: 1)
//!     │ resolve `Gen` through imports of linked libraries only
//!     ▼
//! evaluate_arguments ──► MacroArguments
//!     │
//!     ▼
//! MacroExecutor::execute_types_phase(MacroRequest { ClassIntrospection, .. })
//!     │ awaited; the only suspension point of a link
//!     ▼
//! MacroExecution::{Applied(MacroResult), Failed(MacroExecutionError)}
//!     │ fragments accumulate per library
//!     ▼
//! augmentation source ──► AugmentationParser ──► build_augmentation
//! ```
//!
//! A macro never sees the element store. It receives a snapshot of the
//! class as written and returns source text.

mod applier;
mod arguments;

pub(crate) use applier::execute_macro_types_phase;
pub use arguments::{evaluate_argument, evaluate_arguments, ArgValue, ArgumentError, MacroArguments};

use std::fmt;
use std::future::Future;

use elk_ir::CompilationUnit;
use serde::{Deserialize, Serialize};

/// A type annotation as written, with names spelled out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeAnnotationView {
    Named {
        prefix: Option<String>,
        name: String,
        args: Vec<TypeAnnotationView>,
        nullable: bool,
    },
    Function {
        return_type: Box<TypeAnnotationView>,
        params: Vec<TypeAnnotationView>,
        nullable: bool,
    },
}

impl fmt::Display for TypeAnnotationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_list = |f: &mut fmt::Formatter<'_>, items: &[TypeAnnotationView]| -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        };
        let nullable = match self {
            TypeAnnotationView::Named {
                prefix,
                name,
                args,
                nullable,
            } => {
                if let Some(prefix) = prefix {
                    write!(f, "{prefix}.")?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_list(f, args)?;
                    f.write_str(">")?;
                }
                *nullable
            }
            TypeAnnotationView::Function {
                return_type,
                params,
                nullable,
            } => {
                write!(f, "{return_type} Function(")?;
                write_list(f, params)?;
                f.write_str(")")?;
                *nullable
            }
        };
        if nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParameterView {
    pub name: String,
    pub bound: Option<TypeAnnotationView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldView {
    pub name: String,
    pub ty: Option<TypeAnnotationView>,
    pub is_static: bool,
    pub is_final: bool,
    pub is_const: bool,
}

/// Read-only view of a class handed to a macro.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassIntrospection {
    pub library: String,
    pub name: String,
    pub type_params: Vec<TypeParameterView>,
    pub superclass: Option<TypeAnnotationView>,
    pub interfaces: Vec<TypeAnnotationView>,
    pub mixins: Vec<TypeAnnotationView>,
    pub fields: Vec<FieldView>,
    pub is_abstract: bool,
}

/// One macro application to run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroRequest {
    /// Library declaring the macro class.
    pub macro_library: String,
    pub macro_class: String,
    /// Empty for the unnamed constructor.
    pub constructor: String,
    pub arguments: MacroArguments,
    /// Position of the annotation on the class.
    pub annotation_index: u32,
    pub target: ClassIntrospection,
}

/// Source text a macro generated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroResult {
    /// Top-level declarations.
    pub library_fragments: Vec<String>,
    /// Members added to the annotated class.
    pub class_fragments: Vec<String>,
}

impl MacroResult {
    pub fn is_empty(&self) -> bool {
        self.library_fragments.is_empty() && self.class_fragments.is_empty()
    }
}

/// A macro that raised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroExecutionError {
    pub message: String,
    pub stack_trace: String,
}

impl MacroExecutionError {
    #[cold]
    pub fn new(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        MacroExecutionError {
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }
}

/// Outcome of one macro application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MacroExecution {
    Applied(MacroResult),
    Failed(MacroExecutionError),
}

/// Runs macros on behalf of the linker.
pub trait MacroExecutor {
    /// Run the types phase of one application.
    fn execute_types_phase(&self, request: &MacroRequest) -> impl Future<Output = MacroExecution>;
}

impl<E: MacroExecutor> MacroExecutor for &E {
    fn execute_types_phase(&self, request: &MacroRequest) -> impl Future<Output = MacroExecution> {
        (**self).execute_types_phase(request)
    }
}

/// Executor for hosts without macro support; every application generates
/// nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoMacroExecutor;

impl MacroExecutor for NoMacroExecutor {
    fn execute_types_phase(&self, _request: &MacroRequest) -> impl Future<Output = MacroExecution> {
        std::future::ready(MacroExecution::Applied(MacroResult::default()))
    }
}

/// Parses macro-generated augmentation source.
pub trait AugmentationParser {
    fn parse(&self, uri: &str, source: &str) -> Result<CompilationUnit, String>;
}

/// A merged augmentation unit generated for one library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroGeneratedUnit {
    pub library: String,
    pub uri: String,
    pub source: String,
}

//! Element model for the elk linker.
//!
//! Elements are the declared symbols of a library (classes, mixins, enums,
//! type aliases, functions, variables, members, parameters, type
//! parameters). They live in one arena, the [`ElementStore`], and refer to
//! each other by [`ElementId`]. Libraries are registered in the same store
//! and own an [`ExportScope`].
//!
//! # Lifecycle
//!
//! ```text
//! LibraryState::Building   elements created empty by the builder,
//!                          filled in by successive link passes
//!        │ detach
//!        ▼
//! LibraryState::Linked     immutable; visible to later batches
//! ```
//!
//! A batch writes through a [`StoreGuard`], which rolls the store back to
//! its checkpoint unless the batch commits. A failed or cancelled link
//! therefore never leaves half-built libraries behind.

mod constant;
mod element;
mod flags;
mod ids;
mod scope;
mod store;
mod types;

pub use constant::ConstExpr;
pub use element::{
    Element, ElementAnnotation, ElementData, ElementKind, ExecutableData, InterfaceData,
    MacroApplicationError, ParameterData, ParameterKind, TypeAliasData, TypeParameterData,
    VariableData,
};
pub use flags::ElementFlags;
pub use ids::{ElementId, LibraryId};
pub use scope::{ExportConflictPolicy, ExportScope, ExportWrite, ExportedSymbol, NameFilter, SymbolOrigin};
pub use store::{
    Checkpoint, ElementStore, ExportEntry, ImportEntry, LibraryEntry, LibraryState, StoreGuard,
    UnitEntry,
};
pub use types::{LinkedType, Variance};

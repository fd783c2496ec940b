//! Link errors.
//!
//! Two levels:
//! - [`LinkError`] aborts the whole batch; the store is rolled back.
//! - [`LibraryError`] is attributed to one library and recorded in the
//!   link output. Sibling libraries keep linking.
//!
//! Macro failures are a third level that never leaves the class they occur
//! on; see [`elk_element::MacroApplicationError`].

use std::fmt;

/// A failure that affects shared state and aborts the batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// Two inputs, or an input and a linked library, share a URI.
    DuplicateLibrary { uri: String },
    /// `dart:core` is neither linked nor part of the batch.
    MissingCoreLibrary { uri: String },
    /// A type the type provider needs is not exported by its library.
    CoreTypeMissing { library: String, name: String },
    /// Export propagation did not reach a fixed point.
    ExportsDiverged { rounds: u32 },
    /// The bundle writer failed.
    Bundle(BundleError),
}

impl LinkError {
    #[cold]
    pub fn duplicate_library(uri: impl Into<String>) -> Self {
        LinkError::DuplicateLibrary { uri: uri.into() }
    }

    #[cold]
    pub fn missing_core_library(uri: impl Into<String>) -> Self {
        LinkError::MissingCoreLibrary { uri: uri.into() }
    }

    #[cold]
    pub fn core_type_missing(library: impl Into<String>, name: impl Into<String>) -> Self {
        LinkError::CoreTypeMissing {
            library: library.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::DuplicateLibrary { uri } => {
                write!(f, "library '{uri}' is linked more than once")
            }
            LinkError::MissingCoreLibrary { uri } => {
                write!(f, "required library '{uri}' is neither linked nor in the batch")
            }
            LinkError::CoreTypeMissing { library, name } => {
                write!(f, "type '{name}' is not exported by '{library}'")
            }
            LinkError::ExportsDiverged { rounds } => {
                write!(f, "export scopes did not converge after {rounds} rounds")
            }
            LinkError::Bundle(err) => write!(f, "bundle serialization failed: {err}"),
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkError::Bundle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BundleError> for LinkError {
    fn from(err: BundleError) -> Self {
        LinkError::Bundle(err)
    }
}

/// Kind of library-local failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LibraryErrorKind {
    /// A declaration shape the builder does not support where it appears.
    MalformedDeclaration,
    /// A name declared twice in the same scope.
    DuplicateDeclaration,
    /// A `part` directive naming a unit that was not supplied.
    MissingPart,
    /// `augment class X` where the library declares no class `X`.
    UnknownAugmentationTarget,
}

impl LibraryErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryErrorKind::MalformedDeclaration => "malformed declaration",
            LibraryErrorKind::DuplicateDeclaration => "duplicate declaration",
            LibraryErrorKind::MissingPart => "missing part",
            LibraryErrorKind::UnknownAugmentationTarget => "unknown augmentation target",
        }
    }
}

/// A failure attributed to one library of the batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryError {
    /// URI of the library.
    pub library: String,
    pub kind: LibraryErrorKind,
    pub message: String,
}

impl LibraryError {
    #[cold]
    pub fn new(
        library: impl Into<String>,
        kind: LibraryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        LibraryError {
            library: library.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.library, self.kind.as_str(), self.message)
    }
}

impl std::error::Error for LibraryError {}

/// Encoding or decoding of a resolved bundle failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundleError {
    Encode(String),
    Decode(String),
    /// An element refers to an element the store does not know.
    DanglingReference { element: u32 },
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Encode(msg) => write!(f, "failed to encode bundle: {msg}"),
            BundleError::Decode(msg) => write!(f, "failed to decode bundle: {msg}"),
            BundleError::DanglingReference { element } => {
                write!(f, "element e{element} belongs to no library")
            }
        }
    }
}

impl std::error::Error for BundleError {}

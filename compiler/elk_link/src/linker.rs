//! Shared mutable state of one link batch.
//!
//! ```text
//! Linker
//! ├── Shared Context
//! │   ├── store: &mut ElementStore   (elements and libraries)
//! │   ├── interner: &StringInterner  (names)
//! │   └── config: &LinkConfig
//! │
//! ├── Batch
//! │   ├── builders: Vec<LibraryBuilder>  (one per input library)
//! │   ├── node_map: NodeMap              (element ↔ syntax, until detach)
//! │   └── scopes: Vec<ImportScope>       (per builder, from step 4)
//! │
//! └── Diagnostics
//!     └── errors: Vec<LibraryError>
//! ```
//!
//! Passes are free functions over `&mut Linker`; they destructure it to
//! borrow syntax and the store at the same time.

use elk_element::{ElementId, ElementStore, LibraryId};
use elk_ir::{Name, StringInterner};

use crate::builder::LibraryBuilder;
use crate::names::WellKnownNames;
use crate::node_map::NodeMap;
use crate::scope::ImportScope;
use crate::{LibraryError, LibraryErrorKind, LinkConfig};

pub(crate) struct Linker<'a> {
    pub store: &'a mut ElementStore,
    pub interner: &'a StringInterner,
    pub config: &'a LinkConfig,
    pub names: WellKnownNames,
    pub builders: Vec<LibraryBuilder>,
    pub node_map: NodeMap,
    pub scopes: Vec<ImportScope>,
    pub errors: Vec<LibraryError>,
}

impl<'a> Linker<'a> {
    pub fn new(
        store: &'a mut ElementStore,
        interner: &'a StringInterner,
        config: &'a LinkConfig,
    ) -> Self {
        Linker {
            store,
            interner,
            config,
            names: WellKnownNames::new(interner),
            builders: Vec::new(),
            node_map: NodeMap::new(),
            scopes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Library ids of the batch, in input order.
    pub fn batch(&self) -> Vec<LibraryId> {
        self.builders.iter().map(|b| b.id).collect()
    }

    /// Every element owned by batch libraries, in allocation order.
    pub fn batch_elements(&self) -> Vec<ElementId> {
        self.builders
            .iter()
            .flat_map(|b| self.store.library(b.id).elements.iter().copied())
            .collect()
    }
}

/// Record a library-local failure.
pub(crate) fn report(
    errors: &mut Vec<LibraryError>,
    interner: &StringInterner,
    library_uri: Name,
    kind: LibraryErrorKind,
    message: String,
) {
    let error = LibraryError::new(interner.lookup(library_uri), kind, message);
    tracing::warn!(library = %error.library, kind = kind.as_str(), "{}", error.message);
    errors.push(error);
}

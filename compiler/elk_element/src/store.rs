//! The element arena and library registry.
//!
//! Every element and library of a session lives here. Ids are dense
//! indices; libraries record the ids of the elements they own so the
//! bundle writer can number them locally.
//!
//! A link batch takes a [`StoreGuard`]. Dropping the guard without calling
//! [`StoreGuard::commit`] truncates the store back to its state before the
//! batch, which is how failed and cancelled links discard their work.

use std::ops::{Deref, DerefMut};

use elk_ir::Name;
use rustc_hash::FxHashMap;

use crate::{Element, ElementId, ExportScope, LibraryId, NameFilter};

/// Link state of a library.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LibraryState {
    /// Part of the current batch; elements are still being filled in.
    #[default]
    Building,
    /// Detached and immutable.
    Linked,
}

/// A compilation unit of a library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitEntry {
    pub uri: Name,
    pub is_synthetic: bool,
    /// Macro-generated augmentation unit.
    pub is_augmentation: bool,
}

/// A resolved `import` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    pub uri: Name,
    /// `None` when the URI names no known library.
    pub target: Option<LibraryId>,
    pub prefix: Option<Name>,
    pub filters: Vec<NameFilter>,
    /// Added by the linker (`dart:core`).
    pub is_implicit: bool,
}

/// A resolved `export` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportEntry {
    pub uri: Name,
    pub target: Option<LibraryId>,
    pub filters: Vec<NameFilter>,
}

/// A library registered in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryEntry {
    pub id: LibraryId,
    pub uri: Name,
    pub units: Vec<UnitEntry>,
    /// Top-level declarations in unit and source order.
    pub declarations: Vec<ElementId>,
    /// Every element owned by the library, in allocation order.
    pub elements: Vec<ElementId>,
    pub imports: Vec<ImportEntry>,
    pub exports: Vec<ExportEntry>,
    pub export_scope: ExportScope,
    pub state: LibraryState,
}

impl LibraryEntry {
    fn new(id: LibraryId, uri: Name) -> Self {
        LibraryEntry {
            id,
            uri,
            units: Vec::new(),
            declarations: Vec::new(),
            elements: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            export_scope: ExportScope::new(),
            state: LibraryState::Building,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.state == LibraryState::Linked
    }
}

/// Position to roll the store back to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    elements: usize,
    libraries: usize,
}

/// Arena of elements and libraries.
#[derive(Clone, Debug, Default)]
pub struct ElementStore {
    elements: Vec<Element>,
    libraries: Vec<LibraryEntry>,
    by_uri: FxHashMap<Name, LibraryId>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library. Returns `None` if the URI is already taken.
    pub fn add_library(&mut self, uri: Name) -> Option<LibraryId> {
        if self.by_uri.contains_key(&uri) {
            return None;
        }
        let id = LibraryId::from_raw(u32::try_from(self.libraries.len()).ok()?);
        self.libraries.push(LibraryEntry::new(id, uri));
        self.by_uri.insert(uri, id);
        Some(id)
    }

    /// Allocate an element and record it in its library.
    ///
    /// # Panics
    /// Panics if the store holds more than `u32::MAX` elements.
    pub fn alloc(&mut self, element: Element) -> ElementId {
        let index = u32::try_from(self.elements.len())
            .unwrap_or_else(|_| panic!("element store overflow: {} elements", self.elements.len()));
        let id = ElementId::from_raw(index);
        let library = element.library;
        self.elements.push(element);
        self.libraries[library.index()].elements.push(id);
        id
    }

    #[inline]
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index()]
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn library(&self, id: LibraryId) -> &LibraryEntry {
        &self.libraries[id.index()]
    }

    #[inline]
    pub fn library_mut(&mut self, id: LibraryId) -> &mut LibraryEntry {
        &mut self.libraries[id.index()]
    }

    pub fn library_by_uri(&self, uri: Name) -> Option<LibraryId> {
        self.by_uri.get(&uri).copied()
    }

    pub fn libraries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.libraries.iter()
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    /// Current position, for a later [`rollback`](Self::rollback).
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            elements: self.elements.len(),
            libraries: self.libraries.len(),
        }
    }

    /// Discard every library and element created after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        for library in self.libraries.drain(checkpoint.libraries..) {
            self.by_uri.remove(&library.uri);
        }
        self.elements.truncate(checkpoint.elements);
        for library in &mut self.libraries {
            library
                .elements
                .retain(|id| id.index() < checkpoint.elements);
        }
    }

    /// Start a batch that rolls back unless committed.
    pub fn guard(&mut self) -> StoreGuard<'_> {
        let checkpoint = self.checkpoint();
        StoreGuard {
            store: self,
            checkpoint,
            committed: false,
        }
    }
}

/// Exclusive batch access to an [`ElementStore`].
pub struct StoreGuard<'s> {
    store: &'s mut ElementStore,
    checkpoint: Checkpoint,
    committed: bool,
}

impl StoreGuard<'_> {
    /// Keep everything written through the guard.
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Position the guard will roll back to.
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }
}

impl Deref for StoreGuard<'_> {
    type Target = ElementStore;

    fn deref(&self) -> &ElementStore {
        self.store
    }
}

impl DerefMut for StoreGuard<'_> {
    fn deref_mut(&mut self) -> &mut ElementStore {
        self.store
    }
}

impl Drop for StoreGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.rollback(self.checkpoint);
        }
    }
}

#[cfg(test)]
mod tests;

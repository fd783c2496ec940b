//! Library scopes: export scopes and import scopes.
//!
//! Export scopes are what a library shows to importers; they are seeded from
//! the library's own public declarations and then closed over `export`
//! directives by [`propagate_export_scopes`]. Import scopes are what a
//! library sees: its own declarations first, then the export scopes of its
//! imports, with prefixed imports kept apart.

mod propagate;

pub use propagate::propagate_export_scopes;

use elk_element::{ElementId, ElementStore, NameFilter};
use elk_ir::Name;
use rustc_hash::FxHashMap;

use crate::builder::LibraryBuilder;
use crate::linker::Linker;
use crate::names::is_private;

/// Seed library `lib`'s export scope with its public top-level declarations.
#[tracing::instrument(level = "debug", skip_all, fields(
    library = linker.interner.lookup(linker.builders[lib].uri),
))]
pub(crate) fn build_initial_export_scope(linker: &mut Linker<'_>, lib: usize) {
    let builder = &linker.builders[lib];
    let declarations = linker.store.library(builder.id).declarations.clone();
    let mut scope = std::mem::take(&mut linker.store.library_mut(builder.id).export_scope);
    for element in declarations {
        let name = linker.store.get(element).name;
        // Duplicates are not exported; the first declaration owns the name.
        if is_private(linker.interner, name) || builder.locals.get(&name) != Some(&element) {
            continue;
        }
        scope.declare(name, element);
    }
    tracing::debug!(names = scope.len(), "initial export scope");
    linker.store.library_mut(builder.id).export_scope = scope;
}

/// Names visible inside one library.
#[derive(Clone, Debug, Default)]
pub(crate) struct ImportScope {
    local: FxHashMap<Name, ElementId>,
    imported: FxHashMap<Name, ElementId>,
    prefixes: FxHashMap<Name, FxHashMap<Name, ElementId>>,
}

impl ImportScope {
    /// Unprefixed lookup: own declarations shadow imports.
    pub fn lookup(&self, name: Name) -> Option<ElementId> {
        self.local
            .get(&name)
            .or_else(|| self.imported.get(&name))
            .copied()
    }

    pub fn lookup_prefixed(&self, prefix: Name, name: Name) -> Option<ElementId> {
        self.prefixes.get(&prefix)?.get(&name).copied()
    }

    pub fn has_prefix(&self, prefix: Name) -> bool {
        self.prefixes.contains_key(&prefix)
    }
}

/// Build the import scope of a batch library from final export scopes.
///
/// When two imports bind the same name, the earlier import wins; the
/// implicit `dart:core` import comes last.
pub(crate) fn build_import_scope(store: &ElementStore, builder: &LibraryBuilder) -> ImportScope {
    let mut scope = ImportScope {
        local: builder.locals.clone(),
        ..ImportScope::default()
    };
    let entry = store.library(builder.id);
    for import in &entry.imports {
        let Some(target) = import.target else {
            continue;
        };
        let exported = &store.library(target).export_scope;
        let names = match import.prefix {
            Some(prefix) => scope.prefixes.entry(prefix).or_default(),
            None => &mut scope.imported,
        };
        for (name, symbol) in exported.iter() {
            if NameFilter::all_allow(&import.filters, name) {
                names.entry(name).or_insert(symbol.element);
            }
        }
    }
    scope
}

#[cfg(test)]
mod tests;

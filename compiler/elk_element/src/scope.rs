//! Export scopes and `show`/`hide` filtering.
//!
//! An export scope maps each name a library makes visible to the element it
//! denotes. Names declared by the library itself are seeded first and never
//! replaced; names contributed by re-exports are written during export
//! propagation and may be overwritten according to an
//! [`ExportConflictPolicy`].

use elk_ir::{Combinator, Name};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ElementId;

/// How a name entered the scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolOrigin {
    /// Declared by the library.
    Declared,
    /// Contributed by an `export` directive.
    Exported,
}

/// One export scope entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExportedSymbol {
    pub element: ElementId,
    pub origin: SymbolOrigin,
}

/// Resolution of two different exported symbols with the same name.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExportConflictPolicy {
    /// The last write in propagation order wins.
    #[default]
    LastWriterWins,
    /// The first exported symbol for a name is kept.
    FirstWriterWins,
}

/// Outcome of a single [`ExportScope::export`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExportWrite {
    /// The name was not present.
    Added,
    /// A different exported symbol was replaced.
    Replaced,
    /// The same symbol was already present.
    Unchanged,
    /// The name is declared locally, or the policy kept the earlier symbol.
    Kept,
}

impl ExportWrite {
    /// Whether the write modified the scope.
    pub fn changed(self) -> bool {
        matches!(self, ExportWrite::Added | ExportWrite::Replaced)
    }
}

/// Names a library makes visible to importers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportScope {
    entries: FxHashMap<Name, ExportedSymbol>,
}

impl ExportScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name declared by the library itself.
    ///
    /// Returns `false` when the name was already declared; the first
    /// declaration is kept.
    pub fn declare(&mut self, name: Name, element: ElementId) -> bool {
        match self.entries.get(&name) {
            Some(existing) if existing.origin == SymbolOrigin::Declared => false,
            _ => {
                self.entries.insert(
                    name,
                    ExportedSymbol {
                        element,
                        origin: SymbolOrigin::Declared,
                    },
                );
                true
            }
        }
    }

    /// Write a re-exported name.
    pub fn export(
        &mut self,
        name: Name,
        element: ElementId,
        policy: ExportConflictPolicy,
    ) -> ExportWrite {
        let incoming = ExportedSymbol {
            element,
            origin: SymbolOrigin::Exported,
        };
        match self.entries.get_mut(&name) {
            None => {
                self.entries.insert(name, incoming);
                ExportWrite::Added
            }
            Some(existing) if existing.element == element => ExportWrite::Unchanged,
            Some(existing) if existing.origin == SymbolOrigin::Declared => ExportWrite::Kept,
            Some(existing) => match policy {
                ExportConflictPolicy::LastWriterWins => {
                    *existing = incoming;
                    ExportWrite::Replaced
                }
                ExportConflictPolicy::FirstWriterWins => ExportWrite::Kept,
            },
        }
    }

    /// Element bound to `name`.
    pub fn get(&self, name: Name) -> Option<ElementId> {
        self.entries.get(&name).map(|symbol| symbol.element)
    }

    /// Full entry for `name`.
    pub fn symbol(&self, name: Name) -> Option<&ExportedSymbol> {
        self.entries.get(&name)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.entries.contains_key(&name)
    }

    /// Iterate entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Name, &ExportedSymbol)> {
        self.entries.iter().map(|(name, symbol)| (*name, symbol))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `show` or `hide` filter of an import or export directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameFilter {
    Show(FxHashSet<Name>),
    Hide(FxHashSet<Name>),
}

impl NameFilter {
    /// Filters for a directive's combinators, in source order.
    pub fn from_combinators(combinators: &[Combinator]) -> Vec<NameFilter> {
        combinators
            .iter()
            .map(|combinator| match combinator {
                Combinator::Show(names) => NameFilter::Show(names.iter().copied().collect()),
                Combinator::Hide(names) => NameFilter::Hide(names.iter().copied().collect()),
            })
            .collect()
    }

    /// Whether this filter lets `name` through.
    pub fn allows(&self, name: Name) -> bool {
        match self {
            NameFilter::Show(names) => names.contains(&name),
            NameFilter::Hide(names) => !names.contains(&name),
        }
    }

    /// Whether every filter lets `name` through.
    pub fn all_allow(filters: &[NameFilter], name: Name) -> bool {
        filters.iter().all(|filter| filter.allows(name))
    }
}

//! Export scope fixed point.
//!
//! ```text
//! 1. edges      exportee → [(exporter, filters)] for every batch exporter
//! 2. cyclic     batch libraries that are both exporter and exportee
//! 3. seed       every other exportee pushes its scope once
//! 4. rounds     every cyclic library pushes into all its exporters;
//!               a round changed something iff some write added a name
//!               or replaced a differing symbol
//! 5. stop       at the first unchanged round
//! ```
//!
//! Scopes only grow in distinct names, and names are bounded by the public
//! declarations reachable from the batch, so without conflicting writes the
//! rounds terminate. Conflicting writes under
//! [`ExportConflictPolicy::LastWriterWins`](elk_element::ExportConflictPolicy)
//! could in principle alternate; `max_export_rounds` turns that into
//! [`LinkError::ExportsDiverged`].

use elk_element::{ElementStore, LibraryId, NameFilter};
use elk_ir::StringInterner;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::names::is_private;
use crate::{LinkConfig, LinkError};

/// `exportee → exporters` with the exporter's filters.
type ExportEdges = FxHashMap<LibraryId, Vec<(LibraryId, Vec<NameFilter>)>>;

/// Close the export scopes of `batch` over their `export` directives.
///
/// Libraries outside `batch` are read but never written. Returns the number
/// of rounds run over cyclic exporters.
#[tracing::instrument(level = "debug", skip_all, fields(libraries = batch.len()))]
pub fn propagate_export_scopes(
    store: &mut ElementStore,
    batch: &[LibraryId],
    interner: &StringInterner,
    config: &LinkConfig,
) -> Result<u32, LinkError> {
    // 1. Direct relationships, in batch and directive order.
    let mut edges: ExportEdges = FxHashMap::default();
    let mut exportee_order: Vec<LibraryId> = Vec::new();
    let mut exporters: FxHashSet<LibraryId> = FxHashSet::default();
    for &exporter in batch {
        for export in &store.library(exporter).exports {
            let Some(exportee) = export.target else {
                continue;
            };
            exporters.insert(exporter);
            let entry = edges.entry(exportee).or_default();
            if entry.is_empty() {
                exportee_order.push(exportee);
            }
            entry.push((exporter, export.filters.clone()));
        }
    }

    // 2. Libraries on both sides; only these need rounds.
    let in_batch: FxHashSet<LibraryId> = batch.iter().copied().collect();
    let cyclic: Vec<LibraryId> = exportee_order
        .iter()
        .copied()
        .filter(|lib| exporters.contains(lib) && in_batch.contains(lib))
        .collect();
    let cyclic_set: FxHashSet<LibraryId> = cyclic.iter().copied().collect();

    // 3. Seed from every exportee whose scope is already final.
    for &exportee in &exportee_order {
        if cyclic_set.contains(&exportee) {
            continue;
        }
        push_into_exporters(store, &edges, exportee, interner, config);
    }

    // 4./5. Rounds until nothing changes.
    let mut rounds = 0;
    loop {
        if cyclic.is_empty() {
            break;
        }
        if rounds >= config.max_export_rounds {
            return Err(LinkError::ExportsDiverged { rounds });
        }
        rounds += 1;

        let mut changed = false;
        for &exportee in &cyclic {
            changed |= push_into_exporters(store, &edges, exportee, interner, config);
        }
        tracing::debug!(round = rounds, changed, "export propagation round");
        if !changed {
            break;
        }
    }
    Ok(rounds)
}

/// Push every public entry of `exportee`'s scope into each of its
/// exporters. Returns whether any exporter's scope changed.
fn push_into_exporters(
    store: &mut ElementStore,
    edges: &ExportEdges,
    exportee: LibraryId,
    interner: &StringInterner,
    config: &LinkConfig,
) -> bool {
    let Some(exporters) = edges.get(&exportee) else {
        return false;
    };
    let mut entries: Vec<_> = store
        .library(exportee)
        .export_scope
        .iter()
        .filter(|(name, _)| !is_private(interner, *name))
        .map(|(name, symbol)| (name, symbol.element))
        .collect();
    entries.sort_unstable_by_key(|(name, _)| *name);

    let mut changed = false;
    for (exporter, filters) in exporters {
        if *exporter == exportee {
            continue;
        }
        let scope = &mut store.library_mut(*exporter).export_scope;
        for &(name, element) in &entries {
            if NameFilter::all_allow(filters, name) {
                changed |= scope
                    .export(name, element, config.export_conflict_policy)
                    .changed();
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests;

//! Link session: the entry point that runs every pass over a batch.
//!
//! # Pass Order
//!
//! ```text
//!  1  register batch libraries            DuplicateLibrary
//!  2  bootstrap core types                MissingCoreLibrary, deferred when
//!                                         dart:core is in the batch
//!  3  build → macros → export scopes      ExportsDiverged
//!  4  LinkContext, import scopes
//!  5  resolve_types
//!  6  analyze_type_graph
//!  7  build_enum_members
//!  8  resolve_implicit_super_constructors
//!  9  infer_types
//! 10  constructors, constants, defaults, metadata
//! 11  collect_mixin_super_invoked_names
//! 12  detach
//! 13  write bundle, commit
//! ```
//!
//! The store is held through a [`StoreGuard`](elk_element::StoreGuard) for the
//! whole link. Returning early with a [`LinkError`], or dropping the `link`
//! future at the macro await point, rolls every library and element of the
//! batch back out of the store.

use elk_element::{ElementStore, LibraryId, LibraryState};
use elk_ir::StringInterner;

use crate::builder::{
    build, build_enum_members, collect_mixin_super_invoked_names, resolve_constant_initializers,
    resolve_constructors, resolve_default_values, resolve_implicit_super_constructors,
    resolve_metadata, LibraryBuilder,
};
use crate::bundle::{BincodeBundleWriter, BundleWriter};
use crate::context::{LinkContext, TypeProvider};
use crate::infer::infer_types;
use crate::linker::Linker;
use crate::macros::{execute_macro_types_phase, AugmentationParser, MacroExecutor, MacroGeneratedUnit};
use crate::scope::{build_import_scope, build_initial_export_scope, propagate_export_scopes};
use crate::types::{analyze_type_graph, resolve_types};
use crate::{LibraryError, LibraryInput, LinkConfig, LinkError};

/// Serialized batch plus the augmentation units macros generated for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBundle {
    pub bytes: Vec<u8>,
    pub macro_units: Vec<MacroGeneratedUnit>,
}

/// Result of a successful link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkOutput {
    pub bundle: ResolvedBundle,
    /// Batch libraries, in input order. They are `Linked` in the store.
    pub libraries: Vec<LibraryId>,
    /// Library-local failures. Linking continued past each of them.
    pub errors: Vec<LibraryError>,
}

/// One link of a library batch against a store.
pub struct LinkSession<'s, E> {
    store: &'s mut ElementStore,
    interner: &'s StringInterner,
    config: &'s LinkConfig,
    executor: E,
    parser: Option<&'s dyn AugmentationParser>,
    writer: Option<&'s dyn BundleWriter>,
}

impl<'s, E: MacroExecutor> LinkSession<'s, E> {
    pub fn new(
        store: &'s mut ElementStore,
        interner: &'s StringInterner,
        config: &'s LinkConfig,
        executor: E,
    ) -> Self {
        LinkSession {
            store,
            interner,
            config,
            executor,
            parser: None,
            writer: None,
        }
    }

    /// Parse macro output and build it into the library. Without a parser
    /// generated units are only returned in the bundle.
    #[must_use]
    pub fn with_augmentation_parser(mut self, parser: &'s dyn AugmentationParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Replace the default [`BincodeBundleWriter`].
    #[must_use]
    pub fn with_bundle_writer(mut self, writer: &'s dyn BundleWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Link `inputs` as one batch.
    #[tracing::instrument(level = "debug", skip_all, fields(libraries = inputs.len()))]
    pub async fn link(self, inputs: Vec<LibraryInput>) -> Result<LinkOutput, LinkError> {
        let LinkSession {
            store,
            interner,
            config,
            executor,
            parser,
            writer,
        } = self;
        let mut guard = store.guard();
        let mut linker = Linker::new(&mut guard, interner, config);

        // 1. Library entries, so imports inside the batch resolve.
        for (index, input) in inputs.into_iter().enumerate() {
            let id = linker
                .store
                .add_library(input.uri)
                .ok_or_else(|| LinkError::duplicate_library(interner.lookup(input.uri)))?;
            linker.builders.push(LibraryBuilder::new(index, id, input));
        }
        let batch = linker.batch();

        // 2. Core types, unless dart:core is still to be built.
        let core_in_batch = linker
            .builders
            .iter()
            .any(|builder| builder.uri == linker.names.dart_core);
        let early_types = if core_in_batch {
            None
        } else {
            Some(TypeProvider::bootstrap(linker.store, interner, &linker.names)?)
        };

        // 3. Library scopes.
        for lib in 0..linker.builders.len() {
            build(&mut linker, lib);
        }
        let mut macro_units = Vec::new();
        if config.run_macros {
            for lib in 0..linker.builders.len() {
                if let Some(unit) = execute_macro_types_phase(&mut linker, lib, &executor, parser).await {
                    macro_units.push(unit);
                }
            }
        }
        for lib in 0..linker.builders.len() {
            build_initial_export_scope(&mut linker, lib);
        }
        let rounds = propagate_export_scopes(linker.store, &batch, interner, config)?;
        tracing::debug!(rounds, "export scopes final");

        // 4. Shared type system.
        let types = match early_types {
            Some(types) => types,
            None => TypeProvider::bootstrap(linker.store, interner, &linker.names)?,
        };
        let cx = LinkContext::new(types);
        let scopes = linker
            .builders
            .iter()
            .map(|builder| build_import_scope(linker.store, builder))
            .collect();
        linker.scopes = scopes;

        // 5.-6. Declared types.
        resolve_types(&mut linker, &cx);
        analyze_type_graph(&mut linker);

        // 7.-8.
        for lib in 0..linker.builders.len() {
            build_enum_members(&mut linker, &cx, lib);
            resolve_implicit_super_constructors(&mut linker, lib);
        }

        // 9.
        infer_types(&mut linker, &cx);

        // 10.-11.
        for lib in 0..linker.builders.len() {
            resolve_constructors(&mut linker, lib);
            resolve_constant_initializers(&mut linker, lib);
            resolve_default_values(&mut linker, lib);
            resolve_metadata(&mut linker, lib);
            collect_mixin_super_invoked_names(&mut linker, lib);
        }
        tracing::debug!(supertypes = cx.inheritance.len(), "inheritance cache");

        // 12.
        let errors = detach(linker);

        // 13.
        let bytes = match writer {
            Some(writer) => writer.write(&guard, interner, &batch)?,
            None => BincodeBundleWriter.write(&guard, interner, &batch)?,
        };
        guard.commit();
        tracing::debug!(
            bytes = bytes.len(),
            macro_units = macro_units.len(),
            errors = errors.len(),
            "batch linked"
        );

        Ok(LinkOutput {
            bundle: ResolvedBundle { bytes, macro_units },
            libraries: batch,
            errors,
        })
    }
}

/// Mark the batch linked and drop its syntax. Returns the recorded errors.
#[tracing::instrument(level = "debug", skip_all)]
fn detach(linker: Linker<'_>) -> Vec<LibraryError> {
    let Linker {
        store,
        builders,
        node_map,
        errors,
        ..
    } = linker;
    for builder in &builders {
        store.library_mut(builder.id).state = LibraryState::Linked;
    }
    let dropped = node_map.detach();
    tracing::debug!(nodes = dropped, "detached");
    errors
}

/// Link `inputs` with a fresh [`LinkSession`] and the default bundle
/// writer.
pub async fn link<E: MacroExecutor>(
    store: &mut ElementStore,
    interner: &StringInterner,
    config: &LinkConfig,
    executor: E,
    inputs: Vec<LibraryInput>,
) -> Result<LinkOutput, LinkError> {
    LinkSession::new(store, interner, config, executor)
        .link(inputs)
        .await
}

#[cfg(test)]
mod tests;

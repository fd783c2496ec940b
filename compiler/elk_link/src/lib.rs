//! Elk linker: links a batch of parsed libraries into resolved elements.
//!
//! A batch is a set of libraries that may import and export each other
//! cyclically. Linking runs in passes over the whole batch, each one
//! filling in more of the elements the builder created:
//!
//! ```text
//! LibraryInput (parsed units)
//!     │ build                      elements, directives
//!     │ macro type phase           generated augmentation units
//!     │ export scope fixed point   what each library exports
//!     │ types, inference           resolved and inferred types
//!     │ constants, constructors    resolved initializers and metadata
//!     ▼
//! detach ──► ResolvedBundle (bincode)
//! ```
//!
//! The entry point is [`LinkSession::link`] (or [`link`]). Libraries of a
//! successful link become `Linked` in the caller's
//! [`ElementStore`](elk_element::ElementStore) and can be imported by later
//! batches; a failed or cancelled link leaves the store unchanged.
//!
//! # Tracing
//!
//! Every pass is a `tracing` span at `debug` level. Call [`init_tracing`]
//! to print them when `RUST_LOG` is set, e.g.
//! `RUST_LOG=elk_link=debug`.

mod builder;
mod bundle;
mod config;
mod context;
mod error;
mod infer;
mod input;
mod linker;
mod macros;
mod names;
mod node_map;
mod scope;
mod session;
mod types;

#[cfg(test)]
mod testing;

use std::sync::Once;

pub use bundle::{
    decode_bundle, encode_bundle, BincodeBundleWriter, Bundle, BundleAnnotation, BundleConst,
    BundleElement, BundleElementData, BundleExport, BundleExportedName, BundleFilter,
    BundleImport, BundleLibrary, BundleMacroError, BundleParameterKind, BundleType, BundleUnit,
    BundleVariance, BundleWriter, ElementRef,
};
pub use config::LinkConfig;
pub use error::{BundleError, LibraryError, LibraryErrorKind, LinkError};
pub use input::LibraryInput;
pub use macros::{
    evaluate_argument, evaluate_arguments, ArgValue, ArgumentError, AugmentationParser,
    ClassIntrospection, FieldView, MacroArguments, MacroExecution, MacroExecutionError,
    MacroExecutor, MacroGeneratedUnit, MacroRequest, MacroResult, NoMacroExecutor,
    TypeAnnotationView, TypeParameterView,
};
pub use scope::propagate_export_scopes;
pub use session::{link, LinkOutput, LinkSession, ResolvedBundle};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and nothing after the first call.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

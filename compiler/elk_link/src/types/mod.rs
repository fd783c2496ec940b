//! Declared types: annotation resolution and type-graph analysis.
//!
//! ```text
//! resolve_types        step 5  every annotated position of every batch
//!                              element, from one worklist
//! analyze_type_graph   step 6  self-referential aliases, simply bounded,
//!                              raw types, alias expansion, alias variance
//! ```

mod graph;
mod resolve;

pub(crate) use graph::{analyze_type_graph, normalize};
pub(crate) use resolve::{resolve_annotation, resolve_types, this_type};

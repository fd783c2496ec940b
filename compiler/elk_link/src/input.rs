//! Link inputs.

use elk_ir::{Name, ParsedUnit};

/// One library of a batch: its URI and its parsed units.
///
/// The first unit is the defining unit; the rest are parts.
#[derive(Clone, Debug, PartialEq)]
pub struct LibraryInput {
    pub uri: Name,
    pub units: Vec<ParsedUnit>,
}

impl LibraryInput {
    pub fn new(uri: Name, units: Vec<ParsedUnit>) -> Self {
        LibraryInput { uri, units }
    }
}

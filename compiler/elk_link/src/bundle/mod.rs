//! Resolved bundle: the serialized form of a linked batch.
//!
//! The bundle is self-contained. Element ids are store-local, so every
//! reference is written as an [`ElementRef`] (library URI plus the element's
//! index in that library's element list) and every name as a string.
//!
//! # Layout
//!
//! ```text
//! Bundle
//! └── libraries: Vec<BundleLibrary>       batch order
//!     ├── units, imports, exports         directive order
//!     ├── declarations: Vec<u32>          indices into `elements`
//!     ├── elements: Vec<BundleElement>    allocation order
//!     └── export_scope                    sorted by name
//! ```
//!
//! Nothing in the layout depends on hash-map iteration order, so linking the
//! same batch twice yields byte-identical bundles.
//!
//! # Cache Format
//!
//! [`BincodeBundleWriter`] encodes with `bincode`; [`decode_bundle`] reads
//! it back for reuse and inspection.

mod encode;

pub use encode::encode_bundle;

use elk_element::{ElementStore, LibraryId};
use elk_ir::StringInterner;
use serde::{Deserialize, Serialize};

use crate::BundleError;

/// Element of a library, by library URI and local index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub library: String,
    pub index: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub libraries: Vec<BundleLibrary>,
}

impl Bundle {
    /// Library with `uri`, if the bundle contains it.
    pub fn library(&self, uri: &str) -> Option<&BundleLibrary> {
        self.libraries.iter().find(|lib| lib.uri == uri)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleLibrary {
    pub uri: String,
    pub units: Vec<BundleUnit>,
    pub imports: Vec<BundleImport>,
    pub exports: Vec<BundleExport>,
    /// Top-level declarations, as indices into `elements`.
    pub declarations: Vec<u32>,
    pub elements: Vec<BundleElement>,
    pub export_scope: Vec<BundleExportedName>,
}

impl BundleLibrary {
    /// Top-level declaration named `name`.
    pub fn declaration(&self, name: &str) -> Option<&BundleElement> {
        self.declarations
            .iter()
            .filter_map(|&index| self.elements.get(index as usize))
            .find(|element| element.name == name)
    }

    /// Names of the export scope, in order.
    pub fn exported_names(&self) -> Vec<&str> {
        self.export_scope.iter().map(|e| e.name.as_str()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUnit {
    pub uri: String,
    pub is_synthetic: bool,
    pub is_augmentation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleFilter {
    Show(Vec<String>),
    Hide(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleImport {
    pub uri: String,
    pub prefix: Option<String>,
    pub filters: Vec<BundleFilter>,
    pub is_implicit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleExport {
    pub uri: String,
    pub filters: Vec<BundleFilter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleExportedName {
    pub name: String,
    pub element: ElementRef,
    /// Declared by the library rather than re-exported.
    pub declared: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleElement {
    pub name: String,
    /// Human-readable kind, e.g. `"class"`.
    pub kind: String,
    /// Raw `ElementFlags` bits.
    pub flags: u32,
    pub enclosing: Option<ElementRef>,
    pub data: BundleElementData,
    pub metadata: Vec<BundleAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BundleElementData {
    Interface {
        type_params: Vec<ElementRef>,
        supertype: Option<BundleType>,
        mixins: Vec<BundleType>,
        interfaces: Vec<BundleType>,
        superclass_constraints: Vec<BundleType>,
        members: Vec<ElementRef>,
        constructors: Vec<ElementRef>,
        macro_errors: Vec<BundleMacroError>,
        super_invoked_names: Vec<String>,
    },
    TypeAlias {
        type_params: Vec<ElementRef>,
        aliased: BundleType,
    },
    Executable {
        type_params: Vec<ElementRef>,
        params: Vec<ElementRef>,
        return_type: BundleType,
        super_constructor: Option<ElementRef>,
        redirected_constructor: Option<ElementRef>,
    },
    Variable {
        ty: BundleType,
        initializer: Option<BundleConst>,
    },
    Parameter {
        ty: BundleType,
        kind: BundleParameterKind,
        default_value: Option<BundleConst>,
        field: Option<ElementRef>,
    },
    TypeParameter {
        bound: Option<BundleType>,
        variance: BundleVariance,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleParameterKind {
    Required,
    OptionalPositional,
    Named,
    RequiredNamed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleVariance {
    Unrelated,
    Covariant,
    Contravariant,
    Invariant,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleType {
    Dynamic,
    Void,
    Never,
    Invalid,
    Interface {
        element: ElementRef,
        args: Vec<BundleType>,
        nullable: bool,
    },
    TypeParameter {
        element: ElementRef,
        nullable: bool,
    },
    Function {
        return_type: Box<BundleType>,
        params: Vec<BundleType>,
        nullable: bool,
    },
    Alias {
        element: ElementRef,
        args: Vec<BundleType>,
        nullable: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BundleConst {
    Null,
    Bool(bool),
    Int(i64),
    /// `f64` bits.
    Double(u64),
    String(String),
    List(Vec<BundleConst>),
    Set(Vec<BundleConst>),
    Map(Vec<(BundleConst, BundleConst)>),
    Reference(ElementRef),
    TypeLiteral(ElementRef),
    Negate(Box<BundleConst>),
    Not(Box<BundleConst>),
    Binary {
        /// Operator as written, e.g. `"+"`.
        op: String,
        left: Box<BundleConst>,
        right: Box<BundleConst>,
    },
    Conditional {
        condition: Box<BundleConst>,
        then_expr: Box<BundleConst>,
        else_expr: Box<BundleConst>,
    },
    Construct {
        constructor: ElementRef,
        args: Vec<(Option<String>, BundleConst)>,
    },
    EnumValue {
        index: u32,
        name: String,
    },
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleAnnotation {
    pub target: Option<ElementRef>,
    pub value: BundleConst,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleMacroError {
    Argument {
        annotation_index: u32,
        argument_index: u32,
        message: String,
    },
    Execution {
        annotation_index: u32,
        message: String,
        stack_trace: String,
    },
}

/// Serializes the libraries of a linked batch.
pub trait BundleWriter {
    fn write(
        &self,
        store: &ElementStore,
        interner: &StringInterner,
        libraries: &[LibraryId],
    ) -> Result<Vec<u8>, BundleError>;
}

/// Default writer: the [`Bundle`] encoded with `bincode`.
#[derive(Copy, Clone, Debug, Default)]
pub struct BincodeBundleWriter;

impl BundleWriter for BincodeBundleWriter {
    fn write(
        &self,
        store: &ElementStore,
        interner: &StringInterner,
        libraries: &[LibraryId],
    ) -> Result<Vec<u8>, BundleError> {
        let bundle = encode_bundle(store, interner, libraries)?;
        bincode::serialize(&bundle).map_err(|e| BundleError::Encode(e.to_string()))
    }
}

/// Read a bundle written by [`BincodeBundleWriter`].
pub fn decode_bundle(bytes: &[u8]) -> Result<Bundle, BundleError> {
    bincode::deserialize(bytes).map_err(|e| BundleError::Decode(e.to_string()))
}

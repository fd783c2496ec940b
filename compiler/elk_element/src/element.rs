//! Elements and their kind-specific data.

use elk_ir::{Name, ParamKind};

use crate::{ConstExpr, ElementFlags, ElementId, LibraryId, LinkedType, Variance};

/// Kind of declared symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Class,
    Mixin,
    Enum,
    TypeAlias,
    Function,
    TopLevelVariable,
    Field,
    Method,
    Getter,
    Setter,
    Constructor,
    Parameter,
    TypeParameter,
}

impl ElementKind {
    /// Classes, mixins, and enums: kinds that carry [`InterfaceData`].
    pub fn is_interface(self) -> bool {
        matches!(self, ElementKind::Class | ElementKind::Mixin | ElementKind::Enum)
    }

    /// Kinds usable as a type name.
    pub fn is_type(self) -> bool {
        self.is_interface() || matches!(self, ElementKind::TypeAlias | ElementKind::TypeParameter)
    }

    /// Kinds that carry [`ExecutableData`].
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            ElementKind::Function
                | ElementKind::Method
                | ElementKind::Getter
                | ElementKind::Setter
                | ElementKind::Constructor
        )
    }

    /// Stable lowercase label, used in diagnostics and the bundle.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Mixin => "mixin",
            ElementKind::Enum => "enum",
            ElementKind::TypeAlias => "typedef",
            ElementKind::Function => "function",
            ElementKind::TopLevelVariable => "variable",
            ElementKind::Field => "field",
            ElementKind::Method => "method",
            ElementKind::Getter => "getter",
            ElementKind::Setter => "setter",
            ElementKind::Constructor => "constructor",
            ElementKind::Parameter => "parameter",
            ElementKind::TypeParameter => "type parameter",
        }
    }
}

/// A declared symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: Name,
    pub kind: ElementKind,
    pub library: LibraryId,
    /// Declaring class, executable, or type alias; `None` for top-level
    /// declarations.
    pub enclosing: Option<ElementId>,
    pub flags: ElementFlags,
    pub data: ElementData,
    /// Resolved annotations, filled by the metadata pass.
    pub metadata: Vec<ElementAnnotation>,
}

impl Element {
    /// Create an empty element whose data matches `kind`.
    pub fn new(
        name: Name,
        kind: ElementKind,
        library: LibraryId,
        enclosing: Option<ElementId>,
    ) -> Self {
        Element {
            name,
            kind,
            library,
            enclosing,
            flags: ElementFlags::empty(),
            data: ElementData::empty_for(kind),
            metadata: Vec::new(),
        }
    }

    /// Same element with extra flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ElementFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn interface(&self) -> Option<&InterfaceData> {
        match &self.data {
            ElementData::Interface(data) => Some(data),
            _ => None,
        }
    }

    pub fn interface_mut(&mut self) -> Option<&mut InterfaceData> {
        match &mut self.data {
            ElementData::Interface(data) => Some(data),
            _ => None,
        }
    }

    pub fn type_alias(&self) -> Option<&TypeAliasData> {
        match &self.data {
            ElementData::TypeAlias(data) => Some(data),
            _ => None,
        }
    }

    pub fn type_alias_mut(&mut self) -> Option<&mut TypeAliasData> {
        match &mut self.data {
            ElementData::TypeAlias(data) => Some(data),
            _ => None,
        }
    }

    pub fn executable(&self) -> Option<&ExecutableData> {
        match &self.data {
            ElementData::Executable(data) => Some(data),
            _ => None,
        }
    }

    pub fn executable_mut(&mut self) -> Option<&mut ExecutableData> {
        match &mut self.data {
            ElementData::Executable(data) => Some(data),
            _ => None,
        }
    }

    pub fn variable(&self) -> Option<&VariableData> {
        match &self.data {
            ElementData::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn variable_mut(&mut self) -> Option<&mut VariableData> {
        match &mut self.data {
            ElementData::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn parameter(&self) -> Option<&ParameterData> {
        match &self.data {
            ElementData::Parameter(data) => Some(data),
            _ => None,
        }
    }

    pub fn parameter_mut(&mut self) -> Option<&mut ParameterData> {
        match &mut self.data {
            ElementData::Parameter(data) => Some(data),
            _ => None,
        }
    }

    pub fn type_parameter(&self) -> Option<&TypeParameterData> {
        match &self.data {
            ElementData::TypeParameter(data) => Some(data),
            _ => None,
        }
    }

    pub fn type_parameter_mut(&mut self) -> Option<&mut TypeParameterData> {
        match &mut self.data {
            ElementData::TypeParameter(data) => Some(data),
            _ => None,
        }
    }

    /// Declared type parameters of a generic declaration.
    pub fn type_params(&self) -> &[ElementId] {
        match &self.data {
            ElementData::Interface(data) => &data.type_params,
            ElementData::TypeAlias(data) => &data.type_params,
            ElementData::Executable(data) => &data.type_params,
            ElementData::Variable(_)
            | ElementData::Parameter(_)
            | ElementData::TypeParameter(_) => &[],
        }
    }

    /// The type of a variable, field, or parameter; the return type of an
    /// executable.
    pub fn value_type(&self) -> Option<&LinkedType> {
        match &self.data {
            ElementData::Variable(data) => Some(&data.ty),
            ElementData::Parameter(data) => Some(&data.ty),
            ElementData::Executable(data) => Some(&data.return_type),
            ElementData::Interface(_)
            | ElementData::TypeAlias(_)
            | ElementData::TypeParameter(_) => None,
        }
    }
}

/// Kind-specific element data.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementData {
    Interface(InterfaceData),
    TypeAlias(TypeAliasData),
    Executable(ExecutableData),
    Variable(VariableData),
    Parameter(ParameterData),
    TypeParameter(TypeParameterData),
}

impl ElementData {
    /// Empty data for a freshly created element of `kind`.
    pub fn empty_for(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Class | ElementKind::Mixin | ElementKind::Enum => {
                ElementData::Interface(InterfaceData::default())
            }
            ElementKind::TypeAlias => ElementData::TypeAlias(TypeAliasData {
                type_params: Vec::new(),
                aliased: LinkedType::Dynamic,
            }),
            ElementKind::Function
            | ElementKind::Method
            | ElementKind::Getter
            | ElementKind::Setter
            | ElementKind::Constructor => ElementData::Executable(ExecutableData::default()),
            ElementKind::TopLevelVariable | ElementKind::Field => {
                ElementData::Variable(VariableData {
                    ty: LinkedType::Dynamic,
                    initializer: None,
                })
            }
            ElementKind::Parameter => ElementData::Parameter(ParameterData {
                ty: LinkedType::Dynamic,
                kind: ParameterKind::Required,
                default_value: None,
                field: None,
            }),
            ElementKind::TypeParameter => ElementData::TypeParameter(TypeParameterData::default()),
        }
    }

    /// Visit every stored type mutably.
    pub fn for_each_type_mut(&mut self, f: &mut impl FnMut(&mut LinkedType)) {
        match self {
            ElementData::Interface(data) => {
                if let Some(supertype) = &mut data.supertype {
                    f(supertype);
                }
                data.mixins
                    .iter_mut()
                    .chain(data.interfaces.iter_mut())
                    .chain(data.superclass_constraints.iter_mut())
                    .for_each(|ty| f(ty));
            }
            ElementData::TypeAlias(data) => f(&mut data.aliased),
            ElementData::Executable(data) => f(&mut data.return_type),
            ElementData::Variable(data) => f(&mut data.ty),
            ElementData::Parameter(data) => f(&mut data.ty),
            ElementData::TypeParameter(data) => {
                if let Some(bound) = &mut data.bound {
                    f(bound);
                }
            }
        }
    }
}

/// Data of classes, mixins, and enums.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceData {
    pub type_params: Vec<ElementId>,
    /// `extends` type; `None` only for the root class.
    pub supertype: Option<LinkedType>,
    pub mixins: Vec<LinkedType>,
    pub interfaces: Vec<LinkedType>,
    /// Mixin `on` clause.
    pub superclass_constraints: Vec<LinkedType>,
    /// Fields, methods, getters, and setters in declaration order.
    pub members: Vec<ElementId>,
    pub constructors: Vec<ElementId>,
    /// Macro applications that failed on this class.
    pub macro_errors: Vec<MacroApplicationError>,
    /// Names invoked through `super` in a mixin body.
    pub super_invoked_names: Vec<Name>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasData {
    pub type_params: Vec<ElementId>,
    pub aliased: LinkedType,
}

/// Data of functions, methods, accessors, and constructors.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutableData {
    pub type_params: Vec<ElementId>,
    pub params: Vec<ElementId>,
    /// For constructors this is the enclosing class type.
    pub return_type: LinkedType,
    /// Superclass constructor invoked, implicitly or explicitly.
    pub super_constructor: Option<ElementId>,
    /// Target of a redirecting constructor.
    pub redirected_constructor: Option<ElementId>,
}

impl Default for ExecutableData {
    fn default() -> Self {
        ExecutableData {
            type_params: Vec::new(),
            params: Vec::new(),
            return_type: LinkedType::Dynamic,
            super_constructor: None,
            redirected_constructor: None,
        }
    }
}

/// Data of top-level variables and fields.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableData {
    pub ty: LinkedType,
    /// Resolved initializer of a constant variable.
    pub initializer: Option<ConstExpr>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    #[default]
    Required,
    OptionalPositional,
    Named,
    RequiredNamed,
}

impl ParameterKind {
    /// Whether the parameter is passed by position.
    pub fn is_positional(self) -> bool {
        matches!(self, ParameterKind::Required | ParameterKind::OptionalPositional)
    }
}

impl From<ParamKind> for ParameterKind {
    fn from(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Required => ParameterKind::Required,
            ParamKind::OptionalPositional => ParameterKind::OptionalPositional,
            ParamKind::Named => ParameterKind::Named,
            ParamKind::RequiredNamed => ParameterKind::RequiredNamed,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterData {
    pub ty: LinkedType,
    pub kind: ParameterKind,
    pub default_value: Option<ConstExpr>,
    /// Field initialized by a `this.name` parameter.
    pub field: Option<ElementId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeParameterData {
    pub bound: Option<LinkedType>,
    pub variance: Variance,
}

/// A resolved annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementAnnotation {
    /// Constant variable or constructor the annotation refers to.
    pub target: Option<ElementId>,
    pub value: ConstExpr,
}

/// A macro application that failed; linking of the class continues.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MacroApplicationError {
    /// An argument is not a supported literal.
    Argument {
        annotation_index: u32,
        argument_index: u32,
        message: String,
    },
    /// The macro raised during execution.
    Execution {
        annotation_index: u32,
        message: String,
        stack_trace: String,
    },
}

impl MacroApplicationError {
    /// Index of the annotation on the class.
    pub fn annotation_index(&self) -> u32 {
        match self {
            MacroApplicationError::Argument {
                annotation_index, ..
            }
            | MacroApplicationError::Execution {
                annotation_index, ..
            } => *annotation_index,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            MacroApplicationError::Argument { message, .. }
            | MacroApplicationError::Execution { message, .. } => message,
        }
    }
}

//! Store → bundle translation.

use elk_element::{
    ConstExpr, Element, ElementAnnotation, ElementData, ElementId, ElementStore, LibraryEntry,
    LibraryId, LinkedType, MacroApplicationError, NameFilter, ParameterKind, SymbolOrigin,
    Variance,
};
use elk_ir::{BinaryOp, Name, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    Bundle, BundleAnnotation, BundleConst, BundleElement, BundleElementData, BundleExport,
    BundleExportedName, BundleFilter, BundleImport, BundleLibrary, BundleMacroError,
    BundleParameterKind, BundleType, BundleUnit, BundleVariance, ElementRef,
};
use crate::BundleError;

/// Translate `libraries` into a [`Bundle`].
///
/// References may point into any library of the store; an element that no
/// library owns fails with [`BundleError::DanglingReference`].
#[tracing::instrument(level = "debug", skip_all, fields(libraries = libraries.len()))]
pub fn encode_bundle(
    store: &ElementStore,
    interner: &StringInterner,
    libraries: &[LibraryId],
) -> Result<Bundle, BundleError> {
    let encoder = Encoder::new(store, interner);
    let libraries = libraries
        .iter()
        .map(|&id| encoder.library(store.library(id)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Bundle { libraries })
}

struct Encoder<'a> {
    store: &'a ElementStore,
    interner: &'a StringInterner,
    /// Owning library and local index of every owned element.
    locations: FxHashMap<ElementId, (LibraryId, u32)>,
}

impl<'a> Encoder<'a> {
    fn new(store: &'a ElementStore, interner: &'a StringInterner) -> Self {
        let mut locations = FxHashMap::default();
        for library in store.libraries() {
            for (index, &element) in library.elements.iter().enumerate() {
                locations.insert(element, (library.id, u32::try_from(index).unwrap_or(u32::MAX)));
            }
        }
        Encoder {
            store,
            interner,
            locations,
        }
    }

    fn name(&self, name: Name) -> String {
        self.interner.lookup(name).to_string()
    }

    fn reference(&self, element: ElementId) -> Result<ElementRef, BundleError> {
        let &(library, index) = self
            .locations
            .get(&element)
            .ok_or(BundleError::DanglingReference {
                element: element.raw(),
            })?;
        Ok(ElementRef {
            library: self.name(self.store.library(library).uri),
            index,
        })
    }

    fn references(&self, elements: &[ElementId]) -> Result<Vec<ElementRef>, BundleError> {
        elements.iter().map(|&e| self.reference(e)).collect()
    }

    fn optional(&self, element: Option<ElementId>) -> Result<Option<ElementRef>, BundleError> {
        element.map(|e| self.reference(e)).transpose()
    }

    fn library(&self, library: &LibraryEntry) -> Result<BundleLibrary, BundleError> {
        let local: FxHashMap<ElementId, u32> = library
            .elements
            .iter()
            .enumerate()
            .map(|(index, &element)| (element, u32::try_from(index).unwrap_or(u32::MAX)))
            .collect();
        let declarations = library
            .declarations
            .iter()
            .map(|element| {
                local.get(element).copied().ok_or(BundleError::DanglingReference {
                    element: element.raw(),
                })
            })
            .collect::<Result<_, _>>()?;

        let mut export_scope = library
            .export_scope
            .iter()
            .map(|(name, symbol)| {
                Ok(BundleExportedName {
                    name: self.name(name),
                    element: self.reference(symbol.element)?,
                    declared: symbol.origin == SymbolOrigin::Declared,
                })
            })
            .collect::<Result<Vec<_>, BundleError>>()?;
        export_scope.sort_by(|a, b| a.name.cmp(&b.name));

        let elements = library
            .elements
            .iter()
            .map(|&element| self.element(self.store.get(element)))
            .collect::<Result<_, _>>()?;

        Ok(BundleLibrary {
            uri: self.name(library.uri),
            units: library
                .units
                .iter()
                .map(|unit| BundleUnit {
                    uri: self.name(unit.uri),
                    is_synthetic: unit.is_synthetic,
                    is_augmentation: unit.is_augmentation,
                })
                .collect(),
            imports: library
                .imports
                .iter()
                .map(|import| BundleImport {
                    uri: self.name(import.uri),
                    prefix: import.prefix.map(|p| self.name(p)),
                    filters: self.filters(&import.filters),
                    is_implicit: import.is_implicit,
                })
                .collect(),
            exports: library
                .exports
                .iter()
                .map(|export| BundleExport {
                    uri: self.name(export.uri),
                    filters: self.filters(&export.filters),
                })
                .collect(),
            declarations,
            elements,
            export_scope,
        })
    }

    fn filters(&self, filters: &[NameFilter]) -> Vec<BundleFilter> {
        let sorted = |names: &FxHashSet<Name>| {
            let mut names: Vec<String> = names.iter().map(|&n| self.name(n)).collect();
            names.sort();
            names
        };
        filters
            .iter()
            .map(|filter| match filter {
                NameFilter::Show(names) => BundleFilter::Show(sorted(names)),
                NameFilter::Hide(names) => BundleFilter::Hide(sorted(names)),
            })
            .collect()
    }

    fn element(&self, element: &Element) -> Result<BundleElement, BundleError> {
        Ok(BundleElement {
            name: self.name(element.name),
            kind: element.kind.label().to_string(),
            flags: element.flags.bits(),
            enclosing: self.optional(element.enclosing)?,
            data: self.data(&element.data)?,
            metadata: element
                .metadata
                .iter()
                .map(|annotation| self.annotation(annotation))
                .collect::<Result<_, _>>()?,
        })
    }

    fn data(&self, data: &ElementData) -> Result<BundleElementData, BundleError> {
        Ok(match data {
            ElementData::Interface(data) => BundleElementData::Interface {
                type_params: self.references(&data.type_params)?,
                supertype: data.supertype.as_ref().map(|t| self.ty(t)).transpose()?,
                mixins: self.types(&data.mixins)?,
                interfaces: self.types(&data.interfaces)?,
                superclass_constraints: self.types(&data.superclass_constraints)?,
                members: self.references(&data.members)?,
                constructors: self.references(&data.constructors)?,
                macro_errors: data.macro_errors.iter().map(macro_error).collect(),
                super_invoked_names: data
                    .super_invoked_names
                    .iter()
                    .map(|&n| self.name(n))
                    .collect(),
            },
            ElementData::TypeAlias(data) => BundleElementData::TypeAlias {
                type_params: self.references(&data.type_params)?,
                aliased: self.ty(&data.aliased)?,
            },
            ElementData::Executable(data) => BundleElementData::Executable {
                type_params: self.references(&data.type_params)?,
                params: self.references(&data.params)?,
                return_type: self.ty(&data.return_type)?,
                super_constructor: self.optional(data.super_constructor)?,
                redirected_constructor: self.optional(data.redirected_constructor)?,
            },
            ElementData::Variable(data) => BundleElementData::Variable {
                ty: self.ty(&data.ty)?,
                initializer: data.initializer.as_ref().map(|c| self.constant(c)).transpose()?,
            },
            ElementData::Parameter(data) => BundleElementData::Parameter {
                ty: self.ty(&data.ty)?,
                kind: match data.kind {
                    ParameterKind::Required => BundleParameterKind::Required,
                    ParameterKind::OptionalPositional => BundleParameterKind::OptionalPositional,
                    ParameterKind::Named => BundleParameterKind::Named,
                    ParameterKind::RequiredNamed => BundleParameterKind::RequiredNamed,
                },
                default_value: data.default_value.as_ref().map(|c| self.constant(c)).transpose()?,
                field: self.optional(data.field)?,
            },
            ElementData::TypeParameter(data) => BundleElementData::TypeParameter {
                bound: data.bound.as_ref().map(|t| self.ty(t)).transpose()?,
                variance: match data.variance {
                    Variance::Unrelated => BundleVariance::Unrelated,
                    Variance::Covariant => BundleVariance::Covariant,
                    Variance::Contravariant => BundleVariance::Contravariant,
                    Variance::Invariant => BundleVariance::Invariant,
                },
            },
        })
    }

    fn types(&self, types: &[LinkedType]) -> Result<Vec<BundleType>, BundleError> {
        types.iter().map(|t| self.ty(t)).collect()
    }

    fn ty(&self, ty: &LinkedType) -> Result<BundleType, BundleError> {
        Ok(match ty {
            LinkedType::Dynamic => BundleType::Dynamic,
            LinkedType::Void => BundleType::Void,
            LinkedType::Never => BundleType::Never,
            LinkedType::Invalid => BundleType::Invalid,
            LinkedType::Interface {
                element,
                args,
                nullable,
            } => BundleType::Interface {
                element: self.reference(*element)?,
                args: self.types(args)?,
                nullable: *nullable,
            },
            LinkedType::TypeParameter { element, nullable } => BundleType::TypeParameter {
                element: self.reference(*element)?,
                nullable: *nullable,
            },
            LinkedType::Function {
                return_type,
                params,
                nullable,
            } => BundleType::Function {
                return_type: Box::new(self.ty(return_type)?),
                params: self.types(params)?,
                nullable: *nullable,
            },
            LinkedType::Alias {
                element,
                args,
                nullable,
            } => BundleType::Alias {
                element: self.reference(*element)?,
                args: self.types(args)?,
                nullable: *nullable,
            },
        })
    }

    fn constant(&self, expr: &ConstExpr) -> Result<BundleConst, BundleError> {
        Ok(match expr {
            ConstExpr::Null => BundleConst::Null,
            ConstExpr::Bool(value) => BundleConst::Bool(*value),
            ConstExpr::Int(value) => BundleConst::Int(*value),
            ConstExpr::Double(bits) => BundleConst::Double(*bits),
            ConstExpr::String(value) => BundleConst::String(self.name(*value)),
            ConstExpr::List(items) => BundleConst::List(self.constants(items)?),
            ConstExpr::Set(items) => BundleConst::Set(self.constants(items)?),
            ConstExpr::Map(entries) => BundleConst::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.constant(k)?, self.constant(v)?)))
                    .collect::<Result<_, BundleError>>()?,
            ),
            ConstExpr::Reference(element) => BundleConst::Reference(self.reference(*element)?),
            ConstExpr::TypeLiteral(element) => BundleConst::TypeLiteral(self.reference(*element)?),
            ConstExpr::Negate(inner) => BundleConst::Negate(self.boxed(inner)?),
            ConstExpr::Not(inner) => BundleConst::Not(self.boxed(inner)?),
            ConstExpr::Binary { op, left, right } => BundleConst::Binary {
                op: op_symbol(*op).to_string(),
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            ConstExpr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => BundleConst::Conditional {
                condition: self.boxed(condition)?,
                then_expr: self.boxed(then_expr)?,
                else_expr: self.boxed(else_expr)?,
            },
            ConstExpr::Construct { constructor, args } => BundleConst::Construct {
                constructor: self.reference(*constructor)?,
                args: args
                    .iter()
                    .map(|(name, arg)| Ok((name.map(|n| self.name(n)), self.constant(arg)?)))
                    .collect::<Result<_, BundleError>>()?,
            },
            ConstExpr::EnumValue { index, name } => BundleConst::EnumValue {
                index: *index,
                name: self.name(*name),
            },
            ConstExpr::Invalid => BundleConst::Invalid,
        })
    }

    fn boxed(&self, expr: &ConstExpr) -> Result<Box<BundleConst>, BundleError> {
        self.constant(expr).map(Box::new)
    }

    fn constants(&self, items: &[ConstExpr]) -> Result<Vec<BundleConst>, BundleError> {
        items.iter().map(|item| self.constant(item)).collect()
    }

    fn annotation(&self, annotation: &ElementAnnotation) -> Result<BundleAnnotation, BundleError> {
        Ok(BundleAnnotation {
            target: self.optional(annotation.target)?,
            value: self.constant(&annotation.value)?,
        })
    }
}

fn macro_error(error: &MacroApplicationError) -> BundleMacroError {
    match error {
        MacroApplicationError::Argument {
            annotation_index,
            argument_index,
            message,
        } => BundleMacroError::Argument {
            annotation_index: *annotation_index,
            argument_index: *argument_index,
            message: message.clone(),
        },
        MacroApplicationError::Execution {
            annotation_index,
            message,
            stack_trace,
        } => BundleMacroError::Execution {
            annotation_index: *annotation_index,
            message: message.clone(),
            stack_trace: stack_trace.clone(),
        },
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::IntDiv => "~/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::IfNull => "??",
    }
}

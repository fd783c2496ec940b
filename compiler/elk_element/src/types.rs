//! Resolved types.
//!
//! `LinkedType` is the boxed, structural representation produced by the
//! types pass. Alias references stay unexpanded (`LinkedType::Alias`) until
//! the type-graph analysis has ruled out self-referential aliases; after
//! that pass no `Alias` node remains in a batch library.

use rustc_hash::FxHashMap;

use crate::ElementId;

/// A resolved type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkedType {
    Dynamic,
    Void,
    Never,
    /// Unresolvable annotation or erased self-referential alias.
    Invalid,
    /// Class, mixin, or enum type.
    Interface {
        element: ElementId,
        args: Vec<LinkedType>,
        nullable: bool,
    },
    TypeParameter {
        element: ElementId,
        nullable: bool,
    },
    Function {
        return_type: Box<LinkedType>,
        params: Vec<LinkedType>,
        nullable: bool,
    },
    /// Reference to a type alias, expanded after type-graph analysis.
    Alias {
        element: ElementId,
        args: Vec<LinkedType>,
        nullable: bool,
    },
}

impl LinkedType {
    /// Non-nullable interface type.
    pub fn interface(element: ElementId, args: Vec<LinkedType>) -> Self {
        LinkedType::Interface {
            element,
            args,
            nullable: false,
        }
    }

    /// Whether `?` applies to this type. `dynamic` and `void` count as
    /// nullable.
    pub fn is_nullable(&self) -> bool {
        match self {
            LinkedType::Dynamic | LinkedType::Void => true,
            LinkedType::Never | LinkedType::Invalid => false,
            LinkedType::Interface { nullable, .. }
            | LinkedType::TypeParameter { nullable, .. }
            | LinkedType::Function { nullable, .. }
            | LinkedType::Alias { nullable, .. } => *nullable,
        }
    }

    /// The same type with `?` added when `nullable` is set. Never removes
    /// nullability.
    #[must_use]
    pub fn union_nullable(mut self, nullable: bool) -> Self {
        if nullable {
            match &mut self {
                LinkedType::Interface { nullable: n, .. }
                | LinkedType::TypeParameter { nullable: n, .. }
                | LinkedType::Function { nullable: n, .. }
                | LinkedType::Alias { nullable: n, .. } => *n = true,
                LinkedType::Dynamic
                | LinkedType::Void
                | LinkedType::Never
                | LinkedType::Invalid => {}
            }
        }
        self
    }

    /// Element of an interface type.
    pub fn interface_element(&self) -> Option<ElementId> {
        match self {
            LinkedType::Interface { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Type arguments of an interface or alias reference.
    pub fn type_args(&self) -> &[LinkedType] {
        match self {
            LinkedType::Interface { args, .. } | LinkedType::Alias { args, .. } => args,
            _ => &[],
        }
    }

    /// Replace type parameters according to `map`.
    ///
    /// A nullable parameter stays nullable after substitution (`T?` with
    /// `T = int` becomes `int?`).
    #[must_use]
    pub fn substitute(&self, map: &FxHashMap<ElementId, LinkedType>) -> LinkedType {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            LinkedType::TypeParameter { element, nullable } => match map.get(element) {
                Some(replacement) => replacement.clone().union_nullable(*nullable),
                None => self.clone(),
            },
            LinkedType::Interface {
                element,
                args,
                nullable,
            } => LinkedType::Interface {
                element: *element,
                args: args.iter().map(|a| a.substitute(map)).collect(),
                nullable: *nullable,
            },
            LinkedType::Alias {
                element,
                args,
                nullable,
            } => LinkedType::Alias {
                element: *element,
                args: args.iter().map(|a| a.substitute(map)).collect(),
                nullable: *nullable,
            },
            LinkedType::Function {
                return_type,
                params,
                nullable,
            } => LinkedType::Function {
                return_type: Box::new(return_type.substitute(map)),
                params: params.iter().map(|p| p.substitute(map)).collect(),
                nullable: *nullable,
            },
            LinkedType::Dynamic | LinkedType::Void | LinkedType::Never | LinkedType::Invalid => {
                self.clone()
            }
        }
    }

    /// Visit this type and every nested type, parents first.
    pub fn walk(&self, f: &mut impl FnMut(&LinkedType)) {
        f(self);
        match self {
            LinkedType::Interface { args, .. } | LinkedType::Alias { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            LinkedType::Function {
                return_type,
                params,
                ..
            } => {
                return_type.walk(f);
                for param in params {
                    param.walk(f);
                }
            }
            LinkedType::TypeParameter { .. }
            | LinkedType::Dynamic
            | LinkedType::Void
            | LinkedType::Never
            | LinkedType::Invalid => {}
        }
    }

    /// Whether the type mentions `element` anywhere (as interface, alias, or
    /// type parameter).
    pub fn mentions(&self, element: ElementId) -> bool {
        let mut found = false;
        self.walk(&mut |ty| match ty {
            LinkedType::Interface { element: e, .. }
            | LinkedType::Alias { element: e, .. }
            | LinkedType::TypeParameter { element: e, .. } => found |= *e == element,
            _ => {}
        });
        found
    }
}

/// Variance of a type parameter in the type it parameterizes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variance {
    /// The parameter does not occur.
    #[default]
    Unrelated,
    Covariant,
    Contravariant,
    Invariant,
}

impl Variance {
    /// Least upper bound of two occurrences.
    #[must_use]
    pub fn meet(self, other: Variance) -> Variance {
        match (self, other) {
            (Variance::Unrelated, v) | (v, Variance::Unrelated) => v,
            (a, b) if a == b => a,
            _ => Variance::Invariant,
        }
    }

    /// Variance of an occurrence nested inside a position of variance
    /// `self`.
    #[must_use]
    pub fn compose(self, inner: Variance) -> Variance {
        match (self, inner) {
            (Variance::Unrelated, _) | (_, Variance::Unrelated) => Variance::Unrelated,
            (Variance::Invariant, _) | (_, Variance::Invariant) => Variance::Invariant,
            (Variance::Covariant, v) => v,
            (Variance::Contravariant, Variance::Covariant) => Variance::Contravariant,
            (Variance::Contravariant, Variance::Contravariant) => Variance::Covariant,
        }
    }
}

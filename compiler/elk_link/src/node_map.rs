//! Element ↔ syntax correspondence.
//!
//! The builder records, for every element it creates, a [`NodeRef`] path
//! into the batch's parsed units. Later passes use it to find the syntax an
//! element was declared from (type annotations, initializers, annotations).
//!
//! The map is owned by the session and consumed by [`NodeMap::detach`],
//! after which no pass can reach syntax.

use elk_element::ElementId;
use elk_ir::{CompilationUnit, Declaration, EnumConstantDecl, Member, Param, TypeParam};
use rustc_hash::FxHashMap;

use crate::builder::LibraryBuilder;

/// Position of a syntax node within the batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeRef {
    /// Index of the library builder.
    pub library: u32,
    pub unit: u32,
    /// Index of the top-level declaration in the unit.
    pub decl: u32,
    pub node: NodeKind,
}

/// Which node below the top-level declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum NodeKind {
    Declaration,
    EnumConstant(u32),
    Member(u32),
    /// Default constructor synthesized for a class without constructors.
    ImplicitConstructor,
    /// Type parameter of the declaration, or of one of its methods.
    TypeParam { member: Option<u32>, index: u32 },
    /// Parameter of a top-level function, or of a method or constructor.
    Param { member: Option<u32>, index: u32 },
}

impl NodeRef {
    pub fn declaration(library: usize, unit: usize, decl: usize) -> Self {
        NodeRef {
            library: index_u32(library),
            unit: index_u32(unit),
            decl: index_u32(decl),
            node: NodeKind::Declaration,
        }
    }

    #[must_use]
    pub fn with_node(self, node: NodeKind) -> Self {
        NodeRef { node, ..self }
    }
}

pub(crate) fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// A syntax node found through the map.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Node<'a> {
    Declaration,
    EnumConstant(&'a EnumConstantDecl),
    Member(&'a Member),
    ImplicitConstructor,
    TypeParam(&'a TypeParam),
    Param(&'a Param),
}

/// The located node together with its unit and top-level declaration.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Located<'a> {
    pub unit: &'a CompilationUnit,
    pub declaration: &'a Declaration,
    pub node: Node<'a>,
}

/// Bidirectional element ↔ [`NodeRef`] table.
#[derive(Default)]
pub(crate) struct NodeMap {
    nodes: FxHashMap<ElementId, NodeRef>,
    elements: FxHashMap<NodeRef, ElementId>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: ElementId, node: NodeRef) {
        self.nodes.insert(element, node);
        self.elements.insert(node, element);
    }

    pub fn node(&self, element: ElementId) -> Option<NodeRef> {
        self.nodes.get(&element).copied()
    }

    pub fn element(&self, node: NodeRef) -> Option<ElementId> {
        self.elements.get(&node).copied()
    }

    /// Resolve `element` to its syntax.
    pub fn locate<'a>(
        &self,
        builders: &'a [LibraryBuilder],
        element: ElementId,
    ) -> Option<Located<'a>> {
        let node_ref = self.node(element)?;
        let unit = &builders
            .get(node_ref.library as usize)?
            .units
            .get(node_ref.unit as usize)?
            .unit;
        let declaration = unit.declarations.get(node_ref.decl as usize)?;
        let node = match node_ref.node {
            NodeKind::Declaration => Node::Declaration,
            NodeKind::ImplicitConstructor => Node::ImplicitConstructor,
            NodeKind::EnumConstant(index) => match declaration {
                Declaration::Enum(decl) => Node::EnumConstant(decl.constants.get(index as usize)?),
                _ => return None,
            },
            NodeKind::Member(index) => Node::Member(declaration.members().get(index as usize)?),
            NodeKind::TypeParam { member, index } => {
                let params = match member {
                    None => declaration.type_params(),
                    Some(member) => match declaration.members().get(member as usize)? {
                        Member::Method(method) => &method.type_params,
                        Member::Field(_) | Member::Constructor(_) => return None,
                    },
                };
                Node::TypeParam(params.get(index as usize)?)
            }
            NodeKind::Param { member, index } => {
                let params = match member {
                    None => match declaration {
                        Declaration::Function(function) => &function.params,
                        _ => return None,
                    },
                    Some(member) => match declaration.members().get(member as usize)? {
                        Member::Method(method) => &method.params,
                        Member::Constructor(constructor) => &constructor.params,
                        Member::Field(_) => return None,
                    },
                };
                Node::Param(params.get(index as usize)?)
            }
        };
        Some(Located {
            unit,
            declaration,
            node,
        })
    }

    /// Drop every element ↔ syntax link. Returns how many were dropped.
    pub fn detach(self) -> usize {
        self.nodes.len()
    }
}

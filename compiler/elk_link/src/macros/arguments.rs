//! Macro argument evaluation.
//!
//! Macro arguments cross into the macro executor as plain values, so only
//! expressions whose value is known from the syntax alone are accepted.

use std::collections::BTreeMap;
use std::fmt;

use elk_ir::{
    ensure_sufficient_stack, Argument, CollectionElement, ExprArena, ExprId, ExprKind,
    StringInterner,
};
use serde::{Deserialize, Serialize};

/// A literal macro argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    List(Vec<ArgValue>),
    /// Entries in source order.
    Map(Vec<(ArgValue, ArgValue)>),
}

impl Drop for ArgValue {
    /// Unnests collections onto a worklist so dropping a deeply nested
    /// value runs in constant stack.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        unnest(self, &mut pending);
        while let Some(mut value) = pending.pop() {
            unnest(&mut value, &mut pending);
        }
    }
}

fn unnest(value: &mut ArgValue, pending: &mut Vec<ArgValue>) {
    match value {
        ArgValue::List(items) => pending.append(items),
        ArgValue::Map(entries) => {
            for (key, entry) in entries.drain(..) {
                pending.push(key);
                pending.push(entry);
            }
        }
        _ => {}
    }
}

/// Evaluated arguments of one macro application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroArguments {
    pub positional: Vec<ArgValue>,
    pub named: BTreeMap<String, ArgValue>,
}

/// An argument that is not a supported literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentError {
    /// Position of the argument in the argument list, named ones included.
    pub argument_index: u32,
    pub message: String,
}

impl ArgumentError {
    #[cold]
    pub fn unsupported(argument_index: u32) -> Self {
        ArgumentError {
            argument_index,
            message: "unsupported argument expression".to_string(),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "argument {}: {}", self.argument_index, self.message)
    }
}

impl std::error::Error for ArgumentError {}

/// Evaluate every argument of a macro application. Stops at the first
/// unsupported argument.
pub fn evaluate_arguments(
    arena: &ExprArena,
    interner: &StringInterner,
    args: &[Argument],
) -> Result<MacroArguments, ArgumentError> {
    let mut arguments = MacroArguments::default();
    for (index, arg) in args.iter().enumerate() {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        let value = evaluate_argument(arena, interner, index, arg.value)?;
        match arg.name {
            Some(name) => {
                arguments.named.insert(interner.lookup(name).to_string(), value);
            }
            None => arguments.positional.push(value),
        }
    }
    Ok(arguments)
}

/// Evaluate one argument expression; `argument_index` is reported on
/// failure.
pub fn evaluate_argument(
    arena: &ExprArena,
    interner: &StringInterner,
    argument_index: u32,
    expr: ExprId,
) -> Result<ArgValue, ArgumentError> {
    ensure_sufficient_stack(|| evaluate_argument_inner(arena, interner, argument_index, expr))
}

fn evaluate_argument_inner(
    arena: &ExprArena,
    interner: &StringInterner,
    argument_index: u32,
    expr: ExprId,
) -> Result<ArgValue, ArgumentError> {
    let unsupported = || ArgumentError::unsupported(argument_index);
    let eval = |e: ExprId| evaluate_argument(arena, interner, argument_index, e);

    match arena.kind(expr) {
        ExprKind::Null => Ok(ArgValue::Null),
        ExprKind::Bool(value) => Ok(ArgValue::Bool(*value)),
        ExprKind::Int(value) => Ok(ArgValue::Int(*value)),
        ExprKind::Double(bits) => Ok(ArgValue::Double(f64::from_bits(*bits))),
        ExprKind::String(value) => Ok(ArgValue::String(interner.lookup(*value).to_string())),
        ExprKind::AdjacentStrings(parts) => {
            let mut text = String::new();
            for &part in parts {
                match eval(part)? {
                    ArgValue::String(ref s) => text.push_str(s),
                    _ => return Err(unsupported()),
                }
            }
            Ok(ArgValue::String(text))
        }
        ExprKind::List { elements, .. } => elements
            .iter()
            .map(|&e| eval(e))
            .collect::<Result<_, _>>()
            .map(ArgValue::List),
        ExprKind::SetOrMap { elements, .. } => elements
            .iter()
            .map(|element| match element {
                CollectionElement::MapEntry { key, value } => Ok((eval(*key)?, eval(*value)?)),
                CollectionElement::Expr(_) => Err(unsupported()),
            })
            .collect::<Result<_, _>>()
            .map(ArgValue::Map),
        ExprKind::Negate(operand) => match arena.kind(*operand) {
            ExprKind::Int(value) => value.checked_neg().map(ArgValue::Int).ok_or_else(unsupported),
            ExprKind::Double(bits) => Ok(ArgValue::Double(-f64::from_bits(*bits))),
            _ => Err(unsupported()),
        },
        ExprKind::Interpolation(_)
        | ExprKind::Not(_)
        | ExprKind::Binary { .. }
        | ExprKind::Conditional { .. }
        | ExprKind::Identifier(_)
        | ExprKind::Prefixed { .. }
        | ExprKind::PropertyAccess { .. }
        | ExprKind::Invocation { .. }
        | ExprKind::InstanceCreation { .. }
        | ExprKind::SuperInvocation { .. }
        | ExprKind::SuperPropertyAccess(_)
        | ExprKind::This
        | ExprKind::Block(_) => Err(unsupported()),
    }
}

//! Converter extension chains.
//!
//! A concept may declare custom one-step conversions with an arithmetic
//! formula over a placeholder variable. A chain from `from` to `to` is the
//! sequence of steps with the lowest total distance; among equal totals the
//! chain whose steps were declared first wins.

use evalexpr::{eval_with_context, ContextWithMutableVariables, HashMapContext, Value as ExprValue};
use marshaller_core::value::number;
use marshaller_core::{ConverterExtension, MarshallerError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Lowest-distance chain of extensions from `from` to `to`, or `None` when
/// the extensions do not connect them. An empty chain means `from == to`.
pub fn find_chain<'e>(
    extensions: &'e [ConverterExtension],
    from: &str,
    to: &str,
) -> Option<Vec<&'e ConverterExtension>> {
    if from == to {
        return Some(Vec::new());
    }
    // node -> (total distance, index of the extension that reached it)
    let mut best: HashMap<&str, (i64, Option<usize>)> = HashMap::new();
    let mut settled: Vec<&str> = Vec::new();
    best.insert(from, (0, None));

    loop {
        let current = best
            .iter()
            .filter(|(node, _)| !settled.contains(*node))
            .min_by_key(|(_, (distance, via))| (*distance, via.unwrap_or(0)))
            .map(|(node, (distance, _))| (*node, *distance));
        let Some((node, distance)) = current else {
            return None;
        };
        if node == to {
            break;
        }
        settled.push(node);
        for (i, ext) in extensions.iter().enumerate() {
            if ext.from != node || settled.contains(&ext.to.as_str()) {
                continue;
            }
            let candidate = distance + ext.distance.max(0);
            let improves = match best.get(ext.to.as_str()) {
                Some((known, _)) => candidate < *known,
                None => true,
            };
            if improves {
                best.insert(ext.to.as_str(), (candidate, Some(i)));
            }
        }
    }

    let mut chain = Vec::new();
    let mut node = to;
    while let Some((_, Some(i))) = best.get(node) {
        let ext = &extensions[*i];
        chain.push(ext);
        node = ext.from.as_str();
    }
    chain.reverse();
    Some(chain)
}

/// Evaluate one extension's formula with the placeholder bound to `value`.
pub fn apply(extension: &ConverterExtension, value: &Value) -> Result<Value> {
    let x = value.as_f64().ok_or_else(|| {
        MarshallerError::Cast(format!(
            "extension {} -> {} expects a number, got {}",
            extension.from, extension.to, value
        ))
    })?;
    let mut context = HashMapContext::new();
    context
        .set_value(extension.placeholder_name.clone(), ExprValue::Float(x))
        .map_err(|e| MarshallerError::Cast(e.to_string()))?;
    let result = eval_with_context(&extension.formula, &context)
        .and_then(|v| v.as_number())
        .map_err(|e| {
            MarshallerError::Cast(format!("formula '{}' failed: {}", extension.formula, e))
        })?;
    Ok(number(result))
}

/// Run `value` through every step of `chain`.
pub fn apply_chain(chain: &[&ConverterExtension], value: &Value) -> Result<Value> {
    chain
        .iter()
        .try_fold(value.clone(), |current, ext| apply(ext, &current))
}

//! Structural diff between two JSON-projected values.

use super::PatchOp;
use crate::path::PropertyPath;
use serde_json::Value;

/// Compute the ordered op set transforming `old` into `new`.
///
/// Objects are compared key by key: removed keys emit `Remove`, added
/// keys emit `Set` of the whole subtree, shared keys recurse. Arrays of
/// equal length recurse per index; a length change sets the whole
/// array. Anything else that differs is a leaf `Set`.
pub fn diff_values(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    walk(PropertyPath::root(), old, new, &mut ops);
    ops
}

fn walk(path: PropertyPath, old: &Value, new: &Value, ops: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    ops.push(PatchOp::Remove {
                        path: path.clone().key(key.clone()),
                    });
                }
            }
            for (key, new_value) in new_map {
                let child = path.clone().key(key.clone());
                match old_map.get(key) {
                    Some(old_value) => walk(child, old_value, new_value, ops),
                    None => ops.push(PatchOp::Set {
                        path: child,
                        value: new_value.clone(),
                    }),
                }
            }
        }
        (Value::Array(old_arr), Value::Array(new_arr)) if old_arr.len() == new_arr.len() => {
            for (i, (old_value, new_value)) in old_arr.iter().zip(new_arr).enumerate() {
                walk(path.clone().index(i), old_value, new_value, ops);
            }
        }
        _ => ops.push(PatchOp::Set {
            path,
            value: new.clone(),
        }),
    }
}

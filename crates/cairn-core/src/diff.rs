//! Structural diff between a deployed and a proposed stack.
//!
//! Templates are compared as JSON trees, parameters as flat maps. Each entry
//! carries a dotted path (`Resources.EBApp.Properties.ApplicationName`, array
//! elements as `[0]`) and the change at that path.

use crate::ResolvedParameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Added { value: Value },
    Removed { value: Value },
    Modified { from: Value, to: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    pub change: Change,
}

/// Differences in parameters and template, deployed -> proposed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDiff {
    pub parameters: Vec<DiffEntry>,
    pub template: Vec<DiffEntry>,
}

impl StructuredDiff {
    /// Compare deployed (`None` when the stack does not exist) with proposed.
    pub fn compute(
        current_template: Option<&Value>,
        current_params: &ResolvedParameters,
        proposed_template: &Value,
        proposed_params: &ResolvedParameters,
    ) -> Self {
        let mut template = Vec::new();
        match current_template {
            Some(current) => diff_values("", current, proposed_template, &mut template),
            None => template.push(DiffEntry {
                path: String::new(),
                change: Change::Added {
                    value: proposed_template.clone(),
                },
            }),
        }

        Self {
            parameters: diff_params(current_params, proposed_params),
            template,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.template.is_empty()
    }
}

fn diff_params(old: &ResolvedParameters, new: &ResolvedParameters) -> Vec<DiffEntry> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let change = match (old.get(key), new.get(key)) {
                (None, Some(v)) => Change::Added {
                    value: Value::String(v.clone()),
                },
                (Some(v), None) => Change::Removed {
                    value: Value::String(v.clone()),
                },
                (Some(a), Some(b)) if a != b => Change::Modified {
                    from: Value::String(a.clone()),
                    to: Value::String(b.clone()),
                },
                _ => return None,
            };
            Some(DiffEntry {
                path: key.clone(),
                change,
            })
        })
        .collect()
}

fn diff_values(path: &str, old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                let child = join_key(path, key);
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => diff_values(&child, x, y, out),
                    (None, Some(y)) => out.push(DiffEntry {
                        path: child,
                        change: Change::Added { value: y.clone() },
                    }),
                    (Some(x), None) => out.push(DiffEntry {
                        path: child,
                        change: Change::Removed { value: x.clone() },
                    }),
                    (None, None) => {}
                }
            }
        }
        // Element-wise only when the shape is unchanged; otherwise the whole
        // array is reported as modified.
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
            for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
                diff_values(&format!("{}[{}]", path, i), x, y, out);
            }
        }
        _ => out.push(DiffEntry {
            path: path.to_string(),
            change: Change::Modified {
                from: old.clone(),
                to: new.clone(),
            },
        }),
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

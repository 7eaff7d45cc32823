//!
//! # JSON Patch
//!
//! RFC 6902 operations, generation from two documents and application.
//! RFC 7386 merge patch application.
//!
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use crate::Changes;
use crate::Diff;
use crate::DiffError;
use crate::JsonDiff;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Test { path: String, value: Value },
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::Add {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::Replace {
            path: path.into(),
            value,
        }
    }

    pub fn test(path: impl Into<String>, value: Value) -> Self {
        Self::Test {
            path: path.into(),
            value,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Test { path, .. } => path,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum PatchError {
    InvalidPointer(String),
    PathNotFound(String),
    TestFailed(String),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPointer(path) => write!(f, "invalid json pointer: {}", path),
            Self::PathNotFound(path) => write!(f, "path not found: {}", path),
            Self::TestFailed(path) => write!(f, "test operation failed at: {}", path),
        }
    }
}

impl std::error::Error for PatchError {}

/// escape a single reference token
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// compute operations that turn `old` into `new`
pub fn json_patch(old: &Value, new: &Value) -> Result<Vec<PatchOperation>, DiffError> {
    let diff = old.diff(new)?;
    let mut ops = vec![];
    collect_ops(&diff, old, "", &mut ops);
    trace!(ops = ops.len(), "computed json patch");
    Ok(ops)
}

fn collect_ops(diff: &JsonDiff, old: &Value, path: &str, ops: &mut Vec<PatchOperation>) {
    match diff {
        Diff::None => {}
        Diff::Delete => ops.push(PatchOperation::remove(path)),
        Diff::Replace(value) => ops.push(PatchOperation::replace(path, value.clone())),
        Diff::Patch(patch) => {
            for (key, child) in patch.get_inner_ref() {
                let child_path = format!("{}/{}", path, escape_token(key));
                match old.get(key) {
                    Some(old_child) => collect_ops(child, old_child, &child_path, ops),
                    None => {
                        if let Diff::Replace(value) = child {
                            ops.push(PatchOperation::add(child_path, value.clone()));
                        }
                    }
                }
            }
        }
    }
}

/// apply operations in order; on failure the target is left untouched
pub fn apply_patch(target: &mut Value, ops: &[PatchOperation]) -> Result<(), PatchError> {
    let mut working = target.clone();
    for op in ops {
        apply_operation(&mut working, op)?;
    }
    *target = working;
    Ok(())
}

fn split_pointer(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(vec![]);
    }
    match path.strip_prefix('/') {
        Some(rest) => Ok(rest.split('/').map(unescape_token).collect()),
        None => Err(PatchError::InvalidPointer(path.to_owned())),
    }
}

fn apply_operation(doc: &mut Value, op: &PatchOperation) -> Result<(), PatchError> {
    let path = op.path();
    let mut tokens = split_pointer(path)?;

    let last = match tokens.pop() {
        Some(last) => last,
        None => {
            // whole document
            return match op {
                PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => {
                    *doc = value.clone();
                    Ok(())
                }
                PatchOperation::Remove { .. } => {
                    *doc = Value::Null;
                    Ok(())
                }
                PatchOperation::Test { value, .. } => {
                    if doc == value {
                        Ok(())
                    } else {
                        Err(PatchError::TestFailed(path.to_owned()))
                    }
                }
            };
        }
    };

    let mut parent = &mut *doc;
    for token in &tokens {
        parent = match parent {
            Value::Object(map) => map.get_mut(token),
            Value::Array(list) => token.parse::<usize>().ok().and_then(move |i| list.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| PatchError::PathNotFound(path.to_owned()))?;
    }

    match parent {
        Value::Object(map) => apply_to_object(map, &last, op, path),
        Value::Array(list) => apply_to_array(list, &last, op, path),
        _ => Err(PatchError::PathNotFound(path.to_owned())),
    }
}

fn apply_to_object(
    map: &mut Map<String, Value>,
    key: &str,
    op: &PatchOperation,
    path: &str,
) -> Result<(), PatchError> {
    match op {
        PatchOperation::Add { value, .. } => {
            map.insert(key.to_owned(), value.clone());
        }
        PatchOperation::Replace { value, .. } => match map.get_mut(key) {
            Some(existing) => *existing = value.clone(),
            None => return Err(PatchError::PathNotFound(path.to_owned())),
        },
        PatchOperation::Remove { .. } => {
            if map.remove(key).is_none() {
                return Err(PatchError::PathNotFound(path.to_owned()));
            }
        }
        PatchOperation::Test { value, .. } => {
            if map.get(key) != Some(value) {
                return Err(PatchError::TestFailed(path.to_owned()));
            }
        }
    }
    Ok(())
}

fn apply_to_array(
    list: &mut Vec<Value>,
    token: &str,
    op: &PatchOperation,
    path: &str,
) -> Result<(), PatchError> {
    if token == "-" {
        return match op {
            PatchOperation::Add { value, .. } => {
                list.push(value.clone());
                Ok(())
            }
            _ => Err(PatchError::PathNotFound(path.to_owned())),
        };
    }

    let index = token
        .parse::<usize>()
        .map_err(|_| PatchError::InvalidPointer(path.to_owned()))?;

    match op {
        PatchOperation::Add { value, .. } => {
            if index > list.len() {
                return Err(PatchError::PathNotFound(path.to_owned()));
            }
            list.insert(index, value.clone());
        }
        PatchOperation::Replace { value, .. } => match list.get_mut(index) {
            Some(existing) => *existing = value.clone(),
            None => return Err(PatchError::PathNotFound(path.to_owned())),
        },
        PatchOperation::Remove { .. } => {
            if index >= list.len() {
                return Err(PatchError::PathNotFound(path.to_owned()));
            }
            list.remove(index);
        }
        PatchOperation::Test { value, .. } => {
            if list.get(index) != Some(value) {
                return Err(PatchError::TestFailed(path.to_owned()));
            }
        }
    }
    Ok(())
}

/// RFC 7386: null removes a key, objects merge recursively, anything else replaces
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(target_map) = target {
                for (key, value) in patch_map {
                    if value.is_null() {
                        target_map.remove(key);
                    } else {
                        let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                        merge_patch(entry, value);
                    }
                }
            }
        }
        _ => *target = patch.clone(),
    }
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use super::apply_patch;
    use super::json_patch;
    use super::merge_patch;
    use super::PatchError;
    use super::PatchOperation;

    #[test]
    fn test_operation_encoding() {
        let op = PatchOperation::replace("/spec/started", json!(true));
        assert_eq!(
            serde_json::to_value(&op).expect("json"),
            json!({ "op": "replace", "path": "/spec/started", "value": true })
        );

        let op: PatchOperation =
            serde_json::from_value(json!({ "op": "remove", "path": "/metadata/annotations/a" }))
                .expect("op");
        assert_eq!(op, PatchOperation::remove("/metadata/annotations/a"));
    }

    #[test]
    fn test_generate_patch() {
        let old = json!({
            "spec": { "started": false },
            "metadata": { "annotations": { "che.eclipse.org/old": "x" } }
        });
        let new = json!({
            "spec": { "started": true, "routingClass": "che" },
            "metadata": { "annotations": {} }
        });

        let ops = json_patch(&old, &new).expect("patch");
        assert_eq!(
            ops,
            vec![
                PatchOperation::remove("/metadata/annotations/che.eclipse.org~1old"),
                PatchOperation::add("/spec/routingClass", json!("che")),
                PatchOperation::replace("/spec/started", json!(true)),
            ]
        );

        let mut doc = old.clone();
        apply_patch(&mut doc, &ops).expect("apply");
        assert_eq!(doc, new);
    }

    #[test]
    fn test_identical_documents() {
        let doc = json!({ "a": [1, 2] });
        assert!(json_patch(&doc, &doc).expect("patch").is_empty());
    }

    #[test]
    fn test_apply_array() {
        let mut doc = json!({ "components": [ { "name": "a" } ] });
        apply_patch(
            &mut doc,
            &[
                PatchOperation::add("/components/-", json!({ "name": "c" })),
                PatchOperation::add("/components/1", json!({ "name": "b" })),
                PatchOperation::test("/components/2/name", json!("c")),
                PatchOperation::remove("/components/0"),
            ],
        )
        .expect("apply");
        assert_eq!(doc, json!({ "components": [ { "name": "b" }, { "name": "c" } ] }));
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut doc = json!({ "spec": { "started": false } });
        let result = apply_patch(
            &mut doc,
            &[
                PatchOperation::replace("/spec/started", json!(true)),
                PatchOperation::replace("/spec/missing", json!(1)),
            ],
        );
        assert_eq!(result, Err(PatchError::PathNotFound("/spec/missing".to_owned())));
        assert_eq!(doc, json!({ "spec": { "started": false } }));
    }

    #[test]
    fn test_invalid_pointer() {
        let mut doc = json!({});
        let result = apply_patch(&mut doc, &[PatchOperation::remove("spec")]);
        assert_eq!(result, Err(PatchError::InvalidPointer("spec".to_owned())));
    }

    #[test]
    fn test_merge_patch() {
        let mut doc = json!({
            "metadata": { "labels": { "a": "1", "b": "2" } },
            "spec": { "started": false }
        });
        merge_patch(
            &mut doc,
            &json!({
                "metadata": { "labels": { "b": null, "c": "3" } },
                "spec": { "started": true }
            }),
        );
        assert_eq!(
            doc,
            json!({
                "metadata": { "labels": { "a": "1", "c": "3" } },
                "spec": { "started": true }
            })
        );
    }
}

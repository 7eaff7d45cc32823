mod diff;

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;

use crate::Changes;
use crate::Diff;
use crate::DiffError;

pub type JsonDiff = Diff<Value, PatchObject>;

/// per key changes between two json objects
#[derive(Debug, Default)]
pub struct PatchObject(BTreeMap<String, JsonDiff>);

impl PatchObject {
    pub(crate) fn diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Result<Self, DiffError> {
        let mut delta = BTreeMap::new();

        for (key, new_val) in new.iter() {
            match old.get(key) {
                Some(old_val) => {
                    let diff = old_val.diff(new_val)?;
                    if !diff.is_none() {
                        delta.insert(key.clone(), diff);
                    }
                }
                None => {
                    delta.insert(key.clone(), Diff::Replace(new_val.clone()));
                }
            }
        }

        for key in old.keys() {
            if !new.contains_key(key) {
                delta.insert(key.clone(), Diff::Delete);
            }
        }

        Ok(Self(delta))
    }

    pub fn get_inner_ref(&self) -> &BTreeMap<String, JsonDiff> {
        &self.0
    }
}

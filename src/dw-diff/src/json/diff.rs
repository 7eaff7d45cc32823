use serde_json::Value;

use super::JsonDiff;
use super::PatchObject;
use crate::Changes;
use crate::Diff;
use crate::DiffError;

impl Changes for Value {
    type Replace = Value;
    type Patch = PatchObject;

    fn diff(&self, new: &Self) -> Result<JsonDiff, DiffError> {
        if *self == *new {
            return Ok(Diff::None);
        }
        match self {
            Value::Null => Ok(Diff::Replace(new.clone())),
            _ => {
                match new {
                    Value::Null => Ok(Diff::Replace(Value::Null)),
                    // scalars and lists are replaced as a whole
                    Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                        Ok(Diff::Replace(new.clone()))
                    }
                    Value::Object(ref new_val) => match self {
                        Value::Object(ref old_val) => {
                            let patch = PatchObject::diff(old_val, new_val)?;
                            Ok(Diff::Patch(patch))
                        }
                        _ => Err(DiffError::DiffValue),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod test {

    use serde_json::json;
    use serde_json::Value;

    use super::Changes;

    #[test]
    fn test_null_comparision() {
        let n1 = Value::Null;
        let str1 = Value::String("test".to_owned());
        let str2 = Value::String("test".to_owned());

        assert!(n1.diff(&str1).expect("diff").is_replace());
        assert!(str1.diff(&str2).expect("diff").is_none());
    }

    #[test]
    fn test_object_comparision() {
        let old_spec = json!({
            "started": false,
            "routingClass": "che"
        });
        let new_spec = json!({
            "started": true,
            "routingClass": "che"
        });

        let diff = old_spec.diff(&new_spec).expect("diff");
        assert!(diff.is_patch());
        let patch = diff.as_patch_ref().expect("patch").get_inner_ref();
        assert_eq!(patch.len(), 1);
        let diff_started = patch.get("started").expect("started");
        assert!(diff_started.is_replace());
        assert_eq!(diff_started.as_replace_ref(), Some(&json!(true)));
    }

    #[test]
    fn test_object_to_scalar_is_error() {
        let old = json!({ "template": {} });
        let new = json!({ "template": { "components": [] } });
        assert!(old.diff(&new).is_ok());

        let old = json!("scalar");
        assert!(old.diff(&new).is_err());
    }
}

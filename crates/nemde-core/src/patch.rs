//! Scenario edits applied to a raw casefile before typed deserialisation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{NemdeError, NemdeResult};

/// Replace the value at a JSON pointer (RFC 6901), e.g.
/// `/traders/3/offers/0/max_avail`.
///
/// A missing final object key is inserted; every other path segment must exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasefilePatch {
    pub path: String,
    pub value: Value,
}

impl CasefilePatch {
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn apply(&self, root: &mut Value) -> NemdeResult<()> {
        if let Some(target) = root.pointer_mut(&self.path) {
            *target = self.value.clone();
            return Ok(());
        }

        let (parent_path, key) = self
            .path
            .rsplit_once('/')
            .ok_or_else(|| NemdeError::Parse(format!("invalid patch path '{}'", self.path)))?;
        let key = key.replace("~1", "/").replace("~0", "~");
        match root.pointer_mut(parent_path) {
            Some(Value::Object(map)) => {
                map.insert(key, self.value.clone());
                Ok(())
            }
            _ => Err(NemdeError::Parse(format!(
                "patch path '{}' does not resolve",
                self.path
            ))),
        }
    }
}

/// Apply patches in order.
pub fn apply_patches(root: &mut Value, patches: &[CasefilePatch]) -> NemdeResult<()> {
    for patch in patches {
        patch.apply(root)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_existing_value() {
        let mut doc = json!({"regions": [{"id": "NSW1", "initial_demand": 7000.0}]});
        apply_patches(
            &mut doc,
            &[CasefilePatch::new("/regions/0/initial_demand", 7100.0)],
        )
        .unwrap();
        assert_eq!(doc["regions"][0]["initial_demand"], 7100.0);
    }

    #[test]
    fn inserts_missing_object_key() {
        let mut doc = json!({"case": {"case_id": "x"}});
        CasefilePatch::new("/case/intervention", true)
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc["case"]["intervention"], true);
    }

    #[test]
    fn unresolvable_path_is_rejected() {
        let mut doc = json!({"case": {}});
        let err = CasefilePatch::new("/traders/0/uigf", 1.0)
            .apply(&mut doc)
            .unwrap_err();
        assert!(err.is_input_defect());
    }
}

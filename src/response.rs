use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::env_provider::{EnvProvider, LookupError, VariableSource};

/// Outcome of resolving one key.
///
/// Always serializes as `{"value": ..., "error": ...}`: a resolved secret carries
/// `"error": null`, a failed lookup carries an empty `value` and the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Failed(LookupError),
}

impl From<Result<String, LookupError>> for Resolution {
    fn from(result: Result<String, LookupError>) -> Self {
        match result {
            Ok(value) => Self::Resolved(value),
            Err(e) => Self::Failed(e),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entry = serializer.serialize_struct("Resolution", 2)?;
        match self {
            Self::Resolved(value) => {
                entry.serialize_field("value", value)?;
                entry.serialize_field("error", &None::<String>)?;
            }
            Self::Failed(e) => {
                entry.serialize_field("value", "")?;
                entry.serialize_field("error", &e.to_string())?;
            }
        }
        entry.end()
    }
}

/// Secret key to resolution, one entry per distinct key.
#[derive(Debug, Default, serde::Serialize)]
#[serde(transparent)]
pub struct SecretsResponse(BTreeMap<String, Resolution>);

impl SecretsResponse {
    /// Looks up every key in order. A repeated key keeps its last result.
    pub async fn resolve<S: VariableSource>(keys: &[String], provider: &EnvProvider<S>) -> Self {
        let mut entries = BTreeMap::new();
        for key in keys {
            let resolution = provider.get(key).await.into();
            entries.insert(key.clone(), resolution);
        }
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn failures(&self) -> usize {
        self.0.values().filter(|r| matches!(r, Resolution::Failed(_))).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

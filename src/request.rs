use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer};

/// The only request schema version this resolver understands.
pub const SUPPORTED_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid secrets request")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported secrets request version `{0}` (expected `1.0`)")]
    UnsupportedVersion(String),
}

/// The envelope passed on the command line: `{"version": "1.0", "secrets": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretsRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,

    #[serde(default, deserialize_with = "null_items_as_empty")]
    pub secrets: Vec<String>,
}

impl SecretsRequest {
    /// Parses the envelope leniently: a repeated field keeps its last value and
    /// `null` stands for an empty string or list.
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        // Decoding through a `Value` lets a later duplicate field overwrite an earlier one.
        let value: serde_json::Value = serde_json::from_str(input)?;
        if value.is_array() {
            return Err(serde_json::Error::invalid_type(Unexpected::Seq, &"a JSON object").into());
        }
        Ok(Self::deserialize(value)?)
    }

    /// Rejects any envelope whose version is not exactly [`SUPPORTED_VERSION`].
    pub fn ensure_supported(self) -> Result<Self, RequestError> {
        if self.version == SUPPORTED_VERSION {
            Ok(self)
        } else {
            Err(RequestError::UnsupportedVersion(self.version))
        }
    }
}

fn null_as_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_items_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

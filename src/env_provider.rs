use std::collections::HashMap;

use tracing::debug;

/// Prefix of the environment variable that holds a secret's value.
pub const SECRET_VAR_PREFIX: &str = "VECTOR_SECRET_";

/// A read-only source of named variables. The process environment in production,
/// a plain map in tests.
#[async_trait::async_trait]
pub trait VariableSource: Send + Sync {
    async fn get(&self, name: &str) -> Option<String>;
}

#[derive(Debug)]
pub struct ProcessEnv;

#[async_trait::async_trait]
impl VariableSource for ProcessEnv {
    async fn get(&self, name: &str) -> Option<String> {
        // Names the OS cannot represent are never set.
        if name.contains(['=', '\0']) {
            return None;
        }
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

#[async_trait::async_trait]
impl VariableSource for HashMap<String, String> {
    async fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Upper-cases a single character, leaving it unchanged when its upper-case
/// form is more than one character (`ß`, `ŉ`, `ﬀ`).
fn upper_case_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("secret {key} not found")]
    NotFound { key: String },
}

/// Resolves secret keys to the `VECTOR_SECRET_<KEY>` variables of a [`VariableSource`].
#[derive(Debug)]
pub struct EnvProvider<S> {
    source: S,
}

impl<S: VariableSource> EnvProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn var_name(key: &str) -> String {
        let mut name = String::with_capacity(SECRET_VAR_PREFIX.len() + key.len());
        name.push_str(SECRET_VAR_PREFIX);
        name.extend(key.chars().map(upper_case_char));
        name
    }

    pub async fn get(&self, key: &str) -> Result<String, LookupError> {
        let var_name = Self::var_name(key);
        match self.source.get(&var_name).await {
            Some(value) => {
                debug!(key, "secret resolved");
                Ok(value)
            }
            None => {
                debug!(key, var_name = %var_name, "secret not set");
                Err(LookupError::NotFound { key: key.to_owned() })
            }
        }
    }
}

use anyhow::Context;
use tracing::info;

use crate::env_provider::{EnvProvider, ProcessEnv, VariableSource};
use crate::request::SecretsRequest;
use crate::response::SecretsResponse;

mod env_provider;
mod request;
mod response;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    // Diagnostics go to stderr so stdout only ever carries the response.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cmd = ResolveCommand::parse();
    cmd.run().await
}

/// Resolves secrets from VECTOR_SECRET_* environment variables and prints them as JSON.
#[derive(clap::Parser)]
struct ResolveCommand {
    /// The request, as JSON: {"version": "1.0", "secrets": ["key1", "key2"]}
    #[clap(allow_hyphen_values = true)]
    request: String,

    #[clap(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    _ignored: Vec<String>,
}

impl ResolveCommand {
    async fn run(&self) -> anyhow::Result<()> {
        let provider = EnvProvider::new(ProcessEnv);
        let output = resolve_request(&self.request, &provider).await?;
        println!("{output}");
        Ok(())
    }
}

async fn resolve_request<S: VariableSource>(input: &str, provider: &EnvProvider<S>) -> anyhow::Result<String> {
    let request = SecretsRequest::parse(input)?.ensure_supported()?;

    let response = SecretsResponse::resolve(&request.secrets, provider).await;
    info!(
        requested = request.secrets.len(),
        resolved = response.len() - response.failures(),
        missing = response.failures(),
        "secrets request processed"
    );

    response.to_json().context("failed to serialize secrets response")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::request::RequestError;

    #[derive(Default)]
    struct CountingSource(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl VariableSource for CountingSource {
        async fn get(&self, _name: &str) -> Option<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Some("value".to_string())
        }
    }

    #[tokio::test]
    async fn resolves_valid_request() {
        let provider = EnvProvider::new(HashMap::from([(
            "VECTOR_SECRET_SECRET1".to_string(),
            "value1".to_string(),
        )]));
        let output = resolve_request(r#"{"version":"1.0","secrets":["secret1","secret2"]}"#, &provider)
            .await
            .unwrap();

        assert_eq!(
            output,
            r#"{"secret1":{"value":"value1","error":null},"secret2":{"value":"","error":"secret secret2 not found"}}"#
        );
    }

    #[tokio::test]
    async fn empty_input_is_fatal() {
        let provider = EnvProvider::new(CountingSource::default());
        let err = resolve_request("", &provider).await.unwrap_err();

        assert!(matches!(err.downcast_ref::<RequestError>(), Some(RequestError::Parse(_))));
    }

    #[tokio::test]
    async fn unsupported_version_reads_nothing() {
        let source = CountingSource::default();
        let reads = source.0.clone();
        let provider = EnvProvider::new(source);
        let err = resolve_request(r#"{"version":"2.0","secrets":["a","b"]}"#, &provider)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RequestError>(),
            Some(RequestError::UnsupportedVersion(v)) if v == "2.0"
        ));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_read_per_requested_key() {
        let source = CountingSource::default();
        let reads = source.0.clone();
        let provider = EnvProvider::new(source);
        resolve_request(r#"{"version":"1.0","secrets":["a","b","a"]}"#, &provider)
            .await
            .unwrap();

        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }
}

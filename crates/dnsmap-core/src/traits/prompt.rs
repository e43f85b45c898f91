// # Host Key Prompt
//
// Capability handed to `SessionGateway::connect` for asking the operator
// whether an unknown server key should be trusted.

use async_trait::async_trait;

/// Operator confirmation for unknown host keys
#[async_trait]
pub trait HostKeyPrompt: Send {
    /// Ask whether to trust `host`, identified by a key of `key_type`
    /// with the given fingerprint
    ///
    /// Returns `true` to accept the key.
    async fn confirm_host_key(&mut self, host: &str, key_type: &str, fingerprint: &str) -> bool;
}

/// Prompt with a fixed answer, for non-interactive use
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl HostKeyPrompt for FixedAnswer {
    async fn confirm_host_key(&mut self, host: &str, _key_type: &str, fingerprint: &str) -> bool {
        tracing::debug!(
            "Host key for {} ({}) answered {} without asking",
            host,
            fingerprint,
            self.0
        );
        self.0
    }
}

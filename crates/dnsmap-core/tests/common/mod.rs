//! Test doubles and common utilities for contract tests
//!
//! The mock gateway keeps the "remote" record file in memory and serves
//! local copies from a temporary directory.

#![allow(dead_code)]

use dnsmap_core::config::{ConnectParams, HostKeyPolicy};
use dnsmap_core::error::{Error, Result};
use dnsmap_core::traits::{HostKeyPrompt, SessionGateway};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Record file with two entries, in canonical layout
pub const TWO_RECORDS: &str = "{\n  \"addresses\": [\n    {\"domain\": \"test.com\", \"ip\": \"10.0.0.1\"},\n    {\"domain\": \"example.com\", \"ip\": \"192.168.1.1\"}\n  ]\n}";

/// A SessionGateway over an in-memory remote file
pub struct MockGateway {
    /// Remote file content, `None` when the server has no record file
    remote: Arc<Mutex<Option<String>>>,
    /// Scratch directory for local copies
    scratch: TempDir,
    /// Current local copy
    local: Option<PathBuf>,
    connected: bool,
    /// Reject connection attempts
    refuse_connect: Arc<AtomicBool>,
    /// Fail uploads
    fail_push: Arc<AtomicBool>,
    fetch_call_count: Arc<AtomicUsize>,
    push_call_count: Arc<AtomicUsize>,
    disconnect_call_count: Arc<AtomicUsize>,
}

impl MockGateway {
    /// Create a gateway whose server holds `remote`
    pub fn new(remote: Option<&str>) -> Self {
        Self {
            remote: Arc::new(Mutex::new(remote.map(str::to_string))),
            scratch: tempfile::tempdir().expect("scratch dir"),
            local: None,
            connected: false,
            refuse_connect: Arc::new(AtomicBool::new(false)),
            fail_push: Arc::new(AtomicBool::new(false)),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            push_call_count: Arc::new(AtomicUsize::new(0)),
            disconnect_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Content currently on the "server"
    pub fn remote_content(&self) -> Option<String> {
        self.remote.lock().unwrap().clone()
    }

    /// Path of the current local copy
    pub fn local_path(&self) -> Option<PathBuf> {
        self.local.clone()
    }

    pub fn set_refuse_connect(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn push_call_count(&self) -> usize {
        self.push_call_count.load(Ordering::SeqCst)
    }

    pub fn disconnect_call_count(&self) -> usize {
        self.disconnect_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionGateway for MockGateway {
    async fn connect(
        &mut self,
        params: &ConnectParams,
        prompt: &mut dyn HostKeyPrompt,
    ) -> Result<()> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(Error::auth("mock refuses"));
        }
        if params.host_key_policy == HostKeyPolicy::Ask
            && !prompt
                .confirm_host_key(&params.address, "ssh-ed25519", "SHA256:mock")
                .await
        {
            return Err(Error::host_key("rejected by operator"));
        }
        self.connected = true;
        Ok(())
    }

    async fn fetch_record_file(&mut self) -> Result<Option<PathBuf>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        let Some(content) = self.remote_content() else {
            return Ok(None);
        };

        let path = self.scratch.path().join(format!(
            "domains{}.json",
            self.fetch_call_count.load(Ordering::SeqCst)
        ));
        tokio::fs::write(&path, content).await?;
        self.local = Some(path.clone());
        Ok(Some(path))
    }

    async fn push_record_file(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.push_call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_push.load(Ordering::SeqCst) {
            return Err(Error::transfer("mock upload failure"));
        }
        let local = self
            .local
            .clone()
            .ok_or_else(|| Error::transfer("no local copy"))?;
        let content = tokio::fs::read_to_string(&local).await?;
        *self.remote.lock().unwrap() = Some(content);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.disconnect_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(local) = self.local.take() {
            let _ = tokio::fs::remove_file(local).await;
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn gateway_name(&self) -> &'static str {
        "mock"
    }
}

/// A HostKeyPrompt that records what it was asked
pub struct RecordingPrompt {
    pub answer: bool,
    pub asked: Vec<String>,
}

impl RecordingPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl HostKeyPrompt for RecordingPrompt {
    async fn confirm_host_key(&mut self, host: &str, _key_type: &str, _fingerprint: &str) -> bool {
        self.asked.push(host.to_string());
        self.answer
    }
}

/// Connection parameters for tests
pub fn params(policy: HostKeyPolicy) -> ConnectParams {
    ConnectParams {
        address: "localhost".to_string(),
        port: 22,
        login: "name".to_string(),
        password: "pass".to_string(),
        host_key_policy: policy,
    }
}

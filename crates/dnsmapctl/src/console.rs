// # Console
//
// Line-oriented operator I/O over any async reader/writer pair. Production
// uses stdin/stdout; tests feed byte slices and capture a Vec<u8>.

use async_trait::async_trait;
use dnsmap_core::traits::HostKeyPrompt;
use dnsmap_core::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Operator console
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Everything written so far
    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Print one line
    pub async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Read one line, trimmed
    ///
    /// End of input is [`Error::InputClosed`].
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Err(Error::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Print `prompt` and read answers until one is not empty
    pub async fn read_non_empty(&mut self, prompt: &str) -> Result<String> {
        loop {
            self.say(prompt).await?;
            let line = self.read_line().await?;
            if !line.is_empty() {
                return Ok(line);
            }
            self.say("Input cannot be empty.").await?;
        }
    }

    /// Read a TCP port in 1-65535
    pub async fn read_port(&mut self) -> Result<u16> {
        loop {
            self.say("Enter SFTP server port").await?;
            let line = self.read_line().await?;
            match line.parse::<u32>() {
                Ok(port @ 1..=65535) => return Ok(port as u16),
                Ok(_) => {
                    self.say("Invalid port. Enter a value from 1 to 65535.")
                        .await?
                }
                Err(_) => self.say("Port must be a number.").await?,
            }
        }
    }

    /// Ask a yes/no question; `y`/`n` and any letter case are accepted
    pub async fn read_yes_no(&mut self, prompt: &str) -> Result<bool> {
        loop {
            self.say(prompt).await?;
            match self.read_line().await?.to_lowercase().as_str() {
                "yes" | "y" => return Ok(true),
                "no" | "n" => return Ok(false),
                _ => self.say("Please answer yes or no.").await?,
            }
        }
    }
}

#[async_trait]
impl<R, W> HostKeyPrompt for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm_host_key(&mut self, host: &str, key_type: &str, fingerprint: &str) -> bool {
        let notice = format!(
            "The authenticity of host '{}' can't be established.\n{} key fingerprint is {}.",
            host, key_type, fingerprint
        );
        let answer = match self.say(&notice).await {
            Ok(()) => {
                self.read_yes_no("Trust this host and add it to known_hosts? (yes/no)")
                    .await
            }
            Err(e) => Err(e),
        };

        answer.unwrap_or_else(|e| {
            warn!("No answer to host key question for {}: {}", host, e);
            false
        })
    }
}

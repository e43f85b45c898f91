// # dnsmapctl - Remote Domain Table Console
//
// Interactive console for editing a domain-to-IPv4 table kept as a JSON
// file on an SFTP server.
//
// The binary is a thin layer over dnsmap-core:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the SFTP gateway and the console into a `DomainManager`
// 4. Running the interactive session
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `DNSMAP_LOG_LEVEL`: trace, debug, info, warn (default), error
// - `DNSMAP_KNOWN_HOSTS`: known_hosts file (default `~/.ssh/known_hosts`)
// - `DNSMAP_REMOTE_DIR`: remote directory holding the record file (default `.`)
// - `DNSMAP_FILE_EXTENSION`: record file extension (default `.json`)
// - `DNSMAP_DEFAULT_FILENAME`: upload target when the server has no record
//   file (default `domains.json`)
// - `DNSMAP_HOST_KEY_POLICY`: strict, ask or accept-new; when unset the
//   operator is asked at connect time
//
// Logs go to stderr so they do not interleave with the menu on stdout.
//
// ## Example
//
// ```bash
// export DNSMAP_LOG_LEVEL=info
// export DNSMAP_REMOTE_DIR=/srv/dns
// export DNSMAP_HOST_KEY_POLICY=strict
//
// dnsmapctl
// ```

mod app;
mod console;

use anyhow::Result;
use app::SessionEnd;
use console::Console;
use dnsmap_core::config::{DEFAULT_FILE_EXTENSION, DEFAULT_FILENAME, DEFAULT_REMOTE_DIR};
use dnsmap_core::{DomainManager, GatewayConfig, HostKeyPolicy};
use dnsmap_sftp::SftpGateway;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum CtlExitCode {
    /// Session ended normally
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Session aborted by an error
    RuntimeError = 2,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    log_level: String,
    known_hosts: PathBuf,
    remote_dir: PathBuf,
    file_extension: String,
    default_filename: String,
    host_key_policy: Option<HostKeyPolicy>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let known_hosts = match env::var_os("DNSMAP_KNOWN_HOSTS") {
            Some(path) => PathBuf::from(path),
            None => match env::var_os("HOME") {
                Some(home) => PathBuf::from(home).join(".ssh").join("known_hosts"),
                None => anyhow::bail!("DNSMAP_KNOWN_HOSTS is not set and HOME is unknown"),
            },
        };

        let host_key_policy = match env::var("DNSMAP_HOST_KEY_POLICY") {
            Ok(value) if !value.trim().is_empty() => Some(value.parse::<HostKeyPolicy>()?),
            _ => None,
        };

        Ok(Self {
            log_level: env::var("DNSMAP_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
            known_hosts,
            remote_dir: env::var_os("DNSMAP_REMOTE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REMOTE_DIR)),
            file_extension: env::var("DNSMAP_FILE_EXTENSION")
                .unwrap_or_else(|_| DEFAULT_FILE_EXTENSION.to_string()),
            default_filename: env::var("DNSMAP_DEFAULT_FILENAME")
                .unwrap_or_else(|_| DEFAULT_FILENAME.to_string()),
            host_key_policy,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.log_level()?;

        if self.remote_dir.as_os_str().is_empty() {
            anyhow::bail!("DNSMAP_REMOTE_DIR cannot be empty");
        }
        if !self.file_extension.starts_with('.') {
            anyhow::bail!(
                "DNSMAP_FILE_EXTENSION must start with '.', got '{}'",
                self.file_extension
            );
        }

        self.gateway_config().validate()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            other => anyhow::bail!(
                "Invalid DNSMAP_LOG_LEVEL '{}' (expected trace, debug, info, warn or error)",
                other
            ),
        })
    }

    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(&self.known_hosts)
            .with_remote_dir(&self.remote_dir)
            .with_file_extension(&self.file_extension)
            .with_default_filename(&self.default_filename)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    info!("Starting dnsmapctl");
    info!(
        "Known hosts: {}, remote directory: {}",
        config.known_hosts.display(),
        config.remote_dir.display()
    );

    // One operator, one command at a time
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CtlExitCode::RuntimeError.into();
        }
    };

    let end = rt.block_on(async {
        let mut manager = DomainManager::new(SftpGateway::new(config.gateway_config()));
        let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
        app::run(&mut manager, &mut console, config.host_key_policy).await
    });

    match end {
        SessionEnd::Finished => CtlExitCode::CleanShutdown.into(),
        SessionEnd::Failed(e) => {
            error!("Session aborted: {}", e);
            CtlExitCode::RuntimeError.into()
        }
    }
}

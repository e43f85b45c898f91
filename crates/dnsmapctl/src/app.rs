// # Interactive Session
//
// Connection dialogue and menu loop on top of `DomainManager`.
//
// ## Error Handling
//
// - Recoverable errors (bad input, local save or upload failures) are
//   printed and the menu continues
// - Anything else ends the session: the manager is disconnected and the
//   error is reported
// - Closed input ends the session cleanly

use crate::console::Console;
use dnsmap_core::{
    AddOutcome, ConnectParams, DomainManager, Error, HostKeyPolicy, Mutation, Result,
    SessionGateway, SyncStatus, is_valid_ipv4,
};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info};

const MENU: &str = "\
Connected to the SFTP server. Choose an action:
1. List domain/address pairs
2. Get IP address by domain name
3. Get domain name by IP address
4. Add a domain/address pair
5. Remove a pair by domain name or IP address
6. Disconnect and exit";

/// How a session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Operator quit, declined to retry, or closed the input
    Finished,
    /// Session aborted by an error
    Failed(Error),
}

/// Run one interactive session until the operator quits or an error ends it
///
/// `host_key_policy` skips the strict-checking question when set.
pub async fn run<G, R, W>(
    manager: &mut DomainManager<G>,
    console: &mut Console<R, W>,
    host_key_policy: Option<HostKeyPolicy>,
) -> SessionEnd
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let end = match drive(manager, console, host_key_policy).await {
        Ok(()) => SessionEnd::Finished,
        Err(Error::InputClosed) => {
            info!("Input closed, ending session");
            SessionEnd::Finished
        }
        Err(e) => {
            // Output may be the thing that failed
            let _ = console.say(&format!("An error occurred: {}", e)).await;
            let _ = console.say("Try reconnecting to the server.").await;
            SessionEnd::Failed(e)
        }
    };

    manager.disconnect().await;
    let _ = console.say("Session finished.").await;
    end
}

async fn drive<G, R, W>(
    manager: &mut DomainManager<G>,
    console: &mut Console<R, W>,
    host_key_policy: Option<HostKeyPolicy>,
) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    loop {
        if !manager.is_connected() {
            console
                .say("Enter the SFTP server connection details to begin.")
                .await?;
            if !connect(manager, console, host_key_policy).await? {
                return Ok(());
            }
        }

        manager.ensure_store().await?;

        console.say(MENU).await?;
        let choice = console.read_line().await?;
        debug!("Menu choice '{}'", choice);

        match choice.as_str() {
            "1" => list(manager, console).await?,
            "2" => address_of(manager, console).await?,
            "3" => domain_of(manager, console).await?,
            "4" => add(manager, console).await?,
            "5" => remove(manager, console).await?,
            "6" => return Ok(()),
            _ => console.say("Invalid choice. Try again.").await?,
        }
    }
}

/// Ask for connection details until connected or the operator gives up
///
/// Returns `false` when the operator declines to retry.
async fn connect<G, R, W>(
    manager: &mut DomainManager<G>,
    console: &mut Console<R, W>,
    host_key_policy: Option<HostKeyPolicy>,
) -> Result<bool>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let address = console.read_non_empty("Enter SFTP server address").await?;
        let port = console.read_port().await?;
        let login = console.read_non_empty("Enter login").await?;
        let password = console.read_non_empty("Enter password").await?;
        let host_key_policy = match host_key_policy {
            Some(policy) => policy,
            None => {
                if console
                    .read_yes_no("Enable strict host key checking? (yes/no)")
                    .await?
                {
                    HostKeyPolicy::Ask
                } else {
                    HostKeyPolicy::AcceptNew
                }
            }
        };

        let params = ConnectParams {
            address,
            port,
            login,
            password,
            host_key_policy,
        };

        if manager.connect(&params, console).await {
            console
                .say(&format!("Connected to {}:{}.", params.address, params.port))
                .await?;
            return Ok(true);
        }

        console.say("Could not connect to the server.").await?;
        if !console.read_yes_no("Continue? (yes/no)").await? {
            return Ok(false);
        }
    }
}

async fn list<G, R, W>(manager: &DomainManager<G>, console: &mut Console<R, W>) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let records = manager.list()?;
    if records.is_empty() {
        return console.say("The list is empty").await;
    }
    for record in records {
        console.say(&record.to_string()).await?;
    }
    Ok(())
}

async fn address_of<G, R, W>(manager: &DomainManager<G>, console: &mut Console<R, W>) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let domain = console.read_non_empty("Enter domain name").await?;
    let line = match manager.lookup_address(&domain)? {
        Some(address) => format!("IP address for {}: {}", domain, address),
        None => format!("Domain {} not found", domain),
    };
    console.say(&line).await
}

async fn domain_of<G, R, W>(manager: &DomainManager<G>, console: &mut Console<R, W>) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let address = console.read_non_empty("Enter IP address").await?;
    let line = match manager.lookup_domain(&address)? {
        Some(domain) => format!("Domain for {}: {}", address, domain),
        None => format!("IP address {} not found", address),
    };
    console.say(&line).await
}

async fn add<G, R, W>(manager: &mut DomainManager<G>, console: &mut Console<R, W>) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let domain = console.read_non_empty("Enter domain name").await?;
    let address = loop {
        let address = console.read_non_empty("Enter IP address").await?;
        if is_valid_ipv4(&address) {
            break address;
        }
        console.say("Invalid IPv4 address format. Try again.").await?;
    };

    match manager.add(&domain, &address).await {
        Ok(Mutation::Applied { record, sync }) => {
            console.say(&format!("Added {}", record)).await?;
            report_sync(console, sync).await
        }
        Ok(Mutation::Rejected(AddOutcome::DuplicateDomain(existing))) => {
            console
                .say(&format!("Domain {} already exists ({})", domain, existing))
                .await
        }
        Ok(Mutation::Rejected(AddOutcome::DuplicateAddress(existing))) => {
            console
                .say(&format!("IP address {} is already in use ({})", address, existing))
                .await
        }
        Ok(Mutation::Rejected(AddOutcome::Added(_)) | Mutation::NotFound) => Ok(()),
        Err(e) if e.is_recoverable() => console.say(&e.to_string()).await,
        Err(e) => Err(e),
    }
}

async fn remove<G, R, W>(manager: &mut DomainManager<G>, console: &mut Console<R, W>) -> Result<()>
where
    G: SessionGateway,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let key = console
        .read_non_empty("Enter domain name or IP address to remove")
        .await?;

    match manager.remove(&key).await {
        Ok(Mutation::Applied { record, sync }) => {
            console.say(&format!("Removed {}", record)).await?;
            report_sync(console, sync).await
        }
        Ok(_) => console.say(&format!("No pair matches {}", key)).await,
        Err(e) if e.is_recoverable() => console.say(&e.to_string()).await,
        Err(e) => Err(e),
    }
}

async fn report_sync<R, W>(console: &mut Console<R, W>, sync: SyncStatus) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    match sync {
        SyncStatus::Pushed => console.say("File uploaded to the server.").await,
        SyncStatus::PushFailed(reason) => {
            console
                .say(&format!(
                    "Saved locally, but the upload failed: {}",
                    reason
                ))
                .await
        }
    }
}

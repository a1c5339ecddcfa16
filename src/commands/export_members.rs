//! Export members of the configured groups
//!
//! Connects, logs in if the session is not authorized yet, then walks every
//! dialog and writes one CSV per allow-listed group.

use std::path::PathBuf;

use crate::client::{Dialog, SessionClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::OutputSink;
use crate::prompt::CredentialPrompt;

/// What a run did with the dialogs it saw
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: Vec<PathBuf>,
    pub skipped_not_group: usize,
    pub skipped_not_listed: usize,
}

impl ExportSummary {
    pub fn nothing_exported(&self) -> bool {
        self.exported.is_empty()
    }
}

/// Why a dialog is not exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotGroup,
    NotListed,
}

impl Skip {
    fn reason(&self) -> &'static str {
        match self {
            Skip::NotGroup => "it is not a group",
            Skip::NotListed => "it is not in the list of group names to export",
        }
    }
}

/// Decide whether a dialog is exported.
pub fn classify(dialog: &Dialog, config: &Config) -> Option<Skip> {
    if !dialog.is_group {
        Some(Skip::NotGroup)
    } else if !config.is_listed(&dialog.name) {
        Some(Skip::NotListed)
    } else {
        None
    }
}

pub async fn run<C, P>(
    client: &mut C,
    prompt: &mut P,
    config: &Config,
    sink: &OutputSink,
) -> Result<ExportSummary>
where
    C: SessionClient,
    P: CredentialPrompt,
{
    if config.proxy.is_some() {
        tracing::info!("Connecting through MTProto proxy");
    }
    client.connect(config.proxy.as_ref()).await?;
    authenticate(client, prompt, &config.phone).await?;
    export_groups(client, config, sink).await
}

/// Log in with a code, and the two-step password if the account has one.
pub async fn authenticate<C, P>(client: &mut C, prompt: &mut P, phone: &str) -> Result<()>
where
    C: SessionClient,
    P: CredentialPrompt,
{
    if client.is_authorized().await? {
        tracing::debug!("Session already authorized");
        return Ok(());
    }

    client.send_code_request(phone).await?;
    let code = prompt.code()?;
    match client.sign_in(&code).await {
        Ok(()) => {}
        Err(Error::SecondFactorRequired) => {
            let password = prompt.password()?;
            client.sign_in_password(&password).await?;
        }
        Err(e) => return Err(e),
    }

    tracing::info!("Signed in as {}", phone);
    Ok(())
}

pub async fn export_groups<C>(
    client: &mut C,
    config: &Config,
    sink: &OutputSink,
) -> Result<ExportSummary>
where
    C: SessionClient,
{
    let dialogs = client.list_dialogs().await?;
    tracing::info!("Fetched {} dialogs", dialogs.len());

    let mut summary = ExportSummary::default();
    for dialog in &dialogs {
        if let Some(skip) = classify(dialog, config) {
            println!("skip {} because {}.", dialog.name, skip.reason());
            match skip {
                Skip::NotGroup => summary.skipped_not_group += 1,
                Skip::NotListed => summary.skipped_not_listed += 1,
            }
            continue;
        }

        println!("exporting {}", dialog.name);
        let mut members = client.list_participants(dialog).await?;
        members.sort_by_key(|m| m.id);

        let path = sink.export(&dialog.name, &members)?;
        tracing::info!("Wrote {} members to {}", members.len(), path.display());
        println!("export {} done.", dialog.name);
        summary.exported.push(path);
    }

    if summary.nothing_exported() {
        println!("No matching groups found to export.");
    }

    Ok(summary)
}

//! Telegram Group Member Exporter Library
//!
//! This library provides tools to:
//! - Log in to Telegram with a phone number, login code and optional 2FA password
//! - List the account's dialogs and pick the allow-listed groups
//! - Export each group's members to CSV in a timestamped run directory

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod prompt;
pub mod session;

// Re-export common types
pub use client::{Dialog, Member, PeerKind, SessionClient};
pub use config::{Config, ProxyConfig};
pub use error::{Error, Result};
pub use export::{sanitize, OutputSink};
pub use prompt::{ConsolePrompt, CredentialPrompt, ScriptedPrompt};
pub use session::{GrammersClient, SessionLock};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;

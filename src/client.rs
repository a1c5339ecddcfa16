//! Session client interface consumed by the exporter
//!
//! Dialogs and members are decoded into plain structs at this boundary so the
//! rest of the crate never touches grammers types directly.

use crate::config::ProxyConfig;
use crate::error::Result;

/// Telegram id namespace a peer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    User,
    /// Basic group
    Chat,
    /// Broadcast channel or megagroup
    Channel,
}

/// A conversation visible to the authenticated account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub id: i64,
    pub kind: PeerKind,
    pub name: String,
    pub is_group: bool,
}

impl Dialog {
    /// Ids are only unique within one [`PeerKind`].
    pub fn key(&self) -> (PeerKind, i64) {
        (self.kind, self.id)
    }
}

/// A participant of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Telegram operations the exporter needs.
///
/// Every call completes before the next one starts; failures are returned to
/// the caller and never retried.
#[allow(async_fn_in_trait)]
pub trait SessionClient {
    /// Open the connection, through `proxy` when one is given.
    async fn connect(&mut self, proxy: Option<&ProxyConfig>) -> Result<()>;

    async fn is_authorized(&mut self) -> Result<bool>;

    /// Ask Telegram to send a login code to `phone`.
    async fn send_code_request(&mut self, phone: &str) -> Result<()>;

    /// Complete login with the received code.
    ///
    /// Returns `Error::SecondFactorRequired` when the account has a cloud
    /// password; the caller then uses [`SessionClient::sign_in_password`].
    async fn sign_in(&mut self, code: &str) -> Result<()>;

    async fn sign_in_password(&mut self, password: &str) -> Result<()>;

    async fn list_dialogs(&mut self) -> Result<Vec<Dialog>>;

    async fn list_participants(&mut self, dialog: &Dialog) -> Result<Vec<Member>>;
}

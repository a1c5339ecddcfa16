//! Session management for the Telegram client
//!
//! Provides:
//! - File-based session locking to prevent parallel runs on one account
//! - The grammers-backed [`SessionClient`] implementation

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::peer::Peer;
use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::mpsc;

use crate::client::{Dialog, Member, PeerKind, SessionClient};
use crate::config::{Config, ProxyConfig};
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock backed by the file at `path`.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                eprintln!(
                    "Telegram session is already in use by another process ({}). \
                     Wait for it to finish and try again.",
                    path.display()
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Open (or create) the SQLite session file.
pub fn open_session<P: AsRef<Path>>(path: P) -> Result<Arc<SqliteSession>> {
    let path = path.as_ref();
    let session = SqliteSession::open(path).map_err(|e| {
        Error::Transport(format!(
            "Failed to open session {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Arc::new(session))
}

struct Connection {
    client: Client,
    _handle: SenderPoolHandle,
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    _runner_handle: tokio::task::JoinHandle<()>,
}

/// [`SessionClient`] backed by grammers and a persistent SQLite session.
pub struct GrammersClient {
    api_id: i32,
    api_hash: String,
    session_file: String,
    connection: Option<Connection>,
    authorized: bool,
    login_token: Option<LoginToken>,
    password_token: Option<PasswordToken>,
    groups: HashMap<(PeerKind, i64), Peer>,
}

impl GrammersClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_id: config.api_id,
            api_hash: config.api_hash.clone(),
            session_file: config.session_file(),
            connection: None,
            authorized: false,
            login_token: None,
            password_token: None,
            groups: HashMap::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        self.connection
            .as_ref()
            .map(|c| &c.client)
            .ok_or_else(|| Error::Transport("client is not connected".to_string()))
    }
}

impl SessionClient for GrammersClient {
    async fn connect(&mut self, proxy: Option<&ProxyConfig>) -> Result<()> {
        if let Some(proxy) = proxy {
            // grammers only speaks to Telegram data centers directly
            return Err(Error::Transport(format!(
                "MTProto proxy {}:{} is not supported by the grammers transport",
                proxy.host, proxy.port
            )));
        }

        let session = open_session(&self.session_file)?;
        let pool = SenderPool::new(session, self.api_id);
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;
        let runner_handle = tokio::spawn(async move {
            runner.run().await;
        });

        // The first request opens the socket, so failures here are transport failures.
        self.authorized = client
            .is_authorized()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        tracing::debug!("Connected using session {}", self.session_file);
        self.connection = Some(Connection {
            client,
            _handle: handle,
            _updates: updates,
            _runner_handle: runner_handle,
        });
        Ok(())
    }

    async fn is_authorized(&mut self) -> Result<bool> {
        self.client()?;
        Ok(self.authorized)
    }

    async fn send_code_request(&mut self, phone: &str) -> Result<()> {
        let token = self
            .client()?
            .request_login_code(phone, &self.api_hash)
            .await
            .map_err(|e| Error::Authentication(format!("Failed to request code: {}", e)))?;
        self.login_token = Some(token);
        Ok(())
    }

    async fn sign_in(&mut self, code: &str) -> Result<()> {
        let token = self
            .login_token
            .take()
            .ok_or_else(|| Error::Authentication("no login code was requested".to_string()))?;

        let result = self.client()?.sign_in(&token, code).await;
        match result {
            Ok(_) => {
                self.authorized = true;
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                self.password_token = Some(password_token);
                Err(Error::SecondFactorRequired)
            }
            Err(e) => Err(Error::Authentication(format!("Failed to sign in: {}", e))),
        }
    }

    async fn sign_in_password(&mut self, password: &str) -> Result<()> {
        let token = self.password_token.take().ok_or_else(|| {
            Error::Authentication("the account did not ask for a password".to_string())
        })?;

        self.client()?
            .check_password(token, password)
            .await
            .map_err(|e| Error::Authentication(format!("Failed to check password: {}", e)))?;
        self.authorized = true;
        Ok(())
    }

    async fn list_dialogs(&mut self) -> Result<Vec<Dialog>> {
        let mut dialogs = Vec::new();
        let mut groups = HashMap::new();

        {
            let mut iter = self.client()?.iter_dialogs();
            while let Some(dialog) = iter.next().await? {
                let peer = dialog.peer.clone();
                let decoded = decode_dialog(&peer);
                if decoded.is_group {
                    groups.insert(decoded.key(), peer);
                }
                dialogs.push(decoded);
            }
        }

        self.groups = groups;
        Ok(dialogs)
    }

    async fn list_participants(&mut self, dialog: &Dialog) -> Result<Vec<Member>> {
        let peer = self.groups.get(&dialog.key()).ok_or_else(|| {
            Error::TelegramError(format!("'{}' is not a known group dialog", dialog.name))
        })?;

        let mut members = Vec::new();
        let mut participants = self.client()?.iter_participants(peer);
        while let Some(participant) = participants.next().await? {
            members.push(decode_user(&participant.user.raw));
        }
        Ok(members)
    }
}

fn decode_dialog(peer: &Peer) -> Dialog {
    Dialog {
        id: peer_id(peer),
        kind: peer_kind(peer),
        name: peer_name(peer),
        // Basic groups and megagroups; broadcast channels and users are not groups.
        is_group: matches!(peer, Peer::Group(_)),
    }
}

fn peer_kind(peer: &Peer) -> PeerKind {
    match peer {
        Peer::User(_) => PeerKind::User,
        Peer::Channel(_) => PeerKind::Channel,
        Peer::Group(g) => chat_kind(&g.raw),
    }
}

/// Megagroups are channels on the wire and share the channel id space.
fn chat_kind(raw: &grammers_tl_types::enums::Chat) -> PeerKind {
    match raw {
        grammers_tl_types::enums::Chat::Channel(_)
        | grammers_tl_types::enums::Chat::ChannelForbidden(_) => PeerKind::Channel,
        grammers_tl_types::enums::Chat::Empty(_)
        | grammers_tl_types::enums::Chat::Chat(_)
        | grammers_tl_types::enums::Chat::Forbidden(_) => PeerKind::Chat,
    }
}

fn peer_name(peer: &Peer) -> String {
    match peer {
        Peer::Channel(c) => c.title().to_string(),
        Peer::Group(g) => g.title().unwrap_or_default().to_string(),
        Peer::User(u) => u.full_name(),
    }
}

fn peer_id(peer: &Peer) -> i64 {
    match peer {
        Peer::Channel(c) => c.raw.id,
        Peer::Group(g) => match &g.raw {
            grammers_tl_types::enums::Chat::Empty(c) => c.id,
            grammers_tl_types::enums::Chat::Chat(c) => c.id,
            grammers_tl_types::enums::Chat::Forbidden(c) => c.id,
            grammers_tl_types::enums::Chat::Channel(c) => c.id,
            grammers_tl_types::enums::Chat::ChannelForbidden(c) => c.id,
        },
        Peer::User(u) => u.raw.id(),
    }
}

fn decode_user(raw: &grammers_tl_types::enums::User) -> Member {
    match raw {
        grammers_tl_types::enums::User::User(u) => Member {
            id: u.id,
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
        },
        grammers_tl_types::enums::User::Empty(u) => Member {
            id: u.id,
            username: None,
            first_name: None,
            last_name: None,
        },
    }
}

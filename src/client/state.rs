//! Module `state`
//!
//! Per-connection state: the peer address and the session the connection
//! is currently logged in with, if any.

use std::net::SocketAddr;

use crate::auth::{SessionHandle, SessionState};
use crate::engine::FilesystemEngine;

/// Represents the state of a connected client.
#[derive(Debug)]
pub struct Client {
    client_addr: SocketAddr,
    session: Option<SessionHandle>,
    username: Option<String>,
}

impl Client {
    pub fn new(client_addr: SocketAddr) -> Self {
        Self {
            client_addr,
            session: None,
            username: None,
        }
    }

    /// Binds the connection to a freshly opened session.
    ///
    /// Returns the previous handle so the caller can close it.
    pub fn login(&mut self, session: SessionHandle, username: &str) -> Option<SessionHandle> {
        self.username = Some(username.to_string());
        self.session.replace(session)
    }

    /// Detaches the session, returning its handle.
    pub fn logout(&mut self) -> Option<SessionHandle> {
        self.username = None;
        self.session.take()
    }

    pub fn session(&self) -> Option<SessionHandle> {
        self.session
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// Short label for log lines: `user@addr` or just the address.
    pub fn label(&self) -> String {
        match &self.username {
            Some(user) => format!("{}@{}", user, self.client_addr),
            None => self.client_addr.to_string(),
        }
    }

    /// `Anonymous` until a login succeeds; afterwards whatever the engine
    /// reports for the bound handle.
    pub fn session_state(&self, engine: &FilesystemEngine) -> SessionState {
        match self.session {
            Some(handle) => engine.session_state(handle),
            None => SessionState::Anonymous,
        }
    }
}

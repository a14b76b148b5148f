/// Client session handle and replayable session state

use std::net::SocketAddr;
use std::time::SystemTime;

use crate::utils::generate_id;

/// One client session. A session is bound to a single worker for its whole
/// lifetime, so nothing in here needs synchronization.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub client_addr: Option<SocketAddr>,
    pub created_at: SystemTime,
}

impl Session {
    pub fn new(client_addr: Option<SocketAddr>) -> Self {
        Self {
            id: generate_id("session"),
            client_addr,
            created_at: SystemTime::now(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A statement that must be replayed on every backend attached to a
/// session so that session state stays consistent (e.g. `SET`, `USE`).
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub statement: String,
}

impl SessionCommand {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
        }
    }
}

/// Ordered list of session commands pending replay on newly attached
/// backends.
#[derive(Debug, Clone, Default)]
pub struct SessionCommandList {
    commands: Vec<SessionCommand>,
}

impl SessionCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: SessionCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionCommand> {
        self.commands.iter()
    }
}

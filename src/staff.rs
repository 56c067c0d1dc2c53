//! Staff identities, roles and the identity-resolver seam.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::AdminError;

/// Staff roles. The capability table in [`crate::gate`] is keyed on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Role {
    #[n(0)]
    SuperAdmin,
    #[n(1)]
    Moderator,
    #[n(2)]
    Finance,
    #[n(3)]
    Support,
    #[n(4)]
    Content,
    #[n(5)]
    Analyst,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Moderator,
        Role::Finance,
        Role::Support,
        Role::Content,
        Role::Analyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Moderator => "moderator",
            Role::Finance => "finance",
            Role::Support => "support",
            Role::Content => "content",
            Role::Analyst => "analyst",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff directory record. Created by the invite flow, flipped by
/// activate/suspend. A record with `active = false` fails the gate everywhere.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct StaffRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub email: String,
    #[n(2)]
    pub full_name: String,
    #[n(3)]
    pub role: Role,
    #[n(4)]
    pub active: bool,
}

/// What the external identity collaborator knows about a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Proof of a passed authorization check, threaded explicitly into every
/// engine call for audit attribution. Never read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Seam to the external identity system. `resolve` maps an opaque session
/// credential to an identity; `user_id_by_email` backs the staff-invite flow.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<Option<Identity>, AdminError>;
    fn user_id_by_email(&self, email: &str) -> Result<Option<String>, AdminError>;
}

/// In-memory resolver for tests and local wiring.
#[derive(Default)]
pub struct MemoryResolver {
    sessions: RwLock<HashMap<String, Identity>>,
    emails: RwLock<HashMap<String, String>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, credential: &str, identity: Identity) {
        self.emails
            .write()
            .expect("resolver lock poisoned")
            .insert(identity.email.clone(), identity.id.clone());
        self.sessions
            .write()
            .expect("resolver lock poisoned")
            .insert(credential.to_string(), identity);
    }

    /// Register a platform user with no session, as sign-up would.
    pub fn add_user(&self, email: &str, user_id: &str) {
        self.emails
            .write()
            .expect("resolver lock poisoned")
            .insert(email.to_string(), user_id.to_string());
    }
}

impl IdentityResolver for MemoryResolver {
    fn resolve(&self, credential: &str) -> Result<Option<Identity>, AdminError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| AdminError::internal("resolver lock poisoned"))?;
        Ok(sessions.get(credential).cloned())
    }

    fn user_id_by_email(&self, email: &str) -> Result<Option<String>, AdminError> {
        let emails = self
            .emails
            .read()
            .map_err(|_| AdminError::internal("resolver lock poisoned"))?;
        Ok(emails.get(email).cloned())
    }
}

//! Persistent session store.
//!
//! The file holds a flat string map keyed the same way per role:
//! `token` + `user` for students, `adminToken` + `admin` for admins. Profiles
//! are stored as JSON strings. Anything unreadable is "not logged in".

use crate::models::{Admin, Profile, Role, User};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const USER_TOKEN: &str = "token";
const USER_PROFILE: &str = "user";
const ADMIN_TOKEN: &str = "adminToken";
const ADMIN_PROFILE: &str = "admin";

/// A credential and the profile it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
}

impl Session {
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a credential and profile, replacing whatever was stored before
    pub fn save(&self, token: &str, profile: &Profile) -> Result<()> {
        let mut entries = BTreeMap::new();
        let (token_key, profile_key, profile_json) = match profile {
            Profile::User(user) => (USER_TOKEN, USER_PROFILE, serde_json::to_string(user)?),
            Profile::Admin(admin) => (ADMIN_TOKEN, ADMIN_PROFILE, serde_json::to_string(admin)?),
        };
        entries.insert(token_key.to_string(), token.to_string());
        entries.insert(profile_key.to_string(), profile_json);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create session directory {}", parent.display())
                })?;
            }
        }
        let content = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        Ok(())
    }

    /// Read back the stored session; a user session wins over an admin one
    pub fn load(&self) -> Option<Session> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content).ok()?;

        if let Some(raw) = entries.get(USER_PROFILE) {
            let user: User = serde_json::from_str(raw).ok()?;
            let token = non_empty(entries.get(USER_TOKEN))?;
            return Some(Session {
                token,
                profile: Profile::User(user),
            });
        }

        if let Some(raw) = entries.get(ADMIN_PROFILE) {
            let admin: Admin = serde_json::from_str(raw).ok()?;
            let token = non_empty(entries.get(ADMIN_TOKEN))?;
            return Some(Session {
                token,
                profile: Profile::Admin(admin),
            });
        }

        None
    }

    /// Remove every stored key. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session file {}", self.path.display())),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

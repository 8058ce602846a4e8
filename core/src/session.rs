// Explicit viewer session
//
// Created once at startup and passed to whatever needs authorization. Admin
// access is granted by the configured password; ending the session drops back
// to guest.

use crate::config::AuthConfig;
use crate::{ChatScopeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Admin,
}

#[derive(Debug, Clone)]
pub struct Session {
    role: Role,
}

impl Session {
    pub fn guest() -> Self {
        Self { role: Role::Guest }
    }

    pub fn login(password: &str, auth: &AuthConfig) -> Result<Self> {
        match auth.admin_password.as_deref() {
            Some(expected) if !expected.is_empty() && expected == password => {
                info!(target: "dashboard", "Admin session started");
                Ok(Self { role: Role::Admin })
            }
            _ => {
                warn!(target: "dashboard", "Rejected admin login");
                Err(ChatScopeError::Unauthorized("invalid password".to_string()))
            }
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ChatScopeError::Unauthorized("admin session required".to_string()))
        }
    }

    pub fn logout(&mut self) {
        if self.role != Role::Guest {
            info!(target: "dashboard", "Session ended");
        }
        self.role = Role::Guest;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::guest()
    }
}

//! Domain-restricted sign-in and program access rules.
//!
//! The identity provider (OAuth) lives outside this crate; it hands over a
//! verified email address and [`AccessPolicy::sign_in`] decides whether that
//! address may use the toolkit and with which role.

use crate::program::Program;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Lower-cased email address.
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("{email} is outside the allowed domain {domain}")]
    DomainNotAllowed { email: String, domain: String },
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_domain: String,
    admins: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(allowed_domain: impl Into<String>, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domain: allowed_domain
                .into()
                .trim()
                .trim_start_matches('@')
                .to_ascii_lowercase(),
            admins: admins
                .into_iter()
                .map(|email| email.as_ref().trim().to_ascii_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn allowed_domain(&self) -> &str {
        &self.allowed_domain
    }

    pub fn sign_in(&self, email: &str) -> Result<Identity, AccessError> {
        let email = email.trim().to_ascii_lowercase();
        let Some((local, domain)) = email.rsplit_once('@') else {
            return Err(AccessError::InvalidEmail(email));
        };
        let malformed = |part: &str| part.is_empty() || part.contains('@') || part.contains(char::is_whitespace);
        if malformed(local) || malformed(domain) || !domain.contains('.') {
            return Err(AccessError::InvalidEmail(email));
        }
        if domain != self.allowed_domain {
            return Err(AccessError::DomainNotAllowed {
                email,
                domain: self.allowed_domain.clone(),
            });
        }

        let role = if self.admins.contains(&email) {
            Role::Admin
        } else {
            Role::User
        };
        tracing::debug!(%email, ?role, "signed in");
        Ok(Identity { email, role })
    }

    /// Owners and admins see everything; other users only public programs.
    pub fn can_view(&self, identity: &Identity, program: &Program) -> bool {
        program.is_public || identity.is_admin() || program.is_owned_by(&identity.email)
    }

    /// Programs are edited by their owner only.
    pub fn can_edit(&self, identity: &Identity, program: &Program) -> bool {
        program.is_owned_by(&identity.email)
    }
}

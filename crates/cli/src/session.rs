//! State kept between CLI invocations: the user's processor customer link
//! and, in sandbox mode, the sandbox contents.

use std::{fs, path::Path};

use payment_methods_core::SandboxState;
use payment_methods_types::StripeCustomer;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Read(std::path::PathBuf, std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(std::path::PathBuf, serde_json::Error),
    #[error("Failed to write {}: {}", .0.display(), .1)]
    Write(std::path::PathBuf, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer: Option<StripeCustomer>,

    /// Customer linked while running against the sandbox; kept apart so a
    /// sandbox id never reaches the live processor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_customer: Option<StripeCustomer>,

    #[serde(default)]
    pub sandbox: SandboxState,
}

impl SessionState {
    /// Load the session, starting empty when the file does not exist yet
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(path).map_err(|e| SessionError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&content).map_err(|e| SessionError::Parse(path.to_path_buf(), e))
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::Write(path.to_path_buf(), e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SessionError::Write(path.to_path_buf(), e.to_string()))?;
        fs::write(path, content).map_err(|e| SessionError::Write(path.to_path_buf(), e.to_string()))
    }

    pub fn customer(&self, sandbox: bool) -> Option<&StripeCustomer> {
        if sandbox {
            self.sandbox_customer.as_ref()
        } else {
            self.stripe_customer.as_ref()
        }
    }

    pub fn set_customer(&mut self, sandbox: bool, customer: Option<StripeCustomer>) {
        if sandbox {
            self.sandbox_customer = customer;
        } else {
            self.stripe_customer = customer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_session_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(session, SessionState::default());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".paymethods").join("state.json");

        let mut session = SessionState::default();
        session.set_customer(true, Some(StripeCustomer::new("cus_sandbox")));
        session.save(&path).unwrap();

        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded.customer(true), Some(&StripeCustomer::new("cus_sandbox")));
        assert_eq!(loaded.customer(false), None);
    }

    #[test]
    fn test_corrupt_session_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionState::load(&path),
            Err(SessionError::Parse(_, _))
        ));
    }
}

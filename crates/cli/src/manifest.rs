use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use payment_methods_types::{CurrentUser, MANIFEST_FILE_NAME, StripeCustomer};
use serde::{Deserialize, Serialize};

/// Project manifest (payments.yaml)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Manifest {
    /// The marketplace user whose saved card is managed
    pub user: UserProfile,

    #[serde(default)]
    pub processor: ProcessorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserProfile {
    pub fn to_current_user(&self, stripe_customer: Option<StripeCustomer>) -> CurrentUser {
        CurrentUser {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            stripe_customer,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Stripe,
    Sandbox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorSettings {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Upper bound for each processor call, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,

    /// Session file, relative to the manifest directory
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

fn default_state_path() -> String {
    ".paymethods/state.json".to_string()
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        ProcessorSettings {
            provider: ProviderKind::default(),
            call_timeout_ms: None,
            state_path: default_state_path(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadManifestError {
    #[error("{} not found at {}. Please create a {} file in your project root.",
        MANIFEST_FILE_NAME,
        .0.display(),
        MANIFEST_FILE_NAME)]
    FileNotFound(PathBuf),
    #[error("Failed to read {}: {}", .0.display(), .1)]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    ParseError(PathBuf, serde_yml::Error),
    #[error("Invalid manifest {}: {}", .0.display(), .1)]
    Invalid(PathBuf, String),
}

impl Manifest {
    /// Load manifest from the specified file path
    pub fn load(manifest_file_path: &Path) -> Result<Self, LoadManifestError> {
        if !manifest_file_path.exists() {
            return Err(LoadManifestError::FileNotFound(
                manifest_file_path.to_path_buf(),
            ));
        }

        let content = fs::read_to_string(manifest_file_path)
            .map_err(|e| LoadManifestError::ReadError(manifest_file_path.to_path_buf(), e))?;

        let manifest: Manifest = serde_yml::from_str(&content)
            .map_err(|e| LoadManifestError::ParseError(manifest_file_path.to_path_buf(), e))?;

        if manifest.user.id.trim().is_empty() || manifest.user.email.trim().is_empty() {
            return Err(LoadManifestError::Invalid(
                manifest_file_path.to_path_buf(),
                "user.id and user.email are required".to_string(),
            ));
        }

        Ok(manifest)
    }

    pub fn state_path(&self, manifest_dir: &Path) -> PathBuf {
        manifest_dir.join(&self.processor.state_path)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.processor.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn use_sandbox(&self, sandbox_flag: bool) -> bool {
        sandbox_flag || self.processor.provider == ProviderKind::Sandbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"
user:
  id: user-1
  email: joe@example.com
  first_name: Joe
  last_name: Dunphy
processor:
  provider: sandbox
  call_timeout_ms: 5000
"#,
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.user.first_name, "Joe");
        assert_eq!(manifest.processor.provider, ProviderKind::Sandbox);
        assert_eq!(manifest.call_timeout(), Some(Duration::from_secs(5)));
        assert!(manifest.use_sandbox(false));
        assert_eq!(
            manifest.state_path(dir.path()),
            dir.path().join(".paymethods/state.json")
        );
    }

    #[test]
    fn test_processor_section_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "user:\n  id: user-1\n  email: joe@example.com\n",
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.processor, ProcessorSettings::default());
        assert!(!manifest.use_sandbox(false));
        assert!(manifest.use_sandbox(true));
        assert_eq!(manifest.call_timeout(), None);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join(MANIFEST_FILE_NAME)).unwrap_err();
        assert!(matches!(err, LoadManifestError::FileNotFound(_)));
        assert!(err.to_string().contains("payments.yaml not found"));
    }

    #[test]
    fn test_manifest_requires_user_email() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "user:\n  id: user-1\n  email: \"\"\n");
        assert!(matches!(
            Manifest::load(&path),
            Err(LoadManifestError::Invalid(_, _))
        ));
    }

    #[test]
    fn test_unknown_provider_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "user:\n  id: user-1\n  email: joe@example.com\nprocessor:\n  provider: paypal\n",
        );
        assert!(matches!(
            Manifest::load(&path),
            Err(LoadManifestError::ParseError(_, _))
        ));
    }
}

//! Secure credential store
//!
//! Persists one secret per account under the store directory, one entry
//! file per account with owner-only permissions. Consumers get back an
//! opaque [`SecretReference`] and never the plaintext; the reference is
//! what gets written into protocol settings.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{VpnError, VpnResult};
use crate::validation::validate_account_name;

/// Opaque handle to a secret held in the store, keyed by account name.
/// Holds an identifying token only; the plaintext stays in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretReference(String);

impl SecretReference {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// On-disk entry format
#[derive(Debug, Serialize, Deserialize)]
struct CredentialEntry {
    token: String,
    secret: String,
}

/// File-backed credential store
pub struct CredentialStore {
    store_dir: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at the given directory
    pub fn new<P: AsRef<Path>>(store_dir: P) -> Self {
        Self {
            store_dir: store_dir.as_ref().to_path_buf(),
        }
    }

    /// Create the store directory if it doesn't exist
    pub async fn initialize(&self) -> VpnResult<()> {
        fs::create_dir_all(&self.store_dir).await?;
        Ok(())
    }

    fn entry_path(&self, username: &str) -> VpnResult<PathBuf> {
        validate_account_name(username)?;
        Ok(self.store_dir.join(format!("{}.cred", username)))
    }

    /// Store a secret for an account.
    ///
    /// Deletes any existing entry first, then inserts the new one, so a
    /// repeated save leaves exactly one entry per account. A delete miss is
    /// not an error. Returns the new reference.
    pub async fn save(&self, username: &str, secret: &str) -> VpnResult<SecretReference> {
        let path = self.entry_path(username)?;
        fs::create_dir_all(&self.store_dir).await?;

        match fs::remove_file(&path).await {
            Ok(()) => debug!("Replaced credential entry for {}", username),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let entry = CredentialEntry {
            token: uuid::Uuid::new_v4().to_string(),
            secret: secret.to_string(),
        };
        let contents = toml::to_string(&entry)
            .map_err(|e| VpnError::ConfigError(format!("Failed to serialize credential entry: {}", e)))?;

        write_owner_only(&path, &contents).await?;
        info!("Stored credential for account: {}", username);

        Ok(SecretReference::new(entry.token))
    }

    /// Look up the persistent reference for an account's stored secret.
    /// Returns `None` rather than an error when no entry exists.
    pub async fn reference(&self, username: &str) -> VpnResult<Option<SecretReference>> {
        let path = self.entry_path(username)?;

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CredentialEntry = toml::from_str(&contents)
            .map_err(|e| VpnError::ConfigError(format!("Corrupt credential entry for {}: {}", username, e)))?;

        Ok(Some(SecretReference::new(entry.token)))
    }
}

/// Write an entry file with owner-only permissions
async fn write_owner_only(path: &Path, contents: &str) -> VpnResult<()> {
    fs::write(path, contents).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).await?;
    }

    debug!("Wrote credential entry: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, CredentialStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = CredentialStore::new(dir.path());
        (dir, store)
    }

    async fn entry_count(dir: &TempDir) -> usize {
        let mut count = 0;
        let mut entries = fs::read_dir(dir.path()).await.expect("read_dir");
        while let Some(entry) = entries.next_entry().await.expect("next_entry") {
            if entry.path().extension().map(|e| e == "cred").unwrap_or(false) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_save_then_reference() {
        let (_dir, store) = store();

        let saved = store.save("alice", "secret123").await.expect("save");
        assert!(!saved.is_empty());

        let looked_up = store.reference("alice").await.expect("reference");
        assert_eq!(looked_up, Some(saved));
    }

    #[tokio::test]
    async fn test_save_twice_leaves_one_entry() {
        let (dir, store) = store();

        store.save("alice", "first").await.expect("first save");
        store.save("alice", "second").await.expect("second save");

        assert_eq!(entry_count(&dir).await, 1);
        assert!(store.reference("alice").await.expect("reference").is_some());
    }

    #[tokio::test]
    async fn test_missing_account_is_none_not_error() {
        let (_dir, store) = store();
        assert_eq!(store.reference("nobody").await.expect("reference"), None);
    }

    #[tokio::test]
    async fn test_reference_does_not_expose_secret() {
        let (_dir, store) = store();
        let reference = store.save("alice", "secret123").await.expect("save");
        assert_ne!(reference.as_str(), "secret123");
        assert!(!reference.as_str().contains("secret123"));
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let (_dir, store) = store();
        assert!(store.save("../evil", "x").await.is_err());
        assert!(store.reference("a/b").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_entry_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        store.save("alice", "secret123").await.expect("save");

        let path = dir.path().join("alice.cred");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

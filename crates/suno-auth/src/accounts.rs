//! Account storage for Suno session credentials
//!
//! Manages two JSON files: an operator-maintained accounts file mapping
//! account IDs to session credentials, and a relay-maintained disabled
//! list. The accounts file is never written by the relay: operators add
//! and remove accounts by editing it. The disabled list is written with
//! atomic temp-file + rename to prevent corruption on crash. A tokio Mutex
//! serializes concurrent disables from racing requests.
//!
//! Accounts keep the key order of the file, and that order is the rotation
//! order: the active set is the file order with disabled IDs removed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A single account's session credentials.
///
/// `cookie` is the raw browser cookie string captured at sign-in. It is
/// parsed into a jar at selection time; the stored string is never
/// mutated by token refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Clerk session ID (`sess_...`) the cookie belongs to
    pub session_id: String,
    /// Raw cookie string (`k1=v1; k2=v2; ...`)
    pub cookie: String,
}

/// On-disk shape of the disabled list.
#[derive(Debug, Serialize, Deserialize)]
struct DisabledFile {
    #[serde(default)]
    disabled_accounts: Vec<String>,
}

#[derive(Debug)]
struct StoreState {
    /// Accounts in file key order
    accounts: Vec<(String, Account)>,
    /// Disabled IDs in the order they were retired
    disabled: Vec<String>,
}

impl StoreState {
    fn is_disabled(&self, account_id: &str) -> bool {
        self.disabled.iter().any(|d| d == account_id)
    }
}

/// Thread-safe account file manager.
///
/// Reads acquire the lock briefly to clone the relevant slice of state,
/// so request-time reads don't block on a concurrent disable's file write.
#[derive(Debug)]
pub struct AccountStore {
    accounts_path: PathBuf,
    disabled_path: PathBuf,
    state: Mutex<StoreState>,
}

impl AccountStore {
    /// Load accounts and the disabled list from the given file paths.
    ///
    /// Either file may be missing: a missing accounts file means an empty
    /// store (the relay reports `unhealthy` until accounts are added), and
    /// a missing disabled list means nothing is disabled. Neither file is
    /// created here; the disabled list is first written when an account
    /// is disabled.
    pub async fn load(accounts_path: PathBuf, disabled_path: PathBuf) -> Result<Self> {
        let accounts = read_accounts(&accounts_path).await?;
        let disabled = read_disabled(&disabled_path).await?;
        info!(
            path = %accounts_path.display(),
            total = accounts.len(),
            active = count_active(&accounts, &disabled),
            disabled = disabled.len(),
            "loaded account store"
        );

        Ok(Self {
            accounts_path,
            disabled_path,
            state: Mutex::new(StoreState { accounts, disabled }),
        })
    }

    /// Re-read both files, picking up operator edits to the accounts file.
    pub async fn reload(&self) -> Result<()> {
        let accounts = read_accounts(&self.accounts_path).await?;
        let disabled = read_disabled(&self.disabled_path).await?;
        let mut state = self.state.lock().await;
        info!(
            total = accounts.len(),
            active = count_active(&accounts, &disabled),
            disabled = disabled.len(),
            "reloaded account store"
        );
        state.accounts = accounts;
        state.disabled = disabled;
        Ok(())
    }

    /// All account IDs in file order, including disabled ones.
    pub async fn account_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.accounts.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Active account IDs: file order with disabled IDs removed.
    pub async fn active(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .accounts
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !state.is_disabled(id))
            .cloned()
            .collect()
    }

    /// Number of active accounts.
    pub async fn active_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .accounts
            .iter()
            .filter(|(id, _)| !state.is_disabled(id))
            .count()
    }

    /// Disabled account IDs in retirement order.
    pub async fn disabled(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.disabled.clone()
    }

    /// Get a clone of one account's credentials.
    pub async fn get(&self, account_id: &str) -> Option<Account> {
        let state = self.state.lock().await;
        state
            .accounts
            .iter()
            .find(|(id, _)| id == account_id)
            .map(|(_, account)| account.clone())
    }

    /// The front of the active set: the first account in file order that
    /// has not been disabled. This is the account every selection picks.
    pub async fn first_active(&self) -> Option<(String, Account)> {
        let state = self.state.lock().await;
        state
            .accounts
            .iter()
            .find(|(id, _)| !state.is_disabled(id))
            .map(|(id, account)| (id.clone(), account.clone()))
    }

    /// Retire an account and persist the disabled list to disk.
    ///
    /// Idempotent: disabling an already-disabled account is a no-op that
    /// skips the file write. IDs not present in the accounts file are
    /// accepted, since the disabled list may outlive account removal.
    pub async fn disable(&self, account_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_disabled(account_id) {
            debug!(account_id, "account already disabled");
            return Ok(());
        }
        state.disabled.push(account_id.to_string());
        write_disabled_atomic(&self.disabled_path, &state.disabled).await?;
        info!(
            account_id,
            disabled = state.disabled.len(),
            "disabled account"
        );
        Ok(())
    }

    /// Total number of stored accounts, disabled included.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.accounts.len()
    }

    /// Whether the store holds no accounts at all.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn count_active(accounts: &[(String, Account)], disabled: &[String]) -> usize {
    accounts
        .iter()
        .filter(|(id, _)| !disabled.iter().any(|d| d == id))
        .count()
}

/// Read the accounts file, preserving key order.
///
/// A missing file is an empty store, not an error.
async fn read_accounts(path: &Path) -> Result<Vec<(String, Account)>> {
    if !path.exists() {
        info!(path = %path.display(), "accounts file not found, starting with empty store");
        return Ok(Vec::new());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading accounts file: {e}")))?;

    // serde_json's Map keeps insertion order, which defines rotation order
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)
        .map_err(|e| Error::AccountParse(format!("parsing accounts file: {e}")))?;

    let mut accounts = Vec::with_capacity(raw.len());
    for (id, value) in raw {
        let account: Account = serde_json::from_value(value)
            .map_err(|e| Error::AccountParse(format!("account {id}: {e}")))?;
        accounts.push((id, account));
    }
    Ok(accounts)
}

/// Read the disabled list. A missing file means nothing is disabled.
async fn read_disabled(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading disabled accounts file: {e}")))?;

    let file: DisabledFile = serde_json::from_str(&contents)
        .map_err(|e| Error::AccountParse(format!("parsing disabled accounts file: {e}")))?;
    Ok(file.disabled_accounts)
}

/// Write the disabled list to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
async fn write_disabled_atomic(path: &Path, disabled: &[String]) -> Result<()> {
    let file = DisabledFile {
        disabled_accounts: disabled.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| Error::AccountParse(format!("serializing disabled accounts: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("disabled accounts path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".disabled_accounts.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp disabled accounts file: {e}")))?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp disabled accounts file: {e}")))?;

    debug!(path = %path.display(), "persisted disabled accounts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_ACCOUNTS: &str = r#"{
        "carol@example.com": {"session_id": "sess_c", "cookie": "__client=cc;__session=sc"},
        "alice@example.com": {"session_id": "sess_a", "cookie": "__client=ca"},
        "bob@example.com": {"session_id": "sess_b", "cookie": "__client=cb"}
    }"#;

    async fn store_with(dir: &tempfile::TempDir, accounts_json: &str) -> AccountStore {
        let accounts_path = dir.path().join("accounts.json");
        tokio::fs::write(&accounts_path, accounts_json).await.unwrap();
        AccountStore::load(accounts_path, dir.path().join("disabled_accounts.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn missing_files_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let accounts_path = dir.path().join("accounts.json");
        let disabled_path = dir.path().join("disabled_accounts.json");

        let store = AccountStore::load(accounts_path.clone(), disabled_path.clone())
            .await
            .unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.active_count().await, 0);
        assert!(store.first_active().await.is_none());

        // Loading must not create either file
        assert!(!accounts_path.exists());
        assert!(!disabled_path.exists());
    }

    #[tokio::test]
    async fn accounts_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        assert_eq!(
            store.account_ids().await,
            vec!["carol@example.com", "alice@example.com", "bob@example.com"]
        );
        let (id, account) = store.first_active().await.unwrap();
        assert_eq!(id, "carol@example.com");
        assert_eq!(account.session_id, "sess_c");
    }

    #[tokio::test]
    async fn active_is_file_order_minus_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        store.disable("carol@example.com").await.unwrap();
        assert_eq!(
            store.active().await,
            vec!["alice@example.com", "bob@example.com"]
        );
        let (id, _) = store.first_active().await.unwrap();
        assert_eq!(id, "alice@example.com");

        store.disable("bob@example.com").await.unwrap();
        assert_eq!(store.active().await, vec!["alice@example.com"]);
        assert_eq!(store.active_count().await, 1);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn first_active_none_when_all_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        for id in store.account_ids().await {
            store.disable(&id).await.unwrap();
        }
        assert!(store.first_active().await.is_none());
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn disable_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        store.disable("alice@example.com").await.unwrap();
        store.disable("alice@example.com").await.unwrap();
        assert_eq!(store.disabled().await, vec!["alice@example.com"]);

        // The file must not accumulate duplicates either
        let contents =
            tokio::fs::read_to_string(dir.path().join("disabled_accounts.json"))
                .await
                .unwrap();
        let file: DisabledFile = serde_json::from_str(&contents).unwrap();
        assert_eq!(file.disabled_accounts, vec!["alice@example.com"]);
    }

    #[tokio::test]
    async fn disable_unknown_id_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        store.disable("ghost@example.com").await.unwrap();
        assert_eq!(store.disabled().await, vec!["ghost@example.com"]);
        assert_eq!(store.active_count().await, 3);
    }

    #[tokio::test]
    async fn disabled_list_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;
        store.disable("bob@example.com").await.unwrap();
        store.disable("carol@example.com").await.unwrap();

        let store2 = AccountStore::load(
            dir.path().join("accounts.json"),
            dir.path().join("disabled_accounts.json"),
        )
        .await
        .unwrap();
        assert_eq!(
            store2.disabled().await,
            vec!["bob@example.com", "carol@example.com"]
        );
        assert_eq!(store2.active().await, vec!["alice@example.com"]);
    }

    #[tokio::test]
    async fn get_returns_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        let account = store.get("bob@example.com").await.unwrap();
        assert_eq!(account.session_id, "sess_b");
        assert_eq!(account.cookie, "__client=cb");
        assert!(store.get("nobody@example.com").await.is_none());
    }

    #[tokio::test]
    async fn malformed_accounts_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let accounts_path = dir.path().join("accounts.json");
        tokio::fs::write(&accounts_path, "not json").await.unwrap();

        let result =
            AccountStore::load(accounts_path, dir.path().join("disabled_accounts.json")).await;
        assert!(matches!(result, Err(Error::AccountParse(_))));
    }

    #[tokio::test]
    async fn account_missing_field_names_the_account() {
        let dir = tempfile::tempdir().unwrap();
        let accounts_path = dir.path().join("accounts.json");
        tokio::fs::write(
            &accounts_path,
            r#"{"broken@example.com": {"cookie": "__client=x"}}"#,
        )
        .await
        .unwrap();

        let err = AccountStore::load(accounts_path, dir.path().join("disabled_accounts.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken@example.com"));
    }

    #[tokio::test]
    async fn reload_picks_up_operator_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;
        assert_eq!(store.len().await, 3);

        tokio::fs::write(
            dir.path().join("accounts.json"),
            r#"{
                "carol@example.com": {"session_id": "sess_c", "cookie": "__client=cc"},
                "dave@example.com": {"session_id": "sess_d", "cookie": "__client=cd"}
            }"#,
        )
        .await
        .unwrap();

        store.reload().await.unwrap();
        assert_eq!(
            store.account_ids().await,
            vec!["carol@example.com", "dave@example.com"]
        );
    }

    #[tokio::test]
    async fn accounts_file_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;

        store.disable("alice@example.com").await.unwrap();

        let contents = tokio::fs::read_to_string(dir.path().join("accounts.json"))
            .await
            .unwrap();
        assert_eq!(contents, THREE_ACCOUNTS);
    }

    #[tokio::test]
    async fn disable_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, THREE_ACCOUNTS).await;
        store.disable("alice@example.com").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            assert!(!name.contains(".tmp."), "leftover temp file: {name}");
        }
    }

    #[tokio::test]
    async fn concurrent_disables_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store_with(&dir, THREE_ACCOUNTS).await);

        let mut handles = vec![];
        for id in ["alice@example.com", "bob@example.com", "carol@example.com"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.disable(id).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.active_count().await, 0);
        let contents =
            tokio::fs::read_to_string(dir.path().join("disabled_accounts.json"))
                .await
                .unwrap();
        let file: DisabledFile = serde_json::from_str(&contents).unwrap();
        assert_eq!(file.disabled_accounts.len(), 3);
    }

    #[tokio::test]
    async fn disabled_file_tolerates_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let accounts_path = dir.path().join("accounts.json");
        let disabled_path = dir.path().join("disabled_accounts.json");
        tokio::fs::write(&accounts_path, THREE_ACCOUNTS).await.unwrap();
        tokio::fs::write(&disabled_path, "{}").await.unwrap();

        let store = AccountStore::load(accounts_path, disabled_path).await.unwrap();
        assert!(store.disabled().await.is_empty());
    }
}

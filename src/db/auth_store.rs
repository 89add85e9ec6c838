use std::{
    collections::HashMap,
    sync::Arc,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::wa::{auth::AuthState, keys::KeyPair};

/// Generic persistence contract for instance auth state.
///
/// The fine-grained `*_creds`/`*_keys`/`put_*` methods below are thin
/// wrappers over the single combined [`AuthState`] blob every implementer
/// already persists via `load`/`save`; they exist so call sites can name the
/// exact operation they need (load just the creds, bump one pre-key) without
/// hand-rolling the load-mutate-save dance themselves. `putSession`/
/// `getSession` are intentionally not mirrored here: they're served by
/// [`crate::wa::signal::SessionStore`], which already owns per-jid session
/// bytes in a more structured shape than a raw blob field would allow.
pub trait AuthStore: Send + Sync {
    /// Loads auth state for the target instance.
    fn load<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<AuthState>, AuthStoreError>>;

    /// Saves auth state for the target instance.
    fn save<'a>(
        &'a self,
        instance_name: &'a str,
        state: &'a AuthState,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>>;

    /// Deletes any persisted auth state for the target instance.
    fn remove<'a>(&'a self, instance_name: &'a str) -> BoxFuture<'a, Result<(), AuthStoreError>>;

    /// Loads just the credential blob. Alias over [`AuthStore::load`].
    fn load_creds<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<AuthState>, AuthStoreError>> {
        self.load(instance_name)
    }

    /// Persists the credential blob. Alias over [`AuthStore::save`].
    fn save_creds<'a>(
        &'a self,
        instance_name: &'a str,
        state: &'a AuthState,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        self.save(instance_name, state)
    }

    /// Removes all persisted state for an instance, cascading to keys and
    /// sessions alike since they all live in the one blob. Alias over
    /// [`AuthStore::remove`].
    fn remove_all<'a>(&'a self, instance_name: &'a str) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        self.remove(instance_name)
    }

    /// Returns the one-time pre-key pool for an instance, empty if unknown.
    fn load_keys<'a>(&'a self, instance_name: &'a str) -> BoxFuture<'a, Result<Vec<KeyPair>, AuthStoreError>> {
        Box::pin(async move {
            let keys = self
                .load(instance_name)
                .await?
                .map(|state| state.identity.one_time_pre_keys)
                .unwrap_or_default();
            Ok(keys)
        })
    }

    /// Appends a single pre-key to an existing instance's pool.
    fn put_pre_key<'a>(
        &'a self,
        instance_name: &'a str,
        key: KeyPair,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut state = self
                .load(instance_name)
                .await?
                .ok_or_else(|| AuthStoreError::Io(format!("no auth state for {instance_name}")))?;
            state.identity.one_time_pre_keys.push(key);
            state.identity.next_pre_key_id += 1;
            self.save(instance_name, &state).await
        })
    }

    /// Marks a pre-key at the given pool index as used, removing it.
    fn mark_pre_key_used<'a>(
        &'a self,
        instance_name: &'a str,
        index: usize,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut state = self
                .load(instance_name)
                .await?
                .ok_or_else(|| AuthStoreError::Io(format!("no auth state for {instance_name}")))?;
            if index < state.identity.one_time_pre_keys.len() {
                state.identity.one_time_pre_keys.remove(index);
            }
            self.save(instance_name, &state).await
        })
    }

    /// Stores a sender-key entry for the given identifier.
    fn put_sender_key<'a>(
        &'a self,
        instance_name: &'a str,
        key_id: &'a str,
        value: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut state = self
                .load(instance_name)
                .await?
                .ok_or_else(|| AuthStoreError::Io(format!("no auth state for {instance_name}")))?;
            state.sender_keys.insert(key_id.to_owned(), value);
            self.save(instance_name, &state).await
        })
    }

    /// Stores an app-state sync key entry for the given key id.
    fn put_app_state_sync_key<'a>(
        &'a self,
        instance_name: &'a str,
        key_id: &'a str,
        value: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut state = self
                .load(instance_name)
                .await?
                .ok_or_else(|| AuthStoreError::Io(format!("no auth state for {instance_name}")))?;
            state.app_state_sync_keys.insert(key_id.to_owned(), value);
            self.save(instance_name, &state).await
        })
    }

    /// Stores the last-seen version for an app-state collection.
    fn put_app_state_version<'a>(
        &'a self,
        instance_name: &'a str,
        collection: &'a str,
        version: u64,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut state = self
                .load(instance_name)
                .await?
                .ok_or_else(|| AuthStoreError::Io(format!("no auth state for {instance_name}")))?;
            state.app_state_versions.insert(collection.to_owned(), version);
            self.save(instance_name, &state).await
        })
    }
}

/// In-memory auth store used for local runs and tests.
///
/// Credentials never leave process memory; swapping in a durable store
/// (e.g. a Postgres- or Redis-backed one) only requires implementing
/// [`AuthStore`] and handing the `Arc` to `InstanceManager::new_with_runtime`.
#[derive(Clone, Default)]
pub struct InMemoryAuthStore {
    states: Arc<RwLock<HashMap<String, AuthState>>>,
}

impl InMemoryAuthStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthStore for InMemoryAuthStore {
    fn load<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<AuthState>, AuthStoreError>> {
        Box::pin(async move {
            let guard = self.states.read().await;
            Ok(guard.get(instance_name).cloned())
        })
    }

    fn save<'a>(
        &'a self,
        instance_name: &'a str,
        state: &'a AuthState,
    ) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut guard = self.states.write().await;
            guard.insert(instance_name.to_owned(), state.clone());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, instance_name: &'a str) -> BoxFuture<'a, Result<(), AuthStoreError>> {
        Box::pin(async move {
            let mut guard = self.states.write().await;
            guard.remove(instance_name);
            Ok(())
        })
    }
}

/// Errors exposed by generic auth store operations.
#[derive(Debug, Error)]
pub enum AuthStoreError {
    #[error("auth store io failure: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_state() {
        let store = InMemoryAuthStore::new();
        let state = AuthState::new();
        store.save("alpha", &state).await.unwrap();

        let loaded = store.load("alpha").await.unwrap();
        assert_eq!(loaded, Some(state));

        store.remove("alpha").await.unwrap();
        assert_eq!(store.load("alpha").await.unwrap(), None);
    }
}

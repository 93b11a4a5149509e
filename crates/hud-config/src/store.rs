//! Cached user flag store with asynchronous, best-effort persistence.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use ron::ser::PrettyConfig;
use tracing::{debug, trace};

use crate::{Error, FlagUpdate, UserFlags, loader::load_flags_from_path};

/// Shared state behind a [`FlagStore`].
struct Inner {
    /// Cached flags; reads never touch disk.
    flags: Mutex<UserFlags>,
    /// Backing file, if persistent.
    path: Option<PathBuf>,
    /// Serializes writers so the last applied update is the last one written.
    write_lock: tokio::sync::Mutex<()>,
}

/// Per-user flag store.
///
/// Reads are synchronous from the cache. Writes update the cache immediately
/// and then rewrite the backing RON file, if any.
#[derive(Clone)]
pub struct FlagStore {
    /// Shared store state.
    inner: Arc<Inner>,
}

impl FlagStore {
    /// A store that never touches disk.
    pub fn in_memory(flags: UserFlags) -> Self {
        Self {
            inner: Arc::new(Inner {
                flags: Mutex::new(flags),
                path: None,
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Open a store backed by `path`, loading existing flags if the file exists.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let flags = load_flags_from_path(path)?;
        debug!(path = %path.display(), "flag store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                flags: Mutex::new(flags),
                path: Some(path.to_path_buf()),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Snapshot of the cached flags.
    pub fn flags(&self) -> UserFlags {
        self.inner.flags.lock().clone()
    }

    /// Apply an update to the cache and persist it.
    pub async fn apply(&self, update: FlagUpdate) -> Result<(), Error> {
        trace!(?update, "flag_update");
        self.write_with(|flags| flags.apply(&update)).await
    }

    /// Replace every flag with its default and persist.
    pub async fn reset(&self) -> Result<(), Error> {
        debug!("flag_reset");
        self.write_with(|flags| *flags = UserFlags::default()).await
    }

    /// Mutate the cache under the writer lock, then rewrite the backing file.
    async fn write_with<F>(&self, mutate: F) -> Result<(), Error>
    where
        F: FnOnce(&mut UserFlags),
    {
        let _writer = self.inner.write_lock.lock().await;
        let doc = {
            let mut flags = self.inner.flags.lock();
            mutate(&mut *flags);
            let Some(path) = &self.inner.path else {
                return Ok(());
            };
            ron::ser::to_string_pretty(&*flags, PrettyConfig::default()).map_err(|e| {
                Error::Write {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?
        };
        if let Some(path) = &self.inner.path {
            tokio::fs::write(path, doc)
                .await
                .map_err(|e| Error::Write {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hud_protocol::{NestId, Position};

    use super::*;

    #[tokio::test]
    async fn in_memory_updates_cache() {
        let store = FlagStore::in_memory(UserFlags::default());
        store.apply(FlagUpdate::Collapsed(true)).await.unwrap();
        assert!(store.flags().is_collapsed);
    }

    #[tokio::test]
    async fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.ron");
        let store = FlagStore::open(&path).unwrap();
        store
            .apply(FlagUpdate::Position(Position::new(120, 240)))
            .await
            .unwrap();
        store
            .apply(FlagUpdate::GroupCollapsed {
                nest_id: NestId::new("spells_cantrips"),
                collapsed: true,
            })
            .await
            .unwrap();

        let reopened = FlagStore::open(&path).unwrap().flags();
        assert_eq!(reopened.position, Some(Position::new(120, 240)));
        assert!(reopened.is_group_collapsed(&NestId::new("spells_cantrips")));
    }

    #[tokio::test]
    async fn reset_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.ron");
        let store = FlagStore::open(&path).unwrap();
        store.apply(FlagUpdate::Unlocked(true)).await.unwrap();
        store
            .apply(FlagUpdate::Position(Position::new(300, 300)))
            .await
            .unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.flags(), UserFlags::default());
        assert_eq!(FlagStore::open(&path).unwrap().flags(), UserFlags::default());
    }
}

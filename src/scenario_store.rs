//! Named scenario snapshots persisted in LMDB.
//!
//! The store keeps whole documents under user-chosen names so an editing
//! session can be parked and resumed. Documents are stored as compact JSON
//! with `Infinity` still in its in-memory sentinel form.

use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Cursor, Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{info, warn};

use crate::app_response::AppResponse;
use crate::scenario_model::ScenarioDocument;

pub struct ScenarioStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl ScenarioStore {
    /// Opens (or creates) the store directory at `path`.
    pub fn open(path: impl AsRef<Path>, map_size: usize) -> Result<Self, AppResponse> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path).map_err(|e| {
            AppResponse::DatabaseError(format!("Cannot create store directory {}: {e}", path.display()))
        })?;

        let env = Environment::new().set_map_size(map_size).open(&path)?;
        let db = env.create_db(None, DatabaseFlags::empty())?;

        info!("Snapshot store opened at {}", path.display());
        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, name: &str, document: &ScenarioDocument) -> Result<(), AppResponse> {
        validate_name(name)?;
        let bytes = serde_json::to_vec(document)?;

        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &name.as_bytes(), &bytes, WriteFlags::empty())?;
        txn.commit()?;

        info!("Saved snapshot '{name}' ({} bytes)", bytes.len());
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Option<ScenarioDocument>, AppResponse> {
        validate_name(name)?;
        let txn = self.env.begin_ro_txn()?;
        match txn.get(self.db, &name.as_bytes()) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot names in key order.
    pub fn list(&self) -> Result<Vec<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let names = {
            let mut cursor = txn.open_ro_cursor(self.db)?;
            cursor
                .iter()
                .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                .collect::<Vec<_>>()
        };
        Ok(names)
    }

    /// Returns `false` when no snapshot had that name.
    pub fn delete(&self, name: &str) -> Result<bool, AppResponse> {
        validate_name(name)?;
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &name.as_bytes(), None) {
            Ok(()) => {
                txn.commit()?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                Ok(false)
            }
            Err(e) => {
                warn!("Failed to delete snapshot '{name}': {e:?}");
                Err(e.into())
            }
        }
    }

    pub fn clear(&self) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.clear_db(self.db)?;
        txn.commit()?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AppResponse> {
    if name.trim().is_empty() {
        return Err(AppResponse::ValidationError("Snapshot name cannot be empty".to_string()));
    }
    Ok(())
}

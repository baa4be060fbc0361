//! Order store kept as one pretty-printed JSON array on disk
//!
//! Every write re-reads the whole collection, modifies it and replaces the
//! file atomically (write to a sibling temp file, then rename). Writers are
//! serialized by an in-process lock; other processes must not write the file.

use super::{DbResult, Order, StatusChange, UserId};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole collection; a missing file is an empty collection
    pub fn load(&self) -> DbResult<Vec<Order>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn append(&self, order: &Order) -> DbResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| super::DbError::LockPoisoned)?;
        let mut orders = self.load()?;
        orders.push(order.clone());
        self.replace(&orders)
    }

    /// Apply `change` to every matching record, returning how many moved
    pub fn update_status(&self, change: &StatusChange) -> DbResult<usize> {
        let _guard = self.write_lock.lock().map_err(|_| super::DbError::LockPoisoned)?;
        let mut orders = self.load()?;
        let changed = orders
            .iter_mut()
            .map(|o| change.apply(o))
            .filter(|&moved| moved)
            .count();
        if changed > 0 {
            self.replace(&orders)?;
        }
        Ok(changed)
    }

    pub fn orders_for(&self, owner: UserId, handle: Option<&str>) -> DbResult<Vec<Order>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|o| o.is_owned_by(owner, handle))
            .collect())
    }

    pub fn has_orders(&self, owner: UserId) -> DbResult<bool> {
        Ok(self.load()?.iter().any(|o| o.user_id == owner))
    }

    fn replace(&self, orders: &[Order]) -> DbResult<()> {
        let data = serde_json::to_vec_pretty(orders)?;
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| "orders.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

//! Bookkeeping keys (schema version, id counters, reweigh cursor) in the
//! `meta` database.

use ballast_store::{MetaStore, StoreError};
use heed::RwTxn;

use crate::{LmdbEnvironment, LmdbError};

impl LmdbEnvironment {
    /// Run `f` in a write transaction of its own and commit it.
    fn meta_write<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RwTxn<'_>) -> Result<(), heed::Error>,
    {
        let _writer = self.writer_slot();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        f(&mut wtxn).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl MetaStore for LmdbEnvironment {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta_write(|wtxn| self.meta_db.put(wtxn, key.as_bytes(), value))
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.meta_db.get(&rtxn, key.as_bytes()).map_err(LmdbError::from)? {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(StoreError::NotFound(format!("meta key '{key}'"))),
        }
    }

    /// Deleting an absent key is not an error.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta_write(|wtxn| self.meta_db.delete(wtxn, key.as_bytes()).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_store::REWEIGH_CURSOR_KEY;

    #[test]
    fn cursor_key_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();

        assert!(matches!(
            store.get_meta(REWEIGH_CURSOR_KEY),
            Err(StoreError::NotFound(_))
        ));
        store.put_meta(REWEIGH_CURSOR_KEY, &[7u8; 16]).unwrap();
        assert_eq!(store.get_meta(REWEIGH_CURSOR_KEY).unwrap(), vec![7u8; 16]);
        store.delete_meta(REWEIGH_CURSOR_KEY).unwrap();
        store.delete_meta(REWEIGH_CURSOR_KEY).unwrap();
        assert!(store.get_meta(REWEIGH_CURSOR_KEY).is_err());
    }

    #[test]
    fn schema_version_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}

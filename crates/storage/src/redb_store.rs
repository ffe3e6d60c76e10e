// Path: crates/storage/src/redb_store.rs
use ioi_lc_api::state::{next_prefix, StateAccess, StateKVPair, StateScanIter};
use ioi_lc_types::error::StateError;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

/// ---- Table definitions ----
/// Every host key lives in one ordered table; the logical tables are key prefixes.
const STATE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("STATE");

fn backend<E: std::fmt::Display>(e: E) -> StateError {
    StateError::Backend(e.to_string())
}

/// A `StateAccess` backed by a redb database file.
///
/// Every `batch_apply` is one redb write transaction, so a committed call is
/// durable as a whole or not at all. Scans read from a snapshot taken when the
/// scan starts.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens the database at `path`, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Ensure the table exists so read transactions never see it missing.
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(STATE).map_err(backend)?;
            w.commit().map_err(backend)?;
        }
        tracing::debug!(target: "storage", path = %path.as_ref().display(), "opened redb state");
        Ok(Self { db: Arc::new(db) })
    }
}

impl StateAccess for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(STATE).map_err(backend)?;
        let value = table.get(key).map_err(backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.batch_apply(&[(key.to_vec(), value.to_vec())], &[])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.batch_apply(&[], &[key.to_vec()])
    }

    fn batch_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>, StateError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(STATE).map_err(backend)?;
        keys.iter()
            .map(|k| {
                table
                    .get(k.as_slice())
                    .map(|v| v.map(|v| v.value().to_vec()))
                    .map_err(backend)
            })
            .collect()
    }

    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        let w = self.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(STATE).map_err(backend)?;
            for key in deletes {
                table.remove(key.as_slice()).map_err(backend)?;
            }
            for (key, value) in inserts {
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(backend)?;
            }
        }
        w.commit().map_err(backend)?;
        tracing::trace!(
            target: "storage",
            inserts = inserts.len(),
            deletes = deletes.len(),
            "committed batch"
        );
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(STATE).map_err(backend)?;
        let upper = next_prefix(prefix);
        let range = match &upper {
            Some(end) => table.range::<&[u8]>(prefix..end.as_slice()),
            None => table.range::<&[u8]>(prefix..),
        }
        .map_err(backend)?;

        // The read transaction ends with this call, so the snapshot is materialized.
        let mut items: Vec<Result<StateKVPair, StateError>> = Vec::new();
        for entry in range {
            let (k, v) = entry.map_err(backend)?;
            items.push(Ok((Arc::from(k.value()), Arc::from(v.value()))));
        }
        Ok(Box::new(items.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_batch_apply_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.redb");
        {
            let mut store = RedbStore::open(&path).unwrap();
            store
                .batch_apply(
                    &[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())],
                    &[],
                )
                .unwrap();
            store.batch_apply(&[], &[b"a".to_vec()]).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(
            store.batch_get(&[b"a".to_vec(), b"b".to_vec()]).unwrap(),
            vec![None, Some(b"2".to_vec())]
        );
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let dir = tempdir().unwrap();
        let mut store = RedbStore::open(dir.path().join("state.redb")).unwrap();
        for key in [&b"p/2"[..], b"p/10", b"p/1", b"q/0", b"o/9"] {
            store.insert(key, b"v").unwrap();
        }
        let keys: Vec<Vec<u8>> = store
            .prefix_scan(b"p/")
            .unwrap()
            .map(|item| item.unwrap().0.to_vec())
            .collect();
        assert_eq!(keys, vec![b"p/1".to_vec(), b"p/10".to_vec(), b"p/2".to_vec()]);
    }
}

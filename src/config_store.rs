use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;

use crate::error::Result;

const CONFIGS: TableDefinition<&str, &str> = TableDefinition::new("configs");

/// Named configuration objects persisted in a redb database.
///
/// Used to save a pipeline setup under a name and rebuild it later through
/// [`factory::from_config`](crate::factory::from_config).
pub struct ConfigStore {
    db: Database,
}

impl ConfigStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(CONFIGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Store `config` under `name`, replacing any previous entry.
    pub fn set(&self, name: &str, config: &Value) -> Result<()> {
        let encoded = serde_json::to_string(config)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CONFIGS)?;
            table.insert(name, encoded.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CONFIGS)?;
        match table.get(name)? {
            Some(v) => Ok(Some(serde_json::from_str(v.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, name: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(CONFIGS)?;
            table.remove(name)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Names of all stored configurations, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CONFIGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.push(k.value().to_string());
        }
        Ok(result)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

/// Read a configuration object from a JSON file.
pub fn load_json_config(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write a configuration object to a JSON file, pretty-printed.
pub fn save_json_config(path: &Path, config: &Value) -> Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_store() -> (tempfile::TempDir, ConfigStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(&tmp.path().join("configs.redb")).unwrap();
        (tmp, store)
    }

    #[test]
    fn configs_crud() {
        let (_tmp, store) = test_store();

        assert_eq!(store.list().unwrap(), Vec::<String>::new());
        assert_eq!(store.get("exp1").unwrap(), None);

        let config = json!({"type": "MemoryDataSet", "MemoryDataSet": {}});
        store.set("exp1", &config).unwrap();
        assert_eq!(store.get("exp1").unwrap(), Some(config));
        assert_eq!(store.list().unwrap(), vec!["exp1".to_string()]);

        assert!(store.remove("exp1").unwrap());
        assert!(!store.remove("exp1").unwrap());
        assert_eq!(store.get("exp1").unwrap(), None);
    }

    #[test]
    fn set_overwrites() {
        let (_tmp, store) = test_store();
        store.set("a", &json!({"type": "X"})).unwrap();
        store.set("a", &json!({"type": "Y"})).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"type": "Y"})));
    }

    #[test]
    fn list_is_sorted() {
        let (_tmp, store) = test_store();
        for name in ["c", "a", "b"] {
            store.set(name, &Value::Null).unwrap();
        }
        assert_eq!(store.list().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("configs.redb");

        {
            let store = ConfigStore::open(&path).unwrap();
            store.set("exp", &json!({"type": "RedbDataSet"})).unwrap();
        }

        {
            let store = ConfigStore::open(&path).unwrap();
            assert_eq!(
                store.get("exp").unwrap(),
                Some(json!({"type": "RedbDataSet"}))
            );
        }
    }

    #[test]
    fn json_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let config = json!({"type": "RedbDataSet", "RedbDataSet": {"file_path": "/x"}});

        save_json_config(&path, &config).unwrap();
        assert_eq!(load_json_config(&path).unwrap(), config);
    }

    #[test]
    fn missing_json_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_json_config(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}

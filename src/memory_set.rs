use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data_set::DataSet,
    element::{DataElement, MemoryElement},
    error::{Error, Result},
    key::Uid,
    plugin::{ConfigOption, Configurable, ImplementationRecord, Options},
    text_util::resolve_dir,
};

pub const IMPLEMENTATION_NAME: &str = "MemoryDataSet";

const CACHE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CachedElement {
    uuid: Uid,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct Cache {
    version: u32,
    elements: Vec<CachedElement>,
}

/// A data set held in memory.
///
/// With a cache path, the set is loaded from that file on construction and
/// the whole set is rewritten to it after each add. Only cached sets can be
/// rebuilt from their configuration; an uncached set exports a null
/// `cache_path`, which the factory reports as missing.
pub struct MemoryDataSet {
    elements: RwLock<HashMap<Uid, Arc<dyn DataElement>>>,
    cache_path: Option<PathBuf>,
}

impl MemoryDataSet {
    pub fn new() -> Self {
        Self {
            elements: RwLock::new(HashMap::new()),
            cache_path: None,
        }
    }

    /// Open a set persisted at `path`. A missing file starts an empty set.
    pub fn with_cache(path: &Path) -> Result<Self> {
        let path = resolve_dir(path)?;
        let mut elements: HashMap<Uid, Arc<dyn DataElement>> = HashMap::new();

        if path.is_file() {
            let cache: Cache = serde_json::from_slice(&std::fs::read(&path)?)?;
            if cache.version != CACHE_VERSION {
                return Err(Error::UnsupportedFormat {
                    path,
                    version: cache.version,
                });
            }
            for e in cache.elements {
                let elem = MemoryElement::with_uuid(
                    e.uuid.clone(),
                    e.bytes,
                    e.content_type,
                );
                elements.insert(e.uuid, Arc::new(elem));
            }
            tracing::debug!(
                path = %path.display(),
                count = elements.len(),
                "loaded data set cache"
            );
        }

        Ok(Self {
            elements: RwLock::new(elements),
            cache_path: Some(path),
        })
    }

    pub fn record() -> ImplementationRecord<dyn DataSet> {
        ImplementationRecord::<dyn DataSet>::new(
            IMPLEMENTATION_NAME,
            Self::from_options,
        )
        .with_option(ConfigOption::required("cache_path"))
    }

    fn from_options(options: &Options, _: &()) -> Result<Box<dyn DataSet>> {
        let path = options
            .get("cache_path")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Config("`cache_path` must be a string".to_string())
            })?;
        Ok(Box::new(Self::with_cache(Path::new(path))?))
    }

    fn write_cache(
        &self,
        elements: &HashMap<Uid, Arc<dyn DataElement>>,
    ) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };

        let mut cached = Vec::with_capacity(elements.len());
        for elem in elements.values() {
            cached.push(CachedElement {
                uuid: elem.uuid().clone(),
                content_type: elem.content_type().to_string(),
                bytes: elem.get_bytes()?,
            });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = Cache {
            version: CACHE_VERSION,
            elements: cached,
        };
        std::fs::write(path, serde_json::to_vec(&cache)?)?;
        Ok(())
    }
}

impl Default for MemoryDataSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDataSet")
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

impl Configurable for MemoryDataSet {
    fn implementation_name(&self) -> &'static str {
        IMPLEMENTATION_NAME
    }

    fn get_config(&self) -> Options {
        let mut options = Options::new();
        options.insert(
            "cache_path".to_string(),
            self.cache_path
                .as_ref()
                .map_or(Value::Null, |p| p.to_string_lossy().into()),
        );
        options
    }
}

// The map is only replaced after the cache write succeeds, so a poisoned
// lock is still usable.
impl DataSet for MemoryDataSet {
    fn count(&self) -> Result<usize> {
        let elements =
            self.elements.read().unwrap_or_else(PoisonError::into_inner);
        Ok(elements.len())
    }

    fn uuids(&self) -> Result<HashSet<Uid>> {
        let elements =
            self.elements.read().unwrap_or_else(PoisonError::into_inner);
        Ok(elements.keys().cloned().collect())
    }

    fn has_uuid(&self, uuid: &Uid) -> Result<bool> {
        let elements =
            self.elements.read().unwrap_or_else(PoisonError::into_inner);
        Ok(elements.contains_key(uuid))
    }

    fn add_data(&self, elem: Arc<dyn DataElement>) -> Result<()> {
        self.add_data_many(&[elem])
    }

    fn add_data_many(&self, elems: &[Arc<dyn DataElement>]) -> Result<()> {
        let mut elements =
            self.elements.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = elements.clone();
        for elem in elems {
            updated.insert(elem.uuid().clone(), Arc::clone(elem));
        }
        self.write_cache(&updated)?;
        *elements = updated;
        Ok(())
    }

    fn get_data(&self, uuid: &Uid) -> Result<Arc<dyn DataElement>> {
        let elements =
            self.elements.read().unwrap_or_else(PoisonError::into_inner);
        elements.get(uuid).cloned().ok_or_else(|| Error::NotFound {
            kind: "data element",
            name: uuid.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(uuid: i64, bytes: &[u8]) -> Arc<dyn DataElement> {
        Arc::new(MemoryElement::with_uuid(uuid, bytes.to_vec(), "text/plain"))
    }

    #[test]
    fn empty_set() {
        let set = MemoryDataSet::new();
        assert_eq!(set.count().unwrap(), 0);
        assert!(set.uuids().unwrap().is_empty());
        assert!(!set.has_uuid(&Uid::Int(1)).unwrap());
    }

    #[test]
    fn add_and_get() {
        let set = MemoryDataSet::new();
        set.add_data(elem(1, b"one")).unwrap();
        set.add_data(elem(2, b"two")).unwrap();

        assert_eq!(set.count().unwrap(), 2);
        assert!(set.has_uuid(&Uid::Int(2)).unwrap());
        assert_eq!(
            set.uuids().unwrap(),
            HashSet::from([Uid::Int(1), Uid::Int(2)])
        );
        assert_eq!(set.get_data(&Uid::Int(1)).unwrap().get_bytes().unwrap(), b"one");
    }

    #[test]
    fn duplicate_replaces() {
        let set = MemoryDataSet::new();
        set.add_data(elem(1, b"first")).unwrap();
        set.add_data(elem(1, b"second")).unwrap();

        assert_eq!(set.count().unwrap(), 1);
        assert_eq!(
            set.get_data(&Uid::Int(1)).unwrap().get_bytes().unwrap(),
            b"second"
        );
    }

    #[test]
    fn missing_is_not_found() {
        let set = MemoryDataSet::new();
        assert!(matches!(
            set.get_data(&Uid::from("nope")),
            Err(Error::NotFound { kind: "data element", .. })
        ));
    }

    #[test]
    fn cache_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("set.json");

        {
            let set = MemoryDataSet::with_cache(&path).unwrap();
            set.add_data_many(&[elem(1, b"one"), elem(2, b"two")]).unwrap();
        }

        let set = MemoryDataSet::with_cache(&path).unwrap();
        assert_eq!(set.count().unwrap(), 2);
        let two = set.get_data(&Uid::Int(2)).unwrap();
        assert_eq!(two.get_bytes().unwrap(), b"two");
        assert_eq!(two.content_type(), "text/plain");
    }

    struct Unreadable;

    impl DataElement for Unreadable {
        fn uuid(&self) -> &Uid {
            static UUID: Uid = Uid::Int(99);
            &UUID
        }

        fn content_type(&self) -> &str {
            "text/plain"
        }

        fn get_bytes(&self) -> Result<Vec<u8>> {
            Err(Error::Io(std::io::Error::other("unreadable")))
        }
    }

    #[test]
    fn failed_cache_write_leaves_set_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("set.json");
        let set = MemoryDataSet::with_cache(&path).unwrap();
        set.add_data(elem(1, b"one")).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = set
            .add_data_many(&[elem(2, b"two"), Arc::new(Unreadable)])
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        assert_eq!(set.count().unwrap(), 1);
        assert!(!set.has_uuid(&Uid::Int(2)).unwrap());
        assert!(!set.has_uuid(&Uid::Int(99)).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let reopened = MemoryDataSet::with_cache(&path).unwrap();
        assert_eq!(reopened.uuids().unwrap(), set.uuids().unwrap());
    }

    #[test]
    fn uncached_config_cannot_be_rebuilt() {
        let options = MemoryDataSet::new().get_config();
        assert!(matches!(
            MemoryDataSet::from_options(&options, &()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn config_without_cache_is_null() {
        let set = MemoryDataSet::new();
        assert_eq!(set.get_config()["cache_path"], Value::Null);
    }
}

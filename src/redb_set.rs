use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex, PoisonError, Weak},
};

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde_json::Value;

use crate::{
    data_set::DataSet,
    element::{DataElement, MemoryElement},
    error::{Error, Result},
    key::Uid,
    plugin::{ConfigOption, Configurable, ImplementationRecord, Options},
    text_util::resolve_dir,
};

pub const IMPLEMENTATION_NAME: &str = "RedbDataSet";

const ELEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("elements");

/// Header size: 4 bytes content type length.
const HEADER_SIZE: usize = 4;

/// A data set stored in a redb database file.
///
/// Keys are the tagged JSON encoding of the element uuid. Value format:
/// - 4 bytes: content type length L (u32 LE)
/// - L bytes: content type (UTF-8)
/// - remaining bytes: element content
///
/// redb holds an exclusive lock on the file, so every instance opened on the
/// same path within a process shares one database handle.
pub struct RedbDataSet {
    db: Arc<Database>,
    file_path: PathBuf,
}

/// Databases currently open in this process, keyed by canonical file path.
static OPEN_DATABASES: LazyLock<Mutex<HashMap<PathBuf, Weak<Database>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn shared_database(file_path: &Path) -> Result<Arc<Database>> {
    let key = match (file_path.parent(), file_path.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize()?.join(name),
        _ => file_path.to_path_buf(),
    };

    let mut open =
        OPEN_DATABASES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(db) = open.get(&key).and_then(Weak::upgrade) {
        tracing::debug!(path = %key.display(), "reusing open data set database");
        return Ok(db);
    }

    let db = Database::create(&key)?;
    let txn = db.begin_write()?;
    txn.open_table(ELEMENTS)?;
    txn.commit()?;

    let db = Arc::new(db);
    open.retain(|_, weak| weak.strong_count() > 0);
    open.insert(key, Arc::downgrade(&db));
    Ok(db)
}

impl RedbDataSet {
    /// Open or create a data set database at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use reprkit::{DataSet, RedbDataSet};
    ///
    /// let set = RedbDataSet::open(&tmp.path().join("set.redb")).unwrap();
    /// assert_eq!(set.count().unwrap(), 0);
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let file_path = resolve_dir(path)?;
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = shared_database(&file_path)?;

        Ok(Self { db, file_path })
    }

    pub fn record() -> ImplementationRecord<dyn DataSet> {
        ImplementationRecord::<dyn DataSet>::new(
            IMPLEMENTATION_NAME,
            Self::from_options,
        )
        .with_option(ConfigOption::required("file_path"))
    }

    fn from_options(options: &Options, _: &()) -> Result<Box<dyn DataSet>> {
        let path = options
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Config("`file_path` must be a string".to_string())
            })?;
        Ok(Box::new(Self::open(Path::new(path))?))
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn encode_value(content_type: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    let ct_len = u32::try_from(content_type.len()).map_err(|_| {
        Error::Config("content type is too long to store".to_string())
    })?;
    let mut value =
        Vec::with_capacity(HEADER_SIZE + content_type.len() + bytes.len());
    value.extend_from_slice(&ct_len.to_le_bytes());
    value.extend_from_slice(content_type.as_bytes());
    value.extend_from_slice(bytes);
    Ok(value)
}

fn decode_value(uuid: Uid, value: &[u8]) -> Result<MemoryElement> {
    let corrupt = || Error::Corrupt(format!("data element {uuid}"));

    let header: [u8; HEADER_SIZE] = value
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(corrupt)?;
    let ct_len = u32::from_le_bytes(header) as usize;

    let ct_end = HEADER_SIZE + ct_len;
    let content_type = value
        .get(HEADER_SIZE..ct_end)
        .and_then(|ct| std::str::from_utf8(ct).ok())
        .ok_or_else(corrupt)?
        .to_string();

    Ok(MemoryElement::with_uuid(
        uuid,
        value[ct_end..].to_vec(),
        content_type,
    ))
}

impl std::fmt::Debug for RedbDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDataSet")
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl Configurable for RedbDataSet {
    fn implementation_name(&self) -> &'static str {
        IMPLEMENTATION_NAME
    }

    fn get_config(&self) -> Options {
        let mut options = Options::new();
        options.insert(
            "file_path".to_string(),
            self.file_path.to_string_lossy().into(),
        );
        options
    }
}

impl DataSet for RedbDataSet {
    fn count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ELEMENTS)?;
        Ok(table.len()? as usize)
    }

    fn uuids(&self) -> Result<HashSet<Uid>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ELEMENTS)?;
        let mut result = HashSet::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.insert(Uid::decode(k.value())?);
        }
        Ok(result)
    }

    fn has_uuid(&self, uuid: &Uid) -> Result<bool> {
        let key = uuid.encode()?;
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ELEMENTS)?;
        Ok(table.get(key.as_str())?.is_some())
    }

    fn add_data(&self, elem: Arc<dyn DataElement>) -> Result<()> {
        self.add_data_many(&[elem])
    }

    /// Store all elements in a single transaction.
    fn add_data_many(&self, elems: &[Arc<dyn DataElement>]) -> Result<()> {
        if elems.is_empty() {
            return Ok(());
        }

        let mut encoded = Vec::with_capacity(elems.len());
        for elem in elems {
            let key = elem.uuid().encode()?;
            let value = encode_value(elem.content_type(), &elem.get_bytes()?)?;
            encoded.push((key, value));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ELEMENTS)?;
            for (key, value) in &encoded {
                table.insert(key.as_str(), value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn get_data(&self, uuid: &Uid) -> Result<Arc<dyn DataElement>> {
        let key = uuid.encode()?;
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ELEMENTS)?;

        let Some(guard) = table.get(key.as_str())? else {
            return Err(Error::NotFound {
                kind: "data element",
                name: uuid.to_string(),
            });
        };

        Ok(Arc::new(decode_value(uuid.clone(), guard.value())?))
    }
}

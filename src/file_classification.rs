use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    classification::{
        Classification,
        ClassificationElement,
        ElementKey,
        validate_classification,
    },
    error::{Error, Result},
    key::{Label, Uid},
    plugin::{ConfigOption, Configurable, ImplementationRecord, Options},
    text_util::{partition_string, resolve_dir},
};

pub const IMPLEMENTATION_NAME: &str = "FileClassificationElement";

/// Extension of stored classification files.
pub const FILE_EXTENSION: &str = "json";

/// Current version of the on-disk envelope.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    label: Label,
    confidence: f64,
}

/// On-disk format:
///
/// ```json
/// {"version": 1, "classification": [{"label": {"text": "cat"}, "confidence": 1.0}]}
/// ```
#[derive(Serialize, Deserialize)]
struct StoredClassification {
    version: u32,
    classification: Vec<StoredEntry>,
}

/// A classification element persisted as one file per key.
///
/// Files are named `<type-name>.<uuid>.classification.json`. With a positive
/// `subdir_split`, the uuid's string form (hyphens removed) is cut into that
/// many segments, each becoming one directory level below `save_dir`. This
/// only bounds directory fan-out; lookups behave the same either way.
///
/// Writes are not locked. Concurrent writers to the same key race and the
/// last one wins.
#[derive(Debug, Clone)]
pub struct FileClassificationElement {
    type_name: String,
    uuid: Uid,
    save_dir: PathBuf,
    subdir_split: Option<i64>,
    filepath: PathBuf,
}

impl FileClassificationElement {
    pub fn new(
        type_name: impl Into<String>,
        uuid: impl Into<Uid>,
        save_dir: &Path,
        subdir_split: Option<i64>,
    ) -> Result<Self> {
        let type_name = type_name.into();
        let uuid = uuid.into();
        let save_dir = resolve_dir(save_dir)?;
        check_component("type name", &type_name)?;
        check_component("uuid", &uuid.to_string())?;

        let mut dir = save_dir.clone();
        if let Some(split) = subdir_split.filter(|&n| n > 0) {
            let stripped = uuid.to_string().replace('-', "");
            let segments = usize::try_from(split)
                .ok()
                .and_then(|n| partition_string(&stripped, n))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "cannot split uuid `{uuid}` into {split} directories"
                    ))
                })?;
            for segment in &segments {
                check_component("uuid segment", segment)?;
            }
            dir.extend(segments);
        }

        let filepath = dir.join(format!(
            "{type_name}.{uuid}.classification.{FILE_EXTENSION}"
        ));

        Ok(Self {
            type_name,
            uuid,
            save_dir,
            subdir_split,
            filepath,
        })
    }

    /// Registry record for this implementation.
    pub fn record() -> ImplementationRecord<dyn ClassificationElement> {
        ImplementationRecord::<dyn ClassificationElement>::new(
            IMPLEMENTATION_NAME,
            Self::from_options,
        )
        .with_option(ConfigOption::required("save_dir"))
        .with_option(ConfigOption::optional("subdir_split", Value::Null))
    }

    fn from_options(
        options: &Options,
        key: &ElementKey,
    ) -> Result<Box<dyn ClassificationElement>> {
        let save_dir = options
            .get("save_dir")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Config("`save_dir` must be a string".to_string())
            })?;

        let subdir_split = match options.get("subdir_split") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                Error::Config("`subdir_split` must be an integer".to_string())
            })?),
        };

        Ok(Box::new(Self::new(
            key.type_name.clone(),
            key.uuid.clone(),
            Path::new(save_dir),
            subdir_split,
        )?))
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Full path of the file backing this element.
    pub fn filepath(&self) -> &Path {
        &self.filepath
    }
}

/// Reject names that would not stay a single entry below `save_dir`.
fn check_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        return Err(Error::Config(format!(
            "{kind} `{value}` cannot be used as a path component"
        )));
    }
    Ok(())
}

impl Configurable for FileClassificationElement {
    fn implementation_name(&self) -> &'static str {
        IMPLEMENTATION_NAME
    }

    fn get_config(&self) -> Options {
        let mut options = Options::new();
        options.insert(
            "save_dir".to_string(),
            self.save_dir.to_string_lossy().into(),
        );
        options.insert("subdir_split".to_string(), self.subdir_split.into());
        options
    }
}

impl ClassificationElement for FileClassificationElement {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn uuid(&self) -> &Uid {
        &self.uuid
    }

    fn has_classifications(&self) -> bool {
        self.filepath.is_file()
    }

    fn get_classification(&self) -> Result<Classification> {
        if !self.has_classifications() {
            return Err(Error::NoClassification {
                type_name: self.type_name.clone(),
                uuid: self.uuid.to_string(),
            });
        }

        let bytes = std::fs::read(&self.filepath)?;
        let stored: StoredClassification = serde_json::from_slice(&bytes)?;
        if stored.version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                path: self.filepath.clone(),
                version: stored.version,
            });
        }

        Ok(stored
            .classification
            .into_iter()
            .map(|e| (e.label, e.confidence))
            .collect())
    }

    fn set_classification(&self, m: Classification) -> Result<Classification> {
        let m = validate_classification(m)?;

        let stored = StoredClassification {
            version: FORMAT_VERSION,
            classification: m
                .iter()
                .map(|(label, &confidence)| StoredEntry {
                    label: label.clone(),
                    confidence,
                })
                .collect(),
        };

        if let Some(parent) = self.filepath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.filepath, serde_json::to_vec(&stored)?)?;

        tracing::debug!(
            type_name = %self.type_name,
            uuid = %self.uuid,
            path = %self.filepath.display(),
            labels = m.len(),
            "stored classification"
        );

        Ok(m)
    }
}

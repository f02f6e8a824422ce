//! reprkit - pluggable data and classification representations.
//!
//! Retrieval pipelines depend on two contracts defined here: [`DataSet`], a
//! keyed collection of [`DataElement`]s, and [`ClassificationElement`], a
//! stored label-to-confidence result. Concrete backends are discovered per
//! interface through a [`Catalog`], gated by a usability probe, and built
//! from JSON configuration objects by the [`factory`].
//!
//! # Quick start
//!
//! ```
//! use reprkit::{
//!     Catalog, ClassificationElement, ElementKey, classification_from,
//!     factory,
//! };
//! use serde_json::json;
//!
//! # let tmp = tempfile::tempdir().unwrap();
//! # let save_dir = tmp.path().to_str().unwrap();
//! let catalog = Catalog::<dyn ClassificationElement>::builtin();
//! let config = json!({
//!     "type": "FileClassificationElement",
//!     "FileClassificationElement": {"save_dir": save_dir, "subdir_split": 2},
//! });
//!
//! let key = ElementKey::new("svm", "ab-cd-ef");
//! let element = catalog.build(&config, &key).unwrap();
//! element
//!     .set_classification(classification_from([("cat", 0.8), ("dog", 0.2)]))
//!     .unwrap();
//!
//! // The exported configuration rebuilds an equivalent element.
//! let again = catalog.build(&factory::to_config(element.as_ref()), &key)
//!     .unwrap();
//! assert_eq!(
//!     again.get_classification().unwrap(),
//!     element.get_classification().unwrap()
//! );
//! ```

pub mod classification;
pub mod config_store;
pub mod data_set;
pub mod element;
pub mod error;
pub mod factory;
pub mod file_classification;
pub mod key;
pub mod memory_set;
pub mod plugin;
pub mod redb_set;
pub mod text_util;

pub use classification::{
    Classification,
    ClassificationElement,
    ElementKey,
    classification_from,
    validate_classification,
};
pub use config_store::ConfigStore;
pub use data_set::DataSet;
pub use element::{DataElement, MemoryElement};
pub use error::{DiscoveryError, Error, Result};
pub use file_classification::FileClassificationElement;
pub use key::{Key, Label, Uid};
pub use memory_set::MemoryDataSet;
pub use plugin::{
    Catalog,
    ConfigOption,
    Configurable,
    ImplementationRecord,
    Interface,
    Options,
    PluginSource,
    Registry,
};
pub use redb_set::RedbDataSet;

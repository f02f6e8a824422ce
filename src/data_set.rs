use std::{collections::HashSet, sync::Arc};

use crate::{
    element::DataElement,
    error::Result,
    key::Uid,
    memory_set::MemoryDataSet,
    plugin::{Configurable, Interface, PluginSource},
    redb_set::RedbDataSet,
};

/// A collection of data elements keyed by their identifiers.
pub trait DataSet: Configurable + Send + Sync {
    /// Number of elements in the set.
    fn count(&self) -> Result<usize>;

    fn uuids(&self) -> Result<HashSet<Uid>>;

    fn has_uuid(&self, uuid: &Uid) -> Result<bool>;

    /// Insert an element, replacing any element with the same identifier.
    fn add_data(&self, elem: Arc<dyn DataElement>) -> Result<()>;

    /// Insert several elements.
    fn add_data_many(&self, elems: &[Arc<dyn DataElement>]) -> Result<()> {
        for elem in elems {
            self.add_data(Arc::clone(elem))?;
        }
        Ok(())
    }

    /// Fetch an element, failing with `NotFound` if the identifier is absent.
    fn get_data(&self, uuid: &Uid) -> Result<Arc<dyn DataElement>>;
}

impl std::fmt::Debug for dyn DataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.implementation_name())
            .field("config", &self.get_config())
            .finish_non_exhaustive()
    }
}

impl Interface for dyn DataSet {
    type Args = ();

    const NAME: &'static str = "DataSet";

    fn builtin_sources() -> Vec<PluginSource<Self>> {
        vec![
            PluginSource::new("reprkit::memory_set")
                .with(MemoryDataSet::record()),
            PluginSource::new("reprkit::redb_set").with(RedbDataSet::record()),
        ]
    }
}

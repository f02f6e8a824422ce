//! Implementation discovery and usability gating.
//!
//! Each capability trait (`dyn DataSet`, `dyn ClassificationElement`)
//! implements [`Interface`]. Concrete implementations describe themselves
//! with an [`ImplementationRecord`], records are grouped into
//! [`PluginSource`]s, and [`discover`] folds the sources into a
//! [`Registry`] of usable implementations.
//!
//! A [`Catalog`] owns the sources and runs discovery lazily, at most once,
//! no matter how many threads ask for the registry at the same time.

use std::{collections::BTreeMap, sync::OnceLock};

use serde_json::Value;

use crate::error::{DiscoveryError, Result};

/// Option block of a configuration object: option name to value.
pub type Options = serde_json::Map<String, Value>;

/// Anything that can report the configuration needed to rebuild it.
pub trait Configurable {
    /// Name the implementation is registered under.
    fn implementation_name(&self) -> &'static str;

    /// Canonical option block for this instance.
    fn get_config(&self) -> Options;
}

/// A capability contract that implementations are discovered for.
///
/// Implemented on the trait object type itself, e.g. `dyn DataSet`.
pub trait Interface: Configurable + 'static {
    /// Per-instance construction arguments that are not configuration.
    type Args;

    const NAME: &'static str;

    /// Sources compiled into this crate.
    fn builtin_sources() -> Vec<PluginSource<Self>>;
}

/// Constructor signature shared by all implementations of an interface.
pub type Constructor<I> =
    fn(&Options, &<I as Interface>::Args) -> Result<Box<I>>;

/// A configuration option declared by an implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    pub name: &'static str,
    /// `None` marks the option as required.
    pub default: Option<Value>,
}

impl ConfigOption {
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub fn optional(name: &'static str, default: Value) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A candidate implementation of interface `I`.
pub struct ImplementationRecord<I: Interface + ?Sized> {
    name: &'static str,
    probe: fn() -> bool,
    options: Vec<ConfigOption>,
    construct: Constructor<I>,
}

impl<I: Interface + ?Sized> ImplementationRecord<I> {
    pub fn new(name: &'static str, construct: Constructor<I>) -> Self {
        Self {
            name,
            probe: always_usable,
            options: Vec::new(),
            construct,
        }
    }

    /// Set the usability probe. It must be cheap and free of side effects.
    pub fn with_probe(mut self, probe: fn() -> bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_option(mut self, option: ConfigOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    pub fn is_usable(&self) -> bool {
        (self.probe)()
    }

    pub(crate) fn construct(
        &self,
        options: &Options,
        args: &I::Args,
    ) -> Result<Box<I>> {
        (self.construct)(options, args)
    }
}

impl<I: Interface + ?Sized> Clone for ImplementationRecord<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            probe: self.probe,
            options: self.options.clone(),
            construct: self.construct,
        }
    }
}

impl<I: Interface + ?Sized> std::fmt::Debug for ImplementationRecord<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplementationRecord")
            .field("interface", &I::NAME)
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn always_usable() -> bool {
    true
}

/// A named group of implementation records.
///
/// When a source exports a single name, only that record is registered from
/// it; the others stay private to the source (helpers, test doubles).
pub struct PluginSource<I: Interface + ?Sized> {
    name: String,
    records: Vec<ImplementationRecord<I>>,
    exported: Option<&'static str>,
}

impl<I: Interface + ?Sized> PluginSource<I> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            exported: None,
        }
    }

    pub fn with(mut self, record: ImplementationRecord<I>) -> Self {
        self.records.push(record);
        self
    }

    /// Restrict registration from this source to the named record.
    pub fn export(mut self, name: &'static str) -> Self {
        self.exported = Some(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records this source contributes to the registry.
    fn candidates(
        &self,
    ) -> std::result::Result<Vec<&ImplementationRecord<I>>, DiscoveryError>
    {
        let Some(exported) = self.exported else {
            return Ok(self.records.iter().collect());
        };

        let record = self
            .records
            .iter()
            .find(|r| r.name == exported)
            .ok_or_else(|| DiscoveryError::MissingExport {
                source_name: self.name.clone(),
                name: exported.to_string(),
            })?;

        for skipped in self.records.iter().filter(|r| r.name != exported) {
            tracing::debug!(
                interface = I::NAME,
                source = %self.name,
                name = skipped.name,
                "skipping implementation not exported by its source"
            );
        }

        Ok(vec![record])
    }
}

impl<I: Interface + ?Sized> Clone for PluginSource<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            records: self.records.clone(),
            exported: self.exported,
        }
    }
}

struct Entry<I: Interface + ?Sized> {
    source: String,
    record: ImplementationRecord<I>,
}

/// Discovered implementations of interface `I`, split by usability.
pub struct Registry<I: Interface + ?Sized> {
    usable: BTreeMap<&'static str, Entry<I>>,
    unusable: BTreeMap<&'static str, Entry<I>>,
}

impl<I: Interface + ?Sized> Registry<I> {
    /// Look up a usable implementation.
    pub fn get(&self, name: &str) -> Option<&ImplementationRecord<I>> {
        self.usable.get(name).map(|e| &e.record)
    }

    /// Names of usable implementations, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.usable.keys().copied().collect()
    }

    /// Names of implementations whose probe failed, sorted.
    pub fn unusable_names(&self) -> Vec<&'static str> {
        self.unusable.keys().copied().collect()
    }

    /// True if the name was discovered at all, usable or not.
    pub fn is_known(&self, name: &str) -> bool {
        self.usable.contains_key(name) || self.unusable.contains_key(name)
    }

    pub fn is_usable(&self, name: &str) -> bool {
        self.usable.contains_key(name)
    }

    /// Source a discovered implementation came from.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.usable
            .get(name)
            .or_else(|| self.unusable.get(name))
            .map(|e| e.source.as_str())
    }

    pub(crate) fn records(
        &self,
    ) -> impl Iterator<Item = &ImplementationRecord<I>> {
        self.usable.values().map(|e| &e.record)
    }
}

impl<I: Interface + ?Sized> std::fmt::Debug for Registry<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("interface", &I::NAME)
            .field("usable", &self.names())
            .field("unusable", &self.unusable_names())
            .finish()
    }
}

/// Build a registry from the given sources.
///
/// Implementation names must be unique across sources, whether usable or
/// not; a collision is an error rather than a silent override.
pub fn discover<I: Interface + ?Sized>(
    sources: &[PluginSource<I>],
) -> std::result::Result<Registry<I>, DiscoveryError> {
    let mut usable = BTreeMap::new();
    let mut unusable = BTreeMap::new();
    let mut seen: BTreeMap<&'static str, &str> = BTreeMap::new();

    for source in sources {
        for record in source.candidates()? {
            if let Some(first) = seen.insert(record.name, &source.name) {
                return Err(DiscoveryError::DuplicateImplementation {
                    interface: I::NAME,
                    name: record.name.to_string(),
                    first: first.to_string(),
                    second: source.name.clone(),
                });
            }

            let entry = Entry {
                source: source.name.clone(),
                record: record.clone(),
            };

            if record.is_usable() {
                tracing::debug!(
                    interface = I::NAME,
                    source = %source.name,
                    name = record.name,
                    "registered implementation"
                );
                usable.insert(record.name, entry);
            } else {
                tracing::warn!(
                    interface = I::NAME,
                    source = %source.name,
                    name = record.name,
                    "implementation failed its usability probe"
                );
                unusable.insert(record.name, entry);
            }
        }
    }

    tracing::info!(
        interface = I::NAME,
        usable = usable.len(),
        unusable = unusable.len(),
        "plugin discovery finished"
    );

    Ok(Registry { usable, unusable })
}

/// Sources for one interface plus the lazily built registry.
///
/// Construct one per interface at startup and pass it to consumers.
pub struct Catalog<I: Interface + ?Sized> {
    sources: Vec<PluginSource<I>>,
    registry: OnceLock<std::result::Result<Registry<I>, DiscoveryError>>,
}

impl<I: Interface + ?Sized> Catalog<I> {
    pub fn new(sources: Vec<PluginSource<I>>) -> Self {
        Self {
            sources,
            registry: OnceLock::new(),
        }
    }

    /// A catalog over the sources compiled into this crate.
    pub fn builtin() -> Self {
        Self::new(I::builtin_sources())
    }

    /// Append an extra source. Has no effect once discovery has run.
    pub fn with_source(mut self, source: PluginSource<I>) -> Self {
        if self.registry.get().is_some() {
            tracing::warn!(
                interface = I::NAME,
                source = %source.name,
                "ignoring source added after discovery"
            );
            return self;
        }
        self.sources.push(source);
        self
    }

    /// The registry, running discovery on first call.
    ///
    /// Concurrent first callers block until the single discovery run
    /// completes, then all observe the same result.
    pub fn registry(&self) -> Result<&Registry<I>> {
        self.registry
            .get_or_init(|| discover(&self.sources))
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    pub fn is_discovered(&self) -> bool {
        self.registry.get().is_some()
    }
}

impl<I: Interface + ?Sized> std::fmt::Debug for Catalog<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("interface", &I::NAME)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("discovered", &self.is_discovered())
            .finish()
    }
}

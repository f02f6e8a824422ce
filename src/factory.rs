//! Build implementations from configuration objects.
//!
//! A configuration object names the implementation under `"type"` and keeps
//! its options in a block keyed by that same name:
//!
//! ```json
//! {
//!   "type": "FileClassificationElement",
//!   "FileClassificationElement": {"save_dir": "/data/cls", "subdir_split": 2}
//! }
//! ```
//!
//! Blocks for other implementations may sit alongside and are ignored, so a
//! single object can carry settings for every candidate.

use serde_json::Value;

use crate::{
    error::{Error, Result},
    plugin::{Catalog, ImplementationRecord, Interface, Options, Registry},
};

/// Key naming the chosen implementation.
pub const TYPE_KEY: &str = "type";

/// Construct the implementation a configuration object names.
///
/// Missing optional options take their declared defaults. Options the
/// implementation does not declare are passed through and ignored.
///
/// # Examples
///
/// ```
/// # let tmp = tempfile::tempdir().unwrap();
/// use reprkit::{Catalog, DataSet, factory};
/// use serde_json::json;
///
/// let cache = tmp.path().join("set.json");
/// let catalog = Catalog::<dyn DataSet>::builtin();
/// let config = json!({
///     "type": "MemoryDataSet",
///     "MemoryDataSet": {"cache_path": cache.to_str().unwrap()},
/// });
/// let set = factory::from_config(catalog.registry().unwrap(), &config, &())
///     .unwrap();
/// assert_eq!(set.count().unwrap(), 0);
/// ```
pub fn from_config<I: Interface + ?Sized>(
    registry: &Registry<I>,
    config: &Value,
    args: &I::Args,
) -> Result<Box<I>> {
    let config = config.as_object().ok_or_else(|| {
        Error::Config("configuration must be a JSON object".to_string())
    })?;

    let name = match config.get(TYPE_KEY) {
        Some(Value::String(name)) => name.as_str(),
        None | Some(Value::Null) => {
            return Err(Error::Config(format!(
                "configuration does not name a {} implementation",
                I::NAME
            )));
        }
        Some(other) => {
            return Err(Error::Config(format!(
                "`{TYPE_KEY}` must be a string, got {other}"
            )));
        }
    };

    let record =
        registry
            .get(name)
            .ok_or_else(|| Error::UnknownImplementation {
                interface: I::NAME,
                name: name.to_string(),
                reason: if registry.is_known(name) {
                    "not usable in this environment"
                } else {
                    "not registered"
                },
            })?;

    let supplied = match config.get(name) {
        None | Some(Value::Null) => Options::new(),
        Some(Value::Object(block)) => block.clone(),
        Some(_) => {
            return Err(Error::Config(format!(
                "options for `{name}` must be a JSON object"
            )));
        }
    };

    let options = resolve_options(record, supplied)?;

    tracing::debug!(
        interface = I::NAME,
        name = record.name(),
        "constructing implementation from configuration"
    );

    record.construct(&options, args)
}

/// Fill in defaults and check that every required option is set.
///
/// A required option explicitly set to `null` counts as missing.
fn resolve_options<I: Interface + ?Sized>(
    record: &ImplementationRecord<I>,
    mut options: Options,
) -> Result<Options> {
    let mut missing = Vec::new();

    for option in record.options() {
        match (options.get(option.name), &option.default) {
            (Some(Value::Null), None) | (None, None) => {
                missing.push(option.name.to_string());
            }
            (None, Some(default)) => {
                options.insert(option.name.to_string(), default.clone());
            }
            (Some(_), _) => {}
        }
    }

    if !missing.is_empty() {
        return Err(Error::MissingConfiguration {
            implementation: record.name().to_string(),
            missing,
        });
    }

    Ok(options)
}

/// The configuration object that rebuilds `instance` via [`from_config`].
pub fn to_config<I: Interface + ?Sized>(instance: &I) -> Value {
    let name = instance.implementation_name();
    let mut config = serde_json::Map::new();
    config.insert(TYPE_KEY.to_string(), Value::from(name));
    config.insert(name.to_string(), Value::Object(instance.get_config()));
    Value::Object(config)
}

/// A template listing every usable implementation with its defaults.
///
/// `"type"` is left `null` and required options are `null`, so the template
/// must be edited before it can be passed to [`from_config`].
pub fn default_config<I: Interface + ?Sized>(registry: &Registry<I>) -> Value {
    let mut config = serde_json::Map::new();
    config.insert(TYPE_KEY.to_string(), Value::Null);

    for record in registry.records() {
        let block: Options = record
            .options()
            .iter()
            .map(|o| {
                (o.name.to_string(), o.default.clone().unwrap_or(Value::Null))
            })
            .collect();
        config.insert(record.name().to_string(), Value::Object(block));
    }

    Value::Object(config)
}

impl<I: Interface + ?Sized> Catalog<I> {
    /// Construct an implementation from this catalog's registry.
    pub fn build(&self, config: &Value, args: &I::Args) -> Result<Box<I>> {
        from_config(self.registry()?, config, args)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        DataSet,
        memory_set::MemoryDataSet,
        plugin::{ConfigOption, PluginSource},
    };

    fn never() -> bool {
        false
    }

    fn build_memory(_: &Options, _: &()) -> Result<Box<dyn DataSet>> {
        Ok(Box::new(MemoryDataSet::new()))
    }

    fn strict_record() -> ImplementationRecord<dyn DataSet> {
        ImplementationRecord::<dyn DataSet>::new("Strict", build_memory)
            .with_option(ConfigOption::required("alpha"))
            .with_option(ConfigOption::required("beta"))
            .with_option(ConfigOption::optional("gamma", json!(3)))
    }

    fn catalog() -> Catalog<dyn DataSet> {
        Catalog::new(vec![
            PluginSource::new("test")
                .with(strict_record())
                .with(
                    ImplementationRecord::<dyn DataSet>::new(
                        "Broken",
                        build_memory,
                    )
                    .with_probe(never),
                ),
        ])
    }

    #[test]
    fn not_an_object_is_config_error() {
        let c = catalog();
        assert!(matches!(c.build(&json!([1, 2]), &()), Err(Error::Config(_))));
        assert!(matches!(c.build(&json!({"type": 5}), &()), Err(Error::Config(_))));
        assert!(matches!(c.build(&json!({}), &()), Err(Error::Config(_))));
    }

    #[test]
    fn unregistered_name() {
        let err = catalog()
            .build(&json!({"type": "Nope"}), &())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownImplementation { reason: "not registered", .. }
        ));
    }

    #[test]
    fn unusable_name() {
        let err = catalog()
            .build(&json!({"type": "Broken", "Broken": {}}), &())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownImplementation {
                reason: "not usable in this environment",
                ..
            }
        ));
    }

    #[test]
    fn missing_options_are_listed() {
        let err = catalog()
            .build(&json!({"type": "Strict", "Strict": {"beta": null}}), &())
            .unwrap_err();
        let Error::MissingConfiguration {
            implementation,
            missing,
        } = err
        else {
            panic!("expected MissingConfiguration, got {err:?}");
        };
        assert_eq!(implementation, "Strict");
        assert_eq!(missing, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn defaults_fill_and_extras_pass() {
        let record = strict_record();
        let supplied = json!({"alpha": 1, "beta": 2, "unknown": true});
        let Value::Object(supplied) = supplied else {
            unreachable!()
        };
        let options = resolve_options(&record, supplied).unwrap();
        assert_eq!(options["gamma"], json!(3));
        assert_eq!(options["unknown"], json!(true));
    }

    #[test]
    fn explicit_option_beats_default() {
        let record = strict_record();
        let Value::Object(supplied) = json!({"alpha": 1, "beta": 2, "gamma": 9})
        else {
            unreachable!()
        };
        let options = resolve_options(&record, supplied).unwrap();
        assert_eq!(options["gamma"], json!(9));
    }

    #[test]
    fn default_config_lists_usable_only() {
        let c = catalog();
        let config = default_config(c.registry().unwrap());
        assert_eq!(
            config,
            json!({
                "type": null,
                "Strict": {"alpha": null, "beta": null, "gamma": 3},
            })
        );
    }

    #[test]
    fn to_config_shape() {
        let set: Box<dyn DataSet> = Box::new(MemoryDataSet::new());
        assert_eq!(
            to_config(set.as_ref()),
            json!({"type": "MemoryDataSet", "MemoryDataSet": {"cache_path": null}})
        );
    }
}

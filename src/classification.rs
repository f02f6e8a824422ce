use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    file_classification::FileClassificationElement,
    key::{Label, Uid},
    plugin::{Configurable, Interface, PluginSource},
};

/// Label to confidence mapping.
pub type Classification = BTreeMap<Label, f64>;

/// Number of decimal digits the confidence sum is rounded to before being
/// compared against 1.0.
pub const CONFIDENCE_SUM_DIGITS: i32 = 9;

/// Construction arguments of a classification element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementKey {
    /// Usually the name of the classifier that produced the result.
    pub type_name: String,
    pub uuid: Uid,
}

impl ElementKey {
    pub fn new(type_name: impl Into<String>, uuid: impl Into<Uid>) -> Self {
        Self {
            type_name: type_name.into(),
            uuid: uuid.into(),
        }
    }
}

/// Result of classifying a single piece of content.
pub trait ClassificationElement: Configurable + Send + Sync {
    fn type_name(&self) -> &str;

    fn uuid(&self) -> &Uid;

    /// Whether a result has been stored. Does not read the result.
    fn has_classifications(&self) -> bool;

    /// The stored mapping, exactly as written.
    fn get_classification(&self) -> Result<Classification>;

    /// Validate and store `m`, replacing any previous result entirely.
    ///
    /// Returns the mapping that was stored.
    fn set_classification(&self, m: Classification) -> Result<Classification>;

    /// Label with the highest confidence. Ties resolve to the smallest label.
    fn max_label(&self) -> Result<Label> {
        let m = self.get_classification()?;
        let mut best: Option<(&Label, f64)> = None;
        for (label, &conf) in &m {
            if best.is_none_or(|(_, c)| conf > c) {
                best = Some((label, conf));
            }
        }
        best.map(|(label, _)| label.clone()).ok_or_else(|| {
            Error::NoClassification {
                type_name: self.type_name().to_string(),
                uuid: self.uuid().to_string(),
            }
        })
    }
}

impl std::fmt::Debug for dyn ClassificationElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.implementation_name())
            .field("type_name", &self.type_name())
            .field("uuid", self.uuid())
            .finish_non_exhaustive()
    }
}

impl Interface for dyn ClassificationElement {
    type Args = ElementKey;

    const NAME: &'static str = "ClassificationElement";

    fn builtin_sources() -> Vec<PluginSource<Self>> {
        vec![
            PluginSource::new("reprkit::file_classification")
                .with(FileClassificationElement::record()),
        ]
    }
}

/// Check that `m` is a complete probability distribution.
///
/// The mapping must be non-empty and its confidences must sum to exactly 1.0
/// after rounding to [`CONFIDENCE_SUM_DIGITS`] decimal digits.
pub fn validate_classification(m: Classification) -> Result<Classification> {
    if m.is_empty() {
        return Err(Error::InvalidClassification(
            "no labels were provided".to_string(),
        ));
    }

    let total: f64 = m.values().sum();
    let rounded = round_to_digits(total, CONFIDENCE_SUM_DIGITS);
    if rounded != 1.0 {
        return Err(Error::InvalidClassification(format!(
            "confidences sum to {rounded}, expected 1.0"
        )));
    }

    Ok(m)
}

fn round_to_digits(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Build a mapping from `(label, confidence)` pairs.
///
/// # Examples
///
/// ```
/// use reprkit::{Label, classification_from};
///
/// let m = classification_from([("cat", 0.75), ("dog", 0.25)]);
/// assert_eq!(m[&Label::from("cat")], 0.75);
/// ```
pub fn classification_from<L, I>(pairs: I) -> Classification
where
    L: Into<Label>,
    I: IntoIterator<Item = (L, f64)>,
{
    pairs.into_iter().map(|(l, c)| (l.into(), c)).collect()
}

use proptest::prelude::*;
use reprkit::{
    ClassificationElement,
    Error,
    FileClassificationElement,
    Label,
    classification_from,
    text_util::partition_string,
};

/// Non-empty mappings whose confidences sum to 1.0.
fn distribution() -> impl Strategy<Value = Vec<(Label, f64)>> {
    prop::collection::btree_map(
        prop_oneof![
            any::<i64>().prop_map(Label::Int),
            "[a-z]{1,8}".prop_map(Label::Text),
        ],
        1u32..1000,
        1..12,
    )
    .prop_map(|weights| {
        let total: u32 = weights.values().sum();
        weights
            .into_iter()
            .map(|(label, w)| (label, f64::from(w) / f64::from(total)))
            .collect()
    })
}

proptest! {
    #[test]
    fn valid_mapping_is_returned_unchanged(pairs in distribution()) {
        let tmp = tempfile::tempdir().unwrap();
        let e = FileClassificationElement::new("p", "ab-cd-ef-1234", tmp.path(), Some(3))
            .unwrap();
        let m = classification_from(pairs);

        prop_assert_eq!(e.set_classification(m.clone()).unwrap(), m.clone());
        prop_assert_eq!(e.get_classification().unwrap(), m);
    }

    #[test]
    fn complementary_pair_survives_storage(v in 0.0f64..1.0) {
        let tmp = tempfile::tempdir().unwrap();
        let e = FileClassificationElement::new("p", "pair", tmp.path(), None).unwrap();
        let m = classification_from([("a", v), ("b", 1.0 - v)]);

        e.set_classification(m.clone()).unwrap();
        let got = e.get_classification().unwrap();
        for (label, conf) in &m {
            prop_assert_eq!(got[label].to_bits(), conf.to_bits());
        }
    }

    #[test]
    fn scaled_mapping_is_rejected(pairs in distribution(), scale in 1.01f64..4.0) {
        let tmp = tempfile::tempdir().unwrap();
        let e = FileClassificationElement::new("p", 7, tmp.path(), None).unwrap();
        let m = classification_from(pairs.into_iter().map(|(l, c)| (l, c * scale)));

        prop_assert!(matches!(
            e.set_classification(m),
            Err(Error::InvalidClassification(_))
        ));
        prop_assert!(!e.has_classifications());
    }

    #[test]
    fn partition_is_contiguous(s in "[a-f0-9]{1,40}", n in 1usize..40) {
        match partition_string(&s, n) {
            Some(parts) => {
                prop_assert_eq!(parts.len(), n);
                prop_assert_eq!(parts.concat(), s.clone());
                let max = parts.iter().map(|p| p.len()).max().unwrap();
                let min = parts.iter().map(|p| p.len()).min().unwrap();
                prop_assert!(min >= 1 && max - min <= 1);
            }
            None => prop_assert!(n > s.len()),
        }
    }
}

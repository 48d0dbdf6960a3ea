//! Property-based tests for the tuple grammar.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{ObjectRef, Tuple};

    /// Strategy for a component free of the grammar's separators.
    fn component_strategy() -> impl Strategy<Value = String> {
        "[a-z0-9_]{1,16}"
    }

    fn tuple_strategy() -> impl Strategy<Value = Tuple> {
        (
            component_strategy(),
            component_strategy(),
            component_strategy(),
            component_strategy(),
            prop_oneof![component_strategy(), Just("*".to_string())],
        )
            .prop_map(|(rt, rid, rel, st, sid)| Tuple::new(rt, rid, rel, st, sid))
    }

    proptest! {
        #[test]
        fn test_tuple_roundtrip(tuple in tuple_strategy()) {
            let text = tuple.to_string();
            let parsed: Tuple = text.parse().unwrap();
            prop_assert_eq!(parsed, tuple);
        }

        #[test]
        fn test_object_ref_roundtrip(t in component_strategy(), id in component_strategy()) {
            let input = format!("{t}:{id}");
            let obj = ObjectRef::parse(&input).unwrap();
            prop_assert_eq!(obj.to_string(), input);
        }

        #[test]
        fn test_string_without_hash_is_rejected(s in "[a-z:@]{0,30}") {
            prop_assert!(s.parse::<Tuple>().is_err());
        }

        #[test]
        fn test_extra_separator_in_subject_is_rejected(
            tuple in tuple_strategy(),
            extra in component_strategy(),
        ) {
            let text = format!("{tuple}:{extra}");
            prop_assert!(text.parse::<Tuple>().is_err());
        }
    }
}

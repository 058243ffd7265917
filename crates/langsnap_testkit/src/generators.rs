//! Property-based test generators using proptest.

use langsnap_codec::Value;
use proptest::prelude::*;

/// Strategy for free text that leans on bulk-load control characters.
pub fn free_text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            3 => prop::char::range('a', 'z'),
            1 => Just('\t'),
            1 => Just('\n'),
            1 => Just('\r'),
            1 => Just('\\'),
            1 => Just('.'),
            1 => Just('N'),
            1 => prop::char::range('\u{00e0}', '\u{00ff}'),
        ],
        0..40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for nullable free-text values.
pub fn text_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        5 => free_text_strategy().prop_map(Value::Text),
    ]
}

/// Strategy for source-environment identifiers, integer or text, with
/// repeats.
pub fn source_ids_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            (1i64..50).prop_map(Value::Integer),
            "[a-f0-9]{1,4}".prop_map(Value::Text),
        ],
        1..40,
    )
}

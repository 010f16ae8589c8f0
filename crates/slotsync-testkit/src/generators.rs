//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};

/// A UI theme, stored as a lowercase tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// A representative structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub age: u8,
    pub tags: Vec<String>,
    pub theme: Option<Theme>,
    pub visits: i64,
}

/// Generate a theme.
pub fn theme() -> impl Strategy<Value = Theme> {
    prop_oneof![Just(Theme::Light), Just(Theme::Dark), Just(Theme::System)]
}

/// Generate a storage key.
pub fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9:_-]{0,23}".prop_map(String::from)
}

impl Arbitrary for Profile {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            ".{0,32}",
            any::<u8>(),
            prop::collection::vec("[a-z]{1,8}", 0..4),
            proptest::option::of(theme()),
            any::<i64>(),
        )
            .prop_map(|(name, age, tags, theme, visits)| Profile {
                name,
                age,
                tags,
                theme,
                visits,
            })
            .boxed()
    }
}

/// Generate a JSON document a pre-envelope writer could have stored.
///
/// Floats are left out so documents compare exactly after a round trip.
pub fn legacy_document() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        ".{0,16}".prop_map(serde_json::Value::from),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| serde_json::Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generate arbitrary legacy slot text, decodable or not.
pub fn legacy_text() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{1,32}",
        legacy_document().prop_map(|doc| doc.to_string()),
    ]
}

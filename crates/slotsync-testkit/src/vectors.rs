//! Wire vectors for the envelope format and legacy migration.
//!
//! Other implementations sharing a medium must agree on these bytes, or
//! each side would treat the other's slots as corrupt.

use slotsync::{migrate, Context, JsonCodec, MemoryStorage, MigrationOutcome, Storage};

/// A legacy slot and what migration must leave behind.
#[derive(Debug, Clone)]
pub struct WireVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Raw slot content before migration.
    pub legacy: &'static str,
    /// Raw slot content after migration under [`JsonCodec`].
    pub migrated: &'static str,
}

/// Get all wire vectors.
pub fn all_vectors() -> Vec<WireVector> {
    vec![
        WireVector {
            name: "plain text",
            legacy: "hello world",
            migrated: r#"{"type":"value","value":"hello world"}"#,
        },
        WireVector {
            name: "json string",
            legacy: r#""quoted""#,
            migrated: r#"{"type":"value","value":"quoted"}"#,
        },
        WireVector {
            name: "integer",
            legacy: "42",
            migrated: r#"{"type":"value","value":42}"#,
        },
        WireVector {
            name: "float",
            legacy: "1.5",
            migrated: r#"{"type":"value","value":1.5}"#,
        },
        WireVector {
            name: "boolean",
            legacy: "true",
            migrated: r#"{"type":"value","value":true}"#,
        },
        WireVector {
            name: "null",
            legacy: "null",
            migrated: r#"{"type":"value","value":null}"#,
        },
        WireVector {
            name: "array",
            legacy: "[1,2,3]",
            migrated: r#"{"type":"value","value":[1,2,3]}"#,
        },
        WireVector {
            name: "object with unknown tag",
            legacy: r#"{"type":"admin"}"#,
            migrated: r#"{"type":"value","value":{"type":"admin"}}"#,
        },
        WireVector {
            name: "already a value envelope",
            legacy: r#"{"type":"value","value":5}"#,
            migrated: r#"{"type":"value","value":5}"#,
        },
        WireVector {
            name: "already cleared",
            legacy: r#"{"type":"cleared"}"#,
            migrated: r#"{"type":"cleared"}"#,
        },
        WireVector {
            name: "truncated json",
            legacy: r#"{"a":"#,
            migrated: r#"{"type":"value","value":"{\"a\":"}"#,
        },
    ]
}

/// Migrate one vector in a fresh medium and return the resulting slot.
pub fn migrate_vector(vector: &WireVector) -> (MigrationOutcome, Option<String>) {
    let storage = MemoryStorage::new();
    storage
        .set_item("vector", vector.legacy)
        .expect("memory storage never fails");
    let outcome = migrate(&storage, &JsonCodec, "vector");
    let raw = storage.get_item("vector").expect("memory storage never fails");
    (outcome, raw)
}

/// Check every vector. Returns `(name, passed, actual)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|vector| {
            let (_, raw) = migrate_vector(vector);
            let actual = raw.unwrap_or_default();
            (vector.name.to_string(), actual == vector.migrated, actual)
        })
        .collect()
}

/// The JSON envelope a fresh binding writes for `value`.
pub fn written_envelope<T>(value: &T) -> Option<String>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let context = Context::in_memory();
    let binding = context.bind::<T>("vector", None);
    binding.write(value).ok()?;
    binding.get_snapshot()
}

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a member that may legitimately be `null`.
///
/// Used with `#[serde(default)]`: an absent member stays `None`, while an
/// explicit `null` becomes `Some(Value::Null)` so it survives re-serialization.
pub fn present<'de, D>(d: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(d).map(Some)
}

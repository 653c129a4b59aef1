//! Typed configuration from string dictionaries
//!
//! Callers pass per-run overrides as a `Dictionary` of strings. Each value
//! is read as JSON when it parses (so `"0.08"` becomes a number and
//! `"true"` a boolean) and as a plain string otherwise, then deserialized
//! into the target struct. Absent keys keep their defaults and unknown keys
//! are ignored. JSON has no literal for NaN or infinity, so float fields
//! that may hold one use [`lenient_f64`].

use bandwise_core::{Dictionary, Error, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Deserialize `dict` into `T`, starting from `T`'s serde defaults
pub fn from_dictionary<T: DeserializeOwned>(dict: &Dictionary) -> Result<T> {
    let mut map = Map::with_capacity(dict.len());
    for (key, raw) in dict {
        let value = serde_json::from_str::<Value>(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.clone()));
        map.insert(key.trim().to_ascii_lowercase(), value);
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| Error::InvalidParameter {
        name: "config".to_string(),
        value: format!("{:?}", dict),
        reason: e.to_string(),
    })
}

/// Float field that also accepts `nan`, `inf` and `-inf` in any case
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Float {
        Number(f64),
        Text(String),
    }

    match Float::deserialize(deserializer)? {
        Float::Number(v) => Ok(v),
        Float::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("expected a number, got {:?}", s))),
    }
}

/// Fail with `InvalidParameter` unless `value` lies in `[lo, hi]`
pub(crate) fn check_range(name: &str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if value.is_finite() && value >= lo && value <= hi {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: format!("must be within [{}, {}]", lo, hi),
        })
    }
}

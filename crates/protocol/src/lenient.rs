//! Field readers that tolerate sloppy detector output. A value of the wrong
//! shape becomes `None`, so the context defaults apply instead of the whole
//! record being rejected.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Non-negative whole numbers, including floats such as `30.0`.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(whole_count(&value))
}

pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = value.as_f64().filter(|n| n.is_finite());
    if number.is_none() && !value.is_null() {
        log::debug!("Ignoring evidence value {value}: expected a number");
    }
    Ok(number)
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let flag = value.as_bool();
    if flag.is_none() && !value.is_null() {
        log::debug!("Ignoring evidence value {value}: expected a boolean");
    }
    Ok(flag)
}

/// String arrays; non-string elements are dropped.
pub(crate) fn strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    other => {
                        log::debug!("Ignoring symbol type {other}: expected a string");
                        None
                    }
                })
                .collect(),
        )),
        Value::Null => Ok(None),
        other => {
            log::debug!("Ignoring evidence value {other}: expected a list of strings");
            Ok(None)
        }
    }
}

fn whole_count(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u64)
        }),
        _ => None,
    };
    let count = parsed.and_then(|n| u32::try_from(n).ok());
    if count.is_none() {
        log::debug!("Ignoring evidence value {value}: expected a non-negative whole number");
    }
    count
}

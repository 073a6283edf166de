//! Session rows as stored in the remote table.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Column names in the session table.
pub(crate) const SID: &str = "sid";
pub(crate) const SESS: &str = "sess";
pub(crate) const EXPIRE: &str = "expire";

/// Session payload: an opaque JSON object owned by the caller.
pub type SessionPayload = Map<String, Value>;

/// A full session row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier (unique).
    pub sid: String,

    /// Session payload.
    pub sess: SessionPayload,

    /// Absolute expiry, Unix seconds.
    pub expire: i64,
}

impl SessionRecord {
    pub fn new(sid: impl Into<String>, sess: SessionPayload, expire: i64) -> Self {
        Self {
            sid: sid.into(),
            sess,
            expire,
        }
    }
}

/// Interpret the `sess` column of a fetched row.
///
/// Text columns hand the payload back as a JSON string, so a string holding
/// a JSON object is accepted too.
pub(crate) fn payload_from_row(sid: &str, row: &Value) -> Result<SessionPayload> {
    let malformed = |reason: String| Error::MalformedRecord {
        sid: sid.to_string(),
        reason,
    };

    match row.get(SESS) {
        Some(Value::Object(sess)) => Ok(sess.clone()),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(sess)) => Ok(sess),
            Ok(other) => Err(malformed(format!("payload is {}, not an object", kind(&other)))),
            Err(e) => Err(malformed(format!("payload is not valid JSON: {}", e))),
        },
        Some(other) => Err(malformed(format!("payload is {}, not an object", kind(other)))),
        None => Err(malformed("row has no sess column".to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The cookie lifetime stored by session middleware under `cookie.maxAge`
/// (milliseconds). Negative values clamp to zero, values too large for a
/// [`Duration`] saturate.
pub fn cookie_max_age(sess: &SessionPayload) -> Option<Duration> {
    let millis = sess.get("cookie")?.get("maxAge")?.as_f64()?;
    Some(Duration::try_from_secs_f64(millis.max(0.0) / 1000.0).unwrap_or(Duration::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_payload() {
        let row = json!({"sid": "a", "sess": {"user": 7}, "expire": 1});
        let sess = payload_from_row("a", &row).unwrap();
        assert_eq!(sess["user"], 7);
    }

    #[test]
    fn test_string_payload_holding_object() {
        let row = json!({"sid": "a", "sess": "{\"user\":7}", "expire": 1});
        let sess = payload_from_row("a", &row).unwrap();
        assert_eq!(sess["user"], 7);
    }

    #[test]
    fn test_malformed_payloads() {
        for sess in [json!("not json"), json!("[1,2]"), json!(42), json!(null), json!([1])] {
            let row = json!({"sid": "a", "sess": sess, "expire": 1});
            let err = payload_from_row("a", &row).unwrap_err();
            assert!(matches!(err, Error::MalformedRecord { ref sid, .. } if sid == "a"));
        }

        let err = payload_from_row("a", &json!({"sid": "a"})).unwrap_err();
        assert!(err.to_string().contains("no sess column"));
    }

    #[test]
    fn test_cookie_max_age() {
        let sess = json!({"cookie": {"maxAge": 30000}});
        assert_eq!(
            cookie_max_age(sess.as_object().unwrap()),
            Some(Duration::from_secs(30))
        );

        let sess = json!({"cookie": {"maxAge": null}});
        assert_eq!(cookie_max_age(sess.as_object().unwrap()), None);

        let sess = json!({"cookie": {"maxAge": -5}});
        assert_eq!(cookie_max_age(sess.as_object().unwrap()), Some(Duration::ZERO));

        assert_eq!(cookie_max_age(&SessionPayload::new()), None);
    }

    #[test]
    fn test_cookie_max_age_saturates() {
        let sess = json!({"cookie": {"maxAge": 1e300}});
        assert_eq!(cookie_max_age(sess.as_object().unwrap()), Some(Duration::MAX));
    }

    #[test]
    fn test_record_serializes_all_columns() {
        let record = SessionRecord::new("a", SessionPayload::new(), 99);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"sid": "a", "sess": {}, "expire": 99})
        );
    }
}

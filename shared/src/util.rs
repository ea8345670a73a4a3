use serde::de::DeserializeOwned;
use serde_json::Value;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Flatten a joined relation that may come back as an object, an array or null.
///
/// Arrays yield their first element. Anything that fails to decode yields `None`.
pub fn pick_one<T: DeserializeOwned>(value: Value) -> Option<T> {
    let one = match value {
        Value::Null => return None,
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    serde_json::from_value(one).ok()
}

/// Cap a string at `max` characters (not bytes)
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Coach {
        id: String,
    }

    #[test]
    fn test_pick_one_shapes() {
        let obj = serde_json::json!({"id": "c1"});
        let arr = serde_json::json!([{"id": "c2"}, {"id": "c3"}]);
        assert_eq!(pick_one::<Coach>(obj), Some(Coach { id: "c1".into() }));
        assert_eq!(pick_one::<Coach>(arr), Some(Coach { id: "c2".into() }));
        assert_eq!(pick_one::<Coach>(serde_json::json!([])), None);
        assert_eq!(pick_one::<Coach>(Value::Null), None);
    }

    #[test]
    fn test_truncate_chars_counts_chars() {
        assert_eq!(truncate_chars("결제취소", 2), "결제");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_snowflake_is_positive() {
        assert!(snowflake_id() > 0);
    }
}

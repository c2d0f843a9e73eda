//! Message codec
//!
//! Records travel through the queue as JSON objects whose values are all
//! strings. The queue carries text bodies, so payloads are `String`s.

use crate::error::{IngestError, Result};
use crate::record::Record;

/// Serialize a record into a message body
pub fn encode(record: &Record) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|e| IngestError::malformed(format!("record did not serialize: {}", e)))
}

/// Rebuild a record from a message body.
///
/// Anything other than a flat JSON object of string values with distinct
/// field names is rejected.
pub fn decode(body: &str) -> Result<Record> {
    serde_json::from_str(body).map_err(|e| IngestError::malformed(format!("undecodable body: {}", e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Record {
        [
            ("country", "Côte d'Ivoire"),
            ("quote", "he said \"hi\""),
            ("empty", ""),
            ("multi", "line\nbreak"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_round_trip() {
        let record = sample();
        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(
            decoded.fields().collect::<Vec<_>>(),
            record.fields().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_record_round_trip() {
        let record = Record::new();
        assert_eq!(encode(&record).unwrap(), "{}");
        assert_eq!(decode("{}").unwrap(), record);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for body in [
            "",
            "not json",
            "[1,2]",
            "{\"country\": 5}",
            "{\"a\": {\"b\": \"c\"}}",
            "{\"country\":\"A\",\"country\":\"B\"}",
        ] {
            assert!(
                matches!(decode(body), Err(IngestError::MalformedPayload(_))),
                "accepted {body:?}"
            );
        }
    }

    fn text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            any::<String>(),
            r#"[a-zA-Z "'\\\t\n\r\x00\x1féü中€]{0,12}"#,
        ]
    }

    proptest! {
        #[test]
        fn test_round_trip_any_record(pairs in prop::collection::vec((text(), text()), 0..10)) {
            let record: Record = pairs.into_iter().collect();
            let decoded = decode(&encode(&record).unwrap()).unwrap();

            prop_assert_eq!(&decoded, &record);
            prop_assert_eq!(
                decoded.iter().collect::<Vec<_>>(),
                record.iter().collect::<Vec<_>>()
            );
        }
    }
}

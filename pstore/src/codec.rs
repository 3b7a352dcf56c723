//! Column encodings shared by the SQL stores.

use chrono::{DateTime, Utc};
use pchat::{ChatError, MessageRole, Visibility};

use crate::StoreError;

pub(crate) fn encode_time(value: DateTime<Utc>) -> i64 {
    value.timestamp_micros()
}

pub(crate) fn decode_time(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::storage(format!("timestamp out of range: {micros}")))
}

pub(crate) fn decode_role(value: &str) -> Result<MessageRole, StoreError> {
    MessageRole::parse(value).map_err(|error| StoreError::storage(error.message))
}

pub(crate) fn decode_visibility(value: &str) -> Result<Visibility, StoreError> {
    Visibility::parse(value).map_err(|error| StoreError::storage(error.message))
}

pub(crate) fn ownership_conflict() -> ChatError {
    ChatError::authorization("conversation belongs to another user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_keep_microsecond_precision() {
        let now = Utc::now();
        let decoded = decode_time(encode_time(now)).expect("decode");
        assert_eq!(decoded.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn unknown_columns_are_storage_errors() {
        assert!(decode_role("narrator").is_err());
        assert_eq!(
            decode_visibility("public").expect("visibility"),
            Visibility::Public
        );
    }
}

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::error::ServiceError;

pub mod auth;
pub mod catalog;
pub mod health;
pub mod search;
pub mod session;
pub mod sse;
pub mod user;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Parse an RFC 3339 timestamp supplied by a client.
pub fn parse_timestamp(field: &str, value: &str) -> Result<SystemTime, ServiceError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map(SystemTime::from)
        .map_err(|err| ServiceError::InvalidInput(format!("`{field}` is not RFC 3339: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn timestamps_use_rfc3339() {
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let formatted = format_system_time(time);
        assert_eq!(formatted, "2023-11-14T22:13:20Z");
        assert_eq!(parse_timestamp("scheduled_time", &formatted).unwrap(), time);
    }

    #[test]
    fn offsets_are_honoured() {
        let parsed = parse_timestamp("scheduled_time", "2023-11-14T23:13:20+01:00").unwrap();
        assert_eq!(parsed, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_timestamp("scheduled_time", "next tuesday"),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}

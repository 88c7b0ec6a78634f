//! Adapters between std time types and their well-known wire forms.

use std::time::{Duration, SystemTime};

use crate::error::ValidationError;

/// `SystemTime` to wire timestamp. Total; pre-epoch instants are valid.
pub fn timestamp_to_wire(time: SystemTime) -> prost_types::Timestamp {
    prost_types::Timestamp::from(time)
}

/// Wire timestamp to `SystemTime`. Out-of-range values are per-call
/// validation failures, not panics.
pub fn timestamp_from_wire(
    field: &str,
    wire: &prost_types::Timestamp,
) -> Result<SystemTime, ValidationError> {
    SystemTime::try_from(*wire).map_err(|e| ValidationError::InvalidValue {
        field: field.to_owned(),
        reason: format!("timestamp out of range: {e}"),
    })
}

/// `std::time::Duration` to wire duration. Std durations are non-negative
/// and within wire range, so this is total.
pub fn duration_to_wire(
    field: &str,
    duration: Duration,
) -> Result<prost_types::Duration, ValidationError> {
    prost_types::Duration::try_from(duration).map_err(|e| ValidationError::InvalidValue {
        field: field.to_owned(),
        reason: format!("duration out of range: {e}"),
    })
}

/// Wire duration to `std::time::Duration`. Negative wire durations have no
/// std representation and are rejected.
pub fn duration_from_wire(
    field: &str,
    wire: &prost_types::Duration,
) -> Result<Duration, ValidationError> {
    Duration::try_from(*wire).map_err(|_| ValidationError::InvalidValue {
        field: field.to_owned(),
        reason: format!(
            "negative duration ({}s {}ns) cannot be represented",
            wire.seconds, wire.nanos
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn timestamp_round_trip() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_000_000);
        let wire = timestamp_to_wire(time);
        assert_eq!(wire.seconds, 1_700_000_000);
        assert_eq!(wire.nanos, 123_000_000);
        assert_eq!(timestamp_from_wire("t", &wire).unwrap(), time);
    }

    #[test]
    fn duration_round_trip() {
        let duration = Duration::new(90, 500_000_000);
        let wire = duration_to_wire("d", duration).unwrap();
        assert_eq!(wire.seconds, 90);
        assert_eq!(wire.nanos, 500_000_000);
        assert_eq!(duration_from_wire("d", &wire).unwrap(), duration);
    }

    #[test]
    fn negative_wire_duration_is_rejected() {
        let wire = prost_types::Duration {
            seconds: -5,
            nanos: 0,
        };
        let err = duration_from_wire("d", &wire).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }
}

//! ---
//! pms_section: "01-core-functionality"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Shared primitives and utilities for the core runtime."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use chrono::{DateTime, Duration, Utc};

/// Produce a wall-clock stamp strictly greater than `previous`.
///
/// Variable records require strictly increasing `last_update` stamps; when
/// writes land within clock resolution the stamp is nudged past the previous
/// one by a microsecond.
pub fn monotonic_stamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_strictly_increase_under_rapid_calls() {
        let mut prev = None;
        for _ in 0..1000 {
            let stamp = monotonic_stamp(prev);
            if let Some(p) = prev {
                assert!(stamp > p);
            }
            prev = Some(stamp);
        }
    }

    #[test]
    fn first_stamp_is_current_time() {
        let before = Utc::now();
        let stamp = monotonic_stamp(None);
        assert!(stamp >= before);
    }
}

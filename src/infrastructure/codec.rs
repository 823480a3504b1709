// Wire codec for the command, history and live characteristics
use crate::domain::activity::{classify, ActivityState};
use crate::domain::sample::Sample;
use bytes::Bytes;
use std::num::NonZeroU32;

pub const COMMAND_PREFIX: &str = "SYNC:";

/// In-band end-of-transfer marker on the history channel.
///
/// Matched as a substring, so a record that happens to contain it also ends
/// the transfer. The device never emits it inside a CSV line today.
pub const COMPLETION_SENTINEL: &str = "END";

/// Why a notification was dropped instead of producing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Wrong number of comma-separated fields
    Malformed { fields: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    Record(Sample),
    Completion,
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Record { svm: f64, activity: ActivityState },
    Skip(SkipReason),
}

/// Build the `SYNC:<minutes>` command payload
pub fn encode_command(minutes: NonZeroU32) -> Bytes {
    Bytes::from(format!("{}{}", COMMAND_PREFIX, minutes))
}

/// Parse a command payload the way the device firmware does.
///
/// Leading digits after the prefix are taken; anything that does not yield a
/// positive number of minutes is ignored.
pub fn decode_command(payload: &[u8]) -> Option<NonZeroU32> {
    let text = String::from_utf8_lossy(payload);
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().ok().and_then(NonZeroU32::new)
}

pub fn decode_history_notification(payload: &[u8]) -> HistoryEvent {
    let text = String::from_utf8_lossy(payload);

    if text.contains(COMPLETION_SENTINEL) {
        return HistoryEvent::Completion;
    }

    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() < 3 {
        return HistoryEvent::Skip(SkipReason::Malformed {
            fields: fields.len(),
        });
    }

    HistoryEvent::Record(Sample::new(
        clock_time(fields[0]).to_string(),
        parse_svm(fields[1]),
        classify(fields[2].trim()),
    ))
}

pub fn decode_live_notification(payload: &[u8]) -> LiveEvent {
    let text = String::from_utf8_lossy(payload);
    let fields: Vec<&str> = text.split(',').collect();

    match fields.as_slice() {
        [svm, activity] => LiveEvent::Record {
            svm: parse_svm(svm),
            activity: classify(activity),
        },
        _ => LiveEvent::Skip(SkipReason::Malformed {
            fields: fields.len(),
        }),
    }
}

/// Time-of-day part of a `YYYY-MM-DD HH:MM:SS` stamp.
///
/// Takes the token after the first space; without one (or with nothing after
/// it) the field is used as is.
fn clock_time(field: &str) -> &str {
    match field.split(' ').nth(1) {
        Some(time) if !time.is_empty() => time,
        _ => field,
    }
}

/// Leading decimal number of the field; trailing text such as a unit is ignored.
///
/// A field with no numeric prefix becomes NaN rather than dropping the record.
fn parse_svm(field: &str) -> f64 {
    let text = field.trim_start();
    text[..numeric_prefix_len(text)]
        .parse::<f64>()
        .unwrap_or(f64::NAN)
}

/// Length of the longest `[+-]digits[.digits][e[+-]digits]` prefix
fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let whole = digits_from(end);
    end += whole;
    let mut mantissa = whole;
    if bytes.get(end) == Some(&b'.') {
        let fraction = digits_from(end + 1);
        if whole > 0 || fraction > 0 {
            end += 1 + fraction;
            mantissa += fraction;
        }
    }
    if mantissa == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command(minutes(10)), Bytes::from_static(b"SYNC:10"));
        assert_eq!(encode_command(minutes(1440)), Bytes::from_static(b"SYNC:1440"));
    }

    #[test]
    fn test_decode_command() {
        assert_eq!(decode_command(b"SYNC:60"), Some(minutes(60)));
        assert_eq!(decode_command(b"SYNC:15abc"), Some(minutes(15)));
        assert_eq!(decode_command(b"SYNC:0"), None);
        assert_eq!(decode_command(b"SYNC:"), None);
        assert_eq!(decode_command(b"PING"), None);
    }

    #[test]
    fn test_history_record_from_device_line() {
        let event = decode_history_notification(b"2024-05-01 12:30:05,0.87,CHOD");
        assert_eq!(
            event,
            HistoryEvent::Record(Sample::new(
                "12:30:05".to_string(),
                0.87,
                ActivityState::Walking
            ))
        );
    }

    #[test]
    fn test_history_time_is_token_after_first_space() {
        match decode_history_notification(b"12:30:05 14,0.87,CHOD") {
            HistoryEvent::Record(sample) => {
                assert_eq!(sample.time, "14");
                assert_eq!(sample.svm, 0.87);
                assert_eq!(sample.activity, ActivityState::Walking);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_history_time_without_space_is_verbatim() {
        match decode_history_notification(b"12:30:05,1.5,BIEG") {
            HistoryEvent::Record(sample) => assert_eq!(sample.time, "12:30:05"),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_history_activity_is_trimmed() {
        match decode_history_notification(b"2024-05-01 08:00:00,9.81, SPOCZYNEK\r") {
            HistoryEvent::Record(sample) => assert_eq!(sample.activity, ActivityState::Resting),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_history_completion_is_substring_match() {
        assert_eq!(decode_history_notification(b"END"), HistoryEvent::Completion);
        assert_eq!(
            decode_history_notification(b"garbageEND"),
            HistoryEvent::Completion
        );
        assert_eq!(
            decode_history_notification(b"2024-05-01 12:00:00,1.0,ENDURANCE"),
            HistoryEvent::Completion
        );
    }

    #[test]
    fn test_history_too_few_fields_is_skipped() {
        assert_eq!(
            decode_history_notification(b"2024-05-01 12:00:00,1.0"),
            HistoryEvent::Skip(SkipReason::Malformed { fields: 2 })
        );
        assert_eq!(
            decode_history_notification(b""),
            HistoryEvent::Skip(SkipReason::Malformed { fields: 1 })
        );
    }

    #[test]
    fn test_history_extra_fields_are_ignored() {
        match decode_history_notification(b"2024-05-01 12:00:00,2.5,CHOD,extra") {
            HistoryEvent::Record(sample) => {
                assert_eq!(sample.svm, 2.5);
                assert_eq!(sample.activity, ActivityState::Walking);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_history_bad_svm_becomes_nan() {
        match decode_history_notification(b"2024-05-01 12:00:00,abc,CHOD") {
            HistoryEvent::Record(sample) => assert!(sample.svm.is_nan()),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_svm_trailing_text_is_ignored() {
        match decode_live_notification(b"1.5g,BIEG") {
            LiveEvent::Record { svm, activity } => {
                assert_eq!(svm, 1.5);
                assert_eq!(activity, ActivityState::Running);
            }
            other => panic!("expected record, got {:?}", other),
        }

        match decode_history_notification(b"2024-05-01 12:00:00,12.55 g,CHOD") {
            HistoryEvent::Record(sample) => {
                assert_eq!(sample.svm, 12.55);
                assert_eq!(sample.activity, ActivityState::Walking);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_svm_numeric_prefix() {
        assert_eq!(parse_svm(" 9.81"), 9.81);
        assert_eq!(parse_svm("-0.5x"), -0.5);
        assert_eq!(parse_svm(".5"), 0.5);
        assert_eq!(parse_svm("3."), 3.0);
        assert_eq!(parse_svm("1e3g"), 1000.0);
        assert_eq!(parse_svm("2e"), 2.0);
        assert_eq!(parse_svm("7.25\r"), 7.25);
        assert!(parse_svm("").is_nan());
        assert!(parse_svm("-").is_nan());
        assert!(parse_svm(".").is_nan());
        assert!(parse_svm("g1.5").is_nan());
    }

    #[test]
    fn test_live_record() {
        assert_eq!(
            decode_live_notification(b"0.42,BIEG"),
            LiveEvent::Record {
                svm: 0.42,
                activity: ActivityState::Running
            }
        );
    }

    #[test]
    fn test_live_wrong_field_count_is_skipped() {
        assert_eq!(
            decode_live_notification(b"0.42"),
            LiveEvent::Skip(SkipReason::Malformed { fields: 1 })
        );
        assert_eq!(
            decode_live_notification(b"0.42,BIEG,x"),
            LiveEvent::Skip(SkipReason::Malformed { fields: 3 })
        );
    }

    #[test]
    fn test_live_unknown_label() {
        assert_eq!(
            decode_live_notification(b"9.81,---"),
            LiveEvent::Record {
                svm: 9.81,
                activity: ActivityState::Unknown
            }
        );
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        match decode_live_notification(b"1.0,\xffBIEG") {
            LiveEvent::Record { svm, activity } => {
                assert_eq!(svm, 1.0);
                assert_eq!(activity, ActivityState::Unknown);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }
}

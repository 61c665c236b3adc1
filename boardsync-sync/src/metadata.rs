//! Provenance embedded in a replica's description.
//!
//! Layout of an encoded description:
//!
//! ```text
//! <original description>
//!
//! [boardsync-provenance]{"sourceContainerId":…,"sourceCardId":…,"originalDescription":…,"mirroredAt":…}
//! ```
//!
//! The payload is single-line JSON (newlines inside the original description
//! are escaped), so decoding reads from the marker to the next line break.
//! The marker that counts is the last one starting a line; a marker quoted
//! inside an escaped payload never does.

use chrono::{DateTime, Utc};
use serde_json::json;

use boardsync_core::types::{CardId, ListId, ProvenanceRecord};

/// Token that introduces the provenance payload.
pub const MARKER: &str = "[boardsync-provenance]";

const SEPARATOR: &str = "\n\n";

/// Append a provenance record for `source_card` to `original`.
pub fn encode(source_container: &ListId, source_card: &CardId, original: &str) -> String {
    encode_at(source_container, source_card, original, Utc::now())
}

pub fn encode_at(
    source_container: &ListId,
    source_card: &CardId,
    original: &str,
    mirrored_at: DateTime<Utc>,
) -> String {
    let payload = json!({
        "sourceContainerId": source_container.as_str(),
        "sourceCardId": source_card.as_str(),
        "originalDescription": original,
        "mirroredAt": mirrored_at.to_rfc3339(),
    });
    format!("{original}{SEPARATOR}{MARKER}{payload}")
}

/// Last marker at the start of a line, else the last marker anywhere.
fn marker_position(description: &str) -> Option<usize> {
    description
        .match_indices(MARKER)
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || description[..i].ends_with('\n'))
        .last()
        .or_else(|| description.rfind(MARKER))
}

/// Like [`decode`], but reports malformed payloads instead of logging them.
///
/// `Ok(None)` means the description carries no marker at all.
pub fn try_decode(description: &str) -> Result<Option<ProvenanceRecord>, serde_json::Error> {
    let Some(at) = marker_position(description) else {
        return Ok(None);
    };
    let rest = &description[at + MARKER.len()..];
    let payload = rest.split('\n').next().unwrap_or_default().trim();
    serde_json::from_str(payload).map(Some)
}

/// Recover the provenance record, if any.
///
/// A malformed payload is logged and treated as absent: the card is simply
/// not managed by this engine.
pub fn decode(description: &str) -> Option<ProvenanceRecord> {
    match try_decode(description) {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!("ignoring malformed provenance payload: {err}");
            None
        }
    }
}

/// The human-editable part of a description: everything before the marker.
///
/// The separator written by [`encode`] is removed exactly, so stripping an
/// untouched replica yields the original description byte for byte; when the
/// separator was edited away, trailing whitespace is trimmed instead.
/// Descriptions without a marker are returned unchanged.
pub fn strip_metadata(description: &str) -> String {
    let Some(at) = marker_position(description) else {
        return description.to_string();
    };
    let head = &description[..at];
    match head.strip_suffix(SEPARATOR) {
        Some(original) => original.to_string(),
        None => head.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ids() -> (ListId, CardId) {
        (ListId::from("list-src"), CardId::from("card-src"))
    }

    #[test]
    fn decode_recovers_what_was_encoded() {
        let (list, card) = ids();
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap();
        let encoded = encode_at(&list, &card, "Draft budget\nsecond line", at);

        let record = decode(&encoded).expect("record");
        assert_eq!(record.source_container_id, list);
        assert_eq!(record.source_card_id, card);
        assert_eq!(record.original_description, "Draft budget\nsecond line");
        assert_eq!(record.mirrored_at, at);
    }

    #[test]
    fn payload_stays_on_one_line() {
        let (list, card) = ids();
        let encoded = encode(&list, &card, "a\nb\n\nc");
        let tail = &encoded[marker_position(&encoded).unwrap()..];
        assert!(!tail.contains('\n'));
    }

    #[test]
    fn strip_returns_original_exactly() {
        let (list, card) = ids();
        for original in ["", "plain", "trailing newline\n", "  padded  ", "multi\n\nparagraph"] {
            let encoded = encode(&list, &card, original);
            assert_eq!(strip_metadata(&encoded), original);
        }
    }

    #[test]
    fn strip_is_idempotent() {
        let (list, card) = ids();
        let once = strip_metadata(&encode(&list, &card, "body"));
        assert_eq!(strip_metadata(&once), once);
    }

    #[test]
    fn strip_trims_when_separator_was_edited() {
        let desc = format!("edited by a human   {MARKER}{{}}");
        assert_eq!(strip_metadata(&desc), "edited by a human");
    }

    #[test]
    fn no_marker_means_no_record() {
        assert!(decode("just a card").is_none());
        assert!(matches!(try_decode("just a card"), Ok(None)));
    }

    #[test]
    fn malformed_payload_is_not_fatal() {
        let desc = format!("body\n\n{MARKER}{{not json");
        assert!(try_decode(&desc).is_err());
        assert!(decode(&desc).is_none());
    }

    #[test]
    fn payload_reading_stops_at_line_break() {
        let (list, card) = ids();
        let desc = format!("{}\nhuman note after the payload", encode(&list, &card, "x"));
        let record = decode(&desc).expect("record");
        assert_eq!(record.source_card_id, card);
    }

    #[test]
    fn last_marker_wins() {
        let (list, card) = ids();
        let inner = encode(&list, &CardId::from("older"), "x");
        let outer = encode(&list, &card, &inner);
        assert_eq!(decode(&outer).expect("record").source_card_id, card);
        assert_eq!(strip_metadata(&outer), inner);
    }
}

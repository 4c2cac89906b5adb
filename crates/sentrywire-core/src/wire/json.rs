//! JSON transform for collector request bodies.
//!
//! The JSON form is a bridge over the same escaped representation the line
//! codec uses: values are wire-escaped before serialization and are handed
//! back still escaped by [`from_json`]. Ten fields, two-letter keys, fixed
//! order, wrapped in an `ievent` envelope.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentryError};
use crate::event::Event;
use crate::wire::escape::escape;
use crate::wire::line::{field_at, FIELD_COUNT};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    ievent: Body,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Body {
    pk: String,
    st: String,
    ts: String,
    td: String,
    et: String,
    id: String,
    ca: String,
    p1: String,
    p2: String,
    p3: String,
}

/// Render an event as the collector request body.
pub fn to_json(event: &Event) -> String {
    let envelope = Envelope {
        ievent: Body {
            pk: escape(&event.pk),
            st: escape(&event.state),
            ts: escape(&event.timestamp.to_string()),
            td: escape(&event.thread_stamp),
            et: escape(event.kind.wire_name()),
            id: escape(&event.identity),
            ca: escape(&event.callstack),
            p1: escape(&event.param1),
            p2: escape(&event.param2),
            p3: escape(&event.param3),
        },
    };
    // Body holds only strings; string serialization cannot fail.
    serde_json::to_string(&envelope).unwrap_or_default()
}

/// Convert an already-encoded wire line to the collector request body.
///
/// Fields are carried over as-is (they are already escaped); only the line
/// structure is validated.
pub fn line_to_json(line: &str) -> Result<String> {
    let mut fields = [""; FIELD_COUNT];
    for (i, slot) in fields.iter_mut().enumerate() {
        *slot = field_at(line, i).ok_or_else(|| {
            SentryError::Decode(format!("wire line is missing field {i}"))
        })?;
    }
    let envelope = Envelope {
        ievent: Body {
            pk: fields[0].to_string(),
            st: fields[1].to_string(),
            ts: fields[2].to_string(),
            td: fields[3].to_string(),
            et: fields[4].to_string(),
            id: fields[5].to_string(),
            ca: fields[6].to_string(),
            p1: fields[7].to_string(),
            p2: fields[8].to_string(),
            p3: fields[9].to_string(),
        },
    };
    Ok(serde_json::to_string(&envelope).unwrap_or_default())
}

/// Parse a collector request body back into an [`Event`].
///
/// Field values stay in their escaped form. Structural problems -- missing
/// envelope, unrecognized key, missing field, non-numeric timestamp, unknown
/// event type -- surface as decode errors rather than a silent partial parse.
pub fn from_json(text: &str) -> Result<Event> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| SentryError::Decode(format!("malformed event body: {e}")))?;
    let body = envelope.ievent;

    let timestamp = body
        .ts
        .parse::<i64>()
        .map_err(|_| SentryError::Decode(format!("non-numeric timestamp '{}'", body.ts)))?;
    let kind = body.et.parse()?;

    Ok(Event {
        pk: body.pk,
        state: body.st,
        timestamp,
        thread_stamp: body.td,
        kind,
        identity: body.id,
        callstack: body.ca,
        param1: body.p1,
        param2: body.p2,
        param3: body.p3,
    })
}

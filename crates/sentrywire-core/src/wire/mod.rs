//! Event wire codec.
//!
//! Lossless conversion between the in-memory [`Event`](crate::event::Event)
//! tuple, the compact comma-delimited line form, and the JSON body shipped to
//! the collector. Character safety rests on a single allow-list escaping
//! scheme ([`escape`]); both the line and JSON forms are bridges over that
//! same escaped representation.

pub mod escape;
pub mod json;
pub mod line;

pub use escape::{escape, unescape};
pub use json::{from_json, line_to_json, to_json};
pub use line::{encode_line, field_at, DELIMITER, FIELD_COUNT};

//! # Langsnap Codec
//!
//! Text encoding for the destination store's bulk-load protocol.
//!
//! This crate provides:
//! - A scalar [`Value`] model shared by records, stores and payloads
//! - [`BulkTextEncoder`], a pass-through [`std::io::Read`] adapter that turns
//!   a record stream into bulk-load text
//! - [`BulkTextDecoder`], the paired decoder that turns bulk-load text back
//!   into typed rows
//!
//! ## Wire Format
//!
//! - One record per line, terminated by `\n`
//! - Fields separated by a single tab, in the declared field order
//! - `\N` marks a null field
//! - Backslash, tab, newline and carriage return inside text are escaped as
//!   `\\`, `\t`, `\n` and `\r`
//! - The stream ends with the sentinel line `\.`
//!
//! Escaping lives in the encoder itself, so no resource can forget it.
//!
//! ## Usage
//!
//! ```
//! use langsnap_codec::{from_bulk_text, to_bulk_text, FieldType, Value};
//!
//! let rows = vec![vec![Value::Integer(1), Value::Text("of\tGod".into())]];
//! let bytes = to_bulk_text(&rows).unwrap();
//! assert_eq!(bytes, b"1\tof\\tGod\n\\.\n");
//!
//! let decoded = from_bulk_text(&bytes, &[FieldType::Integer, FieldType::Text]).unwrap();
//! assert_eq!(decoded, rows);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_bulk_text, unescape, BulkTextDecoder};
pub use encoder::{
    encode_row, escape_into, to_bulk_text, BulkTextEncoder, FieldExtractor, NULL_MARKER,
    TERMINATOR,
};
pub use error::{CodecError, CodecResult};
pub use value::{FieldType, Value};

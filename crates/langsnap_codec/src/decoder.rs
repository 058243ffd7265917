//! Bulk-load text decoder.

use crate::encoder::{NULL_MARKER, TERMINATOR};
use crate::error::{CodecError, CodecResult};
use crate::value::{FieldType, Value};
use std::io::BufRead;

/// Reverses the escaping applied by the encoder.
///
/// Unknown escapes decode to the escaped character itself, as the
/// bulk-load protocol does.
///
/// # Errors
///
/// Returns an error if the field ends with a lone backslash.
pub fn unescape(raw: &str, line: usize) -> CodecResult<String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => return Err(CodecError::decoding_failed(line, "dangling escape")),
        }
    }
    Ok(out)
}

/// Decodes bulk-load text into typed rows, one line at a time.
///
/// The sentinel must be the last line. Input that ends without it yields
/// [`CodecError::MissingTerminator`] and input that continues past it yields
/// [`CodecError::TrailingData`], so neither a truncated nor a concatenated
/// payload passes as valid.
pub struct BulkTextDecoder<B> {
    input: B,
    types: Vec<FieldType>,
    line: usize,
    buffer: Vec<u8>,
    done: bool,
}

impl<B: BufRead> BulkTextDecoder<B> {
    /// Creates a decoder for lines with the given field types.
    pub fn new(input: B, types: Vec<FieldType>) -> Self {
        Self {
            input,
            types,
            line: 0,
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Returns the number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn next_row(&mut self) -> CodecResult<Option<Vec<Value>>> {
        self.buffer.clear();
        let read = self.input.read_until(b'\n', &mut self.buffer)?;
        if read == 0 {
            return Err(CodecError::MissingTerminator);
        }
        self.line += 1;

        let mut bytes = self.buffer.as_slice();
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if bytes == &TERMINATOR[..TERMINATOR.len() - 1] {
            if !self.input.fill_buf()?.is_empty() {
                return Err(CodecError::TrailingData { line: self.line + 1 });
            }
            return Ok(None);
        }

        let text =
            std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { line: self.line })?;
        let raw_fields: Vec<&str> = text.split('\t').collect();
        if raw_fields.len() != self.types.len() {
            return Err(CodecError::FieldCount {
                line: self.line,
                expected: self.types.len(),
                found: raw_fields.len(),
            });
        }

        raw_fields
            .into_iter()
            .zip(self.types.iter())
            .enumerate()
            .map(|(field, (raw, ty))| {
                if raw == NULL_MARKER {
                    Ok(Value::Null)
                } else {
                    ty.parse(unescape(raw, self.line)?, self.line, field)
                }
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Some)
    }
}

impl<B: BufRead> Iterator for BulkTextDecoder<B> {
    type Item = CodecResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decodes a complete payload into rows.
pub fn from_bulk_text(bytes: &[u8], types: &[FieldType]) -> CodecResult<Vec<Vec<Value>>> {
    BulkTextDecoder::new(bytes, types.to_vec()).collect()
}

//! Bulk-load text encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::io::{self, Read};

/// The end-of-data sentinel line.
pub const TERMINATOR: &[u8] = b"\\.\n";

/// The spelling of a null field.
pub const NULL_MARKER: &str = "\\N";

/// Extracts one field from a record.
///
/// A resource declares an ordered list of extractors; each produces the
/// value for one column of the bulk-load line.
pub type FieldExtractor<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;

/// Appends `text` to `out`, escaping characters that are meaningful to the
/// bulk-load protocol.
///
/// `field` is the zero-based field index, used for error reporting.
///
/// # Errors
///
/// Returns [`CodecError::NulCharacter`] if `text` contains a NUL character.
pub fn escape_into(text: &str, field: usize, out: &mut Vec<u8>) -> CodecResult<()> {
    let mut start = 0;
    for (i, byte) in text.bytes().enumerate() {
        let escaped: &[u8] = match byte {
            b'\\' => b"\\\\",
            b'\t' => b"\\t",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            0 => return Err(CodecError::NulCharacter { field }),
            _ => continue,
        };
        out.extend_from_slice(&text.as_bytes()[start..i]);
        out.extend_from_slice(escaped);
        start = i + 1;
    }
    out.extend_from_slice(&text.as_bytes()[start..]);
    Ok(())
}

fn encode_value(value: &Value, field: usize, out: &mut Vec<u8>) -> CodecResult<()> {
    match value {
        Value::Null => out.extend_from_slice(NULL_MARKER.as_bytes()),
        Value::Bool(true) => out.push(b't'),
        Value::Bool(false) => out.push(b'f'),
        Value::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::Text(s) => escape_into(s, field, out)?,
    }
    Ok(())
}

/// Appends one encoded line (including the trailing newline) to `out`.
///
/// On error `out` may hold a partial line; callers discard it.
pub fn encode_row<'a, I>(values: I, out: &mut Vec<u8>) -> CodecResult<()>
where
    I: IntoIterator<Item = &'a Value>,
{
    for (field, value) in values.into_iter().enumerate() {
        if field > 0 {
            out.push(b'\t');
        }
        encode_value(value, field, out)?;
    }
    out.push(b'\n');
    Ok(())
}

/// Encodes a complete set of rows, sentinel included.
///
/// Convenient for small payloads and tests; large streams should go
/// through [`BulkTextEncoder`].
pub fn to_bulk_text<R: AsRef<[Value]>>(rows: &[R]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    for row in rows {
        encode_row(row.as_ref(), &mut out)?;
    }
    out.extend_from_slice(TERMINATOR);
    Ok(out)
}

/// A pass-through encoder from a record stream to bulk-load text.
///
/// The encoder implements [`Read`]: each call pulls at most as many records
/// from the upstream iterator as needed to satisfy the caller, so memory
/// use is bounded by one encoded line regardless of the stream length.
///
/// Upstream errors and encoding errors surface as [`io::Error`]s whose
/// inner error is the original one (see [`io::Error::into_inner`]).
///
/// # Example
///
/// ```
/// use langsnap_codec::{BulkTextEncoder, FieldExtractor, Value};
/// use std::io::Read;
///
/// let records: Vec<Result<(i64, &str), std::io::Error>> = vec![Ok((1, "a\tb"))];
/// let extractors: Vec<FieldExtractor<(i64, &str)>> = vec![
///     Box::new(|r| Value::Integer(r.0)),
///     Box::new(|r| Value::Text(r.1.to_string())),
/// ];
///
/// let mut out = Vec::new();
/// BulkTextEncoder::new(records.into_iter(), extractors)
///     .read_to_end(&mut out)
///     .unwrap();
/// assert_eq!(out, b"1\ta\\tb\n\\.\n");
/// ```
pub struct BulkTextEncoder<R, I> {
    records: I,
    extractors: Vec<FieldExtractor<R>>,
    buffer: Vec<u8>,
    position: usize,
    finished: bool,
    rows: u64,
}

impl<R, I, E> BulkTextEncoder<R, I>
where
    I: Iterator<Item = Result<R, E>>,
{
    /// Creates an encoder over `records` using the ordered `extractors`.
    pub fn new(records: I, extractors: Vec<FieldExtractor<R>>) -> Self {
        Self {
            records,
            extractors,
            buffer: Vec::with_capacity(256),
            position: 0,
            finished: false,
            rows: 0,
        }
    }

    /// Returns the number of records encoded so far.
    pub fn rows_encoded(&self) -> u64 {
        self.rows
    }
}

impl<R, I, E> BulkTextEncoder<R, I>
where
    I: Iterator<Item = Result<R, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn fill(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.position = 0;

        match self.records.next() {
            Some(Ok(record)) => {
                let values: Vec<Value> = self.extractors.iter().map(|f| f(&record)).collect();
                if let Err(e) = encode_row(&values, &mut self.buffer) {
                    self.buffer.clear();
                    self.finished = true;
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                }
                self.rows += 1;
                Ok(())
            }
            Some(Err(e)) => {
                self.finished = true;
                Err(io::Error::other(e))
            }
            None => {
                self.buffer.extend_from_slice(TERMINATOR);
                self.finished = true;
                Ok(())
            }
        }
    }
}

impl<R, I, E> Read for BulkTextEncoder<R, I>
where
    I: Iterator<Item = Result<R, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.position == self.buffer.len() {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }

        let pending = &self.buffer[self.position..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.position += n;
        Ok(n)
    }
}

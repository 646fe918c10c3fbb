//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset of the `<` opening the signature value
//! - `offset2` = byte offset just past the closing `>`
//! - `length2` = remaining bytes to end of file
//!
//! Both the ByteRange array and the `/Contents` value are written with a
//! fixed width before their final values are known, and are later patched
//! in place. The file never changes length.

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::Object;
use crate::parser::parse_object;
use std::io::Read;
use std::ops::Range;

/// Decimal digits reserved for each ByteRange entry.
pub const BYTE_RANGE_DIGITS: usize = 10;

/// Largest value a ByteRange entry can hold.
pub const BYTE_RANGE_MAX: u64 = 9_999_999_999;

/// Written into `/ByteRange` before serialization; the widest 10-digit integer.
pub(crate) const BYTE_RANGE_SENTINEL: i64 = BYTE_RANGE_MAX as i64;

/// Space reserved for a signature's `/Contents`, fixed when the signature
/// dictionary is built.
///
/// The capacity is in raw signature bytes; the file holds twice as many hex
/// digits between `<` and `>`. There is no way to change it after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    capacity: usize,
}

impl Placeholder {
    /// Reserve `capacity` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEstimate`] for a zero capacity, or one whose hex token
    /// (`<` + `2·capacity` digits + `>`) could not be addressed by a ByteRange.
    pub fn new(capacity: usize) -> Result<Self> {
        let token_len = capacity
            .checked_mul(2)
            .and_then(|digits| digits.checked_add(2))
            .map(|len| len as u64);
        match token_len {
            Some(len) if capacity > 0 && len <= BYTE_RANGE_MAX => Ok(Self { capacity }),
            _ => Err(Error::InvalidEstimate(capacity)),
        }
    }

    /// Reserved signature bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hex digits between the angle brackets.
    pub fn hex_len(&self) -> usize {
        self.capacity * 2
    }

    /// The `/Contents` value: all zero bytes, which serialize as `<00…>`.
    pub(crate) fn contents_object(&self) -> Object {
        Object::String(vec![0; self.capacity])
    }

    /// The four sentinel integers for `/ByteRange`.
    pub(crate) fn byte_range_object() -> Object {
        Object::Array(vec![Object::Integer(BYTE_RANGE_SENTINEL); 4])
    }
}

/// The four ByteRange integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start of the first span (0 for a well-formed signature)
    pub start: usize,
    /// Length of the first span
    pub before_len: usize,
    /// Start of the second span
    pub after_start: usize,
    /// Length of the second span
    pub after_len: usize,
}

impl ByteRange {
    /// Cover a file of `file_len` bytes except `excluded`.
    pub fn around(excluded: Range<usize>, file_len: usize) -> Self {
        Self {
            start: 0,
            before_len: excluded.start,
            after_start: excluded.end,
            after_len: file_len.saturating_sub(excluded.end),
        }
    }

    /// `[offset1, length1, offset2, length2]`.
    pub fn to_array(&self) -> [i64; 4] {
        [
            self.start as i64,
            self.before_len as i64,
            self.after_start as i64,
            self.after_len as i64,
        ]
    }

    /// Build from the array stored in a signature dictionary.
    ///
    /// ```
    /// use pdf_seal::signatures::ByteRange;
    ///
    /// let br = ByteRange::from_array(&[0, 100, 150, 50]).unwrap();
    /// assert_eq!(br.to_array(), [0, 100, 150, 50]);
    /// assert!(ByteRange::from_array(&[0, 100, 150]).is_err());
    /// assert!(ByteRange::from_array(&[0, -1, 150, 50]).is_err());
    /// ```
    pub fn from_array(values: &[i64]) -> Result<Self> {
        match values {
            [a, b, c, d] if values.iter().all(|v| *v >= 0) => Ok(Self {
                start: *a as usize,
                before_len: *b as usize,
                after_start: *c as usize,
                after_len: *d as usize,
            }),
            _ => Err(Error::InvalidPdf(format!("malformed ByteRange {:?}", values))),
        }
    }

    /// The span left out of the digest.
    pub fn excluded(&self) -> Range<usize> {
        self.start + self.before_len..self.after_start
    }

    /// Check that the two spans cover a file of `file_len` bytes except one gap.
    pub fn validate(&self, file_len: usize) -> Result<()> {
        if self.start != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", self.start)));
        }
        if self.before_len > self.after_start {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                self.before_len, self.after_start
            )));
        }
        let end = self.after_start + self.after_len;
        if end != file_len {
            return Err(Error::InvalidPdf(format!(
                "ByteRange must end at file size {}, got {}",
                file_len, end
            )));
        }
        Ok(())
    }

    fn spans<'a>(&self, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
        let first = data.get(self.start..self.start + self.before_len);
        let second = data.get(self.after_start..self.after_start + self.after_len);
        match (first, second) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(Error::InvalidPdf(format!(
                "ByteRange {:?} exceeds file size {}",
                self.to_array(),
                data.len()
            ))),
        }
    }

    /// The signed bytes, copied into one buffer.
    pub fn signed_content(&self, data: &[u8]) -> Result<Vec<u8>> {
        let (first, second) = self.spans(data)?;
        let mut out = Vec::with_capacity(first.len() + second.len());
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        Ok(out)
    }

    /// The signed bytes as one stream, without copying.
    pub fn reader<'a>(&self, data: &'a [u8]) -> Result<impl Read + 'a> {
        let (first, second) = self.spans(data)?;
        Ok(first.chain(second))
    }
}

/// Where the signature lives in a serialized file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    /// Final ByteRange, already written into the file
    pub byte_range: ByteRange,
    /// Hex digits of `/Contents`, between the angle brackets
    pub contents: Range<usize>,
}

impl ResolvedLayout {
    /// Signature bytes the placeholder can hold.
    pub fn capacity(&self) -> usize {
        self.contents.len() / 2
    }
}

/// Byte spans of the `/ByteRange` and `/Contents` values inside the
/// signature object starting at `offset`.
fn locate_values(data: &[u8], offset: usize) -> Result<(Range<usize>, Range<usize>)> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidPdf(format!("signature offset {} is past end of file", offset)))?;
    let pos = |rest: &[u8]| offset + (input.len() - rest.len());
    let malformed = |rest: &[u8], what: &str| Error::ParseError {
        offset: pos(rest),
        reason: format!("signature dictionary: {}", what),
    };

    let mut cursor = input;
    for expected in ["object number", "generation", "obj", "<<"] {
        let (rest, tok) = token(cursor).map_err(|_| malformed(cursor, expected))?;
        let ok = match expected {
            "object number" | "generation" => matches!(tok, Token::Integer(_)),
            "obj" => tok == Token::ObjStart,
            _ => tok == Token::DictStart,
        };
        if !ok {
            return Err(malformed(cursor, &format!("expected {}", expected)));
        }
        cursor = rest;
    }

    let (mut byte_range, mut contents) = (None, None);
    loop {
        let (rest, tok) = token(cursor).map_err(|_| malformed(cursor, "unterminated dictionary"))?;
        match tok {
            Token::DictEnd => break,
            Token::Name(key) => {
                let (value, _) = skip_ws(rest).map_err(|_| malformed(rest, "missing value"))?;
                let (after, _) = parse_object(value).map_err(|_| malformed(value, "unreadable value"))?;
                let span = pos(value)..pos(after);
                match key.as_str() {
                    "ByteRange" => byte_range = Some(span),
                    "Contents" => contents = Some(span),
                    _ => {},
                }
                cursor = after;
            },
            _ => return Err(malformed(cursor, "expected a key")),
        }
    }

    match (byte_range, contents) {
        (Some(br), Some(c)) => Ok((br, c)),
        _ => Err(Error::InvalidPdf("signature dictionary lacks /ByteRange or /Contents".to_string())),
    }
}

fn sentinel_text() -> Vec<u8> {
    format!("[{0} {0} {0} {0}]", BYTE_RANGE_SENTINEL).into_bytes()
}

/// Compute the final ByteRange of a serialized document and write it in place.
///
/// `signature_offset` is where the signature object (`N 0 obj`) starts.
/// The `/Contents` placeholder must be exactly `<` + `2·capacity` zeros + `>`
/// and `/ByteRange` must still hold the sentinel array; the array is
/// overwritten with zero-padded values of the same width.
///
/// # Errors
///
/// [`Error::InvalidPdf`] if either value is not where and what it should be.
pub fn resolve_byte_range(
    data: &mut [u8],
    signature_offset: usize,
    placeholder: Placeholder,
) -> Result<ResolvedLayout> {
    let (array_span, contents_span) = locate_values(data, signature_offset)?;

    let token_bytes = &data[contents_span.clone()];
    let digits_ok = token_bytes.len() == placeholder.hex_len() + 2
        && token_bytes.first() == Some(&b'<')
        && token_bytes.last() == Some(&b'>')
        && token_bytes[1..token_bytes.len() - 1].iter().all(|&b| b == b'0');
    if !digits_ok {
        return Err(Error::InvalidPdf(format!(
            "/Contents at {} is not a {}-digit placeholder",
            contents_span.start,
            placeholder.hex_len()
        )));
    }

    let sentinel = sentinel_text();
    if data[array_span.clone()] != sentinel[..] {
        return Err(Error::InvalidPdf(format!(
            "/ByteRange at {} is not the reserved sentinel array",
            array_span.start
        )));
    }

    let byte_range = ByteRange::around(contents_span.clone(), data.len());
    if byte_range.to_array().iter().any(|&v| v as u64 > BYTE_RANGE_MAX) {
        return Err(Error::Unsupported(format!(
            "file of {} bytes exceeds the ByteRange width",
            data.len()
        )));
    }

    let [a, b, c, d] = byte_range.to_array();
    let text = format!(
        "[{:0w$} {:0w$} {:0w$} {:0w$}]",
        a,
        b,
        c,
        d,
        w = BYTE_RANGE_DIGITS
    );
    debug_assert_eq!(text.len(), sentinel.len());
    data[array_span].copy_from_slice(text.as_bytes());

    log::debug!("Resolved ByteRange {:?}, /Contents at {:?}", byte_range.to_array(), contents_span);

    Ok(ResolvedLayout {
        byte_range,
        contents: contents_span.start + 1..contents_span.end - 1,
    })
}

/// Write `signature` into the placeholder as upper-case hex, padded with `'0'`.
///
/// # Errors
///
/// [`Error::Signer`] for an empty signature and [`Error::SignatureTooLarge`]
/// if the encoded signature is wider than the placeholder; `data` is left
/// untouched in both cases.
pub fn insert_signature(data: &mut [u8], layout: &ResolvedLayout, signature: &[u8]) -> Result<()> {
    if signature.is_empty() {
        return Err(Error::signer("signer returned an empty signature"));
    }
    let encoded = hex::encode_upper(signature);
    let slot = data
        .get_mut(layout.contents.clone())
        .ok_or_else(|| Error::InvalidPdf("/Contents placeholder is outside the file".to_string()))?;

    if encoded.len() > slot.len() {
        return Err(Error::SignatureTooLarge {
            required: signature.len(),
            reserved: slot.len() / 2,
        });
    }

    let (used, padding) = slot.split_at_mut(encoded.len());
    used.copy_from_slice(encoded.as_bytes());
    padding.fill(b'0');
    Ok(())
}

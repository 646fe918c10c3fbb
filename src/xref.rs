//! Cross-reference table parser.
//!
//! The xref table maps object numbers to byte offsets in the PDF file.
//! Both classic `xref` tables and cross-reference streams (PDF 1.5+) are
//! read, and `/Prev` chains left by earlier incremental updates are
//! followed so that the newest entry for each object wins.

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dictionary, Object};
use crate::parser::{parse_indirect_object, parse_object};
use nom::{
    bytes::complete::tag,
    character::complete::{digit1, one_of, space1},
    sequence::tuple,
    IResult,
};
use std::collections::{HashMap, HashSet};

/// Maximum number of chained cross-reference sections.
const MAX_PREV_DEPTH: u32 = 100;

/// How far back from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 2048;

/// Location of a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free slot in the object table
    Free {
        /// Generation to use if the number is reused
        generation: u16,
    },
    /// Object stored directly in the file
    InUse {
        /// Byte offset of `id gen obj`
        offset: usize,
        /// Generation number
        generation: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing `/Type /ObjStm` stream
        stream_id: u32,
        /// Index of the object within that stream
        index: u32,
    },
}

impl XRefEntry {
    /// Whether the entry points at a live object.
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table that maps object numbers to their locations.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    /// Trailer of the newest section (for xref streams, the stream dictionary)
    trailer: Dictionary,
}

impl CrossRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trailer dictionary of the most recent section.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Add or replace an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Look up an object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Highest object number with an entry, if any.
    pub fn max_object_number(&self) -> Option<u32> {
        self.entries.keys().copied().max()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold an older section into this one; existing entries take precedence.
    fn merge_older(&mut self, older: CrossRefTable) {
        for (num, entry) in older.entries {
            self.entries.entry(num).or_insert(entry);
        }
        if self.trailer.is_empty() {
            self.trailer = older.trailer;
        }
    }
}

/// Find the offset named by the last `startxref` keyword in the file.
///
/// ```
/// # use pdf_seal::xref::find_xref_offset;
/// let tail = b"trailer\n<< /Size 1 >>\nstartxref\n\n 1234\n%%EOF\n";
/// assert_eq!(find_xref_offset(tail).unwrap(), 1234);
/// ```
pub fn find_xref_offset(data: &[u8]) -> Result<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let window = &data[window_start..];
    let keyword = b"startxref";
    let pos = window
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or(Error::InvalidXref)?;

    match token(&window[pos + keyword.len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as usize),
        _ => Err(Error::InvalidXref),
    }
}

/// Parse the cross-reference section at `offset` and every section it chains to.
pub fn parse_xref(data: &[u8], offset: usize) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    parse_xref_recursive(data, offset, 0, &mut visited)
}

fn parse_xref_recursive(
    data: &[u8],
    offset: usize,
    depth: u32,
    visited: &mut HashSet<usize>,
) -> Result<CrossRefTable> {
    if depth > MAX_PREV_DEPTH {
        return Err(Error::InvalidPdf(format!(
            "xref /Prev chain depth exceeded {}",
            MAX_PREV_DEPTH
        )));
    }
    if !visited.insert(offset) {
        return Err(Error::InvalidPdf(format!("xref /Prev chain loops back to offset {}", offset)));
    }
    let section = data.get(offset..).ok_or(Error::InvalidXref)?;
    let (body, _) = skip_ws(section).map_err(|_| Error::InvalidXref)?;

    let mut xref = if body.starts_with(b"xref") {
        log::debug!("Classic xref table at offset {}", offset);
        let mut table = parse_traditional_xref(data, offset)?;

        // Hybrid files: the table is supplemented by an xref stream
        if let Some(stm_offset) = table.trailer.get("XRefStm").and_then(Object::as_integer) {
            match parse_xref_stream(data, stm_offset as usize) {
                Ok(stream_table) => {
                    for (num, entry) in stream_table.entries {
                        table.entries.entry(num).or_insert(entry);
                    }
                },
                Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stm_offset, e),
            }
        }
        table
    } else if body.first().is_some_and(u8::is_ascii_digit) {
        log::debug!("Cross-reference stream at offset {}", offset);
        parse_xref_stream(data, offset)?
    } else {
        return Err(Error::InvalidXref);
    };

    if let Some(prev) = xref.trailer.get("Prev").and_then(Object::as_integer) {
        log::debug!("Following /Prev {} from xref at {}", prev, offset);
        let older = parse_xref_recursive(data, prev as usize, depth + 1, visited)?;
        xref.merge_older(older);
    }

    Ok(xref)
}

/// One `nnnnnnnnnn ggggg n` line.
fn xref_line(input: &[u8]) -> IResult<&[u8], (u64, u16, bool)> {
    let (input, _) = skip_ws(input)?;
    let (rest, (offset, _, gen, _, kind)) = tuple((digit1, space1, digit1, space1, one_of("nf")))(input)?;
    let parse_num = |digits: &[u8]| std::str::from_utf8(digits).ok().and_then(|s| s.parse::<u64>().ok());
    match (parse_num(offset), parse_num(gen)) {
        (Some(offset), Some(gen)) if gen <= u16::MAX as u64 => Ok((rest, (offset, gen as u16, kind == 'n'))),
        _ => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
    }
}

/// Parse a classic table:
///
/// ```text
/// xref
/// 0 6
/// 0000000000 65535 f
/// 0000000018 00000 n
/// ...
/// trailer
/// << /Size 6 /Root 1 0 R >>
/// ```
fn parse_traditional_xref(data: &[u8], offset: usize) -> Result<CrossRefTable> {
    let start = data.get(offset..).ok_or(Error::InvalidXref)?;
    let (input, _) = skip_ws(start).map_err(|_| Error::InvalidXref)?;
    let (mut input, _) = tag::<_, _, nom::error::Error<&[u8]>>(b"xref")(input).map_err(|_| Error::InvalidXref)?;

    let mut xref = CrossRefTable::new();
    loop {
        let (rest, _) = skip_ws(input).map_err(|_| Error::InvalidXref)?;
        if let Ok((after, _)) = tag::<_, _, nom::error::Error<&[u8]>>(b"trailer")(rest) {
            let (_, trailer) = parse_object(after).map_err(|_| Error::ParseError {
                offset: data.len() - after.len(),
                reason: "unreadable trailer dictionary".to_string(),
            })?;
            xref.trailer = trailer.into_dict()?;
            return Ok(xref);
        }

        // Subsection header: "first count"
        let (rest, first) = match token(rest) {
            Ok((r, Token::Integer(n))) if n >= 0 => (r, n as u32),
            _ => return Err(Error::InvalidXref),
        };
        let (rest, count) = match token(rest) {
            Ok((r, Token::Integer(n))) if n >= 0 => (r, n as u32),
            _ => return Err(Error::InvalidXref),
        };
        if count > 1_000_000 {
            return Err(Error::InvalidPdf("xref subsection count exceeds limit".to_string()));
        }

        input = rest;
        for i in 0..count {
            let (rest, (entry_offset, generation, in_use)) = match xref_line(input) {
                Ok(parsed) => parsed,
                Err(_) => {
                    log::warn!("xref subsection {} ended after {} of {} entries", first, i, count);
                    break;
                },
            };
            let entry = if in_use {
                XRefEntry::InUse {
                    offset: entry_offset as usize,
                    generation,
                }
            } else {
                XRefEntry::Free { generation }
            };
            xref.add_entry(first + i, entry);
            input = rest;
        }
    }
}

/// Big-endian field of a cross-reference stream row.
fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Parse a `/Type /XRef` stream.
///
/// Rows are `/W [w1 w2 w3]` bytes wide; field 1 is the entry type
/// (0 free, 1 in use, 2 compressed; 1 when `w1` is zero).
fn parse_xref_stream(data: &[u8], offset: usize) -> Result<CrossRefTable> {
    let input = data.get(offset..).ok_or(Error::InvalidXref)?;
    let (_, (obj_ref, obj)) = parse_indirect_object(input).map_err(|_| Error::ParseError {
        offset,
        reason: "expected an xref stream object".to_string(),
    })?;

    let dict = match &obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
        if kind != "XRef" {
            return Err(Error::InvalidPdf(format!("expected /Type /XRef, got /{}", kind)));
        }
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|arr| arr.iter().filter_map(Object::as_integer).map(|w| w.max(0) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(Error::InvalidPdf(format!("invalid /W in xref stream {}", obj_ref)));
    }
    let (w1, w2, w3) = (widths[0], widths[1], widths[2]);
    let row = w1 + w2 + w3;

    let size = dict
        .get("Size")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("missing /Size in xref stream".to_string()))?;

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
        Some(index) => index
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_integer()? as u32, pair[1].as_integer()? as u32)))
            .collect(),
        None => vec![(0, size as u32)],
    };

    let decoded = obj.decode_stream_data()?;
    let mut rows = decoded.chunks_exact(row.max(1));
    let mut xref = CrossRefTable::new();

    for (first, count) in ranges {
        for i in 0..count {
            let fields = rows
                .next()
                .ok_or_else(|| Error::InvalidPdf("truncated xref stream data".to_string()))?;
            let kind = if w1 == 0 { 1 } else { read_field(&fields[..w1]) };
            let f2 = read_field(&fields[w1..w1 + w2]);
            let f3 = read_field(&fields[w1 + w2..]);
            let entry = match kind {
                0 => XRefEntry::Free {
                    generation: f3 as u16,
                },
                1 => XRefEntry::InUse {
                    offset: f2 as usize,
                    generation: f3 as u16,
                },
                2 => XRefEntry::Compressed {
                    stream_id: f2 as u32,
                    index: f3 as u32,
                },
                other => {
                    log::warn!("Unknown xref stream entry type {} for object {}", other, first + i);
                    continue;
                },
            };
            xref.add_entry(first + i, entry);
        }
    }

    xref.trailer = dict.clone();
    Ok(xref)
}

//! PDF object parser.
//!
//! Recursive descent over the token stream produced by [`crate::lexer`]:
//! composite objects (arrays, dictionaries, streams) recurse into
//! [`parse_object`] for their members.

use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

/// Maximum nesting of arrays/dictionaries accepted by the parser.
const MAX_NESTING: usize = 256;

fn nom_fail<T>(input: &[u8], kind: nom::error::ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Decode escape sequences in a literal string (ISO 32000-1, 7.3.4.2).
///
/// ```
/// # use pdf_seal::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"a\\(b\\)\\101"), b"a(b)A");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 >= raw.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(next),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = (next - b'0') as u32;
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            code = code * 8 + (d - b'0') as u32;
                            i += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            // Unknown escape: the backslash is dropped
            other => out.push(other),
        }
    }
    out
}

/// Decode the body of a hex string; whitespace is ignored and an odd final digit is padded with 0.
///
/// ```
/// # use pdf_seal::parser::decode_hex;
/// assert_eq!(decode_hex(b"48 65 6C 6C 6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut digits: Vec<u8> = hex_bytes.iter().copied().filter(|&c| !is_whitespace(c)).collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    hex::decode(&digits).map_err(|e| Error::ParseError {
        offset: 0,
        reason: format!("invalid hex string: {}", e),
    })
}

/// Parse a PDF object from input bytes.
///
/// ```
/// use pdf_seal::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /Sig /ByteRange [0 10 20 30] >>").unwrap();
/// assert_eq!(obj.as_dict().unwrap()["Type"].as_name(), Some("Sig"));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_nested(input, 0)
}

fn parse_nested(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (rest, tok) = token(input)?;
    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(n) => Ok((rest, Object::Name(n))),
        Token::Integer(i) => {
            // "id gen R" is a reference; anything else leaves the integer alone
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=u32::MAX as i64).contains(&i) && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::String(bytes))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },
        Token::ArrayStart => {
            let mut items = Vec::new();
            let mut cursor = rest;
            loop {
                if let Ok((after, Token::ArrayEnd)) = token(cursor) {
                    return Ok((after, Object::Array(items)));
                }
                let (after, item) = parse_nested(cursor, depth + 1)?;
                items.push(item);
                cursor = after;
            }
        },
        Token::DictStart => {
            let (after_dict, dict) = parse_dict_body(rest, depth)?;
            match token(after_dict) {
                Ok((after_kw, Token::StreamStart)) => {
                    let (after_stream, data) = parse_stream_data(after_kw, &dict)?;
                    Ok((
                        after_stream,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((after_dict, Object::Dictionary(dict))),
            }
        },
        _ => nom_fail(input, nom::error::ErrorKind::Tag),
    }
}

fn parse_dict_body(input: &[u8], depth: usize) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut cursor = input;
    loop {
        let (after, tok) = token(cursor)?;
        match tok {
            Token::DictEnd => return Ok((after, dict)),
            Token::Name(key) => {
                let (after_value, value) = parse_nested(after, depth + 1)?;
                // A null value is equivalent to the key being absent
                if !value.is_null() {
                    dict.insert(key, value);
                }
                cursor = after_value;
            },
            _ => return nom_fail(cursor, nom::error::ErrorKind::Tag),
        }
    }
}

/// Read stream bytes following the `stream` keyword.
///
/// A direct integer /Length is trusted when `endstream` follows it;
/// otherwise the data runs up to the next `endstream`.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let body = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        log::warn!("stream keyword not followed by an end-of-line marker");
        input
    };

    if let Some(len) = dict.get("Length").and_then(Object::as_integer) {
        let len = len.max(0) as usize;
        if len <= body.len() {
            if let Ok((after, Token::StreamEnd)) = token(&body[len..]) {
                return Ok((after, body[..len].to_vec()));
            }
        }
        log::debug!("stream /Length {} does not reach endstream, scanning instead", len);
    }

    let keyword = b"endstream";
    let pos = match body.windows(keyword.len()).position(|w| w == keyword) {
        Some(pos) => pos,
        None => return nom_fail(input, nom::error::ErrorKind::Eof),
    };
    let mut end = pos;
    // The EOL before endstream is not part of the data
    if end > 0 && body[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && body[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((&body[pos + keyword.len()..], body[..end].to_vec()))
}

/// Parse `id gen obj <object> endobj`.
///
/// A missing `endobj` is tolerated (with a warning); many writers emit it
/// inconsistently and nothing after the object body depends on it.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, id) = match token(input)? {
        (rest, Token::Integer(id)) if id >= 0 => (rest, id as u32),
        _ => return nom_fail(input, nom::error::ErrorKind::Digit),
    };
    let (rest, gen) = match token(rest)? {
        (rest, Token::Integer(gen)) if (0..=u16::MAX as i64).contains(&gen) => (rest, gen as u16),
        _ => return nom_fail(input, nom::error::ErrorKind::Digit),
    };
    let rest = match token(rest)? {
        (rest, Token::ObjStart) => rest,
        _ => return nom_fail(input, nom::error::ErrorKind::Tag),
    };

    let (rest, obj) = parse_object(rest)?;
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => {
            log::warn!("object {} {} has no endobj", id, gen);
            rest
        },
    };
    Ok((rest, (ObjectRef::new(id, gen), obj)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Object {
        parse_object(input).unwrap().1
    }

    #[test]
    fn test_primitives() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"-12"), Object::Integer(-12));
        assert_eq!(parse(b"/Sig"), Object::Name("Sig".to_string()));
        assert_eq!(parse(b"(A\\nB)"), Object::String(b"A\nB".to_vec()));
        assert_eq!(parse(b"<0000>"), Object::String(vec![0, 0]));
    }

    #[test]
    fn test_reference_vs_integers() {
        assert_eq!(parse(b"12 0 R"), Object::Reference(ObjectRef::new(12, 0)));
        assert_eq!(
            parse(b"[0 10 20 30]"),
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(10),
                Object::Integer(20),
                Object::Integer(30),
            ])
        );
        assert_eq!(
            parse(b"[1 0 R 2 0 R]"),
            Object::Array(vec![
                Object::Reference(ObjectRef::new(1, 0)),
                Object::Reference(ObjectRef::new(2, 0)),
            ])
        );
    }

    #[test]
    fn test_dictionary_nesting() {
        let obj = parse(b"<< /AcroForm << /Fields [] /SigFlags 3 >> /Pages 2 0 R /Junk null >>");
        let dict = obj.as_dict().unwrap();
        let form = dict["AcroForm"].as_dict().unwrap();
        assert_eq!(form["SigFlags"].as_integer(), Some(3));
        assert!(form["Fields"].as_array().unwrap().is_empty());
        assert!(!dict.contains_key("Junk"));
    }

    #[test]
    fn test_zero_padded_integers_in_array() {
        let obj = parse(b"[0000000000 0000000120 0000000330 0000000042]");
        let arr: Vec<i64> = obj
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_integer().unwrap())
            .collect();
        assert_eq!(arr, vec![0, 120, 330, 42]);
    }

    #[test]
    fn test_stream_with_length() {
        let (_, obj) = parse_object(b"<< /Length 5 >>\nstream\nHello\nendstream").unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_with_indirect_length() {
        let (_, obj) = parse_object(b"<< /Length 9 0 R >>\r\nstream\r\nabc\r\nendstream").unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"abc"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_indirect_object() {
        let (rest, (r, obj)) = parse_indirect_object(b"7 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer").unwrap();
        assert_eq!(r, ObjectRef::new(7, 0));
        assert_eq!(obj.as_dict().unwrap()["Type"].as_name(), Some("Catalog"));
        assert!(rest.starts_with(b"\ntrailer"));
    }

    #[test]
    fn test_indirect_object_rejects_garbage() {
        assert!(parse_indirect_object(b"xref\n0 1").is_err());
    }

    #[test]
    fn test_unclosed_array_fails() {
        assert!(parse_object(b"[1 2").is_err());
    }

    #[test]
    fn test_decode_octal_and_continuation() {
        assert_eq!(decode_literal_string_escapes(b"\\247x"), vec![0xA7, b'x']);
        assert_eq!(decode_literal_string_escapes(b"ab\\\ncd"), b"abcd");
        assert_eq!(decode_literal_string_escapes(b"\\q"), b"q");
    }
}

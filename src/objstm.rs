//! Object stream parsing (PDF 1.5+).
//!
//! An object stream (`/Type /ObjStm`) packs several non-stream objects into
//! one compressed stream. The decoded data starts with `/N` pairs of
//! integers `(object number, offset)`; offsets are relative to `/First`.
//!
//! ```text
//! 10 0 11 15 12 28        % pairs
//! << /Type /Page ... >>   % object 10 at /First + 0
//! [1 2 3]                 % object 11 at /First + 15
//! ```

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;

/// Objects unpacked from one object stream, in stream order.
#[derive(Debug, Clone, Default)]
pub struct ObjectStream {
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    /// Object stored at `index` if its number is `id`, else the first object numbered `id`.
    ///
    /// Cross-reference streams address compressed objects by index, but a
    /// stale index is common enough after careless rewrites that the number
    /// is checked too.
    pub fn get(&self, id: u32, index: u32) -> Option<&Object> {
        match self.objects.get(index as usize) {
            Some((num, obj)) if *num == id => Some(obj),
            _ => self.objects.iter().find(|(num, _)| *num == id).map(|(_, obj)| obj),
        }
    }

    /// Number of objects in the stream.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the stream holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Unpack every object of an object stream.
///
/// An object that fails to parse is kept as `null` so later indices stay valid.
pub fn parse_object_stream(stream_obj: &Object) -> Result<ObjectStream> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
        if kind != "ObjStm" {
            return Err(Error::InvalidPdf(format!("expected /Type /ObjStm, got /{}", kind)));
        }
    }

    let n = dict
        .get("N")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N entry".to_string()))?;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First entry".to_string()))?;
    if !(0..=1_000_000).contains(&n) || first < 0 {
        return Err(Error::InvalidPdf(format!("invalid object stream header /N {} /First {}", n, first)));
    }
    let first = first as usize;

    let decoded = stream_obj.decode_stream_data()?;
    if decoded.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream data too short: {} bytes, /First is {}",
            decoded.len(),
            first
        )));
    }

    let pairs = parse_pairs(&decoded[..first], n as usize)?;
    let body = &decoded[first..];
    let objects = pairs
        .into_iter()
        .map(|(num, offset)| {
            let obj = match body.get(offset..).map(parse_object) {
                Some(Ok((_, obj))) => obj,
                _ => {
                    log::warn!("Object {} at offset {} in object stream is unreadable", num, offset);
                    Object::Null
                },
            };
            (num, obj)
        })
        .collect();

    Ok(ObjectStream { objects })
}

fn parse_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    let mut input = data;
    for i in 0..count {
        let mut next_int = || match token(input) {
            Ok((rest, Token::Integer(v))) if v >= 0 => {
                input = rest;
                Ok(v)
            },
            _ => Err(Error::ParseError {
                offset: data.len() - input.len(),
                reason: format!("object stream pair {} is malformed", i),
            }),
        };
        let num = next_int()?;
        let offset = next_int()?;
        pairs.push((num as u32, offset as usize));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dictionary;

    fn objstm(header: &str, body: &str, n: i64) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("ObjStm"));
        dict.insert("N".to_string(), Object::Integer(n));
        dict.insert("First".to_string(), Object::Integer(header.len() as i64));
        Object::Stream {
            dict,
            data: bytes::Bytes::from(format!("{}{}", header, body)),
        }
    }

    #[test]
    fn test_unpack() {
        let stream = objstm("10 0 11 21 ", "<< /Type /Catalog >> [1 2 3]", 2);
        let unpacked = parse_object_stream(&stream).unwrap();
        assert_eq!(unpacked.len(), 2);
        assert_eq!(unpacked.get(10, 0).unwrap().as_dict().unwrap()["Type"].as_name(), Some("Catalog"));
        assert_eq!(unpacked.get(11, 1).unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_stale_index_falls_back_to_number() {
        let stream = objstm("10 0 11 21 ", "<< /Type /Catalog >> [1 2 3]", 2);
        let unpacked = parse_object_stream(&stream).unwrap();
        assert!(unpacked.get(11, 0).unwrap().as_array().is_some());
        assert!(unpacked.get(12, 0).is_none());
    }

    #[test]
    fn test_missing_n() {
        let mut stream = objstm("1 0 ", "null", 1);
        stream.as_dict_mut().unwrap().remove("N");
        assert!(parse_object_stream(&stream).is_err());
    }

    #[test]
    fn test_not_a_stream() {
        assert!(matches!(
            parse_object_stream(&Object::Integer(1)),
            Err(Error::InvalidObjectType { .. })
        ));
    }

    #[test]
    fn test_short_header() {
        let stream = objstm("1 0 ", "null", 2);
        assert!(parse_object_stream(&stream).is_err());
    }
}

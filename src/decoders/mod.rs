//! Stream decoders.
//!
//! Signing never touches page content, so only the filters that structural
//! streams (cross-reference streams, object streams) use in practice are
//! implemented here.

mod flate;
mod predictor;

pub use flate::FlateDecoder;
pub use predictor::{decode_predictor, DecodeParams};

use crate::error::{Error, Result};

/// A single PDF stream filter.
pub trait StreamDecoder {
    /// Decode `input`, returning the filtered bytes.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// ASCIIHexDecode filter.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut digits: Vec<u8> = input
            .iter()
            .copied()
            .take_while(|&b| b != b'>')
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if digits.len() % 2 == 1 {
            digits.push(b'0');
        }
        hex::decode(&digits).map_err(|e| Error::Decode(format!("ASCIIHexDecode: {}", e)))
    }
}

/// Run `data` through the named filters in order, then undo any predictor.
pub fn decode_stream(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for filter in filters {
        let decoder: Box<dyn StreamDecoder> = match filter.as_str() {
            "FlateDecode" | "Fl" => Box::new(FlateDecoder),
            "ASCIIHexDecode" | "AHx" => Box::new(AsciiHexDecoder),
            other => return Err(Error::Unsupported(format!("stream filter /{}", other))),
        };
        current = decoder.decode(&current)?;
    }

    match params {
        Some(p) if p.predictor > 1 => decode_predictor(&current, p),
        _ => Ok(current),
    }
}

//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of PDF byte streams: numbers, literal and
//! hexadecimal strings, names, keywords and delimiters. Whitespace
//! (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),
    /// Real number (e.g., 3.14, -.5)
    Real(f64),
    /// Raw literal string content, escapes not yet decoded
    LiteralString(&'a [u8]),
    /// Raw hexadecimal string content, whitespace preserved
    HexString(&'a [u8]),
    /// Name with `#xx` escapes decoded
    Name(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    ObjStart,
    /// `endobj`
    ObjEnd,
    /// `stream`
    StreamStart,
    /// `endstream`
    StreamEnd,
    /// `R` (as in `10 0 R`)
    R,
}

/// PDF whitespace (ISO 32000-1, Table 1).
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiters (ISO 32000-1, Table 2).
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip any run of whitespace and comments.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let (after_ws, _) = take_while(is_whitespace)(rest)?;
        rest = after_ws;
        match comment(rest) {
            Ok((after_comment, _)) => rest = after_comment,
            Err(_) => return Ok((rest, ())),
        }
    }
}

fn number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;

    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));
    let text = std::str::from_utf8(text).map_err(|_| fail())?;

    if text.contains('.') {
        let normalized = text.trim_start_matches('+');
        let real: f64 = normalized.parse().map_err(|_| fail())?;
        Ok((rest, Token::Real(real)))
    } else {
        let int: i64 = text.trim_start_matches('+').parse().map_err(|_| fail())?;
        Ok((rest, Token::Integer(int)))
    }
}

/// Balanced-parenthesis literal string; returns the raw bytes between the outer parens.
fn literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], Token::LiteralString(&body[..i])));
                }
            },
            _ => {},
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    delimited(
        char('<'),
        map(take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)), Token::HexString),
        char('>'),
    )(input)
}

/// Decode `#xx` escape sequences in a name (ISO 32000-1, 7.3.5).
///
/// ```
/// # use pdf_seal::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B"), "A B");
/// assert_eq!(decode_name_escapes(b"Sig"), "Sig");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(byte) = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(take_while(|c| !is_whitespace(c) && !is_delimiter(c)), |raw: &[u8]| {
            Token::Name(decode_name_escapes(raw))
        }),
    )(input)
}

/// Keywords must not run into a following regular character (`nullx` is not `null`).
fn keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, word) = take_while1(|c: u8| c.is_ascii_alphabetic())(input)?;
    let tok = match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
        },
    };
    Ok((rest, tok))
}

fn delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

/// Parse a single PDF token after skipping whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;
    alt((delimiter, keyword, name, number, literal_string, hex_string))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &[u8]) -> Token<'_> {
        token(input).unwrap().1
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tok(b"42"), Token::Integer(42));
        assert_eq!(tok(b"-123"), Token::Integer(-123));
        assert_eq!(tok(b"+17"), Token::Integer(17));
        assert_eq!(tok(b"0000012345"), Token::Integer(12345));
        assert_eq!(tok(b"-2.5"), Token::Real(-2.5));
        assert_eq!(tok(b".5"), Token::Real(0.5));
        assert_eq!(tok(b"5."), Token::Real(5.0));
        assert_eq!(tok(b"-.002"), Token::Real(-0.002));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tok(b"(Hello (nested) World)"), Token::LiteralString(b"Hello (nested) World"));
        assert_eq!(tok(b"(a\\)b)"), Token::LiteralString(b"a\\)b"));
        assert_eq!(tok(b"<48 65>"), Token::HexString(b"48 65"));
        assert!(token(b"(unterminated").is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(tok(b"/Type"), Token::Name("Type".to_string()));
        assert_eq!(tok(b"/adbe.pkcs7.detached"), Token::Name("adbe.pkcs7.detached".to_string()));
        assert_eq!(tok(b"/A#20B"), Token::Name("A B".to_string()));
        let (rest, t) = token(b"/Sig/Next").unwrap();
        assert_eq!(t, Token::Name("Sig".to_string()));
        assert_eq!(rest, b"/Next");
    }

    #[test]
    fn test_keywords_and_delimiters() {
        assert_eq!(tok(b"<<"), Token::DictStart);
        assert_eq!(tok(b">>"), Token::DictEnd);
        assert_eq!(tok(b"["), Token::ArrayStart);
        assert_eq!(tok(b"endobj"), Token::ObjEnd);
        assert_eq!(tok(b"endstream"), Token::StreamEnd);
        assert_eq!(tok(b"stream\n"), Token::StreamStart);
        assert_eq!(tok(b"R"), Token::R);
        assert_eq!(tok(b"null"), Token::Null);
        assert!(token(b"nullx").is_err());
    }

    #[test]
    fn test_skips_comments_and_whitespace() {
        assert_eq!(tok(b"  % comment\r\n\t 7"), Token::Integer(7));
        assert_eq!(tok(b"%a\n%b\n/X"), Token::Name("X".to_string()));
    }
}

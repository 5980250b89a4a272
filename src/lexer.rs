//! Token scanner for pdfmark values.
//!
//! Pdfmark parameters arrive as raw PostScript/PDF value syntax: numbers,
//! names, literal and hex strings, arrays, dictionaries and `{name}` object
//! references. The handlers only ever need to find token boundaries inside
//! those values, so tokens here are spans into the input rather than decoded
//! objects.
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.

use nom::{
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::char,
    combinator::value,
    number::complete::double,
    sequence::preceded,
    IResult,
};

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Integer or real number
    Number,
    /// Name including the leading `/`
    Name,
    /// Literal string including its parentheses
    LiteralString,
    /// Hex string including its angle brackets
    HexString,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `{name}` object-name reference
    ObjName,
    /// Any other run of regular characters (`R`, `null`, `pdfmark`, ...)
    Keyword,
}

/// A token: its kind and the exact bytes it spans in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token classification
    pub kind: TokenKind,
    /// Source bytes of the token
    pub text: &'a [u8],
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn fail<T>(input: &[u8], kind: nom::error::ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Parse a comment (% to end of line).
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut remaining = input;
    loop {
        let (rest, _) = take_while(is_whitespace)(remaining)?;
        remaining = rest;
        match comment(remaining) {
            Ok((rest, _)) => remaining = rest,
            Err(_) => break,
        }
    }
    Ok((remaining, ()))
}

/// Length of a literal string starting at `input[0] == b'('`, parentheses included.
fn literal_string_len(input: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < input.len() {
        match input[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + 1);
                }
            },
            _ => {},
        }
        pos += 1;
    }
    None
}

fn span<'a>(input: &'a [u8], len: usize, kind: TokenKind) -> IResult<&'a [u8], Token<'a>> {
    Ok((&input[len..], Token { kind, text: &input[..len] }))
}

/// Scan a single token after skipping whitespace and comments.
///
/// Fails at end of input or on an unbalanced string.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;
    let Some(&first) = input.first() else {
        return fail(input, nom::error::ErrorKind::Eof);
    };
    match first {
        b'(' => match literal_string_len(input) {
            Some(len) => span(input, len, TokenKind::LiteralString),
            None => fail(input, nom::error::ErrorKind::Tag),
        },
        b'<' if input.get(1) == Some(&b'<') => span(input, 2, TokenKind::DictStart),
        b'<' => match input.iter().position(|&c| c == b'>') {
            Some(end) => span(input, end + 1, TokenKind::HexString),
            None => fail(input, nom::error::ErrorKind::Tag),
        },
        b'>' if input.get(1) == Some(&b'>') => span(input, 2, TokenKind::DictEnd),
        b'[' => span(input, 1, TokenKind::ArrayStart),
        b']' => span(input, 1, TokenKind::ArrayEnd),
        b'{' => match input.iter().position(|&c| c == b'}') {
            Some(end) => span(input, end + 1, TokenKind::ObjName),
            None => fail(input, nom::error::ErrorKind::Tag),
        },
        b'/' => {
            let (_, name) = take_while(is_regular)(&input[1..])?;
            span(input, name.len() + 1, TokenKind::Name)
        },
        c if is_regular(c) => {
            let (_, word) = take_while1(is_regular)(input)?;
            let kind = if parse_number(word).is_some() {
                TokenKind::Number
            } else {
                TokenKind::Keyword
            };
            span(input, word.len(), kind)
        },
        _ => fail(input, nom::error::ErrorKind::Char),
    }
}

/// Scan one complete value: a single token, a balanced `[...]` or
/// `<<...>>` group, or an `int int R` indirect reference.
///
/// Returns the exact source span of the value.
pub fn composite(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (trimmed, _) = skip_ws(input)?;
    let start = input.len() - trimmed.len();
    let (mut rest, first) = token(input)?;
    match first.kind {
        TokenKind::ArrayStart | TokenKind::DictStart => {
            let mut depth = 1usize;
            while depth > 0 {
                let (next, tok) = token(rest)?;
                match tok.kind {
                    TokenKind::ArrayStart | TokenKind::DictStart => depth += 1,
                    TokenKind::ArrayEnd | TokenKind::DictEnd => depth -= 1,
                    _ => {},
                }
                rest = next;
            }
        },
        TokenKind::Number => {
            if let Some(after) = reference_tail(rest) {
                rest = after;
            }
        },
        _ => {},
    }
    let end = input.len() - rest.len();
    Ok((rest, &input[start..end]))
}

/// Matches ` int R` following an integer, returning the input after `R`.
fn reference_tail(input: &[u8]) -> Option<&[u8]> {
    let (rest, gen) = token(input).ok()?;
    if gen.kind != TokenKind::Number || !gen.text.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let (rest, r) = token(rest).ok()?;
    (r.kind == TokenKind::Keyword && r.text == b"R").then_some(rest)
}

/// Parse a finite real number, PostScript style (no `inf`/`nan`).
pub fn parse_number(text: &[u8]) -> Option<f64> {
    if !text
        .iter()
        .all(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    match double::<_, nom::error::Error<&[u8]>>(text) {
        Ok((rest, v)) if rest.is_empty() && v.is_finite() => Some(v),
        _ => None,
    }
}

/// Parse one whitespace-separated number, skipping leading whitespace.
pub fn number(input: &[u8]) -> IResult<&[u8], f64> {
    let (input, _) = skip_ws(input)?;
    let (rest, word) = take_while1(|c: u8| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E'))(input)?;
    match parse_number(word) {
        Some(v) => Ok((rest, v)),
        None => fail(input, nom::error::ErrorKind::Float),
    }
}

/// Decode `#XX` escape sequences in a name (without its leading `/`).
///
/// # Examples
///
/// ```
/// # use pdfmark_oxide::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"Type"), "Type");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(name: &[u8]) -> String {
    let mut out = Vec::with_capacity(name.len());
    let mut i = 0;
    while i < name.len() {
        if name[i] == b'#' && i + 2 < name.len() {
            let hex = std::str::from_utf8(&name[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(name[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Decode the body of a literal string token, `(` and `)` included.
///
/// Handles the standard escapes, octal escapes and line continuations.
pub fn decode_literal_string(token: &[u8]) -> Vec<u8> {
    let body = token
        .strip_prefix(b"(")
        .and_then(|b| b.strip_suffix(b")"))
        .unwrap_or(token);
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        i += 1;
        if c != b'\\' || i >= body.len() {
            out.push(c);
            continue;
        }
        let e = body[i];
        i += 1;
        match e {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\r' => {
                if body.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                let mut v = u32::from(e - b'0');
                for _ in 0..2 {
                    match body.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            v = v * 8 + u32::from(d - b'0');
                            i += 1;
                        },
                        _ => break,
                    }
                }
                out.push((v & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }
    out
}

/// Decode a hex string token, `<` and `>` included. An odd digit count is
/// padded with 0.
pub fn decode_hex_string(token: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = token
        .iter()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => c - b'A' + 10,
        })
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

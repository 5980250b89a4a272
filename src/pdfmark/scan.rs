//! Fixed-shape value scanners.
//!
//! Integers, rectangles, borders and destination strings embedded in mark
//! parameters. Every scanner bounds its input length first; the limits are
//! the ones Distiller-compatible producers have always used.

use std::borrow::Cow;

use nom::character::complete::char;
use nom::IResult;

use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};
use crate::lexer::{self, decode_literal_string, skip_ws};
use crate::writer::format_real;

/// Longest accepted integer value.
pub const MAX_INT_STRING: usize = 20;
/// Longest accepted `/Rect` value.
pub const MAX_RECT_STRING: usize = 100;
/// Longest accepted `/Border` value, before and after transformation.
pub const MAX_BORDER_STRING: usize = 100;
/// Longest destination string the resolver will build.
pub const MAX_DEST_STRING: usize = 80;

/// Parse the leading decimal integer of a value.
///
/// # Examples
///
/// ```
/// # use pdfmark_oxide::pdfmark::scan::scan_int;
/// assert_eq!(scan_int(b" 12").unwrap(), 12);
/// assert_eq!(scan_int(b"-3 0 R").unwrap(), -3);
/// assert!(scan_int(b"/Next").is_err());
/// ```
pub fn scan_int(text: &[u8]) -> Result<i64> {
    if text.len() > MAX_INT_STRING {
        return Err(Error::limit("integer value too long"));
    }
    let start = text.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(text.len());
    let body = &text[start..];
    let sign_len = usize::from(matches!(body.first(), Some(b'+' | b'-')));
    let digits = body[sign_len..].iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Err(Error::range(format!(
            "not an integer: {}",
            String::from_utf8_lossy(text)
        )));
    }
    std::str::from_utf8(&body[..sign_len + digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::limit("integer out of range"))
}

fn rect_numbers(input: &[u8]) -> IResult<&[u8], [f64; 4]> {
    let (input, _) = char('[')(input)?;
    let (input, x0) = lexer::number(input)?;
    let (input, y0) = lexer::number(input)?;
    let (input, x1) = lexer::number(input)?;
    let (input, y1) = lexer::number(input)?;
    let (input, _) = skip_ws(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, [x0, y0, x1, y1]))
}

fn is_blank(rest: &[u8]) -> bool {
    rest.iter().all(|c| c.is_ascii_whitespace() || *c == 0)
}

/// Scan a `[x0 y0 x1 y1]` value, transforming both corners as points.
pub fn scan_rect(text: &[u8], ctm: &Matrix) -> Result<Rect> {
    if text.len() > MAX_RECT_STRING {
        return Err(Error::limit("/Rect value too long"));
    }
    match rect_numbers(text) {
        Ok((rest, [x0, y0, x1, y1])) if is_blank(rest) => {
            let p = ctm.transform_point(x0, y0);
            let q = ctm.transform_point(x1, y1);
            Ok(Rect { p, q })
        },
        _ => Err(Error::range(format!(
            "malformed /Rect {}",
            String::from_utf8_lossy(text)
        ))),
    }
}

/// Format a rectangle as `[x0 y0 x1 y1]`.
pub fn format_rect(rect: &Rect) -> String {
    let [x0, y0, x1, y1] = rect.to_array();
    format!(
        "[{} {} {} {}]",
        format_real(x0),
        format_real(y0),
        format_real(x1),
        format_real(y1)
    )
}

/// Numbers up to a closing `]`, which is consumed.
fn dash_numbers(mut input: &[u8]) -> Option<(&[u8], Vec<f64>)> {
    let mut dashes = Vec::new();
    loop {
        let (rest, _) = skip_ws(input).ok()?;
        if let Some(after) = rest.strip_prefix(b"]") {
            return Some((after, dashes));
        }
        let (rest, v) = lexer::number(rest).ok()?;
        dashes.push(v);
        input = rest;
    }
}

fn border_values(text: &[u8]) -> Option<([f64; 3], Vec<f64>)> {
    let (input, _) = char::<_, nom::error::Error<&[u8]>>('[')(text).ok()?;
    let (input, h) = lexer::number(input).ok()?;
    let (input, v) = lexer::number(input).ok()?;
    let (input, c) = lexer::number(input).ok()?;
    let (input, _) = skip_ws(input).ok()?;

    // Dash array either nested, `[h v c [d ...]]`, or trailing, `[h v c] [d ...]`.
    let (rest, dashes) = if let Some(inner) = input.strip_prefix(b"[") {
        let (rest, dashes) = dash_numbers(inner)?;
        let (rest, _) = skip_ws(rest).ok()?;
        (rest.strip_prefix(b"]")?, dashes)
    } else {
        let rest = input.strip_prefix(b"]")?;
        let (rest, _) = skip_ws(rest).ok()?;
        match rest.strip_prefix(b"[") {
            Some(inner) => dash_numbers(inner)?,
            None => (rest, Vec::new()),
        }
    };
    is_blank(rest).then_some(([h, v, c], dashes))
}

/// Rewrite a `/Border` value for the target transform.
///
/// The radii and the corner width are transformed as distances and reduced
/// to non-negative magnitudes; an optional dash array comes out nested as
/// the fourth element.
pub fn write_border(text: &[u8], ctm: &Matrix) -> Result<String> {
    if text.len() > MAX_BORDER_STRING {
        return Err(Error::limit("/Border value too long"));
    }
    let Some(([h, v, c], dashes)) = border_values(text) else {
        return Err(Error::range(format!(
            "malformed /Border {}",
            String::from_utf8_lossy(text)
        )));
    };
    let bpt = ctm.transform_distance(h, v);
    let cpt = ctm.transform_distance(0.0, c);
    let mut out = format!(
        "[{} {} {}",
        format_real(bpt.x.abs()),
        format_real(bpt.y.abs()),
        format_real((cpt.x + cpt.y).abs())
    );
    if !dashes.is_empty() {
        let scaled: Vec<String> = dashes
            .iter()
            .map(|&d| {
                let vpt = ctm.transform_distance(0.0, d);
                format_real((vpt.x + vpt.y).abs())
            })
            .collect();
        out.push_str(" [");
        out.push_str(&scaled.join(" "));
        out.push(']');
    }
    out.push(']');
    if out.len() > MAX_BORDER_STRING {
        return Err(Error::limit("transformed /Border value too long"));
    }
    Ok(out)
}

fn push_name_byte(out: &mut Vec<u8>, byte: u8) {
    let regular = (0x21..=0x7E).contains(&byte)
        && !matches!(
            byte,
            b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
        );
    if regular {
        out.push(byte);
    } else {
        out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
    }
}

/// Turn a string destination `(name)` into the name `/name`.
///
/// Named and string destinations are interchangeable in PDF; names are the
/// more widely understood form. Non-string values come back unchanged.
///
/// # Examples
///
/// ```
/// # use pdfmark_oxide::pdfmark::scan::coerce_dest;
/// assert_eq!(coerce_dest(b"(chapter1)").as_ref(), b"/chapter1");
/// assert_eq!(coerce_dest(b"(two words)").as_ref(), b"/two#20words");
/// assert_eq!(coerce_dest(b"[3 0 R /Fit]").as_ref(), b"[3 0 R /Fit]");
/// ```
pub fn coerce_dest(value: &[u8]) -> Cow<'_, [u8]> {
    if value.first() != Some(&b'(') {
        return Cow::Borrowed(value);
    }
    let decoded = decode_literal_string(value);
    let mut out = Vec::with_capacity(decoded.len() + 1);
    out.push(b'/');
    for byte in decoded {
        push_name_byte(&mut out, byte);
    }
    Cow::Owned(out)
}

/// Rewrite escaped newlines in a `/Contents` string as escaped carriage
/// returns. Both `\n` and `\012` spellings are recognized; an escaped
/// backslash is never the start of one.
pub fn rewrite_contents_newlines(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i] != b'\\' || i + 1 >= value.len() {
            out.push(value[i]);
            i += 1;
            continue;
        }
        let rest = &value[i + 1..];
        if rest.starts_with(b"n") {
            out.extend_from_slice(b"\\r");
            i += 2;
        } else if rest.starts_with(b"012") {
            out.extend_from_slice(b"\\r");
            i += 4;
        } else {
            out.extend_from_slice(&value[i..i + 2]);
            i += 2;
        }
    }
    out
}

/// Spell the short escapes `\b \f \n \r \t` as three-digit octal escapes.
pub fn normalize_escapes(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + value.len() / 2);
    let mut i = 0;
    while i < value.len() {
        let c = value[i];
        i += 1;
        out.push(c);
        if c != b'\\' || i >= value.len() {
            continue;
        }
        let octal: &[u8] = match value[i] {
            b'b' => b"010",
            b'f' => b"014",
            b'n' => b"012",
            b'r' => b"015",
            b't' => b"011",
            other => {
                out.push(other);
                i += 1;
                continue;
            },
        };
        out.extend_from_slice(octal);
        i += 1;
    }
    out
}

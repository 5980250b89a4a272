//! Parameter list normalization.
//!
//! A mark arrives as a flat list of value strings: keys (`/Name`) at even
//! positions and their values at odd ones, except for the few mark types
//! that take positional operands. This module parses the mark's transform,
//! pulls out the `/_objdef` object name and substitutes `{name}` tokens with
//! indirect references.

use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::lexer::{self, decode_name_escapes, TokenKind};

/// Longest transform string accepted.
const MAX_CTM_STRING: usize = 199;

/// Whether `key` is the name `/name`.
pub fn key_eq(key: &[u8], name: &str) -> bool {
    key.strip_prefix(b"/") == Some(name.as_bytes())
}

/// Dictionary key for a `/Name` parameter: sigil dropped, `#XX` decoded.
pub fn key_name(key: &[u8]) -> String {
    decode_name_escapes(key.strip_prefix(b"/").unwrap_or(key))
}

/// Iterate over `(key, value)` pairs; a trailing unpaired value is ignored.
pub fn pairs(params: &[Vec<u8>]) -> impl Iterator<Item = (&[u8], &[u8])> {
    params
        .chunks_exact(2)
        .map(|pair| (pair[0].as_slice(), pair[1].as_slice()))
}

/// Value of the first pair whose key is `/name`.
pub fn find_key<'a>(params: &'a [Vec<u8>], name: &str) -> Option<&'a [u8]> {
    pairs(params).find(|(k, _)| key_eq(k, name)).map(|(_, v)| v)
}

/// Parse a `[a b c d e f]` transform.
///
/// # Examples
///
/// ```
/// # use pdfmark_oxide::pdfmark::params::parse_ctm;
/// let m = parse_ctm(b"[10 0 0 10 5 7]").unwrap();
/// assert_eq!((m.a, m.e, m.f), (10.0, 5.0, 7.0));
/// assert!(parse_ctm(b"[1 0 0 1]").is_err());
/// ```
pub fn parse_ctm(text: &[u8]) -> Result<Matrix> {
    if text.len() > MAX_CTM_STRING {
        return Err(Error::range("transform string too long"));
    }
    let malformed = || Error::range(format!("malformed transform {}", String::from_utf8_lossy(text)));
    let body = text
        .strip_prefix(b"[")
        .and_then(|t| t.iter().rposition(|&c| c == b']').map(|end| &t[..end]))
        .ok_or_else(malformed)?;
    let mut v = [0.0f64; 6];
    let mut rest = body;
    for slot in v.iter_mut() {
        let (next, n) = lexer::number(rest).map_err(|_| malformed())?;
        *slot = n;
        rest = next;
    }
    if !rest.iter().all(|c| c.is_ascii_whitespace()) {
        return Err(malformed());
    }
    Ok(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

/// Whether `name` is a valid `{name}` object name: at least `{}` long,
/// opening with `{` and closing with the only `}`.
pub fn is_valid_objname(name: &[u8]) -> bool {
    name.len() >= 2
        && name[0] == b'{'
        && name.iter().position(|&c| c == b'}') == Some(name.len() - 1)
}

/// Remove the `/_objdef {name}` pair, returning the validated name.
pub fn extract_objname(params: &mut Vec<Vec<u8>>) -> Result<Option<Vec<u8>>> {
    let Some(idx) = (0..params.len().saturating_sub(1))
        .step_by(2)
        .find(|&i| key_eq(&params[i], "_objdef"))
    else {
        return Ok(None);
    };
    let name = params[idx + 1].clone();
    if !is_valid_objname(&name) {
        return Err(Error::range(format!(
            "invalid object name {}",
            String::from_utf8_lossy(&name)
        )));
    }
    params.drain(idx..idx + 2);
    Ok(Some(name))
}

/// Replace every `{name}` token in `value` with `resolve(name)`.
///
/// Strings are skipped whole, so braces inside `( ... )` are left alone.
/// Returns `None` when the value contains no object names.
pub fn replace_names<F>(value: &[u8], mut resolve: F) -> Result<Option<Vec<u8>>>
where
    F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
    if !value.contains(&b'{') {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(value.len() + 8);
    let mut copied = 0;
    let mut rest = value;
    let mut replaced = false;
    while let Ok((next, tok)) = lexer::token(rest) {
        if tok.kind == TokenKind::ObjName {
            let start = value.len() - next.len() - tok.text.len();
            out.extend_from_slice(&value[copied..start]);
            out.extend_from_slice(&resolve(tok.text)?);
            copied = start + tok.text.len();
            replaced = true;
        }
        rest = next;
    }
    if !replaced {
        return Ok(None);
    }
    out.extend_from_slice(&value[copied..]);
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_objname_grammar() {
        assert!(is_valid_objname(b"{obj}"));
        assert!(is_valid_objname(b"{}"));
        assert!(!is_valid_objname(b"obj"));
        assert!(!is_valid_objname(b"{a}b}"));
        assert!(!is_valid_objname(b"{open"));
    }

    #[test]
    fn test_extract_objname() {
        let mut params = strings(&["/Rect", "[0 0 1 1]", "/_objdef", "{ann}", "/Subtype", "/Text"]);
        let name = extract_objname(&mut params).unwrap();
        assert_eq!(name.as_deref(), Some(&b"{ann}"[..]));
        assert_eq!(params, strings(&["/Rect", "[0 0 1 1]", "/Subtype", "/Text"]));

        let mut bad = strings(&["/_objdef", "ann"]);
        assert!(matches!(extract_objname(&mut bad), Err(Error::RangeCheck(_))));
    }

    #[test]
    fn test_find_key_pairs_only() {
        let params = strings(&["/Title", "(x)", "/Page", "3"]);
        assert_eq!(find_key(&params, "Page"), Some(&b"3"[..]));
        assert_eq!(find_key(&params, "View"), None);
        // Values are never matched as keys.
        let params = strings(&["/A", "/Page", "/B", "1"]);
        assert_eq!(find_key(&params, "Page"), None);
    }

    #[test]
    fn test_replace_names_skips_strings() {
        let out = replace_names(b"[{a} ({b}) {c}]", |name| {
            Ok(if name == b"{a}" { b"4 0 R".to_vec() } else { b"9 0 R".to_vec() })
        })
        .unwrap()
        .unwrap();
        assert_eq!(out, b"[4 0 R ({b}) 9 0 R]");
        assert!(replace_names(b"(only {string})", |_| Ok(Vec::new())).unwrap().is_none());
    }

    #[test]
    fn test_parse_ctm_rejects_garbage() {
        assert!(parse_ctm(b"[1 0 0 1 0 0]").is_ok());
        assert!(parse_ctm(b"[1 0 0 1 0 0 0]").is_err());
        assert!(parse_ctm(b"1 0 0 1 0 0").is_err());
        assert!(parse_ctm(format!("[{}]", "1 ".repeat(120)).as_bytes()).is_err());
    }

    #[test]
    fn test_key_helpers() {
        assert!(key_eq(b"/Rect", "Rect"));
        assert!(!key_eq(b"Rect", "Rect"));
        assert_eq!(key_name(b"/My#20Key"), "My Key");
    }
}

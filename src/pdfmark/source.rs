//! Reading pdfmarks from PostScript source.
//!
//! Only the pdfmark subset of PostScript is understood: a `[` opens a mark,
//! the values that follow are its parameters, and `/TYPE pdfmark` closes it.
//! `showpage` ends the current page. Every other token is skipped, so a
//! pdfmark file produced by a document tool can be fed in as is.

use crate::error::{Error, Result};
use crate::lexer::{self, TokenKind};
use crate::writer::ObjectGraph;

use super::PdfmarkProcessor;

/// One instruction read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `[ params /Name pdfmark`
    Mark {
        /// Mark type without the slash
        name: String,
        /// Parameters in source order
        params: Vec<Vec<u8>>,
    },
    /// `showpage`
    ShowPage,
}

/// Counts from [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Marks processed without error
    pub marks: usize,
    /// Marks rejected with a non-fatal error
    pub errors: usize,
    /// Pages ended by `showpage`
    pub pages: usize,
}

/// Split PostScript source into directives.
///
/// # Examples
///
/// ```
/// use pdfmark_oxide::pdfmark::source::{parse, Directive};
///
/// let directives = parse(b"[ /Title (Intro) /OUT pdfmark showpage").unwrap();
/// assert_eq!(directives.len(), 2);
/// assert_eq!(directives[1], Directive::ShowPage);
/// ```
pub fn parse(input: &[u8]) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    let mut open: Option<Vec<Vec<u8>>> = None;
    let mut rest = input;

    while let Ok((next, tok)) = lexer::token(rest) {
        let Some(params) = open.as_mut() else {
            rest = next;
            match tok.kind {
                TokenKind::ArrayStart => open = Some(Vec::new()),
                TokenKind::Keyword if tok.text == b"showpage" => directives.push(Directive::ShowPage),
                _ => {},
            }
            continue;
        };
        match tok.kind {
            TokenKind::Keyword if tok.text == b"pdfmark" => {
                rest = next;
                let mut params = open.take().unwrap_or_default();
                let name = match params.pop() {
                    Some(last) if last.starts_with(b"/") => String::from_utf8_lossy(&last[1..]).into_owned(),
                    _ => {
                        log::warn!("pdfmark without a type name; skipped");
                        continue;
                    },
                };
                directives.push(Directive::Mark { name, params });
            },
            TokenKind::ArrayEnd => {
                rest = next;
                log::warn!("unmatched ] inside a pdfmark; {} values discarded", params.len());
                open = None;
            },
            _ => {
                let (after, value) = lexer::composite(rest)
                    .map_err(|_| Error::range("malformed value in pdfmark source"))?;
                params.push(value.to_vec());
                rest = after;
            },
        }
    }

    if open.is_some() {
        return Err(Error::range("pdfmark source ends inside a mark"));
    }
    Ok(directives)
}

/// Read `input` and feed every directive to `processor`.
///
/// Marks are given the device transform for the configured resolution, so
/// coordinates in the source are in default user space. A mark that fails
/// with a non-fatal error is logged and skipped; a fatal error stops the run.
pub fn run<G: ObjectGraph>(processor: &mut PdfmarkProcessor<G>, input: &[u8]) -> Result<SourceStats> {
    let [res_x, res_y] = processor.config().resolution;
    let ctm = format!("[{} 0 0 {} 0 0]", res_x / 72.0, res_y / 72.0);
    let mut stats = SourceStats::default();

    for directive in parse(input)? {
        match directive {
            Directive::ShowPage => {
                processor.end_page();
                stats.pages += 1;
            },
            Directive::Mark { name, params } => match processor.process_mark(&name, &params, ctm.as_bytes()) {
                Ok(()) => stats.marks += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    log::warn!("/{} pdfmark failed: {}", name, err);
                    stats.errors += 1;
                },
            },
        }
    }
    log::info!(
        "processed {} marks ({} rejected) over {} pages",
        stats.marks,
        stats.errors,
        stats.pages
    );
    Ok(stats)
}

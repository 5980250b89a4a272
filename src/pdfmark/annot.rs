//! Annotation and outline entry dictionaries.
//!
//! Annotations (`/ANN`, `/LNK`) and outline entries (`/OUT`) share one
//! translation of their pairs: renamed keys, transformed geometry, and the
//! deferred `/Action`, `/File`, `/Dest` and `/URI` keys that are combined
//! into an action dictionary or written at the top level.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::object::{Dictionary, Object};
use crate::writer::ObjectGraph;

use super::compliance::Verdict;
use super::named::NamedObject;
use super::objects::dict_pairs;
use super::params::{key_eq, key_name, pairs};
use super::scan::{
    coerce_dest, format_rect, normalize_escapes, rewrite_contents_newlines, scan_int, scan_rect, write_border,
};
use super::{Mark, PdfmarkProcessor};

lazy_static! {
    /// An action given as a bare indirect reference, `12 0 R`.
    static ref RE_ACTION_REFERENCE: Regex = Regex::new(r"^\s*-?\d+\s+-?\d+\s+R").unwrap();
}

/// Longest action value checked for a bare reference.
const MAX_REFERENCE_ACTION: usize = 30;

/// Options and results of [`PdfmarkProcessor::put_ao_pairs`].
#[derive(Debug, Default)]
pub(crate) struct AoParams {
    /// `/Subtype` written when the pairs name none
    pub subtype: Option<&'static str>,
    /// Zero-based page from `/SrcPg`
    pub src_pg: Option<i64>,
}

impl<G: ObjectGraph> PdfmarkProcessor<G> {
    /// Translate annotation or outline pairs into `dict`.
    pub(crate) fn put_ao_pairs(
        &mut self,
        dict: &mut Dictionary,
        params: &[Vec<u8>],
        ctm: &Matrix,
        ao: &mut AoParams,
        for_outline: bool,
    ) -> Result<()> {
        let mut action: Option<&[u8]> = None;
        let mut file: Option<&[u8]> = None;
        let mut uri: Option<&[u8]> = None;
        let mut dest: Option<Vec<u8>> = None;
        let mut subtype: Option<Vec<u8>> = ao.subtype.map(|s| format!("/{}", s).into_bytes());
        let mut coerce = false;

        for (key, value) in pairs(params) {
            if key_eq(key, "SrcPg") {
                if let Ok(page) = scan_int(value) {
                    ao.src_pg = Some(page.saturating_sub(1));
                    continue;
                }
            }
            if !for_outline && key_eq(key, "Color") {
                dict.insert("C".to_string(), Object::raw(value));
            } else if !for_outline && key_eq(key, "Title") {
                dict.insert("T".to_string(), Object::raw(value));
            } else if key_eq(key, "Action") || key_eq(key, "A") {
                action = Some(value);
            } else if key_eq(key, "File") {
                // At the top level /F is the annotation flags, never a file.
                file = Some(value);
            } else if key_eq(key, "Dest") {
                dest = Some(value.to_vec());
                coerce = true;
            } else if key_eq(key, "URI") {
                uri = Some(value);
            } else if key_eq(key, "Page") || key_eq(key, "View") {
                if dest.is_none() {
                    match self.make_dest(params, "Page", "View", false) {
                        Ok((made, _)) => {
                            dest = Some(made);
                            coerce = false;
                        },
                        Err(err) => log::warn!("Outline has invalid link that was discarded: {}", err),
                    }
                }
            } else if key_eq(key, "Subtype") {
                subtype = Some(value.to_vec());
            } else if key_eq(key, "Contents") {
                dict.insert("Contents".to_string(), Object::raw(rewrite_contents_newlines(value)));
            } else if key_eq(key, "Rect") {
                let rect = scan_rect(value, ctm)?;
                dict.insert("Rect".to_string(), Object::raw(format_rect(&rect)));
            } else if key_eq(key, "Border") {
                dict.insert("Border".to_string(), Object::raw(write_border(value, ctm)?));
            } else if for_outline && key_eq(key, "Count") {
                continue;
            } else {
                dict.insert(key_name(key), Object::raw(normalize_escapes(value)));
            }
        }

        let is_link = subtype.as_deref().is_some_and(|s| key_eq(s, "Link"));
        if !for_outline && is_link {
            if let Some(a) = action {
                let keeps_dest = key_eq(a, "GoTo") || (file.is_some() && key_eq(a, "GoToR"));
                if !keeps_dest {
                    dest = None;
                }
            }
        }

        if let Some(a) = action {
            let builds_action = key_eq(a, "Launch") || (key_eq(a, "GoToR") && file.is_some()) || key_eq(a, "Article");
            if builds_action && (file.is_some() || dest.is_some() || uri.is_some()) {
                let mut adict = Dictionary::new();
                if !for_outline {
                    adict.insert("Type".to_string(), Object::name("Action"));
                }
                if key_eq(a, "Article") {
                    adict.insert("S".to_string(), Object::name("Thread"));
                    coerce = false;
                } else {
                    adict.insert("S".to_string(), Object::raw(a));
                }
                if let Some(d) = dest.take() {
                    let d = if coerce { coerce_dest(&d).into_owned() } else { d };
                    adict.insert("D".to_string(), Object::Raw(d));
                }
                if let Some(f) = file.take() {
                    adict.insert("F".to_string(), Object::raw(f));
                }
                if let Some(u) = uri {
                    adict.insert("URI".to_string(), Object::raw(u));
                    adict.insert("S".to_string(), Object::name("URI"));
                }
                dict.insert("A".to_string(), Object::Dictionary(adict));
            } else if a.len() >= 4 && a.starts_with(b"<<") {
                dict.insert("A".to_string(), Object::Dictionary(inline_action(a, uri)?));
            } else if key_eq(a, "GoTo")
                || (a.len() < MAX_REFERENCE_ACTION && RE_ACTION_REFERENCE.is_match(a))
            {
                dict.insert("A".to_string(), Object::raw(a));
            }
        }

        if let Some(d) = dest {
            let d = if coerce { coerce_dest(&d).into_owned() } else { d };
            dict.insert("Dest".to_string(), Object::Raw(d));
        } else if for_outline && action.is_none() {
            let page = self.doc.current_page(&mut self.graph).id;
            dict.insert(
                "Dest".to_string(),
                Object::raw(format!("[{} /XYZ null null null]", page)),
            );
        }
        if let Some(f) = file {
            dict.insert("File".to_string(), Object::raw(f));
        }
        if let Some(s) = subtype {
            dict.insert("Subtype".to_string(), Object::Raw(s));
        }
        Ok(())
    }

    /// `/ANN` and `/LNK`.
    pub(crate) fn annot(&mut self, mark: &Mark, default_subtype: &'static str) -> Result<()> {
        let current = self.doc.current_page_number();
        let page_dict = self.doc.page(current).map(|page| &page.dict);
        let verdict = self
            .compliance
            .check_annotation(&mark.params, &mark.ctm, page_dict, &self.config)?;
        if verdict == Verdict::Drop {
            return Ok(());
        }

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        let mut ao = AoParams {
            subtype: Some(default_subtype),
            src_pg: None,
        };
        self.put_ao_pairs(&mut dict, &mark.params, &mark.ctm, &mut ao, false)?;

        // A /SrcPg below 1 is ignored
        let number = match ao.src_pg {
            Some(page) if page >= 0 => page + 1,
            _ => current,
        };
        if self.doc.page_id(&mut self.graph, number).is_none() {
            return Err(Error::range(format!("annotation on nonexistent page {}", number)));
        }
        let id = match &mark.objname {
            Some(name) => self.names.define(&mut self.graph, name, NamedObject::Dict(dict))?,
            None => self.graph.write_new(&Object::Dictionary(dict))?,
        };
        if let Some(page) = self.doc.page_mut(&mut self.graph, number) {
            page.annots.push(id);
        }
        Ok(())
    }
}

/// Parse an inline `<< ... >>` action, renaming `/Dest` to `/D`, `/File`
/// to `/F` and `/Subtype` to `/S`.
fn inline_action(value: &[u8], uri: Option<&[u8]>) -> Result<Dictionary> {
    let mut adict = Dictionary::new();
    if let Some(u) = uri {
        adict.insert("URI".to_string(), Object::raw(u));
        adict.insert("S".to_string(), Object::name("URI"));
    }
    let params = dict_pairs(value)?;
    for (key, item) in pairs(&params) {
        let (name, item) = if key_eq(key, "Dest") || key_eq(key, "D") {
            ("D".to_string(), coerce_dest(item).into_owned())
        } else if key_eq(key, "File") {
            ("F".to_string(), item.to_vec())
        } else if key_eq(key, "Subtype") {
            ("S".to_string(), item.to_vec())
        } else {
            (key_name(key), item.to_vec())
        };
        adict.insert(name, Object::Raw(item));
    }
    Ok(adict)
}

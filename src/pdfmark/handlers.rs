//! Document structure marks: outline entries, articles, named
//! destinations, PostScript pass-through, page and document dictionaries,
//! and forms (`/BP`, `/EP`, `/SP`).

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::lexer::{decode_hex_string, decode_literal_string};
use crate::object::{Dictionary, Object};
use crate::writer::{format_real, Bead, ObjectGraph};

use super::annot::AoParams;
use super::named::{NamedObject, ObjectKind};
use super::params::{find_key, is_valid_objname, key_eq, key_name, pairs};
use super::scan::{coerce_dest, format_rect, scan_int, scan_rect, MAX_RECT_STRING};
use super::{objects, resources, Mark, OpenForm, PdfmarkProcessor};

/// Longest `/DataSource` written straight into the content stream.
const MAX_PS_INLINE: usize = 100;

lazy_static! {
    static ref RE_DISTILLER: Regex = Regex::new(r"(?i-u)distiller").unwrap();
}

fn lossy(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn is_literal_string(value: &[u8]) -> bool {
    value.len() >= 2 && value[0] == b'(' && value[value.len() - 1] == b')'
}

impl<G: ObjectGraph> PdfmarkProcessor<G> {
    /// `/OUT`
    pub(crate) fn outline_entry(&mut self, mark: &Mark) -> Result<()> {
        let sub_count = match find_key(&mark.params, "Count").map(scan_int) {
            Some(Ok(count)) => count,
            Some(Err(_)) => {
                log::debug!("ignoring non-integer /OUT /Count");
                0
            },
            None => 0,
        };
        let mut action = Dictionary::new();
        let mut ao = AoParams::default();
        self.put_ao_pairs(&mut action, &mark.params, &mark.ctm, &mut ao, true)?;
        self.outline.append(&mut self.graph, action, sub_count)?;
        Ok(())
    }

    /// `/ARTICLE`
    pub(crate) fn article(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let (Some(title), Some(rect)) = (find_key(params, "Title"), find_key(params, "Rect")) else {
            return Err(Error::range("/ARTICLE requires /Title and /Rect"));
        };
        let rect = scan_rect(rect, &mark.ctm)?;
        let id = self.graph.allocate_id();
        let number = self.page_number(find_key(params, "Page"));
        let page_id = self.doc.page_id(&mut self.graph, number);
        let extra: Dictionary = pairs(params)
            .filter(|(key, _)| !key_eq(key, "Rect") && !key_eq(key, "Page"))
            .map(|(key, value)| (key_name(key), Object::raw(value)))
            .collect();
        self.articles
            .add_bead(&mut self.graph, title, Bead::new(id, page_id, rect), extra)?;
        Ok(())
    }

    /// `/DEST`
    pub(crate) fn named_dest(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let Some(name) = find_key(params, "Dest") else {
            return Err(Error::range("/DEST requires /Dest"));
        };
        let (dest, present) = self
            .make_dest(params, "Page", "View", true)
            .map_err(|err| Error::range(err.to_string()))?;

        let value = if mark.objname.is_some() || params.len() > (present + 1) * 2 {
            let mut ddict = Dictionary::new();
            ddict.insert("D".to_string(), Object::Raw(dest));
            for (key, value) in pairs(params) {
                if !key_eq(key, "Dest") && !key_eq(key, "Page") && !key_eq(key, "View") {
                    ddict.insert(key_name(key), Object::raw(value));
                }
            }
            match &mark.objname {
                Some(objname) => {
                    Object::Reference(self.names.define(&mut self.graph, objname, NamedObject::Dict(ddict))?)
                },
                None => Object::Dictionary(ddict),
            }
        } else {
            Object::Raw(dest)
        };

        let key = key_name(&coerce_dest(name));
        let graph = &mut self.graph;
        let (_, dests) = self
            .dests
            .get_or_insert_with(|| (graph.allocate_id(), Dictionary::new()));
        dests.insert(key, value);
        Ok(())
    }

    /// `/PS`
    pub(crate) fn postscript(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let source = match find_key(params, "DataSource") {
            Some(value) if is_literal_string(value) => value,
            Some(value) => {
                log::warn!("/PS /DataSource must be a string, got {}", lossy(value));
                return Err(Error::range("invalid /DataSource"));
            },
            None => return Err(Error::range("/PS requires /DataSource")),
        };
        let level1 = match find_key(params, "Level1") {
            Some(value) if !is_literal_string(value) => {
                log::warn!("/PS /Level1 must be a string, got {}", lossy(value));
                return Err(Error::range("invalid /Level1"));
            },
            other => other,
        };

        if level1.is_none() && source.len() <= MAX_PS_INLINE && mark.objname.is_none() {
            let mut op = source.to_vec();
            op.extend_from_slice(b" PS\n");
            self.emit_content(&op);
            return Ok(());
        }

        let compress = self.config.compress_streams;
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("XObject"));
        dict.insert("Subtype".to_string(), Object::name("PS"));
        if let Some(level1) = level1 {
            let stream = ps_stream(Dictionary::new(), level1, compress);
            let id = self.graph.write_new(&stream.to_object()?)?;
            dict.insert("Level1".to_string(), Object::Reference(id));
        }
        let stream = ps_stream(dict, source, compress);
        let id = match &mark.objname {
            Some(name) => self.names.bind(&mut self.graph, name, stream)?,
            None => self.graph.write_new(&stream.to_object()?)?,
        };
        self.emit_content(format!("/R{} Do\n", id.id).as_bytes());
        self.use_xobject(id);
        Ok(())
    }

    /// `/PAGELABEL`
    pub(crate) fn page_label(&mut self, mark: &Mark) -> Result<()> {
        if self.config.compatibility_level >= 1.3 {
            if let Some(label) = find_key(&mark.params, "Label") {
                self.labels.set_label(self.doc.next_page, label);
            }
        }
        Ok(())
    }

    /// `/DOCINFO`
    pub(crate) fn doc_info(&mut self, mark: &Mark) -> Result<()> {
        if mark.params.len() % 2 == 1 {
            return Err(Error::range("odd number of /DOCINFO parameters"));
        }
        for (key, value) in pairs(&mark.params) {
            let value = if key_eq(key, "Producer") && mentions_distiller(value) {
                replace_producer(value, &self.config.producer)
            } else {
                value.to_vec()
            };
            self.doc.info.insert(key_name(key), Object::Raw(value));
        }
        Ok(())
    }

    /// `/DOCVIEW`
    pub(crate) fn doc_view(&mut self, mark: &Mark) -> Result<()> {
        if mark.params.len() % 2 == 1 {
            return Err(Error::range("odd number of /DOCVIEW parameters"));
        }
        let (dest, present) = self.make_dest(&mark.params, "Page", "View", false)?;
        if present > 0 {
            self.doc
                .catalog
                .insert("OpenAction".to_string(), Object::Raw(dest));
            for (key, value) in pairs(&mark.params) {
                if !key_eq(key, "Page") && !key_eq(key, "View") {
                    self.doc.catalog.insert(key_name(key), Object::raw(value));
                }
            }
            Ok(())
        } else {
            objects::put_pairs(&mut self.doc.catalog, &mark.params)
        }
    }

    /// `/BP`: open a form, collecting content until the matching `/EP`.
    pub(crate) fn begin_form(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let Some(name) = &mark.objname else {
            return Err(Error::range("/BP requires /_objdef"));
        };
        if params.len() != 2 || !key_eq(&params[0], "BBox") {
            return Err(Error::range("/BP requires exactly /BBox"));
        }
        let Some(inverse) = mark.ctm.invert() else {
            return Err(Error::range("/BP with a singular transform"));
        };
        if params[1].len() > MAX_RECT_STRING {
            return Err(Error::limit("/BBox value too long"));
        }
        let bbox = mark.ctm.transform_bbox(&scan_rect(&params[1], &Matrix::identity())?);

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("XObject"));
        dict.insert("Subtype".to_string(), Object::name("Form"));
        dict.insert("FormType".to_string(), Object::Integer(1));
        dict.insert("BBox".to_string(), Object::raw(format_rect(&bbox)));
        dict.insert("Matrix".to_string(), Object::raw(format_matrix(&inverse)));
        log::debug!("opening form {}", lossy(name));
        self.forms.push(OpenForm {
            name: name.clone(),
            dict,
            data: Vec::new(),
            xobjects: IndexMap::new(),
        });
        Ok(())
    }

    /// `/EP`
    pub(crate) fn end_form(&mut self, _mark: &Mark) -> Result<()> {
        match self.forms.pop() {
            Some(form) => self.bind_form(form),
            None => Err(Error::range("/EP without an open /BP")),
        }
    }

    /// Turn a finished form into its named stream.
    pub(super) fn bind_form(&mut self, form: OpenForm) -> Result<()> {
        let OpenForm {
            name,
            mut dict,
            data,
            xobjects,
        } = form;
        dict.insert("Resources".to_string(), Object::Dictionary(resources(&xobjects)));
        let stream = NamedObject::Stream {
            dict,
            data,
            open: false,
            graphics: true,
            compress: self.config.compress_streams,
        };
        self.names.bind(&mut self.graph, &name, stream)?;
        Ok(())
    }

    /// `/SP`: paint a closed form with the current transform.
    pub(crate) fn paint_form(&mut self, mark: &Mark) -> Result<()> {
        let [target] = mark.params.as_slice() else {
            return Err(Error::range("/SP takes exactly one form"));
        };
        if !is_valid_objname(target) || self.special_name(target).is_some() {
            return Err(Error::range(format!("/SP target {} is not a form", lossy(target))));
        }
        let compress = self.config.compress_streams;
        let entry = self
            .names
            .get_typed(&mut self.graph, target, ObjectKind::Stream, compress)?;
        let painted = matches!(entry.object, NamedObject::Stream { open: false, graphics: true, .. });
        if !painted {
            return Err(Error::range(format!("{} is not a closed form", lossy(target))));
        }
        let id = entry.id;
        let op = format!("q {} cm /R{} Do Q\n", matrix_operands(&mark.ctm), id.id);
        self.emit_content(op.as_bytes());
        self.use_xobject(id);
        Ok(())
    }
}

fn ps_stream(dict: Dictionary, source: &[u8], compress: bool) -> NamedObject {
    let mut data = decode_literal_string(source);
    data.push(b'\n');
    NamedObject::Stream {
        dict,
        data,
        open: false,
        graphics: false,
        compress,
    }
}

fn matrix_operands(m: &Matrix) -> String {
    [m.a, m.b, m.c, m.d, m.e, m.f]
        .iter()
        .map(|&v| format_real(v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_matrix(m: &Matrix) -> String {
    format!("[{}]", matrix_operands(m))
}

/// Whether a `/Producer` value names Distiller, in plain or UTF-16 text.
fn mentions_distiller(value: &[u8]) -> bool {
    if RE_DISTILLER.is_match(value) {
        return true;
    }
    let decoded = match value.first() {
        Some(b'(') => decode_literal_string(value),
        Some(b'<') if !value.starts_with(b"<<") => decode_hex_string(value),
        _ => return false,
    };
    let narrow: Vec<u8> = decoded.into_iter().filter(|&c| c != 0).collect();
    RE_DISTILLER.is_match(&narrow)
}

/// Put `producer` in place of the Distiller part of a `/Producer` string:
/// the text after the last `+`, or the whole string.
fn replace_producer(value: &[u8], producer: &str) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(producer.len() + 1);
    for &c in producer.as_bytes() {
        if matches!(c, b'(' | b')' | b'\\') {
            escaped.push(b'\\');
        }
        escaped.push(c);
    }
    escaped.push(b')');

    let plus = value.iter().rposition(|&c| c == b'+');
    let mut j = match plus {
        Some(j) if value.first() == Some(&b'(') => j,
        _ => {
            let mut out = vec![b'('];
            out.extend_from_slice(&escaped);
            return out;
        },
    };
    if value.len() - j > 2 {
        j += 1;
        while value.get(j) == Some(&b' ') {
            j += 1;
        }
    }
    let mut out = value[..j].to_vec();
    out.extend_from_slice(&escaped);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdfmarkConfig;
    use crate::writer::PdfWriter;

    const IDENTITY: &[u8] = b"[1 0 0 1 0 0]";

    fn processor() -> PdfmarkProcessor<PdfWriter> {
        PdfmarkProcessor::new(PdfmarkConfig::new().with_resolution(72.0, 72.0).with_compress_streams(false))
    }

    #[test]
    fn test_producer_replacement() {
        assert_eq!(
            replace_producer(b"(Acrobat Distiller 5.0)", "me 1.0"),
            b"(me 1.0)".to_vec()
        );
        assert_eq!(
            replace_producer(b"(Word + Acrobat Distiller)", "me"),
            b"(Word + me)".to_vec()
        );
        assert_eq!(replace_producer(b"(Distiller +)", "me"), b"(Distiller me)".to_vec());
        assert_eq!(replace_producer(b"<FEFF0044>", "a(b)"), b"(a\\(b\\))".to_vec());
    }

    #[test]
    fn test_distiller_detection() {
        assert!(mentions_distiller(b"(acrobat DISTILLER)"));
        assert!(mentions_distiller(b"<FEFF00440069007300740069006C006C00650072>"));
        assert!(!mentions_distiller(b"(LaTeX)"));
    }

    #[test]
    fn test_docinfo_rewrites_producer() {
        let mut p = processor();
        p.process_mark("DOCINFO", &["/Producer", "(Adobe Distiller)", "/Author", "(A)"], IDENTITY)
            .unwrap();
        let producer = p.doc().info.get("Producer").and_then(|o| o.as_raw()).unwrap();
        assert!(producer.starts_with(b"(pdfmark_oxide"));
        assert_eq!(p.doc().info.get("Author"), Some(&Object::raw("(A)")));
    }

    #[test]
    fn test_docview_open_action() {
        let mut p = processor();
        p.process_mark("DOCVIEW", &["/Page", "2", "/View", "[/Fit]", "/PageMode", "/UseOutlines"], IDENTITY)
            .unwrap();
        let catalog = &p.doc().catalog;
        let open = catalog.get("OpenAction").and_then(|o| o.as_raw()).unwrap();
        assert!(open.ends_with(b" /Fit]"));
        assert_eq!(catalog.get("PageMode"), Some(&Object::raw("/UseOutlines")));
        assert!(!catalog.contains_key("Page"));
    }

    #[test]
    fn test_named_dest_forms() {
        let mut p = processor();
        p.process_mark("DEST", &["/Dest", "/intro", "/Page", "1"], IDENTITY).unwrap();
        p.process_mark("DEST", &["/Dest", "(two words)", "/Page", "2", "/Extra", "1"], IDENTITY)
            .unwrap();
        let dests = p.dests().unwrap();
        assert!(matches!(dests.get("intro"), Some(Object::Raw(_))));
        let entry = dests.get("two words").and_then(|o| o.as_dict()).unwrap();
        assert!(entry.contains_key("D"));
        assert_eq!(entry.get("Extra"), Some(&Object::raw("1")));
    }

    #[test]
    fn test_dest_requires_key() {
        let mut p = processor();
        let err = p.process_mark("DEST", &["/Page", "1"], IDENTITY).unwrap_err();
        assert!(matches!(err, Error::RangeCheck(_)));
    }

    #[test]
    fn test_inline_postscript() {
        let mut p = processor();
        p.process_mark("PS", &["/DataSource", "(0 0 moveto)"], IDENTITY).unwrap();
        let page = p.doc().page(1).unwrap();
        assert_eq!(page.contents, b"(0 0 moveto) PS\n");
    }

    #[test]
    fn test_postscript_xobject_with_level1() {
        let mut p = processor();
        p.process_mark("PS", &["/DataSource", "(a)", "/Level1", "(b)"], IDENTITY).unwrap();
        let page = p.doc().page(1).unwrap();
        let (name, id) = page.xobjects.first().map(|(n, id)| (n.clone(), *id)).unwrap();
        assert_eq!(name, format!("R{}", id.id));
        assert_eq!(page.contents, format!("/R{} Do\n", id.id).into_bytes());
        let Some(Object::Stream { dict, data }) = p.graph().get(id) else {
            panic!("PS XObject not written");
        };
        assert_eq!(dict.get("Subtype"), Some(&Object::name("PS")));
        assert!(dict.contains_key("Level1"));
        assert_eq!(data.as_ref(), b"a\n");
    }

    #[test]
    fn test_postscript_needs_string() {
        let mut p = processor();
        assert!(p.process_mark("PS", &["/DataSource", "/name"], IDENTITY).is_err());
        assert!(p.process_mark("PS", &["/Other", "(x)"], IDENTITY).is_err());
    }

    #[test]
    fn test_form_lifecycle() {
        let mut p = processor();
        let ctm = b"[2 0 0 2 10 10]";
        p.process_mark("BP", &["/_objdef", "{logo}", "/BBox", "[0 0 10 10]"], ctm)
            .unwrap();
        p.process_mark("PS", &["/DataSource", "(inside)"], IDENTITY).unwrap();
        p.process_mark("EP", &[] as &[&str], IDENTITY).unwrap();
        p.process_mark("SP", &["{logo}"], IDENTITY).unwrap();

        let entry = p.names().get(b"{logo}").unwrap();
        let NamedObject::Stream { dict, data, graphics, open, .. } = &entry.object else {
            panic!("form is not a stream");
        };
        assert!(*graphics && !*open);
        assert_eq!(data, b"(inside) PS\n");
        assert_eq!(dict.get("BBox"), Some(&Object::raw("[10 10 30 30]")));
        assert_eq!(dict.get("Matrix"), Some(&Object::raw("[0.5 0 0 0.5 -5 -5]")));

        let contents = &p.doc().page(1).unwrap().contents;
        let expected = format!("q 1 0 0 1 0 0 cm /R{} Do Q\n", entry.id.id);
        assert_eq!(contents, expected.as_bytes());
    }

    #[test]
    fn test_form_errors() {
        let mut p = processor();
        assert!(p.process_mark("EP", &[] as &[&str], IDENTITY).is_err());
        assert!(p.process_mark("BP", &["/BBox", "[0 0 1 1]"], IDENTITY).is_err());
        assert!(p
            .process_mark("BP", &["/_objdef", "{f}", "/BBox", "[0 0 1 1]"], b"[0 0 0 0 0 0]")
            .is_err());
        p.process_mark("OBJ", &["/_objdef", "{s}", "/type", "/stream"], IDENTITY).unwrap();
        assert!(matches!(
            p.process_mark("SP", &["{s}"], IDENTITY),
            Err(Error::RangeCheck(_))
        ));
        assert!(matches!(
            p.process_mark("SP", &["{ThisPage}"], IDENTITY),
            Err(Error::RangeCheck(_))
        ));
    }

    #[test]
    fn test_article_beads() {
        let mut p = processor();
        p.process_mark("ARTICLE", &["/Title", "(News)", "/Rect", "[0 0 100 100]"], IDENTITY)
            .unwrap();
        p.process_mark(
            "ARTICLE",
            &["/Title", "(News)", "/Rect", "[0 100 100 200]", "/Page", "2", "/Author", "(me)"],
            IDENTITY,
        )
        .unwrap();
        let article = p.articles().find(b"(News)").unwrap();
        assert_eq!(article.bead_count(), 2);
        assert!(p.process_mark("ARTICLE", &["/Title", "(News)"], IDENTITY).is_err());
    }

    #[test]
    fn test_page_label_needs_compat_13() {
        let mut old = PdfmarkProcessor::new(PdfmarkConfig::new().with_compatibility_level(1.2));
        old.process_mark("PAGELABEL", &["/Label", "(i)"], IDENTITY).unwrap();
        assert!(old.labels().is_empty());

        let mut p = processor();
        p.process_mark("PAGELABEL", &["/Label", "(i)"], IDENTITY).unwrap();
        assert!(!p.labels().is_empty());
    }

    #[test]
    fn test_outline_count_must_be_integer() {
        let mut p = processor();
        assert!(p.process_mark("OUT", &["/Title", "(x)", "/Count", "/two"], IDENTITY).is_err());
        p.process_mark("OUT", &["/Title", "(x)", "/Count", "-1"], IDENTITY).unwrap();
        p.process_mark("OUT", &["/Title", "(child)"], IDENTITY).unwrap();
        assert_eq!(p.outline().nodes().len(), 2);
    }
}

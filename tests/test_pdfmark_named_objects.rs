//! Integration tests for named objects and forms.
//!
//! Tests the `{name}` object model end to end:
//! - `/OBJ` definitions and forward references from other marks
//! - Editing with `/PUT`, `/.PUTDICT`, `/.PUTINTERVAL`, `/APPEND`,
//!   `/.PUTSTREAM` and `/CLOSE`
//! - Local name scopes with `/NamespacePush` and `/NamespacePop`
//! - Form XObjects via `/BP`, `/EP` and `/SP`

use pdfmark_oxide::pdfmark::named::NamedObject;
use pdfmark_oxide::{Error, Object, PdfmarkConfig, PdfmarkProcessor};

const IDENTITY: &[u8] = b"[1 0 0 1 0 0]";

fn processor() -> PdfmarkProcessor {
    PdfmarkProcessor::new(
        PdfmarkConfig::new()
            .with_resolution(72.0, 72.0)
            .with_compress_streams(false),
    )
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}

fn define(p: &mut PdfmarkProcessor, name: &str, kind: &str) {
    p.process_mark("OBJ", &["/_objdef", name, "/type", kind], IDENTITY)
        .unwrap();
}

#[test]
fn test_forward_reference_then_definition() {
    let mut p = processor();
    p.process_mark("ANN", &["/Rect", "[0 0 1 1]", "/Popup", "{pop}"], IDENTITY)
        .unwrap();
    let id = p.names().get(b"{pop}").unwrap().id;
    assert_eq!(p.names().get(b"{pop}").unwrap().object, NamedObject::Placeholder);

    define(&mut p, "{pop}", "/dict");
    assert_eq!(p.names().get(b"{pop}").unwrap().id, id);
    p.process_mark("PUT", &["{pop}", "<< /Type /Annot /Subtype /Popup >>"], IDENTITY)
        .unwrap();

    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, &format!("/Popup {}", id)));
    assert!(contains(&pdf, "/Subtype /Popup"));
}

#[test]
fn test_array_editing() {
    let mut p = processor();
    define(&mut p, "{list}", "/array");
    p.process_mark("APPEND", &["{list}", "1"], IDENTITY).unwrap();
    p.process_mark("APPEND", &["{list}", "2"], IDENTITY).unwrap();
    p.process_mark("PUT", &["{list}", "4", "/four"], IDENTITY).unwrap();
    p.process_mark(".PUTINTERVAL", &["{list}", "1", "(b)", "(c)"], IDENTITY)
        .unwrap();

    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "[1 (b) (c) null /four]"));
}

#[test]
fn test_array_index_limits() {
    let mut p = processor();
    define(&mut p, "{a}", "/array");
    let err = p
        .process_mark("PUT", &["{a}", "999999999999999", "1"], IDENTITY)
        .unwrap_err();
    assert!(matches!(err, Error::LimitCheck(_)));
    let err = p
        .process_mark(".PUTINTERVAL", &["{a}", "65535", "(x)"], IDENTITY)
        .unwrap_err();
    assert!(matches!(err, Error::LimitCheck(_)));
    let err = p.process_mark("PUT", &["{a}", "-1", "1"], IDENTITY).unwrap_err();
    assert!(matches!(err, Error::RangeCheck(_)));
    assert!(!err.is_fatal());

    p.process_mark("PUT", &["{a}", "3", "/last"], IDENTITY).unwrap();
    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "[null null null /last]"));
}

#[test]
fn test_special_dictionaries() {
    let mut p = processor();
    p.process_mark("PUT", &["{Catalog}", "<< /PageMode /UseThumbs >>"], IDENTITY)
        .unwrap();
    p.process_mark(".PUTDICT", &["{DocInfo}", "/Subject", "(pdfmarks)"], IDENTITY)
        .unwrap();
    p.process_mark("PUT", &["{ThisPage}", "<< /Rotate 180 >>"], IDENTITY)
        .unwrap();

    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "/PageMode /UseThumbs"));
    assert!(contains(&pdf, "/Subject (pdfmarks)"));
    assert!(contains(&pdf, "/Rotate 180"));
}

#[test]
fn test_reference_to_special_names() {
    let mut p = processor();
    p.process_mark("ANN", &["/Rect", "[0 0 1 1]", "/Target", "{Page2}"], IDENTITY)
        .unwrap();
    let page2 = p.doc().page(2).unwrap().id;
    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, &format!("/Target {}", page2)));
}

#[test]
fn test_stream_lifecycle() {
    let mut p = processor();
    define(&mut p, "{js}", "/stream");
    p.process_mark(".PUTSTREAM", &["{js}", "(app.alert\\(1\\);)"], IDENTITY)
        .unwrap();
    p.process_mark(".PUTDICT", &["{js}", "/Type", "/EmbeddedFile"], IDENTITY)
        .unwrap();
    p.process_mark("CLOSE", &["{js}"], IDENTITY).unwrap();

    let err = p
        .process_mark(".PUTSTREAM", &["{js}", "(more)"], IDENTITY)
        .unwrap_err();
    assert!(matches!(err, Error::RangeCheck(_)));

    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "/Type /EmbeddedFile"));
    assert!(contains(&pdf, "app.alert(1);"));
}

#[test]
fn test_type_mismatch_is_rejected() {
    let mut p = processor();
    define(&mut p, "{d}", "/dict");
    let err = p
        .process_mark("OBJ", &["/_objdef", "{d}", "/type", "/array"], IDENTITY)
        .unwrap_err();
    assert!(matches!(err, Error::RangeCheck(_)));
    assert!(p.process_mark("APPEND", &["{d}", "1"], IDENTITY).is_err());
}

#[test]
fn test_namespaces_scope_names() {
    let mut p = processor();
    define(&mut p, "{outer}", "/dict");
    p.process_mark("NamespacePush", &[] as &[&str], IDENTITY).unwrap();
    define(&mut p, "{inner}", "/dict");
    assert!(p.names().get(b"{inner}").is_some());
    assert!(p.names().get(b"{outer}").is_some());
    p.process_mark("NamespacePop", &[] as &[&str], IDENTITY).unwrap();

    assert!(p.names().get(b"{inner}").is_none());
    assert!(p.names().get(b"{outer}").is_some());
    assert_eq!(p.names().depth(), 0);
}

#[test]
fn test_form_define_and_paint() {
    let mut p = processor();
    p.process_mark("BP", &["/_objdef", "{logo}", "/BBox", "[0 0 100 50]"], IDENTITY)
        .unwrap();
    p.process_mark("PS", &["/DataSource", "(0 0 moveto)"], IDENTITY)
        .unwrap();
    p.process_mark("EP", &[] as &[&str], IDENTITY).unwrap();
    p.process_mark("SP", &["{logo}"], b"[1 0 0 1 10 20]").unwrap();

    let id = p.names().get(b"{logo}").unwrap().id;
    let page = p.doc().page(1).unwrap();
    let contents = String::from_utf8_lossy(&page.contents).into_owned();
    assert!(contents.contains(&format!("/R{} Do", id.id)));
    assert!(contents.starts_with("q "));
    assert!(page.xobjects.contains_key(&format!("R{}", id.id)));

    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "/Subtype /Form"));
    assert!(contains(&pdf, "(0 0 moveto) PS"));
}

#[test]
fn test_paint_unknown_form() {
    let mut p = processor();
    let err = p.process_mark("SP", &["{missing}"], IDENTITY).unwrap_err();
    assert!(matches!(err, Error::RangeCheck(_) | Error::TypeCheck(_) | Error::Undefined(_)));
}

#[test]
fn test_unclosed_form_written_at_close() {
    let mut p = processor();
    p.process_mark("BP", &["/_objdef", "{open}", "/BBox", "[0 0 10 10]"], IDENTITY)
        .unwrap();
    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "/Subtype /Form"));
}

#[test]
fn test_named_image_registered() {
    let mut p = processor();
    p.process_mark("NI", &["/_objdef", "{img}"], IDENTITY).unwrap();
    let id = p.names().get(b"{img}").unwrap().id;
    assert_eq!(p.named_images(), &[id]);
}

#[test]
fn test_references_stay_literal_in_strings() {
    let mut p = processor();
    p.process_mark("ANN", &["/Rect", "[0 0 1 1]", "/Contents", "({notaname})"], IDENTITY)
        .unwrap();
    assert!(p.names().get(b"{notaname}").is_none());
    let annots = &p.doc().page(1).unwrap().annots;
    let annot = p.graph().get(annots[0]).and_then(|o| o.as_dict()).unwrap();
    assert_eq!(annot.get("Contents"), Some(&Object::raw("({notaname})")));
}

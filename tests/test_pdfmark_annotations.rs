//! Integration tests for annotation and link marks.
//!
//! Covers:
//! - `/ANN` and `/LNK` dictionaries as written to the object graph
//! - Geometry under the device transform
//! - Page placement via the current page and `/SrcPg`
//! - Actions, destinations and named annotations

use pdfmark_oxide::object::Dictionary;
use pdfmark_oxide::{Error, Object, PdfmarkConfig, PdfmarkProcessor};

const IDENTITY: &[u8] = b"[1 0 0 1 0 0]";

fn processor() -> PdfmarkProcessor {
    PdfmarkProcessor::new(
        PdfmarkConfig::new()
            .with_resolution(72.0, 72.0)
            .with_compress_streams(false),
    )
}

fn annotations(p: &PdfmarkProcessor, page: i64) -> Vec<Dictionary> {
    p.doc()
        .page(page)
        .map(|state| {
            state
                .annots
                .iter()
                .map(|id| p.graph().get(*id).and_then(|o| o.as_dict()).cloned().unwrap())
                .collect()
        })
        .unwrap_or_default()
}

fn raw(dict: &Dictionary, key: &str) -> String {
    let value = dict.get(key).and_then(|o| o.as_raw()).unwrap();
    String::from_utf8_lossy(value).into_owned()
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}

#[test]
fn test_text_annotation_defaults() {
    let mut p = processor();
    p.process_mark(
        "ANN",
        &["/Rect", "[100 100 200 150]", "/Contents", "(Note)", "/Color", "[1 0 0]"],
        IDENTITY,
    )
    .unwrap();

    let annots = annotations(&p, 1);
    assert_eq!(annots.len(), 1);
    let annot = &annots[0];
    assert_eq!(annot.get("Type"), Some(&Object::name("Annot")));
    assert_eq!(raw(annot, "Subtype"), "/Text");
    assert_eq!(raw(annot, "Rect"), "[100 100 200 150]");
    assert_eq!(raw(annot, "Contents"), "(Note)");
    assert_eq!(raw(annot, "C"), "[1 0 0]");
    assert!(!annot.contains_key("Color"));
}

#[test]
fn test_link_geometry_follows_transform() {
    let mut p = processor();
    p.process_mark(
        "LNK",
        &["/Rect", "[10 10 20 20]", "/Border", "[0 0 1]", "/Page", "1"],
        b"[2 0 0 2 5 5]",
    )
    .unwrap();

    let annot = &annotations(&p, 1)[0];
    assert_eq!(raw(annot, "Subtype"), "/Link");
    assert_eq!(raw(annot, "Rect"), "[25 25 45 45]");
    assert_eq!(raw(annot, "Border"), "[0 0 2]");
    let page = p.doc().page(1).unwrap().id;
    assert_eq!(raw(annot, "Dest"), format!("[{} /XYZ null null null]", page));
}

#[test]
fn test_link_to_later_page_allocates_only_that_page() {
    let mut p = processor();
    p.process_mark("LNK", &["/Rect", "[0 0 10 10]", "/Page", "3", "/View", "[/Fit]"], IDENTITY)
        .unwrap();
    assert_eq!(p.doc().pages().count(), 2);
    assert!(p.doc().page(2).is_none());
    assert_eq!(p.doc().max_referred_page, 3);

    let annot = &annotations(&p, 1)[0];
    let target = p.doc().page(3).unwrap().id;
    assert_eq!(raw(annot, "Dest"), format!("[{} /Fit]", target));
}

#[test]
fn test_source_page_places_annotation() {
    let mut p = processor();
    p.process_mark("ANN", &["/SrcPg", "2", "/Rect", "[0 0 1 1]"], IDENTITY)
        .unwrap();
    assert!(annotations(&p, 1).is_empty());
    let annots = annotations(&p, 2);
    assert_eq!(annots.len(), 1);
    assert!(!annots[0].contains_key("SrcPg"));
}

#[test]
fn test_non_positive_source_page_uses_current_page() {
    let mut p = processor();
    p.end_page();
    p.process_mark("ANN", &["/SrcPg", "0", "/Rect", "[0 0 1 1]"], IDENTITY)
        .unwrap();
    p.process_mark("ANN", &["/SrcPg", "-4", "/Rect", "[0 0 1 1]"], IDENTITY)
        .unwrap();
    assert_eq!(annotations(&p, 2).len(), 2);
    assert!(p.doc().page(1).is_none());
}

#[test]
fn test_annotations_follow_showpage() {
    let mut p = processor();
    p.process_mark("ANN", &["/Contents", "(one)"], IDENTITY).unwrap();
    p.end_page();
    p.process_mark("ANN", &["/Contents", "(two)"], IDENTITY).unwrap();
    p.process_mark("ANN", &["/Contents", "(three)"], IDENTITY).unwrap();

    assert_eq!(annotations(&p, 1).len(), 1);
    let second = annotations(&p, 2);
    assert_eq!(second.len(), 2);
    assert_eq!(raw(&second[1], "Contents"), "(three)");
}

#[test]
fn test_uri_link_action() {
    let mut p = processor();
    p.process_mark(
        "LNK",
        &[
            "/Rect",
            "[0 0 50 10]",
            "/Action",
            "<< /Subtype /URI >>",
            "/URI",
            "(https://example.com)",
        ],
        IDENTITY,
    )
    .unwrap();

    let annot = &annotations(&p, 1)[0];
    let action = annot.get("A").and_then(|a| a.as_dict()).unwrap();
    assert_eq!(action.get("URI"), Some(&Object::raw("(https://example.com)")));
    assert_eq!(action.get("S"), Some(&Object::raw("/URI")));
    assert!(!annot.contains_key("URI"));
}

#[test]
fn test_remote_goto_action() {
    let mut p = processor();
    p.process_mark(
        "LNK",
        &["/Rect", "[0 0 5 5]", "/Action", "/GoToR", "/File", "(other.pdf)", "/Page", "2"],
        IDENTITY,
    )
    .unwrap();

    let annot = &annotations(&p, 1)[0];
    let action = annot.get("A").and_then(|a| a.as_dict()).unwrap();
    assert_eq!(action.get("S"), Some(&Object::raw("/GoToR")));
    assert_eq!(action.get("F"), Some(&Object::raw("(other.pdf)")));
    assert_eq!(action.get("D"), Some(&Object::raw("[1 /XYZ null null null]")));
    assert!(!annot.contains_key("Dest"));
}

#[test]
fn test_named_annotation_referenced_later() {
    let mut p = processor();
    p.process_mark(
        "ANN",
        &["/_objdef", "{note}", "/Subtype", "/Popup", "/Rect", "[0 0 1 1]"],
        IDENTITY,
    )
    .unwrap();
    let id = p.names().get(b"{note}").unwrap().id;
    assert_eq!(p.doc().page(1).unwrap().annots, vec![id]);

    p.process_mark("PUT", &["{note}", "/Open", "true"], IDENTITY).unwrap();
    let pdf = p.finish().unwrap();
    assert!(contains(&pdf, "/Subtype /Popup"));
    assert!(contains(&pdf, "/Open true"));
}

#[test]
fn test_malformed_rect_rejects_only_that_mark() {
    let mut p = processor();
    let err = p
        .process_mark("ANN", &["/Rect", "[0 0 zero 1]"], IDENTITY)
        .unwrap_err();
    assert!(matches!(err, Error::RangeCheck(_)));
    assert!(!err.is_fatal());

    p.process_mark("ANN", &["/Rect", "[0 0 1 1]"], IDENTITY).unwrap();
    assert_eq!(annotations(&p, 1).len(), 1);
}

#[test]
fn test_annotations_written_to_page() {
    let mut p = processor();
    p.process_mark("ANN", &["/Contents", "(a)"], IDENTITY).unwrap();
    p.process_mark("LNK", &["/Rect", "[0 0 1 1]"], IDENTITY).unwrap();
    let pdf = p.finish().unwrap();

    assert!(contains(&pdf, "/Type /Annot"));
    assert!(contains(&pdf, "/Subtype /Link"));
    assert!(contains(&pdf, "/Annots ["));
    assert!(contains(&pdf, "/Type /Page"));
}

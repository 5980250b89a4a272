//! The pdfmark engine.
//!
//! A pdfmark is a directive `[ key value ... /TYPE pdfmark` together with
//! the transform in effect when it was issued. [`PdfmarkProcessor`] turns a
//! sequence of them into PDF objects: annotations and links, outline
//! entries, article threads, named destinations, document metadata and raw
//! edits of named objects.
//!
//! ## Processing a mark
//!
//! ```text
//! process_mark(type, params, ctm)
//!     ↓ MARK_TABLE lookup (unknown types are ignored)
//!     ↓ transform rescaled to 72 units per inch unless TRUECTM
//!     ↓ /_objdef {name} extracted, {name} tokens replaced by references
//!     ↓ handler
//! [ObjectGraph] + outline / articles / labels / named objects
//! ```
//!
//! Document-wide structures are written when the document is closed with
//! [`PdfmarkProcessor::close`] (or [`PdfmarkProcessor::finish`]).
//!
//! ## Example
//!
//! ```
//! use pdfmark_oxide::{PdfmarkConfig, PdfmarkProcessor};
//!
//! let mut processor = PdfmarkProcessor::new(PdfmarkConfig::new().with_resolution(72.0, 72.0));
//! processor
//!     .process_mark("OUT", &["/Title", "(Introduction)", "/Page", "1"], b"[1 0 0 1 0 0]")
//!     .unwrap();
//! let pdf = processor.finish().unwrap();
//! assert!(pdf.starts_with(b"%PDF-1.7"));
//! ```

mod annot;
mod compliance;
mod dest;
pub mod document;
mod handlers;
pub mod named;
mod objects;
pub mod params;
pub mod scan;
pub mod source;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::config::PdfmarkConfig;
use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::{
    compress_data, format_real, ArticleThreads, ObjectGraph, OutlineBuilder, PageLabelsBuilder, PdfWriter,
    PdfWriterConfig,
};

use self::compliance::ComplianceState;
use self::document::DocumentState;
use self::named::NamedObjects;

bitflags! {
    /// Per-type processing options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MarkOptions: u8 {
        /// May define a named object with `/_objdef {name}`
        const NAMEABLE = 0x01;
        /// An odd number of parameters is allowed
        const ODD_OK = 0x02;
        /// The first parameter is a target name and is not substituted
        const KEEP_NAME = 0x04;
        /// No `{name}` substitution at all
        const NO_REFS = 0x08;
        /// Use the device transform as given
        const TRUECTM = 0x10;
    }
}

/// Handler selected for a mark type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkType {
    /// Annotation, default subtype `/Text`
    Ann,
    /// Link annotation, default subtype `/Link`
    Lnk,
    /// Outline entry
    Out,
    /// Article bead
    Article,
    /// Named destination
    Dest,
    /// PostScript pass-through
    Ps,
    /// Page tree entries
    Pages,
    /// Current page entries
    Page,
    /// Page label
    PageLabel,
    /// Document information
    DocInfo,
    /// Document open action and catalog entries
    DocView,
    /// Begin form
    Bp,
    /// End form
    Ep,
    /// Paint form
    Sp,
    /// Create a named object
    Obj,
    /// Store into an array (or dictionary)
    Put,
    /// Store pairs into a dictionary or stream
    PutDict,
    /// Store a run of array elements
    PutInterval,
    /// Append data to a stream
    PutStream,
    /// Append to an array
    Append,
    /// Close a stream
    Close,
    /// Open a named object scope
    NamespacePush,
    /// Close a named object scope
    NamespacePop,
    /// Named image placeholder
    Ni,
    /// Accepted and ignored
    Stub,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct MarkSpec {
    /// Mark type name without the slash
    pub name: &'static str,
    /// Handler
    pub kind: MarkType,
    /// Processing options
    pub options: MarkOptions,
}

const fn entry(name: &'static str, kind: MarkType, options: MarkOptions) -> MarkSpec {
    MarkSpec { name, kind, options }
}

const NONE: MarkOptions = MarkOptions::empty();
const NAMEABLE: MarkOptions = MarkOptions::NAMEABLE;
const ODD_OK: MarkOptions = MarkOptions::ODD_OK;
const EDIT: MarkOptions = MarkOptions::ODD_OK.union(MarkOptions::KEEP_NAME);

/// Every mark type understood by the processor.
pub static MARK_TABLE: &[MarkSpec] = &[
    entry("ANN", MarkType::Ann, NAMEABLE),
    entry("LNK", MarkType::Lnk, NAMEABLE),
    entry("OUT", MarkType::Out, NONE),
    entry("ARTICLE", MarkType::Article, NONE),
    entry("DEST", MarkType::Dest, NAMEABLE),
    entry("PS", MarkType::Ps, NAMEABLE),
    entry("PAGES", MarkType::Pages, NONE),
    entry("PAGE", MarkType::Page, NONE),
    entry("PAGELABEL", MarkType::PageLabel, NONE),
    entry("DOCINFO", MarkType::DocInfo, NONE),
    entry("DOCVIEW", MarkType::DocView, NONE),
    entry("BP", MarkType::Bp, NAMEABLE.union(MarkOptions::TRUECTM)),
    entry("EP", MarkType::Ep, NONE),
    entry("SP", MarkType::Sp, EDIT.union(MarkOptions::TRUECTM)),
    entry("OBJ", MarkType::Obj, NAMEABLE),
    entry("PUT", MarkType::Put, EDIT),
    entry(".PUTDICT", MarkType::PutDict, EDIT),
    entry(".PUTINTERVAL", MarkType::PutInterval, EDIT),
    entry(".PUTSTREAM", MarkType::PutStream, EDIT.union(MarkOptions::NO_REFS)),
    entry("APPEND", MarkType::Append, MarkOptions::KEEP_NAME),
    entry("CLOSE", MarkType::Close, EDIT),
    entry("NamespacePush", MarkType::NamespacePush, NONE),
    entry("NamespacePop", MarkType::NamespacePop, NONE),
    entry("NI", MarkType::Ni, NAMEABLE),
    // Marked content and structure marks are accepted but not implemented.
    entry("MP", MarkType::Stub, ODD_OK),
    entry("DP", MarkType::Stub, NONE),
    entry("BMC", MarkType::Stub, ODD_OK),
    entry("BDC", MarkType::Stub, NONE),
    entry("EMC", MarkType::Stub, NONE),
    entry("StRoleMap", MarkType::Stub, NONE),
    entry("StClassMap", MarkType::Stub, NONE),
    entry("StPNE", MarkType::Stub, NAMEABLE),
    entry("StBookmarkRoot", MarkType::Stub, NONE),
    entry("StPush", MarkType::Stub, NONE),
    entry("StPop", MarkType::Stub, NONE),
    entry("StPopAll", MarkType::Stub, NONE),
    entry("StBMC", MarkType::Stub, NONE),
    entry("StBDC", MarkType::Stub, NONE),
    entry("StOBJ", MarkType::Stub, NONE),
    entry("StAttr", MarkType::Stub, NONE),
    entry("StStore", MarkType::Stub, NONE),
    entry("StRetrieve", MarkType::Stub, NONE),
];

/// Find the table entry for a mark type name.
pub fn lookup(name: &str) -> Option<&'static MarkSpec> {
    MARK_TABLE.iter().find(|spec| spec.name == name)
}

/// A normalized mark, as handed to its handler.
#[derive(Debug, Clone)]
pub struct Mark {
    /// Table entry
    pub spec: &'static MarkSpec,
    /// Parameters with the object name removed and references substituted
    pub params: Vec<Vec<u8>>,
    /// Effective transform
    pub ctm: Matrix,
    /// `{name}` from `/_objdef`, for nameable types
    pub objname: Option<Vec<u8>>,
}

/// Identifiers of the trailer's `/Root` and `/Info` objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRoots {
    /// Catalog
    pub catalog: ObjectRef,
    /// Document information dictionary
    pub info: ObjectRef,
}

/// Well-known object names that refer to document structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialName {
    Catalog,
    DocInfo,
    /// One-based page number
    Page(i64),
}

/// A form opened by `/BP` and not yet closed by `/EP`.
#[derive(Debug)]
struct OpenForm {
    name: Vec<u8>,
    dict: Dictionary,
    data: Vec<u8>,
    xobjects: IndexMap<String, ObjectRef>,
}

/// Translates pdfmarks into PDF objects.
///
/// Marks must be delivered in document order: outline siblings, article
/// beads and page labels are linked in the order they arrive.
pub struct PdfmarkProcessor<G: ObjectGraph = PdfWriter> {
    config: PdfmarkConfig,
    graph: G,
    doc: DocumentState,
    names: NamedObjects,
    outline: OutlineBuilder,
    articles: ArticleThreads,
    labels: PageLabelsBuilder,
    /// Lazily created `/Dests` dictionary
    dests: Option<(ObjectRef, Dictionary)>,
    compliance: ComplianceState,
    forms: Vec<OpenForm>,
    /// Named images declared with `/NI`
    ni_stack: Vec<ObjectRef>,
    roots: Option<DocumentRoots>,
}

impl PdfmarkProcessor<PdfWriter> {
    /// Create a processor writing a new PDF file.
    pub fn new(config: PdfmarkConfig) -> Self {
        let version = format!("{:.1}", config.compatibility_level);
        let writer = PdfWriter::with_config(PdfWriterConfig::default().with_version(version));
        Self::with_graph(config, writer)
    }

    /// Close the document and return the complete file.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let roots = self.close()?;
        self.graph.finish(roots.catalog, Some(roots.info))
    }

    /// Close the document and save it to `path`.
    pub fn save(self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl<G: ObjectGraph> PdfmarkProcessor<G> {
    /// Create a processor over an existing object graph.
    pub fn with_graph(config: PdfmarkConfig, mut graph: G) -> Self {
        let doc = DocumentState::new(&mut graph);
        let compliance = ComplianceState::new(&config);
        Self {
            config,
            graph,
            doc,
            names: NamedObjects::new(),
            outline: OutlineBuilder::new(),
            articles: ArticleThreads::new(),
            labels: PageLabelsBuilder::new(),
            dests: None,
            compliance,
            forms: Vec::new(),
            ni_stack: Vec::new(),
            roots: None,
        }
    }

    /// Processing configuration.
    pub fn config(&self) -> &PdfmarkConfig {
        &self.config
    }

    /// The object graph being written.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Page and document-level state.
    pub fn doc(&self) -> &DocumentState {
        &self.doc
    }

    /// Named object registry.
    pub fn names(&self) -> &NamedObjects {
        &self.names
    }

    /// Outline builder.
    pub fn outline(&self) -> &OutlineBuilder {
        &self.outline
    }

    /// Article threads.
    pub fn articles(&self) -> &ArticleThreads {
        &self.articles
    }

    /// Page labels gathered so far.
    pub fn labels(&self) -> &PageLabelsBuilder {
        &self.labels
    }

    /// Entries of the `/Dests` dictionary.
    pub fn dests(&self) -> Option<&Dictionary> {
        self.dests.as_ref().map(|(_, dict)| dict)
    }

    /// Named images declared so far.
    pub fn named_images(&self) -> &[ObjectRef] {
        &self.ni_stack
    }

    /// Whether PDF/A and PDF/X checks are still active.
    pub fn compliance_profiles(&self) -> (u8, bool) {
        (self.compliance.pdfa, self.compliance.pdfx)
    }

    /// Process one mark.
    ///
    /// `name` is the mark type without its slash, `params` the values
    /// preceding it and `ctm` the `[a b c d e f]` device transform. Unknown
    /// types are accepted and ignored. An error aborts only this mark unless
    /// [`Error::is_fatal`] says otherwise.
    pub fn process_mark<S: AsRef<[u8]>>(&mut self, name: &str, params: &[S], ctm: &[u8]) -> Result<()> {
        if self.roots.is_some() {
            return Err(Error::range("document is already closed"));
        }
        let Some(spec) = lookup(name) else {
            log::debug!("ignoring unknown pdfmark /{}", name);
            return Ok(());
        };
        let mut ctm = params::parse_ctm(ctm)?;
        if !spec.options.contains(MarkOptions::TRUECTM) {
            let (xscale, yscale) = self.config.user_space_scale();
            ctm = ctm.rescaled(xscale, yscale);
        }

        let mut params: Vec<Vec<u8>> = params.iter().map(|p| p.as_ref().to_vec()).collect();
        let odd_ok = spec.options.contains(MarkOptions::ODD_OK);
        if params.len() % 2 == 1 && !odd_ok {
            return Err(Error::range(format!("odd number of parameters for /{}", name)));
        }
        let objname = if spec.options.contains(MarkOptions::NAMEABLE) {
            params::extract_objname(&mut params)?
        } else {
            None
        };
        if !spec.options.contains(MarkOptions::NO_REFS) {
            let start = if spec.options.contains(MarkOptions::KEEP_NAME) || !odd_ok {
                1
            } else {
                0
            };
            let step = if odd_ok { 1 } else { 2 };
            for i in (start..params.len()).step_by(step) {
                if let Some(value) = params::replace_names(&params[i], |n| self.reference_text(n))? {
                    params[i] = value;
                }
            }
        }

        let mark = Mark {
            spec,
            params,
            ctm,
            objname,
        };
        log::trace!("pdfmark /{} with {} parameters", name, mark.params.len());
        self.dispatch(&mark)
    }

    fn dispatch(&mut self, mark: &Mark) -> Result<()> {
        match mark.spec.kind {
            MarkType::Ann => self.annot(mark, "Text"),
            MarkType::Lnk => self.annot(mark, "Link"),
            MarkType::Out => self.outline_entry(mark),
            MarkType::Article => self.article(mark),
            MarkType::Dest => self.named_dest(mark),
            MarkType::Ps => self.postscript(mark),
            MarkType::Pages => objects::put_pairs(&mut self.doc.pages_dict, &mark.params),
            MarkType::Page => {
                let page = self.doc.current_page(&mut self.graph);
                objects::put_pairs(&mut page.dict, &mark.params)
            },
            MarkType::PageLabel => self.page_label(mark),
            MarkType::DocInfo => self.doc_info(mark),
            MarkType::DocView => self.doc_view(mark),
            MarkType::Bp => self.begin_form(mark),
            MarkType::Ep => self.end_form(mark),
            MarkType::Sp => self.paint_form(mark),
            MarkType::Obj => self.define_object(mark),
            MarkType::Put => self.put(mark),
            MarkType::PutDict => match mark.params.split_first() {
                Some((target, pairs)) => self.put_dict(target, pairs),
                None => Err(Error::range("/.PUTDICT requires a target")),
            },
            MarkType::PutInterval => self.put_interval(mark),
            MarkType::PutStream => self.put_stream(mark),
            MarkType::Append => self.append(mark),
            MarkType::Close => self.close_stream(mark),
            MarkType::NamespacePush => self.namespace_push(mark),
            MarkType::NamespacePop => self.namespace_pop(mark),
            MarkType::Ni => self.named_image(mark),
            MarkType::Stub => {
                log::trace!("pdfmark /{} is not implemented; ignored", mark.spec.name);
                Ok(())
            },
        }
    }

    /// Move on to the next page (`showpage`).
    pub fn end_page(&mut self) {
        self.doc.end_page();
    }

    /// Close the innermost open outline level.
    pub fn close_outline(&mut self) -> Result<()> {
        self.outline.close_level(&mut self.graph)
    }

    /// Write every article's beads and thread dictionary.
    pub fn finalize_articles(&mut self) -> Result<Vec<ObjectRef>> {
        self.articles.finish(&mut self.graph)
    }

    /// Flush the pending page label.
    pub fn finalize_page_labels(&mut self) {
        self.labels.finish(self.doc.next_page);
    }

    /// Close the document: write every pending structure, the pages, the
    /// Catalog and the Info dictionary. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<DocumentRoots> {
        if let Some(roots) = self.roots {
            return Ok(roots);
        }
        while let Some(form) = self.forms.pop() {
            log::warn!(
                "form {} was never closed with /EP",
                String::from_utf8_lossy(&form.name)
            );
            self.bind_form(form)?;
        }

        if let Some(outlines) = self.outline.finish(&mut self.graph)? {
            self.doc
                .catalog
                .insert("Outlines".to_string(), Object::Reference(outlines));
        }
        let threads = self.finalize_articles()?;
        if !threads.is_empty() {
            let threads = threads.into_iter().map(Object::Reference).collect();
            self.doc.catalog.insert("Threads".to_string(), Object::Array(threads));
        }
        self.finalize_page_labels();
        if !self.labels.is_empty() {
            let id = self.graph.write_new(&self.labels.build())?;
            self.doc.catalog.insert("PageLabels".to_string(), Object::Reference(id));
        }
        if let Some((id, dests)) = self.dests.take() {
            self.graph.write_object(id, &Object::Dictionary(dests))?;
            self.doc.catalog.insert("Dests".to_string(), Object::Reference(id));
        }
        self.names.flush_all(&mut self.graph)?;
        self.write_pages()?;

        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        catalog.insert("Pages".to_string(), Object::Reference(self.doc.pages_id));
        for (key, value) in std::mem::take(&mut self.doc.catalog) {
            catalog.entry(key).or_insert(value);
        }
        self.graph
            .write_object(self.doc.catalog_id, &Object::Dictionary(catalog))?;

        let mut info = std::mem::take(&mut self.doc.info);
        info.entry("Producer".to_string())
            .or_insert_with(|| Object::String(self.config.producer.clone().into_bytes()));
        self.graph.write_object(self.doc.info_id, &Object::Dictionary(info))?;

        let roots = DocumentRoots {
            catalog: self.doc.catalog_id,
            info: self.doc.info_id,
        };
        self.roots = Some(roots);
        Ok(roots)
    }

    fn write_pages(&mut self) -> Result<()> {
        let (pages, missing) = self.doc.take_pages(&mut self.graph);
        if self.doc.max_referred_page > pages.len() as i64 {
            log::warn!(
                "pdfmarks referred to page {}, but the document has only {} pages",
                self.doc.max_referred_page,
                pages.len()
            );
        }
        for page in missing {
            if !page.annots.is_empty() || !page.contents.is_empty() || !page.dict.is_empty() {
                log::warn!("discarding marks placed on page object {}, which was never produced", page.id);
            }
            self.graph.write_object(page.id, &Object::Null)?;
        }
        let [width, height] = self.config.media_size;
        let media_box = Object::raw(format!("[0 0 {} {}]", format_real(width), format_real(height)));
        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let mut dict = Dictionary::new();
            dict.insert("Type".to_string(), Object::name("Page"));
            dict.insert("Parent".to_string(), Object::Reference(self.doc.pages_id));
            dict.insert("MediaBox".to_string(), media_box.clone());
            dict.insert("Resources".to_string(), Object::Dictionary(resources(&page.xobjects)));
            if !page.contents.is_empty() {
                let id = self.graph.write_new(&self.content_stream(page.contents)?)?;
                dict.insert("Contents".to_string(), Object::Reference(id));
            }
            if !page.annots.is_empty() {
                let annots = page.annots.iter().copied().map(Object::Reference).collect();
                dict.insert("Annots".to_string(), Object::Array(annots));
            }
            dict.extend(page.dict);
            self.graph.write_object(page.id, &Object::Dictionary(dict))?;
            kids.push(Object::Reference(page.id));
        }

        let mut tree = Dictionary::new();
        tree.insert("Type".to_string(), Object::name("Pages"));
        tree.insert("Count".to_string(), Object::Integer(kids.len() as i64));
        tree.insert("Kids".to_string(), Object::Array(kids));
        for (key, value) in std::mem::take(&mut self.doc.pages_dict) {
            tree.entry(key).or_insert(value);
        }
        self.graph.write_object(self.doc.pages_id, &Object::Dictionary(tree))
    }

    fn content_stream(&self, data: Vec<u8>) -> Result<Object> {
        let mut dict = Dictionary::new();
        let data = if self.config.compress_streams {
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            compress_data(&data)?
        } else {
            data
        };
        Ok(Object::Stream {
            dict,
            data: data.into(),
        })
    }

    /// Interpret a well-known `{name}`.
    pub(crate) fn special_name(&self, name: &[u8]) -> Option<SpecialName> {
        let inner = name.strip_prefix(b"{")?.strip_suffix(b"}")?;
        let current = self.doc.current_page_number();
        match inner {
            b"Catalog" => Some(SpecialName::Catalog),
            b"DocInfo" => Some(SpecialName::DocInfo),
            b"ThisPage" => Some(SpecialName::Page(current)),
            b"PrevPage" => Some(SpecialName::Page(current - 1)),
            b"NextPage" => Some(SpecialName::Page(current + 1)),
            _ => {
                let digits = inner.strip_prefix(b"Page")?;
                if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                    return None;
                }
                std::str::from_utf8(digits).ok()?.parse().ok().map(SpecialName::Page)
            },
        }
    }

    /// Object a `{name}` refers to, creating a forward reference if needed.
    pub(crate) fn reference_for(&mut self, name: &[u8]) -> Result<ObjectRef> {
        match self.special_name(name) {
            Some(SpecialName::Catalog) => Ok(self.doc.catalog_id),
            Some(SpecialName::DocInfo) => Ok(self.doc.info_id),
            Some(SpecialName::Page(number)) => self
                .doc
                .page_id(&mut self.graph, number)
                .ok_or_else(|| Error::range(format!("no page {}", number))),
            None => Ok(self.names.resolve(&mut self.graph, name)),
        }
    }

    fn reference_text(&mut self, name: &[u8]) -> Result<Vec<u8>> {
        Ok(self.reference_for(name)?.to_string().into_bytes())
    }

    /// Append operators to the open form, or to the current page.
    pub(crate) fn emit_content(&mut self, bytes: &[u8]) {
        match self.forms.last_mut() {
            Some(form) => form.data.extend_from_slice(bytes),
            None => self
                .doc
                .current_page(&mut self.graph)
                .contents
                .extend_from_slice(bytes),
        }
    }

    /// Register `id` as XObject resource `/R<id>` where content goes.
    pub(crate) fn use_xobject(&mut self, id: ObjectRef) {
        let name = format!("R{}", id.id);
        match self.forms.last_mut() {
            Some(form) => {
                form.xobjects.insert(name, id);
            },
            None => {
                self.doc.current_page(&mut self.graph).xobjects.insert(name, id);
            },
        }
    }
}

/// Resource dictionary for a set of painted XObjects.
fn resources(xobjects: &IndexMap<String, ObjectRef>) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("ProcSet".to_string(), Object::raw("[/PDF]"));
    if !xobjects.is_empty() {
        let entries = xobjects
            .iter()
            .map(|(name, id)| (name.clone(), Object::Reference(*id)))
            .collect();
        dict.insert("XObject".to_string(), Object::Dictionary(entries));
    }
    dict
}

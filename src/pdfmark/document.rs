//! Page and document-level bookkeeping.
//!
//! Tracks the page being produced, allocates page object identifiers on
//! demand (marks routinely refer to pages that do not exist yet) and holds
//! the Catalog, Info and Pages dictionaries until the document is closed.
//! Only pages that are referred to get state; a reference to page 5 does not
//! create pages 2 to 4.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::object::{Dictionary, ObjectRef};
use crate::writer::ObjectGraph;

/// Everything gathered for one page.
#[derive(Debug, Clone)]
pub struct PageState {
    /// Page object identifier
    pub id: ObjectRef,
    /// Extra page dictionary entries from `/PAGE` marks
    pub dict: Dictionary,
    /// Annotations in the order they were added
    pub annots: Vec<ObjectRef>,
    /// Content stream operators emitted by marks
    pub contents: Vec<u8>,
    /// XObjects painted from the content stream, by resource name
    pub xobjects: IndexMap<String, ObjectRef>,
}

impl PageState {
    fn new(id: ObjectRef) -> Self {
        Self {
            id,
            dict: Dictionary::new(),
            annots: Vec::new(),
            contents: Vec::new(),
            xobjects: IndexMap::new(),
        }
    }
}

/// Document-wide state shared by the mark handlers.
#[derive(Debug)]
pub struct DocumentState {
    /// Page state by zero-based index
    pages: BTreeMap<usize, PageState>,
    /// Zero-based index of the page being produced
    pub next_page: usize,
    /// Highest page number any mark referred to
    pub max_referred_page: i64,
    /// Catalog identifier
    pub catalog_id: ObjectRef,
    /// Catalog entries
    pub catalog: Dictionary,
    /// Document information identifier
    pub info_id: ObjectRef,
    /// Document information entries
    pub info: Dictionary,
    /// Page tree root identifier
    pub pages_id: ObjectRef,
    /// Extra page tree root entries from `/PAGES` marks
    pub pages_dict: Dictionary,
}

impl DocumentState {
    /// Allocate the document-level objects.
    pub fn new(graph: &mut dyn ObjectGraph) -> Self {
        Self {
            pages: BTreeMap::new(),
            next_page: 0,
            max_referred_page: 0,
            catalog_id: graph.allocate_id(),
            catalog: Dictionary::new(),
            info_id: graph.allocate_id(),
            info: Dictionary::new(),
            pages_id: graph.allocate_id(),
            pages_dict: Dictionary::new(),
        }
    }

    /// One-based number of the page being produced.
    pub fn current_page_number(&self) -> i64 {
        self.next_page as i64 + 1
    }

    /// State of page `number` (one-based), creating it on first use. `None`
    /// for numbers below 1.
    pub fn page_mut(&mut self, graph: &mut dyn ObjectGraph, number: i64) -> Option<&mut PageState> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        Some(
            self.pages
                .entry(index)
                .or_insert_with(|| PageState::new(graph.allocate_id())),
        )
    }

    /// Object identifier of page `number` (one-based).
    pub fn page_id(&mut self, graph: &mut dyn ObjectGraph, number: i64) -> Option<ObjectRef> {
        self.page_mut(graph, number).map(|page| page.id)
    }

    /// State of the page being produced.
    pub fn current_page(&mut self, graph: &mut dyn ObjectGraph) -> &mut PageState {
        self.pages
            .entry(self.next_page)
            .or_insert_with(|| PageState::new(graph.allocate_id()))
    }

    /// Already-created state of page `number`, if any.
    pub fn page(&self, number: i64) -> Option<&PageState> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.pages.get(&index)
    }

    /// Move on to the next page.
    pub fn end_page(&mut self) {
        self.next_page += 1;
    }

    /// Pages created so far in page order, including pages only referred to.
    pub fn pages(&self) -> impl Iterator<Item = &PageState> {
        self.pages.values()
    }

    /// Number of pages the job produced; at least one.
    pub fn produced_pages(&self) -> usize {
        self.next_page.max(1)
    }

    /// Split the page state into the produced pages, in order, and the pages
    /// that were referred to but never produced.
    pub(crate) fn take_pages(&mut self, graph: &mut dyn ObjectGraph) -> (Vec<PageState>, Vec<PageState>) {
        let produced = self.produced_pages();
        let mut pages = std::mem::take(&mut self.pages);
        let missing = pages.split_off(&produced);
        let pages = (0..produced)
            .map(|index| {
                pages
                    .remove(&index)
                    .unwrap_or_else(|| PageState::new(graph.allocate_id()))
            })
            .collect();
        (pages, missing.into_values().collect())
    }
}

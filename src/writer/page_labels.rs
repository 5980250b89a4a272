//! Page label accumulation for PDF documents.
//!
//! Labels arrive one page at a time as the document is produced. Each label
//! opens an interval that lasts until the next labelled page; pages in a gap
//! after a labelled page get an empty label so the prefix does not carry
//! over. See ISO 32000-1:2008, Section 12.4.2 - Page Labels.

use crate::object::{Dictionary, Object};

/// Incremental builder for the `/PageLabels` number tree.
#[derive(Debug, Default)]
pub struct PageLabelsBuilder {
    /// Finalized `(start page index, label dictionary)` intervals
    ranges: Vec<(usize, Dictionary)>,
    /// Label waiting for its page to end
    pending: Option<Dictionary>,
    /// Page index of the pending label
    current_page: usize,
    started: bool,
}

impl PageLabelsBuilder {
    /// Create a new page labels builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label of page `page` (0-based) to the prefix `label`, given
    /// as literal string syntax such as `(iv)`.
    ///
    /// The last label set for a page wins.
    pub fn set_label(&mut self, page: usize, label: &[u8]) {
        let mut dict = Dictionary::new();
        dict.insert("P".to_string(), Object::raw(label));
        self.update(page, Some(dict));
    }

    /// Flush the pending label; `page` is the index of the current page.
    pub fn finish(&mut self, page: usize) {
        self.update(page, None);
    }

    fn update(&mut self, page: usize, label: Option<Dictionary>) {
        if label.is_some() && !self.started {
            self.started = true;
            self.current_page = 0;
            self.pending = Some(Dictionary::new());
        }
        if label.is_none() || page != self.current_page {
            if let Some(dict) = self.pending.take() {
                self.ranges.push((self.current_page, dict));
            }
            if self.started && page > self.current_page + 1 {
                self.ranges.push((self.current_page + 1, Dictionary::new()));
            }
        }
        self.pending = label;
        self.current_page = page;
    }

    /// Whether any label was ever set.
    pub fn is_empty(&self) -> bool {
        !self.started
    }

    /// Finalized intervals so far.
    pub fn ranges(&self) -> &[(usize, Dictionary)] {
        &self.ranges
    }

    /// Build the page labels as a PDF number tree dictionary.
    ///
    /// Returns a dictionary suitable for the /PageLabels entry in the catalog.
    pub fn build(&self) -> Object {
        let mut nums = Vec::with_capacity(self.ranges.len() * 2);
        for (page, dict) in &self.ranges {
            nums.push(Object::Integer(*page as i64));
            nums.push(Object::Dictionary(dict.clone()));
        }
        let mut tree = Dictionary::new();
        tree.insert("Nums".to_string(), Object::Array(nums));
        Object::Dictionary(tree)
    }
}

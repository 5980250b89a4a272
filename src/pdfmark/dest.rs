//! Destination resolution.
//!
//! `/Page` and `/View` pairs name a place in the document. They are folded
//! into a single explicit destination array, `[pageref /XYZ ...]`, shared by
//! links, outline entries, named destinations and the open action.

use crate::error::{Error, Result};
use crate::writer::ObjectGraph;

use super::params::{find_key, key_eq};
use super::scan::{scan_int, MAX_DEST_STRING};
use super::PdfmarkProcessor;

const DEFAULT_VIEW: &[u8] = b"[/XYZ null null null]";

impl<G: ObjectGraph> PdfmarkProcessor<G> {
    /// One-based page number named by a `/Page` value.
    ///
    /// No value means the current page; `/Next` and `/Prev` are relative to
    /// it. Anything unparseable is page 0, which resolves to no page.
    pub(crate) fn page_number(&mut self, value: Option<&[u8]>) -> i64 {
        let current = self.doc.current_page_number();
        let page = match value {
            None => current,
            Some(v) if key_eq(v, "Next") => current + 1,
            Some(v) if key_eq(v, "Prev") => current - 1,
            Some(v) => scan_int(v).unwrap_or(0),
        };
        if page > self.doc.max_referred_page {
            self.doc.max_referred_page = page;
        }
        page
    }

    /// Build the destination array for `params`.
    ///
    /// Returns the destination and how many of `page_key` and `view_key`
    /// were present. The page window is only enforced when one of them was
    /// given or `require_page` is set.
    pub(crate) fn make_dest(
        &mut self,
        params: &[Vec<u8>],
        page_key: &str,
        view_key: &str,
        require_page: bool,
    ) -> Result<(Vec<u8>, usize)> {
        let page_value = find_key(params, page_key);
        let view_value = find_key(params, view_key);
        let present = usize::from(page_value.is_some()) + usize::from(view_value.is_some());

        let mut page = self.page_number(page_value);
        let (first, last) = (self.config.first_page, self.config.last_page);
        if (present > 0 || require_page) && (page < first || (last != 0 && page > last)) {
            return Err(Error::range(format!(
                "page {} is outside the page range {}-{}",
                page, first, last
            )));
        }
        if first != 0 {
            page = page - first + 1;
        }

        let view = view_value.unwrap_or(DEFAULT_VIEW);
        let remote = find_key(params, "Action").is_some_and(|a| key_eq(a, "GoToR"));
        let mut dest = if page == 0 {
            b"[null ".to_vec()
        } else if remote {
            format!("[{} ", page - 1).into_bytes()
        } else {
            match self.doc.page_id(&mut self.graph, page) {
                Some(id) => format!("[{} ", id).into_bytes(),
                None => b"[null ".to_vec(),
            }
        };

        let view = view.trim_ascii();
        if dest.len() + view.len() > MAX_DEST_STRING {
            return Err(Error::limit("destination too long"));
        }
        if view.len() < 2 || view[0] != b'[' || view[view.len() - 1] != b']' {
            return Err(Error::range(format!(
                "/{} must be an array: {}",
                view_key,
                String::from_utf8_lossy(view)
            )));
        }
        dest.extend_from_slice(&view[1..]);
        Ok((dest, present))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PdfmarkConfig;
    use crate::error::Error;
    use crate::pdfmark::PdfmarkProcessor;

    fn strings(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn processor(config: PdfmarkConfig) -> PdfmarkProcessor {
        PdfmarkProcessor::new(config.with_resolution(72.0, 72.0))
    }

    #[test]
    fn test_default_dest_is_current_page() {
        let mut p = processor(PdfmarkConfig::new());
        let (dest, present) = p.make_dest(&[], "Page", "View", false).unwrap();
        assert_eq!(present, 0);
        let page = p.doc.page_id(&mut p.graph, 1).unwrap();
        assert_eq!(dest, format!("[{} /XYZ null null null]", page).into_bytes());
    }

    #[test]
    fn test_page_and_view() {
        let mut p = processor(PdfmarkConfig::new());
        let params = strings(&["/Page", "3", "/View", "[/Fit]"]);
        let (dest, present) = p.make_dest(&params, "Page", "View", false).unwrap();
        assert_eq!(present, 2);
        let page = p.doc.page_id(&mut p.graph, 3).unwrap();
        assert_eq!(dest, format!("[{} /Fit]", page).into_bytes());
        assert_eq!(p.doc.max_referred_page, 3);
    }

    #[test]
    fn test_relative_pages() {
        let mut p = processor(PdfmarkConfig::new());
        p.end_page();
        assert_eq!(p.page_number(Some(b"/Next")), 3);
        assert_eq!(p.page_number(Some(b"/Prev")), 1);
        assert_eq!(p.page_number(Some(b"(x)")), 0);
    }

    #[test]
    fn test_remote_page_is_zero_based() {
        let mut p = processor(PdfmarkConfig::new());
        let params = strings(&["/Action", "/GoToR", "/Page", "4"]);
        let (dest, _) = p.make_dest(&params, "Page", "View", false).unwrap();
        assert_eq!(dest, b"[3 /XYZ null null null]");
    }

    #[test]
    fn test_page_window() {
        let mut p = processor(PdfmarkConfig::new().with_page_window(2, 4));
        let outside = strings(&["/Page", "5"]);
        assert!(matches!(
            p.make_dest(&outside, "Page", "View", false),
            Err(Error::RangeCheck(_))
        ));
        let inside = strings(&["/Page", "3"]);
        let (dest, _) = p.make_dest(&inside, "Page", "View", false).unwrap();
        let renumbered = p.doc.page_id(&mut p.graph, 2).unwrap();
        assert!(dest.starts_with(format!("[{} ", renumbered).as_bytes()));
    }

    #[test]
    fn test_bad_view() {
        let mut p = processor(PdfmarkConfig::new());
        let params = strings(&["/View", "/Fit"]);
        assert!(matches!(
            p.make_dest(&params, "Page", "View", false),
            Err(Error::RangeCheck(_))
        ));
        let long = format!("[/XYZ {}]", "1 ".repeat(40));
        let params = strings(&["/View", &long]);
        assert!(matches!(
            p.make_dest(&params, "Page", "View", false),
            Err(Error::LimitCheck(_))
        ));
    }
}

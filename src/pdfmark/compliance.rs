//! PDF/A and PDF/X annotation checks.
//!
//! PDF/A requires every annotation to print; PDF/X forbids annotations on
//! the visible page area except trap networks and printer marks. A
//! violation is resolved by the configured [`CompatibilityPolicy`].

use crate::config::{CompatibilityPolicy, PdfmarkConfig};
use crate::error::{Error, Result};
use crate::geometry::Matrix;
use crate::object::{Dictionary, Object};

use super::params::{find_key, key_eq};
use super::scan::{scan_int, scan_rect};

/// Annotation flag bit 3, Print.
const PRINT_FLAG: i64 = 4;

/// What to do with an annotation after the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Keep,
    Drop,
}

#[derive(Debug, Clone, Copy)]
enum Profile {
    PdfA,
    PdfX,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Profile::PdfA => "PDF/A",
            Profile::PdfX => "PDF/X",
        })
    }
}

/// Active output profiles. A profile is switched off for the rest of the
/// document once an annotation breaks it under the warn policy.
#[derive(Debug, Clone)]
pub(crate) struct ComplianceState {
    pub pdfa: u8,
    pub pdfx: bool,
    pub policy: CompatibilityPolicy,
}

impl ComplianceState {
    pub fn new(config: &PdfmarkConfig) -> Self {
        Self {
            pdfa: config.pdfa,
            pdfx: config.pdfx,
            policy: config.compatibility_policy,
        }
    }

    /// Check an annotation's parameters against the active profiles.
    ///
    /// `page_dict` holds the entries set on the annotation's page so far.
    pub fn check_annotation(
        &mut self,
        params: &[Vec<u8>],
        ctm: &Matrix,
        page_dict: Option<&Dictionary>,
        config: &PdfmarkConfig,
    ) -> Result<Verdict> {
        if self.pdfa > 0 {
            let flags = match find_key(params, "F") {
                Some(value) => scan_int(value).unwrap_or_else(|_| {
                    log::warn!(
                        "annotation has unreadable /F flags {}",
                        String::from_utf8_lossy(value)
                    );
                    0
                }),
                None => 0,
            };
            if flags & PRINT_FLAG == 0
                && self.violation(Profile::PdfA, "annotation without the Print flag")? == Verdict::Drop
            {
                return Ok(Verdict::Drop);
            }
        }

        if self.pdfx {
            let exempt = find_key(params, "Subtype")
                .is_some_and(|s| key_eq(s, "TrapNet") || key_eq(s, "PrinterMark"));
            if !exempt {
                let on_page = match find_key(params, "Rect") {
                    None => true,
                    Some(rect) => {
                        let rect = scan_rect(rect, ctm)?;
                        let [x0, y0, x1, y1] = page_box(page_dict, config);
                        !(rect.p.x > x1 || rect.q.x < x0 || rect.p.y > y1 || rect.q.y < y0)
                    },
                };
                if on_page && self.violation(Profile::PdfX, "annotation on the page area")? == Verdict::Drop {
                    return Ok(Verdict::Drop);
                }
            }
        }
        Ok(Verdict::Keep)
    }

    fn violation(&mut self, profile: Profile, what: &str) -> Result<Verdict> {
        match self.policy {
            CompatibilityPolicy::Warn => {
                log::warn!("{} is not permitted in {}; reverting to normal PDF output", what, profile);
                match profile {
                    Profile::PdfA => self.pdfa = 0,
                    Profile::PdfX => self.pdfx = false,
                }
                Ok(Verdict::Keep)
            },
            CompatibilityPolicy::Drop => {
                log::warn!("{} is not permitted in {}; annotation dropped", what, profile);
                Ok(Verdict::Drop)
            },
            CompatibilityPolicy::Abort => Err(Error::Compliance(format!(
                "{} is not permitted in {}",
                what, profile
            ))),
        }
    }
}

/// Area an annotation must stay clear of: the media box, with its lower
/// left corner pulled in by any page boxes set on the page. Without page
/// boxes the configured trim or bleed offsets apply.
fn page_box(page_dict: Option<&Dictionary>, config: &PdfmarkConfig) -> [f64; 4] {
    let mut area = [0.0, 0.0, config.media_size[0], config.media_size[1]];
    let mut any_box = false;
    for key in ["CropBox", "BleedBox", "TrimBox", "ArtBox"] {
        let Some(value) = page_dict.and_then(|dict| dict.get(key)) else {
            continue;
        };
        any_box = true;
        let Object::Raw(text) = value else {
            continue;
        };
        if let Ok(rect) = scan_rect(text, &Matrix::identity()) {
            area[0] = area[0].max(rect.p.x);
            area[1] = area[1].max(rect.p.y);
        }
    }
    if any_box {
        return area;
    }
    let valid = |offset: &Option<[f64; 4]>| offset.filter(|o| o.iter().all(|&v| v >= 0.0));
    if let Some([left, right, top, bottom]) = valid(&config.trimbox_to_mediabox_offset) {
        area[0] += left;
        area[1] += bottom;
        area[2] -= right;
        area[3] -= top;
    } else if let Some([left, right, top, bottom]) = valid(&config.bleedbox_to_trimbox_offset) {
        area[0] -= left;
        area[1] -= bottom;
        area[2] += right;
        area[3] += top;
    }
    area
}

//! PDF document writer.
//!
//! Objects are serialized as soon as they are written, so the body of the
//! file grows in the order the mark handlers finish their objects. The xref
//! table and trailer are emitted by [`PdfWriter::finish`].

use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::BTreeMap;
use std::io::Write;

/// The object-graph service the mark handlers write through.
///
/// Identifiers are allocated up front so that objects can reference each
/// other before they exist; each identifier may be written exactly once.
pub trait ObjectGraph {
    /// Allocate a fresh object identifier.
    fn allocate_id(&mut self) -> ObjectRef;

    /// Serialize `obj` as the indirect object `id`.
    ///
    /// Writing the same identifier twice is a `RangeCheck` error.
    fn write_object(&mut self, id: ObjectRef, obj: &Object) -> Result<()>;

    /// Whether `id` has already been written.
    fn is_written(&self, id: ObjectRef) -> bool;

    /// Allocate an identifier and write `obj` under it.
    fn write_new(&mut self, obj: &Object) -> Result<ObjectRef> {
        let id = self.allocate_id();
        self.write_object(id, obj)?;
        Ok(id)
    }
}

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Whether to use compact formatting
    pub compact: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            compact: true,
        }
    }
}

impl PdfWriterConfig {
    /// Set the PDF header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Enable or disable compact formatting.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for FlateDecode filter.
pub(crate) fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// PDF document writer and default [`ObjectGraph`].
pub struct PdfWriter {
    serializer: ObjectSerializer,
    /// Object ID counter
    next_obj_id: u32,
    /// File body written so far
    output: Vec<u8>,
    /// Byte offset of each written object
    offsets: BTreeMap<u32, usize>,
    /// Copies of written objects, for inspection
    objects: BTreeMap<u32, Object>,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        let mut output = Vec::new();
        output.extend_from_slice(format!("%PDF-{}\n", config.version).as_bytes());
        // Binary marker (recommended for binary content)
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        let serializer = if config.compact {
            ObjectSerializer::compact()
        } else {
            ObjectSerializer::new()
        };
        Self {
            serializer,
            next_obj_id: 1,
            output,
            offsets: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// A written object, by identifier.
    pub fn get(&self, id: ObjectRef) -> Option<&Object> {
        self.objects.get(&id.id)
    }

    /// Number of objects written so far.
    pub fn written_count(&self) -> usize {
        self.objects.len()
    }

    /// Identifiers allocated but never written.
    pub fn unwritten_ids(&self) -> Vec<ObjectRef> {
        (1..self.next_obj_id)
            .filter(|id| !self.offsets.contains_key(id))
            .map(|id| ObjectRef::new(id, 0))
            .collect()
    }

    /// Write the xref table and trailer and return the complete file.
    pub fn finish(self, root: ObjectRef, info: Option<ObjectRef>) -> Result<Vec<u8>> {
        let mut output = self.output;

        let unwritten = (1..self.next_obj_id)
            .filter(|id| !self.offsets.contains_key(id))
            .count();
        if unwritten > 0 {
            log::warn!("{} allocated objects were never written", unwritten);
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", self.next_obj_id)?;
        // Object 0 is always free
        writeln!(output, "0000000000 65535 f ")?;
        for id in 1..self.next_obj_id {
            match self.offsets.get(&id) {
                Some(offset) => writeln!(output, "{:010} 00000 n ", offset)?,
                None => writeln!(output, "0000000000 00001 f ")?,
            }
        }

        let mut entries = vec![
            ("Size", Object::Integer(self.next_obj_id as i64)),
            ("Root", Object::Reference(root)),
        ];
        if let Some(info) = info {
            entries.push(("Info", Object::Reference(info)));
        }
        let trailer = ObjectSerializer::dict(entries);

        writeln!(output, "trailer")?;
        output.extend_from_slice(&self.serializer.serialize(&trailer)?);
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        Ok(output)
    }

    /// Finish the file and save it.
    pub fn save(
        self,
        root: ObjectRef,
        info: Option<ObjectRef>,
        path: impl AsRef<std::path::Path>,
    ) -> Result<()> {
        let bytes = self.finish(root, info)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl ObjectGraph for PdfWriter {
    fn allocate_id(&mut self) -> ObjectRef {
        let id = self.next_obj_id;
        self.next_obj_id += 1;
        ObjectRef::new(id, 0)
    }

    fn write_object(&mut self, id: ObjectRef, obj: &Object) -> Result<()> {
        if id.id == 0 || id.id >= self.next_obj_id {
            return Err(Error::range(format!("object {} was never allocated", id)));
        }
        if self.offsets.contains_key(&id.id) {
            return Err(Error::range(format!("object {} written twice", id)));
        }
        let bytes = self.serializer.serialize_indirect(id, obj)?;
        self.offsets.insert(id.id, self.output.len());
        self.output.extend_from_slice(&bytes);
        self.objects.insert(id.id, obj.clone());
        Ok(())
    }

    fn is_written(&self, id: ObjectRef) -> bool {
        self.offsets.contains_key(&id.id)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential_ids() {
        let mut writer = PdfWriter::new();
        assert_eq!(writer.allocate_id(), ObjectRef::new(1, 0));
        assert_eq!(writer.allocate_id(), ObjectRef::new(2, 0));
    }

    #[test]
    fn test_write_once() {
        let mut writer = PdfWriter::new();
        let id = writer.allocate_id();
        writer.write_object(id, &Object::Integer(1)).unwrap();
        assert!(writer.is_written(id));
        let err = writer.write_object(id, &Object::Integer(2)).unwrap_err();
        assert!(matches!(err, Error::RangeCheck(_)));
        assert_eq!(writer.get(id), Some(&Object::Integer(1)));
    }

    #[test]
    fn test_write_unallocated_fails() {
        let mut writer = PdfWriter::new();
        assert!(writer.write_object(ObjectRef::new(5, 0), &Object::Null).is_err());
    }

    #[test]
    fn test_finish_structure() {
        let mut writer = PdfWriter::new();
        let catalog = writer.allocate_id();
        let gap = writer.allocate_id();
        writer
            .write_object(catalog, &ObjectSerializer::dict(vec![("Type", Object::name("Catalog"))]))
            .unwrap();
        assert_eq!(writer.unwritten_ids(), vec![gap]);

        let bytes = writer.finish(catalog, None).unwrap();
        let content = String::from_utf8_lossy(&bytes);
        assert!(content.starts_with("%PDF-1.7"));
        assert!(content.contains("1 0 obj\n<</Type /Catalog>>\nendobj"));
        assert!(content.contains("xref\n0 3\n"));
        assert!(content.contains("0000000000 00001 f "));
        assert!(content.contains("/Root 1 0 R"));
        assert!(content.ends_with("%%EOF"));
    }

    #[test]
    fn test_compress_data_roundtrip() {
        use std::io::Read;
        let data = b"q 1 0 0 1 0 0 cm /R12 Do Q\n".repeat(10);
        let compressed = compress_data(&data).unwrap();
        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}

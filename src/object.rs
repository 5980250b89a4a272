//! PDF object types.
//!
//! The object model used for everything the mark handlers build. Values taken
//! verbatim from a mark's parameters are kept as [`Object::Raw`] so that the
//! author's spelling reaches the output unchanged.

use indexmap::IndexMap;

/// Dictionary with insertion-ordered keys (stored without the leading `/`).
pub type Dictionary = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (without the leading /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
    /// Pre-encoded PDF syntax copied into the output as-is
    Raw(Vec<u8>),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Build a raw object from author-supplied value syntax.
    pub fn raw(bytes: impl AsRef<[u8]>) -> Self {
        Object::Raw(bytes.as_ref().to_vec())
    }

    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
            Object::Raw(_) => "Raw",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw value syntax, if this object was taken verbatim from a mark.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Object::Raw(r) => Some(r),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::name("Annot");
        assert_eq!(obj.as_name(), Some("Annot"));
        assert_eq!(obj.type_name(), "Name");
    }

    #[test]
    fn test_object_raw() {
        let obj = Object::raw(b"(Hello)");
        assert_eq!(obj.as_raw(), Some(&b"(Hello)"[..]));
        assert!(obj.as_string().is_none());
        assert_eq!(obj.type_name(), "Raw");
    }

    #[test]
    fn test_stream_as_dict() {
        let mut dict = Dictionary::new();
        dict.insert("Subtype".to_string(), Object::name("Form"));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"q Q"),
        };
        assert_eq!(obj.as_dict().and_then(|d| d.get("Subtype")), Some(&Object::name("Form")));
    }

    #[test]
    fn test_dictionary_keeps_insertion_order() {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        dict.insert("Subtype".to_string(), Object::name("Link"));
        dict.insert("Rect".to_string(), Object::raw("[0 0 1 1]"));
        let keys: Vec<&str> = dict.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Type", "Subtype", "Rect"]);
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(format!("{}", ObjectRef::new(12, 0)), "12 0 R");
        assert_eq!(Object::Reference(ObjectRef::new(3, 0)).as_reference(), Some(ObjectRef::new(3, 0)));
    }
}

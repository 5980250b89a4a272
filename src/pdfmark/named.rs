//! Named object registry.
//!
//! Marks may name the objects they create (`/_objdef {name}`) and refer to
//! named objects from any value. A name can be used before it is defined:
//! the first reference allocates the identifier and leaves a placeholder
//! that the defining mark later fills in, so every reference to a name
//! resolves to the same object number.
//!
//! Names live in a stack of scopes. Lookups search from the innermost scope
//! outwards; new names go into the innermost one. Popping a scope writes
//! every object it still holds.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::{compress_data, ObjectGraph};

/// Kind of a concrete named object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Array object
    Array,
    /// Dictionary object
    Dict,
    /// Stream object
    Stream,
}

impl ObjectKind {
    fn label(self) -> &'static str {
        match self {
            ObjectKind::Array => "array",
            ObjectKind::Dict => "dictionary",
            ObjectKind::Stream => "stream",
        }
    }
}

/// Payload of a named object.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedObject {
    /// Referenced but not yet defined
    Placeholder,
    /// Array under construction
    Array(Vec<Object>),
    /// Dictionary under construction
    Dict(Dictionary),
    /// Stream under construction
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Uncompressed data
        data: Vec<u8>,
        /// Whether more data may be appended
        open: bool,
        /// Whether the stream is a paintable form
        graphics: bool,
        /// Flate-compress the data when written
        compress: bool,
    },
}

impl NamedObject {
    /// An empty object of the given kind. Streams start open.
    pub fn empty(kind: ObjectKind, compress: bool) -> Self {
        match kind {
            ObjectKind::Array => NamedObject::Array(Vec::new()),
            ObjectKind::Dict => NamedObject::Dict(Dictionary::new()),
            ObjectKind::Stream => NamedObject::Stream {
                dict: Dictionary::new(),
                data: Vec::new(),
                open: true,
                graphics: false,
                compress,
            },
        }
    }

    /// Kind of the object, `None` for a placeholder.
    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            NamedObject::Placeholder => None,
            NamedObject::Array(_) => Some(ObjectKind::Array),
            NamedObject::Dict(_) => Some(ObjectKind::Dict),
            NamedObject::Stream { .. } => Some(ObjectKind::Stream),
        }
    }

    /// Dictionary of a dictionary or stream object.
    pub fn dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            NamedObject::Dict(dict) | NamedObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// The object as written, stream data compressed if requested.
    pub(crate) fn to_object(&self) -> Result<Object> {
        Ok(match self {
            NamedObject::Placeholder => Object::Null,
            NamedObject::Array(items) => Object::Array(items.clone()),
            NamedObject::Dict(dict) => Object::Dictionary(dict.clone()),
            NamedObject::Stream { dict, data, compress, .. } => {
                let mut dict = dict.clone();
                let data = if *compress && !data.is_empty() && !dict.contains_key("Filter") {
                    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                    compress_data(data)?
                } else {
                    data.clone()
                };
                Object::Stream {
                    dict,
                    data: data.into(),
                }
            },
        })
    }
}

/// One registry entry.
#[derive(Debug, Clone)]
pub struct NamedEntry {
    /// Identifier every reference to the name resolves to
    pub id: ObjectRef,
    /// Current payload
    pub object: NamedObject,
    /// Whether the object has been written and is now immutable
    pub written: bool,
}

impl NamedEntry {
    fn write(&mut self, graph: &mut dyn ObjectGraph, name: &[u8]) -> Result<()> {
        if self.written {
            return Ok(());
        }
        if self.object == NamedObject::Placeholder {
            log::warn!(
                "named object {} was referenced but never defined; writing null",
                String::from_utf8_lossy(name)
            );
        }
        graph.write_object(self.id, &self.object.to_object()?)?;
        self.written = true;
        Ok(())
    }
}

type Scope = IndexMap<Vec<u8>, NamedEntry>;

/// Scoped table of named objects.
#[derive(Debug)]
pub struct NamedObjects {
    scopes: Vec<Scope>,
}

impl Default for NamedObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl NamedObjects {
    /// Create a registry with just the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    /// Number of open scopes, global scope included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look up a name without creating it.
    pub fn get(&self, name: &[u8]) -> Option<&NamedEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Mutable lookup without creating the name.
    pub fn get_mut(&mut self, name: &[u8]) -> Option<&mut NamedEntry> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    fn current(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn entry_mut(&mut self, graph: &mut dyn ObjectGraph, name: &[u8]) -> &mut NamedEntry {
        self.current();
        let idx = self
            .scopes
            .iter()
            .rposition(|scope| scope.contains_key(name))
            .unwrap_or(self.scopes.len() - 1);
        self.scopes[idx]
            .entry(name.to_vec())
            .or_insert_with(|| NamedEntry {
                id: graph.allocate_id(),
                object: NamedObject::Placeholder,
                written: false,
            })
    }

    /// Identifier for `name`, leaving a placeholder if it is not yet known.
    pub fn resolve(&mut self, graph: &mut dyn ObjectGraph, name: &[u8]) -> ObjectRef {
        self.entry_mut(graph, name).id
    }

    /// The object named `name` as the given kind.
    ///
    /// A placeholder becomes an empty object of that kind; a concrete object
    /// of another kind is a `TypeCheck` error.
    pub fn get_typed(
        &mut self,
        graph: &mut dyn ObjectGraph,
        name: &[u8],
        kind: ObjectKind,
        compress: bool,
    ) -> Result<&mut NamedEntry> {
        let entry = self.entry_mut(graph, name);
        match entry.object.kind() {
            None => entry.object = NamedObject::empty(kind, compress),
            Some(found) if found != kind => {
                return Err(Error::type_check(format!(
                    "{} is a {}, not a {}",
                    String::from_utf8_lossy(name),
                    found.label(),
                    kind.label()
                )));
            },
            Some(_) => {},
        }
        Ok(entry)
    }

    /// Give `name` its definition.
    ///
    /// Fills a placeholder or creates the name; redefining a concrete object
    /// is a `RangeCheck` error.
    pub fn define(
        &mut self,
        graph: &mut dyn ObjectGraph,
        name: &[u8],
        object: NamedObject,
    ) -> Result<ObjectRef> {
        let entry = self.entry_mut(graph, name);
        if entry.object != NamedObject::Placeholder {
            return Err(Error::range(format!(
                "object {} is already defined",
                String::from_utf8_lossy(name)
            )));
        }
        entry.object = object;
        Ok(entry.id)
    }

    /// Bind a finished object to `name`.
    ///
    /// A placeholder keeps its identifier. An earlier concrete object under
    /// the same name is written out first, since it may already be
    /// referenced, and the name then moves to a fresh identifier.
    pub fn bind(
        &mut self,
        graph: &mut dyn ObjectGraph,
        name: &[u8],
        object: NamedObject,
    ) -> Result<ObjectRef> {
        if let Some(entry) = self.get_mut(name) {
            if entry.object == NamedObject::Placeholder {
                entry.object = object;
                return Ok(entry.id);
            }
            entry.write(graph, name)?;
            let id = graph.allocate_id();
            entry.id = id;
            entry.object = object;
            entry.written = false;
            return Ok(id);
        }
        let id = graph.allocate_id();
        self.current().insert(
            name.to_vec(),
            NamedEntry {
                id,
                object,
                written: false,
            },
        );
        Ok(id)
    }

    /// Write the object named `name` now, if it exists and is unwritten.
    pub fn write(&mut self, graph: &mut dyn ObjectGraph, name: &[u8]) -> Result<()> {
        match self.get_mut(name) {
            Some(entry) => entry.write(graph, name),
            None => Ok(()),
        }
    }

    /// Open a new local scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Close the innermost scope, writing every object it still holds.
    pub fn pop_scope(&mut self, graph: &mut dyn ObjectGraph) -> Result<()> {
        if self.scopes.len() <= 1 {
            return Err(Error::range("namespace stack underflow"));
        }
        if let Some(mut scope) = self.scopes.pop() {
            write_scope(graph, &mut scope)?;
        }
        Ok(())
    }

    /// Write every unwritten object in every scope, innermost first.
    pub fn flush_all(&mut self, graph: &mut dyn ObjectGraph) -> Result<()> {
        for scope in self.scopes.iter_mut().rev() {
            write_scope(graph, scope)?;
        }
        Ok(())
    }
}

fn write_scope(graph: &mut dyn ObjectGraph, scope: &mut Scope) -> Result<()> {
    for (name, entry) in scope.iter_mut() {
        entry.write(graph, name)?;
    }
    Ok(())
}

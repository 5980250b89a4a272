//! Named object marks: `/OBJ`, `/PUT`, `/.PUTDICT`, `/.PUTINTERVAL`,
//! `/.PUTSTREAM`, `/APPEND`, `/CLOSE`, the namespace marks and `/NI`.

use crate::error::{Error, Result};
use crate::lexer::{self, decode_hex_string, decode_literal_string, TokenKind};
use crate::object::{Dictionary, Object};
use crate::writer::ObjectGraph;

use super::named::{NamedObject, ObjectKind};
use super::params::{is_valid_objname, key_eq, key_name, pairs};
use super::scan::scan_int;
use super::{Mark, PdfmarkProcessor, SpecialName};

/// Largest array a `/PUT` or `/.PUTINTERVAL` may grow (the PostScript
/// array length limit).
pub const MAX_ARRAY_LENGTH: usize = 65535;

fn lossy(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Parse an array index for `mark`, rejecting writes that would grow the
/// array past [`MAX_ARRAY_LENGTH`] once `count` values are stored.
fn array_index(mark: &str, value: &[u8], count: usize) -> Result<usize> {
    let index = scan_int(value)?;
    if index < 0 {
        return Err(Error::range(format!("negative /{} index", mark)));
    }
    match usize::try_from(index).ok().and_then(|i| i.checked_add(count)) {
        Some(end) if end <= MAX_ARRAY_LENGTH => Ok(end - count),
        _ => Err(Error::limit(format!("/{} index {} exceeds the array limit", mark, index))),
    }
}

/// Store `/Key value` pairs into `dict`; an odd count is a `RangeCheck`.
pub(crate) fn put_pairs(dict: &mut Dictionary, params: &[Vec<u8>]) -> Result<()> {
    if params.len() % 2 == 1 {
        return Err(Error::range("odd number of key/value parameters"));
    }
    for (key, value) in pairs(params) {
        dict.insert(key_name(key), Object::raw(value));
    }
    Ok(())
}

/// Split a `<< /Key value ... >>` value into its keys and values.
pub(crate) fn dict_pairs(value: &[u8]) -> Result<Vec<Vec<u8>>> {
    let malformed = || Error::range(format!("malformed dictionary {}", lossy(value)));
    let mut rest = value.strip_prefix(b"<<").ok_or_else(malformed)?;
    let mut out = Vec::new();
    loop {
        let (next, key) = lexer::token(rest).map_err(|_| malformed())?;
        match key.kind {
            TokenKind::DictEnd => return Ok(out),
            TokenKind::Name => {},
            _ => return Err(malformed()),
        }
        let (next, item) = lexer::composite(next).map_err(|_| malformed())?;
        out.push(key.text.to_vec());
        out.push(item.to_vec());
        rest = next;
    }
}

fn check_target(name: &[u8]) -> Result<()> {
    if is_valid_objname(name) {
        Ok(())
    } else {
        Err(Error::range(format!("{} is not an object name", lossy(name))))
    }
}

impl<G: ObjectGraph> PdfmarkProcessor<G> {
    /// Dictionary behind a well-known name.
    fn special_dict(&mut self, special: SpecialName) -> Result<&mut Dictionary> {
        match special {
            SpecialName::Catalog => Ok(&mut self.doc.catalog),
            SpecialName::DocInfo => Ok(&mut self.doc.info),
            SpecialName::Page(number) => self
                .doc
                .page_mut(&mut self.graph, number)
                .map(|page| &mut page.dict)
                .ok_or_else(|| Error::range(format!("no page {}", number))),
        }
    }

    /// Unwritten array named `name`, created from a placeholder if needed.
    fn array_entry(&mut self, name: &[u8]) -> Result<&mut Vec<Object>> {
        if self.special_name(name).is_some() {
            return Err(Error::type_check(format!("{} is not an array", lossy(name))));
        }
        let compress = self.config.compress_streams;
        let entry = self.names.get_typed(&mut self.graph, name, ObjectKind::Array, compress)?;
        if entry.written {
            return Err(Error::range(format!("{} was already written", lossy(name))));
        }
        match &mut entry.object {
            NamedObject::Array(items) => Ok(items),
            _ => Err(Error::type_check(format!("{} is not an array", lossy(name)))),
        }
    }

    /// Unwritten stream named `name`: its data and open flag.
    fn stream_entry(&mut self, name: &[u8]) -> Result<(&mut Vec<u8>, &mut bool)> {
        if self.special_name(name).is_some() {
            return Err(Error::type_check(format!("{} is not a stream", lossy(name))));
        }
        let compress = self.config.compress_streams;
        let entry = self.names.get_typed(&mut self.graph, name, ObjectKind::Stream, compress)?;
        if entry.written {
            return Err(Error::range(format!("{} was already written", lossy(name))));
        }
        match &mut entry.object {
            NamedObject::Stream { data, open, .. } => Ok((data, open)),
            _ => Err(Error::type_check(format!("{} is not a stream", lossy(name)))),
        }
    }

    /// `/OBJ`
    pub(crate) fn define_object(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let Some(name) = &mark.objname else {
            return Err(Error::range("/OBJ requires /_objdef"));
        };
        if params.len() != 2 || !key_eq(&params[0], "type") {
            return Err(Error::range("/OBJ requires exactly /type"));
        }
        let kind = if key_eq(&params[1], "array") {
            ObjectKind::Array
        } else if key_eq(&params[1], "dict") {
            ObjectKind::Dict
        } else if key_eq(&params[1], "stream") {
            ObjectKind::Stream
        } else {
            return Err(Error::range(format!("unknown /OBJ type {}", lossy(&params[1]))));
        };

        if self.special_name(name).is_some() {
            return if kind == ObjectKind::Dict {
                Ok(())
            } else {
                Err(Error::range(format!("{} is a built-in dictionary", lossy(name))))
            };
        }
        match self.names.get(name).and_then(|entry| entry.object.kind()) {
            // Repeating an /OBJ with the same type is accepted.
            Some(existing) if existing == kind => Ok(()),
            Some(_) => Err(Error::range(format!("{} already exists with another type", lossy(name)))),
            None => {
                let compress = self.config.compress_streams;
                self.names
                    .define(&mut self.graph, name, NamedObject::empty(kind, compress))?;
                Ok(())
            },
        }
    }

    /// `/PUT`: `{array} index value`, or `{dict} key value`.
    pub(crate) fn put(&mut self, mark: &Mark) -> Result<()> {
        let params = &mark.params;
        let target = params.first().ok_or_else(|| Error::range("/PUT requires a target"))?;
        check_target(target)?;
        let is_dict = self.special_name(target).is_some()
            || matches!(
                self.names.get(target).and_then(|entry| entry.object.kind()),
                Some(ObjectKind::Dict | ObjectKind::Stream)
            );
        if is_dict {
            return self.put_dict(target, &params[1..]);
        }

        let [_, index, value] = params.as_slice() else {
            return Err(Error::range("/PUT takes an array, an index and a value"));
        };
        let index = array_index("PUT", index, 1)?;
        let items = self.array_entry(target)?;
        if items.len() <= index {
            items.resize(index + 1, Object::Null);
        }
        items[index] = Object::raw(value);
        Ok(())
    }

    /// `/.PUTDICT`: store pairs into a dictionary or a stream's dictionary.
    /// A single `<< ... >>` operand is taken apart into its pairs.
    pub(crate) fn put_dict(&mut self, target: &[u8], params: &[Vec<u8>]) -> Result<()> {
        check_target(target)?;
        let expanded;
        let params = match params {
            [single] if single.starts_with(b"<<") => {
                expanded = dict_pairs(single)?;
                expanded.as_slice()
            },
            _ => params,
        };
        if params.len() % 2 == 1 {
            return Err(Error::range("odd number of /.PUTDICT parameters"));
        }
        if let Some(special) = self.special_name(target) {
            return put_pairs(self.special_dict(special)?, params);
        }

        self.names.resolve(&mut self.graph, target);
        let Some(entry) = self.names.get_mut(target) else {
            return Err(Error::range(format!("{} is not defined", lossy(target))));
        };
        if entry.written {
            return Err(Error::range(format!("{} was already written", lossy(target))));
        }
        match entry.object.dict_mut() {
            Some(dict) => put_pairs(dict, params),
            None => Err(Error::type_check(format!(
                "{} is not a dictionary or stream",
                lossy(target)
            ))),
        }
    }

    /// `/.PUTINTERVAL`
    pub(crate) fn put_interval(&mut self, mark: &Mark) -> Result<()> {
        let [target, index, values @ ..] = mark.params.as_slice() else {
            return Err(Error::range("/.PUTINTERVAL requires an array and an index"));
        };
        check_target(target)?;
        let index = array_index(".PUTINTERVAL", index, values.len())?;
        let items = self.array_entry(target)?;
        let end = index + values.len();
        if items.len() < end {
            items.resize(end, Object::Null);
        }
        for (slot, value) in items[index..end].iter_mut().zip(values) {
            *slot = Object::raw(value);
        }
        Ok(())
    }

    /// `/.PUTSTREAM`: append string data to an open stream.
    pub(crate) fn put_stream(&mut self, mark: &Mark) -> Result<()> {
        let [target, chunks @ ..] = mark.params.as_slice() else {
            return Err(Error::range("/.PUTSTREAM requires a stream"));
        };
        if chunks.is_empty() {
            return Err(Error::range("/.PUTSTREAM requires data"));
        }
        check_target(target)?;
        let (data, open) = self.stream_entry(target)?;
        if !*open {
            return Err(Error::range(format!("stream {} is closed", lossy(target))));
        }
        for chunk in chunks {
            match chunk.first() {
                Some(b'(') => data.extend_from_slice(&decode_literal_string(chunk)),
                Some(b'<') if !chunk.starts_with(b"<<") => data.extend_from_slice(&decode_hex_string(chunk)),
                _ => data.extend_from_slice(chunk),
            }
        }
        Ok(())
    }

    /// `/APPEND`
    pub(crate) fn append(&mut self, mark: &Mark) -> Result<()> {
        let [target, value] = mark.params.as_slice() else {
            return Err(Error::range("/APPEND takes an array and a value"));
        };
        check_target(target)?;
        let items = self.array_entry(target)?;
        if items.len() >= MAX_ARRAY_LENGTH {
            return Err(Error::limit("/APPEND exceeds the array limit"));
        }
        items.push(Object::raw(value));
        Ok(())
    }

    /// `/CLOSE`
    pub(crate) fn close_stream(&mut self, mark: &Mark) -> Result<()> {
        let [target] = mark.params.as_slice() else {
            return Err(Error::range("/CLOSE takes one stream"));
        };
        check_target(target)?;
        let (_, open) = self.stream_entry(target)?;
        if !*open {
            return Err(Error::range(format!("stream {} is already closed", lossy(target))));
        }
        *open = false;
        Ok(())
    }

    /// `/NamespacePush`
    pub(crate) fn namespace_push(&mut self, mark: &Mark) -> Result<()> {
        if !mark.params.is_empty() {
            return Err(Error::range("/NamespacePush takes no parameters"));
        }
        self.names.push_scope();
        Ok(())
    }

    /// `/NamespacePop`
    pub(crate) fn namespace_pop(&mut self, mark: &Mark) -> Result<()> {
        if !mark.params.is_empty() {
            return Err(Error::range("/NamespacePop takes no parameters"));
        }
        self.names.pop_scope(&mut self.graph)
    }

    /// `/NI`: declare a named image.
    pub(crate) fn named_image(&mut self, mark: &Mark) -> Result<()> {
        let Some(name) = &mark.objname else {
            return Err(Error::range("/NI requires /_objdef"));
        };
        if !mark.params.is_empty() {
            return Err(Error::range("/NI takes no parameters"));
        }
        let id = self
            .names
            .define(&mut self.graph, name, NamedObject::empty(ObjectKind::Dict, false))?;
        self.ni_stack.push(id);
        Ok(())
    }
}

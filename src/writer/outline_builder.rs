//! Document outline (bookmarks) builder for PDF generation.
//!
//! Outline entries arrive one at a time, each declaring how many children
//! follow it. A node's `/Next` is only known once its following sibling
//! exists, so every node is written one step behind: the previous sibling
//! is flushed when a new sibling arrives, and the last node of a level is
//! flushed when the level closes. See PDF spec Section 12.3.3.
//!
//! Nodes live in an arena and levels refer to them by index, so the
//! pending last node of each level can be patched (`/First`, `/Last`,
//! `/Count`) until it is written.

use super::pdf_writer::ObjectGraph;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};

/// Maximum outline nesting depth.
pub const MAX_OUTLINE_DEPTH: usize = 32;

/// One outline entry.
#[derive(Debug, Clone)]
pub struct OutlineNode {
    /// Object identifier of the entry
    pub id: ObjectRef,
    /// Parent entry, or the outline root
    pub parent_id: ObjectRef,
    /// Previous sibling
    pub prev_id: Option<ObjectRef>,
    /// Following sibling, known once it arrives
    pub next_id: Option<ObjectRef>,
    /// First child
    pub first_id: Option<ObjectRef>,
    /// Last child
    pub last_id: Option<ObjectRef>,
    /// Signed descendant count: positive when open, negative when closed
    pub count: i64,
    /// Action/destination entries; dropped once written
    action: Option<Dictionary>,
    written: bool,
}

impl OutlineNode {
    /// Whether this node has been written to the output.
    pub fn is_written(&self) -> bool {
        self.written
    }
}

#[derive(Debug)]
struct OutlineLevel {
    first: Option<usize>,
    last: Option<usize>,
    /// Children still expected at this level
    left: usize,
}

impl OutlineLevel {
    fn new(left: usize) -> Self {
        Self {
            first: None,
            last: None,
            left,
        }
    }
}

/// Incremental builder for document outlines (bookmarks).
#[derive(Debug)]
pub struct OutlineBuilder {
    nodes: Vec<OutlineNode>,
    levels: Vec<OutlineLevel>,
    outlines_id: Option<ObjectRef>,
    /// Entries visible when the document opens
    open_count: i64,
    /// Number of enclosing levels whose parent is closed
    closed_depth: usize,
    finished: bool,
}

impl Default for OutlineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineBuilder {
    /// Create a new outline builder.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            levels: vec![OutlineLevel::new(usize::MAX)],
            outlines_id: None,
            open_count: 0,
            closed_depth: 0,
            finished: false,
        }
    }

    /// Current nesting depth (0 = top level).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Identifier of the `/Outlines` root, once any entry exists.
    pub fn outlines_id(&self) -> Option<ObjectRef> {
        self.outlines_id
    }

    /// Number of entries visible when the document opens.
    pub fn open_count(&self) -> i64 {
        self.open_count
    }

    /// Look up a node by identifier.
    pub fn node(&self, id: ObjectRef) -> Option<&OutlineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[OutlineNode] {
        &self.nodes
    }

    /// Whether no entry was ever appended.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append an entry at the current level.
    ///
    /// A nonzero `sub_count` opens a child level expecting `|sub_count|`
    /// entries, closed when negative. Levels whose expected children have
    /// all arrived close automatically.
    pub fn append(
        &mut self,
        graph: &mut dyn ObjectGraph,
        action: Dictionary,
        sub_count: i64,
    ) -> Result<ObjectRef> {
        let depth = self.depth();
        if sub_count != 0 && depth + 1 >= MAX_OUTLINE_DEPTH {
            return Err(Error::OutlineDepth(MAX_OUTLINE_DEPTH));
        }
        let root = match self.outlines_id {
            Some(id) => id,
            None => {
                let id = graph.allocate_id();
                self.outlines_id = Some(id);
                id
            },
        };
        let parent_idx = if depth == 0 {
            None
        } else {
            Some(self.parent_index(depth)?)
        };
        let id = graph.allocate_id();
        let idx = self.nodes.len();
        self.nodes.push(OutlineNode {
            id,
            parent_id: parent_idx.map_or(root, |p| self.nodes[p].id),
            prev_id: None,
            next_id: None,
            first_id: None,
            last_id: None,
            count: sub_count,
            action: Some(action),
            written: false,
        });

        match self.levels[depth].last {
            None => {
                if let Some(p) = parent_idx {
                    self.nodes[p].first_id = Some(id);
                }
                self.levels[depth].first = Some(idx);
            },
            Some(prev_idx) => {
                self.nodes[idx].prev_id = Some(self.nodes[prev_idx].id);
                if depth > 0 {
                    self.adjust_parent_count(depth)?;
                }
                self.write_node(graph, prev_idx, Some(id))?;
            },
        }
        let level = &mut self.levels[depth];
        level.last = Some(idx);
        level.left = level.left.saturating_sub(1);

        if self.closed_depth == 0 {
            self.open_count += 1;
        }

        if sub_count != 0 {
            self.levels.push(OutlineLevel::new(sub_count.unsigned_abs() as usize));
            if sub_count < 0 {
                self.closed_depth += 1;
            }
        } else {
            while self.depth() > 0 && self.levels[self.depth()].left == 0 {
                self.close_level(graph)?;
            }
        }
        Ok(id)
    }

    /// Close the current level: write its last node and fold its count
    /// into the parent.
    ///
    /// The top level stays open until [`finish`](Self::finish), since later
    /// entries still link to its last node; closing it is a no-op.
    pub fn close_level(&mut self, graph: &mut dyn ObjectGraph) -> Result<()> {
        let depth = self.depth();
        if depth == 0 {
            return Ok(());
        }
        let last = self.levels[depth].last;
        if let Some(last_idx) = last {
            if !self.nodes[last_idx].written {
                self.write_node(graph, last_idx, None)?;
            }
        }
        let parent = self.parent_index(depth)?;
        self.nodes[parent].last_id = last.map(|i| self.nodes[i].id);
        self.adjust_parent_count(depth)?;
        self.levels.pop();
        if self.nodes[parent].count < 0 {
            self.closed_depth = self.closed_depth.saturating_sub(1);
        }
        Ok(())
    }

    /// Close every open level and write the `/Outlines` root.
    ///
    /// Returns the root identifier, or `None` if no entry was appended.
    pub fn finish(&mut self, graph: &mut dyn ObjectGraph) -> Result<Option<ObjectRef>> {
        let Some(root) = self.outlines_id else {
            return Ok(None);
        };
        if self.finished {
            return Ok(Some(root));
        }
        while self.depth() > 0 {
            self.close_level(graph)?;
        }
        if let Some(last_idx) = self.levels[0].last {
            if !self.nodes[last_idx].written {
                self.write_node(graph, last_idx, None)?;
            }
        }

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Outlines"));
        dict.insert("Count".to_string(), Object::Integer(self.open_count));
        let top = &self.levels[0];
        if let (Some(first), Some(last)) = (top.first, top.last) {
            dict.insert("First".to_string(), Object::Reference(self.nodes[first].id));
            dict.insert("Last".to_string(), Object::Reference(self.nodes[last].id));
        }
        graph.write_object(root, &Object::Dictionary(dict))?;
        self.finished = true;
        Ok(Some(root))
    }

    fn parent_index(&self, depth: usize) -> Result<usize> {
        self.levels[depth - 1]
            .last
            .ok_or_else(|| Error::range("outline level has no parent entry"))
    }

    /// Fold the count of the level's last node into its parent: added to an
    /// open parent, subtracted from a closed one. Closed children add nothing.
    fn adjust_parent_count(&mut self, depth: usize) -> Result<()> {
        let Some(child) = self.levels[depth].last else {
            return Ok(());
        };
        let count = self.nodes[child].count;
        if count > 0 {
            let parent_idx = self.parent_index(depth)?;
            let parent = &mut self.nodes[parent_idx];
            if parent.count < 0 {
                parent.count -= count;
            } else {
                parent.count += count;
            }
        }
        Ok(())
    }

    fn write_node(&mut self, graph: &mut dyn ObjectGraph, idx: usize, next: Option<ObjectRef>) -> Result<()> {
        let node = &mut self.nodes[idx];
        node.next_id = next;
        let mut dict = node.action.take().unwrap_or_default();
        if node.count != 0 {
            dict.insert("Count".to_string(), Object::Integer(node.count));
        }
        dict.insert("Parent".to_string(), Object::Reference(node.parent_id));
        let links = [
            ("Prev", node.prev_id),
            ("Next", node.next_id),
            ("First", node.first_id),
            ("Last", node.last_id),
        ];
        for (key, link) in links {
            if let Some(id) = link {
                dict.insert(key.to_string(), Object::Reference(id));
            }
        }
        graph.write_object(node.id, &Object::Dictionary(dict))?;
        node.written = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PdfWriter;

    fn title(t: &str) -> Dictionary {
        let mut d = Dictionary::new();
        d.insert("Title".to_string(), Object::raw(format!("({})", t)));
        d
    }

    fn written_dict(writer: &PdfWriter, id: ObjectRef) -> &Dictionary {
        writer.get(id).and_then(|o| o.as_dict()).unwrap()
    }

    fn link(writer: &PdfWriter, id: ObjectRef, key: &str) -> Option<ObjectRef> {
        written_dict(writer, id).get(key).and_then(|o| o.as_reference())
    }

    #[test]
    fn test_flat_siblings_written_one_behind() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let a = outline.append(&mut writer, title("A"), 0).unwrap();
        assert!(writer.get(a).is_none());
        let b = outline.append(&mut writer, title("B"), 0).unwrap();
        assert_eq!(link(&writer, a, "Next"), Some(b));
        assert!(writer.get(b).is_none());

        let root = outline.finish(&mut writer).unwrap().unwrap();
        assert_eq!(link(&writer, b, "Prev"), Some(a));
        assert_eq!(link(&writer, b, "Next"), None);
        assert_eq!(link(&writer, root, "First"), Some(a));
        assert_eq!(link(&writer, root, "Last"), Some(b));
        assert_eq!(written_dict(&writer, root).get("Count"), Some(&Object::Integer(2)));
    }

    #[test]
    fn test_children_auto_close_level() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let parent = outline.append(&mut writer, title("Chapter"), 2).unwrap();
        assert_eq!(outline.depth(), 1);
        let c1 = outline.append(&mut writer, title("1.1"), 0).unwrap();
        let c2 = outline.append(&mut writer, title("1.2"), 0).unwrap();
        assert_eq!(outline.depth(), 0);
        assert!(writer.is_written(c2));
        assert!(!writer.is_written(parent));

        outline.finish(&mut writer).unwrap();
        assert_eq!(link(&writer, parent, "First"), Some(c1));
        assert_eq!(link(&writer, parent, "Last"), Some(c2));
        assert_eq!(link(&writer, c1, "Parent"), Some(parent));
        assert_eq!(written_dict(&writer, parent).get("Count"), Some(&Object::Integer(2)));
        assert_eq!(outline.open_count(), 3);
    }

    #[test]
    fn test_closed_children_not_counted_open() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let parent = outline.append(&mut writer, title("Closed"), -2).unwrap();
        outline.append(&mut writer, title("a"), 0).unwrap();
        outline.append(&mut writer, title("b"), 0).unwrap();
        outline.finish(&mut writer).unwrap();
        assert_eq!(written_dict(&writer, parent).get("Count"), Some(&Object::Integer(-2)));
        assert_eq!(outline.open_count(), 1);
    }

    #[test]
    fn test_open_grandchildren_propagate() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let top = outline.append(&mut writer, title("top"), 1).unwrap();
        let mid = outline.append(&mut writer, title("mid"), 2).unwrap();
        outline.append(&mut writer, title("x"), 0).unwrap();
        outline.append(&mut writer, title("y"), 0).unwrap();
        outline.finish(&mut writer).unwrap();
        assert_eq!(written_dict(&writer, mid).get("Count"), Some(&Object::Integer(2)));
        assert_eq!(written_dict(&writer, top).get("Count"), Some(&Object::Integer(3)));
    }

    #[test]
    fn test_open_child_under_closed_parent_subtracts() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let top = outline.append(&mut writer, title("top"), -1).unwrap();
        outline.append(&mut writer, title("mid"), 2).unwrap();
        outline.append(&mut writer, title("x"), 0).unwrap();
        outline.append(&mut writer, title("y"), 0).unwrap();
        outline.finish(&mut writer).unwrap();
        assert_eq!(written_dict(&writer, top).get("Count"), Some(&Object::Integer(-3)));
        assert_eq!(outline.open_count(), 1);
    }

    #[test]
    fn test_finish_closes_incomplete_levels() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let parent = outline.append(&mut writer, title("p"), 5).unwrap();
        let only = outline.append(&mut writer, title("c"), 0).unwrap();
        outline.finish(&mut writer).unwrap();
        assert!(writer.is_written(parent));
        assert!(writer.is_written(only));
        assert_eq!(link(&writer, parent, "Last"), Some(only));
        assert!(outline.nodes().iter().all(|n| n.is_written()));
    }

    #[test]
    fn test_close_top_level_then_append() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let a = outline.append(&mut writer, title("A"), 0).unwrap();
        outline.close_level(&mut writer).unwrap();
        assert!(!writer.is_written(a));
        let b = outline.append(&mut writer, title("B"), 0).unwrap();
        assert_eq!(link(&writer, a, "Next"), Some(b));

        let root = outline.finish(&mut writer).unwrap().unwrap();
        assert_eq!(link(&writer, b, "Prev"), Some(a));
        assert_eq!(link(&writer, root, "Last"), Some(b));
        assert_eq!(written_dict(&writer, root).get("Count"), Some(&Object::Integer(2)));
    }

    #[test]
    fn test_close_nested_level_early() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        let parent = outline.append(&mut writer, title("p"), 3).unwrap();
        let child = outline.append(&mut writer, title("c"), 0).unwrap();
        outline.close_level(&mut writer).unwrap();
        assert_eq!(outline.depth(), 0);
        assert!(writer.is_written(child));
        let next = outline.append(&mut writer, title("q"), 0).unwrap();
        assert_eq!(link(&writer, parent, "Next"), Some(next));
        assert_eq!(link(&writer, parent, "Last"), Some(child));
        outline.finish(&mut writer).unwrap();
        assert!(outline.nodes().iter().all(|n| n.is_written()));
    }

    #[test]
    fn test_depth_limit() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        for _ in 0..MAX_OUTLINE_DEPTH - 1 {
            outline.append(&mut writer, title("n"), 1).unwrap();
        }
        let err = outline.append(&mut writer, title("deep"), 1).unwrap_err();
        assert!(matches!(err, Error::OutlineDepth(_)));
        assert!(err.is_fatal());
        // A leaf at the deepest level is still accepted.
        outline.append(&mut writer, title("leaf"), 0).unwrap();
    }

    #[test]
    fn test_empty_outline_has_no_root() {
        let mut writer = PdfWriter::new();
        let mut outline = OutlineBuilder::new();
        assert_eq!(outline.finish(&mut writer).unwrap(), None);
        assert_eq!(writer.written_count(), 0);
    }
}

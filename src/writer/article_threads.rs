//! Article threads (PDF spec Section 12.4.3).
//!
//! An article is a ring of beads, each a rectangle on some page. Beads are
//! written one step behind like outline entries: a bead's `/N` is filled
//! when the following bead arrives. The first bead stays pending until the
//! article is finalized, because its `/V` must point at the last bead.

use super::pdf_writer::ObjectGraph;
use crate::error::Result;
use crate::geometry::Rect;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::format_real;

/// One bead of an article thread.
#[derive(Debug, Clone)]
pub struct Bead {
    /// Bead identifier
    pub id: ObjectRef,
    /// Thread dictionary the bead belongs to
    pub article_id: ObjectRef,
    /// Previous bead in the ring
    pub prev_id: Option<ObjectRef>,
    /// Next bead in the ring
    pub next_id: Option<ObjectRef>,
    /// Page the bead lies on
    pub page_id: Option<ObjectRef>,
    /// Bead rectangle in default user space
    pub rect: Rect,
}

impl Bead {
    /// Create a bead that is not yet linked into a ring.
    pub fn new(id: ObjectRef, page_id: Option<ObjectRef>, rect: Rect) -> Self {
        Self {
            id,
            article_id: id,
            prev_id: None,
            next_id: None,
            page_id,
            rect,
        }
    }

    fn to_object(&self) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("T".to_string(), Object::Reference(self.article_id));
        for (key, link) in [("V", self.prev_id), ("N", self.next_id), ("P", self.page_id)] {
            if let Some(id) = link {
                dict.insert(key.to_string(), Object::Reference(id));
            }
        }
        let r = self.rect.to_array();
        let rect = format!(
            "[{} {} {} {}]",
            format_real(r[0]),
            format_real(r[1]),
            format_real(r[2]),
            format_real(r[3])
        );
        dict.insert("R".to_string(), Object::raw(rect));
        Object::Dictionary(dict)
    }
}

/// One article: its title key, shared info dictionary and bead chain.
#[derive(Debug)]
pub struct Article {
    /// Title value exactly as supplied, used as the lookup key
    pub title: Vec<u8>,
    /// Identifier of the thread dictionary
    pub contents_id: ObjectRef,
    /// Thread information dictionary (`/I`)
    pub contents: Dictionary,
    first: Option<Bead>,
    last: Option<Bead>,
    bead_count: usize,
    finished: bool,
}

impl Article {
    /// Number of beads added so far.
    pub fn bead_count(&self) -> usize {
        self.bead_count
    }

    /// Link a new bead in, writing the previously pending last bead.
    fn add_bead(&mut self, graph: &mut dyn ObjectGraph, mut bead: Bead) -> Result<()> {
        bead.article_id = self.contents_id;
        if let Some(mut prev) = self.last.take() {
            prev.next_id = Some(bead.id);
            graph.write_object(prev.id, &prev.to_object())?;
            bead.prev_id = Some(prev.id);
            self.last = Some(bead);
        } else if let Some(first) = self.first.as_mut() {
            first.next_id = Some(bead.id);
            bead.prev_id = Some(first.id);
            self.last = Some(bead);
        } else {
            self.first = Some(bead);
        }
        self.bead_count += 1;
        Ok(())
    }

    /// Close the ring and write the remaining beads and the thread dictionary.
    fn finish(&mut self, graph: &mut dyn ObjectGraph) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let Some(mut first) = self.first.take() else {
            return Ok(());
        };
        match self.last.take() {
            None => {
                first.prev_id = Some(first.id);
                first.next_id = Some(first.id);
            },
            Some(mut last) => {
                first.prev_id = Some(last.id);
                last.next_id = Some(first.id);
                graph.write_object(last.id, &last.to_object())?;
            },
        }
        graph.write_object(first.id, &first.to_object())?;

        let mut thread = Dictionary::new();
        thread.insert("F".to_string(), Object::Reference(first.id));
        thread.insert("I".to_string(), Object::Dictionary(self.contents.clone()));
        graph.write_object(self.contents_id, &Object::Dictionary(thread))?;
        self.finished = true;
        Ok(())
    }
}

/// Registry of articles, looked up by exact title.
#[derive(Debug, Default)]
pub struct ArticleThreads {
    articles: Vec<Article>,
}

impl ArticleThreads {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an article by its title value.
    pub fn find(&self, title: &[u8]) -> Option<&Article> {
        self.articles.iter().find(|a| a.title == title)
    }

    /// All articles in creation order.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Whether no article was ever created.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Add a bead to the article titled `title`, creating the article on
    /// first use. `extra` entries merge into the article's info dictionary,
    /// last write per key winning.
    pub fn add_bead(
        &mut self,
        graph: &mut dyn ObjectGraph,
        title: &[u8],
        bead: Bead,
        extra: Dictionary,
    ) -> Result<ObjectRef> {
        let idx = match self.articles.iter().position(|a| a.title == title) {
            Some(idx) => idx,
            None => {
                let contents_id = graph.allocate_id();
                let mut contents = Dictionary::new();
                contents.insert("Title".to_string(), Object::raw(title));
                self.articles.push(Article {
                    title: title.to_vec(),
                    contents_id,
                    contents,
                    first: None,
                    last: None,
                    bead_count: 0,
                    finished: false,
                });
                self.articles.len() - 1
            },
        };
        let article = &mut self.articles[idx];
        article.contents.extend(extra);
        article.add_bead(graph, bead)?;
        Ok(article.contents_id)
    }

    /// Finalize every article; returns the thread identifiers for the
    /// catalog's `/Threads` array.
    pub fn finish(&mut self, graph: &mut dyn ObjectGraph) -> Result<Vec<ObjectRef>> {
        let mut threads = Vec::with_capacity(self.articles.len());
        for article in &mut self.articles {
            article.finish(graph)?;
            threads.push(article.contents_id);
        }
        Ok(threads)
    }
}

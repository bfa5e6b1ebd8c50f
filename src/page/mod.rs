//! Structured page model
//!
//! A small element tree standing in for the streaming site's DOM. It supports
//! selector lookup, the handful of mutations the badge renderer needs, and
//! mutation notifications for the change detector. Pages can be loaded from
//! JSON snapshots where a string is a text node and an object is an element:
//!
//! ```json
//! {"tag": "body", "children": [
//!     {"tag": "h1", "classes": ["title-title"], "children": ["Inception"]}
//! ]}
//! ```

pub mod badge;
pub mod selector;
pub mod title;

pub use badge::BadgeRenderer;
pub use selector::{Selector, SelectorError};
pub use title::TitleExtractor;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors loading a page snapshot
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Failed to read page snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A node in the page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

impl Node {
    fn text_into(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.text_into(out);
                }
            }
        }
    }

    fn element_count(&self) -> usize {
        match self {
            Node::Text(_) => 0,
            Node::Element(element) => {
                1 + element.children.iter().map(Node::element_count).sum::<usize>()
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

/// An element with a tag, classes, attributes and children
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.text_into(&mut out);
        }
        out
    }

    /// First descendant matching `selector`, in document order
    pub fn query_selector(&self, selector: &Selector) -> Option<&Element> {
        let path = self.find_path(selector)?;
        self.element_at(&path)
    }

    /// All descendants matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<&Element> {
        let mut paths = Vec::new();
        self.search(selector, &mut Vec::new(), &mut Vec::new(), &mut paths, false);
        paths.iter().filter_map(|p| self.element_at(p)).collect()
    }

    fn find_path(&self, selector: &Selector) -> Option<Vec<usize>> {
        let mut paths = Vec::new();
        self.search(selector, &mut Vec::new(), &mut Vec::new(), &mut paths, true);
        paths.pop()
    }

    /// Pre-order walk recording matching paths; returns true once done
    fn search<'a>(
        &'a self,
        selector: &Selector,
        ancestors: &mut Vec<&'a Element>,
        path: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
        first_only: bool,
    ) -> bool {
        ancestors.push(self);
        for (index, child) in self.children.iter().enumerate() {
            let Node::Element(child) = child else {
                continue;
            };
            path.push(index);
            if selector.matches(child, ancestors) {
                out.push(path.clone());
                if first_only {
                    return true;
                }
            }
            if child.search(selector, ancestors, path, out, first_only) {
                return true;
            }
            path.pop();
        }
        ancestors.pop();
        false
    }

    fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            match current.children.get(index)? {
                Node::Element(element) => current = element,
                Node::Text(_) => return None,
            }
        }
        Some(current)
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            match current.children.get_mut(index)? {
                Node::Element(element) => current = element,
                Node::Text(_) => return None,
            }
        }
        Some(current)
    }
}

/// Location of an element relative to the page body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The body element itself
    pub fn body() -> Self {
        Self::default()
    }

    fn join(&self, relative: Vec<usize>) -> Self {
        let mut path = self.0.clone();
        path.extend(relative);
        Self(path)
    }
}

/// Summary of one change to the page tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    /// Elements inserted, including their descendants
    pub added: usize,
    /// Elements removed, including their descendants
    pub removed: usize,
}

/// The page: a body element plus registered mutation observers
#[derive(Debug, Default)]
pub struct Document {
    body: Element,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

impl Document {
    pub fn new(body: Element) -> Self {
        Self {
            body,
            observers: Vec::new(),
        }
    }

    /// Parses a JSON page snapshot
    pub fn from_json(json: &str) -> Result<Self, PageError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Reads a JSON page snapshot from disk
    pub fn from_file(path: &Path) -> Result<Self, PageError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    /// Subscribes to every addition and removal anywhere under the body
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<&Element> {
        self.body.query_selector(selector)
    }

    pub fn query_selector_all(&self, selector: &Selector) -> Vec<&Element> {
        self.body.query_selector_all(selector)
    }

    /// Path of the first element matching `selector`
    pub fn find(&self, selector: &Selector) -> Option<NodePath> {
        self.body.find_path(selector).map(NodePath)
    }

    /// Path of the first element under `parent` matching `selector`
    pub fn find_within(&self, parent: &NodePath, selector: &Selector) -> Option<NodePath> {
        let relative = self.get(parent)?.find_path(selector)?;
        Some(parent.join(relative))
    }

    pub fn get(&self, path: &NodePath) -> Option<&Element> {
        self.body.element_at(&path.0)
    }

    /// Inserts `node` as the first child of the element at `parent`
    pub fn prepend_child(&mut self, parent: &NodePath, node: Node) -> bool {
        self.insert_child(parent, 0, node)
    }

    /// Inserts `node` as the last child of the element at `parent`
    pub fn append_child(&mut self, parent: &NodePath, node: Node) -> bool {
        let Some(len) = self.get(parent).map(|p| p.children.len()) else {
            return false;
        };
        self.insert_child(parent, len, node)
    }

    /// Removes and returns the element at `path`; the body itself cannot be removed
    pub fn remove(&mut self, path: &NodePath) -> Option<Node> {
        let (&index, parent) = path.0.split_last()?;
        let parent = self.body.element_at_mut(parent)?;
        if index >= parent.children.len() {
            return None;
        }
        let node = parent.children.remove(index);
        self.notify(MutationRecord {
            added: 0,
            removed: node.element_count(),
        });
        Some(node)
    }

    /// Swaps in a whole new body, as a client-side navigation would
    pub fn replace_body(&mut self, body: Element) {
        let removed = self.body.children.iter().map(Node::element_count).sum();
        let added = body.children.iter().map(Node::element_count).sum();
        self.body = body;
        self.notify(MutationRecord { added, removed });
    }

    fn insert_child(&mut self, parent: &NodePath, index: usize, node: Node) -> bool {
        let added = node.element_count();
        let Some(parent) = self.body.element_at_mut(&parent.0) else {
            return false;
        };
        parent.children.insert(index, node);
        self.notify(MutationRecord { added, removed: 0 });
        true
    }

    fn notify(&mut self, record: MutationRecord) {
        self.observers.retain(|tx| tx.send(record).is_ok());
    }
}

/// Shared handle to a document, cloned into the detector and its tasks
#[derive(Debug, Clone, Default)]
pub struct Page {
    inner: Arc<Mutex<Document>>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Runs `f` with exclusive access to the document
    pub fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

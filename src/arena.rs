// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A simple arena-backed DOM.
//!
//! Nodes live in one vector and refer to each other by index, so parent
//! and sibling links need no reference counting. This is sufficient as a
//! static parse tree, but don't build a web browser using it. :)

use std::cell::{Cell, Ref, RefCell};

use log::warn;
use tendril::StrTendril;

use crate::error::{Diagnostic, SourceLocation};
use crate::interface::{Attribute, LocalName, Namespace, NoQuirks, QualName, QuirksMode, TreeSink};
use crate::serialize::{serialize, SerializeOpts, TraversalScope};

/// Index of a node in an `ArenaDom`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The different kinds of nodes in the DOM.
#[derive(Debug)]
pub enum NodeData {
    /// The `Document` itself.
    Document,

    /// The contents of a `<template>`.
    DocumentFragment,

    /// A `DOCTYPE` with name, public id, and system id.
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },

    /// A text node.
    Text(StrTendril),

    /// A comment.
    Comment(StrTendril),

    /// An element with attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,

        /// For HTML `<template>` elements, the template contents.
        template_contents: Option<NodeId>,

        /// The "script already started" flag.
        ///
        /// Not meaningful for nodes other than HTML `<script>`.
        script_already_started: bool,
    },
}

/// A DOM node.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,

    /// Where the element's start tag began, when location tracking is on.
    pub source_location: Option<SourceLocation>,
}

impl Node {
    fn new(data: NodeData) -> Node {
        Node {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            source_location: None,
        }
    }
}

fn push_node(nodes: &mut Vec<Node>, data: NodeData) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(Node::new(data));
    id
}

fn unlink(nodes: &mut [Node], target: NodeId) {
    let (parent, prev, next) = {
        let node = &nodes[target.0];
        (node.parent, node.prev_sibling, node.next_sibling)
    };
    let parent = unwrap_or_return!(parent, ());

    match prev {
        Some(prev) => nodes[prev.0].next_sibling = next,
        None => nodes[parent.0].first_child = next,
    }
    match next {
        Some(next) => nodes[next.0].prev_sibling = prev,
        None => nodes[parent.0].last_child = prev,
    }

    let node = &mut nodes[target.0];
    node.parent = None;
    node.prev_sibling = None;
    node.next_sibling = None;
}

fn link_last(nodes: &mut [Node], parent: NodeId, child: NodeId) {
    unlink(nodes, child);
    let last = nodes[parent.0].last_child;
    {
        let node = &mut nodes[child.0];
        node.parent = Some(parent);
        node.prev_sibling = last;
    }
    match last {
        Some(last) => nodes[last.0].next_sibling = Some(child),
        None => nodes[parent.0].first_child = Some(child),
    }
    nodes[parent.0].last_child = Some(child);
}

fn link_before(nodes: &mut [Node], reference: NodeId, child: NodeId) {
    unlink(nodes, child);
    let parent = match nodes[reference.0].parent {
        Some(parent) => parent,
        None => {
            warn!("insert before a node without a parent");
            return;
        },
    };
    let prev = nodes[reference.0].prev_sibling;
    {
        let node = &mut nodes[child.0];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        node.next_sibling = Some(reference);
    }
    nodes[reference.0].prev_sibling = Some(child);
    match prev {
        Some(prev) => nodes[prev.0].next_sibling = Some(child),
        None => nodes[parent.0].first_child = Some(child),
    }
}

/// Append to an existing text node, if `target` is one.
fn append_to_existing_text(nodes: &mut [Node], target: Option<NodeId>, text: &str) -> bool {
    let target = unwrap_or_return!(target, false);
    match nodes[target.0].data {
        NodeData::Text(ref mut existing) => {
            existing.push_slice(text);
            true
        },
        _ => false,
    }
}

/// The DOM itself; the result of parsing.
pub struct ArenaDom {
    nodes: RefCell<Vec<Node>>,

    /// Errors that occurred during parsing.
    errors: RefCell<Vec<Diagnostic>>,

    /// The document's quirks mode.
    quirks_mode: Cell<QuirksMode>,
}

impl Default for ArenaDom {
    fn default() -> ArenaDom {
        ArenaDom {
            nodes: RefCell::new(vec![Node::new(NodeData::Document)]),
            errors: RefCell::new(vec![]),
            quirks_mode: Cell::new(NoQuirks),
        }
    }
}

impl ArenaDom {
    pub fn new() -> ArenaDom {
        ArenaDom::default()
    }

    /// The `Document` node.
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a node.
    ///
    /// Panics if `id` belongs to another `ArenaDom`.
    pub fn node(&self, id: NodeId) -> Ref<'_, Node> {
        Ref::map(self.nodes.borrow(), |nodes| &nodes[id.0])
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn errors(&self) -> Ref<'_, Vec<Diagnostic>> {
        self.errors.borrow()
    }

    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode.get()
    }

    /// Every node below `root` in tree order, not including `root`.
    /// Template contents are not entered.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = vec![];
        let mut next = nodes[root.0].first_child;
        while let Some(id) = next {
            out.push(id);
            let node = &nodes[id.0];
            next = match node.first_child {
                Some(child) => Some(child),
                None => {
                    // Climb until some ancestor below `root` has a next sibling.
                    let mut up = Some(id);
                    let mut found = None;
                    while let Some(cur) = up {
                        if cur == root {
                            break;
                        }
                        if let Some(sibling) = nodes[cur.0].next_sibling {
                            found = Some(sibling);
                            break;
                        }
                        up = nodes[cur.0].parent;
                    }
                    found
                },
            };
        }
        out
    }

    /// The first element below `root`, in tree order, with this local name.
    pub fn find_element(&self, root: NodeId, local: &str) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|&id| {
            matches!(self.node(id).data, NodeData::Element { ref name, .. } if &*name.local == local)
        })
    }

    /// The concatenated text of every text node below `root`.
    pub fn text_content(&self, root: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(root) {
            if let NodeData::Text(ref text) = self.node(id).data {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialize the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.to_html(node, TraversalScope::ChildrenOnly)
    }

    /// Serialize `node` and its children.
    pub fn outer_html(&self, node: NodeId) -> String {
        self.to_html(node, TraversalScope::IncludeNode)
    }

    fn to_html(&self, node: NodeId, traversal_scope: TraversalScope) -> String {
        let opts = SerializeOpts {
            traversal_scope,
            ..Default::default()
        };
        let mut out = vec![];
        if let Err(e) = serialize(&mut out, self, node, opts) {
            warn!("serializing {:?} failed: {}", node, e);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn new_node(&self, data: NodeData) -> NodeId {
        push_node(&mut self.nodes.borrow_mut(), data)
    }
}

impl TreeSink for ArenaDom {
    type Output = ArenaDom;
    type Handle = NodeId;

    fn finish(self) -> ArenaDom {
        self
    }

    fn parse_error(&self, diagnostic: Diagnostic) {
        self.errors.borrow_mut().push(diagnostic);
    }

    fn get_document(&self) -> NodeId {
        self.document()
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.new_node(NodeData::Element {
            name,
            attrs,
            template_contents: None,
            script_already_started: false,
        })
    }

    fn create_text(&self, text: StrTendril) -> NodeId {
        self.new_node(NodeData::Text(text))
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.new_node(NodeData::Comment(text))
    }

    fn create_document_fragment(&self) -> NodeId {
        self.new_node(NodeData::DocumentFragment)
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let mut nodes = self.nodes.borrow_mut();
        let doctype = push_node(
            &mut nodes,
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            },
        );
        link_last(&mut nodes, NodeId(0), doctype);
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        link_last(&mut self.nodes.borrow_mut(), *parent, *child);
    }

    fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if nodes[reference.0].parent != Some(*parent) {
            warn!("{:?} is not a child of {:?}", reference, parent);
        }
        link_before(&mut nodes, *reference, *child);
    }

    fn detach(&self, node: &NodeId) {
        unlink(&mut self.nodes.borrow_mut(), *node);
    }

    fn insert_text(&self, parent: &NodeId, text: StrTendril) {
        let mut nodes = self.nodes.borrow_mut();
        let last = nodes[parent.0].last_child;
        if append_to_existing_text(&mut nodes, last, &text) {
            return;
        }
        let node = push_node(&mut nodes, NodeData::Text(text));
        link_last(&mut nodes, *parent, node);
    }

    fn insert_text_before(&self, _parent: &NodeId, text: StrTendril, reference: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let prev = nodes[reference.0].prev_sibling;
        if append_to_existing_text(&mut nodes, prev, &text) {
            return;
        }
        let node = push_node(&mut nodes, NodeData::Text(text));
        link_before(&mut nodes, *reference, node);
    }

    fn set_template_content(&self, template: &NodeId, content: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        match nodes[template.0].data {
            NodeData::Element {
                ref mut template_contents,
                ..
            } => *template_contents = Some(*content),
            _ => warn!("template contents set on a non-element"),
        }
    }

    fn get_template_content(&self, template: &NodeId) -> NodeId {
        let contents = match self.node(*template).data {
            NodeData::Element {
                template_contents, ..
            } => template_contents,
            _ => None,
        };
        match contents {
            Some(contents) => contents,
            None => {
                warn!("{:?} has no template contents", template);
                *template
            },
        }
    }

    fn set_document_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn get_tag_name(&self, element: &NodeId) -> LocalName {
        match self.node(*element).data {
            NodeData::Element { ref name, .. } => name.local.clone(),
            ref other => {
                warn!("asked for the tag name of {:?}", other);
                LocalName::from("")
            },
        }
    }

    fn get_namespace(&self, element: &NodeId) -> Namespace {
        match self.node(*element).data {
            NodeData::Element { ref name, .. } => name.ns,
            _ => Namespace::Null,
        }
    }

    fn get_parent(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node).parent
    }

    fn get_children(&self, node: &NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = vec![];
        let mut next = nodes[node.0].first_child;
        while let Some(id) = next {
            out.push(id);
            next = nodes[id.0].next_sibling;
        }
        out
    }

    fn get_attrs(&self, element: &NodeId) -> Vec<Attribute> {
        match self.node(*element).data {
            NodeData::Element { ref attrs, .. } => attrs.clone(),
            _ => vec![],
        }
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn add_attrs_if_missing(&self, target: &NodeId, mut attrs: Vec<Attribute>) {
        let mut nodes = self.nodes.borrow_mut();
        let existing = match nodes[target.0].data {
            NodeData::Element {
                attrs: ref mut existing,
                ..
            } => existing,
            _ => return,
        };

        attrs.retain(|attr| !existing.iter().any(|e| e.name == attr.name));
        existing.extend(attrs);
    }

    fn mark_script_already_started(&self, node: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let NodeData::Element {
            ref mut script_already_started,
            ..
        } = nodes[node.0].data
        {
            *script_already_started = true;
        }
    }

    fn set_source_location(&self, node: &NodeId, location: SourceLocation) {
        self.nodes.borrow_mut()[node.0].source_location = Some(location);
    }
}

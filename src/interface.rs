// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Names, attributes and the tree adapter contract.

use std::fmt;

use tendril::StrTendril;

use crate::error::{Diagnostic, SourceLocation};

pub use self::QuirksMode::{LimitedQuirks, NoQuirks, Quirks};

/// Interned local name of an element or attribute.
pub type LocalName = string_cache::DefaultAtom;

/// Interned namespace prefix of an attribute.
pub type Prefix = string_cache::DefaultAtom;

/// The namespaces the parser assigns to elements and attributes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Namespace {
    /// The null namespace, used by ordinary attributes.
    Null,
    Html,
    Svg,
    MathMl,
    XLink,
    Xml,
    Xmlns,
}

impl Namespace {
    pub fn url(self) -> &'static str {
        match self {
            Namespace::Null => "",
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
            Namespace::XLink => "http://www.w3.org/1999/xlink",
            Namespace::Xml => "http://www.w3.org/XML/1998/namespace",
            Namespace::Xmlns => "http://www.w3.org/2000/xmlns/",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// Fully qualified name. Used to depict names of tags and attributes.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct QualName {
    pub prefix: Option<Prefix>,
    pub ns: Namespace,
    pub local: LocalName,
}

impl QualName {
    #[inline]
    pub fn new(prefix: Option<Prefix>, ns: Namespace, local: LocalName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// An element name in the HTML namespace.
    #[inline]
    pub fn html(local: &str) -> QualName {
        QualName::new(None, Namespace::Html, LocalName::from(local))
    }

    /// An attribute name in the null namespace.
    #[inline]
    pub fn attr(local: &str) -> QualName {
        QualName::new(None, Namespace::Null, LocalName::from(local))
    }
}

/// A tag attribute.
///
/// The namespace on the attribute name is almost always `Namespace::Null`.
/// The tokenizer creates all attributes this way, but the tree
/// builder will adjust certain attribute names inside foreign
/// content (MathML, SVG).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    pub name: QualName,
    pub value: StrTendril,
}

/// A document's quirks mode, chosen from its doctype.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    NoQuirks,
}

/// The tree adapter: everything the tree builder needs from a caller-owned
/// node representation.
///
/// Methods take `&self`; implementations keep their nodes behind interior
/// mutability so the parser can hold handles while mutating the tree.
pub trait TreeSink {
    /// The overall result of parsing.
    type Output;

    /// `Handle` is a reference to a DOM node. The tree builder requires
    /// that a `Handle` implements `Clone` to get another reference to
    /// the same node.
    type Handle: Clone;

    /// Consume this sink and return the overall result of parsing.
    fn finish(self) -> Self::Output;

    /// Signal a parse error. Diagnostics are advisory and dropped by default.
    fn parse_error(&self, _diagnostic: Diagnostic) {}

    /// Get a handle to the `Document` node.
    fn get_document(&self) -> Self::Handle;

    /// Create an element. The element is not attached anywhere yet.
    fn create_element(&self, name: QualName, attrs: Vec<Attribute>) -> Self::Handle;

    /// Create a text node.
    fn create_text(&self, text: StrTendril) -> Self::Handle;

    /// Create a comment node.
    fn create_comment(&self, text: StrTendril) -> Self::Handle;

    /// Create the fragment that holds the contents of a `<template>`.
    fn create_document_fragment(&self) -> Self::Handle;

    /// Append a `DOCTYPE` node to the `Document`.
    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    );

    /// Append `child` as the last child of `parent`. `child` is detached.
    fn append_child(&self, parent: &Self::Handle, child: &Self::Handle);

    /// Insert `child` into `parent` immediately before `reference`.
    fn insert_before(&self, parent: &Self::Handle, child: &Self::Handle, reference: &Self::Handle);

    /// Detach `node` from its parent, if it has one.
    fn detach(&self, node: &Self::Handle);

    /// Append text as the last child of `parent`.
    ///
    /// Adapters that merge adjacent text nodes override this.
    fn insert_text(&self, parent: &Self::Handle, text: StrTendril) {
        let node = self.create_text(text);
        self.append_child(parent, &node);
    }

    /// Insert text into `parent` immediately before `reference`.
    fn insert_text_before(&self, parent: &Self::Handle, text: StrTendril, reference: &Self::Handle) {
        let node = self.create_text(text);
        self.insert_before(parent, &node, reference);
    }

    /// Associate the contents fragment with a `<template>` element.
    fn set_template_content(&self, template: &Self::Handle, content: &Self::Handle);

    /// The contents fragment of a `<template>` element.
    fn get_template_content(&self, template: &Self::Handle) -> Self::Handle;

    /// Set the document's quirks mode.
    fn set_document_mode(&self, mode: QuirksMode);

    fn get_tag_name(&self, element: &Self::Handle) -> LocalName;

    fn get_namespace(&self, element: &Self::Handle) -> Namespace;

    fn get_parent(&self, node: &Self::Handle) -> Option<Self::Handle>;

    fn get_children(&self, node: &Self::Handle) -> Vec<Self::Handle>;

    fn get_attrs(&self, element: &Self::Handle) -> Vec<Attribute>;

    /// Do two handles refer to the same node?
    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool;

    /// Add each attribute to the given element, if no attribute with that
    /// name already exists.
    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>);

    /// Mark a `<script>` as "already started".
    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    /// Record where in the input an element's start tag began.
    fn set_source_location(&self, _node: &Self::Handle, _location: SourceLocation) {}
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The stack of open elements.

use crate::interface::{Attribute, LocalName, Namespace, QualName};
use crate::tag_id::TagId;
use crate::tokenizer::Tag;

use super::tag_sets::{svg_html_integration_point, ElemKind};

/// Is an element with this name and these attributes an HTML integration
/// point? `annotation-xml` qualifies only through its `encoding`.
pub(crate) fn is_html_integration_point(name: &QualName, attrs: &[Attribute]) -> bool {
    let kind = ElemKind {
        ns: name.ns,
        tag: TagId::from_name(&name.local),
    };
    if svg_html_integration_point(kind) {
        return true;
    }
    kind.ns == Namespace::MathMl
        && kind.tag == TagId::AnnotationXml
        && attrs.iter().any(|attr| {
            attr.name.ns == Namespace::Null
                && &*attr.name.local == "encoding"
                && (attr.value.eq_ignore_ascii_case("text/html")
                    || attr.value.eq_ignore_ascii_case("application/xhtml+xml"))
        })
}

/// An entry on the stack: the node and what the tree builder needs to
/// know about it without asking the sink.
#[derive(Clone, Debug)]
pub(crate) struct OpenElement<Handle> {
    pub(crate) handle: Handle,
    pub(crate) kind: ElemKind,
    /// The element's local name, for tags without a `TagId`.
    pub(crate) local: LocalName,
    pub(crate) html_integration_point: bool,
}

impl<Handle> OpenElement<Handle> {
    pub(crate) fn new(handle: Handle, name: &QualName, attrs: &[Attribute]) -> OpenElement<Handle> {
        let html_integration_point = is_html_integration_point(name, attrs);
        OpenElement::from_parts(handle, name.ns, name.local.clone(), html_integration_point)
    }

    pub(crate) fn from_parts(
        handle: Handle,
        ns: Namespace,
        local: LocalName,
        html_integration_point: bool,
    ) -> OpenElement<Handle> {
        OpenElement {
            handle,
            kind: ElemKind {
                ns,
                tag: TagId::from_name(&local),
            },
            local,
            html_integration_point,
        }
    }

    #[inline]
    pub(crate) fn is_html(&self, tag: TagId) -> bool {
        self.kind == ElemKind::html(tag)
    }

    /// Is this an HTML element with the given name? Works for tags
    /// without a `TagId`.
    pub(crate) fn is_html_named(&self, name: &LocalName) -> bool {
        self.kind.ns == Namespace::Html && self.local == *name
    }

    /// Would an end tag with this name close this element? Known tags
    /// compare by id, anything else by name.
    pub(crate) fn matches_tag(&self, tag: &Tag) -> bool {
        match tag.tag_id {
            TagId::Unknown => self.is_html_named(&tag.name),
            id => self.is_html(id),
        }
    }
}

/// Open elements, with the current node last.
pub(crate) struct OpenElements<Handle> {
    elems: Vec<OpenElement<Handle>>,
}

impl<Handle> OpenElements<Handle> {
    pub(crate) fn new() -> OpenElements<Handle> {
        OpenElements { elems: vec![] }
    }

    pub(crate) fn push(&mut self, elem: OpenElement<Handle>) {
        self.elems.push(elem);
    }

    pub(crate) fn pop(&mut self) -> Option<OpenElement<Handle>> {
        self.elems.pop()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.elems.truncate(len);
    }

    pub(crate) fn insert(&mut self, index: usize, elem: OpenElement<Handle>) {
        self.elems.insert(index, elem);
    }

    pub(crate) fn remove(&mut self, index: usize) -> OpenElement<Handle> {
        self.elems.remove(index)
    }

    pub(crate) fn replace(&mut self, index: usize, elem: OpenElement<Handle>) {
        self.elems[index] = elem;
    }

    pub(crate) fn clear(&mut self) {
        self.elems.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.elems.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&OpenElement<Handle>> {
        self.elems.get(index)
    }

    pub(crate) fn current(&self) -> Option<&OpenElement<Handle>> {
        self.elems.last()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, OpenElement<Handle>> {
        self.elems.iter()
    }

    /// Index of the topmost element matching `pred`.
    pub(crate) fn rposition<P>(&self, pred: P) -> Option<usize>
    where
        P: Fn(&OpenElement<Handle>) -> bool,
    {
        self.elems.iter().rposition(pred)
    }

    /// Is there an HTML element with this id anywhere on the stack?
    pub(crate) fn contains_html(&self, tag: TagId) -> bool {
        self.elems.iter().any(|elem| elem.is_html(tag))
    }

    /// Scan down from the current node for an element matching `pred`,
    /// giving up at the first element in `scope`.
    pub(crate) fn in_scope<S, P>(&self, scope: S, pred: P) -> bool
    where
        S: Fn(ElemKind) -> bool,
        P: Fn(&OpenElement<Handle>) -> bool,
    {
        for elem in self.elems.iter().rev() {
            if pred(elem) {
                return true;
            }
            if scope(elem.kind) {
                return false;
            }
        }

        // The root <html> stops every scope.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_builder::tag_sets::{button_scope, default_scope, table_scope};
    use tendril::StrTendril;

    fn html(id: usize, name: &str) -> OpenElement<usize> {
        OpenElement::new(id, &QualName::html(name), &[])
    }

    fn stack(names: &[&str]) -> OpenElements<usize> {
        let mut stack = OpenElements::new();
        for (id, name) in names.iter().enumerate() {
            stack.push(html(id, name));
        }
        stack
    }

    #[test]
    fn scope_boundaries_hide_elements_below() {
        let stack = stack(&["html", "body", "p", "table", "tbody", "tr", "td", "span"]);
        assert!(stack.in_scope(default_scope, |e| e.is_html(TagId::Span)));
        assert!(!stack.in_scope(default_scope, |e| e.is_html(TagId::P)));
        assert!(stack.in_scope(table_scope, |e| e.is_html(TagId::Tr)));
        assert!(!stack.in_scope(button_scope, |e| e.is_html(TagId::Body)));
    }

    #[test]
    fn unknown_tags_match_by_name() {
        let stack = stack(&["html", "body", "blink"]);
        let blink = LocalName::from("blink");
        assert_eq!(stack.rposition(|e| e.is_html_named(&blink)), Some(2));
        assert_eq!(stack.current().map(|e| e.kind.tag), Some(TagId::Unknown));
    }

    #[test]
    fn annotation_xml_integration_point_depends_on_encoding() {
        let name = QualName::new(None, Namespace::MathMl, LocalName::from("annotation-xml"));
        let encoding = |value: &str| Attribute {
            name: QualName::attr("encoding"),
            value: StrTendril::from(value),
        };

        let plain = OpenElement::new(0, &name, &[]);
        let html = OpenElement::new(1, &name, &[encoding("Text/HTML")]);
        let svg = OpenElement::new(2, &name, &[encoding("image/svg+xml")]);
        assert!(!plain.html_integration_point);
        assert!(html.html_integration_point);
        assert!(!svg.html_integration_point);

        let foreign_object =
            QualName::new(None, Namespace::Svg, LocalName::from("foreignObject"));
        assert!(OpenElement::new(3, &foreign_object, &[]).html_integration_point);
    }
}

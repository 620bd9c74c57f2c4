// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Writing a tree back out as HTML.

use std::io::{self, Write};

use log::warn;

use crate::arena::{ArenaDom, NodeData, NodeId};
use crate::interface::{Attribute, LocalName, Namespace, QualName};

//§ serializing-html-fragments
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TraversalScope {
    IncludeNode,
    ChildrenOnly,
}

#[derive(Copy, Clone, Debug)]
pub struct SerializeOpts {
    /// Is scripting enabled? Decides whether `<noscript>` text is escaped.
    pub scripting_enabled: bool,

    /// Serialize the root node? Default: ChildrenOnly
    pub traversal_scope: TraversalScope,
}

impl Default for SerializeOpts {
    fn default() -> SerializeOpts {
        SerializeOpts {
            scripting_enabled: true,
            traversal_scope: TraversalScope::ChildrenOnly,
        }
    }
}

/// Serialize `node` of `dom` to `writer`.
pub fn serialize<Wr: Write>(
    writer: &mut Wr,
    dom: &ArenaDom,
    node: NodeId,
    opts: SerializeOpts,
) -> io::Result<()> {
    let mut ser = Serializer::new(writer, opts);
    serialize_node(&mut ser, dom, node, opts.traversal_scope)
}

// Pending work for the tree walk, kept on an explicit stack.
enum SerializeOp {
    Open(NodeId),
    Close(QualName),
}

fn serialize_node<Wr: Write>(
    ser: &mut Serializer<'_, Wr>,
    dom: &ArenaDom,
    id: NodeId,
    scope: TraversalScope,
) -> io::Result<()> {
    let mut ops = vec![];
    match scope {
        TraversalScope::IncludeNode => ops.push(SerializeOp::Open(id)),
        TraversalScope::ChildrenOnly => push_children(dom, id, &mut ops),
    }

    while let Some(op) = ops.pop() {
        let id = match op {
            SerializeOp::Open(id) => id,
            SerializeOp::Close(name) => {
                ser.end_elem(&name)?;
                continue;
            },
        };

        let node = dom.node(id);
        match node.data {
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                ser.start_elem(name, attrs)?;
                ops.push(SerializeOp::Close(name.clone()));
                push_children(dom, id, &mut ops);
            },
            NodeData::Document | NodeData::DocumentFragment => push_children(dom, id, &mut ops),
            NodeData::Doctype { ref name, .. } => ser.write_doctype(name)?,
            NodeData::Text(ref text) => ser.write_text(text)?,
            NodeData::Comment(ref text) => ser.write_comment(text)?,
        }
    }
    Ok(())
}

// Queue the children of `id` so that the first child is popped first.
// A template's children live in its contents fragment.
fn push_children(dom: &ArenaDom, id: NodeId, ops: &mut Vec<SerializeOp>) {
    let parent = match dom.node(id).data {
        NodeData::Element {
            template_contents: Some(contents),
            ..
        } => contents,
        _ => id,
    };

    let start = ops.len();
    let mut child = dom.node(parent).first_child;
    while let Some(current) = child {
        ops.push(SerializeOp::Open(current));
        child = dom.node(current).next_sibling;
    }
    ops[start..].reverse();
}

struct ElemInfo {
    html_name: Option<LocalName>,
    ignore_children: bool,
    processed_first_child: bool,
}

impl ElemInfo {
    fn root() -> ElemInfo {
        ElemInfo {
            html_name: None,
            ignore_children: false,
            processed_first_child: false,
        }
    }
}

/// Streams start tags, end tags, text and comments to a writer with
/// HTML escaping.
pub struct Serializer<'wr, Wr: 'wr> {
    writer: &'wr mut Wr,
    opts: SerializeOpts,
    stack: Vec<ElemInfo>,
}

fn tagname(name: &QualName) -> &LocalName {
    match name.ns {
        Namespace::Html | Namespace::MathMl | Namespace::Svg => (),
        ns => warn!("node with unexpected namespace {}", ns),
    }
    &name.local
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "basefont"
            | "bgsound"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

impl<'wr, Wr: Write> Serializer<'wr, Wr> {
    pub fn new(writer: &'wr mut Wr, opts: SerializeOpts) -> Serializer<'wr, Wr> {
        Serializer {
            writer,
            opts,
            stack: vec![ElemInfo::root()],
        }
    }

    fn parent(&mut self) -> &mut ElemInfo {
        if self.stack.is_empty() {
            warn!("serializer stack underflow");
            self.stack.push(ElemInfo::root());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn write_escaped(&mut self, text: &str, attr_mode: bool) -> io::Result<()> {
        for c in text.chars() {
            match c {
                '&' => self.writer.write_all(b"&amp;"),
                '\u{00A0}' => self.writer.write_all(b"&nbsp;"),
                '"' if attr_mode => self.writer.write_all(b"&quot;"),
                '<' if !attr_mode => self.writer.write_all(b"&lt;"),
                '>' if !attr_mode => self.writer.write_all(b"&gt;"),
                c => self.writer.write_all(c.encode_utf8(&mut [0; 4]).as_bytes()),
            }?;
        }
        Ok(())
    }

    pub fn start_elem(&mut self, name: &QualName, attrs: &[Attribute]) -> io::Result<()> {
        let html_name = match name.ns {
            Namespace::Html => Some(name.local.clone()),
            _ => None,
        };

        if self.parent().ignore_children {
            self.stack.push(ElemInfo {
                html_name,
                ignore_children: true,
                processed_first_child: false,
            });
            return Ok(());
        }

        self.writer.write_all(b"<")?;
        self.writer.write_all(tagname(name).as_bytes())?;
        for attr in attrs {
            self.writer.write_all(b" ")?;

            match attr.name.ns {
                Namespace::Null => (),
                Namespace::Xml => self.writer.write_all(b"xml:")?,
                Namespace::Xmlns => {
                    if &*attr.name.local != "xmlns" {
                        self.writer.write_all(b"xmlns:")?;
                    }
                },
                Namespace::XLink => self.writer.write_all(b"xlink:")?,
                ns => {
                    warn!("attribute with unexpected namespace {}", ns);
                    if let Some(ref prefix) = attr.name.prefix {
                        self.writer.write_all(prefix.as_bytes())?;
                        self.writer.write_all(b":")?;
                    }
                },
            }

            self.writer.write_all(attr.name.local.as_bytes())?;
            self.writer.write_all(b"=\"")?;
            self.write_escaped(&attr.value, true)?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(b">")?;

        let ignore_children = name.ns == Namespace::Html && is_void(&name.local);

        self.parent().processed_first_child = true;

        self.stack.push(ElemInfo {
            html_name,
            ignore_children,
            processed_first_child: false,
        });

        Ok(())
    }

    pub fn end_elem(&mut self, name: &QualName) -> io::Result<()> {
        let info = match self.stack.pop() {
            Some(info) => info,
            None => {
                warn!("end of {} without a start", name.local);
                return Ok(());
            },
        };
        if info.ignore_children {
            return Ok(());
        }

        self.writer.write_all(b"</")?;
        self.writer.write_all(tagname(name).as_bytes())?;
        self.writer.write_all(b">")
    }

    pub fn write_text(&mut self, text: &str) -> io::Result<()> {
        let scripting_enabled = self.opts.scripting_enabled;
        let parent = self.parent();
        let parent_name = parent.html_name.as_deref();

        let prepend_lf = text.starts_with('\n') &&
            !parent.processed_first_child &&
            matches!(parent_name, Some("pre" | "textarea" | "listing"));

        let escape = match parent_name {
            Some(
                "style" | "script" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext",
            ) => false,
            Some("noscript") => !scripting_enabled,
            _ => true,
        };
        parent.processed_first_child = true;

        if prepend_lf {
            self.writer.write_all(b"\n")?;
        }

        if escape {
            self.write_escaped(text, false)
        } else {
            self.writer.write_all(text.as_bytes())
        }
    }

    pub fn write_comment(&mut self, text: &str) -> io::Result<()> {
        self.parent().processed_first_child = true;
        self.writer.write_all(b"<!--")?;
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"-->")
    }

    pub fn write_doctype(&mut self, name: &str) -> io::Result<()> {
        self.writer.write_all(b"<!DOCTYPE ")?;
        self.writer.write_all(name.as_bytes())?;
        self.writer.write_all(b">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{parse_document, ParseOpts};

    fn body_html(input: &str) -> String {
        let dom = parse_document(ArenaDom::default(), ParseOpts::default()).one(input);
        let body = dom.find_element(dom.document(), "body").unwrap();
        dom.inner_html(body)
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        assert_eq!(
            body_html("<p title='a\"b&amp;c'>1 &lt; 2 &amp;&nbsp;</p>"),
            "<p title=\"a&quot;b&amp;c\">1 &lt; 2 &amp;&nbsp;</p>"
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        assert_eq!(body_html("<br><img src=x><hr>"), "<br><img src=\"x\"><hr>");
    }

    #[test]
    fn raw_text_is_not_escaped() {
        assert_eq!(
            body_html("<body><script>a < b && c</script>"),
            "<script>a < b && c</script>"
        );
    }

    #[test]
    fn leading_newline_survives_in_pre() {
        assert_eq!(body_html("<pre>\n\nx</pre>"), "<pre>\n\nx</pre>");
    }

    #[test]
    fn foreign_attributes_get_prefixes() {
        assert_eq!(
            body_html("<svg xlink:href=a xml:lang=en xmlns:xlink=b></svg>"),
            "<svg xlink:href=\"a\" xml:lang=\"en\" xmlns:xlink=\"b\"></svg>"
        );
    }

    #[test]
    fn template_contents_are_serialized() {
        assert_eq!(
            body_html("<body><template><b>x</b></template>y"),
            "<template><b>x</b></template>y"
        );
    }

    #[test]
    fn deeply_nested_elements() {
        let depth = 5000;
        let input = "<div>".repeat(depth);
        let html = body_html(&input);
        assert_eq!(html, format!("{}{}", "<div>".repeat(depth), "</div>".repeat(depth)));
    }

    #[test]
    fn whole_document_with_doctype() {
        let dom = parse_document(ArenaDom::default(), ParseOpts::default())
            .one("<!DOCTYPE html><!--c--><title>t</title>");
        assert_eq!(
            dom.inner_html(dom.document()),
            "<!DOCTYPE html><!--c--><html><head><title>t</title></head><body></body></html>"
        );
    }
}

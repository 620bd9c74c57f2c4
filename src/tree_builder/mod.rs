// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tree builder.

pub use crate::interface::{LimitedQuirks, NoQuirks, Quirks, QuirksMode, TreeSink};

use self::stack::{is_html_integration_point, OpenElement, OpenElements};
use self::tag_sets::*;
use self::types::*;

use crate::error::{Diagnostic, ErrorCode, Span};
use crate::interface::{Attribute, LocalName, Namespace, QualName};
use crate::tag_id::TagId;
use crate::tokenizer;
use crate::tokenizer::states::{self as tok_state, RawKind};
use crate::tokenizer::{Doctype, EndTag, StartTag, Tag, TokenSink, TokenSinkResult};

use log::{debug, log_enabled, warn, Level};
use std::cell::{Cell, Ref, RefCell};
use tendril::StrTendril;

#[macro_use]
mod tag_sets;

mod data;
mod foreign;
mod rules;
mod stack;
mod types;

/// Tree builder options, with an impl for Default.
#[derive(Copy, Clone, Debug)]
pub struct TreeBuilderOpts {
    /// Report every structural error, including open elements at
    /// `</body>` and `</html>`? Default: false
    pub exact_errors: bool,

    /// Is scripting enabled?
    ///
    /// With scripting the contents of `<noscript>` are one text node,
    /// without it they are parsed as markup.
    pub scripting_enabled: bool,

    /// Is this document being parsed from the `srcdoc` attribute of an
    /// `<iframe>` element? Such documents never get quirks from their
    /// `DOCTYPE` and a missing one is not an error.
    pub iframe_srcdoc: bool,

    /// Should we drop the DOCTYPE (if any) from the tree?
    pub drop_doctype: bool,

    /// Initial TreeBuilder quirks mode. Default: NoQuirks
    pub quirks_mode: QuirksMode,

    /// Report where each element's start tag began through
    /// `TreeSink::set_source_location`? Default: false
    pub source_location_tracking: bool,
}

impl Default for TreeBuilderOpts {
    fn default() -> TreeBuilderOpts {
        TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: true,
            iframe_srcdoc: false,
            drop_doctype: false,
            quirks_mode: NoQuirks,
            source_location_tracking: false,
        }
    }
}

/// The HTML tree builder.
pub struct TreeBuilder<Handle, Sink> {
    /// Options controlling the behavior of the tree builder.
    opts: TreeBuilderOpts,

    /// Consumer of tree modifications.
    pub sink: Sink,

    /// Insertion mode.
    mode: Cell<InsertionMode>,

    /// Original insertion mode, used by Text and InTableText modes.
    orig_mode: Cell<Option<InsertionMode>>,

    /// Stack of template insertion modes.
    template_modes: RefCell<Vec<InsertionMode>>,

    /// Pending table character tokens.
    pending_table_text: RefCell<Vec<Token>>,

    /// Quirks mode as set by the parser.
    quirks_mode: Cell<QuirksMode>,

    /// The document node, which is created by the sink.
    doc_handle: Handle,

    /// Stack of open elements, most recently added at end.
    open_elems: RefCell<OpenElements<Handle>>,

    /// List of active formatting elements.
    active_formatting: RefCell<Vec<FormatEntry<Handle>>>,

    /// Head element pointer.
    head_elem: RefCell<Option<Handle>>,

    /// Form element pointer.
    form_elem: RefCell<Option<Handle>>,

    /// Frameset-ok flag.
    frameset_ok: Cell<bool>,

    /// Ignore a following U+000A LINE FEED?
    ignore_lf: Cell<bool>,

    /// Is foster parenting enabled?
    foster_parenting: Cell<bool>,

    /// The context element for the fragment parsing algorithm.
    context_elem: RefCell<Option<OpenElement<Handle>>>,

    /// Input covered by the token being processed.
    current_span: Cell<Span>,
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Create a new tree builder which sends tree modifications to a particular `TreeSink`.
    ///
    /// The tree builder is also a `TokenSink`.
    pub fn new(sink: Sink, opts: TreeBuilderOpts) -> TreeBuilder<Handle, Sink> {
        let doc_handle = sink.get_document();
        TreeBuilder {
            opts,
            sink,
            mode: Cell::new(InsertionMode::Initial),
            orig_mode: Cell::new(None),
            template_modes: RefCell::new(vec![]),
            pending_table_text: RefCell::new(vec![]),
            quirks_mode: Cell::new(opts.quirks_mode),
            doc_handle,
            open_elems: RefCell::new(OpenElements::new()),
            active_formatting: RefCell::new(vec![]),
            head_elem: RefCell::new(None),
            form_elem: RefCell::new(None),
            frameset_ok: Cell::new(true),
            ignore_lf: Cell::new(false),
            foster_parenting: Cell::new(false),
            context_elem: RefCell::new(None),
            current_span: Cell::new(Span::default()),
        }
    }

    /// Create a new tree builder which sends tree modifications to a particular `TreeSink`.
    /// This is for parsing fragments.
    ///
    /// The context element is only read, never modified. The tree builder is
    /// also a `TokenSink`.
    pub fn new_for_fragment(
        sink: Sink,
        context_elem: Handle,
        form_elem: Option<Handle>,
        opts: TreeBuilderOpts,
    ) -> TreeBuilder<Handle, Sink> {
        let name = QualName::new(
            None,
            sink.get_namespace(&context_elem),
            sink.get_tag_name(&context_elem),
        );
        let attrs = sink.get_attrs(&context_elem);
        let context = OpenElement::new(context_elem, &name, &attrs);
        let context_is_template = context.is_html(TagId::Template);

        let tb = TreeBuilder::new(sink, opts);
        *tb.form_elem.borrow_mut() = form_elem;
        if context_is_template {
            tb.template_modes.borrow_mut().push(InsertionMode::InTemplate);
        }
        *tb.context_elem.borrow_mut() = Some(context);

        // The fragment is parsed into a root <html>; the context element
        // only steers the insertion mode.
        tb.create_root(vec![]);
        tb.mode.set(tb.reset_insertion_mode());
        tb
    }

    /// The tokenizer state a fragment parse starts in, chosen from the
    /// context element.
    pub fn tokenizer_state_for_context_elem(&self, scripting_enabled: bool) -> tok_state::State {
        let context_elem = self.context_elem.borrow();
        match context_elem.as_ref() {
            Some(elem) if elem.kind.ns == Namespace::Html => {
                tok_state::State::for_html_context(elem.kind.tag, scripting_enabled)
            },
            _ => tok_state::Data,
        }
    }

    /// Are we parsing a HTML fragment?
    pub fn is_fragment(&self) -> bool {
        self.context_elem.borrow().is_some()
    }

    /// The quirks mode selected so far.
    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode.get()
    }

    fn debug_step(&self, mode: InsertionMode, token: &Token) {
        if log_enabled!(Level::Debug) {
            debug!("processing {:?} in insertion mode {:?}", token, mode);
        }
    }

    fn process_to_completion(&self, mut token: Token) -> TokenSinkResult<Handle> {
        loop {
            let should_have_acknowledged_self_closing_flag = matches!(
                token,
                Token::Tag(Tag {
                    self_closing: true,
                    kind: StartTag,
                    ..
                })
            );
            let result = if self.is_foreign(&token) {
                self.step_foreign(token)
            } else {
                let mode = self.mode.get();
                self.step(mode, token)
            };
            let unacknowledged = || {
                if should_have_acknowledged_self_closing_flag {
                    self.parse_error(ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus);
                }
            };
            match result {
                ProcessResult::Done => {
                    unacknowledged();
                    return TokenSinkResult::Continue;
                },
                ProcessResult::DoneAckSelfClosing => return TokenSinkResult::Continue,
                ProcessResult::Reprocess(m, t) => {
                    self.mode.set(m);
                    token = t;
                },
                ProcessResult::Script(node) => return TokenSinkResult::Script(node),
                ProcessResult::ToPlaintext => {
                    unacknowledged();
                    return TokenSinkResult::Plaintext;
                },
                ProcessResult::ToRawData(k) => {
                    unacknowledged();
                    return TokenSinkResult::RawData(k);
                },
            }
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#appropriate-place-for-inserting-a-node>
    fn appropriate_place_for_insertion(
        &self,
        override_target: Option<OpenElement<Handle>>,
    ) -> InsertionPoint<Handle> {
        declare_tag_set!(foster_target = Table Tbody Tfoot Thead Tr);

        let target = match override_target.or_else(|| self.current_node()) {
            Some(target) => target,
            None => {
                warn!("inserting a node with no open elements");
                return InsertionPoint::LastChild(self.doc_handle.clone());
            },
        };
        if !(self.foster_parenting.get() && foster_target(target.kind)) {
            // No foster parenting (the common case).
            return InsertionPoint::LastChild(self.contents_of(&target));
        }

        let open_elems = self.open_elems.borrow();
        for (i, elem) in open_elems.iter().enumerate().rev() {
            if elem.is_html(TagId::Template) {
                return InsertionPoint::LastChild(self.contents_of(elem));
            }
            if elem.is_html(TagId::Table) {
                if let Some(parent) = self.sink.get_parent(&elem.handle) {
                    return InsertionPoint::BeforeSibling {
                        parent,
                        sibling: elem.handle.clone(),
                    };
                }
                if let Some(prev) = i.checked_sub(1).and_then(|j| open_elems.get(j)) {
                    return InsertionPoint::LastChild(self.contents_of(prev));
                }
                break;
            }
        }
        match open_elems.get(0) {
            Some(html) => InsertionPoint::LastChild(html.handle.clone()),
            None => InsertionPoint::LastChild(self.doc_handle.clone()),
        }
    }

    /// Where children of an open element go: its template contents for a
    /// `<template>`, the element itself otherwise.
    fn contents_of(&self, elem: &OpenElement<Handle>) -> Handle {
        if elem.is_html(TagId::Template) {
            self.sink.get_template_content(&elem.handle)
        } else {
            elem.handle.clone()
        }
    }

    fn insert_at(&self, insertion_point: InsertionPoint<Handle>, child: &Handle) {
        match insertion_point {
            InsertionPoint::LastChild(parent) => self.sink.append_child(&parent, child),
            InsertionPoint::BeforeSibling { parent, sibling } => {
                self.sink.insert_before(&parent, child, &sibling)
            },
        }
    }

    fn insert_text_at(&self, insertion_point: InsertionPoint<Handle>, text: StrTendril) {
        match insertion_point {
            InsertionPoint::LastChild(parent) => self.sink.insert_text(&parent, text),
            InsertionPoint::BeforeSibling { parent, sibling } => {
                self.sink.insert_text_before(&parent, text, &sibling)
            },
        }
    }

    fn process_doctype(&self, dt: Doctype) -> TokenSinkResult<Handle> {
        if self.mode.get() != InsertionMode::Initial {
            debug!("DOCTYPE in insertion mode {:?}", self.mode.get());
            self.parse_error(ErrorCode::MisplacedDoctype);
            return TokenSinkResult::Continue;
        }

        let (err, quirk) = data::doctype_error_and_quirks(&dt, self.opts.iframe_srcdoc);
        if err {
            self.parse_error(ErrorCode::NonConformingDoctype);
        }
        let Doctype {
            name,
            public_id,
            system_id,
            force_quirks: _,
        } = dt;
        if !self.opts.drop_doctype {
            self.sink.append_doctype_to_document(
                name.unwrap_or_default(),
                public_id.unwrap_or_default(),
                system_id.unwrap_or_default(),
            );
        }
        self.set_quirks_mode(quirk);

        self.mode.set(InsertionMode::BeforeHtml);
        TokenSinkResult::Continue
    }
}

impl<Handle, Sink> TokenSink for TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    type Handle = Handle;

    fn process_token(&self, token: tokenizer::Token, span: Span) -> TokenSinkResult<Handle> {
        let ignore_lf = self.ignore_lf.take();

        // Handle `ParseError` and `DoctypeToken`; convert everything else to the local `Token` type.
        let token = match token {
            tokenizer::ParseError(diagnostic) => {
                // Errors are not the token that follows <pre>.
                self.ignore_lf.set(ignore_lf);
                self.sink.parse_error(diagnostic);
                return TokenSinkResult::Continue;
            },

            tokenizer::DoctypeToken(dt) => {
                self.current_span.set(span);
                return self.process_doctype(dt);
            },

            tokenizer::TagToken(x) => Token::Tag(x),
            tokenizer::CommentToken(x) => Token::Comment(x),
            tokenizer::NullCharacterToken => Token::NullCharacter,
            tokenizer::EOFToken => Token::Eof,
            tokenizer::CharacterTokens(x) => Token::Characters(x),

            tokenizer::WhitespaceTokens(mut x) => {
                if ignore_lf && x.starts_with('\n') {
                    x.pop_front(1);
                }
                if x.is_empty() {
                    return TokenSinkResult::Continue;
                }
                Token::Whitespace(x)
            },
        };

        self.current_span.set(span);
        self.process_to_completion(token)
    }

    fn end(&self) {
        self.open_elems.borrow_mut().clear();
    }

    fn cdata_allowed(&self) -> bool {
        self.adjusted_current_node()
            .map_or(false, |node| node.kind.ns != Namespace::Html)
    }
}

enum PushFlag {
    Push,
    NoPush,
}

enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    fn parse_error(&self, code: ErrorCode) {
        self.sink
            .parse_error(Diagnostic::new(code, self.current_span.get()));
    }

    fn unexpected(&self, token: &Token) -> ProcessResult<Handle> {
        match *token {
            Token::Tag(ref tag) => self.unexpected_tag(tag),
            _ => {
                if self.opts.exact_errors {
                    debug!("unexpected {:?} in insertion mode {:?}", token, self.mode.get());
                }
                self.parse_error(match *token {
                    Token::Eof => ErrorCode::OpenElementsLeftAfterEof,
                    _ => ErrorCode::UnexpectedCharacterToken,
                });
                ProcessResult::Done
            },
        }
    }

    fn unexpected_tag(&self, tag: &Tag) -> ProcessResult<Handle> {
        if self.opts.exact_errors {
            debug!("unexpected {:?} in insertion mode {:?}", tag, self.mode.get());
        }
        self.parse_error(match tag.kind {
            StartTag => ErrorCode::UnexpectedStartTag,
            EndTag => ErrorCode::UnexpectedEndTag,
        });
        ProcessResult::Done
    }

    fn position_in_active_formatting(&self, element: &Handle) -> Option<usize> {
        self.active_formatting
            .borrow()
            .iter()
            .position(|n| match n {
                FormatEntry::Marker => false,
                FormatEntry::Element(ref handle, _) => self.sink.same_node(handle, element),
            })
    }

    /// Search the active formatting elements back to the last marker.
    fn find_in_active_formatting<P>(&self, pred: P) -> Option<(usize, Handle, Tag)>
    where
        P: Fn(&Tag) -> bool,
    {
        let active_formatting = self.active_formatting.borrow();
        for (i, entry) in active_formatting.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(handle, tag) if pred(tag) => {
                    return Some((i, handle.clone(), tag.clone()));
                },
                FormatEntry::Element(..) => (),
            }
        }
        None
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
        self.sink.set_document_mode(mode);
    }

    fn stop_parsing(&self) -> ProcessResult<Handle> {
        ProcessResult::Done
    }

    // Switch to `Text` insertion mode, save the old mode, and
    // switch the tokenizer to a raw-data state.
    // The latter only takes effect after the current / next
    // `process_token` of a start tag returns!
    fn to_raw_text_mode(&self, k: RawKind) -> ProcessResult<Handle> {
        self.orig_mode.set(Some(self.mode.get()));
        self.mode.set(InsertionMode::Text);
        ProcessResult::ToRawData(k)
    }

    // The generic raw text / RCDATA parsing algorithm.
    fn parse_raw_data(&self, tag: Tag, k: RawKind) -> ProcessResult<Handle> {
        self.insert_element_for(tag);
        self.to_raw_text_mode(k)
    }

    fn current_node(&self) -> Option<OpenElement<Handle>> {
        self.open_elems.borrow().current().cloned()
    }

    fn adjusted_current_node(&self) -> Option<Ref<'_, OpenElement<Handle>>> {
        let open_elems = self.open_elems.borrow();
        if open_elems.len() == 1 {
            if let Ok(ctx) = Ref::filter_map(self.context_elem.borrow(), |e| e.as_ref()) {
                return Some(ctx);
            }
        }
        Ref::filter_map(open_elems, |elems| elems.current()).ok()
    }

    fn current_node_in<TagSet>(&self, set: TagSet) -> bool
    where
        TagSet: Fn(ElemKind) -> bool,
    {
        self.open_elems
            .borrow()
            .current()
            .map_or(false, |node| set(node.kind))
    }

    fn current_node_named(&self, tag: TagId) -> bool {
        self.current_node_in(|kind| kind == ElemKind::html(tag))
    }

    fn current_node_is(&self, handle: &Handle) -> bool {
        self.open_elems
            .borrow()
            .current()
            .map_or(false, |node| self.sink.same_node(&node.handle, handle))
    }

    // Insert at the "appropriate place for inserting a node".
    fn insert_appropriately(&self, child: &Handle, override_target: Option<OpenElement<Handle>>) {
        let insertion_point = self.appropriate_place_for_insertion(override_target);
        self.insert_at(insertion_point, child);
    }

    /// <https://html.spec.whatwg.org/multipage/#adoption-agency-algorithm>
    fn adoption_agency(&self, subject: TagId) {
        // 1.
        let current_is_unformatted_subject = self
            .current_node()
            .map_or(false, |node| {
                node.is_html(subject) && self.position_in_active_formatting(&node.handle).is_none()
            });
        if current_is_unformatted_subject {
            self.pop();
            return;
        }

        // 2. 3. 4.
        for _ in 0..8 {
            // 5.
            let Some((fmt_elem_index, fmt_elem, fmt_elem_tag)) =
                self.find_in_active_formatting(|tag| tag.tag_id == subject)
            else {
                return self.process_end_tag_in_body(Tag {
                    kind: EndTag,
                    name: LocalName::from(subject.as_str()),
                    tag_id: subject,
                    self_closing: false,
                    attrs: vec![],
                });
            };

            // 6.
            let fmt_elem_stack_index = self
                .open_elems
                .borrow()
                .rposition(|n| self.sink.same_node(&n.handle, &fmt_elem));
            let Some(fmt_elem_stack_index) = fmt_elem_stack_index else {
                self.parse_error(ErrorCode::AdoptionAgency13);
                self.active_formatting.borrow_mut().remove(fmt_elem_index);
                return;
            };

            // 7.
            if !self.in_scope(default_scope, |n| self.sink.same_node(&n.handle, &fmt_elem)) {
                self.parse_error(ErrorCode::AdoptionAgency13);
                return;
            }

            // 8.
            if !self.current_node_is(&fmt_elem) {
                self.parse_error(ErrorCode::AdoptionAgency13);
            }

            // 9.
            let furthest_block = self
                .open_elems
                .borrow()
                .iter()
                .enumerate()
                .skip(fmt_elem_stack_index + 1)
                .find(|(_, elem)| special(elem.kind))
                .map(|(i, elem)| (i, elem.clone()));

            let Some((furthest_block_index, furthest_block)) = furthest_block else {
                // 10.
                self.open_elems.borrow_mut().truncate(fmt_elem_stack_index);
                self.active_formatting.borrow_mut().remove(fmt_elem_index);
                return;
            };

            // 11.
            let common_ancestor = fmt_elem_stack_index
                .checked_sub(1)
                .and_then(|i| self.open_elems.borrow().get(i).cloned());
            let Some(common_ancestor) = common_ancestor else {
                warn!("formatting element at the bottom of the stack");
                return;
            };

            // 12.
            let mut bookmark = Bookmark::Replace(fmt_elem.clone());

            // 13.
            let mut node_index = furthest_block_index;
            let mut last_node = furthest_block.handle.clone();

            // 13.1.
            let mut inner_counter = 0;
            loop {
                // 13.2.
                inner_counter += 1;

                // 13.3.
                node_index -= 1;
                let node = self.open_elems.borrow().get(node_index).cloned();
                let Some(node) = node else {
                    warn!("adoption agency ran off the stack");
                    break;
                };

                // 13.4.
                if self.sink.same_node(&node.handle, &fmt_elem) {
                    break;
                }

                // 13.5.
                if inner_counter > 3 {
                    if let Some(position) = self.position_in_active_formatting(&node.handle) {
                        self.active_formatting.borrow_mut().remove(position);
                    }
                    self.open_elems.borrow_mut().remove(node_index);
                    continue;
                }

                let Some(node_formatting_index) = self.position_in_active_formatting(&node.handle)
                else {
                    // 13.6.
                    self.open_elems.borrow_mut().remove(node_index);
                    continue;
                };

                // 13.7.
                let tag = match self.active_formatting.borrow()[node_formatting_index] {
                    FormatEntry::Element(_, ref t) => t.clone(),
                    FormatEntry::Marker => {
                        warn!("found a marker during the adoption agency");
                        return;
                    },
                };
                let new_element =
                    self.create_element(QualName::html(&tag.name), tag.attrs.clone());
                let new_handle = new_element.handle.clone();
                self.open_elems
                    .borrow_mut()
                    .replace(node_index, new_element);
                self.active_formatting.borrow_mut()[node_formatting_index] =
                    FormatEntry::Element(new_handle.clone(), tag);

                // 13.8.
                if self.sink.same_node(&last_node, &furthest_block.handle) {
                    bookmark = Bookmark::InsertAfter(new_handle.clone());
                }

                // 13.9.
                self.sink.detach(&last_node);
                self.sink.append_child(&new_handle, &last_node);

                // 13.10.
                last_node = new_handle;
            }

            // 14.
            self.sink.detach(&last_node);
            self.insert_appropriately(&last_node, Some(common_ancestor));

            // 15.
            let new_element =
                self.create_element(QualName::html(&fmt_elem_tag.name), fmt_elem_tag.attrs.clone());
            let new_handle = new_element.handle.clone();
            let new_entry = FormatEntry::Element(new_handle.clone(), fmt_elem_tag);

            // 16.
            for child in self.sink.get_children(&furthest_block.handle) {
                self.sink.detach(&child);
                self.sink.append_child(&new_handle, &child);
            }

            // 17.
            self.sink.append_child(&furthest_block.handle, &new_handle);

            // 18.
            match bookmark {
                Bookmark::Replace(to_replace) => {
                    match self.position_in_active_formatting(&to_replace) {
                        Some(index) => self.active_formatting.borrow_mut()[index] = new_entry,
                        None => warn!("bookmark not found in active formatting elements"),
                    }
                },
                Bookmark::InsertAfter(previous) => {
                    match self.position_in_active_formatting(&previous) {
                        Some(index) => self
                            .active_formatting
                            .borrow_mut()
                            .insert(index + 1, new_entry),
                        None => warn!("bookmark not found in active formatting elements"),
                    }
                    if let Some(old_index) = self.position_in_active_formatting(&fmt_elem) {
                        self.active_formatting.borrow_mut().remove(old_index);
                    }
                },
            }

            // 19.
            self.remove_from_stack(&fmt_elem);
            let new_furthest_block_index = self
                .open_elems
                .borrow()
                .rposition(|n| self.sink.same_node(&n.handle, &furthest_block.handle));
            match new_furthest_block_index {
                Some(index) => self
                    .open_elems
                    .borrow_mut()
                    .insert(index + 1, new_element),
                None => warn!("furthest block missing from open element stack"),
            }

            // 20.
        }
    }

    fn push(&self, elem: OpenElement<Handle>) {
        self.open_elems.borrow_mut().push(elem);
    }

    fn pop(&self) -> Option<OpenElement<Handle>> {
        self.open_elems.borrow_mut().pop()
    }

    fn remove_from_stack(&self, elem: &Handle) {
        let position = self
            .open_elems
            .borrow()
            .rposition(|x| self.sink.same_node(elem, &x.handle));
        if let Some(position) = position {
            self.open_elems.borrow_mut().remove(position);
        }
    }

    fn is_marker_or_open(&self, entry: &FormatEntry<Handle>) -> bool {
        match *entry {
            FormatEntry::Marker => true,
            FormatEntry::Element(ref node, _) => self
                .open_elems
                .borrow()
                .iter()
                .rev()
                .any(|n| self.sink.same_node(&n.handle, node)),
        }
    }

    /// <https://html.spec.whatwg.org/#reconstruct-the-active-formatting-elements>
    fn reconstruct_active_formatting_elements(&self) {
        let len = self.active_formatting.borrow().len();
        {
            let active_formatting = self.active_formatting.borrow();
            let Some(last) = active_formatting.last() else {
                return;
            };
            if self.is_marker_or_open(last) {
                return;
            }
        }

        // Rewind to the entry after the last marker or open element.
        let mut entry_index = len - 1;
        while entry_index > 0 {
            entry_index -= 1;
            if self.is_marker_or_open(&self.active_formatting.borrow()[entry_index]) {
                entry_index += 1;
                break;
            }
        }

        // Create.
        loop {
            let tag = match self.active_formatting.borrow()[entry_index] {
                FormatEntry::Element(_, ref t) => t.clone(),
                FormatEntry::Marker => {
                    warn!("found a marker during formatting element reconstruction");
                    return;
                },
            };

            let new_element = self.insert_element(
                PushFlag::Push,
                Namespace::Html,
                tag.name.clone(),
                tag.attrs.clone(),
            );
            self.active_formatting.borrow_mut()[entry_index] =
                FormatEntry::Element(new_element, tag);

            if entry_index == len - 1 {
                break;
            }
            entry_index += 1;
        }
    }

    /// Get the first element on the stack, which will be the <html> element.
    fn html_elem(&self) -> Option<Handle> {
        self.open_elems.borrow().get(0).map(|elem| elem.handle.clone())
    }

    /// Get the second element on the stack, if it's a HTML body element.
    fn body_elem(&self) -> Option<Handle> {
        self.open_elems
            .borrow()
            .get(1)
            .filter(|elem| elem.is_html(TagId::Body))
            .map(|elem| elem.handle.clone())
    }

    /// Signal an error if anything but the elements allowed to stay open
    /// is on the stack at the end of the body.
    fn check_body_end(&self, code: ErrorCode) {
        declare_tag_set!(body_end_ok =
            Dd Dt Li Optgroup Option P Rb Rp Rt Rtc Tbody Td Tfoot Th Thead Tr Body Html);

        let open_elems = self.open_elems.borrow();
        if let Some(elem) = open_elems.iter().find(|elem| !body_end_ok(elem.kind)) {
            if self.opts.exact_errors {
                debug!("<{}> still open at the end of the body", elem.local);
            }
            self.parse_error(code);
        }
    }

    fn in_scope<TagSet, Pred>(&self, scope: TagSet, pred: Pred) -> bool
    where
        TagSet: Fn(ElemKind) -> bool,
        Pred: Fn(&OpenElement<Handle>) -> bool,
    {
        self.open_elems.borrow().in_scope(scope, pred)
    }

    fn in_scope_named<TagSet>(&self, scope: TagSet, tag: TagId) -> bool
    where
        TagSet: Fn(ElemKind) -> bool,
    {
        self.in_scope(scope, |elem| elem.is_html(tag))
    }

    fn in_html_elem_named(&self, tag: TagId) -> bool {
        self.open_elems.borrow().contains_html(tag)
    }

    /// <https://html.spec.whatwg.org/#generate-implied-end-tags>
    fn generate_implied_end_tags<TagSet>(&self, set: TagSet)
    where
        TagSet: Fn(ElemKind) -> bool,
    {
        while self.current_node_in(&set) {
            self.pop();
        }
    }

    fn generate_implied_end_except(&self, except: TagId) {
        self.generate_implied_end_tags(|kind| {
            kind != ElemKind::html(except) && cursory_implied_end(kind)
        });
    }

    // Pop elements until the current element is in the set.
    fn pop_until_current<TagSet>(&self, tag_set: TagSet)
    where
        TagSet: Fn(ElemKind) -> bool,
    {
        while !self.current_node_in(&tag_set) {
            if self.pop().is_none() {
                break;
            }
        }
    }

    // Pop elements until an element matching the predicate has been popped.
    // Returns the number of elements popped.
    fn pop_until<P>(&self, pred: P) -> usize
    where
        P: Fn(&OpenElement<Handle>) -> bool,
    {
        let mut n = 0;
        loop {
            n += 1;
            match self.pop() {
                None => break,
                Some(elem) if pred(&elem) => break,
                Some(_) => (),
            }
        }
        n
    }

    fn pop_until_named(&self, tag: TagId) -> usize {
        self.pop_until(|elem| elem.is_html(tag))
    }

    /// Pop elements until one with the specified name has been popped.
    /// Signal an error if it was not the first one.
    fn expect_to_close(&self, tag: TagId) {
        if self.pop_until_named(tag) != 1 {
            self.parse_error(ErrorCode::ClosingOfElementWithOpenChildElements);
        }
    }

    fn close_p_element(&self) {
        declare_tag_set!(implied = [cursory_implied_end] - P);
        self.generate_implied_end_tags(implied);
        self.expect_to_close(TagId::P);
    }

    fn close_p_element_in_button_scope(&self) {
        if self.in_scope_named(button_scope, TagId::P) {
            self.close_p_element();
        }
    }

    // Check <input> tags for type=hidden
    fn is_type_hidden(&self, tag: &Tag) -> bool {
        tag.get_attribute("type")
            .map_or(false, |value| value.eq_ignore_ascii_case("hidden"))
    }

    fn foster_parent_in_body(&self, token: Token) -> ProcessResult<Handle> {
        self.foster_parenting.set(true);
        let res = self.step(InsertionMode::InBody, token);
        self.foster_parenting.set(false);
        res
    }

    fn process_chars_in_table(&self, token: Token) -> ProcessResult<Handle> {
        declare_tag_set!(table_outer = Table Tbody Template Tfoot Thead Tr);
        if self.current_node_in(table_outer) {
            self.pending_table_text.borrow_mut().clear();
            self.orig_mode.set(Some(self.mode.get()));
            ProcessResult::Reprocess(InsertionMode::InTableText, token)
        } else {
            self.parse_error(ErrorCode::FosterParentedContent);
            self.foster_parent_in_body(token)
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#reset-the-insertion-mode-appropriately>
    fn reset_insertion_mode(&self) -> InsertionMode {
        let open_elems = self.open_elems.borrow();
        let context_elem = self.context_elem.borrow();
        for (i, mut node) in open_elems.iter().enumerate().rev() {
            let last = i == 0;
            if let (true, Some(ctx)) = (last, context_elem.as_ref()) {
                node = ctx;
            }
            if node.kind.ns != Namespace::Html {
                continue;
            }
            match node.kind.tag {
                TagId::Select => {
                    if !last {
                        for ancestor in open_elems.iter().take(i).rev() {
                            if ancestor.is_html(TagId::Template) {
                                break;
                            } else if ancestor.is_html(TagId::Table) {
                                return InsertionMode::InSelectInTable;
                            }
                        }
                    }
                    return InsertionMode::InSelect;
                },
                TagId::Td | TagId::Th => {
                    if !last {
                        return InsertionMode::InCell;
                    }
                },
                TagId::Tr => return InsertionMode::InRow,
                TagId::Tbody | TagId::Thead | TagId::Tfoot => return InsertionMode::InTableBody,
                TagId::Caption => return InsertionMode::InCaption,
                TagId::Colgroup => return InsertionMode::InColumnGroup,
                TagId::Table => return InsertionMode::InTable,
                TagId::Template => {
                    return self
                        .template_modes
                        .borrow()
                        .last()
                        .copied()
                        .unwrap_or(InsertionMode::InTemplate);
                },
                TagId::Head => {
                    if !last {
                        return InsertionMode::InHead;
                    }
                },
                TagId::Body => return InsertionMode::InBody,
                TagId::Frameset => return InsertionMode::InFrameset,
                TagId::Html => {
                    return match *self.head_elem.borrow() {
                        None => InsertionMode::BeforeHead,
                        Some(_) => InsertionMode::AfterHead,
                    };
                },
                _ => (),
            }
        }
        InsertionMode::InBody
    }

    fn close_the_cell(&self) {
        self.generate_implied_end_tags(cursory_implied_end);
        if self.pop_until(|elem| td_th(elem.kind)) != 1 {
            self.parse_error(ErrorCode::ClosingOfElementWithOpenChildElements);
        }
        self.clear_active_formatting_to_marker();
    }

    fn append_text(&self, text: StrTendril) -> ProcessResult<Handle> {
        let insertion_point = self.appropriate_place_for_insertion(None);
        self.insert_text_at(insertion_point, text);
        ProcessResult::Done
    }

    fn append_comment(&self, text: StrTendril) -> ProcessResult<Handle> {
        let comment = self.sink.create_comment(text);
        self.insert_appropriately(&comment, None);
        ProcessResult::Done
    }

    fn append_comment_to_doc(&self, text: StrTendril) -> ProcessResult<Handle> {
        let comment = self.sink.create_comment(text);
        self.sink.append_child(&self.doc_handle, &comment);
        ProcessResult::Done
    }

    fn append_comment_to_html(&self, text: StrTendril) -> ProcessResult<Handle> {
        let target = self.html_elem().unwrap_or_else(|| self.doc_handle.clone());
        let comment = self.sink.create_comment(text);
        self.sink.append_child(&target, &comment);
        ProcessResult::Done
    }

    /// Create an element, with its template contents for a `<template>`.
    fn create_element(&self, name: QualName, attrs: Vec<Attribute>) -> OpenElement<Handle> {
        let html_integration_point = is_html_integration_point(&name, &attrs);
        let (ns, local) = (name.ns, name.local.clone());
        let handle = self.sink.create_element(name, attrs);
        let elem = OpenElement::from_parts(handle, ns, local, html_integration_point);

        if elem.is_html(TagId::Template) {
            let contents = self.sink.create_document_fragment();
            self.sink.set_template_content(&elem.handle, &contents);
        }
        if self.opts.source_location_tracking {
            self.sink
                .set_source_location(&elem.handle, self.current_span.get().start);
        }
        elem
    }

    fn create_root(&self, attrs: Vec<Attribute>) {
        let elem = self.create_element(QualName::html("html"), attrs);
        self.sink.append_child(&self.doc_handle, &elem.handle);
        self.push(elem);
    }

    /// <https://html.spec.whatwg.org/multipage/#insert-a-foreign-element>
    fn insert_element(
        &self,
        push: PushFlag,
        ns: Namespace,
        name: LocalName,
        attrs: Vec<Attribute>,
    ) -> Handle {
        let elem = self.create_element(QualName::new(None, ns, name), attrs);
        let handle = elem.handle.clone();
        self.insert_appropriately(&handle, None);
        match push {
            PushFlag::Push => self.push(elem),
            PushFlag::NoPush => (),
        }
        handle
    }

    fn insert_element_for(&self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::Push, Namespace::Html, tag.name, tag.attrs)
    }

    fn insert_and_pop_element_for(&self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::NoPush, Namespace::Html, tag.name, tag.attrs)
    }

    fn insert_phantom(&self, tag: TagId) -> Handle {
        self.insert_element(
            PushFlag::Push,
            Namespace::Html,
            LocalName::from(tag.as_str()),
            vec![],
        )
    }

    fn create_formatting_element_for(&self, tag: Tag) -> Handle {
        // Noah's Ark: at most three identical entries after the last marker.
        let mut first_match = None;
        let mut matches = 0usize;
        {
            let active_formatting = self.active_formatting.borrow();
            for (i, entry) in active_formatting.iter().enumerate().rev() {
                match entry {
                    FormatEntry::Marker => break,
                    FormatEntry::Element(_, old_tag) => {
                        if tag.equiv_modulo_attr_order(old_tag) {
                            first_match = Some(i);
                            matches += 1;
                        }
                    },
                }
            }
        }

        if matches >= 3 {
            if let Some(first_match) = first_match {
                self.active_formatting.borrow_mut().remove(first_match);
            }
        }

        let elem = self.insert_element(
            PushFlag::Push,
            Namespace::Html,
            tag.name.clone(),
            tag.attrs.clone(),
        );
        self.active_formatting
            .borrow_mut()
            .push(FormatEntry::Element(elem.clone(), tag));
        elem
    }

    fn clear_active_formatting_to_marker(&self) {
        loop {
            match self.active_formatting.borrow_mut().pop() {
                None | Some(FormatEntry::Marker) => break,
                _ => (),
            }
        }
    }

    fn process_end_tag_in_body(&self, tag: Tag) {
        // Look back for a matching open element.
        let mut match_idx = None;
        for (i, elem) in self.open_elems.borrow().iter().enumerate().rev() {
            if elem.matches_tag(&tag) {
                match_idx = Some(i);
                break;
            }

            if special(elem.kind) {
                self.parse_error(ErrorCode::EndTagWithoutMatchingOpenElement);
                return;
            }
        }

        let Some(match_idx) = match_idx else {
            // The root <html> is special, so only an empty stack gets here.
            self.parse_error(ErrorCode::EndTagWithoutMatchingOpenElement);
            return;
        };

        self.generate_implied_end_except(tag.tag_id);

        if match_idx + 1 != self.open_elems.borrow().len() {
            // mis-nested tags
            self.unexpected_tag(&tag);
        }
        self.open_elems.borrow_mut().truncate(match_idx);
    }

    fn handle_misnested_a_tags(&self, tag: &Tag) {
        let Some((_, node, _)) = self.find_in_active_formatting(|t| t.tag_id == TagId::A) else {
            return;
        };

        self.unexpected_tag(tag);
        self.adoption_agency(TagId::A);
        if let Some(index) = self.position_in_active_formatting(&node) {
            self.active_formatting.borrow_mut().remove(index);
        }
        self.remove_from_stack(&node);
    }

    /// Should this token be handled by the rules for foreign content?
    fn is_foreign(&self, token: &Token) -> bool {
        if let Token::Eof = *token {
            return false;
        }

        let Some(current) = self.adjusted_current_node() else {
            return false;
        };
        if current.kind.ns == Namespace::Html {
            return false;
        }

        let is_text = token.is_text();
        let start_tag_id = match *token {
            Token::Tag(Tag {
                kind: StartTag,
                tag_id,
                ..
            }) => Some(tag_id),
            _ => None,
        };

        if mathml_text_integration_point(current.kind) {
            if is_text {
                return false;
            }
            if let Some(id) = start_tag_id {
                if !matches!(id, TagId::Mglyph | TagId::Malignmark) {
                    return false;
                }
            }
        }

        if current.kind
            == (ElemKind {
                ns: Namespace::MathMl,
                tag: TagId::AnnotationXml,
            })
            && start_tag_id == Some(TagId::Svg)
        {
            return false;
        }

        if current.html_integration_point && (is_text || start_tag_id.is_some()) {
            return false;
        }

        true
    }

    fn enter_foreign(&self, mut tag: Tag, ns: Namespace) -> ProcessResult<Handle> {
        match ns {
            Namespace::MathMl => foreign::adjust_mathml_attributes(&mut tag.attrs),
            Namespace::Svg => foreign::adjust_svg_attributes(&mut tag.attrs),
            _ => (),
        }
        foreign::adjust_foreign_attributes(&mut tag.attrs);

        if tag.self_closing {
            self.insert_element(PushFlag::NoPush, ns, tag.name, tag.attrs);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element(PushFlag::Push, ns, tag.name, tag.attrs);
            ProcessResult::Done
        }
    }

    fn foreign_start_tag(&self, mut tag: Tag) -> ProcessResult<Handle> {
        let current_ns = match self.adjusted_current_node() {
            Some(node) => node.kind.ns,
            None => Namespace::Html,
        };
        match current_ns {
            Namespace::MathMl => foreign::adjust_mathml_attributes(&mut tag.attrs),
            Namespace::Svg => {
                if let Some(name) = foreign::svg_tag_name(&tag.name) {
                    tag.name = LocalName::from(name);
                }
                foreign::adjust_svg_attributes(&mut tag.attrs);
            },
            _ => (),
        }
        foreign::adjust_foreign_attributes(&mut tag.attrs);

        if tag.self_closing {
            self.insert_element(PushFlag::NoPush, current_ns, tag.name, tag.attrs);
            ProcessResult::DoneAckSelfClosing
        } else {
            self.insert_element(PushFlag::Push, current_ns, tag.name, tag.attrs);
            ProcessResult::Done
        }
    }

    fn unexpected_start_tag_in_foreign_content(&self, tag: Tag) -> ProcessResult<Handle> {
        self.unexpected_tag(&tag);
        loop {
            let done = self.open_elems.borrow().current().map_or(true, |node| {
                node.kind.ns == Namespace::Html
                    || mathml_text_integration_point(node.kind)
                    || node.html_integration_point
            });
            if done {
                break;
            }
            self.pop();
        }
        self.step(self.mode.get(), Token::Tag(tag))
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::{ArenaDom, NodeData};
    use crate::driver::{parse_document, parse_fragment, ParseOpts};
    use crate::error::ErrorCode;
    use crate::interface::{QualName, TreeSink};

    fn parse(input: &str) -> ArenaDom {
        parse_document(ArenaDom::default(), ParseOpts::default()).one(input)
    }

    fn body_html(dom: &ArenaDom) -> String {
        let body = dom.find_element(dom.document(), "body").unwrap();
        dom.inner_html(body)
    }

    #[test]
    fn adoption_agency_clones_formatting_elements() {
        let dom = parse("<b>1<i>2<p>3</b>4</p>");
        assert_eq!(
            body_html(&dom),
            "<b>1<i>2</i></b><i><p><b>3</b>4</p></i>"
        );
        assert!(dom.errors().iter().any(|e| e.code == ErrorCode::AdoptionAgency13));
    }

    #[test]
    fn adoption_agency_handles_nested_blocks() {
        let dom = parse("<a>1<div>2<div>3</a>4</div>5</div>");
        assert_eq!(
            body_html(&dom),
            "<a>1</a><div><a>2</a><div><a>3</a>4</div>5</div>"
        );
    }

    #[test]
    fn text_is_foster_parented_before_the_table() {
        let dom = parse("<table>A<td>B</table>");
        assert_eq!(
            body_html(&dom),
            "A<table><tbody><tr><td>B</td></tr></tbody></table>"
        );
        assert!(dom
            .errors()
            .iter()
            .any(|e| e.code == ErrorCode::FosterParentedContent));
    }

    #[test]
    fn noahs_ark_keeps_three_copies() {
        let dom = parse("<p><b><b><b><b><p>x");
        assert_eq!(
            body_html(&dom),
            "<p><b><b><b><b></b></b></b></b></p><p><b><b><b>x</b></b></b></p>"
        );
    }

    #[test]
    fn svg_title_stays_foreign_and_div_breaks_out() {
        let dom = parse("<svg><title>x</title></svg><svg><div>y</div></svg>");
        let title = dom.find_element(dom.document(), "title").unwrap();
        assert_eq!(
            dom.get_namespace(&title),
            crate::interface::Namespace::Svg
        );
        assert_eq!(body_html(&dom), "<svg><title>x</title></svg><svg></svg><div>y</div>");
    }

    #[test]
    fn void_elements_acknowledge_the_solidus() {
        let dom = parse("<!DOCTYPE html><br/><br>x");
        assert_eq!(body_html(&dom), "<br><br>x");
        assert!(dom.errors().is_empty());
    }

    #[test]
    fn self_closing_div_is_reported() {
        let dom = parse("<!DOCTYPE html><div/>x");
        assert!(dom
            .errors()
            .iter()
            .any(|e| e.code == ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus));
        assert_eq!(body_html(&dom), "<div>x</div>");
    }

    #[test]
    fn missing_doctype_selects_quirks() {
        let dom = parse("<p>x");
        assert_eq!(dom.quirks_mode(), crate::interface::Quirks);
        assert_eq!(dom.errors()[0].code, ErrorCode::MissingDoctype);

        let dom = parse("<!DOCTYPE html><p>x");
        assert_eq!(dom.quirks_mode(), crate::interface::NoQuirks);
    }

    #[test]
    fn pre_drops_one_leading_newline() {
        let dom = parse("<pre>\n\nx</pre>");
        assert_eq!(body_html(&dom), "<pre>\n\nx</pre>");
        let pre = dom.find_element(dom.document(), "pre").unwrap();
        let text = dom.get_children(&pre)[0];
        let node = dom.node(text);
        match node.data {
            NodeData::Text(ref t) => assert_eq!(&**t, "\nx"),
            ref other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn template_contents_are_separate() {
        let dom = parse("<template><td>x</td></template>");
        let template = dom.find_element(dom.document(), "template").unwrap();
        assert!(dom.get_children(&template).is_empty());
        let contents = dom.get_template_content(&template);
        assert_eq!(dom.inner_html(contents), "<td>x</td>");
    }

    #[test]
    fn fragment_in_table_row_context() {
        let dom = ArenaDom::default();
        let context = dom.create_element(QualName::html("tr"), vec![]);
        let dom = parse_fragment(dom, ParseOpts::default(), context).one("<td>a<td>b");
        let html = dom.find_element(dom.document(), "html").unwrap();
        assert_eq!(dom.inner_html(html), "<td>a</td><td>b</td>");
    }

    #[test]
    fn fragment_in_title_context_is_text() {
        let dom = ArenaDom::default();
        let context = dom.create_element(QualName::html("title"), vec![]);
        let dom = parse_fragment(dom, ParseOpts::default(), context).one("<b>&amp;</b>");
        let html = dom.find_element(dom.document(), "html").unwrap();
        assert_eq!(dom.text_content(html), "<b>&</b>");
    }
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The tree builder rules, as a single, enormous nested match expression.

use super::stack::OpenElement;
use super::tag_sets::*;
use super::types::InsertionMode::*;
use super::types::ProcessResult::*;
use super::types::{FormatEntry, InsertionMode, ProcessResult, Token};
use super::TreeBuilder;

use crate::error::ErrorCode;
use crate::interface::{LocalName, Namespace, QualName, Quirks, TreeSink};
use crate::tag_id::TagId;
use crate::tokenizer::states::{Rawtext, Rcdata, ScriptData};
use crate::tokenizer::{EndTag, StartTag, Tag};

use log::warn;
use tendril::StrTendril;

/// Patterns over `Tag` by kind and `TagId`.
macro_rules! tag {
    (<>) => {
        Tag { kind: StartTag, .. }
    };
    (</>) => {
        Tag { kind: EndTag, .. }
    };
    (<$($id:ident)|+>) => {
        Tag {
            kind: StartTag,
            tag_id: $(TagId::$id)|+,
            ..
        }
    };
    (</$($id:ident)|+>) => {
        Tag {
            kind: EndTag,
            tag_id: $(TagId::$id)|+,
            ..
        }
    };
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Process a token according to the rules of one insertion mode.
    pub(super) fn step(&self, mode: InsertionMode, token: Token) -> ProcessResult<Handle> {
        self.debug_step(mode, &token);

        match mode {
            //§ the-initial-insertion-mode
            Initial => match token {
                Token::Whitespace(_) => Done,
                Token::Comment(text) => self.append_comment_to_doc(text),
                token => {
                    if !self.opts.iframe_srcdoc {
                        self.parse_error(ErrorCode::MissingDoctype);
                        self.set_quirks_mode(Quirks);
                    }
                    Reprocess(BeforeHtml, token)
                },
            },

            //§ the-before-html-insertion-mode
            BeforeHtml => match token {
                Token::Whitespace(_) => Done,
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag @ tag!(<Html>)) => {
                    self.create_root(tag.attrs);
                    self.mode.set(BeforeHead);
                    Done
                },

                Token::Tag(tag @ tag!(</>))
                    if !matches!(tag.tag_id, TagId::Head | TagId::Body | TagId::Html | TagId::Br) =>
                {
                    self.unexpected_tag(&tag)
                },

                token => {
                    self.create_root(vec![]);
                    Reprocess(BeforeHead, token)
                },
            },

            //§ the-before-head-insertion-mode
            BeforeHead => match token {
                Token::Whitespace(_) => Done,
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Head>)) => {
                    let head = self.insert_element_for(tag);
                    *self.head_elem.borrow_mut() = Some(head);
                    self.mode.set(InHead);
                    Done
                },

                Token::Tag(tag @ tag!(</>))
                    if !matches!(tag.tag_id, TagId::Head | TagId::Body | TagId::Html | TagId::Br) =>
                {
                    self.unexpected_tag(&tag)
                },

                token => {
                    let head = self.insert_phantom(TagId::Head);
                    *self.head_elem.borrow_mut() = Some(head);
                    Reprocess(InHead, token)
                },
            },

            //§ parsing-main-inhead
            InHead => match token {
                Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Base|Basefont|Bgsound|Link|Meta>)) => {
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(<Title>)) => self.parse_raw_data(tag, Rcdata),

                Token::Tag(tag @ tag!(<Noscript>)) if !self.opts.scripting_enabled => {
                    self.insert_element_for(tag);
                    self.mode.set(InHeadNoscript);
                    Done
                },

                Token::Tag(tag @ tag!(<Noframes|Style|Noscript>)) => {
                    self.parse_raw_data(tag, Rawtext)
                },

                Token::Tag(tag @ tag!(<Script>)) => {
                    let elem = self.create_element(QualName::html("script"), tag.attrs);
                    if self.is_fragment() {
                        self.sink.mark_script_already_started(&elem.handle);
                    }
                    self.insert_appropriately(&elem.handle, None);
                    self.push(elem);
                    self.to_raw_text_mode(ScriptData)
                },

                Token::Tag(tag!(</Head>)) => {
                    self.pop();
                    self.mode.set(AfterHead);
                    Done
                },

                Token::Tag(tag @ tag!(<Template>)) => {
                    self.insert_element_for(tag);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    self.frameset_ok.set(false);
                    self.mode.set(InTemplate);
                    self.template_modes.borrow_mut().push(InTemplate);
                    Done
                },

                Token::Tag(tag @ tag!(</Template>)) => {
                    if !self.in_html_elem_named(TagId::Template) {
                        self.unexpected_tag(&tag);
                    } else {
                        self.generate_implied_end_tags(thorough_implied_end);
                        self.expect_to_close(TagId::Template);
                        self.clear_active_formatting_to_marker();
                        self.template_modes.borrow_mut().pop();
                        self.mode.set(self.reset_insertion_mode());
                    }
                    Done
                },

                Token::Tag(tag!(<Head>)) => {
                    self.parse_error(ErrorCode::MisplacedStartTagForHeadElement);
                    Done
                },

                Token::Tag(tag @ tag!(</>))
                    if !matches!(tag.tag_id, TagId::Body | TagId::Html | TagId::Br) =>
                {
                    self.unexpected_tag(&tag)
                },

                token => {
                    self.pop();
                    Reprocess(AfterHead, token)
                },
            },

            //§ parsing-main-inheadnoscript
            InHeadNoscript => match token {
                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag!(</Noscript>)) => {
                    self.pop();
                    self.mode.set(InHead);
                    Done
                },

                token @ (Token::Whitespace(_)
                | Token::Comment(_)
                | Token::Tag(tag!(<Basefont|Bgsound|Link|Meta|Noframes|Style>))) => {
                    self.step(InHead, token)
                },

                Token::Tag(tag!(<Head>)) => {
                    self.parse_error(ErrorCode::MisplacedStartTagForHeadElement);
                    Done
                },

                Token::Tag(tag!(<Noscript>)) => {
                    self.parse_error(ErrorCode::NestedNoscriptInHead);
                    Done
                },

                Token::Tag(tag @ tag!(</>)) if tag.tag_id != TagId::Br => self.unexpected_tag(&tag),

                token => {
                    self.parse_error(ErrorCode::DisallowedContentInNoscriptInHead);
                    self.pop();
                    Reprocess(InHead, token)
                },
            },

            //§ the-after-head-insertion-mode
            AfterHead => match token {
                Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Body>)) => {
                    self.insert_element_for(tag);
                    self.frameset_ok.set(false);
                    self.mode.set(InBody);
                    Done
                },

                Token::Tag(tag @ tag!(<Frameset>)) => {
                    self.insert_element_for(tag);
                    self.mode.set(InFrameset);
                    Done
                },

                token @ Token::Tag(tag!(
                    <Base|Basefont|Bgsound|Link|Meta|Noframes|Script|Style|Template|Title>
                )) => {
                    self.parse_error(ErrorCode::AbandonedHeadElementChild);
                    let head = self.head_elem.borrow().clone();
                    let Some(head) = head else {
                        warn!("no head element pointer in AfterHead");
                        return self.step(InHead, token);
                    };
                    self.push(OpenElement::from_parts(
                        head.clone(),
                        Namespace::Html,
                        LocalName::from("head"),
                        false,
                    ));
                    let result = self.step(InHead, token);
                    self.remove_from_stack(&head);
                    result
                },

                token @ Token::Tag(tag!(</Template>)) => self.step(InHead, token),

                Token::Tag(tag!(<Head>)) => {
                    self.parse_error(ErrorCode::MisplacedStartTagForHeadElement);
                    Done
                },

                Token::Tag(tag @ tag!(</>))
                    if !matches!(tag.tag_id, TagId::Body | TagId::Html | TagId::Br) =>
                {
                    self.unexpected_tag(&tag)
                },

                token => {
                    self.insert_phantom(TagId::Body);
                    Reprocess(InBody, token)
                },
            },

            //§ parsing-main-inbody
            InBody => match token {
                Token::NullCharacter => self.unexpected(&token),

                Token::Whitespace(text) => {
                    self.reconstruct_active_formatting_elements();
                    self.append_text(text)
                },

                Token::Characters(text) => {
                    self.reconstruct_active_formatting_elements();
                    self.frameset_ok.set(false);
                    self.append_text(text)
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag @ tag!(<Html>)) => {
                    self.unexpected_tag(&tag);
                    if !self.in_html_elem_named(TagId::Template) {
                        if let Some(top) = self.html_elem() {
                            self.sink.add_attrs_if_missing(&top, tag.attrs);
                        }
                    }
                    Done
                },

                token @ Token::Tag(
                    tag!(<Base|Basefont|Bgsound|Link|Meta|Noframes|Script|Style|Template|Title>)
                    | tag!(</Template>),
                ) => self.step(InHead, token),

                Token::Tag(tag @ tag!(<Body>)) => {
                    self.unexpected_tag(&tag);
                    let body = self.body_elem();
                    match body {
                        Some(node)
                            if self.open_elems.borrow().len() != 1
                                && !self.in_html_elem_named(TagId::Template) =>
                        {
                            self.frameset_ok.set(false);
                            self.sink.add_attrs_if_missing(&node, tag.attrs);
                        },
                        _ => (),
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Frameset>)) => {
                    self.unexpected_tag(&tag);
                    if !self.frameset_ok.get() {
                        return Done;
                    }

                    let body = unwrap_or_return!(self.body_elem(), Done);
                    self.sink.detach(&body);

                    self.open_elems.borrow_mut().truncate(1);
                    self.insert_element_for(tag);
                    self.mode.set(InFrameset);
                    Done
                },

                Token::Eof => {
                    if !self.template_modes.borrow().is_empty() {
                        return self.step(InTemplate, Token::Eof);
                    }
                    self.check_body_end(ErrorCode::OpenElementsLeftAfterEof);
                    self.stop_parsing()
                },

                Token::Tag(tag @ tag!(</Body>)) => {
                    if !self.in_scope_named(default_scope, TagId::Body) {
                        return self.unexpected_tag(&tag);
                    }
                    if self.opts.exact_errors {
                        self.check_body_end(ErrorCode::ClosingOfElementWithOpenChildElements);
                    }
                    self.mode.set(AfterBody);
                    Done
                },

                Token::Tag(tag @ tag!(</Html>)) => {
                    if !self.in_scope_named(default_scope, TagId::Body) {
                        return self.unexpected_tag(&tag);
                    }
                    if self.opts.exact_errors {
                        self.check_body_end(ErrorCode::ClosingOfElementWithOpenChildElements);
                    }
                    Reprocess(AfterBody, Token::Tag(tag))
                },

                Token::Tag(
                    tag @ tag!(
                        <Address|Article|Aside|Blockquote|Center|Details|Dialog|Dir|Div|Dl
                        |Fieldset|Figcaption|Figure|Footer|Header|Hgroup|Main|Menu|Nav|Ol|P
                        |Search|Section|Summary|Ul>
                    ),
                ) => {
                    self.close_p_element_in_button_scope();
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<H1|H2|H3|H4|H5|H6>)) => {
                    self.close_p_element_in_button_scope();
                    if self.current_node_in(heading_tag) {
                        self.unexpected_tag(&tag);
                        self.pop();
                    }
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Pre|Listing>)) => {
                    self.close_p_element_in_button_scope();
                    self.insert_element_for(tag);
                    self.ignore_lf.set(true);
                    self.frameset_ok.set(false);
                    Done
                },

                Token::Tag(tag @ tag!(<Form>)) => {
                    let in_template = self.in_html_elem_named(TagId::Template);
                    if self.form_elem.borrow().is_some() && !in_template {
                        return self.unexpected_tag(&tag);
                    }
                    self.close_p_element_in_button_scope();
                    let elem = self.insert_element_for(tag);
                    if !in_template {
                        *self.form_elem.borrow_mut() = Some(elem);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Li|Dd|Dt>)) => {
                    declare_tag_set!(close_list = Li);
                    declare_tag_set!(close_defn = Dd Dt);
                    declare_tag_set!(extra_special = [special] - Address Div P);
                    let can_close = if tag.tag_id == TagId::Li {
                        close_list
                    } else {
                        close_defn
                    };

                    self.frameset_ok.set(false);

                    let mut to_close = None;
                    for node in self.open_elems.borrow().iter().rev() {
                        if can_close(node.kind) {
                            to_close = Some(node.kind.tag);
                            break;
                        }
                        if extra_special(node.kind) {
                            break;
                        }
                    }

                    if let Some(id) = to_close {
                        self.generate_implied_end_except(id);
                        self.expect_to_close(id);
                    }

                    self.close_p_element_in_button_scope();
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Plaintext>)) => {
                    self.close_p_element_in_button_scope();
                    self.insert_element_for(tag);
                    ToPlaintext
                },

                Token::Tag(tag @ tag!(<Button>)) => {
                    if self.in_scope_named(default_scope, TagId::Button) {
                        self.unexpected_tag(&tag);
                        self.generate_implied_end_tags(cursory_implied_end);
                        self.pop_until_named(TagId::Button);
                    }
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.frameset_ok.set(false);
                    Done
                },

                Token::Tag(
                    tag @ tag!(
                        </Address|Article|Aside|Blockquote|Button|Center|Details|Dialog|Dir|Div
                        |Dl|Fieldset|Figcaption|Figure|Footer|Header|Hgroup|Listing|Main|Menu
                        |Nav|Ol|Pre|Search|Section|Summary|Ul>
                    ),
                ) => {
                    if !self.in_scope_named(default_scope, tag.tag_id) {
                        self.unexpected_tag(&tag);
                    } else {
                        self.generate_implied_end_tags(cursory_implied_end);
                        self.expect_to_close(tag.tag_id);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(</Form>)) => {
                    if !self.in_html_elem_named(TagId::Template) {
                        let node = self.form_elem.take();
                        let Some(node) = node else {
                            return self.unexpected_tag(&tag);
                        };
                        if !self.in_scope(default_scope, |n| self.sink.same_node(&node, &n.handle)) {
                            return self.unexpected_tag(&tag);
                        }
                        self.generate_implied_end_tags(cursory_implied_end);
                        let current_is_form = self.current_node_is(&node);
                        self.remove_from_stack(&node);
                        if !current_is_form {
                            self.parse_error(ErrorCode::ClosingOfElementWithOpenChildElements);
                        }
                    } else {
                        if !self.in_scope_named(default_scope, TagId::Form) {
                            return self.unexpected_tag(&tag);
                        }
                        self.generate_implied_end_tags(cursory_implied_end);
                        self.expect_to_close(TagId::Form);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(</P>)) => {
                    if !self.in_scope_named(button_scope, TagId::P) {
                        self.unexpected_tag(&tag);
                        self.insert_phantom(TagId::P);
                    }
                    self.close_p_element();
                    Done
                },

                Token::Tag(tag @ tag!(</Li|Dd|Dt>)) => {
                    let in_scope = if tag.tag_id == TagId::Li {
                        self.in_scope_named(list_item_scope, TagId::Li)
                    } else {
                        self.in_scope_named(default_scope, tag.tag_id)
                    };
                    if in_scope {
                        self.generate_implied_end_except(tag.tag_id);
                        self.expect_to_close(tag.tag_id);
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(</H1|H2|H3|H4|H5|H6>)) => {
                    if self.in_scope(default_scope, |n| heading_tag(n.kind)) {
                        self.generate_implied_end_tags(cursory_implied_end);
                        if !self.current_node_named(tag.tag_id) {
                            self.parse_error(ErrorCode::ClosingOfElementWithOpenChildElements);
                        }
                        self.pop_until(|n| heading_tag(n.kind));
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<A>)) => {
                    self.handle_misnested_a_tags(&tag);
                    self.reconstruct_active_formatting_elements();
                    self.create_formatting_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<B|Big|Code|Em|Font|I|S|Small|Strike|Strong|Tt|U>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.create_formatting_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Nobr>)) => {
                    self.reconstruct_active_formatting_elements();
                    if self.in_scope_named(default_scope, TagId::Nobr) {
                        self.unexpected_tag(&tag);
                        self.adoption_agency(TagId::Nobr);
                        self.reconstruct_active_formatting_elements();
                    }
                    self.create_formatting_element_for(tag);
                    Done
                },

                Token::Tag(
                    tag @ tag!(</A|B|Big|Code|Em|Font|I|Nobr|S|Small|Strike|Strong|Tt|U>),
                ) => {
                    self.adoption_agency(tag.tag_id);
                    Done
                },

                Token::Tag(tag @ tag!(<Applet|Marquee|Object>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    self.frameset_ok.set(false);
                    Done
                },

                Token::Tag(tag @ tag!(</Applet|Marquee|Object>)) => {
                    if !self.in_scope_named(default_scope, tag.tag_id) {
                        self.unexpected_tag(&tag);
                    } else {
                        self.generate_implied_end_tags(cursory_implied_end);
                        self.expect_to_close(tag.tag_id);
                        self.clear_active_formatting_to_marker();
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Table>)) => {
                    if self.quirks_mode.get() != Quirks {
                        self.close_p_element_in_button_scope();
                    }
                    self.insert_element_for(tag);
                    self.frameset_ok.set(false);
                    self.mode.set(InTable);
                    Done
                },

                Token::Tag(tag @ tag!(</Br>)) => {
                    self.unexpected_tag(&tag);
                    self.step(
                        InBody,
                        Token::Tag(Tag {
                            kind: StartTag,
                            attrs: vec![],
                            ..tag
                        }),
                    )
                },

                Token::Tag(tag @ tag!(<Area|Br|Embed|Img|Keygen|Wbr|Input>)) => {
                    let keep_frameset_ok = tag.tag_id == TagId::Input && self.is_type_hidden(&tag);
                    self.reconstruct_active_formatting_elements();
                    self.insert_and_pop_element_for(tag);
                    if !keep_frameset_ok {
                        self.frameset_ok.set(false);
                    }
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(<Param|Source|Track>)) => {
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(<Hr>)) => {
                    self.close_p_element_in_button_scope();
                    self.insert_and_pop_element_for(tag);
                    self.frameset_ok.set(false);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(<Image>)) => {
                    self.unexpected_tag(&tag);
                    self.step(
                        InBody,
                        Token::Tag(Tag {
                            name: LocalName::from("img"),
                            tag_id: TagId::Img,
                            ..tag
                        }),
                    )
                },

                Token::Tag(tag @ tag!(<Textarea>)) => {
                    self.ignore_lf.set(true);
                    self.frameset_ok.set(false);
                    self.parse_raw_data(tag, Rcdata)
                },

                Token::Tag(tag @ tag!(<Xmp>)) => {
                    self.close_p_element_in_button_scope();
                    self.reconstruct_active_formatting_elements();
                    self.frameset_ok.set(false);
                    self.parse_raw_data(tag, Rawtext)
                },

                Token::Tag(tag @ tag!(<Iframe>)) => {
                    self.frameset_ok.set(false);
                    self.parse_raw_data(tag, Rawtext)
                },

                Token::Tag(tag @ tag!(<Noembed>)) => self.parse_raw_data(tag, Rawtext),

                Token::Tag(tag @ tag!(<Noscript>)) if self.opts.scripting_enabled => {
                    self.parse_raw_data(tag, Rawtext)
                },

                Token::Tag(tag @ tag!(<Select>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    self.frameset_ok.set(false);
                    self.mode.set(if self.mode.get().is_table_context() {
                        InSelectInTable
                    } else {
                        InSelect
                    });
                    Done
                },

                Token::Tag(tag @ tag!(<Optgroup|Option>)) => {
                    if self.current_node_named(TagId::Option) {
                        self.pop();
                    }
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Rb|Rtc>)) => {
                    if self.in_scope_named(default_scope, TagId::Ruby) {
                        self.generate_implied_end_tags(cursory_implied_end);
                    }
                    if !self.current_node_named(TagId::Ruby) {
                        self.unexpected_tag(&tag);
                    }
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Rp|Rt>)) => {
                    if self.in_scope_named(default_scope, TagId::Ruby) {
                        self.generate_implied_end_except(TagId::Rtc);
                    }
                    if !self.current_node_named(TagId::Rtc) && !self.current_node_named(TagId::Ruby) {
                        self.unexpected_tag(&tag);
                    }
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Math>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.enter_foreign(tag, Namespace::MathMl)
                },

                Token::Tag(tag @ tag!(<Svg>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.enter_foreign(tag, Namespace::Svg)
                },

                Token::Tag(tag!(<Head>)) => {
                    self.parse_error(ErrorCode::MisplacedStartTagForHeadElement);
                    Done
                },

                Token::Tag(
                    tag @ tag!(<Caption|Col|Colgroup|Frame|Tbody|Td|Tfoot|Th|Thead|Tr>),
                ) => self.unexpected_tag(&tag),

                Token::Tag(tag @ tag!(<>)) => {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(</>)) => {
                    self.process_end_tag_in_body(tag);
                    Done
                },
            },

            //§ parsing-main-incdata
            Text => match token {
                Token::Characters(text) | Token::Whitespace(text) => self.append_text(text),

                Token::Eof => {
                    self.parse_error(ErrorCode::EofInElementThatCanContainOnlyText);
                    if let Some(current) = self.current_node() {
                        if current.is_html(TagId::Script) {
                            self.sink.mark_script_already_started(&current.handle);
                        }
                    }
                    self.pop();
                    Reprocess(self.orig_mode.take().unwrap_or(InBody), Token::Eof)
                },

                Token::Tag(tag @ tag!(</>)) => {
                    let node = self.pop();
                    self.mode.set(self.orig_mode.take().unwrap_or(InBody));
                    match node {
                        Some(node) if tag.tag_id == TagId::Script && node.is_html(TagId::Script) => {
                            Script(node.handle)
                        },
                        _ => Done,
                    }
                },

                // Raw text states only produce text and end tags.
                token => {
                    warn!("unexpected {:?} in Text insertion mode", token);
                    Done
                },
            },

            //§ parsing-main-intable
            InTable => match token {
                token @ (Token::NullCharacter | Token::Characters(_) | Token::Whitespace(_)) => {
                    self.process_chars_in_table(token)
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag @ tag!(<Caption>)) => {
                    self.pop_until_current(table_scope);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    self.insert_element_for(tag);
                    self.mode.set(InCaption);
                    Done
                },

                Token::Tag(tag @ tag!(<Colgroup>)) => {
                    self.pop_until_current(table_scope);
                    self.insert_element_for(tag);
                    self.mode.set(InColumnGroup);
                    Done
                },

                token @ Token::Tag(tag!(<Col>)) => {
                    self.pop_until_current(table_scope);
                    self.insert_phantom(TagId::Colgroup);
                    Reprocess(InColumnGroup, token)
                },

                Token::Tag(tag @ tag!(<Tbody|Tfoot|Thead>)) => {
                    self.pop_until_current(table_scope);
                    self.insert_element_for(tag);
                    self.mode.set(InTableBody);
                    Done
                },

                token @ Token::Tag(tag!(<Td|Th|Tr>)) => {
                    self.pop_until_current(table_scope);
                    self.insert_phantom(TagId::Tbody);
                    Reprocess(InTableBody, token)
                },

                Token::Tag(tag @ tag!(<Table>)) => {
                    self.unexpected_tag(&tag);
                    if self.in_scope_named(table_scope, TagId::Table) {
                        self.pop_until_named(TagId::Table);
                        Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                    } else {
                        Done
                    }
                },

                Token::Tag(tag @ tag!(</Table>)) => {
                    if self.in_scope_named(table_scope, TagId::Table) {
                        self.pop_until_named(TagId::Table);
                        self.mode.set(self.reset_insertion_mode());
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(
                    tag @ tag!(</Body|Caption|Col|Colgroup|Html|Tbody|Td|Tfoot|Th|Thead|Tr>),
                ) => self.unexpected_tag(&tag),

                token @ Token::Tag(tag!(<Style|Script|Template>) | tag!(</Template>)) => {
                    self.step(InHead, token)
                },

                Token::Tag(tag @ tag!(<Input>)) if self.is_type_hidden(&tag) => {
                    self.unexpected_tag(&tag);
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(<Form>)) => {
                    self.unexpected_tag(&tag);
                    if !self.in_html_elem_named(TagId::Template) && self.form_elem.borrow().is_none() {
                        let form = self.insert_and_pop_element_for(tag);
                        *self.form_elem.borrow_mut() = Some(form);
                    }
                    Done
                },

                token @ Token::Eof => self.step(InBody, token),

                token => {
                    self.parse_error(ErrorCode::FosterParentedContent);
                    self.foster_parent_in_body(token)
                },
            },

            //§ parsing-main-intabletext
            InTableText => match token {
                Token::NullCharacter => self.unexpected(&token),

                token @ (Token::Characters(_) | Token::Whitespace(_)) => {
                    self.pending_table_text.borrow_mut().push(token);
                    Done
                },

                token => {
                    let pending = self.pending_table_text.take();
                    let contains_nonspace = pending.iter().any(|t| matches!(t, Token::Characters(_)));

                    if contains_nonspace {
                        self.parse_error(ErrorCode::FosterParentedContent);
                        for text in pending {
                            if !matches!(self.foster_parent_in_body(text), Done) {
                                warn!("foster parenting table text changed the insertion mode");
                            }
                        }
                    } else {
                        for text in pending {
                            if let Token::Whitespace(text) = text {
                                self.append_text(text);
                            }
                        }
                    }

                    Reprocess(self.orig_mode.take().unwrap_or(InTable), token)
                },
            },

            //§ parsing-main-incaption
            InCaption => match token {
                Token::Tag(
                    tag @ (tag!(<Caption|Col|Colgroup|Tbody|Td|Tfoot|Th|Thead|Tr>)
                    | tag!(</Table|Caption>)),
                ) => {
                    if !self.in_scope_named(table_scope, TagId::Caption) {
                        return self.unexpected_tag(&tag);
                    }
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.expect_to_close(TagId::Caption);
                    self.clear_active_formatting_to_marker();
                    match tag {
                        tag!(</Caption>) => {
                            self.mode.set(InTable);
                            Done
                        },
                        tag => Reprocess(InTable, Token::Tag(tag)),
                    }
                },

                Token::Tag(
                    tag @ tag!(</Body|Col|Colgroup|Html|Tbody|Td|Tfoot|Th|Thead|Tr>),
                ) => self.unexpected_tag(&tag),

                token => self.step(InBody, token),
            },

            //§ parsing-main-incolgroup
            InColumnGroup => match token {
                Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Col>)) => {
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(</Colgroup>)) => {
                    if self.current_node_named(TagId::Colgroup) {
                        self.pop();
                        self.mode.set(InTable);
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(</Col>)) => self.unexpected_tag(&tag),

                token @ Token::Tag(tag!(<Template>) | tag!(</Template>)) => {
                    self.step(InHead, token)
                },

                token @ Token::Eof => self.step(InBody, token),

                token => {
                    if self.current_node_named(TagId::Colgroup) {
                        self.pop();
                        Reprocess(InTable, token)
                    } else {
                        self.unexpected(&token)
                    }
                },
            },

            //§ parsing-main-intbody
            InTableBody => match token {
                Token::Tag(tag @ tag!(<Tr>)) => {
                    self.pop_until_current(table_body_context);
                    self.insert_element_for(tag);
                    self.mode.set(InRow);
                    Done
                },

                Token::Tag(tag @ tag!(<Th|Td>)) => {
                    self.unexpected_tag(&tag);
                    self.pop_until_current(table_body_context);
                    self.insert_phantom(TagId::Tr);
                    Reprocess(InRow, Token::Tag(tag))
                },

                Token::Tag(tag @ tag!(</Tbody|Tfoot|Thead>)) => {
                    if self.in_scope_named(table_scope, tag.tag_id) {
                        self.pop_until_current(table_body_context);
                        self.pop();
                        self.mode.set(InTable);
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(
                    tag @ (tag!(<Caption|Col|Colgroup|Tbody|Tfoot|Thead>) | tag!(</Table>)),
                ) => {
                    declare_tag_set!(table_outer = Tbody Tfoot Thead);
                    if self.in_scope(table_scope, |e| table_outer(e.kind)) {
                        self.pop_until_current(table_body_context);
                        self.pop();
                        Reprocess(InTable, Token::Tag(tag))
                    } else {
                        self.unexpected_tag(&tag)
                    }
                },

                Token::Tag(tag @ tag!(</Body|Caption|Col|Colgroup|Html|Td|Th|Tr>)) => {
                    self.unexpected_tag(&tag)
                },

                token => self.step(InTable, token),
            },

            //§ parsing-main-intr
            InRow => match token {
                Token::Tag(tag @ tag!(<Th|Td>)) => {
                    self.pop_until_current(table_row_context);
                    self.insert_element_for(tag);
                    self.mode.set(InCell);
                    self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                    Done
                },

                Token::Tag(tag @ tag!(</Tr>)) => {
                    if self.in_scope_named(table_scope, TagId::Tr) {
                        self.pop_until_current(table_row_context);
                        self.pop();
                        self.mode.set(InTableBody);
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(
                    tag @ (tag!(<Caption|Col|Colgroup|Tbody|Tfoot|Thead|Tr>) | tag!(</Table>)),
                ) => {
                    if self.in_scope_named(table_scope, TagId::Tr) {
                        self.pop_until_current(table_row_context);
                        self.pop();
                        Reprocess(InTableBody, Token::Tag(tag))
                    } else {
                        self.unexpected_tag(&tag)
                    }
                },

                Token::Tag(tag @ tag!(</Tbody|Tfoot|Thead>)) => {
                    if !self.in_scope_named(table_scope, tag.tag_id) {
                        return self.unexpected_tag(&tag);
                    }
                    if !self.in_scope_named(table_scope, TagId::Tr) {
                        return Done;
                    }
                    self.pop_until_current(table_row_context);
                    self.pop();
                    Reprocess(InTableBody, Token::Tag(tag))
                },

                Token::Tag(tag @ tag!(</Body|Caption|Col|Colgroup|Html|Td|Th>)) => {
                    self.unexpected_tag(&tag)
                },

                token => self.step(InTable, token),
            },

            //§ parsing-main-intd
            InCell => match token {
                Token::Tag(tag @ tag!(</Td|Th>)) => {
                    if self.in_scope_named(table_scope, tag.tag_id) {
                        self.generate_implied_end_tags(cursory_implied_end);
                        self.expect_to_close(tag.tag_id);
                        self.clear_active_formatting_to_marker();
                        self.mode.set(InRow);
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Caption|Col|Colgroup|Tbody|Td|Tfoot|Th|Thead|Tr>)) => {
                    if self.in_scope(table_scope, |n| td_th(n.kind)) {
                        self.close_the_cell();
                        Reprocess(InRow, Token::Tag(tag))
                    } else {
                        self.unexpected_tag(&tag)
                    }
                },

                Token::Tag(tag @ tag!(</Body|Caption|Col|Colgroup|Html>)) => {
                    self.unexpected_tag(&tag)
                },

                Token::Tag(tag @ tag!(</Table|Tbody|Tfoot|Thead|Tr>)) => {
                    if self.in_scope_named(table_scope, tag.tag_id) {
                        self.close_the_cell();
                        Reprocess(InRow, Token::Tag(tag))
                    } else {
                        self.unexpected_tag(&tag)
                    }
                },

                token => self.step(InBody, token),
            },

            //§ parsing-main-inselect
            InSelect => match token {
                Token::NullCharacter => self.unexpected(&token),
                Token::Characters(text) | Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Option>)) => {
                    if self.current_node_named(TagId::Option) {
                        self.pop();
                    }
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Optgroup>)) => {
                    if self.current_node_named(TagId::Option) {
                        self.pop();
                    }
                    if self.current_node_named(TagId::Optgroup) {
                        self.pop();
                    }
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(<Hr>)) => {
                    if self.current_node_named(TagId::Option) {
                        self.pop();
                    }
                    if self.current_node_named(TagId::Optgroup) {
                        self.pop();
                    }
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                Token::Tag(tag @ tag!(</Optgroup>)) => {
                    let option_in_optgroup = {
                        let open_elems = self.open_elems.borrow();
                        let len = open_elems.len();
                        len >= 2
                            && open_elems.get(len - 1).map_or(false, |e| e.is_html(TagId::Option))
                            && open_elems.get(len - 2).map_or(false, |e| e.is_html(TagId::Optgroup))
                    };
                    if option_in_optgroup {
                        self.pop();
                    }
                    if self.current_node_named(TagId::Optgroup) {
                        self.pop();
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ tag!(</Option>)) => {
                    if self.current_node_named(TagId::Option) {
                        self.pop();
                    } else {
                        self.unexpected_tag(&tag);
                    }
                    Done
                },

                Token::Tag(tag @ (tag!(<Select>) | tag!(</Select>))) => {
                    let in_scope = self.in_scope_named(select_scope, TagId::Select);

                    if !in_scope || tag.kind == StartTag {
                        self.unexpected_tag(&tag);
                    }

                    if in_scope {
                        self.pop_until_named(TagId::Select);
                        self.mode.set(self.reset_insertion_mode());
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Input|Keygen|Textarea>)) => {
                    self.unexpected_tag(&tag);
                    if self.in_scope_named(select_scope, TagId::Select) {
                        self.pop_until_named(TagId::Select);
                        Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                    } else {
                        Done
                    }
                },

                token @ Token::Tag(tag!(<Script|Template>) | tag!(</Template>)) => {
                    self.step(InHead, token)
                },

                token @ Token::Eof => self.step(InBody, token),

                token => self.unexpected(&token),
            },

            //§ parsing-main-inselectintable
            InSelectInTable => match token {
                Token::Tag(tag @ tag!(<Caption|Table|Tbody|Tfoot|Thead|Tr|Td|Th>)) => {
                    self.unexpected_tag(&tag);
                    self.pop_until_named(TagId::Select);
                    Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                },

                Token::Tag(tag @ tag!(</Caption|Table|Tbody|Tfoot|Thead|Tr|Td|Th>)) => {
                    self.unexpected_tag(&tag);
                    if self.in_scope_named(table_scope, tag.tag_id) {
                        self.pop_until_named(TagId::Select);
                        Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                    } else {
                        Done
                    }
                },

                token => self.step(InSelect, token),
            },

            //§ parsing-main-intemplate
            InTemplate => match token {
                token @ (Token::Characters(_)
                | Token::Whitespace(_)
                | Token::NullCharacter
                | Token::Comment(_)) => self.step(InBody, token),

                token @ Token::Tag(
                    tag!(<Base|Basefont|Bgsound|Link|Meta|Noframes|Script|Style|Template|Title>)
                    | tag!(</Template>),
                ) => self.step(InHead, token),

                token @ Token::Tag(tag!(<Caption|Colgroup|Tbody|Tfoot|Thead>)) => {
                    self.switch_template_mode(InTable);
                    Reprocess(InTable, token)
                },

                token @ Token::Tag(tag!(<Col>)) => {
                    self.switch_template_mode(InColumnGroup);
                    Reprocess(InColumnGroup, token)
                },

                token @ Token::Tag(tag!(<Tr>)) => {
                    self.switch_template_mode(InTableBody);
                    Reprocess(InTableBody, token)
                },

                token @ Token::Tag(tag!(<Td|Th>)) => {
                    self.switch_template_mode(InRow);
                    Reprocess(InRow, token)
                },

                Token::Eof => {
                    if !self.in_html_elem_named(TagId::Template) {
                        return self.stop_parsing();
                    }
                    self.parse_error(ErrorCode::OpenElementsLeftAfterEof);
                    self.pop_until_named(TagId::Template);
                    self.clear_active_formatting_to_marker();
                    self.template_modes.borrow_mut().pop();
                    Reprocess(self.reset_insertion_mode(), Token::Eof)
                },

                token @ Token::Tag(tag!(<>)) => {
                    self.switch_template_mode(InBody);
                    Reprocess(InBody, token)
                },

                Token::Tag(tag @ tag!(</>)) => self.unexpected_tag(&tag),
            },

            //§ parsing-main-afterbody
            AfterBody => match token {
                token @ (Token::Whitespace(_) | Token::Tag(tag!(<Html>))) => {
                    self.step(InBody, token)
                },
                Token::Comment(text) => self.append_comment_to_html(text),

                Token::Tag(tag @ tag!(</Html>)) => {
                    if self.is_fragment() {
                        self.unexpected_tag(&tag);
                    } else {
                        self.mode.set(AfterAfterBody);
                    }
                    Done
                },

                Token::Eof => self.stop_parsing(),

                token => {
                    self.unexpected(&token);
                    Reprocess(InBody, token)
                },
            },

            //§ parsing-main-inframeset
            InFrameset => match token {
                Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag @ tag!(<Frameset>)) => {
                    self.insert_element_for(tag);
                    Done
                },

                Token::Tag(tag @ tag!(</Frameset>)) => {
                    if self.open_elems.borrow().len() == 1 {
                        self.unexpected_tag(&tag);
                    } else {
                        self.pop();
                        if !self.is_fragment() && !self.current_node_named(TagId::Frameset) {
                            self.mode.set(AfterFrameset);
                        }
                    }
                    Done
                },

                Token::Tag(tag @ tag!(<Frame>)) => {
                    self.insert_and_pop_element_for(tag);
                    DoneAckSelfClosing
                },

                token @ Token::Tag(tag!(<Noframes>)) => self.step(InHead, token),

                Token::Eof => {
                    if self.open_elems.borrow().len() != 1 {
                        self.unexpected(&Token::Eof);
                    }
                    self.stop_parsing()
                },

                token => self.unexpected(&token),
            },

            //§ parsing-main-afterframeset
            AfterFrameset => match token {
                Token::Whitespace(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                token @ Token::Tag(tag!(<Html>)) => self.step(InBody, token),

                Token::Tag(tag!(</Html>)) => {
                    self.mode.set(AfterAfterFrameset);
                    Done
                },

                token @ Token::Tag(tag!(<Noframes>)) => self.step(InHead, token),

                Token::Eof => self.stop_parsing(),

                token => self.unexpected(&token),
            },

            //§ the-after-after-body-insertion-mode
            AfterAfterBody => match token {
                Token::Comment(text) => self.append_comment_to_doc(text),

                token @ (Token::Whitespace(_) | Token::Tag(tag!(<Html>))) => {
                    self.step(InBody, token)
                },

                Token::Eof => self.stop_parsing(),

                token => {
                    self.unexpected(&token);
                    Reprocess(InBody, token)
                },
            },

            //§ the-after-after-frameset-insertion-mode
            AfterAfterFrameset => match token {
                Token::Comment(text) => self.append_comment_to_doc(text),

                token @ (Token::Whitespace(_) | Token::Tag(tag!(<Html>))) => {
                    self.step(InBody, token)
                },

                Token::Eof => self.stop_parsing(),

                token @ Token::Tag(tag!(<Noframes>)) => self.step(InHead, token),

                token => self.unexpected(&token),
            },
            //§ END
        }
    }

    fn switch_template_mode(&self, mode: InsertionMode) {
        let mut template_modes = self.template_modes.borrow_mut();
        template_modes.pop();
        template_modes.push(mode);
    }

    /// The rules for parsing tokens in foreign content.
    pub(super) fn step_foreign(&self, token: Token) -> ProcessResult<Handle> {
        match token {
            Token::NullCharacter => {
                self.unexpected(&token);
                self.append_text(StrTendril::from_char('\u{fffd}'))
            },

            Token::Whitespace(text) => self.append_text(text),

            Token::Characters(text) => {
                self.frameset_ok.set(false);
                self.append_text(text)
            },

            Token::Comment(text) => self.append_comment(text),

            Token::Tag(
                tag @ (tag!(
                    <B|Big|Blockquote|Body|Br|Center|Code|Dd|Div|Dl|Dt|Em|Embed|H1|H2|H3|H4|H5|H6
                    |Head|Hr|I|Img|Li|Listing|Menu|Meta|Nobr|Ol|P|Pre|Ruby|S|Small|Span|Strong
                    |Strike|Sub|Sup|Table|Tt|U|Ul|Var>
                )
                | tag!(</Br|P>)),
            ) => self.unexpected_start_tag_in_foreign_content(tag),

            Token::Tag(tag @ tag!(<Font>)) => {
                let presentational = ["color", "face", "size"]
                    .iter()
                    .any(|name| tag.get_attribute(name).is_some());
                if presentational {
                    self.unexpected_start_tag_in_foreign_content(tag)
                } else {
                    self.foreign_start_tag(tag)
                }
            },

            Token::Tag(tag @ tag!(<>)) => self.foreign_start_tag(tag),

            Token::Tag(tag @ tag!(</>)) => {
                let len = self.open_elems.borrow().len();
                for index in (0..len).rev() {
                    let node = self.open_elems.borrow().get(index).cloned();
                    let Some(node) = node else {
                        break;
                    };

                    if node.kind.ns == Namespace::Html {
                        return self.step(self.mode.get(), Token::Tag(tag));
                    }

                    if node.local.eq_ignore_ascii_case(&tag.name) {
                        self.open_elems.borrow_mut().truncate(index);
                        return Done;
                    }

                    if index + 1 == len {
                        self.unexpected_tag(&tag);
                    }
                }
                Done
            },

            // Never foreign; see is_foreign.
            token @ Token::Eof => self.step(self.mode.get(), token),
        }
    }
}

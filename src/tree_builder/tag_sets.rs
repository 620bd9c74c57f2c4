// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Various sets of HTML tag names, and macros for declaring them.
//!
//! Sets are predicates over `ElemKind`, so membership is a match on the
//! namespace and `TagId` with no string comparison.

use crate::interface::Namespace;
use crate::tag_id::TagId;

/// The namespace and tag id of an open element.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct ElemKind {
    pub(crate) ns: Namespace,
    pub(crate) tag: TagId,
}

impl ElemKind {
    pub(crate) fn html(tag: TagId) -> ElemKind {
        ElemKind {
            ns: Namespace::Html,
            tag,
        }
    }
}

macro_rules! declare_tag_set_impl ( ($param:ident, $b:ident, $supr:ident, $($tag:ident)+) => (
    match $param {
        $crate::tree_builder::tag_sets::ElemKind {
            ns: $crate::interface::Namespace::Html,
            tag: $( $crate::tag_id::TagId::$tag )|+,
        } => $b,
        p => $supr(p),
    }
));

macro_rules! declare_tag_set_body (
    ($param:ident = [$supr:ident] - $($tag:ident)+)
        => ( declare_tag_set_impl!($param, false, $supr, $($tag)+) );

    ($param:ident = [$supr:ident] + $($tag:ident)+)
        => ( declare_tag_set_impl!($param, true, $supr, $($tag)+) );

    ($param:ident = $($tag:ident)+)
        => ( declare_tag_set_impl!($param, true, empty_set, $($tag)+) );
);

macro_rules! declare_tag_set (
    (pub $name:ident = $($toks:tt)+) => (
        pub(crate) fn $name(p: $crate::tree_builder::tag_sets::ElemKind) -> bool {
            declare_tag_set_body!(p = $($toks)+)
        }
    );

    ($name:ident = $($toks:tt)+) => (
        fn $name(p: $crate::tree_builder::tag_sets::ElemKind) -> bool {
            declare_tag_set_body!(p = $($toks)+)
        }
    );
);

#[inline(always)]
pub(crate) fn empty_set(_: ElemKind) -> bool {
    false
}

#[inline(always)]
pub(crate) fn full_set(_: ElemKind) -> bool {
    true
}

declare_tag_set!(pub html_default_scope =
    Applet Caption Html Table Td Th Marquee Object Template);

#[inline(always)]
pub(crate) fn default_scope(name: ElemKind) -> bool {
    html_default_scope(name)
        || mathml_text_integration_point(name)
        || svg_html_integration_point(name)
        || name
            == (ElemKind {
                ns: Namespace::MathMl,
                tag: TagId::AnnotationXml,
            })
}

declare_tag_set!(pub list_item_scope = [default_scope] + Ol Ul);
declare_tag_set!(pub button_scope = [default_scope] + Button);
declare_tag_set!(pub table_scope = Html Table Template);
declare_tag_set!(pub select_scope = [full_set] - Optgroup Option);

declare_tag_set!(pub table_body_context = Tbody Tfoot Thead Template Html);
declare_tag_set!(pub table_row_context = Tr Template Html);
declare_tag_set!(pub td_th = Td Th);

declare_tag_set!(pub cursory_implied_end =
    Dd Dt Li Option Optgroup P Rb Rp Rt Rtc);

declare_tag_set!(pub thorough_implied_end = [cursory_implied_end]
    + Caption Colgroup Tbody Td Tfoot Th Thead Tr);

declare_tag_set!(pub heading_tag = H1 H2 H3 H4 H5 H6);

declare_tag_set!(pub special_tag =
    Address Applet Area Article Aside Base Basefont Bgsound Blockquote Body
    Br Button Caption Center Col Colgroup Dd Details Dir Div Dl Dt Embed
    Fieldset Figcaption Figure Footer Form Frame Frameset H1 H2 H3 H4 H5 H6
    Head Header Hgroup Hr Html Iframe Img Input Keygen Li Link Listing Main
    Marquee Menu Meta Nav Noembed Noframes Noscript Object Ol P Param
    Plaintext Pre Script Search Section Select Source Style Summary Table
    Tbody Td Template Textarea Tfoot Th Thead Title Tr Track Ul Wbr Xmp);

pub(crate) fn special(name: ElemKind) -> bool {
    special_tag(name)
        || mathml_text_integration_point(name)
        || svg_html_integration_point(name)
        || name
            == (ElemKind {
                ns: Namespace::MathMl,
                tag: TagId::AnnotationXml,
            })
}

pub(crate) fn mathml_text_integration_point(p: ElemKind) -> bool {
    matches!(
        p,
        ElemKind {
            ns: Namespace::MathMl,
            tag: TagId::Mi | TagId::Mo | TagId::Mn | TagId::Ms | TagId::Mtext,
        }
    )
}

/// <https://html.spec.whatwg.org/multipage/#html-integration-point>
pub(crate) fn svg_html_integration_point(p: ElemKind) -> bool {
    // annotation-xml is handled separately, since it depends on an attribute.
    matches!(
        p,
        ElemKind {
            ns: Namespace::Svg,
            tag: TagId::ForeignObject | TagId::Desc | TagId::Title,
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(tag: TagId) -> ElemKind {
        ElemKind {
            ns: Namespace::Svg,
            tag,
        }
    }

    #[test]
    fn scopes_stop_at_their_boundaries() {
        assert!(default_scope(ElemKind::html(TagId::Table)));
        assert!(default_scope(svg(TagId::ForeignObject)));
        assert!(!default_scope(ElemKind::html(TagId::Div)));
        assert!(button_scope(ElemKind::html(TagId::Button)));
        assert!(list_item_scope(ElemKind::html(TagId::Ul)));
        assert!(!list_item_scope(ElemKind::html(TagId::Button)));
    }

    #[test]
    fn select_scope_is_everything_but_options() {
        assert!(select_scope(ElemKind::html(TagId::Div)));
        assert!(select_scope(ElemKind::html(TagId::Unknown)));
        assert!(!select_scope(ElemKind::html(TagId::Option)));
        assert!(!select_scope(ElemKind::html(TagId::Optgroup)));
    }

    #[test]
    fn namespaces_are_respected() {
        assert!(special(ElemKind::html(TagId::Title)));
        assert!(special(svg(TagId::Title)));
        assert!(!special(svg(TagId::Div)));
        assert!(!heading_tag(svg(TagId::H1)));
        assert!(thorough_implied_end(ElemKind::html(TagId::Tbody)));
        assert!(!cursory_implied_end(ElemKind::html(TagId::Tbody)));
    }
}

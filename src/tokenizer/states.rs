// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tokenizer states.
//!
//! Public so that tests and fragment parsing can pick the initial state.
//! States that differ only by the kind of text they scan (RCDATA, RAWTEXT,
//! script data) share one variant parameterized by `RawKind`.

use crate::tag_id::TagId;

pub use self::AttrValueKind::*;
pub use self::DoctypeIdKind::*;
pub use self::RawKind::*;
pub use self::ScriptEscapeKind::*;
pub use self::State::*;

/// Inside `<!--` in script data, and inside a nested `<script>` there.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum ScriptEscapeKind {
    Escaped,
    DoubleEscaped,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum DoctypeIdKind {
    Public,
    System,
}

/// Text content models other than plain data.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum RawKind {
    /// `title`, `textarea`: character references are decoded.
    Rcdata,
    /// `style`, `xmp`, `iframe`, `noembed`, `noframes`, and `noscript`
    /// when scripting is enabled.
    Rawtext,
    ScriptData,
    ScriptDataEscaped(ScriptEscapeKind),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum AttrValueKind {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum State {
    Data,
    Plaintext,
    TagOpen,
    EndTagOpen,
    TagName,

    // Text inside raw-text, RCDATA and script elements, and the end tag
    // recognition that leaves them.
    RawData(RawKind),
    RawLessThanSign(RawKind),
    RawEndTagOpen(RawKind),
    RawEndTagName(RawKind),
    ScriptDataEscapeStart(ScriptEscapeKind),
    ScriptDataEscapeStartDash,
    ScriptDataEscapedDash(ScriptEscapeKind),
    ScriptDataEscapedDashDash(ScriptEscapeKind),
    ScriptDataDoubleEscapeEnd,

    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValue(AttrValueKind),
    AfterAttributeValueQuoted,
    SelfClosingStartTag,

    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentLessThanSign,
    CommentLessThanSignBang,
    CommentLessThanSignBangDash,
    CommentLessThanSignBangDashDash,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,

    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    AfterDoctypeKeyword(DoctypeIdKind),
    BeforeDoctypeIdentifier(DoctypeIdKind),
    DoctypeIdentifierDoubleQuoted(DoctypeIdKind),
    DoctypeIdentifierSingleQuoted(DoctypeIdKind),
    AfterDoctypeIdentifier(DoctypeIdKind),
    BetweenDoctypePublicAndSystemIdentifiers,
    BogusDoctype,

    CdataSection,
    CdataSectionBracket,
    CdataSectionEnd,
}

impl State {
    /// The state for text whose parent is the HTML element `tag`.
    ///
    /// Fragment parsing starts here, and the tree builder switches to the
    /// same states after inserting such an element.
    pub fn for_html_context(tag: TagId, scripting_enabled: bool) -> State {
        match tag {
            TagId::Title | TagId::Textarea => RawData(Rcdata),
            TagId::Style | TagId::Xmp | TagId::Iframe | TagId::Noembed | TagId::Noframes => {
                RawData(Rawtext)
            },
            TagId::Noscript if scripting_enabled => RawData(Rawtext),
            TagId::Script => RawData(ScriptData),
            TagId::Plaintext => Plaintext,
            _ => Data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_elements_pick_content_models() {
        assert_eq!(State::for_html_context(TagId::Textarea, true), RawData(Rcdata));
        assert_eq!(State::for_html_context(TagId::Xmp, true), RawData(Rawtext));
        assert_eq!(State::for_html_context(TagId::Script, false), RawData(ScriptData));
        assert_eq!(State::for_html_context(TagId::Plaintext, true), Plaintext);
        assert_eq!(State::for_html_context(TagId::Div, true), Data);
    }

    #[test]
    fn noscript_depends_on_scripting() {
        assert_eq!(State::for_html_context(TagId::Noscript, true), RawData(Rawtext));
        assert_eq!(State::for_html_context(TagId::Noscript, false), Data);
    }
}

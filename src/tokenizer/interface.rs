// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use tendril::StrTendril;

use crate::error::{Diagnostic, Span};
use crate::interface::{Attribute, LocalName, Namespace};
use crate::tag_id::TagId;
use crate::tokenizer::states;

pub use self::TagKind::{EndTag, StartTag};
pub use self::Token::{CharacterTokens, CommentToken, DoctypeToken, TagToken};
pub use self::Token::{EOFToken, NullCharacterToken, ParseError, WhitespaceTokens};

/// A `DOCTYPE` token.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

/// A tag token.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: LocalName,
    /// `name` looked up once, when the tag was emitted.
    pub tag_id: TagId,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// Same kind, name and attributes, in any order. The self-closing
    /// flag is not compared. Relies on attribute names being unique.
    pub fn equiv_modulo_attr_order(&self, other: &Tag) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.attrs.len() == other.attrs.len()
            && self.attrs.iter().all(|attr| other.attrs.contains(attr))
    }

    /// The value of an attribute in the null namespace.
    pub fn get_attribute(&self, name: &str) -> Option<&StrTendril> {
        self.attrs
            .iter()
            .find(|attr| attr.name.ns == Namespace::Null && &*attr.name.local == name)
            .map(|attr| &attr.value)
    }
}

/// Text is split into runs of ASCII whitespace (`WhitespaceTokens`) and
/// everything else (`CharacterTokens`), so neither kind of run mixes the
/// two.
#[derive(PartialEq, Eq, Debug)]
pub enum Token {
    DoctypeToken(Doctype),
    TagToken(Tag),
    CommentToken(StrTendril),
    CharacterTokens(StrTendril),
    WhitespaceTokens(StrTendril),
    NullCharacterToken,
    EOFToken,
    ParseError(Diagnostic),
}

#[derive(Debug, PartialEq)]
#[must_use]
pub enum TokenSinkResult<Handle> {
    Continue,
    /// A `</script>` end tag finished a script; the tokenizer pauses.
    Script(Handle),
    Plaintext,
    RawData(states::RawKind),
}

/// Types which can receive tokens from the tokenizer.
pub trait TokenSink {
    type Handle;

    /// Process a token. `span` covers the input the token was read from.
    fn process_token(&self, token: Token, span: Span) -> TokenSinkResult<Self::Handle>;

    /// Signal sink that tokenization reached the end.
    fn end(&self) {}

    /// May `<![CDATA[` open a CDATA section here? Only inside SVG or
    /// MathML content; everywhere else it starts a bogus comment.
    fn cdata_allowed(&self) -> bool {
        false
    }
}

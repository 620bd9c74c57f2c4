// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types used within the tree builder code. Not exported to users.

use tendril::StrTendril;

use crate::tokenizer::states::RawKind;
use crate::tokenizer::Tag;

/// Where the tree builder is in the document's structure. Each mode has
/// its own rules in `rules.rs`.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

impl InsertionMode {
    /// Modes for the inside of a `<table>`. A `<select>` opened in one of
    /// them closes when table markup shows up.
    pub(crate) fn is_table_context(self) -> bool {
        matches!(
            self,
            InsertionMode::InTable
                | InsertionMode::InCaption
                | InsertionMode::InTableBody
                | InsertionMode::InRow
                | InsertionMode::InCell
        )
    }
}

/// The tokens the insertion modes see. Doctypes and parse errors are
/// handled before dispatch.
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) enum Token {
    Tag(Tag),
    Comment(StrTendril),
    /// A run of text with no ASCII whitespace.
    Characters(StrTendril),
    /// A run of ASCII whitespace.
    Whitespace(StrTendril),
    NullCharacter,
    Eof,
}

impl Token {
    pub(crate) fn is_text(&self) -> bool {
        matches!(
            *self,
            Token::Characters(_) | Token::Whitespace(_) | Token::NullCharacter
        )
    }
}

/// What a rule did with a token.
pub(crate) enum ProcessResult<Handle> {
    Done,
    DoneAckSelfClosing,
    Reprocess(InsertionMode, Token),
    Script(Handle),
    ToPlaintext,
    ToRawData(RawKind),
}

/// An entry in the list of active formatting elements. `Tag` is kept so
/// the element can be recreated.
pub(crate) enum FormatEntry<Handle> {
    Element(Handle, Tag),
    Marker,
}

pub(crate) enum InsertionPoint<Handle> {
    /// Insert as last child in this parent.
    LastChild(Handle),
    /// Insert into this parent, before the given child.
    BeforeSibling { parent: Handle, sibling: Handle },
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parse diagnostics and host-misuse errors.
//!
//! Malformed markup never produces a Rust error. Every recoverable
//! problem is reported as a [`Diagnostic`] and parsing continues.

use std::fmt;

use thiserror::Error;

/// A position in the input, counted in Unicode scalar values.
///
/// `line` and `col` are 1-based, `offset` is 0-based. When source location
/// tracking is disabled only `line` is maintained.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SourceLocation {
    pub line: u64,
    pub col: u64,
    pub offset: u64,
}

impl Default for SourceLocation {
    fn default() -> SourceLocation {
        SourceLocation {
            line: 1,
            col: 0,
            offset: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The start and end of the token that produced a diagnostic or a node.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Span {
    pub fn at(location: SourceLocation) -> Span {
        Span {
            start: location,
            end: location,
        }
    }
}

macro_rules! error_codes {
    ($( $variant:ident => $name:expr, )*) => {
        /// Category of a recoverable parse error.
        ///
        /// Tokenizer codes use the names from the WHATWG parse error table.
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub enum ErrorCode {
            $( $variant, )*
        }

        impl ErrorCode {
            /// The kebab-case name of this error.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $name, )*
                }
            }
        }
    };
}

error_codes! {
    // Input stream.
    ControlCharacterInInputStream => "control-character-in-input-stream",
    NoncharacterInInputStream => "noncharacter-in-input-stream",
    SurrogateInInputStream => "surrogate-in-input-stream",

    // Tokenizer.
    AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
    AbruptDoctypePublicIdentifier => "abrupt-doctype-public-identifier",
    AbruptDoctypeSystemIdentifier => "abrupt-doctype-system-identifier",
    CdataInHtmlContent => "cdata-in-html-content",
    DuplicateAttribute => "duplicate-attribute",
    EndTagWithAttributes => "end-tag-with-attributes",
    EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
    EofBeforeTagName => "eof-before-tag-name",
    EofInCdata => "eof-in-cdata",
    EofInComment => "eof-in-comment",
    EofInDoctype => "eof-in-doctype",
    EofInScriptHtmlCommentLikeText => "eof-in-script-html-comment-like-text",
    EofInTag => "eof-in-tag",
    IncorrectlyClosedComment => "incorrectly-closed-comment",
    IncorrectlyOpenedComment => "incorrectly-opened-comment",
    InvalidCharacterSequenceAfterDoctypeName => "invalid-character-sequence-after-doctype-name",
    InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
    MissingAttributeValue => "missing-attribute-value",
    MissingDoctypeName => "missing-doctype-name",
    MissingDoctypePublicIdentifier => "missing-doctype-public-identifier",
    MissingDoctypeSystemIdentifier => "missing-doctype-system-identifier",
    MissingEndTagName => "missing-end-tag-name",
    MissingQuoteBeforeDoctypePublicIdentifier => "missing-quote-before-doctype-public-identifier",
    MissingQuoteBeforeDoctypeSystemIdentifier => "missing-quote-before-doctype-system-identifier",
    MissingWhitespaceAfterDoctypePublicKeyword => "missing-whitespace-after-doctype-public-keyword",
    MissingWhitespaceAfterDoctypeSystemKeyword => "missing-whitespace-after-doctype-system-keyword",
    MissingWhitespaceBeforeDoctypeName => "missing-whitespace-before-doctype-name",
    MissingWhitespaceBetweenAttributes => "missing-whitespace-between-attributes",
    MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers =>
        "missing-whitespace-between-doctype-public-and-system-identifiers",
    NestedComment => "nested-comment",
    UnexpectedCharacterAfterDoctypeSystemIdentifier =>
        "unexpected-character-after-doctype-system-identifier",
    UnexpectedCharacterInAttributeName => "unexpected-character-in-attribute-name",
    UnexpectedCharacterInUnquotedAttributeValue =>
        "unexpected-character-in-unquoted-attribute-value",
    UnexpectedEqualsSignBeforeAttributeName => "unexpected-equals-sign-before-attribute-name",
    UnexpectedNullCharacter => "unexpected-null-character",
    UnexpectedQuestionMarkInsteadOfTagName => "unexpected-question-mark-instead-of-tag-name",
    UnexpectedSolidusInTag => "unexpected-solidus-in-tag",

    // Character references.
    AbsenceOfDigitsInNumericCharacterReference =>
        "absence-of-digits-in-numeric-character-reference",
    CharacterReferenceOutsideUnicodeRange => "character-reference-outside-unicode-range",
    ControlCharacterReference => "control-character-reference",
    MissingSemicolonAfterCharacterReference => "missing-semicolon-after-character-reference",
    NoncharacterCharacterReference => "noncharacter-character-reference",
    NullCharacterReference => "null-character-reference",
    SurrogateCharacterReference => "surrogate-character-reference",
    UnknownNamedCharacterReference => "unknown-named-character-reference",

    // Tree construction.
    AbandonedHeadElementChild => "abandoned-head-element-child",
    AdoptionAgency13 => "adoption-agency-1-3",
    ClosingOfElementWithOpenChildElements => "closing-of-element-with-open-child-elements",
    DisallowedContentInNoscriptInHead => "disallowed-content-in-noscript-in-head",
    EndTagWithoutMatchingOpenElement => "end-tag-without-matching-open-element",
    EofInElementThatCanContainOnlyText => "eof-in-element-that-can-contain-only-text",
    FosterParentedContent => "foster-parented-content",
    MisplacedDoctype => "misplaced-doctype",
    MisplacedStartTagForHeadElement => "misplaced-start-tag-for-head-element",
    MissingDoctype => "missing-doctype",
    NestedNoscriptInHead => "nested-noscript-in-head",
    NonConformingDoctype => "non-conforming-doctype",
    NonVoidHtmlElementStartTagWithTrailingSolidus =>
        "non-void-html-element-start-tag-with-trailing-solidus",
    OpenElementsLeftAfterEof => "open-elements-left-after-eof",
    UnexpectedCharacterToken => "unexpected-character-token",
    UnexpectedEndTag => "unexpected-end-tag",
    UnexpectedStartTag => "unexpected-start-tag",
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable parse error and where it happened.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, span: Span) -> Diagnostic {
        Diagnostic {
            code,
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}", self.code, self.start)
    }
}

/// Misuse of the streaming API by the host.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum ParserError {
    #[error("input written after end() was called")]
    WriteAfterEnd,
    #[error("resume() called while the parser is not paused")]
    ResumeWhenNotPaused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_kebab_case_names() {
        assert_eq!(ErrorCode::EofInTag.as_str(), "eof-in-tag");
        assert_eq!(ErrorCode::AdoptionAgency13.to_string(), "adoption-agency-1-3");
        assert_eq!(
            ErrorCode::MissingSemicolonAfterCharacterReference.as_str(),
            "missing-semicolon-after-character-reference"
        );
    }

    #[test]
    fn host_misuse_messages() {
        assert_eq!(
            ParserError::WriteAfterEnd.to_string(),
            "input written after end() was called"
        );
    }
}

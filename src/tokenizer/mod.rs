// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML tokenizer.

pub use self::interface::{CharacterTokens, EOFToken, NullCharacterToken, ParseError};
pub use self::interface::{CommentToken, DoctypeToken, TagToken, Token, WhitespaceTokens};
pub use self::interface::{Doctype, EndTag, StartTag, Tag, TagKind};
pub use self::interface::{TokenSink, TokenSinkResult};

use self::states::{DoctypeIdKind, Public, System};
use self::states::{DoubleEscaped, Escaped};
use self::states::{DoubleQuoted, SingleQuoted, Unquoted};
use self::states::{Rawtext, Rcdata, ScriptData, ScriptDataEscaped};

use self::char_ref::{CharRefTokenizer, DecodeMode};

use crate::error::{Diagnostic, ErrorCode, ParserError, SourceLocation, Span};
use crate::interface::{Attribute, LocalName, Namespace, QualName};
use crate::preprocessor::{FromSet, InputChar, NotFromSet, Preprocessor, SetResult};
use crate::tag_id::TagId;
use crate::util::smallcharset::SmallCharSet;
use crate::util::str::{is_ascii_whitespace, lower_ascii_letter, Runs};

use log::{debug, trace, warn};
use std::cell::{Cell, RefCell, RefMut};
use std::mem;
use tendril::StrTendril;

pub mod char_ref;
mod interface;
pub mod states;

pub enum ProcessResult<Handle> {
    Continue,
    Suspend,
    Script(Handle),
}

/// What a call into the tokenizer ended with.
#[derive(Debug, PartialEq)]
#[must_use]
pub enum TokenizerResult<Handle> {
    /// All available input was consumed, or the tokenizer is paused.
    Done,
    /// A script finished. The tokenizer is paused until `resume()`.
    Script(Handle),
}

fn option_push(opt_str: &mut Option<StrTendril>, c: char) {
    match *opt_str {
        Some(ref mut s) => s.push_char(c),
        None => *opt_str = Some(StrTendril::from_char(c)),
    }
}

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    /// Check every code point for control characters and noncharacters?
    /// This disables the bulk scanning of text. Default: false
    pub exact_errors: bool,

    /// Discard a `U+FEFF BYTE ORDER MARK` if we see one at the beginning
    /// of the stream?  Default: true
    pub discard_bom: bool,

    /// Keep columns and offsets up to date for diagnostics and node
    /// locations? Lines are always counted. Default: false
    pub source_location_tracking: bool,

    /// Initial state override. Used by fragment parsing and tests.
    pub initial_state: Option<states::State>,

    /// Last start tag, for the "appropriate end tag" check in an
    /// initial raw-text state.
    pub last_start_tag_name: Option<String>,
}

impl Default for TokenizerOpts {
    fn default() -> TokenizerOpts {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            source_location_tracking: false,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

/// The HTML tokenizer.
pub struct Tokenizer<Sink> {
    /// Options controlling the behavior of the tokenizer.
    opts: TokenizerOpts,

    /// Destination for tokens we emit.
    pub sink: Sink,

    /// Buffered, preprocessed input.
    input: Preprocessor,

    /// The abstract machine state.
    state: Cell<states::State>,

    /// Tokenizer for character references, if we're tokenizing
    /// one at the moment.
    char_ref_tokenizer: RefCell<Option<Box<CharRefTokenizer>>>,

    /// Discard a U+FEFF BYTE ORDER MARK if we see one?  Only done at the
    /// beginning of the stream.
    discard_bom: Cell<bool>,

    paused: Cell<bool>,

    /// `end()` was called.
    ended: Cell<bool>,

    /// The end of input has been tokenized.
    finished: Cell<bool>,

    /// Where the token being built started.
    token_start: Cell<SourceLocation>,

    /// Where the character last consumed started.
    char_start: Cell<SourceLocation>,

    /// Where the '&' of the character reference being decoded started.
    char_ref_start: Cell<SourceLocation>,

    /// Current tag kind.
    current_tag_kind: Cell<TagKind>,

    /// Current tag name.
    current_tag_name: RefCell<StrTendril>,

    /// Current tag is self-closing?
    current_tag_self_closing: Cell<bool>,

    /// Current tag attributes.
    current_tag_attrs: RefCell<Vec<Attribute>>,

    /// Current attribute name.
    current_attr_name: RefCell<StrTendril>,

    /// Current attribute value.
    current_attr_value: RefCell<StrTendril>,

    /// Current comment.
    current_comment: RefCell<StrTendril>,

    /// Current doctype token.
    current_doctype: RefCell<Doctype>,

    /// Last start tag name, for use in checking "appropriate end tag".
    last_start_tag_name: RefCell<Option<LocalName>>,

    /// The temporary buffer used by end tag recognition in raw text and
    /// by CDATA sections.
    temp_buf: RefCell<StrTendril>,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    /// Create a new tokenizer which feeds tokens to a particular `TokenSink`.
    pub fn new(sink: Sink, mut opts: TokenizerOpts) -> Tokenizer<Sink> {
        let start_tag_name = opts
            .last_start_tag_name
            .take()
            .map(|s| LocalName::from(&*s));
        let state = opts.initial_state.unwrap_or(states::Data);
        let discard_bom = opts.discard_bom;
        let input = Preprocessor::new(opts.source_location_tracking, opts.exact_errors);
        let start = input.location();
        Tokenizer {
            opts,
            sink,
            input,
            state: Cell::new(state),
            char_ref_tokenizer: RefCell::new(None),
            discard_bom: Cell::new(discard_bom),
            paused: Cell::new(false),
            ended: Cell::new(false),
            finished: Cell::new(false),
            token_start: Cell::new(start),
            char_start: Cell::new(start),
            char_ref_start: Cell::new(start),
            current_tag_kind: Cell::new(StartTag),
            current_tag_name: RefCell::new(StrTendril::new()),
            current_tag_self_closing: Cell::new(false),
            current_tag_attrs: RefCell::new(vec![]),
            current_attr_name: RefCell::new(StrTendril::new()),
            current_attr_value: RefCell::new(StrTendril::new()),
            current_comment: RefCell::new(StrTendril::new()),
            current_doctype: RefCell::new(Doctype::default()),
            last_start_tag_name: RefCell::new(start_tag_name),
            temp_buf: RefCell::new(StrTendril::new()),
        }
    }

    /// Feed a chunk of input into the tokenizer.
    ///
    /// Input written while the tokenizer is paused is buffered and
    /// tokenized after `resume()`.
    pub fn write(&self, chunk: &str) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        if self.ended.get() {
            return Err(ParserError::WriteAfterEnd);
        }
        self.input.write(chunk, false);
        Ok(self.run())
    }

    /// Feed a chunk of UTF-16 code units into the tokenizer.
    pub fn write_utf16(&self, units: &[u16]) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        if self.ended.get() {
            return Err(ParserError::WriteAfterEnd);
        }
        self.input.write_utf16(units, false);
        Ok(self.run())
    }

    /// Indicate that we have reached the end of the input.
    ///
    /// If the tokenizer is paused, the end of input is processed by the
    /// next `resume()`.
    pub fn end(&self) -> TokenizerResult<Sink::Handle> {
        if self.ended.get() {
            warn!("end() called more than once");
            return TokenizerResult::Done;
        }
        self.ended.set(true);
        self.input.end();
        self.run()
    }

    /// Stop tokenizing until `resume()` is called.
    pub fn pause(&self) {
        self.paused.set(true);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Continue after a pause, tokenizing everything written meanwhile.
    pub fn resume(&self) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        if !self.paused.get() {
            return Err(ParserError::ResumeWhenNotPaused);
        }
        self.paused.set(false);
        Ok(self.run())
    }

    pub fn set_plaintext_state(&self) {
        self.state.set(states::Plaintext);
    }

    pub fn state(&self) -> states::State {
        self.state.get()
    }

    fn process_token(&self, token: Token) -> TokenSinkResult<Sink::Handle> {
        let span = Span {
            start: self.token_start.get(),
            end: self.input.location(),
        };
        self.sink.process_token(token, span)
    }

    fn process_token_and_continue(&self, token: Token) {
        if !matches!(self.process_token(token), TokenSinkResult::Continue) {
            warn!("token sink asked for a state change after a non-tag token");
        }
    }

    fn mark_token_start(&self) {
        self.token_start.set(self.input.location());
    }

    //§ preprocessing-the-input-stream
    fn flush_input_errors(&self) {
        if !self.input.has_errors() {
            return;
        }
        for (code, location) in self.input.take_errors() {
            let span = Span::at(location);
            let _ = self
                .sink
                .process_token(ParseError(Diagnostic::new(code, span)), span);
        }
    }

    //§ tokenization
    // Get the next input character, if one is available.
    fn get_char(&self) -> Option<char> {
        self.char_start.set(self.input.location());
        let c = self.input.advance().char();
        self.flush_input_errors();
        c
    }

    fn pop_except_from(&self, set: SmallCharSet) -> Option<SetResult> {
        // The exact path checks every character, so it never returns a run.
        // This means that `FromSet` can contain characters not in the set!
        // The fallback `FromSet` case of each state handles them like the
        // `NotFromSet` case.
        if self.opts.exact_errors {
            return self.get_char().map(FromSet);
        }

        self.char_start.set(self.input.location());
        let d = self.input.pop_except_from(set);
        self.flush_input_errors();
        trace!("got characters {:?}", d);
        d
    }

    // Check if the next characters are an ASCII case-insensitive match.  See
    // Preprocessor::eat.
    fn eat(&self, pat: &str, eq: fn(&u8, &u8) -> bool) -> Option<bool> {
        self.input.eat(pat, eq)
    }

    fn discard_char(&self) {
        self.get_char();
    }

    fn reconsume(&self) {
        self.input.retreat(1);
    }

    /// Run the state machine for as long as we can.
    fn run(&self) -> TokenizerResult<Sink::Handle> {
        if self.paused.get() || self.finished.get() {
            return TokenizerResult::Done;
        }

        if self.char_ref_tokenizer.borrow().is_none() {
            self.input.drop_consumed();
        }

        if self.discard_bom.get() {
            match self.input.peek(0) {
                InputChar::Char(c) => {
                    self.discard_bom.set(false);
                    if c == '\u{feff}' {
                        self.input.advance();
                    }
                },
                InputChar::EndOfChunk => return TokenizerResult::Done,
                InputChar::EndOfInput => self.discard_bom.set(false),
            }
        }

        loop {
            if self.paused.get() {
                return TokenizerResult::Done;
            }
            match self.step() {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => break,
                ProcessResult::Script(node) => {
                    self.paused.set(true);
                    return TokenizerResult::Script(node);
                },
            }
        }

        // A suspended step after the last chunk means every state is
        // waiting on input that will never come.
        if self.input.is_last_chunk_written() {
            self.finish();
        }
        TokenizerResult::Done
    }

    fn finish(&self) {
        self.finished.set(true);
        self.mark_token_start();
        loop {
            match self.eof_step() {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => break,
                ProcessResult::Script(_) => warn!("script result at end of input"),
            }
        }
        self.sink.end();
    }

    fn emit_error(&self, code: ErrorCode) {
        trace!("  error {}", code);
        let span = Span {
            start: self.char_start.get(),
            end: self.input.location(),
        };
        let _ = self
            .sink
            .process_token(ParseError(Diagnostic::new(code, span)), span);
    }

    // Character reference errors cover the whole reference from its '&'.
    pub(super) fn emit_char_ref_error(&self, code: ErrorCode) {
        trace!("  error {}", code);
        let span = Span {
            start: self.char_ref_start.get(),
            end: self.input.location(),
        };
        let _ = self
            .sink
            .process_token(ParseError(Diagnostic::new(code, span)), span);
    }

    fn emit_eof_error(&self, code: ErrorCode) {
        trace!("  error_eof {}", code);
        let span = Span::at(self.input.location());
        let _ = self
            .sink
            .process_token(ParseError(Diagnostic::new(code, span)), span);
    }

    fn emit_char(&self, c: char) {
        self.process_token_and_continue(match c {
            '\0' => NullCharacterToken,
            c if is_ascii_whitespace(c) => WhitespaceTokens(StrTendril::from_char(c)),
            c => CharacterTokens(StrTendril::from_char(c)),
        });
    }

    // The string must not contain '\0'!
    fn emit_chars(&self, b: StrTendril) {
        let mut offset = 0;
        for (whitespace, run) in Runs::new(is_ascii_whitespace, &b) {
            let text = b.subtendril(offset as u32, run.len() as u32);
            offset += run.len();
            self.process_token_and_continue(if whitespace {
                WhitespaceTokens(text)
            } else {
                CharacterTokens(text)
            });
        }
    }

    fn emit_current_tag(&self) -> ProcessResult<Sink::Handle> {
        self.finish_attribute();

        let name = LocalName::from(&**self.current_tag_name.borrow());
        self.current_tag_name.borrow_mut().clear();

        match self.current_tag_kind.get() {
            StartTag => {
                *self.last_start_tag_name.borrow_mut() = Some(name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.borrow().is_empty() {
                    self.emit_error(ErrorCode::EndTagWithAttributes);
                }
                if self.current_tag_self_closing.get() {
                    self.emit_error(ErrorCode::EndTagWithTrailingSolidus);
                }
            },
        }

        let token = TagToken(Tag {
            kind: self.current_tag_kind.get(),
            tag_id: TagId::from_name(&name),
            name,
            self_closing: self.current_tag_self_closing.get(),
            attrs: mem::take(&mut self.current_tag_attrs.borrow_mut()),
        });

        match self.process_token(token) {
            TokenSinkResult::Continue => ProcessResult::Continue,
            TokenSinkResult::Plaintext => {
                self.state.set(states::Plaintext);
                ProcessResult::Continue
            },
            TokenSinkResult::Script(node) => {
                self.state.set(states::Data);
                ProcessResult::Script(node)
            },
            TokenSinkResult::RawData(kind) => {
                self.state.set(states::RawData(kind));
                ProcessResult::Continue
            },
        }
    }

    fn emit_temp_buf(&self) {
        let buf = mem::take(&mut *self.temp_buf.borrow_mut());
        if !buf.is_empty() {
            self.emit_chars(buf);
        }
    }

    fn clear_temp_buf(&self) {
        self.temp_buf.borrow_mut().clear();
    }

    fn emit_current_comment(&self) {
        let comment = mem::take(&mut *self.current_comment.borrow_mut());
        self.process_token_and_continue(CommentToken(comment));
    }

    fn discard_tag(&self) {
        self.current_tag_name.borrow_mut().clear();
        self.current_tag_self_closing.set(false);
        *self.current_tag_attrs.borrow_mut() = vec![];
    }

    fn create_tag(&self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_name.borrow_mut().push_char(c);
        self.current_tag_kind.set(kind);
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name.borrow().as_ref() {
            Some(last) => {
                (self.current_tag_kind.get() == EndTag)
                    && (**self.current_tag_name.borrow() == **last)
            },
            None => false,
        }
    }

    fn create_attribute(&self, c: char) {
        self.finish_attribute();

        self.current_attr_name.borrow_mut().push_char(c);
    }

    fn finish_attribute(&self) {
        if self.current_attr_name.borrow().is_empty() {
            return;
        }

        let dup = {
            let name = &*self.current_attr_name.borrow();
            self.current_tag_attrs
                .borrow()
                .iter()
                .any(|a| *a.name.local == **name)
        };

        if dup {
            self.emit_error(ErrorCode::DuplicateAttribute);
            self.current_attr_name.borrow_mut().clear();
            self.current_attr_value.borrow_mut().clear();
        } else {
            let name = LocalName::from(&**self.current_attr_name.borrow());
            self.current_attr_name.borrow_mut().clear();
            self.current_tag_attrs.borrow_mut().push(Attribute {
                // The tree builder adjusts names in foreign content.
                name: QualName::new(None, Namespace::Null, name),
                value: mem::take(&mut self.current_attr_value.borrow_mut()),
            });
        }
    }

    fn emit_current_doctype(&self) {
        let doctype = self.current_doctype.take();
        self.process_token_and_continue(DoctypeToken(doctype));
    }

    fn doctype_id(&self, kind: DoctypeIdKind) -> RefMut<'_, Option<StrTendril>> {
        let current_doctype = self.current_doctype.borrow_mut();
        match kind {
            Public => RefMut::map(current_doctype, |d| &mut d.public_id),
            System => RefMut::map(current_doctype, |d| &mut d.system_id),
        }
    }

    fn clear_doctype_id(&self, kind: DoctypeIdKind) {
        let mut id = self.doctype_id(kind);
        match *id {
            Some(ref mut s) => s.clear(),
            None => *id = Some(StrTendril::new()),
        }
    }

    fn consume_char_ref(&self) {
        let mode = match self.state.get() {
            states::AttributeValue(_) => DecodeMode::Attribute,
            _ => DecodeMode::Legacy,
        };
        self.char_ref_start.set(self.char_start.get());
        *self.char_ref_tokenizer.borrow_mut() = Some(Box::new(CharRefTokenizer::new(mode)));
    }

    fn emit_eof(&self) {
        self.process_token_and_continue(EOFToken);
    }
}
//§ END

// Shorthand for common state machine behaviors.
macro_rules! shorthand (
    ( $me:ident : create_tag $kind:ident $c:expr   ) => ( $me.create_tag($kind, $c)                           );
    ( $me:ident : push_tag $c:expr                 ) => ( $me.current_tag_name.borrow_mut().push_char($c)     );
    ( $me:ident : discard_tag                      ) => ( $me.discard_tag()                                   );
    ( $me:ident : discard_char                     ) => ( $me.discard_char()                                  );
    ( $me:ident : push_temp $c:expr                ) => ( $me.temp_buf.borrow_mut().push_char($c)             );
    ( $me:ident : append_temp $c:expr              ) => ( $me.temp_buf.borrow_mut().push_slice($c)            );
    ( $me:ident : clear_temp                       ) => ( $me.clear_temp_buf()                                );
    ( $me:ident : create_attr $c:expr              ) => ( $me.create_attribute($c)                            );
    ( $me:ident : push_name $c:expr                ) => ( $me.current_attr_name.borrow_mut().push_char($c)    );
    ( $me:ident : push_value $c:expr               ) => ( $me.current_attr_value.borrow_mut().push_char($c)   );
    ( $me:ident : append_value $c:expr             ) => ( $me.current_attr_value.borrow_mut().push_tendril($c));
    ( $me:ident : push_comment $c:expr             ) => ( $me.current_comment.borrow_mut().push_char($c)      );
    ( $me:ident : append_comment $c:expr           ) => ( $me.current_comment.borrow_mut().push_slice($c)     );
    ( $me:ident : emit_comment                     ) => ( $me.emit_current_comment()                          );
    ( $me:ident : clear_comment                    ) => ( $me.current_comment.borrow_mut().clear()            );
    ( $me:ident : create_doctype                   ) => ( *$me.current_doctype.borrow_mut() = Doctype::default() );
    ( $me:ident : push_doctype_name $c:expr        ) => ( option_push(&mut $me.current_doctype.borrow_mut().name, $c) );
    ( $me:ident : push_doctype_id $k:ident $c:expr ) => ( option_push(&mut $me.doctype_id($k), $c)            );
    ( $me:ident : clear_doctype_id $k:ident        ) => ( $me.clear_doctype_id($k)                            );
    ( $me:ident : force_quirks                     ) => ( $me.current_doctype.borrow_mut().force_quirks = true);
    ( $me:ident : emit_doctype                     ) => ( $me.emit_current_doctype()                          );
    ( $me:ident : error $code:ident                ) => ( $me.emit_error(ErrorCode::$code)                    );
    ( $me:ident : error_eof $code:ident            ) => ( $me.emit_eof_error(ErrorCode::$code)                );
);

// Trace each shorthand action before running it.
macro_rules! sh_trace ( ( $me:ident : $($cmds:tt)* ) => ({
    trace!("  {:?}", stringify!($($cmds)*));
    shorthand!($me : $($cmds)*);
}));

// A little DSL for sequencing shorthand actions.
macro_rules! go (
    // A pattern like $($cmd:tt)* ; $($rest:tt)* causes parse ambiguity.
    // We have to tell the parser how much lookahead we need.

    ( $me:ident : $a:tt                   ; $($rest:tt)* ) => ({ sh_trace!($me: $a);          go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt             ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b);       go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt       ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b $c);    go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt $d:tt ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b $c $d); go!($me: $($rest)*); });

    // These can only come at the end.

    ( $me:ident : to $s:ident                    ) => ({ $me.state.set(states::$s); return ProcessResult::Continue;           });
    ( $me:ident : to $s:ident $k1:expr           ) => ({ $me.state.set(states::$s($k1)); return ProcessResult::Continue;      });
    ( $me:ident : to $s:ident $k1:ident $k2:expr ) => ({ $me.state.set(states::$s($k1($k2))); return ProcessResult::Continue; });

    // Reconsuming steps the input back over the character just read.
    ( $me:ident : reconsume $s:ident                    ) => ({ $me.reconsume(); go!($me: to $s);         });
    ( $me:ident : reconsume $s:ident $k1:expr           ) => ({ $me.reconsume(); go!($me: to $s $k1);     });
    ( $me:ident : reconsume $s:ident $k1:ident $k2:expr ) => ({ $me.reconsume(); go!($me: to $s $k1 $k2); });

    ( $me:ident : consume_char_ref             ) => ({ $me.consume_char_ref(); return ProcessResult::Continue;         });

    // We have a default next state after emitting a tag, but the sink can override.
    ( $me:ident : emit_tag $s:ident ) => ({
        $me.state.set(states::$s);
        return $me.emit_current_tag();
    });

    ( $me:ident : eof ) => ({ $me.emit_eof(); return ProcessResult::Suspend; });

    // If nothing else matched, it's a single command
    ( $me:ident : $($cmd:tt)+ ) => ( sh_trace!($me: $($cmd)+) );

    // or nothing.
    ( $me:ident : ) => (());
);

// These are macros because they can cause early return
// from the function where they are used.
macro_rules! get_char ( ($me:expr) => (
    unwrap_or_return!($me.get_char(), ProcessResult::Suspend)
));

macro_rules! pop_except_from ( ($me:expr, $set:expr) => (
    unwrap_or_return!($me.pop_except_from($set), ProcessResult::Suspend)
));

macro_rules! eat ( ($me:expr, $pat:expr) => (
    unwrap_or_return!($me.eat($pat, u8::eq_ignore_ascii_case), ProcessResult::Suspend)
));

macro_rules! eat_exact ( ($me:expr, $pat:expr) => (
    unwrap_or_return!($me.eat($pat, u8::eq), ProcessResult::Suspend)
));

impl<Sink: TokenSink> Tokenizer<Sink> {
    // Run the state machine for a while.
    // Return true if we should be immediately re-invoked
    // (this just simplifies control flow vs. break / continue).
    #[allow(clippy::never_loop)]
    fn step(&self) -> ProcessResult<Sink::Handle> {
        if self.char_ref_tokenizer.borrow().is_some() {
            return self.step_char_ref_tokenizer();
        }

        trace!("processing in state {:?}", self.state);
        match self.state.get() {
            //§ data-state
            states::Data => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\0');
                    },
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('<') => go!(self: to TagOpen),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ rcdata-state
            states::RawData(Rcdata) => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('<') => go!(self: to RawLessThanSign Rcdata),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ rawtext-state
            states::RawData(Rawtext) => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('<') => go!(self: to RawLessThanSign Rawtext),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ script-data-state
            states::RawData(ScriptData) => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('<') => go!(self: to RawLessThanSign ScriptData),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ script-data-escaped-state
            states::RawData(ScriptDataEscaped(Escaped)) => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '-' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('-') => {
                        self.emit_char('-');
                        go!(self: to ScriptDataEscapedDash Escaped);
                    },
                    FromSet('<') => go!(self: to RawLessThanSign ScriptDataEscaped Escaped),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ script-data-double-escaped-state
            states::RawData(ScriptDataEscaped(DoubleEscaped)) => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '-' '<' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('-') => {
                        self.emit_char('-');
                        go!(self: to ScriptDataEscapedDash DoubleEscaped);
                    },
                    FromSet('<') => {
                        self.emit_char('<');
                        go!(self: to RawLessThanSign ScriptDataEscaped DoubleEscaped)
                    },
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ plaintext-state
            states::Plaintext => loop {
                self.mark_token_start();
                match pop_except_from!(self, small_char_set!('\r' '\0' '\n')) {
                    FromSet('\0') => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                    },
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ tag-open-state
            states::TagOpen => loop {
                match get_char!(self) {
                    '!' => go!(self: to MarkupDeclarationOpen),
                    '/' => go!(self: to EndTagOpen),
                    '?' => {
                        go!(self: error UnexpectedQuestionMarkInsteadOfTagName);
                        go!(self: clear_comment; reconsume BogusComment)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag StartTag cl; to TagName),
                        None => {
                            go!(self: error InvalidFirstCharacterOfTagName);
                            self.emit_char('<');
                            go!(self: reconsume Data)
                        },
                    },
                }
            },

            //§ end-tag-open-state
            states::EndTagOpen => loop {
                match get_char!(self) {
                    '>' => {
                        go!(self: error MissingEndTagName);
                        go!(self: to Data)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_tag EndTag cl; to TagName),
                        None => {
                            go!(self: error InvalidFirstCharacterOfTagName);
                            go!(self: clear_comment; reconsume BogusComment)
                        },
                    },
                }
            },

            //§ tag-name-state
            states::TagName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_tag '\u{fffd}'),
                    c => go!(self: push_tag (c.to_ascii_lowercase())),
                }
            },

            //§ script-data-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(Escaped)) => loop {
                match get_char!(self) {
                    '/' => go!(self: clear_temp; to RawEndTagOpen ScriptDataEscaped Escaped),
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: clear_temp; push_temp cl);
                            self.emit_char('<');
                            self.emit_char(c);
                            go!(self: to ScriptDataEscapeStart DoubleEscaped);
                        },
                        None => {
                            self.emit_char('<');
                            go!(self: reconsume RawData ScriptDataEscaped Escaped);
                        },
                    },
                }
            },

            //§ script-data-double-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => loop {
                match get_char!(self) {
                    '/' => {
                        go!(self: clear_temp);
                        self.emit_char('/');
                        go!(self: to ScriptDataDoubleEscapeEnd);
                    },
                    _ => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
                }
            },

            //§ rcdata-less-than-sign-state rawtext-less-than-sign-state script-data-less-than-sign-state
            // otherwise
            states::RawLessThanSign(kind) => loop {
                match get_char!(self) {
                    '/' => go!(self: clear_temp; to RawEndTagOpen kind),
                    '!' if kind == ScriptData => {
                        self.emit_char('<');
                        self.emit_char('!');
                        go!(self: to ScriptDataEscapeStart Escaped);
                    },
                    _ => {
                        self.emit_char('<');
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ rcdata-end-tag-open-state rawtext-end-tag-open-state script-data-end-tag-open-state script-data-escaped-end-tag-open-state
            states::RawEndTagOpen(kind) => loop {
                let c = get_char!(self);
                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: create_tag EndTag cl; push_temp c; to RawEndTagName kind),
                    None => {
                        self.emit_char('<');
                        self.emit_char('/');
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ rcdata-end-tag-name-state rawtext-end-tag-name-state script-data-end-tag-name-state script-data-escaped-end-tag-name-state
            states::RawEndTagName(kind) => loop {
                let c = get_char!(self);
                if self.have_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => go!(self: clear_temp; to BeforeAttributeName),
                        '/' => go!(self: clear_temp; to SelfClosingStartTag),
                        '>' => go!(self: clear_temp; emit_tag Data),
                        _ => (),
                    }
                }

                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: push_tag cl; push_temp c),
                    None => {
                        go!(self: discard_tag);
                        self.emit_char('<');
                        self.emit_char('/');
                        self.emit_temp_buf();
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ script-data-double-escape-start-state
            states::ScriptDataEscapeStart(DoubleEscaped) => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            DoubleEscaped
                        } else {
                            Escaped
                        };
                        self.emit_char(c);
                        go!(self: to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            self.emit_char(c);
                        },
                        None => go!(self: reconsume RawData ScriptDataEscaped Escaped),
                    },
                }
            },

            //§ script-data-escape-start-state
            states::ScriptDataEscapeStart(Escaped) => loop {
                match get_char!(self) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to ScriptDataEscapeStartDash);
                    },
                    _ => go!(self: reconsume RawData ScriptData),
                }
            },

            //§ script-data-escape-start-dash-state
            states::ScriptDataEscapeStartDash => loop {
                match get_char!(self) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to ScriptDataEscapedDashDash Escaped);
                    },
                    _ => go!(self: reconsume RawData ScriptData),
                }
            },

            //§ script-data-escaped-dash-state script-data-double-escaped-dash-state
            states::ScriptDataEscapedDash(kind) => loop {
                match get_char!(self) {
                    '-' => {
                        self.emit_char('-');
                        go!(self: to ScriptDataEscapedDashDash kind);
                    },
                    '<' => {
                        if kind == DoubleEscaped {
                            self.emit_char('<');
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                        go!(self: to RawData ScriptDataEscaped kind)
                    },
                    c => {
                        self.emit_char(c);
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                }
            },

            //§ script-data-escaped-dash-dash-state script-data-double-escaped-dash-dash-state
            states::ScriptDataEscapedDashDash(kind) => loop {
                match get_char!(self) {
                    '-' => {
                        self.emit_char('-');
                    },
                    '<' => {
                        if kind == DoubleEscaped {
                            self.emit_char('<');
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '>' => {
                        self.emit_char('>');
                        go!(self: to RawData ScriptData);
                    },
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        self.emit_char('\u{fffd}');
                        go!(self: to RawData ScriptDataEscaped kind)
                    },
                    c => {
                        self.emit_char(c);
                        go!(self: to RawData ScriptDataEscaped kind);
                    },
                }
            },

            //§ script-data-double-escape-end-state
            states::ScriptDataDoubleEscapeEnd => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            Escaped
                        } else {
                            DoubleEscaped
                        };
                        self.emit_char(c);
                        go!(self: to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            go!(self: push_temp cl);
                            self.emit_char(c);
                        },
                        None => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
                    },
                }
            },

            //§ before-attribute-name-state
            states::BeforeAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_attr '\u{fffd}'; to AttributeName)
                    },
                    '=' => {
                        go!(self: error UnexpectedEqualsSignBeforeAttributeName);
                        go!(self: create_attr '='; to AttributeName)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: create_attr c; to AttributeName);
                        },
                    },
                }
            },

            //§ attribute-name-state
            states::AttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to AfterAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_name '\u{fffd}'),
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: push_name cl),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: push_name c);
                        },
                    },
                }
            },

            //§ after-attribute-name-state
            states::AfterAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_attr '\u{fffd}'; to AttributeName)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: create_attr cl; to AttributeName),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                go!(self: error UnexpectedCharacterInAttributeName);
                            }
                            go!(self: create_attr c; to AttributeName);
                        },
                    },
                }
            },

            //§ before-attribute-value-state
            states::BeforeAttributeValue => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => go!(self: to AttributeValue DoubleQuoted),
                    '\'' => go!(self: to AttributeValue SingleQuoted),
                    '>' => {
                        go!(self: error MissingAttributeValue);
                        go!(self: emit_tag Data)
                    },
                    _ => go!(self: reconsume AttributeValue Unquoted),
                }
            },

            //§ attribute-value-(double-quoted)-state
            states::AttributeValue(DoubleQuoted) => loop {
                match pop_except_from!(self, small_char_set!('\r' '"' '&' '\0' '\n')) {
                    FromSet('"') => go!(self: to AfterAttributeValueQuoted),
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('\0') => go!(self: error UnexpectedNullCharacter; push_value '\u{fffd}'),
                    FromSet(c) => go!(self: push_value c),
                    NotFromSet(ref b) => go!(self: append_value b),
                }
            },

            //§ attribute-value-(single-quoted)-state
            states::AttributeValue(SingleQuoted) => loop {
                match pop_except_from!(self, small_char_set!('\r' '\'' '&' '\0' '\n')) {
                    FromSet('\'') => go!(self: to AfterAttributeValueQuoted),
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('\0') => go!(self: error UnexpectedNullCharacter; push_value '\u{fffd}'),
                    FromSet(c) => go!(self: push_value c),
                    NotFromSet(ref b) => go!(self: append_value b),
                }
            },

            //§ attribute-value-(unquoted)-state
            states::AttributeValue(Unquoted) => loop {
                match pop_except_from!(
                    self,
                    small_char_set!('\r' '\t' '\n' '\x0C' ' ' '&' '>' '\0' '"' '\'' '<' '=')
                ) {
                    FromSet('\t') | FromSet('\n') | FromSet('\x0C') | FromSet(' ') => {
                        go!(self: to BeforeAttributeName)
                    },
                    FromSet('&') => go!(self: consume_char_ref),
                    FromSet('>') => go!(self: emit_tag Data),
                    FromSet('\0') => go!(self: error UnexpectedNullCharacter; push_value '\u{fffd}'),
                    FromSet(c) => {
                        if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            go!(self: error UnexpectedCharacterInUnquotedAttributeValue);
                        }
                        go!(self: push_value c);
                    },
                    NotFromSet(ref b) => {
                        // '`' lies outside the range a `SmallCharSet` can hold.
                        for _ in b.matches('`') {
                            go!(self: error UnexpectedCharacterInUnquotedAttributeValue);
                        }
                        go!(self: append_value b);
                    },
                }
            },

            //§ after-attribute-value-(quoted)-state
            states::AfterAttributeValueQuoted => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => go!(self: emit_tag Data),
                    _ => {
                        go!(self: error MissingWhitespaceBetweenAttributes);
                        go!(self: reconsume BeforeAttributeName)
                    },
                }
            },

            //§ self-closing-start-tag-state
            states::SelfClosingStartTag => loop {
                match get_char!(self) {
                    '>' => {
                        self.current_tag_self_closing.set(true);
                        go!(self: emit_tag Data);
                    },
                    _ => {
                        go!(self: error UnexpectedSolidusInTag);
                        go!(self: reconsume BeforeAttributeName)
                    },
                }
            },

            //§ comment-start-state
            states::CommentStart => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentStartDash),
                    '>' => {
                        go!(self: error AbruptClosingOfEmptyComment);
                        go!(self: emit_comment; to Data)
                    },
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-start-dash-state
            states::CommentStartDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentEnd),
                    '>' => {
                        go!(self: error AbruptClosingOfEmptyComment);
                        go!(self: emit_comment; to Data)
                    },
                    _ => go!(self: push_comment '-'; reconsume Comment),
                }
            },

            //§ comment-state
            states::Comment => loop {
                match get_char!(self) {
                    c @ '<' => go!(self: push_comment c; to CommentLessThanSign),
                    '-' => go!(self: to CommentEndDash),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_comment '\u{fffd}'),
                    c => go!(self: push_comment c),
                }
            },

            //§ comment-less-than-sign-state
            states::CommentLessThanSign => loop {
                match get_char!(self) {
                    c @ '!' => go!(self: push_comment c; to CommentLessThanSignBang),
                    c @ '<' => go!(self: push_comment c),
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-less-than-sign-bang
            states::CommentLessThanSignBang => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentLessThanSignBangDash),
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-less-than-sign-bang-dash
            states::CommentLessThanSignBangDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentLessThanSignBangDashDash),
                    _ => go!(self: reconsume CommentEndDash),
                }
            },

            //§ comment-less-than-sign-bang-dash-dash
            states::CommentLessThanSignBangDashDash => loop {
                match get_char!(self) {
                    '>' => go!(self: reconsume CommentEnd),
                    _ => {
                        go!(self: error NestedComment);
                        go!(self: reconsume CommentEnd)
                    },
                }
            },

            //§ comment-end-dash-state
            states::CommentEndDash => loop {
                match get_char!(self) {
                    '-' => go!(self: to CommentEnd),
                    _ => go!(self: push_comment '-'; reconsume Comment),
                }
            },

            //§ comment-end-state
            states::CommentEnd => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '!' => go!(self: to CommentEndBang),
                    '-' => go!(self: push_comment '-'),
                    _ => go!(self: append_comment "--"; reconsume Comment),
                }
            },

            //§ comment-end-bang-state
            states::CommentEndBang => loop {
                match get_char!(self) {
                    '-' => go!(self: append_comment "--!"; to CommentEndDash),
                    '>' => {
                        go!(self: error IncorrectlyClosedComment);
                        go!(self: emit_comment; to Data)
                    },
                    _ => go!(self: append_comment "--!"; reconsume Comment),
                }
            },

            //§ doctype-state
            states::Doctype => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeName),
                    '>' => go!(self: reconsume BeforeDoctypeName),
                    _ => {
                        go!(self: error MissingWhitespaceBeforeDoctypeName);
                        go!(self: reconsume BeforeDoctypeName)
                    },
                }
            },

            //§ before-doctype-name-state
            states::BeforeDoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '\0' => {
                        go!(self: error UnexpectedNullCharacter);
                        go!(self: create_doctype; push_doctype_name '\u{fffd}'; to DoctypeName)
                    },
                    '>' => {
                        go!(self: error MissingDoctypeName);
                        go!(self: create_doctype; force_quirks; emit_doctype; to Data)
                    },
                    c => go!(self: create_doctype; push_doctype_name (c.to_ascii_lowercase());
                                  to DoctypeName),
                }
            },

            //§ doctype-name-state
            states::DoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to AfterDoctypeName),
                    '>' => go!(self: emit_doctype; to Data),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_doctype_name '\u{fffd}'),
                    c => go!(self: push_doctype_name (c.to_ascii_lowercase())),
                }
            },

            //§ after-doctype-name-state
            states::AfterDoctypeName => loop {
                if eat!(self, "public") {
                    go!(self: to AfterDoctypeKeyword Public);
                } else if eat!(self, "system") {
                    go!(self: to AfterDoctypeKeyword System);
                } else {
                    match get_char!(self) {
                        '\t' | '\n' | '\x0C' | ' ' => (),
                        '>' => go!(self: emit_doctype; to Data),
                        _ => {
                            go!(self: error InvalidCharacterSequenceAfterDoctypeName);
                            go!(self: force_quirks; reconsume BogusDoctype)
                        },
                    }
                }
            },

            //§ after-doctype-public-keyword-state after-doctype-system-keyword-state
            states::AfterDoctypeKeyword(kind) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeIdentifier kind),
                    '"' => {
                        self.missing_whitespace_after_keyword(kind);
                        go!(self: clear_doctype_id kind; to DoctypeIdentifierDoubleQuoted kind)
                    },
                    '\'' => {
                        self.missing_whitespace_after_keyword(kind);
                        go!(self: clear_doctype_id kind; to DoctypeIdentifierSingleQuoted kind)
                    },
                    '>' => {
                        self.missing_doctype_identifier(kind);
                        go!(self: force_quirks; emit_doctype; to Data)
                    },
                    _ => {
                        self.missing_quote_before_identifier(kind);
                        go!(self: force_quirks; reconsume BogusDoctype)
                    },
                }
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            states::BeforeDoctypeIdentifier(kind) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => go!(self: clear_doctype_id kind; to DoctypeIdentifierDoubleQuoted kind),
                    '\'' => go!(self: clear_doctype_id kind; to DoctypeIdentifierSingleQuoted kind),
                    '>' => {
                        self.missing_doctype_identifier(kind);
                        go!(self: force_quirks; emit_doctype; to Data)
                    },
                    _ => {
                        self.missing_quote_before_identifier(kind);
                        go!(self: force_quirks; reconsume BogusDoctype)
                    },
                }
            },

            //§ doctype-public-identifier-(double-quoted)-state doctype-system-identifier-(double-quoted)-state
            states::DoctypeIdentifierDoubleQuoted(kind) => loop {
                match get_char!(self) {
                    '"' => go!(self: to AfterDoctypeIdentifier kind),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_doctype_id kind '\u{fffd}'),
                    '>' => {
                        self.abrupt_doctype_identifier(kind);
                        go!(self: force_quirks; emit_doctype; to Data)
                    },
                    c => go!(self: push_doctype_id kind c),
                }
            },

            //§ doctype-public-identifier-(single-quoted)-state doctype-system-identifier-(single-quoted)-state
            states::DoctypeIdentifierSingleQuoted(kind) => loop {
                match get_char!(self) {
                    '\'' => go!(self: to AfterDoctypeIdentifier kind),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_doctype_id kind '\u{fffd}'),
                    '>' => {
                        self.abrupt_doctype_identifier(kind);
                        go!(self: force_quirks; emit_doctype; to Data)
                    },
                    c => go!(self: push_doctype_id kind c),
                }
            },

            //§ after-doctype-public-identifier-state
            states::AfterDoctypeIdentifier(Public) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        go!(self: to BetweenDoctypePublicAndSystemIdentifiers)
                    },
                    '>' => go!(self: emit_doctype; to Data),
                    '"' => {
                        go!(self: error MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                        go!(self: clear_doctype_id System; to DoctypeIdentifierDoubleQuoted System)
                    },
                    '\'' => {
                        go!(self: error MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers);
                        go!(self: clear_doctype_id System; to DoctypeIdentifierSingleQuoted System)
                    },
                    _ => {
                        go!(self: error MissingQuoteBeforeDoctypeSystemIdentifier);
                        go!(self: force_quirks; reconsume BogusDoctype)
                    },
                }
            },

            //§ after-doctype-system-identifier-state
            states::AfterDoctypeIdentifier(System) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    _ => {
                        go!(self: error UnexpectedCharacterAfterDoctypeSystemIdentifier);
                        go!(self: reconsume BogusDoctype)
                    },
                }
            },

            //§ between-doctype-public-and-system-identifiers-state
            states::BetweenDoctypePublicAndSystemIdentifiers => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    '"' => {
                        go!(self: clear_doctype_id System; to DoctypeIdentifierDoubleQuoted System)
                    },
                    '\'' => {
                        go!(self: clear_doctype_id System; to DoctypeIdentifierSingleQuoted System)
                    },
                    _ => {
                        go!(self: error MissingQuoteBeforeDoctypeSystemIdentifier);
                        go!(self: force_quirks; reconsume BogusDoctype)
                    },
                }
            },

            //§ bogus-doctype-state
            states::BogusDoctype => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_doctype; to Data),
                    '\0' => go!(self: error UnexpectedNullCharacter),
                    _ => (),
                }
            },

            //§ bogus-comment-state
            states::BogusComment => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '\0' => go!(self: error UnexpectedNullCharacter; push_comment '\u{fffd}'),
                    c => go!(self: push_comment c),
                }
            },

            //§ markup-declaration-open-state
            states::MarkupDeclarationOpen => loop {
                if eat_exact!(self, "--") {
                    go!(self: clear_comment; to CommentStart);
                } else if eat!(self, "doctype") {
                    go!(self: to Doctype);
                } else if eat_exact!(self, "[CDATA[") {
                    if self.sink.cdata_allowed() {
                        go!(self: clear_temp; to CdataSection);
                    }
                    go!(self: error CdataInHtmlContent);
                    go!(self: clear_comment; append_comment "[CDATA["; to BogusComment);
                } else {
                    go!(self: error IncorrectlyOpenedComment);
                    go!(self: clear_comment; to BogusComment);
                }
            },

            //§ cdata-section-state
            states::CdataSection => loop {
                match get_char!(self) {
                    ']' => go!(self: to CdataSectionBracket),
                    '\0' => {
                        self.emit_temp_buf();
                        self.emit_char('\0');
                    },
                    c => go!(self: push_temp c),
                }
            },

            //§ cdata-section-bracket
            states::CdataSectionBracket => match get_char!(self) {
                ']' => go!(self: to CdataSectionEnd),
                _ => go!(self: push_temp ']'; reconsume CdataSection),
            },

            //§ cdata-section-end
            states::CdataSectionEnd => loop {
                match get_char!(self) {
                    ']' => go!(self: push_temp ']'),
                    '>' => {
                        self.emit_temp_buf();
                        go!(self: to Data);
                    },
                    _ => go!(self: append_temp "]]"; reconsume CdataSection),
                }
            },
            //§ END
        }
    }

    fn missing_whitespace_after_keyword(&self, kind: DoctypeIdKind) {
        self.emit_error(match kind {
            Public => ErrorCode::MissingWhitespaceAfterDoctypePublicKeyword,
            System => ErrorCode::MissingWhitespaceAfterDoctypeSystemKeyword,
        });
    }

    fn missing_doctype_identifier(&self, kind: DoctypeIdKind) {
        self.emit_error(match kind {
            Public => ErrorCode::MissingDoctypePublicIdentifier,
            System => ErrorCode::MissingDoctypeSystemIdentifier,
        });
    }

    fn missing_quote_before_identifier(&self, kind: DoctypeIdKind) {
        self.emit_error(match kind {
            Public => ErrorCode::MissingQuoteBeforeDoctypePublicIdentifier,
            System => ErrorCode::MissingQuoteBeforeDoctypeSystemIdentifier,
        });
    }

    fn abrupt_doctype_identifier(&self, kind: DoctypeIdKind) {
        self.emit_error(match kind {
            Public => ErrorCode::AbruptDoctypePublicIdentifier,
            System => ErrorCode::AbruptDoctypeSystemIdentifier,
        });
    }

    fn step_char_ref_tokenizer(&self) -> ProcessResult<Sink::Handle> {
        // Take and replace the tokenizer so we don't double-mut-borrow self.
        // This is why it's boxed.
        let Some(mut tok) = self.char_ref_tokenizer.take() else {
            return ProcessResult::Continue;
        };

        match tok.step(self) {
            char_ref::Status::Done => ProcessResult::Continue,
            char_ref::Status::Stuck => {
                *self.char_ref_tokenizer.borrow_mut() = Some(tok);
                ProcessResult::Suspend
            },
            char_ref::Status::Progress => {
                *self.char_ref_tokenizer.borrow_mut() = Some(tok);
                ProcessResult::Continue
            },
        }
    }

    fn process_char_ref(&self, c: char) {
        match self.state.get() {
            states::Data | states::RawData(states::Rcdata) => self.emit_char(c),

            states::AttributeValue(_) => go!(self: push_value c),

            state => warn!("character reference in state {:?}", state),
        }
    }

    fn eof_step(&self) -> ProcessResult<Sink::Handle> {
        debug!("processing EOF in state {:?}", self.state.get());
        match self.state.get() {
            states::Data
            | states::RawData(Rcdata)
            | states::RawData(Rawtext)
            | states::RawData(ScriptData)
            | states::Plaintext => go!(self: eof),

            states::TagName
            | states::BeforeAttributeName
            | states::AttributeName
            | states::AfterAttributeName
            | states::AttributeValue(_)
            | states::AfterAttributeValueQuoted
            | states::SelfClosingStartTag => go!(self: error_eof EofInTag; to Data),

            states::RawData(ScriptDataEscaped(_))
            | states::ScriptDataEscapedDash(_)
            | states::ScriptDataEscapedDashDash(_) => {
                go!(self: error_eof EofInScriptHtmlCommentLikeText; to Data)
            },

            states::BeforeAttributeValue => go!(self: to AttributeValue Unquoted),

            states::TagOpen => {
                go!(self: error_eof EofBeforeTagName);
                self.emit_char('<');
                go!(self: to Data);
            },

            states::EndTagOpen => {
                go!(self: error_eof EofBeforeTagName);
                self.emit_char('<');
                self.emit_char('/');
                go!(self: to Data);
            },

            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::RawLessThanSign(kind) => {
                self.emit_char('<');
                go!(self: to RawData kind);
            },

            states::RawEndTagOpen(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                go!(self: to RawData kind);
            },

            states::RawEndTagName(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                self.emit_temp_buf();
                go!(self: to RawData kind)
            },

            states::ScriptDataEscapeStart(Escaped) => go!(self: to RawData ScriptData),

            states::ScriptDataEscapeStart(DoubleEscaped) => {
                go!(self: to RawData ScriptDataEscaped Escaped)
            },

            states::ScriptDataEscapeStartDash => go!(self: to RawData ScriptData),

            states::ScriptDataDoubleEscapeEnd => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::CommentStart
            | states::CommentStartDash
            | states::Comment
            | states::CommentEndDash
            | states::CommentEnd
            | states::CommentEndBang => go!(self: error_eof EofInComment; emit_comment; to Data),

            states::CommentLessThanSign | states::CommentLessThanSignBang => {
                go!(self: to Comment)
            },

            states::CommentLessThanSignBangDash => go!(self: to CommentEndDash),

            states::CommentLessThanSignBangDashDash => go!(self: to CommentEnd),

            states::Doctype | states::BeforeDoctypeName => {
                go!(self: error_eof EofInDoctype);
                go!(self: create_doctype; force_quirks; emit_doctype; to Data)
            },

            states::DoctypeName
            | states::AfterDoctypeName
            | states::AfterDoctypeKeyword(_)
            | states::BeforeDoctypeIdentifier(_)
            | states::DoctypeIdentifierDoubleQuoted(_)
            | states::DoctypeIdentifierSingleQuoted(_)
            | states::AfterDoctypeIdentifier(_)
            | states::BetweenDoctypePublicAndSystemIdentifiers => {
                go!(self: error_eof EofInDoctype);
                go!(self: force_quirks; emit_doctype; to Data)
            },

            states::BogusDoctype => go!(self: emit_doctype; to Data),

            states::BogusComment => go!(self: emit_comment; to Data),

            states::MarkupDeclarationOpen => {
                go!(self: error_eof IncorrectlyOpenedComment);
                go!(self: clear_comment; to BogusComment)
            },

            states::CdataSection => {
                self.emit_temp_buf();
                go!(self: error_eof EofInCdata; to Data)
            },

            states::CdataSectionBracket => go!(self: push_temp ']'; to CdataSection),

            states::CdataSectionEnd => go!(self: append_temp "]]"; to CdataSection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::cell::RefCell;

    // Collects tokens, merging adjacent text the way a tree would see it.
    #[derive(Default)]
    struct Collector {
        tokens: RefCell<Vec<Token>>,
        errors: RefCell<Vec<Diagnostic>>,
        spans: RefCell<Vec<Span>>,
    }

    impl Collector {
        fn push_text(&self, text: StrTendril) {
            let mut tokens = self.tokens.borrow_mut();
            if let Some(CharacterTokens(last)) = tokens.last_mut() {
                last.push_tendril(&text);
                return;
            }
            tokens.push(CharacterTokens(text));
        }
    }

    impl TokenSink for Collector {
        type Handle = ();

        fn process_token(&self, token: Token, span: Span) -> TokenSinkResult<()> {
            match token {
                CharacterTokens(text) | WhitespaceTokens(text) => self.push_text(text),
                NullCharacterToken => self.push_text(StrTendril::from_char('\0')),
                ParseError(diagnostic) => self.errors.borrow_mut().push(diagnostic),
                TagToken(tag) => {
                    self.spans.borrow_mut().push(span);
                    self.tokens.borrow_mut().push(TagToken(tag));
                },
                token => self.tokens.borrow_mut().push(token),
            }
            TokenSinkResult::Continue
        }
    }

    fn tokenize(chunks: &[&str], opts: TokenizerOpts) -> Collector {
        let tok = Tokenizer::new(Collector::default(), opts);
        for chunk in chunks {
            assert_eq!(tok.write(chunk), Ok(TokenizerResult::Done));
        }
        assert_eq!(tok.end(), TokenizerResult::Done);
        tok.sink
    }

    fn text(s: &str) -> Token {
        CharacterTokens(StrTendril::from_slice(s))
    }

    fn start_tag(name: &str, attrs: &[(&str, &str)]) -> Token {
        TagToken(Tag {
            kind: StartTag,
            name: LocalName::from(name),
            tag_id: TagId::from_name(name),
            self_closing: false,
            attrs: attrs
                .iter()
                .map(|&(name, value)| Attribute {
                    name: QualName::attr(name),
                    value: StrTendril::from_slice(value),
                })
                .collect(),
        })
    }

    #[test]
    fn tags_and_text() {
        let sink = tokenize(&["<p class=x>a b</p>"], TokenizerOpts::default());
        let tokens = sink.tokens.into_inner();
        assert_eq!(tokens[0], start_tag("p", &[("class", "x")]));
        assert_eq!(tokens[1], text("a b"));
        assert!(matches!(tokens[2], TagToken(Tag { kind: EndTag, tag_id: TagId::P, .. })));
        assert_eq!(tokens[3], EOFToken);
    }

    #[test]
    fn whitespace_is_split_into_its_own_tokens() {
        #[derive(Default)]
        struct Kinds(RefCell<Vec<&'static str>>);
        impl TokenSink for Kinds {
            type Handle = ();
            fn process_token(&self, token: Token, _: Span) -> TokenSinkResult<()> {
                self.0.borrow_mut().push(match token {
                    CharacterTokens(_) => "chars",
                    WhitespaceTokens(_) => "space",
                    _ => "other",
                });
                TokenSinkResult::Continue
            }
        }

        let tok = Tokenizer::new(Kinds::default(), TokenizerOpts::default());
        let _ = tok.write("  ab c\n");
        let _ = tok.end();
        assert_eq!(
            *tok.sink.0.borrow(),
            vec!["space", "chars", "space", "chars", "space", "other"]
        );
    }

    #[test]
    fn char_ref_split_across_chunks() {
        let whole = tokenize(&["x&amp;y"], TokenizerOpts::default());
        let split = tokenize(&["x&am", "p;y"], TokenizerOpts::default());
        assert_eq!(whole.tokens.into_inner(), split.tokens.into_inner());
        assert!(split.errors.borrow().is_empty());
    }

    #[test]
    fn legacy_reference_in_text_and_attribute() {
        let sink = tokenize(&["&amp x<a href='?a=1&amp=2'>"], TokenizerOpts::default());
        let tokens = sink.tokens.into_inner();
        assert_eq!(tokens[0], text("& x"));
        assert_eq!(tokens[1], start_tag("a", &[("href", "?a=1&amp=2")]));
        let errors = sink.errors.into_inner();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::MissingSemicolonAfterCharacterReference);
    }

    #[test]
    fn unknown_named_reference() {
        let sink = tokenize(&["&bogus; &"], TokenizerOpts::default());
        assert_eq!(sink.tokens.into_inner()[0], text("&bogus; &"));
        let errors = sink.errors.into_inner();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::UnknownNamedCharacterReference);
    }

    #[test]
    fn reference_errors_start_at_the_ampersand() {
        let opts = TokenizerOpts {
            source_location_tracking: true,
            ..Default::default()
        };
        let sink = tokenize(&["x &amp y &bogus; z"], opts);
        assert_eq!(sink.tokens.into_inner()[0], text("x & y &bogus; z"));
        let errors = sink.errors.into_inner();
        assert_eq!(errors.len(), 2);

        assert_eq!(errors[0].code, ErrorCode::MissingSemicolonAfterCharacterReference);
        assert_eq!((errors[0].start.line, errors[0].start.col, errors[0].start.offset), (1, 3, 2));
        assert_eq!(errors[0].end.offset, 6);

        assert_eq!(errors[1].code, ErrorCode::UnknownNamedCharacterReference);
        assert_eq!((errors[1].start.col, errors[1].start.offset), (10, 9));
        assert_eq!(errors[1].end.offset, 15);
    }

    #[test]
    fn backtick_in_unquoted_attribute_value() {
        for exact_errors in [false, true] {
            let opts = TokenizerOpts {
                exact_errors,
                ..Default::default()
            };
            let sink = tokenize(&["<a x=a`b`>"], opts);
            assert_eq!(sink.tokens.into_inner()[0], start_tag("a", &[("x", "a`b`")]));
            let errors = sink.errors.into_inner();
            assert_eq!(errors.len(), 2);
            assert!(errors
                .iter()
                .all(|e| e.code == ErrorCode::UnexpectedCharacterInUnquotedAttributeValue));
        }
    }

    #[test]
    fn cdata_outside_foreign_content_is_a_comment() {
        let sink = tokenize(&["<![CDATA[x]]>"], TokenizerOpts::default());
        assert_eq!(
            sink.tokens.into_inner()[0],
            CommentToken(StrTendril::from_slice("[CDATA[x]]"))
        );
        assert_eq!(sink.errors.into_inner()[0].code, ErrorCode::CdataInHtmlContent);
    }

    #[test]
    fn reconsume_across_crlf() {
        let sink = tokenize(&["<a\r", "\n>"], TokenizerOpts::default());
        assert_eq!(sink.tokens.into_inner()[0], start_tag("a", &[]));
    }

    #[test]
    fn bom_is_discarded_once() {
        let sink = tokenize(&["\u{feff}a\u{feff}"], TokenizerOpts::default());
        assert_eq!(sink.tokens.into_inner()[0], text("a\u{feff}"));
    }

    #[test]
    fn tag_spans_cover_the_tag() {
        let opts = TokenizerOpts {
            source_location_tracking: true,
            ..Default::default()
        };
        let sink = tokenize(&["ab\n<div id=x>"], opts);
        let span = sink.spans.into_inner()[0];
        assert_eq!((span.start.line, span.start.col, span.start.offset), (2, 1, 3));
        assert_eq!((span.end.line, span.end.col, span.end.offset), (2, 11, 13));
    }

    #[test]
    fn eof_in_tag() {
        let sink = tokenize(&["<div id="], TokenizerOpts::default());
        assert_eq!(sink.tokens.into_inner(), vec![EOFToken]);
        assert_eq!(sink.errors.into_inner()[0].code, ErrorCode::EofInTag);
    }

    #[test]
    fn write_after_end() {
        let tok = Tokenizer::new(Collector::default(), TokenizerOpts::default());
        let _ = tok.end();
        assert_eq!(tok.write("x"), Err(ParserError::WriteAfterEnd));
        assert_eq!(tok.resume(), Err(ParserError::ResumeWhenNotPaused));
        assert_eq!(tok.end(), TokenizerResult::Done);
    }

    #[test]
    fn pause_defers_input() {
        let tok = Tokenizer::new(Collector::default(), TokenizerOpts::default());
        tok.pause();
        assert_eq!(tok.write("<b>"), Ok(TokenizerResult::Done));
        assert_eq!(tok.end(), TokenizerResult::Done);
        assert!(tok.sink.tokens.borrow().is_empty());
        assert_eq!(tok.resume(), Ok(TokenizerResult::Done));
        assert_eq!(tok.sink.tokens.borrow().len(), 2);
    }

    #[test]
    fn exact_errors_report_control_characters() {
        let opts = TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        };
        let sink = tokenize(&["a\u{1}b"], opts);
        assert_eq!(sink.tokens.into_inner()[0], text("a\u{1}b"));
        assert_eq!(
            sink.errors.into_inner()[0].code,
            ErrorCode::ControlCharacterInInputStream
        );
    }
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The input stream preprocessor.
//!
//! Buffers the chunks written by the host and presents them to the
//! tokenizer as a single stream of code points, with newlines normalized
//! and the current position tracked in absolute terms. Consumed input is
//! dropped from the front of the buffer once enough of it accumulates.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;

use log::{trace, warn};
use tendril::StrTendril;

use crate::error::{ErrorCode, SourceLocation};
use crate::util::smallcharset::SmallCharSet;

pub use self::SetResult::{FromSet, NotFromSet};

/// How many consumed bytes may pile up before they are dropped.
const BUFFER_WATERLINE: usize = 1 << 16;

/// Result from [`Preprocessor::pop_except_from`] containing either a
/// character from a [`SmallCharSet`], or a string buffer of characters not
/// from the set.
#[derive(PartialEq, Eq, Debug)]
pub enum SetResult {
    /// A character from the `SmallCharSet`.
    FromSet(char),
    /// A block of text containing no characters from the `SmallCharSet`.
    NotFromSet(StrTendril),
}

/// One step of the input stream.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum InputChar {
    Char(char),
    /// Nothing buffered right now, but more input may still be written.
    EndOfChunk,
    /// The last chunk has been written and fully consumed.
    EndOfInput,
}

impl InputChar {
    #[inline]
    pub fn char(self) -> Option<char> {
        match self {
            InputChar::Char(c) => Some(c),
            _ => None,
        }
    }
}

fn is_control(c: char) -> bool {
    matches!(c as u32, 0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F..=0x9F)
}

fn is_noncharacter(c: char) -> bool {
    match c as u32 {
        0xFDD0..=0xFDEF => true,
        n => (n & 0xFFFE) == 0xFFFE,
    }
}

pub struct Preprocessor {
    /// Buffered input. Everything before `pos` has been consumed.
    html: RefCell<String>,

    /// Byte index of the next unconsumed character.
    pos: Cell<usize>,

    last_chunk_written: Cell<bool>,

    /// The previous character was a CR, so a following LF is dropped.
    skip_next_newline: Cell<bool>,

    /// Byte positions of LFs dropped after a CR.
    gaps: RefCell<Vec<usize>>,

    /// A high surrogate at the end of the last UTF-16 chunk.
    pending_high_surrogate: Cell<Option<u16>>,

    /// Byte positions of U+FFFD characters substituted for lone surrogates.
    replaced_surrogates: RefCell<VecDeque<usize>>,

    /// Input before this byte position has already been checked for
    /// control characters and noncharacters.
    checked_to: Cell<usize>,

    errors: RefCell<Vec<(ErrorCode, SourceLocation)>>,

    track_location: bool,
    exact_errors: bool,

    line: Cell<u64>,
    /// Characters consumed on the current line.
    col: Cell<u64>,
    /// `col` at the end of the previous line, so a retreat over a newline
    /// can restore it.
    prev_line_col: Cell<u64>,
    offset: Cell<u64>,
}

impl Preprocessor {
    pub fn new(track_location: bool, exact_errors: bool) -> Preprocessor {
        Preprocessor {
            html: RefCell::new(String::new()),
            pos: Cell::new(0),
            last_chunk_written: Cell::new(false),
            skip_next_newline: Cell::new(false),
            gaps: RefCell::new(vec![]),
            pending_high_surrogate: Cell::new(None),
            replaced_surrogates: RefCell::new(VecDeque::new()),
            checked_to: Cell::new(0),
            errors: RefCell::new(vec![]),
            track_location,
            exact_errors,
            line: Cell::new(1),
            col: Cell::new(0),
            prev_line_col: Cell::new(0),
            offset: Cell::new(0),
        }
    }

    /// Append a chunk of input. `is_last` marks the end of the stream.
    pub fn write(&self, chunk: &str, is_last: bool) {
        self.flush_pending_surrogate();
        self.html.borrow_mut().push_str(chunk);
        if is_last {
            self.last_chunk_written.set(true);
        }
    }

    /// Append a chunk of UTF-16 code units.
    ///
    /// A high surrogate at the end of a chunk is held back until the next
    /// chunk shows whether it starts with the matching low surrogate.
    pub fn write_utf16(&self, units: &[u16], is_last: bool) {
        let mut buf: Vec<u16> = self.pending_high_surrogate.take().into_iter().collect();
        buf.extend_from_slice(units);

        if !is_last {
            if let Some(&last) = buf.last() {
                if (0xD800..0xDC00).contains(&last) {
                    buf.pop();
                    self.pending_high_surrogate.set(Some(last));
                }
            }
        }

        {
            let mut html = self.html.borrow_mut();
            let mut replaced = self.replaced_surrogates.borrow_mut();
            for decoded in char::decode_utf16(buf) {
                match decoded {
                    Ok(c) => html.push(c),
                    Err(_) => {
                        replaced.push_back(html.len());
                        html.push('\u{fffd}');
                    },
                }
            }
        }

        if is_last {
            self.last_chunk_written.set(true);
        }
    }

    fn flush_pending_surrogate(&self) {
        if self.pending_high_surrogate.take().is_some() {
            let mut html = self.html.borrow_mut();
            self.replaced_surrogates.borrow_mut().push_back(html.len());
            html.push('\u{fffd}');
        }
    }

    /// Mark the end of the stream without writing more input.
    pub fn end(&self) {
        self.flush_pending_surrogate();
        self.last_chunk_written.set(true);
    }

    pub fn is_last_chunk_written(&self) -> bool {
        self.last_chunk_written.get()
    }

    fn end_sentinel(&self) -> InputChar {
        if self.last_chunk_written.get() && self.pending_high_surrogate.get().is_none() {
            InputChar::EndOfInput
        } else {
            InputChar::EndOfChunk
        }
    }

    /// Location of the next character to be consumed.
    pub fn location(&self) -> SourceLocation {
        if self.track_location {
            SourceLocation {
                line: self.line.get(),
                col: self.col.get() + 1,
                offset: self.offset.get(),
            }
        } else {
            SourceLocation {
                line: self.line.get(),
                col: 0,
                offset: 0,
            }
        }
    }

    fn bump(&self, c: char) {
        if c == '\n' {
            self.prev_line_col.set(self.col.get());
            self.line.set(self.line.get() + 1);
            self.col.set(0);
        } else if self.track_location {
            self.col.set(self.col.get() + 1);
        }
        if self.track_location {
            self.offset.set(self.offset.get() + 1);
        }
    }

    fn check_char(&self, pos: usize, c: char) {
        {
            let mut replaced = self.replaced_surrogates.borrow_mut();
            while replaced.front().is_some_and(|&p| p <= pos) {
                replaced.pop_front();
                self.errors
                    .borrow_mut()
                    .push((ErrorCode::SurrogateInInputStream, self.location()));
            }
        }

        if self.exact_errors && pos >= self.checked_to.get() {
            self.checked_to.set(pos + c.len_utf8());
            let code = if is_control(c) {
                Some(ErrorCode::ControlCharacterInInputStream)
            } else if is_noncharacter(c) {
                Some(ErrorCode::NoncharacterInInputStream)
            } else {
                None
            };
            if let Some(code) = code {
                self.errors.borrow_mut().push((code, self.location()));
            }
        }
    }

    /// Consume the next code point.
    pub fn advance(&self) -> InputChar {
        loop {
            let pos = self.pos.get();
            let c = match self.html.borrow()[pos..].chars().next() {
                Some(c) => c,
                None => return self.end_sentinel(),
            };

            if c == '\n' && self.skip_next_newline.get() {
                self.skip_next_newline.set(false);
                self.gaps.borrow_mut().push(pos);
                self.pos.set(pos + 1);
                if self.track_location {
                    self.offset.set(self.offset.get() + 1);
                }
                continue;
            }

            self.check_char(pos, c);
            self.skip_next_newline.set(c == '\r');
            self.pos.set(pos + c.len_utf8());
            let c = if c == '\r' { '\n' } else { c };
            self.bump(c);
            trace!("got character {:?}", c);
            return InputChar::Char(c);
        }
    }

    /// Look at the raw code point `offset` places past the next one,
    /// without consuming anything. No newline normalization is applied.
    pub fn peek(&self, offset: usize) -> InputChar {
        match self.html.borrow()[self.pos.get()..].chars().nth(offset) {
            Some(c) => InputChar::Char(c),
            None => self.end_sentinel(),
        }
    }

    /// Step back over the last `n` consumed code points.
    pub fn retreat(&self, n: usize) {
        let html = self.html.borrow();
        let mut gaps = self.gaps.borrow_mut();
        let mut pos = self.pos.get();

        for _ in 0..n {
            while pos > 0 && gaps.last() == Some(&(pos - 1)) {
                gaps.pop();
                pos -= 1;
                if self.track_location {
                    self.offset.set(self.offset.get() - 1);
                }
            }

            let c = match html[..pos].chars().next_back() {
                Some(c) => c,
                None => {
                    warn!("retreat past the start of the buffered input");
                    break;
                },
            };
            pos -= c.len_utf8();

            if c == '\n' || c == '\r' {
                self.line.set(self.line.get() - 1);
                self.col.set(self.prev_line_col.get());
            } else if self.track_location {
                self.col.set(self.col.get() - 1);
            }
            if self.track_location {
                self.offset.set(self.offset.get() - 1);
            }
        }

        self.skip_next_newline.set(html[..pos].ends_with('\r'));
        self.pos.set(pos);
    }

    /// Pops and returns either a single character from the given set, or
    /// a `StrTendril` of characters none of which are in the set. The set
    /// is represented as a bitmask and so can only contain the first 64
    /// ASCII characters.
    pub fn pop_except_from(&self, set: SmallCharSet) -> Option<SetResult> {
        let pos = self.pos.get();
        let run = {
            let html = self.html.borrow();
            let rest = &html[pos..];
            let n = set.nonmember_prefix_len(rest);
            if n == 0 {
                None
            } else {
                Some(StrTendril::from_slice(&rest[..n]))
            }
        };

        match run {
            Some(run) => {
                let end = pos + run.len();
                {
                    let mut replaced = self.replaced_surrogates.borrow_mut();
                    while replaced.front().is_some_and(|&p| p < end) {
                        replaced.pop_front();
                        self.errors
                            .borrow_mut()
                            .push((ErrorCode::SurrogateInInputStream, self.location()));
                    }
                }
                self.pos.set(end);
                self.skip_next_newline.set(false);
                if self.track_location {
                    let count = run.chars().count() as u64;
                    self.col.set(self.col.get() + count);
                    self.offset.set(self.offset.get() + count);
                }
                Some(NotFromSet(run))
            },
            None => self.advance().char().map(FromSet),
        }
    }

    /// Check if the next characters match `pat`, which must be non-empty
    /// ASCII without newlines, using `eq` to compare bytes.
    ///
    /// If so, consume them and return `Some(true)`. If they do not match,
    /// return `Some(false)`. If not enough characters are available to
    /// know, return `None`, unless the input has ended.
    pub fn eat(&self, pat: &str, eq: fn(&u8, &u8) -> bool) -> Option<bool> {
        let pos = self.pos.get();
        {
            let html = self.html.borrow();
            let rest = html[pos..].as_bytes();
            for (i, pattern_byte) in pat.bytes().enumerate() {
                match rest.get(i) {
                    None if self.last_chunk_written.get() => return Some(false),
                    None => return None,
                    Some(b) if !eq(b, &pattern_byte) => return Some(false),
                    Some(_) => (),
                }
            }
        }

        self.pos.set(pos + pat.len());
        self.skip_next_newline.set(false);
        if self.track_location {
            let n = pat.len() as u64;
            self.col.set(self.col.get() + n);
            self.offset.set(self.offset.get() + n);
        }
        Some(true)
    }

    /// The buffered input that has not been consumed yet.
    pub fn unconsumed(&self) -> Ref<'_, str> {
        let pos = self.pos.get();
        Ref::map(self.html.borrow(), |html| &html[pos..])
    }

    /// Take the input-stream errors found since the last call.
    pub fn take_errors(&self) -> Vec<(ErrorCode, SourceLocation)> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// Release the consumed prefix of the buffer once it grows large.
    ///
    /// Positions before the current one can no longer be retreated to.
    pub fn drop_consumed(&self) {
        let pos = self.pos.get();
        if pos < BUFFER_WATERLINE {
            return;
        }

        trace!("dropping {} consumed bytes", pos);
        self.html.borrow_mut().drain(..pos);
        self.pos.set(0);
        self.gaps.borrow_mut().clear();
        self.checked_to.set(self.checked_to.get().saturating_sub(pos));
        for p in self.replaced_surrogates.borrow_mut().iter_mut() {
            *p = p.saturating_sub(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(input: &Preprocessor) -> String {
        let mut out = String::new();
        while let InputChar::Char(c) = input.advance() {
            out.push(c);
        }
        out
    }

    #[test]
    fn normalizes_newlines() {
        let input = Preprocessor::new(true, false);
        input.write("a\r\nb\rc\n", true);
        assert_eq!(drain(&input), "a\nb\nc\n");
        assert_eq!(input.location().line, 4);
        assert_eq!(input.location().offset, 7);
    }

    #[test]
    fn cr_lf_split_across_chunks() {
        let input = Preprocessor::new(false, false);
        input.write("a\r", false);
        assert_eq!(drain(&input), "a\n");
        assert_eq!(input.advance(), InputChar::EndOfChunk);
        input.write("\nb", true);
        assert_eq!(drain(&input), "b");
        assert_eq!(input.advance(), InputChar::EndOfInput);
        assert_eq!(input.location().line, 2);
    }

    #[test]
    fn retreat_over_crlf_gap() {
        let input = Preprocessor::new(true, false);
        input.write("x\r\ny", true);
        assert_eq!(drain(&input), "x\ny");
        let end = input.location();

        input.retreat(2);
        assert_eq!(input.location().line, 1);
        assert_eq!(input.location().col, 2);
        assert_eq!(input.location().offset, 1);
        assert_eq!(drain(&input), "\ny");
        assert_eq!(input.location(), end);
    }

    #[test]
    fn retreat_one_after_gap() {
        let input = Preprocessor::new(true, false);
        input.write("\r\nz", true);
        assert_eq!(drain(&input), "\nz");
        input.retreat(1);
        assert_eq!(input.advance(), InputChar::Char('z'));
        assert_eq!(input.advance(), InputChar::EndOfInput);
    }

    #[test]
    fn columns_and_offsets() {
        let input = Preprocessor::new(true, false);
        input.write("ab\ncd", true);
        input.advance();
        input.advance();
        input.advance();
        let loc = input.location();
        assert_eq!((loc.line, loc.col, loc.offset), (2, 1, 3));
    }

    #[test]
    fn untracked_locations_keep_lines_only() {
        let input = Preprocessor::new(false, false);
        input.write("ab\ncd", true);
        drain(&input);
        let loc = input.location();
        assert_eq!((loc.line, loc.col, loc.offset), (2, 0, 0));
    }

    #[test]
    fn peek_reports_chunk_and_input_ends() {
        let input = Preprocessor::new(false, false);
        input.write("ab", false);
        assert_eq!(input.peek(1), InputChar::Char('b'));
        assert_eq!(input.peek(2), InputChar::EndOfChunk);
        input.end();
        assert_eq!(input.peek(2), InputChar::EndOfInput);
    }

    #[test]
    fn surrogate_pair_split_across_chunks() {
        let input = Preprocessor::new(false, false);
        let units: Vec<u16> = "a\u{1F600}b".encode_utf16().collect();
        input.write_utf16(&units[..2], false);
        assert_eq!(drain(&input), "a");
        assert_eq!(input.advance(), InputChar::EndOfChunk);
        input.write_utf16(&units[2..], true);
        assert_eq!(drain(&input), "\u{1F600}b");
        assert!(!input.has_errors());
    }

    #[test]
    fn lone_surrogate_at_end_is_replaced() {
        let input = Preprocessor::new(false, false);
        input.write_utf16(&[0x61, 0xD800], false);
        input.end();
        assert_eq!(drain(&input), "a\u{fffd}");
        let errors = input.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ErrorCode::SurrogateInInputStream);
    }

    #[test]
    fn pop_except_from_splits_runs() {
        let input = Preprocessor::new(true, false);
        input.write("héllo<b", true);
        let set = small_char_set!('<' '\n');
        assert_eq!(
            input.pop_except_from(set),
            Some(NotFromSet(StrTendril::from_slice("héllo")))
        );
        assert_eq!(input.pop_except_from(set), Some(FromSet('<')));
        assert_eq!(input.location().offset, 6);
    }

    #[test]
    fn eat_waits_for_more_input() {
        let input = Preprocessor::new(false, false);
        input.write("DOC", false);
        assert_eq!(input.eat("doctype", u8::eq_ignore_ascii_case), None);
        input.write("TYPE html", false);
        assert_eq!(input.eat("doctype", u8::eq_ignore_ascii_case), Some(true));
        assert_eq!(input.advance(), InputChar::Char(' '));
        assert_eq!(input.eat("xyz", u8::eq), Some(false));
    }

    #[test]
    fn exact_errors_report_once() {
        let input = Preprocessor::new(true, true);
        input.write("a\u{1}b", true);
        drain(&input);
        input.retreat(2);
        drain(&input);
        let errors = input.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ErrorCode::ControlCharacterInInputStream);
        assert_eq!(errors[0].1.col, 2);
    }

    #[test]
    fn drops_consumed_prefix() {
        let input = Preprocessor::new(true, false);
        let big = "x".repeat(BUFFER_WATERLINE + 10);
        input.write(&big, false);
        let set = small_char_set!('<');
        assert!(matches!(input.pop_except_from(set), Some(NotFromSet(_))));
        input.drop_consumed();
        assert_eq!(&*input.unconsumed(), "");
        input.write("<", true);
        assert_eq!(input.advance(), InputChar::Char('<'));
        assert_eq!(input.location().offset, BUFFER_WATERLINE as u64 + 11);
    }
}

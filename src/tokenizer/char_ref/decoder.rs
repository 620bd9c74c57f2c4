// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Incremental decoder for the text following an `&`.
//!
//! Named references are resolved by walking `DECODE_TREE`, the packed
//! trie generated by `build/entities.rs`. The decoder never looks at input
//! twice: when it runs out of text it returns `None` and picks up where it
//! left off on the next `write`.

use crate::error::ErrorCode;

include!(concat!(env!("OUT_DIR"), "/decode_tree.rs"));

const VALUE_LENGTH: u16 = 0b1100_0000_0000_0000;
const BRANCH_COUNT: u16 = 0b0011_1111_1000_0000;
const JUMP_OFFSET: u16 = 0b0000_0000_0111_1111;

/// Replacements for numeric references to C1 control characters.
static C1_REPLACEMENTS: [Option<char>; 32] = [
    Some('\u{20ac}'),
    None,
    Some('\u{201a}'),
    Some('\u{0192}'),
    Some('\u{201e}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02c6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017d}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201c}'),
    Some('\u{201d}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02dc}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203a}'),
    Some('\u{0153}'),
    None,
    Some('\u{017e}'),
    Some('\u{0178}'),
];

/// How a reference may end.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DecodeMode {
    /// Text content: legacy names are accepted without a `;`.
    Legacy,
    /// Only references terminated by `;` are decoded.
    Strict,
    /// Attribute values: like `Legacy`, but a legacy name followed by `=`
    /// or an ASCII alphanumeric is left alone.
    Attribute,
}

/// The decoded character(s) of a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharRef {
    /// The resulting character(s)
    pub chars: [char; 2],

    /// How many slots in `chars` are valid?
    pub num_chars: u8,
}

impl CharRef {
    fn one(c: char) -> CharRef {
        CharRef {
            chars: [c, '\0'],
            num_chars: 1,
        }
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars[..self.num_chars as usize]
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    EntityStart,
    NumericStart,
    NumericDecimal,
    NumericHex,
    NamedEntity,
}

pub struct CharRefDecoder {
    mode: DecodeMode,
    state: State,

    /// Characters of the reference so far, counting the `&`.
    consumed: usize,

    /// Numeric value, or for named references the trie index of the
    /// longest complete match so far (0 if none).
    result: u32,

    tree_index: usize,

    /// Characters read past the longest complete match.
    excess: usize,

    /// A legacy name was left alone because of the attribute value rule.
    rejected_in_attribute: bool,

    output: Option<CharRef>,
    errors: Vec<ErrorCode>,
}

fn value_length(node: u16) -> usize {
    ((node & VALUE_LENGTH) >> 14) as usize
}

/// Find the child of the node at `index` reached by `c`.
fn determine_branch(index: usize, c: char) -> Option<usize> {
    if !c.is_ascii() {
        return None;
    }
    let c = c as u16;
    let node = DECODE_TREE[index];
    let branch_count = ((node & BRANCH_COUNT) >> 7) as usize;
    let jump_offset = node & JUMP_OFFSET;
    let branches = index + 1 + 2 * value_length(node);

    if branch_count == 0 {
        return None;
    }

    if jump_offset != 0 {
        let slot = c.checked_sub(jump_offset)? as usize;
        if slot >= branch_count {
            return None;
        }
        return match DECODE_TREE[branches + slot] {
            0 => None,
            child => Some(child as usize),
        };
    }

    if branch_count == 1 {
        return if DECODE_TREE[branches] == c {
            Some(branches + 1)
        } else {
            None
        };
    }

    let keys = &DECODE_TREE[branches..branches + branch_count];
    keys.binary_search(&c)
        .ok()
        .map(|i| DECODE_TREE[branches + branch_count + i] as usize)
}

fn is_invalid_attribute_end(c: char) -> bool {
    c == '=' || c.is_ascii_alphanumeric()
}

impl CharRefDecoder {
    pub fn new(mode: DecodeMode) -> CharRefDecoder {
        CharRefDecoder {
            mode,
            state: State::EntityStart,
            consumed: 1,
            result: 0,
            tree_index: 0,
            excess: 1,
            rejected_in_attribute: false,
            output: None,
            errors: vec![],
        }
    }

    /// The decoded characters, once `write` or `end` reported a reference.
    pub fn output(&self) -> Option<CharRef> {
        self.output
    }

    /// After a zero-length result: was the text an alphanumeric run that
    /// matched no name? The tokenizer then passes it through as text.
    pub fn is_unknown_name(&self) -> bool {
        self.state == State::NamedEntity && !self.rejected_in_attribute
    }

    pub fn take_errors(&mut self) -> Vec<ErrorCode> {
        std::mem::take(&mut self.errors)
    }

    /// Feed the text after the `&`, starting at byte `offset` of `input`.
    ///
    /// Returns the length of the reference in characters, counting the
    /// `&`, or `Some(0)` if the text is not a reference. `None` means the
    /// input ran out before the reference could be resolved.
    pub fn write(&mut self, input: &str, offset: usize) -> Option<usize> {
        let mut chars = input[offset..].chars();
        loop {
            match self.state {
                State::EntityStart => {
                    let mut peek = chars.clone();
                    match peek.next() {
                        Some('#') => {
                            chars = peek;
                            self.consumed += 1;
                            self.state = State::NumericStart;
                        },
                        Some(_) => self.state = State::NamedEntity,
                        None => return None,
                    }
                },

                State::NumericStart => {
                    let mut peek = chars.clone();
                    match peek.next() {
                        Some('x') | Some('X') => {
                            chars = peek;
                            self.consumed += 1;
                            self.state = State::NumericHex;
                        },
                        Some(_) => self.state = State::NumericDecimal,
                        None => return None,
                    }
                },

                State::NumericDecimal => return self.numeric(chars, 10),
                State::NumericHex => return self.numeric(chars, 16),
                State::NamedEntity => return self.named(chars),
            }
        }
    }

    fn numeric(&mut self, chars: std::str::Chars, base: u32) -> Option<usize> {
        for c in chars {
            match c.to_digit(base) {
                Some(digit) => {
                    self.result = (self.result * base + digit).min(0x110000);
                    self.consumed += 1;
                },
                None => return Some(self.emit_numeric(Some(c))),
            }
        }
        None
    }

    fn emit_numeric(&mut self, last: Option<char>) -> usize {
        let expected_length = match self.state {
            State::NumericHex => 3,
            _ => 2,
        };

        if self.consumed <= expected_length {
            self.errors
                .push(ErrorCode::AbsenceOfDigitsInNumericCharacterReference);
            return 0;
        }

        if last == Some(';') {
            self.consumed += 1;
        } else if self.mode == DecodeMode::Strict {
            return 0;
        } else {
            self.errors
                .push(ErrorCode::MissingSemicolonAfterCharacterReference);
        }

        let c = self.replace_code_point(self.result);
        self.output = Some(CharRef::one(c));
        self.consumed
    }

    fn replace_code_point(&mut self, n: u32) -> char {
        let error = match n {
            0x00 => Some(ErrorCode::NullCharacterReference),
            n if n > 0x10FFFF => Some(ErrorCode::CharacterReferenceOutsideUnicodeRange),
            0xD800..=0xDFFF => Some(ErrorCode::SurrogateCharacterReference),
            0xFDD0..=0xFDEF => Some(ErrorCode::NoncharacterCharacterReference),
            n if (n & 0xFFFE) == 0xFFFE => Some(ErrorCode::NoncharacterCharacterReference),
            0x01..=0x08 | 0x0B | 0x0D..=0x1F | 0x7F..=0x9F => {
                Some(ErrorCode::ControlCharacterReference)
            },
            _ => None,
        };
        if let Some(error) = error {
            self.errors.push(error);
        }

        match n {
            0x80..=0x9F => C1_REPLACEMENTS[(n - 0x80) as usize]
                .unwrap_or_else(|| char::from_u32(n).unwrap_or('\u{fffd}')),
            n => char::from_u32(n)
                .filter(|&c| c != '\0')
                .unwrap_or('\u{fffd}'),
        }
    }

    fn named(&mut self, chars: std::str::Chars) -> Option<usize> {
        let mut node = DECODE_TREE[self.tree_index];

        for c in chars {
            let next = match determine_branch(self.tree_index, c) {
                Some(next) => next,
                None => {
                    if self.result == 0 {
                        return Some(0);
                    }
                    if self.mode == DecodeMode::Attribute
                        && (value_length(node) == 0 || is_invalid_attribute_end(c))
                    {
                        self.rejected_in_attribute = true;
                        return Some(0);
                    }
                    return Some(self.emit_not_terminated());
                },
            };

            self.tree_index = next;
            node = DECODE_TREE[next];

            if value_length(node) != 0 {
                if c == ';' {
                    return Some(self.emit_named(next, self.consumed + self.excess));
                }

                if self.mode != DecodeMode::Strict {
                    self.result = next as u32;
                    self.consumed += self.excess;
                    self.excess = 0;
                }
            }
            self.excess += 1;
        }

        None
    }

    fn emit_not_terminated(&mut self) -> usize {
        self.errors
            .push(ErrorCode::MissingSemicolonAfterCharacterReference);
        self.emit_named(self.result as usize, self.consumed)
    }

    fn emit_named(&mut self, index: usize, consumed: usize) -> usize {
        let node = DECODE_TREE[index];
        let mut out = CharRef {
            chars: ['\0'; 2],
            num_chars: 0,
        };
        for i in 0..value_length(node) {
            let hi = DECODE_TREE[index + 1 + 2 * i] as u32;
            let lo = DECODE_TREE[index + 2 + 2 * i] as u32;
            out.chars[i] = char::from_u32((hi << 16) | lo).unwrap_or('\u{fffd}');
            out.num_chars += 1;
        }
        self.output = Some(out);
        consumed
    }

    /// No more input will arrive. Returns the length of the reference, as
    /// for `write`.
    pub fn end(&mut self) -> usize {
        match self.state {
            State::NamedEntity => {
                if self.result == 0 {
                    0
                } else if self.mode == DecodeMode::Attribute
                    && self.result as usize != self.tree_index
                {
                    self.rejected_in_attribute = true;
                    0
                } else {
                    self.emit_not_terminated()
                }
            },
            State::NumericDecimal | State::NumericHex => self.emit_numeric(None),
            State::NumericStart => {
                self.errors
                    .push(ErrorCode::AbsenceOfDigitsInNumericCharacterReference);
                0
            },
            State::EntityStart => 0,
        }
    }
}

/// Decode every character reference in `text`.
pub fn decode_entities(text: &str, mode: DecodeMode) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let mut decoder = CharRefDecoder::new(mode);
        let length = match decoder.write(after, 0) {
            Some(length) => length,
            None => decoder.end(),
        };

        match decoder.output() {
            Some(char_ref) if length > 0 => {
                out.extend(char_ref.as_slice());
                let skip = after
                    .char_indices()
                    .nth(length - 1)
                    .map_or(after.len(), |(i, _)| i);
                rest = &after[skip..];
            },
            _ => {
                out.push('&');
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str, mode: DecodeMode) -> (usize, Option<CharRef>, Vec<ErrorCode>) {
        let mut decoder = CharRefDecoder::new(mode);
        let length = match decoder.write(input, 0) {
            Some(length) => length,
            None => decoder.end(),
        };
        (length, decoder.output(), decoder.take_errors())
    }

    fn chars(char_ref: Option<CharRef>) -> String {
        char_ref.map(|r| r.as_slice().iter().collect()).unwrap_or_default()
    }

    #[test]
    fn named_with_semicolon() {
        let (length, out, errors) = decode("amp;", DecodeMode::Legacy);
        assert_eq!(length, 5);
        assert_eq!(chars(out), "&");
        assert!(errors.is_empty());
    }

    #[test]
    fn decimal_and_hex() {
        let (length, out, _) = decode("#65;", DecodeMode::Legacy);
        assert_eq!((length, chars(out).as_str()), (5, "A"));
        let (length, out, _) = decode("#x41;", DecodeMode::Legacy);
        assert_eq!((length, chars(out).as_str()), (6, "A"));
        let (length, out, _) = decode("#X6a;", DecodeMode::Strict);
        assert_eq!((length, chars(out).as_str()), (6, "j"));
    }

    #[test]
    fn legacy_name_without_semicolon() {
        let (length, out, errors) = decode("amp ", DecodeMode::Legacy);
        assert_eq!(length, 4);
        assert_eq!(chars(out), "&");
        assert_eq!(errors, vec![ErrorCode::MissingSemicolonAfterCharacterReference]);
    }

    #[test]
    fn legacy_prefix_of_longer_name() {
        let (length, out, errors) = decode("notit;", DecodeMode::Legacy);
        assert_eq!(length, 4);
        assert_eq!(chars(out), "\u{ac}");
        assert_eq!(errors, vec![ErrorCode::MissingSemicolonAfterCharacterReference]);

        let (length, out, _) = decode("notin;", DecodeMode::Legacy);
        assert_eq!(length, 7);
        assert_eq!(chars(out), "\u{2209}");
    }

    #[test]
    fn attribute_mode_rejects_equals_and_alphanumerics() {
        assert_eq!(decode("amp=1", DecodeMode::Attribute).0, 0);
        assert_eq!(decode("ampx", DecodeMode::Attribute).0, 0);
        assert_eq!(decode("notit;", DecodeMode::Attribute).0, 0);
        let (length, out, _) = decode("amp&", DecodeMode::Attribute);
        assert_eq!((length, chars(out).as_str()), (4, "&"));
    }

    #[test]
    fn unknown_name_versus_attribute_rejection() {
        let mut decoder = CharRefDecoder::new(DecodeMode::Attribute);
        assert_eq!(decoder.write("notit;", 0), Some(0));
        assert!(!decoder.is_unknown_name());

        let mut decoder = CharRefDecoder::new(DecodeMode::Attribute);
        assert_eq!(decoder.write("bogus;", 0), Some(0));
        assert!(decoder.is_unknown_name());

        let mut decoder = CharRefDecoder::new(DecodeMode::Legacy);
        assert_eq!(decoder.write("#;", 0), Some(0));
        assert!(!decoder.is_unknown_name());
    }

    #[test]
    fn strict_mode_requires_semicolon() {
        assert_eq!(decode("amp ", DecodeMode::Strict).0, 0);
        assert_eq!(decode("#65 ", DecodeMode::Strict).0, 0);
    }

    #[test]
    fn unknown_name() {
        assert_eq!(decode("xyzzy;", DecodeMode::Legacy).0, 0);
        assert_eq!(decode(" ", DecodeMode::Legacy).0, 0);
    }

    #[test]
    fn two_code_point_reference() {
        let (length, out, _) = decode("NotEqualTilde;", DecodeMode::Legacy);
        assert_eq!(length, 15);
        assert_eq!(chars(out), "\u{2242}\u{338}");
    }

    #[test]
    fn astral_reference() {
        let (_, out, _) = decode("Afr;", DecodeMode::Legacy);
        assert_eq!(chars(out), "\u{1d504}");
    }

    #[test]
    fn numeric_edge_values() {
        let (_, out, errors) = decode("#0;", DecodeMode::Legacy);
        assert_eq!(chars(out), "\u{fffd}");
        assert_eq!(errors, vec![ErrorCode::NullCharacterReference]);

        let (_, out, errors) = decode("#x80;", DecodeMode::Legacy);
        assert_eq!(chars(out), "\u{20ac}");
        assert_eq!(errors, vec![ErrorCode::ControlCharacterReference]);

        let (_, out, errors) = decode("#xD800;", DecodeMode::Legacy);
        assert_eq!(chars(out), "\u{fffd}");
        assert_eq!(errors, vec![ErrorCode::SurrogateCharacterReference]);

        let (_, out, errors) = decode("#99999999999999;", DecodeMode::Legacy);
        assert_eq!(chars(out), "\u{fffd}");
        assert_eq!(errors, vec![ErrorCode::CharacterReferenceOutsideUnicodeRange]);
    }

    #[test]
    fn numeric_without_digits() {
        let (length, _, errors) = decode("#;", DecodeMode::Legacy);
        assert_eq!(length, 0);
        assert_eq!(errors, vec![ErrorCode::AbsenceOfDigitsInNumericCharacterReference]);
        assert_eq!(decode("#xg", DecodeMode::Legacy).0, 0);
    }

    #[test]
    fn resumes_across_writes() {
        let mut decoder = CharRefDecoder::new(DecodeMode::Legacy);
        assert_eq!(decoder.write("am", 0), None);
        assert_eq!(decoder.write("amp;", 2), Some(5));
        assert_eq!(chars(decoder.output()), "&");

        let mut decoder = CharRefDecoder::new(DecodeMode::Legacy);
        assert_eq!(decoder.write("#", 0), None);
        assert_eq!(decoder.write("#x", 1), None);
        assert_eq!(decoder.write("#x41", 2), None);
        assert_eq!(decoder.end(), 5);
        assert_eq!(chars(decoder.output()), "A");
    }

    #[test]
    fn end_in_attribute_after_longer_prefix() {
        let mut decoder = CharRefDecoder::new(DecodeMode::Attribute);
        assert_eq!(decoder.write("noti", 0), None);
        assert_eq!(decoder.end(), 0);

        let mut decoder = CharRefDecoder::new(DecodeMode::Attribute);
        assert_eq!(decoder.write("not", 0), None);
        assert_eq!(decoder.end(), 4);
    }

    #[test]
    fn decode_whole_strings() {
        assert_eq!(
            decode_entities("a &lt; b &amp c &#x263a;", DecodeMode::Legacy),
            "a < b & c \u{263a}"
        );
        assert_eq!(
            decode_entities("a &lt; b &amp c", DecodeMode::Strict),
            "a < b &amp c"
        );
        assert_eq!(decode_entities("&&;&", DecodeMode::Strict), "&&;&");
    }
}

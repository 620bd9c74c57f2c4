// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod decoder;

pub use self::decoder::{decode_entities, CharRef, CharRefDecoder, DecodeMode};

use super::{TokenSink, Tokenizer};
use crate::error::ErrorCode;
use crate::preprocessor::InputChar;

use log::debug;

pub(super) enum Status {
    Stuck,
    Progress,
    Done,
}

#[derive(Debug)]
enum State {
    Decoding,
    /// The ambiguous ampersand state: an alphanumeric run that named no
    /// reference is passed through as text.
    BogusName,
}

/// Drives a `CharRefDecoder` over the tokenizer's input.
///
/// The input is not consumed while the decoder works; it sees the
/// unconsumed text directly, and only the characters of a recognized
/// reference are consumed once it resolves.
pub(super) struct CharRefTokenizer {
    decoder: CharRefDecoder,
    state: State,

    /// Bytes of unconsumed input already handed to the decoder.
    fed: usize,
}

impl CharRefTokenizer {
    pub(super) fn new(mode: DecodeMode) -> CharRefTokenizer {
        CharRefTokenizer {
            decoder: CharRefDecoder::new(mode),
            state: State::Decoding,
            fed: 0,
        }
    }

    pub(super) fn step<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> Status {
        debug!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            State::Decoding => self.decode(tokenizer),
            State::BogusName => match tokenizer.input.peek(0) {
                InputChar::Char(c) if c.is_ascii_alphanumeric() => {
                    tokenizer.discard_char();
                    tokenizer.process_char_ref(c);
                    Status::Progress
                },
                InputChar::Char(';') => {
                    tokenizer.emit_char_ref_error(ErrorCode::UnknownNamedCharacterReference);
                    Status::Done
                },
                InputChar::Char(_) | InputChar::EndOfInput => Status::Done,
                InputChar::EndOfChunk => Status::Stuck,
            },
        }
    }

    fn decode<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> Status {
        let written = {
            let input = tokenizer.input.unconsumed();
            let written = self.decoder.write(&input, self.fed);
            self.fed = input.len();
            written
        };

        let length = match written {
            Some(length) => length,
            None if tokenizer.input.is_last_chunk_written() => self.decoder.end(),
            None => return Status::Stuck,
        };

        let errors = self.decoder.take_errors();

        match self.decoder.output() {
            Some(char_ref) if length > 0 => {
                // The '&' itself was consumed before decoding started.
                for _ in 1..length {
                    tokenizer.discard_char();
                }
                for error in errors {
                    tokenizer.emit_char_ref_error(error);
                }
                for &c in char_ref.as_slice() {
                    tokenizer.process_char_ref(c);
                }
                Status::Done
            },
            _ => {
                for error in errors {
                    tokenizer.emit_char_ref_error(error);
                }
                tokenizer.process_char_ref('&');
                if self.decoder.is_unknown_name() {
                    self.state = State::BogusName;
                    Status::Progress
                } else {
                    Status::Done
                }
            },
        }
    }
}

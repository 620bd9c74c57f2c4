// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A streaming HTML parser.
//!
//! Input arrives in chunks of UTF-8 or UTF-16 through a [`Parser`]. The
//! tokenizer turns it into tokens, and the tree builder turns those into
//! calls on a caller-supplied [`TreeSink`]. [`ArenaDom`] is a ready-made
//! sink.

#![allow(clippy::new_without_default)]

#[macro_use]
extern crate mac;

pub use crate::arena::{ArenaDom, NodeData, NodeId};
pub use crate::driver::{parse_document, parse_fragment, tokenize_to, ParseOpts, Parser};
pub use crate::error::{Diagnostic, ErrorCode, ParserError, SourceLocation, Span};
pub use crate::interface::*;
pub use crate::serialize::serialize;
pub use crate::tokenizer::char_ref::{decode_entities, DecodeMode};

#[macro_use]
mod util;

pub mod error;
pub mod interface;
pub mod tag_id;
pub mod preprocessor;
pub mod tokenizer;
pub mod tree_builder;
pub mod driver;
pub mod arena;
pub mod serialize;

/// Re-export the tendril crate.
pub mod tendril {
    pub use ::tendril::*;
}

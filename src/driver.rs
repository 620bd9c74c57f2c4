// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! High-level interface to the parser.

use crate::error::ParserError;
use crate::interface::TreeSink;
use crate::tokenizer::{TokenSink, Tokenizer, TokenizerOpts, TokenizerResult};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

use log::warn;

/// All-encompassing options struct for the parser.
#[derive(Clone, Debug, Default)]
pub struct ParseOpts {
    /// Tokenizer options.
    pub tokenizer: TokenizerOpts,

    /// Tree builder options.
    pub tree_builder: TreeBuilderOpts,
}

impl ParseOpts {
    /// Parse `<noscript>` as raw text (scripting on) or as markup.
    pub fn with_scripting(mut self, enabled: bool) -> ParseOpts {
        self.tree_builder.scripting_enabled = enabled;
        self
    }

    /// Track columns and offsets, and stamp elements with their location.
    pub fn with_source_locations(mut self, enabled: bool) -> ParseOpts {
        self.tokenizer.source_location_tracking = enabled;
        self.tree_builder.source_location_tracking = enabled;
        self
    }

    /// Report every parse error, including per-code-point input checks.
    pub fn with_exact_errors(mut self, enabled: bool) -> ParseOpts {
        self.tokenizer.exact_errors = enabled;
        self.tree_builder.exact_errors = enabled;
        self
    }
}

/// Parse an HTML document.
///
/// The returned parser accepts input through `write` and `end`;
/// `finish` hands back the sink's output.
///
/// ## Example
///
/// ```ignore
/// let dom = parse_document(ArenaDom::default(), ParseOpts::default())
///     .one("<title>Hi</title><p>Hello");
/// ```
pub fn parse_document<Sink>(sink: Sink, opts: ParseOpts) -> Parser<Sink>
where
    Sink: TreeSink,
{
    let tb = TreeBuilder::new(sink, opts.tree_builder);
    let tok = Tokenizer::new(tb, opts.tokenizer);
    Parser { tokenizer: tok }
}

/// Parse an HTML fragment in the context of an element.
///
/// The context element is only inspected. The fragment's nodes become
/// children of a new root `<html>` element in the sink's document.
pub fn parse_fragment<Sink>(sink: Sink, mut opts: ParseOpts, context_elem: Sink::Handle) -> Parser<Sink>
where
    Sink: TreeSink,
{
    let context_name = sink.get_tag_name(&context_elem);
    let tb = TreeBuilder::new_for_fragment(sink, context_elem, None, opts.tree_builder);
    opts.tokenizer.initial_state =
        Some(tb.tokenizer_state_for_context_elem(opts.tree_builder.scripting_enabled));
    opts.tokenizer.last_start_tag_name = Some(context_name.to_string());
    let tok = Tokenizer::new(tb, opts.tokenizer);
    Parser { tokenizer: tok }
}

/// An HTML parser, ready to receive input.
pub struct Parser<Sink>
where
    Sink: TreeSink,
{
    pub tokenizer: Tokenizer<TreeBuilder<Sink::Handle, Sink>>,
}

impl<Sink> Parser<Sink>
where
    Sink: TreeSink,
{
    /// Feed a chunk of text.
    ///
    /// Returns `TokenizerResult::Script` when a `</script>` completes. The
    /// parser is then paused until `resume()`.
    pub fn write(&self, chunk: &str) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        self.tokenizer.write(chunk)
    }

    /// Feed a chunk of UTF-16 code units.
    pub fn write_utf16(&self, units: &[u16]) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        self.tokenizer.write_utf16(units)
    }

    /// Signal the end of input.
    pub fn end(&self) -> TokenizerResult<Sink::Handle> {
        self.tokenizer.end()
    }

    pub fn pause(&self) {
        self.tokenizer.pause()
    }

    pub fn is_paused(&self) -> bool {
        self.tokenizer.is_paused()
    }

    pub fn resume(&self) -> Result<TokenizerResult<Sink::Handle>, ParserError> {
        self.tokenizer.resume()
    }

    /// The tree sink, for inspecting or changing the tree while paused.
    pub fn sink(&self) -> &Sink {
        &self.tokenizer.sink.sink
    }

    /// Consume the parser and return the sink's output.
    pub fn finish(self) -> Sink::Output {
        self.tokenizer.sink.sink.finish()
    }

    /// Parse a complete document in one go, resuming past every script.
    pub fn one(self, input: &str) -> Sink::Output {
        match self.write(input) {
            Ok(result) => self.run_to_completion(result),
            Err(e) => warn!("{}", e),
        }
        let result = self.end();
        self.run_to_completion(result);
        self.finish()
    }

    fn run_to_completion(&self, mut result: TokenizerResult<Sink::Handle>) {
        while let TokenizerResult::Script(_) = result {
            result = match self.resume() {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}", e);
                    return;
                },
            };
        }
    }
}

/// Tokenize and send results to a `TokenSink`.
///
/// Scripts reported by the sink are resumed past immediately.
///
/// ## Example
///
/// ```ignore
/// let sink = tokenize_to(MySink::default(), ["<p>one", " two"], TokenizerOpts::default());
/// ```
pub fn tokenize_to<Sink, It>(sink: Sink, input: It, opts: TokenizerOpts) -> Sink
where
    Sink: TokenSink,
    It: IntoIterator,
    It::Item: AsRef<str>,
{
    let tok = Tokenizer::new(sink, opts);
    let drive = |mut result: TokenizerResult<Sink::Handle>| {
        while let TokenizerResult::Script(_) = result {
            result = match tok.resume() {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}", e);
                    return;
                },
            };
        }
    };

    for chunk in input {
        match tok.write(chunk.as_ref()) {
            Ok(result) => drive(result),
            Err(e) => warn!("{}", e),
        }
    }
    drive(tok.end());
    tok.sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaDom;

    #[test]
    fn options_keep_both_halves_in_step() {
        let opts = ParseOpts::default()
            .with_source_locations(true)
            .with_scripting(false);
        assert!(opts.tokenizer.source_location_tracking);
        assert!(opts.tree_builder.source_location_tracking);
        assert!(!opts.tree_builder.scripting_enabled);
    }

    #[test]
    fn one_runs_past_scripts() {
        let dom = parse_document(ArenaDom::default(), ParseOpts::default())
            .one("<script>x</script><p>after");
        let body = dom.find_element(dom.document(), "body").unwrap();
        assert_eq!(dom.inner_html(body), "<p>after</p>");
    }
}

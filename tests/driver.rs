// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;

use html5stream::error::Span;
use html5stream::tokenizer::{TagToken, Token, TokenSink, TokenSinkResult, TokenizerOpts};
use html5stream::tokenizer::TokenizerResult;
use html5stream::{parse_document, tokenize_to, ArenaDom, ParseOpts, ParserError, TreeSink};
use html5stream::{NodeData, SourceLocation};

const DOC: &str = "<!DOCTYPE html><title>T &amp; U</title>\
    <table><tr><td>a<b>b</td></tr></table><p>caf\u{e9} \u{1F600}<!-- c --></p>";

fn parse_chunks(chunks: &[&str]) -> ArenaDom {
    let parser = parse_document(ArenaDom::default(), ParseOpts::default());
    for chunk in chunks {
        assert_eq!(parser.write(chunk), Ok(TokenizerResult::Done));
    }
    assert_eq!(parser.end(), TokenizerResult::Done);
    parser.finish()
}

fn html_of(dom: &ArenaDom) -> String {
    dom.inner_html(dom.document())
}

#[test]
fn chunking_does_not_change_the_tree() {
    let whole = html_of(&parse_chunks(&[DOC]));

    let chars: Vec<String> = DOC.chars().map(|c| c.to_string()).collect();
    let chars: Vec<&str> = chars.iter().map(|s| s.as_str()).collect();
    assert_eq!(html_of(&parse_chunks(&chars)), whole);

    for (i, _) in DOC.char_indices() {
        assert_eq!(html_of(&parse_chunks(&[&DOC[..i], &DOC[i..]])), whole);
    }
}

#[test]
fn utf16_input_builds_the_same_tree() {
    let units: Vec<u16> = DOC.encode_utf16().collect();
    let parser = parse_document(ArenaDom::default(), ParseOpts::default());
    for chunk in units.chunks(3) {
        assert_eq!(parser.write_utf16(chunk), Ok(TokenizerResult::Done));
    }
    assert_eq!(parser.end(), TokenizerResult::Done);
    assert_eq!(html_of(&parser.finish()), html_of(&parse_chunks(&[DOC])));
}

#[test]
fn lone_surrogate_becomes_replacement_character() {
    let parser = parse_document(ArenaDom::default(), ParseOpts::default());
    let units: Vec<u16> = "<p>a".encode_utf16().chain([0xD800]).collect();
    let _ = parser.write_utf16(&units);
    let _ = parser.end();
    let dom = parser.finish();
    let p = dom.find_element(dom.document(), "p").unwrap();
    assert_eq!(dom.text_content(p), "a\u{fffd}");
}

#[test]
fn leading_bom_is_dropped() {
    let dom = parse_document(ArenaDom::default(), ParseOpts::default()).one("\u{feff}<p>x");
    let body = dom.find_element(dom.document(), "body").unwrap();
    assert_eq!(dom.inner_html(body), "<p>x</p>");
}

#[test]
fn script_end_tag_suspends_the_parser() {
    let parser = parse_document(ArenaDom::default(), ParseOpts::default());
    let script = match parser.write("<script>go()</script><p>after") {
        Ok(TokenizerResult::Script(node)) => node,
        other => panic!("expected a script, got {:?}", other),
    };
    assert!(parser.is_paused());
    assert_eq!(&*parser.sink().get_tag_name(&script), "script");
    assert_eq!(parser.sink().text_content(script), "go()");
    match parser.sink().node(script).data {
        NodeData::Element {
            script_already_started,
            ..
        } => assert!(!script_already_started),
        ref other => panic!("not an element: {:?}", other),
    }

    // Nothing after the script has been parsed yet.
    let doc = parser.sink().document();
    assert_eq!(parser.sink().find_element(doc, "p"), None);

    // Input written while paused waits for resume().
    assert_eq!(parser.write("<i>x"), Ok(TokenizerResult::Done));
    assert_eq!(parser.sink().find_element(doc, "i"), None);

    assert_eq!(parser.resume(), Ok(TokenizerResult::Done));
    assert!(!parser.is_paused());
    assert_eq!(parser.end(), TokenizerResult::Done);

    let dom = parser.finish();
    let body = dom.find_element(dom.document(), "body").unwrap();
    assert_eq!(dom.inner_html(body), "<p>after<i>x</i></p>");
}

#[test]
fn host_misuse_is_reported() {
    let parser = parse_document(ArenaDom::default(), ParseOpts::default());
    assert_eq!(parser.resume(), Err(ParserError::ResumeWhenNotPaused));
    assert_eq!(parser.write("<p>"), Ok(TokenizerResult::Done));
    assert_eq!(parser.end(), TokenizerResult::Done);
    assert_eq!(parser.write("x"), Err(ParserError::WriteAfterEnd));
    assert_eq!(parser.write_utf16(&[0x78]), Err(ParserError::WriteAfterEnd));
    // A second end() is harmless.
    assert_eq!(parser.end(), TokenizerResult::Done);
}

#[test]
fn elements_carry_their_source_location() {
    let opts = ParseOpts::default().with_source_locations(true);
    let dom = parse_document(ArenaDom::default(), opts).one("<p>a</p>\n  <div id=x>");
    let doc = dom.document();

    let p = dom.find_element(doc, "p").unwrap();
    assert_eq!(
        dom.node(p).source_location,
        Some(SourceLocation {
            line: 1,
            col: 1,
            offset: 0
        })
    );

    let div = dom.find_element(doc, "div").unwrap();
    assert_eq!(
        dom.node(div).source_location,
        Some(SourceLocation {
            line: 2,
            col: 3,
            offset: 11
        })
    );
}

#[test]
fn locations_are_off_by_default() {
    let dom = parse_document(ArenaDom::default(), ParseOpts::default()).one("<p>a");
    let p = dom.find_element(dom.document(), "p").unwrap();
    assert_eq!(dom.node(p).source_location, None);
}

#[test]
fn diagnostics_report_lines() {
    let dom = parse_document(ArenaDom::default(), ParseOpts::default())
        .one("<!DOCTYPE html>\n\n</x>");
    let errors = dom.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].start.line, 3);
}

#[derive(Default)]
struct TagNames(RefCell<Vec<String>>);

impl TokenSink for TagNames {
    type Handle = ();

    fn process_token(&self, token: Token, _span: Span) -> TokenSinkResult<()> {
        if let TagToken(tag) = token {
            self.0.borrow_mut().push(tag.name.to_string());
        }
        TokenSinkResult::Continue
    }
}

#[test]
fn tokenize_to_feeds_every_chunk() {
    let sink = tokenize_to(
        TagNames::default(),
        ["<a><b", "r></", "a>"],
        TokenizerOpts::default(),
    );
    assert_eq!(sink.0.into_inner(), vec!["a", "br", "a"]);
}

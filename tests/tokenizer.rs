// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use html5stream::error::Span;
use html5stream::tokenizer::states::{RawKind, State};
use html5stream::tokenizer::{CharacterTokens, CommentToken, DoctypeToken, EOFToken};
use html5stream::tokenizer::{NullCharacterToken, ParseError, TagToken, WhitespaceTokens};
use html5stream::tokenizer::{EndTag, StartTag, Token, TokenSink, TokenSinkResult};
use html5stream::tokenizer::{Tokenizer, TokenizerOpts, TokenizerResult};

/// A token as the html5lib test format writes it.
#[derive(PartialEq, Eq, Debug, Clone)]
enum Expected {
    Doctype(Option<String>, Option<String>, Option<String>, bool),
    StartTag(String, Vec<(String, String)>, bool),
    EndTag(String),
    Comment(String),
    Character(String),
}

// Collects tokens and merges adjacent text, since chunking decides where
// character runs break.
#[derive(Default)]
struct TokenLogger {
    tokens: RefCell<Vec<Expected>>,
    errors: RefCell<Vec<String>>,
}

impl TokenLogger {
    fn push_str(&self, s: &str) {
        let mut tokens = self.tokens.borrow_mut();
        if let Some(Expected::Character(last)) = tokens.last_mut() {
            last.push_str(s);
            return;
        }
        tokens.push(Expected::Character(s.to_string()));
    }
}

impl TokenSink for TokenLogger {
    type Handle = ();

    fn process_token(&self, token: Token, _span: Span) -> TokenSinkResult<()> {
        let token = match token {
            CharacterTokens(b) | WhitespaceTokens(b) => {
                self.push_str(&b);
                return TokenSinkResult::Continue;
            },
            NullCharacterToken => {
                self.push_str("\0");
                return TokenSinkResult::Continue;
            },
            ParseError(diagnostic) => {
                self.errors.borrow_mut().push(diagnostic.code.as_str().to_string());
                return TokenSinkResult::Continue;
            },
            EOFToken => return TokenSinkResult::Continue,

            DoctypeToken(d) => Expected::Doctype(
                d.name.map(|s| s.to_string()),
                d.public_id.map(|s| s.to_string()),
                d.system_id.map(|s| s.to_string()),
                !d.force_quirks,
            ),
            TagToken(t) => match t.kind {
                StartTag => {
                    let mut attrs: Vec<(String, String)> = t
                        .attrs
                        .iter()
                        .map(|a| (a.name.local.to_string(), a.value.to_string()))
                        .collect();
                    attrs.sort();
                    Expected::StartTag(t.name.to_string(), attrs, t.self_closing)
                },
                EndTag => Expected::EndTag(t.name.to_string()),
            },
            CommentToken(c) => Expected::Comment(c.to_string()),
        };
        self.tokens.borrow_mut().push(token);
        TokenSinkResult::Continue
    }
}

fn tokenize(chunks: &[String], opts: TokenizerOpts) -> TokenLogger {
    let tok = Tokenizer::new(TokenLogger::default(), opts);
    for chunk in chunks {
        assert_eq!(tok.write(chunk), Ok(TokenizerResult::Done));
    }
    assert_eq!(tok.end(), TokenizerResult::Done);
    tok.sink
}

// The whole input, one chunk per character, and every two-way split.
fn chunkings(input: &str) -> Vec<Vec<String>> {
    let mut out = vec![vec![input.to_string()]];
    out.push(input.chars().map(|c| c.to_string()).collect());
    for (i, _) in input.char_indices().skip(1) {
        out.push(vec![input[..i].to_string(), input[i..].to_string()]);
    }
    out
}

fn get_str(js: &Value) -> String {
    js.as_str().expect("not a string").to_string()
}

fn get_nullable_str(js: &Value) -> Option<String> {
    match *js {
        Value::Null => None,
        ref s => Some(get_str(s)),
    }
}

fn json_to_token(js: &Value) -> Expected {
    let parts = js.as_array().expect("token is not an array");
    match (parts[0].as_str().expect("token kind"), &parts[1..]) {
        ("DOCTYPE", [name, public_id, system_id, correct]) => Expected::Doctype(
            get_nullable_str(name),
            get_nullable_str(public_id),
            get_nullable_str(system_id),
            correct.as_bool().expect("not a bool"),
        ),

        ("StartTag", [name, attrs, rest @ ..]) => {
            let mut attrs: Vec<(String, String)> = attrs
                .as_object()
                .expect("attrs is not an object")
                .iter()
                .map(|(k, v)| (k.clone(), get_str(v)))
                .collect();
            attrs.sort();
            let self_closing = rest.first().and_then(Value::as_bool).unwrap_or(false);
            Expected::StartTag(get_str(name), attrs, self_closing)
        },

        ("EndTag", [name]) => Expected::EndTag(get_str(name)),
        ("Comment", [text]) => Expected::Comment(get_str(text)),
        ("Character", [text]) => Expected::Character(get_str(text)),

        _ => panic!("don't understand token {:?}", parts),
    }
}

// Adjacent "Character" entries merge just as they do in the logger.
fn json_to_tokens(js: &Value) -> Vec<Expected> {
    let mut out: Vec<Expected> = vec![];
    for token in js.as_array().expect("output is not an array") {
        let token = json_to_token(token);
        if let (Expected::Character(s), Some(Expected::Character(last))) = (&token, out.last_mut()) {
            last.push_str(s);
            continue;
        }
        out.push(token);
    }
    out
}

fn initial_state(name: &str) -> State {
    match name {
        "Data state" => State::Data,
        "PLAINTEXT state" => State::Plaintext,
        "RAWTEXT state" => State::RawData(RawKind::Rawtext),
        "RCDATA state" => State::RawData(RawKind::Rcdata),
        "Script data state" => State::RawData(RawKind::ScriptData),
        s => panic!("don't know state {}", s),
    }
}

fn run_test(file: &str, js: &Value, failures: &mut Vec<String>) {
    let desc = get_str(&js["description"]);
    let input = get_str(&js["input"]);
    let expect = json_to_tokens(&js["output"]);
    let expect_errors: Option<Vec<String>> = js.get("errors").map(|errors| {
        let mut codes: Vec<String> = errors
            .as_array()
            .expect("errors is not an array")
            .iter()
            .map(|e| get_str(&e["code"]))
            .collect();
        codes.sort();
        codes
    });
    let last_start_tag = js.get("lastStartTag").map(get_str);
    let states: Vec<Option<State>> = match js.get("initialStates") {
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| Some(initial_state(name.as_str().expect("state name"))))
            .collect(),
        _ => vec![None],
    };

    for state in states {
        for chunks in chunkings(&input) {
            let opts = TokenizerOpts {
                initial_state: state,
                last_start_tag_name: last_start_tag.clone(),
                // Test inputs keep a leading BOM as text.
                discard_bom: false,
                ..Default::default()
            };
            let sink = tokenize(&chunks, opts);
            let tokens = sink.tokens.into_inner();
            if tokens != expect {
                failures.push(format!(
                    "{}: {} (state {:?})\ninput: {:?}\ngot: {:?}\nexpected: {:?}",
                    file, desc, state, chunks, tokens, expect
                ));
                return;
            }

            // Errors are checked once, on the unsplit input.
            if chunks.len() == 1 && chunks[0] == input {
                if let Some(ref expect_errors) = expect_errors {
                    let mut errors = sink.errors.into_inner();
                    errors.sort();
                    if errors != *expect_errors {
                        failures.push(format!(
                            "{}: {} (state {:?})\ngot errors: {:?}\nexpected: {:?}",
                            file, desc, state, errors, expect_errors
                        ));
                        return;
                    }
                }
            }
        }
    }
}

// Shows the parser's `log` output with RUST_LOG=html5stream=debug.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn html5lib_format_tokenizer_tests() {
    init_logging();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/tokenizer");
    let mut paths: Vec<_> = fs::read_dir(&dir)
        .expect("tokenizer test directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "test"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty());

    let mut count = 0;
    let mut failures = vec![];
    for path in paths {
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        let text = fs::read_to_string(&path).unwrap();
        let js: Value = serde_json::from_str(&text).expect("json parse error");
        for test in js["tests"].as_array().expect("no tests array") {
            count += 1;
            run_test(&file, test, &mut failures);
        }
    }

    assert!(count > 0);
    if !failures.is_empty() {
        panic!("{} of {} tokenizer tests failed:\n\n{}", failures.len(), count, failures.join("\n\n"));
    }
}

#[test]
fn exact_errors_report_control_characters() {
    let opts = TokenizerOpts {
        exact_errors: true,
        ..Default::default()
    };
    let sink = tokenize(&["a\u{1}b".to_string()], opts);
    assert_eq!(sink.tokens.into_inner(), vec![Expected::Character("a\u{1}b".to_string())]);
    assert_eq!(
        sink.errors.into_inner(),
        vec!["control-character-in-input-stream".to_string()]
    );
}

#[test]
fn utf16_input_matches_utf8() {
    let text = "<p title=\"\u{1F600}\">caf\u{e9}</p>";
    let units: Vec<u16> = text.encode_utf16().collect();

    let tok = Tokenizer::new(TokenLogger::default(), TokenizerOpts::default());
    // Split inside the surrogate pair.
    let (a, b) = units.split_at(11);
    assert_eq!(tok.write_utf16(a), Ok(TokenizerResult::Done));
    assert_eq!(tok.write_utf16(b), Ok(TokenizerResult::Done));
    assert_eq!(tok.end(), TokenizerResult::Done);

    let utf8 = tokenize(&[text.to_string()], TokenizerOpts::default());
    assert_eq!(tok.sink.tokens.into_inner(), utf8.tokens.into_inner());
}

#[test]
fn backtick_in_unquoted_attribute_value() {
    for chunks in chunkings("<a x=a`b>") {
        let sink = tokenize(&chunks, TokenizerOpts::default());
        assert_eq!(
            sink.tokens.into_inner(),
            vec![Expected::StartTag(
                "a".to_string(),
                vec![("x".to_string(), "a`b".to_string())],
                false
            )],
            "chunks: {:?}",
            chunks
        );
        assert_eq!(
            sink.errors.into_inner(),
            vec!["unexpected-character-in-unquoted-attribute-value".to_string()]
        );
    }
}

#[test]
fn unpaired_surrogate_at_end_of_utf16_input() {
    let tok = Tokenizer::new(TokenLogger::default(), TokenizerOpts::default());
    assert_eq!(tok.write_utf16(&[0x61, 0xD83D]), Ok(TokenizerResult::Done));
    assert_eq!(tok.end(), TokenizerResult::Done);
    assert_eq!(
        tok.sink.tokens.into_inner(),
        vec![Expected::Character("a\u{fffd}".to_string())]
    );
    assert_eq!(
        tok.sink.errors.into_inner(),
        vec!["surrogate-in-input-stream".to_string()]
    );
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::fs;
use std::mem;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use html5stream::tree_builder::TreeBuilderOpts;
use html5stream::{parse_document, parse_fragment, ParseOpts};
use html5stream::{ArenaDom, LocalName, Namespace, NodeData, NodeId, QualName, TreeSink};

fn parse_tests<It: Iterator<Item = String>>(lines: It) -> Vec<HashMap<String, String>> {
    let mut tests = vec![];
    let mut test = HashMap::new();
    let mut key: Option<String> = None;
    let mut val = String::new();

    macro_rules! finish_val {
        () => {
            if let Some(key) = key.take() {
                assert!(test.insert(key, mem::take(&mut val)).is_none());
            }
        };
    }

    macro_rules! finish_test {
        () => {
            if !test.is_empty() {
                tests.push(mem::take(&mut test));
            }
        };
    }

    for line in lines {
        if let Some(name) = line.strip_prefix('#') {
            finish_val!();
            if line == "#data" {
                finish_test!();
            }
            key = Some(name.to_string());
        } else {
            val.push_str(&line);
            val.push('\n');
        }
    }

    finish_val!();
    finish_test!();
    tests
}

fn push_indent(buf: &mut String, indent: usize) {
    buf.push('|');
    buf.push_str(&" ".repeat(indent));
}

fn dump(buf: &mut String, indent: usize, dom: &ArenaDom, id: NodeId) {
    push_indent(buf, indent);

    let node = dom.node(id);
    match node.data {
        NodeData::Document | NodeData::DocumentFragment => panic!("should not reach a document"),

        NodeData::Doctype {
            ref name,
            ref public_id,
            ref system_id,
        } => {
            buf.push_str("<!DOCTYPE ");
            buf.push_str(name);
            if !public_id.is_empty() || !system_id.is_empty() {
                buf.push_str(&format!(" \"{}\" \"{}\"", public_id, system_id));
            }
            buf.push_str(">\n");
        },

        NodeData::Text(ref text) => {
            buf.push('"');
            buf.push_str(text);
            buf.push_str("\"\n");
        },

        NodeData::Comment(ref text) => {
            buf.push_str("<!-- ");
            buf.push_str(text);
            buf.push_str(" -->\n");
        },

        NodeData::Element {
            ref name,
            ref attrs,
            template_contents,
            ..
        } => {
            buf.push('<');
            match name.ns {
                Namespace::Svg => buf.push_str("svg "),
                Namespace::MathMl => buf.push_str("math "),
                _ => (),
            }
            buf.push_str(&name.local);
            buf.push_str(">\n");

            let mut attrs = attrs.clone();
            attrs.sort_by(|x, y| x.name.local.cmp(&y.name.local));
            for attr in attrs {
                push_indent(buf, indent + 2);
                match attr.name.ns {
                    Namespace::XLink => buf.push_str("xlink "),
                    Namespace::Xml => buf.push_str("xml "),
                    Namespace::Xmlns => buf.push_str("xmlns "),
                    _ => (),
                }
                buf.push_str(&format!("{}=\"{}\"\n", attr.name.local, attr.value));
            }

            if let Some(contents) = template_contents {
                push_indent(buf, indent + 2);
                buf.push_str("content\n");
                for child in dom.get_children(&contents) {
                    dump(buf, indent + 4, dom, child);
                }
            }
        },
    }
    drop(node);

    for child in dom.get_children(&id) {
        dump(buf, indent + 2, dom, child);
    }
}

fn context_name(context: &str) -> QualName {
    match context.split_once(' ') {
        Some(("svg", local)) => QualName::new(None, Namespace::Svg, LocalName::from(local)),
        Some(("math", local)) => QualName::new(None, Namespace::MathMl, LocalName::from(local)),
        _ => QualName::html(context),
    }
}

fn run_test(fields: &HashMap<String, String>, scripting: bool) -> Result<(), String> {
    let get_field = |key: &str| {
        fields
            .get(key)
            .unwrap_or_else(|| panic!("missing field {}", key))
            .trim_end_matches('\n')
            .to_string()
    };

    let data = get_field("data");
    let expected = get_field("document");
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: scripting,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut result = String::new();
    match fields.get("document-fragment") {
        None => {
            let dom = parse_document(ArenaDom::default(), opts).one(&data);
            for child in dom.get_children(&dom.document()) {
                dump(&mut result, 1, &dom, child);
            }
        },
        Some(context) => {
            let dom = ArenaDom::default();
            let context = dom.create_element(context_name(context.trim_end_matches('\n')), vec![]);
            let dom = parse_fragment(dom, opts, context).one(&data);
            // The fragment's nodes are the children of the root <html>.
            let root = dom.get_children(&dom.document())[0];
            for child in dom.get_children(&root) {
                dump(&mut result, 1, &dom, child);
            }
        },
    }
    let result = result.trim_end_matches('\n');

    if result != expected {
        return Err(format!(
            "input: {:?}\ngot:\n{}\nexpected:\n{}\n",
            data, result, expected
        ));
    }
    Ok(())
}

// Shows the parser's `log` output with RUST_LOG=html5stream=debug.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn html5lib_format_tree_construction_tests() {
    init_logging();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/tree-construction");
    let mut paths: Vec<_> = fs::read_dir(&dir)
        .expect("tree construction test directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "dat"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty());

    let mut count = 0;
    let mut failures = vec![];
    for path in paths {
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        let text = fs::read_to_string(&path).unwrap();
        let tests = parse_tests(text.lines().map(str::to_string));
        for (idx, fields) in tests.iter().enumerate() {
            let scripting = match (fields.contains_key("script-on"), fields.contains_key("script-off")) {
                (_, true) => vec![false],
                (true, _) => vec![true],
                _ => vec![true, false],
            };
            for scripting in scripting {
                count += 1;
                if let Err(msg) = run_test(fields, scripting) {
                    failures.push(format!("{}-{} (scripting {}):\n{}", file, idx, scripting, msg));
                }
            }
        }
    }

    assert!(count > 0);
    if !failures.is_empty() {
        panic!(
            "{} of {} tree construction tests failed:\n\n{}",
            failures.len(),
            count,
            failures.join("\n")
        );
    }
}

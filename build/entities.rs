// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Packs the named character references into a flat `u16` trie.
//!
//! Node layout, starting at the node's index:
//!
//! * header word: bits 14-15 hold the number of code points the node
//!   decodes to (0 for an interior node), bits 7-13 the branch count and
//!   bits 0-6 the lowest branch character when the branches are stored as
//!   a jump table (0 otherwise);
//! * two words (high, low) per decoded code point;
//! * branches: a single branch is one character word with the child
//!   following immediately; a jump table is `branch count` absolute child
//!   indices (0 = no child); otherwise `branch count` sorted characters
//!   followed by the same number of absolute child indices.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

#[derive(Default)]
struct Node {
    value: Vec<u32>,
    children: BTreeMap<u16, Node>,
}

pub fn build_decode_tree<R: Read>(json: R) -> Vec<u16> {
    let entities: serde_json::Map<String, serde_json::Value> =
        serde_json::from_reader(json).expect("can't parse entities.json");

    let mut root = Node::default();
    for (name, entry) in entities {
        let name = name.strip_prefix('&').expect("entity name without '&'");
        let codepoints: Vec<u32> = entry["codepoints"]
            .as_array()
            .expect("codepoints is not an array")
            .iter()
            .map(|c| c.as_u64().expect("codepoint is not a number") as u32)
            .collect();
        assert!(!codepoints.is_empty() && codepoints.len() <= 2);

        let mut node = &mut root;
        for c in name.chars() {
            assert!(c.is_ascii(), "non-ASCII entity name {name}");
            node = node.children.entry(c as u16).or_default();
        }
        node.value = codepoints;
    }

    let mut tree = Vec::new();
    encode(&root, &mut tree);
    assert!(tree.len() < u16::MAX as usize, "decode tree too large");
    tree
}

fn jump_table_span(node: &Node) -> Option<u16> {
    let (&lo, &hi) = (node.children.keys().next()?, node.children.keys().next_back()?);
    let span = hi - lo + 1;
    let count = node.children.len() as u16;
    if count > 1 && span <= 0x7f && span <= 2 * count {
        Some(span)
    } else {
        None
    }
}

fn encode(node: &Node, tree: &mut Vec<u16>) {
    let branch_count = node.children.len();
    assert!(branch_count < 0x80);

    let (jump_span, jump_offset) = match jump_table_span(node) {
        Some(span) => (Some(span), *node.children.keys().next().unwrap_or(&0)),
        None => (None, 0),
    };
    let stored_count = jump_span.map(usize::from).unwrap_or(branch_count);
    tree.push(((node.value.len() as u16) << 14) | ((stored_count as u16) << 7) | jump_offset);
    for &cp in &node.value {
        tree.push((cp >> 16) as u16);
        tree.push((cp & 0xffff) as u16);
    }

    if branch_count == 0 {
        return;
    }

    if branch_count == 1 && jump_span.is_none() {
        let (&c, child) = node.children.iter().next().unwrap_or_else(|| unreachable!());
        tree.push(c);
        encode(child, tree);
        return;
    }

    match jump_span {
        Some(span) => {
            let table = tree.len();
            tree.extend(std::iter::repeat(0).take(span as usize));
            for (&c, child) in &node.children {
                let index = tree.len();
                tree[table + (c - jump_offset) as usize] = index as u16;
                encode(child, tree);
            }
        },
        None => {
            tree.extend(node.children.keys().copied());
            let indices = tree.len();
            tree.extend(std::iter::repeat(0).take(branch_count));
            for (i, child) in node.children.values().enumerate() {
                let index = tree.len();
                tree[indices + i] = index as u16;
                encode(child, tree);
            }
        },
    }
}

pub fn write_decode_tree<W: Write>(out: &mut W, tree: &[u16]) -> io::Result<()> {
    writeln!(out, "/// Packed trie of the WHATWG named character references.")?;
    writeln!(out, "pub static DECODE_TREE: [u16; {}] = [", tree.len())?;
    for row in tree.chunks(16) {
        let row: Vec<String> = row.iter().map(|w| format!("{:#06x}", w)).collect();
        writeln!(out, "    {},", row.join(", "))?;
    }
    writeln!(out, "];")?;
    Ok(())
}

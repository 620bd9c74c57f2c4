// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[path = "build/entities.rs"]
mod entities;
#[path = "build/tags.rs"]
mod tags;

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");

    let json_path = Path::new(&manifest_dir).join("data").join("entities.json");
    println!("cargo:rerun-if-changed={}", json_path.display());
    println!("cargo:rerun-if-changed=build/entities.rs");
    println!("cargo:rerun-if-changed=build/tags.rs");

    let out = Path::new(&out_dir);

    let file = File::create(out.join("tag_id.rs")).expect("can't create tag_id.rs");
    tags::write_tag_ids(&mut BufWriter::new(file)).expect("can't write tag_id.rs");

    let json = File::open(&json_path).expect("can't open entities.json");
    let tree = entities::build_decode_tree(json);
    let file = File::create(out.join("decode_tree.rs")).expect("can't create decode_tree.rs");
    entities::write_decode_tree(&mut BufWriter::new(file), &tree)
        .expect("can't write decode_tree.rs");
}

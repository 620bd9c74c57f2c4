// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generates the `TagId` enumeration and its name lookup table.

use std::io::{self, Write};

/// Every tag name the tree builder classifies, with its enum variant.
///
/// Names are the lowercase forms produced by the tokenizer.
static TAGS: &[(&str, &str)] = &[
    ("a", "A"),
    ("address", "Address"),
    ("annotation-xml", "AnnotationXml"),
    ("applet", "Applet"),
    ("area", "Area"),
    ("article", "Article"),
    ("aside", "Aside"),
    ("b", "B"),
    ("base", "Base"),
    ("basefont", "Basefont"),
    ("bgsound", "Bgsound"),
    ("big", "Big"),
    ("blockquote", "Blockquote"),
    ("body", "Body"),
    ("br", "Br"),
    ("button", "Button"),
    ("caption", "Caption"),
    ("center", "Center"),
    ("code", "Code"),
    ("col", "Col"),
    ("colgroup", "Colgroup"),
    ("dd", "Dd"),
    ("desc", "Desc"),
    ("details", "Details"),
    ("dialog", "Dialog"),
    ("dir", "Dir"),
    ("div", "Div"),
    ("dl", "Dl"),
    ("dt", "Dt"),
    ("em", "Em"),
    ("embed", "Embed"),
    ("fieldset", "Fieldset"),
    ("figcaption", "Figcaption"),
    ("figure", "Figure"),
    ("font", "Font"),
    ("footer", "Footer"),
    ("foreignobject", "ForeignObject"),
    ("form", "Form"),
    ("frame", "Frame"),
    ("frameset", "Frameset"),
    ("h1", "H1"),
    ("h2", "H2"),
    ("h3", "H3"),
    ("h4", "H4"),
    ("h5", "H5"),
    ("h6", "H6"),
    ("head", "Head"),
    ("header", "Header"),
    ("hgroup", "Hgroup"),
    ("hr", "Hr"),
    ("html", "Html"),
    ("i", "I"),
    ("iframe", "Iframe"),
    ("image", "Image"),
    ("img", "Img"),
    ("input", "Input"),
    ("keygen", "Keygen"),
    ("label", "Label"),
    ("li", "Li"),
    ("link", "Link"),
    ("listing", "Listing"),
    ("main", "Main"),
    ("malignmark", "Malignmark"),
    ("marquee", "Marquee"),
    ("math", "Math"),
    ("menu", "Menu"),
    ("meta", "Meta"),
    ("mglyph", "Mglyph"),
    ("mi", "Mi"),
    ("mn", "Mn"),
    ("mo", "Mo"),
    ("ms", "Ms"),
    ("mtext", "Mtext"),
    ("nav", "Nav"),
    ("nobr", "Nobr"),
    ("noembed", "Noembed"),
    ("noframes", "Noframes"),
    ("noscript", "Noscript"),
    ("object", "Object"),
    ("ol", "Ol"),
    ("optgroup", "Optgroup"),
    ("option", "Option"),
    ("p", "P"),
    ("param", "Param"),
    ("plaintext", "Plaintext"),
    ("pre", "Pre"),
    ("rb", "Rb"),
    ("rp", "Rp"),
    ("rt", "Rt"),
    ("rtc", "Rtc"),
    ("ruby", "Ruby"),
    ("s", "S"),
    ("script", "Script"),
    ("search", "Search"),
    ("section", "Section"),
    ("select", "Select"),
    ("small", "Small"),
    ("source", "Source"),
    ("span", "Span"),
    ("strike", "Strike"),
    ("strong", "Strong"),
    ("style", "Style"),
    ("sub", "Sub"),
    ("summary", "Summary"),
    ("sup", "Sup"),
    ("svg", "Svg"),
    ("table", "Table"),
    ("tbody", "Tbody"),
    ("td", "Td"),
    ("template", "Template"),
    ("textarea", "Textarea"),
    ("tfoot", "Tfoot"),
    ("th", "Th"),
    ("thead", "Thead"),
    ("title", "Title"),
    ("tr", "Tr"),
    ("track", "Track"),
    ("tt", "Tt"),
    ("u", "U"),
    ("ul", "Ul"),
    ("var", "Var"),
    ("wbr", "Wbr"),
    ("xmp", "Xmp"),
];

/// Case-adjusted SVG names that must resolve to the same id.
static ALIASES: &[(&str, &str)] = &[("foreignObject", "ForeignObject")];

pub fn write_tag_ids<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "/// Dense identifier for the tag names the tree builder knows about.")?;
    writeln!(out, "///")?;
    writeln!(out, "/// Unrecognized names map to `TagId::Unknown`.")?;
    writeln!(out, "#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]")?;
    writeln!(out, "#[repr(u8)]")?;
    writeln!(out, "pub enum TagId {{")?;
    writeln!(out, "    Unknown,")?;
    for &(_, variant) in TAGS {
        writeln!(out, "    {},", variant)?;
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "static TAG_NAMES: [&str; {}] = [", TAGS.len() + 1)?;
    writeln!(out, "    \"\",")?;
    for &(name, _) in TAGS {
        writeln!(out, "    {:?},", name)?;
    }
    writeln!(out, "];\n")?;

    let mut map = phf_codegen::Map::new();
    for &(name, variant) in TAGS.iter().chain(ALIASES) {
        map.entry(name, &format!("TagId::{}", variant));
    }
    writeln!(
        out,
        "static TAG_IDS: phf::Map<&'static str, TagId> = {};",
        map.build()
    )?;
    Ok(())
}

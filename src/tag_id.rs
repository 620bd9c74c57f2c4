// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dense ids for well-known tag names, generated by `build.rs`.

include!(concat!(env!("OUT_DIR"), "/tag_id.rs"));

impl TagId {
    /// Look up a tag name as produced by the tokenizer. Unknown names map
    /// to `TagId::Unknown`.
    #[inline]
    pub fn from_name(name: &str) -> TagId {
        TAG_IDS.get(name).copied().unwrap_or(TagId::Unknown)
    }

    /// The lowercase tag name, or `""` for `Unknown`.
    #[inline]
    pub fn as_str(self) -> &'static str {
        TAG_NAMES[self as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::TagId;

    #[test]
    fn known_names() {
        assert_eq!(TagId::from_name("table"), TagId::Table);
        assert_eq!(TagId::from_name("annotation-xml"), TagId::AnnotationXml);
        assert_eq!(TagId::from_name("foreignObject"), TagId::ForeignObject);
        assert_eq!(TagId::Tbody.as_str(), "tbody");
    }

    #[test]
    fn unknown_names() {
        assert_eq!(TagId::from_name("blink"), TagId::Unknown);
        assert_eq!(TagId::from_name("TABLE"), TagId::Unknown);
        assert_eq!(TagId::Unknown.as_str(), "");
    }
}

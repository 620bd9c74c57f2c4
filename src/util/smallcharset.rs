// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Represents a set of "small characters", those with Unicode scalar
/// values less than 64.
#[derive(Copy, Clone, Debug)]
pub struct SmallCharSet {
    pub bits: u64,
}

impl SmallCharSet {
    #[inline]
    fn contains(&self, n: u8) -> bool {
        0 != (self.bits & (1 << (n as usize)))
    }

    /// Count the number of bytes of characters at the beginning
    /// of `buf` which are not in the set.
    /// See `Preprocessor::pop_except_from`.
    pub fn nonmember_prefix_len(&self, buf: &str) -> usize {
        buf.bytes()
            .take_while(|&b| b >= 64 || !self.contains(b))
            .count()
    }
}

macro_rules! small_char_set {
    ($($e:expr)+) => {
        $crate::util::smallcharset::SmallCharSet {
            bits: $( (1 << ($e as usize)) )|+
        }
    };
}

#[cfg(test)]
mod test {
    #[test]
    fn nonmember_prefix() {
        for &c in ['&', '\0'].iter() {
            for x in 0..48 {
                for y in 0..48 {
                    let mut s = "x".repeat(x);
                    s.push(c);
                    s.push_str(&"x".repeat(y));
                    let set = small_char_set!('&' '\0');

                    assert_eq!(x, set.nonmember_prefix_len(&s));
                }
            }
        }
    }

    #[test]
    fn multibyte_characters_are_never_members() {
        let set = small_char_set!('<' '\n');
        assert_eq!("héllo wörld".len(), set.nonmember_prefix_len("héllo wörld<"));
    }
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// If `c` is an ASCII letter, return the corresponding lowercase
/// letter, otherwise None.
pub fn lower_ascii_letter(c: char) -> Option<char> {
    if c.is_ascii_alphabetic() {
        Some(c.to_ascii_lowercase())
    } else {
        None
    }
}

/// ASCII whitespace characters, as defined by
/// tree construction modes that treat them specially.
pub fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\r' | '\n' | '\x0C' | ' ')
}

/// Split a string into runs of characters that
/// do and don't match a predicate.
pub struct Runs<'t, Pred> {
    pred: Pred,
    buf: &'t str,
}

impl<'t, Pred: Fn(char) -> bool> Runs<'t, Pred> {
    pub fn new(pred: Pred, buf: &'t str) -> Runs<'t, Pred> {
        Runs { pred, buf }
    }
}

impl<'t, Pred: Fn(char) -> bool> Iterator for Runs<'t, Pred> {
    type Item = (bool, &'t str);

    fn next(&mut self) -> Option<(bool, &'t str)> {
        let first = self.buf.chars().next()?;
        let matches = (self.pred)(first);
        let len = self
            .buf
            .find(|c| (self.pred)(c) != matches)
            .unwrap_or(self.buf.len());

        let (run, rest) = self.buf.split_at(len);
        self.buf = rest;
        Some((matches, run))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::{is_ascii_whitespace, lower_ascii_letter, Runs};

    test_eq!(lower_letter_a_is_a, lower_ascii_letter('a'), Some('a'));
    test_eq!(lower_letter_A_is_a, lower_ascii_letter('A'), Some('a'));
    test_eq!(lower_letter_symbol_is_None, lower_ascii_letter('!'), None);
    test_eq!(lower_letter_nonascii_is_None, lower_ascii_letter('\u{a66e}'), None);

    macro_rules! test_runs {
        ($name:ident, $input:expr, $expect:expr) => {
            #[test]
            fn $name() {
                let runs = Runs::new(is_ascii_whitespace, $input);
                let result: Vec<(bool, &'static str)> = runs.collect();
                let expect: &[(bool, &'static str)] = &$expect;
                assert_eq!(expect, &result[..]);
            }
        };
    }

    test_runs!(runs_empty, "", []);
    test_runs!(runs_one_t, " ", [(true, " ")]);
    test_runs!(runs_one_f, "x", [(false, "x")]);
    test_runs!(runs_t, "  \t  \n", [(true, "  \t  \n")]);
    test_runs!(runs_f, "xyzzy", [(false, "xyzzy")]);
    test_runs!(runs_tf, "   xyzzy", [(true, "   "), (false, "xyzzy")]);
    test_runs!(runs_ft, "xyzzy   ", [(false, "xyzzy"), (true, "   ")]);
    test_runs!(runs_tft, "   xyzzy  ", [(true, "   "), (false, "xyzzy"), (true, "  ")]);
    test_runs!(runs_ftf, "xyzzy   hi", [(false, "xyzzy"), (true, "   "), (false, "hi")]);
}

// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use html5stream::serialize::{SerializeOpts, TraversalScope};
use html5stream::{parse_document, parse_fragment, serialize};
use html5stream::{ArenaDom, ParseOpts, QualName, TreeSink};

fn parse_and_serialize(input: &str) -> String {
    let dom = ArenaDom::default();
    let context = dom.create_element(QualName::html("body"), vec![]);
    let dom = parse_fragment(dom, ParseOpts::default(), context).one(input);
    let root = dom.get_children(&dom.document())[0];

    let mut result = vec![];
    serialize(&mut result, &dom, root, SerializeOpts::default()).unwrap();
    String::from_utf8(result).unwrap()
}

macro_rules! test {
    ($name:ident, $input:expr, $output:expr) => {
        #[test]
        fn $name() {
            assert_eq!($output, parse_and_serialize($input));
        }
    };

    // Shorthand for $output = $input
    ($name:ident, $input:expr) => {
        test!($name, $input, $input);
    };
}

test!(empty, "");
test!(nested_inline, "<div><em>a</em> <strong>b</strong></div>");
test!(misnested_formatting, "<p><b>one</p>two</b>", "<p><b>one</b></p><b>two</b>");
test!(implied_end_tags, "<ul><li>a<li>b</ul>", "<ul><li>a</li><li>b</li></ul>");

test!(attr_keeps_angle_brackets, r#"<img alt="a<b>c">"#);
test!(attr_amp, r#"<img alt="&amp;">"#);
test!(attr_bare_amp_reference, "<img alt=&amp>", r#"<img alt="&amp;">"#);
test!(attr_nbsp, "<img alt=a\u{a0}b>", r#"<img alt="a&nbsp;b">"#);
test!(attr_single_quoted_quote, r#"<img alt='say "hi"'>"#, r#"<img alt="say &quot;hi&quot;">"#);
test!(attr_order_is_kept, r#"<a z="1" a="2" m="3"></a>"#);

test!(text_quotes_are_literal, r#"<p>'"'</p>"#);
test!(text_amp, "<p>a &amp; b</p>");
test!(text_bare_amp_reference, "<p>&amp</p>", "<p>&amp;</p>");
test!(text_nbsp, "<p>a\u{a0}b</p>", "<p>a&nbsp;b</p>");
test!(text_lt_gt, "<p>&lt;tag&gt;</p>");
test!(text_raw_gt, "<p>1 > 0</p>", "<p>1 &gt; 0</p>");

test!(script_is_raw, r#"<script>if (a < b && c > "d") {}</script>"#);
test!(style_is_raw, "<style>a > b { x: '&' }</style>");
test!(xmp_is_raw, "<xmp><b>&amp;</b></xmp>");
test!(noembed_is_raw, "<noembed><b>&amp;</b></noembed>");
test!(noframes_is_raw, "<noframes><b>&amp;</b></noframes>");
test!(noscript_is_raw_with_scripting, "<noscript><b>&amp;</b></noscript>");

test!(void_elements, "<br><hr><input type=\"text\"><wbr>", "<br><hr><input type=\"text\"><wbr>");
test!(void_end_tag_is_dropped, "<br></br>", "<br><br>");

test!(pre_without_newline, "<pre>x</pre>");
test!(pre_loses_one_newline, "<pre>\nx</pre>", "<pre>x</pre>");
test!(pre_keeps_second_newline, "<pre>\n\nx</pre>");
test!(textarea_keeps_second_newline, "<textarea>\n\nx</textarea>");
test!(listing_keeps_second_newline, "<listing>\n\nx</listing>");

test!(comment_plain, "<p>a<!--b--></p>");
test!(comment_spaces, "<p>a<!-- b --></p>");

test!(svg_xmlns, r#"<svg xmlns="urn:x"></svg>"#);
test!(svg_xmlns_xlink, r#"<svg xmlns:xlink="urn:x"></svg>"#);
test!(svg_xlink_href, r#"<svg><use xlink:href="urn:x"></use></svg>"#);
test!(svg_camel_case, "<svg><lineargradient></lineargradient></svg>",
    "<svg><linearGradient></linearGradient></svg>");
test!(math_definition_url, r#"<math definitionurl="u"></math>"#, r#"<math definitionURL="u"></math>"#);

test!(template_contents, "<template><p>x</p></template>");

#[test]
fn doctype_and_comments_outside_html() {
    let dom = parse_document(ArenaDom::default(), ParseOpts::default())
        .one("<!doctype html><!--a--><p>x</p></body></html><!--b-->");
    assert_eq!(
        dom.inner_html(dom.document()),
        "<!DOCTYPE html><!--a--><html><head></head><body><p>x</p></body></html><!--b-->"
    );
}

#[test]
fn include_node_writes_the_element() {
    let dom = parse_document(ArenaDom::default(), ParseOpts::default()).one("<p id=a>x</p>");
    let p = dom.find_element(dom.document(), "p").unwrap();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let mut out = vec![];
    serialize(&mut out, &dom, p, opts).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "<p id=\"a\">x</p>");
    assert_eq!(dom.outer_html(p), "<p id=\"a\">x</p>");
}

#[test]
fn noscript_is_escaped_without_scripting() {
    let opts = ParseOpts::default().with_scripting(false);
    let dom = parse_document(ArenaDom::default(), opts).one("<body><noscript>a &amp; b</noscript>");
    let noscript = dom.find_element(dom.document(), "noscript").unwrap();
    let ser_opts = SerializeOpts {
        scripting_enabled: false,
        traversal_scope: TraversalScope::IncludeNode,
    };
    let mut out = vec![];
    serialize(&mut out, &dom, noscript, ser_opts).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "<noscript>a &amp; b</noscript>");
}

// Serializing and parsing again gives back the same markup.
#[test]
fn round_trip_is_stable() {
    let inputs = [
        "<!DOCTYPE html><title>a &amp; b</title><p class=x>one<br>two",
        "<table><tr><td>1<td>2</table>text after",
        "<b>1<i>2<p>3</b>4</p>",
        "<table>A<td>B</table>",
        "<ul><li>a<ul><li>b</ul></ul><pre>\n\nx</pre>",
        "<svg viewBox='0 0 1 1'><circle r=1 /></svg><math><mi>x</mi></math>",
        "<select><option selected>a<option>b</select><textarea>\nt</textarea>",
        "<template><tr><td>x</td></tr></template><script>a<b</script>",
        "<p>caf\u{e9} \u{a0} &lt;&gt; \u{1F600}</p><!-- done -->",
    ];

    for input in inputs.iter() {
        let first = parse_document(ArenaDom::default(), ParseOpts::default()).one(input);
        let first_html = first.inner_html(first.document());

        let second = parse_document(ArenaDom::default(), ParseOpts::default()).one(&first_html);
        let second_html = second.inner_html(second.document());

        assert_eq!(first_html, second_html, "input: {:?}", input);
    }
}

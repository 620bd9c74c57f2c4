// Copyright 2026 The html5stream Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Name fixups for SVG and MathML content.
//!
//! The tokenizer lowercases every name; these tables restore the
//! camel-case SVG names and put `xlink:`, `xml:` and `xmlns` attributes
//! in their namespaces.

use crate::interface::{Attribute, LocalName, Namespace, Prefix, QualName};

pub(crate) fn svg_tag_name(name: &str) -> Option<&'static str> {
    Some(match name {
        "altglyph" => "altGlyph",
        "altglyphdef" => "altGlyphDef",
        "altglyphitem" => "altGlyphItem",
        "animatecolor" => "animateColor",
        "animatemotion" => "animateMotion",
        "animatetransform" => "animateTransform",
        "clippath" => "clipPath",
        "feblend" => "feBlend",
        "fecolormatrix" => "feColorMatrix",
        "fecomponenttransfer" => "feComponentTransfer",
        "fecomposite" => "feComposite",
        "feconvolvematrix" => "feConvolveMatrix",
        "fediffuselighting" => "feDiffuseLighting",
        "fedisplacementmap" => "feDisplacementMap",
        "fedistantlight" => "feDistantLight",
        "fedropshadow" => "feDropShadow",
        "feflood" => "feFlood",
        "fefunca" => "feFuncA",
        "fefuncb" => "feFuncB",
        "fefuncg" => "feFuncG",
        "fefuncr" => "feFuncR",
        "fegaussianblur" => "feGaussianBlur",
        "feimage" => "feImage",
        "femerge" => "feMerge",
        "femergenode" => "feMergeNode",
        "femorphology" => "feMorphology",
        "feoffset" => "feOffset",
        "fepointlight" => "fePointLight",
        "fespecularlighting" => "feSpecularLighting",
        "fespotlight" => "feSpotLight",
        "fetile" => "feTile",
        "feturbulence" => "feTurbulence",
        "foreignobject" => "foreignObject",
        "glyphref" => "glyphRef",
        "lineargradient" => "linearGradient",
        "radialgradient" => "radialGradient",
        "textpath" => "textPath",
        _ => return None,
    })
}

fn svg_attribute_name(name: &str) -> Option<&'static str> {
    Some(match name {
        "attributename" => "attributeName",
        "attributetype" => "attributeType",
        "basefrequency" => "baseFrequency",
        "baseprofile" => "baseProfile",
        "calcmode" => "calcMode",
        "clippathunits" => "clipPathUnits",
        "diffuseconstant" => "diffuseConstant",
        "edgemode" => "edgeMode",
        "filterunits" => "filterUnits",
        "glyphref" => "glyphRef",
        "gradienttransform" => "gradientTransform",
        "gradientunits" => "gradientUnits",
        "kernelmatrix" => "kernelMatrix",
        "kernelunitlength" => "kernelUnitLength",
        "keypoints" => "keyPoints",
        "keysplines" => "keySplines",
        "keytimes" => "keyTimes",
        "lengthadjust" => "lengthAdjust",
        "limitingconeangle" => "limitingConeAngle",
        "markerheight" => "markerHeight",
        "markerunits" => "markerUnits",
        "markerwidth" => "markerWidth",
        "maskcontentunits" => "maskContentUnits",
        "maskunits" => "maskUnits",
        "numoctaves" => "numOctaves",
        "pathlength" => "pathLength",
        "patterncontentunits" => "patternContentUnits",
        "patterntransform" => "patternTransform",
        "patternunits" => "patternUnits",
        "pointsatx" => "pointsAtX",
        "pointsaty" => "pointsAtY",
        "pointsatz" => "pointsAtZ",
        "preservealpha" => "preserveAlpha",
        "preserveaspectratio" => "preserveAspectRatio",
        "primitiveunits" => "primitiveUnits",
        "refx" => "refX",
        "refy" => "refY",
        "repeatcount" => "repeatCount",
        "repeatdur" => "repeatDur",
        "requiredextensions" => "requiredExtensions",
        "requiredfeatures" => "requiredFeatures",
        "specularconstant" => "specularConstant",
        "specularexponent" => "specularExponent",
        "spreadmethod" => "spreadMethod",
        "startoffset" => "startOffset",
        "stddeviation" => "stdDeviation",
        "stitchtiles" => "stitchTiles",
        "surfacescale" => "surfaceScale",
        "systemlanguage" => "systemLanguage",
        "tablevalues" => "tableValues",
        "targetx" => "targetX",
        "targety" => "targetY",
        "textlength" => "textLength",
        "viewbox" => "viewBox",
        "viewtarget" => "viewTarget",
        "xchannelselector" => "xChannelSelector",
        "ychannelselector" => "yChannelSelector",
        "zoomandpan" => "zoomAndPan",
        _ => return None,
    })
}

fn foreign_attribute_name(name: &str) -> Option<(Option<&'static str>, Namespace, &'static str)> {
    Some(match name {
        "xlink:actuate" => (Some("xlink"), Namespace::XLink, "actuate"),
        "xlink:arcrole" => (Some("xlink"), Namespace::XLink, "arcrole"),
        "xlink:href" => (Some("xlink"), Namespace::XLink, "href"),
        "xlink:role" => (Some("xlink"), Namespace::XLink, "role"),
        "xlink:show" => (Some("xlink"), Namespace::XLink, "show"),
        "xlink:title" => (Some("xlink"), Namespace::XLink, "title"),
        "xlink:type" => (Some("xlink"), Namespace::XLink, "type"),
        "xml:lang" => (Some("xml"), Namespace::Xml, "lang"),
        "xml:space" => (Some("xml"), Namespace::Xml, "space"),
        "xmlns" => (None, Namespace::Xmlns, "xmlns"),
        "xmlns:xlink" => (Some("xmlns"), Namespace::Xmlns, "xlink"),
        _ => return None,
    })
}

fn adjust_attributes<F>(attrs: &mut [Attribute], map: F)
where
    F: Fn(&str) -> Option<QualName>,
{
    for attr in attrs.iter_mut() {
        if attr.name.ns != Namespace::Null {
            continue;
        }
        if let Some(replacement) = map(&attr.name.local) {
            attr.name = replacement;
        }
    }
}

pub(crate) fn adjust_svg_attributes(attrs: &mut [Attribute]) {
    adjust_attributes(attrs, |name| svg_attribute_name(name).map(QualName::attr));
}

pub(crate) fn adjust_mathml_attributes(attrs: &mut [Attribute]) {
    adjust_attributes(attrs, |name| match name {
        "definitionurl" => Some(QualName::attr("definitionURL")),
        _ => None,
    });
}

pub(crate) fn adjust_foreign_attributes(attrs: &mut [Attribute]) {
    adjust_attributes(attrs, |name| {
        foreign_attribute_name(name).map(|(prefix, ns, local)| {
            QualName::new(prefix.map(Prefix::from), ns, LocalName::from(local))
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendril::StrTendril;

    fn attrs(names: &[&str]) -> Vec<Attribute> {
        names
            .iter()
            .map(|name| Attribute {
                name: QualName::attr(name),
                value: StrTendril::new(),
            })
            .collect()
    }

    #[test]
    fn svg_names_regain_their_case() {
        assert_eq!(svg_tag_name("foreignobject"), Some("foreignObject"));
        assert_eq!(svg_tag_name("rect"), None);

        let mut list = attrs(&["viewbox", "width"]);
        adjust_svg_attributes(&mut list);
        assert_eq!(&*list[0].name.local, "viewBox");
        assert_eq!(&*list[1].name.local, "width");
    }

    #[test]
    fn foreign_attributes_get_namespaces() {
        let mut list = attrs(&["xlink:href", "xmlns", "xml:lang", "xlink:bogus"]);
        adjust_foreign_attributes(&mut list);
        assert_eq!(list[0].name.ns, Namespace::XLink);
        assert_eq!(list[0].name.prefix.as_deref(), Some("xlink"));
        assert_eq!(&*list[0].name.local, "href");
        assert_eq!(list[1].name.ns, Namespace::Xmlns);
        assert_eq!(list[1].name.prefix, None);
        assert_eq!(list[2].name.ns, Namespace::Xml);
        assert_eq!(list[3].name.ns, Namespace::Null);
    }

    #[test]
    fn mathml_definition_url() {
        let mut list = attrs(&["definitionurl"]);
        adjust_mathml_attributes(&mut list);
        assert_eq!(&*list[0].name.local, "definitionURL");
    }
}

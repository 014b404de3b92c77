//! Colour normaliser – rewrites modern colour functions on a cloned tree.
//!
//! The capture styling layer only parses the legacy sRGB colour forms, so a
//! view styled with `oklch()` and friends would lose its colours at capture
//! time. Before rasterising we walk the original and its staged clone in
//! lockstep and, wherever the original carries an unsupported colour
//! function, ask the rendering surface to resolve it and write the resolved
//! legacy value onto the clone. The original tree is never touched.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::ElementNode;
use crate::surface::RenderingSurface;

/// Properties holding exactly one colour value.
const SINGLE_VALUED: &[&str] = &[
    "color",
    "background-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "outline-color",
    "text-decoration-color",
    "fill",
    "stroke",
];

/// Properties whose value may embed colour functions among other tokens.
const MULTI_VALUED: &[&str] = &["box-shadow", "text-shadow", "filter", "background-image"];

static UNSUPPORTED_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:oklch|oklab|lch|lab|color)\s*\(").unwrap());

/// Whether a value contains a colour function the capture layer cannot parse.
pub fn contains_unsupported_color(value: &str) -> bool {
    UNSUPPORTED_FN.is_match(value)
}

/// Rewrite unsupported colours on `clone`, consulting `original` for the
/// source values. Trees are walked in lockstep by child-element index; when
/// they disagree structurally the unmatched tail is skipped with a warning.
pub fn normalize_colors(
    surface: &dyn RenderingSurface,
    original: &ElementNode,
    clone: &mut ElementNode,
) {
    normalize_element(surface, original, clone);

    let source_children = original.child_elements();
    let mut clone_children = clone.child_elements_mut();
    if source_children.len() != clone_children.len() {
        warn!(
            "color normalizer: tree shape mismatch ({} vs {} children), skipping unmatched tail",
            source_children.len(),
            clone_children.len()
        );
    }
    for (src, dst) in source_children.iter().zip(clone_children.iter_mut()) {
        normalize_colors(surface, src, dst);
    }
}

fn normalize_element(
    surface: &dyn RenderingSurface,
    original: &ElementNode,
    clone: &mut ElementNode,
) {
    for property in SINGLE_VALUED {
        let Some(value) = original.style_value(property) else {
            continue;
        };
        if !contains_unsupported_color(value) {
            continue;
        }
        match surface.resolve_css_color(value) {
            Some(resolved) => {
                clone.set_style_value(property, &resolved.to_css_string());
            }
            None => {
                // Resolution failed; the clone keeps whatever it had.
                debug!("color normalizer: could not resolve {property}: {value}");
            }
        }
    }

    for property in MULTI_VALUED {
        let Some(value) = original.style_value(property) else {
            continue;
        };
        if !contains_unsupported_color(value) {
            continue;
        }
        if let Some(rewritten) = rewrite_embedded_colors(surface, value) {
            clone.set_style_value(property, &rewritten);
        }
    }
}

/// Replace every embedded unsupported colour function in `value` with its
/// resolved legacy form. Returns `None` when nothing could be rewritten.
fn rewrite_embedded_colors(surface: &dyn RenderingSurface, value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    let mut changed = false;

    while let Some(m) = UNSUPPORTED_FN.find_at(value, cursor) {
        // The regex ends at the opening paren; extend to the balanced close
        // so nested parens (e.g. `color(srgb calc(1) 0 0)`) stay intact.
        let Some(end) = balanced_paren_end(value, m.end() - 1) else {
            break;
        };
        let call = &value[m.start()..end];
        out.push_str(&value[cursor..m.start()]);
        match surface.resolve_css_color(call) {
            Some(resolved) => {
                out.push_str(&resolved.to_css_string());
                changed = true;
            }
            None => out.push_str(call),
        }
        cursor = end;
    }

    if !changed {
        return None;
    }
    out.push_str(&value[cursor..]);
    Some(out)
}

/// Byte index one past the `)` matching the `(` at `open`.
fn balanced_paren_end(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{first_element, parse_html};
    use crate::surface::PixelSurface;

    fn parse_one(html: &str) -> ElementNode {
        first_element(&parse_html(html)).unwrap().clone()
    }

    #[test]
    fn detects_unsupported_functions() {
        assert!(contains_unsupported_color("oklch(0.7 0.1 200)"));
        assert!(contains_unsupported_color("1px 1px lab(50 40 59.5)"));
        assert!(contains_unsupported_color("color(display-p3 1 0 0)"));
        assert!(!contains_unsupported_color("rgb(255, 0, 0)"));
        assert!(!contains_unsupported_color("collaborate(now)"));
        // `lab` inside `oklab` must not double-match.
        assert!(contains_unsupported_color("oklab(0.5 0 0)"));
    }

    #[test]
    fn rewrites_single_valued_property_on_clone_only() {
        let surface = PixelSurface::new();
        let original = parse_one(r#"<div style="color: oklch(0.628 0.2577 29.23)"></div>"#);
        let mut clone = original.clone();
        normalize_colors(&surface, &original, &mut clone);

        let rewritten = clone.style_value("color").unwrap();
        assert!(rewritten.starts_with("rgb("), "got {rewritten}");
        assert_eq!(
            original.style_value("color"),
            Some("oklch(0.628 0.2577 29.23)")
        );
    }

    #[test]
    fn leaves_legacy_values_alone() {
        let surface = PixelSurface::new();
        let original = parse_one(r#"<div style="color: rgb(1, 2, 3)"></div>"#);
        let mut clone = original.clone();
        normalize_colors(&surface, &original, &mut clone);
        assert_eq!(clone.style_value("color"), Some("rgb(1, 2, 3)"));
    }

    #[test]
    fn transparent_resolves_to_keyword() {
        let surface = PixelSurface::new();
        let original =
            parse_one(r#"<div style="background-color: oklch(0.5 0.1 200 / 0)"></div>"#);
        let mut clone = original.clone();
        normalize_colors(&surface, &original, &mut clone);
        assert_eq!(clone.style_value("background-color"), Some("transparent"));
    }

    #[test]
    fn rewrites_colors_embedded_in_shadows() {
        let surface = PixelSurface::new();
        let original = parse_one(
            r#"<div style="box-shadow: 0 1px 2px oklch(0 0 0 / 0.5), 0 0 1px rgb(0, 0, 0)"></div>"#,
        );
        let mut clone = original.clone();
        normalize_colors(&surface, &original, &mut clone);

        let rewritten = clone.style_value("box-shadow").unwrap();
        assert!(!contains_unsupported_color(rewritten));
        assert!(rewritten.contains("0 1px 2px rgba(0, 0, 0"));
        assert!(rewritten.contains("rgb(0, 0, 0)"));
    }

    #[test]
    fn walks_children_in_lockstep() {
        let surface = PixelSurface::new();
        let original = parse_one(
            r#"<div><p style="color: oklch(1 0 0)">a</p><p style="color: red">b</p></div>"#,
        );
        let mut clone = original.clone();
        normalize_colors(&surface, &original, &mut clone);

        let children = clone.child_elements();
        assert_eq!(children[0].style_value("color"), Some("rgb(255, 255, 255)"));
        assert_eq!(children[1].style_value("color"), Some("red"));
    }

    #[test]
    fn mismatched_trees_are_skipped_not_paniced() {
        let surface = PixelSurface::new();
        let original = parse_one(
            r#"<div><p style="color: oklch(1 0 0)">a</p><p style="color: oklch(0 0 0)">b</p></div>"#,
        );
        let mut clone = original.clone();
        clone.children.pop();
        normalize_colors(&surface, &original, &mut clone);

        // The surviving pair is still normalised.
        assert_eq!(
            clone.child_elements()[0].style_value("color"),
            Some("rgb(255, 255, 255)")
        );
        // And nothing was invented for the missing child.
        assert_eq!(clone.child_elements().len(), 1);
    }
}

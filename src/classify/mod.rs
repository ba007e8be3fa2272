//! Role classification: keeping shape markup consistent with the palette.
//!
//! A role is carried as a `tinct-<role>` class on the shape, with the
//! role's resolved color mirrored into the literal `fill` attribute as a
//! fallback for renderers that ignore the role stylesheet. At most one
//! role class per shape.
//!
//! `classify` reconciles one shape against the palette:
//! - role classes naming roles no longer in the palette are stripped
//!   (orphan cleanup; the fill attribute is left alone)
//! - a legacy `fill: var(--name)` style declaration is upgraded to the
//!   class form when the palette knows the name
//! - a literal fill matching a palette color (after normalization) gets
//!   that role assigned; the first role in palette order wins ties
//!
//! Both `classify` and `sweep` are idempotent: a second pass over already
//! reconciled markup changes nothing.

use crate::color;
use crate::palette::{Palette, ROLE_CLASS_PREFIX};
use crate::svg::{Element, Node, SvgDoc, ViewBox};

/// Class marking the synthetic full-bounds background rectangle.
pub const BACKGROUND_CLASS: &str = "canvas-bg";

/// The class carrying a role assignment.
pub fn role_class(role: &str) -> String {
    format!("{ROLE_CLASS_PREFIX}{role}")
}

/// The role a shape currently carries, if any.
pub fn role_of(element: &Element) -> Option<String> {
    element
        .classes()
        .iter()
        .find_map(|class| class.strip_prefix(ROLE_CLASS_PREFIX))
        .map(str::to_string)
}

/// Assign a role to a shape.
///
/// Strips any existing role class, attaches the new one, clears a literal
/// style-attribute fill, and mirrors the role's resolved color into the
/// `fill` attribute so the shape still renders without the stylesheet.
pub fn assign_role(element: &mut Element, role: &str, role_color: &str) {
    element.retain_classes(|class| !class.starts_with(ROLE_CLASS_PREFIX));
    element.add_class(&role_class(role));
    element.clear_style_fill();
    element.set_attr("fill", color::normalize(role_color));
}

/// Reconcile one shape's role against the palette. Returns true if the
/// shape's markup changed.
pub fn classify(element: &mut Element, palette: &Palette) -> bool {
    let mut changed = strip_orphan_roles(element, palette);

    // Legacy form: the role encoded as a CSS variable in the style fill.
    // Assigning clears that style fill, so this branch runs at most once
    // per shape and the markup converges on the class form.
    if let Some(style_fill) = element.style_fill() {
        if let Some(name) = css_var_name(&style_fill) {
            if let Some(role_color) = palette.get(&name) {
                assign_role(element, &name, role_color);
                changed = true;
            }
            return changed;
        }
    }

    let Some(fill) = literal_fill(element) else {
        return changed;
    };

    // First role in palette order wins when colors collide.
    let matched = palette
        .iter()
        .find(|(_, role_color)| color::matches(role_color, &fill));
    if let Some((role, role_color)) = matched {
        if !element.has_class(&role_class(role)) {
            let (role, role_color) = (role.to_string(), role_color.to_string());
            assign_role(element, &role, &role_color);
            changed = true;
        }
    }
    changed
}

/// Reconcile every shape in a document. Returns the number of shapes
/// whose markup changed. Running it twice changes nothing on the second
/// pass.
pub fn sweep(doc: &mut SvgDoc, palette: &Palette) -> usize {
    let mut changed = 0;
    doc.visit_elements_mut(&mut |element| {
        if classify(element, palette) {
            changed += 1;
        }
    });
    changed
}

/// Find or create the document's background rectangle, returning its
/// pre-order element index.
///
/// The rectangle is created exactly once per document, sized to the
/// declared view box (or 100%×100% when none), and prepended so it renders
/// behind every shape.
pub fn ensure_background(doc: &mut SvgDoc) -> usize {
    if let Some(index) = find_background(doc) {
        return index;
    }

    let mut rect = Element::new("rect");
    rect.set_attr("class", BACKGROUND_CLASS);
    if doc.has_view_box() {
        let ViewBox {
            x,
            y,
            width,
            height,
        } = doc.view_box();
        rect.set_attr("x", crate::svg::format_number(x));
        rect.set_attr("y", crate::svg::format_number(y));
        rect.set_attr("width", crate::svg::format_number(width));
        rect.set_attr("height", crate::svg::format_number(height));
    } else {
        rect.set_attr("width", "100%");
        rect.set_attr("height", "100%");
    }
    doc.root.children.insert(0, Node::Element(rect));
    0
}

/// Pre-order index of the existing background rectangle, if any.
fn find_background(doc: &SvgDoc) -> Option<usize> {
    fn walk(nodes: &[Node], index: &mut usize) -> Option<usize> {
        for node in nodes {
            if let Node::Element(element) = node {
                if element.has_class(BACKGROUND_CLASS) {
                    return Some(*index);
                }
                *index += 1;
                if let Some(found) = walk(&element.children, index) {
                    return Some(found);
                }
            }
        }
        None
    }
    let mut index = 0;
    walk(&doc.root.children, &mut index)
}

/// Strip role classes naming roles the palette no longer knows.
fn strip_orphan_roles(element: &mut Element, palette: &Palette) -> bool {
    let has_orphan = element.classes().iter().any(|class| {
        class
            .strip_prefix(ROLE_CLASS_PREFIX)
            .is_some_and(|role| palette.get(role).is_none())
    });
    if !has_orphan {
        return false;
    }
    element.retain_classes(|class| {
        class
            .strip_prefix(ROLE_CLASS_PREFIX)
            .is_none_or(|role| palette.get(role).is_some())
    });
    true
}

/// Extract the variable name from a `var(--name …)` expression.
fn css_var_name(value: &str) -> Option<String> {
    let start = value.find("var(--")? + "var(--".len();
    let name: String = value[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

/// The literal color to match: style fill wins over the fill attribute;
/// `none` and paint-server references are never matched.
fn literal_fill(element: &Element) -> Option<String> {
    let candidate = match element.style_fill() {
        Some(style_fill) if style_fill != "none" => style_fill,
        Some(_) => return None,
        None => match element.attr("fill") {
            Some(attr_fill) if attr_fill != "none" => attr_fill.to_string(),
            _ => return None,
        },
    };
    if candidate.starts_with("url(") {
        return None;
    }
    Some(candidate)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn palette_ab() -> Palette {
        let mut palette = Palette::empty();
        palette.set("a", "#111111").unwrap();
        palette.set("b", "#222222").unwrap();
        palette
    }

    fn doc(body: &str) -> SvgDoc {
        SvgDoc::parse(&format!(r#"<svg viewBox="0 0 24 24">{body}</svg>"#)).unwrap()
    }

    #[test]
    fn test_literal_fill_gets_role() {
        let mut doc = doc(r##"<path d="M0 0" fill="#111111"/>"##);
        assert_eq!(sweep(&mut doc, &palette_ab()), 1);

        let shape = doc.element_mut(0).unwrap();
        assert!(shape.has_class("tinct-a"));
        assert_eq!(shape.attr("fill"), Some("#111111"));
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut doc = doc(
            r##"<path fill="#111111"/><rect fill="rgb(34,34,34)"/><circle fill="none"/>"##,
        );
        let palette = palette_ab();
        assert_eq!(sweep(&mut doc, &palette), 2);
        let first_pass = doc.to_markup();
        assert_eq!(sweep(&mut doc, &palette), 0);
        assert_eq!(doc.to_markup(), first_pass);
    }

    #[test]
    fn test_role_removal_cascades_on_sweep() {
        // Classify, remove role `a`, sweep again: class stripped, fill kept.
        let mut palette = palette_ab();
        let mut doc = doc(r##"<path fill="#111111"/>"##);
        sweep(&mut doc, &palette);
        assert!(doc.element_mut(0).unwrap().has_class("tinct-a"));

        palette.remove("a");
        assert_eq!(sweep(&mut doc, &palette), 1);

        let shape = doc.element_mut(0).unwrap();
        assert_eq!(role_of(shape), None);
        assert_eq!(shape.attr("fill"), Some("#111111"));
    }

    #[test]
    fn test_duplicate_colors_first_role_wins() {
        let mut palette = Palette::empty();
        palette.set("first", "#ABCDEF").unwrap();
        palette.set("second", "#abcdef").unwrap();

        let mut doc = doc(r##"<path fill="#abcdef"/>"##);
        sweep(&mut doc, &palette);
        assert_eq!(role_of(doc.element_mut(0).unwrap()).as_deref(), Some("first"));

        // Still stable on the next sweep
        assert_eq!(sweep(&mut doc, &palette), 0);
    }

    #[test]
    fn test_assign_role_replaces_previous() {
        let mut element = Element::new("path");
        element.set_attr("style", "fill: #999999");
        assign_role(&mut element, "a", "#111111");
        assign_role(&mut element, "b", "#222222");

        assert_eq!(role_of(&element).as_deref(), Some("b"));
        assert!(!element.has_class("tinct-a"));
        assert_eq!(element.style_fill(), None);
        assert_eq!(element.attr("fill"), Some("#222222"));
    }

    #[test]
    fn test_assign_role_normalizes_fallback_color() {
        let mut element = Element::new("path");
        assign_role(&mut element, "warn", "RGB(255, 170, 0)");
        assert_eq!(element.attr("fill"), Some("#ffaa00"));
    }

    #[test]
    fn test_legacy_css_var_fill_upgraded() {
        let mut doc = doc(r##"<path style="fill: var(--a)"/>"##);
        assert_eq!(sweep(&mut doc, &palette_ab()), 1);

        let shape = doc.element_mut(0).unwrap();
        assert!(shape.has_class("tinct-a"));
        assert_eq!(shape.style_fill(), None);
        assert_eq!(shape.attr("fill"), Some("#111111"));
    }

    #[test]
    fn test_legacy_var_cleared_even_with_class_present() {
        let mut doc = doc(r##"<path class="tinct-a" style="fill: var(--a)"/>"##);
        let palette = palette_ab();
        assert_eq!(sweep(&mut doc, &palette), 1);

        let shape = doc.element_mut(0).unwrap();
        assert_eq!(shape.style_fill(), None);
        assert_eq!(shape.attr("fill"), Some("#111111"));
        assert!(shape.has_class("tinct-a"));

        // Converged: nothing left for a second pass.
        assert_eq!(sweep(&mut doc, &palette), 0);
    }

    #[test]
    fn test_unknown_var_and_paint_servers_skipped() {
        let mut doc = doc(
            r##"<path style="fill: var(--missing)"/><rect fill="url(#grad)"/>"##,
        );
        assert_eq!(sweep(&mut doc, &palette_ab()), 0);
    }

    #[test]
    fn test_style_fill_wins_over_attribute() {
        // Attribute says a's color, style says b's: style wins.
        let mut doc = doc(r##"<path fill="#111111" style="fill: #222222"/>"##);
        sweep(&mut doc, &palette_ab());
        assert_eq!(role_of(doc.element_mut(0).unwrap()).as_deref(), Some("b"));
    }

    #[test]
    fn test_background_created_once() {
        let mut doc = doc(r##"<path d="M0 0"/>"##);
        let first = ensure_background(&mut doc);
        let second = ensure_background(&mut doc);
        assert_eq!(first, second);
        assert_eq!(doc.element_count(), 2);

        let bg = doc.element_mut(first).unwrap();
        assert_eq!(bg.name, "rect");
        assert_eq!(bg.attr("x"), Some("0"));
        assert_eq!(bg.attr("width"), Some("24"));
        assert_eq!(bg.attr("height"), Some("24"));
    }

    #[test]
    fn test_background_without_view_box_uses_percent() {
        let mut doc = SvgDoc::parse("<svg><path d=\"M0 0\"/></svg>").unwrap();
        let index = ensure_background(&mut doc);
        let bg = doc.element_mut(index).unwrap();
        assert_eq!(bg.attr("width"), Some("100%"));
        assert_eq!(bg.attr("height"), Some("100%"));
        assert_eq!(bg.attr("x"), None);
    }
}

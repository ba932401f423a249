//! Role and accessible-name resolution.
//!
//! Maps raw elements to the closed role vocabulary the snapshot emits, and
//! derives the human-readable name shown next to each role token.

use std::collections::HashMap;

use domlens_dom::{select_all, NodeRef};
use once_cell::sync::Lazy;

use crate::visibility::{visible_text, VisibilityProbe};

/// Roles that receive refs and state flags. Closed set.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "textbox", "checkbox", "radio", "combobox",
    "listbox", "menuitem", "option", "slider", "searchbox", "switch",
];

/// Roles emitted without refs in full mode for page-comprehension context.
pub const STRUCTURAL_ROLES: &[&str] = &["heading", "img", "form", "navigation", "main"];

/// Display budget for names in tree lines; the full name stays in `RefInfo`.
const NAME_DISPLAY_LIMIT: usize = 50;

static TAG_ROLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("a", "link"),
        ("button", "button"),
        ("img", "img"),
        ("input", "textbox"),
        ("nav", "navigation"),
        ("select", "combobox"),
        ("textarea", "textbox"),
        ("main", "main"),
        ("form", "form"),
    ])
});

static INPUT_TYPE_ROLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("checkbox", "checkbox"),
        ("radio", "radio"),
        ("submit", "button"),
        ("button", "button"),
        ("text", "textbox"),
        ("email", "textbox"),
        ("password", "textbox"),
        ("search", "searchbox"),
    ])
});

/// A resolved role; `level` is set for headings only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRole {
    pub role: &'static str,
    pub level: Option<u8>,
}

pub fn is_interactive(role: &str) -> bool {
    INTERACTIVE_ROLES.iter().any(|r| r.eq_ignore_ascii_case(role))
}

/// Canonical static form of a role string, if it names a known role.
fn canonical_role(token: &str) -> Option<&'static str> {
    INTERACTIVE_ROLES
        .iter()
        .chain(STRUCTURAL_ROLES.iter())
        .find(|r| r.eq_ignore_ascii_case(token))
        .copied()
}

/// Resolve an element's role.
///
/// An explicit `role` attribute naming a known role wins; unknown role
/// strings are skipped and inference falls through to the tag table
/// (matching ARIA fallback behavior). `input` elements refine by `type`.
/// Unmapped tags resolve to no role at all.
pub fn resolve_role(node: &NodeRef) -> Option<ElementRole> {
    let tag = node.tag()?;

    if let Some(value) = node.attr("role") {
        for token in value.split_whitespace() {
            if let Some(role) = canonical_role(token) {
                let level = (role == "heading").then(|| aria_level(node));
                return Some(ElementRole { role, level });
            }
        }
    }

    if let Some(level) = heading_level(tag) {
        return Some(ElementRole {
            role: "heading",
            level: Some(level),
        });
    }

    let role = *TAG_ROLES.get(tag)?;
    if tag == "input" {
        let ty = node
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let refined = INPUT_TYPE_ROLES.get(ty.as_str()).copied().unwrap_or("textbox");
        return Some(ElementRole {
            role: refined,
            level: None,
        });
    }
    Some(ElementRole { role, level: None })
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

// role="heading" without a usable aria-level defaults to 2, as browsers do.
fn aria_level(node: &NodeRef) -> u8 {
    node.attr("aria-level")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l))
        .unwrap_or(2)
}

/// Resolve the accessible name for an element with the given role.
///
/// Order: `aria-label`; `alt` for images; visible text for roles named by
/// their contents (hidden descendants contribute nothing); `value` (then
/// the literal type) for submit/button-type inputs; finally an external
/// `<label for=...>`. Returns the full name; display truncation happens at
/// render time.
pub fn resolve_name(
    root: &NodeRef,
    node: &NodeRef,
    role: &str,
    probe: &dyn VisibilityProbe,
) -> Option<String> {
    if let Some(label) = non_empty(node.attr("aria-label")) {
        return Some(label);
    }
    if role == "img" {
        if let Some(alt) = non_empty(node.attr("alt")) {
            return Some(alt);
        }
    }
    if names_from_text(role) {
        let text = visible_text(node, probe);
        if !text.is_empty() {
            return Some(text);
        }
    }
    if node.tag() == Some("input") {
        let ty = node
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if ty == "submit" || ty == "button" {
            if let Some(value) = non_empty(node.attr("value")) {
                return Some(value);
            }
            return Some(ty);
        }
    }
    label_for(root, node, probe)
}

/// Roles whose name comes from their own text content. Their descendant
/// text is redundant in full-mode output.
pub fn names_from_text(role: &str) -> bool {
    matches!(role, "button" | "link" | "heading" | "menuitem" | "option")
}

fn label_for(root: &NodeRef, node: &NodeRef, probe: &dyn VisibilityProbe) -> Option<String> {
    let id = non_empty(node.attr("id"))?;
    for label in select_all(root, "label") {
        if label.attr("for").as_deref() == Some(id.as_str()) {
            let text = visible_text(&label, probe);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Name as rendered in a tree line: truncated with an ellipsis when it
/// exceeds the display budget.
pub fn display_name(name: &str) -> String {
    if name.chars().count() <= NAME_DISPLAY_LIMIT {
        return name.to_string();
    }
    let truncated: String = name.chars().take(NAME_DISPLAY_LIMIT - 1).collect();
    format!("{truncated}…")
}

pub fn is_disabled(node: &NodeRef) -> bool {
    node.has_attr("disabled") || node.attr("aria-disabled").as_deref() == Some("true")
}

/// Roles the `checked` flag applies to.
pub fn checkable(role: &str) -> bool {
    matches!(role, "checkbox" | "radio" | "switch" | "menuitem")
}

pub fn is_checked(node: &NodeRef) -> bool {
    node.has_attr("checked") || node.attr("aria-checked").as_deref() == Some("true")
}

/// Innermost enclosing landmark, rendered as a context tag: a form with a
/// label becomes `form "Login"`, otherwise the bare landmark role.
pub fn landmark_context(node: &NodeRef) -> Option<String> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if let Some(resolved) = resolve_role(&ancestor) {
            match resolved.role {
                "form" => {
                    return Some(match non_empty(ancestor.attr("aria-label")) {
                        Some(name) => format!("form \"{}\"", display_name(&name)),
                        None => "form".to_string(),
                    });
                }
                "navigation" | "main" => return Some(resolved.role.to_string()),
                _ => {}
            }
        }
        current = ancestor.parent();
    }
    None
}

/// Importance tag: submit-type controls inside a form are the page's
/// primary action.
pub fn importance(node: &NodeRef, role: &str) -> Option<String> {
    if role != "button" {
        return None;
    }
    let ty = node.attr("type")?;
    if !ty.trim().eq_ignore_ascii_case("submit") {
        return None;
    }
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.tag() == Some("form") {
            return Some("primary".to_string());
        }
        current = ancestor.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::StyleVisibility;
    use domlens_dom::{parse_fragment, select_first, Document};

    fn role_of(doc: &Document, selector: &str) -> Option<ElementRole> {
        resolve_role(&select_first(&doc.root(), selector).unwrap())
    }

    #[test]
    fn test_tag_table() {
        let doc = parse_fragment(
            "<a href=\"/\">x</a><button>x</button><nav></nav>\
             <select></select><textarea></textarea><main></main><form></form>\
             <img src=\"x.png\" alt=\"x\">",
        );
        assert_eq!(role_of(&doc, "a").unwrap().role, "link");
        assert_eq!(role_of(&doc, "button").unwrap().role, "button");
        assert_eq!(role_of(&doc, "nav").unwrap().role, "navigation");
        assert_eq!(role_of(&doc, "select").unwrap().role, "combobox");
        assert_eq!(role_of(&doc, "textarea").unwrap().role, "textbox");
        assert_eq!(role_of(&doc, "main").unwrap().role, "main");
        assert_eq!(role_of(&doc, "form").unwrap().role, "form");
        assert_eq!(role_of(&doc, "img").unwrap().role, "img");
    }

    #[test]
    fn test_heading_levels() {
        let doc = parse_fragment("<h1>a</h1><h3>b</h3><h6>c</h6>");
        for (selector, level) in [("h1", 1), ("h3", 3), ("h6", 6)] {
            let resolved = role_of(&doc, selector).unwrap();
            assert_eq!(resolved.role, "heading");
            assert_eq!(resolved.level, Some(level));
        }
    }

    #[test]
    fn test_explicit_role_wins_unknown_falls_through() {
        let doc = parse_fragment(
            "<div id=\"s\" role=\"switch\"></div>\
             <a id=\"weird\" role=\"doohickey\" href=\"/\">x</a>\
             <div id=\"h\" role=\"heading\" aria-level=\"4\">t</div>\
             <div id=\"plain\" role=\"doohickey\"></div>",
        );
        assert_eq!(role_of(&doc, "#s").unwrap().role, "switch");
        // Unknown role string is ignored, tag inference continues.
        assert_eq!(role_of(&doc, "#weird").unwrap().role, "link");
        let heading = role_of(&doc, "#h").unwrap();
        assert_eq!(heading.role, "heading");
        assert_eq!(heading.level, Some(4));
        // Unknown role on an unmapped tag yields no role at all.
        assert!(role_of(&doc, "#plain").is_none());
    }

    #[test]
    fn test_input_type_refinement() {
        let doc = parse_fragment(
            "<input id=\"c\" type=\"checkbox\"><input id=\"r\" type=\"radio\">\
             <input id=\"s\" type=\"submit\"><input id=\"q\" type=\"search\">\
             <input id=\"e\" type=\"email\"><input id=\"d\" type=\"date\">\
             <input id=\"bare\">",
        );
        assert_eq!(role_of(&doc, "#c").unwrap().role, "checkbox");
        assert_eq!(role_of(&doc, "#r").unwrap().role, "radio");
        assert_eq!(role_of(&doc, "#s").unwrap().role, "button");
        assert_eq!(role_of(&doc, "#q").unwrap().role, "searchbox");
        assert_eq!(role_of(&doc, "#e").unwrap().role, "textbox");
        // Unlisted types and missing type fall back to textbox.
        assert_eq!(role_of(&doc, "#d").unwrap().role, "textbox");
        assert_eq!(role_of(&doc, "#bare").unwrap().role, "textbox");
    }

    #[test]
    fn test_interactive_set_is_closed() {
        for role in ["button", "link", "searchbox", "switch", "slider"] {
            assert!(is_interactive(role), "{role}");
        }
        for role in ["heading", "img", "form", "navigation", "main", "text"] {
            assert!(!is_interactive(role), "{role}");
        }
    }

    #[test]
    fn test_name_priority() {
        let doc = parse_fragment(
            "<button id=\"b1\" aria-label=\"Close dialog\">X</button>\
             <button id=\"b2\">  Save <b>draft</b> </button>\
             <img id=\"i\" src=\"x\" alt=\"Logo\">\
             <input id=\"s1\" type=\"submit\" value=\"Sign in\">\
             <input id=\"s2\" type=\"submit\">\
             <label for=\"user\">Username</label><input id=\"user\" type=\"text\">\
             <input id=\"anon\" type=\"text\">",
        );
        let root = doc.root();
        let name = |sel: &str, role: &str| {
            resolve_name(&root, &select_first(&root, sel).unwrap(), role, &StyleVisibility)
        };
        assert_eq!(name("#b1", "button").as_deref(), Some("Close dialog"));
        assert_eq!(name("#b2", "button").as_deref(), Some("Save draft"));
        assert_eq!(name("#i", "img").as_deref(), Some("Logo"));
        assert_eq!(name("#s1", "button").as_deref(), Some("Sign in"));
        // No value: the literal type name.
        assert_eq!(name("#s2", "button").as_deref(), Some("submit"));
        assert_eq!(name("#user", "textbox").as_deref(), Some("Username"));
        assert_eq!(name("#anon", "textbox"), None);
    }

    #[test]
    fn test_name_ignores_hidden_descendant_text() {
        let doc = parse_fragment(
            "<button id=\"b\">Save<span style=\"display:none\"> secret draft</span></button>\
             <a id=\"l\" href=\"/\">Docs<span hidden> (staging)</span></a>\
             <button id=\"empty\"><span hidden>ghost</span></button>",
        );
        let root = doc.root();
        let name = |sel: &str, role: &str| {
            resolve_name(&root, &select_first(&root, sel).unwrap(), role, &StyleVisibility)
        };
        assert_eq!(name("#b", "button").as_deref(), Some("Save"));
        assert_eq!(name("#l", "link").as_deref(), Some("Docs"));
        // All text hidden: no name at all rather than a ghost one.
        assert_eq!(name("#empty", "button"), None);
    }

    #[test]
    fn test_display_name_truncates() {
        let short = "Submit order";
        assert_eq!(display_name(short), short);

        let long = "x".repeat(80);
        let shown = display_name(&long);
        assert_eq!(shown.chars().count(), 50);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_state_flags() {
        let doc = parse_fragment(
            "<button id=\"d1\" disabled>x</button>\
             <button id=\"d2\" aria-disabled=\"true\">x</button>\
             <input id=\"c1\" type=\"checkbox\" checked>\
             <div id=\"c2\" role=\"switch\" aria-checked=\"true\"></div>\
             <button id=\"ok\">x</button>",
        );
        let root = doc.root();
        let node = |sel: &str| select_first(&root, sel).unwrap();
        assert!(is_disabled(&node("#d1")));
        assert!(is_disabled(&node("#d2")));
        assert!(!is_disabled(&node("#ok")));
        assert!(is_checked(&node("#c1")));
        assert!(is_checked(&node("#c2")));
        assert!(checkable("radio"));
        assert!(!checkable("button"));
    }

    #[test]
    fn test_landmark_context() {
        let doc = parse_fragment(
            "<form aria-label=\"Login\"><button id=\"in-form\">Go</button></form>\
             <nav><a id=\"in-nav\" href=\"/\">Docs</a></nav>\
             <main><div><a id=\"in-main\" href=\"/\">x</a></div></main>\
             <a id=\"bare\" href=\"/\">x</a>",
        );
        let root = doc.root();
        let node = |sel: &str| select_first(&root, sel).unwrap();
        assert_eq!(
            landmark_context(&node("#in-form")).as_deref(),
            Some("form \"Login\"")
        );
        assert_eq!(landmark_context(&node("#in-nav")).as_deref(), Some("navigation"));
        assert_eq!(landmark_context(&node("#in-main")).as_deref(), Some("main"));
        assert_eq!(landmark_context(&node("#bare")), None);
    }

    #[test]
    fn test_importance_marks_submit_in_form() {
        let doc = parse_fragment(
            "<form><input id=\"s\" type=\"submit\" value=\"Buy\">\
             <button id=\"plain\">Cancel</button></form>\
             <input id=\"loose\" type=\"submit\">",
        );
        let root = doc.root();
        let node = |sel: &str| select_first(&root, sel).unwrap();
        assert_eq!(importance(&node("#s"), "button").as_deref(), Some("primary"));
        assert_eq!(importance(&node("#plain"), "button"), None);
        assert_eq!(importance(&node("#loose"), "button"), None);
    }
}

//! Structural CSS queries.
//!
//! Supports the selector subset automation clients actually send: tag, `#id`,
//! `.class`, `[attr]`, `[attr=value]`, `:nth-child(n)`, compounds of those,
//! descendant and `>` combinators, and comma-separated lists. Anything
//! outside the subset is invalid and matches nothing.

use tracing::debug;

use crate::node::NodeRef;

#[derive(Debug, Default, Clone)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    nth_child: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone)]
struct Complex {
    // The leading combinator of parts[0] is never consulted.
    parts: Vec<(Combinator, Compound)>,
}

/// First descendant of `scope` matching the selector, in document order.
/// Returns `None` for no match and for invalid selector syntax alike.
pub fn select_first(scope: &NodeRef, selector: &str) -> Option<NodeRef> {
    let list = match parse_selector_list(selector) {
        Some(list) => list,
        None => {
            debug!(selector, "unparseable selector");
            return None;
        }
    };
    find_first(scope, &list)
}

/// All descendants of `scope` matching the selector, in document order.
pub fn select_all(scope: &NodeRef, selector: &str) -> Vec<NodeRef> {
    let list = match parse_selector_list(selector) {
        Some(list) => list,
        None => {
            debug!(selector, "unparseable selector");
            return Vec::new();
        }
    };
    let mut out = Vec::new();
    collect_matches(scope, &list, &mut out);
    out
}

/// Structural selector for a node: `#id` when the node has one, otherwise a
/// `>`-joined chain of `tag:nth-child(k)` steps from the nearest ancestor
/// with an id (or the document root). Positions count element children only,
/// so the generated selector resolves back through [`select_first`].
pub fn css_path(node: &NodeRef) -> String {
    if let Some(id) = node.attr("id") {
        if !id.is_empty() {
            return format!("#{id}");
        }
    }

    let mut steps: Vec<String> = Vec::new();
    let mut current = node.clone();
    loop {
        let tag = current.tag().unwrap_or("*").to_string();
        match current.parent() {
            Some(parent) if !parent.is_root() => {
                let position = parent
                    .element_children()
                    .iter()
                    .position(|e| e.same_node(&current))
                    .map(|i| i + 1)
                    .unwrap_or(1);
                steps.push(format!("{tag}:nth-child({position})"));
                match parent.attr("id").filter(|id| !id.is_empty()) {
                    Some(id) => {
                        steps.push(format!("#{id}"));
                        break;
                    }
                    None => current = parent,
                }
            }
            _ => {
                steps.push(tag);
                break;
            }
        }
    }
    steps.reverse();
    steps.join(" > ")
}

fn find_first(node: &NodeRef, list: &[Complex]) -> Option<NodeRef> {
    for child in node.children() {
        if child.is_element() && matches_any(&child, list) {
            return Some(child);
        }
        if let Some(found) = find_first(&child, list) {
            return Some(found);
        }
    }
    None
}

fn collect_matches(node: &NodeRef, list: &[Complex], out: &mut Vec<NodeRef>) {
    for child in node.children() {
        if child.is_element() && matches_any(&child, list) {
            out.push(child.clone());
        }
        collect_matches(&child, list, out);
    }
}

fn matches_any(node: &NodeRef, list: &[Complex]) -> bool {
    list.iter()
        .any(|cx| matches_at(node, &cx.parts, cx.parts.len() - 1))
}

/// Right-to-left match: does `node` satisfy `parts[..=idx]` as the element
/// bound to `parts[idx]`? Descendant steps try every ancestor, so nested
/// structures with several candidate anchors still match.
fn matches_at(node: &NodeRef, parts: &[(Combinator, Compound)], idx: usize) -> bool {
    if !matches_compound(node, &parts[idx].1) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match parts[idx].0 {
        Combinator::Child => match node.parent() {
            Some(parent) => matches_at(&parent, parts, idx - 1),
            None => false,
        },
        Combinator::Descendant => {
            let mut ancestor = node.parent();
            while let Some(a) = ancestor {
                if matches_at(&a, parts, idx - 1) {
                    return true;
                }
                ancestor = a.parent();
            }
            false
        }
    }
}

fn matches_compound(node: &NodeRef, c: &Compound) -> bool {
    let tag = match node.tag() {
        Some(tag) => tag,
        None => return false,
    };
    if let Some(want) = &c.tag {
        if want != tag {
            return false;
        }
    }
    if let Some(want) = &c.id {
        if node.attr("id").as_deref() != Some(want.as_str()) {
            return false;
        }
    }
    if c.classes.iter().any(|class| !node.has_class(class)) {
        return false;
    }
    for (name, value) in &c.attrs {
        match value {
            None => {
                if !node.has_attr(name) {
                    return false;
                }
            }
            Some(want) => {
                if node.attr(name).as_deref() != Some(want.as_str()) {
                    return false;
                }
            }
        }
    }
    if let Some(n) = c.nth_child {
        let position = match node.parent() {
            Some(parent) => parent
                .element_children()
                .iter()
                .position(|e| e.same_node(node))
                .map(|i| i + 1),
            None => Some(1),
        };
        if position != Some(n) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Parsing

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_ident(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            Some(self.chars[start..self.pos].iter().collect())
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_selector_list(input: &str) -> Option<Vec<Complex>> {
    let mut p = Parser::new(input);
    p.skip_ws();
    let mut list = vec![parse_complex(&mut p)?];
    loop {
        p.skip_ws();
        match p.peek() {
            None => break,
            Some(',') => {
                p.bump();
                p.skip_ws();
                list.push(parse_complex(&mut p)?);
            }
            Some(_) => return None,
        }
    }
    Some(list)
}

fn parse_complex(p: &mut Parser) -> Option<Complex> {
    let mut parts = vec![(Combinator::Descendant, parse_compound(p)?)];
    loop {
        let had_ws = p.skip_ws();
        match p.peek() {
            None | Some(',') => break,
            Some('>') => {
                p.bump();
                p.skip_ws();
                parts.push((Combinator::Child, parse_compound(p)?));
            }
            Some(_) if had_ws => {
                parts.push((Combinator::Descendant, parse_compound(p)?));
            }
            Some(_) => return None,
        }
    }
    Some(Complex { parts })
}

fn parse_compound(p: &mut Parser) -> Option<Compound> {
    let mut c = Compound::default();
    let mut seen = false;
    loop {
        match p.peek() {
            Some('*') => {
                p.bump();
                seen = true;
            }
            Some('#') => {
                p.bump();
                c.id = Some(p.parse_ident()?);
                seen = true;
            }
            Some('.') => {
                p.bump();
                c.classes.push(p.parse_ident()?);
                seen = true;
            }
            Some('[') => {
                p.bump();
                parse_attr(p, &mut c)?;
                seen = true;
            }
            Some(':') => {
                p.bump();
                c.nth_child = Some(parse_nth_child(p)?);
                seen = true;
            }
            Some(ch) if is_ident_char(ch) && !seen => {
                c.tag = Some(p.parse_ident()?.to_ascii_lowercase());
                seen = true;
            }
            _ => break,
        }
    }
    if seen {
        Some(c)
    } else {
        None
    }
}

fn parse_attr(p: &mut Parser, c: &mut Compound) -> Option<()> {
    p.skip_ws();
    let name = p.parse_ident()?.to_ascii_lowercase();
    p.skip_ws();
    match p.peek() {
        Some(']') => {
            p.bump();
            c.attrs.push((name, None));
            Some(())
        }
        Some('=') => {
            p.bump();
            p.skip_ws();
            let value = parse_attr_value(p)?;
            p.skip_ws();
            if p.bump() != Some(']') {
                return None;
            }
            c.attrs.push((name, Some(value)));
            Some(())
        }
        _ => None,
    }
}

fn parse_attr_value(p: &mut Parser) -> Option<String> {
    match p.peek() {
        Some(quote @ ('"' | '\'')) => {
            p.bump();
            let mut value = String::new();
            loop {
                match p.bump() {
                    Some(ch) if ch == quote => return Some(value),
                    Some(ch) => value.push(ch),
                    None => return None,
                }
            }
        }
        _ => {
            let mut value = String::new();
            while matches!(p.peek(), Some(ch) if ch != ']' && !ch.is_whitespace()) {
                value.push(p.bump()?);
            }
            if value.is_empty() {
                None
            } else {
                Some(value)
            }
        }
    }
}

fn parse_nth_child(p: &mut Parser) -> Option<usize> {
    let name = p.parse_ident()?;
    if name != "nth-child" {
        return None;
    }
    if p.bump() != Some('(') {
        return None;
    }
    p.skip_ws();
    let mut digits = String::new();
    while matches!(p.peek(), Some(ch) if ch.is_ascii_digit()) {
        digits.push(p.bump()?);
    }
    p.skip_ws();
    if p.bump() != Some(')') {
        return None;
    }
    let n: usize = digits.parse().ok()?;
    if n == 0 {
        return None;
    }
    Some(n)
}

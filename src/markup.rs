//! HTML-like fragment notation with `[`/`]` selection markers, used for
//! fixtures and for loading documents into the playground.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::editor::{is_void_tag, Position, NBSP};
use crate::tree::{NodeData, NodeId, Tree};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unexpected closing tag </{tag}> at byte {position}")]
    UnexpectedClosingTag { tag: String, position: usize },
    #[error("tag <{0}> is never closed")]
    UnclosedTag(String),
    #[error("unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),
    #[error("more than two selection markers")]
    TooManyMarkers,
}

/// A parsed fragment: the tree, its editable root and the selection markers.
#[derive(Debug)]
pub struct Fixture {
    pub tree: Tree,
    pub root: NodeId,
    pub anchor: Option<Position>,
    pub focus: Option<Position>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
    Anchor,
    Focus,
}

#[derive(Default)]
struct PendingText {
    text: String,
    markers: Vec<(usize, Marker)>,
}

struct Parser {
    tree: Tree,
    stack: Vec<NodeId>,
    pending: PendingText,
    anchor: Option<Position>,
    focus: Option<Position>,
    marker_count: usize,
}

/// Parses `input` as the content of a fresh `<div contenteditable="true">`.
pub fn parse(input: &str) -> Result<Fixture, MarkupError> {
    let mut tree = Tree::new();
    let root = tree.create_element_with("div", &[("contenteditable", "true")]);
    let mut parser = Parser {
        tree,
        stack: vec![root],
        pending: PendingText::default(),
        anchor: None,
        focus: None,
        marker_count: 0,
    };

    let mut chars = input.char_indices().peekable();
    while let Some((position, ch)) = chars.next() {
        match ch {
            '<' => {
                parser.flush();
                let raw = read_tag(&mut chars).ok_or(MarkupError::UnterminatedTag(position))?;
                parser.tag(&raw, position)?;
            }
            '[' => parser.marker(Marker::Anchor)?,
            ']' => parser.marker(Marker::Focus)?,
            '&' => {
                let decoded = read_entity(&mut chars);
                parser.pending.text.push_str(&decoded);
            }
            _ => parser.pending.text.push(ch),
        }
    }
    parser.flush();

    if parser.stack.len() > 1 {
        let open = parser.stack[parser.stack.len() - 1];
        let tag = parser.tree.tag(open).unwrap_or_default().to_string();
        return Err(MarkupError::UnclosedTag(tag));
    }

    let Parser {
        tree,
        anchor,
        focus,
        ..
    } = parser;
    Ok(Fixture {
        tree,
        root,
        anchor: anchor.or(focus),
        focus: focus.or(anchor),
    })
}

impl Parser {
    fn current(&self) -> NodeId {
        self.stack[self.stack.len() - 1]
    }

    fn marker(&mut self, marker: Marker) -> Result<(), MarkupError> {
        self.marker_count += 1;
        if self.marker_count > 2 {
            return Err(MarkupError::TooManyMarkers);
        }
        let offset = self.pending.text.chars().count();
        self.pending.markers.push((offset, marker));
        Ok(())
    }

    fn place(&mut self, marker: Marker, position: Position) {
        match marker {
            Marker::Anchor => self.anchor = Some(position),
            Marker::Focus => self.focus = Some(position),
        }
    }

    /// Turns buffered text into a text node. Markers with no text around
    /// them become child-index positions.
    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let parent = self.current();
        if pending.text.is_empty() {
            let index = self.tree.size(parent);
            for (_, marker) in pending.markers {
                self.place(marker, Position::new(parent, index));
            }
            return;
        }
        let node = self.tree.create_text(pending.text);
        self.tree.append_child(parent, node);
        for (offset, marker) in pending.markers {
            self.place(marker, Position::new(node, offset));
        }
    }

    fn tag(&mut self, raw: &str, position: usize) -> Result<(), MarkupError> {
        if raw.starts_with('!') || raw.starts_with('?') {
            return Ok(());
        }
        if let Some(closing) = raw.strip_prefix('/') {
            let name = closing.trim().to_ascii_lowercase();
            if self.stack.len() > 1 && self.tree.tag(self.current()) == Some(name.as_str()) {
                self.stack.pop();
                return Ok(());
            }
            return Err(MarkupError::UnexpectedClosingTag {
                tag: name,
                position,
            });
        }

        let self_closing = raw.trim_end().ends_with('/');
        let body = raw.trim_end().trim_end_matches('/');
        let (name, rest) = match body.find(|ch: char| ch.is_whitespace()) {
            Some(idx) => (&body[..idx], &body[idx..]),
            None => (body, ""),
        };
        let attributes = parse_attributes(rest);
        let attribute_refs: Vec<(&str, &str)> = attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let node = self.tree.create_element_with(name, &attribute_refs);
        let parent = self.current();
        self.tree.append_child(parent, node);

        let void = self.tree.tag(node).map(is_void_tag).unwrap_or(false);
        if !void && !self_closing {
            self.stack.push(node);
        }
        Ok(())
    }
}

fn read_tag(chars: &mut Peekable<CharIndices<'_>>) -> Option<String> {
    let mut raw = String::new();
    let mut quote: Option<char> = None;
    for (_, ch) in chars.by_ref() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => return Some(raw),
            None => {}
        }
        raw.push(ch);
    }
    None
}

fn read_entity(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch == ';' {
            chars.next();
            return decode_entity(&name).unwrap_or_else(|| format!("&{name};"));
        }
        if (!ch.is_ascii_alphanumeric() && ch != '#') || name.len() > 10 {
            break;
        }
        name.push(ch);
        chars.next();
    }
    format!("&{name}")
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "nbsp" => NBSP,
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}

fn parse_attributes(input: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let mut name = String::new();
        while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace() && *ch != '=') {
            name.push(ch);
        }
        if name.is_empty() {
            break;
        }
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
            match chars.next_if(|ch| *ch == '"' || *ch == '\'') {
                Some(quote) => {
                    for ch in chars.by_ref() {
                        if ch == quote {
                            break;
                        }
                        value.push(ch);
                    }
                }
                None => {
                    while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace()) {
                        value.push(ch);
                    }
                }
            }
        }
        attributes.push((name.to_ascii_lowercase(), decode_text(&value)));
    }
    attributes
}

fn decode_text(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut out = String::new();
    let mut chars = value.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch == '&' {
            out.push_str(&read_entity(&mut chars));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Serializes the children of `node`.
pub fn to_html(tree: &Tree, node: NodeId) -> String {
    to_html_with_selection(tree, node, None, None)
}

/// Serializes the children of `node`, writing `[` at the anchor and `]` at
/// the focus (`[]` when they coincide).
pub fn to_html_with_selection(
    tree: &Tree,
    node: NodeId,
    anchor: Option<Position>,
    focus: Option<Position>,
) -> String {
    let writer = HtmlWriter { tree, anchor, focus };
    let mut out = String::new();
    writer.write_children(node, &mut out);
    out
}

struct HtmlWriter<'a> {
    tree: &'a Tree,
    anchor: Option<Position>,
    focus: Option<Position>,
}

impl HtmlWriter<'_> {
    fn markers_at(&self, position: Position, out: &mut String) {
        if self.anchor == Some(position) {
            out.push('[');
        }
        if self.focus == Some(position) {
            out.push(']');
        }
    }

    fn write_children(&self, node: NodeId, out: &mut String) {
        let children = self.tree.children(node);
        for (index, child) in children.iter().enumerate() {
            self.markers_at(Position::new(node, index), out);
            self.write_node(*child, out);
        }
        self.markers_at(Position::new(node, children.len()), out);
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match self.tree.data(node) {
            NodeData::Text(text) => {
                for (offset, ch) in text.chars().enumerate() {
                    self.markers_at(Position::new(node, offset), out);
                    escape_char(ch, out);
                }
                self.markers_at(Position::new(node, text.chars().count()), out);
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    for ch in value.chars() {
                        match ch {
                            '&' => out.push_str("&amp;"),
                            '"' => out.push_str("&quot;"),
                            _ => out.push(ch),
                        }
                    }
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(&element.tag) {
                    return;
                }
                self.write_children(node, out);
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn escape_char(ch: char, out: &mut String) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        NBSP => out.push_str("&nbsp;"),
        _ => out.push(ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_element_markers() {
        let err = parse("<p>a<b>[]cd</b></p><p>[]<br></p>").unwrap_err();
        assert_eq!(err, MarkupError::TooManyMarkers);

        let fixture = parse("<p>ab[c</p><p>]def</p>").unwrap();
        let anchor = fixture.anchor.unwrap();
        let focus = fixture.focus.unwrap();
        assert_eq!(fixture.tree.text(anchor.node), Some("abc"));
        assert_eq!(anchor.offset, 2);
        assert_eq!(fixture.tree.text(focus.node), Some("def"));
        assert_eq!(focus.offset, 0);

        let fixture = parse("<h1>[]<br></h1>").unwrap();
        let cursor = fixture.anchor.unwrap();
        assert!(fixture.tree.is_tag(cursor.node, "h1"));
        assert_eq!(cursor.offset, 0);
        assert_eq!(fixture.focus, Some(cursor));
    }

    #[test]
    fn serialization_round_trips_markup_and_markers() {
        let inputs = [
            "<p>a<b>[]cd</b>e</p>",
            r#"<div class="oe_unbreakable">a[b</div><p>c]d</p>"#,
            "<p>x&nbsp;y &amp; z</p><p>[]<br></p>",
            r#"<p><span contenteditable="false">x</span>[]</p>"#,
        ];
        for input in inputs {
            let fixture = parse(input).unwrap();
            let html =
                to_html_with_selection(&fixture.tree, fixture.root, fixture.anchor, fixture.focus);
            assert_eq!(html, input);
        }
    }

    #[test]
    fn decodes_entities_and_bare_attributes() {
        let fixture = parse("<p data-x=1 title='a &amp; b'>&#65;&#x42;&lt;&unknown;</p>").unwrap();
        let paragraph = fixture.tree.first_child(fixture.root).unwrap();
        assert_eq!(fixture.tree.attribute(paragraph, "data-x"), Some("1"));
        assert_eq!(fixture.tree.attribute(paragraph, "title"), Some("a & b"));
        let text = fixture.tree.first_child(paragraph).unwrap();
        assert_eq!(fixture.tree.text(text), Some("AB<&unknown;"));
    }

    #[test]
    fn void_and_self_closing_tags_do_not_open_scopes() {
        let fixture = parse("<p>a<br/>b<img src=\"x\">c</p>").unwrap();
        let paragraph = fixture.tree.first_child(fixture.root).unwrap();
        assert_eq!(fixture.tree.children(paragraph).len(), 5);
        assert_eq!(to_html(&fixture.tree, fixture.root), "<p>a<br>b<img src=\"x\">c</p>");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse("<p>a</b>").unwrap_err(),
            MarkupError::UnexpectedClosingTag {
                tag: "b".to_string(),
                position: 4,
            }
        );
        assert_eq!(
            parse("<p><b>a</b>").unwrap_err(),
            MarkupError::UnclosedTag("p".to_string())
        );
        assert_eq!(parse("<p").unwrap_err(), MarkupError::UnterminatedTag(0));
    }
}

//! Builds editable block/inline trees from parsed FTML or Markdown
//! documents.

use tdoc::{ChecklistItem, Document, InlineStyle, Paragraph, Span};

use crate::tree::{NodeId, Tree};

/// Appends the blocks of `document` to `root`.
pub fn import_document(tree: &mut Tree, root: NodeId, document: &Document) {
    for paragraph in &document.paragraphs {
        import_paragraph(tree, root, paragraph);
    }
    if !tree.has_children(root) {
        let block = tree.create_element("p");
        let br = tree.create_element("br");
        tree.append_child(block, br);
        tree.append_child(root, block);
    }
}

fn import_paragraph(tree: &mut Tree, parent: NodeId, paragraph: &Paragraph) {
    match paragraph {
        Paragraph::Text { content } => text_block(tree, parent, "p", content),
        Paragraph::Header1 { content } => text_block(tree, parent, "h1", content),
        Paragraph::Header2 { content } => text_block(tree, parent, "h2", content),
        Paragraph::Header3 { content } => text_block(tree, parent, "h3", content),
        Paragraph::CodeBlock { content } => text_block(tree, parent, "pre", content),
        Paragraph::Quote { children } => {
            let quote = tree.create_element("blockquote");
            tree.append_child(parent, quote);
            for child in children {
                import_paragraph(tree, quote, child);
            }
            fill_if_empty(tree, quote);
        }
        Paragraph::OrderedList { entries } => list(tree, parent, "ol", entries),
        Paragraph::UnorderedList { entries } => list(tree, parent, "ul", entries),
        Paragraph::Checklist { items } => checklist(tree, parent, items),
    }
}

fn text_block(tree: &mut Tree, parent: NodeId, tag: &str, content: &[Span]) {
    let block = tree.create_element(tag);
    tree.append_child(parent, block);
    append_spans(tree, block, content);
    fill_if_empty(tree, block);
}

fn list(tree: &mut Tree, parent: NodeId, tag: &str, entries: &[Vec<Paragraph>]) {
    let list = tree.create_element(tag);
    tree.append_child(parent, list);
    for entry in entries {
        let item = tree.create_element("li");
        tree.append_child(list, item);
        match entry.as_slice() {
            // A lone text paragraph is inlined into the item.
            [Paragraph::Text { content }] => append_spans(tree, item, content),
            paragraphs => {
                for paragraph in paragraphs {
                    import_paragraph(tree, item, paragraph);
                }
            }
        }
        fill_if_empty(tree, item);
    }
}

fn checklist(tree: &mut Tree, parent: NodeId, items: &[ChecklistItem]) {
    let list = tree.create_element_with("ul", &[("class", "o_checklist")]);
    tree.append_child(parent, list);
    for item in items {
        let node = if item.checked {
            tree.create_element_with("li", &[("class", "o_checked")])
        } else {
            tree.create_element("li")
        };
        tree.append_child(list, node);
        append_spans(tree, node, &item.content);
        fill_if_empty(tree, node);
        if !item.children.is_empty() {
            checklist(tree, node, &item.children);
        }
    }
}

fn append_spans(tree: &mut Tree, parent: NodeId, spans: &[Span]) {
    for span in spans {
        append_span(tree, parent, span);
    }
}

fn append_span(tree: &mut Tree, parent: NodeId, span: &Span) {
    let container = match inline_tag(span.style) {
        Some(tag) => {
            let element = match (span.style, span.link_target.as_deref()) {
                (InlineStyle::Link, Some(target)) => tree.create_element_with(tag, &[("href", target)]),
                _ => tree.create_element(tag),
            };
            tree.append_child(parent, element);
            element
        }
        None => parent,
    };
    if !span.text.is_empty() {
        append_text(tree, container, &span.text);
    }
    for child in &span.children {
        append_span(tree, container, child);
    }
}

/// Newlines inside spans become `br` elements.
fn append_text(tree: &mut Tree, parent: NodeId, text: &str) {
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            let br = tree.create_element("br");
            tree.append_child(parent, br);
        }
        if !line.is_empty() {
            let node = tree.create_text(line);
            tree.append_child(parent, node);
        }
    }
}

fn inline_tag(style: InlineStyle) -> Option<&'static str> {
    match style {
        InlineStyle::None => None,
        InlineStyle::Bold => Some("b"),
        InlineStyle::Italic => Some("i"),
        InlineStyle::Highlight => Some("mark"),
        InlineStyle::Underline => Some("u"),
        InlineStyle::Strike => Some("s"),
        InlineStyle::Link => Some("a"),
        InlineStyle::Code => Some("code"),
    }
}

/// Blocks without any content get a placeholder `br`.
fn fill_if_empty(tree: &mut Tree, block: NodeId) {
    if !tree.has_children(block) {
        let br = tree.create_element("br");
        tree.append_child(block, br);
    }
}

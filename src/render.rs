use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::editor::{
    is_block, is_collapsible_whitespace, is_fake_line_break, is_line_break, is_not_editable,
    is_preformatted, is_self_closing, is_visible_char, Position, NBSP, ZWS,
};
use crate::tree::{NodeId, Tree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
}

/// Lays out the blocks below `root` as terminal lines wrapped at `width`.
pub fn render_tree(
    tree: &Tree,
    root: NodeId,
    cursor: Option<Position>,
    width: usize,
) -> RenderResult {
    let mut renderer = Renderer::new(tree, width.max(1), cursor);
    renderer.render_flow(root, "", "");
    renderer.finish()
}

struct Renderer<'a> {
    tree: &'a Tree,
    wrap_width: usize,
    cursor_target: Option<Position>,
    cursor: Option<CursorVisualPosition>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl<'a> Renderer<'a> {
    fn new(tree: &'a Tree, wrap_width: usize, cursor_target: Option<Position>) -> Self {
        Self {
            tree,
            wrap_width,
            cursor_target,
            cursor: None,
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    /// Renders the children of `parent`. Runs of inline children are wrapped
    /// together, block children are separated by blank lines.
    fn render_flow(&mut self, parent: NodeId, first_prefix: &str, continuation_prefix: &str) {
        let tree = self.tree;
        let children = tree.children(parent).to_vec();
        let mut lead = first_prefix.to_string();
        let mut fragments = Vec::new();
        let mut previous_block = false;
        let mut rendered_block = false;

        for (idx, child) in children.iter().copied().enumerate() {
            self.cursor_fragment(parent, idx, Style::default(), &mut fragments);
            if !is_block(tree, child) {
                self.collect_fragments(child, Style::default(), &mut fragments);
                continue;
            }
            if has_content(&fragments) {
                self.flush(&mut fragments, &lead, continuation_prefix);
                lead = continuation_prefix.to_string();
                previous_block = false;
            } else {
                fragments.clear();
            }
            if previous_block {
                self.push_blank_line();
            }
            let before = self.lines.len();
            self.render_block(child, &lead, continuation_prefix);
            if self.lines.len() > before {
                lead = continuation_prefix.to_string();
            }
            previous_block = true;
            rendered_block = true;
        }
        self.cursor_fragment(parent, children.len(), Style::default(), &mut fragments);

        if has_content(&fragments) || !rendered_block {
            self.flush(&mut fragments, &lead, continuation_prefix);
        }
    }

    fn render_block(&mut self, node: NodeId, first_prefix: &str, continuation_prefix: &str) {
        match self.tree.tag(node).unwrap_or_default() {
            "h1" => self.render_header(node, first_prefix, continuation_prefix, HeaderLevel::One),
            "h2" => self.render_header(node, first_prefix, continuation_prefix, HeaderLevel::Two),
            "h3" | "h4" | "h5" | "h6" => {
                self.render_header(node, first_prefix, continuation_prefix, HeaderLevel::Three)
            }
            "pre" => self.render_code_block(node, first_prefix, continuation_prefix),
            "hr" => {
                let rule = self.code_block_fence(first_prefix);
                self.push_plain_line(&rule);
            }
            "blockquote" => {
                let first = format!("{}| ", first_prefix);
                let continuation = format!("{}| ", continuation_prefix);
                self.render_flow(node, &first, &continuation);
            }
            "ul" | "ol" => self.render_list(node, first_prefix, continuation_prefix),
            _ => self.render_flow(node, first_prefix, continuation_prefix),
        }
    }

    fn render_header(
        &mut self,
        node: NodeId,
        first_prefix: &str,
        continuation_prefix: &str,
        level: HeaderLevel,
    ) {
        let fragments = self.inline_fragments(node, Style::default().add_modifier(Modifier::BOLD));
        let lines = wrap_fragments(
            &fragments,
            first_prefix,
            continuation_prefix,
            self.wrap_width,
        );
        self.consume_lines(lines);

        let underline_char = match level {
            HeaderLevel::One => return,
            HeaderLevel::Two => '=',
            HeaderLevel::Three => '-',
        };
        let width = self
            .lines
            .last()
            .map(|line| line_width(line))
            .unwrap_or(0)
            .saturating_sub(visible_width(continuation_prefix));
        let underline = format!(
            "{}{}",
            continuation_prefix,
            underline_string(width, underline_char)
        );
        self.push_plain_line(&underline);
    }

    fn render_code_block(&mut self, node: NodeId, first_prefix: &str, continuation_prefix: &str) {
        let opening = self.code_block_fence(first_prefix);
        self.push_plain_line(&opening);

        let fragments = self.inline_fragments(node, Style::default());
        let lines = wrap_fragments(
            &fragments,
            continuation_prefix,
            continuation_prefix,
            usize::MAX / 4,
        );
        self.consume_lines(lines);

        let closing = self.code_block_fence(continuation_prefix);
        self.push_plain_line(&closing);
    }

    fn render_list(&mut self, list: NodeId, first_prefix: &str, continuation_prefix: &str) {
        let tree = self.tree;
        let ordered = tree.is_tag(list, "ol");
        let checklist = tree.has_class(list, "o_checklist");
        let mut lead = first_prefix.to_string();
        let mut number = 0;

        for item in tree.children(list).iter().copied() {
            if !tree.is_tag(item, "li") {
                if is_block(tree, item) {
                    if number > 0 {
                        self.push_blank_line();
                    }
                    self.render_block(item, &lead, continuation_prefix);
                    lead = continuation_prefix.to_string();
                }
                continue;
            }
            if number > 0 {
                self.push_blank_line();
            }
            number += 1;
            let marker = if checklist {
                if tree.has_class(item, "o_checked") {
                    "[✓] ".to_string()
                } else {
                    "[ ] ".to_string()
                }
            } else if ordered {
                format!("{}. ", number)
            } else {
                "• ".to_string()
            };
            let first = format!("{}{}", lead, marker);
            let continuation = format!(
                "{}{}",
                continuation_prefix,
                " ".repeat(marker.chars().count())
            );
            self.render_flow(item, &first, &continuation);
            lead = continuation_prefix.to_string();
        }
    }

    fn inline_fragments(&self, node: NodeId, style: Style) -> Vec<FragmentItem> {
        let mut fragments = Vec::new();
        self.collect_children(node, style, &mut fragments);
        fragments
    }

    fn collect_children(&self, node: NodeId, style: Style, fragments: &mut Vec<FragmentItem>) {
        let children = self.tree.children(node);
        for (idx, child) in children.iter().copied().enumerate() {
            self.cursor_fragment(node, idx, style, fragments);
            self.collect_fragments(child, style, fragments);
        }
        self.cursor_fragment(node, children.len(), style, fragments);
    }

    fn collect_fragments(&self, node: NodeId, base_style: Style, fragments: &mut Vec<FragmentItem>) {
        let tree = self.tree;
        if let Some(text) = tree.text(node) {
            self.tokenize_text(node, text, base_style, fragments);
            return;
        }
        if is_line_break(tree, node) {
            // Trailing breaks only keep an empty line open.
            if !is_fake_line_break(tree, node) {
                fragments.push(FragmentItem::LineBreak);
            }
            return;
        }
        let style = merge_style(tree, node, base_style);
        if is_self_closing(tree, node) {
            let label = format!("[{}]", tree.tag(node).unwrap_or_default());
            fragments.push(FragmentItem::Token(Fragment::word(
                label,
                style.add_modifier(Modifier::DIM),
            )));
            return;
        }
        self.collect_children(node, style, fragments);
    }

    fn cursor_fragment(
        &self,
        parent: NodeId,
        index: usize,
        style: Style,
        fragments: &mut Vec<FragmentItem>,
    ) {
        if self.cursor_target == Some(Position::new(parent, index)) {
            fragments.push(FragmentItem::Token(Fragment::cursor(style)));
        }
    }

    fn tokenize_text(
        &self,
        node: NodeId,
        text: &str,
        style: Style,
        fragments: &mut Vec<FragmentItem>,
    ) {
        let tree = self.tree;
        let preformatted = is_preformatted(tree, node);
        let cursor = self
            .cursor_target
            .filter(|position| position.node == node)
            .map(|position| position.offset);
        let mut builder: Option<TokenBuilder> = None;
        let mut pending_cursor = false;
        let mut char_count = 0;

        for (offset, ch) in text.chars().enumerate() {
            char_count = offset + 1;
            if cursor == Some(offset) {
                pending_cursor = true;
            }
            if ch == ZWS || ch == '\r' {
                continue;
            }
            if preformatted && ch == '\n' {
                finish_token(&mut builder, &mut pending_cursor, style, fragments);
                fragments.push(FragmentItem::LineBreak);
                continue;
            }

            let (glyph, repeat, is_whitespace) = if ch == NBSP {
                (' ', 1, false)
            } else if is_collapsible_whitespace(ch) {
                if !preformatted && !is_visible_char(tree, node, offset) {
                    continue;
                }
                (' ', if preformatted && ch == '\t' { 4 } else { 1 }, true)
            } else {
                (ch, 1, false)
            };

            for _ in 0..repeat {
                let continues = builder
                    .as_ref()
                    .map(|existing| existing.kind_matches(is_whitespace))
                    .unwrap_or(false);
                if !continues {
                    if let Some(existing) = builder.take() {
                        fragments.push(FragmentItem::Token(existing.finish()));
                    }
                    builder = Some(TokenBuilder::new(style, is_whitespace));
                }
                if let Some(current) = builder.as_mut() {
                    if std::mem::take(&mut pending_cursor) {
                        current.mark_cursor();
                    }
                    current.push_char(glyph);
                }
            }
        }

        if cursor == Some(char_count) {
            pending_cursor = true;
        }
        finish_token(&mut builder, &mut pending_cursor, style, fragments);
    }

    fn flush(
        &mut self,
        fragments: &mut Vec<FragmentItem>,
        first_prefix: &str,
        continuation_prefix: &str,
    ) {
        let lines = wrap_fragments(fragments, first_prefix, continuation_prefix, self.wrap_width);
        fragments.clear();
        self.consume_lines(lines);
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
        self.current_line_index += 1;
    }

    fn push_plain_line(&mut self, content: &str) {
        let span = Span::raw(content.to_string());
        self.lines.push(Line::from(vec![span]));
        self.current_line_index += 1;
    }

    fn code_block_fence(&self, prefix: &str) -> String {
        const MIN_FENCE_WIDTH: usize = 4;
        let available_width = self.wrap_width.saturating_sub(visible_width(prefix));
        let dash_count = available_width.max(MIN_FENCE_WIDTH);
        format!("{}{}", prefix, "-".repeat(dash_count))
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            if self.cursor.is_none() {
                if let Some(column) = output.cursor_columns.first() {
                    self.cursor = Some(CursorVisualPosition {
                        line: self.current_line_index,
                        column: *column,
                    });
                }
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
        }
    }
}

#[derive(Copy, Clone)]
enum HeaderLevel {
    One,
    Two,
    Three,
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    cursor_columns: Vec<u16>,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    /// Cursor offsets in columns from the start of the fragment.
    cursors: Vec<usize>,
}

impl Fragment {
    fn word(text: String, style: Style) -> Self {
        let width = visible_width(&text);
        Self {
            text,
            style,
            kind: FragmentKind::Word,
            width,
            cursors: Vec::new(),
        }
    }

    fn cursor(style: Style) -> Self {
        Self {
            text: String::new(),
            style,
            kind: FragmentKind::Word,
            width: 0,
            cursors: vec![0],
        }
    }
}

#[derive(Clone, Copy)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

fn has_content(fragments: &[FragmentItem]) -> bool {
    fragments.iter().any(|item| match item {
        FragmentItem::LineBreak => true,
        FragmentItem::Token(token) => !token.text.is_empty() || !token.cursors.is_empty(),
    })
}

fn merge_style(tree: &Tree, node: NodeId, base: Style) -> Style {
    let style = match tree.tag(node).unwrap_or_default() {
        "b" | "strong" => base.add_modifier(Modifier::BOLD),
        "i" | "em" => base.add_modifier(Modifier::ITALIC),
        "mark" => base.add_modifier(Modifier::REVERSED),
        "u" | "ins" => base.add_modifier(Modifier::UNDERLINED),
        "s" | "strike" | "del" => base.add_modifier(Modifier::CROSSED_OUT),
        "a" => base.add_modifier(Modifier::UNDERLINED).fg(Color::Blue),
        "code" => base.add_modifier(Modifier::DIM),
        _ => base,
    };
    if is_not_editable(tree, node) {
        style.fg(Color::DarkGray)
    } else {
        style
    }
}

fn finish_token(
    builder: &mut Option<TokenBuilder>,
    pending_cursor: &mut bool,
    style: Style,
    fragments: &mut Vec<FragmentItem>,
) {
    match builder.take() {
        Some(mut token) => {
            if std::mem::take(pending_cursor) {
                token.mark_cursor();
            }
            fragments.push(FragmentItem::Token(token.finish()));
        }
        None => {
            if std::mem::take(pending_cursor) {
                fragments.push(FragmentItem::Token(Fragment::cursor(style)));
            }
        }
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    cursors: Vec<usize>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            cursors: Vec::new(),
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn mark_cursor(&mut self) {
        self.cursors.push(self.width);
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            cursors: self.cursors,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix);
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.current_width() > builder.prefix_width
                        && builder.current_width() + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix);
                    }

                    builder.append_with_pending(token.clone(), &mut pending_whitespace);
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    cursor_columns: Vec<u16>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: Style::default(),
            });
        }
        Self {
            segments,
            cursor_columns: Vec::new(),
            width: prefix_width,
            prefix_width,
        }
    }

    fn current_width(&self) -> usize {
        self.width
    }

    fn append_with_pending(&mut self, token: Fragment, pending_whitespace: &mut Vec<Fragment>) {
        self.consume_pending(pending_whitespace);
        self.append_token(token);
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        for offset in &fragment.cursors {
            self.cursor_columns.push((self.width + offset) as u16);
        }
        if !fragment.text.is_empty() {
            self.width += fragment.width;
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        self.cursor_columns.sort_unstable();
        LineOutput {
            spans: self.segments,
            cursor_columns: self.cursor_columns,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| visible_width(span.content.as_ref()))
        .sum()
}

fn underline_string(width: usize, ch: char) -> String {
    std::iter::repeat(ch).take(width.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    fn render(input: &str, width: usize) -> RenderResult {
        let fixture = parse(input).expect("valid markup");
        render_tree(&fixture.tree, fixture.root, fixture.anchor, width)
    }

    fn texts(result: &RenderResult) -> Vec<String> {
        result
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn separates_blocks_with_blank_lines() {
        let result = render("<p>Hello <b>World</b></p><p>Second</p>", 80);
        assert_eq!(texts(&result), vec!["Hello World", "", "Second"]);
        assert_eq!(result.total_lines, 3);
    }

    #[test]
    fn wraps_words_at_width() {
        let result = render("<p>alpha beta gamma</p>", 10);
        assert_eq!(texts(&result), vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn styles_inline_elements() {
        let result = render("<p><b>bold</b><a href=\"x\">link</a></p>", 80);
        let spans = &result.lines[0].spans;
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(spans[1].style.fg, Some(Color::Blue));
    }

    #[test]
    fn locates_cursor_inside_text() {
        let result = render("<p>one</p><p>ab[]cd</p>", 80);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 2, column: 2 })
        );
    }

    #[test]
    fn locates_cursor_in_empty_block() {
        let result = render("<p>[]<br></p>", 80);
        assert_eq!(texts(&result), vec![""]);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 0 })
        );
    }

    #[test]
    fn renders_lists_with_markers() {
        let result = render(
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol>\
             <ul class=\"o_checklist\"><li class=\"o_checked\">done</li></ul>",
            80,
        );
        assert_eq!(
            texts(&result),
            vec!["• one", "", "• two", "", "1. first", "", "[✓] done"]
        );
    }

    #[test]
    fn underlines_secondary_headers() {
        let result = render("<h2>Title</h2>", 80);
        assert_eq!(texts(&result), vec!["Title", "====="]);
        assert!(result.lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn prefixes_quotes() {
        let result = render("<blockquote><p>quoted</p></blockquote>", 80);
        assert_eq!(texts(&result), vec!["| quoted"]);
    }

    #[test]
    fn skips_placeholder_breaks() {
        let result = render("<p><br></p><p>x<br>y</p>", 80);
        assert_eq!(texts(&result), vec!["", "", "x", "y"]);
    }

    #[test]
    fn collapses_whitespace_but_keeps_nbsp() {
        assert_eq!(texts(&render("<p>a   b </p>", 80)), vec!["a b"]);
        assert_eq!(texts(&render("<p>a&nbsp;&nbsp;b</p>", 80)), vec!["a  b"]);
    }

    #[test]
    fn keeps_preformatted_lines() {
        let result = render("<pre>a  b\nc</pre>", 8);
        assert_eq!(texts(&result), vec!["--------", "a  b", "c", "--------"]);
    }
}

use super::*;

fn load(input: &str) -> (Tree, NodeId, Range) {
    let fixture = markup::parse(input).expect("valid fixture markup");
    let anchor = fixture.anchor.expect("fixture has a selection");
    let focus = fixture.focus.expect("fixture has a selection");
    let range = Range::new(&fixture.tree, anchor, focus);
    (fixture.tree, fixture.root, range)
}

fn child_path(tree: &Tree, root: NodeId, path: &[usize]) -> NodeId {
    path.iter()
        .fold(root, |node, index| tree.children(node)[*index])
}

#[test]
fn previous_zero_width_space_joins_the_range() {
    let (tree, root, range) = load("<p>a\u{200B}[]b</p>");
    let adjusted = include_previous_zws(&tree, root, range);
    assert_eq!(adjusted.start, Position::new(range.start.node, 1));
    assert_eq!(adjusted.end, range.end);

    let (tree, root, range) = load("<p>ab[]c</p>");
    assert_eq!(include_previous_zws(&tree, root, range), range);
}

#[test]
fn next_zero_width_space_joins_the_range() {
    let (tree, root, range) = load("<p>a[]\u{200B}b</p>");
    let adjusted = include_next_zws(&tree, root, range);
    assert_eq!(adjusted.start, range.start);
    assert_eq!(adjusted.end, Position::new(range.end.node, 2));
}

#[test]
fn empty_inline_is_swallowed_whole() {
    let (tree, root, range) = load("<p>a<b>\u{200B}[]</b>c</p>");
    let paragraph = child_path(&tree, root, &[0]);
    let adjusted = include_empty_inline_end(&tree, root, range);
    assert_eq!(adjusted.end, Position::new(paragraph, 2));

    let (tree, root, range) = load("<p>a<b>[]\u{200B}</b>c</p>");
    let paragraph = child_path(&tree, root, &[0]);
    let adjusted = include_empty_inline_start(&tree, root, range);
    assert_eq!(adjusted.start, Position::new(paragraph, 1));
}

#[test]
fn non_empty_inline_is_left_alone() {
    let (tree, root, range) = load("<p>a<b>x[]</b>c</p>");
    assert_eq!(include_empty_inline_end(&tree, root, range), range);
}

#[test]
fn range_ending_a_block_extends_past_it() {
    let (tree, root, range) = load("<h1>[abc</h1><p>def]</p>");
    let adjusted = include_end_or_start_block(&tree, root, range);
    assert_eq!(adjusted.start, range.start);
    assert_eq!(adjusted.end, Position::new(root, 2));
}

#[test]
fn range_starting_a_block_extends_before_it() {
    let (tree, root, range) = load("<p>[ab</p><p>c]d</p>");
    let adjusted = include_end_or_start_block(&tree, root, range);
    assert_eq!(adjusted.start, Position::new(root, 0));
    assert_eq!(adjusted.end, range.end);
}

#[test]
fn range_inside_one_block_is_unchanged() {
    let (tree, root, range) = load("<p>a[b]c</p>");
    assert_eq!(include_end_or_start_block(&tree, root, range), range);
}

#[test]
fn triple_click_end_is_pulled_back_into_the_previous_block() {
    let (tree, root, range) = load("<p>[abc</p><p>]def</p>");
    let first = child_path(&tree, root, &[0, 0]);
    let adjusted = correct_triple_click(&tree, root, range);
    assert_eq!(adjusted.end, Position::new(first, 3));
    assert_eq!(adjusted.start, range.start);
}

#[test]
fn end_after_content_is_not_a_triple_click() {
    let (tree, root, range) = load("<p>[abc</p><p>d]ef</p>");
    assert_eq!(correct_triple_click(&tree, root, range), range);
}

#[test]
fn non_editable_island_is_selected_whole() {
    let (tree, root, range) =
        load(r#"<p>a[b<span contenteditable="false">x]y</span>c</p>"#);
    let paragraph = child_path(&tree, root, &[0]);
    let adjusted = expand_non_editables(&tree, root, range);
    assert_eq!(adjusted.start, range.start);
    assert_eq!(adjusted.end, Position::new(paragraph, 2));
}

#[test]
fn selection_steps_run_in_order() {
    let (tree, root, range) = load("<h1>[abc</h1><p>]def</p>");
    let first = child_path(&tree, root, &[0, 0]);
    let adjusted = adjust_range(&tree, root, range, DELETE_SELECTION_STEPS);
    // Once the end is pulled back the range lives inside the heading, so no
    // block boundary is added.
    assert_eq!(adjusted.start, Position::new(first, 0));
    assert_eq!(adjusted.end, Position::new(first, 3));
    assert_eq!(adjusted.common_ancestor, child_path(&tree, root, &[0]));
}

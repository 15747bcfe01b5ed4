use super::classify::{has_content_before, renders_content, trailing_line_break};
use super::*;

fn load(input: &str) -> (Tree, NodeId) {
    let fixture = markup::parse(input).expect("valid fixture markup");
    (fixture.tree, fixture.root)
}

fn node_at(tree: &Tree, root: NodeId, path: &[usize]) -> NodeId {
    path.iter()
        .fold(root, |node, index| tree.children(node)[*index])
}

#[test]
fn block_and_void_tags() {
    let (tree, root) = load("<p>a<b>b</b><br><img></p><ul><li>x</li></ul>");
    let paragraph = node_at(&tree, root, &[0]);
    assert!(is_block(&tree, paragraph));
    assert!(is_block(&tree, root));
    assert!(is_inline(&tree, node_at(&tree, root, &[0, 1])));
    assert!(is_inline(&tree, node_at(&tree, root, &[0, 0])));
    assert!(is_self_closing(&tree, node_at(&tree, root, &[0, 2])));
    assert!(is_self_closing(&tree, node_at(&tree, root, &[0, 3])));
    assert!(!is_self_closing(&tree, paragraph));
    assert!(is_block(&tree, node_at(&tree, root, &[1, 0])));

    assert!(is_void_tag("br"));
    assert!(is_void_tag("hr"));
    assert!(!is_void_tag("span"));
}

#[test]
fn placeholder_containers() {
    let (tree, root) = load("<p>a</p><ul><li>x</li></ul><br>");
    assert!(can_hold_placeholder(&tree, node_at(&tree, root, &[0])));
    assert!(!can_hold_placeholder(&tree, node_at(&tree, root, &[1])));
    assert!(can_hold_placeholder(&tree, node_at(&tree, root, &[1, 0])));
    assert!(!can_hold_placeholder(&tree, node_at(&tree, root, &[2])));
    assert!(!can_hold_placeholder(&tree, node_at(&tree, root, &[0, 0])));
}

#[test]
fn trailing_break_without_content_after_is_fake() {
    let (tree, root) = load("<p>ab<br></p>");
    assert!(is_fake_line_break(&tree, node_at(&tree, root, &[0, 1])));

    let (tree, root) = load("<p>ab<br>c</p>");
    assert!(!is_fake_line_break(&tree, node_at(&tree, root, &[0, 1])));

    let (tree, root) = load("<p>ab<br><br></p>");
    assert!(!is_fake_line_break(&tree, node_at(&tree, root, &[0, 1])));
    assert!(is_fake_line_break(&tree, node_at(&tree, root, &[0, 2])));

    let (tree, root) = load("<p>ab</p>");
    assert!(!is_fake_line_break(&tree, node_at(&tree, root, &[0, 0])));
}

#[test]
fn break_followed_by_collapsed_space_is_still_fake() {
    let (tree, root) = load("<p>ab<br> </p>");
    assert!(is_fake_line_break(&tree, node_at(&tree, root, &[0, 1])));
}

#[test]
fn preformatted_context() {
    let (tree, root) = load(
        r#"<pre>a</pre><div style="color: red; white-space: pre-wrap"><b>b</b></div><p>c</p>"#,
    );
    assert!(is_preformatted(&tree, node_at(&tree, root, &[0, 0])));
    assert!(is_preformatted(&tree, node_at(&tree, root, &[1, 0, 0])));
    assert!(!is_preformatted(&tree, node_at(&tree, root, &[2, 0])));
}

#[test]
fn emptiness_ignores_zero_width_spaces_but_not_islands() {
    let (tree, root) = load(
        r#"<p><b>&#8203;</b><i> </i><span contenteditable="false"></span><br></p>"#,
    );
    assert!(is_empty(&tree, node_at(&tree, root, &[0, 0])));
    assert!(is_empty(&tree, node_at(&tree, root, &[0, 1])));
    assert!(!is_empty(&tree, node_at(&tree, root, &[0, 2])));
    assert!(!is_empty(&tree, node_at(&tree, root, &[0, 3])));
    assert!(!is_empty(&tree, node_at(&tree, root, &[0])));
}

#[test]
fn zero_width_space_markers() {
    let (tree, root) = load(
        "<p>\u{200B}<b data-oe-zws-empty-inline=\"\">\u{200B}</b>a\u{200B}</p>",
    );
    assert!(is_zws_marker(&tree, node_at(&tree, root, &[0, 0])));
    assert!(is_zws_marker(&tree, node_at(&tree, root, &[0, 1])));
    assert!(!is_zws_marker(&tree, node_at(&tree, root, &[0, 2])));
    assert!(!is_zws_marker(&tree, node_at(&tree, root, &[0])));
}

#[test]
fn editability_is_inherited() {
    let (tree, root) = load(
        r#"<p>a<span contenteditable="false">b<i>c</i><em contenteditable="true">d</em></span></p>"#,
    );
    let island = node_at(&tree, root, &[0, 1]);
    let nested = node_at(&tree, root, &[0, 1, 1, 0]);
    let reopened = node_at(&tree, root, &[0, 1, 2, 0]);
    assert!(is_editable(&tree, node_at(&tree, root, &[0, 0])));
    assert!(is_not_editable(&tree, island));
    assert!(!is_editable(&tree, nested));
    assert!(!is_not_editable(&tree, nested));
    assert!(is_editable(&tree, reopened));
}

#[test]
fn outermost_island_stops_below_limit() {
    let (tree, root) = load(
        r#"<div contenteditable="false"><p>a<span contenteditable="false">b</span></p></div>"#,
    );
    let outer = node_at(&tree, root, &[0]);
    let inner = node_at(&tree, root, &[0, 0, 1]);
    let text = node_at(&tree, root, &[0, 0, 1, 0]);
    assert_eq!(outermost_non_editable(&tree, text, root), Some(outer));
    assert_eq!(outermost_non_editable(&tree, text, outer), Some(inner));
    assert_eq!(outermost_non_editable(&tree, text, inner), None);
}

#[test]
fn closest_block_and_element() {
    let (tree, root) = load("<h1>a<b>b</b></h1>c");
    let heading = node_at(&tree, root, &[0]);
    let bold = node_at(&tree, root, &[0, 1]);
    let bold_text = node_at(&tree, root, &[0, 1, 0]);
    assert_eq!(closest_block(&tree, bold_text), heading);
    assert_eq!(closest_block(&tree, heading), heading);
    assert_eq!(closest_block(&tree, node_at(&tree, root, &[1])), root);
    assert_eq!(closest_element(&tree, bold_text), bold);
    assert_eq!(closest_element(&tree, bold), bold);
}

#[test]
fn leaves_that_render_content() {
    let (tree, root) = load(
        r#"<p> <br><span contenteditable="false"></span>a</p><p>b<i></i><br></p>"#,
    );
    let first = node_at(&tree, root, &[0]);
    assert!(!renders_content(&tree, node_at(&tree, root, &[0, 0])));
    assert!(renders_content(&tree, node_at(&tree, root, &[0, 1])));
    assert!(renders_content(&tree, node_at(&tree, root, &[0, 2])));
    assert!(renders_content(&tree, node_at(&tree, root, &[0, 3])));
    assert!(!renders_content(&tree, first));

    let second = node_at(&tree, root, &[1]);
    let br = node_at(&tree, root, &[1, 2]);
    assert_eq!(trailing_line_break(&tree, second), Some(br));
    assert_eq!(trailing_line_break(&tree, first), None);
    assert!(has_content_before(&tree, br, second));
    assert!(!has_content_before(&tree, node_at(&tree, root, &[0, 0]), first));
}

#[test]
fn break_before_a_nested_block_is_fake() {
    let (tree, root) = load("<div>a<br><p>b</p></div>");
    assert!(is_fake_line_break(&tree, node_at(&tree, root, &[0, 1])));
}

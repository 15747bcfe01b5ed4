use rte_delete::{
    import::import_document,
    render::render_tree,
    tree::{Checkpoint, char_to_byte_idx},
    Command, Editor, NodeId, Position, Tree,
};
use std::time::{Duration, Instant};
use tdoc::{Document, InlineStyle, Paragraph, Span};

/// Performance benchmark suite for the deletion engine
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Character deletion inside a paragraph
/// - Block joins
/// - Selection deletion across many blocks
/// - Cursor movement over visible positions
/// - Terminal rendering of the tree
const SMALL_DOC_PARAGRAPHS: usize = 10;
const MEDIUM_DOC_PARAGRAPHS: usize = 100;
const LARGE_DOC_PARAGRAPHS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Create a test document with the specified number of paragraphs
fn create_test_document(num_paragraphs: usize, avg_words_per_para: usize) -> Document {
    let mut paragraphs = Vec::with_capacity(num_paragraphs);

    for i in 0..num_paragraphs {
        let mut text = String::new();
        for j in 0..avg_words_per_para {
            if j > 0 {
                text.push(' ');
            }
            text.push_str(SAMPLE_WORDS[(i + j) % SAMPLE_WORDS.len()]);
        }

        let content = vec![Span::new_text(&text)];
        let paragraph = match i % 5 {
            0 => Paragraph::Header1 { content },
            1 => Paragraph::Header2 { content },
            2 => Paragraph::Header3 { content },
            3 => Paragraph::CodeBlock { content },
            _ => Paragraph::new_text().with_content(content),
        };
        paragraphs.push(paragraph);
    }

    Document::new().with_paragraphs(paragraphs)
}

/// Create a document where every paragraph mixes bold and italic runs
fn create_styled_document(num_paragraphs: usize) -> Document {
    let paragraphs = (0..num_paragraphs)
        .map(|i| {
            let mut bold = Span::new_text("some bold");
            bold.style = InlineStyle::Bold;
            let mut italic = Span::new_text(" and italic");
            italic.style = InlineStyle::Italic;
            Paragraph::new_text().with_content(vec![
                Span::new_text(&format!("This is paragraph {} with ", i)),
                bold,
                italic,
                Span::new_text(" text."),
            ])
        })
        .collect();
    Document::new().with_paragraphs(paragraphs)
}

fn create_editor(document: &Document) -> Editor {
    let mut tree = Tree::new();
    let root = tree.create_element_with("div", &[("contenteditable", "true")]);
    import_document(&mut tree, root, document);
    Editor::new(tree, root)
}

/// First text node of the block at `index` below the root.
fn block_text(editor: &Editor, index: usize) -> NodeId {
    let tree = editor.tree();
    let mut node = tree.children(editor.root())[index];
    while let Some(child) = tree.first_child(node) {
        node = child;
    }
    node
}

/// Runs `command` from the given selection, then rolls the tree back so
/// every iteration sees the same document.
fn run_and_revert(
    editor: &mut Editor,
    checkpoint: Checkpoint,
    anchor: Position,
    focus: Position,
    command: Command,
) {
    editor
        .set_selection(anchor, focus)
        .expect("benchmark selection is valid");
    let _ = editor.execute(command);
    editor.tree_mut().revert_to(checkpoint);
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

fn sized_documents() -> Vec<(&'static str, Document)> {
    vec![
        (
            "Small (10 paras)",
            create_test_document(SMALL_DOC_PARAGRAPHS, 20),
        ),
        (
            "Medium (100 paras)",
            create_test_document(MEDIUM_DOC_PARAGRAPHS, 20),
        ),
        (
            "Large (1000 paras)",
            create_test_document(LARGE_DOC_PARAGRAPHS, 20),
        ),
    ]
}

#[test]
fn bench_delete_backward_in_text() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           DELETE BACKWARD INSIDE TEXT                          ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents() {
        let mut editor = create_editor(&doc);
        // Plain paragraphs sit at every index that is 4 mod 5.
        let text = block_text(&editor, 4);
        let cursor = Position::new(text, 5);
        let checkpoint = editor.tree().checkpoint();

        let result = benchmark(
            &format!("delete_backward (char) - {}", name),
            ITERATIONS,
            || run_and_revert(&mut editor, checkpoint, cursor, cursor, Command::DeleteBackward),
        );
        result.print();
    }
}

#[test]
fn bench_delete_backward_block_join() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           DELETE BACKWARD JOINING BLOCKS                       ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents() {
        let mut editor = create_editor(&doc);
        let text = block_text(&editor, 4);
        let cursor = Position::new(text, 0);
        let checkpoint = editor.tree().checkpoint();

        let result = benchmark(
            &format!("delete_backward (join) - {}", name),
            ITERATIONS,
            || run_and_revert(&mut editor, checkpoint, cursor, cursor, Command::DeleteBackward),
        );
        result.print();
    }
}

#[test]
fn bench_delete_selection_across_blocks() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           DELETE SELECTION ACROSS BLOCKS                       ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents() {
        let mut editor = create_editor(&doc);
        let count = editor.tree().children(editor.root()).len();
        let anchor = Position::new(block_text(&editor, 1), 3);
        let focus = Position::new(block_text(&editor, count - 2), 3);
        let checkpoint = editor.tree().checkpoint();

        let result = benchmark(
            &format!("delete_selection ({} blocks) - {}", count - 2, name),
            if count > 500 { 10 } else { ITERATIONS },
            || run_and_revert(&mut editor, checkpoint, anchor, focus, Command::DeleteSelection),
        );
        result.print();
    }
}

#[test]
fn bench_delete_in_styled_document() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           DELETE ACROSS INLINE STYLES                          ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let doc = create_styled_document(MEDIUM_DOC_PARAGRAPHS);
    let mut editor = create_editor(&doc);
    let root = editor.root();
    let paragraph = editor.tree().children(root)[10];
    // Inside the bold run, right after "some".
    let bold = editor.tree().children(paragraph)[1];
    let bold_text = editor.tree().children(bold)[0];
    let next_paragraph = editor.tree().children(root)[11];
    let next_italic = editor.tree().children(next_paragraph)[2];
    let next_italic_text = editor.tree().children(next_italic)[0];
    let checkpoint = editor.tree().checkpoint();

    let anchor = Position::new(bold_text, 4);
    let focus = Position::new(next_italic_text, 4);
    let result = benchmark("delete_selection across styles", ITERATIONS, || {
        run_and_revert(&mut editor, checkpoint, anchor, focus, Command::DeleteSelection)
    });
    result.print();

    let result = benchmark("delete_forward at end of bold run", ITERATIONS, || {
        let end = Position::new(bold_text, 9);
        run_and_revert(&mut editor, checkpoint, end, end, Command::DeleteForward)
    });
    result.print();
}

#[test]
fn bench_cursor_movement() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           VISIBLE POSITION WALK                                ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let doc = create_test_document(SMALL_DOC_PARAGRAPHS, 20);
    let editor = create_editor(&doc);
    let start = editor.selection().focus;

    let result = benchmark("find_next_position through document", 10, || {
        let mut position = start;
        let mut steps = 0;
        while let Some(next) = editor.find_next_position(position) {
            position = next;
            steps += 1;
        }
        assert!(steps > 0);
    });
    result.print();
}

#[test]
fn bench_render_tree() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents() {
        let editor = create_editor(&doc);
        let cursor = Some(editor.selection().focus);
        let result = benchmark(
            &format!("render_tree - {}", name),
            if name.contains("Large") { 10 } else { ITERATIONS },
            || {
                let _ = render_tree(editor.tree(), editor.root(), cursor, 80);
            },
        );
        result.print();
    }
}

#[test]
fn bench_char_to_byte_conversion() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║         CHAR-TO-BYTE CONVERSION BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let text_samples = vec![
        ("Short ASCII (50 chars)", "a".repeat(50)),
        ("Long ASCII (5000 chars)", "a".repeat(5000)),
        ("Medium Unicode (500 chars)", "🔥".repeat(500)),
    ];

    for (name, text) in text_samples {
        let char_count = text.chars().count();
        let mid_point = char_count / 2;

        let result = benchmark(
            &format!("char_to_byte_idx (middle of {}) - {}", char_count, name),
            ITERATIONS * 10,
            || {
                let _ = char_to_byte_idx(&text, mid_point);
            },
        );
        result.print();
    }
}

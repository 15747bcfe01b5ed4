use std::{
    env,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position as ScreenPosition},
    style::{Color, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tdoc::{Document, markdown, parse};

use rte_delete::import::import_document;
use rte_delete::markup;
use rte_delete::render::{RenderResult, render_tree};
use rte_delete::tree::Checkpoint;
use rte_delete::{Command, Editor, Position, Tree};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Html,
    Ftml,
    Markdown,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("html") | Some("htm") => DocumentFormat::Html,
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            _ => DocumentFormat::Ftml,
        }
    }
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: rte <file.html|file.ftml|file.md>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    configure_logging()?;
    let (editor, initial_status) = load_editor(&path)?;
    let mut app = App::new(editor, path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Logs go to the file named by `RTE_LOG`; the terminal belongs to the UI.
fn configure_logging() -> Result<()> {
    let Some(log_path) = env::var_os("RTE_LOG") else {
        return Ok(());
    };
    let file = File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.to_string_lossy()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rte_delete=debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .ok();
    Ok(())
}

fn load_editor(path: &Path) -> Result<(Editor, Option<String>)> {
    if !path.exists() {
        let editor = editor_from_document(&Document::new());
        return Ok((editor, Some("New document".to_string())));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let format = DocumentFormat::from_path(path);
    let parsed = match format {
        DocumentFormat::Html => {
            let fixture = markup::parse(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            let editor = Editor::from_fixture(fixture)
                .with_context(|| format!("invalid selection markers in {}", path.display()))?;
            return Ok((editor, None));
        }
        DocumentFormat::Ftml => parse(io::Cursor::new(content))
            .map_err(|err| -> Box<dyn std::error::Error + Send + Sync> { Box::new(err) }),
        DocumentFormat::Markdown => markdown::parse(io::Cursor::new(content)),
    };
    match parsed {
        Ok(document) => Ok((editor_from_document(&document), None)),
        Err(err) => {
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((editor_from_document(&Document::new()), Some(message)))
        }
    }
}

fn editor_from_document(document: &Document) -> Editor {
    let mut tree = Tree::new();
    let root = tree.create_element_with("div", &[("contenteditable", "true")]);
    import_document(&mut tree, root, document);
    Editor::new(tree, root)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt);
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

/// Tree state before a command that changed it.
struct UndoEntry {
    checkpoint: Checkpoint,
    anchor: Position,
    focus: Position,
}

struct App {
    editor: Editor,
    path: PathBuf,
    history: Vec<UndoEntry>,
    status_message: Option<(String, Instant)>,
    scroll_top: usize,
    should_quit: bool,
}

impl App {
    fn new(editor: Editor, path: PathBuf, initial_status: Option<String>) -> Self {
        Self {
            editor,
            path,
            history: Vec::new(),
            status_message: initial_status.map(|message| (message, Instant::now())),
            scroll_top: 0,
            should_quit: false,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn prune_status_message(&mut self) {
        if let Some((_, since)) = &self.status_message
            && since.elapsed() >= STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };

        match (code, modifiers) {
            (KeyCode::Esc, _) => self.should_quit = true,
            (KeyCode::Char('q'), m) | (KeyCode::Char('c'), m)
                if m.contains(KeyModifiers::CONTROL) =>
            {
                self.should_quit = true;
            }
            (KeyCode::Char('z'), m) if m.contains(KeyModifiers::CONTROL) => self.undo(),
            (KeyCode::Char('x'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.run_command(Command::DeleteSelection)
            }
            (KeyCode::Backspace, _) => self.run_command(Command::DeleteBackward),
            (KeyCode::Delete, _) => self.run_command(Command::DeleteForward),
            (KeyCode::Left, m) => self.move_focus(false, m.contains(KeyModifiers::SHIFT)),
            (KeyCode::Right, m) => self.move_focus(true, m.contains(KeyModifiers::SHIFT)),
            _ => {}
        }
    }

    fn run_command(&mut self, command: Command) {
        let checkpoint = self.editor.tree().checkpoint();
        let selection = *self.editor.selection();
        if self.editor.execute(command) {
            self.history.push(UndoEntry {
                checkpoint,
                anchor: selection.anchor,
                focus: selection.focus,
            });
            self.set_status(format!("{command}"));
        } else {
            self.set_status(format!("{command}: nothing to delete"));
        }
    }

    fn undo(&mut self) {
        let Some(entry) = self.history.pop() else {
            self.set_status("Nothing to undo");
            return;
        };
        self.editor.tree_mut().revert_to(entry.checkpoint);
        match self.editor.set_selection(entry.anchor, entry.focus) {
            Ok(_) => self.set_status("Undone"),
            Err(err) => self.set_status(format!("Undone, selection lost: {err}")),
        }
    }

    fn move_focus(&mut self, forward: bool, extend: bool) {
        let selection = *self.editor.selection();
        let focus = if !extend && !selection.is_collapsed() {
            if forward {
                selection.range.end
            } else {
                selection.range.start
            }
        } else {
            let next = if forward {
                self.editor.find_next_position(selection.focus)
            } else {
                self.editor.find_previous_position(selection.focus)
            };
            let Some(next) = next else {
                return;
            };
            next
        };
        let anchor = if extend { selection.anchor } else { focus };
        if let Err(err) = self.editor.set_selection(anchor, focus) {
            self.set_status(format!("Cannot move: {err}"));
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(vertical[0]);
        let text_area = horizontal[0];
        let markup_area = horizontal[1];
        let status_area = vertical[1];

        let wrap_width = (text_area.width as usize).saturating_sub(1).max(1);
        let focus = self.editor.selection().focus;
        let render = render_tree(
            self.editor.tree(),
            self.editor.root(),
            Some(focus),
            wrap_width,
        );
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(ScreenPosition::new(cursor_x, cursor_y));
        }

        let markup = Paragraph::new(self.editor.html_with_selection())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::LEFT).title(" HTML "));
        frame.render_widget(markup, markup_area);

        let status_widget = Paragraph::new(self.status_line())
            .block(Block::default().borders(Borders::NONE))
            .style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&self) -> Line<'static> {
        let mut content = format!(" {}", self.path.display());
        match &self.status_message {
            Some((message, _)) => {
                content.push_str(" | ");
                content.push_str(message);
            }
            None => content.push_str(
                " | Backspace/Del delete, Shift+\u{2190}/\u{2192} select, Ctrl-Z undo, Esc quit",
            ),
        }
        Line::from(content)
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let max_scroll = render.total_lines.saturating_sub(viewport_height.max(1));
        if let Some(cursor) = render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport_height.max(1) {
                self.scroll_top = cursor.line + 1 - viewport_height.max(1);
            }
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }
}

use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use unicode_width::UnicodeWidthStr;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::app::{App, FormField, Mode};
use crate::view::{self, ListView};

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI { terminal })
    }

    pub fn display(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|f| render(f, app))?;
        Ok(())
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

/// Drives the popup until the user quits. Key presses and the toast timer
/// share one loop.
pub async fn run(app: &mut App) -> Result<()> {
    let mut ui = UI::new()?;
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    while !app.should_quit() {
        ui.display(app)?;

        tokio::select! {
            _ = tick.tick() => app.expire_toast(Instant::now()),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key).await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    Ok(())
}

fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new("Prompt Box")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    render_search(f, app, chunks[1]);
    render_list(f, app, chunks[2]);
    render_controls(f, app, chunks[3]);

    match app.mode() {
        Mode::Form(field) => render_form(f, app, *field),
        Mode::Confirm { title, .. } => render_confirm(f, title),
        Mode::List | Mode::Search => {}
    }

    if let Some(toast) = app.toast() {
        render_toast(f, &toast.message);
    }
}

fn render_search(f: &mut Frame, app: &App, area: Rect) {
    let focused = *app.mode() == Mode::Search;
    let text = if focused {
        format!("{}|", app.query())
    } else {
        app.query().to_string()
    };
    let search = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Search")
            .border_style(focus_style(focused)),
    );
    f.render_widget(search, area);
}

fn render_list(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Prompts");
    let list_view = app.view();

    if let Some(message) = list_view.message() {
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    // Borders plus the highlight symbol.
    let preview_width = usize::from(area.width.saturating_sub(4));
    let items: Vec<ListItem> = list_view
        .items()
        .iter()
        .map(|p| {
            let mut chips = Vec::with_capacity(p.tags.len() * 2);
            for tag in &p.tags {
                chips.push(Span::styled(
                    format!(" {tag} "),
                    Style::default().fg(Color::Black).bg(Color::LightBlue),
                ));
                chips.push(Span::raw(" "));
            }
            ListItem::new(vec![
                Line::from(Span::styled(
                    p.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(chips),
                Line::from(Span::styled(
                    view::preview(&p.content, preview_width),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    f.render_stateful_widget(
        list,
        area,
        &mut ListState::default().with_selected(Some(app.selected())),
    );
}

fn render_controls(f: &mut Frame, app: &App, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let keys: &[(&str, &str)] = match app.mode() {
        Mode::List if matches!(app.view(), ListView::Items(_)) => &[
            ("n", " new, "),
            ("/", " search, "),
            ("c", " copy, "),
            ("d", " delete, "),
            ("x", " export, "),
            ("q", " quit"),
        ],
        Mode::List => &[("n", " new, "), ("/", " search, "), ("x", " export, "), ("q", " quit")],
        Mode::Search => &[("Enter/Esc", " done")],
        Mode::Form(_) => &[("Tab", " next field, "), ("Ctrl+S", " save, "), ("Esc", " cancel")],
        Mode::Confirm { .. } => &[("y", " delete, "), ("n", " keep")],
    };

    let mut spans = vec![Span::raw("Press ")];
    for (key, label) in keys {
        spans.push(Span::styled(*key, bold));
        spans.push(Span::raw(*label));
    }
    let controls = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(controls, area);
}

fn render_form(f: &mut Frame, app: &App, field: FormField) {
    let area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title("New Prompt")
        .title_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(inner);

    let draft = app.draft();
    let inputs = [
        (FormField::Title, "Title", &draft.title),
        (FormField::Tags, "Tags (comma-separated)", &draft.tags),
        (FormField::Content, "Content", &draft.content),
    ];
    for ((kind, label, value), chunk) in inputs.into_iter().zip(chunks.iter()) {
        let focused = kind == field;
        let text = if focused {
            format!("{value}|")
        } else {
            value.to_string()
        };
        let input = Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .title(label)
                .border_style(focus_style(focused)),
        );
        f.render_widget(input, *chunk);
    }
}

fn render_confirm(f: &mut Frame, title: &str) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);
    let dialog = Paragraph::new(view::confirm_delete_message(title))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(Color::Red)),
        );
    f.render_widget(dialog, area);
}

fn render_toast(f: &mut Frame, message: &str) {
    let area = toast_area(f.area(), message);
    f.render_widget(Clear, area);
    let toast = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Black).bg(Color::Green))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(toast, area);
}

/// Bottom-centered box sized to the message's display width plus borders
/// and padding, clamped to the screen.
fn toast_area(full: Rect, message: &str) -> Rect {
    let text_width = u16::try_from(message.width()).unwrap_or(u16::MAX);
    let width = text_width.saturating_add(4).min(full.width);
    Rect {
        x: full.x + (full.width - width) / 2,
        y: full.bottom().saturating_sub(4),
        width,
        height: 3.min(full.height),
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

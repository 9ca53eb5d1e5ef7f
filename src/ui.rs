use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{
    app::{App, Pane},
    clock::{ClockState, Urgency},
    controller::SessionView,
};

const KEY_HELP: &str =
    "tab pane · ↑↓ move · enter start/open · t run test · a add task · c clear · r reload · q quit";

pub fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        let catalog = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[0]);

        header(self).render(rows[0], buf);
        self.blocks_pane().render(catalog[0], buf);
        self.tests_pane().render(catalog[1], buf);
        self.session_pane().render(columns[1], buf);
        footer(self).render(rows[2], buf);
    }
}

impl App {
    fn blocks_pane(&self) -> Paragraph<'_> {
        let lines = if self.config.blocks.is_empty() {
            vec![Line::styled(
                "No blocks yet: run `examview add-block <name>`",
                dim_style(),
            )]
        } else {
            self.config
                .blocks
                .iter()
                .enumerate()
                .map(|(i, block)| self.row(Pane::Blocks, i, block.label()))
                .collect()
        };
        Paragraph::new(lines).block(self.panel(Pane::Blocks, "Blocks"))
    }

    fn tests_pane(&self) -> Paragraph<'_> {
        let lines = if self.config.tests.is_empty() {
            vec![Line::styled("No tests defined", dim_style())]
        } else {
            self.config
                .tests
                .iter()
                .enumerate()
                .flat_map(|(i, test)| {
                    [
                        self.row(Pane::Tests, i, test.label(i)),
                        Line::styled(format!("  {}", test.summary()), dim_style()),
                    ]
                })
                .collect()
        };
        Paragraph::new(lines).block(self.panel(Pane::Tests, "Tests"))
    }

    fn session_pane(&self) -> Paragraph<'_> {
        let view = self.session.view();
        let mut lines = vec![timer_line(&view), Line::default()];
        lines.extend(view.tasks().iter().enumerate().map(|(i, task)| {
            let mut line = self.row(Pane::Session, i, task.name.clone());
            line.push_span(Span::styled(
                format!("  {}", task.task_file()),
                dim_style(),
            ));
            line
        }));
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(self.panel(Pane::Session, "Active test"))
    }

    fn panel(&self, pane: Pane, title: &'static str) -> Block<'static> {
        let border = if self.pane == pane {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title)
    }

    fn row(&self, pane: Pane, index: usize, text: String) -> Line<'static> {
        let cursor = match pane {
            Pane::Blocks => self.cursors.block,
            Pane::Tests => self.cursors.test,
            Pane::Session => self.cursors.task,
        };
        if self.pane == pane && cursor == index {
            Line::from(Span::styled(
                format!("> {text}"),
                Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD),
            ))
        } else {
            Line::from(format!("  {text}"))
        }
    }
}

/// Timer line for the session pane, colored by urgency
pub fn timer_line(view: &SessionView<'_>) -> Line<'static> {
    if view.state() == ClockState::Idle {
        return Line::styled(
            "No active test: pick one and press enter",
            dim_style().add_modifier(Modifier::ITALIC),
        );
    }

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let (icon, style) = match view.urgency() {
        Urgency::Normal => ("◷", bold.fg(Color::Green)),
        Urgency::Warning => ("◷", bold.fg(Color::Yellow)),
        // alternate the icon every second
        Urgency::Alert if view.remaining_secs() % 2 == 0 => ("⚠", bold.fg(Color::Yellow)),
        Urgency::Alert => ("◷", bold.fg(Color::Yellow)),
        Urgency::Expired => ("✖", bold.fg(Color::Red)),
    };

    let text = match view.urgency() {
        Urgency::Expired => view.timer_text(),
        _ => format!("Time left: {}", view.timer_text()),
    };
    Line::from(vec![
        Span::styled(format!("{icon} "), style),
        Span::styled(text, style),
    ])
}

fn header(app: &App) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled("examview", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", app.workspace.root().display())),
    ];
    if let Some(started) = app.session.view().started_at() {
        spans.push(Span::styled(
            format!("  started {}", started.format("%H:%M:%S")),
            dim_style(),
        ));
    }
    Paragraph::new(Line::from(spans))
}

fn footer(app: &App) -> Paragraph<'static> {
    match &app.status {
        Some(status) => Paragraph::new(Line::styled(
            status.clone(),
            Style::default().fg(Color::Magenta),
        )),
        None => Paragraph::new(Line::styled(KEY_HELP, dim_style())),
    }
}

fn dim_style() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

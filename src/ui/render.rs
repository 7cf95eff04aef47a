use crate::state::Phase;
use crate::types::{ChatMessage, MessageStatus, Role};
use crate::ui::text_metrics::{cursor_position, truncate_to_width, wrap_lines};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

const USER_LABEL: &str = "You";
const ASSISTANT_LABEL: &str = "AI";
const THINKING_MARKER: &str = "...";

/// Snapshot of what the header shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderState<'a> {
    pub model: &'a str,
    pub connected: bool,
    pub phase: Phase,
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_lines(input, width).len().max(1)
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, header: &HeaderState<'_>) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let (dot, dot_style) = if header.connected {
        ("● connected", Style::default().fg(Color::Green))
    } else {
        ("● disconnected", Style::default().fg(Color::Red))
    };
    let activity = match header.phase {
        Phase::Sending => "  sending",
        Phase::Streaming => "  streaming",
        Phase::Idle | Phase::Settled => "",
    };

    let line = Line::from(vec![
        Span::styled(
            "streamchat ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(dot, dot_style),
        Span::styled(
            format!("  model: {}", header.model),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(activity, Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Styled transcript lines, one label line per message followed by its body.
pub fn transcript_lines(messages: &[ChatMessage]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        if index > 0 {
            lines.push(Line::from(""));
        }

        let (label, label_style) = match message.role() {
            Role::User => (USER_LABEL, Style::default().fg(Color::Cyan)),
            Role::Assistant => (ASSISTANT_LABEL, Style::default().fg(Color::Magenta)),
        };
        let mut header = vec![Span::styled(
            format!("{label}:"),
            label_style.add_modifier(Modifier::BOLD),
        )];
        match message.status() {
            MessageStatus::Pending | MessageStatus::Streaming => header.push(Span::styled(
                " (streaming)",
                Style::default().fg(Color::DarkGray),
            )),
            MessageStatus::Failed => header.push(Span::styled(
                " (failed)",
                Style::default().fg(Color::Red),
            )),
            MessageStatus::Complete => {}
        }
        lines.push(Line::from(header));

        if message.content().is_empty() && message.status() == MessageStatus::Pending {
            lines.push(Line::styled(
                THINKING_MARKER,
                Style::default().fg(Color::DarkGray),
            ));
            continue;
        }
        for body in message.content().split('\n') {
            lines.push(Line::from(body.to_string()));
        }
    }
    lines
}

/// Rows the transcript occupies once wrapped at `width`.
pub fn history_visual_line_count(messages: &[ChatMessage], width: usize) -> usize {
    transcript_lines(messages)
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
            wrap_lines(&text, width).len()
        })
        .sum()
}

/// Renders the transcript; `scroll_back` counts rows up from the bottom.
pub fn render_transcript(
    frame: &mut Frame<'_>,
    area: Rect,
    messages: &[ChatMessage],
    scroll_back: usize,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let total = history_visual_line_count(messages, area.width as usize);
    let max_scroll = total.saturating_sub(area.height as usize);
    let offset = max_scroll.saturating_sub(scroll_back);

    let paragraph = Paragraph::new(transcript_lines(messages))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((offset.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_notice(frame: &mut Frame<'_>, area: Rect, notice: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_to_width(notice, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_position(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let rendered: Vec<Line<'_>> = (0..visible_rows)
        .map(|offset| {
            let row_index = window_start + offset;
            let prefix = if row_index == 0 { "> " } else { "  " };
            let line = lines.get(row_index).cloned().unwrap_or_default();
            Line::from(format!("{prefix}{line}"))
        })
        .collect();

    frame.render_widget(
        Paragraph::new(rendered).style(
            Style::default()
                .fg(Color::Gray)
                .bg(Color::Rgb(24, 24, 24)),
        ),
        area,
    );

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub header: Rect,
    pub history: Rect,
    pub notice: Rect,
    pub input: Rect,
}

/// Header row, scrolling transcript, one status row, then the prompt.
pub fn split_chat_layout(area: Rect, input_rows: u16) -> ChatLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows.max(1)),
        ])
        .split(area);

    ChatLayout {
        header: chunks[0],
        history: chunks[1],
        notice: chunks[2],
        input: chunks[3],
    }
}

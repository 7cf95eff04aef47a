use unicode_width::UnicodeWidthChar;

pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Soft-wraps `text` at `width` display columns. Explicit newlines always
/// start a new row; carriage returns are dropped.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut used = 0usize;

    for ch in text.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                rows.push(String::new());
                used = 0;
            }
            _ => {
                let ch_width = char_width(ch);
                if used + ch_width > width && used > 0 {
                    rows.push(String::new());
                    used = 0;
                }
                if let Some(row) = rows.last_mut() {
                    row.push(ch);
                }
                used += ch_width;
            }
        }
    }
    rows
}

/// Row and column of byte offset `cursor` once `text` is wrapped at `width`.
pub fn cursor_position(text: &str, cursor: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor = floor_char_boundary(text, cursor);
    let (mut row, mut col) = (0usize, 0usize);

    for ch in text[..cursor].chars() {
        match ch {
            '\r' => {}
            '\n' => {
                row += 1;
                col = 0;
            }
            _ => {
                let ch_width = char_width(ch);
                if col + ch_width > width && col > 0 {
                    row += 1;
                    col = 0;
                }
                col += ch_width;
            }
        }
    }

    if col >= width {
        (row + 1, 0)
    } else {
        (row, col)
    }
}

/// Cuts `text` to at most `width` columns, ending in "..." when anything was cut.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let width = width.max(1);
    let total: usize = text.chars().map(char_width).sum();
    if total <= width {
        return text.to_string();
    }

    let budget = if width >= 4 { width - 3 } else { width };
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_width(ch);
        if used + ch_width > budget {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    if width >= 4 {
        out.push_str("...");
    }
    out
}

pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

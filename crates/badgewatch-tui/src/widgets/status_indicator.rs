//! Presence indicator — ●/○ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;

use crate::theme;

/// Returns a styled `Span` with the presence dot and label.
pub fn presence_span(online: bool) -> Span<'static> {
    let (text, color) = if online {
        ("● online", theme::SUCCESS_GREEN)
    } else {
        ("○ offline", theme::ERROR_RED)
    };
    Span::styled(text, Style::default().fg(color))
}

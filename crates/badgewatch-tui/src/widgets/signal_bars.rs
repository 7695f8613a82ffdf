//! Signal strength bars — ▂▄▆█ coloured by band.

use ratatui::style::Style;
use ratatui::text::Span;

use badgewatch_core::SignalBand;

use crate::theme;

/// Bar glyphs for an RSSI reading.
///
/// | Bars    | dBm Range  |
/// |---------|------------|
/// | `▂▄▆█` | >= -50     |
/// | `▂▄▆ ` | -50 to -60 |
/// | `▂▄  ` | -60 to -70 |
/// | `▂   ` | -70 to -80 |
/// | `·   ` | < -80      |
pub fn bars(rssi: i16) -> &'static str {
    if rssi >= -50 {
        "▂▄▆█"
    } else if rssi >= -60 {
        "▂▄▆ "
    } else if rssi >= -70 {
        "▂▄  "
    } else if rssi >= -80 {
        "▂   "
    } else {
        "·   "
    }
}

/// Styled bars plus the dBm value.
pub fn signal_span(rssi: i16, band: SignalBand) -> Span<'static> {
    Span::styled(
        format!("{} {rssi}", bars(rssi)),
        Style::default().fg(theme::signal_color(band)),
    )
}

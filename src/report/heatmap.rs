use chrono::Datelike;
use colored::Colorize;

use crate::github::ContributionCalendar;

const LIGHT: [(u8, u8, u8); 5] = [
    (0xeb, 0xed, 0xf0),
    (0x9b, 0xe9, 0xa8),
    (0x40, 0xc4, 0x63),
    (0x30, 0xa1, 0x4e),
    (0x21, 0x6e, 0x39),
];

const DARK: [(u8, u8, u8); 5] = [
    (0x16, 0x1b, 0x22),
    (0x0e, 0x44, 0x29),
    (0x00, 0x6d, 0x32),
    (0x26, 0xa6, 0x41),
    (0x39, 0xd3, 0x53),
];

const SHADES: [char; 5] = ['·', '░', '▒', '▓', '█'];
const ROW_LABELS: [&str; 7] = ["   ", "Mon", "   ", "Wed", "   ", "Fri", "   "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    fn palette(self) -> &'static [(u8, u8, u8); 5] {
        match self {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }
}

/// Lay the calendar out as 7 weekday rows (Sunday first) by one column per
/// week. Cells before the first or after the last day are `None`.
pub fn grid(calendar: &ContributionCalendar) -> Vec<Vec<Option<u8>>> {
    let mut rows = vec![vec![None; calendar.weeks.len()]; 7];
    for (column, week) in calendar.weeks.iter().enumerate() {
        for day in week {
            let row = day.date.weekday().num_days_from_sunday() as usize;
            rows[row][column] = Some(day.level.min(4));
        }
    }
    rows
}

pub fn render_terminal(calendar: &ContributionCalendar, theme: Theme) -> String {
    let palette = theme.palette();
    let mut out = String::new();
    for (label, row) in ROW_LABELS.iter().zip(grid(calendar)) {
        out.push_str(label);
        out.push(' ');
        for cell in row {
            match cell {
                Some(level) => {
                    let (r, g, b) = palette[level as usize];
                    out.push_str(&"■".truecolor(r, g, b).to_string());
                }
                None => out.push(' '),
            }
            out.push(' ');
        }
        out.push('\n');
    }

    out.push_str("    Less ");
    for (r, g, b) in palette {
        out.push_str(&"■".truecolor(*r, *g, *b).to_string());
        out.push(' ');
    }
    out.push_str("More\n");
    out
}

/// Plain-text heatmap for markdown reports, fenced as a code block.
pub fn render_markdown(calendar: &ContributionCalendar) -> String {
    let mut out = String::from("```\n");
    for (label, row) in ROW_LABELS.iter().zip(grid(calendar)) {
        let cells: String = row
            .into_iter()
            .map(|cell| cell.map_or(' ', |level| SHADES[level as usize]))
            .collect();
        out.push_str(label);
        out.push(' ');
        out.push_str(cells.trim_end());
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

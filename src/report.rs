//! Plain text tables for system, board and channel reports.

use core::fmt;

use crate::types::BoardInfo;

/// Placeholder for a value that could not be read.
pub const UNREADABLE: &str = "n/a";

/// A table of already formatted cells.
///
/// Rows shorter than the header are padded with empty cells when printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParamTable {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Look up a cell by row index and column header.
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let column = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    fn widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain([self.headers.len()])
            .max()
            .unwrap_or(0);
        (0..columns)
            .map(|i| {
                self.rows
                    .iter()
                    .chain([&self.headers])
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn rule(f: &mut fmt::Formatter<'_>, widths: &[usize], left: char, mid: char, right: char) -> fmt::Result {
    write!(f, "{left}")?;
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            write!(f, "{mid}")?;
        }
        write!(f, "{}", "─".repeat(width + 2))?;
    }
    writeln!(f, "{right}")
}

fn line(f: &mut fmt::Formatter<'_>, widths: &[usize], cells: &[String]) -> fmt::Result {
    write!(f, "│")?;
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        write!(f, " {cell:<width$} │")?;
    }
    writeln!(f)
}

impl fmt::Display for ParamTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        if widths.is_empty() {
            return Ok(());
        }
        rule(f, &widths, '┌', '┬', '┐')?;
        line(f, &widths, &self.headers)?;
        if !self.rows.is_empty() {
            rule(f, &widths, '├', '┼', '┤')?;
        }
        for row in &self.rows {
            line(f, &widths, row)?;
        }
        rule(f, &widths, '└', '┴', '┘')
    }
}

/// Board summary plus a channel table for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardReport {
    pub slot: u16,
    pub board: BoardInfo,
    /// Readable board parameters as (name, formatted value).
    pub params: Vec<(String, String)>,
    pub channels: ParamTable,
}

impl fmt::Display for BoardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board info in slot {} ({}):", self.slot, self.board.model)?;
        for (name, value) in &self.params {
            write!(f, " {name}:{value};")?;
        }
        writeln!(f)?;
        write!(f, "{}", self.channels)
    }
}

/// Which slots, channels and parameters a crate report covers. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateFilter {
    pub slots: Vec<u16>,
    pub channels: Vec<u16>,
    pub params: Vec<String>,
}

impl CrateFilter {
    pub fn with_params<P: AsRef<str>>(params: impl IntoIterator<Item = P>) -> Self {
        Self {
            params: params.into_iter().map(|p| p.as_ref().to_owned()).collect(),
            ..Default::default()
        }
    }

    pub fn includes_slot(&self, slot: u16) -> bool {
        self.slots.is_empty() || self.slots.contains(&slot)
    }

    pub fn includes_channel(&self, channel: u16) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel)
    }
}

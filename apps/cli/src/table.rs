//! Plain-text tables and number formatting for terminal output.

use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

pub struct Table {
    headers: Vec<(String, Alignment)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// First column left-aligned (captions), the rest right-aligned (numbers).
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let align = if i == 0 {
                    Alignment::Left
                } else {
                    Alignment::Right
                };
                (h.into(), align)
            })
            .collect();
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn align(mut self, column: usize, alignment: Alignment) -> Self {
        if let Some(h) = self.headers.get_mut(column) {
            h.1 = alignment;
        }
        self
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, (h, _))| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .fold(h.chars().count(), usize::max)
            })
            .collect()
    }

    fn render_row(&self, cells: &[String], widths: &[usize]) -> String {
        self.headers
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, ((_, align), &w))| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                match align {
                    Alignment::Left => format!("{cell:<w$}"),
                    Alignment::Right => format!("{cell:>w$}"),
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let header: Vec<String> = self.headers.iter().map(|(h, _)| h.clone()).collect();
        let rule = widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  ");
        let mut lines = vec![self.render_row(&header, &widths), rule];
        lines.extend(self.rows.iter().map(|r| self.render_row(r, &widths)));
        lines.join("\n")
    }
}

/// `1234.5` -> `1,234.50`
pub fn number(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.*}", places as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `1234.5` -> `$1,234.50`
pub fn money(value: Decimal) -> String {
    let text = number(value, 2);
    match text.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${text}"),
    }
}

//! Terminal UI utilities.
//!
//! A small auto-sizing table with Unicode box-drawing characters, used by
//! `cinc list` to render the registry.

use std::cmp;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        if self.headers.is_empty() {
            return;
        }

        let (_, term_width) = console::Term::stdout().size();
        let max_width = term_width as usize;

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = cmp::max(widths[i], cell.chars().count());
            }
        }

        // Borders and padding eat 3 characters per column plus one.
        let overhead = 1 + 3 * self.headers.len();
        let mut total: usize = widths.iter().sum();
        while overhead + total > max_width {
            let (idx, &w) = widths
                .iter()
                .enumerate()
                .max_by_key(|(_, w)| **w)
                .expect("headers is non-empty");
            if w <= 8 {
                break;
            }
            widths[idx] = w - 1;
            total -= 1;
        }

        self.print_border("┌", "┬", "┐", &widths);
        self.print_row(&self.headers, &widths);
        self.print_border("├", "┼", "┤", &widths);
        for row in &self.rows {
            self.print_row(row, &widths);
        }
        self.print_border("└", "┴", "┘", &widths);
    }

    fn print_border(&self, left: &str, sep: &str, right: &str, widths: &[usize]) {
        let mut line = String::from(left);
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                line.push_str(sep);
            }
            for _ in 0..w + 2 {
                line.push('─');
            }
        }
        line.push_str(right);
        println!("{}", line);
    }

    fn print_row(&self, cells: &[String], widths: &[usize]) {
        let mut line = String::from("│");
        for (cell, &w) in cells.iter().zip(widths) {
            let text: String = if cell.chars().count() > w {
                let mut t: String = cell.chars().take(w.saturating_sub(1)).collect();
                t.push('…');
                t
            } else {
                cell.clone()
            };
            let pad = w - text.chars().count();
            line.push(' ');
            line.push_str(&text);
            for _ in 0..pad + 1 {
                line.push(' ');
            }
            line.push('│');
        }
        println!("{}", line);
    }
}

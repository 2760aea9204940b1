//! @acp:module "Tabular"
//! @acp:summary "Render result sets as terminal tables or dump formats"
//! @acp:domain cli
//! @acp:layer output

use std::fmt;

use clap::ValueEnum;
use console::measure_text_width;

use crate::error::Result;

/// Where tabular output is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderTarget {
    /// Formatted table with box-drawing borders
    Pretty,
    /// Formatted table with ASCII-only borders
    Plain,
    /// JSON dump
    Json,
    /// YAML dump
    Yaml,
}

impl RenderTarget {
    /// `pretty` for a terminal, `plain` for everything else
    pub fn default_for(stdout_tty: bool) -> Self {
        if stdout_tty {
            RenderTarget::Pretty
        } else {
            RenderTarget::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderTarget::Pretty => "pretty",
            RenderTarget::Plain => "plain",
            RenderTarget::Json => "json",
            RenderTarget::Yaml => "yaml",
        }
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Borders {
    horizontal: char,
    vertical: char,
    top: [char; 3],
    middle: [char; 3],
    bottom: [char; 3],
}

const PRETTY: Borders = Borders {
    horizontal: '─',
    vertical: '│',
    top: ['┌', '┬', '┐'],
    middle: ['├', '┼', '┤'],
    bottom: ['└', '┴', '┘'],
};

const PLAIN: Borders = Borders {
    horizontal: '-',
    vertical: '|',
    top: ['+', '+', '+'],
    middle: ['+', '+', '+'],
    bottom: ['+', '+', '+'],
};

/// A column: machine key for dumps, title for tables
#[derive(Debug, Clone)]
pub struct Column {
    pub key: String,
    pub title: String,
}

/// Rows of text under a fixed set of columns
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: &[(&str, &str)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(key, title)| Column {
                    key: key.to_string(),
                    title: title.to_string(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells are blank, extra cells are dropped
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// @acp:summary "Render the table for the given target"
    pub fn render(&self, target: RenderTarget) -> Result<String> {
        match target {
            RenderTarget::Pretty => Ok(self.draw(&PRETTY)),
            RenderTarget::Plain => Ok(self.draw(&PLAIN)),
            RenderTarget::Json => {
                let mut out = serde_json::to_string_pretty(&self.records())?;
                out.push('\n');
                Ok(out)
            }
            RenderTarget::Yaml => Ok(serde_yaml::to_string(&self.records())?),
        }
    }

    fn records(&self) -> serde_json::Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.key.clone(), serde_json::Value::from(cell.as_str())))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(records)
    }

    fn draw(&self, borders: &Borders) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .map(|row| measure_text_width(&row[i]))
                    .chain(std::iter::once(measure_text_width(&column.title)))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = rule(borders, borders.top, &widths);
        let titles: Vec<&str> = self.columns.iter().map(|c| c.title.as_str()).collect();
        out.push_str(&line(borders, &titles, &widths));
        out.push_str(&rule(borders, borders.middle, &widths));
        for row in &self.rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            out.push_str(&line(borders, &cells, &widths));
        }
        out.push_str(&rule(borders, borders.bottom, &widths));
        out
    }
}

fn rule(borders: &Borders, [left, join, right]: [char; 3], widths: &[usize]) -> String {
    let segments: Vec<String> = widths
        .iter()
        .map(|w| borders.horizontal.to_string().repeat(w + 2))
        .collect();
    format!("{}{}{}\n", left, segments.join(&join.to_string()), right)
}

fn line(borders: &Borders, cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| {
            let pad = w.saturating_sub(measure_text_width(cell));
            format!(" {}{} ", cell, " ".repeat(pad))
        })
        .collect();
    let v = borders.vertical.to_string();
    format!("{}{}{}\n", v, padded.join(&v), v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        let mut table = Table::new(&[("name", "Name"), ("url", "URL")]);
        table.push_row(["lab", "http://lab/"]);
        table.push_row(["production", "http://p/"]);
        table
    }

    #[test]
    fn test_default_target_follows_tty() {
        assert_eq!(RenderTarget::default_for(true), RenderTarget::Pretty);
        assert_eq!(RenderTarget::default_for(false), RenderTarget::Plain);
    }

    #[test]
    fn test_plain_table() {
        let expected = "\
+------------+-------------+
| Name       | URL         |
+------------+-------------+
| lab        | http://lab/ |
| production | http://p/   |
+------------+-------------+
";
        assert_eq!(sample().render(RenderTarget::Plain).unwrap(), expected);
    }

    #[test]
    fn test_pretty_table_uses_box_drawing() {
        let out = sample().render(RenderTarget::Pretty).unwrap();
        assert!(out.starts_with('┌'));
        assert!(out.contains("│ lab        │"));
        assert!(out.trim_end().ends_with('┘'));
    }

    #[test]
    fn test_json_dump() {
        let out = sample().render(RenderTarget::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[1]["name"], "production");
        assert_eq!(value[0]["url"], "http://lab/");
    }

    #[test]
    fn test_yaml_dump() {
        let out = sample().render(RenderTarget::Yaml).unwrap();
        assert!(out.contains("name: lab"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(&[("a", "A"), ("b", "B")]);
        table.push_row(["only"]);
        assert!(table.render(RenderTarget::Plain).unwrap().contains("| only |   |"));
    }
}

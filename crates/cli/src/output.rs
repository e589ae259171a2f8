use std::io::{self, Write as _};

use scopedb_core::Row;

use crate::error_presentation::{CliError, CliResult};

const ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "VALUES", "PRAGMA", "EXPLAIN"];
const NULL_TEXT: &str = "NULL";

#[derive(Debug)]
pub(crate) enum StatementOutput {
    Rows(Vec<Row>),
    Affected(u64),
}

/// Whether `sql` starts with a keyword that produces a result set.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let keyword = sql
        .trim_start_matches(|ch: char| ch.is_whitespace() || ch == '(')
        .split(|ch: char| !ch.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    ROW_KEYWORDS
        .iter()
        .any(|candidate| keyword.eq_ignore_ascii_case(candidate))
}

/// Tab-separated rows with a header line; affected-row counts otherwise.
pub(crate) fn render(outputs: &[StatementOutput]) -> String {
    let mut rendered = String::new();
    for output in outputs {
        match output {
            StatementOutput::Rows(rows) => render_rows(&mut rendered, rows),
            StatementOutput::Affected(count) => {
                rendered.push_str(&format!("affected rows: {count}\n"));
            }
        }
    }
    rendered
}

fn render_rows(rendered: &mut String, rows: &[Row]) {
    let Some(first) = rows.first() else {
        return;
    };
    push_line(rendered, first.columns().iter().map(String::as_str));
    for row in rows {
        push_line(
            rendered,
            row.values()
                .iter()
                .map(|value| value.as_deref().unwrap_or(NULL_TEXT)),
        );
    }
}

fn push_line<'a>(rendered: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line = cells.map(escape_cell).collect::<Vec<_>>().join("\t");
    rendered.push_str(&line);
    rendered.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
}

pub(crate) fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(CliError::Output)
}

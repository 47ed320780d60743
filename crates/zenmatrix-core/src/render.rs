use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::matrix::{Quadrant, QuadrantBuckets};
use crate::task::Task;
use crate::view::ViewState;

const LIST_COLUMNS: [&str; 7] = ["ID", "Title", "Project", "Owner", "Priority", "Due", "Done"];
const MATRIX_COLUMNS: [&str; 5] = ["ID", "Title", "Project", "Due", "Done"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let configured = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let enabled = match configured.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: enabled && io::stdout().is_terminal(),
        })
    }

    #[tracing::instrument(skip(self, tasks, view, now))]
    pub fn print_task_table(
        &mut self,
        tasks: &[Task],
        total_count: u64,
        view: &ViewState,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let rows: Vec<Vec<String>> = tasks.iter().map(|task| self.list_row(task, now)).collect();
        write_table(&mut out, &LIST_COLUMNS, &rows)?;

        let total_pages = total_count.div_ceil(u64::from(view.limit.max(1)));
        if total_pages > 1 {
            writeln!(out)?;
            writeln!(
                out,
                "Page {} of {} ({} tasks)",
                view.page, total_pages, total_count
            )?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, buckets, now))]
    pub fn print_matrix(
        &mut self,
        buckets: &QuadrantBuckets,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        for (quadrant, tasks) in buckets.iter() {
            let heading = self.paint(quadrant.heading(), quadrant_color(quadrant));
            writeln!(out, "{heading}")?;

            if tasks.is_empty() {
                writeln!(out, "  (no tasks)")?;
            } else {
                let rows: Vec<Vec<String>> =
                    tasks.iter().map(|task| self.matrix_row(task, now)).collect();
                write_table(&mut out, &MATRIX_COLUMNS, &rows)?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut fields: Vec<(&str, String)> = vec![
            ("id", task.id.clone().unwrap_or_else(|| "-".to_string())),
            ("titulo", task.titulo.clone()),
            ("proyecto", task.proyecto.clone()),
            ("responsable", task.responsable.clone()),
            ("prioridad", task.prioridad.clone()),
            ("completada", yes_no(task.is_completed).to_string()),
        ];
        if let Some(descripcion) = &task.descripcion {
            fields.push(("descripcion", descripcion.clone()));
        }
        if let Some(due) = task.fecha_vencimiento {
            fields.push(("vencimiento", format_date(due)));
        }
        if let Some(finished) = task.fecha_terminada {
            fields.push(("terminada", format_date(finished)));
        }
        if let Some(created) = task.created_at {
            fields.push(("creada", format_date(created)));
        }

        let mut out = io::stdout().lock();
        for (label, value) in fields {
            writeln!(out, "{label:<12} {value}")?;
        }
        Ok(())
    }

    fn list_row(&self, task: &Task, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.id_cell(task),
            task.titulo.clone(),
            task.proyecto.clone(),
            task.responsable.clone(),
            task.prioridad.clone(),
            self.due_cell(task, now),
            self.done_cell(task),
        ]
    }

    // The priority column is the quadrant heading itself; owner stays in
    // the list view only.
    fn matrix_row(&self, task: &Task, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.id_cell(task),
            task.titulo.clone(),
            task.proyecto.clone(),
            self.due_cell(task, now),
            self.done_cell(task),
        ]
    }

    fn id_cell(&self, task: &Task) -> String {
        self.paint(task.id.as_deref().unwrap_or("-"), "33")
    }

    fn due_cell(&self, task: &Task, now: DateTime<Utc>) -> String {
        match task.fecha_vencimiento {
            Some(date) if date < now && !task.is_completed => self.paint(&format_date(date), "31"),
            Some(date) => format_date(date),
            None => String::new(),
        }
    }

    fn done_cell(&self, task: &Task) -> String {
        if task.is_completed {
            self.paint("yes", "32")
        } else {
            "no".to_string()
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

/// Quadrant accents follow the classic matrix coloring: do = red,
/// plan = yellow, delegate = blue, drop = green.
fn quadrant_color(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::UrgentImportant => "31",
        Quadrant::NotUrgentImportant => "33",
        Quadrant::UrgentNotImportant => "34",
        Quadrant::NotUrgentNotImportant => "32",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn write_table<W: Write>(
    out: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.width()).collect();
    for row in rows {
        for (column, cell) in row.iter().enumerate() {
            widths[column] = widths[column].max(visible_width(cell));
        }
    }

    let mut line = String::new();
    for (column, header) in headers.iter().enumerate() {
        pad_cell(&mut line, header, widths[column]);
    }
    writeln!(out, "{}", line.trim_end())?;

    line.clear();
    for width in &widths {
        line.push_str(&"-".repeat(*width));
        line.push(' ');
    }
    writeln!(out, "{}", line.trim_end())?;

    for row in rows {
        line.clear();
        for (column, cell) in row.iter().enumerate() {
            pad_cell(&mut line, cell, widths[column]);
        }
        writeln!(out, "{}", line.trim_end())?;
    }

    Ok(())
}

fn pad_cell(line: &mut String, cell: &str, width: usize) {
    line.push_str(cell);
    for _ in visible_width(cell)..width {
        line.push(' ');
    }
    line.push(' ');
}

/// Display width of a cell with any ANSI color sequences skipped.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut rest = text;

    while let Some(escape_at) = rest.find('\x1b') {
        width += rest[..escape_at].width();
        let tail = &rest[escape_at..];
        rest = match tail.find('m') {
            Some(end) => &tail[end + 1..],
            None => "",
        };
    }

    width + rest.width()
}

#[cfg(test)]
mod tests {
    use super::visible_width;

    #[test]
    fn ansi_sequences_do_not_count_toward_width() {
        assert_eq!(visible_width("plain"), 5);
        assert_eq!(visible_width("\x1b[31m2026-01-01\x1b[0m"), 10);
        assert_eq!(visible_width(""), 0);
    }
}

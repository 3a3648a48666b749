use chrono::{Local, NaiveDate};
use issue_schedule::{
    ScheduleEngine, ScheduleEntry, ScheduleError, load_project_from_json, save_entries_to_json,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_CYCLE: u8 = 1;
const EXIT_INPUT: u8 = 2;

struct Args {
    project: String,
    today: Option<NaiveDate>,
    out: Option<String>,
    json: bool,
}

fn print_help() {
    println!("Usage: cli <project.json> [--today YYYY-MM-DD] [--out entries.json] [--json]");
    println!();
    println!("Resolves start/end dates for every task in the project file.");
    println!("Exit status: 0 scheduled, 1 dependency cycle, 2 invalid input.");
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut project = None;
    let mut today = None;
    let mut out = None;
    let mut json = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--today" => {
                let value = args.next().ok_or("--today requires a date")?;
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|_| format!("Invalid date (YYYY-MM-DD): {value}"))?;
                today = Some(date);
            }
            "--out" => out = Some(args.next().ok_or("--out requires a path")?),
            "--json" => json = true,
            other if other.starts_with('-') => return Err(format!("Unknown option {other}")),
            other => project = Some(other.to_string()),
        }
    }

    let project = project.ok_or("missing project file")?;
    Ok(Some(Args {
        project,
        today,
        out,
        json,
    }))
}

fn render_entries_as_text_table(entries: &[ScheduleEntry]) -> String {
    let header = ["task", "start", "end", "status", "resolution"];
    let rows: Vec<[String; 5]> = entries
        .iter()
        .map(|entry| {
            let indent = if entry.is_subtask() { "  " } else { "" };
            let mut status = entry.status().to_string();
            if entry.is_overdue() {
                status.push_str(" (overdue)");
            }
            [
                format!("{indent}{}", entry.display_label()),
                entry.start_date().to_string(),
                entry.end_date().to_string(),
                status,
                format!("{:?}", entry.resolution()),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &header.map(String::from), &widths);
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(pad));
        out.push_str(" |");
    }
    out.push('\n');
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("Error: {message}");
            print_help();
            return ExitCode::from(EXIT_INPUT);
        }
    };

    let project = match load_project_from_json(&args.project) {
        Ok(project) => project,
        Err(err) => {
            eprintln!("Error: could not load {}: {err}", args.project);
            return ExitCode::from(EXIT_INPUT);
        }
    };
    let today = args
        .today
        .or(project.today)
        .unwrap_or_else(|| Local::now().date_naive());

    let engine = match ScheduleEngine::new(project.config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("Error: invalid configuration: {err}");
            return ExitCode::from(EXIT_INPUT);
        }
    };
    let outcome = match engine.schedule(project.tasks, project.records, today) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(EXIT_INPUT);
        }
    };

    for warning in outcome.warnings() {
        eprintln!("Warning: {warning}");
    }
    let summary = outcome.summary();

    match outcome.into_result() {
        Ok(entries) => {
            if let Some(path) = &args.out {
                if let Err(err) = save_entries_to_json(&entries, path) {
                    eprintln!("Error: could not write {path}: {err}");
                    return ExitCode::from(EXIT_INPUT);
                }
            }
            if args.json {
                match serde_json::to_string_pretty(&entries) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        eprintln!("Error: {err}");
                        return ExitCode::from(EXIT_INPUT);
                    }
                }
            } else {
                print!("{}", render_entries_as_text_table(&entries));
                println!("Scheduled ({})", summary.to_cli_summary());
            }
            ExitCode::SUCCESS
        }
        Err(err @ ScheduleError::DependencyCycle { .. }) => {
            eprintln!("Error: {err}");
            eprintln!("Cyclic tasks: {}", err.cyclic_task_ids().join(", "));
            ExitCode::from(EXIT_CYCLE)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(EXIT_INPUT)
        }
    }
}

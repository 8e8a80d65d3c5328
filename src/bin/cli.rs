use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataFrame};
use route_schedule::route::{self, Frequency};
use route_schedule::{
    Route, RouteBook, ServiceConfig, config, load_routes_from_csv, load_routes_from_json,
    resolver, save_routes_to_csv, save_routes_to_json,
};
use std::collections::BTreeSet;
use std::io::{self, Write};

fn parse_week_list(s: &str) -> Option<BTreeSet<u32>> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u32>().ok())
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for (ci, col) in columns.iter().enumerate() {
            let s = col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default();
            widths[ci] = widths[ci].max(s.len());
            row.push(s);
        }
        rows.push(row);
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names, &widths));
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row, &widths));
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line.push('\n');
    line
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show all routes\n  add <id> <weekday> <frequency> <YYYY-MM-DD>\n                                     Add a route starting on a date\n  delete <id>                        Delete a route\n  anchor    <id> <YYYY-MM-DD|none>   Set anchor date\n  stop      <id> <YYYY-MM-DD|none>   Set stop-after date\n  offset    <id> <n>                 Set week offset\n  skip      <id> <n>                 Set skip weeks (CUSTOM cadence)\n  skipweeks <id> <csv|none>          Set ISO weeks to skip (e.g. 27,52)\n  tech      <id> <tech_id|none>      Assign technician\n  pool      <id> <pool_id|none>      Assign pool\n  active    <id> <true|false>        Enable or disable the route\n  name      <id> <text...>           Set route name (rest of line)\n  frequencies                        List cadence names\n  due <YYYY-MM-DD>                   Routes due on a date\n  next <id> <YYYY-MM-DD>             Next due date after a date\n  calendar <start> <end>             All visits in a date range\n  today <tech_id> [YYYY-MM-DD]       Technician assignments (default: today)\n  save <json|csv> <path>             Persist routes to disk\n  load <json|csv> <path>             Load routes from disk\n  quit|exit                          Exit"
    );
}

fn print_frequencies() {
    println!("Available frequencies:");
    for (key, description) in Frequency::variants() {
        println!("  {:<10} {}", key, description);
    }
}

fn print_routes(book: &RouteBook) {
    match book.routes_frame() {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error rendering routes: {}", e),
    }
}

fn optional<T: std::str::FromStr>(value: &str) -> Result<Option<T>, ()> {
    if value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        value.parse::<T>().map(Some).map_err(|_| ())
    }
}

fn apply_edit<F>(book: &mut RouteBook, id: i32, label: &str, edit: F)
where
    F: FnOnce(&mut Route),
{
    match book.update(id, edit) {
        Ok(true) => {
            println!("{} set.", label);
            print_routes(book);
        }
        Ok(false) => println!("Route {id} not found."),
        Err(e) => println!("Error: {}", e),
    }
}

fn main() {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let service_config = ServiceConfig::from_env();
    let mut book = RouteBook::new();

    println!("Route Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => print_routes(&book),
            "frequencies" => print_frequencies(),
            "add" => {
                let args: Vec<&str> = parts.collect();
                let [id_s, day_s, freq_s, start_s] = args.as_slice() else {
                    println!("Usage: add <id> <weekday> <frequency> <YYYY-MM-DD>");
                    continue;
                };
                let Ok(id) = id_s.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let Some(day) = route::parse_weekday(day_s) else {
                    println!("Invalid weekday");
                    continue;
                };
                let Some(frequency) = Frequency::parse(freq_s) else {
                    println!("Invalid frequency (see 'frequencies')");
                    continue;
                };
                let Some(start_on) = parse_date(start_s) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                match book.insert(Route::new(id, day, frequency, start_on)) {
                    Ok(()) => {
                        println!("Route {id} added.");
                        print_routes(&book);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parts.next().map(str::parse::<i32>) {
                Some(Ok(id)) => match book.delete(id) {
                    Some(_) => {
                        println!("Deleted route {id}.");
                        print_routes(&book);
                    }
                    None => println!("Route {id} not found."),
                },
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: delete <id>"),
            },
            "anchor" | "stop" => {
                let (Some(id_s), Some(date_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: {} <id> <YYYY-MM-DD|none>", cmd);
                    continue;
                };
                let Ok(id) = id_s.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let date = if date_s.eq_ignore_ascii_case("none") {
                    None
                } else {
                    match parse_date(date_s) {
                        Some(d) => Some(d),
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    }
                };
                if cmd == "anchor" {
                    apply_edit(&mut book, id, cmd, |r| r.anchor_date = date);
                } else {
                    apply_edit(&mut book, id, cmd, |r| r.stop_after = date);
                }
            }
            "offset" | "skip" => {
                let (Some(id_s), Some(val_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: {} <id> <n>", cmd);
                    continue;
                };
                let Ok(id) = id_s.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let Ok(value) = val_s.parse::<u32>() else {
                    println!("Invalid value (must be a non-negative integer)");
                    continue;
                };
                if cmd == "offset" {
                    apply_edit(&mut book, id, cmd, |r| r.week_offset = value);
                } else {
                    apply_edit(&mut book, id, cmd, |r| r.skip_weeks = value);
                }
            }
            "skipweeks" => {
                let (Some(id_s), Some(list_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: skipweeks <id> <csv|none>");
                    continue;
                };
                let Ok(id) = id_s.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let weeks = if list_s.eq_ignore_ascii_case("none") {
                    BTreeSet::new()
                } else {
                    match parse_week_list(list_s) {
                        Some(weeks) => weeks,
                        None => {
                            println!("Invalid week list");
                            continue;
                        }
                    }
                };
                apply_edit(&mut book, id, cmd, |r| r.skip_week_numbers = weeks);
            }
            "tech" | "pool" => {
                let (Some(id_s), Some(val_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: {} <id> <n|none>", cmd);
                    continue;
                };
                let Ok(id) = id_s.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                let Ok(value) = optional::<i32>(val_s) else {
                    println!("Invalid value");
                    continue;
                };
                if cmd == "tech" {
                    apply_edit(&mut book, id, cmd, |r| r.technician_id = value);
                } else {
                    apply_edit(&mut book, id, cmd, |r| r.pool_id = value);
                }
            }
            "active" => {
                let (Some(id_s), Some(val_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: active <id> <true|false>");
                    continue;
                };
                match (id_s.parse::<i32>(), val_s.parse::<bool>()) {
                    (Ok(id), Ok(value)) => apply_edit(&mut book, id, cmd, |r| r.active = value),
                    _ => println!("Usage: active <id> <true|false>"),
                }
            }
            "name" => {
                let Some(Ok(id)) = parts.next().map(str::parse::<i32>) else {
                    println!("Usage: name <id> <text...>");
                    continue;
                };
                let text = parts.collect::<Vec<_>>().join(" ");
                apply_edit(&mut book, id, cmd, |r| r.name = text);
            }
            "due" => {
                let Some(date) = parts.next().and_then(parse_date) else {
                    println!("Usage: due <YYYY-MM-DD>");
                    continue;
                };
                let due = book.due_on(date);
                if due.is_empty() {
                    println!("No routes due on {date}.");
                } else {
                    let ids = due
                        .iter()
                        .map(|r| r.id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!("Due on {date}: {ids}");
                }
            }
            "next" => {
                let (Some(id_s), Some(date_s)) = (parts.next(), parts.next()) else {
                    println!("Usage: next <id> <YYYY-MM-DD>");
                    continue;
                };
                let (Ok(id), Some(from)) = (id_s.parse::<i32>(), parse_date(date_s)) else {
                    println!("Usage: next <id> <YYYY-MM-DD>");
                    continue;
                };
                match book.find(id) {
                    Some(route) => match resolver::next_due_date(route, from) {
                        Some(next) => println!("Next due for route {id}: {next}"),
                        None => println!("Route {id} has no upcoming due date."),
                    },
                    None => println!("Route {id} not found."),
                }
            }
            "calendar" => {
                let (Some(start), Some(end)) = (
                    parts.next().and_then(parse_date),
                    parts.next().and_then(parse_date),
                ) else {
                    println!("Usage: calendar <YYYY-MM-DD> <YYYY-MM-DD>");
                    continue;
                };
                match book.calendar_frame(start, end) {
                    Ok(df) => println!("{}", render_df_as_text_table(&df)),
                    Err(e) => println!("Calendar error: {}", e),
                }
            }
            "today" => {
                let Some(Ok(tech)) = parts.next().map(str::parse::<i32>) else {
                    println!("Usage: today <tech_id> [YYYY-MM-DD]");
                    continue;
                };
                let date = match parts.next() {
                    Some(s) => match parse_date(s) {
                        Some(d) => d,
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                    None => service_config.calendar_context().today(),
                };
                let assignments = book.assignments_for(tech, date);
                if assignments.is_empty() {
                    println!("No assignments for technician {tech} on {date}.");
                } else {
                    println!("Assignments for technician {tech} on {date}:");
                    for a in assignments {
                        let pool = a.pool_id.map(|p| p.to_string()).unwrap_or_default();
                        println!("  route {} pool {} {}", a.route_id, pool, a.route_name);
                    }
                }
            }
            "save" => {
                let (Some(fmt), Some(path)) = (parts.next(), parts.next()) else {
                    println!("Usage: save <json|csv> <path>");
                    continue;
                };
                let result = match fmt {
                    "json" => save_routes_to_json(&book, path),
                    "csv" => save_routes_to_csv(&book, path),
                    _ => {
                        println!("Unknown format '{fmt}' (use json or csv)");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Routes saved to {path}."),
                    Err(e) => println!("Save error: {}", e),
                }
            }
            "load" => {
                let (Some(fmt), Some(path)) = (parts.next(), parts.next()) else {
                    println!("Usage: load <json|csv> <path>");
                    continue;
                };
                let result = match fmt {
                    "json" => load_routes_from_json(path),
                    "csv" => load_routes_from_csv(path),
                    _ => {
                        println!("Unknown format '{fmt}' (use json or csv)");
                        continue;
                    }
                };
                match result {
                    Ok(loaded) => {
                        book = loaded;
                        println!("Routes loaded from {path}.");
                        print_routes(&book);
                    }
                    Err(e) => println!("Load error: {}", e),
                }
            }
            _ => println!("Unknown command '{cmd}'. Type 'help' for commands."),
        }
    }
}

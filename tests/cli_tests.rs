#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[allow(deprecated)]
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("cli").unwrap();
    cmd.env_remove("ROUTE_SCHEDULE_UTC_OFFSET_MINUTES");
    cmd
}

#[test]
fn adds_routes_and_reports_due_dates() {
    cli()
        .write_stdin(
            "add 1 MONDAY BIWEEKLY 2024-01-01\n\
             add 2 mon WEEKLY 2024-01-01\n\
             due 2024-01-15\n\
             due 2024-01-22\n\
             due 2024-01-23\n\
             next 1 2024-01-01\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Route 1 added."))
        .stdout(predicate::str::contains("Due on 2024-01-15: 1, 2"))
        .stdout(predicate::str::contains("Due on 2024-01-22: 2"))
        .stdout(predicate::str::contains("No routes due on 2024-01-23."))
        .stdout(predicate::str::contains("Next due for route 1: 2024-01-15"));
}

#[test]
fn rejects_invalid_edits() {
    cli()
        .write_stdin(
            "add 1 MONDAY WEEKLY 2024-01-10\n\
             stop 1 2024-01-01\n\
             skipweeks 1 60\n\
             add 1 TUESDAY WEEKLY 2024-01-02\n\
             add 2 FUNDAY WEEKLY 2024-01-02\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("stopAfter 2024-01-01 precedes startOn"))
        .stdout(predicate::str::contains("outside 1-53"))
        .stdout(predicate::str::contains("duplicate route id 1"))
        .stdout(predicate::str::contains("Invalid weekday"));
}

#[test]
fn technician_view_lists_assignments() {
    cli()
        .write_stdin(
            "add 5 THURSDAY WEEKLY 2024-01-04\n\
             tech 5 9\n\
             pool 5 31\n\
             name 5 Birch Lane\n\
             today 9 2024-01-11\n\
             today 9 2024-01-12\n\
             quit\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("tech set."))
        .stdout(predicate::str::contains(
            "Assignments for technician 9 on 2024-01-11:",
        ))
        .stdout(predicate::str::contains("route 5 pool 31 Birch Lane"))
        .stdout(predicate::str::contains(
            "No assignments for technician 9 on 2024-01-12.",
        ));
}

#[test]
fn saves_and_loads_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("routes.json");
    let path = path.to_str().unwrap();

    cli()
        .write_stdin(format!(
            "add 3 FRIDAY MONTHLY 2024-03-29\nsave json {path}\nquit\n"
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Routes saved to {path}.")));

    cli()
        .write_stdin(format!("load json {path}\nnext 3 2024-03-29\nquit\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Routes loaded from {path}.")))
        .stdout(predicate::str::contains("Next due for route 3: 2024-04-26"));
}

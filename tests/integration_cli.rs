// Runs the compiled binary for its non-interactive modes. HOME and
// XDG_CONFIG_HOME point into a temp dir so no real config or progress is
// touched.

use assert_cmd::Command;
use handdrill::progress::ProgressStore;
use handdrill::storage::JsonFileStore;
use tempfile::TempDir;

fn handdrill(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("handdrill").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("RUST_LOG");
    cmd
}

fn seed_misses(state: &std::path::Path, keys: &[&str]) {
    let store = keys.iter().fold(ProgressStore::default(), |s, k| {
        s.record_miss(k, "2024-05-01T10:00:00.000Z")
    });
    store.persist(&mut JsonFileStore::new(state)).unwrap();
}

#[test]
fn stats_without_progress() {
    let home = TempDir::new().unwrap();
    let state = home.path().join("state");
    let output = handdrill(&home)
        .args(["--backend", "json", "--stats", "--state-dir"])
        .arg(&state)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no misses recorded yet"), "stdout: {stdout}");
}

#[test]
fn stats_lists_most_missed_first() {
    let home = TempDir::new().unwrap();
    let state = home.path().join("state");
    seed_misses(&state, &["72o", "AA", "72o", "KK", "72o"]);

    let output = handdrill(&home)
        .args(["--backend", "json", "--state-dir"])
        .arg(&state)
        .args(["--stats", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("5 misses recorded"), "stdout: {stdout}");

    let rows: Vec<&str> = stdout.lines().skip(2).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("72o"));
    assert!(rows[0].contains("72 offsuit"));
    assert!(rows[1].starts_with("AA"));
}

#[test]
fn reset_progress_erases_saved_misses() {
    let home = TempDir::new().unwrap();
    let state = home.path().join("state");
    seed_misses(&state, &["AA", "KK"]);

    handdrill(&home)
        .args(["--backend", "json", "--reset-progress", "--state-dir"])
        .arg(&state)
        .assert()
        .success();

    let store = ProgressStore::load(&JsonFileStore::new(&state));
    assert!(store.is_empty());
}

#[test]
fn missing_table_fails_stats() {
    let home = TempDir::new().unwrap();
    handdrill(&home)
        .args(["--backend", "memory", "--stats", "--table", "no/such/table.csv"])
        .assert()
        .failure();
}

#[test]
fn refuses_to_start_tui_without_tty() {
    let home = TempDir::new().unwrap();
    handdrill(&home)
        .args(["--backend", "memory"])
        .write_stdin("")
        .assert()
        .failure();
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Millisecond-scale delays so scripted waits do not slow the suite down.
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[timing]
loading_ms = 5
cleaning_ms = 5
measuring_ms = 5
"#;
    let path = dir.path().join("fotsim.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_catalog(dir: &tempfile::TempDir) -> PathBuf {
    let csv = "id,kind,label,connector,fiber_length_m\n\
               coil-1,FIBER_COIL,Fiber coil 1 km,SC_APC,1000\n\
               patch-1,OPTICAL_CABLE,Patch cord 3 m,SC_UPC,3\n";
    let path = dir.path().join("catalog.csv");
    fs::write(&path, csv).unwrap();
    path
}

// Configure, clean, reference, then measure coil-1 once.
const FULL_SCRIPT: &str = "\
# boot and clean the ports
power
wait 10
clean
wait 10
# setup: single-mode port, metres, wavelengths 1310+1550
menu
enter
enter
up
enter
down
enter
down
down
enter
down
enter
down
enter
down
enter
back
# loopback reference, then measure the coil
fastest
enter
up
enter
f1
wait 10
select coil-1
f2
wait 10
";

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run"], -1, "", "stdout")] // empty stdin: prints initial state, exits 0
#[case(&["script"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }
    cmd.stdin(std::process::Stdio::null());

    let assert = cmd.assert();
    let assert = if exit_code >= 0 {
        assert.code(exit_code)
    } else {
        assert.success()
    };

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn script_replay_reaches_the_results_screen() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let catalog = write_catalog(&dir);
    let script = dir.path().join("lab.txt");
    fs::write(&script, FULL_SCRIPT).unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--catalog")
        .arg(&catalog)
        .arg("--seed")
        .arg("7")
        .arg("script")
        .arg("--file")
        .arg(&script);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(json["device"]["screen"], "FastestResults");
    assert_eq!(json["device"]["fiber_counter"], 1);
    assert_eq!(
        json["device"]["current_fiber_result"]["fiber_name"],
        "BCFiber001"
    );
    // The completed measurement seeded a results table for the component.
    assert!(json["results"]["tables"]["coil-1"].is_object());
}

#[test]
fn enter_transcribes_into_the_results_table() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let catalog = write_catalog(&dir);
    let script = dir.path().join("lab.txt");
    // An obviously wrong value: the grading lands in the table, the script
    // itself keeps going.
    let mut content = FULL_SCRIPT.to_string();
    content.push_str("enter 1310 m1 0.001\n");
    fs::write(&script, content).unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--catalog")
        .arg(&catalog)
        .arg("--seed")
        .arg("7")
        .arg("script")
        .arg("--file")
        .arg(&script);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    let cell = &json["results"]["tables"]["coil-1"]["rows"][0]["measurements"][0];
    assert_eq!(cell["entered"], 0.001);
    assert_eq!(cell["status"], "Error");
    assert_eq!(cell["message"], "Incorrect measurement value");
}

#[test]
fn enter_without_a_pending_table_fails() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let script = dir.path().join("bad.txt");
    fs::write(&script, "power\nwait 10\nenter 1310 m1 1.0\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("script")
        .arg("--file")
        .arg(&script);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no results table awaiting input"));
}

#[test]
fn script_replay_is_deterministic_under_a_seed() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let catalog = write_catalog(&dir);
    let script = dir.path().join("lab.txt");
    fs::write(&script, FULL_SCRIPT).unwrap();

    let run = || {
        let mut cmd = Command::cargo_bin("fotsim").unwrap();
        cmd.arg("--config")
            .arg(&cfg)
            .arg("--catalog")
            .arg(&catalog)
            .arg("--seed")
            .arg("11")
            .arg("script")
            .arg("--file")
            .arg(&script);
        let out = cmd.assert().success().get_output().stdout.clone();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        json["device"]["current_fiber_result"]["readings"].clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn unknown_script_command_fails_with_its_line() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let script = dir.path().join("bad.txt");
    fs::write(&script, "power\nfrobnicate\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("script")
        .arg("--file")
        .arg(&script);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("script line 2"));
}

#[test]
fn unknown_component_id_fails_the_script() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let catalog = write_catalog(&dir);
    let script = dir.path().join("bad.txt");
    fs::write(&script, "power\nwait 10\nselect ghost-9\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--catalog")
        .arg(&catalog)
        .arg("script")
        .arg("--file")
        .arg(&script);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown component id"));
}

#[test]
fn register_persists_the_student_record() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let record = dir.path().join("student.json");
    let script = dir.path().join("reg.txt");
    fs::write(&script, "register Ada TK-41\npower\nwait 10\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--student-file")
        .arg(&record)
        .arg("script")
        .arg("--file")
        .arg(&script);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["student"]["name"], "Ada");

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&record).unwrap()).unwrap();
    assert_eq!(saved["group"], "TK-41");
}

#[test]
fn register_without_a_student_file_fails() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let script = dir.path().join("reg.txt");
    fs::write(&script, "register Ada TK-41\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("script")
        .arg("--file")
        .arg(&script);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--student-file"));
}

#[test]
fn check_scheme_accepts_a_correct_assembly() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let scheme = dir.path().join("scheme.toml");
    fs::write(
        &scheme,
        r#"
correct = ["tester", "patch-1", "coil-1"]
assembled = [
    { kind = "tester", id = "tester" },
    { kind = "component", id = "patch-1" },
    { kind = "component", id = "coil-1" },
]
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("check-scheme")
        .arg("--file")
        .arg(&scheme);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scheme OK"));
}

#[test]
fn check_scheme_reports_the_mismatch_position() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let scheme = dir.path().join("scheme.toml");
    fs::write(
        &scheme,
        r#"
correct = ["tester", "patch-1", "coil-1"]
assembled = [
    { kind = "tester", id = "tester" },
    { kind = "component", id = "coil-1" },
    { kind = "component", id = "patch-1" },
]
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("check-scheme")
        .arg("--file")
        .arg(&scheme);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("position 2"));
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fotsim.toml");
    fs::write(&path, "[timing]\nmeasuring_ms = 0\n").unwrap();

    let mut cmd = Command::cargo_bin("fotsim").unwrap();
    cmd.arg("--config").arg(&path).arg("run");
    cmd.stdin(std::process::Stdio::null());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("measuring_ms"));
}

use assert_cmd::prelude::*; // Add methods on commands
use assert_fs::prelude::*;
use predicates::prelude::*; // Used for writing assertions
use std::process::Command; // Run programs

/// `p` holds initially, `go` replaces it by `q`, the goal asks for `q`
const SWAP_TASK: &str = r##"{
  "task": {
    "domain_name": "swap",
    "problem_name": "swap",
    "types": [{ "name": "#boolean" }, { "name": "number" }],
    "objects": [{ "name": "#false", "types": [0] }, { "name": "#true", "types": [0] }],
    "functions": [{ "name": "p", "value_types": [0] }, { "name": "q", "value_types": [0] }],
    "init": [{ "function": 0, "value": { "object": 1 } }]
  },
  "operators": [
    {
      "name": "go",
      "duration": [{ "comparator": "eq", "exp": { "number": 1.0 } }],
      "at_start": { "prec": [{ "variable": { "function": 0 }, "value": { "object": 1 } }] },
      "at_end": {
        "eff": [
          { "variable": { "function": 0 }, "value": { "object": 0 } },
          { "variable": { "function": 1 }, "value": { "object": 1 } }
        ]
      }
    },
    {
      "name": "goal",
      "at_start": { "prec": [{ "variable": { "function": 1 }, "value": { "object": 1 } }] },
      "is_goal": true
    }
  ]
}"##;

#[test]
fn arguments() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg("-vvv").arg("file.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No such file or directory"));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg("-v").arg("-q").arg("file.json");
    cmd.assert().failure().stderr(predicate::str::contains(
        "cannot be used with",
    ));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg("--split").arg("random").arg("file.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cliques, components"));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg("-h");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--mutex-file"));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ground-sas "));
    Ok(())
}

#[test]
fn translates() -> Result<(), Box<dyn std::error::Error>> {
    let file = assert_fs::NamedTempFile::new("swap.json")?;
    file.write_str(SWAP_TASK)?;
    let wrong_file = assert_fs::NamedTempFile::new("wrong.json")?;
    wrong_file.write_str(&SWAP_TASK.replace("\"function\": 1", "\"function\": 7"))?;

    let mut cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg(wrong_file.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid task"));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg(file.path()).arg("-q");
    cmd.assert().success().stdout(
        predicate::str::contains("0:var0")
            .and(predicate::str::contains("* (p)"))
            .and(predicate::str::contains("* (q)")),
    );

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.env_clear();
    cmd.arg(file.path()).arg("--only-mutex");
    cmd.assert().success().stdout(
        predicate::str::contains("0:(p)").and(predicate::str::contains("1:(q)")),
    );

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg(file.path())
        .arg("--split")
        .arg("components")
        .arg("--rust_log")
        .arg("trace");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0:var0"));

    cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg(file.path()).arg("--grounded").arg("--stats");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("actions: 1"))
        .stderr(predicate::str::contains("static variables: 0"));
    Ok(())
}

#[test]
fn writes_files() -> Result<(), Box<dyn std::error::Error>> {
    let file = assert_fs::NamedTempFile::new("swap.json")?;
    file.write_str(SWAP_TASK)?;
    let tempdir = assert_fs::TempDir::new()?;
    let output = tempdir.child("swap.sas.json");
    let mutex = tempdir.child("mutex.txt");

    let mut cmd = Command::cargo_bin("ground-sas")?;
    cmd.arg(file.path())
        .arg("--json")
        .arg("--output")
        .arg(output.path())
        .arg(format!("--mutex-file={}", mutex.path().display()));
    cmd.assert().success().stdout(predicate::str::is_empty());

    output.assert(predicate::str::contains("\"variables\""));
    let sas: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output.path())?)?;
    assert_eq!(sas["variables"].as_array().map(Vec::len), Some(1));
    assert_eq!(sas["actions"][0]["name"], "go");
    mutex.assert("(p) (q)\n");
    Ok(())
}

use assert_cmd::Command;
use predicates::str::{contains, starts_with};
use std::io::Write;

fn bnc() -> Command {
    Command::cargo_bin("bnc").unwrap()
}

#[test]
fn version() {
    bnc().arg("--version").assert().success().stdout(starts_with("bnc "));
}

#[test]
fn call() {
    bnc().args(["call", "add", "0xFF", "-1"]).assert().success().stdout("254\n");
    bnc()
        .args(["call", "modpow", "7", "128", "13"])
        .assert()
        .success()
        .stdout("3\n");
    bnc().args(["call", "tobin", "'4660'"]).assert().failure();
    bnc().args(["call", "isneg", "-12"]).assert().success().stdout("true\n");
}

#[test]
fn call_errors() {
    bnc()
        .args(["call", "div", "1", "0"])
        .assert()
        .failure()
        .stderr(contains("bn.div: division by zero"));
    bnc()
        .args(["call", "frobnicate", "1"])
        .assert()
        .failure()
        .stderr(contains("undefined function 'frobnicate'"));
    bnc()
        .args(["call", "pow", "2"])
        .assert()
        .failure()
        .stderr(contains("wrong number of arguments"));
}

#[test]
fn functions() {
    bnc()
        .arg("functions")
        .assert()
        .success()
        .stdout(starts_with("add\ncmp\ndiv\n"))
        .stdout(contains("\nmodpow\n"));
}

#[test]
fn script_from_stdin() {
    bnc()
        .arg("script")
        .write_stdin("number 0x10\nsqr _   # 256\nsub $2 $1\ntobin _\n")
        .assert()
        .success()
        .stdout("16\n256\n240\nf0\n");
}

#[test]
fn script_from_file_with_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bnc.yml");
    std::fs::write(&config, "number_kind: i32\nload_error_strings: false\n").unwrap();
    let script = dir.path().join("calc.bn");
    let mut f = std::fs::File::create(&script).unwrap();
    writeln!(f, "number -2147483648").unwrap();
    writeln!(f, "mul _ _").unwrap();
    writeln!(f, "mod _ 0").unwrap();
    drop(f);

    bnc()
        .arg("script")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stdout("-2147483648\n4611686018427387904\n")
        .stderr(contains("line 3: mod _ 0"))
        .stderr(contains("bn.mod: error code 103"));
}

#[test]
fn bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bnc.toml");
    std::fs::write(&config, "").unwrap();
    bnc()
        .arg("--config")
        .arg(&config)
        .args(["call", "add", "1", "2"])
        .assert()
        .failure();
}

use assert_cmd::Command;
use predicates::str::contains;

fn rv32sim() -> Command {
    let mut cmd = Command::cargo_bin("rv32sim").unwrap();
    cmd.env_remove("RV32SIM_MAX_STEPS").env_remove("RV32SIM_MEMORY_SIZE");
    cmd
}

#[test]
fn runs_add_program() {
    rv32sim()
        .arg("run")
        .arg("tests/files/add.s")
        .assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("pc 3 after 4 steps"))
        .stdout(contains("x3) =          15"));
}

#[test]
fn prints_json_snapshot() {
    rv32sim()
        .args(["run", "--json", "tests/files/store.s"])
        .assert()
        .success()
        .stdout(contains("\"stepCount\": 5"))
        .stdout(contains("\"hex\": \"0x2A\""))
        .stdout(contains("\"halted\": true"));
}

#[test]
fn keeps_registers_between_files() {
    rv32sim()
        .args(["run", "tests/files/store.s", "tests/files/continue.s"])
        .assert()
        .success()
        .stdout(contains("x4) =          43"));
}

#[test]
fn fresh_clears_registers_between_files() {
    rv32sim()
        .args([
            "run",
            "--fresh",
            "tests/files/store.s",
            "tests/files/continue.s",
        ])
        .assert()
        .success()
        .stdout(contains("x4) =           1"))
        .stdout(contains("Memory:\n  (all zero)"));
}

#[test]
fn reports_runaway() {
    rv32sim()
        .args(["run", "--max-steps", "25", "tests/files/forever.s"])
        .assert()
        .failure()
        .stdout(contains("RunawayExecution"))
        .stdout(contains("exceeded 25 steps"));
}

#[test]
fn reads_limit_from_env() {
    rv32sim()
        .env("RV32SIM_MAX_STEPS", "7")
        .args(["run", "--json", "tests/files/forever.s"])
        .assert()
        .failure()
        .stdout(contains("\"kind\": \"RunawayExecution\""))
        .stdout(contains("\"stepCount\": 7"));
}

#[test]
fn reports_assembly_error() {
    rv32sim()
        .args(["run", "tests/files/bad_register.s"])
        .assert()
        .failure()
        .stdout(contains("InvalidRegister"))
        .stdout(contains("line 2"))
        .stdout(contains("x32"));
}

#[test]
fn reports_memory_fault() {
    rv32sim()
        .args(["run", "tests/files/oob.s"])
        .assert()
        .failure()
        .stdout(contains("MemoryOutOfBounds"))
        .stdout(contains("address 4096"));
}

#[test]
fn larger_memory_avoids_fault() {
    rv32sim()
        .args(["run", "--memory-size", "8192", "tests/files/oob.s"])
        .assert()
        .success()
        .stdout(contains("Halted"));
}

#[test]
fn steps_through_program() {
    rv32sim()
        .args(["step", "-n", "5", "tests/files/add.s"])
        .assert()
        .success()
        .stdout(contains("ADDI x1, x0, 10"))
        .stdout(contains("ADD x3, x1, x2"))
        .stdout(contains("machine is halted"));
}

#[test]
fn checks_listing() {
    rv32sim()
        .args(["check", "tests/files/store.s"])
        .assert()
        .success()
        .stdout(contains("SW x2, 0(x1)"))
        .stdout(contains("line 4"))
        .stdout(contains("5 instructions"));
}

#[test]
fn missing_file_fails() {
    rv32sim()
        .args(["check", "tests/files/does_not_exist.s"])
        .assert()
        .failure()
        .stdout(contains("failed to read"));
}

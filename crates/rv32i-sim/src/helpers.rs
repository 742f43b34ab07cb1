//! Helper functions for testing assembly programs.

use alloc::{format, string::String};

use rv32i_asm::{assemble, Gpr, Program};

use crate::{
    config::SimConfig,
    error::{ErrorKind, SimError},
    logging::LogLevel,
    machine::Machine,
};

/// Assemble `source` and create a tracing machine for it.
pub fn debug_program(source: &str) -> Result<(Machine, Program), SimError> {
    debug_program_with_config(source, SimConfig::default())
}

/// Like [`debug_program`] with a custom config. Tracing is always enabled.
pub fn debug_program_with_config(
    source: &str,
    config: SimConfig,
) -> Result<(Machine, Program), SimError> {
    let program = assemble(source)?;
    let machine = Machine::new(&config.with_log_level(LogLevel::Instructions));
    Ok((machine, program))
}

/// Format error with a program listing and the recent trace.
fn format_error(machine: &Machine, program: &Program, error: &SimError) -> String {
    let mut result = String::new();
    let error_pc = match error {
        SimError::Execution { pc, .. } => Some(*pc),
        _ => None,
    };

    result.push_str("=== RV32I Execution Error ===\n\n");
    result.push_str(&format!("Error: {}\n", error));
    result.push_str(&format!("PC: {}\n\n", machine.get_pc()));

    result.push_str("Program:\n");
    for (idx, inst) in program.iter().enumerate() {
        let marker = if Some(idx as u32) == error_pc {
            ">>> "
        } else {
            "    "
        };
        result.push_str(&format!("{}{:3}: {}\n", marker, idx, inst));
    }

    // Show last 10 logs
    let logs: alloc::vec::Vec<_> = machine.get_logs().collect();
    if !logs.is_empty() {
        result.push_str("\nLast execution logs:\n");
        let start = logs.len().saturating_sub(10);
        for log in &logs[start..] {
            result.push_str(&format!("{}\n", log));
        }
    }

    result
}

/// Expect code to assemble and run to completion, returning the machine.
pub fn expect_ok(source: &str) -> Machine {
    let (mut machine, program) = match debug_program(source) {
        Ok(pair) => pair,
        Err(e) => panic!("Failed to assemble code: {}\n\nCode:\n{}", e, source),
    };
    match machine.run(&program) {
        Ok(_) => machine,
        Err(e) => panic!("{}", format_error(&machine, &program, &e)),
    }
}

/// Expect code to run to completion and leave `expected` in `reg`.
pub fn expect_register(source: &str, reg: Gpr, expected: i32) {
    let machine = expect_ok(source);
    let actual = machine.get_register(reg);
    if actual != expected {
        panic!(
            "Register {} mismatch: expected {}, got {}\n\nCode:\n{}\n{}",
            reg,
            expected,
            actual,
            source,
            machine.dump_state()
        );
    }
}

/// Expect assembling or running code to fail with an error accepted by `check`.
pub fn expect_error<F>(source: &str, check: F)
where
    F: FnOnce(&SimError) -> bool,
{
    let (mut machine, program) = match debug_program(source) {
        Ok(pair) => pair,
        Err(e) => {
            if !check(&e) {
                panic!("Assembly error check failed: {}\n\nCode:\n{}", e, source);
            }
            return;
        }
    };
    match machine.run(&program) {
        Ok(_) => {
            panic!(
                "Expected error but execution succeeded\n\nCode:\n{}",
                source
            );
        }
        Err(e) => {
            if !check(&e) {
                panic!(
                    "Error check failed\n{}",
                    format_error(&machine, &program, &e)
                );
            }
        }
    }
}

/// Expect code to fail with a memory bounds error.
pub fn expect_memory_error(source: &str) {
    expect_error(source, |e| e.kind() == ErrorKind::MemoryOutOfBounds);
}

//! Driver loop: fetch by instruction index, execute, advance.

use alloc::{boxed::Box, collections::VecDeque, format, string::String};

use rv32i_asm::{Gpr, Program};

use crate::{
    config::SimConfig,
    error::SimError,
    executor::execute_instruction,
    logging::{InstLog, LogLevel},
    memory::Memory,
    snapshot::Snapshot,
    state::ProcessorState,
};

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// An instruction ran and the machine can continue
    Continue,
    /// The machine is halted, either by this step or before it
    Halted,
    /// pc is past the last instruction; nothing was executed
    OutOfProgram,
}

/// Processor state and memory for one simulation.
///
/// The machine does not own a program; each call is given the program to
/// fetch from, so a session can swap programs without rebuilding state.
#[derive(Debug, Clone)]
pub struct Machine {
    state: ProcessorState,
    memory: Memory,
    step_count: u64,
    max_steps: u64,
    log_level: LogLevel,
    trace_capacity: usize,
    log_buffer: VecDeque<InstLog>,
}

impl Machine {
    /// Create a zeroed machine.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: ProcessorState::new(),
            memory: Memory::new(config.memory_size),
            step_count: 0,
            max_steps: config.max_steps,
            log_level: config.log_level,
            trace_capacity: config.trace_capacity,
            log_buffer: VecDeque::new(),
        }
    }

    /// Set the maximum number of steps for [`Machine::run`].
    pub fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = limit;
        self
    }

    /// Set the logging level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Whether the next step would execute an instruction.
    pub fn is_running(&self, program: &Program) -> bool {
        !self.state.halted && (self.state.pc as usize) < program.len()
    }

    /// Execute the instruction at pc.
    ///
    /// A halted machine or a pc outside the program is left as is. `HLT`
    /// leaves pc on the `HLT`. A failing instruction changes nothing.
    pub fn step(&mut self, program: &Program) -> Result<StepResult, SimError> {
        if self.state.halted {
            return Ok(StepResult::Halted);
        }

        let pc = self.state.pc;
        let Some(inst) = program.get(pc as usize) else {
            return Ok(StepResult::OutOfProgram);
        };

        let exec_result = execute_instruction(inst, &mut self.state, &mut self.memory)
            .map_err(|source| SimError::Execution {
                pc,
                line: program.line_of(pc as usize).unwrap_or(0),
                opcode: inst.mnemonic(),
                source,
            })?;

        self.step_count += 1;
        log::trace!("[{}] {}: {}", self.step_count, pc, inst);

        if exec_result.halted {
            self.state.halted = true;
        } else {
            self.state.pc = exec_result.new_pc.unwrap_or(pc.wrapping_add(1));
        }

        let log_with_step = exec_result.log.with_step(self.step_count);
        self.log_instruction(log_with_step);

        if exec_result.halted {
            Ok(StepResult::Halted)
        } else {
            Ok(StepResult::Continue)
        }
    }

    /// Step until the machine halts or pc leaves the program.
    ///
    /// Returns the step count. Fails with `RunawayExecution` once the count
    /// reaches the ceiling while there is still an instruction to run.
    pub fn run(&mut self, program: &Program) -> Result<u64, SimError> {
        loop {
            if !self.is_running(program) {
                log::debug!(
                    "run finished after {} steps (pc {}, halted {})",
                    self.step_count,
                    self.state.pc,
                    self.state.halted
                );
                return Ok(self.step_count);
            }
            if self.step_count >= self.max_steps {
                log::warn!(
                    "aborting run at pc {}: step limit {} reached",
                    self.state.pc,
                    self.max_steps
                );
                return Err(SimError::RunawayExecution {
                    limit: self.max_steps,
                    snapshot: Box::new(self.snapshot()),
                });
            }
            self.step(program)?;
        }
    }

    /// Rewind pc and clear the halt flag, keeping registers and memory.
    pub fn restart(&mut self) {
        self.state.restart();
        self.step_count = 0;
        self.log_buffer.clear();
    }

    /// Zero registers, memory, pc and counters.
    pub fn reset(&mut self) {
        self.state.reset();
        self.memory.reset();
        self.step_count = 0;
        self.log_buffer.clear();
        log::debug!("machine reset ({} bytes of memory)", self.memory.len());
    }

    /// Get the value of a register.
    pub fn get_register(&self, reg: Gpr) -> i32 {
        self.state.read(reg)
    }

    /// Set the value of a register.
    ///
    /// Note: Writing to x0 is a no-op.
    pub fn set_register(&mut self, reg: Gpr, value: i32) {
        self.state.write(reg, value);
    }

    /// Get the current program counter (an instruction index).
    pub fn get_pc(&self) -> u32 {
        self.state.pc
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.state.pc = pc;
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    /// Get the number of steps executed since the last restart or reset.
    pub fn get_step_count(&self) -> u64 {
        self.step_count
    }

    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    /// Get a reference to the memory (for inspection).
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Get a mutable reference to the memory (for initialization).
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Capture the observable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: *self.state.regs(),
            pc: self.state.pc,
            memory: self.memory.cells(),
            halted: self.state.halted,
            step_count: self.step_count,
        }
    }

    /// Get captured log entries, oldest first.
    pub fn get_logs(&self) -> impl Iterator<Item = &InstLog> {
        self.log_buffer.iter()
    }

    /// Format all captured logs as a string.
    pub fn format_logs(&self) -> String {
        let mut result = String::new();
        for log in &self.log_buffer {
            result.push_str(&format!("{}\n", log));
        }
        result
    }

    /// Clear captured log entries.
    pub fn clear_logs(&mut self) {
        self.log_buffer.clear();
    }

    /// Dump the current machine state as a human-readable string.
    pub fn dump_state(&self) -> String {
        let mut result = String::new();
        result.push_str(&format!("PC: {}\n", self.state.pc));
        result.push_str(&format!("Halted: {}\n", self.state.halted));
        result.push_str(&format!("Steps executed: {}\n", self.step_count));
        result.push_str("\nRegisters:\n");

        for reg in Gpr::all() {
            let value = self.get_register(reg);
            if value != 0 || reg == Gpr::ZERO {
                result.push_str(&format!(
                    "  {:>4} ({}) = 0x{:08x} ({})\n",
                    reg.abi_name(),
                    reg,
                    value as u32,
                    value
                ));
            }
        }

        result
    }

    /// Keep `log` in the bounded trace if tracing is enabled.
    fn log_instruction(&mut self, log: InstLog) {
        match self.log_level {
            LogLevel::None => {}
            LogLevel::Instructions => {
                if self.trace_capacity == 0 {
                    return;
                }
                if self.log_buffer.len() >= self.trace_capacity {
                    self.log_buffer.pop_front();
                }
                self.log_buffer.push_back(log);
            }
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

//! One simulation session: a loaded program plus its machine.
//!
//! A `Session` is an ordinary value. Callers that share one across threads
//! wrap it in their own lock.

use rv32i_asm::{assemble, Program};

use crate::{config::SimConfig, error::SimError, machine::Machine, snapshot::Snapshot};

/// Program and machine state for one client.
#[derive(Debug, Clone)]
pub struct Session {
    config: SimConfig,
    machine: Machine,
    program: Option<Program>,
}

impl Session {
    pub fn new(config: SimConfig) -> Self {
        Self {
            machine: Machine::new(&config),
            config,
            program: None,
        }
    }

    /// Assemble `source` and run it from index 0 to completion.
    ///
    /// Unless disabled in the config, registers and memory carry over from
    /// earlier runs; only pc and the halt flag are reset.
    pub fn assemble_and_run(&mut self, source: &str) -> Result<Snapshot, SimError> {
        let program = load(source)?;

        if self.config.preserve_state_on_run {
            self.machine.restart();
        } else {
            self.machine.reset();
        }

        let program = self.program.insert(program);
        log::debug!("running {} instructions", program.len());
        self.machine.run(program)?;
        Ok(self.machine.snapshot())
    }

    /// Assemble `source` into a fresh machine and execute one instruction.
    pub fn assemble_and_step(&mut self, source: &str) -> Result<Snapshot, SimError> {
        let program = load(source)?;
        self.machine.reset();

        let program = self.program.insert(program);
        self.machine.step(program)?;
        Ok(self.machine.snapshot())
    }

    /// Execute one more instruction of the loaded program.
    pub fn step(&mut self) -> Result<Snapshot, SimError> {
        let program = self.program.as_ref().ok_or(SimError::NoProgramLoaded)?;
        self.machine.step(program)?;
        Ok(self.machine.snapshot())
    }

    /// Drop the program and zero all state.
    pub fn reset(&mut self) -> Snapshot {
        self.program = None;
        self.machine.reset();
        self.machine.snapshot()
    }

    /// Current observable state.
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

/// Assemble, rejecting blank sources and sources without instructions.
fn load(source: &str) -> Result<Program, SimError> {
    if source.trim().is_empty() {
        return Err(SimError::EmptySource);
    }
    let program = assemble(source)?;
    if program.is_empty() {
        return Err(SimError::NoInstructions);
    }
    Ok(program)
}

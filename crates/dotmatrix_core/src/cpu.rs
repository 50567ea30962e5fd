use crate::error::CoreError;
use crate::interrupts::{self, Interrupt, INTERRUPT_REQUESTED_ADDRESS};
use crate::memory::Memory;

pub mod decode;
pub mod exec;
pub mod math;
pub mod regs;

#[cfg(test)]
mod tests;

pub use decode::{decode, decode_extended, Decoded, Instruction};
pub use exec::Step;
pub use regs::{Flag, Registers};

/// Cost of dispatching an interrupt instead of fetching an instruction.
const INTERRUPT_DISPATCH_CYCLES: u32 = 20;
/// Cost of an idle step while halted.
const HALT_IDLE_CYCLES: u32 = 4;

/// The LR35902 CPU core: the register file, the interrupt master enable,
/// and the halted latch. All memory traffic goes through the bus passed
/// into `step`.
pub struct Cpu {
    pub regs: Registers,
    pub ime: bool,
    pub halted: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ime: false,
            halted: false,
        }
    }

    /// Execute one step: service a pending interrupt if the master enable
    /// allows it, otherwise fetch, decode, and execute one instruction at
    /// PC. Returns the cycle cost, which the caller uses as the unit of
    /// time for the PPU and timer.
    pub fn step<M: Memory>(&mut self, bus: &mut M) -> Result<u32, CoreError> {
        if self.halted {
            // Any pending request wakes the CPU, even while masked by IE or
            // IME; until then the machine idles but time keeps passing.
            let requested = bus.read(INTERRUPT_REQUESTED_ADDRESS)?;
            if requested & 0x1F == 0 {
                return Ok(HALT_IDLE_CYCLES);
            }
            self.halted = false;
        }

        if self.ime {
            if let Some(interrupt) = interrupts::highest_priority_active(&*bus)? {
                return self.service_interrupt(bus, interrupt);
            }
        }

        let instruction = self.fetch_decode(bus)?;
        let step = self.execute(instruction, bus)?;
        self.regs.pc = step.pc;
        if step.halted {
            self.halted = true;
        }
        Ok(step.cycles)
    }

    /// Fetch the opcode at PC, redecoding through the extended table when
    /// the first byte is the 0xCB prefix.
    fn fetch_decode<M: Memory>(&self, bus: &M) -> Result<Instruction, CoreError> {
        let opcode = bus.read(self.regs.pc)?;
        match decode(opcode)? {
            Decoded::Instruction(instruction) => Ok(instruction),
            Decoded::Extended => {
                let opcode = bus.read(self.regs.pc.wrapping_add(1))?;
                Ok(decode_extended(opcode))
            }
        }
    }

    /// Jump to an interrupt vector: clear the master enable, acknowledge
    /// the source, push the interrupted PC, and charge the dispatch cost.
    fn service_interrupt<M: Memory>(
        &mut self,
        bus: &mut M,
        interrupt: Interrupt,
    ) -> Result<u32, CoreError> {
        self.ime = false;
        interrupts::acknowledge(bus, interrupt)?;
        let pc = self.regs.pc;
        self.push16(bus, pc)?;
        self.regs.pc = interrupt.vector();
        Ok(INTERRUPT_DISPATCH_CYCLES)
    }
}

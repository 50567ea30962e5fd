use thiserror::Error;

/// Fatal emulation faults.
///
/// None of these are recoverable: an instruction either completes all of its
/// register/memory/flag updates and yields a cycle cost, or the whole session
/// aborts with one of these diagnostics. Callers are expected to stop the
/// frame loop and surface the error to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The opcode byte (optionally behind the 0xCB prefix) has no entry in
    /// the instruction table.
    #[error("invalid opcode 0x{opcode:02X} (extended table: {extended})")]
    InvalidOpcode { opcode: u8, extended: bool },

    /// Access to an address range the bus does not model (the echo RAM gap).
    #[error("unimplemented memory region access at 0x{address:04X}")]
    UnimplementedMemoryRegion { address: u16 },

    /// The ROM header names a memory bank controller we do not implement.
    #[error("unsupported cartridge controller code 0x{code:02X}")]
    UnsupportedCartridgeController { code: u8 },

    /// A persisted save's length does not match the cartridge's RAM size.
    #[error("save data size mismatch: expected {expected} bytes, got {actual}")]
    SaveDataSizeMismatch { expected: usize, actual: usize },

    /// STOP is not modeled; executing it must not silently continue.
    #[error("STOP instruction is not supported")]
    StopUnsupported,
}

use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::error::CoreError;
use crate::joypad::{Button, Joypad};
use crate::memory::MemoryBus;
use crate::ppu::palette::Color;
use crate::ppu::Ppu;
use crate::timer::Timer;

/// Collaborator persisting battery-backed cartridge RAM.
///
/// The emulator calls `load` once before the frame loop starts and `save`
/// whenever the cartridge's bank-control logic signals a flush point. The
/// identity string is stable per ROM image (title plus global checksum).
pub trait SaveStore {
    fn load(&mut self, id: &str) -> Option<Vec<u8>>;
    fn save(&mut self, id: &str, data: &[u8]);
}

/// A save store for cartridges without battery RAM, or headless runs.
pub struct NoSaveStore;

impl SaveStore for NoSaveStore {
    fn load(&mut self, _id: &str) -> Option<Vec<u8>> {
        None
    }
    fn save(&mut self, _id: &str, _data: &[u8]) {}
}

/// The whole machine: CPU, bus (with cartridge), PPU, timer, and joypad,
/// driven one frame at a time by a single synchronous loop.
pub struct Emulator {
    pub cpu: Cpu,
    bus: MemoryBus,
    ppu: Ppu,
    timer: Timer,
    joypad: Joypad,
    cartridge_id: String,
}

impl Emulator {
    pub fn new(rom: Vec<u8>) -> Result<Self, CoreError> {
        let cartridge = Cartridge::new(rom)?;
        let cartridge_id = cartridge.id();
        log::info!(
            "loaded cartridge '{}' (checksum 0x{:04X})",
            cartridge.title(),
            cartridge.global_checksum()
        );
        Ok(Self {
            cpu: Cpu::new(),
            bus: MemoryBus::new(cartridge),
            ppu: Ppu::new(),
            timer: Timer::new(),
            joypad: Joypad::new(),
            cartridge_id,
        })
    }

    pub fn cartridge_id(&self) -> &str {
        &self.cartridge_id
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Restore battery RAM from the save store, if a save exists for this
    /// cartridge. Must be called before the first `run_frame`.
    pub fn load_persisted_ram(&mut self, store: &mut dyn SaveStore) -> Result<(), CoreError> {
        if let Some(data) = store.load(&self.cartridge_id) {
            log::info!("restoring {} bytes of cartridge RAM", data.len());
            self.bus.cartridge_mut().load_persisted_ram(data)?;
        }
        Ok(())
    }

    /// Run the machine until the PPU enters the vertical blank, then hand
    /// back the completed frame.
    ///
    /// One iteration: step the CPU, step the PPU once per elapsed cycle,
    /// tick the timer by the same cycles, publish the PPU and joypad
    /// registers, and service any cartridge flush point.
    pub fn run_frame(&mut self, store: &mut dyn SaveStore) -> Result<&[Color], CoreError> {
        loop {
            let cycles = self.cpu.step(&mut self.bus)?;

            let mut vsync = false;
            for _ in 0..cycles {
                vsync |= self.ppu.execute_step(&mut self.bus)?;
            }

            self.timer.tick(cycles, &mut self.bus)?;
            self.ppu.update_memory(&mut self.bus)?;
            self.joypad.update_memory(&mut self.bus);

            if let Some(ram) = self.bus.cartridge_mut().take_pending_save() {
                store.save(&self.cartridge_id, &ram);
            }

            if vsync {
                return Ok(self.ppu.framebuffer());
            }
        }
    }

    pub fn button_down(&mut self, button: Button) -> Result<(), CoreError> {
        self.joypad.press(&mut self.bus, button)
    }

    pub fn button_up(&mut self, button: Button) {
        self.joypad.release(button);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

    /// A 32 KiB no-mapper ROM whose entry point is an endless run of NOPs.
    fn nop_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = 0x00;
        rom[0x134..0x138].copy_from_slice(b"LOOP");
        rom
    }

    struct RecordingStore {
        loaded: Vec<String>,
        saved: Vec<(String, usize)>,
        save_data: Option<Vec<u8>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                loaded: Vec::new(),
                saved: Vec::new(),
                save_data: None,
            }
        }
    }

    impl SaveStore for RecordingStore {
        fn load(&mut self, id: &str) -> Option<Vec<u8>> {
            self.loaded.push(id.to_string());
            self.save_data.clone()
        }
        fn save(&mut self, id: &str, data: &[u8]) {
            self.saved.push((id.to_string(), data.len()));
        }
    }

    #[test]
    fn a_frame_completes_at_vblank() {
        let mut emulator = Emulator::new(nop_rom()).unwrap();
        let mut store = NoSaveStore;
        let frame = emulator.run_frame(&mut store).unwrap();
        assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        // The VBlank request is observable in IF.
        assert_eq!(emulator.bus().read(0xFF0F).unwrap() & 0x01, 0x01);
        assert_eq!(emulator.bus().read(0xFF44).unwrap(), 143);
    }

    #[test]
    fn frames_keep_a_stable_cadence() {
        let mut emulator = Emulator::new(nop_rom()).unwrap();
        let mut store = NoSaveStore;
        emulator.run_frame(&mut store).unwrap();
        let pc_after_one = emulator.cpu.regs.pc;
        emulator.run_frame(&mut store).unwrap();
        // A second frame executes about as many NOPs as the first.
        let advanced = emulator.cpu.regs.pc - pc_after_one;
        assert!(advanced > 0x4000, "PC only advanced 0x{advanced:04X}");
    }

    #[test]
    fn persisted_ram_loads_before_the_loop() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = 0x13;
        let mut emulator = Emulator::new(rom).unwrap();

        let mut store = RecordingStore::new();
        store.save_data = Some(vec![0x5A; 0x8000]);
        emulator.load_persisted_ram(&mut store).unwrap();
        assert_eq!(store.loaded, vec![emulator.cartridge_id().to_string()]);
        assert_eq!(emulator.bus().cartridge().read(0xA000), 0x5A);
    }

    #[test]
    fn wrong_sized_save_aborts_the_load() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = 0x13;
        let mut emulator = Emulator::new(rom).unwrap();

        let mut store = RecordingStore::new();
        store.save_data = Some(vec![0; 16]);
        assert!(matches!(
            emulator.load_persisted_ram(&mut store),
            Err(CoreError::SaveDataSizeMismatch { .. })
        ));
    }

    #[test]
    fn buttons_reach_the_joypad_register() {
        let mut emulator = Emulator::new(nop_rom()).unwrap();
        let mut store = NoSaveStore;
        emulator.button_down(Button::Start).unwrap();
        // Pressing requests the joypad interrupt.
        assert_eq!(emulator.bus().read(0xFF0F).unwrap() & 0x10, 0x10);
        emulator.run_frame(&mut store).unwrap();
        emulator.button_up(Button::Start);
    }
}

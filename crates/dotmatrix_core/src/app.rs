use dotmatrix_common::app::App;
use dotmatrix_common::key::Key;

use crate::emulator::{Emulator, SaveStore};
use crate::error::CoreError;
use crate::joypad::Button;
use crate::memory::Memory;
use crate::ppu::palette::Color;
use crate::{SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};

/// Frontend-facing wrapper: owns the emulator and its save store, steps one
/// frame per `update`, and converts the framebuffer to RGB24.
pub struct EmulatorApp {
    emulator: Emulator,
    save_store: Box<dyn SaveStore>,
    should_exit: bool,
    frame_counter: u64,
}

impl EmulatorApp {
    /// Build the machine and restore any persisted cartridge RAM before the
    /// frame loop starts.
    pub fn new(rom: Vec<u8>, mut save_store: Box<dyn SaveStore>) -> Result<Self, CoreError> {
        let mut emulator = Emulator::new(rom)?;
        emulator.load_persisted_ram(save_store.as_mut())?;
        Ok(Self {
            emulator,
            save_store,
            should_exit: false,
            frame_counter: 0,
        })
    }

    fn map_key(key: Key) -> Option<Button> {
        match key {
            Key::Up => Some(Button::Up),
            Key::Down => Some(Button::Down),
            Key::Left => Some(Button::Left),
            Key::Right => Some(Button::Right),
            Key::Z => Some(Button::A),
            Key::X => Some(Button::B),
            Key::A | Key::Backspace => Some(Button::Select),
            Key::S | Key::Return => Some(Button::Start),
            _ => None,
        }
    }

    fn log_frame_state(&self) {
        let regs = &self.emulator.cpu.regs;
        let bus = self.emulator.bus();
        log::info!(
            "frame={} pc=0x{:04X} sp=0x{:04X} af=0x{:04X} bc=0x{:04X} de=0x{:04X} hl=0x{:04X} \
             ime={} halted={} IF=0x{:02X} IE=0x{:02X} LCDC=0x{:02X} STAT=0x{:02X} LY={}",
            self.frame_counter,
            regs.pc,
            regs.sp,
            regs.af(),
            regs.bc(),
            regs.de(),
            regs.hl(),
            self.emulator.cpu.ime,
            self.emulator.cpu.halted,
            bus.read(0xFF0F).unwrap_or(0),
            bus.read(0xFFFF).unwrap_or(0),
            bus.read(0xFF40).unwrap_or(0),
            bus.read(0xFF41).unwrap_or(0),
            bus.read(0xFF44).unwrap_or(0),
        );
    }
}

/// DMG grayscale ramp used for presentation.
fn shade(color: Color) -> u8 {
    match color {
        Color::White | Color::Transparent => 0xFF,
        Color::LightGray => 0xAA,
        Color::DarkGray => 0x55,
        Color::Black => 0x00,
    }
}

impl App for EmulatorApp {
    fn init(&mut self) {
        log::info!("starting '{}'", self.emulator.cartridge_id());
    }

    fn update(&mut self, screen: &mut [u8]) {
        let frame = match self.emulator.run_frame(self.save_store.as_mut()) {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("emulation halted: {err}");
                self.should_exit = true;
                return;
            }
        };

        for (pixel, chunk) in frame.iter().zip(screen.chunks_exact_mut(3)) {
            let level = shade(*pixel);
            chunk.fill(level);
        }

        self.frame_counter += 1;
        if self.frame_counter == 1 || self.frame_counter % 600 == 0 {
            self.log_frame_state();
        }
    }

    fn handle_key_event(&mut self, key: Key, is_down: bool) {
        let Some(button) = Self::map_key(key) else {
            return;
        };
        if is_down {
            if let Err(err) = self.emulator.button_down(button) {
                log::error!("emulation halted: {err}");
                self.should_exit = true;
            }
        } else {
            self.emulator.button_up(button);
        }
    }

    fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn exit(&mut self) {
        log::info!("shutting down after {} frames", self.frame_counter);
    }

    fn width(&self) -> u32 {
        SCREEN_WIDTH as u32
    }

    fn height(&self) -> u32 {
        SCREEN_HEIGHT as u32
    }

    fn scale(&self) -> u32 {
        SCREEN_SCALE
    }

    fn title(&self) -> String {
        "dotmatrix".to_string()
    }
}

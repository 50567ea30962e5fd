use bitflags::bitflags;

use crate::error::CoreError;
use crate::interrupts::{self, Interrupt};
use crate::memory::{Memory, MemoryBus};

/// The eight logical buttons a frontend can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct Buttons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const RIGHT = 1 << 4;
        const LEFT = 1 << 5;
        const UP = 1 << 6;
        const DOWN = 1 << 7;
    }
}

impl Button {
    fn flag(self) -> Buttons {
        match self {
            Button::A => Buttons::A,
            Button::B => Buttons::B,
            Button::Select => Buttons::SELECT,
            Button::Start => Buttons::START,
            Button::Right => Buttons::RIGHT,
            Button::Left => Buttons::LEFT,
            Button::Up => Buttons::UP,
            Button::Down => Buttons::DOWN,
        }
    }
}

/// Tracks pressed buttons and composes the JOYP register.
#[derive(Default)]
pub struct Joypad {
    pressed: Buttons,
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press and raise the joypad interrupt.
    pub fn press<M: Memory>(&mut self, memory: &mut M, button: Button) -> Result<(), CoreError> {
        self.pressed.insert(button.flag());
        interrupts::request(memory, Interrupt::Joypad)
    }

    pub fn release(&mut self, button: Button) {
        self.pressed.remove(button.flag());
    }

    /// Compose the JOYP low nibble from the currently selected group(s).
    ///
    /// Selection bits are active-low, as are the reported keys; a group
    /// that is not selected contributes nothing, so with neither group
    /// selected the register reads 0xFF.
    pub fn update_memory(&self, bus: &mut MemoryBus) {
        let select = bus.joypad_select();
        let mut keys = 0x0F;
        if select & 0x10 == 0 {
            keys &= !(self.direction_nibble()) & 0x0F;
        }
        if select & 0x20 == 0 {
            keys &= !(self.action_nibble()) & 0x0F;
        }
        bus.set_joypad_keys(keys);
    }

    /// Right/Left/Up/Down in bits 0..3, bit set while pressed.
    fn direction_nibble(&self) -> u8 {
        (self.pressed.bits() >> 4) & 0x0F
    }

    /// A/B/Select/Start in bits 0..3, bit set while pressed.
    fn action_nibble(&self) -> u8 {
        self.pressed.bits() & 0x0F
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Cartridge;
    use crate::memory::io::JOYPAD_ADDRESS;

    fn test_bus() -> MemoryBus {
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = 0x00;
        MemoryBus::new(Cartridge::new(rom).unwrap())
    }

    #[test]
    fn no_group_selected_reads_all_ones() {
        let mut bus = test_bus();
        let mut joypad = Joypad::new();
        joypad.press(&mut bus, Button::A).unwrap();
        bus.write(JOYPAD_ADDRESS, 0x30).unwrap();
        joypad.update_memory(&mut bus);
        assert_eq!(bus.read(JOYPAD_ADDRESS).unwrap(), 0xFF);
    }

    #[test]
    fn action_group_reports_pressed_keys_low() {
        let mut bus = test_bus();
        let mut joypad = Joypad::new();
        joypad.press(&mut bus, Button::A).unwrap();
        joypad.press(&mut bus, Button::Start).unwrap();
        // Bit 5 low selects the action group.
        bus.write(JOYPAD_ADDRESS, 0x10).unwrap();
        joypad.update_memory(&mut bus);
        assert_eq!(bus.read(JOYPAD_ADDRESS).unwrap(), 0xC0 | 0x10 | 0b0110);
    }

    #[test]
    fn direction_group_reports_pressed_keys_low() {
        let mut bus = test_bus();
        let mut joypad = Joypad::new();
        joypad.press(&mut bus, Button::Left).unwrap();
        bus.write(JOYPAD_ADDRESS, 0x20).unwrap();
        joypad.update_memory(&mut bus);
        assert_eq!(bus.read(JOYPAD_ADDRESS).unwrap(), 0xC0 | 0x20 | 0b1101);
    }

    #[test]
    fn release_restores_the_key_bit() {
        let mut bus = test_bus();
        let mut joypad = Joypad::new();
        joypad.press(&mut bus, Button::B).unwrap();
        joypad.release(Button::B);
        bus.write(JOYPAD_ADDRESS, 0x10).unwrap();
        joypad.update_memory(&mut bus);
        assert_eq!(bus.read(JOYPAD_ADDRESS).unwrap(), 0xC0 | 0x10 | 0x0F);
    }

    #[test]
    fn press_requests_the_joypad_interrupt() {
        let mut bus = test_bus();
        let mut joypad = Joypad::new();
        joypad.press(&mut bus, Button::Up).unwrap();
        assert_eq!(bus.read(0xFF0F).unwrap() & 0x10, 0x10);
    }
}

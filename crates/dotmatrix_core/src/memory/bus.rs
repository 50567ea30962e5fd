use crate::cartridge::Cartridge;
use crate::error::CoreError;
use crate::memory::io::DMA_ADDRESS;
use crate::memory::{Bank, IoRegisters, Memory};

/// The address bus: owns every non-cartridge region and performs the
/// exhaustive range dispatch over the 16-bit address space.
///
/// Layout:
///
/// - 0x0000..0x8000  cartridge ROM
/// - 0x8000..0xA000  VRAM
/// - 0xA000..0xC000  cartridge RAM
/// - 0xC000..0xE000  work RAM
/// - 0xE000..0xFE00  echo RAM, unimplemented: any access is fatal
/// - 0xFE00..0xFEA0  OAM
/// - 0xFEA0..0xFF00  unusable: reads 0xFF, writes ignored
/// - 0xFF00..0xFF80  I/O registers
/// - 0xFF80..0xFFFF  HRAM
/// - 0xFFFF          interrupt enable
pub struct MemoryBus {
    cartridge: Cartridge,
    vram: Bank,
    wram: Bank,
    oam: Bank,
    io: IoRegisters,
    hram: Bank,
    interrupt_enable: u8,
}

impl MemoryBus {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            vram: Bank::new(0x2000, 0x8000),
            wram: Bank::new(0x2000, 0xC000),
            oam: Bank::new(0x100, 0xFE00),
            io: IoRegisters::new(),
            hram: Bank::new(0x7F, 0xFF80),
            interrupt_enable: 0,
        }
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }

    #[inline]
    pub fn joypad_select(&self) -> u8 {
        self.io.joypad_select()
    }

    #[inline]
    pub fn set_joypad_keys(&mut self, nibble: u8) {
        self.io.set_joypad_keys(nibble);
    }

    /// Copy 256 bytes from `source_page << 8` into OAM, replacing its
    /// contents wholesale. Source bytes go through the bus's own read path,
    /// so banked cartridge regions behave as the program sees them.
    fn dma_transfer(&mut self) -> Result<(), CoreError> {
        let base = (self.io.read(DMA_ADDRESS) as u16) << 8;
        let mut data = vec![0u8; 0x100];
        for (i, slot) in data.iter_mut().enumerate() {
            *slot = self.read(base.wrapping_add(i as u16))?;
        }
        self.oam.replace(data)
    }
}

impl Memory for MemoryBus {
    fn read(&self, address: u16) -> Result<u8, CoreError> {
        if address < 0x8000 {
            Ok(self.cartridge.read(address))
        } else if address < 0xA000 {
            Ok(self.vram.get(address))
        } else if address < 0xC000 {
            Ok(self.cartridge.read(address))
        } else if address < 0xE000 {
            Ok(self.wram.get(address))
        } else if address < 0xFE00 {
            Err(CoreError::UnimplementedMemoryRegion { address })
        } else if address < 0xFEA0 {
            Ok(self.oam.get(address))
        } else if address < 0xFF00 {
            Ok(0xFF)
        } else if address < 0xFF80 {
            Ok(self.io.read(address))
        } else if address < 0xFFFF {
            Ok(self.hram.get(address))
        } else {
            Ok(self.interrupt_enable)
        }
    }

    fn write(&mut self, address: u16, value: u8) -> Result<(), CoreError> {
        if address < 0x8000 {
            self.cartridge.write(address, value);
            Ok(())
        } else if address < 0xA000 {
            self.vram.set(address, value);
            Ok(())
        } else if address < 0xC000 {
            self.cartridge.write(address, value);
            Ok(())
        } else if address < 0xE000 {
            self.wram.set(address, value);
            Ok(())
        } else if address < 0xFE00 {
            Err(CoreError::UnimplementedMemoryRegion { address })
        } else if address < 0xFEA0 {
            self.oam.set(address, value);
            Ok(())
        } else if address < 0xFF00 {
            Ok(())
        } else if address < 0xFF80 {
            self.io.write(address, value);
            if self.io.take_dma_request() {
                // The transfer completes synchronously, before the
                // triggering write returns.
                self.dma_transfer()?;
            }
            Ok(())
        } else if address < 0xFFFF {
            self.hram.set(address, value);
            Ok(())
        } else {
            self.interrupt_enable = value;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{read16, write16};

    fn test_bus() -> MemoryBus {
        // 32 KiB ROM, no mapper.
        let mut rom = vec![0u8; 0x8000];
        rom[0x147] = 0x00;
        // Recognizable pattern in the 0x1000 page for the DMA test.
        for i in 0..0x100usize {
            rom[0x1000 + i] = i as u8;
        }
        MemoryBus::new(Cartridge::new(rom).unwrap())
    }

    #[test]
    fn dispatch_routes_each_region() {
        let mut bus = test_bus();
        bus.write(0x8000, 0x11).unwrap();
        bus.write(0xC000, 0x22).unwrap();
        bus.write(0xFE00, 0x33).unwrap();
        bus.write(0xFF80, 0x44).unwrap();
        bus.write(0xFFFF, 0x55).unwrap();
        assert_eq!(bus.read(0x8000).unwrap(), 0x11);
        assert_eq!(bus.read(0xC000).unwrap(), 0x22);
        assert_eq!(bus.read(0xFE00).unwrap(), 0x33);
        assert_eq!(bus.read(0xFF80).unwrap(), 0x44);
        assert_eq!(bus.read(0xFFFF).unwrap(), 0x55);
        // ROM is not writable through the bus.
        assert_eq!(bus.read(0x1000).unwrap(), 0x00);
    }

    #[test]
    fn echo_ram_access_is_fatal() {
        let mut bus = test_bus();
        assert_eq!(
            bus.read(0xE000),
            Err(CoreError::UnimplementedMemoryRegion { address: 0xE000 })
        );
        assert_eq!(
            bus.write(0xFDFF, 0),
            Err(CoreError::UnimplementedMemoryRegion { address: 0xFDFF })
        );
    }

    #[test]
    fn unusable_range_reads_ff_and_ignores_writes() {
        let mut bus = test_bus();
        bus.write(0xFEA0, 0x12).unwrap();
        assert_eq!(bus.read(0xFEA0).unwrap(), 0xFF);
        assert_eq!(bus.read(0xFEFF).unwrap(), 0xFF);
    }

    #[test]
    fn word_access_round_trips() {
        let mut bus = test_bus();
        for addr in [0x8010u16, 0xC123, 0xFE20, 0xFF85] {
            write16(&mut bus, addr, 0xBEEF).unwrap();
            assert_eq!(read16(&bus, addr).unwrap(), 0xBEEF);
        }
    }

    #[test]
    fn dma_write_copies_a_page_into_oam() {
        let mut bus = test_bus();
        bus.write(0xFE00, 0xAA).unwrap();
        bus.write(0xFF46, 0x10).unwrap();
        // Prior OAM contents are replaced wholesale.
        for i in 0..0xA0u16 {
            assert_eq!(bus.read(0xFE00 + i).unwrap(), i as u8);
        }
        assert_eq!(bus.read(0xFF46).unwrap(), 0x10);
    }
}

use std::fs;

use getset::{CopyGetters, Getters};
use strum_macros::AsRefStr;

use crate::error::Error;

/// ROM classification.
#[derive(AsRefStr, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ROMType {
    Unknown,
    LoROM,
    HiROM,
    ExLoROM,
    ExHiROM,
}

/// ROM header field offsets (relative to the mapped LoROM/HiROM bank).
mod header {
    pub const TITLE_LEN: usize = 21;
    pub const TITLE: usize = 0xFFC0;
    pub const MARKUP: usize = 0xFFD5;
    pub const TYPE: usize = 0xFFD6;
    pub const SIZE: usize = 0xFFD7;
    pub const NMI: usize = 0xFFEA;
    pub const RESET: usize = 0xFFFC;
}

/// A SNES ROM image: raw bytes plus the classification (mapping mode)
/// needed to translate SNES addresses into file offsets.
#[derive(Getters, CopyGetters)]
pub struct ROM {
    #[getset(get = "pub")]
    path: String,
    data: Vec<u8>,

    #[getset(get_copy = "pub")]
    rom_type: ROMType,
}

impl ROM {
    /// Load a ROM image from disk and classify it.
    pub fn from_file(path: &str) -> Result<ROM, Error> {
        let data = fs::read(path)?;
        Self::from_bytes(path.to_owned(), data)
    }

    /// Build a ROM from an in-memory image, classifying it the same way a
    /// file-backed one would be. Exists so the engine can be exercised
    /// against small synthetic images in tests.
    pub fn from_bytes(path: String, data: Vec<u8>) -> Result<ROM, Error> {
        if data.len() < 0x8000 {
            return Err(Error::TruncatedRom(data.len()));
        }
        let mut rom = ROM { path, data, rom_type: ROMType::Unknown };
        rom.rom_type = rom.discover_type();
        rom.rom_type = rom.discover_subtype();
        Ok(rom)
    }

    pub fn read_byte(&self, address: usize) -> u8 {
        self.data[self.translate(address)]
    }

    pub fn read_word(&self, address: usize) -> u16 {
        let lo = self.read_byte(address) as u16;
        let hi = self.read_byte(address + 1) as u16;
        (hi << 8) | lo
    }

    pub fn read_address(&self, address: usize) -> usize {
        let lo = self.read_word(address) as usize;
        let hi = self.read_byte(address + 2) as usize;
        (hi << 16) | lo
    }

    /// Size of the ROM, as indicated by the header.
    pub fn size(&self) -> usize {
        0x400 << self.read_byte(header::SIZE)
    }

    /// Size of the ROM, as measured by the size of the image.
    pub fn actual_size(&self) -> usize {
        self.data.len()
    }

    pub fn title(&self) -> String {
        let mut title = String::new();
        for i in 0..header::TITLE_LEN {
            match self.read_byte(header::TITLE + i) {
                0x00 => break,
                c => title.push(char::from(c)),
            }
        }
        title
    }

    /// The RESET vector (the engine's first entry point).
    pub fn reset_vector(&self) -> usize {
        self.read_word(header::RESET) as usize
    }

    /// The NMI vector (the engine's second entry point).
    pub fn nmi_vector(&self) -> usize {
        self.read_word(header::NMI) as usize
    }

    pub fn is_ram(address: usize) -> bool {
        (address <= 0x001FFF) || (0x7E0000..=0x7FFFFF).contains(&address)
    }

    /// Translate an address from SNES address space to a file offset.
    pub fn translate(&self, address: usize) -> usize {
        match self.rom_type {
            ROMType::LoROM => ((address & 0x7F0000) >> 1) | (address & 0x7FFF),
            ROMType::HiROM => address & 0x3FFFFF,
            ROMType::ExLoROM => {
                if address & 0x800000 != 0 {
                    ((address & 0x7F0000) >> 1) | (address & 0x7FFF)
                } else {
                    ((address & 0x7F0000) >> 1) | ((address & 0x7FFF) + 0x400000)
                }
            }
            ROMType::ExHiROM => {
                if (address & 0xC00000) != 0xC00000 {
                    (address & 0x3FFFFF) | 0x400000
                } else {
                    address & 0x3FFFFF
                }
            }
            ROMType::Unknown => unreachable!("ROM is classified before use"),
        }
    }

    fn discover_type(&self) -> ROMType {
        if self.data.len() <= 0x8000 {
            return ROMType::LoROM;
        }
        let lorom = self.type_score(ROMType::LoROM);
        let hirom = self.type_score(ROMType::HiROM);
        if hirom > lorom {
            ROMType::HiROM
        } else {
            ROMType::LoROM
        }
    }

    fn discover_subtype(&self) -> ROMType {
        let markup = self.read_byte(header::MARKUP);
        match self.rom_type {
            ROMType::LoROM if markup & 0b010 != 0 => ROMType::ExLoROM,
            ROMType::HiROM if markup & 0b100 != 0 => ROMType::ExHiROM,
            _ => self.rom_type,
        }
    }

    /// Score how plausible `rom_type` is, by how clean the title bytes look
    /// under that mapping's header location.
    fn type_score(&self, rom_type: ROMType) -> u8 {
        let title = match rom_type {
            ROMType::LoROM => header::TITLE - 0x8000,
            ROMType::HiROM => header::TITLE,
            _ => unreachable!("only LoROM/HiROM are scored"),
        };

        let mut score = 0;
        for i in 0..header::TITLE_LEN {
            let c = self.data[title + i];
            if c == 0x00 {
                score += 1;
            } else if c.is_ascii_graphic() || c.is_ascii_whitespace() {
                score += 2;
            } else {
                return 0;
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal synthetic LoROM or HiROM image with a `TEST` title,
    /// reset vector at `$8000`, and NMI vector at `$0000`.
    fn synthetic_rom(hirom: bool) -> ROM {
        let size = if hirom { 0x10000 } else { 0x8000 };
        let mut data = vec![0u8; size];

        let title_offset = if hirom { header::TITLE } else { header::TITLE - 0x8000 };
        data[title_offset..title_offset + 4].copy_from_slice(b"TEST");

        let type_offset = if hirom { header::TYPE } else { header::TYPE - 0x8000 };
        data[type_offset] = if hirom { 0x21 } else { 0x20 };

        let size_offset = if hirom { header::SIZE } else { header::SIZE - 0x8000 };
        data[size_offset] = 1; // 0x400 << 1 == 2048

        let reset_offset = if hirom { header::RESET } else { header::RESET - 0x8000 };
        data[reset_offset] = 0x00;
        data[reset_offset + 1] = 0x80;

        let nmi_offset = if hirom { header::NMI } else { header::NMI - 0x8000 };
        data[nmi_offset] = 0x00;
        data[nmi_offset + 1] = 0x00;

        ROM::from_bytes("synthetic".to_owned(), data).unwrap()
    }

    #[test]
    fn test_is_ram() {
        assert!(ROM::is_ram(0x000000));
        assert!(ROM::is_ram(0x001FFF));
        assert!(ROM::is_ram(0x7E0000));
        assert!(ROM::is_ram(0x7FFFFF));
        assert!(!ROM::is_ram(0x002000));
        assert!(!ROM::is_ram(0x800000));
        assert!(!ROM::is_ram(0xC00000));
    }

    #[test]
    fn test_discover_type() {
        assert_eq!(synthetic_rom(false).rom_type(), ROMType::LoROM);
        assert_eq!(synthetic_rom(true).rom_type(), ROMType::HiROM);
    }

    #[test]
    fn test_title() {
        assert_eq!(synthetic_rom(false).title(), "TEST");
        assert_eq!(synthetic_rom(true).title(), "TEST");
    }

    #[test]
    fn test_translate() {
        let lorom = synthetic_rom(false);
        assert_eq!(lorom.translate(0x008000), 0x000000);
        assert_eq!(lorom.translate(0x808000), 0x000000);

        let hirom = synthetic_rom(true);
        assert_eq!(hirom.translate(0xC00000), 0x000000);
        assert_eq!(hirom.translate(0xC08000), 0x008000);
        assert_eq!(hirom.translate(0x400000), 0x000000);
    }

    #[test]
    fn test_reset_and_nmi_vectors() {
        let lorom = synthetic_rom(false);
        assert_eq!(lorom.reset_vector(), 0x8000);
        assert_eq!(lorom.nmi_vector(), 0x0000);
    }

    #[test]
    fn test_truncated_image_is_rejected() {
        let err = ROM::from_bytes("short".to_owned(), vec![0u8; 16]);
        assert!(err.is_err());
    }
}

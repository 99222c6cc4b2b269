use super::Color;
use crate::settings::Settings;

/// Name used when a settings snapshot names an unknown palette.
const FALLBACK: &str = "defaultBlue";
/// Palette used when colour mode is switched off.
const MONOCHROME: &str = "longGrey";

/// Gradient endpoints plus highlight colours.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub accents: Vec<Color>,
}

impl Palette {
    pub fn new(primary: Color, secondary: Color, accents: Vec<Color>) -> Self {
        Self {
            primary,
            secondary,
            accents,
        }
    }

    fn hex(primary: u32, secondary: u32, accents: &[u32]) -> Self {
        Self::new(
            Color::from_hex(primary),
            Color::from_hex(secondary),
            accents.iter().map(|&hex| Color::from_hex(hex)).collect(),
        )
    }

    /// Primary and secondary swapped.
    pub fn reversed(&self) -> Self {
        Self::new(self.secondary, self.primary, self.accents.clone())
    }

    /// Colour of the selected node.
    pub fn accent(&self) -> Color {
        self.accents.first().copied().unwrap_or(self.secondary)
    }
}

/// Immutable table of named palettes, built once and shared by reference.
#[derive(Clone, Debug)]
pub struct PaletteTable {
    entries: Vec<(&'static str, Palette)>,
}

impl PaletteTable {
    pub fn builtin() -> Self {
        let entries = vec![
            ("defaultBlue", Palette::hex(0x0D47A1, 0x90CAF9, &[0xFF6F00])),
            ("redBlue", Palette::hex(0xC62828, 0x1565C0, &[0xFDD835])),
            ("greyScale", Palette::hex(0x212121, 0xE0E0E0, &[0xD32F2F])),
            (
                "vaporWave",
                Palette::hex(0xFF71CE, 0x01CDFE, &[0x05FFA1, 0xB967FF, 0xFFFB96]),
            ),
            ("malachite", Palette::hex(0x0B6623, 0x9CE0A8, &[0xF9A825])),
            ("candy", Palette::hex(0xFF5EAE, 0x8AE1FC, &[0xFFE66D])),
            ("goldenBlue", Palette::hex(0xF9A825, 0x0D47A1, &[0xE53935])),
            ("neon", Palette::hex(0x39FF14, 0xFF073A, &[0x00FFFF])),
            ("purpleOrange", Palette::hex(0x6A1B9A, 0xFF9800, &[0x00E676])),
            ("longRed", Palette::hex(0x3E0000, 0xFFCDD2, &[0x2962FF])),
            ("longGreen", Palette::hex(0x002B00, 0xC8E6C9, &[0xD500F9])),
            ("longBlue", Palette::hex(0x001040, 0xBBDEFB, &[0xFF6D00])),
            ("longGrey", Palette::hex(0x101010, 0xF0F0F0, &[0xFF1744])),
        ];
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<&Palette> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, palette)| palette)
    }

    /// Palette named by `name`, falling back to the default blue palette.
    pub fn get_or_default(&self, name: &str) -> &Palette {
        self.get(name)
            .or_else(|| self.get(FALLBACK))
            .unwrap_or(&self.entries[0].1)
    }

    /// The palette a settings snapshot selects, before any reversal.
    pub fn for_settings(&self, settings: &Settings) -> &Palette {
        if settings.color_mode {
            self.get_or_default(&settings.palette)
        } else {
            self.get_or_default(MONOCHROME)
        }
    }
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        let table = PaletteTable::builtin();
        assert_eq!(table.names().count(), 13);
        for name in table.names() {
            assert!(table.get(name).is_some());
        }
    }

    #[test]
    fn test_unknown_name_falls_back() {
        let table = PaletteTable::builtin();
        assert_eq!(
            table.get_or_default("doesNotExist"),
            table.get("defaultBlue").unwrap()
        );
    }

    #[test]
    fn test_color_mode_off_uses_grey() {
        let table = PaletteTable::builtin();
        let settings = Settings {
            color_mode: false,
            ..Settings::default().palette("neon")
        };
        assert_eq!(table.for_settings(&settings), table.get("longGrey").unwrap());
    }

    #[test]
    fn test_reversed_swaps_endpoints() {
        let palette = PaletteTable::builtin().get("redBlue").unwrap().clone();
        let reversed = palette.reversed();
        assert_eq!(reversed.primary, palette.secondary);
        assert_eq!(reversed.secondary, palette.primary);
        assert_eq!(reversed.accents, palette.accents);
    }
}

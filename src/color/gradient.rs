use super::{Color, Palette, PaletteTable};
use crate::settings::{GradientMapType, GradientType, Settings};
use crate::tree::Tree;

/// Depth-indexed colour lookup covering `[0, max_depth]`.
///
/// Depths below the gradient's start depth share the start colour.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorTable {
    colors: Vec<Color>,
    start_depth: u32,
    accent: Color,
}

impl ColorTable {
    /// Build the table over `[start_depth, max_depth]`.
    ///
    /// `reverse` swaps primary and secondary before interpolating;
    /// `invert_hsv` takes the long way round the hue circle in
    /// [`GradientType::Hsv`] mode and never changes the endpoints.
    pub fn build(
        max_depth: u32,
        start_depth: u32,
        gradient_type: GradientType,
        invert_hsv: bool,
        reverse: bool,
        palette: &Palette,
    ) -> Self {
        let palette = if reverse {
            palette.reversed()
        } else {
            palette.clone()
        };
        let start_depth = start_depth.min(max_depth);
        let span = (max_depth - start_depth) as f32;

        let colors = (0..=max_depth)
            .map(|depth| {
                let t = if span == 0.0 || depth <= start_depth {
                    0.0
                } else {
                    (depth - start_depth) as f32 / span
                };
                interpolate(
                    palette.primary,
                    palette.secondary,
                    t,
                    gradient_type,
                    invert_hsv,
                )
            })
            .collect();

        Self {
            colors,
            start_depth,
            accent: palette.accent(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn start_depth(&self) -> u32 {
        self.start_depth
    }

    /// O(1) lookup; depths past the end clamp to the last entry.
    pub fn color(&self, depth: u32) -> Color {
        let index = (depth as usize).min(self.colors.len().saturating_sub(1));
        self.colors.get(index).copied().unwrap_or_default()
    }

    /// Colour for a node, honouring the selection highlight.
    pub fn node_color(&self, depth: u32, selected: bool) -> Color {
        if selected {
            self.accent
        } else {
            self.color(depth)
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

fn interpolate(from: Color, to: Color, t: f32, gradient_type: GradientType, invert: bool) -> Color {
    if t <= 0.0 {
        return from;
    }
    if t >= 1.0 {
        return to;
    }
    match gradient_type {
        GradientType::RgbLinear => from.lerp(to, t),
        GradientType::Hsv => {
            let (h1, s1, v1) = from.to_hsv();
            let (h2, s2, v2) = to.to_hsv();
            let mut dh = h2 - h1;
            if dh > 180.0 {
                dh -= 360.0;
            } else if dh < -180.0 {
                dh += 360.0;
            }
            if invert {
                dh = if dh >= 0.0 { dh - 360.0 } else { dh + 360.0 };
            }
            Color::from_hsv(
                h1 + dh * t,
                s1 + (s2 - s1) * t,
                v1 + (v2 - v1) * t,
                from.a + (to.a - from.a) * t,
            )
        }
    }
}

/// Cache key for the memoized table.
#[derive(Clone, Debug, PartialEq)]
struct TableKey {
    palette: Palette,
    max_depth: u32,
    start_depth: u32,
    gradient_type: GradientType,
    invert_hsv: bool,
    reverse: bool,
}

/// Memoizes the colour table, rebuilding only when its inputs change.
#[derive(Debug, Default)]
pub struct GradientEngine {
    key: Option<TableKey>,
    table: ColorTable,
}

impl GradientEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the table up to date for `tree` and `settings`. Returns true
    /// when the table was rebuilt.
    pub fn update(&mut self, tree: &Tree, settings: &Settings, palettes: &PaletteTable) -> bool {
        let start_depth = match settings.gradient_map_type {
            GradientMapType::Full => 0,
            GradientMapType::SelectionFocused => tree.selected_depth(),
        };
        let key = TableKey {
            palette: palettes.for_settings(settings).clone(),
            max_depth: tree.max_depth(),
            start_depth,
            gradient_type: settings.gradient_type,
            invert_hsv: settings.invert_hsv,
            reverse: settings.reverse_palette,
        };
        if self.key.as_ref() == Some(&key) {
            return false;
        }

        self.table = ColorTable::build(
            key.max_depth,
            key.start_depth,
            key.gradient_type,
            key.invert_hsv,
            key.reverse,
            &key.palette,
        );
        log::debug!(
            "Rebuilt colour table over depths {}..={}",
            key.start_depth,
            key.max_depth
        );
        self.key = Some(key);
        true
    }

    pub fn table(&self) -> &ColorTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{sample_tree, NodeId};

    fn palette() -> Palette {
        Palette::new(
            Color::from_hex(0xFF0000),
            Color::from_hex(0x0000FF),
            vec![Color::from_hex(0x00FF00)],
        )
    }

    #[test]
    fn test_table_covers_all_depths() {
        let table = ColorTable::build(4, 0, GradientType::RgbLinear, false, false, &palette());
        assert_eq!(table.len(), 5);
        assert_eq!(table.color(0), palette().primary);
        assert_eq!(table.color(4), palette().secondary);
        assert_eq!(table.color(2), palette().primary.lerp(palette().secondary, 0.5));
        assert_eq!(table.color(40), palette().secondary);
    }

    #[test]
    fn test_selection_recentres_gradient() {
        let table = ColorTable::build(4, 2, GradientType::RgbLinear, false, false, &palette());
        assert_eq!(table.len(), 5);
        assert_eq!(table.color(0), palette().primary);
        assert_eq!(table.color(2), palette().primary);
        assert_eq!(table.color(3), palette().primary.lerp(palette().secondary, 0.5));
        assert_eq!(table.color(4), palette().secondary);
    }

    #[test]
    fn test_single_depth_uses_primary() {
        let table = ColorTable::build(0, 0, GradientType::Hsv, true, false, &palette());
        assert_eq!(table.colors(), &[palette().primary]);
    }

    #[test]
    fn test_reverse_equals_swapped_palette() {
        for gradient_type in [GradientType::RgbLinear, GradientType::Hsv] {
            for invert in [false, true] {
                let reversed = ColorTable::build(6, 1, gradient_type, invert, true, &palette());
                let swapped =
                    ColorTable::build(6, 1, gradient_type, invert, false, &palette().reversed());
                assert_eq!(reversed, swapped);
            }
        }
    }

    #[test]
    fn test_invert_changes_interior_only() {
        let straight = ColorTable::build(4, 0, GradientType::Hsv, false, false, &palette());
        let inverted = ColorTable::build(4, 0, GradientType::Hsv, true, false, &palette());
        assert_eq!(straight.color(0), inverted.color(0));
        assert_eq!(straight.color(4), inverted.color(4));
        assert_ne!(straight.color(2), inverted.color(2));
        // red -> blue the short way passes magenta, the long way passes green
        assert!(straight.color(2).g < 0.01);
        assert!(inverted.color(2).g > 0.9);
    }

    #[test]
    fn test_selected_node_uses_accent() {
        let table = ColorTable::build(3, 0, GradientType::RgbLinear, false, false, &palette());
        assert_eq!(table.node_color(1, true), Color::from_hex(0x00FF00));
        assert_eq!(table.node_color(1, false), table.color(1));
    }

    #[test]
    fn test_engine_memoizes() {
        let palettes = PaletteTable::builtin();
        let mut tree = sample_tree();
        let mut engine = GradientEngine::new();
        let settings = Settings::default();

        assert!(engine.update(&tree, &settings, &palettes));
        assert!(!engine.update(&tree, &settings, &palettes));

        tree.select(NodeId::from_index(6));
        assert!(engine.update(&tree, &settings, &palettes));
        assert_eq!(engine.table().start_depth(), 2);

        let settings = settings.gradient_type(GradientType::Hsv);
        assert!(engine.update(&tree, &settings, &palettes));
        let settings = settings.reverse_palette(true);
        assert!(engine.update(&tree, &settings, &palettes));
        assert!(!engine.update(&tree, &settings.clone().grid(true), &palettes));
    }

    #[test]
    fn test_full_map_ignores_selection() {
        let palettes = PaletteTable::builtin();
        let mut tree = sample_tree();
        tree.select(NodeId::from_index(6));
        let mut engine = GradientEngine::new();
        let settings = Settings {
            gradient_map_type: GradientMapType::Full,
            ..Settings::default()
        };
        engine.update(&tree, &settings, &palettes);
        assert_eq!(engine.table().start_depth(), 0);
    }
}

//! Immutable settings snapshot copied across the worker boundary.

/// How the gradient's depth range is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientMapType {
    /// Always span `[0, max_depth]`.
    Full,
    /// Span `[selected_depth, max_depth]` while a node is selected.
    #[default]
    SelectionFocused,
}

/// Colour space the gradient is interpolated in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GradientType {
    #[default]
    RgbLinear,
    Hsv,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Name of an entry in the palette table, e.g. `"defaultBlue"`
    pub palette: String,
    /// When false the grey palette is used regardless of `palette`
    pub color_mode: bool,
    pub gradient_map_type: GradientMapType,
    pub gradient_type: GradientType,
    pub invert_hsv: bool,
    pub reverse_palette: bool,
    pub dark_mode: bool,
    pub grid: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            palette: "defaultBlue".to_string(),
            color_mode: true,
            gradient_map_type: GradientMapType::default(),
            gradient_type: GradientType::default(),
            invert_hsv: false,
            reverse_palette: false,
            dark_mode: false,
            grid: false,
        }
    }
}

impl Settings {
    pub fn palette(mut self, name: impl Into<String>) -> Self {
        self.palette = name.into();
        self
    }

    pub fn gradient_type(mut self, gradient_type: GradientType) -> Self {
        self.gradient_type = gradient_type;
        self
    }

    pub fn invert_hsv(mut self, invert: bool) -> Self {
        self.invert_hsv = invert;
        self
    }

    pub fn reverse_palette(mut self, reverse: bool) -> Self {
        self.reverse_palette = reverse;
        self
    }

    pub fn dark_mode(mut self, enabled: bool) -> Self {
        self.dark_mode = enabled;
        self
    }

    pub fn grid(mut self, enabled: bool) -> Self {
        self.grid = enabled;
        self
    }

    /// True when switching from `self` to `other` changes the colour table.
    pub fn affects_colors(&self, other: &Settings) -> bool {
        self.palette != other.palette
            || self.color_mode != other.color_mode
            || self.gradient_map_type != other.gradient_map_type
            || self.gradient_type != other.gradient_type
            || self.invert_hsv != other.invert_hsv
            || self.reverse_palette != other.reverse_palette
    }
}

use serde::Serialize;

/// Diagram scale tracked in tenths so clamping and stepping stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(5);
    pub const MAX: ZoomLevel = ZoomLevel(30);
    pub const DEFAULT: ZoomLevel = ZoomLevel(10);
    const STEP: u8 = 1;

    /// Clamp an arbitrary number of tenths into the supported range.
    pub fn from_tenths(tenths: u8) -> Self {
        ZoomLevel(tenths.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn scale(self) -> f32 {
        f32::from(self.0) / 10.0
    }

    pub fn percent(self) -> u16 {
        u16::from(self.0) * 10
    }

    pub fn apply(self, action: ZoomAction) -> Self {
        match action {
            ZoomAction::In => Self::from_tenths(self.0.saturating_add(Self::STEP)),
            ZoomAction::Out => Self::from_tenths(self.0.saturating_sub(Self::STEP)),
            ZoomAction::Reset => Self::DEFAULT,
        }
    }

    /// Inline style placed on the diagram anchor.
    pub fn css_transform(self) -> String {
        format!(
            "transform: scale({}.{}); transform-origin: top center;",
            self.0 / 10,
            self.0 % 10
        )
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomAction {
    In,
    Out,
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_by_one_tenth() {
        let level = ZoomLevel::default().apply(ZoomAction::In);
        assert_eq!(level.tenths(), 11);
        assert_eq!(level.percent(), 110);
        assert_eq!(level.apply(ZoomAction::Out), ZoomLevel::DEFAULT);
    }

    #[test]
    fn clamps_to_bounds() {
        let mut level = ZoomLevel::default();
        for _ in 0..50 {
            level = level.apply(ZoomAction::In);
        }
        assert_eq!(level, ZoomLevel::MAX);
        assert!((level.scale() - 3.0).abs() < f32::EPSILON);

        for _ in 0..50 {
            level = level.apply(ZoomAction::Out);
        }
        assert_eq!(level, ZoomLevel::MIN);
        assert_eq!(level.percent(), 50);
    }

    #[test]
    fn reset_returns_to_default() {
        let level = ZoomLevel::from_tenths(27).apply(ZoomAction::Reset);
        assert_eq!(level, ZoomLevel::DEFAULT);
    }

    #[test]
    fn css_transform_formats_without_float_noise() {
        assert_eq!(
            ZoomLevel::from_tenths(7).css_transform(),
            "transform: scale(0.7); transform-origin: top center;"
        );
        assert_eq!(ZoomLevel::from_tenths(200), ZoomLevel::MAX);
    }
}

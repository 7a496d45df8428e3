/// How a [`Line`] is laid out in object space.
///
/// Discriminants are part of the C layout of [`Line`].
#[repr(u8)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum LineStyle {
    /// Straight segment centered on the origin along local +Y, never dashed.
    #[default]
    Solid = 0,
    /// Same geometry as `Solid`, broken into dashes of `dash_size`.
    Dashed = 1,
    /// Segment from the origin along local +Y, capped with a triangular head.
    Arrow = 2,
    /// Ring in the local XZ plane; `size` is the diameter.
    Circle = 3,
}

/// A line primitive.
///
/// Layout (`#[repr(C)]`, 28 bytes):
///
///  offset  0  style      u8 (+3 padding)
///  offset  4  color      [f32; 3]   linear RGB, 0..1
///  offset 16  size       f32        length (Solid/Dashed/Arrow) or diameter (Circle)
///  offset 20  thickness  f32
///  offset 24  dash_size  f32        0 = no dashes
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Line {
    pub style: LineStyle,
    pub color: [f32; 3],
    pub size: f32,
    pub thickness: f32,
    pub dash_size: f32,
}

impl Line {
    pub const DEFAULT_THICKNESS: f32 = 0.1;

    #[inline]
    pub const fn solid(length: f32, color: [f32; 3]) -> Self {
        Self {
            style: LineStyle::Solid,
            color,
            size: length,
            thickness: Self::DEFAULT_THICKNESS,
            dash_size: 0.0,
        }
    }

    #[inline]
    pub const fn dashed(length: f32, color: [f32; 3], dash_size: f32) -> Self {
        Self {
            style: LineStyle::Dashed,
            color,
            size: length,
            thickness: Self::DEFAULT_THICKNESS,
            dash_size,
        }
    }

    #[inline]
    pub const fn arrow(length: f32, color: [f32; 3]) -> Self {
        Self {
            style: LineStyle::Arrow,
            color,
            size: length,
            thickness: Self::DEFAULT_THICKNESS,
            dash_size: 0.0,
        }
    }

    #[inline]
    pub const fn circle(diameter: f32, color: [f32; 3]) -> Self {
        Self {
            style: LineStyle::Circle,
            color,
            size: diameter,
            thickness: Self::DEFAULT_THICKNESS,
            dash_size: 0.0,
        }
    }

    #[inline]
    pub const fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    /// Sets the dash length. Has no effect on `Solid` lines.
    #[inline]
    pub const fn with_dash_size(mut self, dash_size: f32) -> Self {
        self.dash_size = dash_size;
        self
    }

    /// Dash length the renderer should use; `0.0` means a continuous stroke.
    #[inline]
    pub fn effective_dash_size(&self) -> f32 {
        match self.style {
            LineStyle::Solid => 0.0,
            _ => self.dash_size.max(0.0),
        }
    }
}

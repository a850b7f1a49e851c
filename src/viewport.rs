//! Surface description handed from the host to the render core.

/// Window size and pixel density, owned by the host and passed explicitly to the
/// core whenever it changes.
///
/// `width` and `height` are in logical pixels. The drawable backbuffer is
/// `round(size × pixel_density)` physical pixels, unless the host reported the
/// physical size itself through [`SurfaceInfo::from_physical`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
    physical: Viewport,
}

impl SurfaceInfo {
    /// Creates a surface description from a logical size.
    pub fn new(width: u32, height: u32, pixel_density: f32) -> Self {
        let scale = |v: u32| (v as f64 * pixel_density as f64).round().max(0.0) as u32;
        Self {
            width,
            height,
            pixel_density,
            physical: Viewport::new(scale(width), scale(height)),
        }
    }

    /// Creates a surface description from the backbuffer size a window reports.
    ///
    /// The screen viewport is exactly `width × height`; the logical size is derived.
    pub fn from_physical(width: u32, height: u32, pixel_density: f32) -> Self {
        let density = if pixel_density > 0.0 {
            pixel_density as f64
        } else {
            1.0
        };
        let unscale = |v: u32| (v as f64 / density).round() as u32;
        Self {
            width: unscale(width),
            height: unscale(height),
            pixel_density,
            physical: Viewport::new(width, height),
        }
    }

    /// Viewport covering the on-screen target in physical pixels.
    pub fn screen_viewport(&self) -> Viewport {
        self.physical
    }
}

/// Rectangle of the current target that rasterization maps normalized device
/// coordinates onto. The origin is always the target's corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamps the viewport to a target of the given size.
    pub fn clamped_to(self, width: u32, height: u32) -> Self {
        Self::new(self.width.min(width), self.height.min(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_viewport_scales_by_density() {
        let surface = SurfaceInfo::new(640, 360, 2.0);
        assert_eq!(surface.screen_viewport(), Viewport::new(1280, 720));
    }

    #[test]
    fn fractional_density_rounds() {
        let surface = SurfaceInfo::new(101, 50, 1.5);
        assert_eq!(surface.screen_viewport(), Viewport::new(152, 75));
    }

    #[test]
    fn physical_size_survives_every_density() {
        for density in [1.0f32, 1.25, 1.5, 1.75, 2.0, 2.25, 3.0] {
            for width in 990..1010 {
                let height = width / 2 + 1;
                let surface = SurfaceInfo::from_physical(width, height, density);
                assert_eq!(
                    surface.screen_viewport(),
                    Viewport::new(width, height),
                    "density {density}, {width}x{height}"
                );
            }
        }
    }

    #[test]
    fn physical_size_derives_the_logical_size() {
        let surface = SurfaceInfo::from_physical(1001, 600, 2.0);
        assert_eq!((surface.width, surface.height), (501, 300));
        assert_eq!(surface.pixel_density, 2.0);
    }
}

//! Float color surfaces, texture sampling and triangle rasterization.

use glam::{Vec2, Vec4, Vec4Swizzles};

use super::shader::VertexOut;
use crate::viewport::Viewport;

/// A 2D grid of RGBA float texels. Row 0 is the bottom row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Surface {
    /// Creates a surface filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    /// Converts tightly packed RGBA8 texels.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> Self {
        let texels = rgba
            .chunks_exact(4)
            .map(|t| Vec4::new(t[0] as f32, t[1] as f32, t[2] as f32, t[3] as f32) / 255.0)
            .collect();
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Texel at column `x` of row `y`, counted from the bottom.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the surface.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        assert!(x < self.width && y < self.height, "texel ({x}, {y}) out of bounds");
        self.texels[self.offset(x, y)]
    }

    pub fn fill(&mut self, color: Vec4) {
        self.texels.fill(color);
    }

    /// Quantizes to RGBA8, bottom row first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.texels
            .iter()
            .flat_map(|t| {
                let t = (t.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
                [t.x as u8, t.y as u8, t.z as u8, t.w as u8]
            })
            .collect()
    }

    /// Bilinear lookup with clamp-to-edge addressing. `uv` is in texture space with
    /// texel centers at `(i + 0.5) / size`.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        if self.texels.is_empty() {
            return Vec4::W;
        }

        let pos = uv * Vec2::new(self.width as f32, self.height as f32) - 0.5;
        let base = pos.floor();
        let frac = pos - base;
        let (x0, y0) = (base.x as i64, base.y as i64);

        let at = |x: i64, y: i64| {
            let x = x.clamp(0, self.width as i64 - 1) as u32;
            let y = y.clamp(0, self.height as i64 - 1) as u32;
            self.texels[self.offset(x, y)]
        };

        let bottom = at(x0, y0).lerp(at(x0 + 1, y0), frac.x);
        let top = at(x0, y0 + 1).lerp(at(x0 + 1, y0 + 1), frac.x);
        bottom.lerp(top, frac.y)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn write(&mut self, x: u32, y: u32, color: Vec4) {
        let offset = self.offset(x, y);
        self.texels[offset] = color.clamp(Vec4::ZERO, Vec4::ONE);
    }
}

/// Textures bound to each unit for the duration of a draw.
#[derive(Debug, Default)]
pub struct Samplers<'a> {
    units: Vec<Option<&'a Surface>>,
}

impl<'a> Samplers<'a> {
    pub fn new(units: Vec<Option<&'a Surface>>) -> Self {
        Self { units }
    }

    /// Samples the texture bound to `unit`. Unbound units read opaque black.
    pub fn sample(&self, unit: usize, uv: Vec2) -> Vec4 {
        match self.units.get(unit).copied().flatten() {
            Some(surface) => surface.sample(uv),
            None => Vec4::W,
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Rasterizes one triangle into `target`.
///
/// Pixels whose center lies inside or on an edge of the triangle are shaded.
/// Varyings are interpolated linearly in window space; the quads this crate draws
/// all have `w = 1`, where that matches perspective-correct interpolation.
/// Fragment colors are clamped to `[0, 1]`.
pub(crate) fn rasterize<F>(target: &mut Surface, viewport: Viewport, triangle: &[VertexOut], mut shade: F)
where
    F: FnMut(Vec4) -> Vec4,
{
    let [a, b, c] = triangle else {
        return;
    };
    if [a, b, c].iter().any(|v| v.position.w == 0.0) {
        return;
    }

    let size = Vec2::new(viewport.width as f32, viewport.height as f32);
    let to_window = |v: &VertexOut| {
        let ndc = v.position.xy() / v.position.w;
        (ndc + 1.0) * 0.5 * size
    };
    let (pa, pb, pc) = (to_window(a), to_window(b), to_window(c));

    let area = edge(pa, pb, pc);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let limit_x = viewport.width.min(target.width) as f32;
    let limit_y = viewport.height.min(target.height) as f32;
    let min = pa.min(pb).min(pc).floor().max(Vec2::ZERO);
    let max = pa
        .max(pb)
        .max(pc)
        .ceil()
        .min(Vec2::new(limit_x, limit_y));

    for y in min.y as u32..max.y as u32 {
        for x in min.x as u32..max.x as u32 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let wa = edge(pb, pc, p) / area;
            let wb = edge(pc, pa, p) / area;
            let wc = edge(pa, pb, p) / area;
            if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                continue;
            }

            let varying = a.varying * wa + b.varying * wb + c.varying * wc;
            target.write(x, y, shade(varying));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, u: f32, v: f32) -> VertexOut {
        VertexOut {
            position: Vec4::new(x, y, 0.0, 1.0),
            varying: Vec4::new(u, v, 0.0, 0.0),
        }
    }

    #[test]
    fn sampling_at_texel_centers_is_exact() {
        let rgba: Vec<u8> = (0..4u8).flat_map(|i| [i * 60, 0, 0, 255]).collect();
        let surface = Surface::from_rgba8(2, 2, &rgba);

        let texel = surface.sample(Vec2::new(0.75, 0.25));
        assert!((texel.x - 60.0 / 255.0).abs() < 1e-6);
        let texel = surface.sample(Vec2::new(0.25, 0.75));
        assert!((texel.x - 120.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn sampling_clamps_to_the_edge() {
        let rgba = [0, 0, 0, 255, 255, 255, 255, 255];
        let surface = Surface::from_rgba8(2, 1, &rgba);

        assert_eq!(surface.sample(Vec2::new(-3.0, 0.5)), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(surface.sample(Vec2::new(7.0, 0.5)), Vec4::ONE);
        let mid = surface.sample(Vec2::new(0.5, 0.5));
        assert!((mid.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn full_screen_quad_covers_every_pixel_once() {
        let quad = [
            vertex(-1.0, -1.0, 0.0, 0.0),
            vertex(1.0, 1.0, 1.0, 1.0),
            vertex(-1.0, 1.0, 0.0, 1.0),
            vertex(-1.0, -1.0, 0.0, 0.0),
            vertex(1.0, -1.0, 1.0, 0.0),
            vertex(1.0, 1.0, 1.0, 1.0),
        ];
        let mut target = Surface::new(4, 3);
        let mut fragments = 0;
        for triangle in quad.chunks_exact(3) {
            rasterize(&mut target, Viewport::new(4, 3), triangle, |varying| {
                fragments += 1;
                varying.with_w(1.0)
            });
        }

        assert!(target.texels().iter().all(|t| t.w == 1.0));
        // Pixels on the shared diagonal may be shaded by both triangles.
        assert!(fragments >= 12);

        let corner = target.texel(0, 0);
        assert!((corner.x - 0.125).abs() < 1e-6);
        assert!((corner.y - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn viewport_limits_coverage() {
        let triangle = [
            vertex(-1.0, -1.0, 0.0, 0.0),
            vertex(3.0, -1.0, 0.0, 0.0),
            vertex(-1.0, 3.0, 0.0, 0.0),
        ];
        let mut target = Surface::new(4, 4);
        rasterize(&mut target, Viewport::new(2, 2), &triangle, |_| Vec4::ONE);

        assert_eq!(target.texel(1, 1), Vec4::ONE);
        assert_eq!(target.texel(2, 0), Vec4::ZERO);
        assert_eq!(target.texel(0, 3), Vec4::ZERO);
    }

    #[test]
    fn colors_are_clamped() {
        let triangle = [
            vertex(-1.0, -1.0, 0.0, 0.0),
            vertex(3.0, -1.0, 0.0, 0.0),
            vertex(-1.0, 3.0, 0.0, 0.0),
        ];
        let mut target = Surface::new(1, 1);
        rasterize(&mut target, Viewport::new(1, 1), &triangle, |_| {
            Vec4::new(2.0, -1.0, 0.5, 1.0)
        });
        assert_eq!(target.texel(0, 0), Vec4::new(1.0, 0.0, 0.5, 1.0));
    }
}

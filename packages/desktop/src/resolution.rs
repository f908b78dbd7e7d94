//! Conversion between the model-visible coordinate space and the sandbox's
//! native display resolution.
//!
//! The sandbox runs at full resolution; frames shown to the model are scaled
//! into a bounded window to keep token cost predictable. The scaled
//! resolution is computed once per session and cached; all point transforms
//! are linear multiplications by the resolution ratio.

use desk_pilot_schema::Point;

pub const MAX_RESOLUTION_WIDTH: u32 = 1024;
pub const MAX_RESOLUTION_HEIGHT: u32 = 768;
pub const MIN_RESOLUTION_WIDTH: u32 = 640;
pub const MIN_RESOLUTION_HEIGHT: u32 = 480;

#[derive(Debug, Clone)]
pub struct ResolutionScaler {
    original: (u32, u32),
    scaled: (u32, u32),
}

impl ResolutionScaler {
    pub fn new(original: (u32, u32)) -> Self {
        let original = (original.0.max(1), original.1.max(1));
        Self {
            original,
            scaled: compute_scaled_resolution(original),
        }
    }

    pub fn original_resolution(&self) -> (u32, u32) {
        self.original
    }

    /// The resolution the model is told it is seeing.
    pub fn scaled_resolution(&self) -> (u32, u32) {
        self.scaled
    }

    pub fn to_scaled_space(&self, point: Point) -> Point {
        Point::new(
            scale_component(point.x, self.original.0, self.scaled.0),
            scale_component(point.y, self.original.1, self.scaled.1),
        )
    }

    pub fn to_original_space(&self, point: Point) -> Point {
        Point::new(
            scale_component(point.x, self.scaled.0, self.original.0),
            scale_component(point.y, self.scaled.1, self.original.1),
        )
    }
}

fn scale_component(value: u32, from: u32, to: u32) -> u32 {
    (value as f64 * to as f64 / from as f64).round() as u32
}

fn compute_scaled_resolution((width, height): (u32, u32)) -> (u32, u32) {
    let scale = 1.0_f64
        .min(MAX_RESOLUTION_WIDTH as f64 / width as f64)
        .min(MAX_RESOLUTION_HEIGHT as f64 / height as f64);

    let mut scaled_w = width as f64 * scale;
    let mut scaled_h = height as f64 * scale;

    // Tiny displays scale up to the minimum bounds instead, keeping the
    // aspect ratio until the per-component clamp below forces otherwise.
    if scaled_w < MIN_RESOLUTION_WIDTH as f64 || scaled_h < MIN_RESOLUTION_HEIGHT as f64 {
        let boost = (MIN_RESOLUTION_WIDTH as f64 / scaled_w)
            .max(MIN_RESOLUTION_HEIGHT as f64 / scaled_h);
        scaled_w *= boost;
        scaled_h *= boost;
    }

    (
        (scaled_w.round() as u32).clamp(MIN_RESOLUTION_WIDTH, MAX_RESOLUTION_WIDTH),
        (scaled_h.round() as u32).clamp(MIN_RESOLUTION_HEIGHT, MAX_RESOLUTION_HEIGHT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_displays_scale_down_within_max_bounds() {
        let scaler = ResolutionScaler::new((3840, 2160));
        let (w, h) = scaler.scaled_resolution();
        assert!(w <= MAX_RESOLUTION_WIDTH, "width {w} over bound");
        assert!(h <= MAX_RESOLUTION_HEIGHT, "height {h} over bound");
        // 16:9 survives the downscale.
        assert_eq!((w, h), (1024, 576));
    }

    #[test]
    fn small_displays_scale_up_to_min_bounds() {
        let scaler = ResolutionScaler::new((320, 240));
        let (w, h) = scaler.scaled_resolution();
        assert!(w >= MIN_RESOLUTION_WIDTH, "width {w} under bound");
        assert!(h >= MIN_RESOLUTION_HEIGHT, "height {h} under bound");
        assert_eq!((w, h), (640, 480));
    }

    #[test]
    fn in_bounds_displays_are_untouched() {
        let scaler = ResolutionScaler::new((1024, 720));
        assert_eq!(scaler.scaled_resolution(), (1024, 720));
        assert_eq!(
            scaler.to_original_space(Point::new(500, 300)),
            Point::new(500, 300)
        );
    }

    #[test]
    fn degenerate_aspect_falls_back_to_component_clamp() {
        let scaler = ResolutionScaler::new((800, 300));
        let (w, h) = scaler.scaled_resolution();
        assert!(h >= MIN_RESOLUTION_HEIGHT);
        assert!(w <= MAX_RESOLUTION_WIDTH);
    }

    #[test]
    fn round_trip_is_stable_within_one_pixel() {
        for original in [(3840, 2160), (1920, 1080), (1024, 768), (320, 240), (2560, 1440)] {
            let scaler = ResolutionScaler::new(original);
            let (sw, sh) = scaler.scaled_resolution();
            for x in (0..sw).step_by(37) {
                for y in (0..sh).step_by(29) {
                    let point = Point::new(x, y);
                    let back = scaler.to_scaled_space(scaler.to_original_space(point));
                    assert!(
                        back.x.abs_diff(point.x) <= 1 && back.y.abs_diff(point.y) <= 1,
                        "{original:?}: {point:?} round-tripped to {back:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn transforms_map_corner_to_corner() {
        let scaler = ResolutionScaler::new((2048, 1536));
        assert_eq!(scaler.scaled_resolution(), (1024, 768));
        assert_eq!(
            scaler.to_original_space(Point::new(1024, 768)),
            Point::new(2048, 1536)
        );
        assert_eq!(
            scaler.to_scaled_space(Point::new(2048, 1536)),
            Point::new(1024, 768)
        );
    }
}

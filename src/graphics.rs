use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{put_text, FONT_HERSHEY_SIMPLEX, LINE_8};
use opencv::objdetect::{draw_detected_corners_charuco, draw_detected_markers};

use crate::calibration::Observation;

// Fonts and color settings
const TEXT_COLOR: Rgb = Rgb { r: 255, g: 0, b: 0 };
const MARKER_COLOR: Rgb = Rgb { r: 0, g: 255, b: 0 };
const CORNER_COLOR: Rgb = Rgb { r: 255, g: 0, b: 0 };
const TEXT_SCALE: f64 = 1.0;
const TEXT_THICKNESS: i32 = 2;

struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    fn scalar(&self) -> Scalar {
        // OpenCV expects BGR channel order
        Scalar::new(self.b as f64, self.g as f64, self.r as f64, 0.0)
    }
}

pub fn write_text(image: &mut Mat, text: &str, origin: Point) -> opencv::Result<()> {
    put_text(
        image,
        text,
        origin,
        FONT_HERSHEY_SIMPLEX,
        TEXT_SCALE,
        TEXT_COLOR.scalar(),
        TEXT_THICKNESS,
        LINE_8,
        false,
    )
}

/// Overlays the detected markers and interpolated Charuco corners on the
/// display buffer.
pub fn draw_observation(frame: &mut Mat, observation: &Observation) -> opencv::Result<()> {
    draw_detected_markers(
        frame,
        &observation.marker_corners,
        &observation.marker_ids,
        MARKER_COLOR.scalar(),
    )?;
    if !observation.charuco_corners.is_empty() {
        draw_detected_corners_charuco(
            frame,
            &observation.charuco_corners,
            &observation.charuco_ids,
            CORNER_COLOR.scalar(),
        )?;
    }
    Ok(())
}

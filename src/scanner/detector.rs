use serde::Serialize;

use super::frame_source::Frame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A decoded code and the outline it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedCode {
    pub text: String,
    pub polygon: Vec<Point>,
}

impl DetectedCode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            polygon: Vec::new(),
        }
    }
}

pub trait CodeDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Vec<DetectedCode>;
}

/// QR detector backed by `rqrr`. Grids that fail to decode are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDetector;

impl CodeDetector for QrDetector {
    fn detect(&self, frame: &Frame) -> Vec<DetectedCode> {
        let image = &frame.image;
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            image.width() as usize,
            image.height() as usize,
            |x, y| image.get_pixel(x as u32, y as u32)[0],
        );

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, text)) if !text.is_empty() => Some(DetectedCode {
                    text,
                    polygon: grid
                        .bounds
                        .iter()
                        .map(|p| Point { x: p.x, y: p.y })
                        .collect(),
                }),
                Ok(_) => None,
                Err(err) => {
                    log_debug!("QR grid found but not decodable: {err}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    #[test]
    fn blank_frame_has_no_codes() {
        let frame = Frame::new(GrayImage::from_pixel(64, 48, Luma([255])));
        assert!(QrDetector.detect(&frame).is_empty());
    }

    #[test]
    fn checkerboard_noise_has_no_codes() {
        let frame = Frame::new(GrayImage::from_fn(64, 64, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        }));
        assert!(QrDetector.detect(&frame).is_empty());
    }

    /// Renders `text` as a QR code, 8 px per module with a 4-module quiet zone.
    fn render_qr(text: &str) -> GrayImage {
        let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let scale = 8;
        let quiet = 4;
        let side = (modules + 2 * quiet) * scale;
        GrayImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / scale, y / scale);
            let inside = (quiet..quiet + modules).contains(&mx)
                && (quiet..quiet + modules).contains(&my);
            if inside
                && code[((mx - quiet) as usize, (my - quiet) as usize)] == qrcode::Color::Dark
            {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn decodes_rendered_code_with_outline() {
        let frame = Frame::new(render_qr("S123"));

        let codes = QrDetector.detect(&frame);

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].text, "S123");
        assert_eq!(codes[0].polygon.len(), 4);
        let side = frame.image.width() as i32;
        assert!(codes[0]
            .polygon
            .iter()
            .all(|p| (0..=side).contains(&p.x) && (0..=side).contains(&p.y)));
    }
}

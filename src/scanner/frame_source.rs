use anyhow::{anyhow, bail, Context, Result};
use image::{GrayImage, ImageFormat};

/// One captured camera frame, reduced to luma for code detection.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: GrayImage,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A camera or any other producer of frames.
///
/// `Ok(None)` means the source has nothing more to give; the scanner treats
/// it like a read error and stops.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Releases the device. Called exactly once by the scanner.
    fn close(&mut self);
}

/// Converts a raw capture buffer in the given FourCC layout into a frame.
pub fn decode_frame(fourcc: &str, data: &[u8], width: u32, height: u32) -> Result<Frame> {
    let pixels = (width as usize) * (height as usize);
    let image = match fourcc {
        "MJPG" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .context("failed to decode MJPG frame")?
            .to_luma8(),
        // [Y0, U, Y1, V]: every even byte is luma.
        "YUYV" => {
            if data.len() < pixels * 2 {
                bail!(
                    "YUYV frame too short: {} bytes for {width}x{height}",
                    data.len()
                );
            }
            let luma: Vec<u8> = data.iter().step_by(2).take(pixels).copied().collect();
            GrayImage::from_raw(width, height, luma)
                .ok_or_else(|| anyhow!("YUYV luma plane does not fit {width}x{height}"))?
        }
        "GREY" => {
            if data.len() < pixels {
                bail!(
                    "GREY frame too short: {} bytes for {width}x{height}",
                    data.len()
                );
            }
            GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .ok_or_else(|| anyhow!("GREY frame does not fit {width}x{height}"))?
        }
        other => bail!("camera format {other} is not supported"),
    };
    Ok(Frame::new(image))
}

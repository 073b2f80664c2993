use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::settings::CameraSettings;

use super::frame_source::{decode_frame, Frame, FrameSource};

const BUFFER_COUNT: u32 = 4;

/// V4L2 camera streaming over memory-mapped buffers.
pub struct V4l2Camera {
    device_path: String,
    stream: Option<Stream<'static>>,
    fourcc: String,
    width: u32,
    height: u32,
}

impl V4l2Camera {
    /// Opens the device and negotiates format, size and frame rate. The driver
    /// may pick the closest mode it supports; the actual one is logged.
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        let dev = Device::with_path(&settings.device)
            .with_context(|| format!("Could not open camera {}", settings.device))?;

        let b = settings.fourcc.as_bytes();
        if b.len() != 4 {
            bail!("FourCC must be 4 characters, got '{}'", settings.fourcc);
        }

        let mut fmt = dev.format().context("failed to read camera format")?;
        fmt.fourcc = FourCC::new(&[b[0], b[1], b[2], b[3]]);
        fmt.width = settings.width;
        fmt.height = settings.height;
        let actual = dev
            .set_format(&fmt)
            .context("failed to set camera format")?;

        let mut params = dev.params().context("failed to read camera parameters")?;
        params.interval.numerator = 1;
        params.interval.denominator = settings.fps;
        if let Err(err) = dev.set_params(&params) {
            warn!("Camera refused {} FPS: {err}", settings.fps);
        }

        let fourcc = actual
            .fourcc
            .str()
            .map_err(|_| anyhow!("camera reported an invalid FourCC"))?
            .to_string();

        // The mmap stream borrows the device for as long as it lives; the
        // scanner opens one camera per process.
        let dev: &'static Device = Box::leak(Box::new(dev));
        let stream = Stream::with_buffers(dev, Type::VideoCapture, BUFFER_COUNT)
            .context("failed to start camera stream")?;

        info!(
            "Camera {} opened: {}x{} [{}] at {} FPS",
            settings.device, actual.width, actual.height, fourcc, settings.fps
        );

        Ok(Self {
            device_path: settings.device.clone(),
            stream: Some(stream),
            fourcc,
            width: actual.width,
            height: actual.height,
        })
    }
}

impl FrameSource for V4l2Camera {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let (data, _meta) = stream.next().context("Could not grab frame")?;
        decode_frame(&self.fourcc, data, self.width, self.height).map(Some)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Camera {} released", self.device_path);
        }
    }
}

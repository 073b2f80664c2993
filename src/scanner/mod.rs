#[cfg(target_os = "linux")]
mod camera;
mod controller;
mod cooldown;
mod detector;
mod frame_source;
mod loop_worker;

#[cfg(target_os = "linux")]
pub use camera::V4l2Camera;
pub use controller::ScannerController;
pub use cooldown::{CooldownGate, DEFAULT_COOLDOWN};
pub use detector::{CodeDetector, DetectedCode, Point, QrDetector};
pub use frame_source::{decode_frame, Frame, FrameSource};
pub use loop_worker::{ScanLoop, ScanReport, StopReason};

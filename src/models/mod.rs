pub mod frame;
pub mod location;
pub mod style;

pub use frame::{
    AspectRatio, CaptureSessionConfig, FrameLedger, FrameReleaseGuard, RawCapturedImage, Rotation,
};
pub use location::{LocationSample, Place, PositionFix, SettingsResolution};
pub use style::OverlayStyle;

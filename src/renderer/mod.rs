//! Canvas rendering
//!
//! Backend-agnostic: the pipeline draws through `DrawSurface`, implemented by
//! the browser canvas in `platform::web` and by `RecordingSurface` elsewhere.

pub mod frame;
pub mod frames;
pub mod labels;
pub mod surface;

pub use frame::{FrameRenderer, FrameStats, RenderOptions};
pub use frames::{Frame, FrameAtlas, FrameSet, VariantState, build_frame_set};
pub use labels::{LabelCandidate, LabelLayer, LabelRect};
pub use surface::{DrawCall, DrawSurface, RecordedImage, RecordingSurface};

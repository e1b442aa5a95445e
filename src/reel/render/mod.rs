pub mod ffmpeg;
pub mod normalize;
pub mod output;
pub mod reconcile;
pub mod timeline;

pub use ffmpeg::{FfmpegCompiler, MediaProbe, SystemTranscoder, TranscodeJob, Transcoder};
pub use normalize::Normalizer;
pub use reconcile::{Reconciled, Reconciler};
pub use timeline::{Timeline, TimelineEntry};

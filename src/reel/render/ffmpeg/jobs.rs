use std::fmt;
use std::path::PathBuf;

/// What a transcoding job is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    ExtractAudio,
    Normalize,
    Concat,
    Trim,
    FitMusic,
    Mux,
}

impl JobKind {
    pub fn label(self) -> &'static str {
        match self {
            JobKind::ExtractAudio => "extracting narration audio",
            JobKind::Normalize => "normalizing media",
            JobKind::Concat => "joining clips",
            JobKind::Trim => "trimming clip",
            JobKind::FitMusic => "fitting background music",
            JobKind::Mux => "rendering final video",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One ffmpeg invocation, fully described by its argument list.
///
/// `inputs` and `output` repeat what is already in `args` so that callers
/// and fakes can reason about the job without parsing arguments.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub kind: JobKind,
    pub args: Vec<String>,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Expected length of the output; enables percentage progress
    pub expected_duration: Option<f64>,
}

impl TranscodeJob {
    pub fn reports_progress(&self) -> bool {
        self.expected_duration.is_some_and(|d| d > 0.0)
    }
}

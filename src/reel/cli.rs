use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::types::{MediaKind, Orientation};

#[derive(Subcommand, Debug, Clone)]
pub enum ReelCommands {
    /// Assemble a video from a script, a narration recording and background music
    Render(RenderArgs),
    /// Show how a script would be segmented, without searching or rendering
    Segment(SegmentArgs),
    /// Check that ffmpeg, ffprobe and the media search key are available
    Check,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the configuration file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
#[group(id = "script_source", required = true, multiple = false)]
pub struct ScriptSource {
    /// Narration script file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub script: Option<PathBuf>,

    /// Narration script given inline
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: ScriptSource,

    /// Recorded narration (audio, or a video whose audio track is used)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub narration: PathBuf,

    /// Background music track
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub music: PathBuf,

    #[arg(long, value_enum, default_value_t = Orientation::Horizontal)]
    pub orientation: Orientation,

    /// Kind of stock media illustrating each segment
    #[arg(long, value_enum, default_value_t = MediaKind::Image)]
    pub media: MediaKind,

    /// Upper bound on the number of segments (at least 2)
    #[arg(long)]
    pub max_segments: Option<usize>,

    /// Output file; defaults to <script name>.mp4 in the configured output directory
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Use the script as written, without translating it for search
    #[arg(long)]
    pub no_translate: bool,

    /// Reconcile segment durations with a tight tolerance
    #[arg(long)]
    pub strict: bool,

    /// Keep intermediate files after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Show ffmpeg output
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub source: ScriptSource,

    /// Total duration to divide, in seconds
    #[arg(long, conflicts_with = "narration")]
    pub duration: Option<f64>,

    /// Narration recording to probe for the total duration
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub narration: Option<PathBuf>,

    /// Upper bound on the number of segments (at least 2)
    #[arg(long)]
    pub max_segments: Option<usize>,
}

use super::util::format_time;
use super::{FfmpegCompiler, FilterChain};

/// Input index of the narration track in the mux job
pub(super) const NARRATION_INPUT: usize = 1;
/// Input index of the fitted background track in the mux job
pub(super) const MUSIC_INPUT: usize = 2;
pub(super) const MIXED_AUDIO_LABEL: &str = "outa";

impl FfmpegCompiler {
    /// Narration boosted, music attenuated and faded out so that the fade
    /// ends at `total_duration`, both mixed into `[outa]`.
    pub(super) fn build_audio_mix_filters(&self, filters: &mut FilterChain, total_duration: f64) {
        let fade = self.settings.music_fade_secs().min(total_duration.max(0.0));
        let fade_start = (total_duration - fade).max(0.0);

        filters.push(format!(
            "[{input}:a]volume={gain:.6}[narration]",
            input = NARRATION_INPUT,
            gain = self.settings.narration_gain(),
        ));
        filters.push(format!(
            "[{input}:a]volume={gain:.6}dB,afade=t=out:st={start}:d={fade}[music]",
            input = MUSIC_INPUT,
            gain = self.settings.music_gain_db(),
            start = format_time(fade_start),
            fade = format_time(fade),
        ));
        filters.push(format!(
            "[narration][music]amix=inputs=2:duration=shortest:normalize=0:dropout_transition=0[{MIXED_AUDIO_LABEL}]"
        ));
    }
}

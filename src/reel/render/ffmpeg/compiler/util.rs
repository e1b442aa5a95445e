use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Quote-safe path for a concat demuxer `file '...'` line
pub fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

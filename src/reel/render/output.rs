use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::reel::error::ReelError;

/// Where the finished video goes.
///
/// An explicit path is used as given: an existing file there is an error
/// unless `force` is set, in which case it is removed first. Without an
/// explicit path the video lands in `output_root` as `<stem>.mp4`, probing
/// `<stem>_1.mp4`, `<stem>_2.mp4`, ... until a free name is found. The name
/// found is reserved with an empty placeholder so concurrent runs never
/// share it; the caller removes the placeholder if the run fails.
pub fn resolve_output_path(
    requested: Option<&Path>,
    output_root: &Path,
    stem: &str,
    force: bool,
) -> Result<PathBuf, ReelError> {
    if let Some(path) = requested {
        if path.exists() {
            if !force {
                return Err(ReelError::OutputExists {
                    path: path.to_path_buf(),
                });
            }
            fs::remove_file(path)?;
        }
        create_parent(path)?;
        return Ok(path.to_path_buf());
    }

    fs::create_dir_all(output_root)?;
    if force {
        let path = output_root.join(format!("{stem}.mp4"));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        return Ok(path);
    }
    Ok(reserve_free_name(output_root, stem)?)
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Claim the first of `<stem>.mp4`, `<stem>_1.mp4`, ... that does not exist yet
fn reserve_free_name(dir: &Path, stem: &str) -> io::Result<PathBuf> {
    let candidates = std::iter::once(dir.join(format!("{stem}.mp4")))
        .chain((1..).map(|n| dir.join(format!("{stem}_{n}.mp4"))));

    for candidate in candidates {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::other(format!(
        "no free output name for {stem} in {}",
        dir.display()
    )))
}

/// File stem for generated outputs: the script's stem, or a timestamp
pub fn output_stem(script: Option<&Path>) -> String {
    script
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| format!("reel-{}", chrono::Local::now().format("%Y%m%d-%H%M%S")))
}

/// Path of the JSON report written next to `output`
pub fn report_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".report.json");
    PathBuf::from(name)
}

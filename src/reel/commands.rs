use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::json;

use super::cli::{ConfigCommands, ReelCommands, RenderArgs, ScriptSource, SegmentArgs};
use super::config::{API_KEY_ENV, ReelConfig, resolve_config_path};
use super::pipeline::{Collaborators, ReelPipeline, RunRequest};
use super::planning::{Plan, Segmenter};
use super::progress::ConsoleSink;
use super::render::{SystemTranscoder, Transcoder};
use super::sourcing::{HttpFetcher, PexelsClient, derive_prompt};
use super::translate::{HttpTranslator, NoopTranslator, Translator};
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::ui::prelude::*;

/// Characters of segment text shown next to each prompt
const EXCERPT_CHARS: usize = 72;

pub async fn handle_reel_command(
    command: ReelCommands,
    config_path: Option<&Path>,
    debug: bool,
) -> Result<()> {
    match command {
        ReelCommands::Render(args) => handle_render(args, config_path, debug).await,
        ReelCommands::Segment(args) => handle_segment(args, config_path).await,
        ReelCommands::Check => handle_check(config_path),
        ReelCommands::Config { command } => handle_config(command, config_path),
    }
}

async fn handle_render(args: RenderArgs, config_path: Option<&Path>, debug: bool) -> Result<()> {
    let config = ReelConfig::load(config_path)?;
    let (script, script_path) = read_script(&args.source)?;

    let api_key = config.api_key().with_context(|| {
        format!("No media search API key configured. Set {API_KEY_ENV} or search.api_key in the config file")
    })?;

    let translate = !args.no_translate && config.translation.enabled;
    let translator: Arc<dyn Translator> = if translate {
        Arc::new(HttpTranslator::new(&config.translation)?)
    } else {
        Arc::new(NoopTranslator)
    };

    let services = Collaborators {
        search: Arc::new(PexelsClient::new(&config.search, api_key)?),
        fetcher: Arc::new(HttpFetcher::new()?),
        transcoder: Arc::new(SystemTranscoder::new(&config.tools, args.verbose || debug)),
        translator,
    };

    let request = RunRequest {
        script,
        script_path,
        narration: args.narration,
        music: args.music,
        orientation: args.orientation,
        media: args.media,
        max_segments: args.max_segments,
        output: args.out_file,
        force: args.force,
        translate,
        strict: args.strict,
        keep_workspace: args.keep_workspace,
    };

    let sink = ConsoleSink::new();
    let pipeline = ReelPipeline::new(&config, services, &sink);
    let output = pipeline.run(&request).await?;

    match get_output_format() {
        OutputFormat::Json => {
            emit(
                Level::Success,
                "reel.render.done",
                &output.summary(),
                serde_json::to_value(&output).ok(),
            );
        }
        OutputFormat::Text => {
            separator();
            emit(Level::Success, "reel.render.done", &output.summary(), None);
            emit(
                Level::Info,
                "reel.render.output",
                &format!("Video written to {}", output.output.display()),
                None,
            );
            if let Some(report) = &output.report_path {
                emit(
                    Level::Info,
                    "reel.render.report",
                    &format!("Run report: {}", report.display()),
                    None,
                );
            }
            if let Some(workspace) = &output.workspace {
                emit(
                    Level::Info,
                    "reel.render.workspace",
                    &format!("Intermediate files kept in {}", workspace.display()),
                    None,
                );
            }
        }
    }

    Ok(())
}

async fn handle_segment(args: SegmentArgs, config_path: Option<&Path>) -> Result<()> {
    let config = ReelConfig::load(config_path)?;
    let (script, _) = read_script(&args.source)?;

    let total = match (args.duration, &args.narration) {
        (Some(duration), _) => {
            if !duration.is_finite() || duration <= 0.0 {
                bail!("--duration must be a positive number of seconds");
            }
            duration
        }
        (None, Some(narration)) => probe_narration(&config, narration).await?,
        (None, None) => bail!("Provide either --duration or --narration"),
    };

    let segmenter = Segmenter::new(
        config.segmentation.effective_max_segments(args.max_segments),
        config.segmentation.min_segment_chars,
    );
    let plan = Plan::build(&script, total, &segmenter);
    if plan.is_empty() {
        bail!("The script contains no text");
    }

    let search = &config.search;
    let prompts: Vec<String> = plan
        .segments
        .iter()
        .map(|s| derive_prompt(&s.text, search.prompt_keywords, &search.prompt_themes, s.index))
        .collect();

    if get_output_format() == OutputFormat::Json {
        let segments: Vec<_> = plan
            .segments
            .iter()
            .zip(&prompts)
            .map(|(segment, prompt)| {
                json!({
                    "index": segment.index,
                    "target_duration": segment.target_duration,
                    "prompt": prompt,
                    "text": segment.text,
                })
            })
            .collect();
        emit(
            Level::Info,
            "reel.segment.plan",
            &format!("{} segment(s)", plan.segments.len()),
            Some(json!({
                "strategy": plan.strategy,
                "total_duration": plan.total_duration,
                "segments": segments,
            })),
        );
        return Ok(());
    }

    emit(
        Level::Info,
        "reel.segment.plan",
        &format!(
            "{} segment(s) over {:.2}s (split by {})",
            plan.segments.len(),
            plan.total_duration,
            plan.strategy
        ),
        None,
    );
    separator();
    for (segment, prompt) in plan.segments.iter().zip(&prompts) {
        println!(
            "[{:>2}] {:>7.2}s  {}",
            segment.index + 1,
            segment.target_duration,
            prompt
        );
        println!("      {}", excerpt(&segment.text, EXCERPT_CHARS));
    }

    Ok(())
}

async fn probe_narration(config: &ReelConfig, narration: &Path) -> Result<f64> {
    if !narration.exists() {
        bail!("Narration file not found at {}", narration.display());
    }
    let transcoder = SystemTranscoder::new(&config.tools, false);
    let probe = transcoder
        .probe(narration)
        .await
        .with_context(|| format!("probing narration {}", narration.display()))?;
    probe.require_duration(narration)
}

fn handle_check(config_path: Option<&Path>) -> Result<()> {
    let config = ReelConfig::load(config_path)?;
    let text_mode = get_output_format() == OutputFormat::Text;
    let spinner = text_mode.then(|| create_spinner("Checking external tools...".to_string()));

    let tools = [("ffmpeg", &config.tools.ffmpeg), ("ffprobe", &config.tools.ffprobe)];
    let found: Vec<(&str, Option<PathBuf>)> = tools
        .iter()
        .map(|(name, path)| (*name, which::which(path).ok()))
        .collect();
    let has_key = config.api_key().is_some();
    let ok = found.iter().all(|(_, path)| path.is_some()) && has_key;

    if let Some(pb) = spinner {
        if ok {
            finish_spinner_with_success(pb, "All requirements found");
        } else {
            pb.finish_and_clear();
        }
    }

    for (name, path) in &found {
        match path {
            Some(path) => emit(
                Level::Info,
                "reel.check.tool",
                &format!("{name}: {}", path.display()),
                Some(json!({ "tool": name, "path": path })),
            ),
            None => emit(
                Level::Error,
                "reel.check.tool_missing",
                &format!("{name} not found on PATH"),
                Some(json!({ "tool": name })),
            ),
        }
    }

    if has_key {
        emit(Level::Info, "reel.check.api_key", "Media search API key configured", None);
    } else {
        emit(
            Level::Error,
            "reel.check.api_key_missing",
            &format!("No media search API key. Set {API_KEY_ENV} or search.api_key"),
            None,
        );
    }

    if !ok {
        bail!("Some requirements are missing");
    }
    Ok(())
}

fn handle_config(command: ConfigCommands, config_path: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(config_path)?;
    match command {
        ConfigCommands::Path => {
            emit(
                Level::Info,
                "reel.config.path",
                &path.display().to_string(),
                Some(json!({ "path": path })),
            );
        }
        ConfigCommands::Show => {
            let config = ReelConfig::load(Some(&path))?;
            match get_output_format() {
                OutputFormat::Json => emit(
                    Level::Info,
                    "reel.config.show",
                    &path.display().to_string(),
                    serde_json::to_value(&config).ok(),
                ),
                OutputFormat::Text => {
                    let toml = toml::to_string_pretty(&config).context("serializing config")?;
                    print!("{toml}");
                }
            }
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file {} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            ReelConfig::default().save_to_path(&path)?;
            emit(
                Level::Success,
                "reel.config.init",
                &format!("Wrote default config to {}", path.display()),
                Some(json!({ "path": path })),
            );
        }
    }
    Ok(())
}

fn read_script(source: &ScriptSource) -> Result<(String, Option<PathBuf>)> {
    match (&source.script, &source.text) {
        (Some(path), _) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            Ok((text, Some(path.clone())))
        }
        (None, Some(text)) => Ok((text.clone(), None)),
        (None, None) => bail!("Provide the script with --script or --text"),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

//! Subcommand implementations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};

use ggui_core::command::{self, format_tokens_pretty, preview as preview_command};
use ggui_core::config::{ConfigManager, ConfigSection};
use ggui_core::models::{
    ContainerFormat, DateRange, ExportOptions, QualityPreset, RepositoryInfo, RunStatus,
    VisualizationConfig,
};
use ggui_core::supervisor::{RunHandle, Supervisor, SupervisorError};
use ggui_core::tools::{self, Tool};
use ggui_core::validation::RepositoryValidator;

use crate::VisualArgs;

/// Export-only command-line options.
pub(crate) struct ExportArgs {
    pub output: PathBuf,
    pub quality: Option<QualityPreset>,
    pub framerate: Option<u32>,
    pub format: Option<ContainerFormat>,
}

pub(crate) fn validate(config: &ConfigManager, path: &Path, json: bool) -> Result<()> {
    let info = RepositoryValidator::from_settings(&config.settings().tools).validate(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Repository: {}", info.name);
    println!("Path:       {}", info.path.display());
    println!("Type:       {}", info.kind);
    if !info.is_valid() {
        println!("No supported version control system detected");
        return Ok(());
    }
    println!("Commits:    {}", info.commit_count);
    println!("Authors:    {}", info.contributor_count());
    if let Some((first, last)) = info.date_range {
        println!("History:    {} .. {}", first, last);
    }
    let languages: Vec<String> = info
        .primary_languages(5)
        .into_iter()
        .map(|(name, share)| format!("{} {:.0}%", name, share * 100.0))
        .collect();
    if !languages.is_empty() {
        println!("Languages:  {}", languages.join(", "));
    }
    if !info.top_extensions.is_empty() {
        println!("Extensions: {}", info.top_extensions.join(", "));
    }
    for warning in &info.warnings {
        println!("Warning:    {}", warning);
    }
    Ok(())
}

pub(crate) fn preview(
    config: &ConfigManager,
    path: &Path,
    visual: &VisualArgs,
    pretty: bool,
) -> Result<()> {
    let vis = apply_overrides(&config.settings().visualization, visual)?;
    let gource = config.settings().tools.gource();

    if pretty {
        let tokens = command::GourceOptionsBuilder::new(&vis, path)
            .executable(gource)
            .build()?;
        print!("{}", format_tokens_pretty(&tokens));
    } else if gource == command::GOURCE_EXECUTABLE {
        println!("{}", preview_command(&vis, path)?);
    } else {
        let tokens = command::GourceOptionsBuilder::new(&vis, path)
            .executable(gource)
            .build()?;
        println!("{}", command::format_tokens(&tokens));
    }
    Ok(())
}

pub(crate) fn run(config: &mut ConfigManager, path: &Path, visual: &VisualArgs) -> Result<()> {
    let info = checked_repository(config, path)?;
    let vis = apply_overrides(&config.settings().visualization, visual)?;

    let args = command::GourceOptionsBuilder::new(&vis, info.path())
        .executable(config.settings().tools.gource())
        .build()?;

    remember(config, &info, vis, None);

    let supervisor = supervisor_for(config);
    let mut handle = supervisor.start(&args).map_err(with_install_hint)?;
    println!("Started gource (pid {})", handle.pid());

    let status = supervise(&supervisor, &mut handle, false)?;
    report(&status)
}

pub(crate) fn export(
    config: &mut ConfigManager,
    path: &Path,
    visual: &VisualArgs,
    export: &ExportArgs,
) -> Result<()> {
    let info = checked_repository(config, path)?;
    let vis = apply_overrides(&config.settings().visualization, visual)?;

    let saved = &config.settings().export;
    let options = ExportOptions {
        framerate: export.framerate.unwrap_or(saved.framerate),
        quality: export.quality.unwrap_or(saved.quality),
        format: export
            .format
            .or_else(|| ContainerFormat::from_path(&export.output))
            .unwrap_or(saved.format),
    };

    let args = command::GourceOptionsBuilder::new(&vis, info.path())
        .executable(config.settings().tools.gource())
        .build()?;

    remember(config, &info, vis, Some((export.output.as_path(), &options)));

    let supervisor = supervisor_for(config);
    let mut handle = supervisor
        .start_with_export(&args, &export.output, &options)
        .map_err(with_install_hint)?;
    println!(
        "Exporting {} to {} ({}, {} fps, {} quality)",
        info.name,
        export.output.display(),
        options.format,
        options.framerate,
        options.quality
    );

    let status = supervise(&supervisor, &mut handle, true)?;
    if status == RunStatus::Completed(0) {
        println!("Video saved to {}", export.output.display());
    }
    report(&status)
}

pub(crate) fn tools(config: &ConfigManager) -> Result<()> {
    let report = tools::check_tools(&config.settings().tools);
    for tool in Tool::ALL {
        match report.location(tool) {
            Some(location) => println!("[ok]      {:<7} {}", tool, location.display()),
            None => println!("[missing] {:<7} {}", tool, tool.purpose()),
        }
    }
    for tool in report.missing() {
        if tool != Tool::Git {
            println!("\n{}", tools::install_instructions(tool));
        }
    }
    Ok(())
}

fn checked_repository(config: &ConfigManager, path: &Path) -> Result<RepositoryInfo> {
    let info = RepositoryValidator::from_settings(&config.settings().tools).validate(path)?;
    if !info.is_valid() {
        bail!(
            "{} is not a supported repository (git, hg, svn, bzr or cvs)",
            info.path.display()
        );
    }
    for warning in &info.warnings {
        eprintln!("Warning: {}", warning);
    }
    Ok(info)
}

fn apply_overrides(saved: &VisualizationConfig, args: &VisualArgs) -> Result<VisualizationConfig> {
    let mut vis = saved.clone();

    if let Some(resolution) = args.resolution {
        vis.resolution = resolution;
    }
    if let Some(seconds) = args.seconds_per_day {
        vis.seconds_per_day = seconds;
    }
    if args.auto_skip_seconds.is_some() {
        vis.auto_skip_seconds = args.auto_skip_seconds;
    }
    vis.fullscreen = toggle(vis.fullscreen, args.fullscreen, args.no_fullscreen);
    vis.multi_sampling = toggle(vis.multi_sampling, args.multi_sampling, args.no_multi_sampling);
    if let Some(background) = args.background {
        vis.background_color = background;
    }
    if let Some(scale) = args.font_scale {
        vis.font_scale = scale;
    }
    for name in &args.hide {
        if !vis.hide.set(name) {
            bail!("unknown element to hide: '{}'", name);
        }
    }
    for name in &args.show {
        if !vis.hide.show(name) {
            bail!("unknown element to show: '{}'", name);
        }
    }
    vis.show_key = toggle(vis.show_key, args.key, args.no_key);
    if args.title.is_some() {
        vis.title = args.title.clone();
    }
    if args.user_image_dir.is_some() {
        vis.user_image_dir = args.user_image_dir.clone();
    }
    if let Some(elasticity) = args.elasticity {
        vis.elasticity = elasticity;
    }
    if let Some(mode) = args.camera_mode {
        vis.camera_mode = mode;
    }
    if args.start_date.is_some() || args.stop_date.is_some() {
        vis.date_range = DateRange::new(
            args.start_date.or(vis.date_range.start),
            args.stop_date.or(vis.date_range.end),
        );
    }
    vis.validate().map_err(|e| anyhow!(e))?;
    Ok(vis)
}

/// Saved value unless a `--flag` or `--no-flag` was given.
fn toggle(saved: bool, on: bool, off: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        saved
    }
}

/// Save the repository and options as last used. Failures only warn.
fn remember(
    config: &mut ConfigManager,
    info: &RepositoryInfo,
    vis: VisualizationConfig,
    export: Option<(&Path, &ExportOptions)>,
) {
    let settings = config.settings_mut();
    settings.paths.add_recent_repository(info.path());
    settings.visualization = vis;

    let mut sections = vec![ConfigSection::Paths, ConfigSection::Visualization];
    if let Some((output, options)) = export {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            settings.paths.last_export_dir = dir.to_string_lossy().to_string();
        }
        settings.export = *options;
        sections.push(ConfigSection::Export);
    }

    for section in sections {
        if let Err(e) = config.update_section(section) {
            tracing::warn!("Failed to save {} settings: {}", section.table_name(), e);
        }
    }
}

fn supervisor_for(config: &ConfigManager) -> Supervisor {
    let settings = config.settings();
    let supervisor = Supervisor::from_settings(&settings.tools, &settings.logging);
    if settings.logging.write_run_logs {
        supervisor.with_logs_dir(config.logs_folder())
    } else {
        supervisor
    }
}

/// Poll until the run ends; Ctrl-C stops it.
fn supervise(supervisor: &Supervisor, handle: &mut RunHandle, show_progress: bool) -> Result<RunStatus> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    let mut last_progress: Option<String> = None;
    loop {
        if interrupted.load(Ordering::SeqCst) {
            eprintln!("\nStopping...");
            return Ok(supervisor.stop(handle));
        }

        let status = supervisor.poll(handle);
        if show_progress {
            let progress = handle.export_progress();
            if progress.is_some() && progress != last_progress {
                eprint!("\rEncoded {}", progress.as_deref().unwrap_or_default());
                let _ = std::io::stderr().flush();
                last_progress = progress;
            }
        }
        if status.is_terminal() {
            if last_progress.is_some() {
                eprintln!();
            }
            return Ok(status);
        }
        thread::sleep(supervisor.poll_interval());
    }
}

fn report(status: &RunStatus) -> Result<()> {
    match status {
        RunStatus::Failed(message) => bail!("run failed: {}", message),
        other => {
            println!("Run {}", other);
            Ok(())
        }
    }
}

/// Append install hints when the launched tool is missing.
fn with_install_hint(err: SupervisorError) -> anyhow::Error {
    let tool = match &err {
        SupervisorError::Launch { tool, .. } if err.is_not_found() => {
            let stem = Path::new(tool)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            Tool::ALL.into_iter().find(|t| t.name() == stem)
        }
        _ => None,
    };
    match tool {
        Some(tool) => anyhow!("{}\n\n{}", err, tools::install_instructions(tool)),
        None => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;
    use ggui_core::models::{CameraMode, Resolution};

    #[test]
    fn overrides_replace_saved_values() {
        let saved = VisualizationConfig {
            title: Some("Saved".into()),
            ..VisualizationConfig::default()
        };
        let args = VisualArgs {
            resolution: Some(Resolution::new(1920, 1080)),
            hide: vec!["usernames".into(), "date".into()],
            camera_mode: Some(CameraMode::Track),
            ..VisualArgs::default()
        };

        let vis = apply_overrides(&saved, &args).unwrap();
        assert_eq!(vis.resolution, Resolution::new(1920, 1080));
        assert_eq!(vis.hide.names(), vec!["usernames", "date"]);
        assert_eq!(vis.camera_mode, CameraMode::Track);
        assert_eq!(vis.title.as_deref(), Some("Saved"));
    }

    #[test]
    fn unknown_hide_element_is_rejected() {
        let args = VisualArgs {
            hide: vec!["everything".into()],
            ..VisualArgs::default()
        };
        assert!(apply_overrides(&VisualizationConfig::default(), &args).is_err());
    }

    #[test]
    fn negating_flags_clear_saved_values() {
        let mut saved = VisualizationConfig {
            fullscreen: true,
            multi_sampling: true,
            show_key: true,
            ..VisualizationConfig::default()
        };
        saved.hide.bloom = true;
        saved.hide.date = true;

        let untouched = apply_overrides(&saved, &VisualArgs::default()).unwrap();
        assert!(untouched.fullscreen && untouched.show_key);

        let args = VisualArgs {
            no_fullscreen: true,
            no_multi_sampling: true,
            no_key: true,
            show: vec!["bloom".into()],
            ..VisualArgs::default()
        };
        let vis = apply_overrides(&saved, &args).unwrap();
        assert!(!vis.fullscreen);
        assert!(!vis.multi_sampling);
        assert!(!vis.show_key);
        assert_eq!(vis.hide.names(), vec!["date"]);
    }

    #[test]
    fn last_of_flag_pair_wins() {
        let cli = Cli::try_parse_from([
            "gource-gui",
            "run",
            "/repo",
            "--fullscreen",
            "--no-fullscreen",
            "--no-key",
            "--key",
        ])
        .unwrap();
        let Commands::Run { visual, .. } = cli.command else {
            panic!("expected run");
        };

        let saved = VisualizationConfig {
            fullscreen: true,
            ..VisualizationConfig::default()
        };
        let vis = apply_overrides(&saved, &visual).unwrap();
        assert!(!vis.fullscreen);
        assert!(vis.show_key);
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        for seconds in [0.0, -3.0, f64::NAN, 0.0004] {
            let args = VisualArgs {
                seconds_per_day: Some(seconds),
                ..VisualArgs::default()
            };
            let err = apply_overrides(&VisualizationConfig::default(), &args).unwrap_err();
            assert!(err.to_string().contains("seconds_per_day"));
        }

        let args = VisualArgs {
            font_scale: Some(0.0),
            ..VisualArgs::default()
        };
        assert!(apply_overrides(&VisualizationConfig::default(), &args).is_err());
    }

    #[test]
    fn single_date_override_keeps_other_bound() {
        let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let saved = VisualizationConfig {
            date_range: DateRange::new(Some(start), None),
            ..VisualizationConfig::default()
        };
        let args = VisualArgs {
            stop_date: Some(end),
            ..VisualArgs::default()
        };

        let vis = apply_overrides(&saved, &args).unwrap();
        assert_eq!(vis.date_range, DateRange::new(Some(start), Some(end)));
    }
}

//! mailslicer - sliced HTML emails from a single campaign graphic
//!
//! CLI entry point

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

use mailslicer::{
    exit_codes,
    // CLI
    AnalyzeArgs, BuildArgs, Cli, Commands,
    // Config
    CliOverrides, Config,
    // Pipeline
    BuildRequest, EmailPipeline, PipelineConfig, PipelineError, ProgressCallback,
    // Rendering
    TemplateSource,
};

#[cfg(feature = "web")]
use mailslicer::{ServeArgs, ServerConfig, WebServer};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => run_build(&args),
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Info => run_info(),
        #[cfg(feature = "web")]
        Commands::Serve(args) => run_serve(&args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<PipelineError>() {
        Some(PipelineError::InputNotFound(_)) => exit_codes::INPUT_NOT_FOUND,
        Some(PipelineError::InvalidCampaignName(_)) => exit_codes::INVALID_ARGS,
        _ => exit_codes::GENERAL_ERROR,
    }
}

/// Route tracing output to stderr at a level picked by -v / -q
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config file: {}", e);
            Config::default()
        })),
    }
}

fn resolve_config(path: Option<&Path>, overrides: &CliOverrides) -> anyhow::Result<PipelineConfig> {
    Ok(load_config(path)?.merge_with_cli(overrides))
}

// ============ Progress Callback Implementation ============

/// Spinner progress for interactive builds
struct SpinnerProgress {
    bar: ProgressBar,
    verbose_level: u8,
}

impl SpinnerProgress {
    fn new(verbose_level: u8, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { bar, verbose_level }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_step_start(&self, step: &str) {
        self.bar.set_message(format!("{}...", step));
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        self.bar.set_message(format!("{}/{}", current, total));
    }

    fn on_step_complete(&self, step: &str, message: &str) {
        if self.verbose_level > 0 {
            self.bar.println(format!("  {}: {}", step, message));
        }
    }

    fn on_debug(&self, message: &str) {
        if self.verbose_level > 1 {
            self.bar.println(format!("    [DEBUG] {}", message));
        }
    }
}

// ============ Build Command ============

fn run_build(args: &BuildArgs) -> anyhow::Result<()> {
    init_logging(args.verbose, args.quiet);

    if !args.image.exists() {
        return Err(PipelineError::InputNotFound(args.image.clone()).into());
    }

    let config = resolve_config(args.config.as_deref(), &args.overrides())?;
    let request = BuildRequest {
        image_path: args.image.clone(),
        template: args
            .template
            .clone()
            .map(TemplateSource::File)
            .unwrap_or_default(),
        title: args.title.clone(),
        snippet: args.snippet.clone(),
        cta_url: args.cta.clone(),
        campaign: args.campaign.clone(),
        output_html: args.output_html(),
    };

    if args.dry_run {
        print_execution_plan(&request, &config);
        return Ok(());
    }

    let pipeline = EmailPipeline::from_config(config);
    let progress = SpinnerProgress::new(args.verbose, args.quiet || args.json);
    let result = pipeline.build(&request, &progress);
    progress.finish();
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !args.quiet {
        println!("HTML:    {}", result.html_path.display());
        println!("Assets:  {}", result.archive_path.display());
        if let Some(debug) = &result.debug_image {
            println!("Debug:   {}", debug.display());
        }
        println!(
            "Bands:   {} text, {} image ({} text boxes)",
            result.text_bands, result.image_bands, result.text_boxes
        );
        if let Some(reason) = &result.ocr_degraded {
            println!("Warning: text recognition failed ({}); built image-only", reason);
        }
        println!("Time:    {:.2}s", result.elapsed_seconds);
    }

    Ok(())
}

fn print_execution_plan(request: &BuildRequest, config: &PipelineConfig) {
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input:    {}", request.image_path.display());
    println!("Output:   {}", request.output_html.display());
    println!("Campaign: {}", request.campaign);
    match &request.template {
        TemplateSource::File(path) => println!("Template: {}", path.display()),
        _ => println!("Template: built-in"),
    }
    println!();
    println!("Image:");
    if config.max_width > 0 {
        println!("  Max width: {}px (downscale only)", config.max_width);
    } else {
        println!("  Max width: original");
    }
    println!();
    println!("Segmentation:");
    println!("  Half window:      {} rows", config.segment.half_window);
    println!("  Brightness:       > {}", config.segment.brightness_threshold);
    println!("  Flatness:         < {}", config.segment.flatness_threshold);
    println!("  Safety margin:    {} rows", config.segment.safety_margin);
    println!("  Min band height:  {} rows", config.segment.min_band_height);
    println!();
    println!("Text Recognition:");
    if config.ocr {
        println!("  Engine:    tesseract ({})", config.tesseract.languages);
        println!("  Timeout:   {}s", config.tesseract.timeout_secs);
    } else {
        println!("  Engine:    disabled");
    }
    println!();
    println!("Save debug overlay: {}", if config.save_debug { "YES" } else { "NO" });
}

// ============ Analyze Command ============

fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    init_logging(args.verbose, false);

    let config = resolve_config(args.config.as_deref(), &args.overrides())?;
    let pipeline = EmailPipeline::from_config(config);
    let report = pipeline.analyze(&args.image)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ============ Info Command ============

fn run_info() -> anyhow::Result<()> {
    println!("mailslicer v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("OCR Tools:");
    check_tool_with_version("tesseract", "Tesseract", &["--version"]);

    println!();
    println!("Features:");
    println!("  web: {}", if cfg!(feature = "web") { "enabled" } else { "disabled" });

    println!();
    println!("Config File Locations:");
    for (label, path) in ["Local", "User "].iter().zip(Config::search_paths()) {
        let found = if path.is_file() { " (found)" } else { "" };
        println!("  {}: {}{}", label, path.display(), found);
    }

    Ok(())
}

fn check_tool_with_version(cmd: &str, name: &str, version_args: &[&str]) {
    let Ok(path) = which::which(cmd) else {
        println!("  {}: Not found", name);
        return;
    };

    let first_line = std::process::Command::new(&path)
        .args(version_args)
        .output()
        .ok()
        .and_then(|output| {
            // tesseract prints its version on stderr in older releases
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            String::from_utf8_lossy(&text)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
        .filter(|l| !l.is_empty() && l.len() < 80);

    match first_line {
        Some(version) => println!("  {}: {} ({})", name, version, path.display()),
        None => println!("  {}: {} (found)", name, path.display()),
    }
}

// ============ Serve Command (Web Server) ============

#[cfg(feature = "web")]
fn run_serve(args: &ServeArgs) -> anyhow::Result<()> {
    init_logging(args.verbose.max(1), false);

    let file_config = load_config(args.config.as_deref())?;
    let overrides = CliOverrides {
        ocr: args.no_ocr.then_some(false),
        ..CliOverrides::new()
    };
    let pipeline_config = file_config.merge_with_cli(&overrides);

    let section = &file_config.server;
    let upload_limit_mb = args.upload_limit.unwrap_or(section.upload_limit_mb);
    let config = ServerConfig::default()
        .with_port(args.port.unwrap_or(section.port))
        .with_bind(args.bind.as_deref().unwrap_or(&section.bind))
        .with_upload_limit(upload_limit_mb * 1024 * 1024)
        .with_work_dir(
            args.work_dir
                .clone()
                .unwrap_or_else(|| section.work_dir.clone()),
        )
        .with_templates_dir(
            args.templates_dir
                .clone()
                .unwrap_or_else(|| section.templates_dir.clone()),
        )
        .with_workers(args.workers.or(section.workers).unwrap_or_else(num_cpus::get));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = WebServer::new(config, pipeline_config);
        server.run().await
    })?;

    Ok(())
}

//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

/// Turn a campaign graphic into a sliced HTML email
#[derive(Debug, Parser)]
#[command(name = "mailslicer", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build an HTML email from an image
    Build(BuildArgs),
    /// Print the segmentation report of an image as JSON
    Analyze(AnalyzeArgs),
    /// Show system information and tool availability
    Info,
    /// Start the HTTP API
    #[cfg(feature = "web")]
    Serve(ServeArgs),
}

/// Engine threshold overrides
#[derive(Debug, Clone, Default, Args)]
pub struct SegmentArgs {
    /// Sliding half-window in rows
    #[arg(long)]
    pub window: Option<u32>,

    /// Mean luminance a gap must exceed (0-255)
    #[arg(long)]
    pub brightness: Option<f64>,

    /// Luminance spread a gap must stay below (0-255)
    #[arg(long)]
    pub flatness: Option<f64>,

    /// Rows kept clear around recognized text
    #[arg(long)]
    pub safety_margin: Option<u32>,

    /// Minimum band height in rows
    #[arg(long)]
    pub min_band_height: Option<u32>,
}

/// Text recognition switches
#[derive(Debug, Clone, Default, Args)]
pub struct OcrArgs {
    /// Skip text recognition; every band becomes an image
    #[arg(long)]
    pub no_ocr: bool,

    /// Tesseract languages, e.g. "por+eng"
    #[arg(long)]
    pub ocr_lang: Option<String>,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Campaign graphic (PNG, JPEG, WebP, ...)
    #[arg(short, long)]
    pub image: PathBuf,

    /// HTML template (built-in template when omitted)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Email subject placed in <title>
    #[arg(long, default_value = "")]
    pub title: String,

    /// Preheader snippet
    #[arg(long, default_value = "")]
    pub snippet: String,

    /// Link target of the slices and button
    #[arg(long, default_value = "")]
    pub cta: String,

    /// Campaign name, used for output file names
    #[arg(long, default_value = "email")]
    pub campaign: String,

    /// Output HTML path [default: ./dist/<campaign>.html]
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Config file (default lookup when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum image width; larger images are downscaled
    #[arg(long)]
    pub max_width: Option<u32>,

    #[command(flatten)]
    pub segment: SegmentArgs,

    #[command(flatten)]
    pub ocr: OcrArgs,

    /// Write an overlay of cuts and bands next to the HTML
    #[arg(long)]
    pub save_debug: bool,

    /// Print the build result as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the execution plan without building
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl BuildArgs {
    /// Output HTML path, defaulting to `./dist/<campaign>.html`
    pub fn output_html(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| PathBuf::from("dist").join(format!("{}.html", self.campaign)))
    }

    /// Flags that override config file values
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            max_width: self.max_width,
            save_debug: self.save_debug.then_some(true),
            ..overrides_from(&self.segment, &self.ocr)
        }
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Campaign graphic
    #[arg(short, long)]
    pub image: PathBuf,

    /// Config file (default lookup when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum image width; larger images are downscaled
    #[arg(long)]
    pub max_width: Option<u32>,

    #[command(flatten)]
    pub segment: SegmentArgs,

    #[command(flatten)]
    pub ocr: OcrArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl AnalyzeArgs {
    /// Flags that override config file values
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            max_width: self.max_width,
            ..overrides_from(&self.segment, &self.ocr)
        }
    }
}

fn overrides_from(segment: &SegmentArgs, ocr: &OcrArgs) -> CliOverrides {
    CliOverrides {
        half_window: segment.window,
        brightness_threshold: segment.brightness,
        flatness_threshold: segment.flatness,
        safety_margin: segment.safety_margin,
        min_band_height: segment.min_band_height,
        ocr: ocr.no_ocr.then_some(false),
        ocr_languages: ocr.ocr_lang.clone(),
        ..CliOverrides::new()
    }
}

#[cfg(feature = "web")]
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on [default: config or 3000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind [default: config or 127.0.0.1]
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Upload limit in megabytes
    #[arg(long)]
    pub upload_limit: Option<usize>,

    /// Root directory for job outputs
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Directory holding <template_id>.html files
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Concurrent builds [default: number of CPUs]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Config file (default lookup when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip text recognition
    #[arg(long)]
    pub no_ocr: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_defaults() {
        let cli = parse(&["mailslicer", "build", "--image", "art.png"]);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };

        assert_eq!(args.image, PathBuf::from("art.png"));
        assert!(args.template.is_none());
        assert_eq!(args.campaign, "email");
        assert_eq!(args.output_html(), PathBuf::from("dist/email.html"));
        assert!(!args.ocr.no_ocr);
        assert_eq!(args.verbose, 0);

        let overrides = args.overrides();
        assert!(overrides.ocr.is_none());
        assert!(overrides.save_debug.is_none());
        assert!(overrides.half_window.is_none());
    }

    #[test]
    fn test_build_all_flags() {
        let cli = parse(&[
            "mailslicer",
            "build",
            "-i",
            "art.png",
            "-t",
            "tpl.html",
            "--title",
            "Oferta",
            "--snippet",
            "Só hoje",
            "--cta",
            "https://example.com",
            "--campaign",
            "inverno",
            "--window",
            "4",
            "--brightness",
            "220",
            "--safety-margin",
            "3",
            "--min-band-height",
            "20",
            "--max-width",
            "600",
            "--no-ocr",
            "--save-debug",
            "-vv",
        ]);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };

        assert_eq!(args.template, Some(PathBuf::from("tpl.html")));
        assert_eq!(args.output_html(), PathBuf::from("dist/inverno.html"));
        assert_eq!(args.verbose, 2);

        let overrides = args.overrides();
        assert_eq!(overrides.half_window, Some(4));
        assert_eq!(overrides.brightness_threshold, Some(220.0));
        assert_eq!(overrides.safety_margin, Some(3));
        assert_eq!(overrides.min_band_height, Some(20));
        assert_eq!(overrides.max_width, Some(600));
        assert_eq!(overrides.ocr, Some(false));
        assert_eq!(overrides.save_debug, Some(true));
    }

    #[test]
    fn test_build_requires_image() {
        assert!(Cli::try_parse_from(["mailslicer", "build"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mailslicer", "build", "-i", "a.png", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_analyze_args() {
        let cli = parse(&["mailslicer", "analyze", "-i", "art.png", "--ocr-lang", "eng"]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.overrides().ocr_languages.as_deref(), Some("eng"));
    }

    #[test]
    fn test_info_command() {
        assert!(matches!(parse(&["mailslicer", "info"]).command, Commands::Info));
    }
}

//! smooth-nnet - Temporal smoothing filter for CTC network output.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ctcsmooth::config::DEFAULT_FRAMES;
use ctcsmooth::{Overrides, SmoothConfig, Smoother};
use ctcsmooth_ark::{ArkFormat, ArkWriter};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Smooth the output of a CTC network by averaging phase-shifted runs.
///
/// The scorer is run once per subsampling offset 0..N-1 on the same
/// feature pipeline. The N output archives are read in lockstep and
/// averaged frame by frame. The merged archive goes to stdout.
///
/// Defaults can be stored in ~/.ctcsmooth/smooth-nnet/config.yaml.
#[derive(Parser, Debug)]
#[command(name = "smooth-nnet")]
#[command(about = "Temporal smoothing filter for CTC network output")]
#[command(version)]
struct Args {
    /// Scorer tool name [default: net-output-extract]
    #[arg(long, allow_hyphen_values = true)]
    cmd: Option<String>,

    /// Class frame counts file [default: label.counts]
    #[arg(long, alias = "class_frame_counts", allow_hyphen_values = true)]
    class_frame_counts: Option<String>,

    /// Scorer options, passed verbatim [default: --apply-log=true]
    #[arg(long, allow_hyphen_values = true)]
    options: Option<String>,

    /// Network model [default: nnet.final]
    #[arg(long, allow_hyphen_values = true)]
    model: Option<String>,

    /// Base feature pipeline rspecifier, ending in '|'
    #[arg(long, allow_hyphen_values = true)]
    feats: Option<String>,

    /// Number of phases to average; only 1 to 4 produce output [default: 3]
    #[arg(long, allow_hyphen_values = true)]
    frames: Option<String>,

    /// Config file (default is ~/.ctcsmooth/smooth-nnet/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a text archive instead of binary
    #[arg(long)]
    text: bool,

    /// Print the scorer commands to stderr and exit
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            cmd: self.cmd.clone(),
            class_frame_counts: self.class_frame_counts.clone(),
            options: self.options.clone(),
            model: self.model.clone(),
            feats: self.feats.clone(),
            frames: self.frames.as_deref().map(parse_frames),
        }
    }

    fn resolve_config(&self) -> anyhow::Result<SmoothConfig> {
        let mut cfg = SmoothConfig::load_or_default(self.config.as_deref())
            .context("failed to load config")?;
        cfg.apply(&self.overrides());
        Ok(cfg)
    }

    fn format(&self) -> ArkFormat {
        if self.text {
            ArkFormat::Text
        } else {
            ArkFormat::Binary
        }
    }
}

/// Parses `--frames`, falling back to the default on a non-integer.
fn parse_frames(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or_else(|_| {
        debug!(frames = raw, fallback = DEFAULT_FRAMES, "frames is not an integer");
        DEFAULT_FRAMES
    })
}

fn init_logging(verbose: bool) {
    // stdout carries the archive, so logs go to stderr.
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let smoother = Smoother::new(args.resolve_config()?);

    if args.dry_run {
        for cmd in smoother.commands() {
            eprintln!("{}", cmd);
        }
        return Ok(());
    }

    let stdout = BufWriter::new(io::stdout().lock());
    let mut out = ArkWriter::new(stdout, args.format());
    smoother.run(&mut out).context("smoothing failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("smooth-nnet").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_args_keeps_defaults() {
        let args = parse(&[]);
        let mut cfg = SmoothConfig::default();
        cfg.apply(&args.overrides());
        assert_eq!(cfg, SmoothConfig::default());
        assert_eq!(args.format(), ArkFormat::Binary);
    }

    #[test]
    fn test_hyphenated_values() {
        let args = parse(&["--options", "--apply-log=false", "--frames", "-1"]);
        assert_eq!(args.options.as_deref(), Some("--apply-log=false"));
        assert_eq!(args.overrides().frames, Some(-1));
    }

    #[test]
    fn test_underscore_alias() {
        let args = parse(&["--class_frame_counts", "ali.counts"]);
        assert_eq!(args.class_frame_counts.as_deref(), Some("ali.counts"));
        let args = parse(&["--class-frame-counts", "ali.counts"]);
        assert_eq!(args.class_frame_counts.as_deref(), Some("ali.counts"));
    }

    #[test]
    fn test_overrides_apply() {
        let args = parse(&["--model", "final.nnet", "--frames", "2", "--text"]);
        let mut cfg = SmoothConfig::default();
        cfg.apply(&args.overrides());
        assert_eq!(cfg.model, "final.nnet");
        assert_eq!(cfg.frames, 2);
        assert_eq!(cfg.cmd, "net-output-extract");
        assert_eq!(args.format(), ArkFormat::Text);
    }

    #[test]
    fn test_non_integer_frames_falls_back() {
        let args = parse(&["--frames", "three"]);
        assert_eq!(args.overrides().frames, Some(3));

        let mut cfg = SmoothConfig::from_yaml_str("frames: 2\n").unwrap();
        cfg.apply(&args.overrides());
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.stream_count(), Some(3));
    }

    #[test]
    fn test_parse_frames() {
        assert_eq!(parse_frames("4"), 4);
        assert_eq!(parse_frames(" 2 "), 2);
        assert_eq!(parse_frames("5"), 5);
        assert_eq!(parse_frames(""), DEFAULT_FRAMES);
        assert_eq!(parse_frames("2.5"), DEFAULT_FRAMES);
    }
}

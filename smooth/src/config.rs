//! Smoother configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file
//! (`~/.ctcsmooth/smooth-nnet/config.yaml` or an explicit path), then
//! command-line overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SmoothError, SmoothResult};

/// Application name used for the default config directory.
pub const APP_NAME: &str = "smooth-nnet";
/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".ctcsmooth";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Largest number of phase-shifted streams that are averaged.
pub const MAX_STREAMS: usize = 4;

pub const DEFAULT_CMD: &str = "net-output-extract";
pub const DEFAULT_CLASS_FRAME_COUNTS: &str = "label.counts";
pub const DEFAULT_OPTIONS: &str = "--apply-log=true";
pub const DEFAULT_MODEL: &str = "nnet.final";
pub const DEFAULT_FEATS: &str = "ark,s,cs:apply-cmvn --norm-vars=true \
    --utt2spk=ark:data/eval2000/split12/2/utt2spk \
    scp:data/eval2000/split12/2/cmvn.scp \
    scp:data/eval2000/split12/2/feats.scp ark:- | \
    splice-feats --left-context=1 --right-context=1 ark:- ark:- |";
pub const DEFAULT_FRAMES: i64 = 3;

/// Scorer invocation and subsampling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothConfig {
    /// Scorer tool name.
    pub cmd: String,
    /// Class frame counts file passed as `--class-frame-counts`.
    pub class_frame_counts: String,
    /// Extra scorer options, inserted verbatim.
    pub options: String,
    /// Network model file.
    pub model: String,
    /// Base feature pipeline rspecifier; must end with `|`.
    pub feats: String,
    /// Subsampling factor N. Only 1..=4 produce output.
    pub frames: i64,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            cmd: DEFAULT_CMD.to_string(),
            class_frame_counts: DEFAULT_CLASS_FRAME_COUNTS.to_string(),
            options: DEFAULT_OPTIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            feats: DEFAULT_FEATS.to_string(),
            frames: DEFAULT_FRAMES,
        }
    }
}

/// Command-line overrides. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cmd: Option<String>,
    pub class_frame_counts: Option<String>,
    pub options: Option<String>,
    pub model: Option<String>,
    pub feats: Option<String>,
    pub frames: Option<i64>,
}

impl SmoothConfig {
    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join(DEFAULT_BASE_DIR)
                .join(APP_NAME)
                .join(DEFAULT_CONFIG_FILE)
        })
    }

    /// Parses a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(s: &str) -> SmoothResult<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads a YAML config file.
    pub fn load(path: &Path) -> SmoothResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SmoothError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Loads `custom` if given, else the default path if it exists, else
    /// built-in defaults.
    pub fn load_or_default(custom: Option<&Path>) -> SmoothResult<Self> {
        if let Some(path) = custom {
            return Self::load(path);
        }
        match Self::default_config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading default config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Applies command-line overrides.
    pub fn apply(&mut self, o: &Overrides) {
        if let Some(v) = &o.cmd {
            self.cmd = v.clone();
        }
        if let Some(v) = &o.class_frame_counts {
            self.class_frame_counts = v.clone();
        }
        if let Some(v) = &o.options {
            self.options = v.clone();
        }
        if let Some(v) = &o.model {
            self.model = v.clone();
        }
        if let Some(v) = &o.feats {
            self.feats = v.clone();
        }
        if let Some(v) = o.frames {
            self.frames = v;
        }
    }

    /// Returns the number of streams to average, or `None` when `frames`
    /// is outside `1..=MAX_STREAMS`.
    pub fn stream_count(&self) -> Option<usize> {
        usize::try_from(self.frames)
            .ok()
            .filter(|n| (1..=MAX_STREAMS).contains(n))
    }
}

//! End-to-end smoothing run.

use std::io::Write;

use ctcsmooth_ark::{open_rspecifier, ArkResult, ArkWriter, Matrix};
use tracing::{debug, info};

use crate::command::build_commands;
use crate::config::SmoothConfig;
use crate::error::SmoothResult;
use crate::lockstep::Lockstep;

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Utterances written.
    pub utterances: usize,
    /// Total output frames across all utterances.
    pub frames: usize,
}

/// Runs the scorer once per phase and writes the averaged output.
pub struct Smoother {
    config: SmoothConfig,
}

impl Smoother {
    pub fn new(config: SmoothConfig) -> Self {
        Self { config }
    }

    /// The scorer pipelines that [`run`](Self::run) will open.
    pub fn commands(&self) -> Vec<String> {
        build_commands(&self.config)
    }

    /// Spawns one scorer per phase and writes merged records to `out`.
    ///
    /// Writes nothing and succeeds when `frames` is out of range.
    pub fn run<W: Write>(&self, out: &mut ArkWriter<W>) -> SmoothResult<RunStats> {
        let commands = self.commands();
        if commands.is_empty() {
            debug!(frames = self.config.frames, "frames outside 1..=4, nothing to do");
            return Ok(RunStats::default());
        }

        let streams = commands
            .iter()
            .map(|cmd| open_rspecifier(cmd))
            .collect::<ArkResult<Vec<_>>>()?;
        smooth_streams(streams, out)
    }
}

/// Merges already-open streams into `out` in lockstep.
pub fn smooth_streams<I, W>(streams: Vec<I>, out: &mut ArkWriter<W>) -> SmoothResult<RunStats>
where
    I: Iterator<Item = ArkResult<(String, Matrix)>>,
    W: Write,
{
    let merged = Lockstep::new(streams);
    let width = merged.width();
    let mut stats = RunStats::default();

    for rec in merged {
        let (key, mat) = rec?;
        debug!(key = %key, rows = mat.rows(), cols = mat.cols(), "merged");
        out.write(&key, &mat)?;
        stats.utterances += 1;
        stats.frames += mat.rows();
    }
    out.flush()?;

    info!(
        streams = width,
        utterances = stats.utterances,
        frames = stats.frames,
        "smoothing done"
    );
    Ok(stats)
}

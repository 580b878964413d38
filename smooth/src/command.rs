//! Scorer command construction.

use crate::config::SmoothConfig;

/// Builds the scorer pipeline for one subsampling phase.
///
/// ```text
/// <cmd> --class-frame-counts=<counts> <options> <model> \
///     "<feats>subsample-feats --n=<N> --offset=<offset> ark:- ark:- |" ark:- |
/// ```
///
/// The result is a read specifier: the trailing `|` tells the archive
/// opener to run it through the shell. Nothing is quoted or validated.
pub fn score_command(cfg: &SmoothConfig, offset: usize) -> String {
    format!(
        "{cmd} --class-frame-counts={counts} {options} {model} \"{feats}{subsample}\" ark:- |",
        cmd = cfg.cmd,
        counts = cfg.class_frame_counts,
        options = cfg.options,
        model = cfg.model,
        feats = cfg.feats,
        subsample = subsample_stage(cfg.frames, offset),
    )
}

/// The feature stage keeping every `n`-th frame starting at `offset`.
pub fn subsample_stage(n: i64, offset: usize) -> String {
    format!("subsample-feats --n={} --offset={} ark:- ark:- |", n, offset)
}

/// Builds one scorer command per offset `0..N`.
///
/// Empty when `frames` is outside the supported range.
pub fn build_commands(cfg: &SmoothConfig) -> Vec<String> {
    match cfg.stream_count() {
        Some(n) => (0..n).map(|offset| score_command(cfg, offset)).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(frames: i64) -> SmoothConfig {
        SmoothConfig {
            cmd: "net-output-extract".into(),
            class_frame_counts: "label.counts".into(),
            options: "--apply-log=true".into(),
            model: "nnet.final".into(),
            feats: "ark:copy-feats scp:feats.scp ark:- |".into(),
            frames,
        }
    }

    #[test]
    fn test_score_command() {
        let cmd = score_command(&small_config(3), 1);
        assert_eq!(
            cmd,
            "net-output-extract --class-frame-counts=label.counts --apply-log=true nnet.final \
             \"ark:copy-feats scp:feats.scp ark:- |subsample-feats --n=3 --offset=1 ark:- ark:- |\" ark:- |"
        );
    }

    #[test]
    fn test_build_commands_offsets() {
        let cmds = build_commands(&small_config(4));
        assert_eq!(cmds.len(), 4);
        for (i, cmd) in cmds.iter().enumerate() {
            assert!(cmd.contains(&format!("--n=4 --offset={} ark:- ark:- |\"", i)), "{}", cmd);
            assert!(cmd.ends_with("\" ark:- |"));
        }
    }

    #[test]
    fn test_build_commands_single() {
        let cmds = build_commands(&small_config(1));
        assert_eq!(cmds, vec![score_command(&small_config(1), 0)]);
    }

    #[test]
    fn test_build_commands_out_of_range() {
        assert!(build_commands(&small_config(0)).is_empty());
        assert!(build_commands(&small_config(5)).is_empty());
        assert!(build_commands(&small_config(-2)).is_empty());
    }

    #[test]
    fn test_default_feats_pipeline() {
        let cmd = score_command(&SmoothConfig::default(), 0);
        assert!(cmd.contains(
            "--right-context=1 ark:- ark:- |subsample-feats --n=3 --offset=0 ark:- ark:- |\""
        ));
    }
}

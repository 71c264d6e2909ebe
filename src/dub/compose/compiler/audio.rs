use super::super::util::format_tempo;
use super::{AUDIO_INPUT_LABEL, DubCompiler, FilterChain};
use crate::dub::reconcile::ScaleFactor;

/// Range a single `atempo` stage accepts.
pub(super) const ATEMPO_MIN: f64 = 0.5;
pub(super) const ATEMPO_MAX: f64 = 2.0;

/// Split `factor` into in-range `atempo` stages whose product is `factor`.
pub(super) fn atempo_stages(factor: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remaining = factor;

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);
    stages
}

impl DubCompiler {
    /// Replacement audio only; the source video's audio is never referenced.
    pub(super) fn build_audio_filters(&self, filters: &mut FilterChain, tempo: Option<ScaleFactor>) {
        let chain = match tempo {
            Some(factor) => atempo_stages(factor.value())
                .into_iter()
                .map(|stage| format!("atempo={}", format_tempo(stage)))
                .collect::<Vec<_>>()
                .join(","),
            None => "anull".to_string(),
        };

        filters.push(format!("[{AUDIO_INPUT_LABEL}]{chain}[outa]"));
    }
}

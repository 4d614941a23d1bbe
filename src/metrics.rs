use crate::model::ClassificationOutcome;

/// Compute metrics (mean, median, 25th percentile, 75th percentile) from samples
pub fn compute_metrics(samples: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let mean = samples.iter().sum::<f64>() / n as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

/// Aggregate view over a slice of history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStats {
    pub total: usize,
    pub spam: usize,
    pub not_spam: usize,
    pub unsupported: usize,
    pub mean_confidence: Option<f64>,
    pub median_confidence: Option<f64>,
}

impl HistoryStats {
    pub fn from_outcomes(outcomes: &[ClassificationOutcome]) -> Self {
        let mut stats = HistoryStats {
            total: outcomes.len(),
            ..Default::default()
        };
        let mut confidences = Vec::with_capacity(outcomes.len());
        for o in outcomes {
            match o {
                ClassificationOutcome::Classified {
                    is_spam, confidence, ..
                } => {
                    if *is_spam {
                        stats.spam += 1;
                    } else {
                        stats.not_spam += 1;
                    }
                    confidences.push(*confidence);
                }
                ClassificationOutcome::LanguageUnsupported { .. } => stats.unsupported += 1,
            }
        }
        if let Some((mean, median, _, _)) = compute_metrics(&confidences) {
            stats.mean_confidence = Some(mean);
            stats.median_confidence = Some(median);
        }
        stats
    }

    /// Share of classified messages judged spam.
    pub fn spam_ratio(&self) -> Option<f64> {
        let classified = self.spam + self.not_spam;
        if classified == 0 {
            None
        } else {
            Some(self.spam as f64 / classified as f64)
        }
    }
}

mod trainer;

pub use trainer::Trainer;

/// What a training pass went through.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainStats {
    pub batches: usize,
    pub samples: usize,
    /// The batch losses averaged over samples, measured before each batch's update.
    pub mean_loss: f32,
}

/// The result of measuring a model over a split.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    pub mean_loss: f32,
    /// The fraction of correctly classified samples, in `[0, 1]`.
    pub accuracy: f32,
    pub correct: usize,
    pub samples: usize,
}

impl Evaluation {
    /// Builds an `Evaluation` from the loss summed over samples and the amount of correct
    /// predictions. An empty split evaluates to zero loss and zero accuracy.
    pub fn new(total_loss: f32, correct: usize, samples: usize) -> Self {
        if samples == 0 {
            return Self::default();
        }

        Self {
            mean_loss: total_loss / samples as f32,
            accuracy: correct as f32 / samples as f32,
            correct,
            samples,
        }
    }
}

/// The outcome of a single epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: TrainStats,
    pub evaluation: Evaluation,
}

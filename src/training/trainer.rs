use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::Axis;
use rand::rngs::StdRng;

use super::{EpochReport, Evaluation, TrainStats};
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    config::TrainingConfig,
    dataset::{Dataset, argmax},
    optimization::Optimizer,
};

/// Drives the optimization of a model. Owns the model, its parameters and gradient buffer, the
/// optimizer and the loss function.
pub struct Trainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: M,
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: O,
    loss_fn: L,

    batch_size: NonZeroUsize,
    epochs: NonZeroUsize,
    log_every: NonZeroUsize,
    rng: Option<StdRng>,
}

impl<M, O, L> Trainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `params` - The model's initial parameters.
    /// * `optimizer` - The update rule applied after every batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output
    ///   and the expected one.
    /// * `config` - The batch size, amount of epochs and shuffling policy.
    ///
    /// # Returns
    /// A new `Trainer` or an error if `params` doesn't fit the model.
    pub fn new(
        model: M,
        params: Vec<f32>,
        optimizer: O,
        loss_fn: L,
        config: &TrainingConfig,
    ) -> Result<Self> {
        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self {
            grad: vec![0.; params.len()],
            model,
            params,
            optimizer,
            loss_fn,
            batch_size: config.batch_size,
            epochs: config.epochs,
            log_every: config.log_every,
            rng: config.shuffle.then(|| config.shuffle_rng()),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Gives back the model and its trained parameters.
    pub fn into_parts(self) -> (M, Vec<f32>) {
        (self.model, self.params)
    }

    /// Runs one pass over `train`, updating the parameters after every batch. Every
    /// `log_every` batches the current loss and the amount of samples seen so far are logged.
    ///
    /// # Arguments
    /// * `train` - The training split.
    ///
    /// # Returns
    /// The pass statistics or the first error raised by the model.
    pub fn train_epoch(&mut self, train: &Dataset) -> Result<TrainStats> {
        let size = train.len();
        let log_every = self.log_every.get();
        let mut stats = TrainStats::default();
        let mut weighted_loss = 0.;

        for (batch, (x, y)) in train.batches(self.batch_size).enumerate() {
            let loss = self.model.step(
                &mut self.params,
                &mut self.grad,
                &self.loss_fn,
                &mut self.optimizer,
                x,
                y,
            )?;

            stats.batches += 1;
            stats.samples += x.nrows();
            weighted_loss += loss * x.nrows() as f32;

            if batch % log_every == 0 {
                let current = stats.samples;
                info!("loss: {loss:>7.6}  [{current:>5}/{size:>5}]");
            }
        }

        if stats.samples > 0 {
            stats.mean_loss = weighted_loss / stats.samples as f32;
        }

        debug!(batches = stats.batches, samples = stats.samples; "training pass finished");
        Ok(stats)
    }

    /// Measures the model over `test` without touching its parameters.
    ///
    /// Only a shared borrow of the trainer is taken: the model is run through
    /// `Model::predict`, which keeps no backward state, and neither the parameters nor the
    /// gradient can change.
    ///
    /// # Arguments
    /// * `test` - The held-out split.
    ///
    /// # Returns
    /// The mean loss per sample and the fraction of correctly classified samples.
    pub fn evaluate(&self, test: &Dataset) -> Result<Evaluation> {
        let mut total_loss = 0.;
        let mut correct = 0;
        let mut samples = 0;

        for (x, y) in test.batches(self.batch_size) {
            let y_pred = self.model.predict(&self.params, x)?;
            if y_pred.dim() != y.dim() {
                return Err(MlErr::SizeMismatch {
                    what: "label width",
                    got: y.ncols(),
                    expected: y_pred.ncols(),
                });
            }

            let rows = x.nrows();
            total_loss += self.loss_fn.loss(y_pred.view(), y) * rows as f32;
            correct += y_pred
                .axis_iter(Axis(0))
                .zip(y.axis_iter(Axis(0)))
                .filter(|(pred, target)| argmax(pred.view()) == argmax(target.view()))
                .count();
            samples += rows;
        }

        let evaluation = Evaluation::new(total_loss, correct, samples);
        info!(
            "Test Error: Accuracy: {:>0.1}%, Avg loss: {:>8.6}",
            evaluation.accuracy * 100.,
            evaluation.mean_loss
        );

        Ok(evaluation)
    }

    /// Alternates a training pass over `train` and an evaluation over `test`, `epochs` times.
    /// When shuffling is enabled `train` is reshuffled before each training pass.
    ///
    /// # Returns
    /// One report per epoch.
    pub fn fit(&mut self, train: &mut Dataset, test: &Dataset) -> Result<Vec<EpochReport>> {
        let epochs = self.epochs.get();
        let mut reports = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            info!("Epoch {epoch}\n-------------------------------");

            if let Some(rng) = &mut self.rng {
                train.shuffle(rng);
            }

            let train_stats = self.train_epoch(train)?;
            let evaluation = self.evaluate(test)?;

            reports.push(EpochReport {
                epoch,
                train: train_stats,
                evaluation,
            });
        }

        Ok(reports)
    }
}

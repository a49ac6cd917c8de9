use std::num::NonZeroUsize;

use ndarray::{ArrayView1, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory split of labeled samples.
///
/// Samples are stored row-major, each row being `x_size` input features followed by `y_size`
/// target values (a one-hot encoding for classification).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    data: Vec<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The samples, one row after the other.
    /// * `x_size` - The amount of input features per sample.
    /// * `y_size` - The amount of target values per sample.
    ///
    /// # Returns
    /// A new `Dataset` or an error if `data` can't be split in rows of `x_size + y_size`.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 || y_size == 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset sample width",
                got: 0,
                expected: 1,
            });
        }

        let remainder = data.len() % (x_size + y_size);
        if remainder != 0 {
            return Err(MlErr::SizeMismatch {
                what: "trailing values of a partial dataset row",
                got: remainder,
                expected: 0,
            });
        }

        Ok(Self {
            x_size,
            y_size,
            data,
        })
    }

    /// Builds a classification dataset from flat inputs and class indices, encoding each label
    /// as a one-hot row of `classes` values.
    ///
    /// # Arguments
    /// * `xs` - The input features, `x_size` per sample.
    /// * `x_size` - The amount of input features per sample.
    /// * `labels` - The class index of each sample.
    /// * `classes` - The amount of classes.
    pub fn from_labels(
        xs: &[f32],
        x_size: usize,
        labels: &[usize],
        classes: usize,
    ) -> Result<Self> {
        if x_size == 0 || xs.len() != labels.len() * x_size {
            return Err(MlErr::SizeMismatch {
                what: "inputs per label",
                got: xs.len(),
                expected: labels.len() * x_size,
            });
        }

        let mut data = Vec::with_capacity(labels.len() * (x_size + classes));
        for (x, &label) in xs.chunks_exact(x_size).zip(labels) {
            if label >= classes {
                return Err(MlErr::LabelOutOfRange { label, classes });
            }

            data.extend_from_slice(x);
            data.extend((0..classes).map(|c| if c == label { 1. } else { 0. }));
        }

        Self::new(data, x_size, classes)
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.data.len() / self.row_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// Returns the input and target of the `i`-th sample.
    pub fn row(&self, i: usize) -> Option<(ArrayView1<'_, f32>, ArrayView1<'_, f32>)> {
        let row = self.row_size();
        let raw = self.data.get(i * row..(i + 1) * row)?;
        let (x, y) = raw.split_at(self.x_size);
        Some((ArrayView1::from(x), ArrayView1::from(y)))
    }

    /// Returns the class of the `i`-th sample, the index of its largest target value.
    pub fn label(&self, i: usize) -> Option<usize> {
        let (_, y) = self.row(i)?;
        Some(argmax(y))
    }

    /// Returns the inputs and targets of the first `n` samples as a single batch.
    pub fn head(&self, n: usize) -> Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        self.view(0, n.min(self.len()))
    }

    /// Iterates the dataset in contiguous batches of `batch_size` samples, in order. The last
    /// batch holds the remaining samples when `batch_size` doesn't divide the dataset's length.
    pub fn batches(&self, batch_size: NonZeroUsize) -> Batches<'_> {
        Batches {
            dataset: self,
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }

    /// Returns the amount of batches `batches` yields, `ceil(len / batch_size)`.
    pub fn num_batches(&self, batch_size: NonZeroUsize) -> usize {
        self.len().div_ceil(batch_size.get())
    }

    /// Shuffles the order of the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let row = self.row_size();
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        let mut data = Vec::with_capacity(self.data.len());
        for i in order {
            data.extend_from_slice(&self.data[i * row..(i + 1) * row]);
        }

        self.data = data;
    }

    /// Splits the dataset in two, the first one keeping the first `n` samples.
    pub fn split_at(mut self, n: usize) -> (Dataset, Dataset) {
        let at = n.min(self.len()) * self.row_size();
        let rest = self.data.split_off(at);

        let tail = Dataset {
            x_size: self.x_size,
            y_size: self.y_size,
            data: rest,
        };

        (self, tail)
    }

    fn row_size(&self) -> usize {
        self.x_size + self.y_size
    }

    fn view(&self, start: usize, end: usize) -> Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let row = self.row_size();
        let raw = self.data.get(start * row..end * row)?;
        let full = ArrayView2::from_shape((end - start, row), raw).ok()?;
        Some(full.split_at(Axis(1), self.x_size))
    }
}

/// Returns the index of the largest value, the first one on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;

    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }

    best
}

/// Borrowed, in order batches over a `Dataset`.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.dataset.len();
        if self.cursor >= len {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(len);
        let batch = self.dataset.view(self.cursor, end)?;
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self
            .dataset
            .len()
            .saturating_sub(self.cursor)
            .div_ceil(self.batch_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches<'_> {}

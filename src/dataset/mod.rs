mod classes;
#[allow(clippy::module_inception)]
mod dataset;
pub mod idx;

use std::path::Path;

pub use classes::{FASHION_MNIST_CLASSES, class_name};
pub use dataset::{Batches, Dataset, argmax};

use crate::Result;

/// Loads the train and test splits of a Fashion-MNIST distribution from `dir`.
///
/// # Returns
/// The `(train, test)` splits.
pub fn load_fashion_mnist<P: AsRef<Path>>(dir: P) -> Result<(Dataset, Dataset)> {
    let dir = dir.as_ref();
    let classes = FASHION_MNIST_CLASSES.len();

    let train = idx::load(
        dir.join(classes::TRAIN_IMAGES),
        dir.join(classes::TRAIN_LABELS),
        classes,
    )?;
    let test = idx::load(
        dir.join(classes::TEST_IMAGES),
        dir.join(classes::TEST_LABELS),
        classes,
    )?;

    Ok((train, test))
}

/// The label names of Fashion-MNIST, indexed by class.
pub const FASHION_MNIST_CLASSES: [&str; 10] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

/// The file names of the Fashion-MNIST (and MNIST) distribution.
pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Returns the name of a class, or `"unknown"` when it's out of range.
pub fn class_name(class: usize) -> &'static str {
    FASHION_MNIST_CLASSES.get(class).copied().unwrap_or("unknown")
}

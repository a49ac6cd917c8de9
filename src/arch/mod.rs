pub mod activations;
mod builder;
pub mod layers;
pub mod layout;
pub mod loss;
mod model;
mod sequential;

pub use builder::mlp;
pub use model::Model;
pub use sequential::Sequential;

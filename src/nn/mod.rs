//! Feed-forward neural networks with a tabulated activation
//!
//! Networks are parsed once from their text form (see [`parser`]) and then only
//! read. Evaluation normalizes the inputs onto [0, 1] with the stored training
//! bounds, propagates them through every plane using the tabulated logistic
//! function and maps the last plane back onto the output training bounds.

pub mod activation;
pub mod error;
pub mod network;
pub mod parser;

pub use error::FormatError;
pub use network::{Bounds, NeuralNetwork};

pub mod linear;

pub use linear::LinearPredictor;

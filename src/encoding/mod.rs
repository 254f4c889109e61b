//! Label encoding of categorical columns.

pub mod encoder;
pub mod registry;

pub use encoder::CategoricalEncoder;
pub use registry::EncoderRegistry;

//! Static model-file structure extraction for correlating traces with on-disk tensors.

pub mod gguf;
pub mod layout_table;

pub use gguf::{GGUFDataType, GGUFError, GGUFFile, GGUFTensorInfo, GGUFValue};
pub use layout_table::{TensorComponent, TensorLayoutEntry, TensorLayoutTable};

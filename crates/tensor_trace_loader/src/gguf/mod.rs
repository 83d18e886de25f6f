pub use data_type::GGUFDataType;
pub use errors::GGUFError;
pub use file::{GGUFFile, GGUFHeader, GGUFMetadata, GGUFValue};
pub use tensor_info::GGUFTensorInfo;

pub mod data_type;
pub mod errors;
pub mod file;
pub mod tensor_info;

#[cfg(test)]
pub(crate) mod fixture;

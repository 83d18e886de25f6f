use thiserror::Error;

#[derive(Debug, Error)]
pub enum GGUFError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid magic number: {0:?}")]
    InvalidMagic([u8; 4]),
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),
    #[error("Unknown metadata value type {0}")]
    UnknownValueType(u32),
    #[error("Tensor '{name}' has {n_dims} dimensions; at most 4 are supported")]
    TooManyDimensions { name: String, n_dims: u32 },
    #[error("Memory mapping error: {0}")]
    MemoryMappingError(String),
}

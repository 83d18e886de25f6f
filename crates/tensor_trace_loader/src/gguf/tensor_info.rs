use super::GGUFDataType;

#[derive(Debug, Clone, PartialEq)]
pub struct GGUFTensorInfo {
    pub name: String,
    pub dimensions: Vec<u64>,
    pub data_type: GGUFDataType,
    /// Offset relative to the start of the tensor data section.
    pub offset: u64,
}

impl GGUFTensorInfo {
    #[must_use]
    pub fn element_count(&self) -> Option<u64> {
        self.dimensions.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d))
    }

    /// Bytes occupied in the file, `None` for types without known block traits.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        self.data_type.byte_size(self.element_count()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GGUFDataType {
    F32,
    F16,
    Q4_0,
    Q4_1,
    Q4_2,
    Q4_3,
    Q5_0,
    Q5_1,
    Q8_0,
    Q8_1,
    Q2K,
    Q3K,
    Q4K,
    Q5K,
    Q6K,
    Q8K,
    IQ2XXS,
    IQ2XS,
    IQ3XXS,
    IQ1S,
    IQ4NL,
    IQ3S,
    IQ2S,
    IQ4XS,
    I8,
    I16,
    I32,
    I64,
    F64,
    IQ1M,
    BF16,
    Q4044,
    Q4048,
    Q4088,
    TQ10,
    TQ20,
    IQ4NL44,
    IQ4NL48,
    IQ4NL88,
    Unknown(u32),
}

impl GGUFDataType {
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::F32,
            1 => Self::F16,
            2 => Self::Q4_0,
            3 => Self::Q4_1,
            4 => Self::Q4_2,
            5 => Self::Q4_3,
            6 => Self::Q5_0,
            7 => Self::Q5_1,
            8 => Self::Q8_0,
            9 => Self::Q8_1,
            10 => Self::Q2K,
            11 => Self::Q3K,
            12 => Self::Q4K,
            13 => Self::Q5K,
            14 => Self::Q6K,
            15 => Self::Q8K,
            16 => Self::IQ2XXS,
            17 => Self::IQ2XS,
            18 => Self::IQ3XXS,
            19 => Self::IQ1S,
            20 => Self::IQ4NL,
            21 => Self::IQ3S,
            22 => Self::IQ2S,
            23 => Self::IQ4XS,
            24 => Self::I8,
            25 => Self::I16,
            26 => Self::I32,
            27 => Self::I64,
            28 => Self::F64,
            29 => Self::IQ1M,
            30 => Self::BF16,
            31 => Self::Q4044,
            32 => Self::Q4048,
            33 => Self::Q4088,
            34 => Self::TQ10,
            35 => Self::TQ20,
            36 => Self::IQ4NL44,
            37 => Self::IQ4NL48,
            38 => Self::IQ4NL88,
            _ => Self::Unknown(value),
        }
    }

    /// `(elements per block, bytes per block)`; `None` for retired or unknown types.
    #[must_use]
    pub const fn block_traits(self) -> Option<(u64, u64)> {
        let traits = match self {
            Self::F32 | Self::I32 => (1, 4),
            Self::F16 | Self::BF16 | Self::I16 => (1, 2),
            Self::I8 => (1, 1),
            Self::I64 | Self::F64 => (1, 8),
            Self::Q4_0 | Self::IQ4NL | Self::Q4044 | Self::Q4048 | Self::Q4088 => (32, 18),
            Self::IQ4NL44 | Self::IQ4NL48 | Self::IQ4NL88 => (32, 18),
            Self::Q4_1 => (32, 20),
            Self::Q5_0 => (32, 22),
            Self::Q5_1 => (32, 24),
            Self::Q8_0 => (32, 34),
            Self::Q8_1 => (32, 36),
            Self::Q2K => (256, 84),
            Self::Q3K => (256, 110),
            Self::Q4K => (256, 144),
            Self::Q5K => (256, 176),
            Self::Q6K => (256, 210),
            Self::Q8K => (256, 292),
            Self::IQ2XXS => (256, 66),
            Self::IQ2XS => (256, 74),
            Self::IQ3XXS => (256, 98),
            Self::IQ1S => (256, 50),
            Self::IQ3S => (256, 110),
            Self::IQ2S => (256, 82),
            Self::IQ4XS => (256, 136),
            Self::IQ1M => (256, 56),
            Self::TQ10 => (256, 54),
            Self::TQ20 => (256, 66),
            Self::Q4_2 | Self::Q4_3 | Self::Unknown(_) => return None,
        };
        Some(traits)
    }

    /// Storage size of `elements` values, rounding partial blocks up.
    #[must_use]
    pub fn byte_size(self, elements: u64) -> Option<u64> {
        let (block, bytes) = self.block_traits()?;
        elements.div_ceil(block).checked_mul(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_types_multiply_by_element_size() {
        assert_eq!(GGUFDataType::F32.byte_size(10), Some(40));
        assert_eq!(GGUFDataType::F16.byte_size(10), Some(20));
        assert_eq!(GGUFDataType::from_u32(30).byte_size(3), Some(6));
    }

    #[test]
    fn block_types_count_whole_blocks() {
        assert_eq!(GGUFDataType::Q8_0.byte_size(64), Some(68));
        assert_eq!(GGUFDataType::Q4K.byte_size(4096 * 256), Some(4096 * 144));
        assert_eq!(GGUFDataType::Q6K.byte_size(256), Some(210));
    }

    #[test]
    fn unknown_types_have_no_size() {
        assert_eq!(GGUFDataType::from_u32(4).byte_size(32), None);
        assert_eq!(GGUFDataType::from_u32(999), GGUFDataType::Unknown(999));
        assert_eq!(GGUFDataType::Unknown(999).byte_size(1), None);
    }
}

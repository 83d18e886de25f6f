use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use rustc_hash::FxHashMap;

use super::{GGUFDataType, GGUFError, tensor_info::GGUFTensorInfo};

pub const GGUF_MAGIC: [u8; 4] = *b"GGUF";
pub const GGUF_VERSION: u32 = 3;
pub const DEFAULT_ALIGNMENT: u64 = 32;
pub const MAX_DIMENSIONS: u32 = 4;

const MAX_STRING_LEN: usize = 1024 * 1024;
const MAX_ARRAY_LEN: usize = 1024 * 1024;
const ALIGNMENT_KEY: &str = "general.alignment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GGUFHeader {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct GGUFMetadata {
    pub entries: FxHashMap<String, GGUFValue>,
}

impl GGUFMetadata {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GGUFValue> {
        self.entries.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GGUFValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    Bool(bool),
    String(String),
    Array(Vec<GGUFValue>),
    U64(u64),
    I64(i64),
    F64(f64),
}

impl GGUFValue {
    /// Unsigned integer view of any non-negative integer value.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            GGUFValue::U8(v) => Some(u64::from(v)),
            GGUFValue::U16(v) => Some(u64::from(v)),
            GGUFValue::U32(v) => Some(u64::from(v)),
            GGUFValue::U64(v) => Some(v),
            GGUFValue::I8(v) => u64::try_from(v).ok(),
            GGUFValue::I16(v) => u64::try_from(v).ok(),
            GGUFValue::I32(v) => u64::try_from(v).ok(),
            GGUFValue::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}

/// Parsed header, metadata and tensor directory of a GGUF file.
///
/// The file is mapped only while parsing; tensor bytes are never read.
#[derive(Debug)]
pub struct GGUFFile {
    pub header: GGUFHeader,
    pub metadata: GGUFMetadata,
    pub tensor_metadata: Vec<GGUFTensorInfo>,
    /// Absolute file offset of the tensor data section.
    pub data_start: u64,
    pub file_path: PathBuf,
    pub file_len: u64,
}

impl GGUFFile {
    pub fn load_mmap_and_get_metadata<P: AsRef<Path>>(path: P) -> Result<Self, GGUFError> {
        let file_path = path.as_ref().to_path_buf();
        let file = File::open(&file_path)?;
        // SAFETY: the mapping is read-only; model files are not modified while being inspected.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| GGUFError::MemoryMappingError(e.to_string()))?;

        let mut reader = &mmap[..];

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != GGUF_MAGIC {
            return Err(GGUFError::InvalidMagic(magic));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != GGUF_VERSION {
            tracing::warn!(target: "tensor_trace::loader", version, expected = GGUF_VERSION, "unexpected GGUF version; parsing anyway");
        }

        let tensor_count = reader.read_u64::<LittleEndian>()?;
        let metadata_count = reader.read_u64::<LittleEndian>()?;
        let header = GGUFHeader { version, tensor_count, metadata_count };

        let metadata = Self::read_metadata(&mut reader, metadata_count)?;
        let tensor_metadata = Self::read_tensor_metainfo(&mut reader, tensor_count)?;

        let alignment = match metadata.get(ALIGNMENT_KEY).and_then(GGUFValue::as_u64) {
            Some(alignment) if alignment > 0 => alignment,
            Some(_) => {
                tracing::warn!(target: "tensor_trace::loader", "zero {ALIGNMENT_KEY}; using {DEFAULT_ALIGNMENT}");
                DEFAULT_ALIGNMENT
            }
            None => DEFAULT_ALIGNMENT,
        };
        let consumed = (mmap.len() - reader.len()) as u64;
        let data_start = consumed.div_ceil(alignment) * alignment;

        tracing::debug!(
            target: "tensor_trace::loader",
            path = %file_path.display(),
            tensors = tensor_count,
            metadata = metadata_count,
            data_start,
            "parsed GGUF header"
        );

        let file_len = mmap.len() as u64;
        Ok(Self { header, metadata, tensor_metadata, data_start, file_path, file_len })
    }

    fn read_metadata(reader: &mut &[u8], count: u64) -> Result<GGUFMetadata, GGUFError> {
        let mut entries = FxHashMap::default();
        for _ in 0..count {
            let key = Self::read_string(reader)?;
            let value_type = reader.read_u32::<LittleEndian>()?;
            let value = Self::read_value(reader, value_type)?;
            entries.insert(key, value);
        }
        Ok(GGUFMetadata { entries })
    }

    fn read_string(reader: &mut &[u8]) -> Result<String, GGUFError> {
        let len = usize::try_from(reader.read_u64::<LittleEndian>()?).map_err(|_| GGUFError::InvalidData("string length"))?;
        if len > MAX_STRING_LEN {
            return Err(GGUFError::InvalidData("string longer than 1 MiB"));
        }

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;

        String::from_utf8(buf).map_err(|_| GGUFError::InvalidData("string is not UTF-8"))
    }

    fn read_value(reader: &mut &[u8], value_type: u32) -> Result<GGUFValue, GGUFError> {
        let value = match value_type {
            0 => GGUFValue::U8(reader.read_u8()?),
            1 => GGUFValue::I8(reader.read_i8()?),
            2 => GGUFValue::U16(reader.read_u16::<LittleEndian>()?),
            3 => GGUFValue::I16(reader.read_i16::<LittleEndian>()?),
            4 => GGUFValue::U32(reader.read_u32::<LittleEndian>()?),
            5 => GGUFValue::I32(reader.read_i32::<LittleEndian>()?),
            6 => GGUFValue::F32(reader.read_f32::<LittleEndian>()?),
            7 => GGUFValue::Bool(reader.read_u8()? != 0),
            8 => GGUFValue::String(Self::read_string(reader)?),
            9 => {
                let element_type = reader.read_u32::<LittleEndian>()?;
                let len = usize::try_from(reader.read_u64::<LittleEndian>()?).map_err(|_| GGUFError::InvalidData("array length"))?;
                if len > MAX_ARRAY_LEN {
                    return Err(GGUFError::InvalidData("array longer than 1Mi elements"));
                }
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(Self::read_value(reader, element_type)?);
                }
                GGUFValue::Array(values)
            }
            10 => GGUFValue::U64(reader.read_u64::<LittleEndian>()?),
            11 => GGUFValue::I64(reader.read_i64::<LittleEndian>()?),
            12 => GGUFValue::F64(reader.read_f64::<LittleEndian>()?),
            other => return Err(GGUFError::UnknownValueType(other)),
        };
        Ok(value)
    }

    fn read_tensor_metainfo(reader: &mut &[u8], count: u64) -> Result<Vec<GGUFTensorInfo>, GGUFError> {
        let mut tensors = Vec::new();
        for _ in 0..count {
            let name = Self::read_string(reader)?;
            let n_dims = reader.read_u32::<LittleEndian>()?;
            if n_dims > MAX_DIMENSIONS {
                return Err(GGUFError::TooManyDimensions { name, n_dims });
            }
            let mut dimensions = Vec::with_capacity(n_dims as usize);
            for _ in 0..n_dims {
                dimensions.push(reader.read_u64::<LittleEndian>()?);
            }
            let data_type = GGUFDataType::from_u32(reader.read_u32::<LittleEndian>()?);
            let offset = reader.read_u64::<LittleEndian>()?;

            tensors.push(GGUFTensorInfo { name, dimensions, data_type, offset });
        }
        Ok(tensors)
    }

    /// Absolute file offset of `tensor`'s first byte.
    #[must_use]
    pub fn absolute_offset(&self, tensor: &GGUFTensorInfo) -> u64 {
        self.data_start.saturating_add(tensor.offset)
    }

    /// Whether `tensor`'s bytes lie inside the file. Unknown sizes count as in bounds.
    #[must_use]
    pub fn tensor_in_bounds(&self, tensor: &GGUFTensorInfo) -> bool {
        tensor.size_bytes().is_none_or(|size| self.absolute_offset(tensor).checked_add(size).is_some_and(|end| end <= self.file_len))
    }
}

#[path = "file.test.rs"]
mod tests;

//! In-memory GGUF writer for tests.

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use byteorder::{LittleEndian, WriteBytesExt};

pub(crate) struct GGUFBuilder {
    version: u32,
    alignment: u64,
    metadata: Vec<u8>,
    metadata_count: u64,
    tensors: Vec<u8>,
    tensor_count: u64,
    data: Vec<u8>,
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    out.write_u64::<LittleEndian>(value.len() as u64).expect("vec write");
    out.extend_from_slice(value.as_bytes());
}

fn pad_to(out: &mut Vec<u8>, alignment: u64) {
    let len = out.len() as u64;
    out.resize((len.div_ceil(alignment) * alignment) as usize, 0);
}

impl GGUFBuilder {
    pub(crate) fn new() -> Self {
        Self { version: 3, alignment: 32, metadata: Vec::new(), metadata_count: 0, tensors: Vec::new(), tensor_count: 0, data: Vec::new() }
    }

    pub(crate) fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn kv_u32(mut self, key: &str, value: u32) -> Self {
        write_string(&mut self.metadata, key);
        self.metadata.write_u32::<LittleEndian>(4).expect("vec write");
        self.metadata.write_u32::<LittleEndian>(value).expect("vec write");
        self.metadata_count += 1;
        self
    }

    pub(crate) fn kv_string(mut self, key: &str, value: &str) -> Self {
        write_string(&mut self.metadata, key);
        self.metadata.write_u32::<LittleEndian>(8).expect("vec write");
        write_string(&mut self.metadata, value);
        self.metadata_count += 1;
        self
    }

    pub(crate) fn kv_string_array(mut self, key: &str, values: &[&str]) -> Self {
        write_string(&mut self.metadata, key);
        self.metadata.write_u32::<LittleEndian>(9).expect("vec write");
        self.metadata.write_u32::<LittleEndian>(8).expect("vec write");
        self.metadata.write_u64::<LittleEndian>(values.len() as u64).expect("vec write");
        for value in values {
            write_string(&mut self.metadata, value);
        }
        self.metadata_count += 1;
        self
    }

    /// Array of `u8` arrays, exercising nested array parsing.
    pub(crate) fn kv_nested_bytes(mut self, key: &str, rows: &[&[u8]]) -> Self {
        write_string(&mut self.metadata, key);
        self.metadata.write_u32::<LittleEndian>(9).expect("vec write");
        self.metadata.write_u32::<LittleEndian>(9).expect("vec write");
        self.metadata.write_u64::<LittleEndian>(rows.len() as u64).expect("vec write");
        for row in rows {
            self.metadata.write_u32::<LittleEndian>(0).expect("vec write");
            self.metadata.write_u64::<LittleEndian>(row.len() as u64).expect("vec write");
            self.metadata.extend_from_slice(row);
        }
        self.metadata_count += 1;
        self
    }

    pub(crate) fn alignment(mut self, alignment: u32) -> Self {
        self.alignment = u64::from(alignment);
        self.kv_u32("general.alignment", alignment)
    }

    /// Append a tensor whose bytes are `data`, placed at the next aligned data offset.
    pub(crate) fn tensor(mut self, name: &str, dims: &[u64], data_type: u32, data: &[u8]) -> Self {
        pad_to(&mut self.data, self.alignment);
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(data);

        write_string(&mut self.tensors, name);
        self.tensors.write_u32::<LittleEndian>(dims.len() as u32).expect("vec write");
        for dim in dims {
            self.tensors.write_u64::<LittleEndian>(*dim).expect("vec write");
        }
        self.tensors.write_u32::<LittleEndian>(data_type).expect("vec write");
        self.tensors.write_u64::<LittleEndian>(offset).expect("vec write");
        self.tensor_count += 1;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut out = b"GGUF".to_vec();
        out.write_u32::<LittleEndian>(self.version).expect("vec write");
        out.write_u64::<LittleEndian>(self.tensor_count).expect("vec write");
        out.write_u64::<LittleEndian>(self.metadata_count).expect("vec write");
        out.extend_from_slice(&self.metadata);
        out.extend_from_slice(&self.tensors);
        pad_to(&mut out, self.alignment);
        out.extend_from_slice(&self.data);
        out
    }

    pub(crate) fn write_temp(self, stem: &str) -> PathBuf {
        let path = temp_path(stem, "gguf");
        std::fs::write(&path, self.build()).expect("temporary gguf should be writable");
        path
    }
}

pub(crate) fn temp_path(stem: &str, extension: &str) -> PathBuf {
    let unique = SystemTime::now().duration_since(UNIX_EPOCH).expect("time went backwards").as_nanos();
    std::env::temp_dir().join(format!("tensor_trace_loader_{stem}_{unique}.{extension}"))
}

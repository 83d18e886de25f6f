#![cfg(test)]

use super::*;
use crate::gguf::fixture::{GGUFBuilder, temp_path};

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn tensor_bytes<'a>(raw: &'a [u8], gguf: &GGUFFile, tensor: &GGUFTensorInfo) -> &'a [u8] {
    let start = gguf.absolute_offset(tensor) as usize;
    let size = tensor.size_bytes().expect("known tensor type") as usize;
    &raw[start..start + size]
}

#[test]
fn parses_metadata_and_tensor_directory() {
    let embd = f32_bytes(&[1.0, 2.0, 3.0, 4.0]);
    let norm = f32_bytes(&[0.5, 0.25]);
    let path = GGUFBuilder::new()
        .kv_string("general.architecture", "llama")
        .kv_u32("llama.block_count", 2)
        .kv_string_array("tokenizer.ggml.tokens", &["<s>", "</s>"])
        .kv_nested_bytes("test.nested", &[&[1, 2], &[3]])
        .tensor("token_embd.weight", &[2, 2], 0, &embd)
        .tensor("blk.0.attn_norm.weight", &[2], 0, &norm)
        .write_temp("parse");

    let gguf = GGUFFile::load_mmap_and_get_metadata(&path).expect("fixture should parse");
    assert_eq!(gguf.header, GGUFHeader { version: 3, tensor_count: 2, metadata_count: 4 });
    assert_eq!(gguf.metadata.get("general.architecture"), Some(&GGUFValue::String("llama".into())));
    assert_eq!(gguf.metadata.get("llama.block_count").and_then(GGUFValue::as_u64), Some(2));
    assert_eq!(
        gguf.metadata.get("test.nested"),
        Some(&GGUFValue::Array(vec![
            GGUFValue::Array(vec![GGUFValue::U8(1), GGUFValue::U8(2)]),
            GGUFValue::Array(vec![GGUFValue::U8(3)]),
        ]))
    );

    assert_eq!(gguf.data_start % DEFAULT_ALIGNMENT, 0);
    let [embd_info, norm_info] = gguf.tensor_metadata.as_slice() else {
        panic!("expected two tensors");
    };
    assert_eq!(embd_info.offset, 0);
    assert_eq!(norm_info.offset, 32);
    assert_eq!(embd_info.size_bytes(), Some(16));
    assert_eq!(gguf.absolute_offset(norm_info), gguf.data_start + 32);
    let raw = std::fs::read(&path).expect("fixture readable");
    assert_eq!(gguf.file_len, raw.len() as u64);
    assert!(gguf.tensor_in_bounds(norm_info));
    assert_eq!(tensor_bytes(&raw, &gguf, embd_info), embd.as_slice());
    assert_eq!(tensor_bytes(&raw, &gguf, norm_info), norm.as_slice());

    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn honours_custom_alignment() {
    let data = f32_bytes(&[7.0; 3]);
    let path = GGUFBuilder::new().alignment(64).tensor("a", &[3], 0, &data).tensor("b", &[3], 0, &data).write_temp("align");

    let gguf = GGUFFile::load_mmap_and_get_metadata(&path).expect("fixture should parse");
    assert_eq!(gguf.data_start % 64, 0);
    assert_eq!(gguf.tensor_metadata[1].offset, 64);
    let raw = std::fs::read(&path).expect("fixture readable");
    assert_eq!(tensor_bytes(&raw, &gguf, &gguf.tensor_metadata[1]), data.as_slice());

    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn other_versions_still_parse() {
    let path = GGUFBuilder::new().version(2).tensor("a", &[1], 0, &f32_bytes(&[1.0])).write_temp("version");
    let gguf = GGUFFile::load_mmap_and_get_metadata(&path).expect("version 2 should parse with a warning");
    assert_eq!(gguf.header.version, 2);
    assert_eq!(gguf.tensor_metadata.len(), 1);
    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn rejects_bad_magic() {
    let path = temp_path("magic", "gguf");
    std::fs::write(&path, b"GGML\x03\x00\x00\x00").expect("write");
    match GGUFFile::load_mmap_and_get_metadata(&path) {
        Err(GGUFError::InvalidMagic(magic)) => assert_eq!(&magic, b"GGML"),
        other => panic!("expected invalid magic, got {other:?}"),
    }
    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn rejects_more_than_four_dimensions() {
    let path = GGUFBuilder::new().tensor("wide", &[1, 1, 1, 1, 1], 0, &f32_bytes(&[1.0])).write_temp("dims");
    match GGUFFile::load_mmap_and_get_metadata(&path) {
        Err(GGUFError::TooManyDimensions { name, n_dims }) => {
            assert_eq!(name, "wide");
            assert_eq!(n_dims, 5);
        }
        other => panic!("expected too many dimensions, got {other:?}"),
    }
    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn truncated_directory_is_an_io_error() {
    let mut bytes = GGUFBuilder::new().tensor("a", &[4], 0, &f32_bytes(&[0.0; 4])).build();
    bytes.truncate(30);
    let path = temp_path("truncated", "gguf");
    std::fs::write(&path, &bytes).expect("write");

    assert!(matches!(GGUFFile::load_mmap_and_get_metadata(&path), Err(GGUFError::Io(_))));
    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

#[test]
fn tensors_past_the_end_of_file_are_out_of_bounds() {
    let path = GGUFBuilder::new().tensor("short", &[64], 0, &f32_bytes(&[1.0])).tensor("odd", &[4], 4, &[0u8; 4]).write_temp("bounds");
    let gguf = GGUFFile::load_mmap_and_get_metadata(&path).expect("directory still parses");
    assert!(!gguf.tensor_in_bounds(&gguf.tensor_metadata[0]));
    assert!(gguf.tensor_in_bounds(&gguf.tensor_metadata[1]));
    std::fs::remove_file(&path).expect("temporary gguf should be removable");
}

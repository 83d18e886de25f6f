//! Static tensor layout table: where every tensor lives in the model file and what it is.

use std::{fmt, io::Write, path::Path};

use tensor_trace::{
    LayoutBuilder,
    layer::{known_layer, layer_id_from_name},
};

use crate::gguf::{GGUFDataType, GGUFError, GGUFFile};

pub const CSV_HEADER: &str = "tensor_name,file_offset,absolute_offset,size_bytes,layer_id,component_type,n_dims,dim0,dim1,dim2,dim3";

/// Semantic role of a tensor, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorComponent {
    TokenEmbeddings,
    OutputProjection,
    AttentionQ,
    AttentionK,
    AttentionV,
    AttentionOutput,
    AttentionNorm,
    FfnUp,
    FfnDown,
    FfnGate,
    FfnNorm,
    ExpertUp(u32),
    ExpertDown(u32),
    ExpertGate(u32),
    Expert,
    Other,
}

impl TensorComponent {
    /// First matching substring wins; `attn_output` is checked before the broader `output`.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        const PLAIN: &[(&str, TensorComponent)] = &[
            ("token_embd", TensorComponent::TokenEmbeddings),
            ("attn_output", TensorComponent::AttentionOutput),
            ("output", TensorComponent::OutputProjection),
            ("attn_q", TensorComponent::AttentionQ),
            ("attn_k", TensorComponent::AttentionK),
            ("attn_v", TensorComponent::AttentionV),
            ("attn_norm", TensorComponent::AttentionNorm),
            ("ffn_up", TensorComponent::FfnUp),
            ("ffn_down", TensorComponent::FfnDown),
            ("ffn_gate", TensorComponent::FfnGate),
            ("ffn_norm", TensorComponent::FfnNorm),
        ];

        if let Some((_, component)) = PLAIN.iter().find(|(pattern, _)| name.contains(pattern)) {
            return *component;
        }
        if !name.contains("expert") {
            return TensorComponent::Other;
        }

        let expert_id = name.find("expert_").and_then(|pos| {
            let digits: &str = &name[pos + "expert_".len()..];
            let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
            digits[..end].parse::<u32>().ok()
        });
        // Sub-kinds match whole `.`/`_`-separated tokens.
        let has_token = |token: &str| name.split(['.', '_']).any(|part| part == token);
        match expert_id {
            Some(id) if has_token("up") => TensorComponent::ExpertUp(id),
            Some(id) if has_token("down") => TensorComponent::ExpertDown(id),
            Some(id) if has_token("gate") => TensorComponent::ExpertGate(id),
            _ => TensorComponent::Expert,
        }
    }
}

impl fmt::Display for TensorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorComponent::TokenEmbeddings => f.write_str("Token Embeddings"),
            TensorComponent::OutputProjection => f.write_str("Output Projection"),
            TensorComponent::AttentionQ => f.write_str("Attention Q"),
            TensorComponent::AttentionK => f.write_str("Attention K"),
            TensorComponent::AttentionV => f.write_str("Attention V"),
            TensorComponent::AttentionOutput => f.write_str("Attention Output"),
            TensorComponent::AttentionNorm => f.write_str("Attention Norm"),
            TensorComponent::FfnUp => f.write_str("FFN Up"),
            TensorComponent::FfnDown => f.write_str("FFN Down"),
            TensorComponent::FfnGate => f.write_str("FFN Gate"),
            TensorComponent::FfnNorm => f.write_str("FFN Norm"),
            TensorComponent::ExpertUp(id) => write!(f, "MoE Expert {id} Up"),
            TensorComponent::ExpertDown(id) => write!(f, "MoE Expert {id} Down"),
            TensorComponent::ExpertGate(id) => write!(f, "MoE Expert {id} Gate"),
            TensorComponent::Expert => f.write_str("MoE Expert"),
            TensorComponent::Other => f.write_str("Other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TensorLayoutEntry {
    pub name: String,
    /// Offset within the tensor data section, as stored in the file.
    pub relative_offset: u64,
    pub absolute_offset: u64,
    /// `None` when the tensor type has no known block layout.
    pub size_bytes: Option<u64>,
    pub layer_id: u16,
    pub component: TensorComponent,
    pub dimensions: Vec<u64>,
    pub data_type: GGUFDataType,
}

#[derive(Debug, Clone, Default)]
pub struct TensorLayoutTable {
    pub data_start: u64,
    pub entries: Vec<TensorLayoutEntry>,
}

impl TensorLayoutTable {
    pub fn load(path: &Path) -> Result<Self, GGUFError> {
        let gguf = GGUFFile::load_mmap_and_get_metadata(path)?;
        let table = Self::from_gguf(&gguf);
        tracing::info!(target: "tensor_trace::loader", path = %path.display(), tensors = table.entries.len(), "extracted tensor layout");
        Ok(table)
    }

    #[must_use]
    pub fn from_gguf(gguf: &GGUFFile) -> Self {
        let entries = gguf
            .tensor_metadata
            .iter()
            .map(|info| {
                let size_bytes = info.size_bytes();
                if size_bytes.is_none() {
                    tracing::warn!(target: "tensor_trace::loader", tensor = %info.name, data_type = ?info.data_type, "unknown tensor type; size left blank");
                } else if !gguf.tensor_in_bounds(info) {
                    tracing::warn!(target: "tensor_trace::loader", tensor = %info.name, file_len = gguf.file_len, "tensor extends past the end of the file");
                }
                TensorLayoutEntry {
                    name: info.name.clone(),
                    relative_offset: info.offset,
                    absolute_offset: gguf.absolute_offset(info),
                    size_bytes,
                    layer_id: layer_id_from_name(&info.name),
                    component: TensorComponent::classify(&info.name),
                    dimensions: info.dimensions.clone(),
                    data_type: info.data_type,
                }
            })
            .collect();
        Self { data_start: gguf.data_start, entries }
    }

    /// One CSV row per tensor; missing layers are `-1`, missing dimensions `0`.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{CSV_HEADER}")?;
        for entry in &self.entries {
            let layer = known_layer(entry.layer_id).map_or(-1, i32::from);
            let size = entry.size_bytes.map(|s| s.to_string()).unwrap_or_default();
            let dim = |i: usize| entry.dimensions.get(i).copied().unwrap_or(0);
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{}",
                entry.name,
                entry.relative_offset,
                entry.absolute_offset,
                size,
                layer,
                entry.component,
                entry.dimensions.len(),
                dim(0),
                dim(1),
                dim(2),
                dim(3)
            )?;
        }
        Ok(())
    }

    /// Register every tensor's absolute offset; returns how many were accepted.
    pub fn populate_offsets(&self, builder: &mut LayoutBuilder) -> usize {
        self.entries.iter().filter(|entry| builder.register_disk_offset(&entry.name, entry.absolute_offset).is_ok()).count()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TensorLayoutEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

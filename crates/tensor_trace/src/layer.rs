//! Transformer layer derivation from tensor names.

/// Layer id recorded for tensors that do not belong to a numbered block.
pub const LAYER_NONE: u16 = u16::MAX;

const BLOCK_PREFIX: &str = "blk.";

/// Extract `N` from names of the form `blk.<N>` or `blk.<N>.<rest>`.
///
/// Anything else, including a non-numeric or out-of-range block number, yields [`LAYER_NONE`].
#[must_use]
pub fn layer_id_from_name(name: &str) -> u16 {
    let Some(rest) = name.strip_prefix(BLOCK_PREFIX) else {
        return LAYER_NONE;
    };
    let digits = rest.split('.').next().unwrap_or_default();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return LAYER_NONE;
    }
    match digits.parse::<u16>() {
        Ok(layer) if layer != LAYER_NONE => layer,
        _ => LAYER_NONE,
    }
}

/// `None` for [`LAYER_NONE`], the layer number otherwise.
#[inline]
#[must_use]
pub fn known_layer(layer_id: u16) -> Option<u16> {
    (layer_id != LAYER_NONE).then_some(layer_id)
}

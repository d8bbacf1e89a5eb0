//! Asset codec seam.
//!
//! Portraits, icons and other edited assets are kept in the overlay in their
//! editable form and encoded into the game's formats at export. The codec
//! does the encoding; the pipeline only decides when.

use mex_model::AssetKind;
use thiserror::Error;

/// Failure reported by an [`AssetCodec`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Converts assets between their editable and in-game forms.
pub trait AssetCodec: Send + Sync {
    fn encode(&self, kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Codec that keeps bytes unchanged. Rejects empty input so a truncated
/// import fails at export rather than in game.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCodec;

impl AssetCodec for PassthroughCodec {
    fn encode(&self, kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        if input.is_empty() {
            return Err(CodecError(format!("empty {kind}")));
        }
        Ok(input.to_vec())
    }

    fn decode(&self, _kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_keeps_bytes() {
        let codec = PassthroughCodec;
        let encoded = codec.encode(AssetKind::Portrait, b"png").unwrap();
        assert_eq!(encoded, b"png");
        assert_eq!(codec.decode(AssetKind::Portrait, &encoded).unwrap(), b"png");
    }

    #[test]
    fn passthrough_rejects_empty_assets() {
        let err = PassthroughCodec.encode(AssetKind::Icon, &[]).unwrap_err();
        assert_eq!(err.to_string(), "empty icon");
    }
}

//! Bundle wire format: base64 text of a gzip-compressed UTF-8 JSON object
//! mapping virtual paths to source strings.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::bundle::{SourceLayout, SourceMap};

/// Literal accepted in place of a bundle to select the built-in test package.
pub const SELFTEST_TOKEN: &str = "__SELFTEST__";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("bundle is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("bundle is not a JSON object of path -> source strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// The two-file toy package `mypkg`, laid out for `layout`.
pub fn selftest_map(layout: &SourceLayout) -> SourceMap {
    let mut map = SourceMap::new();
    map.insert(
        format!("mypkg/{}.{}", layout.init_stem, layout.extension),
        "from .version import VERSION\n".to_string(),
    );
    map.insert(
        format!("mypkg/version.{}", layout.extension),
        "VERSION='0.1.0'\n".to_string(),
    );
    map
}

/// Decodes bundle text, honoring a configurable self-test token.
#[derive(Debug, Clone)]
pub struct BundleDecoder {
    selftest_token: String,
    layout: SourceLayout,
}

impl BundleDecoder {
    pub fn new(selftest_token: impl Into<String>, layout: SourceLayout) -> Self {
        Self {
            selftest_token: selftest_token.into(),
            layout,
        }
    }

    /// Decode one bundle.
    ///
    /// Blank input is an empty map. Whitespace inside the base64 text is
    /// ignored so wrapped bundle files decode as-is.
    pub fn decode(&self, text: &str) -> Result<SourceMap, DecodeError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SourceMap::new());
        }
        if trimmed == self.selftest_token {
            return Ok(selftest_map(&self.layout));
        }

        let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        let compressed = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;

        let mut raw = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .map_err(DecodeError::Decompress)?;

        let json = String::from_utf8(raw)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for BundleDecoder {
    fn default() -> Self {
        Self::new(SELFTEST_TOKEN, SourceLayout::default())
    }
}

/// Decode with the default self-test token and layout.
pub fn decode(text: &str) -> Result<SourceMap, DecodeError> {
    BundleDecoder::default().decode(text)
}

/// Encode a map into bundle text. Output is deterministic for a given map.
pub fn encode(map: &SourceMap) -> std::io::Result<String> {
    let json = serde_json::to_vec(map)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n\t ").unwrap().is_empty());
    }

    #[test]
    fn test_selftest_token() {
        let map = decode("  __SELFTEST__ ").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["mypkg/version.py"], "VERSION='0.1.0'\n");
        assert!(map.contains_key("mypkg/__init__.py"));
    }

    #[test]
    fn test_custom_selftest_token_and_layout() {
        let decoder = BundleDecoder::new("SELF", SourceLayout::new("mi", "__pkg__"));
        let map = decoder.decode("SELF").unwrap();
        assert!(map.contains_key("mypkg/__pkg__.mi"));
        assert!(decoder.decode("__SELFTEST__").is_err());
    }

    #[test]
    fn test_wrapped_bundle_decodes() {
        let mut map = SourceMap::new();
        map.insert("solo.py".into(), "X = 1\n".into());
        let encoded = encode(&map).unwrap();
        let (head, tail) = encoded.split_at(encoded.len() / 2);
        let wrapped = format!("{}\r\n{}\n", head, tail);
        assert_eq!(decode(&wrapped).unwrap(), map);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(decode("not base64 !!"), Err(DecodeError::Base64(_))));

        let not_gzip = base64::engine::general_purpose::STANDARD.encode(b"plain bytes");
        assert!(matches!(decode(&not_gzip), Err(DecodeError::Decompress(_))));

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"[1, 2]").unwrap();
        let array = base64::engine::general_purpose::STANDARD.encode(encoder.finish().unwrap());
        assert!(matches!(decode(&array), Err(DecodeError::Json(_))));
    }
}

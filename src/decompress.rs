//! Content-Encoding aware body decoding.

use std::io::Read;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Decode `body` according to a `Content-Encoding` header value.
///
/// `gzip`, `deflate` and `br` are matched case-insensitively. Missing or
/// unrecognized encodings return the body untouched, as does an empty body
/// (HEAD replies, 204s and bare redirects still carry the header).
pub fn decompress(body: &[u8], content_encoding: Option<&str>) -> Result<Bytes> {
    if body.is_empty() {
        return Ok(Bytes::new());
    }
    let encoding = content_encoding.map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("gzip") => decode_gzip(body),
        Some("deflate") => decode_deflate(body),
        Some("br") => decode_brotli(body),
        Some(other) if !other.is_empty() => {
            tracing::trace!(encoding = other, "unrecognized content-encoding, passing body through");
            Ok(Bytes::copy_from_slice(body))
        }
        _ => Ok(Bytes::copy_from_slice(body)),
    }
}

fn decode_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| Error::decompression(format!("gzip: {}", e)))?;
    Ok(Bytes::from(decoded))
}

// Servers label both zlib-wrapped and raw deflate streams as "deflate".
fn decode_deflate(data: &[u8]) -> Result<Bytes> {
    let mut decoded = Vec::new();
    if flate2::read::ZlibDecoder::new(data).read_to_end(&mut decoded).is_ok() {
        return Ok(Bytes::from(decoded));
    }
    decoded.clear();
    flate2::read::DeflateDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|e| Error::decompression(format!("deflate: {}", e)))?;
    Ok(Bytes::from(decoded))
}

fn decode_brotli(data: &[u8]) -> Result<Bytes> {
    let mut decoder = brotli::Decompressor::new(data, 4096);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| Error::decompression(format!("brotli: {}", e)))?;
    Ok(Bytes::from(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const PAYLOAD: &[u8] = b"{\"message\":\"hello hello hello hello\"}";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_identity_without_encoding() {
        assert_eq!(decompress(PAYLOAD, None).unwrap(), PAYLOAD);
        assert_eq!(decompress(PAYLOAD, Some("")).unwrap(), PAYLOAD);
        assert_eq!(decompress(PAYLOAD, Some("identity")).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_unknown_encoding_passes_through() {
        let compressed = gzip(PAYLOAD);
        assert_eq!(decompress(&compressed, Some("zstd")).unwrap(), compressed);
    }

    #[test]
    fn test_gzip_case_insensitive() {
        let compressed = gzip(PAYLOAD);
        assert_eq!(decompress(&compressed, Some("gzip")).unwrap(), PAYLOAD);
        assert_eq!(decompress(&compressed, Some("GZIP")).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_raw_deflate() {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(decompress(&compressed, Some("deflate")).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_zlib_wrapped_deflate() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(decompress(&compressed, Some("Deflate")).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_brotli() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 9, 22);
            writer.write_all(PAYLOAD).unwrap();
        }
        assert_eq!(decompress(&compressed, Some("br")).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_truncated_gzip_fails() {
        let compressed = gzip(PAYLOAD);
        let truncated = &compressed[..compressed.len() / 2];
        let err = decompress(truncated, Some("gzip")).unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
    }

    #[test]
    fn test_empty_body_with_encoding() {
        for encoding in ["gzip", "deflate", "br", "GZIP"] {
            assert!(decompress(b"", Some(encoding)).unwrap().is_empty());
        }
        let err = decompress(b"not gzip", Some("gzip")).unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
    }

    #[test]
    fn test_input_not_mutated() {
        let compressed = gzip(PAYLOAD);
        let before = compressed.clone();
        let _ = decompress(&compressed, Some("gzip")).unwrap();
        assert_eq!(compressed, before);
    }
}

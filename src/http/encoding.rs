//! Content-Encoding handling for buffered bodies.
//!
//! Bodies are decoded before classification and the enriched result is
//! encoded again with the same codec, so `Content-Encoding` stays truthful.
//! Decoded output is capped at the same limit as the buffered body.

use std::io::{Read, Write};

use axum::http::{header, HeaderMap};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("unsupported content-encoding {0:?}")]
    Unsupported(String),

    #[error("decoded {codec:?} body exceeds {limit} bytes")]
    TooLarge { codec: Codec, limit: usize },

    #[error("decode {codec:?} body: {source}")]
    Decode {
        codec: Codec,
        #[source]
        source: std::io::Error,
    },

    #[error("encode {codec:?} body: {source}")]
    Encode {
        codec: Codec,
        #[source]
        source: std::io::Error,
    },
}

/// Byte-level framing of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Identity,
    Gzip,
    /// `deflate` as RFC 9110 defines it (zlib container).
    Zlib,
    /// Bare deflate stream, which some servers send for `deflate`.
    RawDeflate,
}

/// The `Content-Encoding` declared on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Other(String),
}

impl ContentEncoding {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(header::CONTENT_ENCODING) else {
            return ContentEncoding::Identity;
        };
        let Ok(value) = value.to_str() else {
            return ContentEncoding::Other(String::from_utf8_lossy(value.as_bytes()).into_owned());
        };

        let codings: Vec<String> = value
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty() && c != "identity")
            .collect();

        match codings.as_slice() {
            [] => ContentEncoding::Identity,
            [single] if single == "gzip" || single == "x-gzip" => ContentEncoding::Gzip,
            [single] if single == "deflate" => ContentEncoding::Deflate,
            _ => ContentEncoding::Other(value.to_string()),
        }
    }

    /// Decode `body` into at most `limit` bytes, reporting which codec matched.
    pub fn decode(&self, body: &[u8], limit: usize) -> Result<(Vec<u8>, Codec), EncodingError> {
        match self {
            ContentEncoding::Identity => {
                Codec::Identity.decode(body, limit).map(|b| (b, Codec::Identity))
            }
            ContentEncoding::Gzip => Codec::Gzip.decode(body, limit).map(|b| (b, Codec::Gzip)),
            ContentEncoding::Deflate => match Codec::Zlib.decode(body, limit) {
                Ok(b) => Ok((b, Codec::Zlib)),
                Err(e @ EncodingError::TooLarge { .. }) => Err(e),
                Err(_) => Codec::RawDeflate
                    .decode(body, limit)
                    .map(|b| (b, Codec::RawDeflate)),
            },
            ContentEncoding::Other(name) => Err(EncodingError::Unsupported(name.clone())),
        }
    }
}

impl Codec {
    /// Decode `body`, failing with `TooLarge` once the output passes `limit`.
    pub fn decode(self, body: &[u8], limit: usize) -> Result<Vec<u8>, EncodingError> {
        let cap = (limit as u64).saturating_add(1);
        let mut out = Vec::new();
        let result = match self {
            Codec::Identity => body.take(cap).read_to_end(&mut out),
            Codec::Gzip => GzDecoder::new(body).take(cap).read_to_end(&mut out),
            Codec::Zlib => ZlibDecoder::new(body).take(cap).read_to_end(&mut out),
            Codec::RawDeflate => DeflateDecoder::new(body).take(cap).read_to_end(&mut out),
        };
        result.map_err(|source| EncodingError::Decode { codec: self, source })?;
        if out.len() > limit {
            return Err(EncodingError::TooLarge { codec: self, limit });
        }
        Ok(out)
    }

    pub fn encode(self, body: &[u8]) -> Result<Vec<u8>, EncodingError> {
        let err = |source| EncodingError::Encode { codec: self, source };
        match self {
            Codec::Identity => Ok(body.to_vec()),
            Codec::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(body).map_err(err)?;
                encoder.finish().map_err(err)
            }
            Codec::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(body).map_err(err)?;
                encoder.finish().map_err(err)
            }
            Codec::RawDeflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(body).map_err(err)?;
                encoder.finish().map_err(err)
            }
        }
    }
}

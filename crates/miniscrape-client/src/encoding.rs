//! Text encoding normalization for fetched pages.
//!
//! Detection order: byte-order mark, transport charset (HTTP `Content-Type`),
//! `<meta charset>` / `http-equiv` prescan of the first 1024 bytes, then
//! "valid UTF-8 is UTF-8, anything else is windows-1252".

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;

/// Number of leading bytes inspected for a `<meta>` charset declaration.
pub const PRESCAN_LEN: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).expect("valid regex")
});

/// Where the detected encoding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Bom,
    Transport,
    Meta,
    Utf8Valid,
    Fallback,
}

/// Detect the encoding of an HTML byte stream.
pub fn detect_encoding(
    bytes: &[u8],
    transport_charset: Option<&str>,
) -> (&'static Encoding, EncodingSource) {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return (encoding, EncodingSource::Bom);
    }

    if let Some(encoding) = transport_charset.and_then(|label| Encoding::for_label(label.as_bytes())) {
        return (encoding, EncodingSource::Transport);
    }

    let head = &bytes[..bytes.len().min(PRESCAN_LEN)];
    if let Some(encoding) = META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        // A document cannot declare itself UTF-16 in ASCII-compatible markup.
        return (encoding.output_encoding(), EncodingSource::Meta);
    }

    if std::str::from_utf8(bytes).is_ok() {
        (UTF_8, EncodingSource::Utf8Valid)
    } else {
        (WINDOWS_1252, EncodingSource::Fallback)
    }
}

/// Decode fetched bytes to UTF-8 text. Never fails.
pub fn decode_html(bytes: &[u8], transport_charset: Option<&str>) -> String {
    if bytes.is_empty() {
        tracing::warn!("Unable to determine the encoding of empty content");
        return String::new();
    }

    let (encoding, source) = detect_encoding(bytes, transport_charset);
    tracing::trace!(encoding = encoding.name(), ?source, "Found encoding");

    // `decode` strips a BOM matching the encoding.
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "Malformed byte sequences replaced while decoding"
        );
    }
    text.into_owned()
}

/// Extract the `charset` parameter of a `Content-Type` header value.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|v| !v.is_empty())
    })
}

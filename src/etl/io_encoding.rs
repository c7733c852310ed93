// Decoding of the election exports.
//
// The Division of Elections files are not consistently encoded: most are plain ASCII, some
// older ones use Latin-1 or Windows-1252 for accented candidate names.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::etl::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Encoding {
    Utf8,
    Latin1,
    Cp1252,
}

impl Encoding {
    pub const DEFAULT_ORDER: [Encoding; 3] = [Encoding::Utf8, Encoding::Latin1, Encoding::Cp1252];

    pub fn parse(label: &str) -> EtlResult<Encoding> {
        match label.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            "cp1252" | "windows-1252" => Ok(Encoding::Cp1252),
            _ => UnknownEncodingSnafu { label }.fail(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
            Encoding::Cp1252 => "cp1252",
        }
    }

    /// Decodes the content, or None if the bytes are not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            // The C1 control range is never produced by a Latin-1 export. Seeing one of these
            // bytes means the file is most likely Windows-1252 (curly quotes, dashes).
            Encoding::Latin1 if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) => None,
            Encoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Encoding::Cp1252 => {
                let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
                if had_errors {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

pub fn parse_encodings(labels: &[String]) -> EtlResult<Vec<Encoding>> {
    labels.iter().map(|l| Encoding::parse(l)).collect()
}

/// Tries the encodings in order and returns the first successful decoding.
pub fn decode_with_fallback(bytes: &[u8], encodings: &[Encoding]) -> Option<(String, Encoding)> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    for enc in encodings {
        match enc.decode(bytes) {
            Some(text) => return Some((text.into_owned(), *enc)),
            None => debug!("decode_with_fallback: not valid {}", enc.label()),
        }
    }
    None
}

pub fn read_with_fallback(path: &Path, encodings: &[Encoding]) -> BEtlResult<(String, Encoding)> {
    let path_s = path.display().to_string();
    let bytes = fs::read(path).context(OpeningFileSnafu { path: path_s.clone() })?;
    match decode_with_fallback(&bytes, encodings) {
        Some((text, enc)) => {
            debug!("read_with_fallback: read {} with {}", path_s, enc.label());
            Ok((text, enc))
        }
        None => {
            let labels: Vec<&str> = encodings.iter().map(|e| e.label()).collect();
            Err(Box::new(EtlError::EncodingUnsupported {
                path: path_s,
                encodings: labels.join(", "),
            }))
        }
    }
}

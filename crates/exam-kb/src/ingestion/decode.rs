//! Byte decoding with GBK fallback

use encoding_rs::GBK;

/// Decoded lines plus how many had to be dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedLines {
    pub lines: Vec<String>,
    pub skipped: usize,
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data)
}

fn decode_gbk(data: &[u8]) -> Option<String> {
    GBK.decode_without_bom_handling_and_without_replacement(data)
        .map(|s| s.into_owned())
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Decode a text file: whole-file UTF-8, then whole-file GBK, then line by line.
///
/// GBK is only tried when most non-ASCII lines are not UTF-8; in a UTF-8 file a
/// damaged line is dropped rather than turning the file into GBK mojibake.
pub fn decode_text(data: &[u8]) -> DecodedLines {
    let data = strip_bom(data);

    if let Ok(text) = std::str::from_utf8(data) {
        return DecodedLines {
            lines: split_lines(text),
            skipped: 0,
        };
    }

    let gbk_fallback = mostly_foreign(data);
    if gbk_fallback {
        if let Some(text) = decode_gbk(data) {
            tracing::debug!("Decoded text as GBK");
            return DecodedLines {
                lines: split_lines(&text),
                skipped: 0,
            };
        }
    }

    tracing::debug!(
        "Mixed encodings, decoding per line (GBK fallback: {})",
        gbk_fallback
    );
    decode_per_line(data, gbk_fallback)
}

/// Best-effort UTF-8 decode for unknown formats
pub fn decode_utf8_lines(data: &[u8]) -> DecodedLines {
    decode_per_line(strip_bom(data), false)
}

fn raw_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split(|b| *b == b'\n')
        .map(|raw| raw.strip_suffix(b"\r").unwrap_or(raw))
}

/// Whether non-ASCII lines that fail UTF-8 outnumber those that pass
fn mostly_foreign(data: &[u8]) -> bool {
    let (mut utf8, mut foreign) = (0usize, 0usize);
    for raw in raw_lines(data).filter(|raw| !raw.is_ascii()) {
        if std::str::from_utf8(raw).is_ok() {
            utf8 += 1;
        } else {
            foreign += 1;
        }
    }
    foreign > utf8
}

fn decode_per_line(data: &[u8], gbk_fallback: bool) -> DecodedLines {
    let mut decoded = DecodedLines::default();

    for raw in raw_lines(data) {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => Some(s.to_string()),
            Err(_) if gbk_fallback => decode_gbk(raw),
            Err(_) => None,
        };
        match line {
            Some(line) => decoded.lines.push(line),
            None => decoded.skipped += 1,
        }
    }

    decoded
}

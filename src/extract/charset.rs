// src/extract/charset.rs
// =============================================================================
// Turns the raw bytes of a page into text.
//
// Where the encoding comes from, first hit wins:
// 1. A byte order mark
// 2. charset= in the Content-Type header
// 3. <meta charset="..."> or <meta http-equiv="Content-Type"
//    content="...; charset=..."> within the first 1024 bytes
// 4. UTF-8
//
// Many Chinese galleries are still GBK and only say so in a <meta> tag, so
// without step 3 a "下一页" link would never be recognised.
// =============================================================================

use encoding_rs::{Encoding, UTF_8};

// How far into the body we look for a <meta> charset
const META_SCAN_LIMIT: usize = 1024;

// Decodes a page body, replacing bytes that are invalid in the chosen encoding
pub(crate) fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = sniff_encoding(body, content_type);
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        log::debug!("Page body is not valid {}, bad bytes replaced", used.name());
    }
    text.into_owned()
}

fn sniff_encoding(body: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }

    content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| meta_charset(body))
        .unwrap_or(UTF_8)
}

// The encoding named by the first <meta> tag that names one
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SCAN_LIMIT)]);
    let lowered = head.to_ascii_lowercase();

    lowered.match_indices("<meta").find_map(|(start, _)| {
        let end = lowered[start..]
            .find('>')
            .map_or(lowered.len(), |offset| start + offset);
        charset_label(&head[start..end])
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            // A <meta> claiming UTF-16 cannot be right for bytes we just read as ASCII
            .map(Encoding::output_encoding)
    })
}

// The label after "charset=" in a header value or tag, without quotes
//
// "text/html; charset=GBK"   -> "GBK"
// r#"<meta charset="gbk""#   -> "gbk"
fn charset_label(text: &str) -> Option<&str> {
    let lowered = text.to_ascii_lowercase();
    lowered
        .match_indices("charset")
        .find_map(|(start, needle)| label_after(&text[start + needle.len()..]))
}

fn label_after(rest: &str) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let rest = rest.trim_start_matches(|c| c == '"' || c == '\'');
    let end = rest
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(rest.len());

    let label = &rest[..end];
    (!label.is_empty()).then_some(label)
}

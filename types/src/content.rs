//! Content-Type parsing and body decoding (C1).
//!
//! Pure, synchronous, side-effect-free: maps a `Content-Type` header value to a
//! semantic family and decodes raw bytes into a logical value, stripping CSRF
//! prefixes from JSON payloads along the way.

use serde_json::Value;

/// Semantic content family derived from a MIME main type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFamily {
    Json,
    Html,
    Css,
    Js,
    Image,
    Video,
    Audio,
    Font,
    Application,
    Archive,
    Text,
    /// Wildcard used in predicates only, never produced by decoding.
    Any,
}

/// A parsed `Content-Type` header: main type plus normalised parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContentType {
    pub main_type: String,
    pub charset: String,
    pub params: Vec<(String, String)>,
}

/// Parse a `Content-Type` value, e.g. `"text/html; charset=utf-8"`.
///
/// Unknown or empty input yields an empty `main_type` with the default charset.
#[must_use]
pub fn parse_content_type(content_type: &str) -> ParsedContentType {
    if content_type.trim().is_empty() {
        return ParsedContentType {
            main_type: String::new(),
            charset: "utf-8".to_string(),
            params: Vec::new(),
        };
    }

    let mut parts = content_type.to_ascii_lowercase().replace(' ', "");
    parts.retain(|c| c != '\r' && c != '\n');
    let mut segments = parts.split(';');
    let main_type = segments.next().unwrap_or_default().to_string();

    let mut charset = "utf-8".to_string();
    let mut params = Vec::new();
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        if let Some((key, value)) = segment.split_once('=') {
            let value = value.trim_matches(|c| c == '"' || c == '\'').to_string();
            if key == "charset" {
                charset = value.clone();
            }
            params.push((key.to_string(), value));
        } else {
            params.push((segment.to_string(), String::new()));
        }
    }

    ParsedContentType {
        main_type,
        charset,
        params,
    }
}

/// Map a normalised MIME main type to its semantic family.
#[must_use]
pub fn content_family(main_type: &str) -> ContentFamily {
    match main_type {
        "application/json" | "application/ld+json" | "application/vnd.api+json" => {
            ContentFamily::Json
        }
        "text/html" | "application/xhtml+xml" => ContentFamily::Html,
        "text/css" => ContentFamily::Css,
        "application/javascript" | "text/javascript" | "application/x-javascript" => {
            ContentFamily::Js
        }
        other if other.starts_with("image/") => ContentFamily::Image,
        other if other.starts_with("video/") => ContentFamily::Video,
        other if other.starts_with("audio/") => ContentFamily::Audio,
        other if other.starts_with("font/") || other.starts_with("application/font-") => {
            ContentFamily::Font
        }
        "application/zip"
        | "application/gzip"
        | "application/x-tar"
        | "application/x-7z-compressed"
        | "application/x-rar-compressed" => ContentFamily::Archive,
        other if other.starts_with("text/") => ContentFamily::Text,
        other if other.starts_with("application/") => ContentFamily::Application,
        "" => ContentFamily::Text,
        _ => ContentFamily::Text,
    }
}

/// A decoded response body.
#[derive(Debug, Clone)]
pub enum DecodedContent {
    Json(Value),
    Text(String),
    Blob { filename: String, bytes: Vec<u8> },
}

/// Decode raw bytes according to a `Content-Type` header (C1 entry point).
#[must_use]
pub fn decode(content: &[u8], content_type: &str) -> DecodedContent {
    let parsed = parse_content_type(content_type);
    let family = content_family(&parsed.main_type);

    match family {
        ContentFamily::Json => decode_json(content, &parsed.charset),
        ContentFamily::Image
        | ContentFamily::Video
        | ContentFamily::Audio
        | ContentFamily::Font
        | ContentFamily::Application
        | ContentFamily::Archive => DecodedContent::Blob {
            filename: format!("file{}", extension_for(&parsed.main_type)),
            bytes: content.to_vec(),
        },
        ContentFamily::Html | ContentFamily::Css | ContentFamily::Js | ContentFamily::Text => {
            decode_text_or_blob(content, &parsed.charset)
        }
        ContentFamily::Any => decode_text_or_blob(content, &parsed.charset),
    }
}

fn decode_json(content: &[u8], charset: &str) -> DecodedContent {
    let Some(text) = decode_charset(content, charset) else {
        return decode_text_or_blob(content, charset);
    };
    let stripped = strip_csrf_prefix(&text);
    match serde_json::from_str::<Value>(stripped) {
        Ok(value) => DecodedContent::Json(value),
        Err(_) => DecodedContent::Text(text),
    }
}

fn decode_text_or_blob(content: &[u8], charset: &str) -> DecodedContent {
    match decode_charset(content, charset) {
        Some(text) => DecodedContent::Text(text),
        None => DecodedContent::Blob {
            filename: "file.bin".to_string(),
            bytes: content.to_vec(),
        },
    }
}

fn decode_charset(content: &[u8], charset: &str) -> Option<String> {
    if charset.eq_ignore_ascii_case("utf-8") || charset.is_empty() {
        String::from_utf8(content.to_vec()).ok()
    } else {
        // Only UTF-8 is supported natively; anything else falls back to lossy
        // decoding rather than pulling in a full charset-conversion crate.
        Some(String::from_utf8_lossy(content).into_owned())
    }
}

fn extension_for(main_type: &str) -> &'static str {
    match main_type {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "font/woff2" => ".woff2",
        "font/woff" => ".woff",
        _ => ".bin",
    }
}

/// Strip a CSRF prefix (`)]}'`, `while(1);`, `for(;;);`, or anything else) from a
/// JSON payload by scanning for the first balanced JSON value.
///
/// Uses a stack-based tokenizer that tracks string/escape state so braces
/// inside string literals don't confuse the bracket matching. Falls back to
/// the original text unchanged if no balanced value is found.
#[must_use]
pub fn strip_csrf_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();

    for start in 0..bytes.len() {
        if bytes[start] != b'{' && bytes[start] != b'[' {
            continue;
        }

        let mut stack: Vec<u8> = Vec::new();
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (offset, &byte) in bytes[start..].iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match byte {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' | b'[' if !in_string => stack.push(byte),
                b'}' | b']' if !in_string => {
                    let Some(open) = stack.pop() else {
                        break;
                    };
                    let matches = (open == b'{' && byte == b'}') || (open == b'[' && byte == b']');
                    if !matches {
                        break;
                    }
                    if stack.is_empty() {
                        end = Some(start + offset + 1);
                        break;
                    }
                }
                _ => {}
            }
        }

        if let Some(end) = end {
            let candidate = &trimmed[start..end];
            if serde_json::from_str::<Value>(candidate).is_ok() {
                return candidate;
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_charset_param() {
        let parsed = parse_content_type("Text/HTML; charset=ISO-8859-1");
        assert_eq!(parsed.main_type, "text/html");
        assert_eq!(parsed.charset, "iso-8859-1");
    }

    #[test]
    fn defaults_to_utf8_charset() {
        let parsed = parse_content_type("application/json");
        assert_eq!(parsed.charset, "utf-8");
    }

    #[test]
    fn maps_families() {
        assert!(matches!(content_family("application/json"), ContentFamily::Json));
        assert!(matches!(content_family("image/png"), ContentFamily::Image));
        assert!(matches!(content_family("font/woff2"), ContentFamily::Font));
        assert!(matches!(content_family("text/plain"), ContentFamily::Text));
        assert!(matches!(content_family("application/octet-stream"), ContentFamily::Application));
    }

    #[test]
    fn strips_known_csrf_prefixes() {
        for prefix in [")]}'", "while(1);", "for(;;);"] {
            let input = format!("{prefix}{{\"a\":1}}");
            let stripped = strip_csrf_prefix(&input);
            assert_eq!(stripped, "{\"a\":1}");
        }
    }

    #[test]
    fn strips_unknown_prefix() {
        let input = "garbageprefix[1,2,3]";
        assert_eq!(strip_csrf_prefix(input), "[1,2,3]");
    }

    #[test]
    fn leaves_plain_json_untouched() {
        assert_eq!(strip_csrf_prefix("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let input = "prefix{\"a\":\"}broken}\"}";
        let stripped = strip_csrf_prefix(input);
        assert_eq!(stripped, "{\"a\":\"}broken}\"}");
    }

    #[test]
    fn decodes_json_with_prefix() {
        let body = b")]}'{\"ok\":true}";
        match decode(body, "application/json; charset=utf-8") {
            DecodedContent::Json(value) => assert_eq!(value["ok"], true),
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_text_on_invalid_json() {
        let body = b"not json at all";
        match decode(body, "application/json") {
            DecodedContent::Text(text) => assert_eq!(text, "not json at all"),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn decodes_binary_as_blob() {
        let body = vec![0xFF, 0xD8, 0xFF];
        match decode(&body, "image/jpeg") {
            DecodedContent::Blob { filename, bytes } => {
                assert_eq!(filename, "file.jpg");
                assert_eq!(bytes, body);
            }
            other => panic!("expected Blob, got {other:?}"),
        }
    }
}


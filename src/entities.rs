//! HTML entity decoding for scraped text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Named entities decoded by [`decode_entities`]. Anything not listed here
/// is left as-is.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("ndash", "–"),
    ("mdash", "—"),
    ("lsquo", "‘"),
    ("rsquo", "’"),
    ("ldquo", "“"),
    ("rdquo", "”"),
    ("hellip", "…"),
    ("bull", "•"),
    ("middot", "·"),
    ("deg", "°"),
    ("trade", "™"),
    ("copy", "©"),
    ("reg", "®"),
    ("frac12", "½"),
    ("frac14", "¼"),
    ("frac34", "¾"),
    ("times", "×"),
];

/// Longest entity this decoder recognises, `&` and `;` included.
const MAX_ENTITY_LEN: usize = 18;

static ENTITY_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,15})$").unwrap());

static UNICODE_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Decodes the common named entities plus decimal and hex numeric ones.
///
/// Decoding runs to a fixed point: whatever a decoded entity produces is fed
/// back through the decoder, so `&amp;lt;` becomes `<` and the output never
/// holds a decodable entity. Unknown names and invalid code points are kept
/// verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        push_decoded(&mut out, ch);
    }
    out
}

/// Appends `ch` and, when it closes an entity, replaces that entity with its
/// decoded text. `out` never contains a decodable entity on return.
fn push_decoded(out: &mut String, ch: char) {
    out.push(ch);
    if ch != ';' {
        return;
    }

    let mut window = out.len().saturating_sub(MAX_ENTITY_LEN);
    while !out.is_char_boundary(window) {
        window += 1;
    }
    let Some(start) = out[window..].rfind('&').map(|i| window + i) else {
        return;
    };

    let body = &out[start + 1..out.len() - 1];
    if !ENTITY_BODY_RE.is_match(body) {
        return;
    }
    if let Some(decoded) = decode_one(body) {
        out.truncate(start);
        for decoded_ch in decoded.chars() {
            push_decoded(out, decoded_ch);
        }
    }
}

fn decode_one(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, value)| value.to_string())
}

/// Cleans text lifted out of inline-script JSON: literal `\n`, `\"`, `\/`
/// and `\uXXXX` escapes are resolved, entities decoded, blanks collapsed.
pub fn clean_escaped_text(text: &str) -> String {
    let unescaped = UNICODE_ESCAPE_RE.replace_all(text, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    let unescaped = unescaped
        .replace("\\n", "\n")
        .replace("\\r", "")
        .replace("\\t", " ")
        .replace("\\\"", "\"")
        .replace("\\/", "/")
        .replace("\\'", "'");

    let decoded = decode_entities(&unescaped);
    decoded
        .lines()
        .map(|line| WHITESPACE_RE.replace_all(line.trim(), " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_entities() {
        assert_eq!(decode_entities("&amp;&lt;&gt;"), "&<>");
        assert_eq!(decode_entities("&quot;hi&quot; &#39;there&#39;"), "\"hi\" 'there'");
        assert_eq!(decode_entities("350&deg;F &ndash; 20 min&hellip;"), "350°F – 20 min…");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("&#233;clair"), "éclair");
        assert_eq!(decode_entities("&#x1F355; night"), "🍕 night");
        assert_eq!(decode_entities("&#X27;"), "'");
    }

    #[test]
    fn test_unknown_entities_are_kept() {
        assert_eq!(decode_entities("&foo;"), "&foo;");
        assert_eq!(decode_entities("salt & pepper"), "salt & pepper");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
    }

    #[test]
    fn test_double_encoded_entities() {
        assert_eq!(decode_entities("&amp;lt;"), "<");
        assert_eq!(decode_entities("&amp;amp;amp;"), "&");
        assert_eq!(decode_entities("Mac &amp;amp; Cheese"), "Mac & Cheese");
        // Decoded characters can complete an entity that follows them
        assert_eq!(decode_entities("&&#35;38;"), "&");
        assert_eq!(decode_entities("&amp&#59;"), "&");
    }

    #[test]
    fn test_idempotent_on_decoded_text() {
        let samples = [
            "&amp;&lt;&gt;",
            "2 cups flour &bull; 1 egg",
            "Bake at 350&deg;F &mdash; don&rsquo;t overbake",
            "&foo; &bar",
            "Mac &amp; cheese",
            "&amp;lt;",
            "&amp;amp;amp;",
            "&amp;foo;",
            "&#38;#38;",
            "plain text",
        ];
        for sample in samples {
            let once = decode_entities(sample);
            assert_eq!(decode_entities(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_clean_escaped_text() {
        let raw = r#"Garlic butter pasta 🍝\n\n2 cups pasta\nSay \"yum\" &amp; enjoy \u00e9"#;
        let cleaned = clean_escaped_text(raw);
        assert!(cleaned.starts_with("Garlic butter pasta"));
        assert!(cleaned.contains("\n2 cups pasta\n"));
        assert!(cleaned.contains("Say \"yum\" & enjoy é"));
    }
}

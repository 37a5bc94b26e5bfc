//! Plain-text rendering of post HTML.

/// Tags that separate words when stripped.
const BLOCK_TAGS: &[&str] = &["p", "br", "div", "li", "blockquote", "pre"];

/// Strip tags and decode common entities, collapsing whitespace.
///
/// Block-level tags become spaces so words from adjacent paragraphs do not
/// run together; inline tags (`<span>`, `<a>`) vanish without a gap.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    result.push(' ');
                }
            }
            _ if in_tag => tag.push(ch),
            '&' => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                push_entity(&mut result, &entity);
            }
            _ if in_entity => {
                entity.push(ch);
                // not an entity after all
                if entity.len() > 10 || ch.is_whitespace() {
                    in_entity = false;
                    result.push('&');
                    result.push_str(&entity);
                }
            }
            _ => result.push(ch),
        }
    }

    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

fn push_entity(result: &mut String, entity: &str) {
    match entity {
        "amp" => result.push('&'),
        "lt" => result.push('<'),
        "gt" => result.push('>'),
        "quot" => result.push('"'),
        "apos" => result.push('\''),
        "nbsp" => result.push(' '),
        _ if entity.starts_with('#') => {
            if let Some(c) = parse_numeric_entity(entity).and_then(char::from_u32) {
                result.push(c);
            }
        }
        _ => {
            result.push('&');
            result.push_str(entity);
            result.push(';');
        }
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|dec| dec.parse().ok())
    }
}

//! Leading `---` front matter blocks.

use docweave_shared::FrontMatter;

/// Split a leading front matter block off `raw`.
///
/// Returns the parsed fields and the remaining body. Nothing is split off when
/// the text does not open with `---`, the block is never closed, or any
/// non-blank line in it is not a `key: value` pair. In those cases the
/// markers are thematic breaks around ordinary content.
pub(crate) fn split(raw: &str) -> (Option<FrontMatter>, &str) {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let block = &rest[..offset];
            if !is_field_block(block) {
                return (None, raw);
            }
            let body = &rest[offset + line.len()..];
            return (Some(parse_fields(block)), body);
        }
        offset += line.len();
    }

    (None, raw)
}

fn is_field_block(block: &str) -> bool {
    let mut lines = block.lines().filter(|line| !line.trim().is_empty()).peekable();
    lines.peek().is_some() && lines.all(is_field_line)
}

fn is_field_line(line: &str) -> bool {
    line.split_once(':').is_some_and(|(key, _)| {
        let key = key.trim();
        !key.is_empty() && !key.starts_with('#') && !key.contains(char::is_whitespace)
    })
}

fn parse_fields(block: &str) -> FrontMatter {
    let fields = block
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() || key.starts_with('#') {
                return None;
            }
            Some((key.to_string(), unquote(value.trim())))
        })
        .collect();

    FrontMatter { fields }
}

/// Strip matching quotes, undoing `\"` and `\\` inside double quotes.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\");
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].replace("''", "'");
    }
    value.to_string()
}

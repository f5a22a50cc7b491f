use gallery_core::Item;
use sha2::{Digest, Sha256};
use url::Url;

const MAX_STEM_CHARS: usize = 80;
const DEFAULT_EXTENSION: &str = "jpg";

/// Windows-safe relative path for one downloaded item.
///
/// Prefers the scraper-supplied filename, then the last URL path segment,
/// then `image-{n}--{short_hash(url)}.jpg`. `folder` is prepended when set.
pub fn download_filename(item: &Item, position: usize, folder: Option<&str>) -> String {
    let name = item
        .filename
        .as_deref()
        .and_then(sanitize_filename)
        .or_else(|| filename_from_url(&item.url))
        .unwrap_or_else(|| {
            format!(
                "image-{}--{}.{DEFAULT_EXTENSION}",
                position + 1,
                short_hash(&item.url)
            )
        });

    let folder = folder
        .map(|raw| {
            raw.split(['/', '\\'])
                .filter_map(sanitize_component)
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|folder| !folder.is_empty());

    match folder {
        Some(folder) => format!("{folder}/{name}"),
        None => name,
    }
}

fn filename_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    sanitize_filename(segment)
}

/// Sanitize a filename, keeping (or adding) an extension.
fn sanitize_filename(raw: &str) -> Option<String> {
    let (stem, extension) = match raw.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
        _ => (raw, DEFAULT_EXTENSION),
    };
    let stem = sanitize_component(stem)?;
    let extension = sanitize_component(extension).unwrap_or_else(|| DEFAULT_EXTENSION.into());
    Some(format!("{stem}.{}", extension.to_ascii_lowercase()))
}

fn sanitize_component(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return None;
    }

    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars().take(MAX_STEM_CHARS) {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    Some(compacted)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

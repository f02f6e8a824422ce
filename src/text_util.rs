use std::path::{Path, PathBuf};

/// Split `s` into `segments` contiguous pieces of near-equal length.
///
/// When the length does not divide evenly, the leading pieces take one
/// extra character each. Returns `None` if `segments` is zero or larger
/// than the number of characters in `s`, since some pieces would be empty.
pub fn partition_string(s: &str, segments: usize) -> Option<Vec<&str>> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    if segments == 0 || segments > chars.len() {
        return None;
    }

    let base = chars.len() / segments;
    let extra = chars.len() % segments;

    let mut parts = Vec::with_capacity(segments);
    let mut start = 0;
    for i in 0..segments {
        let len = base + usize::from(i < extra);
        let end = start + len;
        let byte_start = chars[start].0;
        let byte_end = chars.get(end).map_or(s.len(), |(b, _)| *b);
        parts.push(&s[byte_start..byte_end]);
        start = end;
    }

    Some(parts)
}

/// Expand a leading `~` from `HOME` and make the path absolute against the
/// current working directory.
pub fn resolve_dir(path: &Path) -> std::io::Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    std::path::absolute(expanded)
}

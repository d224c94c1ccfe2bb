const FILE_PREFIX: &str = "checklist";
const FILE_EXTENSION: &str = ".json";

/// Maps a workspace path to the name of the remote checklist document.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`, runs of `_` collapse to
/// one and the result is lowercased. The root path (and the empty path) map
/// to the bare `checklist.json`.
pub fn sanitize_filename(path: &str) -> String {
    let mut safe = String::with_capacity(path.len());
    for ch in path.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' {
            ch.to_ascii_lowercase()
        } else {
            '_'
        };
        if mapped == '_' && safe.ends_with('_') {
            continue;
        }
        safe.push(mapped);
    }

    if safe.is_empty() || safe == "_" {
        format!("{FILE_PREFIX}{FILE_EXTENSION}")
    } else {
        format!("{FILE_PREFIX}-{safe}{FILE_EXTENSION}")
    }
}

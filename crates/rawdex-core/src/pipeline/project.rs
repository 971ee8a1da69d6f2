//! Project names derived from an image's ancestor directories.

/// Name of the `depth`-th parent directory of `path`.
///
/// Depth 1 is the directory containing the file. Depth 0 disables project
/// names. When the path runs out of `/` separators before the requested
/// directory is reached the name is empty; a missing separator in front of the
/// directory name itself means the name starts at the beginning of the path.
pub fn project_name(path: &str, depth: u16) -> &str {
    if depth == 0 {
        return "";
    }

    let mut end = path.len();
    for _ in 0..depth {
        match path[..end].rfind('/') {
            Some(pos) => end = pos,
            None => return "",
        }
    }
    let start = path[..end].rfind('/').map_or(0, |pos| pos + 1);
    &path[start..end]
}

//! Reading per-image data from a `.dop` sidecar next to the RAW file.

use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::parser::parse_reader;
use super::value::{get, DopGroup, DopValue};
use crate::error::DopError;
use crate::types::DopProperties;

/// Sidecar location: the image path with `.dop` appended.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut path = OsString::from(image.as_os_str());
    path.push(".dop");
    PathBuf::from(path)
}

/// Read the sidecar for `image`, falling back to defaults.
///
/// A missing or unreadable sidecar is silent. A sidecar that does not parse
/// is reported once. Missing keys or wrong value types yield the default rank.
pub fn read_dop_properties(image: &Path) -> DopProperties {
    let path = sidecar_path(image);
    let Ok(file) = File::open(&path) else {
        return DopProperties::default();
    };

    let document = match parse_reader(BufReader::new(file)) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Unable to parse DOP sidecar: {e}");
            return DopProperties::default();
        }
    };

    let name = basename(&image.to_string_lossy()).to_string();
    match find_rank(&document.value, &name) {
        Ok(Some(rank)) => DopProperties { rank },
        Ok(None) => DopProperties::default(),
        Err(e) => {
            tracing::trace!(path = %path.display(), "No rank in DOP sidecar: {e}");
            DopProperties::default()
        }
    }
}

/// Look up the rank of `name` under `Source → Items`.
///
/// Only the first item whose `Name` equals `name` is examined. Items that are
/// not groups, or have no string `Name`, are skipped.
pub fn find_rank(root: &DopValue, name: &str) -> Result<Option<i32>, DopError> {
    let items: &[DopValue] = root.get_path(&["Source", "Items"])?;

    for item in items {
        let Ok(group) = get::<&DopGroup>(item) else {
            continue;
        };
        let matches = group
            .get("Name")
            .and_then(|value| get::<&str>(value).ok())
            .is_some_and(|item_name| item_name == name);
        if matches {
            let rank = match group.get("Rank") {
                Some(value) => get::<i64>(value)?,
                None => return Err(DopError::MissingKey("Rank".to_string())),
            };
            return Ok(Some(rank as i32));
        }
    }
    Ok(None)
}

/// Last `/`-separated segment of `path`, or the whole path when there is no
/// separator or nothing follows the last one.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) if pos + 1 < path.len() => &path[pos + 1..],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dop::parse_document;

    fn root(input: &str) -> DopValue {
        parse_document(input.as_bytes()).unwrap().value
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/photos/P1010001.ORF")),
            PathBuf::from("/photos/P1010001.ORF.dop")
        );
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/a/b/c.ORF"), "c.ORF");
        assert_eq!(basename("c.ORF"), "c.ORF");
        assert_eq!(basename("/a/b/"), "/a/b/");
    }

    #[test]
    fn test_find_rank() {
        let doc = root("Sidecar = {Source = {Items = {{Name = \"file.ORF\", Rank = 3}}}}");
        assert_eq!(find_rank(&doc, "file.ORF").unwrap(), Some(3));
        assert_eq!(find_rank(&doc, "other.ORF").unwrap(), None);
    }

    #[test]
    fn test_first_match_wins() {
        let doc = root(
            "S = {Source = {Items = {{Name = \"f.ORF\", Rank = 1}, {Name = \"f.ORF\", Rank = 5}}}}",
        );
        assert_eq!(find_rank(&doc, "f.ORF").unwrap(), Some(1));
    }

    #[test]
    fn test_non_group_items_are_skipped() {
        let doc = root("S = {Source = {Items = {1, \"x\", {Name = \"f.ORF\", Rank = 2}}}}");
        assert_eq!(find_rank(&doc, "f.ORF").unwrap(), Some(2));
    }

    #[test]
    fn test_bad_rank_type_is_an_error() {
        let doc = root("S = {Source = {Items = {{Name = \"f.ORF\", Rank = \"oops\"}}}}");
        assert!(find_rank(&doc, "f.ORF").is_err());
    }

    #[test]
    fn test_missing_items() {
        let doc = root("S = {Source = {Other = 1}}");
        assert!(matches!(find_rank(&doc, "f.ORF"), Err(DopError::MissingKey(_))));
    }

    #[test]
    fn test_read_dop_properties_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("file.ORF");

        // No sidecar at all.
        assert_eq!(read_dop_properties(&image), DopProperties::default());

        std::fs::write(
            sidecar_path(&image),
            "Sidecar = {\n\tSource = {\n\t\tItems = {\n\t\t\t{\n\t\t\t\tName = \"file.ORF\",\n\t\t\t\tRank = 4,\n\t\t\t},\n\t\t},\n\t},\n}\n",
        )
        .unwrap();
        assert_eq!(read_dop_properties(&image).rank, 4);

        std::fs::write(sidecar_path(&image), "not a sidecar").unwrap();
        assert_eq!(read_dop_properties(&image), DopProperties::default());
    }
}

use std::fmt;

const ARCHIVE_EXTENSION: &str = ".warc.gz";
const HOST_MARKER: &str = "-ip-";

/// Short, stable identifier of one archive file
///
/// Derived from the archive path: the file name without `.warc.gz` and
/// without the crawler host suffix, e.g.
/// `crawl-data/CC-MAIN-2014-10/segments/.../CC-MAIN-20140305060628-00001-ip-10-183-142-35.ec2.internal.warc.gz`
/// becomes `CC-MAIN-20140305060628-00001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    /// Derives the key from an archive path or URL
    pub fn from_path(path: &str) -> Self {
        let path = path.trim();
        let base = path.rsplit('/').next().unwrap_or(path);
        let base = base.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(base);

        if let Some(cut) = base.find(HOST_MARKER) {
            return Self(base[..cut].to_string());
        }

        match timestamped_prefix(base) {
            Some(prefix) => Self(prefix.to_string()),
            None => Self(base.to_string()),
        }
    }

    /// Wraps an already derived key, e.g. one read back from the done-set
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Matches `CC-MAIN-<14 digits>-<5 digits>` at the start of a file name
///
/// The match must end at a non-digit; otherwise the 5 digits are the start of
/// a second timestamp and cutting there would merge distinct archives.
fn timestamped_prefix(base: &str) -> Option<&str> {
    const PREFIX: &str = "CC-MAIN-";
    let len = PREFIX.len() + 14 + 1 + 5;
    let candidate = base.get(..len)?;
    let rest = candidate.strip_prefix(PREFIX)?.as_bytes();

    let valid = rest[..14].iter().all(u8::is_ascii_digit)
        && rest[14] == b'-'
        && rest[15..].iter().all(u8::is_ascii_digit)
        && !base.as_bytes().get(len).is_some_and(u8::is_ascii_digit);
    valid.then_some(candidate)
}

use std::str::FromStr;

const MODE_TYPE_MASK: u32 = 0o170000;
const MODE_DIRECTORY: u32 = 0o040000;
const FLAG_GHOST: u32 = 0x40;

/// How a path is owned by a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FileType {
    #[default]
    File,
    Dir,
    /// Owned but not shipped in the payload (`%ghost`).
    Ghost,
}
impl FileType {
    /// Classify a file from its header mode and flags. Ghost wins over
    /// directory.
    pub fn from_mode_and_flags(mode: u32, flags: u32) -> Self {
        if flags & FLAG_GHOST != 0 {
            Self::Ghost
        } else if mode & MODE_TYPE_MASK == MODE_DIRECTORY {
            Self::Dir
        } else {
            Self::File
        }
    }

    /// Value of the `type` attribute; plain files carry none.
    pub fn as_attr(&self) -> Option<&'static str> {
        match self {
            Self::File => None,
            Self::Dir => Some("dir"),
            Self::Ghost => Some("ghost"),
        }
    }
}
impl FromStr for FileType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "file" => Ok(Self::File),
            "dir" => Ok(Self::Dir),
            "ghost" => Ok(Self::Ghost),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileEntry {
    /// Absolute path inside the installed system
    pub path: String,
    pub kind: FileType,
}
impl FileEntry {
    pub fn new(path: impl Into<String>, kind: FileType) -> Self {
        Self { path: path.into(), kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0o100755, 0, FileType::File)]
    #[case(0o040755, 0, FileType::Dir)]
    #[case(0o100644, 0x40, FileType::Ghost)]
    #[case(0o040755, 0x40, FileType::Ghost)]
    #[case(0o120777, 0x01, FileType::File)]
    fn test_from_mode_and_flags(#[case] mode: u32, #[case] flags: u32, #[case] expected: FileType) {
        assert_eq!(FileType::from_mode_and_flags(mode, flags), expected);
    }

    #[test]
    fn test_attr_round_trip() {
        for kind in [FileType::File, FileType::Dir, FileType::Ghost] {
            assert_eq!(kind.as_attr().unwrap_or("").parse::<FileType>(), Ok(kind));
        }
    }
}

//! Known header tags.
//!
//! The main header and the signature header number their tags
//! independently (`1000` is `NAME` in one and `SIZE` in the other), so each
//! gets its own enumeration. Anything not listed parses as `Unknown` and is
//! kept in the header without being interpreted.

macro_rules! tags {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            Unknown(u32),
        }
        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                match value {
                    $($value => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }
        }
        impl From<$name> for u32 {
            fn from(tag: $name) -> Self {
                match tag {
                    $($name::$variant => $value,)*
                    $name::Unknown(other) => other,
                }
            }
        }
    };
}

tags!(
    /// Main header tags used for repository metadata.
    Tag {
        Name = 1000,
        Version = 1001,
        Release = 1002,
        Epoch = 1003,
        Summary = 1004,
        Description = 1005,
        BuildTime = 1006,
        BuildHost = 1007,
        InstallTime = 1008,
        Size = 1009,
        Vendor = 1011,
        License = 1014,
        Packager = 1015,
        Group = 1016,
        Url = 1020,
        Arch = 1022,
        OldFilenames = 1027,
        FileSizes = 1028,
        FileModes = 1030,
        FileFlags = 1037,
        SourceRpm = 1044,
        ArchiveSize = 1046,
        ProvideName = 1047,
        RequireFlags = 1048,
        RequireName = 1049,
        RequireVersion = 1050,
        ConflictFlags = 1053,
        ConflictName = 1054,
        ConflictVersion = 1055,
        ChangelogTime = 1080,
        ChangelogName = 1081,
        ChangelogText = 1082,
        ObsoleteName = 1090,
        ProvideFlags = 1112,
        ProvideVersion = 1113,
        ObsoleteFlags = 1114,
        ObsoleteVersion = 1115,
        DirIndexes = 1116,
        BaseNames = 1117,
        DirNames = 1118,
        LongSize = 5009,
        RecommendName = 5046,
        RecommendVersion = 5047,
        RecommendFlags = 5048,
        SuggestName = 5049,
        SuggestVersion = 5050,
        SuggestFlags = 5051,
        SupplementName = 5052,
        SupplementVersion = 5053,
        SupplementFlags = 5054,
        EnhanceName = 5055,
        EnhanceVersion = 5056,
        EnhanceFlags = 5057,
    }
);

tags!(
    /// Signature header tags.
    SignatureTag {
        HeaderSignatures = 62,
        Sha1 = 269,
        LongSize = 270,
        LongArchiveSize = 271,
        Sha256 = 273,
        Size = 1000,
        Md5 = 1004,
        PayloadSize = 1007,
    }
);

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const SENSE_LESS: u32 = 0x02;
const SENSE_GREATER: u32 = 0x04;
const SENSE_EQUAL: u32 = 0x08;
const SENSE_COMPARE: u32 = SENSE_LESS | SENSE_GREATER | SENSE_EQUAL;
/// Legacy `PreReq:`, `Requires(pre)` and `Requires(post)`.
const SENSE_PREREQ: u32 = 0x40 | 0x200 | 0x400;

/// Version comparison of a dependency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flags {
    Lt,
    Gt,
    Eq,
    Le,
    Ge,
}
impl Flags {
    /// Decode the comparison bits of an RPM sense value.
    pub fn from_sense(sense: u32) -> Option<Self> {
        match sense & SENSE_COMPARE {
            SENSE_LESS => Some(Self::Lt),
            SENSE_GREATER => Some(Self::Gt),
            SENSE_EQUAL => Some(Self::Eq),
            s if s == SENSE_LESS | SENSE_EQUAL => Some(Self::Le),
            s if s == SENSE_GREATER | SENSE_EQUAL => Some(Self::Ge),
            _ => None,
        }
    }

    /// Metadata attribute form (`flags="GE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Eq => "EQ",
            Self::Le => "LE",
            Self::Ge => "GE",
        }
    }
}
impl FromStr for Flags {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "LT" => Self::Lt,
            "GT" => Self::Gt,
            "EQ" => Self::Eq,
            "LE" => Self::Le,
            "GE" => Self::Ge,
            _ => return Err(()),
        })
    }
}
impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One entry of a package relationship (`provides`, `requires`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub flags: Option<Flags>,
    pub epoch: Option<String>,
    pub version: Option<String>,
    pub release: Option<String>,
    /// Needed before the package's own scriptlets run (`pre="1"`).
    pub pre: bool,
}
impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build from the three parallel header arrays: name, sense flags and an
    /// `[epoch:]version[-release]` string.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_rpm::models::{Dependency, Flags};
    /// let dep = Dependency::from_header("glibc", 0x0c, "2.17-1");
    /// assert_eq!(dep.flags, Some(Flags::Ge));
    /// assert_eq!(dep.epoch.as_deref(), Some("0"));
    /// assert_eq!(dep.version.as_deref(), Some("2.17"));
    /// assert_eq!(dep.release.as_deref(), Some("1"));
    /// ```
    pub fn from_header(name: impl Into<String>, sense: u32, evr: &str) -> Self {
        let mut dependency = Self::new(name);
        dependency.flags = Flags::from_sense(sense);
        dependency.pre = sense & SENSE_PREREQ != 0;
        if !evr.is_empty() {
            let (epoch, rest) = match evr.split_once(':') {
                Some((epoch, rest)) => (epoch, rest),
                None => ("0", evr),
            };
            let (version, release) = match rest.rsplit_once('-') {
                Some((version, release)) => (version, Some(release.to_string())),
                None => (rest, None),
            };
            dependency.epoch = Some(epoch.to_string());
            dependency.version = Some(version.to_string());
            dependency.release = release;
        }
        dependency
    }

    /// `rpmlib(...)` capabilities are provided by rpm itself and never listed
    /// in repository metadata.
    pub fn is_rpmlib(&self) -> bool {
        self.name.starts_with("rpmlib(")
    }
}

/// The relationship lists carried by a package, in metadata order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Suggests,
    Enhances,
    Recommends,
    Supplements,
}
impl DependencyKind {
    pub const ALL: [DependencyKind; 8] = [
        Self::Provides,
        Self::Requires,
        Self::Conflicts,
        Self::Obsoletes,
        Self::Suggests,
        Self::Enhances,
        Self::Recommends,
        Self::Supplements,
    ];

    /// Local name of the `rpm:` element listing this relationship.
    pub fn element(&self) -> &'static str {
        match self {
            Self::Provides => "provides",
            Self::Requires => "requires",
            Self::Conflicts => "conflicts",
            Self::Obsoletes => "obsoletes",
            Self::Suggests => "suggests",
            Self::Enhances => "enhances",
            Self::Recommends => "recommends",
            Self::Supplements => "supplements",
        }
    }

    pub fn from_element(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.element() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    pub provides: Vec<Dependency>,
    pub requires: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
    pub obsoletes: Vec<Dependency>,
    pub suggests: Vec<Dependency>,
    pub enhances: Vec<Dependency>,
    pub recommends: Vec<Dependency>,
    pub supplements: Vec<Dependency>,
}
impl Relations {
    pub fn get(&self, kind: DependencyKind) -> &[Dependency] {
        match kind {
            DependencyKind::Provides => &self.provides,
            DependencyKind::Requires => &self.requires,
            DependencyKind::Conflicts => &self.conflicts,
            DependencyKind::Obsoletes => &self.obsoletes,
            DependencyKind::Suggests => &self.suggests,
            DependencyKind::Enhances => &self.enhances,
            DependencyKind::Recommends => &self.recommends,
            DependencyKind::Supplements => &self.supplements,
        }
    }

    pub fn get_mut(&mut self, kind: DependencyKind) -> &mut Vec<Dependency> {
        match kind {
            DependencyKind::Provides => &mut self.provides,
            DependencyKind::Requires => &mut self.requires,
            DependencyKind::Conflicts => &mut self.conflicts,
            DependencyKind::Obsoletes => &mut self.obsoletes,
            DependencyKind::Suggests => &mut self.suggests,
            DependencyKind::Enhances => &mut self.enhances,
            DependencyKind::Recommends => &mut self.recommends,
            DependencyKind::Supplements => &mut self.supplements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x00, None)]
    #[case(0x02, Some(Flags::Lt))]
    #[case(0x04, Some(Flags::Gt))]
    #[case(0x08, Some(Flags::Eq))]
    #[case(0x0a, Some(Flags::Le))]
    #[case(0x0c, Some(Flags::Ge))]
    #[case(0x4c, Some(Flags::Ge))]
    #[case(0x1000_0008, Some(Flags::Eq))]
    fn test_flags_from_sense(#[case] sense: u32, #[case] expected: Option<Flags>) {
        assert_eq!(Flags::from_sense(sense), expected);
    }

    #[rstest]
    #[case("", None, None, None)]
    #[case("1.7", Some("0"), Some("1.7"), None)]
    #[case("1.7-45.el7", Some("0"), Some("1.7"), Some("45.el7"))]
    #[case("2:1.7-45.el7", Some("2"), Some("1.7"), Some("45.el7"))]
    fn test_from_header_evr(
        #[case] evr: &str,
        #[case] epoch: Option<&str>,
        #[case] version: Option<&str>,
        #[case] release: Option<&str>,
    ) {
        let dep = Dependency::from_header("time", 0x08, evr);
        assert_eq!(dep.epoch.as_deref(), epoch);
        assert_eq!(dep.version.as_deref(), version);
        assert_eq!(dep.release.as_deref(), release);
    }

    #[rstest]
    #[case(0x40, true)]
    #[case(0x200, true)]
    #[case(0x400, true)]
    #[case(0x100, false)]
    #[case(0x08, false)]
    fn test_pre(#[case] sense: u32, #[case] pre: bool) {
        assert_eq!(Dependency::from_header("/bin/sh", sense, "").pre, pre);
    }

    #[test]
    fn test_is_rpmlib() {
        assert!(Dependency::new("rpmlib(CompressedFileNames)").is_rpmlib());
        assert!(!Dependency::new("libc.so.6()(64bit)").is_rpmlib());
    }

    #[test]
    fn test_kind_elements() {
        for kind in DependencyKind::ALL {
            assert_eq!(DependencyKind::from_element(kind.element()), Some(kind));
        }
        assert_eq!(DependencyKind::from_element("entry"), None);
    }
}

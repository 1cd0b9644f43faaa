use crate::error::{Error, ErrorKind};
use exn::OptionExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Name-Epoch-Version-Release-Architecture: a package's identity within a
/// repository.
///
/// Ordering is field-wise (name first), which is the order packages appear
/// in generated metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nevra {
    pub name: String,
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
}
impl Nevra {
    pub fn new(
        name: impl Into<String>,
        epoch: u32,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            epoch,
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
        }
    }
}

/// `name-[epoch:]version-release.arch`, the epoch only when non-zero.
impl Display for Nevra {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.epoch {
            0 => write!(f, "{}-{}-{}.{}", self.name, self.version, self.release, self.arch),
            epoch => write!(f, "{}-{epoch}:{}-{}.{}", self.name, self.version, self.release, self.arch),
        }
    }
}

/// Parses the [`Display`] form back, e.g. `time-1.7-45.el7.x86_64` or
/// `bash-1:4.2.46-34.el7.x86_64`.
///
/// # Examples
///
/// ```
/// use rpmrepo_rpm::models::Nevra;
/// let nevra: Nevra = "time-1.7-45.el7.x86_64".parse().unwrap();
/// assert_eq!(nevra, Nevra::new("time", 0, "1.7", "45.el7", "x86_64"));
/// ```
impl FromStr for Nevra {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ErrorKind::InvalidNevra(s.to_string());
        let (rest, arch) = s.rsplit_once('.').ok_or_raise(invalid)?;
        let (rest, release) = rest.rsplit_once('-').ok_or_raise(invalid)?;
        let (name, version) = rest.rsplit_once('-').ok_or_raise(invalid)?;
        let (epoch, version) = match version.split_once(':') {
            Some((epoch, version)) => (epoch.parse().ok().ok_or_raise(invalid)?, version),
            None => (0, version),
        };
        if [name, version, release, arch].iter().any(|part| part.is_empty()) {
            exn::bail!(invalid());
        }
        Ok(Self::new(name, epoch, version, release, arch))
    }
}

//! Synthetic RPM files for tests.
//!
//! [`Builder`] writes a lead, a signature header and a main header with
//! properly aligned data, followed by an opaque payload. The output parses
//! like a real package; nothing here can build an installable one.

use crate::header::{
    HEADER_MAGIC, SignatureTag, TYPE_BIN, TYPE_I18NSTRING, TYPE_INT16, TYPE_INT32, TYPE_STRING, TYPE_STRING_ARRAY, Tag,
};
use crate::lead::{LEAD_MAGIC, LEAD_SIZE, SIGNATURE_TYPE_HEADER};
use crate::models::DependencyKind;
use crate::parse::RELATIONS;
use sha2::{Digest as _, Sha256};

/// Builds RPM bytes field by field.
///
/// # Examples
///
/// ```
/// use rpmrepo_rpm::fixtures::Builder;
///
/// let bytes = Builder::new("hello", "2.10", "1.el7", "x86_64")
///     .file("/usr/bin/hello", 0o100755, 0)
///     .build();
/// let package = rpmrepo_rpm::parse(&bytes).unwrap();
/// assert_eq!(package.nevra.to_string(), "hello-2.10-1.el7.x86_64");
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    name: String,
    version: String,
    release: String,
    arch: String,
    epoch: Option<u32>,
    source: bool,
    summary: String,
    description: String,
    license: String,
    url: String,
    vendor: String,
    packager: String,
    group: String,
    build_host: String,
    build_time: u32,
    installed_size: u32,
    files: Vec<(String, u16, u32)>,
    old_filenames: Option<Vec<String>>,
    dependencies: Vec<(DependencyKind, String, u32, String)>,
    changelogs: Vec<(u32, String, String)>,
    unknown: Vec<(u32, Vec<u8>)>,
    without: Vec<Tag>,
    dirindex_override: Option<u32>,
    payload: Vec<u8>,
}

impl Builder {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            summary: format!("The {name} package"),
            description: format!("The {name} package, built for tests."),
            name,
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
            epoch: None,
            source: false,
            license: "MIT".to_string(),
            url: String::new(),
            vendor: String::new(),
            packager: String::new(),
            group: "Unspecified".to_string(),
            build_host: "localhost".to_string(),
            build_time: 1_400_000_000,
            installed_size: 0,
            files: Vec::new(),
            old_filenames: None,
            dependencies: Vec::new(),
            changelogs: Vec::new(),
            unknown: Vec::new(),
            without: Vec::new(),
            dirindex_override: None,
            payload: b"\x1f\x8b\x08\x00 not a real cpio archive".to_vec(),
        }
    }

    pub fn epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Mark as a source package (no `SOURCERPM` tag, lead type 1).
    pub fn source(mut self) -> Self {
        self.source = true;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn packager(mut self, packager: impl Into<String>) -> Self {
        self.packager = packager.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn build_host(mut self, build_host: impl Into<String>) -> Self {
        self.build_host = build_host.into();
        self
    }

    pub fn build_time(mut self, build_time: u32) -> Self {
        self.build_time = build_time;
        self
    }

    pub fn installed_size(mut self, size: u32) -> Self {
        self.installed_size = size;
        self
    }

    /// Add a file with its `st_mode` and rpm file flags (`0x40` is ghost).
    pub fn file(mut self, path: impl Into<String>, mode: u16, flags: u32) -> Self {
        self.files.push((path.into(), mode, flags));
        self
    }

    /// Store file names the pre-4.0 way, as full paths.
    pub fn old_filenames(mut self, paths: &[&str]) -> Self {
        self.old_filenames = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn dependency(
        mut self,
        kind: DependencyKind,
        name: impl Into<String>,
        flags: u32,
        evr: impl Into<String>,
    ) -> Self {
        self.dependencies.push((kind, name.into(), flags, evr.into()));
        self
    }

    /// Add a changelog entry. Call newest first, the order of a spec file.
    pub fn changelog(mut self, time: u32, author: impl Into<String>, text: impl Into<String>) -> Self {
        self.changelogs.push((time, author.into(), text.into()));
        self
    }

    /// Add a binary entry under a tag the parser doesn't know.
    pub fn unknown_tag(mut self, tag: u32, data: &[u8]) -> Self {
        self.unknown.push((tag, data.to_vec()));
        self
    }

    /// Leave a tag out of the main header.
    pub fn without_tag(mut self, tag: Tag) -> Self {
        self.without.push(tag);
        self
    }

    /// Replace the first directory index with an arbitrary value.
    pub fn corrupt_dirindex(mut self, index: u32) -> Self {
        self.dirindex_override = Some(index);
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let header = self.main_header();
        let signature = self.signature_header(&header);

        let mut bytes = self.lead();
        bytes.extend_from_slice(&signature);
        while bytes.len() % 8 != 0 {
            bytes.push(0);
        }
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    fn lead(&self) -> Vec<u8> {
        let mut lead = vec![0u8; LEAD_SIZE];
        lead[..4].copy_from_slice(&LEAD_MAGIC);
        lead[4] = 3;
        lead[6..8].copy_from_slice(&i16::from(self.source).to_be_bytes());
        lead[8..10].copy_from_slice(&1i16.to_be_bytes());
        let name = format!("{}-{}-{}", self.name, self.version, self.release);
        let len = name.len().min(65);
        lead[10..10 + len].copy_from_slice(&name.as_bytes()[..len]);
        lead[76..78].copy_from_slice(&1i16.to_be_bytes());
        lead[78..80].copy_from_slice(&SIGNATURE_TYPE_HEADER.to_be_bytes());
        lead
    }

    fn signature_header(&self, header: &[u8]) -> Vec<u8> {
        let digest = Sha256::digest(header);
        let mut writer = HeaderWriter::default();
        writer.int32s(SignatureTag::Size.into(), &[(header.len() + self.payload.len()) as u32]);
        // Not a real MD5, nothing verifies it.
        writer.binary(SignatureTag::Md5.into(), &digest[..16]);
        writer.int32s(SignatureTag::PayloadSize.into(), &[self.payload.len() as u32]);
        writer.string(SignatureTag::Sha256.into(), &hex::encode(digest));
        writer.finish()
    }

    fn main_header(&self) -> Vec<u8> {
        let mut writer = HeaderWriter {
            skip: self.without.iter().map(|&t| u32::from(t)).collect(),
            ..HeaderWriter::default()
        };
        writer.string(Tag::Name.into(), &self.name);
        writer.string(Tag::Version.into(), &self.version);
        writer.string(Tag::Release.into(), &self.release);
        if let Some(epoch) = self.epoch {
            writer.int32s(Tag::Epoch.into(), &[epoch]);
        }
        writer.i18n(Tag::Summary.into(), &self.summary);
        writer.i18n(Tag::Description.into(), &self.description);
        writer.int32s(Tag::BuildTime.into(), &[self.build_time]);
        writer.string(Tag::BuildHost.into(), &self.build_host);
        writer.int32s(Tag::Size.into(), &[self.installed_size]);
        if !self.vendor.is_empty() {
            writer.string(Tag::Vendor.into(), &self.vendor);
        }
        writer.string(Tag::License.into(), &self.license);
        if !self.packager.is_empty() {
            writer.string(Tag::Packager.into(), &self.packager);
        }
        writer.i18n(Tag::Group.into(), &self.group);
        if !self.url.is_empty() {
            writer.string(Tag::Url.into(), &self.url);
        }
        writer.string(Tag::Arch.into(), &self.arch);
        if !self.source {
            writer.string(
                Tag::SourceRpm.into(),
                &format!("{}-{}-{}.src.rpm", self.name, self.version, self.release),
            );
        }
        writer.int32s(Tag::ArchiveSize.into(), &[self.installed_size + 512]);
        self.write_files(&mut writer);
        self.write_dependencies(&mut writer);
        if !self.changelogs.is_empty() {
            let times: Vec<u32> = self.changelogs.iter().map(|c| c.0).collect();
            let authors: Vec<&str> = self.changelogs.iter().map(|c| c.1.as_str()).collect();
            let texts: Vec<&str> = self.changelogs.iter().map(|c| c.2.as_str()).collect();
            writer.int32s(Tag::ChangelogTime.into(), &times);
            writer.strings(Tag::ChangelogName.into(), &authors);
            writer.strings(Tag::ChangelogText.into(), &texts);
        }
        for (tag, data) in &self.unknown {
            writer.binary(*tag, data);
        }
        writer.finish()
    }

    fn write_files(&self, writer: &mut HeaderWriter) {
        let files: Vec<(String, u16, u32)> = match &self.old_filenames {
            Some(paths) => paths.iter().map(|p| (p.clone(), 0o100644, 0)).collect(),
            None => self.files.clone(),
        };
        if files.is_empty() {
            return;
        }
        writer.int32s(Tag::FileSizes.into(), &vec![0; files.len()]);
        let modes: Vec<u16> = files.iter().map(|f| f.1).collect();
        writer.int16s(Tag::FileModes.into(), &modes);
        let flags: Vec<u32> = files.iter().map(|f| f.2).collect();
        writer.int32s(Tag::FileFlags.into(), &flags);

        if let Some(paths) = &self.old_filenames {
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            writer.strings(Tag::OldFilenames.into(), &paths);
            return;
        }
        let mut dirnames: Vec<&str> = Vec::new();
        let mut dirindexes = Vec::new();
        let mut basenames = Vec::new();
        for (path, _, _) in &self.files {
            let (dir, base) = match path.rfind('/') {
                Some(i) => (&path[..=i], &path[i + 1..]),
                None => ("", path.as_str()),
            };
            let index = match dirnames.iter().position(|d| *d == dir) {
                Some(index) => index,
                None => {
                    dirnames.push(dir);
                    dirnames.len() - 1
                },
            };
            dirindexes.push(index as u32);
            basenames.push(base);
        }
        if let (Some(index), Some(first)) = (self.dirindex_override, dirindexes.first_mut()) {
            *first = index;
        }
        writer.int32s(Tag::DirIndexes.into(), &dirindexes);
        writer.strings(Tag::BaseNames.into(), &basenames);
        writer.strings(Tag::DirNames.into(), &dirnames);
    }

    fn write_dependencies(&self, writer: &mut HeaderWriter) {
        for (kind, name_tag, flags_tag, version_tag) in RELATIONS {
            let entries: Vec<_> = self.dependencies.iter().filter(|d| d.0 == kind).collect();
            if entries.is_empty() {
                continue;
            }
            let names: Vec<&str> = entries.iter().map(|d| d.1.as_str()).collect();
            let flags: Vec<u32> = entries.iter().map(|d| d.2).collect();
            let versions: Vec<&str> = entries.iter().map(|d| d.3.as_str()).collect();
            writer.strings(name_tag.into(), &names);
            writer.int32s(flags_tag.into(), &flags);
            writer.strings(version_tag.into(), &versions);
        }
    }
}

#[derive(Default)]
struct HeaderWriter {
    index: Vec<[u32; 4]>,
    store: Vec<u8>,
    skip: Vec<u32>,
}

impl HeaderWriter {
    fn entry(&mut self, tag: u32, kind: u32, alignment: usize, count: usize, data: &[u8]) {
        if self.skip.contains(&tag) {
            return;
        }
        while self.store.len() % alignment != 0 {
            self.store.push(0);
        }
        self.index.push([tag, kind, self.store.len() as u32, count as u32]);
        self.store.extend_from_slice(data);
    }

    fn string(&mut self, tag: u32, value: &str) {
        self.entry(tag, TYPE_STRING, 1, 1, &nul_terminated(&[value]));
    }

    fn i18n(&mut self, tag: u32, value: &str) {
        self.entry(tag, TYPE_I18NSTRING, 1, 1, &nul_terminated(&[value]));
    }

    fn strings(&mut self, tag: u32, values: &[&str]) {
        self.entry(tag, TYPE_STRING_ARRAY, 1, values.len(), &nul_terminated(values));
    }

    fn int16s(&mut self, tag: u32, values: &[u16]) {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.entry(tag, TYPE_INT16, 2, values.len(), &data);
    }

    fn int32s(&mut self, tag: u32, values: &[u32]) {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.entry(tag, TYPE_INT32, 4, values.len(), &data);
    }

    fn binary(&mut self, tag: u32, data: &[u8]) {
        self.entry(tag, TYPE_BIN, 1, data.len(), data);
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = HEADER_MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&(self.index.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&(self.store.len() as u32).to_be_bytes());
        for entry in &self.index {
            for field in entry {
                bytes.extend_from_slice(&field.to_be_bytes());
            }
        }
        bytes.extend_from_slice(&self.store);
        bytes
    }
}

fn nul_terminated(values: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    for value in values {
        data.extend_from_slice(value.as_bytes());
        data.push(0);
    }
    data
}

/// The `time-1.7-45.el7.x86_64` package, as far as metadata is concerned.
pub fn time_rpm() -> Vec<u8> {
    time_builder().build()
}

/// [`time_rpm`] as a builder, for variations on it.
pub fn time_builder() -> Builder {
    Builder::new("time", "1.7", "45.el7", "x86_64")
        .summary("A GNU utility for monitoring a program's use of system resources")
        .description(
            "The GNU time utility runs another program, collects information about the resources used by that \
             program while it is running, and displays the results.",
        )
        .license("GPLv2+ and GFDL")
        .url("http://www.gnu.org/software/time/")
        .vendor("CentOS")
        .packager("CentOS BuildSystem <http://bugs.centos.org>")
        .group("Applications/System")
        .build_host("worker1.bsys.centos.org")
        .build_time(1_402_411_200)
        .installed_size(34_000)
        .file("/usr/bin/time", 0o100755, 0)
        .file("/usr/share/doc/time-1.7", 0o040755, 0)
        .file("/usr/share/doc/time-1.7/COPYING", 0o100644, 0x02)
        .file("/usr/share/info/time.info.gz", 0o100644, 0x02)
        .dependency(DependencyKind::Provides, "time", 0x08, "1.7-45.el7")
        .dependency(DependencyKind::Provides, "time(x86-64)", 0x08, "1.7-45.el7")
        .dependency(DependencyKind::Requires, "/bin/sh", 0x400, "")
        .dependency(DependencyKind::Requires, "/sbin/install-info", 0x400, "")
        .dependency(DependencyKind::Requires, "/sbin/install-info", 0x800, "")
        .dependency(DependencyKind::Requires, "libc.so.6()(64bit)", 0x4000, "")
        .dependency(DependencyKind::Requires, "libc.so.6(GLIBC_2.3)(64bit)", 0x4000, "")
        .dependency(DependencyKind::Requires, "rpmlib(CompressedFileNames)", 0x0100_000a, "3.0.4-1")
        .dependency(DependencyKind::Requires, "rpmlib(PayloadFilesHavePrefix)", 0x0100_000a, "4.0-1")
        .changelog(1_388_577_600, "Vitezslav Crhonek <vcrhonek@redhat.com> - 1.7-45", "- Mass rebuild 2014-01-24")
        .changelog(1_375_358_400, "Vitezslav Crhonek <vcrhonek@redhat.com> - 1.7-44", "- Fix info page installation")
        .changelog(
            1_343_822_400,
            "Fedora Release Engineering <rel-eng@lists.fedoraproject.org> - 1.7-43",
            "- Rebuilt for https://fedoraproject.org/wiki/Fedora_18_Mass_Rebuild",
        )
}

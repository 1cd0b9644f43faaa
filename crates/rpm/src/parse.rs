//! Package parsing: lead, signature header, main header, then the tag →
//! field mapping.

use crate::error::{ErrorKind, Result};
use crate::header::{Header, SignatureTag, Tag};
use crate::lead::{LEAD_SIZE, Lead};
use crate::models::{
    Changelog, Checksum, Dependency, DependencyKind, FileEntry, FileType, HeaderRange, Nevra, Package, Relations,
    SignatureDigests, Sizes, Times,
};
use crate::Digest;
use exn::OptionExt;
use tracing::instrument;

/// Signature headers are padded so the main header starts 8-byte aligned.
const SIGNATURE_ALIGNMENT: usize = 8;

/// (relationship, name tag, flags tag, version tag)
pub(crate) const RELATIONS: [(DependencyKind, Tag, Tag, Tag); 8] = [
    (DependencyKind::Provides, Tag::ProvideName, Tag::ProvideFlags, Tag::ProvideVersion),
    (DependencyKind::Requires, Tag::RequireName, Tag::RequireFlags, Tag::RequireVersion),
    (DependencyKind::Conflicts, Tag::ConflictName, Tag::ConflictFlags, Tag::ConflictVersion),
    (DependencyKind::Obsoletes, Tag::ObsoleteName, Tag::ObsoleteFlags, Tag::ObsoleteVersion),
    (DependencyKind::Suggests, Tag::SuggestName, Tag::SuggestFlags, Tag::SuggestVersion),
    (DependencyKind::Enhances, Tag::EnhanceName, Tag::EnhanceFlags, Tag::EnhanceVersion),
    (DependencyKind::Recommends, Tag::RecommendName, Tag::RecommendFlags, Tag::RecommendVersion),
    (DependencyKind::Supplements, Tag::SupplementName, Tag::SupplementFlags, Tag::SupplementVersion),
];

/// What the bytes of an RPM can't tell about themselves.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Key of the package relative to the repository root.
    pub location: String,
    /// Algorithm for the package checksum (`pkgid`).
    pub digest: Digest,
    /// Seconds since the Unix epoch at which the package was added.
    pub file_time: u64,
}

/// Parse an RPM with default [`ParseOptions`].
///
/// # Examples
///
/// ```
/// let err = rpmrepo_rpm::parse(b"definitely not an rpm").unwrap_err();
/// assert!(err.is_malformed());
/// ```
pub fn parse(bytes: &[u8]) -> Result<Package> {
    parse_with(bytes, &ParseOptions::default())
}

/// Parse an RPM file into a [`Package`].
///
/// The input is untrusted: every declared length is checked against what is
/// actually there, unknown tags and value types are skipped, and strings are
/// decoded lossily.
///
/// # Errors
///
/// Fails with a structural [`ErrorKind`] (see
/// [`is_malformed`](ErrorKind::is_malformed)) when:
/// - the lead is truncated or its magic is wrong,
/// - the signature is not a header signature,
/// - either header's magic is wrong or its sizes exceed the input,
/// - an index entry or a directory index points out of range,
/// - `NAME`, `VERSION`, `RELEASE` or `ARCH` is missing.
#[instrument(skip(bytes, options), fields(size = bytes.len(), location = %options.location, nevra))]
pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> Result<Package> {
    let lead = Lead::parse(bytes)?;
    let signature = Header::<SignatureTag>::parse(bytes, LEAD_SIZE, "signature")?;
    let signature_end = signature.range().end;
    let header_start = signature_end + padding(signature.range().len());
    let header = Header::<Tag>::parse(bytes, header_start, "header")?;

    // Source packages are the ones that don't name a source package.
    let is_source = lead.kind == 1 || header.get(Tag::SourceRpm).is_none();
    let nevra = Nevra {
        name: required(&header, Tag::Name, "NAME")?,
        epoch: header.integer(Tag::Epoch).and_then(|e| u32::try_from(e).ok()).unwrap_or(0),
        version: required(&header, Tag::Version, "VERSION")?,
        release: required(&header, Tag::Release, "RELEASE")?,
        arch: match is_source {
            true => "src".to_string(),
            false => required(&header, Tag::Arch, "ARCH")?,
        },
    };
    tracing::Span::current().record("nevra", tracing::field::display(&nevra));

    let package = Package {
        nevra,
        checksum: Checksum::of(options.digest, bytes),
        summary: header.string_or_empty(Tag::Summary),
        description: header.string_or_empty(Tag::Description),
        url: header.string_or_empty(Tag::Url),
        packager: header.string_or_empty(Tag::Packager),
        vendor: header.string_or_empty(Tag::Vendor),
        license: header.string_or_empty(Tag::License),
        group: header.string_or_empty(Tag::Group),
        build_host: header.string_or_empty(Tag::BuildHost),
        source_rpm: header.string_or_empty(Tag::SourceRpm),
        time: Times {
            file: options.file_time,
            build: header.integer(Tag::BuildTime).unwrap_or(0),
            install: header.integer(Tag::InstallTime).unwrap_or(0),
        },
        size: Sizes {
            package: bytes.len() as u64,
            installed: header.integer(Tag::LongSize).or_else(|| header.integer(Tag::Size)).unwrap_or(0),
            archive: header
                .integer(Tag::ArchiveSize)
                .or_else(|| signature.integer(SignatureTag::LongArchiveSize))
                .or_else(|| signature.integer(SignatureTag::PayloadSize))
                .unwrap_or(0),
        },
        header_range: HeaderRange {
            start: header.range().start as u64,
            end: header.range().end as u64,
        },
        relations: relations(&header),
        files: files(&header)?,
        changelogs: changelogs(&header),
        signature: SignatureDigests {
            sha256: signature.string(SignatureTag::Sha256).map(str::to_string),
            sha1: signature.string(SignatureTag::Sha1).map(str::to_string),
            md5: signature.get(SignatureTag::Md5).and_then(|v| v.as_bytes()).map(hex::encode),
        },
        location: options.location.clone(),
    };
    tracing::debug!(
        tags = header.len(),
        files = package.files.len(),
        requires = package.relations.requires.len(),
        "parsed package"
    );
    Ok(package)
}

fn padding(len: usize) -> usize {
    (SIGNATURE_ALIGNMENT - len % SIGNATURE_ALIGNMENT) % SIGNATURE_ALIGNMENT
}

fn required(header: &Header<Tag>, tag: Tag, name: &'static str) -> Result<String> {
    Ok(header.string(tag).ok_or_raise(|| ErrorKind::MissingTag(name))?.to_string())
}

fn relations(header: &Header<Tag>) -> Relations {
    let mut relations = Relations::default();
    for (kind, name_tag, flags_tag, version_tag) in RELATIONS {
        let flags = header.integers(flags_tag);
        let versions = header.strings(version_tag);
        *relations.get_mut(kind) = header
            .strings(name_tag)
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let sense = flags.get(i).copied().unwrap_or(0) as u32;
                Dependency::from_header(name, sense, versions.get(i).copied().unwrap_or_default())
            })
            .collect();
    }
    relations
}

/// Full paths are `DIRNAMES[DIRINDEXES[i]] + BASENAMES[i]`; packages built
/// before compressed file names carry `OLDFILENAMES` instead.
fn files(header: &Header<Tag>) -> Result<Vec<FileEntry>> {
    let basenames = header.strings(Tag::BaseNames);
    let paths: Vec<String> = if basenames.is_empty() {
        header.strings(Tag::OldFilenames).into_iter().map(str::to_string).collect()
    } else {
        let dirnames = header.strings(Tag::DirNames);
        let dirindexes = header.integers(Tag::DirIndexes);
        if dirindexes.len() != basenames.len() {
            exn::bail!(ErrorKind::OutOfRange("directory index count"));
        }
        basenames
            .iter()
            .zip(dirindexes)
            .map(|(basename, index)| {
                let dirname = usize::try_from(index)
                    .ok()
                    .and_then(|i| dirnames.get(i))
                    .ok_or_raise(|| ErrorKind::OutOfRange("dirname index"))?;
                Ok(format!("{dirname}{basename}"))
            })
            .collect::<Result<_>>()?
    };
    let modes = header.integers(Tag::FileModes);
    let flags = header.integers(Tag::FileFlags);
    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let mode = modes.get(i).copied().unwrap_or(0) as u32;
            let flags = flags.get(i).copied().unwrap_or(0) as u32;
            FileEntry::new(path, FileType::from_mode_and_flags(mode, flags))
        })
        .collect())
}

/// Headers list changelogs newest first.
fn changelogs(header: &Header<Tag>) -> Vec<Changelog> {
    let times = header.integers(Tag::ChangelogTime);
    let authors = header.strings(Tag::ChangelogName);
    let texts = header.strings(Tag::ChangelogText);
    let mut changelogs: Vec<Changelog> = times
        .into_iter()
        .zip(authors)
        .zip(texts)
        .map(|((date, author), text)| Changelog::new(author, date, text))
        .collect();
    changelogs.reverse();
    changelogs
}

//! Streaming metadata writers.
//!
//! Each package is serialized as soon as it is written; the whole document
//! never exists uncompressed in memory. Bytes flow through:
//!
//! ```text
//! XML writer → open hasher → compressor → compressed hasher → buffer
//! ```
//!
//! so both checksums and sizes are known the moment the compressor is
//! finished.

mod filelists;
mod other;
mod primary;

pub use self::primary::is_primary_file;

use crate::error::{ErrorKind, Result};
use crate::kind::NS_RPM;
use crate::{DataRecord, MetadataDescriptor, MetadataKind, NamingPolicy};
use exn::ResultExt;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rpmrepo_compress::{Compression, Encoder};
use rpmrepo_rpm::models::{Checksum, FileEntry, Nevra, Package};
use rpmrepo_rpm::{Digest, Hasher};
use std::borrow::Cow;
use std::io::{self, Write};
use tracing::instrument;

pub(crate) type XmlResult = std::result::Result<(), quick_xml::Error>;

/// Settings shared by every writer of one batch.
#[derive(Debug, Clone)]
pub struct WriterContext {
    /// Algorithm for `checksum` / `open-checksum`.
    pub digest: Digest,
    pub naming: NamingPolicy,
    pub compression: Compression,
    /// Generation time recorded in `repomd.xml`, seconds since the epoch.
    pub timestamp: u64,
    /// Newest changelog entries kept per package in `other.xml`.
    pub changelog_limit: usize,
}

impl Default for WriterContext {
    fn default() -> Self {
        Self {
            digest: Digest::default(),
            naming: NamingPolicy::default(),
            compression: Compression::default(),
            timestamp: 0,
            changelog_limit: 10,
        }
    }
}

/// Counts and hashes everything written through it.
pub(crate) struct HashingWriter<W> {
    inner: W,
    hasher: Hasher,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub(crate) fn new(inner: W, digest: Digest) -> Self {
        Self {
            inner,
            hasher: digest.hasher(),
            written: 0,
        }
    }

    /// (inner writer, hex digest, byte count)
    pub(crate) fn into_parts(self) -> (W, String, u64) {
        (self.inner, self.hasher.finalize(), self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

type Pipeline = HashingWriter<Encoder<HashingWriter<Vec<u8>>>>;

/// Writer for one metadata stream.
///
/// The package count goes into the root element before any package is
/// written, so it must be known up front; [`finish`](Self::finish) checks
/// that it was honoured.
///
/// # Examples
///
/// ```
/// use rpmrepo_metadata::{MetadataKind, MetadataWriter, WriterContext};
///
/// let writer = MetadataWriter::begin(MetadataKind::Other, 0, &WriterContext::default()).unwrap();
/// let descriptor = writer.finish().unwrap();
/// assert_eq!(descriptor.package_count, 0);
/// assert!(descriptor.record.location.starts_with("repodata/"));
/// assert!(descriptor.record.location.ends_with("-other.xml.gz"));
/// ```
pub struct MetadataWriter {
    kind: MetadataKind,
    declared: usize,
    written: usize,
    context: WriterContext,
    xml: Writer<Pipeline>,
}

impl MetadataWriter {
    #[instrument(skip(kind, context), fields(kind = %kind))]
    pub fn begin(kind: MetadataKind, package_count: usize, context: &WriterContext) -> Result<Self> {
        let compressed = HashingWriter::new(Vec::new(), context.digest);
        let encoder = context.compression.encoder(compressed).or_raise(|| ErrorKind::Compression(kind.as_str()))?;
        let mut xml = Writer::new_with_indent(HashingWriter::new(encoder, context.digest), b' ', 2);

        let count = package_count.to_string();
        let mut root = BytesStart::new(kind.root_element());
        root.push_attribute(("xmlns", kind.namespace()));
        if kind == MetadataKind::Primary {
            root.push_attribute(("xmlns:rpm", NS_RPM));
        }
        root.push_attribute(("packages", count.as_str()));
        let preamble: XmlResult = (|| {
            xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            xml.write_event(Event::Start(root))?;
            Ok(())
        })();
        preamble.or_raise(|| ErrorKind::Xml(kind.as_str()))?;
        Ok(Self {
            kind,
            declared: package_count,
            written: 0,
            context: context.clone(),
            xml,
        })
    }

    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    /// Serialize one package and push it through the pipeline.
    pub fn write(&mut self, package: &Package) -> Result<()> {
        let kind = self.kind;
        match kind {
            MetadataKind::Primary => primary::write_package(&mut self.xml, package),
            MetadataKind::Filelists => filelists::write_package(&mut self.xml, package),
            MetadataKind::Other => other::write_package(&mut self.xml, package, self.context.changelog_limit),
        }
        .or_raise(|| ErrorKind::Xml(kind.as_str()))?;
        self.written += 1;
        Ok(())
    }

    /// Close the document, flush the compressor and describe the result.
    pub fn finish(mut self) -> Result<MetadataDescriptor> {
        let kind = self.kind;
        if self.written != self.declared {
            exn::bail!(ErrorKind::CountMismatch {
                kind: kind.as_str(),
                declared: self.declared,
                written: self.written,
            });
        }
        let closing: XmlResult = (|| {
            self.xml.write_event(Event::End(BytesEnd::new(kind.root_element())))?;
            self.xml.get_mut().write_all(b"\n")?;
            Ok(())
        })();
        closing.or_raise(|| ErrorKind::Xml(kind.as_str()))?;

        let (encoder, open_checksum, open_size) = self.xml.into_inner().into_parts();
        let compressed = encoder.finish().or_raise(|| ErrorKind::Compression(kind.as_str()))?;
        let (data, checksum, size) = compressed.into_parts();

        let context = &self.context;
        let name = context.naming.name_for(&kind.file_name(context.compression), &data);
        let record = DataRecord {
            kind,
            location: format!("repodata/{name}"),
            checksum: Checksum::new(context.digest, checksum),
            open_checksum: Checksum::new(context.digest, open_checksum),
            size,
            open_size,
            timestamp: context.timestamp,
        };
        tracing::debug!(
            kind = %kind,
            location = %record.location,
            packages = self.written,
            size,
            open_size,
            "finished metadata file"
        );
        Ok(MetadataDescriptor {
            record,
            package_count: self.written,
            data,
        })
    }
}

/// Write all packages into one metadata stream.
pub fn generate<'a>(
    kind: MetadataKind,
    packages: impl ExactSizeIterator<Item = &'a Package>,
    context: &WriterContext,
) -> Result<MetadataDescriptor> {
    let mut writer = MetadataWriter::begin(kind, packages.len(), context)?;
    for package in packages {
        writer.write(package)?;
    }
    writer.finish()
}

/// XML 1.0 forbids most C0 control characters, even escaped. RPM headers
/// allow them, so they are dropped on the way out.
pub(crate) fn sanitize(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| !c.is_control() || matches!(c, '\t' | '\n' | '\r') || c as u32 >= 0x80;
    match text.chars().all(allowed) {
        true => Cow::Borrowed(text),
        false => Cow::Owned(text.chars().filter(|&c| allowed(c)).collect()),
    }
}

fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        start.push_attribute((*key, sanitize(value).as_ref()));
    }
    start
}

pub(crate) fn start<W: Write>(xml: &mut Writer<W>, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
    xml.write_event(Event::Start(element(name, attrs)))?;
    Ok(())
}

pub(crate) fn end<W: Write>(xml: &mut Writer<W>, name: &str) -> XmlResult {
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub(crate) fn empty<W: Write>(xml: &mut Writer<W>, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
    xml.write_event(Event::Empty(element(name, attrs)))?;
    Ok(())
}

/// `<name attrs>text</name>`, or `<name attrs/>` when the text is empty.
pub(crate) fn text<W: Write>(xml: &mut Writer<W>, name: &str, attrs: &[(&str, &str)], content: &str) -> XmlResult {
    if content.is_empty() {
        return empty(xml, name, attrs);
    }
    xml.write_event(Event::Start(element(name, attrs)))?;
    xml.write_event(Event::Text(BytesText::new(&sanitize(content))))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub(crate) fn version<W: Write>(xml: &mut Writer<W>, nevra: &Nevra) -> XmlResult {
    let epoch = nevra.epoch.to_string();
    empty(
        xml,
        "version",
        &[("epoch", &epoch), ("ver", &nevra.version), ("rel", &nevra.release)],
    )
}

pub(crate) fn file<W: Write>(xml: &mut Writer<W>, entry: &FileEntry) -> XmlResult {
    match entry.kind.as_attr() {
        Some(kind) => text(xml, "file", &[("type", kind)], &entry.path),
        None => text(xml, "file", &[], &entry.path),
    }
}

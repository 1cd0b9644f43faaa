//! The `repomd.xml` index.

use crate::error::{ErrorKind, Result};
use crate::kind::{NS_REPO, NS_RPM};
use crate::reader::{Item, Items, number, required};
use crate::writer::{XmlResult, empty, end, start, text};
use crate::{DataRecord, MetadataKind};
use exn::{OptionExt, ResultExt};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use rpmrepo_rpm::Digest;
use rpmrepo_rpm::models::Checksum;
use std::io::Write;

/// Key of the index, relative to the repository root.
pub const REPOMD_KEY: &str = "repodata/repomd.xml";
const DOCUMENT: &str = "repomd";

/// A parsed `repomd.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repomd {
    pub revision: u64,
    /// In `repomd.xml` order.
    pub records: Vec<DataRecord>,
}

impl Repomd {
    pub fn record(&self, kind: MetadataKind) -> Option<&DataRecord> {
        self.records.iter().find(|record| record.kind == kind)
    }
}

/// Serialize the index: one `<data>` per record, ordered primary,
/// filelists, other, whatever order they are given in.
pub fn build<'a>(records: impl IntoIterator<Item = &'a DataRecord>, revision: u64) -> Result<Vec<u8>> {
    let mut records: Vec<&DataRecord> = records.into_iter().collect();
    records.sort_by_key(|record| record.kind);

    let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
    let written: XmlResult = (|| {
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new("repomd");
        root.push_attribute(("xmlns", NS_REPO));
        root.push_attribute(("xmlns:rpm", NS_RPM));
        xml.write_event(Event::Start(root))?;
        text(&mut xml, "revision", &[], &revision.to_string())?;
        for record in &records {
            data(&mut xml, record)?;
        }
        end(&mut xml, "repomd")?;
        xml.get_mut().write_all(b"\n")?;
        Ok(())
    })();
    written.or_raise(|| ErrorKind::Xml(DOCUMENT))?;
    Ok(xml.into_inner())
}

fn data<W: Write>(xml: &mut Writer<W>, record: &DataRecord) -> XmlResult {
    start(xml, "data", &[("type", record.kind.as_str())])?;
    text(
        xml,
        "checksum",
        &[("type", record.checksum.digest.as_str())],
        &record.checksum.value,
    )?;
    text(
        xml,
        "open-checksum",
        &[("type", record.open_checksum.digest.as_str())],
        &record.open_checksum.value,
    )?;
    empty(xml, "location", &[("href", &record.location)])?;
    text(xml, "timestamp", &[], &record.timestamp.to_string())?;
    text(xml, "size", &[], &record.size.to_string())?;
    text(xml, "open-size", &[], &record.open_size.to_string())?;
    end(xml, "data")
}

/// Partially read `<data>` element.
#[derive(Default)]
struct Pending {
    checksum: Option<Checksum>,
    open_checksum: Option<Checksum>,
    location: Option<String>,
    timestamp: u64,
    size: Option<u64>,
    open_size: Option<u64>,
}

impl Pending {
    fn finish(self, kind: MetadataKind) -> Result<DataRecord> {
        let missing = |what: &str| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: {kind} data without {what}"));
        Ok(DataRecord {
            kind,
            checksum: self.checksum.ok_or_raise(|| missing("checksum"))?,
            open_checksum: self.open_checksum.ok_or_raise(|| missing("open-checksum"))?,
            location: self.location.ok_or_raise(|| missing("location"))?,
            timestamp: self.timestamp,
            size: self.size.ok_or_raise(|| missing("size"))?,
            open_size: self.open_size.ok_or_raise(|| missing("open-size"))?,
        })
    }
}

/// Read a published index back.
///
/// `<data>` elements of types other than primary, filelists and other (such
/// as sqlite databases or `updateinfo`) are skipped.
pub fn parse_repomd(bytes: &[u8]) -> Result<Repomd> {
    let mut items = Items::new(bytes, DOCUMENT);
    match items.next()? {
        Some(Item::Start { name, .. }) if name == "repomd" => {},
        _ => exn::bail!(ErrorKind::InvalidMetadata(format!("{DOCUMENT}: expected <repomd> root element"))),
    }
    let mut repomd = Repomd::default();
    let mut current: Option<(MetadataKind, Pending)> = None;
    while let Some(item) = items.next()? {
        match item {
            Item::Start { name, attrs } if name == "data" => {
                let kind = required(DOCUMENT, &name, &attrs, "type")?;
                current = kind.parse::<MetadataKind>().ok().map(|kind| (kind, Pending::default()));
            },
            Item::End { name, .. } if name == "data" => {
                if let Some((kind, pending)) = current.take() {
                    repomd.records.push(pending.finish(kind)?);
                }
            },
            Item::End { name, text, .. } if name == "revision" => {
                repomd.revision = number(DOCUMENT, "revision", &text)?;
            },
            Item::End { name, attrs, text } => {
                let Some((_, pending)) = current.as_mut() else {
                    continue;
                };
                match name.as_str() {
                    "checksum" => pending.checksum = Some(checksum(&name, &attrs, &text)?),
                    "open-checksum" => pending.open_checksum = Some(checksum(&name, &attrs, &text)?),
                    "location" => pending.location = Some(required(DOCUMENT, &name, &attrs, "href")?.to_string()),
                    "timestamp" => pending.timestamp = number(DOCUMENT, "timestamp", &text)?,
                    "size" => pending.size = Some(number(DOCUMENT, "size", &text)?),
                    "open-size" => pending.open_size = Some(number(DOCUMENT, "open-size", &text)?),
                    _ => {},
                }
            },
            _ => {},
        }
    }
    if let Some(kind) = MetadataKind::ALL.into_iter().find(|&kind| {
        repomd.records.iter().filter(|record| record.kind == kind).count() > 1
    }) {
        exn::bail!(ErrorKind::InvalidMetadata(format!("{DOCUMENT}: {kind} listed twice")));
    }
    Ok(repomd)
}

fn checksum(element: &str, attrs: &[(String, String)], text: &str) -> Result<Checksum> {
    let digest: Digest = required(DOCUMENT, element, attrs, "type")?
        .parse::<Digest>()
        .or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unsupported {element} type")))?;
    let value = text.trim();
    if value.is_empty() {
        exn::bail!(ErrorKind::InvalidMetadata(format!("{DOCUMENT}: empty {element}")));
    }
    Ok(Checksum::new(digest, value))
}

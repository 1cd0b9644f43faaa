//! Readers for previously published metadata.
//!
//! A batch update merges into the repository's current state. Rather than
//! re-reading every RPM, that state is rebuilt from the metadata files the
//! last batch published.

mod filelists;
mod other;
mod primary;

pub use self::filelists::{PackageFiles, read_filelists};
pub use self::other::{PackageChangelogs, read_other};
pub use self::primary::read_primary;

use crate::MetadataKind;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rpmrepo_rpm::models::Package;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::str::FromStr;
use tracing::instrument;

pub(crate) type Attributes = Vec<(String, String)>;

/// A flattened view of the XML events a metadata reader cares about.
///
/// Names are local (`rpm:entry` is `entry`). Empty elements are reported as
/// a start immediately followed by an end. Every end carries the attributes
/// of its start and the text collected since the last start.
#[derive(Debug)]
pub(crate) enum Item {
    Start { name: String, attrs: Attributes },
    End { name: String, attrs: Attributes, text: String },
}

pub(crate) struct Items<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    text: String,
    open: Vec<Attributes>,
    pending_end: Option<String>,
    document: &'static str,
}

impl<R: BufRead> Items<R> {
    pub(crate) fn new(reader: R, document: &'static str) -> Self {
        let mut reader = Reader::from_reader(reader);
        // Whitespace inside text content is significant.
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
            text: String::new(),
            open: Vec::new(),
            pending_end: None,
            document,
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Item>> {
        if let Some(name) = self.pending_end.take() {
            let attrs = self.open.pop().unwrap_or_default();
            return Ok(Some(Item::End {
                name,
                attrs,
                text: String::new(),
            }));
        }
        let Self {
            reader,
            buf,
            text,
            open,
            pending_end,
            document,
        } = self;
        let document = *document;
        loop {
            buf.clear();
            let event = reader.read_event_into(buf).or_raise(|| ErrorKind::Xml(document))?;
            match event {
                Event::Start(start) => {
                    let (name, attrs) = element(&start).or_raise(|| ErrorKind::Xml(document))?;
                    open.push(attrs.clone());
                    text.clear();
                    return Ok(Some(Item::Start { name, attrs }));
                },
                Event::Empty(start) => {
                    let (name, attrs) = element(&start).or_raise(|| ErrorKind::Xml(document))?;
                    open.push(attrs.clone());
                    text.clear();
                    *pending_end = Some(name.clone());
                    return Ok(Some(Item::Start { name, attrs }));
                },
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                    let attrs = open.pop().unwrap_or_default();
                    return Ok(Some(Item::End {
                        name,
                        attrs,
                        text: std::mem::take(text),
                    }));
                },
                Event::Text(content) => {
                    text.push_str(&content.unescape().or_raise(|| ErrorKind::Xml(document))?);
                },
                Event::CData(content) => text.push_str(&String::from_utf8_lossy(&content)),
                Event::Eof => return Ok(None),
                _ => {},
            }
        }
    }

    /// Read up to the root element, check it is the one `kind` uses and
    /// return its declared package count.
    pub(crate) fn root(&mut self, kind: MetadataKind) -> Result<Option<usize>> {
        let document = self.document;
        match self.next()? {
            Some(Item::Start { name, attrs }) if name == kind.root_element() => match attr(&attrs, "packages") {
                Some(count) => Ok(Some(number(document, "packages", count)?)),
                None => Ok(None),
            },
            _ => exn::bail!(ErrorKind::InvalidMetadata(format!(
                "{document}: expected <{}> root element",
                kind.root_element()
            ))),
        }
    }

    pub(crate) fn document(&self) -> &'static str {
        self.document
    }
}

fn element(start: &BytesStart<'_>) -> std::result::Result<(String, Attributes), quick_xml::Error> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        attrs.push((key, attribute.unescape_value()?.into_owned()));
    }
    Ok((name, attrs))
}

pub(crate) fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

pub(crate) fn required<'a>(
    document: &'static str,
    element: &str,
    attrs: &'a [(String, String)],
    key: &str,
) -> Result<&'a str> {
    attr(attrs, key).ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{document}: <{element}> without {key}")))
}

pub(crate) fn number<T: FromStr>(document: &'static str, what: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse::<T>().or_raise(|| ErrorKind::InvalidMetadata(format!("{document}: bad {what} {value:?}")))
}

/// Number attribute that may be absent (treated as zero).
pub(crate) fn number_or_zero(document: &'static str, attrs: &[(String, String)], key: &str) -> Result<u64> {
    attr(attrs, key).map_or(Ok(0), |value| number(document, key, value))
}

pub(crate) fn check_count(document: &'static str, declared: Option<usize>, read: usize) -> Result<()> {
    match declared {
        Some(declared) if declared != read => exn::bail!(ErrorKind::InvalidMetadata(format!(
            "{document}: declares {declared} packages but contains {read}"
        ))),
        _ => Ok(()),
    }
}

/// Pairs the entries of a secondary document with the packages of
/// `primary.xml`, one to one.
struct Matched<'a> {
    document: &'static str,
    index: &'a HashMap<String, usize>,
    seen: HashSet<usize>,
}

impl<'a> Matched<'a> {
    fn new(document: &'static str, index: &'a HashMap<String, usize>, count: usize) -> Result<Self> {
        if count != index.len() {
            exn::bail!(ErrorKind::InvalidMetadata(format!(
                "{document} describes {count} packages, primary {}",
                index.len()
            )));
        }
        Ok(Self {
            document,
            index,
            seen: HashSet::with_capacity(count),
        })
    }

    fn position(&mut self, pkgid: &str) -> Result<usize> {
        let document = self.document;
        let i = self.index.get(pkgid).copied().ok_or_raise(|| {
            ErrorKind::InvalidMetadata(format!("{document} describes {pkgid}, which primary does not"))
        })?;
        if !self.seen.insert(i) {
            exn::bail!(ErrorKind::InvalidMetadata(format!("{document} describes {pkgid} twice")));
        }
        Ok(i)
    }
}

/// Complete the packages read from `primary.xml` with the full file lists
/// and changelogs of the other two documents.
///
/// Entries are matched by `pkgid`. Both documents must describe exactly the
/// packages in `primary.xml`. A missing document leaves that part of the
/// packages as `primary.xml` had it.
#[instrument(skip_all, fields(packages = primary.len()))]
pub fn merge_prior(
    primary: Vec<Package>,
    filelists: Option<Vec<PackageFiles>>,
    other: Option<Vec<PackageChangelogs>>,
) -> Result<Vec<Package>> {
    let mut packages = primary;
    let index: HashMap<String, usize> =
        packages.iter().enumerate().map(|(i, package)| (package.pkgid().to_string(), i)).collect();
    if index.len() != packages.len() {
        exn::bail!(ErrorKind::InvalidMetadata("primary lists a pkgid twice".to_string()));
    }
    if let Some(filelists) = filelists {
        let mut matched = Matched::new("filelists", &index, filelists.len())?;
        for entry in filelists {
            packages[matched.position(&entry.pkgid)?].files = entry.files;
        }
    }
    if let Some(other) = other {
        let mut matched = Matched::new("other", &index, other.len())?;
        for entry in other {
            packages[matched.position(&entry.pkgid)?].changelogs = entry.changelogs;
        }
    }
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn items(xml: &str) -> Vec<Item> {
        let mut items = Items::new(Cursor::new(xml.as_bytes().to_vec()), "test");
        let mut collected = Vec::new();
        while let Some(item) = items.next().unwrap() {
            collected.push(item);
        }
        collected
    }

    #[test]
    fn test_items_expand_empty_elements() {
        let collected = items(r#"<a x="1"><rpm:b y="&amp;"/><c>  t &lt; u </c></a>"#);
        let names: Vec<String> = collected
            .iter()
            .map(|item| match item {
                Item::Start { name, .. } => format!("+{name}"),
                Item::End { name, .. } => format!("-{name}"),
            })
            .collect();
        assert_eq!(names, ["+a", "+b", "-b", "+c", "-c", "-a"]);
        match &collected[2] {
            Item::End { attrs, text, .. } => {
                assert_eq!(attr(attrs, "y"), Some("&"));
                assert!(text.is_empty());
            },
            item => panic!("unexpected {item:?}"),
        }
        match &collected[4] {
            Item::End { text, .. } => assert_eq!(text, "  t < u "),
            item => panic!("unexpected {item:?}"),
        }
        match &collected[5] {
            Item::End { attrs, .. } => assert_eq!(attr(attrs, "x"), Some("1")),
            item => panic!("unexpected {item:?}"),
        }
    }

    #[test]
    fn test_cdata_text() {
        let collected = items("<a><![CDATA[x < y]]></a>");
        match &collected[1] {
            Item::End { text, .. } => assert_eq!(text, "x < y"),
            item => panic!("unexpected {item:?}"),
        }
    }

    #[test]
    fn test_wrong_root() {
        let mut items = Items::new(Cursor::new(b"<filelists packages=\"0\"/>".to_vec()), "primary");
        let err = items.root(MetadataKind::Primary).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidMetadata(_)));
    }

    #[test]
    fn test_malformed_xml() {
        let mut items = Items::new(Cursor::new(b"<metadata><package></metadata>".to_vec()), "primary");
        let result = (|| {
            while items.next()?.is_some() {}
            Ok::<_, crate::error::Error>(())
        })();
        assert!(result.is_err());
    }
}

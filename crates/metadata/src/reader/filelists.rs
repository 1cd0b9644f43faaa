use super::{Item, Items, attr, check_count, required};
use crate::MetadataKind;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rpmrepo_rpm::models::{FileEntry, FileType};
use std::io::BufRead;
use tracing::instrument;

const DOCUMENT: &str = "filelists";

/// The complete file list of one package, as published in `filelists.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFiles {
    pub pkgid: String,
    pub files: Vec<FileEntry>,
}

#[instrument(skip_all, fields(packages))]
pub fn read_filelists<R: BufRead>(reader: R) -> Result<Vec<PackageFiles>> {
    let mut items = Items::new(reader, DOCUMENT);
    let declared = items.root(MetadataKind::Filelists)?;
    let mut packages = Vec::new();
    let mut current: Option<PackageFiles> = None;
    while let Some(item) = items.next()? {
        match item {
            Item::Start { name, attrs } if name == "package" => {
                current = Some(PackageFiles {
                    pkgid: required(DOCUMENT, &name, &attrs, "pkgid")?.to_string(),
                    files: Vec::new(),
                });
            },
            Item::End { name, attrs, text } if name == "file" => {
                let package = current
                    .as_mut()
                    .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: <file> outside <package>")))?;
                let kind: FileType = attr(&attrs, "type")
                    .unwrap_or_default()
                    .parse()
                    .ok()
                    .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unknown file type for {text}")))?;
                package.files.push(FileEntry::new(text, kind));
            },
            Item::End { name, .. } if name == "package" => {
                let package = current
                    .take()
                    .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unbalanced <package>")))?;
                packages.push(package);
            },
            _ => {},
        }
    }
    check_count(items.document(), declared, packages.len())?;
    tracing::Span::current().record("packages", packages.len());
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WriterContext, generate};
    use rpmrepo_compress::Compression;
    use rpmrepo_rpm::fixtures::time_rpm;
    use rpmrepo_rpm::parse;
    use std::io::Cursor;

    #[test]
    fn test_read_back_filelists() {
        let package = parse(&time_rpm()).unwrap();
        let descriptor = generate(MetadataKind::Filelists, [&package].into_iter(), &WriterContext::default()).unwrap();
        let xml = Compression::Gzip.decompress(&descriptor.data).unwrap();
        let read = read_filelists(Cursor::new(xml)).unwrap();
        assert_eq!(
            read,
            vec![PackageFiles {
                pkgid: package.pkgid().to_string(),
                files: package.files.clone(),
            }]
        );
    }

    #[test]
    fn test_package_without_pkgid() {
        let xml = r#"<filelists packages="1"><package name="x" arch="noarch"></package></filelists>"#;
        let err = read_filelists(Cursor::new(xml)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidMetadata(_)));
    }
}

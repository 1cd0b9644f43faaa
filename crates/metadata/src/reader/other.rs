use super::{Item, Items, check_count, number, required};
use crate::MetadataKind;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rpmrepo_rpm::models::Changelog;
use std::io::BufRead;
use tracing::instrument;

const DOCUMENT: &str = "other";

/// The changelog entries of one package, as published in `other.xml`,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChangelogs {
    pub pkgid: String,
    pub changelogs: Vec<Changelog>,
}

#[instrument(skip_all, fields(packages))]
pub fn read_other<R: BufRead>(reader: R) -> Result<Vec<PackageChangelogs>> {
    let mut items = Items::new(reader, DOCUMENT);
    let declared = items.root(MetadataKind::Other)?;
    let mut packages = Vec::new();
    let mut current: Option<PackageChangelogs> = None;
    while let Some(item) = items.next()? {
        match item {
            Item::Start { name, attrs } if name == "package" => {
                current = Some(PackageChangelogs {
                    pkgid: required(DOCUMENT, &name, &attrs, "pkgid")?.to_string(),
                    changelogs: Vec::new(),
                });
            },
            Item::End { name, attrs, text } if name == "changelog" => {
                let package = current.as_mut().ok_or_raise(|| {
                    ErrorKind::InvalidMetadata(format!("{DOCUMENT}: <changelog> outside <package>"))
                })?;
                let author = required(DOCUMENT, &name, &attrs, "author")?;
                let date = number(DOCUMENT, "changelog date", required(DOCUMENT, &name, &attrs, "date")?)?;
                package.changelogs.push(Changelog::new(author, date, text));
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
    check_count(DOCUMENT, declared, packages.len())?;
    tracing::Span::current().record("packages", packages.len());
    Ok(packages)
}

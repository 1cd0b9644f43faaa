use super::{Attributes, Item, Items, attr, check_count, number, number_or_zero, required};
use crate::MetadataKind;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rpmrepo_rpm::Digest;
use rpmrepo_rpm::models::{Checksum, Dependency, DependencyKind, FileEntry, FileType, Flags, Package};
use std::io::BufRead;
use tracing::instrument;

const DOCUMENT: &str = "primary";

/// Read every package of a `primary.xml` document.
///
/// File lists are only as complete as `primary.xml` makes them and
/// changelogs are empty; see [`merge_prior`](crate::merge_prior).
#[instrument(skip_all, fields(packages))]
pub fn read_primary<R: BufRead>(reader: R) -> Result<Vec<Package>> {
    let mut items = Items::new(reader, DOCUMENT);
    let declared = items.root(MetadataKind::Primary)?;
    let mut packages = Vec::with_capacity(declared.unwrap_or_default().min(1 << 16));
    let mut current: Option<Package> = None;
    let mut relation: Option<DependencyKind> = None;
    while let Some(item) = items.next()? {
        match item {
            Item::Start { name, .. } if name == "package" => current = Some(Package::default()),
            Item::Start { name, .. } => {
                if let Some(kind) = DependencyKind::from_element(&name) {
                    relation = Some(kind);
                }
            },
            Item::End { name, .. } if name == "package" => {
                let package = current
                    .take()
                    .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unbalanced <package>")))?;
                packages.push(package);
            },
            Item::End { name, attrs, text } => {
                let Some(package) = current.as_mut() else {
                    continue;
                };
                if DependencyKind::from_element(&name).is_some() {
                    relation = None;
                    continue;
                }
                field(package, relation, &name, &attrs, text)?;
            },
        }
    }
    check_count(DOCUMENT, declared, packages.len())?;
    tracing::Span::current().record("packages", packages.len());
    Ok(packages)
}

fn field(
    package: &mut Package,
    relation: Option<DependencyKind>,
    name: &str,
    attrs: &Attributes,
    text: String,
) -> Result<()> {
    match name {
        "name" => package.nevra.name = text,
        "arch" => package.nevra.arch = text,
        "version" => {
            package.nevra.epoch = match attr(attrs, "epoch") {
                Some(epoch) if !epoch.is_empty() => number(DOCUMENT, "epoch", epoch)?,
                _ => 0,
            };
            package.nevra.version = required(DOCUMENT, name, attrs, "ver")?.to_string();
            package.nevra.release = required(DOCUMENT, name, attrs, "rel")?.to_string();
        },
        "checksum" => {
            let digest: Digest = required(DOCUMENT, name, attrs, "type")?
                .parse::<Digest>()
                .or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unsupported checksum type")))?;
            package.checksum = Checksum::new(digest, text.trim());
        },
        "summary" => package.summary = text,
        "description" => package.description = text,
        "packager" => package.packager = text,
        "url" => package.url = text,
        "time" => {
            package.time.file = number_or_zero(DOCUMENT, attrs, "file")?;
            package.time.build = number_or_zero(DOCUMENT, attrs, "build")?;
        },
        "size" => {
            package.size.package = number_or_zero(DOCUMENT, attrs, "package")?;
            package.size.installed = number_or_zero(DOCUMENT, attrs, "installed")?;
            package.size.archive = number_or_zero(DOCUMENT, attrs, "archive")?;
        },
        "location" => package.location = required(DOCUMENT, name, attrs, "href")?.to_string(),
        "license" => package.license = text,
        "vendor" => package.vendor = text,
        "group" => package.group = text,
        "buildhost" => package.build_host = text,
        "sourcerpm" => package.source_rpm = text,
        "header-range" => {
            package.header_range.start = number_or_zero(DOCUMENT, attrs, "start")?;
            package.header_range.end = number_or_zero(DOCUMENT, attrs, "end")?;
        },
        "entry" => {
            let kind = relation
                .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: <entry> outside a dependency list")))?;
            package.relations.get_mut(kind).push(dependency(attrs)?);
        },
        "file" => {
            let kind: FileType = attr(attrs, "type").unwrap_or_default().parse().ok().ok_or_raise(|| {
                ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unknown file type for {text}"))
            })?;
            package.files.push(FileEntry::new(text, kind));
        },
        _ => {},
    }
    Ok(())
}

fn dependency(attrs: &Attributes) -> Result<Dependency> {
    let mut dependency = Dependency::new(required(DOCUMENT, "entry", attrs, "name")?);
    dependency.flags = match attr(attrs, "flags") {
        Some(flags) => Some(
            flags
                .parse::<Flags>()
                .ok()
                .ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{DOCUMENT}: unknown flags {flags:?}")))?,
        ),
        None => None,
    };
    dependency.epoch = attr(attrs, "epoch").map(str::to_string);
    dependency.version = attr(attrs, "ver").map(str::to_string);
    dependency.release = attr(attrs, "rel").map(str::to_string);
    dependency.pre = matches!(attr(attrs, "pre"), Some("1" | "true"));
    Ok(dependency)
}

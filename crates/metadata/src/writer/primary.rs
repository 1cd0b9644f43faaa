use super::{XmlResult, empty, end, file, start, text, version};
use quick_xml::Writer;
use regex::Regex;
use rpmrepo_rpm::models::{Dependency, DependencyKind, Package};
use std::io::Write;
use std::sync::LazyLock;

/// Files clients commonly ask for by path (`yum install /usr/bin/time`) and
/// therefore worth listing in `primary.xml`: configuration and executables.
static PRIMARY_FILES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:/etc/|.*bin/|/usr/lib/sendmail$)").unwrap());

/// Whether a path is listed in `primary.xml` as well as `filelists.xml`.
///
/// ```
/// use rpmrepo_metadata::is_primary_file;
/// assert!(is_primary_file("/usr/bin/time"));
/// assert!(is_primary_file("/etc/time.conf"));
/// assert!(!is_primary_file("/usr/share/doc/time-1.7/COPYING"));
/// ```
pub fn is_primary_file(path: &str) -> bool {
    PRIMARY_FILES.is_match(path)
}

pub(super) fn write_package<W: Write>(xml: &mut Writer<W>, package: &Package) -> XmlResult {
    let nevra = &package.nevra;
    start(xml, "package", &[("type", "rpm")])?;
    text(xml, "name", &[], &nevra.name)?;
    text(xml, "arch", &[], &nevra.arch)?;
    version(xml, nevra)?;
    text(
        xml,
        "checksum",
        &[("type", package.checksum.digest.as_str()), ("pkgid", "YES")],
        &package.checksum.value,
    )?;
    text(xml, "summary", &[], &package.summary)?;
    text(xml, "description", &[], &package.description)?;
    text(xml, "packager", &[], &package.packager)?;
    text(xml, "url", &[], &package.url)?;
    let (file_time, build_time) = (package.time.file.to_string(), package.time.build.to_string());
    empty(xml, "time", &[("file", &file_time), ("build", &build_time)])?;
    let sizes = [package.size.package, package.size.installed, package.size.archive].map(|s| s.to_string());
    empty(
        xml,
        "size",
        &[("package", &sizes[0]), ("installed", &sizes[1]), ("archive", &sizes[2])],
    )?;
    empty(xml, "location", &[("href", &package.location)])?;

    start(xml, "format", &[])?;
    text(xml, "rpm:license", &[], &package.license)?;
    text(xml, "rpm:vendor", &[], &package.vendor)?;
    text(xml, "rpm:group", &[], &package.group)?;
    text(xml, "rpm:buildhost", &[], &package.build_host)?;
    text(xml, "rpm:sourcerpm", &[], &package.source_rpm)?;
    let (range_start, range_end) = (package.header_range.start.to_string(), package.header_range.end.to_string());
    empty(xml, "rpm:header-range", &[("start", &range_start), ("end", &range_end)])?;
    for kind in DependencyKind::ALL {
        let dependencies = match kind {
            DependencyKind::Requires => requires(package),
            kind => package.relations.get(kind).to_vec(),
        };
        if dependencies.is_empty() {
            continue;
        }
        let element = format!("rpm:{}", kind.element());
        start(xml, &element, &[])?;
        for dependency in &dependencies {
            entry(xml, dependency)?;
        }
        end(xml, &element)?;
    }
    for listed in package.files.iter().filter(|f| is_primary_file(&f.path)) {
        file(xml, listed)?;
    }
    end(xml, "format")?;
    end(xml, "package")
}

fn entry<W: Write>(xml: &mut Writer<W>, dependency: &Dependency) -> XmlResult {
    let mut attrs = vec![("name", dependency.name.as_str())];
    if let Some(flags) = dependency.flags {
        attrs.push(("flags", flags.as_str()));
    }
    for (key, value) in [
        ("epoch", &dependency.epoch),
        ("ver", &dependency.version),
        ("rel", &dependency.release),
    ] {
        if let Some(value) = value {
            attrs.push((key, value.as_str()));
        }
    }
    if dependency.pre {
        attrs.push(("pre", "1"));
    }
    empty(xml, "rpm:entry", &attrs)
}

/// Requires without `rpmlib(...)` capabilities and without duplicates; a
/// duplicate that is a pre-requisite makes the kept entry one too.
fn requires(package: &Package) -> Vec<Dependency> {
    let mut requires: Vec<Dependency> = Vec::new();
    for dependency in package.relations.requires.iter().filter(|d| !d.is_rpmlib()) {
        let same = |d: &&mut Dependency| {
            d.name == dependency.name
                && d.flags == dependency.flags
                && d.epoch == dependency.epoch
                && d.version == dependency.version
                && d.release == dependency.release
        };
        match requires.iter_mut().find(same) {
            Some(existing) => existing.pre |= dependency.pre,
            None => requires.push(dependency.clone()),
        }
    }
    requires
}

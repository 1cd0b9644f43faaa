use super::{XmlResult, end, start, text, version};
use quick_xml::Writer;
use rpmrepo_rpm::models::Package;
use std::io::Write;

pub(super) fn write_package<W: Write>(xml: &mut Writer<W>, package: &Package, changelog_limit: usize) -> XmlResult {
    let nevra = &package.nevra;
    start(
        xml,
        "package",
        &[("pkgid", package.pkgid()), ("name", &nevra.name), ("arch", &nevra.arch)],
    )?;
    version(xml, nevra)?;
    // Changelogs are kept oldest first, so the newest are at the end.
    let skip = package.changelogs.len().saturating_sub(changelog_limit);
    for changelog in &package.changelogs[skip..] {
        let date = changelog.date.to_string();
        text(
            xml,
            "changelog",
            &[("author", &changelog.author), ("date", &date)],
            &changelog.text,
        )?;
    }
    end(xml, "package")
}

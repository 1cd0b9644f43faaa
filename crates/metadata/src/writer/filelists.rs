use super::{XmlResult, end, file, start, version};
use quick_xml::Writer;
use rpmrepo_rpm::models::Package;
use std::io::Write;

pub(super) fn write_package<W: Write>(xml: &mut Writer<W>, package: &Package) -> XmlResult {
    let nevra = &package.nevra;
    start(
        xml,
        "package",
        &[("pkgid", package.pkgid()), ("name", &nevra.name), ("arch", &nevra.arch)],
    )?;
    version(xml, nevra)?;
    for entry in &package.files {
        file(xml, entry)?;
    }
    end(xml, "package")
}

//! Streaming, deterministic encoders.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, GzBuilder, write::GzEncoder};
use std::io::{self, Write};
#[cfg(feature = "xz")]
use xz2::write::XzEncoder;
#[cfg(feature = "zstd")]
use zstd::stream::write::Encoder as ZstdEncoder;

// Highest level for every format: metadata is written once and downloaded by
// every client, so size wins over speed. None of these levels enable
// multithreading, which would make the output depend on scheduling.
pub(crate) const BZIP2_LEVEL: BzCompression = BzCompression::best();
pub(crate) const GZIP_LEVEL: GzCompression = GzCompression::best();
#[cfg(feature = "xz")]
pub(crate) const XZ_LEVEL: u32 = 9;
#[cfg(feature = "zstd")]
pub(crate) const ZSTD_LEVEL: i32 = 19;

/// A compressing [`Write`]r that returns the inner writer on
/// [`finish`](Self::finish).
///
/// Unlike a boxed `dyn Write`, the caller gets the sink back once the
/// trailer has been written, which is what lets a hashing writer sit
/// underneath the compressor and report the compressed checksum.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use rpmrepo_compress::Compression;
///
/// let mut encoder = Compression::Gzip.encoder(Vec::new()).unwrap();
/// encoder.write_all(b"<metadata/>").unwrap();
/// let compressed = encoder.finish().unwrap();
/// assert_eq!(Compression::Gzip.decompress(&compressed).unwrap(), b"<metadata/>");
/// ```
pub enum Encoder<W: Write> {
    None(W),
    Bzip2(BzEncoder<W>),
    Gzip(GzEncoder<W>),
    #[cfg(feature = "xz")]
    Xz(XzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(ZstdEncoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    /// Write the compression trailer and hand back the inner writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = match self {
            Encoder::None(w) => w,
            Encoder::Bzip2(e) => e.finish().or_raise(|| ErrorKind::Io)?,
            Encoder::Gzip(e) => e.finish().or_raise(|| ErrorKind::Io)?,
            #[cfg(feature = "xz")]
            Encoder::Xz(e) => e.finish().or_raise(|| ErrorKind::Io)?,
            #[cfg(feature = "zstd")]
            Encoder::Zstd(e) => e.finish().or_raise(|| ErrorKind::Io)?,
        };
        inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(inner)
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::None(w) => w.write(buf),
            Encoder::Bzip2(e) => e.write(buf),
            Encoder::Gzip(e) => e.write(buf),
            #[cfg(feature = "xz")]
            Encoder::Xz(e) => e.write(buf),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::None(w) => w.flush(),
            Encoder::Bzip2(e) => e.flush(),
            Encoder::Gzip(e) => e.flush(),
            #[cfg(feature = "xz")]
            Encoder::Xz(e) => e.flush(),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(e) => e.flush(),
        }
    }
}

impl Compression {
    /// Wrap a writer with this format's deterministic encoder.
    pub fn encoder<W: Write>(&self, writer: W) -> Result<Encoder<W>> {
        Ok(match self {
            Compression::None => Encoder::None(writer),
            Compression::Bzip2 => Encoder::Bzip2(BzEncoder::new(writer, BZIP2_LEVEL)),
            // Zero mtime and no embedded file name: the header must not
            // depend on when or where the file was generated.
            Compression::Gzip => Encoder::Gzip(GzBuilder::new().mtime(0).write(writer, GZIP_LEVEL)),
            #[cfg(feature = "xz")]
            Compression::Xz => Encoder::Xz(XzEncoder::new(writer, XZ_LEVEL)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Encoder::Zstd(ZstdEncoder::new(writer, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?),
        })
    }
}

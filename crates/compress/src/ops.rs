//! In-memory and reader-side compression operations.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::read::BzDecoder;
use exn::ResultExt;
use flate2::read::MultiGzDecoder;
use std::io::{Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::read::XzDecoder;
#[cfg(feature = "zstd")]
use zstd::stream::read::Decoder as ZstdDecoder;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"<filelists/>").unwrap();
    /// assert!(compressed.starts_with(&[0x1f, 0x8b]));
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = self.encoder(Vec::with_capacity(input.len() / 4))?;
        encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
        encoder.finish()
    }

    /// Decompress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_compress::Compression;
    ///
    /// let compressed = Compression::Bzip2.compress(b"<otherdata/>").unwrap();
    /// assert_eq!(Compression::Bzip2.decompress(&compressed).unwrap(), b"<otherdata/>");
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let size = self.wrap_reader(input)?.read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
        tracing::Span::current().record("output_size", size);
        Ok(output)
    }

    /// Wrap a reader with the matching decompression layer.
    ///
    /// Used to stream previously published metadata into an XML reader
    /// without materialising the uncompressed document.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            // Multi-member aware: some tools concatenate gzip members.
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }
}

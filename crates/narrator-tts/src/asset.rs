//! Temporary, locally addressable audio assets.

use crate::config::{AUDIO_MIME, AUDIO_SUFFIX};
use crate::SynthesisResult;
use base64::{engine::general_purpose, Engine as _};
use std::io::{self, BufWriter, Write};
use std::path::{self, Path, PathBuf};
use tempfile::TempPath;
use url::Url;

/// Encoded characters decoded per step. Must stay a multiple of 4 so every
/// chunk but the last is a complete, unpadded base64 run.
pub const DECODE_CHUNK_LEN: usize = 64 * 1024;

/// Decodes a base64 payload into `writer`, one bounded chunk at a time.
///
/// Returns the number of decoded bytes written.
pub fn decode_base64_chunked<W: Write>(payload: &str, writer: &mut W) -> SynthesisResult<u64> {
    let mut buf = Vec::with_capacity(DECODE_CHUNK_LEN / 4 * 3);
    let mut written = 0u64;

    for chunk in payload.as_bytes().chunks(DECODE_CHUNK_LEN) {
        buf.clear();
        general_purpose::STANDARD.decode_vec(chunk, &mut buf)?;
        writer.write_all(&buf)?;
        written += buf.len() as u64;
    }

    Ok(written)
}

/// Builds a `file://` URL for `path`, percent-encoding as needed.
///
/// Relative paths are made absolute against the current directory first.
pub fn file_url(path: &Path) -> io::Result<Url> {
    let absolute = path::absolute(path)?;
    Url::from_file_path(&absolute).map_err(|()| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Cannot express {} as a file URL", absolute.display()),
        )
    })
}

/// A decoded voice-over living in a temporary file.
///
/// The file is removed when the asset is dropped or [`released`](Self::release);
/// whoever holds the asset owns its lifetime.
#[derive(Debug)]
pub struct SynthesisAsset {
    path: TempPath,
    len: u64,
}

impl SynthesisAsset {
    /// Decodes `payload` into a new temporary file, created in `dir` when given.
    pub fn from_base64(payload: &str, dir: Option<&Path>) -> SynthesisResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("narration-").suffix(AUDIO_SUFFIX);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let len = {
            let mut writer = BufWriter::new(file.as_file_mut());
            let len = decode_base64_chunked(payload, &mut writer)?;
            writer.flush()?;
            len
        };

        Ok(Self {
            path: file.into_temp_path(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A `file://` URL suitable for a scene's `audioUrl`.
    pub fn url(&self) -> io::Result<Url> {
        file_url(&self.path)
    }

    pub fn mime(&self) -> &'static str {
        AUDIO_MIME
    }

    /// Decoded size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deletes the backing file now, reporting any error.
    pub fn release(self) -> io::Result<()> {
        self.path.close()
    }

    /// Moves the backing file to `dest` and stops tracking it.
    pub fn persist(self, dest: impl AsRef<Path>) -> io::Result<PathBuf> {
        let dest = dest.as_ref().to_path_buf();
        self.path.persist(&dest).map_err(|e| e.error)?;
        Ok(dest)
    }
}

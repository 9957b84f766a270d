//! Persistent compiled-program cache
//!
//! Compiled [`Program`]s are stored in a binary artifact file alongside the
//! delimiter fingerprint they were compiled with. A cached artifact is reused
//! only when it is at least as new as its source file and its fingerprint
//! matches the requested configuration; any other condition, including a
//! truncated or corrupted file, is treated as a miss and triggers a fresh
//! compile. Cache writes are best-effort: a failure to store never fails the
//! compilation itself.
//!
//! # File layout
//!
//! ```text
//! magic (9 bytes)
//! 10 fingerprint strings, chunk-encoded, in fixed order
//! payload length (u32, big-endian)
//! payload (bincode-serialized Program)
//! ```
//!
//! Strings are chunk-encoded as a u16 big-endian byte length followed by the
//! bytes; a length of 0xFFFF marks a full 65535-byte chunk with another chunk
//! following, so strings of any length round-trip.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::config::DelimiterConfig;
use crate::error::{Error, Result};
use crate::parser::{Compiler, Program};

/// Leading bytes of every cache artifact
const MAGIC: &[u8; 9] = b".macroche";

/// Chunk length marking a continued string
const CHUNK_CONTINUED: u16 = 0xFFFF;

/// Compiled-program cache rooted at one directory
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Creates a cache rooted at `root`; the directory is created on first store
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Cache { root: root.into() }
    }

    /// Removes every cached artifact
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Compiles `source_path`, reusing a fresh cached artifact when possible
    ///
    /// The artifact is reused only when it is at least as new as the source
    /// file and carries the same delimiter fingerprint. After a fresh
    /// compile the artifact is rewritten; a store failure is logged and
    /// otherwise ignored.
    pub fn fetch_or_compile(
        &self,
        source_path: impl AsRef<Path>,
        config: &DelimiterConfig,
    ) -> Result<Program> {
        let source_path = source_path.as_ref();
        // Canonicalizing lets the same file reached through different
        // relative paths share one artifact; an unresolvable path keeps its
        // spelled form and fails later, at the read
        let canonical = source_path
            .canonicalize()
            .unwrap_or_else(|_| source_path.to_path_buf());
        let artifact = self.artifact_path(&canonical);

        if let Some(program) = self.try_fetch(source_path, &artifact, config) {
            debug!(path = %source_path.display(), "cache hit");
            return Ok(program);
        }

        let source = fs::read_to_string(source_path)
            .map_err(|e| Error::from(e).in_file(source_path.display().to_string()))?;
        let program = Compiler::new(config)?
            .compile(&source)
            .map_err(|e| e.in_file(source_path.display().to_string()))?;

        if let Err(e) = self.store(&artifact, config, &program) {
            debug!(path = %artifact.display(), error = %e, "cache store failed");
        }
        Ok(program)
    }

    /// Where the artifact for `source_path` lives under the cache root
    fn artifact_path(&self, source_path: &Path) -> PathBuf {
        let mut path = self.root.clone();
        for component in source_path.components() {
            if let std::path::Component::Normal(part) = component {
                path.push(part);
            }
        }
        let mut name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".mpc");
        path.set_file_name(name);
        path
    }

    fn try_fetch(
        &self,
        source_path: &Path,
        artifact: &Path,
        config: &DelimiterConfig,
    ) -> Option<Program> {
        if !is_fresh(source_path, artifact) {
            return None;
        }
        match read_artifact(artifact, config) {
            Ok(program) => program,
            Err(e) => {
                debug!(path = %artifact.display(), error = %e, "unreadable cache artifact");
                None
            }
        }
    }

    fn store(&self, artifact: &Path, config: &DelimiterConfig, program: &Program) -> Result<()> {
        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(artifact)?;

        file.write_all(MAGIC)?;
        for affix in config.fingerprint() {
            write_string(&mut file, affix)?;
        }
        let payload = bincode::serialize(program)
            .map_err(|e| Error::CacheFormat(e.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::CacheFormat("program too large".to_string()))?;
        file.write_all(&len.to_be_bytes())?;
        file.write_all(&payload)?;
        Ok(())
    }
}

/// True when the artifact exists and is at least as new as the source
fn is_fresh(source_path: &Path, artifact: &Path) -> bool {
    let mtime = |path: &Path| -> Option<SystemTime> { fs::metadata(path).ok()?.modified().ok() };
    match (mtime(source_path), mtime(artifact)) {
        (Some(source), Some(cached)) => source <= cached,
        _ => false,
    }
}

/// Reads and validates one artifact; `Ok(None)` means a fingerprint mismatch
fn read_artifact(artifact: &Path, config: &DelimiterConfig) -> Result<Option<Program>> {
    let mut file = fs::File::open(artifact)?;

    let mut magic = [0u8; 9];
    file.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::CacheFormat("bad magic".to_string()));
    }

    for expected in config.fingerprint() {
        let stored = read_string(&mut file)?;
        if stored != expected {
            return Ok(None);
        }
    }

    let mut len_bytes = [0u8; 4];
    file.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as u64;
    // A corrupt length header must not drive the allocation; read what the
    // file actually holds, up to the declared length, and compare.
    let mut payload = Vec::new();
    let read = file.take(len).read_to_end(&mut payload)?;
    if read as u64 != len {
        return Err(Error::CacheFormat("truncated payload".to_string()));
    }

    let program = bincode::deserialize(&payload)
        .map_err(|e| Error::CacheFormat(e.to_string()))?;
    Ok(Some(program))
}

fn write_string(out: &mut impl Write, text: &str) -> Result<()> {
    let mut bytes = text.as_bytes();
    while bytes.len() >= CHUNK_CONTINUED as usize {
        out.write_all(&CHUNK_CONTINUED.to_be_bytes())?;
        out.write_all(&bytes[..CHUNK_CONTINUED as usize])?;
        bytes = &bytes[CHUNK_CONTINUED as usize..];
    }
    let len = bytes.len() as u16;
    out.write_all(&len.to_be_bytes())?;
    out.write_all(bytes)?;
    Ok(())
}

fn read_string(input: &mut impl Read) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let mut len_bytes = [0u8; 2];
        input.read_exact(&mut len_bytes)?;
        let len = u16::from_be_bytes(len_bytes);
        let start = bytes.len();
        bytes.resize(start + len as usize, 0);
        input.read_exact(&mut bytes[start..])?;
        if len != CHUNK_CONTINUED {
            break;
        }
    }
    String::from_utf8(bytes).map_err(|_| Error::CacheFormat("non-UTF-8 string".to_string()))
}

//! Entry containers: directory trees and zip archives

use crate::classify::{self, Detection, DetectionConfig};
use crate::error::{Error, Result};
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A single file inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path of the entry relative to the container root, `/`-separated
    pub name: String,
    /// Raw contents
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Classify the entry with a custom detection config
    pub fn detect(&self, config: &DetectionConfig) -> Detection {
        classify::detect(&self.data, config)
    }

    pub fn is_binary(&self) -> bool {
        classify::is_binary(&self.data)
    }

    /// Contents as text, or `None` when the entry is binary
    pub fn text(&self, config: &DetectionConfig) -> Option<&str> {
        if self.detect(config).is_binary() {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}

/// Something that holds named entries.
///
/// Directory entries are not listed; only files are. `close` flushes pending
/// writes and must be safe to call more than once.
pub trait Container {
    /// Entry names in natural order
    fn entry_names(&mut self) -> Result<Vec<String>>;

    fn read_entry(&mut self, name: &str) -> Result<Entry>;

    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Reject absolute names and names that escape the container root
fn check_entry_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let escapes = name.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::UnsafeEntryName(name.to_string()));
    }
    Ok(())
}

/// A directory subtree
#[derive(Debug, Clone)]
pub struct DirContainer {
    root: PathBuf,
}

impl DirContainer {
    /// Open an existing directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(Self { root })
    }

    /// Create (or reuse) a directory to write entries into
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        check_entry_name(name)?;
        Ok(self.root.join(name))
    }
}

impl Container for DirContainer {
    fn entry_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| Error::UnsafeEntryName(entry.path().display().to_string()))?;
            names.push(relative.to_string_lossy().replace('\\', "/"));
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Entry> {
        let path = self.entry_path(name)?;
        let data = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Entry::new(name, data))
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.entry_path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&path, data).map_err(|e| Error::io(&path, e))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

enum ZipState {
    Reading(ZipArchive<Cursor<Vec<u8>>>),
    Writing(ZipWriter<Cursor<Vec<u8>>>),
    /// Left behind when finishing the writer failed
    Broken,
}

/// An in-memory zip archive.
///
/// A container created with [`ZipContainer::create`] accepts writes until
/// [`Container::close`] is called; afterwards it can be read like one opened
/// with [`ZipContainer::open`].
pub struct ZipContainer {
    state: ZipState,
}

impl std::fmt::Debug for ZipContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ZipState::Reading(archive) => format!("reading ({} members)", archive.len()),
            ZipState::Writing(_) => "writing".to_string(),
            ZipState::Broken => "broken".to_string(),
        };
        f.debug_struct("ZipContainer").field("state", &state).finish()
    }
}

impl ZipContainer {
    /// Parse an archive held in memory
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self {
            state: ZipState::Reading(archive),
        })
    }

    /// Read an archive from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::open(bytes)
    }

    /// Start a new, empty archive
    pub fn create() -> Self {
        Self {
            state: ZipState::Writing(ZipWriter::new(Cursor::new(Vec::new()))),
        }
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    fn reader(&mut self) -> Result<&mut ZipArchive<Cursor<Vec<u8>>>> {
        match &mut self.state {
            ZipState::Reading(archive) => Ok(archive),
            ZipState::Writing(_) => Err(Error::ContainerState(
                "zip archive is still open for writing",
            )),
            ZipState::Broken => Err(Error::ContainerState("zip archive failed to finish")),
        }
    }

    /// Archive bytes, finishing the archive first if it is being written
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.close()?;
        match self.state {
            ZipState::Reading(archive) => Ok(archive.into_inner().into_inner()),
            _ => Err(Error::ContainerState("zip archive failed to finish")),
        }
    }

    /// Write the finished archive to `path`
    pub fn write_to(self, path: &Path) -> Result<()> {
        let bytes = self.into_bytes()?;
        std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
    }

    /// New archive holding only the entries under `path`, with that prefix removed
    pub fn subfolder(&mut self, path: &str) -> Result<ZipContainer> {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        let mut dest = ZipContainer::create();
        for name in self.entry_names()? {
            let Some(relative) = name.strip_prefix(&prefix) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }
            let entry = self.read_entry(&name)?;
            dest.write_entry(relative, &entry.data)?;
        }
        dest.close()?;
        Ok(dest)
    }
}

impl Container for ZipContainer {
    fn entry_names(&mut self) -> Result<Vec<String>> {
        let archive = self.reader()?;
        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            if !file.is_dir() {
                names.push(file.name().to_string());
            }
        }
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Entry> {
        let archive = self.reader()?;
        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(Error::MissingEntry(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::io(name, e))?;
        Ok(Entry::new(name, data))
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        check_entry_name(name)?;
        match &mut self.state {
            ZipState::Writing(writer) => {
                writer.start_file(name, Self::options())?;
                writer.write_all(data).map_err(|e| Error::io(name, e))?;
                Ok(())
            }
            _ => Err(Error::ContainerState("zip archive is closed for writing")),
        }
    }

    fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, ZipState::Broken) {
            ZipState::Writing(mut writer) => {
                let cursor = writer.finish()?;
                let archive = ZipArchive::new(Cursor::new(cursor.into_inner()))?;
                self.state = ZipState::Reading(archive);
            }
            other => self.state = other,
        }
        Ok(())
    }
}

/// Copy every entry from `source` to `dest` unchanged, closing `dest`
pub fn copy_entries<S, D>(source: &mut S, dest: &mut D) -> Result<usize>
where
    S: Container + ?Sized,
    D: Container + ?Sized,
{
    let copied = copy_all(source, dest);
    let closed = dest.close();
    let count = copied?;
    closed?;
    Ok(count)
}

fn copy_all<S, D>(source: &mut S, dest: &mut D) -> Result<usize>
where
    S: Container + ?Sized,
    D: Container + ?Sized,
{
    let names = source.entry_names()?;
    for name in &names {
        let entry = source.read_entry(name)?;
        dest.write_entry(&entry.name, &entry.data)?;
    }
    Ok(names.len())
}

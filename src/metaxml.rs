//! Removal of elements from `-meta.xml` descriptors

use crate::classify;
use crate::container::ZipContainer;
use crate::error::{Error, Result};
use crate::logger::{log_info, Logger};
use crate::rewrite::rewrite_zip;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::path::Path;
use walkdir::WalkDir;

/// Declaration written in front of re-serialized documents
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>";

pub const META_XML_SUFFIX: &str = "-meta.xml";

/// Element removed by default
pub const PACKAGE_VERSIONS_TAG: &str = "packageVersions";

/// Directories whose descriptors are cleaned by default
pub const META_XML_CLEAN_DIRS: [&str; 5] = ["classes/", "triggers/", "pages/", "aura/", "components/"];

/// Remove every element below the root whose local name is `tag`.
///
/// The element's tail text goes with it. When nothing matches the input is
/// returned borrowed and unchanged; otherwise the document is re-serialized
/// behind [`XML_DECLARATION`]. `entry` names the document in parse errors.
pub fn remove_xml_element<'a>(tag: &str, xml: &'a str, entry: &str) -> Result<Cow<'a, str>> {
    let mut reader = Reader::from_str(xml);
    let mut out: Vec<u8> = Vec::with_capacity(xml.len());

    let mut removed = 0usize;
    let mut depth = 0usize;
    // depth inside a removed element, 0 when not skipping
    let mut skip = 0usize;
    let mut seen_root = false;
    let mut drop_tail = false;
    // start tag not yet closed, so a childless element can collapse to `<x />`
    let mut pending: Option<Vec<u8>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::parse_at(e.to_string(), entry, xml, reader.buffer_position() as usize))?;
        let offset = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                depth += 1;
                if skip > 0 {
                    skip += 1;
                    continue;
                }
                if depth == 1 && seen_root {
                    return Err(Error::parse_at("junk after document element", entry, xml, offset));
                }
                seen_root = true;
                drop_tail = false;
                // the root element is never removed
                if depth > 1 && e.local_name().as_ref() == tag.as_bytes() {
                    removed += 1;
                    skip = 1;
                } else {
                    flush_pending(&mut out, &mut pending);
                    pending = Some(open_tag(&e));
                }
            }
            Event::Empty(e) => {
                if skip > 0 {
                    continue;
                }
                if depth == 0 && seen_root {
                    return Err(Error::parse_at("junk after document element", entry, xml, offset));
                }
                seen_root = true;
                if depth > 0 && e.local_name().as_ref() == tag.as_bytes() {
                    removed += 1;
                    drop_tail = true;
                } else {
                    flush_pending(&mut out, &mut pending);
                    out.extend_from_slice(&open_tag(&e));
                    out.extend_from_slice(b" />");
                    drop_tail = false;
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if skip > 0 {
                    skip -= 1;
                    drop_tail = skip == 0;
                    continue;
                }
                drop_tail = false;
                match pending.take() {
                    Some(open) => {
                        out.extend_from_slice(&open);
                        out.extend_from_slice(b" />");
                    }
                    None => {
                        out.extend_from_slice(b"</");
                        out.extend_from_slice(e.name().as_ref());
                        out.push(b'>');
                    }
                }
            }
            Event::Text(e) => {
                if skip > 0 {
                    continue;
                }
                if depth == 0 {
                    if e.iter().any(|b| !b.is_ascii_whitespace()) {
                        let message = if seen_root { "junk after document element" } else { "syntax error" };
                        return Err(Error::parse_at(message, entry, xml, offset));
                    }
                    continue;
                }
                if std::mem::take(&mut drop_tail) {
                    continue;
                }
                flush_pending(&mut out, &mut pending);
                out.extend_from_slice(&e);
            }
            Event::CData(e) => {
                if skip > 0 {
                    continue;
                }
                drop_tail = false;
                flush_pending(&mut out, &mut pending);
                out.extend_from_slice(b"<![CDATA[");
                out.extend_from_slice(&e);
                out.extend_from_slice(b"]]>");
            }
            Event::Comment(e) => {
                if skip > 0 || depth == 0 {
                    continue;
                }
                drop_tail = false;
                flush_pending(&mut out, &mut pending);
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(&e);
                out.extend_from_slice(b"-->");
            }
            Event::PI(e) => {
                if skip > 0 || depth == 0 {
                    continue;
                }
                drop_tail = false;
                flush_pending(&mut out, &mut pending);
                out.extend_from_slice(b"<?");
                out.extend_from_slice(&e);
                out.extend_from_slice(b"?>");
            }
            // replaced by XML_DECLARATION; doctypes are not carried over
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => {
                if depth > 0 {
                    return Err(Error::parse_at("unclosed token", entry, xml, offset));
                }
                if !seen_root {
                    return Err(Error::parse_at("no element found", entry, xml, offset));
                }
                break;
            }
        }
    }

    if removed == 0 {
        return Ok(Cow::Borrowed(xml));
    }

    let body = String::from_utf8(out).map_err(|e| Error::parse_at(e.to_string(), entry, xml, 0))?;
    Ok(Cow::Owned(format!("{XML_DECLARATION}\n{body}")))
}

fn open_tag(e: &BytesStart<'_>) -> Vec<u8> {
    let attributes = e.attributes_raw();
    let trimmed_len = attributes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let mut tag = Vec::with_capacity(1 + e.name().as_ref().len() + trimmed_len);
    tag.push(b'<');
    tag.extend_from_slice(e.name().as_ref());
    tag.extend_from_slice(&attributes[..trimmed_len]);
    tag
}

fn flush_pending(out: &mut Vec<u8>, pending: &mut Option<Vec<u8>>) {
    if let Some(open) = pending.take() {
        out.extend_from_slice(&open);
        out.push(b'>');
    }
}

/// Entry transform that removes an element from `-meta.xml` descriptors
pub struct MetaXmlCleaner<'a> {
    tag: String,
    /// Directory prefixes to clean; `None` cleans every descriptor
    dirs: Option<Vec<String>>,
    cleaned: usize,
    logger: Option<&'a dyn Logger>,
}

impl std::fmt::Debug for MetaXmlCleaner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaXmlCleaner")
            .field("tag", &self.tag)
            .field("dirs", &self.dirs)
            .field("cleaned", &self.cleaned)
            .finish()
    }
}

impl Default for MetaXmlCleaner<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> MetaXmlCleaner<'a> {
    /// Removes `packageVersions` from descriptors in the default directories
    pub fn new() -> Self {
        Self {
            tag: PACKAGE_VERSIONS_TAG.to_string(),
            dirs: Some(META_XML_CLEAN_DIRS.iter().map(|d| d.to_string()).collect()),
            cleaned: 0,
            logger: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Restrict cleaning to entries under these prefixes; `None` for all
    pub fn with_dirs(mut self, dirs: Option<Vec<String>>) -> Self {
        self.dirs = dirs;
        self
    }

    pub fn with_logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Number of entries changed so far
    pub fn cleaned(&self) -> usize {
        self.cleaned
    }

    pub fn applies_to(&self, name: &str) -> bool {
        name.ends_with(META_XML_SUFFIX)
            && self
                .dirs
                .as_ref()
                .map_or(true, |dirs| dirs.iter().any(|d| name.starts_with(d.as_str())))
    }

    /// Transform one entry
    pub fn clean(&mut self, name: &str, content: &str) -> Result<(String, String)> {
        if !self.applies_to(name) {
            return Ok((name.to_string(), content.to_string()));
        }
        let cleaned = remove_xml_element(&self.tag, content, name)?;
        if let Cow::Owned(_) = cleaned {
            self.cleaned += 1;
        }
        Ok((name.to_string(), cleaned.into_owned()))
    }

    /// Log the aggregate count of cleaned entries
    pub fn finish(&self) {
        if self.cleaned > 0 {
            let label = match self.tag.as_str() {
                PACKAGE_VERSIONS_TAG => "package versions",
                tag => tag,
            };
            log_info(self.logger, || format!("Cleaned {} from {} meta.xml files", label, self.cleaned));
        }
    }
}

/// Remove `packageVersions` from the archive's descriptors into a fresh archive
pub fn zip_clean_metaxml(zip: &mut ZipContainer, logger: Option<&dyn Logger>) -> Result<ZipContainer> {
    let mut cleaner = MetaXmlCleaner::new();
    cleaner.logger = logger;
    let dest = rewrite_zip(zip, |name, content| cleaner.clean(name, content))?;
    cleaner.finish();
    Ok(dest)
}

/// Remove `tag` in place from files under `dir` whose name matches `pattern`.
///
/// Returns the number of files rewritten. Binary files are skipped.
pub fn remove_xml_element_directory(tag: &str, dir: &Path, pattern: &str) -> Result<usize> {
    let pattern = glob::Pattern::new(pattern)?;
    let mut changed = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !pattern.matches(&file_name) {
            continue;
        }

        let path = entry.path();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        if classify::is_binary(&data) {
            continue;
        }
        let Ok(text) = std::str::from_utf8(&data) else {
            continue;
        };
        if let Cow::Owned(cleaned) = remove_xml_element(tag, text, &file_name)? {
            std::fs::write(path, cleaned).map_err(|e| Error::io(path, e))?;
            changed += 1;
        }
    }

    Ok(changed)
}

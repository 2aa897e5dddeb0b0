//! # nsrewrite
//!
//! Namespace rewriting for metadata package artifacts.
//!
//! Package sources are kept namespace-agnostic by replacing references to the
//! package namespace with placeholder tokens. At deploy time the tokens are
//! resolved for the target: a managed package, an unmanaged deployment, or a
//! namespaced org.
//!
//! ## Placeholders
//!
//! ```text
//! ___NAMESPACE___              in file names
//! %%%NAMESPACE%%%              namespace prefix when managed
//! %%%NAMESPACED_ORG%%%         namespace prefix in a namespaced org
//! %%%NAMESPACE_OR_C%%%         namespace when managed, else `c`
//! %%%NAMESPACED_ORG_OR_C%%%    namespace in a namespaced org, else `c`
//! ```
//!
//! ## Containers
//!
//! Rewrites run over a [`Container`]: a directory tree ([`DirContainer`]) or
//! an in-memory zip archive ([`ZipContainer`]). The [`Rewriter`] copies every
//! entry into a fresh destination, handing text entries to a transform and
//! passing binary entries through untouched.
//!
//! ```rust
//! use nsrewrite::{rewrite_zip, Container, NamespaceTransformer, ZipContainer};
//!
//! let mut zip = ZipContainer::create();
//! zip.write_entry("classes/___NAMESPACE___Foo.cls", b"%%%NAMESPACE%%%Bar__c")?;
//! zip.close()?;
//!
//! let inject = NamespaceTransformer::inject("ns", true, false);
//! let mut out = rewrite_zip(&mut zip, inject.as_fn())?;
//! assert_eq!(out.read_entry("classes/ns__Foo.cls")?.data, b"ns__Bar__c");
//! # Ok::<(), nsrewrite::Error>(())
//! ```
//!
//! ## Binary Detection
//!
//! An entry is binary when it is not valid UTF-8, contains a NUL byte, or has
//! too many control bytes near its start. See [`classify`].

pub mod classify;
pub mod container;
pub mod error;
pub mod files;
pub mod logger;
pub mod metaxml;
pub mod namespace;
pub mod package_xml;
pub mod rewrite;
pub mod tokens;

pub use classify::{is_binary, BinaryReason, Detection, DetectionConfig};
pub use container::{copy_entries, Container, DirContainer, Entry, ZipContainer};
pub use error::{Error, Result};
pub use files::{find_rename, find_replace, find_replace_regex};
pub use logger::{Logger, TracingLogger};
pub use metaxml::{remove_xml_element, remove_xml_element_directory, zip_clean_metaxml, MetaXmlCleaner};
pub use namespace::{NamespaceOp, NamespaceTransformer};
pub use package_xml::package_xml_from_dict;
pub use rewrite::{rewrite_dir, rewrite_zip, RewriteSummary, Rewriter};
pub use tokens::{inject, strip, tokenize, InjectContext, Placeholder};

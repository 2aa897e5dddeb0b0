//! Namespace placeholder tokens
//!
//! Source metadata is stored namespace-agnostic: references to the package
//! namespace are replaced by placeholders, and the placeholders are resolved
//! when the metadata is deployed.
//!
//! ```text
//! ___NAMESPACE___Foo.cls            file name token
//! %%%NAMESPACE%%%Field__c           managed package prefix
//! %%%NAMESPACED_ORG%%%Field__c      prefix in a namespaced org
//! %%%NAMESPACE_OR_C%%%:component    namespace, or `c` when unmanaged
//! %%%NAMESPACED_ORG_OR_C%%%:comp    namespace, or `c` outside a namespaced org
//! ```
//!
//! The two `_OR_C` placeholders exist because the same reference means either
//! the package namespace or the default `c` namespace depending on where the
//! metadata lands, so resolution is deferred to injection time.

use crate::logger::{log_info, Logger};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Token marking a namespace prefix in file names
pub const FILENAME_TOKEN: &str = "___NAMESPACE___";

/// Separator between a namespace and the component name
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Namespace used for unnamespaced references
pub const DEFAULT_NAMESPACE: &str = "c";

/// Content placeholder kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `%%%NAMESPACE%%%`: managed package prefix
    Namespace,
    /// `%%%NAMESPACED_ORG%%%`: prefix when deploying into a namespaced org
    NamespacedOrg,
    /// `%%%NAMESPACE_OR_C%%%`: namespace when managed, else `c`
    NamespaceOrC,
    /// `%%%NAMESPACED_ORG_OR_C%%%`: namespace in a namespaced org, else `c`
    NamespacedOrgOrC,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Namespace,
        Placeholder::NamespacedOrg,
        Placeholder::NamespaceOrC,
        Placeholder::NamespacedOrgOrC,
    ];

    /// Literal text of the placeholder
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Namespace => "%%%NAMESPACE%%%",
            Placeholder::NamespacedOrg => "%%%NAMESPACED_ORG%%%",
            Placeholder::NamespaceOrC => "%%%NAMESPACE_OR_C%%%",
            Placeholder::NamespacedOrgOrC => "%%%NAMESPACED_ORG_OR_C%%%",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Deployment context used to resolve placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectContext<'a> {
    pub namespace: &'a str,
    /// Deploying as a managed package
    pub managed: bool,
    /// Deploying into an org that carries the namespace itself
    pub namespaced_org: bool,
}

impl<'a> InjectContext<'a> {
    pub fn new(namespace: &'a str, managed: bool, namespaced_org: bool) -> Self {
        Self {
            namespace,
            managed,
            namespaced_org,
        }
    }

    /// `namespace__`, or empty when there is no namespace
    pub fn prefix(&self) -> String {
        if self.namespace.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.namespace, NAMESPACE_SEPARATOR)
        }
    }

    /// Value substituted for `placeholder`
    pub fn resolve(&self, placeholder: Placeholder) -> Cow<'a, str> {
        let (active, ambiguous) = match placeholder {
            Placeholder::Namespace => (self.managed, false),
            Placeholder::NamespacedOrg => (self.namespaced_org, false),
            Placeholder::NamespaceOrC => (self.managed, true),
            Placeholder::NamespacedOrgOrC => (self.namespaced_org, true),
        };
        let has_namespace = active && !self.namespace.is_empty();
        match (ambiguous, has_namespace) {
            (false, true) => Cow::Owned(self.prefix()),
            (false, false) => Cow::Borrowed(""),
            (true, true) => Cow::Borrowed(self.namespace),
            (true, false) => Cow::Borrowed(DEFAULT_NAMESPACE),
        }
    }

    /// Value substituted for [`FILENAME_TOKEN`]
    pub fn filename_prefix(&self) -> String {
        if self.managed {
            self.prefix()
        } else {
            String::new()
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Longest alternatives first
        Regex::new(r"%%%(?:NAMESPACED_ORG_OR_C|NAMESPACED_ORG|NAMESPACE_OR_C|NAMESPACE)%%%")
            .expect("placeholder pattern is valid")
    })
}

/// Replace namespace references with placeholders.
///
/// A leading `namespace__` on any path segment of `name` becomes
/// [`FILENAME_TOKEN`]. In `content`, `namespace__` becomes `%%%NAMESPACE%%%`
/// and `namespace:` becomes `%%%NAMESPACE_OR_C%%%:`.
///
/// With an empty namespace both inputs are returned borrowed.
pub fn tokenize<'a>(name: &'a str, content: &'a str, namespace: &str) -> (Cow<'a, str>, Cow<'a, str>) {
    if namespace.is_empty() {
        return (Cow::Borrowed(name), Cow::Borrowed(content));
    }
    let prefix = format!("{namespace}{NAMESPACE_SEPARATOR}");
    let or_c = format!("{}:", Placeholder::NamespaceOrC.token());

    let name = replace_segment_prefix(name, &prefix, FILENAME_TOKEN);
    let content = replace_references(content, namespace, Placeholder::Namespace.token(), &or_c);
    (name, content)
}

/// Resolve placeholders for the given deployment context.
///
/// Logs one message per placeholder kind that occurred and one for a rename.
pub fn inject<'a>(
    name: &'a str,
    content: &'a str,
    context: &InjectContext<'_>,
    logger: Option<&dyn Logger>,
) -> (Cow<'a, str>, Cow<'a, str>) {
    let mut seen = [false; 4];
    let content = placeholder_regex().replace_all(content, |caps: &Captures| {
        match Placeholder::from_token(&caps[0]) {
            Some(placeholder) => {
                seen[placeholder.index()] = true;
                context.resolve(placeholder).into_owned()
            }
            None => caps[0].to_string(),
        }
    });

    for placeholder in Placeholder::ALL {
        if seen[placeholder.index()] {
            log_info(logger, || {
                format!(
                    "  {}: Replaced {} with \"{}\"",
                    name,
                    placeholder.token(),
                    context.resolve(placeholder)
                )
            });
        }
    }

    let new_name = if name.contains(FILENAME_TOKEN) {
        let renamed = name.replace(FILENAME_TOKEN, &context.filename_prefix());
        log_info(logger, || format!("  {}: renamed to {}", name, renamed));
        Cow::Owned(renamed)
    } else {
        Cow::Borrowed(name)
    };

    (new_name, content)
}

/// Remove the namespace from a name and its content.
///
/// `namespace__` is dropped and `namespace:` becomes `c:`. Emits a single log
/// message when anything changed.
pub fn strip<'a>(
    name: &'a str,
    content: &'a str,
    namespace: &str,
    logger: Option<&dyn Logger>,
) -> (Cow<'a, str>, Cow<'a, str>) {
    if namespace.is_empty() {
        return (Cow::Borrowed(name), Cow::Borrowed(content));
    }
    let prefix = format!("{namespace}{NAMESPACE_SEPARATOR}");
    let c_ref = format!("{DEFAULT_NAMESPACE}:");

    let new_name = replace_segment_prefix(name, &prefix, "");
    let new_content = replace_references(content, namespace, "", &c_ref);

    if matches!(new_name, Cow::Owned(_)) || matches!(new_content, Cow::Owned(_)) {
        log_info(logger, || format!("  {}: removed {}", name, prefix));
    }
    (new_name, new_content)
}

/// Replace `from` at the start of each `/`-separated segment of `name`
fn replace_segment_prefix<'a>(name: &'a str, from: &str, to: &str) -> Cow<'a, str> {
    if !name.split('/').any(|segment| segment.starts_with(from)) {
        return Cow::Borrowed(name);
    }
    let segments: Vec<String> = name
        .split('/')
        .map(|segment| match segment.strip_prefix(from) {
            Some(rest) => format!("{to}{rest}"),
            None => segment.to_string(),
        })
        .collect();
    Cow::Owned(segments.join("/"))
}

/// Rewrite `namespace__` and `namespace:` references in one left-to-right pass.
///
/// `prefix_with` replaces `namespace__`; `colon_with` replaces `namespace:`
/// including the colon. Replacement text is never rescanned.
fn replace_references<'a>(content: &'a str, namespace: &str, prefix_with: &str, colon_with: &str) -> Cow<'a, str> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = content[search..].find(namespace) {
        let start = search + found;
        let end = start + namespace.len();
        let rest = &content[end..];

        let (replacement, consumed) = if rest.starts_with(NAMESPACE_SEPARATOR) {
            (prefix_with, NAMESPACE_SEPARATOR.len())
        } else if rest.starts_with(':') {
            (colon_with, 1)
        } else {
            search = start + content[start..].chars().next().map_or(1, char::len_utf8);
            continue;
        };

        let buf = out.get_or_insert_with(|| String::with_capacity(content.len()));
        buf.push_str(&content[copied..start]);
        buf.push_str(replacement);
        copied = end + consumed;
        search = copied;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&content[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(content),
    }
}

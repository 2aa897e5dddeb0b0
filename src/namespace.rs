//! Namespace transforms for the rewrite pipeline

use crate::error::Result;
use crate::logger::Logger;
use crate::tokens::{self, InjectContext};

/// What to do with namespace references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOp {
    /// Resolve placeholders for a deployment target
    Inject { managed: bool, namespaced_org: bool },
    /// Remove the namespace
    Strip,
    /// Replace namespace references with placeholders
    Tokenize,
}

/// Applies a [`NamespaceOp`] to entries
pub struct NamespaceTransformer<'a> {
    namespace: String,
    op: NamespaceOp,
    logger: Option<&'a dyn Logger>,
}

impl std::fmt::Debug for NamespaceTransformer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceTransformer")
            .field("namespace", &self.namespace)
            .field("op", &self.op)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl<'a> NamespaceTransformer<'a> {
    pub fn new(namespace: impl Into<String>, op: NamespaceOp) -> Self {
        Self {
            namespace: namespace.into(),
            op,
            logger: None,
        }
    }

    pub fn inject(namespace: impl Into<String>, managed: bool, namespaced_org: bool) -> Self {
        Self::new(namespace, NamespaceOp::Inject { managed, namespaced_org })
    }

    pub fn strip(namespace: impl Into<String>) -> Self {
        Self::new(namespace, NamespaceOp::Strip)
    }

    pub fn tokenize(namespace: impl Into<String>) -> Self {
        Self::new(namespace, NamespaceOp::Tokenize)
    }

    /// Report renames and substitutions to `logger`
    pub fn with_logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn op(&self) -> NamespaceOp {
        self.op
    }

    /// Transform one entry
    pub fn apply(&self, name: &str, content: &str) -> (String, String) {
        let (name, content) = match self.op {
            NamespaceOp::Inject { managed, namespaced_org } => {
                let context = InjectContext::new(&self.namespace, managed, namespaced_org);
                tokens::inject(name, content, &context, self.logger)
            }
            NamespaceOp::Strip => tokens::strip(name, content, &self.namespace, self.logger),
            NamespaceOp::Tokenize => tokens::tokenize(name, content, &self.namespace),
        };
        (name.into_owned(), content.into_owned())
    }

    /// The transform as a closure for [`crate::rewrite::Rewriter::rewrite`]
    pub fn as_fn(&self) -> impl FnMut(&str, &str) -> Result<(String, String)> + '_ {
        move |name, content| Ok(self.apply(name, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::zip_with;
    use crate::container::Container;
    use crate::logger::testing::RecordingLogger;
    use crate::rewrite::rewrite_zip;

    #[test]
    fn test_apply_inject() {
        let transformer = NamespaceTransformer::inject("ns", true, false);
        let (name, content) = transformer.apply("___NAMESPACE___test", "%%%NAMESPACE%%%x");
        assert_eq!(name, "ns__test");
        assert_eq!(content, "ns__x");
    }

    #[test]
    fn test_zip_inject_with_logger() {
        let logger = RecordingLogger::new();
        let transformer = NamespaceTransformer::inject("ns", true, false).with_logger(&logger);
        let mut zip = zip_with(&[
            ("classes/___NAMESPACE___Foo.cls", b"%%%NAMESPACE%%%Bar__c"),
            ("static/logo.png", b"\x89PNG\x9c%%%NAMESPACE%%%"),
            ("classes/Plain.cls", b"class Plain {}"),
        ]);

        let mut out = rewrite_zip(&mut zip, transformer.as_fn()).unwrap();
        assert_eq!(
            out.entry_names().unwrap(),
            vec!["classes/ns__Foo.cls", "static/logo.png", "classes/Plain.cls"]
        );
        assert_eq!(out.read_entry("classes/ns__Foo.cls").unwrap().data, b"ns__Bar__c");
        assert_eq!(
            out.read_entry("static/logo.png").unwrap().data,
            b"\x89PNG\x9c%%%NAMESPACE%%%"
        );
        // one substitution and one rename
        assert_eq!(logger.count(), 2);
    }

    #[test]
    fn test_zip_strip_then_tokenize() {
        let mut zip = zip_with(&[("aura/ns__cmp.cmp", b"<ns:child/>")]);

        let strip = NamespaceTransformer::strip("ns");
        let mut stripped = rewrite_zip(&mut zip, strip.as_fn()).unwrap();
        assert_eq!(stripped.read_entry("aura/cmp.cmp").unwrap().data, b"<c:child/>");

        let tokenize = NamespaceTransformer::tokenize("ns");
        let mut tokenized = rewrite_zip(&mut zip, tokenize.as_fn()).unwrap();
        assert_eq!(
            tokenized.read_entry("aura/___NAMESPACE___cmp.cmp").unwrap().data,
            b"<%%%NAMESPACE_OR_C%%%:child/>"
        );
    }
}

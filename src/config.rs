//! Reader and writer configuration

use crate::model::Extension;
use std::collections::HashSet;

/// How hard the engine pushes back on questionable input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Return the document whatever the findings; recoverable parse
    /// problems become findings instead of errors
    Lenient,
    /// Fail on Fatal findings only
    #[default]
    Standard,
    /// Fail on Error findings as well, and treat degenerate triangles and
    /// orphaned resources as errors
    Strict,
}

/// What to do with elements and attributes from namespaces nobody declared
/// support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownNamespacePolicy {
    /// Skip them
    #[default]
    Ignore,
    /// Keep them verbatim and write them back out
    Preserve,
    /// Fail the load
    Reject,
}

/// Configuration for reading 3MF packages
///
/// ```
/// use lib3mf_engine::{Extension, ParserConfig, Strictness};
///
/// let config = ParserConfig::new()
///     .with_extension(Extension::Material)
///     .with_strictness(Strictness::Strict);
/// assert!(config.supports(&Extension::Material));
/// assert!(!config.supports(&Extension::Slice));
/// ```
#[derive(Debug, Clone)]
pub struct ParserConfig {
    supported_extensions: HashSet<Extension>,
    custom_namespaces: HashSet<String>,
    strictness: Strictness,
    unknown_namespaces: UnknownNamespacePolicy,
    validate: bool,
}

impl ParserConfig {
    /// Core support only
    pub fn new() -> Self {
        Self {
            supported_extensions: HashSet::from([Extension::Core]),
            custom_namespaces: HashSet::new(),
            strictness: Strictness::Standard,
            unknown_namespaces: UnknownNamespacePolicy::Ignore,
            validate: true,
        }
    }

    /// Every known extension
    pub fn with_all_extensions() -> Self {
        Self {
            supported_extensions: Extension::ALL.into_iter().collect(),
            ..Self::new()
        }
    }

    /// Lenient reading with every known extension
    pub fn lenient() -> Self {
        Self::with_all_extensions().with_strictness(Strictness::Lenient)
    }

    /// Strict reading with every known extension; unknown namespaces are
    /// rejected
    pub fn strict() -> Self {
        Self::with_all_extensions()
            .with_strictness(Strictness::Strict)
            .with_unknown_namespaces(UnknownNamespacePolicy::Reject)
    }

    /// Add support for a specific extension
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.supported_extensions.insert(extension);
        self
    }

    /// Accept a vendor namespace: its content is preserved and it may appear
    /// in `requiredextensions`
    pub fn with_custom_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.custom_namespaces.insert(namespace.into());
        self
    }

    /// Set the strictness level
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Set the unknown-namespace policy
    pub fn with_unknown_namespaces(mut self, policy: UnknownNamespacePolicy) -> Self {
        self.unknown_namespaces = policy;
        self
    }

    /// Run validation after loading
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Whether an extension is supported
    pub fn supports(&self, extension: &Extension) -> bool {
        self.supported_extensions.contains(extension)
    }

    /// Whether a vendor namespace was registered
    pub fn has_custom_namespace(&self, namespace: &str) -> bool {
        self.custom_namespaces.contains(namespace)
    }

    /// Supported extensions
    pub fn supported_extensions(&self) -> &HashSet<Extension> {
        &self.supported_extensions
    }

    /// Strictness level
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Unknown-namespace policy
    pub fn unknown_namespaces(&self) -> UnknownNamespacePolicy {
        self.unknown_namespaces
    }

    /// Whether loading validates
    pub fn validates(&self) -> bool {
        self.validate
    }
}

impl Default for ParserConfig {
    /// All known extensions at standard strictness
    fn default() -> Self {
        Self::with_all_extensions()
    }
}

/// Configuration for writing 3MF packages
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    validate: bool,
    strictness: Strictness,
}

impl WriterConfig {
    /// Validate at standard strictness before writing
    pub fn new() -> Self {
        Self {
            validate: true,
            strictness: Strictness::Standard,
        }
    }

    /// Skip or run validation before writing
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Strictness for the pre-save validation
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Whether saving validates
    pub fn validates(&self) -> bool {
        self.validate
    }

    /// Strictness for the pre-save validation
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_supports_core_only() {
        let config = ParserConfig::new();
        assert!(config.supports(&Extension::Core));
        assert!(!config.supports(&Extension::Volumetric));
        assert_eq!(config.strictness(), Strictness::Standard);
        assert!(config.validates());
    }

    #[test]
    fn test_presets() {
        let strict = ParserConfig::strict();
        assert_eq!(strict.unknown_namespaces(), UnknownNamespacePolicy::Reject);
        assert!(strict.supports(&Extension::Slice));

        let lenient = ParserConfig::lenient();
        assert_eq!(lenient.strictness(), Strictness::Lenient);
        assert_eq!(lenient.unknown_namespaces(), UnknownNamespacePolicy::Ignore);
    }

    #[test]
    fn test_custom_namespace() {
        let config = ParserConfig::new().with_custom_namespace("http://example.com/ext/2024");
        assert!(config.has_custom_namespace("http://example.com/ext/2024"));
        assert!(!config.has_custom_namespace("http://example.com/other"));
    }
}

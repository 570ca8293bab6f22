use std::rc::Rc;

/// Context for include resolution
#[derive(Clone, Debug, Default)]
pub struct IncludeContext {
    /// Stack of files currently being processed, outermost first
    pub include_stack: Vec<String>,
}

/// Type alias for include resolver function
pub type IncludeResolver = Rc<dyn Fn(&str, &IncludeContext) -> Option<String>>;

/// Type alias for warning handler function
pub type WarningHandler = Rc<dyn Fn(&str)>;

/// Configuration for the preprocessor
#[derive(Default)]
pub struct PreprocessorConfig {
    /// Names pre-registered as existence-only macros before processing begins
    pub defines: Vec<String>,
    /// Custom include file resolver function; defaults to reading the path
    /// from the file system
    pub include_resolver: Option<IncludeResolver>,
    /// Optional handler for directive warnings; defaults to `log::warn!`
    pub warning_handler: Option<WarningHandler>,
}

impl PreprocessorConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register `name` as an existence-only macro
    #[must_use]
    pub fn with_define<S: Into<String>>(mut self, name: S) -> Self {
        self.defines.push(name.into());
        self
    }

    /// Set a custom include resolver function
    #[must_use]
    pub fn with_include_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &IncludeContext) -> Option<String> + 'static,
    {
        self.include_resolver = Some(Rc::new(f));
        self
    }

    /// Set a handler for directive warnings
    #[must_use]
    pub fn with_warning_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        self.warning_handler = Some(Rc::new(f));
        self
    }
}

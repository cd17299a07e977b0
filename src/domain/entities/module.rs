use std::fmt;

/// Produces the usage text shown for `usage <module>`.
pub type UsageProvider = fn() -> String;

/// Descriptive metadata a module contributes while loaded
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub author: String,
    pub description: String,
    pub credits: Option<String>,
    pub usage: Option<UsageProvider>,
}

impl ModuleInfo {
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            description: description.into(),
            credits: None,
            usage: None,
        }
    }

    pub fn with_credits(mut self, credits: impl Into<String>) -> Self {
        self.credits = Some(credits.into());
        self
    }

    pub fn with_usage(mut self, usage: UsageProvider) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Help metadata for one registered command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub command: String,
    pub category: String,
    pub description: Option<String>,
    pub examples: Vec<String>,
    pub permissions: Vec<String>,
}

impl HelpEntry {
    pub fn new(command: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            category: category.into(),
            description: None,
            examples: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Core-category commands are immune to being disabled.
    pub fn is_core(&self) -> bool {
        self.category.eq_ignore_ascii_case("core")
    }
}

/// Lifecycle state of a known module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loaded,
    FailedLastLoad,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loaded => "loaded",
            LoadState::FailedLastLoad => "failed last load",
        };
        write!(f, "{}", s)
    }
}

/// Tracks one module the registry has seen, surviving unloads
#[derive(Debug, Clone, Default)]
pub struct ModuleRecord {
    pub name: String,
    pub state: LoadState,
    pub commands: Vec<String>,
}

impl ModuleRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }
}

//! URL parameter key configuration
//!
//! [`ParamsConfig`] maps the logical parameter names (free text, page, and
//! the three constraint categories) to URL key strings and back. The two
//! lookup tables are built once from [`ParamsOptions`] and never mutated.

use indexmap::IndexMap;

/// Logical URL parameter names recognized by a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalParam {
    Qtext,
    Page,
    Constraints,
    OrConstraints,
    NotConstraints,
}

impl LogicalParam {
    pub const ALL: [Self; 5] = [
        Self::Qtext,
        Self::Page,
        Self::Constraints,
        Self::OrConstraints,
        Self::NotConstraints,
    ];

    /// Default URL key for this parameter.
    #[must_use]
    pub const fn default_key(self) -> &'static str {
        match self {
            Self::Qtext => "q",
            Self::Page => "p",
            Self::Constraints => "c",
            Self::OrConstraints => "o",
            Self::NotConstraints => "n",
        }
    }

    /// The constraint category this parameter carries, if any.
    #[must_use]
    pub const fn category(self) -> Option<ConstraintCategory> {
        match self {
            Self::Constraints => Some(ConstraintCategory::Constraints),
            Self::OrConstraints => Some(ConstraintCategory::OrConstraints),
            Self::NotConstraints => Some(ConstraintCategory::NotConstraints),
            Self::Qtext | Self::Page => None,
        }
    }
}

/// The three constraint parameter families: AND, OR, and NOT semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintCategory {
    Constraints,
    OrConstraints,
    NotConstraints,
}

impl ConstraintCategory {
    pub const ALL: [Self; 3] = [
        Self::Constraints,
        Self::OrConstraints,
        Self::NotConstraints,
    ];

    /// The logical parameter carrying this category.
    #[must_use]
    pub const fn logical(self) -> LogicalParam {
        match self {
            Self::Constraints => LogicalParam::Constraints,
            Self::OrConstraints => LogicalParam::OrConstraints,
            Self::NotConstraints => LogicalParam::NotConstraints,
        }
    }
}

/// Per-parameter key override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyOverride {
    /// Use the default key.
    #[default]
    Default,
    /// Exclude the parameter family from both mappings entirely.
    Disabled,
    /// Use a custom key.
    Custom(String),
}

/// Inputs to [`ParamsConfig::new`].
#[derive(Debug, Clone, Default)]
pub struct ParamsOptions {
    pub qtext: KeyOverride,
    pub page: KeyOverride,
    pub constraints: KeyOverride,
    pub or_constraints: KeyOverride,
    pub not_constraints: KeyOverride,
    /// Separator between constraint name and value token (default `:`).
    pub separator: Option<String>,
    /// Prefix prepended to every key.
    pub prefix: Option<String>,
    /// Separator between prefix and key (falls back to `separator`).
    pub prefix_separator: Option<String>,
}

impl ParamsOptions {
    const fn override_for(&self, param: LogicalParam) -> &KeyOverride {
        match param {
            LogicalParam::Qtext => &self.qtext,
            LogicalParam::Page => &self.page,
            LogicalParam::Constraints => &self.constraints,
            LogicalParam::OrConstraints => &self.or_constraints,
            LogicalParam::NotConstraints => &self.not_constraints,
        }
    }
}

/// Immutable bidirectional mapping between logical parameter names and URL
/// keys.
#[derive(Debug, Clone)]
pub struct ParamsConfig {
    separator: String,
    prefix: String,
    by_name: IndexMap<LogicalParam, String>,
    by_key: IndexMap<String, LogicalParam>,
    constraint_keys: Vec<String>,
}

impl ParamsConfig {
    #[must_use]
    pub fn new(options: &ParamsOptions) -> Self {
        let separator = options
            .separator
            .clone()
            .unwrap_or_else(|| ":".to_string());
        let prefix = options.prefix.as_ref().map_or_else(String::new, |prefix| {
            let joiner = options.prefix_separator.as_deref().unwrap_or(&separator);
            format!("{prefix}{joiner}")
        });

        let mut by_name = IndexMap::new();
        let mut by_key = IndexMap::new();
        let mut constraint_keys = Vec::new();

        for param in LogicalParam::ALL {
            let key = match options.override_for(param) {
                KeyOverride::Disabled => continue,
                KeyOverride::Default => param.default_key().to_string(),
                KeyOverride::Custom(key) => key.clone(),
            };
            let key = format!("{prefix}{key}");
            by_name.insert(param, key.clone());
            by_key.insert(key.clone(), param);
            if param.category().is_some() {
                constraint_keys.push(key);
            }
        }

        Self {
            separator,
            prefix,
            by_name,
            by_key,
            constraint_keys,
        }
    }

    /// URL key for a logical parameter, if that family is enabled.
    #[must_use]
    pub fn key_for(&self, param: LogicalParam) -> Option<&str> {
        self.by_name.get(&param).map(String::as_str)
    }

    /// Logical parameter behind a URL key, if recognized.
    #[must_use]
    pub fn name_for(&self, key: &str) -> Option<LogicalParam> {
        self.by_key.get(key).copied()
    }

    /// Separator between constraint name and value token.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Effective key prefix (already joined with its separator).
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Keys of the enabled constraint categories, in category order.
    #[must_use]
    pub fn constraint_keys(&self) -> &[String] {
        &self.constraint_keys
    }
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self::new(&ParamsOptions::default())
    }
}

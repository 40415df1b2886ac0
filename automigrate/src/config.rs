use crate::errors::{AutomigrateError, AutomigrateResult};
use crate::template::TemplateLang;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Settings of an [`AutoMigrator`](crate::AutoMigrator).
///
/// Immutable once built; cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct AutomigrateConfig {
    inner: Arc<AutomigrateConfigInner>,
}

impl AutomigrateConfig {
    /// Language of the generated migration files.
    pub fn template_lang(&self) -> TemplateLang {
        self.inner.template_lang
    }

    /// Directory the migration files are written to.
    pub fn migrations_dir(&self) -> &Path {
        &self.inner.migrations_dir
    }

    /// Whether schema events produce migration files.
    pub fn auto_enabled(&self) -> bool {
        self.inner.auto_enabled
    }
}

impl Default for AutomigrateConfig {
    fn default() -> Self {
        let template_lang = TemplateLang::default();
        AutomigrateConfig {
            inner: Arc::new(AutomigrateConfigInner {
                template_lang,
                migrations_dir: PathBuf::from(template_lang.default_migrations_dir()),
                auto_enabled: true,
            }),
        }
    }
}

#[derive(Debug)]
struct AutomigrateConfigInner {
    template_lang: TemplateLang,
    migrations_dir: PathBuf,
    auto_enabled: bool,
}

/// Builder for [`AutomigrateConfig`].
///
/// Setters never fail on their own; the first invalid value is remembered
/// and returned by [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use automigrate::{AutomigrateBuilder, TemplateLang};
///
/// let config = AutomigrateBuilder::new()
///     .template_lang(TemplateLang::Go)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.migrations_dir().to_str(), Some("migrations"));
/// assert!(config.auto_enabled());
/// ```
pub struct AutomigrateBuilder {
    error: Option<AutomigrateError>,
    template_lang: TemplateLang,
    migrations_dir: Option<PathBuf>,
    auto_enabled: bool,
}

impl AutomigrateBuilder {
    pub fn new() -> Self {
        AutomigrateBuilder {
            error: None,
            template_lang: TemplateLang::default(),
            migrations_dir: None,
            auto_enabled: true,
        }
    }

    pub fn template_lang(mut self, template_lang: TemplateLang) -> Self {
        self.template_lang = template_lang;
        self
    }

    /// Sets the language from its name, e.g. `"js"` or `"go"`.
    pub fn template_lang_name(mut self, name: &str) -> Self {
        if self.error.is_none() {
            match TemplateLang::from_str(name) {
                Ok(template_lang) => self.template_lang = template_lang,
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Sets the output directory. An empty path selects the language's
    /// default directory.
    pub fn migrations_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.migrations_dir = if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir.to_path_buf())
        };
        self
    }

    pub fn auto_enabled(mut self, auto_enabled: bool) -> Self {
        self.auto_enabled = auto_enabled;
        self
    }

    /// Returns the configuration or the first error a setter recorded.
    pub fn build(self) -> AutomigrateResult<AutomigrateConfig> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let migrations_dir = self
            .migrations_dir
            .unwrap_or_else(|| PathBuf::from(self.template_lang.default_migrations_dir()));
        Ok(AutomigrateConfig {
            inner: Arc::new(AutomigrateConfigInner {
                template_lang: self.template_lang,
                migrations_dir,
                auto_enabled: self.auto_enabled,
            }),
        })
    }
}

impl Default for AutomigrateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = AutomigrateConfig::default();
        assert_eq!(config.template_lang(), TemplateLang::Js);
        assert_eq!(config.migrations_dir(), Path::new("pb_migrations"));
        assert!(config.auto_enabled());
    }

    #[test]
    fn test_builder_defaults_match_default_config() {
        let built = AutomigrateBuilder::new().build().unwrap();
        let default = AutomigrateConfig::default();
        assert_eq!(built.template_lang(), default.template_lang());
        assert_eq!(built.migrations_dir(), default.migrations_dir());
        assert_eq!(built.auto_enabled(), default.auto_enabled());
    }

    #[test]
    fn test_builder_overrides() {
        let config = AutomigrateBuilder::new()
            .template_lang_name("go")
            .migrations_dir("/srv/app/migrations_go")
            .auto_enabled(false)
            .build()
            .unwrap();
        assert_eq!(config.template_lang(), TemplateLang::Go);
        assert_eq!(config.migrations_dir(), Path::new("/srv/app/migrations_go"));
        assert!(!config.auto_enabled());
    }

    #[test]
    fn test_empty_dir_falls_back_to_language_default() {
        let config = AutomigrateBuilder::new()
            .migrations_dir("")
            .template_lang(TemplateLang::Go)
            .build()
            .unwrap();
        assert_eq!(config.migrations_dir(), Path::new("migrations"));
    }

    #[test]
    fn test_invalid_lang_is_reported_by_build() {
        let result = AutomigrateBuilder::new()
            .template_lang_name("ts")
            .template_lang_name("go")
            .build();
        let err = result.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigError);
        assert!(err.message().contains("ts"));
    }
}

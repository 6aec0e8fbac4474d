//! Configuration layering
// (c) 2026 rescp developers

use std::fmt::{Display, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    Figment, Metadata, Provider,
    providers::{Env, Format as _, Serialized, Toml},
    value::Value,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::structure::FIELD_NAMES;
use super::{BASE_CONFIG_FILENAME, Configuration, ENV_PREFIX};

/// Processes and merges all possible configuration sources.
///
/// In decreasing order of priority:
/// 1. Command-line options (merged in by the caller)
/// 2. Environment variables beginning `RESCP_`
/// 3. The user configuration file (`~/.config/rescp/rescp.toml` on Linux)
/// 4. The system configuration file (`/etc/rescp.toml` on Unix)
/// 5. Hard-wired defaults
#[derive(Debug)]
pub struct Manager {
    /// Configuration data
    data: Figment,
}

impl Manager {
    fn new(apply_env: bool, apply_config_files: bool) -> Self {
        let mut new1 = Self {
            data: Figment::new(),
        };
        if apply_config_files {
            new1.add_config("system", Self::system_config_path().as_deref());
            new1.add_config("user", Self::user_config_path().as_deref());
        }
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use.
    ///
    /// Reads the configuration files appropriate to the platform and the current user,
    /// and the environment.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(true, true)
    }

    /// Testing/internal constructor, does not read files from system or apply environment; DOES apply system default.
    #[must_use]
    #[cfg(test)]
    pub(crate) fn without_files() -> Self {
        let mut new1 = Self::new(false, false);
        new1.apply_system_default();
        new1
    }

    fn add_config(&mut self, what: &str, path: Option<&Path>) {
        let Some(path) = path else {
            debug!("no {what} configuration file path on this platform");
            return;
        };
        if !path.exists() {
            debug!("{what} configuration file {path:?} not present");
            return;
        }
        self.merge_file(path);
    }

    /// Merges in a TOML configuration file
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) {
        self.merge_provider(Toml::file_exact(path.as_ref()));
    }

    /// The system-wide configuration file, if the platform has one
    #[must_use]
    pub fn system_config_path() -> Option<PathBuf> {
        if cfg!(unix) {
            Some(PathBuf::from("/etc").join(BASE_CONFIG_FILENAME))
        } else {
            None
        }
    }

    /// The current user's configuration file
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rescp").join(BASE_CONFIG_FILENAME))
    }

    /// Returns the list of configuration files we read.
    #[must_use]
    pub fn config_files() -> Vec<String> {
        [Self::system_config_path(), Self::user_config_path()]
            .into_iter()
            .flatten()
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider); // in the error case, this leaves the provider in a fused state
    }

    /// Applies the system default settings, at a lower priority than everything else
    pub fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(
            Serialized::defaults(Configuration::system_default()).profile(figment::Profile::Default),
        );
    }

    /// Attempts to extract a particular struct from the data.
    pub fn get<'de, T>(&self) -> Result<T, figment::Error>
    where
        T: Deserialize<'de>,
    {
        self.data.extract_lossy::<T>()
    }

    /// Extracts and validates the final [`Configuration`]
    pub fn configuration(&self) -> Result<Configuration> {
        let config: Configuration = self.get()?;
        config.validate()?;
        Ok(config)
    }

    /// Creates an ephemeral structure that renders the configuration as a table, showing
    /// where each value came from.
    #[must_use]
    pub fn display(&self) -> DisplayAdapter<'_> {
        DisplayAdapter { source: self }
    }
}

/// Pretty-printing type wrapper to Manager
#[derive(Debug)]
pub struct DisplayAdapter<'a> {
    source: &'a Manager,
}

fn render_source(meta: Option<&Metadata>) -> String {
    meta.map(|m| {
        m.source
            .as_ref()
            .map_or_else(|| m.name.to_string(), figment::Source::to_string)
    })
    .unwrap_or_default()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(_tag, s) => s.clone(),
        Value::Char(_tag, c) => c.to_string(),
        Value::Bool(_tag, b) => b.to_string(),
        Value::Num(_tag, num) => num
            .to_i128()
            .map(|i| i.to_string())
            .or_else(|| num.to_f64().map(|f| f.to_string()))
            .unwrap_or_default(),
        Value::Empty(_tag, _) => "<empty>".into(),
        Value::Dict(_tag, dict) => format!("{{{} entries}}", dict.len()),
        Value::Array(_tag, vec) => format!(
            "[{}]",
            vec.iter().map(render_value).collect::<Vec<_>>().join(",")
        ),
    }
}

impl Display for DisplayAdapter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = &self.source.data;
        let mut rows = vec![("FIELD".to_owned(), "VALUE".to_owned(), "SOURCE".to_owned())];
        for field in FIELD_NAMES {
            let Ok(value) = data.find_value(field) else {
                continue;
            };
            let meta = data.get_metadata(value.tag());
            let mut rendered = render_value(&value);
            if *field == "password" && !rendered.is_empty() {
                rendered = "********".into();
            }
            rows.push(((*field).to_owned(), rendered, render_source(meta)));
        }
        let w1 = rows.iter().map(|r| r.0.len()).max().unwrap_or_default();
        let w2 = rows.iter().map(|r| r.1.len()).max().unwrap_or_default();
        let mut out = String::new();
        for (field, value, source) in rows {
            let _ = writeln!(out, "{field:w1$}  {value:w2$}  {source}");
        }
        f.write_str(out.trim_end())
    }
}

impl Manager {
    /// Logs a warning for any unrecognised keys in the data
    pub fn warn_unknown_fields(&self) {
        let Ok(dict) = self.data.data() else {
            return;
        };
        for profile in dict.values() {
            for key in profile.keys() {
                if !FIELD_NAMES.contains(&key.as_str()) {
                    warn!("ignoring unknown configuration option {key:?}");
                }
            }
        }
    }
}

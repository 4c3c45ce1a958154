//! Engine configuration.
//!
//! The configuration is a plain value handed to [`Engine::new`](crate::Engine::new).
//! It can be built programmatically, loaded from environment variables, and
//! its rule tables can be read from JSON.

use crate::factory::Factories;
use crate::options::{Kind, OptionResolver, Options, Precision};
use crate::participation::{IMPLICIT_EXCLUDE, IMPLICIT_INCLUDE, ParticipationRules};
use anyhow::{Context as _, Result};
use log::debug;
use core::mem;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

/// Attribute on the root that switches decorations on and off.
pub const DEFAULT_ENABLE_ATTRIBUTE: &str = "data-loading";

/// Default fade duration of overlays, in milliseconds.
pub const DEFAULT_FADE_MS: u64 = 150;

/// Built-in per-tag defaults.
fn tag_defaults() -> &'static BTreeMap<String, Options> {
    static TAG_DEFAULTS: OnceCell<BTreeMap<String, Options>> = OnceCell::new();
    TAG_DEFAULTS.get_or_init(|| {
        let with_kind = |kind: Kind| Options {
            kind: Some(kind),
            ..Options::default()
        };
        let mut tags = BTreeMap::new();
        for tag in ["img", "svg", "input", "button", "select", "textarea"] {
            tags.insert(tag.to_owned(), with_kind(Kind::Round));
        }
        for tag in ["video", "canvas", "iframe", "picture"] {
            tags.insert(tag.to_owned(), with_kind(Kind::Rect));
        }
        tags
    })
}

/// Lowest option layer: every field with a floor has a value here.
pub fn global_defaults() -> Options {
    Options {
        radius: Some("m".to_owned()),
        precision: Some(Precision::Trim),
        z_index: Some(1),
        fade_in_ms: Some(DEFAULT_FADE_MS),
        fade_out_ms: Some(DEFAULT_FADE_MS),
        ..Options::default()
    }
}

/// Option layers and participation tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    pub defaults: Options,
    /// Keyed by lowercase tag name.
    pub tags: BTreeMap<String, Options>,
    pub implicit_exclude: Vec<String>,
    pub implicit_include: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            defaults: global_defaults(),
            tags: tag_defaults().clone(),
            implicit_exclude: IMPLICIT_EXCLUDE.iter().map(|tag| (*tag).to_owned()).collect(),
            implicit_include: IMPLICIT_INCLUDE.iter().map(|tag| (*tag).to_owned()).collect(),
        }
    }
}

impl RuleTables {
    /// Parse tables from JSON. Missing tables keep their built-in values; a
    /// present table replaces the built-in one entirely.
    ///
    /// # Errors
    /// Returns an error when the input is not valid JSON for the tables.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut tables: Self = serde_json::from_str(json).context("parsing skeleton rule tables")?;
        tables.tags = mem::take(&mut tables.tags)
            .into_iter()
            .map(|(tag, options)| (tag.to_ascii_lowercase(), options))
            .collect();
        Ok(tables)
    }

    pub fn resolver(&self) -> OptionResolver<'_> {
        OptionResolver::new(&self.defaults, &self.tags)
    }

    pub fn participation(&self) -> ParticipationRules {
        ParticipationRules::build(
            self.implicit_exclude.iter().map(String::as_str),
            self.implicit_include.iter().map(String::as_str),
        )
    }
}

/// Everything the engine needs besides the host.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub enable_attribute: String,
    pub tables: RuleTables,
    pub factories: Factories,
    /// Never use anchor positioning, even when the host supports it.
    pub force_float: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_attribute: DEFAULT_ENABLE_ATTRIBUTE.to_owned(),
            tables: RuleTables::default(),
            factories: Factories::default(),
            force_float: false,
        }
    }
}

impl EngineConfig {
    /// Defaults adjusted by environment variables.
    ///
    /// - `SKELETON_FORCE_FLOAT`: `1` or `true` disables anchor positioning
    /// - `SKELETON_FADE_IN_MS`, `SKELETON_FADE_OUT_MS`: overlay fade durations
    /// - `SKELETON_PRECISION`: `trim` or `box`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("SKELETON_FORCE_FLOAT") {
            config.force_float = is_truthy(&raw);
        }
        let millis = |key: &str| {
            let raw = lookup(key)?;
            let parsed = raw.trim().parse::<u64>().ok();
            if parsed.is_none() {
                debug!("ignoring {key}={raw:?}");
            }
            parsed
        };
        if let Some(fade_in) = millis("SKELETON_FADE_IN_MS") {
            config.tables.defaults.fade_in_ms = Some(fade_in);
        }
        if let Some(fade_out) = millis("SKELETON_FADE_OUT_MS") {
            config.tables.defaults.fade_out_ms = Some(fade_out);
        }
        if let Some(precision) = lookup("SKELETON_PRECISION").as_deref().and_then(Precision::parse) {
            config.tables.defaults.precision = Some(precision);
        }
        config
    }

    #[must_use]
    pub fn with_tables(mut self, tables: RuleTables) -> Self {
        self.tables = tables;
        self
    }

    #[must_use]
    pub fn with_factories(mut self, factories: Factories) -> Self {
        self.factories = factories;
        self
    }

    #[must_use]
    pub fn with_force_float(mut self, force_float: bool) -> Self {
        self.force_float = force_float;
        self
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Value of the enablement attribute → enabled. Absent, `false`, `0` and `off`
/// disable; everything else, including the empty string, enables.
pub fn is_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|raw| !matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enablement_values() {
        assert!(!is_enabled(None));
        assert!(is_enabled(Some("")));
        assert!(is_enabled(Some("true")));
        assert!(is_enabled(Some("pending")));
        assert!(!is_enabled(Some("false")));
        assert!(!is_enabled(Some("OFF")));
        assert!(!is_enabled(Some("0")));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EngineConfig::from_lookup(|key| match key {
            "SKELETON_FORCE_FLOAT" => Some("1".to_owned()),
            "SKELETON_FADE_IN_MS" => Some("300".to_owned()),
            "SKELETON_FADE_OUT_MS" => Some("soon".to_owned()),
            "SKELETON_PRECISION" => Some("box".to_owned()),
            _ => None,
        });
        assert!(config.force_float);
        assert_eq!(config.tables.defaults.fade_in_ms, Some(300));
        assert_eq!(config.tables.defaults.fade_out_ms, Some(DEFAULT_FADE_MS));
        assert_eq!(config.tables.defaults.precision, Some(Precision::Box));
    }

    #[test]
    fn json_tables_replace_only_what_they_name() {
        let tables = RuleTables::from_json(
            r#"{ "tags": { "IMG": { "kind": "rect", "radius": "xl" } }, "implicit_include": ["p"] }"#,
        )
        .unwrap();
        assert_eq!(tables.tags["img"].kind, Some(Kind::Rect));
        assert!(!tables.tags.contains_key("video"));
        assert_eq!(tables.defaults, global_defaults());
        assert_eq!(tables.implicit_exclude.len(), IMPLICIT_EXCLUDE.len());
        assert!(tables.participation().is_implicitly_included("p"));
        assert!(!tables.participation().is_implicitly_included("img"));
        assert!(RuleTables::from_json("{ not json").is_err());
    }
}

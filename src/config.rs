// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::AnalyzerKind;
use crate::document::PositionEncoding;
use crate::sync::SyncOptions;

/// Server settings, layered from defaults, config files and environment.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Preferred position encoding; used only if the client offers it.
    #[serde(default)]
    pub position_encoding: PositionEncoding,

    /// Reject changes whose version does not advance the document (default: true)
    #[serde(default = "default_true")]
    pub reject_stale_versions: bool,

    /// Publish an empty diagnostics list on close (default: true)
    #[serde(default = "default_true")]
    pub clear_diagnostics_on_close: bool,

    /// Which analyzer produces diagnostics.
    #[serde(default)]
    pub analyzer: AnalyzerKind,

    /// Characters that trigger completion (default: ["."])
    #[serde(default = "default_trigger_characters")]
    pub trigger_characters: Vec<String>,
}

const fn default_true() -> bool {
    true
}

fn default_trigger_characters() -> Vec<String> {
    vec![".".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            position_encoding: PositionEncoding::default(),
            reject_stale_versions: true,
            clear_diagnostics_on_close: true,
            analyzer: AnalyzerKind::default(),
            trigger_characters: default_trigger_characters(),
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or a value has the
    /// wrong type.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        // ~/.config/gock3-lsp/config.toml
        let user_file = dirs::config_dir()
            .map(|dir| dir.join("gock3-lsp").join("config.toml"))
            .filter(|path| path.exists());

        Self::load_from(user_file.as_deref(), explicit_file.as_deref(), None)
    }

    /// `env` replaces the process environment when given.
    fn load_from(
        user_file: Option<&Path>,
        explicit_file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("position_encoding", "utf-16")?
            .set_default("reject_stale_versions", true)?
            .set_default("clear_diagnostics_on_close", true)?
            .set_default("analyzer", "brackets")?
            .set_default("trigger_characters", vec!["."])?;

        if let Some(path) = user_file {
            builder = builder.add_source(config::File::from(path));
        }

        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // GOCK3_REJECT_STALE_VERSIONS=false, GOCK3_TRIGGER_CHARACTERS=.,:
        builder = builder.add_source(
            config::Environment::with_prefix("GOCK3")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("trigger_characters")
                .source(env),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Controller options for a session using `encoding`.
    #[must_use]
    pub const fn sync_options(&self, encoding: PositionEncoding) -> SyncOptions {
        SyncOptions {
            encoding,
            reject_stale_versions: self.reject_stale_versions,
            clear_diagnostics_on_close: self.clear_diagnostics_on_close,
        }
    }
}

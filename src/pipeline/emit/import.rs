use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{ImportConfig, ScriptFlavor};

/// A remote rule id that more than one declared rule resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateImport {
    pub remote_identifier: String,
    pub count: usize,
    /// Resource addresses (`type.identifier`) pointing at it, in emission order
    pub addresses: Vec<String>,
}

/// Collects import directives for matched rules and renders the script
pub struct ImportEmitter {
    config: ImportConfig,
    lines: Vec<String>,
    by_remote: IndexMap<String, Vec<String>>,
}

impl ImportEmitter {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            by_remote: IndexMap::new(),
        }
    }

    /// Record one matched rule
    pub fn push(&mut self, resource_type: &str, identifier: &str, remote_identifier: &str) {
        let address = format!("{}.{}", resource_type, identifier);
        let line = format!("{} {} {}", self.config.command.trim(), address, remote_identifier);

        self.by_remote
            .entry(remote_identifier.to_string())
            .or_default()
            .push(address);
        self.lines.push(line);
    }

    /// Number of directive lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn distinct_remote_identifiers(&self) -> usize {
        self.by_remote.len()
    }

    /// Remote ids referenced more than once, in first-seen order
    pub fn duplicates(&self) -> Vec<DuplicateImport> {
        self.by_remote
            .iter()
            .filter(|(_, addresses)| addresses.len() > 1)
            .map(|(remote, addresses)| DuplicateImport {
                remote_identifier: remote.clone(),
                count: addresses.len(),
                addresses: addresses.clone(),
            })
            .collect()
    }

    /// Full script text: preamble, one line per directive, postamble
    pub fn render(&self) -> String {
        let mut script = String::new();
        match self.config.flavor {
            ScriptFlavor::Batch => script.push_str("@echo off\n"),
            ScriptFlavor::Shell => script.push_str("#!/usr/bin/env bash\nset -euo pipefail\n"),
        }
        for line in &self.lines {
            script.push_str(line);
            script.push('\n');
        }
        if self.config.flavor == ScriptFlavor::Batch {
            script.push_str("pause\n");
        }
        script
    }
}

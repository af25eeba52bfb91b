//! Ordered-sections key/value files (`bundles.ini`, `yum.conf`, `.repo`).
//!
//! Sections and keys keep the order they were read or inserted in, so a
//! yum configuration written back out looks like the template it came from.
//! Keys are case-insensitive and stored lower-cased; section names are kept
//! verbatim.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Parse failures, with 1-based line numbers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
    #[error("line {line}: option outside of any section: {text}")]
    NoSection { line: usize, text: String },

    #[error("line {line}: cannot parse: {text}")]
    Malformed { line: usize, text: String },
}

/// One `[name]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value, keeping the key's position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove a key. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.len() != before
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A whole file: an ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ini {
    sections: Vec<Section>,
}

impl Ini {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file contents.
    ///
    /// Accepts `key = value` and `key: value`, `#`/`;` comment lines, and
    /// indented continuation lines, which are joined to the previous value
    /// with a newline. A repeated section header continues the earlier one.
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut ini = Ini::new();
        let mut current: Option<usize> = None;
        let mut last_key: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Continuation of the previous value
            if raw.starts_with(char::is_whitespace) {
                if let (Some(sec), Some(key)) = (current, last_key.as_ref()) {
                    let section = &mut ini.sections[sec];
                    let joined = match section.get(key) {
                        Some(prev) if !prev.is_empty() => format!("{}\n{}", prev, trimmed),
                        _ => trimmed.to_string(),
                    };
                    section.set(key, joined);
                    continue;
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| IniError::Malformed {
                    line: line_no,
                    text: trimmed.to_string(),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(IniError::Malformed {
                        line: line_no,
                        text: trimmed.to_string(),
                    });
                }
                current = Some(ini.section_index_or_insert(name));
                last_key = None;
                continue;
            }

            let split_at = trimmed
                .find(|c: char| c == '=' || c == ':')
                .ok_or_else(|| IniError::Malformed {
                    line: line_no,
                    text: trimmed.to_string(),
                })?;
            let key = trimmed[..split_at].trim();
            let value = trimmed[split_at + 1..].trim();
            if key.is_empty() {
                return Err(IniError::Malformed {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            }

            let sec = current.ok_or_else(|| IniError::NoSection {
                line: line_no,
                text: trimmed.to_string(),
            })?;
            ini.sections[sec].set(key, value);
            last_key = Some(key.to_ascii_lowercase());
        }

        Ok(ini)
    }

    /// Read and parse a file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Get a section, appending an empty one if it does not exist yet.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = self.section_index_or_insert(name);
        &mut self.sections[idx]
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_mut(section).set(key, value);
    }

    /// Remove a key from a section. Returns true if it was present.
    pub fn remove_option(&mut self, section: &str, key: &str) -> bool {
        self.sections
            .iter_mut()
            .find(|s| s.name == section)
            .map(|s| s.remove(key))
            .unwrap_or(false)
    }

    /// Serialize to an already-open writer.
    ///
    /// Multi-line values are written with tab-indented continuation lines.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for section in &self.sections {
            writeln!(out, "[{}]", section.name)?;
            for (key, value) in section.entries() {
                writeln!(out, "{} = {}", key, value.replace('\n', "\n\t"))?;
            }
            writeln!(out)?;
        }
        out.flush()
    }

    /// Open `path` for writing and delegate to [`Ini::write_to`].
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_to(&mut file)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl std::fmt::Display for Ini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

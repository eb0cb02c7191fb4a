//! Minimal `.cabal` file reader
//!
//! Reads top-level fields and sections (`library`, `executable foo`,
//! `source-repository head`, ...) with their fields. Conditionals are
//! flattened into the enclosing section. Field names are case-insensitive
//! and stored lower-cased.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?P<key>[A-Za-z][A-Za-z0-9_-]*)[ \t]*:(?P<value>.*)$")
        .expect("valid field regex")
});

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z][A-Za-z0-9_-]*)(?:[ \t]+(?P<name>[^{]*?))?[ \t]*\{?[ \t]*$")
        .expect("valid section regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabalSection {
    /// Lower-cased section keyword (`library`, `source-repository`, ...)
    pub kind: String,
    pub name: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl CabalSection {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CabalFile {
    fields: HashMap<String, String>,
    pub sections: Vec<CabalSection>,
}

/// Field currently receiving continuation lines
struct OpenField {
    indent: usize,
    key: String,
    value: String,
}

impl CabalFile {
    pub fn parse(content: &str) -> Self {
        let mut file = CabalFile::default();
        let mut open: Option<OpenField> = None;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let indent = line.len() - line.trim_start().len();

            if let Some(field) = open.as_mut()
                && indent > field.indent
            {
                // A lone "." stands for an empty line in free text fields
                let text = if trimmed == "." { "" } else { trimmed };
                if !field.value.is_empty() {
                    field.value.push('\n');
                }
                field.value.push_str(text);
                continue;
            }

            file.close(open.take());

            if let Some(captures) = FIELD.captures(line) {
                open = Some(OpenField {
                    indent,
                    key: captures["key"].to_ascii_lowercase(),
                    value: captures["value"].trim().to_string(),
                });
            } else if indent == 0
                && let Some(captures) = SECTION.captures(trimmed)
            {
                file.sections.push(CabalSection {
                    kind: captures["kind"].to_ascii_lowercase(),
                    name: captures
                        .name("name")
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|s| !s.is_empty()),
                    fields: Vec::new(),
                });
            }
            // Anything else is a conditional (`if flag(x)`, `else`) whose
            // fields belong to the enclosing section
        }
        file.close(open);

        file
    }

    fn close(&mut self, field: Option<OpenField>) {
        let Some(field) = field else {
            return;
        };
        if field.indent == 0 {
            self.fields.insert(field.key, field.value);
        } else if let Some(section) = self.sections.last_mut() {
            section.fields.push((field.key, field.value));
        }
    }

    /// Top-level field value, `None` when absent or blank
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn sections<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a CabalSection> + 'a {
        self.sections.iter().filter(move |s| s.kind == kind)
    }

    /// `location` of the `head` source repository, else of any other
    pub fn source_repository(&self) -> Option<&str> {
        let mut repositories: Vec<&CabalSection> = self.sections("source-repository").collect();
        repositories.sort_by_key(|s| s.name.as_deref() != Some("head"));
        repositories.into_iter().find_map(|s| s.field("location"))
    }

    /// `build-depends` entries of every section as `(section kind, name, constraint)`
    pub fn build_depends(&self) -> Vec<(&str, String, Option<String>)> {
        let mut dependencies = Vec::new();
        for section in &self.sections {
            for (key, value) in &section.fields {
                if key != "build-depends" {
                    continue;
                }
                for entry in value.split(',') {
                    if let Some((name, constraint)) = split_dependency(entry) {
                        dependencies.push((section.kind.as_str(), name, constraint));
                    }
                }
            }
        }
        dependencies
    }
}

/// `aeson >=2.0 && <2.3` into `("aeson", Some(">=2.0 && <2.3"))`
fn split_dependency(entry: &str) -> Option<(String, Option<String>)> {
    let entry = entry.trim();
    let end = entry
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
        .unwrap_or(entry.len());
    // Sub-library syntax `pkg:lib` depends on `pkg`
    let name = entry[..end].split(':').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    let constraint = entry[end..].trim();
    Some((
        name.to_string(),
        (!constraint.is_empty()).then(|| constraint.to_string()),
    ))
}

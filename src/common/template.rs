//! `%(name)s` interpolation for bundle templates.
//!
//! Repo file paths, package list paths, patch directories and tarball names
//! in `bundles.ini` are written with `%(dver)s`-style placeholders.
//! `%%` produces a literal `%`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Values available to a template, by placeholder name.
pub type Vars = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '%({name})s' in '{template}'")]
    UnknownName { name: String, template: String },

    #[error("malformed placeholder at offset {offset} in '{template}'")]
    Malformed { offset: usize, template: String },
}

/// Build a [`Vars`] map from name/value pairs.
pub fn vars<'a, I>(pairs: I) -> Vars
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Expand every placeholder in `template`.
pub fn expand(template: &str, vars: &Vars) -> Result<String, TemplateError> {
    let malformed = |offset: usize| TemplateError::Malformed {
        offset,
        template: template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let offset = template.len() - rest.len() + pos;
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('%') {
            out.push('%');
            rest = tail;
            continue;
        }

        let inner = after.strip_prefix('(').ok_or_else(|| malformed(offset))?;
        let close = inner.find(')').ok_or_else(|| malformed(offset))?;
        let name = &inner[..close];
        let tail = inner[close + 1..]
            .strip_prefix('s')
            .ok_or_else(|| malformed(offset))?;

        let value = vars.get(name).ok_or_else(|| TemplateError::UnknownName {
            name: name.to_string(),
            template: template.to_string(),
        })?;
        out.push_str(value);
        rest = tail;
    }

    out.push_str(rest);
    Ok(out)
}

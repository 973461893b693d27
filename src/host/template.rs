//! Template rendering and content convergence

use anyhow::{Context, Result, bail};
use declarative::Ownership;
use regex::Regex;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::fs::{converge_ownership, write_atomic};

/// An escaped `\{{`, or a `{{ name }}` placeholder capturing `name`
const PLACEHOLDER: &str = r"\\\{\{|\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";

/// Substitute `{{ name }}` placeholders
///
/// Every placeholder must resolve; unknown names are reported together.
/// `\{{` is emitted as a literal `{{`.
pub fn render(text: &str, variables: &BTreeMap<String, String>) -> Result<String> {
    let placeholder = Regex::new(PLACEHOLDER).context("Invalid placeholder pattern")?;

    let mut unknown: Vec<&str> = placeholder
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !variables.contains_key(*name))
        .collect();

    if !unknown.is_empty() {
        unknown.sort_unstable();
        unknown.dedup();
        bail!(
            "Undefined template variables: {} (write \\{{{{ for a literal {{{{)",
            unknown.join(", ")
        );
    }

    let rendered = placeholder.replace_all(text, |caps: &regex::Captures<'_>| {
        caps.get(1).map_or_else(
            || "{{".to_string(),
            |name| variables.get(name.as_str()).cloned().unwrap_or_default(),
        )
    });
    Ok(rendered.into_owned())
}

/// Read a template source from `template_dir`
pub fn read_source(template_dir: &Path, source: &str) -> Result<String> {
    let path = template_dir.join(source);
    fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template {}", path.display()))
}

/// Read a template source from `template_dir` and render it
pub fn render_file(
    template_dir: &Path,
    source: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String> {
    let text = read_source(template_dir, source)?;
    render(&text, variables).with_context(|| format!("Failed to render {source}"))
}

/// Write rendered content to `path` only if it differs, then fix ownership
///
/// Returns whether the content or metadata changed.
pub fn converge_content(path: &Path, content: &str, ownership: &Ownership) -> Result<bool> {
    let current = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let same = current
        .as_deref()
        .is_some_and(|bytes| blake3::hash(bytes) == blake3::hash(content.as_bytes()));

    let written = if same {
        false
    } else {
        if log::log_enabled!(log::Level::Debug) {
            let old = current
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            log::debug!("{}:\n{}", path.display(), unified_diff(&old, content));
        }
        write_atomic(path, content.as_bytes(), ownership.mode)?;
        true
    };

    Ok(converge_ownership(path, ownership)? || written)
}

/// Line diff between two texts, `+`/`-` prefixed
pub fn unified_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => continue,
        };
        out.push(sign);
        out.push_str(change.as_str().unwrap_or_default());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn render_substitutes_with_optional_whitespace() {
        let out = render(
            "User={{app_user}}\nExec={{ app_dir }}/run",
            &vars(&[("app_user", "pcapfab"), ("app_dir", "/opt/pcapfab")]),
        )
        .unwrap();
        assert_eq!(out, "User=pcapfab\nExec=/opt/pcapfab/run");
    }

    #[test]
    fn render_without_placeholders_is_identity() {
        let text = "#!/usr/bin/env python3\nprint({'a': 1})\n";
        assert_eq!(render(text, &BTreeMap::new()).unwrap(), text);
    }

    #[test]
    fn render_reports_every_unknown_name() {
        let err = render("{{ b }} {{ a }} {{ b }}", &BTreeMap::new())
            .unwrap_err()
            .to_string();
        assert!(err.starts_with("Undefined template variables: a, b "), "{err}");
    }

    #[test]
    fn escaped_braces_are_kept_literally() {
        let out = render(
            "print(f\"\\{{name}} is {name}\")\nport = {{ port }}\n",
            &vars(&[("port", "8443")]),
        )
        .unwrap();
        assert_eq!(out, "print(f\"{{name}} is {name}\")\nport = 8443\n");
    }

    #[test]
    fn unescaped_python_braces_are_rejected_with_a_hint() {
        let err = render("print(f\"{{name}} is {name}\")", &BTreeMap::new())
            .unwrap_err()
            .to_string();
        assert!(err.contains("name"), "{err}");
        assert!(err.contains("literal"), "{err}");
    }

    #[test]
    fn render_file_reads_from_template_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("unit.tmpl"), "User={{ app_user }}\n").unwrap();

        let out = render_file(tmp.path(), "unit.tmpl", &vars(&[("app_user", "svc")])).unwrap();
        assert_eq!(out, "User=svc\n");
        assert!(render_file(tmp.path(), "missing.tmpl", &BTreeMap::new()).is_err());
    }

    #[test]
    fn content_is_written_once() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("app.conf");

        assert!(converge_content(&dest, "a=1\n", &Ownership::default()).unwrap());
        assert!(!converge_content(&dest, "a=1\n", &Ownership::default()).unwrap());
        assert!(converge_content(&dest, "a=2\n", &Ownership::default()).unwrap());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "a=2\n");
    }

    #[test]
    fn unchanged_content_with_mode_drift_is_a_change() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("app.conf");
        fs::write(&dest, "a=1\n").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o600)).unwrap();

        let ownership = Ownership {
            mode: Some(0o644),
            ..Default::default()
        };
        assert!(converge_content(&dest, "a=1\n", &ownership).unwrap());
        assert!(!converge_content(&dest, "a=1\n", &ownership).unwrap());
    }

    #[test]
    fn diff_marks_changed_lines() {
        let diff = unified_diff("a\nb\n", "a\nc\n");
        assert_eq!(diff, "-b\n+c\n");
    }
}

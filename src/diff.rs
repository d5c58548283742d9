//! Structural diff over nested JSON documents.
//!
//! Objects are compared key by key and arrays index by index. Every change is
//! recorded with the access path at which it was found, rendered as
//! `root['cells'][0]['source']`. Paths matching any exclusion pattern are
//! skipped together with everything below them.

use std::fmt;

use regex::RegexSet;
use serde_json::Value;

use crate::error::HarnessError;

/// Exclusions for fields that legitimately change on every execution:
/// per-cell metadata, per-cell execution counters and per-output execution
/// counters.
pub const NOTEBOOK_EXCLUDE_PATTERNS: &[&str] = &[
    r"root\['cells'\]\[\d+\]\['metadata'\]",
    r"root\['cells'\]\[\d+\]\['execution_count'\]",
    r"root\['cells'\]\[\d+\]\['outputs'\]\[\d+\]\['execution_count'\]",
];

/// One step of an access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Render a path in `root['key'][0]` form.
pub fn render_path(path: &[PathSegment]) -> String {
    let mut out = String::from("root");
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                out.push_str("['");
                out.push_str(&key.replace('\\', "\\\\").replace('\'', "\\'"));
                out.push_str("']");
            }
            PathSegment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Compiled set of path patterns ignored during comparison.
#[derive(Debug, Clone)]
pub struct ExcludePaths {
    set: RegexSet,
}

impl ExcludePaths {
    /// Compile the given regex patterns. A path is excluded when any pattern
    /// matches anywhere in its rendered form.
    pub fn new<I, S>(patterns: I) -> Result<Self, HarnessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// No exclusions.
    pub fn none() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn notebook_defaults() -> Result<Self, HarnessError> {
        Self::new(NOTEBOOK_EXCLUDE_PATTERNS)
    }

    pub fn is_excluded(&self, rendered_path: &str) -> bool {
        self.set.is_match(rendered_path)
    }
}

/// Category of a detected difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    TypeChanged,
    ValueChanged,
    DictionaryItemAdded,
    DictionaryItemRemoved,
    IterableItemAdded,
    IterableItemRemoved,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::TypeChanged => "type_changes",
            ChangeKind::ValueChanged => "values_changed",
            ChangeKind::DictionaryItemAdded => "dictionary_item_added",
            ChangeKind::DictionaryItemRemoved => "dictionary_item_removed",
            ChangeKind::IterableItemAdded => "iterable_item_added",
            ChangeKind::IterableItemRemoved => "iterable_item_removed",
        };
        f.write_str(name)
    }
}

/// A single difference between the expected and actual documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: String,
    /// Value in the expected document, absent for additions.
    pub expected: Option<Value>,
    /// Value in the actual document, absent for removals.
    pub actual: Option<Value>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.expected, &self.actual) {
            (Some(old), Some(new)) => write!(f, "{}: {} -> {}", self.path, old, new),
            (None, Some(new)) => write!(f, "{}: {}", self.path, new),
            (Some(old), None) => write!(f, "{}: {}", self.path, old),
            (None, None) => write!(f, "{}", self.path),
        }
    }
}

/// All differences found between two documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    changes: Vec<Change>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}

impl fmt::Display for Diff {
    /// Full report grouped by change kind.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&Change> = self.changes.iter().collect();
        sorted.sort_by_key(|c| c.kind);

        let mut current = None;
        for change in sorted {
            if current != Some(change.kind) {
                writeln!(f, "{}:", change.kind)?;
                current = Some(change.kind);
            }
            writeln!(f, "  {change}")?;
        }
        Ok(())
    }
}

/// Compute the structural difference between `expected` and `actual`.
pub fn diff_values(expected: &Value, actual: &Value, exclude: &ExcludePaths) -> Diff {
    let mut walker = Walker {
        exclude,
        path: Vec::new(),
        changes: Vec::new(),
    };
    walker.compare(expected, actual);
    Diff {
        changes: walker.changes,
    }
}

struct Walker<'a> {
    exclude: &'a ExcludePaths,
    path: Vec<PathSegment>,
    changes: Vec<Change>,
}

impl Walker<'_> {
    fn compare(&mut self, expected: &Value, actual: &Value) {
        let rendered = render_path(&self.path);
        if self.exclude.is_excluded(&rendered) {
            return;
        }

        match (expected, actual) {
            (Value::Object(old), Value::Object(new)) => {
                for (key, old_value) in old {
                    self.path.push(PathSegment::Key(key.clone()));
                    match new.get(key) {
                        Some(new_value) => self.compare(old_value, new_value),
                        None => self.record(
                            ChangeKind::DictionaryItemRemoved,
                            Some(old_value),
                            None,
                        ),
                    }
                    self.path.pop();
                }
                for (key, new_value) in new {
                    if old.contains_key(key) {
                        continue;
                    }
                    self.path.push(PathSegment::Key(key.clone()));
                    self.record(ChangeKind::DictionaryItemAdded, None, Some(new_value));
                    self.path.pop();
                }
            }
            (Value::Array(old), Value::Array(new)) => {
                let len = old.len().max(new.len());
                for i in 0..len {
                    self.path.push(PathSegment::Index(i));
                    match (old.get(i), new.get(i)) {
                        (Some(a), Some(b)) => self.compare(a, b),
                        (Some(a), None) => {
                            self.record(ChangeKind::IterableItemRemoved, Some(a), None)
                        }
                        (None, Some(b)) => {
                            self.record(ChangeKind::IterableItemAdded, None, Some(b))
                        }
                        (None, None) => {}
                    }
                    self.path.pop();
                }
            }
            (a, b) if same_type(a, b) => {
                if a != b {
                    self.push_change(rendered, ChangeKind::ValueChanged, Some(a), Some(b));
                }
            }
            (a, b) => self.push_change(rendered, ChangeKind::TypeChanged, Some(a), Some(b)),
        }
    }

    fn record(&mut self, kind: ChangeKind, expected: Option<&Value>, actual: Option<&Value>) {
        let rendered = render_path(&self.path);
        if self.exclude.is_excluded(&rendered) {
            return;
        }
        self.push_change(rendered, kind, expected, actual);
    }

    fn push_change(
        &mut self,
        path: String,
        kind: ChangeKind,
        expected: Option<&Value>,
        actual: Option<&Value>,
    ) {
        self.changes.push(Change {
            kind,
            path,
            expected: expected.cloned(),
            actual: actual.cloned(),
        });
    }
}

// Integers and floats count as different types, so `1` vs `1.0` is a type change.
fn same_type(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.is_f64() == y.is_f64(),
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notebook_excludes() -> ExcludePaths {
        ExcludePaths::notebook_defaults().unwrap()
    }

    #[test]
    fn test_render_path() {
        let path = vec![
            PathSegment::Key("cells".to_string()),
            PathSegment::Index(3),
            PathSegment::Key("outputs".to_string()),
        ];
        assert_eq!(render_path(&path), "root['cells'][3]['outputs']");
        assert_eq!(render_path(&[]), "root");
    }

    #[test]
    fn test_render_path_escapes_quotes() {
        let path = vec![PathSegment::Key("it's".to_string())];
        assert_eq!(render_path(&path), r"root['it\'s']");
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let doc = json!({
            "cells": [{ "cell_type": "code", "source": "x", "outputs": [] }],
            "metadata": { "kernelspec": { "name": "python3" } }
        });
        let diff = diff_values(&doc, &doc.clone(), &ExcludePaths::none());
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "");
    }

    #[test]
    fn test_diff_value_changed_names_path() {
        let old = json!({ "cells": [{ "source": "x = 1" }] });
        let new = json!({ "cells": [{ "source": "x = 2" }] });
        let diff = diff_values(&old, &new, &notebook_excludes());
        assert_eq!(diff.len(), 1);
        let change = &diff.changes()[0];
        assert_eq!(change.kind, ChangeKind::ValueChanged);
        assert_eq!(change.path, "root['cells'][0]['source']");
        assert_eq!(change.expected, Some(json!("x = 1")));
        assert_eq!(change.actual, Some(json!("x = 2")));
    }

    #[test]
    fn test_diff_type_changed() {
        let old = json!({ "a": 1 });
        let new = json!({ "a": "1" });
        let diff = diff_values(&old, &new, &ExcludePaths::none());
        assert_eq!(diff.changes()[0].kind, ChangeKind::TypeChanged);
    }

    #[test]
    fn test_diff_int_to_float_is_type_change() {
        let diff = diff_values(&json!({ "n": 1 }), &json!({ "n": 1.0 }), &ExcludePaths::none());
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.changes()[0].kind, ChangeKind::TypeChanged);
        assert_eq!(diff.changes()[0].path, "root['n']");
        assert!(diff.to_string().starts_with("type_changes:\n"));
    }

    #[test]
    fn test_diff_numbers_of_same_kind_are_value_changes() {
        let diff = diff_values(&json!([1, 2.5]), &json!([2, 3.5]), &ExcludePaths::none());
        assert_eq!(diff.len(), 2);
        assert!(diff.changes().iter().all(|c| c.kind == ChangeKind::ValueChanged));
    }

    #[test]
    fn test_diff_dictionary_items_added_and_removed() {
        let old = json!({ "keep": 1, "gone": 2 });
        let new = json!({ "keep": 1, "fresh": 3 });
        let diff = diff_values(&old, &new, &ExcludePaths::none());
        let kinds: Vec<_> = diff.changes().iter().map(|c| (c.kind, c.path.as_str())).collect();
        assert!(kinds.contains(&(ChangeKind::DictionaryItemRemoved, "root['gone']")));
        assert!(kinds.contains(&(ChangeKind::DictionaryItemAdded, "root['fresh']")));
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_diff_iterable_items_added_and_removed() {
        let diff = diff_values(&json!([1, 2]), &json!([1, 2, 3]), &ExcludePaths::none());
        assert_eq!(diff.changes()[0].kind, ChangeKind::IterableItemAdded);
        assert_eq!(diff.changes()[0].path, "root[2]");

        let diff = diff_values(&json!([1, 2, 3]), &json!([1]), &ExcludePaths::none());
        assert_eq!(diff.len(), 2);
        assert!(
            diff.changes()
                .iter()
                .all(|c| c.kind == ChangeKind::IterableItemRemoved)
        );
    }

    #[test]
    fn test_diff_cell_metadata_excluded() {
        let old = json!({ "cells": [{ "metadata": { "collapsed": false }, "source": "x" }] });
        let new = json!({ "cells": [{ "metadata": { "collapsed": true, "tags": [] }, "source": "x" }] });
        assert!(diff_values(&old, &new, &notebook_excludes()).is_empty());
    }

    #[test]
    fn test_diff_execution_counts_excluded() {
        let old = json!({ "cells": [{
            "execution_count": 1,
            "outputs": [{ "output_type": "execute_result", "execution_count": 1 }]
        }] });
        let new = json!({ "cells": [{
            "execution_count": 7,
            "outputs": [{ "output_type": "execute_result", "execution_count": 7 }]
        }] });
        assert!(diff_values(&old, &new, &notebook_excludes()).is_empty());
    }

    #[test]
    fn test_diff_excluded_key_added_is_ignored() {
        let old = json!({ "cells": [{ "source": "x" }] });
        let new = json!({ "cells": [{ "source": "x", "execution_count": 3 }] });
        assert!(diff_values(&old, &new, &notebook_excludes()).is_empty());
    }

    #[test]
    fn test_diff_notebook_metadata_not_excluded() {
        // Only per-cell metadata is ignored, not the notebook-level block.
        let old = json!({ "metadata": { "language_info": { "version": "3.10" } }, "cells": [] });
        let new = json!({ "metadata": { "language_info": { "version": "3.11" } }, "cells": [] });
        let diff = diff_values(&old, &new, &notebook_excludes());
        assert_eq!(diff.changes()[0].path, "root['metadata']['language_info']['version']");
    }

    #[test]
    fn test_diff_output_metadata_not_excluded() {
        let old = json!({ "cells": [{ "outputs": [{ "metadata": { "a": 1 } }] }] });
        let new = json!({ "cells": [{ "outputs": [{ "metadata": { "a": 2 } }] }] });
        let diff = diff_values(&old, &new, &notebook_excludes());
        assert_eq!(diff.changes()[0].path, "root['cells'][0]['outputs'][0]['metadata']['a']");
    }

    #[test]
    fn test_exclude_paths_invalid_pattern() {
        let err = ExcludePaths::new(["root\\[("]).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidPattern(_)));
    }

    #[test]
    fn test_diff_report_groups_by_kind() {
        let old = json!({ "a": 1, "b": "x", "gone": true });
        let new = json!({ "a": 2, "b": "y", "c": null });
        let report = diff_values(&old, &new, &ExcludePaths::none()).to_string();
        assert!(report.contains("values_changed:\n"), "report: {report}");
        assert!(report.contains("  root['a']: 1 -> 2\n"), "report: {report}");
        assert!(report.contains("  root['b']: \"x\" -> \"y\"\n"), "report: {report}");
        assert!(report.contains("dictionary_item_added:\n  root['c']: null\n"));
        assert!(report.contains("dictionary_item_removed:\n  root['gone']: true\n"));
        assert_eq!(report.matches("values_changed:").count(), 1);
    }
}

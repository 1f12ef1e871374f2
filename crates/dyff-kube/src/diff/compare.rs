//! Structural comparison of YAML documents

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;

use super::document::{InputFile, ResourceId};

/// Fields that identify an entry in a list of mappings
const IDENTIFIER_FIELDS: &[&str] = &["name", "id", "key"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Treat lists that only differ in order as equal
    pub ignore_order_changes: bool,
}

/// One step of a path into a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Key(String),
    /// List entry matched through an identifier field
    Named { field: String, value: String },
    Index(usize),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Named { value, .. } => write!(f, "{}", value),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Location of a change inside a document; empty at the document root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPath(pub Vec<PathElement>);

impl DiffPath {
    fn child(&self, element: PathElement) -> Self {
        let mut elements = self.0.clone();
        elements.push(element);
        Self(elements)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiffPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "(root level)");
        }
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Addition,
    Removal,
    Modification,
    OrderChange,
}

/// A single change at a path
///
/// Additions carry only `to`, removals only `from`. Order changes carry the
/// entry identifiers before and after as sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub kind: DetailKind,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

impl Detail {
    fn addition(to: Value) -> Self {
        Self {
            kind: DetailKind::Addition,
            from: None,
            to: Some(to),
        }
    }

    fn removal(from: Value) -> Self {
        Self {
            kind: DetailKind::Removal,
            from: Some(from),
            to: None,
        }
    }

    fn modification(from: Value, to: Value) -> Self {
        Self {
            kind: DetailKind::Modification,
            from: Some(from),
            to: Some(to),
        }
    }

    fn order_change(from: Value, to: Value) -> Self {
        Self {
            kind: DetailKind::OrderChange,
            from: Some(from),
            to: Some(to),
        }
    }
}

/// All changes at one path of one document
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Resource identity or position of the document
    pub document: String,

    /// `None` when a whole document was added or removed
    pub path: Option<DiffPath>,

    pub details: Vec<Detail>,
}

/// Result of comparing two input files
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    pub from_location: String,
    pub to_location: String,
    pub diffs: Vec<Diff>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }
}

/// Compare two input files document by document
///
/// Documents with a Kubernetes identity are matched by identity, the rest by
/// their position among the documents without one.
pub fn compare(from: &InputFile, to: &InputFile, options: CompareOptions) -> DiffReport {
    let mut comparer = Comparer {
        options,
        document: String::new(),
        diffs: Vec::new(),
    };

    let to_by_id: HashMap<&ResourceId, usize> = to
        .documents
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.id.as_ref().map(|id| (id, i)))
        .collect();
    let to_anonymous: Vec<usize> = to
        .documents
        .iter()
        .enumerate()
        .filter(|(_, d)| d.id.is_none())
        .map(|(i, _)| i)
        .collect();

    let mut to_matched = vec![false; to.documents.len()];
    let mut anonymous_seen = 0;

    for from_doc in &from.documents {
        let counterpart = match &from_doc.id {
            Some(id) => to_by_id.get(id).copied(),
            None => {
                anonymous_seen += 1;
                to_anonymous.get(anonymous_seen - 1).copied()
            }
        };

        match counterpart {
            Some(i) if !to_matched[i] => {
                to_matched[i] = true;
                let to_doc = &to.documents[i];
                comparer.document = to_doc.label();
                comparer.compare_values(&DiffPath::default(), &from_doc.value, &to_doc.value);
            }
            _ => comparer.diffs.push(Diff {
                document: from_doc.label(),
                path: None,
                details: vec![Detail::removal(from_doc.value.clone())],
            }),
        }
    }

    for (to_doc, matched) in to.documents.iter().zip(&to_matched) {
        if !matched {
            comparer.diffs.push(Diff {
                document: to_doc.label(),
                path: None,
                details: vec![Detail::addition(to_doc.value.clone())],
            });
        }
    }

    DiffReport {
        from_location: from.location.clone(),
        to_location: to.location.clone(),
        diffs: comparer.diffs,
    }
}

struct Comparer {
    options: CompareOptions,
    /// Label of the document being compared
    document: String,
    diffs: Vec<Diff>,
}

impl Comparer {
    fn push(&mut self, path: &DiffPath, details: Vec<Detail>) {
        if !details.is_empty() {
            self.diffs.push(Diff {
                document: self.document.clone(),
                path: Some(path.clone()),
                details,
            });
        }
    }

    fn compare_values(&mut self, path: &DiffPath, from: &Value, to: &Value) {
        match (from, to) {
            (Value::Mapping(a), Value::Mapping(b)) => self.compare_mappings(path, a, b),
            (Value::Sequence(a), Value::Sequence(b)) => self.compare_sequences(path, a, b),
            _ if from != to => {
                self.push(path, vec![Detail::modification(from.clone(), to.clone())]);
            }
            _ => {}
        }
    }

    fn compare_mappings(&mut self, path: &DiffPath, from: &Mapping, to: &Mapping) {
        let mut removed = Mapping::new();
        for (key, value) in from {
            if !to.contains_key(key) {
                removed.insert(key.clone(), value.clone());
            }
        }

        let mut added = Mapping::new();
        for (key, value) in to {
            if !from.contains_key(key) {
                added.insert(key.clone(), value.clone());
            }
        }

        let mut details = Vec::new();
        if !removed.is_empty() {
            details.push(Detail::removal(Value::Mapping(removed)));
        }
        if !added.is_empty() {
            details.push(Detail::addition(Value::Mapping(added)));
        }
        self.push(path, details);

        for (key, from_value) in from {
            if let Some(to_value) = to.get(key) {
                let child = path.child(PathElement::Key(scalar_text(key)));
                self.compare_values(&child, from_value, to_value);
            }
        }
    }

    fn compare_sequences(&mut self, path: &DiffPath, from: &[Value], to: &[Value]) {
        match identifier_field(from, to) {
            Some(field) => self.compare_named_lists(path, field, from, to),
            None => self.compare_multisets(path, from, to),
        }
    }

    fn compare_named_lists(&mut self, path: &DiffPath, field: &str, from: &[Value], to: &[Value]) {
        let from_entries = named_entries(from, field);
        let to_entries = named_entries(to, field);

        let removed: Vec<Value> = from_entries
            .iter()
            .filter(|(id, _)| !to_entries.contains_key(*id))
            .map(|(_, v)| (*v).clone())
            .collect();
        let added: Vec<Value> = to_entries
            .iter()
            .filter(|(id, _)| !from_entries.contains_key(*id))
            .map(|(_, v)| (*v).clone())
            .collect();

        let mut details = Vec::new();
        if !removed.is_empty() {
            details.push(Detail::removal(Value::Sequence(removed)));
        }
        if !added.is_empty() {
            details.push(Detail::addition(Value::Sequence(added)));
        }

        if !self.options.ignore_order_changes {
            let from_order: Vec<Value> = from_entries
                .keys()
                .filter(|id| to_entries.contains_key(*id))
                .map(|id| Value::String(id.clone()))
                .collect();
            let to_order: Vec<Value> = to_entries
                .keys()
                .filter(|id| from_entries.contains_key(*id))
                .map(|id| Value::String(id.clone()))
                .collect();
            if from_order != to_order {
                details.push(Detail::order_change(
                    Value::Sequence(from_order),
                    Value::Sequence(to_order),
                ));
            }
        }
        self.push(path, details);

        for (id, from_value) in &from_entries {
            if let Some(to_value) = to_entries.get(id) {
                let child = path.child(PathElement::Named {
                    field: field.to_string(),
                    value: id.clone(),
                });
                self.compare_values(&child, from_value, to_value);
            }
        }
    }

    /// Entries are compared by value, ignoring position. When order changes
    /// are ignored, lists nested inside entries are compared unordered too.
    fn compare_multisets(&mut self, path: &DiffPath, from: &[Value], to: &[Value]) {
        let ignore_order = self.options.ignore_order_changes;
        let key = |entry: &Value| {
            if ignore_order {
                canonical(entry)
            } else {
                entry.clone()
            }
        };

        let candidates: Vec<Value> = to.iter().map(key).collect();
        let mut unmatched = vec![true; to.len()];
        let mut removed = Vec::new();

        for entry in from {
            let entry_key = key(entry);
            let found = candidates
                .iter()
                .enumerate()
                .position(|(i, candidate)| unmatched[i] && *candidate == entry_key);
            match found {
                Some(i) => unmatched[i] = false,
                None => removed.push(entry.clone()),
            }
        }

        let added: Vec<Value> = to
            .iter()
            .zip(&unmatched)
            .filter(|(_, unmatched)| **unmatched)
            .map(|(entry, _)| entry.clone())
            .collect();

        let mut details = Vec::new();
        if !removed.is_empty() {
            details.push(Detail::removal(Value::Sequence(removed)));
        }
        if !added.is_empty() {
            details.push(Detail::addition(Value::Sequence(added)));
        }
        if details.is_empty() && from != to && !self.options.ignore_order_changes {
            details.push(Detail::order_change(
                Value::Sequence(from.to_vec()),
                Value::Sequence(to.to_vec()),
            ));
        }
        self.push(path, details);
    }
}

/// Text of a scalar used as a key or identifier
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Copy of `value` with mapping keys and sequence entries sorted
fn canonical(value: &Value) -> Value {
    match value {
        Value::Sequence(items) => {
            let mut items: Vec<(String, Value)> = items
                .iter()
                .map(|item| {
                    let item = canonical(item);
                    (serde_yaml::to_string(&item).unwrap_or_default(), item)
                })
                .collect();
            items.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Sequence(items.into_iter().map(|(_, item)| item).collect())
        }
        Value::Mapping(map) => {
            let mut entries: Vec<(String, &Value, Value)> = map
                .iter()
                .map(|(k, v)| (scalar_text(k), k, canonical(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Mapping(entries.into_iter().map(|(_, k, v)| (k.clone(), v)).collect())
        }
        Value::Tagged(tagged) => Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
            tag: tagged.tag.clone(),
            value: canonical(&tagged.value),
        })),
        other => other.clone(),
    }
}

fn identifier(entry: &Value, field: &str) -> Option<String> {
    match entry.as_mapping()?.get(field)? {
        v @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => Some(scalar_text(v)),
        _ => None,
    }
}

fn named_entries<'a>(list: &'a [Value], field: &str) -> IndexMap<String, &'a Value> {
    list.iter()
        .filter_map(|entry| identifier(entry, field).map(|id| (id, entry)))
        .collect()
}

/// The first identifier field every entry carries, uniquely per list
fn identifier_field(from: &[Value], to: &[Value]) -> Option<&'static str> {
    if from.is_empty() && to.is_empty() {
        return None;
    }

    IDENTIFIER_FIELDS.iter().copied().find(|field| {
        [from, to].iter().all(|list| {
            list.iter().all(|e| identifier(e, field).is_some())
                && named_entries(list, field).len() == list.len()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::document::parse_documents;

    const IGNORE_ORDER: CompareOptions = CompareOptions {
        ignore_order_changes: true,
    };

    fn diff(from: &str, to: &str, options: CompareOptions) -> DiffReport {
        compare(
            &parse_documents("from", from).unwrap(),
            &parse_documents("to", to).unwrap(),
            options,
        )
    }

    fn paths(report: &DiffReport) -> Vec<String> {
        report
            .diffs
            .iter()
            .map(|d| d.path.as_ref().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: app
spec:
  replicas: 3
  template:
    spec:
      containers:
        - name: web
          image: nginx:1.0
          args: ["--a", "--b"]
        - name: sidecar
          image: envoy:1
"#;

    #[test]
    fn test_identical_documents() {
        assert!(diff(DEPLOYMENT, DEPLOYMENT, IGNORE_ORDER).is_empty());
    }

    #[test]
    fn test_scalar_modification() {
        let to = DEPLOYMENT.replace("replicas: 3", "replicas: 5");
        let report = diff(DEPLOYMENT, &to, IGNORE_ORDER);

        assert_eq!(paths(&report), vec!["spec.replicas"]);
        let d = &report.diffs[0];
        assert_eq!(d.document, "apps/v1/Deployment/app");
        assert_eq!(d.details.len(), 1);
        assert_eq!(d.details[0].kind, DetailKind::Modification);
        assert_eq!(d.details[0].from, Some(Value::from(3)));
        assert_eq!(d.details[0].to, Some(Value::from(5)));
    }

    #[test]
    fn test_named_list_entries_are_matched_by_name() {
        let to = DEPLOYMENT.replace("nginx:1.0", "nginx:2.0");
        let report = diff(DEPLOYMENT, &to, IGNORE_ORDER);

        assert_eq!(paths(&report), vec!["spec.template.spec.containers.web.image"]);
    }

    #[test]
    fn test_reordering_only_is_ignored() {
        let to = r#"
kind: Deployment
apiVersion: apps/v1
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - name: sidecar
          image: envoy:1
        - name: web
          args: ["--b", "--a"]
          image: nginx:1.0
  replicas: 3
"#;
        assert!(diff(DEPLOYMENT, to, IGNORE_ORDER).is_empty());

        let report = diff(DEPLOYMENT, to, CompareOptions::default());
        assert!(report
            .diffs
            .iter()
            .flat_map(|d| &d.details)
            .all(|detail| detail.kind == DetailKind::OrderChange));
        assert_eq!(
            paths(&report),
            vec![
                "spec.template.spec.containers",
                "spec.template.spec.containers.web.args"
            ]
        );
    }

    #[test]
    fn test_nested_reordering_in_unnamed_entries_is_ignored() {
        let from = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: reader
rules:
  - apiGroups: [""]
    resources: [pods, services]
    verbs: [get, list]
"#;
        let to = from
            .replace("[get, list]", "[list, get]")
            .replace("[pods, services]", "[services, pods]");

        assert!(diff(from, &to, IGNORE_ORDER).is_empty());

        let report = diff(from, &to, CompareOptions::default());
        assert_eq!(paths(&report), vec!["rules"]);
        assert_eq!(report.diffs[0].details[0].kind, DetailKind::Removal);

        let changed = to.replace("[list, get]", "[list, watch]");
        let report = diff(from, &changed, IGNORE_ORDER);
        assert_eq!(paths(&report), vec!["rules"]);
        assert_eq!(report.diffs[0].details.len(), 2);
    }

    #[test]
    fn test_map_entries_added_and_removed() {
        let from = "kind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: \"1\"\n  b: \"2\"\n";
        let to = "kind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  b: \"2\"\n  c: \"3\"\n  d: \"4\"\n";
        let report = diff(from, to, IGNORE_ORDER);

        assert_eq!(paths(&report), vec!["data"]);
        let details = &report.diffs[0].details;
        assert_eq!(details[0].kind, DetailKind::Removal);
        assert_eq!(details[0].from.as_ref().unwrap().as_mapping().unwrap().len(), 1);
        assert_eq!(details[1].kind, DetailKind::Addition);
        assert_eq!(details[1].to.as_ref().unwrap().as_mapping().unwrap().len(), 2);
    }

    #[test]
    fn test_multiset_lists() {
        let from = "list: [a, b, b, c]\n";
        let to = "list: [b, c, d, b]\n";
        let report = diff(from, to, IGNORE_ORDER);

        let details = &report.diffs[0].details;
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].from, Some(Value::Sequence(vec![Value::from("a")])));
        assert_eq!(details[1].to, Some(Value::Sequence(vec![Value::from("d")])));
    }

    #[test]
    fn test_documents_matched_by_identity_not_position() {
        let a = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\ndata:\n  k: v\n";
        let b = "apiVersion: v1\nkind: Service\nmetadata:\n  name: b\n";
        let report = diff(&format!("{a}---\n{b}"), &format!("{b}---\n{a}"), IGNORE_ORDER);
        assert!(report.is_empty());
    }

    #[test]
    fn test_document_added_and_removed() {
        let a = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n";
        let b = "apiVersion: v1\nkind: Service\nmetadata:\n  name: b\n";
        let report = diff(a, b, IGNORE_ORDER);

        assert_eq!(report.len(), 2);
        assert!(report.diffs.iter().all(|d| d.path.is_none()));
        assert_eq!(report.diffs[0].document, "v1/ConfigMap/a");
        assert_eq!(report.diffs[0].details[0].kind, DetailKind::Removal);
        assert_eq!(report.diffs[1].document, "v1/Service/b");
        assert_eq!(report.diffs[1].details[0].kind, DetailKind::Addition);
    }

    #[test]
    fn test_anonymous_documents_matched_by_position() {
        let report = diff("a: 1\n---\nb: 1\n", "a: 2\n", IGNORE_ORDER);

        assert_eq!(report.len(), 2);
        assert_eq!(paths(&report)[0], "a");
        assert_eq!(report.diffs[0].document, "document #0");
        assert!(report.diffs[1].path.is_none());
    }

    #[test]
    fn test_type_change() {
        let report = diff("x:\n  y: 1\n", "x: plain\n", IGNORE_ORDER);
        assert_eq!(paths(&report), vec!["x"]);
        assert_eq!(report.diffs[0].details[0].kind, DetailKind::Modification);
    }

    #[test]
    fn test_root_level_path_display() {
        assert_eq!(DiffPath::default().to_string(), "(root level)");
    }
}

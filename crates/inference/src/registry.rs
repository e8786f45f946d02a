use crate::error::InferenceError;
use crate::search::SearchPath;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::{Arc, OnceLock};

const RESOURCE: &str = "class list";

/// Ordered class labels; index `i` names network output `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Loads the class list once and hands out the same instance afterwards.
#[derive(Debug)]
pub struct ClassRegistry {
    search: SearchPath,
    loaded: OnceLock<Result<Arc<ClassList>, InferenceError>>,
}

impl ClassRegistry {
    pub fn new(search: SearchPath) -> Self {
        Self {
            search,
            loaded: OnceLock::new(),
        }
    }

    pub fn load_classes(&self) -> Result<Arc<ClassList>, InferenceError> {
        self.loaded
            .get_or_init(|| read_class_list(&self.search).map(Arc::new))
            .clone()
    }
}

/// Read the first existing candidate as a JSON array of labels.
///
/// Duplicate labels are accepted; an empty list is not.
pub fn read_class_list(search: &SearchPath) -> Result<ClassList, InferenceError> {
    let path = search
        .first_existing()
        .ok_or_else(|| InferenceError::missing(RESOURCE, search.candidates()))?;

    let text = fs::read_to_string(path).map_err(|e| InferenceError::malformed(RESOURCE, path, e))?;

    let classes: ClassList = serde_json::from_str(&text).map_err(|e| {
        InferenceError::malformed(RESOURCE, path, format!("expected a JSON array of strings: {}", e))
    })?;

    if classes.is_empty() {
        return Err(InferenceError::malformed(RESOURCE, path, "class list is empty"));
    }

    tracing::info!(
        path = %path.display(),
        classes = classes.len(),
        "Loaded class list"
    );

    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Anchor, Anchors, CLASS_LIST_FILE};
    use std::path::Path;
    use tempfile::tempdir;

    fn search_in(dir: &Path) -> SearchPath {
        let anchors = Anchors::from_code_dir(None, dir);
        SearchPath::new(&anchors, &[(Anchor::DeployRoot, CLASS_LIST_FILE)], None)
    }

    #[test]
    fn test_labels_keep_file_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CLASS_LIST_FILE),
            r#"["Tomato___healthy", "Apple___scab", "Corn___rust"]"#,
        )
        .unwrap();

        let classes = read_class_list(&search_in(dir.path())).unwrap();

        assert_eq!(classes.len(), 3);
        assert_eq!(
            classes.iter().collect::<Vec<_>>(),
            vec!["Tomato___healthy", "Apple___scab", "Corn___rust"]
        );
    }

    #[test]
    fn test_registry_returns_the_same_instance() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLASS_LIST_FILE), r#"["healthy", "rust"]"#).unwrap();
        let registry = ClassRegistry::new(search_in(dir.path()));

        let first = registry.load_classes().unwrap();
        // Later edits are not observed once loaded
        fs::write(dir.path().join(CLASS_LIST_FILE), r#"["other"]"#).unwrap();
        let second = registry.load_classes().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_duplicate_labels_are_accepted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLASS_LIST_FILE), r#"["rust", "rust"]"#).unwrap();

        let classes = read_class_list(&search_in(dir.path())).unwrap();

        assert_eq!(classes.get(0), classes.get(1));
    }

    #[test]
    fn test_missing_file_reports_searched_paths() {
        let dir = tempdir().unwrap();

        let err = read_class_list(&search_in(dir.path())).unwrap_err();

        match err {
            InferenceError::MissingResource {
                resource, searched, ..
            } => {
                assert_eq!(resource, "class list");
                assert_eq!(searched, vec![dir.path().join(CLASS_LIST_FILE)]);
            }
            other => panic!("Expected MissingResource, got {:?}", other),
        }
    }

    #[test]
    fn test_non_array_json_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLASS_LIST_FILE), r#"{"0": "healthy"}"#).unwrap();

        let err = read_class_list(&search_in(dir.path())).unwrap_err();

        assert!(matches!(err, InferenceError::MissingResource { detail: Some(_), .. }));
        assert!(err.to_string().contains("JSON array"), "{}", err);
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CLASS_LIST_FILE), "[]").unwrap();

        let err = read_class_list(&search_in(dir.path())).unwrap_err();

        assert!(err.to_string().contains("empty"), "{}", err);
    }
}

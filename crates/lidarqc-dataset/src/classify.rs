//! Product-folder classification.
//!
//! A delivery's parent directory holds product subfolders named by
//! convention, e.g. `01_Classified_Point_Cloud`, `02_DEM`, `03_DSM`.
//! Classification matches folder names against per-category keyword sets,
//! case-insensitively. Callers can bypass matching for any category by
//! naming the subfolder explicitly.

use crate::{DatasetError, Result};
use lidarqc_core::{Category, QcConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit per-category subfolder names supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Subfolder holding DEM rasters.
    pub dem: Option<String>,
    /// Subfolder holding DSM rasters.
    pub dsm: Option<String>,
    /// Subfolder holding the point cloud.
    pub point_cloud: Option<String>,
}

impl Overrides {
    fn get(&self, category: Category) -> Option<&str> {
        match category {
            Category::Dem => self.dem.as_deref(),
            Category::Dsm => self.dsm.as_deref(),
            Category::PointCloud => self.point_cloud.as_deref(),
        }
    }
}

/// A classification problem that excluded a folder or category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierDiagnostic {
    /// A folder name matched the keyword sets of more than one category.
    AmbiguousFolder {
        /// Folder name as found on disk.
        folder: String,
        /// Every category whose keywords matched.
        categories: Vec<Category>,
    },
    /// More than one folder matched the same category's keywords.
    AmbiguousCategory {
        /// The contested category.
        category: Category,
        /// Every folder name that matched.
        folders: Vec<String>,
    },
}

impl std::fmt::Display for ClassifierDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierDiagnostic::AmbiguousFolder { folder, categories } => {
                let names: Vec<_> = categories.iter().map(|c| c.name()).collect();
                write!(
                    f,
                    "folder '{}' matches multiple categories ({}); name it explicitly to include it",
                    folder,
                    names.join(", ")
                )
            }
            ClassifierDiagnostic::AmbiguousCategory { category, folders } => {
                write!(
                    f,
                    "multiple folders match category '{}' ({}); name one explicitly to include it",
                    category,
                    folders.join(", ")
                )
            }
        }
    }
}

/// Result of classifying a parent directory.
#[derive(Debug, Default)]
pub struct Classification {
    /// Resolved category to subfolder mappings. Categories with no match
    /// are simply absent; that is not an error.
    pub folders: Vec<(Category, PathBuf)>,
    /// Ambiguities that excluded folders or categories.
    pub diagnostics: Vec<ClassifierDiagnostic>,
}

impl Classification {
    /// Subfolder resolved for a category, if any.
    pub fn folder_for(&self, category: Category) -> Option<&Path> {
        self.folders
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, p)| p.as_path())
    }
}

/// Classifies product subfolders by name.
pub struct FolderClassifier<'a> {
    config: &'a QcConfig,
}

impl<'a> FolderClassifier<'a> {
    /// Create a classifier over the given configuration.
    pub fn new(config: &'a QcConfig) -> Self {
        Self { config }
    }

    /// Classify the immediate subfolders of `parent_dir`.
    ///
    /// Overridden categories skip keyword matching entirely; an override
    /// naming a folder that does not exist is a configuration error, since
    /// the caller asserted it is there. Keyword ambiguities never fail the
    /// call - they are returned as diagnostics and the affected folder or
    /// category is left unmapped.
    pub fn classify(&self, parent_dir: &Path, overrides: &Overrides) -> Result<Classification> {
        if !parent_dir.is_dir() {
            return Err(DatasetError::Configuration(format!(
                "input directory '{}' does not exist or is not a directory",
                parent_dir.display()
            )));
        }

        let mut classification = Classification::default();
        let mut subfolders: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(parent_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    subfolders.push(name.to_string());
                }
            }
        }
        subfolders.sort();

        // Folders claimed by an override are not considered for keyword
        // matching of other categories.
        let mut overridden: Vec<&str> = Vec::new();
        for category in Category::ALL {
            if let Some(name) = overrides.get(category) {
                overridden.push(name);
            }
        }

        // First pass: which categories does each folder's name match?
        let mut matches: Vec<(String, Vec<Category>)> = Vec::new();
        for name in &subfolders {
            if overridden.contains(&name.as_str()) {
                continue;
            }
            let lowered = name.to_lowercase();
            let matched: Vec<Category> = Category::ALL
                .into_iter()
                .filter(|&category| {
                    self.config
                        .keywords_for(category)
                        .iter()
                        .any(|kw| lowered.contains(&kw.to_lowercase()))
                })
                .collect();
            if matched.len() > 1 {
                classification
                    .diagnostics
                    .push(ClassifierDiagnostic::AmbiguousFolder {
                        folder: name.clone(),
                        categories: matched,
                    });
            } else if matched.len() == 1 {
                matches.push((name.clone(), matched));
            }
        }

        for category in Category::ALL {
            if let Some(name) = overrides.get(category) {
                let path = parent_dir.join(name);
                if !path.is_dir() {
                    return Err(DatasetError::Configuration(format!(
                        "'{}' is not a folder/directory",
                        path.display()
                    )));
                }
                debug!(category = %category, folder = name, "category folder set by override");
                classification.folders.push((category, path));
                continue;
            }

            let candidates: Vec<&String> = matches
                .iter()
                .filter(|(_, cats)| cats.contains(&category))
                .map(|(name, _)| name)
                .collect();
            match candidates.as_slice() {
                [] => {}
                [name] => {
                    debug!(category = %category, folder = %name, "category folder classified");
                    classification
                        .folders
                        .push((category, parent_dir.join(name)));
                }
                many => {
                    classification
                        .diagnostics
                        .push(ClassifierDiagnostic::AmbiguousCategory {
                            category,
                            folders: many.iter().map(|n| n.to_string()).collect(),
                        });
                }
            }
        }

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dirs(root: &Path, names: &[&str]) {
        for name in names {
            std::fs::create_dir(root.join(name)).unwrap();
        }
    }

    #[test]
    fn test_keyword_classification() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(
            dir.path(),
            &["01_Classified_Point_Cloud", "02_DEM", "03_DSM", "Reports"],
        );

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let result = classifier
            .classify(dir.path(), &Overrides::default())
            .unwrap();

        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.folder_for(Category::Dem).unwrap(),
            dir.path().join("02_DEM")
        );
        assert_eq!(
            result.folder_for(Category::Dsm).unwrap(),
            dir.path().join("03_DSM")
        );
        assert_eq!(
            result.folder_for(Category::PointCloud).unwrap(),
            dir.path().join("01_Classified_Point_Cloud")
        );
    }

    #[test]
    fn test_no_matching_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["02_DEM"]);

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let result = classifier
            .classify(dir.path(), &Overrides::default())
            .unwrap();

        assert!(result.folder_for(Category::Dem).is_some());
        assert!(result.folder_for(Category::PointCloud).is_none());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_multi_category_folder_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["DEM_and_DSM"]);

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let result = classifier
            .classify(dir.path(), &Overrides::default())
            .unwrap();

        assert!(result.folders.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        match &result.diagnostics[0] {
            ClassifierDiagnostic::AmbiguousFolder { folder, categories } => {
                assert_eq!(folder, "DEM_and_DSM");
                assert_eq!(categories.as_slice(), &[Category::Dem, Category::Dsm]);
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn test_two_folders_same_category_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["DEM_1m", "dem_old"]);

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let result = classifier
            .classify(dir.path(), &Overrides::default())
            .unwrap();

        assert!(result.folder_for(Category::Dem).is_none());
        assert_eq!(result.diagnostics.len(), 1);
        match &result.diagnostics[0] {
            ClassifierDiagnostic::AmbiguousCategory { category, folders } => {
                assert_eq!(*category, Category::Dem);
                assert_eq!(folders.len(), 2);
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn test_override_resolves_ambiguity() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["DEM_1m", "dem_old"]);

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let overrides = Overrides {
            dem: Some("DEM_1m".to_string()),
            ..Overrides::default()
        };
        let result = classifier.classify(dir.path(), &overrides).unwrap();

        assert_eq!(
            result.folder_for(Category::Dem).unwrap(),
            dir.path().join("DEM_1m")
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_override_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let overrides = Overrides {
            point_cloud: Some("no_such_folder".to_string()),
            ..Overrides::default()
        };
        let err = classifier.classify(dir.path(), &overrides).unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }

    #[test]
    fn test_missing_parent_dir_is_fatal() {
        let config = QcConfig::default();
        let classifier = FolderClassifier::new(&config);
        let err = classifier
            .classify(Path::new("/nonexistent/delivery"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, DatasetError::Configuration(_)));
    }
}

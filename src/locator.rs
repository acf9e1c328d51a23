use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::{
    error::Result,
    remote::RemoteFilesystem,
    types::{FileMetadata, SearchHit},
};

/// Finds files by exact name anywhere below a root folder
pub struct FileLocator {
    remote: Arc<dyn RemoteFilesystem>,
}

/// Children of one folder that are still waiting to be visited
struct Frame {
    folder_id: String,
    children: std::vec::IntoIter<FileMetadata>,
}

impl FileLocator {
    pub fn new(remote: Arc<dyn RemoteFilesystem>) -> Self {
        Self { remote }
    }

    /// Search the subtree of `root_folder_id` for entries named `target_name`
    ///
    /// Hits are returned in discovery order (a folder's subtree is visited
    /// before its later siblings) and collapsed to one per parent folder.
    /// Any listing error aborts the whole search.
    pub async fn locate(&self, root_folder_id: &str, target_name: &str) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();
        let mut stack = vec![self.open(root_folder_id).await?];

        while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.next() else {
                stack.pop();
                continue;
            };

            if child.is_blank() {
                continue;
            }

            if child.name == target_name {
                debug!(parent = %frame.folder_id, file_id = %child.id, "name match");
                hits.push(SearchHit {
                    parent_folder_id: frame.folder_id.clone(),
                    file: child.clone(),
                });
            }

            // A matching folder is still searched
            if child.is_folder() {
                let next = self.open(&child.id).await?;
                stack.push(next);
            }
        }

        Ok(dedup_by_parent(hits))
    }

    async fn open(&self, folder_id: &str) -> Result<Frame> {
        let children = self.remote.list_children(folder_id).await?;
        debug!(folder_id, count = children.len(), "listed folder");
        Ok(Frame {
            folder_id: folder_id.to_string(),
            children: children.into_iter(),
        })
    }
}

/// Keep the first hit for each parent folder, preserving order
pub fn dedup_by_parent(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.parent_folder_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriveError;
    use crate::remote::ByteStream;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTree {
        folders: HashMap<String, Vec<FileMetadata>>,
        listed: Mutex<Vec<String>>,
    }

    impl MockTree {
        fn with(mut self, folder_id: &str, children: Vec<FileMetadata>) -> Self {
            self.folders.insert(folder_id.to_string(), children);
            self
        }
    }

    #[async_trait]
    impl RemoteFilesystem for MockTree {
        async fn list_children(&self, folder_id: &str) -> Result<Vec<FileMetadata>> {
            self.listed.lock().unwrap().push(folder_id.to_string());
            self.folders
                .get(folder_id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound {
                    id: folder_id.to_string(),
                })
        }

        async fn download(&self, file_id: &str) -> Result<ByteStream> {
            Err(DriveError::NotFound {
                id: file_id.to_string(),
            })
        }

        fn identifier(&self) -> String {
            "mock".to_string()
        }
    }

    fn file(id: &str, name: &str) -> FileMetadata {
        FileMetadata::new(id, name, "text/plain")
    }

    fn hit(parent: &str, file: FileMetadata) -> SearchHit {
        SearchHit {
            parent_folder_id: parent.to_string(),
            file,
        }
    }

    #[tokio::test]
    async fn test_finds_file_two_levels_deep() {
        let tree = MockTree::default()
            .with("root", vec![FileMetadata::folder("a", "A")])
            .with("a", vec![FileMetadata::folder("b", "B")])
            .with("b", vec![file("t", "target.txt")]);
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("root", "target.txt").await.unwrap();
        assert_eq!(hits, vec![hit("b", file("t", "target.txt"))]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let tree = MockTree::default()
            .with("root", vec![file("1", "a.txt"), FileMetadata::folder("d", "dir")])
            .with("d", vec![]);
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("root", "missing.txt").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_same_folder_duplicates_collapse_to_first() {
        let tree = MockTree::default().with(
            "root",
            vec![file("1", "dup.txt"), file("2", "other"), file("3", "dup.txt")],
        );
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("root", "dup.txt").await.unwrap();
        assert_eq!(hits, vec![hit("root", file("1", "dup.txt"))]);
    }

    #[tokio::test]
    async fn test_matching_folder_is_recorded_and_searched() {
        let tree = MockTree::default()
            .with("root", vec![FileMetadata::folder("n", "needle")])
            .with("n", vec![FileMetadata::folder("inner", "needle")])
            .with("inner", vec![]);
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("root", "needle").await.unwrap();
        assert_eq!(
            hits,
            vec![
                hit("root", FileMetadata::folder("n", "needle")),
                hit("n", FileMetadata::folder("inner", "needle")),
            ]
        );
    }

    #[tokio::test]
    async fn test_subtree_hits_come_before_later_siblings() {
        let tree = MockTree::default()
            .with(
                "root",
                vec![
                    FileMetadata::folder("a", "A"),
                    file("r", "x"),
                    FileMetadata::folder("b", "B"),
                ],
            )
            .with("a", vec![file("ax", "x")])
            .with("b", vec![file("bx", "x")]);
        let remote = Arc::new(tree);
        let locator = FileLocator::new(remote.clone());

        let hits = locator.locate("root", "x").await.unwrap();
        let parents: Vec<_> = hits.iter().map(|h| h.parent_folder_id.as_str()).collect();
        assert_eq!(parents, vec!["a", "root", "b"]);
        assert_eq!(*remote.listed.lock().unwrap(), vec!["root", "a", "b"]);
    }

    #[tokio::test]
    async fn test_blank_entries_are_skipped() {
        let tree = MockTree::default().with("root", vec![file("", "x"), file("1", "x")]);
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("root", "x").await.unwrap();
        assert_eq!(hits, vec![hit("root", file("1", "x"))]);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_search() {
        let tree = MockTree::default().with(
            "root",
            vec![file("1", "x"), FileMetadata::folder("gone", "gone")],
        );
        let locator = FileLocator::new(Arc::new(tree));

        assert!(matches!(
            locator.locate("root", "x").await,
            Err(DriveError::NotFound { id }) if id == "gone"
        ));
    }

    #[tokio::test]
    async fn test_deep_chain_does_not_recurse() {
        let mut tree = MockTree::default();
        let depth = 5_000;
        for level in 0..depth {
            let id = format!("f{level}");
            let child = FileMetadata::folder(format!("f{}", level + 1), "nested");
            tree = tree.with(&id, vec![child]);
        }
        tree = tree.with(&format!("f{depth}"), vec![file("leaf", "deep.bin")]);
        let locator = FileLocator::new(Arc::new(tree));

        let hits = locator.locate("f0", "deep.bin").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].parent_folder_id, format!("f{depth}"));
    }

    #[test]
    fn test_dedup_keys_on_parent_not_file() {
        let hits = vec![
            hit("p1", file("1", "x")),
            hit("p2", file("2", "x")),
            hit("p1", file("3", "x")),
            hit("p2", file("2", "x")),
        ];
        let deduped = dedup_by_parent(hits);
        assert_eq!(
            deduped,
            vec![hit("p1", file("1", "x")), hit("p2", file("2", "x"))]
        );
    }
}

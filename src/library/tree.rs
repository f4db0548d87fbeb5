//! In-memory page hierarchy of a library
//!
//! Pages live in a flat arena kept in pre-order (every parent comes before
//! its children); links between pages are page ids.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("page {0} not found in tree")]
    NotFound(String),

    #[error("page id {0} appears twice in tree")]
    DuplicateId(String),

    #[error("page path '{0}' appears twice in tree")]
    DuplicatePath(String),

    #[error("malformed page tree: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub path: String,
    #[serde(skip)]
    pub parent: Option<String>,
    #[serde(skip)]
    pub children: Vec<String>,
}

impl Page {
    pub fn new(id: impl Into<String>, title: impl Into<String>, path: impl Into<String>) -> Page {
        Page {
            id: id.into(),
            title: title.into(),
            path: path.into(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct PageTree {
    pages: Vec<Page>,
    index: HashMap<String, usize>,
    paths: HashSet<String>,
}

impl PageTree {
    pub fn new(root: Page) -> PageTree {
        let mut root = root;
        root.parent = None;
        root.children.clear();

        PageTree {
            index: HashMap::from([(root.id.clone(), 0)]),
            paths: HashSet::from([root.path.clone()]),
            pages: vec![root],
        }
    }

    /// Appends `page` as the last child of `parent_id`.
    ///
    /// Children must be added depth-first so that the arena order stays the
    /// tree's natural order.
    pub fn add_child(&mut self, parent_id: &str, page: Page) -> Result<(), TreeError> {
        let parent_index = *self
            .index
            .get(parent_id)
            .ok_or_else(|| TreeError::NotFound(parent_id.to_string()))?;

        if self.index.contains_key(&page.id) {
            return Err(TreeError::DuplicateId(page.id));
        }
        if self.paths.contains(&page.path) {
            return Err(TreeError::DuplicatePath(page.path));
        }

        let mut page = page;
        page.parent = Some(parent_id.to_string());
        page.children.clear();

        self.pages[parent_index].children.push(page.id.clone());
        self.index.insert(page.id.clone(), self.pages.len());
        self.paths.insert(page.path.clone());
        self.pages.push(page);

        Ok(())
    }

    pub fn root(&self) -> &Page {
        &self.pages[0]
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.index.get(id).map(|&i| &self.pages[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All pages, in the tree's natural order (root first).
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn parent(&self, page: &Page) -> Option<&Page> {
        page.parent.as_deref().and_then(|id| self.get(id))
    }

    pub fn children<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = &'a Page> + 'a {
        page.children.iter().filter_map(move |id| self.get(id))
    }

    /// The page itself followed by each of its ancestors up to the root.
    pub fn self_and_ancestors<'a>(&'a self, id: &str) -> SelfAndAncestors<'a> {
        SelfAndAncestors {
            tree: self,
            next: self.get(id),
        }
    }

    /// Ids of the page and all of its transitive descendants.
    pub fn self_and_descendants(&self, id: &str) -> Result<HashSet<String>, TreeError> {
        let start = self
            .get(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;

        let mut found = HashSet::new();
        let mut stack = vec![start];
        while let Some(page) = stack.pop() {
            found.insert(page.id.clone());
            stack.extend(self.children(page));
        }

        Ok(found)
    }

    /// New tree rooted at `id`, restricted to that page and its descendants.
    pub fn sub_tree(&self, id: &str) -> Result<PageTree, TreeError> {
        let keep = self.self_and_descendants(id)?;

        let pages: Vec<Page> = self
            .pages
            .iter()
            .filter(|page| keep.contains(&page.id))
            .cloned()
            .map(|mut page| {
                if page.id == id {
                    page.parent = None;
                }
                page
            })
            .collect();

        // The new root is the first kept page in pre-order.
        let index = pages
            .iter()
            .enumerate()
            .map(|(i, page)| (page.id.clone(), i))
            .collect();
        let paths = pages.iter().map(|page| page.path.clone()).collect();

        Ok(PageTree {
            pages,
            index,
            paths,
        })
    }
}

pub struct SelfAndAncestors<'a> {
    tree: &'a PageTree,
    next: Option<&'a Page>,
}

impl<'a> Iterator for SelfAndAncestors<'a> {
    type Item = &'a Page;

    fn next(&mut self) -> Option<&'a Page> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

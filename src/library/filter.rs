//! Selection of the pages to export
//!
//! A page is selected when its title matches the include regex or its id is
//! listed, and its title does not match the exclude regex. The selection is
//! then closed upward so that every selected page keeps its ancestors.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::tree::{Page, PageTree, TreeError};
use crate::core::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilterOptions {
    pub page_title_include: Option<String>,
    pub page_title_exclude: Option<String>,
    /// Comma separated page ids
    pub page_id_include: Option<String>,
    pub root_page_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ContentFilter {
    title_include: Option<Regex>,
    title_exclude: Option<Regex>,
    id_include: Option<HashSet<String>>,
    root_page_id: Option<String>,
}

fn compile(option: &'static str, pattern: &Option<String>) -> Result<Option<Regex>, ConfigError> {
    match pattern {
        Some(pattern) if !pattern.is_empty() => RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|source| ConfigError::InvalidRegex { option, source }),
        _ => Ok(None),
    }
}

impl ContentFilter {
    pub fn new(options: &ContentFilterOptions) -> Result<ContentFilter, ConfigError> {
        let id_include = options.page_id_include.as_ref().map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect::<HashSet<_>>()
        });

        Ok(ContentFilter {
            title_include: compile("page title include", &options.page_title_include)?,
            title_exclude: compile("page title exclude", &options.page_title_exclude)?,
            id_include,
            root_page_id: options
                .root_page_id
                .as_ref()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        })
    }

    fn is_selected(&self, page: &Page) -> bool {
        let by_title = self
            .title_include
            .as_ref()
            .map(|regex| regex.is_match(&page.title));
        let by_id = self
            .id_include
            .as_ref()
            .map(|ids| ids.contains(&page.id));

        let included = match (by_title, by_id) {
            (None, None) => true,
            (Some(hit), None) | (None, Some(hit)) => hit,
            (Some(title_hit), Some(id_hit)) => title_hit || id_hit,
        };

        let excluded = self
            .title_exclude
            .as_ref()
            .is_some_and(|regex| regex.is_match(&page.title));

        included && !excluded
    }

    /// Pages to export, in tree order, every one of them with its ancestors.
    pub fn filter(&self, tree: &PageTree) -> Result<Vec<Page>, TreeError> {
        let restricted;
        let tree = match &self.root_page_id {
            Some(root_page_id) => {
                restricted = tree.sub_tree(root_page_id)?;
                &restricted
            }
            None => tree,
        };

        let mut selected: HashSet<&str> = HashSet::new();
        for page in tree.pages().filter(|page| self.is_selected(page)) {
            for member in tree.self_and_ancestors(&page.id) {
                // Ancestors of an already selected page are selected too.
                if !selected.insert(&member.id) {
                    break;
                }
            }
        }

        Ok(tree
            .pages()
            .filter(|page| selected.contains(page.id.as_str()))
            .cloned()
            .collect())
    }
}

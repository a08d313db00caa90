//! Category trie and per-locale category counters.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{IndexError, IndexResult};
use crate::index::Number;
use crate::locale::{Country, Lang};

/// Node of the category trie.
///
/// A node holds every message assigned to it or to any category below it.
#[derive(Debug, Default)]
pub struct Category {
    messages: HashSet<Number>,
    children: HashMap<String, Category>,
}

impl Category {
    /// Messages in this category or below.
    pub fn messages(&self) -> &HashSet<Number> {
        &self.messages
    }

    /// Direct subcategories.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Category)> + '_ {
        self.children.iter().map(|(name, child)| (name.as_str(), child))
    }

    /// Whether the node holds nothing.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.is_empty()
    }

    /// Record `number` here and along `path`.
    ///
    /// `path` is relative to this node, lower-cased, with every segment
    /// terminated by '/' (`"world/europe/"`).
    pub fn insert(&mut self, path: &str, number: Number) -> IndexResult<()> {
        self.messages.insert(number);
        if path.is_empty() {
            return Ok(());
        }
        let (name, rest) = path
            .split_once('/')
            .ok_or_else(|| IndexError::malformed(format!("category segment `{path}` has no '/'")))?;
        self.children
            .entry(name.to_string())
            .or_default()
            .insert(rest, number)
    }

    /// Undo [`Category::insert`], dropping nodes that become empty.
    pub fn remove(&mut self, path: &str, number: Number) -> IndexResult<()> {
        self.messages.remove(&number);
        if path.is_empty() {
            return Ok(());
        }
        let (name, rest) = path
            .split_once('/')
            .ok_or_else(|| IndexError::corrupted(format!("category segment `{path}` has no '/'")))?;
        let child = self
            .children
            .get_mut(name)
            .ok_or_else(|| IndexError::corrupted(format!("no category node `{name}`")))?;
        child.remove(rest, number)?;
        if child.is_empty() {
            self.children.remove(name);
        }
        Ok(())
    }

    /// Node at `path`, relative to this one.
    pub fn find(&self, path: &str) -> Option<&Category> {
        if path.is_empty() {
            return Some(self);
        }
        let (name, rest) = path.split_once('/')?;
        self.children.get(name)?.find(rest)
    }
}

/// Path of `category` inside the trie: lower-cased, without the leading '/'
/// and with a trailing '/'. `None` if the category does not start with '/'.
pub fn tree_path(category: &str) -> Option<String> {
    let path = category.strip_prefix('/')?;
    let mut path = path.to_lowercase();
    if !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    Some(path)
}

/// Every '/'-terminated prefix of every category, sorted and distinct.
pub fn category_paths<'a>(categories: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut paths = BTreeSet::new();
    for category in categories {
        let mut category = category.clone();
        if !category.ends_with('/') {
            category.push('/');
        }
        for (i, _) in category.match_indices('/') {
            paths.insert(category[..=i].to_string());
        }
    }
    paths.into_iter().collect()
}

/// Message counts per category path, per language and country.
///
/// A message is counted under any locale, under its language alone, under its
/// country alone and under both. Null parts collapse into the wider locales.
#[derive(Debug, Default)]
pub struct LocaleCategoryCounter {
    counters: HashMap<(Lang, Country), HashMap<String, u32>>,
}

impl LocaleCategoryCounter {
    fn locales(lang: Lang, country: Country) -> Vec<(Lang, Country)> {
        let mut locales = vec![
            (Lang::NULL, Country::NULL),
            (lang, Country::NULL),
            (Lang::NULL, country),
            (lang, country),
        ];
        locales.sort_unstable();
        locales.dedup();
        locales
    }

    /// Count a message of `lang`/`country` in `path`.
    pub fn increment(&mut self, lang: Lang, country: Country, path: &str) {
        for locale in Self::locales(lang, country) {
            *self
                .counters
                .entry(locale)
                .or_default()
                .entry(path.to_string())
                .or_insert(0) += 1;
        }
    }

    /// Take back [`LocaleCategoryCounter::increment`].
    pub fn decrement(&mut self, lang: Lang, country: Country, path: &str) -> IndexResult<()> {
        for locale in Self::locales(lang, country) {
            let paths = self
                .counters
                .get_mut(&locale)
                .ok_or_else(|| IndexError::corrupted(format!("no category counter for {path}")))?;
            let count = paths
                .get_mut(path)
                .ok_or_else(|| IndexError::corrupted(format!("no category counter for {path}")))?;
            *count -= 1;
            if *count == 0 {
                paths.remove(path);
                if paths.is_empty() {
                    self.counters.remove(&locale);
                }
            }
        }
        Ok(())
    }

    /// Messages of `lang`/`country` in `path`; null values match any.
    pub fn count(&self, lang: Lang, country: Country, path: &str) -> u32 {
        self.counters
            .get(&(lang, country))
            .and_then(|paths| paths.get(path))
            .copied()
            .unwrap_or(0)
    }
}

//! Presentation-ready views over resolved content.
//!
//! `ContentService` ties the resolver to the aggregate cache and the
//! reconciler, producing the data a page renderer needs for each node kind.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use crate::domain::{AggregateCounts, Category, Exercise, Video};
use crate::library::Catalog;

use super::aggregate::AggregateCache;
use super::reconcile::Reconciler;
use super::resolver::{ResolveError, Resolved, Resolver};

/// Title and path of a listed category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub title: String,
    pub path: String,
}

/// A listed category with its availability counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCounts {
    pub title: String,
    pub path: String,
    pub counts: AggregateCounts,
}

/// View data for a resolved path
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Page<'a> {
    Topic {
        topic: &'a Category,
        /// Description with markup removed
        description: String,
        counts: AggregateCounts,
        videos: Vec<&'a Video>,
        exercises: Vec<&'a Exercise>,
        subtopics: Vec<TopicCounts>,
    },
    Video {
        video: &'a Video,
        available: bool,
        previous: Option<&'a Video>,
        next: Option<&'a Video>,
    },
    Exercise {
        exercise: &'a Exercise,
        related_videos: Vec<&'a Video>,
    },
}

/// Resolves paths and assembles their views
#[derive(Debug, Clone)]
pub struct ContentService {
    catalog: Arc<Catalog>,
    cache: Arc<AggregateCache>,
    reconciler: Reconciler,
}

impl ContentService {
    pub fn new(catalog: Arc<Catalog>, cache: Arc<AggregateCache>, reconciler: Reconciler) -> Self {
        Self {
            catalog,
            cache,
            reconciler,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// Resolve `path` and build its page
    #[instrument(skip(self))]
    pub fn open(&self, path: &str) -> Result<Page<'_>, ResolveError> {
        let resolved = Resolver::new(&self.catalog).resolve_path(path)?;

        Ok(match resolved {
            Resolved::Category(topic) => self.topic_page(topic),
            Resolved::Video {
                video,
                previous,
                next,
            } => Page::Video {
                video,
                available: self.reconciler.check(video),
                previous,
                next,
            },
            Resolved::Exercise(exercise) => Page::Exercise {
                exercise,
                related_videos: self.catalog.related_videos(exercise),
            },
        })
    }

    fn topic_page<'a>(&self, topic: &'a Category) -> Page<'a> {
        let counts = self.cache.get_counts(topic);
        let subtopics = topic
            .live_subcategories()
            .map(|sub| TopicCounts {
                title: sub.title.clone(),
                path: sub.path.clone(),
                counts: self.cache.get_counts(sub),
            })
            .collect();

        Page::Topic {
            topic,
            description: strip_tags(topic.description.as_deref().unwrap_or_default()),
            counts,
            videos: topic.videos().collect(),
            exercises: topic.exercises().collect(),
            subtopics,
        }
    }

    /// Non-hidden top-level categories
    pub fn home(&self) -> Vec<TopicSummary> {
        self.catalog
            .root()
            .live_subcategories()
            .map(|topic| TopicSummary {
                title: topic.title.clone(),
                path: topic.path.clone(),
            })
            .collect()
    }

    /// Path of every exercise, keyed by exercise id
    pub fn exercise_paths(&self) -> BTreeMap<String, String> {
        self.catalog
            .exercises()
            .into_iter()
            .map(|exercise| (exercise.id.clone(), exercise.path.clone()))
            .collect()
    }
}

/// Drop anything that looks like an HTML tag
fn strip_tags(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*?>").expect("valid tag regex"));
    tags.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Add <b>two</b> numbers</p>"), "Add two numbers");
        assert_eq!(strip_tags("no markup"), "no markup");
        assert_eq!(strip_tags(""), "");
    }
}

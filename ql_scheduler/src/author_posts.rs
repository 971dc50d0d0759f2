//! ABOUTME: Author/topic executor: picks a weighted approved topic per due author and generates a post
//! ABOUTME: Authors are rescheduled even when they have nothing to write about

use crate::{ActivityLog, BatchReport, ExecutionEvent, PostStore, RunSource};
use chrono::NaiveDateTime;
use ql_ai::ContentGenerator;
use ql_context::{Author, AuthorStore, ContextFactory, Topic, TopicStore};
use ql_core::{Error, Result};
use ql_sched::reschedule_after_fire;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Frequency used when an author's stored one cannot be advanced
const FALLBACK_FREQUENCY: &str = "daily";

/// Sampling weight of a topic; low and negative scores keep a small chance
pub fn topic_weight(topic: &Topic) -> u64 {
    topic.score.max(1) as u64
}

/// Pick a topic with probability proportional to its weight
pub fn pick_weighted<'a, R: Rng + ?Sized>(topics: &'a [Topic], rng: &mut R) -> Option<&'a Topic> {
    let dist = WeightedIndex::new(topics.iter().map(topic_weight)).ok()?;
    topics.get(dist.sample(rng))
}

/// Generates posts for authors whose post generation is due
#[derive(Clone)]
pub struct AuthorPostProcessor {
    authors: Arc<dyn AuthorStore>,
    topics: Arc<dyn TopicStore>,
    posts: Arc<dyn PostStore>,
    activity: Arc<dyn ActivityLog>,
    factory: ContextFactory,
    generator: ContentGenerator,
}

impl AuthorPostProcessor {
    pub fn new(
        authors: Arc<dyn AuthorStore>,
        topics: Arc<dyn TopicStore>,
        posts: Arc<dyn PostStore>,
        activity: Arc<dyn ActivityLog>,
        factory: ContextFactory,
        generator: ContentGenerator,
    ) -> Self {
        Self {
            authors,
            topics,
            posts,
            activity,
            factory,
            generator,
        }
    }

    /// Process every author due at `now`
    pub async fn process_due_authors(&self, now: NaiveDateTime) -> Result<BatchReport> {
        let due = self.authors.due_for_post_generation(now).await?;
        let mut report = BatchReport::default();
        if due.is_empty() {
            debug!("No authors due for post generation");
            return Ok(report);
        }

        info!(count = due.len(), "Processing due authors");
        for author in due {
            match self.process_author(&author, now).await {
                Ok(Some(_)) => report.record(true),
                // Nothing to write about is not a failure
                Ok(None) => {}
                Err(e) => {
                    error!(author_id = %author.id, error = %e, "Author post generation failed");
                    report.record(false);
                }
            }
        }
        Ok(report)
    }

    /// Generate a post for one topic by hand, resolving its author
    pub async fn generate_for_topic(&self, topic_id: &str, now: NaiveDateTime) -> Result<String> {
        let ctx = self.factory.for_topic_id(topic_id).await?;
        self.emit(
            ExecutionEvent::Started {
                source: RunSource::ManualTopic,
                subject_id: topic_id.to_string(),
            },
            now,
        )
        .await;

        let result = async {
            let post = self.generator.generate(&ctx).await?;
            let post_id = self.posts.save_post(&post, now).await?;
            self.topics.mark_used(topic_id).await?;
            Ok::<_, Error>((post_id, post.title))
        }
        .await;

        self.finish(RunSource::ManualTopic, topic_id, result, now).await
    }

    /// Returns the post id, or `None` when the author had no approved topics
    async fn process_author(&self, author: &Author, now: NaiveDateTime) -> Result<Option<String>> {
        self.reschedule(author, now).await?;

        let topics = self.topics.approved_for_author(&author.id).await?;
        let topic = {
            let mut rng = rand::thread_rng();
            pick_weighted(&topics, &mut rng).cloned()
        };
        let Some(topic) = topic else {
            info!(author_id = %author.id, "No approved topics, skipping author");
            return Ok(None);
        };

        debug!(author_id = %author.id, topic_id = %topic.id, score = topic.score, "Picked topic");
        self.emit(
            ExecutionEvent::Started {
                source: RunSource::Author,
                subject_id: author.id.clone(),
            },
            now,
        )
        .await;

        let topic_id = topic.id.clone();
        let result = async {
            let ctx = self.factory.from_records(author.clone(), topic).await?;
            let post = self.generator.generate(&ctx).await?;
            let post_id = self.posts.save_post(&post, now).await?;
            self.topics.mark_used(&topic_id).await?;
            Ok::<_, Error>((post_id, post.title))
        }
        .await;

        self.finish(RunSource::Author, &author.id, result, now)
            .await
            .map(Some)
    }

    /// Move the author's next run forward, keeping its phase
    async fn reschedule(&self, author: &Author, now: NaiveDateTime) -> Result<()> {
        let previous = author.post_generation_next_run;
        let next_run = match reschedule_after_fire(&author.post_generation_frequency, previous, now) {
            Ok(next_run) => next_run,
            Err(e) => {
                warn!(
                    author_id = %author.id,
                    frequency = %author.post_generation_frequency,
                    error = %e,
                    "Unusable author frequency, falling back to daily"
                );
                reschedule_after_fire(FALLBACK_FREQUENCY, previous, now)?
            }
        };

        self.authors
            .update_post_generation_schedule(&author.id, next_run, Some(now))
            .await
    }

    async fn finish(
        &self,
        source: RunSource,
        subject_id: &str,
        result: Result<(String, String)>,
        now: NaiveDateTime,
    ) -> Result<String> {
        match result {
            Ok((post_id, title)) => {
                info!(source = %source, subject_id = %subject_id, post_id = %post_id, "Topic post generated");
                self.emit(
                    ExecutionEvent::Completed {
                        source,
                        subject_id: subject_id.to_string(),
                        post_id: post_id.clone(),
                        title,
                    },
                    now,
                )
                .await;
                Ok(post_id)
            }
            Err(e) => {
                self.emit(
                    ExecutionEvent::Failed {
                        source,
                        subject_id: subject_id.to_string(),
                        error: e.to_string(),
                    },
                    now,
                )
                .await;
                Err(e)
            }
        }
    }

    async fn emit(&self, event: ExecutionEvent, now: NaiveDateTime) {
        if let Err(e) = self.activity.record(&event, now).await {
            warn!(subject_id = %event.subject_id(), error = %e, "Failed to record activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn topics(scores: &[i64]) -> Vec<Topic> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| Topic::new("author", format!("topic {}", i)).with_score(*score))
            .collect()
    }

    #[test]
    fn test_weight_floor() {
        let t = topics(&[-20, 0, 1, 75]);
        let weights: Vec<u64> = t.iter().map(topic_weight).collect();
        assert_eq!(weights, vec![1, 1, 1, 75]);
    }

    #[test]
    fn test_pick_from_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_weighted(&[], &mut rng).is_none());
    }

    #[test]
    fn test_single_topic_always_wins() {
        let t = topics(&[3]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(pick_weighted(&t, &mut rng).unwrap().title, "topic 0");
        }
    }

    #[test]
    fn test_heavier_topics_win_more_often() {
        let t = topics(&[1, 99]);
        let mut rng = StdRng::seed_from_u64(42);
        let heavy = (0..1000)
            .filter(|_| pick_weighted(&t, &mut rng).unwrap().title == "topic 1")
            .count();
        assert!(heavy > 900, "heavy topic picked {} times", heavy);
    }
}

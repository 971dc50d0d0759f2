//! ABOUTME: Repository tests against a fresh SQLite file per test
//! ABOUTME: Includes an end-to-end executor run over the real store implementations

use ql_ai::{ContentGenerator, StubClient};
use ql_context::{
    AuthorStore, ContextFactory, Author, Template, TemplateStore, Topic, TopicStatus, TopicStore,
    Voice, VoiceStore,
};
use ql_db::Db;
use ql_sched::{Schedule, ScheduleStatus};
use ql_scheduler::{
    ActivityLog, AuthorPostProcessor, ExecutionEvent, PostStore, ProcessorConfig, RunSource,
    ScheduleProcessor, ScheduleStore,
};
use std::sync::Arc;
use test_support::{dt, temp_db_path};

async fn open() -> Db {
    let path = temp_db_path();
    Db::new(path.to_str().unwrap()).await.expect("test database opens")
}

#[tokio::test]
async fn template_and_voice_round_trip() {
    let db = open().await;
    let voice = Voice::new("Plain", "Plain title for {{topic}}", "No jargon.");
    db.voices().create(&voice, dt("2025-01-01 00:00:00")).await.unwrap();

    let mut template = Template::new("Explainer", "Explain {{topic}}");
    template.voice_id = Some(voice.id.clone());
    template.post_tags = Some("rust, async".to_string());
    template.featured_image_source = Some(ql_context::FeaturedImageSource::Unsplash);
    db.templates().create(&template, dt("2025-01-01 00:00:00")).await.unwrap();

    let loaded = db.templates().get_template(&template.id).await.unwrap().unwrap();
    assert_eq!(loaded, template);
    assert_eq!(db.voices().get_voice(&voice.id).await.unwrap(), Some(voice));
    assert!(db.templates().get_template("missing").await.unwrap().is_none());
    assert_eq!(db.templates().list(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn due_schedules_are_ordered_and_limited() {
    let db = open().await;
    let repo = db.schedules();
    let created = dt("2025-03-01 00:00:00");

    let late = Schedule::new("t", "daily").with_next_run(dt("2025-03-10 09:00:00"));
    let early = Schedule::new("t", "hourly").with_next_run(dt("2025-03-10 07:00:00"));
    let future = Schedule::new("t", "daily").with_next_run(dt("2025-03-11 09:00:00"));
    let paused = Schedule::new("t", "daily")
        .with_next_run(dt("2025-03-10 06:00:00"))
        .inactive();
    for s in [&late, &early, &future, &paused] {
        repo.create(s, created).await.unwrap();
    }

    let now = dt("2025-03-10 09:00:00");
    let due = repo.due_schedules(now, 10).await.unwrap();
    let ids: Vec<&str> = due.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![early.id.as_str(), late.id.as_str()]);

    let limited = repo.due_schedules(now, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, early.id);
    assert_eq!(limited[0].created_at, Some(created));
}

#[tokio::test]
async fn executor_updates_are_persisted() {
    let db = open().await;
    let repo = db.schedules();
    let schedule = Schedule::new("t", "once").with_next_run(dt("2025-03-10 09:00:00"));
    repo.create(&schedule, dt("2025-03-01 00:00:00")).await.unwrap();

    repo.update_next_run(&schedule.id, dt("2025-03-10 10:00:00")).await.unwrap();
    repo.mark_failed(&schedule.id, dt("2025-03-10 09:00:05")).await.unwrap();

    let stored = repo.get_schedule(&schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.next_run, Some(dt("2025-03-10 10:00:00")));
    assert_eq!(stored.last_run, Some(dt("2025-03-10 09:00:05")));
    assert_eq!(stored.status, ScheduleStatus::Failed);
    assert!(!stored.is_active);

    assert!(repo.update_next_run("missing", dt("2025-03-10 10:00:00")).await.is_err());

    repo.delete_schedule(&schedule.id).await.unwrap();
    assert!(repo.get_schedule(&schedule.id).await.unwrap().is_none());
}

#[tokio::test]
async fn create_starting_catches_up_from_past_start() {
    let db = open().await;
    let schedule = db
        .schedules()
        .create_starting(
            Schedule::new("t", "daily"),
            Some(dt("2025-03-01 08:00:00")),
            dt("2025-03-10 12:00:00"),
        )
        .await
        .unwrap();
    assert_eq!(schedule.next_run, Some(dt("2025-03-11 08:00:00")));

    let stored = db.schedules().find_by_id(&schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.next_run, schedule.next_run);

    let err = db
        .schedules()
        .create_starting(Schedule::new("t", "sometimes"), None, dt("2025-03-10 12:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, ql_core::Error::InvalidFrequency(_)));
}

#[tokio::test]
async fn schedule_views_join_template_fields() {
    let db = open().await;
    let mut template = Template::new("Weekly roundup", "Roundup");
    template.post_category = Some("News".to_string());
    db.templates().create(&template, dt("2025-01-01 00:00:00")).await.unwrap();

    let attached = Schedule::new(template.id.clone(), "weekly").with_next_run(dt("2025-03-03 09:00:00"));
    let orphan = Schedule::new("gone", "daily").with_next_run(dt("2025-03-04 09:00:00"));
    db.schedules().create(&attached, dt("2025-01-01 00:00:00")).await.unwrap();
    db.schedules().create(&orphan, dt("2025-01-01 00:00:00")).await.unwrap();

    let views = db.schedules().list_views().await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].template_name.as_deref(), Some("Weekly roundup"));
    assert_eq!(views[0].category.as_deref(), Some("News"));
    assert_eq!(views[0].author, None);
    assert_eq!(views[1].template_name, None);
}

#[tokio::test]
async fn authors_and_topics() {
    let db = open().await;
    let mut author = Author::new("Ferris", "Rust");
    author.post_generation_next_run = Some(dt("2025-03-10 08:00:00"));
    db.authors().create(&author, dt("2025-01-01 00:00:00")).await.unwrap();

    let mut idle = Author::new("Idle", "Nothing");
    idle.is_active = false;
    idle.post_generation_next_run = Some(dt("2025-03-01 08:00:00"));
    db.authors().create(&idle, dt("2025-01-01 00:00:00")).await.unwrap();

    let due = db.authors().due_for_post_generation(dt("2025-03-10 09:00:00")).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, author.id);

    db.authors()
        .update_post_generation_schedule(&author.id, dt("2025-03-11 08:00:00"), None)
        .await
        .unwrap();
    let stored = db.authors().get_author(&author.id).await.unwrap().unwrap();
    assert_eq!(stored.post_generation_next_run, Some(dt("2025-03-11 08:00:00")));
    assert_eq!(stored.post_generation_last_run, None);

    let topics = db.topics();
    let low = Topic::new(author.id.clone(), "Low").approved().with_score(10);
    let high = Topic::new(author.id.clone(), "High").approved().with_score(90);
    let pending = Topic::new(author.id.clone(), "Pending");
    for t in [&low, &high, &pending] {
        topics.create(t, dt("2025-01-01 00:00:00")).await.unwrap();
    }

    let approved = topics.approved_for_author(&author.id).await.unwrap();
    let titles: Vec<&str> = approved.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["High", "Low"]);

    topics.mark_used(&high.id).await.unwrap();
    let used = topics.get_topic(&high.id).await.unwrap().unwrap();
    assert_eq!(used.status, TopicStatus::Used);
    assert_eq!(topics.approved_for_author(&author.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn activity_is_recorded_with_details() {
    let db = open().await;
    let event = ExecutionEvent::Completed {
        source: RunSource::Schedule,
        subject_id: "s1".to_string(),
        post_id: "p1".to_string(),
        title: "Hello".to_string(),
    };
    db.activity().record(&event, dt("2025-03-10 09:00:00")).await.unwrap();

    let entries = db.activity().recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event, event);
    assert_eq!(entries[0].event_status, "completed");
    assert_eq!(entries[0].source, "schedule");
    assert_eq!(entries[0].message, "schedule s1 published \"Hello\"");
}

fn factory(db: &Db) -> ContextFactory {
    ContextFactory::new(
        Arc::new(db.templates()),
        Arc::new(db.voices()),
        Arc::new(db.authors()),
        Arc::new(db.topics()),
    )
}

#[tokio::test]
async fn schedule_executor_end_to_end() {
    let db = open().await;
    let mut template = Template::new("Daily tip", "A short tip about {{topic}}");
    template.post_tags = Some("tips".to_string());
    template.generate_featured_image = true;
    db.templates().create(&template, dt("2025-01-01 00:00:00")).await.unwrap();

    let recurring = Schedule::new(template.id.clone(), "daily")
        .with_next_run(dt("2025-03-10 08:00:00"))
        .with_topic("iterators");
    let once = Schedule::new(template.id.clone(), "once").with_next_run(dt("2025-03-10 08:30:00"));
    db.schedules().create(&recurring, dt("2025-01-01 00:00:00")).await.unwrap();
    db.schedules().create(&once, dt("2025-01-01 00:00:00")).await.unwrap();

    let processor = ScheduleProcessor::new(
        Arc::new(db.schedules()),
        Arc::new(db.posts()),
        Arc::new(db.activity()),
        factory(&db),
        ContentGenerator::new(Arc::new(StubClient::new())),
        ProcessorConfig::default(),
    );

    let now = dt("2025-03-10 09:00:00");
    let report = processor.process_due_schedules(now).await.unwrap();
    assert_eq!((report.processed, report.succeeded, report.failed), (2, 2, 0));

    let stored = db.schedules().find_by_id(&recurring.id).await.unwrap().unwrap();
    assert_eq!(stored.next_run, Some(dt("2025-03-11 08:00:00")));
    assert_eq!(stored.last_run, Some(now));
    assert!(db.schedules().find_by_id(&once.id).await.unwrap().is_none());

    let posts = db.posts().list_recent(10).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.tags == vec!["tips".to_string()]));
    assert!(posts.iter().all(|p| p.featured_image.is_some()));
    assert!(posts.iter().all(|p| p.context.id == template.id));

    assert_eq!(db.activity().recent(10).await.unwrap().len(), 4);
    assert!(processor.process_due_schedules(now).await.unwrap().processed == 0);
}

#[tokio::test]
async fn author_executor_end_to_end() {
    let db = open().await;
    let mut author = Author::new("Ferris", "Embedded Rust");
    author.post_generation_frequency = "every_monday".to_string();
    author.post_generation_next_run = Some(dt("2025-03-10 08:00:00"));
    db.authors().create(&author, dt("2025-01-01 00:00:00")).await.unwrap();
    let topic = Topic::new(author.id.clone(), "Embassy executors").approved();
    db.topics().create(&topic, dt("2025-01-01 00:00:00")).await.unwrap();

    let processor = AuthorPostProcessor::new(
        Arc::new(db.authors()),
        Arc::new(db.topics()),
        Arc::new(db.posts()),
        Arc::new(db.activity()),
        factory(&db),
        ContentGenerator::new(Arc::new(StubClient::new())),
    );

    // 2025-03-10 is a Monday
    let now = dt("2025-03-10 08:05:00");
    let report = processor.process_due_authors(now).await.unwrap();
    assert_eq!(report.succeeded, 1);

    let stored = db.authors().find_by_id(&author.id).await.unwrap().unwrap();
    assert_eq!(stored.post_generation_next_run, Some(dt("2025-03-17 08:00:00")));
    assert_eq!(stored.post_generation_last_run, Some(now));

    let used = db.topics().find_by_id(&topic.id).await.unwrap().unwrap();
    assert_eq!(used.status, TopicStatus::Used);

    let posts = db.posts().list_recent(1).await.unwrap();
    assert_eq!(posts[0].title, "Embassy executors");
    assert_eq!(posts[0].context.id, topic.id);
}

#[tokio::test]
async fn post_store_returns_new_ids() {
    let db = open().await;
    let ctx = ql_context::TemplateContext::new(Template::new("T", "Body"), "admin");
    let post = ContentGenerator::new(Arc::new(StubClient::new()))
        .generate(&ctx)
        .await
        .unwrap();

    let a = db.posts().save_post(&post, dt("2025-03-10 09:00:00")).await.unwrap();
    let b = db.posts().save_post(&post, dt("2025-03-10 09:00:00")).await.unwrap();
    assert_ne!(a, b);

    let stored = db.posts().find_by_id(&a).await.unwrap().unwrap();
    assert_eq!(stored.title, post.title);
    assert_eq!(stored.context, post.context);
}

//! Round-trip and idempotence laws (§8) that hold across arbitrary inputs,
//! not just the hand-picked examples in the colocated unit tests.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use beans_core::{sanitize_slug, BeanId, BeanType, Priority, Status};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn arb_title() -> impl Strategy<Value = String> {
    "[ -~]{1,80}".prop_filter("front matter requires a non-empty title", |s| !s.trim().is_empty())
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Backlog),
        Just(Status::Todo),
        Just(Status::InProgress),
        Just(Status::Completed),
        Just(Status::Scrapped),
        Just(Status::Draft),
    ]
}

fn arb_type() -> impl Strategy<Value = BeanType> {
    prop_oneof![
        Just(BeanType::Milestone),
        Just(BeanType::Epic),
        Just(BeanType::Feature),
        Just(BeanType::Task),
        Just(BeanType::Bug),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Critical),
        Just(Priority::High),
        Just(Priority::Normal),
        Just(Priority::Low),
        Just(Priority::Deferred),
    ]
}

fn arb_tags() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_-]{0,12}", 0..5)
}

fn make_bean(
    title: String,
    status: Status,
    bean_type: BeanType,
    priority: Priority,
    tags: BTreeSet<String>,
) -> beans_core::Bean {
    beans_core::Bean {
        id: BeanId::parse("beans-a1b2").unwrap(),
        slug: String::new(),
        path: std::path::PathBuf::from("beans-a1b2.md"),
        title,
        status,
        bean_type,
        priority,
        tags,
        created_at: now(),
        updated_at: now(),
        parent: None,
        blocking: Vec::new(),
        duplicates: Vec::new(),
        related: Vec::new(),
        git: beans_core::GitMetadata::default(),
        body: "body\n".to_string(),
        extra: Default::default(),
    }
}

proptest! {
    /// `parse(render(b)) == b` modulo defaults not encoded by the codec
    /// (id/slug/path come from the filename, not the front matter).
    #[test]
    fn render_then_parse_recovers_every_field(
        title in arb_title(),
        status in arb_status(),
        bean_type in arb_type(),
        priority in arb_priority(),
        tags in arb_tags(),
    ) {
        let bean = make_bean(title, status, bean_type, priority, tags);
        let rendered = beans_core::codec::render(&bean);
        let parsed = beans_core::codec::parse(&rendered, now()).unwrap();

        prop_assert_eq!(parsed.title, bean.title);
        prop_assert_eq!(parsed.status, bean.status);
        prop_assert_eq!(parsed.bean_type, bean.bean_type);
        prop_assert_eq!(parsed.priority, bean.priority);
        prop_assert_eq!(parsed.tags, bean.tags);
        prop_assert_eq!(parsed.body, bean.body);
    }

    /// Slug sanitization never exceeds 50 chars, never ends in `-`, and is
    /// restricted to `[a-z0-9-]`.
    #[test]
    fn sanitize_slug_is_always_well_formed(input in ".{0,200}") {
        let slug = sanitize_slug(&input);
        prop_assert!(slug.len() <= 50);
        prop_assert!(!slug.ends_with('-'));
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    /// Sanitization is idempotent: sanitizing an already-sanitized slug is a
    /// no-op.
    #[test]
    fn sanitize_slug_is_idempotent(input in ".{0,200}") {
        let once = sanitize_slug(&input);
        let twice = sanitize_slug(&once);
        prop_assert_eq!(once, twice);
    }
}

//! Resolver Integration Tests
//!
//! Tests for sentinel-driven path resolution over a loaded catalog.

use topicpath::core::{ResolveError, Resolved, Resolver};
use topicpath::domain::NodeKind;
use topicpath::library::Catalog;

const TOPICS: &str = r#"{
    "kind": "Topic", "id": "root", "title": "Khan Academy",
    "children": [
        {"kind": "Topic", "id": "math", "title": "Math", "children": [
            {"kind": "Topic", "id": "arithmetic", "title": "Arithmetic", "children": [
                {"kind": "Video", "id": "add-sub", "title": "Addition and subtraction"},
                {"kind": "Exercise", "id": "addition_1", "title": "Addition 1",
                 "related_video_ids": ["add-sub"]},
                {"kind": "Video", "id": "mul-div", "title": "Multiplication and division"}
            ]},
            {"kind": "Topic", "id": "algebra", "title": "Algebra", "children": [
                {"kind": "Exercise", "id": "algebra-basics", "title": "Algebra basics",
                 "related_video_ids": ["add-sub", "intro-alg"]}
            ]},
            {"kind": "Video", "id": "abc123", "slug": "arithmetic", "title": "Why arithmetic"}
        ]},
        {"kind": "Topic", "id": "science", "title": "Science", "hide": true, "children": []}
    ]
}"#;

fn catalog() -> Catalog {
    Catalog::from_json_str(TOPICS).unwrap()
}

#[test]
fn test_resolve_video_with_siblings() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    let resolved = resolver.resolve(&["math", "arithmetic", "v", "add-sub"]).unwrap();
    match resolved {
        Resolved::Video {
            video,
            previous,
            next,
        } => {
            assert_eq!(video.id, "add-sub");
            assert!(previous.is_none());
            // The exercise between the two videos is not a sibling
            assert_eq!(next.map(|v| v.id.as_str()), Some("mul-div"));
        }
        other => panic!("Expected video, got {:?}", other.kind()),
    }

    let resolved = resolver.resolve(&["math", "arithmetic", "v", "mul-div"]).unwrap();
    match resolved {
        Resolved::Video { previous, next, .. } => {
            assert_eq!(previous.map(|v| v.id.as_str()), Some("add-sub"));
            assert!(next.is_none());
        }
        other => panic!("Expected video, got {:?}", other.kind()),
    }
}

#[test]
fn test_unknown_slug_is_not_found() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    let result = resolver.resolve(&["math", "arithmetic", "v", "subtract"]);
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));

    let result = resolver.resolve(&["history"]);
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));
}

#[test]
fn test_resolve_category_and_exercise() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    match resolver.resolve(&["math", "arithmetic"]).unwrap() {
        Resolved::Category(category) => assert_eq!(category.path, "/math/arithmetic/"),
        other => panic!("Expected category, got {:?}", other.kind()),
    }

    match resolver.resolve(&["math", "arithmetic", "e", "addition_1"]).unwrap() {
        Resolved::Exercise(exercise) => assert_eq!(exercise.title, "Addition 1"),
        other => panic!("Expected exercise, got {:?}", other.kind()),
    }
}

#[test]
fn test_category_and_video_share_slug() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    let category = resolver.resolve_path("/math/arithmetic/").unwrap();
    assert_eq!(category.kind(), NodeKind::Category);

    let video = resolver.resolve_path("/math/v/arithmetic/").unwrap();
    assert_eq!(video.kind(), NodeKind::Video);
    assert_eq!(video.path(), "/math/v/arithmetic/");
}

#[test]
fn test_trailing_sentinel_is_not_found() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    assert!(resolver.resolve(&["math", "arithmetic", "v"]).is_err());
    assert!(resolver.resolve(&["math", "e"]).is_err());
}

#[test]
fn test_leaf_cannot_be_descended() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    let result = resolver.resolve_path("math/arithmetic/v/add-sub/extra");
    assert!(result.is_err());

    // Exercises are not reachable in video mode
    let result = resolver.resolve_path("math/arithmetic/v/addition_1");
    assert!(result.is_err());
}

#[test]
fn test_hidden_topic_still_resolves() {
    let catalog = catalog();
    let resolved = Resolver::new(&catalog).resolve_path("science").unwrap();

    match resolved {
        Resolved::Category(category) => assert!(category.hide),
        other => panic!("Expected category, got {:?}", other.kind()),
    }
}

#[test]
fn test_paths_resolve_to_themselves() {
    let catalog = catalog();
    let resolver = Resolver::new(&catalog);

    for exercise in catalog.exercises() {
        let resolved = resolver.resolve_path(&exercise.path).unwrap();
        assert_eq!(resolved.path(), exercise.path);
    }

    for id in ["add-sub", "mul-div", "abc123"] {
        let video = catalog.video(id).unwrap();
        assert_eq!(resolver.resolve_path(&video.path).unwrap().path(), video.path);
    }
}

#[test]
fn test_related_videos_skip_unknown_ids() {
    let catalog = catalog();
    let exercise = catalog.exercise("algebra-basics").unwrap();

    let related = catalog.related_videos(exercise);
    let ids: Vec<_> = related.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["add-sub"]);
}

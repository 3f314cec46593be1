use std::collections::HashSet;

use bug_similarity_core::lda::LdaParams;
use bug_similarity_core::similarity::{LsiParams, WmdParams};
use bug_similarity_core::word2vec::Word2VecParams;
use bug_similarity_core::{BugRecord, SimilarityError, SimilarityStrategy, Strategy, StrategyConfig, StrategyKind};
use tempfile::TempDir;

fn corpus() -> Vec<BugRecord> {
    vec![
        BugRecord::new(1, "browser crash on startup", "browser crashes at startup after update"),
        BugRecord::new(2, "crash at launch", "browser crash on launch after update"),
        BugRecord::new(3, "startup crash", "crash at startup every launch"),
        BugRecord::new(4, "video playback stutters", "video playback is choppy in fullscreen"),
        BugRecord::new(5, "choppy video", "fullscreen video playback stutters"),
        BugRecord::new(6, "video stutter fullscreen", "playback choppy video"),
        BugRecord::new(7, "dark theme request", "please add dark theme color"),
        BugRecord::new(8, "theme color request", "dark color theme please"),
        BugRecord::new(9, "add dark mode", "request dark theme mode"),
        BugRecord::new(10, "bookmark sync fails", "sync error after login"),
        BugRecord::new(11, "sync login broken", "bookmark sync stops after login"),
    ]
}

fn config() -> StrategyConfig {
    StrategyConfig {
        lsi: LsiParams { num_topics: 5 },
        lda: LdaParams {
            num_topics: 4,
            passes: 20,
            ..Default::default()
        },
        word2vec: Word2VecParams {
            dims: 24,
            window: 3,
            min_count: 1,
            sample: 0.0,
            epochs: 40,
            ..Default::default()
        },
        wmd: WmdParams { cut_off: 10.0 },
        ..Default::default()
    }
}

fn build(kind: StrategyKind, bugs: &[BugRecord]) -> Strategy {
    Strategy::build(kind, bugs, &config()).unwrap()
}

#[test]
fn test_results_exclude_query_and_are_distinct() {
    let bugs = corpus();
    for kind in StrategyKind::ALL {
        let strategy = build(kind, &bugs);
        assert_eq!(strategy.kind(), kind);
        for bug in &bugs {
            for k in [1, 3, 10] {
                let result = strategy.get_similar_bugs(bug, k).unwrap();
                assert!(result.len() <= k, "{}: {} results for k={}", kind, result.len(), k);
                assert!(!result.contains(&bug.id), "{}: bug {} found itself", kind, bug.id);
                let distinct: HashSet<_> = result.iter().collect();
                assert_eq!(distinct.len(), result.len(), "{}: duplicate ids", kind);
            }
        }
    }
}

#[test]
fn test_crash_bug_ranks_crash_bug_above_feature_request() {
    let bugs = vec![
        BugRecord::new(1, "crash on startup", ""),
        BugRecord::new(2, "application crashes at launch", ""),
        BugRecord::new(3, "feature request for dark mode", ""),
    ];
    let kinds = [
        StrategyKind::Lsi,
        StrategyKind::NeighborsTfidf,
        StrategyKind::NeighborsTfidfBigrams,
        StrategyKind::Bm25,
        StrategyKind::Word2VecWmd,
        StrategyKind::Word2VecSoftCos,
    ];
    for kind in kinds {
        let strategy = build(kind, &bugs);
        let result = strategy.get_similar_bugs(&bugs[0], 10).unwrap();
        let b = result.iter().position(|&id| id == 2);
        let c = result.iter().position(|&id| id == 3);
        assert!(b.is_some(), "{}: B missing from {:?}", kind, result);
        if let (Some(b), Some(c)) = (b, c) {
            assert!(b < c, "{}: {:?}", kind, result);
        }
    }
}

#[test]
fn test_query_without_known_tokens() {
    let bugs = corpus();
    let unknown = BugRecord::new(500, "qwertyuiop zxcvbnm", "");
    for kind in StrategyKind::ALL {
        let strategy = build(kind, &bugs);
        assert!(strategy.get_similar_bugs(&unknown, 10).unwrap().is_empty(), "{}", kind);
        match strategy.get_distance(&unknown, &bugs[0]) {
            Ok(d) => assert_eq!(d, f64::INFINITY, "{}", kind),
            Err(SimilarityError::NotSupported { .. }) => assert!(!kind.supports_distance()),
            Err(e) => panic!("{}: {}", kind, e),
        }
    }
}

#[test]
fn test_distance_support_matches_registry() {
    let bugs = corpus();
    for kind in StrategyKind::ALL {
        let strategy = build(kind, &bugs);
        let d = strategy.get_distance(&bugs[0], &bugs[1]);
        if kind.supports_distance() {
            let d = d.unwrap();
            assert!(d >= 0.0 && d.is_finite(), "{}: {}", kind, d);
        } else {
            assert!(matches!(d, Err(SimilarityError::NotSupported { .. })), "{}", kind);
        }
    }
}

#[test]
fn test_hellinger_distance_symmetric() {
    let bugs = corpus();
    let lda = build(StrategyKind::Lda, &bugs);
    for a in &bugs {
        assert!(lda.get_distance(a, a).unwrap().abs() < 1e-12);
        for b in &bugs {
            let ab = lda.get_distance(a, b).unwrap();
            let ba = lda.get_distance(b, a).unwrap();
            assert!((ab - ba).abs() < 1e-12);
        }
    }
}

#[test]
fn test_save_load_roundtrip() {
    let bugs = corpus();
    let dir = TempDir::new().unwrap();
    for kind in StrategyKind::ALL {
        let strategy = build(kind, &bugs);
        let path = strategy.save(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), kind.artifact_file_name());

        let loaded = Strategy::load(&path).unwrap();
        assert_eq!(loaded.kind(), kind);
        for bug in &bugs {
            assert_eq!(
                loaded.get_similar_bugs(bug, 10).unwrap(),
                strategy.get_similar_bugs(bug, 10).unwrap(),
                "{}",
                kind
            );
        }
    }
}

#[test]
fn test_load_rejects_tampered_artifact() {
    let bugs = corpus();
    let dir = TempDir::new().unwrap();
    let path = build(StrategyKind::Bm25, &bugs).save(dir.path()).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = b' ';
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(Strategy::load(&path), Err(SimilarityError::Artifact(_))));
    assert!(matches!(
        Strategy::load(&dir.path().join("missing.similaritymodel")),
        Err(SimilarityError::Artifact(_))
    ));
}

#[test]
fn test_build_errors() {
    assert!(matches!(
        Strategy::build(StrategyKind::Bm25, &[], &StrategyConfig::default()),
        Err(SimilarityError::EmptyCorpus)
    ));
    // default min_count of 5 leaves nothing to train on
    let bugs = vec![BugRecord::new(1, "crash", ""), BugRecord::new(2, "hang", "")];
    assert!(matches!(
        Strategy::build(StrategyKind::Word2VecWmd, &bugs, &StrategyConfig::default()),
        Err(SimilarityError::InsufficientVocabulary(_))
    ));
}

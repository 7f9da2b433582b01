//! End-to-end library tests: synthesize, train, persist, reload, predict

use hdva::classifier::{
    synthesize, train, ForestConfig, ModelBundle, NumericNameScope, TrainConfig,
    VectorizerConfig,
};
use hdva::features::{self, StructuralExtractor};
use hdva::scan::{scan_repository, Severity};
use hdva::{Detector, HdvaError, Label, ModelCache, Source};
use std::sync::Arc;

fn quick_config() -> TrainConfig {
    TrainConfig {
        forest: ForestConfig {
            n_trees: 25,
            max_depth: 10,
            max_features: None,
            seed: 42,
        },
        ..TrainConfig::default()
    }
}

fn probe_snippets() -> Vec<&'static str> {
    vec![
        "def add(a, b):\n    return a + b\n",
        "def transform_data(df):\n    return df.whenify().transmute()\n",
        "import numpy as np\nresult = np.hyperarray([1, 2]).quantum_sum()\n",
        "class Point:\n    def __init__(self, x, y):\n        self.x = x\n        self.y = y\n",
        "def foo(:\n",
        "",
    ]
}

#[test]
fn test_structural_scenarios() {
    let extractor = StructuralExtractor::new();

    let parsed = extractor.extract("def add(a, b):\n    return a + b\n").record();
    assert!(parsed.parsable);
    assert_eq!(parsed.function_count, 1);
    assert_eq!(parsed.class_count, 0);
    assert_eq!(parsed.import_count, 0);
    assert_eq!(parsed.return_count, 1);

    let broken = extractor.extract("def foo(:\n").record();
    assert!(!broken.parsable);
    assert_eq!(broken.function_count, 0);
    assert_eq!(broken.max_depth, 0);
}

#[test]
fn test_comment_ratio_scenario() {
    let snippet = "# header\nimport os\n\ndef main():\n    # explain\n    x = 1\n    y = 2\n    return x + y\n\nmain()\n";
    let surface = features::surface::extract(snippet);
    assert_eq!(surface.line_count, 10);
    assert_eq!(surface.comment_line_count, 2);
    assert!((surface.comment_ratio - 0.2).abs() < 1e-12);
}

#[test]
fn test_synthesis_is_reproducible() {
    assert_eq!(synthesize(50, 50, 42), synthesize(50, 50, 42));
}

#[test]
fn test_training_is_reproducible() {
    let data = synthesize(40, 40, 42);
    let a = train(&data, &quick_config()).unwrap();
    let b = train(&data, &quick_config()).unwrap();
    assert_eq!(a.bundle.vectorizer, b.bundle.vectorizer);
    assert_eq!(a.bundle.classifier, b.bundle.classifier);
    assert_eq!(a.report, b.report);
}

#[test]
fn test_reloaded_bundle_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hdva_model.json");

    let outcome = train(&synthesize(60, 60, 42), &quick_config()).unwrap();
    outcome.bundle.save(&path).unwrap();
    let fresh = Detector::from_bundle(outcome.bundle);
    let reloaded = Detector::load(&path).unwrap();

    let probes = probe_snippets();
    let before = fresh.predict_proba(&probes).unwrap();
    let after = reloaded.predict_proba(&probes).unwrap();
    let bits = |v: &[f64]| v.iter().map(|p| p.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&before), bits(&after));
    assert_eq!(fresh.predict(&probes).unwrap(), reloaded.predict(&probes).unwrap());

    let x_before = fresh.vectorizer().transform(&probes).unwrap();
    let x_after = reloaded.vectorizer().transform(&probes).unwrap();
    assert_eq!(x_before, x_after);
}

#[test]
fn test_feature_width_is_constant() {
    let outcome = train(&synthesize(30, 30, 7), &quick_config()).unwrap();
    let detector = Detector::from_bundle(outcome.bundle);
    let width = detector.feature_count();
    for snippet in probe_snippets() {
        let row = detector.vectorizer().transform_one(snippet).unwrap();
        assert_eq!(row.len(), width, "{snippet:?}");
    }
}

#[test]
fn test_prefix_scope_still_trains() {
    let config = TrainConfig {
        vectorizer: VectorizerConfig {
            max_vocabulary: 800,
            numeric_scope: NumericNameScope::Prefix(10),
        },
        ..quick_config()
    };
    let outcome = train(&synthesize(30, 30, 3), &config).unwrap();
    assert!(outcome.bundle.vectorizer.numeric_feature_names.len() <= 17);
    assert!(outcome.bundle.validate().is_ok());
}

#[test]
fn test_corrupt_bundle_is_model_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, "not json at all").unwrap();
    assert!(matches!(Detector::load(&path), Err(HdvaError::ModelLoad { .. })));
    assert!(matches!(ModelBundle::load(&path), Err(HdvaError::ModelLoad { .. })));
}

#[test]
fn test_cache_shares_detector_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    train(&synthesize(20, 20, 1), &quick_config())
        .unwrap()
        .bundle
        .save(&path)
        .unwrap();

    let cache = Arc::new(ModelCache::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let path = path.clone();
            std::thread::spawn(move || {
                let detector = cache.get_or_load(&path).unwrap();
                detector
                    .analyze(Source::Text("def compute(x):\n    return vectorized_thingy(x)\n"))
                    .unwrap()
                    .probability
            })
        })
        .collect();
    let probabilities: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(probabilities.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_repository_scan() {
    let outcome = train(&synthesize(60, 60, 42), &quick_config()).unwrap();
    let detector = Detector::from_bundle(outcome.bundle);

    let repo = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(repo.path().join("pkg")).unwrap();
    std::fs::write(
        repo.path().join("pkg/fake.py"),
        "def transform_data(df):\n    return df.whenify().transmute()\n",
    )
    .unwrap();
    std::fs::write(
        repo.path().join("area.py"),
        "import math\n\ndef circle_area(r: float) -> float:\n    return math.pi * r * r\n",
    )
    .unwrap();
    std::fs::write(repo.path().join("notes.txt"), "not python").unwrap();

    let report = scan_repository(&detector, repo.path());
    assert_eq!(report.agent, "HDVA");
    assert_eq!(report.summary.files_scanned, 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.issues.len(), 1);

    let issue = &report.issues[0];
    assert_eq!(issue.file, "pkg/fake.py");
    assert!(issue.probability >= 0.5);
    let expected = if issue.probability >= 0.8 {
        Severity::High
    } else {
        Severity::Medium
    };
    assert_eq!(issue.severity, expected);

    let analysis = detector
        .analyze(Source::Path(&repo.path().join("area.py")))
        .unwrap();
    assert_eq!(analysis.label, Label::Real);
}

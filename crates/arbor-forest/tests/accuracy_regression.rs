//! Accuracy and growth regression tests for arbor-forest.
//!
//! These tests verify that algorithmic changes do not degrade classification
//! accuracy and that warm-start growth stays equivalent to a single fit.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_forest::{
    ConfusionMatrix, CsrMatrix, FeatureMatrix, MaxFeatures, RandomForestConfig, RfError,
    SplitCriterion, Targets,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic classification dataset
// ---------------------------------------------------------------------------

/// Generate a `n_samples`-row, 10-feature, 3-class classification dataset.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
/// Samples are assigned round-robin across classes.
fn make_classification(n_samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<i64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_features = 10;
    let n_classes = 3;

    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class as i64);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        features.push(row);
    }
    (features, labels)
}

fn holdout_accuracy(config: RandomForestConfig) -> f64 {
    let (train_x, train_y) = make_classification(300, 42);
    let (test_x, test_y) = make_classification(150, 7);
    let mut forest = config.build();
    forest
        .fit(&FeatureMatrix::Dense(train_x), &Targets::Single(train_y), None)
        .unwrap();
    let predicted = forest.predict(&FeatureMatrix::Dense(test_x)).unwrap();
    let cm = ConfusionMatrix::from_labels(&test_y, predicted.as_single().unwrap(), &[0, 1, 2])
        .unwrap();
    cm.accuracy()
}

// ---------------------------------------------------------------------------
// Accuracy
// ---------------------------------------------------------------------------

/// Held-out accuracy with 100 Gini trees must exceed 0.85.
#[test]
fn holdout_accuracy_above_threshold() {
    let accuracy = holdout_accuracy(RandomForestConfig::new(100).with_seed(42));
    assert!(accuracy > 0.85, "holdout accuracy {accuracy} <= 0.85");
}

/// Entropy with a leaf cap and bootstrap off must stay above 0.85.
#[test]
fn constrained_entropy_accuracy_above_threshold() {
    let config = RandomForestConfig::new(50)
        .with_criterion(SplitCriterion::Entropy)
        .with_max_leaf_nodes(Some(8))
        .with_min_samples_leaf(3)
        .with_bootstrap(false)
        .with_max_features(MaxFeatures::Fraction(0.5));
    let accuracy = holdout_accuracy(config);
    assert!(accuracy > 0.85, "constrained accuracy {accuracy} <= 0.85");
}

/// Informative features 0-2 must dominate the importances.
#[test]
fn informative_features_rank_first() {
    let (x, y) = make_classification(300, 42);
    let mut forest = RandomForestConfig::new(50).build();
    forest
        .fit(&FeatureMatrix::Dense(x), &Targets::Single(y), None)
        .unwrap();
    let importances = forest.feature_importances();
    let informative: f64 = importances[..3].iter().sum();
    assert!(informative > 0.8, "informative share {informative} <= 0.8");
}

// ---------------------------------------------------------------------------
// Warm start
// ---------------------------------------------------------------------------

/// Growing 1 tree at a time yields exactly the trees of a single 12-tree fit.
#[test]
fn incremental_growth_matches_batch_fit() {
    let (x, y) = make_classification(120, 3);
    let x = FeatureMatrix::Dense(x);
    let y = Targets::Single(y);

    let mut batch = RandomForestConfig::new(12).with_seed(9).build();
    batch.fit(&x, &y, None).unwrap();

    let mut grown = RandomForestConfig::new(0)
        .with_seed(9)
        .with_warm_start(true)
        .build();
    for target in [1, 2, 5, 12] {
        grown.set_n_estimators(target);
        grown.fit(&x, &y, None).unwrap();
        assert_eq!(grown.n_trained(), target);
    }

    assert_eq!(grown.estimators(), batch.estimators());
    assert_eq!(grown.predict_proba(&x).unwrap(), batch.predict_proba(&x).unwrap());
}

#[test]
fn warm_start_rejects_changed_feature_count() {
    let (x, y) = make_classification(60, 3);
    let mut forest = RandomForestConfig::new(2).with_warm_start(true).build();
    forest
        .fit(&FeatureMatrix::Dense(x.clone()), &Targets::Single(y.clone()), None)
        .unwrap();
    let narrow: Vec<Vec<f64>> = x.iter().map(|row| row[..5].to_vec()).collect();
    forest.set_n_estimators(4);
    let err = forest
        .fit(&FeatureMatrix::Dense(narrow), &Targets::Single(y), None)
        .unwrap_err();
    assert!(matches!(err, RfError::TrainingDataChanged { .. }));
    assert_eq!(forest.n_trained(), 2);
}

// ---------------------------------------------------------------------------
// Weights and input layouts
// ---------------------------------------------------------------------------

/// Zero-weight rows must not influence the forest at all.
#[test]
fn zero_weight_rows_are_ignored() {
    let (x, y) = make_classification(90, 5);
    let mut noisy_x = x.clone();
    let mut noisy_y = y.clone();
    let mut weights = vec![1.0; x.len()];
    for i in 0..30 {
        noisy_x.push(vec![100.0 + i as f64; 10]);
        noisy_y.push(2);
        weights.push(0.0);
    }

    let config = RandomForestConfig::new(8).with_bootstrap(false).with_seed(1);
    let mut clean = config.clone().build();
    clean
        .fit(&FeatureMatrix::Dense(x.clone()), &Targets::Single(y), None)
        .unwrap();
    let mut weighted = config.build();
    weighted
        .fit(
            &FeatureMatrix::Dense(noisy_x),
            &Targets::Single(noisy_y),
            Some(&weights),
        )
        .unwrap();

    let rows = FeatureMatrix::Dense(x);
    assert_eq!(
        clean.predict_proba(&rows).unwrap(),
        weighted.predict_proba(&rows).unwrap()
    );
}

#[test]
fn sparse_training_matches_dense() {
    let (x, y) = make_classification(90, 11);
    let sparse = FeatureMatrix::Sparse(CsrMatrix::from_dense(&x));
    let dense = FeatureMatrix::Dense(x);
    let y = Targets::Single(y);

    let mut a = RandomForestConfig::new(5).build();
    let mut b = RandomForestConfig::new(5).build();
    a.fit(&dense, &y, None).unwrap();
    b.fit(&sparse, &y, None).unwrap();
    assert_eq!(a.estimators(), b.estimators());
    assert_eq!(a.predict(&sparse).unwrap(), b.predict(&dense).unwrap());
}

/// Multi-output targets: a second output that copies the class must be
/// predicted as accurately as the first.
#[test]
fn multi_output_predicts_each_output() {
    let (x, y) = make_classification(150, 13);
    let rows: Vec<Vec<i64>> = y.iter().map(|&c| vec![c, 10 * c]).collect();
    let x = FeatureMatrix::Dense(x);
    let mut forest = RandomForestConfig::new(20).build();
    forest.fit(&x, &Targets::Multi(rows.clone()), None).unwrap();

    assert_eq!(forest.n_outputs(), 2);
    assert_eq!(forest.classes()[1], vec![0, 10, 20]);
    let Targets::Multi(predicted) = forest.predict(&x).unwrap() else {
        panic!("expected multi-output predictions");
    };
    let correct = predicted.iter().zip(&rows).filter(|(p, t)| p == t).count();
    assert!(correct as f64 / rows.len() as f64 > 0.95);
}

use std::fmt;

/// Declares a `usize` newtype used to address columns or arena slots.
macro_rules! index_newtype {
    ($(#[$doc:meta])* $name:ident, $what:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(usize);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            #[doc = concat!("Return the zero-based ", $what, ".")]
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

index_newtype!(
    /// Column of the feature matrix a split tests.
    FeatureIndex,
    "feature column"
);

index_newtype!(
    /// Slot of a node inside a tree's node arena.
    NodeIndex,
    "arena slot"
);

/// Node impurity; the mean over outputs when a tree predicts several labels.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// One slot of a [`DecisionTree`](crate::DecisionTree) arena. Slot 0 is the root.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        feature: FeatureIndex,
        /// Rows with `x[feature] <= threshold` descend left.
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: Impurity,
        /// Rows with nonzero bootstrap weight that reached the node.
        n_samples: usize,
        weighted_n_samples: f64,
        /// `weighted_n_samples * impurity` minus the children's weighted impurities.
        impurity_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Encoded class with the largest weight, per output.
        prediction: Vec<usize>,
        /// Normalized class weights per output.
        distribution: Vec<Vec<f64>>,
        impurity: Impurity,
        n_samples: usize,
        weighted_n_samples: f64,
    },
}

impl Node {
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Bootstrap-weighted row count at this node.
    #[must_use]
    pub fn weighted_n_samples(&self) -> f64 {
        match self {
            Node::Split { weighted_n_samples, .. } | Node::Leaf { weighted_n_samples, .. } => {
                *weighted_n_samples
            }
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Left and right child slots of a split node.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match self {
            Node::Split { left, right, .. } => Some((*left, *right)),
            Node::Leaf { .. } => None,
        }
    }
}

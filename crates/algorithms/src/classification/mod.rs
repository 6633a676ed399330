//! Unsupervised classification of label objects
//!
//! - **K-means**: clusters objects on a set of their attributes and
//!   stores the cluster in each object's class label

mod kmeans;

pub use kmeans::{kmeans_attributes, KmeansParams};

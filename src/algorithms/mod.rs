pub mod kernel_shap;
pub mod tree_ensemble;

pub use kernel_shap::{Explanation, KernelExplainer, KernelShapConfig, KernelShapSamples};
pub use tree_ensemble::{GradientBoostedClassifier, Node, Tree};

// src/algorithms/kernel_shap.rs

use crate::core::{AdrError, Dataset, Instance, Result};
use crate::traits::PredictModel;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashSet;

/// Weight standing in for the infinite kernel weight of the empty and full coalitions.
const ENDPOINT_WEIGHT: f64 = 1e9;

/// Configuration for the KernelSHAP explainer.
#[derive(Debug, Clone)]
pub struct KernelShapConfig {
    pub n_samples: KernelShapSamples,
    /// Gaussian noise added to masked features when there is a single background row.
    pub noise_std_dev: f64,
    /// Seed for coalition sampling and noise, so repeated calls agree.
    pub seed: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum KernelShapSamples {
    Auto,
    Fixed(usize),
}

impl Default for KernelShapConfig {
    fn default() -> Self {
        KernelShapConfig {
            n_samples: KernelShapSamples::Auto,
            noise_std_dev: 0.0,
            seed: 42,
        }
    }
}

/// Attribution of one prediction to its input features.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// SHAP values, one for each feature.
    pub shap_values: Array1<f64>,
    /// The base value, E[f(x)] over the background data.
    pub expected_value: f64,
    /// The model output for the explained instance.
    pub actual_prediction: f64,
}

#[derive(Debug)]
pub struct KernelExplainer<M: PredictModel> {
    model: M,
    background_data: Dataset,
    expected_value: f64,
    num_features: usize,
    config: KernelShapConfig,
}

impl<M: PredictModel> KernelExplainer<M> {
    pub fn new(model: M, background_data: Dataset, config: Option<KernelShapConfig>) -> Result<Self> {
        let num_features = model.num_features();

        if background_data.is_empty() {
            return Err(AdrError::InvalidInput(
                "Background data cannot be empty.".to_string(),
            ));
        }

        if background_data.ncols() != num_features {
            return Err(AdrError::IncompatibleDimensions(format!(
                "Background data has {} features, but model expects {}.",
                background_data.ncols(),
                num_features
            )));
        }

        let background_predictions = model.predict(&background_data)?;
        let expected_value = background_predictions.mean().ok_or_else(|| {
            AdrError::Internal("Failed to calculate mean of background predictions.".to_string())
        })?;

        Ok(KernelExplainer {
            model,
            background_data,
            expected_value,
            num_features,
            config: config.unwrap_or_default(),
        })
    }

    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn background_data(&self) -> &Dataset {
        &self.background_data
    }

    pub fn config(&self) -> &KernelShapConfig {
        &self.config
    }

    pub fn shap_values(&self, instance: &Instance) -> Result<Explanation> {
        if instance.len() != self.num_features {
            return Err(AdrError::IncompatibleDimensions(format!(
                "Instance to explain has {} features, but explainer expects {}.",
                instance.len(),
                self.num_features
            )));
        }

        let n_samples_config = match self.config.n_samples {
            KernelShapSamples::Auto => 2 * self.num_features + 2048,
            KernelShapSamples::Fixed(n) => n,
        };

        let max_possible_samples = 1_usize
            .checked_shl(self.num_features as u32)
            .unwrap_or(usize::MAX);
        let actual_n_samples = n_samples_config.min(max_possible_samples).max(1);

        if self.num_features > 20 && actual_n_samples >= max_possible_samples {
            return Err(AdrError::InvalidInput(format!(
                "Number of features ({}) is too large to generate all coalitions. Please use sampling.",
                self.num_features
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (coalition_matrix, weights) = self.generate_coalitions(actual_n_samples, &mut rng);

        let n_bg = self.background_data.nrows();
        let mut perturbed = Vec::with_capacity(actual_n_samples * n_bg * self.num_features);
        let add_noise = n_bg == 1 && self.config.noise_std_dev > 0.0;

        for coalition in coalition_matrix.rows() {
            for background_sample in self.background_data.rows() {
                for feat_idx in 0..self.num_features {
                    let value = if coalition[feat_idx] == 1.0 {
                        instance[feat_idx]
                    } else if add_noise {
                        let noise: f64 = StandardNormal.sample(&mut rng);
                        background_sample[feat_idx] + noise * self.config.noise_std_dev
                    } else {
                        background_sample[feat_idx]
                    };
                    perturbed.push(value);
                }
            }
        }

        let perturbed_dataset =
            Dataset::from_shape_vec((actual_n_samples * n_bg, self.num_features), perturbed)?;
        let model_outputs = self.model.predict(&perturbed_dataset)?;
        if model_outputs.len() != actual_n_samples * n_bg {
            return Err(AdrError::ModelPrediction(format!(
                "Model returned {} outputs for {} rows.",
                model_outputs.len(),
                actual_n_samples * n_bg
            )));
        }
        let full_prediction = self.model.predict(&instance.view().insert_axis(ndarray::Axis(0)).to_owned())?[0];

        // Average the model over the background for each coalition.
        let averaged_model_outputs = Array1::from_shape_fn(actual_n_samples, |i| {
            model_outputs
                .slice(s![i * n_bg..(i + 1) * n_bg])
                .mean()
                .unwrap_or(self.expected_value)
        });

        let coeffs = self.solve_weighted_least_squares(
            coalition_matrix.view(),
            averaged_model_outputs.view(),
            weights.view(),
        )?;

        if coeffs.len() != self.num_features + 1 {
            return Err(AdrError::Internal(format!(
                "WLS solver returned {} coefficients, expected {}.",
                coeffs.len(),
                self.num_features + 1
            )));
        }

        let calculated_expected_value = coeffs[0];
        let mut final_shap_values = coeffs.slice(s![1..]).to_owned();

        // Local accuracy: base + sum(phi) must reproduce the prediction.
        let diff = (full_prediction - calculated_expected_value) - final_shap_values.sum();
        if diff.abs() > 1e-12 && self.num_features > 0 {
            final_shap_values.mapv_inplace(|v| v + diff / self.num_features as f64);
        }

        Ok(Explanation {
            shap_values: final_shap_values,
            expected_value: calculated_expected_value,
            actual_prediction: full_prediction,
        })
    }

    /// Coalition matrix (1.0 = feature taken from the instance) and kernel weights.
    ///
    /// Enumerates all 2^M coalitions when the budget allows, otherwise keeps
    /// both endpoints and samples the rest.
    fn generate_coalitions(&self, n_to_sample: usize, rng: &mut StdRng) -> (Dataset, Array1<f64>) {
        let m = self.num_features;
        if m == 0 {
            return (Dataset::zeros((0, 0)), Array1::zeros(0));
        }

        let max_coalitions = 1_usize.checked_shl(m as u32).unwrap_or(usize::MAX);

        if n_to_sample >= max_coalitions && m <= 20 {
            let mut coalitions = Dataset::zeros((max_coalitions, m));
            let mut weights = Array1::zeros(max_coalitions);
            for i in 0..max_coalitions {
                let mut size = 0;
                for j in 0..m {
                    if (i >> j) & 1 == 1 {
                        coalitions[[i, j]] = 1.0;
                        size += 1;
                    }
                }
                weights[i] = Self::kernel_weight(size, m);
            }
            return (coalitions, weights);
        }

        let mut coalitions = Dataset::zeros((n_to_sample, m));
        let mut weights = Array1::zeros(n_to_sample);
        let mut idx = 0;

        if n_to_sample > 0 {
            weights[idx] = Self::kernel_weight(0, m);
            idx += 1;
        }
        if idx < n_to_sample {
            coalitions.row_mut(idx).fill(1.0);
            weights[idx] = Self::kernel_weight(m, m);
            idx += 1;
        }

        let mut subset_sizes = HashSet::new();
        let features_indices: Vec<usize> = (0..m).collect();
        for i in idx..n_to_sample {
            let k = if m > 1 { rng.gen_range(1..m) } else { rng.gen_range(0..=1) };
            subset_sizes.insert(k);
            let mut row = coalitions.row_mut(i);
            for &f in features_indices.choose_multiple(rng, k) {
                row[f] = 1.0;
            }
            weights[i] = Self::kernel_weight(k, m);
        }
        log::debug!(
            "Sampled {} coalitions over {} subset sizes",
            n_to_sample,
            subset_sizes.len() + 2
        );
        (coalitions, weights)
    }

    /// Shapley kernel weight for a coalition of `coalition_size` out of `num_features`:
    /// (M-1) / (C(M, |z|) * |z| * (M-|z|)). Endpoints get [`ENDPOINT_WEIGHT`].
    fn kernel_weight(coalition_size: usize, num_features: usize) -> f64 {
        if coalition_size == 0 || coalition_size >= num_features || num_features <= 1 {
            return ENDPOINT_WEIGHT;
        }
        let denominator = Self::n_choose_k(num_features, coalition_size)
            * coalition_size as f64
            * (num_features - coalition_size) as f64;
        if denominator == 0.0 {
            return ENDPOINT_WEIGHT;
        }
        (num_features - 1) as f64 / denominator
    }

    /// C(n, k) computed in floating point.
    fn n_choose_k(n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        let k = k.min(n - k);
        let mut res = 1.0;
        for i in 0..k {
            res *= (n - i) as f64;
            res /= (i + 1) as f64;
        }
        res
    }

    /// Weighted least squares with an intercept column; returns `[intercept, phi_1..phi_M]`.
    fn solve_weighted_least_squares(
        &self,
        features: ArrayView2<f64>,
        target: ArrayView1<f64>,
        weights: ArrayView1<f64>,
    ) -> Result<Array1<f64>> {
        let n_samples = features.nrows();
        let n_coeffs = features.ncols() + 1;

        let effective_samples = weights.iter().filter(|&&w| w > 1e-9).count();
        if effective_samples < n_coeffs {
            return Err(AdrError::Internal(format!(
                "Underdetermined system in WLS: {} effective samples, {} coefficients to solve. Increase n_samples.",
                effective_samples, n_coeffs
            )));
        }

        let mut x_w = Array2::zeros((n_samples, n_coeffs));
        let mut y_w = Array1::zeros(n_samples);
        for i in 0..n_samples {
            let sqrt_w = if weights[i] < 1e-9 { 0.0 } else { weights[i].sqrt() };
            x_w[[i, 0]] = sqrt_w;
            for j in 1..n_coeffs {
                x_w[[i, j]] = features[[i, j - 1]] * sqrt_w;
            }
            y_w[i] = target[i] * sqrt_w;
        }

        #[cfg(feature = "linalg")]
        {
            use ndarray_linalg::LeastSquaresSvd;
            let results = x_w
                .least_squares(&y_w)
                .map_err(|e| AdrError::Internal(format!("WLS solver SVD failed: {}", e)))?;
            if results.rank < n_coeffs as i32 {
                log::warn!("Rank-deficient WLS system ({} < {})", results.rank, n_coeffs);
            }
            Ok(results.solution)
        }
        #[cfg(not(feature = "linalg"))]
        {
            let xtx = x_w.t().dot(&x_w);
            let xty = x_w.t().dot(&y_w);
            solve_linear_system(xtx, xty)
        }
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
#[cfg_attr(feature = "linalg", allow(dead_code))]
fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    if a.dim() != (n, n) {
        return Err(AdrError::IncompatibleDimensions(format!(
            "Linear system is {:?} with {} right-hand values.",
            a.dim(),
            n
        )));
    }
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= scale * 1e-15 {
            return Err(AdrError::Internal(format!(
                "Singular WLS system at column {}.",
                col
            )));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // f(x) = coefficients . x + intercept
    #[derive(Debug)]
    struct SimpleLinearModel {
        coefficients: Array1<f64>,
        intercept: f64,
    }

    impl SimpleLinearModel {
        fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
            SimpleLinearModel {
                coefficients: Array1::from(coefficients),
                intercept,
            }
        }
    }

    impl PredictModel for SimpleLinearModel {
        fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
            if instances.ncols() != self.coefficients.len() {
                return Err(AdrError::IncompatibleDimensions(format!(
                    "Model expects {} features, got {}",
                    self.coefficients.len(),
                    instances.ncols()
                )));
            }
            Ok(instances.dot(&self.coefficients) + self.intercept)
        }

        fn num_features(&self) -> usize {
            self.coefficients.len()
        }
    }

    // f(x) = x0 * x1, the simplest interaction.
    #[derive(Debug)]
    struct ProductModel;

    impl PredictModel for ProductModel {
        fn predict(&self, instances: &Dataset) -> Result<Array1<f64>> {
            Ok(instances.rows().into_iter().map(|r| r[0] * r[1]).collect())
        }

        fn num_features(&self) -> usize {
            2
        }
    }

    #[test]
    fn linear_model_recovers_exact_attributions() -> Result<()> {
        // Model: f(x1, x2) = 2*x1 + 3*x2 + 5
        let model = SimpleLinearModel::new(vec![2.0, 3.0], 5.0);
        let background = Dataset::from_shape_vec((3, 2), vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0])?;
        let explainer = KernelExplainer::new(model, background, None)?;

        // (5 + 7 + 8) / 3
        assert_abs_diff_eq!(explainer.expected_value(), 20.0 / 3.0, epsilon = 1e-9);

        let explanation = explainer.shap_values(&array![2.0, 1.0])?;
        assert_eq!(explanation.shap_values.len(), 2);
        assert_abs_diff_eq!(explanation.actual_prediction, 12.0, epsilon = 1e-9);

        // phi_i = coef_i * (x_i - E[background_i])
        assert_abs_diff_eq!(explanation.shap_values[0], 2.0 * (2.0 - 1.0 / 3.0), epsilon = 1e-3);
        assert_abs_diff_eq!(explanation.shap_values[1], 3.0 * (1.0 - 1.0 / 3.0), epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn local_accuracy_holds_for_interactions() -> Result<()> {
        let background = array![[0.0, 0.0]];
        let explainer = KernelExplainer::new(ProductModel, background, None)?;
        let explanation = explainer.shap_values(&array![2.0, 3.0])?;
        let total = explanation.shap_values.sum() + explanation.expected_value;
        assert_abs_diff_eq!(total, 6.0, epsilon = 1e-9);
        // Symmetric split of a pure interaction against a zero baseline.
        assert_abs_diff_eq!(explanation.shap_values[0], 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(explanation.shap_values[1], 3.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn sampled_coalitions_are_reproducible() -> Result<()> {
        let coefficients: Vec<f64> = (1..=12).map(f64::from).collect();
        let model = SimpleLinearModel::new(coefficients, 0.0);
        let background = Dataset::zeros((1, 12));
        let config = KernelShapConfig {
            n_samples: KernelShapSamples::Fixed(400),
            ..KernelShapConfig::default()
        };
        let explainer = KernelExplainer::new(model, background, Some(config))?;
        let x = Array1::ones(12);
        let a = explainer.shap_values(&x)?;
        let b = explainer.shap_values(&x)?;
        assert_eq!(a.shap_values, b.shap_values);
        assert_abs_diff_eq!(a.shap_values.sum() + a.expected_value, 78.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn noise_only_touches_masked_features() -> Result<()> {
        let model = SimpleLinearModel::new(vec![1.0, 1.0], 0.0);
        let config = KernelShapConfig {
            noise_std_dev: 0.5,
            ..KernelShapConfig::default()
        };
        let explainer = KernelExplainer::new(model, array![[0.0, 0.0]], Some(config))?;
        let explanation = explainer.shap_values(&array![1.0, 1.0])?;
        assert_abs_diff_eq!(explanation.actual_prediction, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            explanation.shap_values.sum() + explanation.expected_value,
            2.0,
            epsilon = 1e-9
        );
        Ok(())
    }

    #[test]
    fn rejects_mismatched_background() {
        let model = SimpleLinearModel::new(vec![1.0, 1.0], 0.0);
        let err = KernelExplainer::new(model, array![[0.0, 0.0, 0.0]], None).unwrap_err();
        assert!(matches!(err, AdrError::IncompatibleDimensions(_)));
    }

    #[test]
    fn rejects_empty_background() {
        let model = SimpleLinearModel::new(vec![1.0], 0.0);
        assert!(KernelExplainer::new(model, Dataset::zeros((0, 1)), None).is_err());
    }

    #[test]
    fn kernel_weight_matches_closed_form() {
        type E = KernelExplainer<SimpleLinearModel>;
        // M = 4, |z| = 1: 3 / (4 * 1 * 3)
        assert_abs_diff_eq!(E::kernel_weight(1, 4), 0.25, epsilon = 1e-12);
        assert_eq!(E::kernel_weight(0, 4), ENDPOINT_WEIGHT);
        assert_eq!(E::kernel_weight(4, 4), ENDPOINT_WEIGHT);
        assert_eq!(E::n_choose_k(5, 2), 10.0);
    }

    #[test]
    fn gaussian_elimination_solves_small_system() -> Result<()> {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve_linear_system(a, b)?;
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
        assert!(solve_linear_system(array![[1.0, 2.0], [2.0, 4.0]], array![1.0, 2.0]).is_err());
        Ok(())
    }
}

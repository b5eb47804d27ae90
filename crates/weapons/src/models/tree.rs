//! CART regression tree (MSE criterion).
//!
//! Nodes are stored flat in pre-order. A leaf has `feature == -1`; an
//! internal node routes a row left when `row[feature] <= threshold`.
//!
//! # Split search
//!
//! For every feature the samples are sorted once and prefix sums of `y` and
//! `y^2` give the squared error of every candidate cut in O(n). Thresholds
//! sit halfway between consecutive distinct values. Only strict
//! improvements replace the current best split, so the first feature and
//! cut reaching the minimum win.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet, positive_int, unknown_param};
use crate::linalg::{check_prediction_data, check_training_data};

/// A single node in the regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes).
    pub feature: i32,
    /// Threshold value for the split.
    pub threshold: f64,
    /// Index of left child (-1 for leaf nodes).
    pub left: i32,
    /// Index of right child (-1 for leaf nodes).
    pub right: i32,
    /// Mean target of the samples that reached this node.
    pub value: f64,
}

impl TreeNode {
    fn leaf(value: f64) -> Self {
        Self {
            feature: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TreeState {
    n_features: usize,
    nodes: Vec<TreeNode>,
}

impl TreeState {
    /// Every internal node must point forward at in-range children and
    /// split on a known feature, so traversal always reaches a leaf.
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(WeaponError::CorruptState("tree has no nodes".into()));
        }
        let n_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.feature == -1 {
                continue;
            }
            if node.feature < 0 || node.feature as usize >= self.n_features {
                return Err(WeaponError::CorruptState(format!(
                    "node {} has invalid feature index {}",
                    i, node.feature
                )));
            }
            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child < 0 || child as usize >= n_nodes || child as usize <= i {
                    return Err(WeaponError::CorruptState(format!(
                        "node {} has invalid {} child {}",
                        i, side, child
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Candidate split found by the search.
struct Split {
    feature: usize,
    threshold: f64,
    sse: f64,
}

/// Decision tree regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    /// Maximum depth (`None` grows until leaves are pure).
    max_depth: Option<usize>,
    /// Minimum samples required to split an internal node.
    min_samples_split: usize,
    #[serde(default)]
    state: Option<TreeState>,
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            state: None,
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Fitted nodes in pre-order.
    pub fn nodes(&self) -> Option<&[TreeNode]> {
        self.state.as_ref().map(|s| s.nodes.as_slice())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.state.as_ref().map_or(Ok(()), TreeState::validate)
    }

    /// Depth of the fitted tree (a lone leaf has depth 0).
    pub fn depth(&self) -> Option<usize> {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            let node = &nodes[idx];
            if node.feature == -1 {
                0
            } else {
                1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
            }
        }
        self.nodes().map(|nodes| walk(nodes, 0))
    }

    fn build(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        nodes: &mut Vec<TreeNode>,
    ) -> usize {
        let n = indices.len() as f64;
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let mean = sum / n;
        let sse = sum_sq - sum * sum / n;

        let idx = nodes.len();
        nodes.push(TreeNode::leaf(mean));

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || indices.len() < self.min_samples_split || sse <= 1e-12 {
            return idx;
        }

        let Some(split) = best_split(x, y, &indices) else {
            return idx;
        };
        if split.sse >= sse - 1e-12 {
            return idx;
        }

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.build(x, y, left_idx, depth + 1, nodes);
        let right = self.build(x, y, right_idx, depth + 1, nodes);
        nodes[idx] = TreeNode {
            feature: split.feature as i32,
            threshold: split.threshold,
            left: left as i32,
            right: right as i32,
            value: mean,
        };
        idx
    }

    /// Traverse the tree for one row and return the leaf value.
    #[inline]
    fn traverse(nodes: &[TreeNode], row: &[f64]) -> f64 {
        let mut node_idx = 0usize;
        loop {
            let node = &nodes[node_idx];
            if node.feature == -1 {
                return node.value;
            }
            let value = row[node.feature as usize];
            node_idx = if value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<Split> {
    let n_features = x[indices[0]].len();
    let total = indices.len();
    let mut best: Option<Split> = None;
    let mut order = indices.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let total_sum: f64 = order.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = order.iter().map(|&i| y[i] * y[i]).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for k in 1..total {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[prev][feature];
            let hi = x[order[k]][feature];
            if hi <= lo {
                continue;
            }

            let n_left = k as f64;
            let n_right = (total - k) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);

            if best.as_ref().is_none_or(|b| sse < b.sse - 1e-12) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    sse,
                });
            }
        }
    }
    best
}

impl Estimator for DecisionTreeRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_features = check_training_data(x, y)?;
        let mut nodes = Vec::new();
        self.build(x, y, (0..x.len()).collect(), 0, &mut nodes);
        self.state = Some(TreeState { n_features, nodes });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("DecisionTreeRegressor".into()))?;
        check_prediction_data(x, state.n_features)?;
        Ok(x.iter()
            .map(|row| Self::traverse(&state.nodes, row))
            .collect())
    }

    fn param_grid(&self) -> Option<ParamGrid> {
        Some(ParamGrid::new().with("max_depth", vec![3.0, 5.0, 8.0]))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "max_depth" => self.max_depth = Some(positive_int(name, value)?),
            "min_samples_split" => self.min_samples_split = positive_int(name, value)?.max(2),
            _ => return Err(unknown_param("DecisionTreeRegressor", name)),
        }
        self.state = None;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = vec![("min_samples_split".to_string(), self.min_samples_split as f64)];
        if let Some(depth) = self.max_depth {
            params.insert(0, ("max_depth".to_string(), depth as f64));
        }
        params
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y jumps from 1 to 5 at x0 = 10; x1 is noise the tree should ignore
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_single_split_on_step() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new(Some(5));
        tree.fit(&x, &y).unwrap();

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].feature, 0);
        assert!((nodes[0].threshold - 9.5).abs() < 1e-12);
        assert_eq!(tree.depth(), Some(1));

        let pred = tree.predict(&[vec![3.0, 2.0], vec![15.0, 0.0]]).unwrap();
        assert_eq!(pred, vec![1.0, 5.0]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..32).map(|i| (i * i) as f64).collect();

        let mut shallow = DecisionTreeRegressor::new(Some(2));
        shallow.fit(&x, &y).unwrap();
        assert_eq!(shallow.depth(), Some(2));

        let mut deep = DecisionTreeRegressor::new(None);
        deep.fit(&x, &y).unwrap();
        // Unbounded tree memorizes the training set
        assert_eq!(deep.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let mut tree = DecisionTreeRegressor::new(Some(5));
        tree.fit(&[vec![1.0], vec![2.0], vec![3.0]], &[4.0, 4.0, 4.0])
            .unwrap();
        assert_eq!(tree.nodes().unwrap().len(), 1);
        assert_eq!(tree.predict(&[vec![100.0]]).unwrap(), vec![4.0]);
    }

    #[test]
    fn test_grid_and_params() {
        let mut tree = DecisionTreeRegressor::new(Some(5));
        let grid = tree.param_grid().unwrap();
        assert_eq!(grid.combinations().len(), 3);

        tree.set_param("max_depth", 3.0).unwrap();
        assert_eq!(tree.max_depth(), Some(3));
        assert_eq!(tree.params()[0], ("max_depth".to_string(), 3.0));
        assert!(tree.set_param("max_depth", 0.0).is_err());
    }

    #[test]
    fn test_validate_rejects_cycles_and_bad_indices() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new(Some(5));
        tree.fit(&x, &y).unwrap();
        assert!(tree.validate().is_ok());

        let mut looping = tree.clone();
        if let Some(state) = looping.state.as_mut() {
            state.nodes[0].left = 0;
            state.nodes[0].right = 0;
        }
        assert!(matches!(looping.validate(), Err(WeaponError::CorruptState(_))));

        let mut out_of_range = tree.clone();
        if let Some(state) = out_of_range.state.as_mut() {
            state.nodes[0].right = 3;
        }
        assert!(out_of_range.validate().is_err());

        let mut bad_feature = tree.clone();
        if let Some(state) = bad_feature.state.as_mut() {
            state.nodes[0].feature = 2;
        }
        assert!(bad_feature.validate().is_err());

        let empty: DecisionTreeRegressor = serde_json::from_str(
            r#"{"max_depth": 3, "min_samples_split": 2, "state": {"n_features": 1, "nodes": []}}"#,
        )
        .unwrap();
        assert!(empty.validate().is_err());
    }
}

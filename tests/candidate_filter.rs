//! 置信度筛选的性质测试，不依赖模型文件

use shanan_lite::{
  model::{Candidate, DetectResult},
  tensor::OutputTensor,
};

const CHANNELS: usize = 7;

/// 第 0 通道为给定置信度，其余通道填充 1.0
fn output_with_confidences(confidences: &[f32]) -> OutputTensor {
  let n = confidences.len();
  let mut data = vec![1.0f32; CHANNELS * n];
  data[..n].copy_from_slice(confidences);
  OutputTensor::from_dims(&[1, CHANNELS, n], data).unwrap()
}

fn filter(output: &OutputTensor, threshold: f32) -> Vec<Candidate> {
  output.candidates(0, threshold).unwrap().collect()
}

fn sample_confidences() -> Vec<f32> {
  (0..64u32)
    .map(|i| ((i * 37) % 101) as f32 / 100.0)
    .chain([0.0, 1.0, 0.5, 0.25])
    .collect()
}

#[test]
fn filter_matches_strict_threshold_in_ascending_order() {
  let confidences = sample_confidences();
  let output = output_with_confidences(&confidences);

  for step in 0..=20 {
    let threshold = step as f32 / 20.0;
    let expected: Vec<usize> = confidences
      .iter()
      .enumerate()
      .filter(|(_, c)| **c > threshold)
      .map(|(i, _)| i)
      .collect();

    let found = filter(&output, threshold);
    let indices: Vec<usize> = found.iter().map(|c| c.index).collect();
    assert_eq!(indices, expected, "threshold {}", threshold);
    assert!(indices.windows(2).all(|w| w[0] < w[1]));
    for candidate in &found {
      assert_eq!(candidate.confidence, confidences[candidate.index]);
    }
  }
}

#[test]
fn threshold_one_yields_nothing() {
  let output = output_with_confidences(&sample_confidences());
  assert!(filter(&output, 1.0).is_empty());
}

#[test]
fn threshold_zero_excludes_exact_zero() {
  let output = output_with_confidences(&[0.0, 0.1, 0.0, 1e-6]);
  let indices: Vec<usize> = filter(&output, 0.0).iter().map(|c| c.index).collect();
  assert_eq!(indices, vec![1, 3]);
}

#[test]
fn out_of_range_threshold_is_not_an_error() {
  let output = output_with_confidences(&[0.0, 0.3, 1.0]);
  assert_eq!(filter(&output, -1.0).len(), 3);
  assert!(filter(&output, 2.0).is_empty());
}

#[test]
fn filter_is_idempotent_and_does_not_mutate() {
  let output = output_with_confidences(&sample_confidences());
  let snapshot = output.clone();

  let first = filter(&output, 0.4);
  let second = filter(&output, 0.4);
  assert_eq!(first, second);
  assert_eq!(output, snapshot);
}

#[test]
fn single_image_scenario() {
  let output = output_with_confidences(&[0.9, 0.2, 0.51, 0.5, 0.0]);
  assert_eq!(output.shape(), [1, 7, 5]);

  let result = DetectResult::from_output(&output, 0, 0.5).unwrap();
  assert_eq!(
    &*result.items,
    &[
      Candidate {
        index: 0,
        confidence: 0.9
      },
      Candidate {
        index: 2,
        confidence: 0.51
      },
    ]
  );
}

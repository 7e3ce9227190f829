//! Sentence pooling and the unit-norm contract.
//!
//! Every vector an [`Embedder`](appsearch_core::traits::Embedder) in this
//! crate returns has L2 norm 1, so cosine distance against it is always a
//! finite number.

use anyhow::{Result, ensure};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states of each row, L2-normalised.
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]`; returns `[B, H]`.
/// A row with no unmasked tokens pools to zeros.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _, hidden_dim) = hidden.dims3()?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let lengths = mask.sum_keepdim(1)?.maximum(1f32)?;
    let mean = summed.broadcast_div(&lengths)?;

    let eps = match hidden.dtype() { DType::F16 | DType::BF16 => 1e-6f64, _ => 1e-12f64 };
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    let pooled = mean.broadcast_div(&norm)?;
    ensure!(pooled.dims() == [batch, hidden_dim], "pooled shape mismatch: {:?}", pooled.dims());
    Ok(pooled)
}

/// Scale `v` to unit length. Vectors with no direction (all zeros, or any
/// non-finite component) become the first basis vector.
pub fn normalize_embedding(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm.is_finite() && norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    } else if let Some((first, rest)) = v.split_first_mut() {
        *first = 1.0;
        rest.iter_mut().for_each(|x| *x = 0.0);
    }
}

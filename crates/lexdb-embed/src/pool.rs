use anyhow::{bail, Result};
use candle_core::{DType, Tensor};

/// Mean of `hidden` `[B, T, H]` over the tokens whose `attention_mask` `[B, T]` is 1.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    if dims.len() != 3 {
        bail!("hidden shape must be [B,T,H], got {:?}", dims);
    }
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let masked = hidden.broadcast_mul(&mask_3d)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    Ok(sum.broadcast_div(&lengths)?)
}

/// L2-normalizes each row of a `[B, H]` tensor.
pub fn l2_normalize_rows(t: &Tensor) -> Result<Tensor> {
    let eps_val = match t.dtype() {
        DType::F16 => 1e-6f32,
        _ => 1e-12f32,
    };
    let eps = Tensor::new(&[eps_val], t.device())?.to_dtype(t.dtype())?.unsqueeze(0)?;
    let norm = t.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    Ok(t.broadcast_div(&norm)?)
}

/// Masked mean followed by row L2 normalization, checked to be `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let batch = hidden.dims().first().copied().unwrap_or(0);
    let hidden_dim = hidden.dims().last().copied().unwrap_or(0);
    let mean = l2_normalize_rows(&masked_mean(hidden, attention_mask)?)?;
    if mean.dims() != [batch, hidden_dim] {
        bail!("pooled shape {:?} does not match [{}, {}]", mean.dims(), batch, hidden_dim);
    }
    Ok(mean)
}

use image::GrayImage;
use ndarray::{Array, ArrayBase, ArrayD, Data, Dimension};
use num_traits::ToPrimitive;

use crate::error::NormalizeError;

pub type NormalizedImage = ArrayD<u8>;

/// Stretches a pixel array linearly into 8-bit grayscale.
///
/// Samples are converted to `f64` and negatives clipped to zero.
/// Each sample is then divided by the global maximum, multiplied by 255
/// and truncated toward zero. An empty array yields an empty image.
///
/// Fails with [`NormalizeError::DegenerateRange`] when the clipped maximum
/// is not a positive finite number, e.g. for an all-zero image.
pub fn normalize<S, D>(pixels: &ArrayBase<S, D>) -> Result<Array<u8, D>, NormalizeError>
where
    S: Data,
    S::Elem: ToPrimitive,
    D: Dimension,
{
    // NaN samples become 0.0 here, since `f64::max` ignores NaN
    let clipped = pixels.map(|sample| sample.to_f64().unwrap_or(f64::NAN).max(0.0));
    if clipped.is_empty() {
        return Ok(Array::zeros(clipped.raw_dim()));
    }

    let max = clipped.iter().copied().fold(0.0, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return Err(NormalizeError::DegenerateRange { max });
    }

    Ok(clipped.mapv(|sample| ((sample / max) * 255.0) as u8))
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawPixels {
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl RawPixels {
    pub fn shape(&self) -> &[usize] {
        match self {
            RawPixels::U8(array) => array.shape(),
            RawPixels::I8(array) => array.shape(),
            RawPixels::U16(array) => array.shape(),
            RawPixels::I16(array) => array.shape(),
            RawPixels::U32(array) => array.shape(),
            RawPixels::I32(array) => array.shape(),
            RawPixels::F32(array) => array.shape(),
            RawPixels::F64(array) => array.shape(),
        }
    }

    pub fn sample_type(&self) -> &'static str {
        match self {
            RawPixels::U8(_) => "u8",
            RawPixels::I8(_) => "i8",
            RawPixels::U16(_) => "u16",
            RawPixels::I16(_) => "i16",
            RawPixels::U32(_) => "u32",
            RawPixels::I32(_) => "i32",
            RawPixels::F32(_) => "f32",
            RawPixels::F64(_) => "f64",
        }
    }

    pub fn normalize(&self) -> Result<NormalizedImage, NormalizeError> {
        match self {
            RawPixels::U8(array) => normalize(array),
            RawPixels::I8(array) => normalize(array),
            RawPixels::U16(array) => normalize(array),
            RawPixels::I16(array) => normalize(array),
            RawPixels::U32(array) => normalize(array),
            RawPixels::I32(array) => normalize(array),
            RawPixels::F32(array) => normalize(array),
            RawPixels::F64(array) => normalize(array),
        }
    }
}

/// `None` unless the image is two-dimensional.
pub fn to_gray_image(image: &NormalizedImage) -> Option<GrayImage> {
    let &[rows, columns] = image.shape() else {
        return None;
    };
    let samples: Vec<u8> = image.iter().copied().collect();
    GrayImage::from_raw(u32::try_from(columns).ok()?, u32::try_from(rows).ok()?, samples)
}

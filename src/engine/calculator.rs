use crate::error::Result;
use crate::models::{Feature, FieldValue, Layer};

/// Add (or overwrite) a field computed per feature.
///
/// The formula gets the layer for typed field access. The first error
/// aborts the whole calculation.
pub fn calculate_field<G, F>(mut layer: Layer<G>, name: &str, formula: F) -> Result<Layer<G>>
where
    F: Fn(&Layer<G>, &Feature<G>) -> Result<FieldValue>,
{
    let values = layer
        .features
        .iter()
        .map(|feature| formula(&layer, feature))
        .collect::<Result<Vec<_>>>()?;

    for (feature, value) in layer.features.iter_mut().zip(values) {
        feature.attributes.set(name, value);
    }
    Ok(layer)
}

/// Round half away from zero to `precision` decimal places
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

//! Crop regions in normalized center/size form.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;

use crate::error::CollectraError;

/// A rectangle relative to its parent image: center point plus size, all
/// expressed as fractions of the image dimensions.
///
/// Values are not range-checked. A region outside `[0, 1]` can be stored and
/// written back; the core never rasterizes it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x_center: f64,
    pub y_center: f64,
    pub width_relative: f64,
    pub height_relative: f64,
}

impl CropRegion {
    /// Document keys, in the order they are written.
    pub const FIELDS: [&'static str; 4] =
        ["x_center", "y_center", "width_relative", "height_relative"];

    /// Creates a new crop region.
    #[inline]
    pub fn new(x_center: f64, y_center: f64, width_relative: f64, height_relative: f64) -> Self {
        Self {
            x_center,
            y_center,
            width_relative,
            height_relative,
        }
    }

    /// Reads the four region keys out of a node's field bag.
    ///
    /// Every key must be present and numeric.
    pub fn from_fields(id: &str, fields: &Mapping) -> Result<Self, CollectraError> {
        let mut values = [0.0f64; 4];
        for (slot, key) in values.iter_mut().zip(Self::FIELDS) {
            let value = fields
                .get(key)
                .ok_or_else(|| CollectraError::validation(id, format!("missing crop field '{key}'")))?;
            *slot = value.as_f64().ok_or_else(|| {
                CollectraError::validation(id, format!("crop field '{key}' is not a number"))
            })?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Appends the four region keys to a field bag.
    pub(crate) fn write_fields(&self, fields: &mut Mapping) {
        for (key, value) in Self::FIELDS.iter().zip(self.values()) {
            fields.insert(Value::from(*key), Value::from(value));
        }
    }

    fn values(&self) -> [f64; 4] {
        [
            self.x_center,
            self.y_center,
            self.width_relative,
            self.height_relative,
        ]
    }

    /// Returns the normalized corners as `(xmin, ymin, xmax, ymax)`.
    pub fn to_xyxy(&self) -> (f64, f64, f64, f64) {
        let half_w = self.width_relative / 2.0;
        let half_h = self.height_relative / 2.0;
        (
            self.x_center - half_w,
            self.y_center - half_h,
            self.x_center + half_w,
            self.y_center + half_h,
        )
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}) {:.4}x{:.4}",
            self.x_center, self.y_center, self.width_relative, self.height_relative
        )
    }
}

/// A crop region as received from an operator edit, where any field may be
/// missing.
///
/// Editing always replaces the whole region, so an incomplete input is
/// rejected rather than merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct CropRegionInput {
    #[serde(default)]
    pub x_center: Option<f64>,
    #[serde(default)]
    pub y_center: Option<f64>,
    #[serde(default)]
    pub width_relative: Option<f64>,
    #[serde(default)]
    pub height_relative: Option<f64>,
}

impl CropRegionInput {
    /// Converts into a complete region, or names the first missing field.
    pub fn into_region(self, id: &str) -> Result<CropRegion, CollectraError> {
        let fields = [
            self.x_center,
            self.y_center,
            self.width_relative,
            self.height_relative,
        ];
        let mut values = [0.0f64; 4];
        for ((slot, field), key) in values.iter_mut().zip(fields).zip(CropRegion::FIELDS) {
            *slot = field.ok_or_else(|| {
                CollectraError::validation(id, format!("missing required field: {key}"))
            })?;
        }
        Ok(CropRegion::new(values[0], values[1], values[2], values[3]))
    }
}

impl From<CropRegion> for CropRegionInput {
    fn from(region: CropRegion) -> Self {
        Self {
            x_center: Some(region.x_center),
            y_center: Some(region.y_center),
            width_relative: Some(region.width_relative),
            height_relative: Some(region.height_relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn reads_all_four_fields() {
        let map = fields("x_center: 0.5\ny_center: 0.25\nwidth_relative: 0.2\nheight_relative: 0.1\n");
        let region = CropRegion::from_fields("c", &map).unwrap();
        assert_eq!(region, CropRegion::new(0.5, 0.25, 0.2, 0.1));
    }

    #[test]
    fn zero_is_a_present_value() {
        let map = fields("x_center: 0\ny_center: 0.0\nwidth_relative: 1\nheight_relative: 1\n");
        let region = CropRegion::from_fields("c", &map).unwrap();
        assert_eq!(region.x_center, 0.0);
        assert_eq!(region.width_relative, 1.0);
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let map = fields("x_center: 0.5\ny_center: 0.5\nwidth_relative: 0.2\n");
        let err = CropRegion::from_fields("crop_9", &map).unwrap_err();
        assert!(matches!(err, CollectraError::Validation { ref id, .. } if id == "crop_9"));
        assert!(err.to_string().contains("height_relative"));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let map = fields("x_center: left\ny_center: 0.5\nwidth_relative: 0.2\nheight_relative: 0.1\n");
        assert!(CropRegion::from_fields("c", &map).is_err());
    }

    #[test]
    fn input_with_missing_field_is_rejected() {
        let input = CropRegionInput {
            x_center: Some(0.5),
            ..Default::default()
        };
        let err = input.into_region("crop_001").unwrap_err();
        assert!(err.to_string().contains("y_center"));
    }

    #[test]
    fn xyxy_corners() {
        let (x0, y0, x1, y1) = CropRegion::new(0.5, 0.5, 0.2, 0.4).to_xyxy();
        assert!((x0 - 0.4).abs() < 1e-12);
        assert!((y0 - 0.3).abs() < 1e-12);
        assert!((x1 - 0.6).abs() < 1e-12);
        assert!((y1 - 0.7).abs() < 1e-12);
    }
}

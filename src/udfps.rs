//! Under-display fingerprint sensor geometry.
//!
//! The fingerprint driver publishes the sensor's placement in millimetres.
//! The touchscreen controller needs the matching touch rectangle in pixels,
//! which depends on the panel resolution and density.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Default location of the fingerprint sensor position attribute.
pub const DEFAULT_FINGERPRINT_POSITION: &str = "/sys/class/fingerprint/fingerprint/position";

/// Touchscreen command that programs the fingerprint touch rectangle.
pub const SET_FOD_RECT: &str = "set_fod_rect";

const INCHES_PER_MM: f64 = 0.03937007859349251;

// Positions of the used fields in the comma separated attribute.
const MARGIN_BOTTOM: usize = 0;
const MARGIN_LEFT: usize = 1;
const AREA_WIDTH: usize = 2;
const AREA_HEIGHT: usize = 3;
const ACTIVE_AREA: usize = 5;
const IMAGE_SIZE: usize = 7;
const DRAGGING_AREA: usize = 8;
const MIN_FIELDS: usize = DRAGGING_AREA + 1;

/// Why a sensor position attribute could not be used.
#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("sensor position has {found} fields, at least {} required", MIN_FIELDS)]
    TooFewFields { found: usize },

    #[error("sensor position field {index} is not a number: '{value}'")]
    InvalidField { index: usize, value: String },
}

/// Sensor placement, all values in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorArea {
    pub width: f64,
    pub height: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub image_size: f64,
    pub active_area: f64,
    pub dragging_area: f64,
}

impl Default for SensorArea {
    fn default() -> Self {
        Self {
            width: 9.0,
            height: 4.0,
            margin_bottom: 13.77,
            margin_left: 0.0,
            image_size: 13.0,
            active_area: 14.8,
            dragging_area: 5.0,
        }
    }
}

impl FromStr for SensorArea {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(PositionError::TooFewFields {
                found: fields.len(),
            });
        }

        let field = |index: usize| {
            fields[index]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PositionError::InvalidField {
                    index,
                    value: fields[index].to_string(),
                })
        };

        Ok(Self {
            width: field(AREA_WIDTH)?,
            height: field(AREA_HEIGHT)?,
            margin_bottom: field(MARGIN_BOTTOM)?,
            margin_left: field(MARGIN_LEFT)?,
            image_size: field(IMAGE_SIZE)?,
            active_area: field(ACTIVE_AREA)?,
            dragging_area: field(DRAGGING_AREA)?,
        })
    }
}

impl fmt::Display for SensorArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} mm, margins {}/{} mm, active {} mm",
            self.width, self.height, self.margin_bottom, self.margin_left, self.active_area
        )
    }
}

/// Panel resolution in pixels and horizontal density in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub xdpi: f64,
}

impl DisplayGeometry {
    /// Converts a length in millimetres to whole pixels, truncating.
    fn mm_to_px(&self, mm: f64) -> i64 {
        (mm * self.xdpi * INCHES_PER_MM) as i64
    }
}

/// Touch rectangle in panel pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FodRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl FodRect {
    /// Square touch area centred horizontally above the bottom margin.
    pub fn compute(area: &SensorArea, display: &DisplayGeometry) -> Self {
        let size = display.mm_to_px(area.active_area);
        let margin_bottom = display.mm_to_px(area.margin_bottom);
        let margin_left = display.mm_to_px(area.margin_left);
        let area_height = display.mm_to_px(area.height);

        let left = i64::from(display.width) / 2 - (size / 2 - margin_left);
        let top = i64::from(display.height) - (margin_bottom + area_height / 2 + size / 2);

        Self {
            left,
            top,
            right: left + size,
            bottom: top + size,
        }
    }

    /// The touchscreen command that programs this rectangle.
    pub fn command(&self) -> String {
        format!(
            "{SET_FOD_RECT},{},{},{},{}",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const FHD: DisplayGeometry = DisplayGeometry {
        width: 1080,
        height: 2340,
        xdpi: 400.0,
    };

    #[test]
    fn parses_driver_attribute() {
        let area: SensorArea = "14.50,0.00,9.00,4.50,0,15.00,0,12.50,5.50\n".parse().unwrap();
        assert_eq!(
            area,
            SensorArea {
                width: 9.0,
                height: 4.5,
                margin_bottom: 14.5,
                margin_left: 0.0,
                image_size: 12.5,
                active_area: 15.0,
                dragging_area: 5.5,
            }
        );
    }

    #[test]
    fn eight_fields_are_too_few() {
        let err = "13.77,0,9,4,0,14.80,0,13.00".parse::<SensorArea>().unwrap_err();
        assert_eq!(err, PositionError::TooFewFields { found: 8 });
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let err = "13.77,0,9,x,0,14.80,0,13.00,5.00"
            .parse::<SensorArea>()
            .unwrap_err();
        assert_eq!(
            err,
            PositionError::InvalidField {
                index: AREA_HEIGHT,
                value: "x".to_string(),
            }
        );
    }

    #[test]
    fn default_area_on_fhd_panel() {
        let rect = FodRect::compute(&SensorArea::default(), &FHD);
        assert_eq!(
            rect,
            FodRect {
                left: 424,
                top: 1977,
                right: 657,
                bottom: 2210,
            }
        );
        assert_eq!(rect.command(), "set_fod_rect,424,1977,657,2210");
    }

    #[test]
    fn left_margin_shifts_right() {
        let area = SensorArea {
            margin_left: 2.0,
            ..Default::default()
        };
        let shifted = FodRect::compute(&area, &FHD);
        let centred = FodRect::compute(&SensorArea::default(), &FHD);

        // 2 mm at 400 dpi truncates to 31 px.
        assert_eq!(shifted.left - centred.left, 31);
        assert_eq!(shifted.top, centred.top);
    }

    proptest! {
        #[test]
        fn rect_is_square_of_active_area(
            width in 720u32..2000,
            height in 1280u32..3200,
            xdpi in 200.0f64..600.0,
            active in 5.0f64..20.0,
        ) {
            let display = DisplayGeometry { width, height, xdpi };
            let area = SensorArea { active_area: active, ..Default::default() };
            let rect = FodRect::compute(&area, &display);

            let size = (active * xdpi * INCHES_PER_MM) as i64;
            prop_assert_eq!(rect.right - rect.left, size);
            prop_assert_eq!(rect.bottom - rect.top, size);
            prop_assert!(rect.bottom <= i64::from(height));
        }
    }
}

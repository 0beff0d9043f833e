//! Cell formatting attributes.
//!
//! All fields are optional so that formats can be layered: a row or column
//! band format underneath, cell-level overrides on top (see [`CellFormat::merge`]).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);

    /// `0xRRGGBB`.
    pub fn to_hex(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }

    /// Automation object models store colors as `0xBBGGRR`.
    pub fn to_bgr(self) -> u32 {
        ((self.2 as u32) << 16) | ((self.1 as u32) << 8) | self.0 as u32
    }

    pub fn from_bgr(value: u32) -> Rgb {
        Rgb(
            (value & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            ((value >> 16) & 0xff) as u8,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Formatting to apply to a range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFormat {
    /// Number format code, e.g. `"#,##0.00"` or `"yyyy-mm-dd"`.
    pub number_format: Option<String>,
    pub h_align: Option<HAlign>,
    pub v_align: Option<VAlign>,
    pub wrap_text: Option<bool>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<Rgb>,
    /// Interior fill.
    pub fill: Option<Rgb>,
    pub column_width: Option<f64>,
    pub row_height: Option<f64>,
}

impl CellFormat {
    pub fn number(format: impl Into<String>) -> Self {
        CellFormat {
            number_format: Some(format.into()),
            ..Default::default()
        }
    }

    pub fn bold() -> Self {
        CellFormat {
            bold: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CellFormat::default()
    }

    /// Overlay `other` on top of `self`: every attribute `other` sets wins.
    pub fn merge(&mut self, other: &CellFormat) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.number_format, &other.number_format);
        take(&mut self.h_align, &other.h_align);
        take(&mut self.v_align, &other.v_align);
        take(&mut self.wrap_text, &other.wrap_text);
        take(&mut self.bold, &other.bold);
        take(&mut self.italic, &other.italic);
        take(&mut self.font_name, &other.font_name);
        take(&mut self.font_size, &other.font_size);
        take(&mut self.font_color, &other.font_color);
        take(&mut self.fill, &other.fill);
        take(&mut self.column_width, &other.column_width);
        take(&mut self.row_height, &other.row_height);
    }

    pub fn merged(mut self, other: &CellFormat) -> CellFormat {
        self.merge(other);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut base = CellFormat {
            bold: Some(true),
            number_format: Some("0.00".into()),
            ..Default::default()
        };
        base.merge(&CellFormat {
            number_format: Some("0%".into()),
            fill: Some(Rgb::RED),
            ..Default::default()
        });
        assert_eq!(base.bold, Some(true));
        assert_eq!(base.number_format.as_deref(), Some("0%"));
        assert_eq!(base.fill, Some(Rgb::RED));
    }

    #[test]
    fn test_color_packing() {
        let c = Rgb(0x12, 0x34, 0x56);
        assert_eq!(c.to_hex(), 0x123456);
        assert_eq!(c.to_bgr(), 0x563412);
        assert_eq!(Rgb::from_bgr(c.to_bgr()), c);
    }
}

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::css::CssBox;
use crate::css::CssLength;
use crate::css::Edges;

pub const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;
pub const DEFAULT_FONT_SIZE: CssLength = CssLength::Px(16.0);
pub const DEFAULT_LINE_HEIGHT: f32 = 1.6;
pub const DEFAULT_PADDING: CssLength = CssLength::Px(16.0);
pub const DEFAULT_TEXT_UNIT_STEP: usize = 24;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritingMode {
	#[default]
	#[serde(rename = "horizontal-tb", alias = "horizontal")]
	HorizontalTb,
	#[serde(rename = "vertical-rl", alias = "vertical")]
	VerticalRl,
}

impl WritingMode {
	pub fn is_vertical(self) -> bool {
		matches!(self, WritingMode::VerticalRl)
	}
}

impl Display for WritingMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			WritingMode::HorizontalTb => write!(f, "horizontal-tb"),
			WritingMode::VerticalRl => write!(f, "vertical-rl"),
		}
	}
}

/// Layout configuration shared by the measurement probe and the live viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
	pub viewport_width: f32,
	pub viewport_height: f32,
	pub font_size: CssLength,
	pub writing_mode: WritingMode,
	/// Unitless multiplier of the font size.
	pub line_height: f32,
	pub margin: CssBox,
	pub padding: CssBox,
	/// Maximum characters per text unit.
	pub text_unit_step: usize,
}

impl Default for PaginationSettings {
	fn default() -> Self {
		Self {
			viewport_width: DEFAULT_VIEWPORT_WIDTH,
			viewport_height: DEFAULT_VIEWPORT_HEIGHT,
			font_size: DEFAULT_FONT_SIZE,
			writing_mode: WritingMode::default(),
			line_height: DEFAULT_LINE_HEIGHT,
			margin: CssBox::from(CssLength::ZERO),
			padding: CssBox::from(DEFAULT_PADDING),
			text_unit_step: DEFAULT_TEXT_UNIT_STEP,
		}
	}
}

impl PaginationSettings {
	pub fn for_viewport(width: f32, height: f32) -> Self {
		Self {
			viewport_width: width,
			viewport_height: height,
			..Default::default()
		}
	}

	pub fn font_size_px(&self) -> f32 {
		self.font_size.font_size_px()
	}

	pub fn line_height_px(&self) -> f32 {
		self.font_size_px() * self.line_height
	}

	pub fn padding_px(&self) -> Edges<f32> {
		self.padding
			.to_px(self.font_size_px(), self.viewport_width)
	}

	pub fn margin_px(&self) -> Edges<f32> {
		self.margin.to_px(self.font_size_px(), self.viewport_width)
	}

	/// Physical (width, height) available to content inside the page box.
	pub fn content_size(&self) -> (f32, f32) {
		let padding = self.padding_px();
		let margin = self.margin_px();
		let width = self.viewport_width - padding.horizontal() - margin.horizontal();
		let height = self.viewport_height - padding.vertical() - margin.vertical();
		(width.max(0.0), height.max(0.0))
	}

	pub fn text_unit_step(&self) -> usize {
		self.text_unit_step.max(1)
	}

	pub fn merge(&mut self, patch: SettingsPatch) {
		let SettingsPatch {
			viewport_width,
			viewport_height,
			font_size,
			writing_mode,
			line_height,
			margin,
			padding,
			text_unit_step,
		} = patch;
		if let Some(v) = viewport_width {
			self.viewport_width = v;
		}
		if let Some(v) = viewport_height {
			self.viewport_height = v;
		}
		if let Some(v) = font_size {
			self.font_size = v;
		}
		if let Some(v) = writing_mode {
			self.writing_mode = v;
		}
		if let Some(v) = line_height {
			self.line_height = v;
		}
		if let Some(v) = margin {
			self.margin = v;
		}
		if let Some(v) = padding {
			self.padding = v;
		}
		if let Some(v) = text_unit_step {
			self.text_unit_step = v;
		}
	}
}

/// Partial settings applied over the current ones by `repaginate`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
	pub viewport_width: Option<f32>,
	pub viewport_height: Option<f32>,
	pub font_size: Option<CssLength>,
	pub writing_mode: Option<WritingMode>,
	pub line_height: Option<f32>,
	pub margin: Option<CssBox>,
	pub padding: Option<CssBox>,
	pub text_unit_step: Option<usize>,
}

impl SettingsPatch {
	pub fn viewport(width: f32, height: f32) -> Self {
		Self {
			viewport_width: Some(width),
			viewport_height: Some(height),
			..Default::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::css::CssLength;
	use crate::settings::PaginationSettings;
	use crate::settings::SettingsPatch;
	use crate::settings::WritingMode;

	#[test]
	fn test_settings_defaults() {
		let settings = PaginationSettings::default();
		assert_eq!(16.0, settings.font_size_px());
		assert_eq!((768.0, 568.0), settings.content_size());
		assert_eq!(WritingMode::HorizontalTb, settings.writing_mode);
	}

	#[test]
	fn test_settings_merge_keeps_unset() {
		let mut settings = PaginationSettings::for_viewport(1024.0, 768.0);
		settings.merge(SettingsPatch {
			font_size: Some(CssLength::Px(20.0)),
			writing_mode: Some(WritingMode::VerticalRl),
			..Default::default()
		});
		assert_eq!(1024.0, settings.viewport_width);
		assert_eq!(20.0, settings.font_size_px());
		assert!(settings.writing_mode.is_vertical());
		assert_eq!(32.0, settings.line_height_px());
	}

	#[test]
	fn test_settings_deserialize_partial() {
		let settings: PaginationSettings = serde_json::from_str(
			r#"{ "viewport_width": 400, "writing_mode": "vertical", "padding": "8px 4px" }"#,
		)
		.unwrap();
		assert_eq!(400.0, settings.viewport_width);
		assert_eq!(600.0, settings.viewport_height);
		assert_eq!(WritingMode::VerticalRl, settings.writing_mode);
		assert_eq!((392.0, 584.0), settings.content_size());
	}
}

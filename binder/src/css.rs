use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

const DEFAULT_FONT_SIZE_PX: f32 = 16.0;
const PX_PER_PT: f32 = 96.0 / 72.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CssParseError {
	#[error("Empty css value")]
	Empty,
	#[error("Invalid css length: {0}")]
	InvalidLength(String),
	#[error("Too many box values: {0}")]
	TooManyValues(String),
}

/// A CSS length as accepted by the probe and live container styles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
	Px(f32),
	Em(f32),
	Rem(f32),
	Pt(f32),
	Percent(f32),
}

impl CssLength {
	pub const ZERO: CssLength = CssLength::Px(0.0);

	/// `em` resolves against `font_size_px`, `%` against `reference_px`.
	pub fn to_px(self, font_size_px: f32, reference_px: f32) -> f32 {
		match self {
			CssLength::Px(v) => v,
			CssLength::Em(v) => v * font_size_px,
			CssLength::Rem(v) => v * DEFAULT_FONT_SIZE_PX,
			CssLength::Pt(v) => v * PX_PER_PT,
			CssLength::Percent(v) => v / 100.0 * reference_px,
		}
	}

	/// Resolves a `font-size` value, relative lengths against the UA default.
	pub fn font_size_px(self) -> f32 {
		self.to_px(DEFAULT_FONT_SIZE_PX, DEFAULT_FONT_SIZE_PX)
	}
}

impl Default for CssLength {
	fn default() -> Self {
		CssLength::ZERO
	}
}

impl FromStr for CssLength {
	type Err = CssParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim().to_ascii_lowercase();
		if s.is_empty() {
			return Err(CssParseError::Empty);
		}
		let split = s
			.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
			.unwrap_or(s.len());
		let (number, unit) = s.split_at(split);
		let value: f32 = number
			.parse()
			.map_err(|_| CssParseError::InvalidLength(s.clone()))?;
		if !value.is_finite() {
			return Err(CssParseError::InvalidLength(s.clone()));
		}
		match unit {
			"px" => Ok(CssLength::Px(value)),
			"em" => Ok(CssLength::Em(value)),
			"rem" => Ok(CssLength::Rem(value)),
			"pt" => Ok(CssLength::Pt(value)),
			"%" => Ok(CssLength::Percent(value)),
			"" if value == 0.0 => Ok(CssLength::ZERO),
			_ => Err(CssParseError::InvalidLength(s.clone())),
		}
	}
}

impl Display for CssLength {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CssLength::Px(v) => write!(f, "{v}px"),
			CssLength::Em(v) => write!(f, "{v}em"),
			CssLength::Rem(v) => write!(f, "{v}rem"),
			CssLength::Pt(v) => write!(f, "{v}pt"),
			CssLength::Percent(v) => write!(f, "{v}%"),
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LengthRepr {
	Number(f32),
	Text(String),
}

impl<'de> Deserialize<'de> for CssLength {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		match LengthRepr::deserialize(deserializer)? {
			LengthRepr::Number(v) => Ok(CssLength::Px(v)),
			LengthRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
		}
	}
}

impl Serialize for CssLength {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Edges<T> {
	pub top: T,
	pub right: T,
	pub bottom: T,
	pub left: T,
}

impl<T: Copy> Edges<T> {
	pub fn all(v: T) -> Self {
		Self {
			top: v,
			right: v,
			bottom: v,
			left: v,
		}
	}

	pub fn map<U>(self, f: impl Fn(T) -> U) -> Edges<U> {
		Edges {
			top: f(self.top),
			right: f(self.right),
			bottom: f(self.bottom),
			left: f(self.left),
		}
	}
}

impl Edges<f32> {
	pub fn horizontal(&self) -> f32 {
		self.left + self.right
	}

	pub fn vertical(&self) -> f32 {
		self.top + self.bottom
	}
}

/// `margin` / `padding` shorthand with one to four values.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CssBox(pub Edges<CssLength>);

impl CssBox {
	pub fn to_px(&self, font_size_px: f32, reference_px: f32) -> Edges<f32> {
		self.0.map(|l| l.to_px(font_size_px, reference_px))
	}
}

impl From<CssLength> for CssBox {
	fn from(value: CssLength) -> Self {
		CssBox(Edges::all(value))
	}
}

impl FromStr for CssBox {
	type Err = CssParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let values = s
			.split_whitespace()
			.map(CssLength::from_str)
			.collect::<Result<Vec<_>, _>>()?;
		let edges = match values.as_slice() {
			[] => return Err(CssParseError::Empty),
			[a] => Edges::all(*a),
			[v, h] => Edges {
				top: *v,
				right: *h,
				bottom: *v,
				left: *h,
			},
			[t, h, b] => Edges {
				top: *t,
				right: *h,
				bottom: *b,
				left: *h,
			},
			[t, r, b, l] => Edges {
				top: *t,
				right: *r,
				bottom: *b,
				left: *l,
			},
			_ => return Err(CssParseError::TooManyValues(s.to_string())),
		};
		Ok(CssBox(edges))
	}
}

impl Display for CssBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let Edges {
			top,
			right,
			bottom,
			left,
		} = self.0;
		if top == right && top == bottom && top == left {
			write!(f, "{top}")
		} else {
			write!(f, "{top} {right} {bottom} {left}")
		}
	}
}

impl<'de> Deserialize<'de> for CssBox {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		match LengthRepr::deserialize(deserializer)? {
			LengthRepr::Number(v) => Ok(CssLength::Px(v).into()),
			LengthRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
		}
	}
}

impl Serialize for CssBox {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

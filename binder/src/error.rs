use crate::measure::ProbeError;

#[derive(Debug, thiserror::Error)]
pub enum PaginatorError {
	#[error("Layout unavailable: {0}")]
	LayoutUnavailable(#[from] ProbeError),
}

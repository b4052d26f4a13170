use std::path::PathBuf;

pub(crate) const DEFAULT_BINDER_CONFIG: &str = r#"
viewport_width = 800.0
viewport_height = 600.0
font_size = "16px"
writing_mode = "horizontal-tb"
line_height = 1.6
margin = "0"
padding = "16px"
text_unit_step = 24
"#;

pub(crate) const CONFIG_FILE_NAME: &str = "binder.toml";
pub(crate) const STATE_FILE_NAME: &str = "reading_state.json";
pub(crate) const ENV_PREFIX: &str = "BINDER";

#[derive(Debug)]
pub struct Paths {
	pub config_path: PathBuf,
	pub data_path: PathBuf,
}

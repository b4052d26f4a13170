pub mod bookmarks;
pub mod settings;

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use binder::PaginationSettings;
use expand_tilde::expand_tilde_owned;

use crate::bookmarks::BookmarkStore;
use crate::settings::CONFIG_FILE_NAME;
use crate::settings::DEFAULT_BINDER_CONFIG;
use crate::settings::ENV_PREFIX;
use crate::settings::Paths;
use crate::settings::STATE_FILE_NAME;

#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
	#[error(transparent)]
	Config(#[from] config::ConfigError),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	ExpandTilde(#[from] expand_tilde::Error),
	#[error("at {1}: {0}")]
	Io(std::io::Error, &'static std::panic::Location<'static>),
	#[error("Data path is not directory: {0}")]
	DataPathNotDir(PathBuf),
}

impl From<std::io::Error> for ScribeError {
	#[track_caller]
	fn from(err: std::io::Error) -> Self {
		Self::Io(err, std::panic::Location::caller())
	}
}

/// Loads pagination settings from the built-in defaults, an optional
/// `binder.toml` in `config_dir` and `BINDER_*` environment variables.
pub fn load_settings(config_dir: impl Into<PathBuf>) -> Result<PaginationSettings, ScribeError> {
	let config_path = expand_tilde_owned(config_dir.into())?.join(CONFIG_FILE_NAME);
	log::debug!("Load settings from {}", config_path.display());
	let settings = config::Config::builder()
		.add_source(config::File::from_str(
			DEFAULT_BINDER_CONFIG,
			config::FileFormat::Toml,
		))
		.add_source(config::File::from(config_path).required(false))
		.add_source(
			config::Environment::with_prefix(ENV_PREFIX)
				.prefix_separator("_")
				.separator("__")
				.try_parsing(true),
		)
		.build()?
		.try_deserialize()?;
	Ok(settings)
}

/// Settings and reading state of one book.
#[derive(Debug)]
pub struct Scribe {
	settings: PaginationSettings,
	store: BookmarkStore,
}

impl Scribe {
	pub fn create(paths: &Paths, book_id: &str) -> Result<Self, ScribeError> {
		log::info!("Create scribe for {book_id} with {paths:?}");
		let settings = load_settings(&paths.config_path)?;

		let data_path = expand_tilde_owned(paths.data_path.clone())?;
		if !data_path.try_exists()? {
			fs::create_dir_all(&data_path)?;
		}
		if !data_path.is_dir() {
			return Err(ScribeError::DataPathNotDir(data_path.to_path_buf()));
		}
		let store = BookmarkStore::open(state_path(&data_path, book_id))?;
		Ok(Self { settings, store })
	}

	pub fn settings(&self) -> &PaginationSettings {
		&self.settings
	}

	pub fn store(&self) -> &BookmarkStore {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut BookmarkStore {
		&mut self.store
	}
}

fn state_path(data_path: &Path, book_id: &str) -> PathBuf {
	let dir = book_id
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
		.collect::<String>();
	data_path.join(dir).join(STATE_FILE_NAME)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use binder::WritingMode;
	use binder::css::CssBox;
	use binder::css::CssLength;

	use crate::Scribe;
	use crate::load_settings;
	use crate::settings::Paths;
	use crate::state_path;

	fn scratch_dir(name: &str) -> std::path::PathBuf {
		let dir = std::env::temp_dir().join(format!("scribe-{name}-{}", std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn test_load_settings_defaults() {
		let _ = env_logger::try_init();
		let dir = scratch_dir("defaults");
		let settings = load_settings(&dir).unwrap();
		assert_eq!(binder::PaginationSettings::default(), settings);
		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn test_load_settings_file_overrides() {
		let _ = env_logger::try_init();
		let dir = scratch_dir("overrides");
		fs::write(
			dir.join("binder.toml"),
			"viewport_width = 1024\nwriting_mode = \"vertical\"\npadding = \"8px 4px\"\nfont_size = \"1.25em\"\n",
		)
		.unwrap();
		let settings = load_settings(&dir).unwrap();
		assert_eq!(1024.0, settings.viewport_width);
		assert_eq!(600.0, settings.viewport_height);
		assert_eq!(WritingMode::VerticalRl, settings.writing_mode);
		assert_eq!(CssLength::Em(1.25), settings.font_size);
		assert_eq!(
			"8px 4px".parse::<CssBox>().unwrap(),
			settings.padding
		);
		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn test_scribe_create() {
		let _ = env_logger::try_init();
		let dir = scratch_dir("create");
		let paths = Paths {
			config_path: dir.join("config"),
			data_path: dir.join("data"),
		};
		let scribe = Scribe::create(&paths, "urn:isbn:978-0").unwrap();
		assert!(paths.data_path.is_dir());
		assert!(scribe.store().position().is_none());
		assert_eq!(800.0, scribe.settings().viewport_width);
		assert_eq!(
			paths.data_path.join("urn_isbn_978-0").join("reading_state.json"),
			state_path(&paths.data_path, "urn:isbn:978-0")
		);
		let _ = fs::remove_dir_all(&dir);
	}
}

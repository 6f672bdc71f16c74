//! State shared by the translation commands.

use amadon::config::ConfigFile;
use amadon::translations::{
    Catalog, CatalogRefresher, HttpTransport, Settings, SlotAssignment, TranslationsConfig,
};

use crate::error::CliError;

/// Configuration, settings and paths for one CLI invocation.
///
/// Settings are only ever changed here, on the main thread.
pub struct Context {
    pub config: ConfigFile,
    pub translations: TranslationsConfig,
    pub settings: Settings,
}

impl Context {
    /// Load the config file and the persisted settings.
    pub fn load() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let translations = config.translations_config();
        let settings = Settings::load_or_default(&translations.settings_path());
        Ok(Self {
            config,
            translations,
            settings,
        })
    }

    /// Load the catalog from the configured candidates.
    pub fn catalog(&self) -> Result<Catalog, CliError> {
        let mut cache = self
            .translations
            .catalog_cache(self.settings.catalog_path.as_deref());
        Ok(cache.get()?.clone())
    }

    /// Current slots, with defaults applied.
    pub fn slots(&self, catalog: &Catalog) -> Result<SlotAssignment, CliError> {
        Ok(SlotAssignment::resolve(self.settings.persisted_slots(), catalog)?)
    }

    /// Persist a slot assignment.
    pub fn save_slots(&mut self, slots: &SlotAssignment) -> Result<(), CliError> {
        self.settings.store_slots(slots);
        self.settings.save(&self.translations.settings_path())?;
        Ok(())
    }

    /// Catalog refresher, or a configuration error naming the key to set.
    pub fn refresher(&self) -> Result<CatalogRefresher<HttpTransport>, CliError> {
        self.translations.refresher()?.ok_or_else(|| {
            CliError::Config(
                "No catalog URL configured. Use 'amadon config set translations.catalog_url <URL>'."
                    .to_string(),
            )
        })
    }
}

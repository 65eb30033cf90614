//! Configuration module for Audiube.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    GeneralSettings, ServerSettings, Settings, StoreProvider, StoreSettings, ToolSettings,
    YoutubeSettings, STORE_URL_ENV, YOUTUBE_API_KEY_ENV,
};

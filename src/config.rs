// config.rs — command line / environment configuration

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which page layout to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageVariant {
    /// Full-window viewer with the floor-plan modal and room dropdown.
    Tour,
    /// Fixed-size viewer frame with floor/room dropdowns and a fullscreen toggle.
    Embedded,
}

/// How info-marker tooltips open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TooltipMode {
    /// Shown while the pointer is over the marker.
    Hover,
    /// Toggled by clicking (touch screens).
    Click,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "hospital_tour", version, about = "360° virtual tour of the hospital building")]
pub struct Config {
    /// Catalog JSON replacing the built-in floors and rooms.
    #[arg(long, env = "TOUR_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory that catalog image references (e.g. /panos/x.jpg) resolve against.
    #[arg(long, env = "TOUR_ASSETS", default_value = "public")]
    pub assets_root: PathBuf,

    /// UI language (id, en).
    #[arg(long, env = "TOUR_LANG", default_value = crate::i18n::FALLBACK_LANG)]
    pub lang: String,

    #[arg(long, env = "TOUR_VARIANT", value_enum, default_value_t = PageVariant::Tour)]
    pub variant: PageVariant,

    #[arg(long, env = "TOUR_TOOLTIPS", value_enum, default_value_t = TooltipMode::Hover)]
    pub tooltips: TooltipMode,

    /// Refuse to start when a navigation marker points at a missing room.
    #[arg(long, env = "TOUR_STRICT_CATALOG")]
    pub strict_catalog: bool,

    /// Delay before the viewer re-measures itself after a fullscreen toggle.
    #[arg(long, env = "TOUR_LAYOUT_DELAY_MS", default_value_t = 300)]
    pub layout_delay_ms: u64,
}

impl Config {
    pub fn layout_delay(&self) -> Duration {
        Duration::from_millis(self.layout_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["hospital_tour"]).unwrap();
        assert_eq!(config.assets_root, PathBuf::from("public"));
        assert_eq!(config.variant, PageVariant::Tour);
        assert_eq!(config.tooltips, TooltipMode::Hover);
        assert!(!config.strict_catalog);
        assert_eq!(config.layout_delay(), Duration::from_millis(300));
    }

    #[test]
    fn variant_and_tooltips_parse() {
        let config = Config::try_parse_from([
            "hospital_tour",
            "--variant",
            "embedded",
            "--tooltips",
            "click",
            "--catalog",
            "floors.json",
        ])
        .unwrap();
        assert_eq!(config.variant, PageVariant::Embedded);
        assert_eq!(config.tooltips, TooltipMode::Click);
        assert_eq!(config.catalog, Some(PathBuf::from("floors.json")));
    }
}

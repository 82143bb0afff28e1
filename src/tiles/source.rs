use crate::core::geo::TileCoord;
use crate::tiles::registry::{MapStyle, TileLayerConfig};

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Expands a registry URL template (`{s}`, `{z}`, `{x}`, `{y}`, `{r}`).
pub struct TemplateSource {
    config: &'static TileLayerConfig,
    retina: bool,
}

impl TemplateSource {
    pub fn new(config: &'static TileLayerConfig) -> Self {
        Self {
            config,
            retina: false,
        }
    }

    pub fn for_style(style: MapStyle) -> Self {
        Self::new(style.config())
    }

    /// Request `@2x` tiles where the template has an `{r}` slot
    pub fn with_retina(mut self, retina: bool) -> Self {
        self.retina = retina;
        self
    }
}

impl TileSource for TemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let subdomains = self.config.subdomains;
        // Rotate subdomains so neighbouring tiles spread across hosts
        let sub = if subdomains.is_empty() {
            ""
        } else {
            subdomains[((coord.x + coord.y) % subdomains.len() as u32) as usize]
        };

        self.config
            .url_template
            .replace("{s}", sub)
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{r}", if self.retina { "@2x" } else { "" })
    }
}

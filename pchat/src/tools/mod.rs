//! Built-in tools: weather lookup, image generation, and user memory.

mod image;
mod memory;
mod weather;

use std::sync::Arc;

use ptooling::{ToolKind, ToolRegistry};

use crate::{ChatStore, ObjectStorage};

pub use image::{
    IMAGE_FAILURE_MESSAGE, ImageSynthesizer, ImageTool, TOGETHER_BASE_URL,
    TogetherImageSynthesizer,
};
pub use memory::{MEMORY_FAILURE_MESSAGE, MemoryTool};
pub use weather::{ForecastSource, OPEN_METEO_BASE_URL, OpenMeteoForecast, WeatherTool};

/// Collaborators the built-in tools need. Without an image synthesizer
/// `generateImage` is left unregistered.
#[derive(Clone)]
pub struct BuiltinToolDeps {
    pub forecast: Arc<dyn ForecastSource>,
    pub images: Option<Arc<dyn ImageSynthesizer>>,
    pub objects: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn ChatStore>,
}

/// A registry holding every built-in tool the dependencies allow.
pub fn builtin_tools(deps: BuiltinToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for kind in ToolKind::ALL {
        match kind {
            ToolKind::Weather => registry.register(WeatherTool::new(deps.forecast.clone())),
            ToolKind::GenerateImage => {
                if let Some(images) = &deps.images {
                    registry.register(ImageTool::new(images.clone(), deps.objects.clone()));
                }
            }
            ToolKind::UpdateMemory => registry.register(MemoryTool::new(deps.store.clone())),
        }
    }
    registry
}

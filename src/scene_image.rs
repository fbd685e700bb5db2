//! # Image Resolution
//!
//! Decides which image a scene shows once revealed.
//!
//! Only remote `http(s)` URLs with a host and local-object references
//! (`blob:`, `file:`) are used as given. Everything else, including a missing
//! reference, resolves to [`FALLBACK_IMAGE`]. A load failure at display time
//! swaps the slot to the fallback too; none of this reaches the playback state.

use crate::AssetLoader;
use narrator_schema::Scene;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Local asset shown whenever a scene image is missing, unusable or broken.
pub const FALLBACK_IMAGE: &str = "/placeholder-image.jpg";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    Missing,
    Unsupported,
    LoadFailed,
}

/// True for `http(s)` URLs with a host and for `blob:` / `file:` references.
pub fn is_usable_image_ref(reference: &str) -> bool {
    match Url::parse(reference) {
        Ok(url) => match url.scheme() {
            "http" | "https" => url.host_str().is_some_and(|h| !h.is_empty()),
            "blob" | "file" => true,
            _ => false,
        },
        Err(_) => false,
    }
}

/// Returns `reference` unchanged when usable, otherwise [`FALLBACK_IMAGE`].
pub fn resolve_image_src(reference: Option<&str>) -> &str {
    match reference {
        Some(r) if is_usable_image_ref(r) => r,
        _ => FALLBACK_IMAGE,
    }
}

/// The image shown for one scene instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageSlot {
    scene_id: String,
    requested: Option<String>,
    src: String,
    fallback: Option<FallbackReason>,
}

impl ImageSlot {
    pub fn for_scene(scene: &Scene) -> Self {
        let requested = scene.image_url.clone();
        let fallback = match requested.as_deref() {
            None | Some("") => Some(FallbackReason::Missing),
            Some(r) if !is_usable_image_ref(r) => Some(FallbackReason::Unsupported),
            Some(_) => None,
        };
        let src = resolve_image_src(requested.as_deref()).to_string();

        Self {
            scene_id: scene.scene_id.clone(),
            requested,
            src,
            fallback,
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    /// The reference as it appeared on the scene.
    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// What should actually be displayed.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        self.fallback
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Switches to the fallback after a display-time failure.
    ///
    /// Returns `false` when already showing the fallback, so a broken fallback
    /// asset cannot loop.
    pub fn fall_back(&mut self) -> bool {
        if self.is_fallback() {
            return false;
        }
        self.src = FALLBACK_IMAGE.to_string();
        self.fallback = Some(FallbackReason::LoadFailed);
        true
    }

    /// Decodes local images through `loader` and falls back when that fails.
    ///
    /// Remote and `blob:` images are left for the presentation layer to load.
    /// Returns `true` when the slot switched to the fallback.
    pub fn verify_with(&mut self, loader: &dyn AssetLoader) -> bool {
        if self.is_fallback() || !self.src.starts_with("file:") {
            return false;
        }

        let decoded = loader
            .load_bytes(&self.src)
            .and_then(|bytes| Ok(image::load_from_memory(&bytes)?));

        match decoded {
            Ok(img) => {
                debug!(
                    scene_id = %self.scene_id,
                    width = img.width(),
                    height = img.height(),
                    "Verified scene image"
                );
                false
            }
            Err(e) => {
                debug!(scene_id = %self.scene_id, "Image verification failed: {}", e);
                self.fall_back()
            }
        }
    }
}

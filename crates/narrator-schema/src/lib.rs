//! # Scene Schema
//!
//! The data model consumed by the playback engine: narrated [`Scene`]s and
//! the ordered, shared [`SceneSequence`] they live in.
//!
//! Field names on the wire are camelCase (`sceneId`, `imageUrl`, `audioUrl`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Scene at index {index} has an empty sceneId")]
    EmptySceneId { index: usize },
    #[error("Duplicate sceneId '{scene_id}' at index {index}")]
    DuplicateSceneId { scene_id: String, index: usize },
    #[error("Scene '{scene_id}' has an empty script")]
    EmptyScript { scene_id: String },
    #[error("Invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One narrated unit: script text, an optional image and optional voice-over.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Stable identifier, used as the re-render and resubscription key.
    pub scene_id: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Absent means the scene has no narration and never auto-advances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Scene {
    pub fn new(scene_id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            script: script.into(),
            image_url: None,
            audio_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    /// True when the scene carries a non-empty narration source.
    pub fn has_narration(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// An ordered, immutable list of scenes shared by reference.
///
/// Cloning is cheap and keeps the same identity; [`SceneSequence::same_as`]
/// tells whether two handles point at the same underlying data, which is how
/// the engine decides that "new data arrived".
#[derive(Clone, Default)]
pub struct SceneSequence {
    scenes: Arc<[Scene]>,
}

impl SceneSequence {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes: scenes.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON array of scenes.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let scenes: Vec<Scene> = serde_json::from_str(json)?;
        let sequence = Self::new(scenes);
        sequence.validate()?;
        Ok(sequence)
    }

    /// Reads, parses and validates a JSON scene file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(&*self.scenes)?)
    }

    /// Checks identifier uniqueness and non-empty scripts.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for (index, scene) in self.scenes.iter().enumerate() {
            if scene.scene_id.is_empty() {
                return Err(SchemaError::EmptySceneId { index });
            }
            if !seen.insert(scene.scene_id.as_str()) {
                return Err(SchemaError::DuplicateSceneId {
                    scene_id: scene.scene_id.clone(),
                    index,
                });
            }
            if scene.script.trim().is_empty() {
                return Err(SchemaError::EmptyScript {
                    scene_id: scene.scene_id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// Index of the final scene, `None` when empty.
    pub fn last_index(&self) -> Option<usize> {
        self.scenes.len().checked_sub(1)
    }

    pub fn same_as(&self, other: &SceneSequence) -> bool {
        Arc::ptr_eq(&self.scenes, &other.scenes)
    }

    /// Returns a new sequence (new identity) with `f` applied to every scene.
    pub fn map_scenes(&self, f: impl FnMut(&Scene) -> Scene) -> Self {
        Self::new(self.scenes.iter().map(f).collect())
    }
}

impl Deref for SceneSequence {
    type Target = [Scene];

    fn deref(&self) -> &[Scene] {
        &self.scenes
    }
}

impl From<Vec<Scene>> for SceneSequence {
    fn from(scenes: Vec<Scene>) -> Self {
        Self::new(scenes)
    }
}

impl fmt::Debug for SceneSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.scenes.iter()).finish()
    }
}

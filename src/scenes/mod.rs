//! Scripted popup scenes.
//!
//! A scene is a page of markup, the selectors bound on it and a pointer
//! script. [`ScenePlugin`] spawns the page and queues its bindings for the
//! popup plugin; [`replay`] then drives the script and snapshots every popup
//! after each step.
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    dom::{
        markup::{spawn_markup, MarkupNode},
        world::{dispatch_pointer, is_shown},
        Document, ElementTree, PointerTransition, Selector,
    },
    systems::popup::{HoverPopupBindings, PopupSystem},
};

const DEMO_SCENE_JSON: &str = include_str!("./content/tooltip_demo.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopupScene {
    #[serde(default)]
    pub markup: Vec<MarkupNode>,
    #[serde(default)]
    pub bind: Vec<String>,
    #[serde(default)]
    pub script: Vec<PointerStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointerStep {
    pub pointer: PointerTransition,
    pub target: String,
}

impl PopupScene {
    pub fn demo() -> Result<Self, SceneError> {
        Self::from_json(DEMO_SCENE_JSON)
    }

    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        serde_json::from_str(text).map_err(SceneError::Parse)
    }

    pub fn from_file(path: &Path) -> Result<Self, SceneError> {
        let text = fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[derive(Debug)]
pub enum SceneError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read scene {}: {source}", path.display())
            }
            Self::Parse(error) => write!(f, "failed to parse scene: {error}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(error) => Some(error),
        }
    }
}

#[derive(Resource, Debug, Clone)]
struct PendingScene {
    markup: Vec<MarkupNode>,
    bind: Vec<String>,
}

pub struct ScenePlugin {
    pub scene: PopupScene,
}

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PendingScene {
            markup: self.scene.markup.clone(),
            bind: self.scene.bind.clone(),
        })
        .add_systems(Startup, spawn_scene.in_set(PopupSystem::SpawnMarkup));
    }
}

/// Spawns the page and appends its selectors to whatever bindings the app
/// already holds.
fn spawn_scene(world: &mut World) {
    let Some(PendingScene { markup, bind }) = world.remove_resource::<PendingScene>() else {
        return;
    };
    let roots = spawn_markup(world, &markup);
    info!("spawned scene markup with {} root element(s)", roots.len());

    world
        .get_resource_or_insert_with(HoverPopupBindings::default)
        .0
        .extend(bind);
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PopupState {
    /// Id of the nearest ancestor that has one.
    pub owner: Option<String>,
    pub shown: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepReport {
    pub step: usize,
    pub pointer: PointerTransition,
    pub target: String,
    pub delivered: usize,
    pub popups: Vec<PopupState>,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3}: {} `{}` ({} element(s)) |",
            self.step, self.pointer, self.target, self.delivered
        )?;
        for popup in &self.popups {
            let owner = popup.owner.as_deref().unwrap_or("?");
            let state = if popup.shown { "shown" } else { "hidden" };
            write!(f, " #{owner}={state}")?;
        }
        Ok(())
    }
}

fn owner_id(world: &World, popup: Entity) -> Option<&str> {
    let mut cursor = world.parent(popup);
    while let Some(ancestor) = cursor {
        if let Some(id) = ElementTree::id(world, ancestor) {
            return Some(id);
        }
        cursor = world.parent(ancestor);
    }
    None
}

pub fn popup_states(world: &mut World, marker_class: &str) -> Vec<PopupState> {
    let popups = world.select(&Selector::class(marker_class));
    popups
        .into_iter()
        .map(|popup| PopupState {
            owner: owner_id(world, popup).map(str::to_owned),
            shown: is_shown(world, popup),
        })
        .collect()
}

/// Delivers each step to every element its target selector matches, then
/// records the state of every `marker_class` element.
pub fn replay(world: &mut World, script: &[PointerStep], marker_class: &str) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(script.len());

    for (index, step) in script.iter().enumerate() {
        let delivered = match step.target.parse::<Selector>() {
            Ok(selector) => {
                let targets = world.select(&selector);
                for &target in &targets {
                    dispatch_pointer(world, target, step.pointer);
                }
                targets.len()
            }
            Err(error) => {
                warn!("skipping step {index}: target `{}` is not a selector: {error}", step.target);
                0
            }
        };

        reports.push(StepReport {
            step: index,
            pointer: step.pointer,
            target: step.target.clone(),
            delivered,
            popups: popup_states(world, marker_class),
        });
    }

    reports
}

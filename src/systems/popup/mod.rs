//! Hover-triggered popups.
//!
//! Binding a selector registers, for each element it matches at bind time,
//! a pointer-enter handler that shows the element's marker-class descendant
//! and a pointer-leave handler that hides it. The descendant is looked up
//! through the target's id every time a handler runs, the same way the
//! markup contract addresses it (`#<id> .popup`).
//!
//! Nothing here fails: bad selectors, targets without an id and targets
//! without a popup are logged and otherwise ignored.
use std::sync::Arc;

use bevy::{ecs::system::Command, prelude::*};

use crate::{
    data::config::{HoverPopupConfig, MultiplePopups},
    dom::{DisplayState, Document, PointerTransition, Selector},
};

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum PopupSystem {
    SpawnMarkup,
    Bind,
}

/// Selectors bound once during `Startup`, after markup has been spawned.
///
/// Systems in [`PopupSystem::SpawnMarkup`] may still append to it, which is
/// how scenes add their own selectors.
#[derive(Resource, Debug, Clone, Default)]
pub struct HoverPopupBindings(pub Vec<String>);

pub struct HoverPopupPlugin;

impl Plugin for HoverPopupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HoverPopupConfig>()
            .init_resource::<HoverPopupBindings>()
            .configure_sets(Startup, PopupSystem::SpawnMarkup.before(PopupSystem::Bind))
            .add_systems(Startup, bind_startup_selectors.in_set(PopupSystem::Bind));
    }
}

fn bind_startup_selectors(world: &mut World) {
    let selectors = match world.get_resource_mut::<HoverPopupBindings>() {
        Some(mut bindings) => std::mem::take(&mut bindings.0),
        None => return,
    };

    let binder = world
        .get_resource::<HoverPopupConfig>()
        .map(HoverPopupBinder::new)
        .unwrap_or_default();
    for selector in &selectors {
        binder.bind(world, selector);
    }
}

/// Binds a selector from `Commands`, using the current [`HoverPopupConfig`].
#[derive(Debug, Clone)]
pub struct BindHoverPopup {
    selector: String,
}

impl BindHoverPopup {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

impl Command for BindHoverPopup {
    fn apply(self, world: &mut World) {
        let binder = world
            .get_resource::<HoverPopupConfig>()
            .map(HoverPopupBinder::new)
            .unwrap_or_default();
        binder.bind(world, &self.selector);
    }
}

#[derive(Debug, Clone)]
struct PopupLookup {
    marker_class: Arc<str>,
    multiple: MultiplePopups,
}

impl PopupLookup {
    fn apply<D: Document>(&self, document: &mut D, target: D::Element, display: DisplayState) {
        let Some(id) = document.element_id(target).map(str::to_owned) else {
            debug!("hover target {target:?} has no id; no popup to toggle");
            return;
        };

        let popups = document.select(&Selector::scoped_class(&id, &self.marker_class));
        let Some(&first) = popups.first() else {
            debug!("#{id} has no `.{}` descendant", self.marker_class);
            return;
        };

        match self.multiple {
            MultiplePopups::First => {
                let tree: &D = document;
                let owned: Vec<D::Element> = popups
                    .iter()
                    .copied()
                    .filter(|&popup| nearest_identified_ancestor(tree, popup) == Some(target))
                    .collect();
                if owned.len() > 1 {
                    warn!(
                        "#{id} owns {} `.{}` descendants; toggling the first and ignoring {:?}",
                        owned.len(),
                        self.marker_class,
                        &owned[1..]
                    );
                }
                document.set_display(owned.first().copied().unwrap_or(first), display);
            }
            MultiplePopups::All => {
                for popup in &popups {
                    document.set_display(*popup, display);
                }
            }
        }
    }
}

/// Closest ancestor of `element` that carries an id. A popup belongs to it.
fn nearest_identified_ancestor<D: Document>(document: &D, element: D::Element) -> Option<D::Element> {
    let mut cursor = document.parent_element(element);
    while let Some(ancestor) = cursor {
        if document.element_id(ancestor).is_some() {
            return Some(ancestor);
        }
        cursor = document.parent_element(ancestor);
    }
    None
}

#[derive(Debug, Clone)]
pub struct HoverPopupBinder {
    lookup: PopupLookup,
}

impl Default for HoverPopupBinder {
    fn default() -> Self {
        Self::new(&HoverPopupConfig::default())
    }
}

impl HoverPopupBinder {
    pub fn new(config: &HoverPopupConfig) -> Self {
        Self {
            lookup: PopupLookup {
                marker_class: Arc::from(config.marker_class.as_str()),
                multiple: config.multiple,
            },
        }
    }

    pub fn marker_class(&self) -> &str {
        &self.lookup.marker_class
    }

    /// Makes every element currently matching `selector` show its popup on
    /// pointer-enter and hide it on pointer-leave.
    pub fn bind<D: Document + 'static>(&self, document: &mut D, selector: &str) {
        match Selector::parse(selector) {
            Ok(selector) => self.bind_selector(document, &selector),
            Err(error) => warn!("cannot bind hover popups to `{selector}`: {error}"),
        }
    }

    pub fn bind_selector<D: Document + 'static>(&self, document: &mut D, selector: &Selector) {
        let targets = document.select(selector);
        if targets.is_empty() {
            debug!("hover popup selector `{selector}` matched no elements");
            return;
        }

        for &target in &targets {
            if document.element_id(target).is_none() {
                warn!("{target:?} matches `{selector}` but has no id; its popup cannot be found");
            }
            for transition in PointerTransition::ALL {
                let lookup = self.lookup.clone();
                document.on_pointer(target, transition, move |document, target| {
                    lookup.apply(document, target, transition.display());
                });
            }
        }
        debug!("bound hover popups for {} element(s) matching `{selector}`", targets.len());
    }
}

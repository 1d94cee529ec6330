//! Document capability used by the popup binder.
//!
//! The binder never touches a concrete element store. Everything it needs
//! goes through [`Document`]: selecting elements, reading an element's
//! identifier, registering pointer handlers and flipping visibility.
//! [`world`] implements it over a Bevy `World`; tests use an in-memory fake.
use std::fmt::Debug;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod markup;
pub mod selector;
pub mod world;

#[cfg(test)]
pub(crate) mod fake;

pub use selector::{ElementTree, Selector, SelectorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerTransition {
    Enter,
    Leave,
}

impl PointerTransition {
    pub const ALL: [PointerTransition; 2] = [PointerTransition::Enter, PointerTransition::Leave];

    /// Display state a popup takes when its target sees this transition.
    pub const fn display(self) -> DisplayState {
        match self {
            Self::Enter => DisplayState::Shown,
            Self::Leave => DisplayState::Hidden,
        }
    }
}

impl std::fmt::Display for PointerTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enter => write!(f, "enter"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

/// Visibility flag of an element, the equivalent of `display: none`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DisplayState {
    #[default]
    Shown,
    Hidden,
}

impl DisplayState {
    pub const fn is_shown(self) -> bool {
        matches!(self, Self::Shown)
    }
}

pub trait Document {
    type Element: Copy + Eq + Debug + Send + Sync + 'static;

    /// Elements matching `selector`, in document order.
    fn select(&mut self, selector: &Selector) -> Vec<Self::Element>;

    fn element_id(&self, element: Self::Element) -> Option<&str>;

    fn parent_element(&self, element: Self::Element) -> Option<Self::Element>;

    /// Registers `handler` to run every time `element` sees `transition`.
    fn on_pointer<F>(&mut self, element: Self::Element, transition: PointerTransition, handler: F)
    where
        F: Fn(&mut Self, Self::Element) + Send + Sync + 'static;

    fn set_display(&mut self, element: Self::Element, display: DisplayState);
}

//! Hover-triggered popups over an ECS document.
//!
//! Elements matched by a selector show their `.popup` descendant while the
//! pointer is over them and hide it again when the pointer leaves. See
//! [`systems::popup::HoverPopupBinder`] for the binding itself and [`dom`]
//! for the document it works against.
pub mod data;
pub mod dom;
pub mod scenes;
pub mod systems;

//! Behavior layered on top of the document.
pub mod popup;

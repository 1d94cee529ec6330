//! In-memory `Document` for exercising the binder without an ECS world.
use std::sync::Arc;

use super::{DisplayState, Document, ElementTree, PointerTransition, Selector};

type Handler = Arc<dyn Fn(&mut FakeDocument, usize) + Send + Sync>;

#[derive(Debug, Clone)]
struct FakeNode {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<usize>,
    display: DisplayState,
}

#[derive(Default)]
pub struct FakeDocument {
    nodes: Vec<FakeNode>,
    handlers: Vec<(usize, PointerTransition, Handler)>,
    pub display_writes: usize,
}

impl FakeDocument {
    /// Appends an element; nodes are numbered in insertion order, which is
    /// also their document order as long as children follow parents.
    pub fn add(&mut self, parent: Option<usize>, tag: &str, id: Option<&str>, classes: &[&str]) -> usize {
        self.nodes.push(FakeNode {
            tag: tag.to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|class| class.to_string()).collect(),
            parent,
            display: DisplayState::Shown,
        });
        self.nodes.len() - 1
    }

    pub fn hide(&mut self, node: usize) {
        self.nodes[node].display = DisplayState::Hidden;
    }

    pub fn display(&self, node: usize) -> DisplayState {
        self.nodes[node].display
    }

    pub fn handler_count(&self, node: usize) -> usize {
        self.handlers.iter().filter(|(target, _, _)| *target == node).count()
    }

    pub fn fire(&mut self, node: usize, transition: PointerTransition) {
        let handlers: Vec<Handler> = self
            .handlers
            .iter()
            .filter(|(target, kind, _)| *target == node && *kind == transition)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(self, node);
        }
    }
}

impl ElementTree for FakeDocument {
    type Node = usize;

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes.get(node)?.parent
    }

    fn tag(&self, node: usize) -> Option<&str> {
        self.nodes.get(node).map(|node| node.tag.as_str())
    }

    fn id(&self, node: usize) -> Option<&str> {
        self.nodes.get(node)?.id.as_deref()
    }

    fn has_class(&self, node: usize, class: &str) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|node| node.classes.iter().any(|candidate| candidate == class))
    }
}

impl Document for FakeDocument {
    type Element = usize;

    fn select(&mut self, selector: &Selector) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|node| selector.matches(&*self, *node))
            .collect()
    }

    fn element_id(&self, element: usize) -> Option<&str> {
        self.id(element)
    }

    fn parent_element(&self, element: usize) -> Option<usize> {
        self.parent(element)
    }

    fn on_pointer<F>(&mut self, element: usize, transition: PointerTransition, handler: F)
    where
        F: Fn(&mut Self, usize) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.handlers.push((element, transition, handler));
    }

    fn set_display(&mut self, element: usize, display: DisplayState) {
        if let Some(node) = self.nodes.get_mut(element) {
            node.display = display;
            self.display_writes += 1;
        }
    }
}

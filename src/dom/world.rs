//! ECS-backed document.
//!
//! Elements are entities carrying [`Element`]; nesting uses Bevy's
//! `ChildOf`/`Children` relationship. Pointer transitions are the entity
//! events [`PointerEnter`] and [`PointerLeave`], delivered to per-entity
//! observers. Handlers registered through [`Document::on_pointer`] run as
//! queued commands, so they get the whole `World` mutably.
use std::sync::Arc;

use bevy::prelude::*;
use smallvec::SmallVec;

use super::{DisplayState, Document, ElementTree, PointerTransition, Selector};

#[derive(Component, Debug, Clone, PartialEq, Eq)]
#[require(DisplayState)]
pub struct Element {
    pub tag: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList(pub SmallVec<[String; 2]>);

impl ClassList {
    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|candidate| candidate == class)
    }
}

impl<S: Into<String>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Pre-order position in the document, assigned when markup is spawned.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentIndex(pub u32);

#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct TextContent(pub String);

/// Next free [`DocumentIndex`].
#[derive(Resource, Debug, Default)]
pub struct DocumentOrder {
    pub next: u32,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct PointerEnter;

#[derive(Event, Debug, Clone, Copy)]
pub struct PointerLeave;

type WorldHandler = Arc<dyn Fn(&mut World, Entity) + Send + Sync>;

fn observe_transition<E: Event>(entity: &mut EntityWorldMut, handler: WorldHandler) {
    entity.observe(move |trigger: Trigger<E>, mut commands: Commands| {
        let handler = Arc::clone(&handler);
        let target = trigger.target();
        commands.queue(move |world: &mut World| handler(world, target));
    });
}

/// Delivers a pointer transition to `element` and runs every handler it
/// triggers before returning.
pub fn dispatch_pointer(world: &mut World, element: Entity, transition: PointerTransition) {
    match transition {
        PointerTransition::Enter => world.trigger_targets(PointerEnter, element),
        PointerTransition::Leave => world.trigger_targets(PointerLeave, element),
    }
    world.flush();
}

/// Elements without a [`DisplayState`] count as shown.
pub fn is_shown(world: &World, element: Entity) -> bool {
    world
        .get::<DisplayState>(element)
        .is_none_or(|display| display.is_shown())
}

impl ElementTree for World {
    type Node = Entity;

    fn parent(&self, node: Entity) -> Option<Entity> {
        self.get::<ChildOf>(node).map(|child_of| child_of.parent())
    }

    fn tag(&self, node: Entity) -> Option<&str> {
        self.get::<Element>(node).map(|element| element.tag.as_str())
    }

    fn id(&self, node: Entity) -> Option<&str> {
        self.get::<ElementId>(node).map(|id| id.0.as_str())
    }

    fn has_class(&self, node: Entity, class: &str) -> bool {
        self.get::<ClassList>(node)
            .is_some_and(|classes| classes.contains(class))
    }
}

impl Document for World {
    type Element = Entity;

    fn select(&mut self, selector: &Selector) -> Vec<Entity> {
        let mut elements: Vec<(Entity, Option<u32>)> = self
            .query_filtered::<(Entity, Option<&DocumentIndex>), With<Element>>()
            .iter(self)
            .map(|(entity, index)| (entity, index.map(|index| index.0)))
            .collect();
        elements.sort_by_key(|(entity, index)| (index.unwrap_or(u32::MAX), entity.index()));

        let world: &World = self;
        elements
            .into_iter()
            .map(|(entity, _)| entity)
            .filter(|entity| selector.matches(world, *entity))
            .collect()
    }

    fn element_id(&self, element: Entity) -> Option<&str> {
        // `World::id` is the world's own id; go through the trait.
        ElementTree::id(self, element)
    }

    fn parent_element(&self, element: Entity) -> Option<Entity> {
        ElementTree::parent(self, element)
    }

    fn on_pointer<F>(&mut self, element: Entity, transition: PointerTransition, handler: F)
    where
        F: Fn(&mut Self, Entity) + Send + Sync + 'static,
    {
        let Ok(mut entity) = self.get_entity_mut(element) else {
            warn!("cannot observe pointer {transition} on missing element {element}");
            return;
        };

        let handler: WorldHandler = Arc::new(handler);
        match transition {
            PointerTransition::Enter => observe_transition::<PointerEnter>(&mut entity, handler),
            PointerTransition::Leave => observe_transition::<PointerLeave>(&mut entity, handler),
        }
    }

    fn set_display(&mut self, element: Entity, display: DisplayState) {
        let Ok(mut entity) = self.get_entity_mut(element) else {
            debug!("display of missing element {element} left untouched");
            return;
        };

        match entity.get_mut::<DisplayState>() {
            Some(mut current) => {
                current.set_if_neq(display);
            }
            None => {
                entity.insert(display);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn spawn(
        world: &mut World,
        index: u32,
        parent: Option<Entity>,
        tag: &str,
        id: Option<&str>,
        classes: &[&str],
    ) -> Entity {
        let mut entity = world.spawn((
            Element::new(tag),
            DocumentIndex(index),
            classes.iter().copied().collect::<ClassList>(),
        ));
        if let Some(id) = id {
            entity.insert(ElementId(id.to_string()));
        }
        if let Some(parent) = parent {
            entity.insert(ChildOf(parent));
        }
        entity.id()
    }

    #[test]
    fn select_follows_document_index_not_spawn_order() {
        let mut world = World::new();
        let late = spawn(&mut world, 2, None, "p", Some("late"), &["note"]);
        let early = spawn(&mut world, 0, None, "p", Some("early"), &["note"]);
        let middle = spawn(&mut world, 1, None, "div", None, &[]);

        let selected = world.select(&Selector::parse(".note").unwrap());
        assert_eq!(selected, vec![early, late]);

        let everything = world.select(&Selector::parse("*").unwrap());
        assert_eq!(everything, vec![early, middle, late]);
    }

    #[test]
    fn select_walks_child_of_links() {
        let mut world = World::new();
        let tip = spawn(&mut world, 0, None, "span", Some("tip"), &[]);
        let popup = spawn(&mut world, 1, Some(tip), "div", None, &["popup"]);
        let stray = spawn(&mut world, 2, None, "div", None, &["popup"]);

        let selected = world.select(&Selector::scoped_class("tip", "popup"));
        assert_eq!(selected, vec![popup]);
        assert!(!selected.contains(&stray));
        assert_eq!(world.element_id(tip), Some("tip"));
        assert_eq!(world.element_id(popup), None);
        assert_eq!(world.parent_element(popup), Some(tip));
        assert_eq!(world.parent_element(tip), None);
    }

    #[test]
    fn set_display_updates_and_inserts() {
        let mut world = World::new();
        let element = spawn(&mut world, 0, None, "div", None, &[]);
        let bare = world.spawn_empty().id();

        assert!(is_shown(&world, element));
        world.set_display(element, DisplayState::Hidden);
        assert!(!is_shown(&world, element));

        world.set_display(bare, DisplayState::Hidden);
        assert_eq!(world.get::<DisplayState>(bare), Some(&DisplayState::Hidden));

        let gone = world.spawn_empty().id();
        world.despawn(gone);
        world.set_display(gone, DisplayState::Hidden);
    }

    #[test]
    fn handlers_run_for_their_own_transition_only() {
        let mut world = World::new();
        let element = spawn(&mut world, 0, None, "span", Some("tip"), &[]);
        let other = spawn(&mut world, 1, None, "span", Some("other"), &[]);

        let entered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&entered);
        world.on_pointer(element, PointerTransition::Enter, move |world, target| {
            assert_eq!(world.element_id(target), Some("tip"));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatch_pointer(&mut world, element, PointerTransition::Leave);
        dispatch_pointer(&mut world, other, PointerTransition::Enter);
        assert_eq!(entered.load(Ordering::SeqCst), 0);

        dispatch_pointer(&mut world, element, PointerTransition::Enter);
        dispatch_pointer(&mut world, element, PointerTransition::Enter);
        assert_eq!(entered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observing_a_missing_element_is_a_no_op() {
        let mut world = World::new();
        let gone = world.spawn_empty().id();
        world.despawn(gone);

        world.on_pointer(gone, PointerTransition::Enter, |_, _| {
            panic!("handler must never run");
        });
        assert!(world.get_entity(gone).is_err());
    }
}

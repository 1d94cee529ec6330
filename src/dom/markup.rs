use std::collections::HashSet;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    world::{ClassList, DocumentIndex, DocumentOrder, Element, ElementId, TextContent},
    DisplayState,
};

/// Declarative element tree, the page template side of the popup contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkupNode {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            hidden: false,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupIssue {
    EmptyTag { path: String },
    DuplicateId { id: String, path: String },
    WhitespaceInId { id: String, path: String },
    WhitespaceInClass { class: String, path: String },
}

impl std::fmt::Display for MarkupIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTag { path } => write!(f, "{path}: element has an empty tag"),
            Self::DuplicateId { id, path } => write!(f, "{path}: id `{id}` is already in use"),
            Self::WhitespaceInId { id, path } => {
                write!(f, "{path}: id `{id}` contains whitespace")
            }
            Self::WhitespaceInClass { class, path } => {
                write!(f, "{path}: class `{class}` contains whitespace")
            }
        }
    }
}

pub fn validate_markup(nodes: &[MarkupNode]) -> Vec<MarkupIssue> {
    let mut issues = Vec::new();
    let mut ids = HashSet::new();

    for (index, node) in nodes.iter().enumerate() {
        validate_node(node, format!("[{index}]"), &mut ids, &mut issues);
    }

    issues
}

fn validate_node(
    node: &MarkupNode,
    path: String,
    ids: &mut HashSet<String>,
    issues: &mut Vec<MarkupIssue>,
) {
    if node.tag.trim().is_empty() {
        issues.push(MarkupIssue::EmptyTag { path: path.clone() });
    }

    if let Some(id) = &node.id {
        if id.chars().any(char::is_whitespace) {
            issues.push(MarkupIssue::WhitespaceInId {
                id: id.clone(),
                path: path.clone(),
            });
        }
        if !ids.insert(id.clone()) {
            issues.push(MarkupIssue::DuplicateId {
                id: id.clone(),
                path: path.clone(),
            });
        }
    }

    for class in &node.classes {
        if class.chars().any(char::is_whitespace) {
            issues.push(MarkupIssue::WhitespaceInClass {
                class: class.clone(),
                path: path.clone(),
            });
        }
    }

    for (index, child) in node.children.iter().enumerate() {
        validate_node(child, format!("{path}.children[{index}]"), ids, issues);
    }
}

/// Spawns `nodes` as root elements and returns their entities. Issues from
/// [`validate_markup`] are logged; the markup spawns regardless.
pub fn spawn_markup(world: &mut World, nodes: &[MarkupNode]) -> Vec<Entity> {
    for issue in validate_markup(nodes) {
        warn!("markup issue: {issue}");
    }

    nodes
        .iter()
        .map(|node| spawn_node(world, node, None))
        .collect()
}

fn spawn_node(world: &mut World, node: &MarkupNode, parent: Option<Entity>) -> Entity {
    let index = {
        let mut order = world.get_resource_or_insert_with(DocumentOrder::default);
        let index = order.next;
        order.next += 1;
        index
    };

    let display = if node.hidden {
        DisplayState::Hidden
    } else {
        DisplayState::Shown
    };

    let mut entity = world.spawn((
        Element::new(node.tag.clone()),
        DocumentIndex(index),
        node.classes.iter().cloned().collect::<ClassList>(),
        display,
    ));
    if let Some(id) = &node.id {
        entity.insert(ElementId(id.clone()));
    }
    if let Some(text) = &node.text {
        entity.insert(TextContent(text.clone()));
    }
    if let Some(parent) = parent {
        entity.insert(ChildOf(parent));
    }
    let entity = entity.id();

    for child in &node.children {
        spawn_node(world, child, Some(entity));
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{world::is_shown, Document, Selector};

    fn tooltip(id: &str) -> MarkupNode {
        MarkupNode::new("span")
            .with_id(id)
            .with_text("hover me")
            .with_child(MarkupNode::new("div").with_class("popup").hidden().with_text("details"))
    }

    #[test]
    fn parses_sparse_json() {
        let nodes: Vec<MarkupNode> = serde_json::from_str(
            r#"[{ "tag": "span", "id": "tip", "children": [{ "tag": "div", "classes": ["popup"], "hidden": true }] }]"#,
        )
        .expect("markup should parse");

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id.as_deref(), Some("tip"));
        assert!(nodes[0].classes.is_empty());
        assert!(nodes[0].children[0].hidden);
    }

    #[test]
    fn spawns_in_pre_order_with_hierarchy() {
        let mut world = World::new();
        let roots = spawn_markup(&mut world, &[tooltip("first"), tooltip("second")]);
        assert_eq!(roots.len(), 2);

        let all = world.select(&Selector::parse("*").unwrap());
        let indices: Vec<u32> = all
            .iter()
            .map(|entity| world.get::<DocumentIndex>(*entity).unwrap().0)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(all[0], roots[0]);
        assert_eq!(all[2], roots[1]);

        let popup = all[1];
        assert_eq!(world.get::<ChildOf>(popup).map(|child_of| child_of.parent()), Some(roots[0]));
        assert!(!is_shown(&world, popup));
        assert!(is_shown(&world, roots[0]));
        assert_eq!(
            world.get::<TextContent>(popup),
            Some(&TextContent("details".to_string()))
        );
    }

    #[test]
    fn later_spawns_continue_document_order() {
        let mut world = World::new();
        spawn_markup(&mut world, &[tooltip("first")]);
        let later = spawn_markup(&mut world, &[MarkupNode::new("p")]);

        assert_eq!(world.get::<DocumentIndex>(later[0]), Some(&DocumentIndex(2)));
    }

    #[test]
    fn validation_reports_duplicates_and_whitespace() {
        let nodes = vec![
            tooltip("tip"),
            MarkupNode::new("")
                .with_id("tip")
                .with_child(MarkupNode::new("div").with_class("pop up")),
        ];

        let issues = validate_markup(&nodes);

        assert_eq!(
            issues,
            vec![
                MarkupIssue::EmptyTag {
                    path: "[1]".to_string()
                },
                MarkupIssue::DuplicateId {
                    id: "tip".to_string(),
                    path: "[1]".to_string()
                },
                MarkupIssue::WhitespaceInClass {
                    class: "pop up".to_string(),
                    path: "[1].children[0]".to_string()
                },
            ]
        );
    }

    #[test]
    fn duplicate_ids_still_spawn() {
        let mut world = World::new();
        let roots = spawn_markup(&mut world, &[tooltip("tip"), tooltip("tip")]);

        assert_eq!(roots.len(), 2);
        assert_eq!(world.select(&Selector::parse("#tip").unwrap()), roots);
    }
}

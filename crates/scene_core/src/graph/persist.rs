//! Node serialization
//!
//! A node is written as
//!
//! ```text
//! { "Node": {
//!     "name": "…",
//!     "active": true,
//!     "components": { "ComponentMesh": [ { "ComponentMesh": { … } } ] },
//!     "children": [ { "Node": { … } } ]
//! } }
//! ```
//!
//! Loading runs in three steps: the structure is rebuilt synchronously,
//! resource references are resolved through the
//! [`ResourceProvider`], and finally `NodeDeserialized` is broadcast to the
//! new subtree. Failing to rebuild a child subtree drops that subtree and is
//! recorded in the [`LoadReport`]; failing to rebuild the root node is fatal.

use serde_json::Value;

use super::{Graph, GraphError};
use crate::components::Component;
use crate::events::{Event, EventType};
use crate::foundation::collections::{ComponentId, NodeId};
use crate::resources::ResourceProvider;
use crate::serialize::{
    put, split_envelope, wrap, DeserializeContext, FieldError, ResourceRequest, Serialization, SerializeError,
    Serializer,
};

/// Type key of a serialized node
pub const NODE_TYPE: &str = "Node";

/// Non-fatal problems met while loading a node tree
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Field-level problems, the affected fields kept their defaults
    pub field_errors: Vec<FieldError>,
    /// Child subtrees or components that could not be rebuilt and were left out
    pub subtree_errors: Vec<SerializeError>,
}

impl LoadReport {
    /// True when everything in the document was loaded
    pub fn is_clean(&self) -> bool {
        self.field_errors.is_empty() && self.subtree_errors.is_empty()
    }
}

/// Result of [`Serializer::deserialize_node`]
#[derive(Debug)]
pub struct GraphLoad {
    /// Root of the rebuilt subtree, detached
    pub root: NodeId,
    /// What could not be loaded
    pub report: LoadReport,
}

struct Build<'g> {
    graph: &'g mut Graph,
    pending: Vec<(ComponentId, ResourceRequest)>,
    report: LoadReport,
}

impl Serializer<'_> {
    /// Serialize `node` with its components and descendants
    ///
    /// `NodeSerialized` is broadcast to the subtree once the document is
    /// complete.
    pub fn serialize_node(&self, graph: &mut Graph, node: NodeId) -> Result<Serialization, GraphError> {
        let mut document = Serialization::new();
        document.insert(NODE_TYPE.to_owned(), Value::Object(node_section(graph, node)?));
        graph.broadcast_event(&Event::new(EventType::NodeSerialized, node))?;
        Ok(document)
    }

    /// Rebuild a node tree written by [`serialize_node`](Self::serialize_node)
    ///
    /// The new root is left detached; append it where it belongs.
    pub async fn deserialize_node(
        &self,
        graph: &mut Graph,
        document: &Serialization,
        resources: &dyn ResourceProvider,
    ) -> Result<GraphLoad, SerializeError> {
        let (type_name, section) = split_envelope(document, "")?;
        if type_name != NODE_TYPE {
            return Err(SerializeError::UnexpectedType {
                expected: NODE_TYPE.to_owned(),
                found: type_name.to_owned(),
            });
        }

        let mut ctx = DeserializeContext::new(self.registry());
        let mut build = Build {
            graph,
            pending: Vec::new(),
            report: LoadReport::default(),
        };
        let root = ctx.scoped(NODE_TYPE, |ctx| build_node(&mut build, section, ctx))?;
        let Build {
            graph,
            pending,
            mut report,
        } = build;
        report.field_errors = ctx.into_errors();

        for (component, request) in pending {
            let outcome = match resources.get_resource(&request.id).await {
                Ok(resource) => match graph.component_mut(component) {
                    Some(component) => component.link_resource(&request.field, resource),
                    // dropped together with a failed subtree
                    None => continue,
                },
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                log::warn!("Could not attach resource {}: {err}", request.id);
                report.field_errors.push(FieldError::Unresolved {
                    path: request.path,
                    field: request.field,
                    id: request.id,
                    reason: err.to_string(),
                });
            }
        }

        graph.broadcast_event(&Event::new(EventType::NodeDeserialized, root))?;
        log::debug!(
            "Loaded {} ({} field errors, {} dropped subtrees)",
            graph.name(root).unwrap_or_default(),
            report.field_errors.len(),
            report.subtree_errors.len()
        );
        Ok(GraphLoad { root, report })
    }
}

fn node_section(graph: &Graph, node: NodeId) -> Result<Serialization, GraphError> {
    let data = graph.data(node)?;
    let mut section = Serialization::new();
    put(&mut section, "name", &data.name().to_owned());
    put(&mut section, "active", &data.is_active());

    let mut components = Serialization::new();
    for (type_name, ids) in data.component_types() {
        let entries = ids
            .iter()
            .filter_map(|&id| graph.component(id))
            .map(|component| Value::Object(wrap(component)))
            .collect();
        components.insert(type_name.to_owned(), Value::Array(entries));
    }
    section.insert("components".to_owned(), Value::Object(components));

    let mut children = Vec::with_capacity(data.children().len());
    for &child in data.children() {
        let mut wrapped = Serialization::new();
        wrapped.insert(NODE_TYPE.to_owned(), Value::Object(node_section(graph, child)?));
        children.push(Value::Object(wrapped));
    }
    section.insert("children".to_owned(), Value::Array(children));
    Ok(section)
}

fn build_node(
    build: &mut Build<'_>,
    section: &Serialization,
    ctx: &mut DeserializeContext<'_>,
) -> Result<NodeId, SerializeError> {
    let mut name = NODE_TYPE.to_owned();
    ctx.required(section, "name", &mut name);
    let mut active = true;
    ctx.optional(section, "active", &mut active);

    let node = build.graph.create_node(name);
    build.graph.data_mut(node)?.active = active;

    if let Err(err) = build_contents(build, node, section, ctx) {
        build.graph.destroy_node(node)?;
        return Err(err);
    }
    Ok(node)
}

fn build_contents(
    build: &mut Build<'_>,
    node: NodeId,
    section: &Serialization,
    ctx: &mut DeserializeContext<'_>,
) -> Result<(), SerializeError> {
    match section.get("components") {
        None => {}
        Some(Value::Object(by_type)) => {
            for (type_name, entries) in by_type {
                let Value::Array(entries) = entries else {
                    ctx.invalid(type_name, "expected an array of components");
                    continue;
                };
                for (index, entry) in entries.iter().enumerate() {
                    let component = ctx.scoped(format!("components/{type_name}[{index}]"), |ctx| {
                        ctx.construct::<dyn Component>(entry)
                    })?;
                    let requests = ctx.take_requests();
                    match build.graph.add_component(node, component) {
                        Ok(id) => build.pending.extend(requests.into_iter().map(|request| (id, request))),
                        Err(refused) => {
                            log::warn!("Dropped component while loading: {refused}");
                            build.report.subtree_errors.push(refused.error.into());
                        }
                    }
                }
            }
        }
        Some(_) => ctx.invalid("components", "expected an object"),
    }

    match section.get("children") {
        None => {}
        Some(Value::Array(children)) => {
            for (index, child) in children.iter().enumerate() {
                let built = ctx.scoped(format!("children[{index}]"), |ctx| build_child(build, child, ctx));
                match built {
                    Ok(child) => build.graph.add_child(node, child)?,
                    Err(err) => {
                        log::warn!("Dropped child subtree: {err}");
                        build.report.subtree_errors.push(err);
                    }
                }
            }
        }
        Some(_) => ctx.invalid("children", "expected an array"),
    }
    Ok(())
}

fn build_child(
    build: &mut Build<'_>,
    child: &Value,
    ctx: &mut DeserializeContext<'_>,
) -> Result<NodeId, SerializeError> {
    let Value::Object(envelope) = child else {
        return Err(SerializeError::MalformedEnvelope {
            path: ctx.path(),
            found: 0,
        });
    };
    let (type_name, section) = split_envelope(envelope, &ctx.path())?;
    if type_name != NODE_TYPE {
        return Err(SerializeError::UnexpectedType {
            expected: NODE_TYPE.to_owned(),
            found: type_name.to_owned(),
        });
    }
    ctx.scoped(NODE_TYPE, |ctx| build_node(build, section, ctx))
}

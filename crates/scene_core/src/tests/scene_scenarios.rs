//! End-to-end scenarios: singleton attach, scene round trip, re-parenting

use std::cell::RefCell;
use std::rc::Rc;

use crate::prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    type EventLog = Rc<RefCell<Vec<(EventType, NodeId, NodeId)>>>;

    fn record(graph: &mut Graph, node: NodeId, event_type: EventType, log: &EventLog) {
        let log = Rc::clone(log);
        graph
            .add_event_listener(node, event_type, move |_: &mut Graph, event: &Event| {
                log.borrow_mut()
                    .push((event.event_type, event.target, event.current_target));
                false
            })
            .unwrap();
    }

    #[test]
    fn test_singleton_component_on_nested_node() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        graph.add_child(root, a).unwrap();
        graph.add_child(a, b).unwrap();

        let first = graph.add(a, ComponentTransform::default()).unwrap();
        let second = graph.add(a, ComponentTransform::from_translation(Vec3::new(5.0, 0.0, 0.0)));

        assert!(matches!(
            second,
            Err(AttachError {
                error: GraphError::SingletonViolation { .. },
                ..
            })
        ));
        assert_eq!(graph.component_ids_of::<ComponentTransform>(a), [first]);
        assert_eq!(
            graph.component_of::<ComponentTransform>(a).unwrap().local,
            Transform::identity()
        );
    }

    #[test]
    fn test_cube_scene_round_trip() {
        let registry = RegistryBuilder::with_builtins().build();
        let library = ResourceLibrary::new(&registry);
        let cube_mesh = library.register(Box::new(MeshCube::named("MeshCube")));
        let serializer = Serializer::new(&registry);

        let mut graph = Graph::new();
        let cube = graph.create_node("Cube");
        graph
            .add(cube, ComponentTransform::from_translation(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        graph
            .add(cube, ComponentMesh::new(Rc::clone(&cube_mesh)).unwrap())
            .unwrap();

        let document = serializer.serialize_node(&mut graph, cube).unwrap();
        let node = &document["Node"];
        assert_eq!(node["name"], "Cube");
        assert!(node["components"]["ComponentTransform"][0]["ComponentTransform"].is_object());
        assert_eq!(
            node["components"]["ComponentMesh"][0]["ComponentMesh"]["idResource"],
            json!(cube_mesh.id_resource())
        );

        let text = serializer.stringify(&document).unwrap();
        let parsed = serializer.parse(&text).unwrap();
        let mut restored = Graph::new();
        let load = pollster::block_on(serializer.deserialize_node(&mut restored, &parsed, &library)).unwrap();

        assert!(load.report.is_clean());
        assert_eq!(restored.name(load.root), Some("Cube"));
        let transform = restored.component_of::<ComponentTransform>(load.root).unwrap();
        assert_eq!(transform.local.translation, Vec3::new(1.0, 2.0, 3.0));
        let mesh = restored.component_of::<ComponentMesh>(load.root).unwrap();
        assert_eq!(mesh.mesh_ref().id(), Some(cube_mesh.id_resource()));
        assert!(mesh.mesh().is_some());
        assert_eq!(serializer.serialize_node(&mut restored, load.root).unwrap(), document);
    }

    #[test]
    fn test_lazily_stored_resources_resolve_on_load() {
        let registry = RegistryBuilder::with_builtins().build();
        let source = ResourceLibrary::new(&registry);
        let sphere = source.register(Box::new(MeshSphere::new("ball", 12, 6)));
        let stored = source.serialize_all();

        let library = ResourceLibrary::new(&registry);
        assert_eq!(library.load_serializations(&stored).unwrap(), 1);
        let document = json!({
            "Node": {
                "name": "ball",
                "components": {
                    "ComponentMesh": [ { "ComponentMesh": { "idResource": sphere.id_resource() } } ]
                }
            }
        });
        let Value::Object(document) = document else {
            unreachable!()
        };

        let mut graph = Graph::new();
        let load = pollster::block_on(Serializer::new(&registry).deserialize_node(&mut graph, &document, &library))
            .unwrap();

        assert!(load.report.is_clean(), "{:?}", load.report);
        let mesh = graph.component_of::<ComponentMesh>(load.root).unwrap().mesh().unwrap();
        assert_eq!(mesh.vertex_count(), sphere.as_mesh().unwrap().vertex_count());
        assert!(library.contains(sphere.id_resource()));
    }

    #[test]
    fn test_reparenting_fires_one_remove_then_one_append() {
        let mut graph = Graph::new();
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        let c = graph.create_node("C");
        graph.add_child(a, c).unwrap();

        let log = EventLog::default();
        for node in [a, b, c] {
            record(&mut graph, node, EventType::ChildRemove, &log);
            record(&mut graph, node, EventType::ChildAppend, &log);
        }

        graph.add_child(b, c).unwrap();

        assert!(!graph.children(a).contains(&c));
        assert_eq!(graph.children(b), [c]);
        assert_eq!(graph.parent(c), Some(b));
        assert_eq!(
            *log.borrow(),
            [(EventType::ChildRemove, c, c), (EventType::ChildAppend, c, c)]
        );
    }

    #[test]
    fn test_audio_graph_events_follow_listened_subtree() {
        let mut graph = Graph::new();
        let world = graph.create_node("world");
        let speaker = graph.create_node("speaker");
        let log = EventLog::default();
        record(&mut graph, speaker, EventType::AudioChildAppend, &log);
        record(&mut graph, speaker, EventType::AudioChildRemove, &log);

        graph.add_child(world, speaker).unwrap();
        assert!(log.borrow().is_empty());
        graph.remove_child(world, speaker).unwrap();

        graph.set_audio_listened(Some(world));
        graph.add_child(world, speaker).unwrap();
        graph.remove_child(world, speaker).unwrap();

        let types: Vec<EventType> = log.borrow().iter().map(|(event_type, _, _)| *event_type).collect();
        assert_eq!(types, [EventType::AudioChildAppend, EventType::AudioChildRemove]);
    }

    #[test]
    fn test_replace_child_notifies_audio_graph() {
        let mut graph = Graph::new();
        let world = graph.create_node("world");
        let old = graph.create_node("old");
        let speaker = graph.create_node("speaker");
        graph.add_child(world, old).unwrap();
        graph.set_audio_listened(Some(world));
        let log = EventLog::default();
        for node in [old, speaker] {
            record(&mut graph, node, EventType::AudioChildAppend, &log);
            record(&mut graph, node, EventType::AudioChildRemove, &log);
        }

        graph.replace_child(world, old, speaker).unwrap();

        assert_eq!(
            *log.borrow(),
            [
                (EventType::AudioChildRemove, old, old),
                (EventType::AudioChildAppend, speaker, speaker),
            ]
        );
    }

    #[test]
    fn test_audio_graph_events_can_be_disabled() {
        let config = EventConfig {
            audio_graph_events: false,
            ..EventConfig::default()
        };
        let mut graph = Graph::with_config(config);
        let world = graph.create_node("world");
        let speaker = graph.create_node("speaker");
        graph.set_audio_listened(Some(world));
        let log = EventLog::default();
        record(&mut graph, speaker, EventType::AudioChildAppend, &log);

        graph.add_child(world, speaker).unwrap();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_editor_light_type_switch_through_graph() {
        let mut graph = Graph::new();
        let lamp = graph.create_node("lamp");
        let id = graph.add(lamp, ComponentLight::default()).unwrap();
        let ui = graph.component(id).unwrap().mutator_for_user_interface();
        assert!(ui.mutator("typeLight").is_some());

        let report = graph
            .mutate_component(id, &Mutator::new().with("typeLight", "LightSpot"), None)
            .unwrap();

        assert!(report.is_clean());
        let light = graph.component_as::<ComponentLight>(id).unwrap();
        assert_eq!(light.light().type_name(), "LightSpot");
    }
}

//! Cross-module tests of the scene graph, serializer and event system

mod scene_scenarios;

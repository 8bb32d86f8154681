//! Observed mutation of nodes and components

use std::rc::Rc;

use super::{Graph, GraphError};
use crate::events::{Event, EventDetail, EventType};
use crate::foundation::collections::{ComponentId, NodeId};
use crate::mutate::{FieldApplyError, MutateReport, Mutable, Mutator, MutatorValue};

impl Graph {
    /// Apply `mutator` to a component
    ///
    /// When at least one key applied, a `Mutate` event carrying the mutator
    /// is dispatched from the owning node and bubbles. A change of the
    /// `active` flag also fires the matching activation event.
    pub fn mutate_component(
        &mut self,
        id: ComponentId,
        mutator: &Mutator,
        selection: Option<&[&str]>,
    ) -> Result<MutateReport, GraphError> {
        let component = self.components.get_mut(id).ok_or(GraphError::UnknownComponent(id))?;
        let was_active = component.is_active();
        let report = component.mutate(mutator, selection);
        let now_active = component.is_active();
        let owner = component.node();

        if let (true, Some(node)) = (report.changed(), owner) {
            if was_active != now_active {
                let event_type = if now_active {
                    EventType::ComponentActivate
                } else {
                    EventType::ComponentDeactivate
                };
                self.fire_component_event(id, event_type);
            }
            let event = Event::new(EventType::Mutate, node).with_detail(EventDetail::Mutator {
                component: Some(id),
                mutator: Rc::new(mutator.clone()),
            });
            self.dispatch_event(&event, true)?;
        }
        Ok(report)
    }

    /// Name and active flag of a node
    pub fn node_mutator(&self, node: NodeId) -> Result<Mutator, GraphError> {
        Ok(self.data(node)?.mutator())
    }

    /// Apply `mutator` to the node's own attributes
    pub fn mutate_node(
        &mut self,
        node: NodeId,
        mutator: &Mutator,
        selection: Option<&[&str]>,
    ) -> Result<MutateReport, GraphError> {
        let data = self.data_mut(node)?;
        let was_active = data.active;
        let report = data.mutate(mutator, selection);
        let now_active = data.active;

        if report.changed() {
            if was_active != now_active {
                self.fire_activation(node, now_active)?;
            }
            let event = Event::new(EventType::Mutate, node).with_detail(EventDetail::Mutator {
                component: None,
                mutator: Rc::new(mutator.clone()),
            });
            self.dispatch_event(&event, true)?;
        }
        Ok(report)
    }

    /// Apply an animation mutator to a node and its descendants
    ///
    /// The mutator is shaped like
    /// `{ components: { Type: [m0, m1, …] }, children: [{ Node: { name, … } }] }`:
    /// component mutators are matched to the node's components of that type
    /// by position and may be wrapped as `{ Type: m }`; child mutators are
    /// matched by name and applied recursively to every child of that name.
    /// Other keys are ignored.
    pub fn apply_animation(&mut self, node: NodeId, mutator: &Mutator) -> Result<MutateReport, GraphError> {
        self.data(node)?;
        let mut report = MutateReport::default();

        for (key, value) in mutator {
            match key.as_str() {
                "components" => self.animate_components(node, value, &mut report)?,
                "children" => self.animate_children(node, value, &mut report)?,
                _ => report.ignored.push(key.clone()),
            }
        }
        Ok(report)
    }

    fn animate_components(
        &mut self,
        node: NodeId,
        value: &MutatorValue,
        report: &mut MutateReport,
    ) -> Result<(), GraphError> {
        let Some(by_type) = value.as_mutator() else {
            report.errors.push(FieldApplyError::mismatch("components", "mutator", value));
            return Ok(());
        };
        for (type_name, entries) in by_type {
            let Some(entries) = entries.as_array() else {
                report.errors.push(FieldApplyError::mismatch(type_name, "array", entries));
                continue;
            };
            let ids = self.components_by_type(node, type_name).to_vec();
            for (index, entry) in entries.iter().enumerate() {
                let location = format!("components/{type_name}/{index}");
                let Some(id) = ids.get(index).copied() else {
                    report.ignored.push(location);
                    continue;
                };
                let Some(entry) = entry.as_mutator() else {
                    report.errors.push(FieldApplyError::mismatch(&location, "mutator", entry));
                    continue;
                };
                let inner = match entry.mutator(type_name) {
                    Some(inner) if entry.len() == 1 => inner,
                    _ => entry,
                };
                let applied = self.mutate_component(id, inner, None)?;
                report.absorb(&location, applied);
            }
        }
        Ok(())
    }

    fn animate_children(
        &mut self,
        node: NodeId,
        value: &MutatorValue,
        report: &mut MutateReport,
    ) -> Result<(), GraphError> {
        let Some(entries) = value.as_array() else {
            report.errors.push(FieldApplyError::mismatch("children", "array", value));
            return Ok(());
        };
        for entry in entries {
            let Some(entry) = entry.as_mutator() else {
                report.errors.push(FieldApplyError::mismatch("children", "mutator", entry));
                continue;
            };
            let inner = entry.mutator("Node").unwrap_or(entry);
            let Some(name) = inner.string("name") else {
                report.errors.push(FieldApplyError::invalid("children", "child mutator without a name"));
                continue;
            };
            for child in self.children_by_name(node, name) {
                let applied = self.apply_animation(child, inner)?;
                report.absorb(&format!("children/{name}"), applied);
            }
        }
        Ok(())
    }
}

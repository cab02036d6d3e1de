use log::debug;
use std::collections::HashSet;

use crate::data::{BuildingRecord, LatLng};
use crate::registry::{PolyId, Registry, ShapeStyle};
use crate::store::{CategoryState, StateStore, VisibilityState};

/// Which polygons are currently on the map. Hidden categories are removed
/// outright, so their shapes stop intercepting clicks.
#[derive(Default)]
pub struct LayerSet {
    on_map: HashSet<PolyId>,
}

impl LayerSet {
    pub fn add(&mut self, id: PolyId) {
        self.on_map.insert(id);
    }

    pub fn remove(&mut self, id: PolyId) {
        self.on_map.remove(&id);
    }

    pub fn contains(&self, id: PolyId) -> bool {
        self.on_map.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.on_map.len()
    }
}

/// Toggle message emitted by the legend panel.
#[derive(Clone, Debug, PartialEq)]
pub enum LegendIntent {
    Toggle(String),
    SetAll(bool),
}

/// Notification the UI repaints from after an intent was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct StateChange {
    pub tag: String,
    pub visible: bool,
}

/// Detail-presentation collaborator, fed when a visible building is clicked.
pub trait DetailSink {
    fn present(&mut self, building: &BuildingRecord, center: LatLng);
}

/// Single source of truth for "is category C shown". Keeps the persisted
/// state, each group's flag and the map layer membership in step.
pub struct VisibilityController {
    registry: Registry,
    layers: LayerSet,
    store: Box<dyn StateStore>,
}

impl VisibilityController {
    /// Puts every polygon on the map, default visible, without persisting.
    /// Call `restore_from_store` afterwards to reapply the previous session.
    pub fn new(registry: Registry, store: Box<dyn StateStore>) -> Self {
        let mut controller = Self {
            registry,
            layers: LayerSet::default(),
            store,
        };
        for tag in controller.tags() {
            controller.apply_visibility(&tag, true);
        }
        controller
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    fn tags(&self) -> Vec<String> {
        self.registry.groups().iter().map(|g| g.tag.clone()).collect()
    }

    /// In-memory and on-map part of a toggle. Returns false for unknown tags.
    fn apply_visibility(&mut self, tag: &str, visible: bool) -> bool {
        let Some(ids) = self.registry.group(tag).map(|g| g.polygons.clone()) else {
            debug!("ignoring toggle for unknown tag {tag}");
            return false;
        };

        for id in ids {
            if visible {
                self.layers.add(id);
                let poly = self.registry.polygon_mut(id);
                poly.style = ShapeStyle::SHOWN;
                poly.interactive = true;
            } else {
                self.layers.remove(id);
                self.registry.polygon_mut(id).interactive = false;
            }
        }
        if let Some(group) = self.registry.group_mut(tag) {
            group.visible = visible;
        }
        true
    }

    /// Shows or hides one category and commits the full state durably.
    pub fn set_visible(&mut self, tag: &str, visible: bool) {
        if self.apply_visibility(tag, visible) {
            self.persist();
        }
    }

    /// Shows or hides every category, with a single persist at the end.
    pub fn set_all_visible(&mut self, visible: bool) {
        for tag in self.tags() {
            self.apply_visibility(&tag, visible);
        }
        self.persist();
    }

    /// Reapplies whatever visibility survived from the previous session.
    /// Saved tags the current data no longer has are ignored; current tags
    /// missing from the saved state stay at their default. Idempotent.
    pub fn restore_from_store(&mut self) {
        let Some(saved) = self.store.load() else {
            return;
        };
        for (tag, state) in &saved {
            self.set_visible(tag, state.visible);
        }
    }

    /// Translates a legend intent into toggles and reports what changed.
    pub fn apply(&mut self, intent: LegendIntent) -> Vec<StateChange> {
        match intent {
            LegendIntent::Toggle(tag) => match self.registry.group(&tag).map(|g| !g.visible) {
                Some(visible) => {
                    self.set_visible(&tag, visible);
                    vec![StateChange { tag, visible }]
                }
                None => Vec::new(),
            },
            LegendIntent::SetAll(visible) => {
                self.set_all_visible(visible);
                self.registry
                    .groups()
                    .iter()
                    .map(|g| StateChange {
                        tag: g.tag.clone(),
                        visible,
                    })
                    .collect()
            }
        }
    }

    /// Routes a map click to the detail collaborator. Only polygons that are
    /// on the map, interactive and in a visible category get through; the
    /// owning tag is the authoritative key, never the rendered style.
    pub fn click(&self, pos: LatLng, sink: &mut dyn DetailSink) {
        let Some(id) = self.registry.polygon_at(pos) else {
            return;
        };
        if !self.layers.contains(id) {
            return;
        }
        let poly = self.registry.polygon(id);
        if !poly.interactive {
            return;
        }
        match self.registry.group(&poly.tag) {
            Some(group) if group.visible => {
                sink.present(&poly.record, self.registry.center(id));
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> VisibilityState {
        self.registry
            .groups()
            .iter()
            .map(|g| {
                (
                    g.tag.clone(),
                    CategoryState {
                        visible: g.visible,
                        name: g.name.clone(),
                    },
                )
            })
            .collect()
    }

    fn persist(&self) {
        self.store.save(&self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// In-memory store that counts persists.
    #[derive(Clone, Default)]
    struct MemoryStore(Rc<MemoryInner>);

    #[derive(Default)]
    struct MemoryInner {
        state: RefCell<Option<VisibilityState>>,
        saves: Cell<usize>,
    }

    impl MemoryStore {
        fn seed(state: VisibilityState) -> Self {
            let store = Self::default();
            *store.0.state.borrow_mut() = Some(state);
            store
        }

        fn saves(&self) -> usize {
            self.0.saves.get()
        }

        fn saved(&self) -> Option<VisibilityState> {
            self.0.state.borrow().clone()
        }
    }

    impl StateStore for MemoryStore {
        fn save(&self, state: &VisibilityState) {
            *self.0.state.borrow_mut() = Some(state.clone());
            self.0.saves.set(self.0.saves.get() + 1);
        }

        fn load(&self) -> Option<VisibilityState> {
            self.0.state.borrow().clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        presented: Vec<(String, LatLng)>,
    }

    impl DetailSink for RecordingSink {
        fn present(&mut self, building: &BuildingRecord, center: LatLng) {
            self.presented.push((building.name.clone(), center));
        }
    }

    fn sample_registry() -> Registry {
        Registry::from_records(
            serde_json::from_value(json!([
                {
                    "name": "Hall A",
                    "coords": [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [2.0, 1.0]],
                    "color": "blue",
                },
                {
                    "name": "Hall B",
                    "coords": [[3.0, 3.0], [3.0, 4.0], [4.0, 4.0], [4.0, 3.0]],
                    "color": "blue",
                },
                {
                    "name": "Field",
                    "coords": [[10.0, 10.0], [10.0, 12.0], [12.0, 12.0], [12.0, 10.0]],
                    "color": "green",
                },
            ]))
            .unwrap(),
        )
    }

    fn controller_with(store: MemoryStore) -> VisibilityController {
        VisibilityController::new(sample_registry(), Box::new(store))
    }

    fn group_ids(controller: &VisibilityController, tag: &str) -> Vec<PolyId> {
        controller.registry().group(tag).unwrap().polygons.clone()
    }

    #[test]
    fn toggling_a_tag_moves_its_polygons_on_and_off_the_map() {
        let mut controller = controller_with(MemoryStore::default());
        let blue = group_ids(&controller, "blue");
        let green = group_ids(&controller, "green");

        controller.set_visible("blue", false);
        assert!(blue.iter().all(|id| !controller.layers().contains(*id)));
        assert!(green.iter().all(|id| controller.layers().contains(*id)));
        assert!(!controller.registry().group("blue").unwrap().visible);

        controller.set_visible("blue", true);
        assert!(blue.iter().all(|id| controller.layers().contains(*id)));
        for id in blue {
            let poly = controller.registry().polygon(id);
            assert_eq!(poly.style, ShapeStyle::SHOWN);
            assert!(poly.interactive);
        }
    }

    #[test]
    fn every_toggle_is_persisted_immediately() {
        let store = MemoryStore::default();
        let mut controller = controller_with(store.clone());
        assert_eq!(store.saves(), 0);

        controller.set_visible("blue", false);
        assert_eq!(store.saves(), 1);
        let saved = store.saved().unwrap();
        assert!(!saved["blue"].visible);
        assert!(saved["green"].visible);
        assert_eq!(saved["blue"].name, "Academic");
    }

    #[test]
    fn set_all_persists_exactly_once_per_call() {
        let store = MemoryStore::default();
        let mut controller = controller_with(store.clone());

        controller.set_all_visible(false);
        controller.set_all_visible(true);

        assert_eq!(store.saves(), 2);
        assert!(controller.registry().groups().iter().all(|g| g.visible));
        assert_eq!(
            controller.layers().len(),
            controller.registry().polygons().len()
        );
    }

    #[test]
    fn unknown_tags_are_a_silent_no_op() {
        let store = MemoryStore::default();
        let mut controller = controller_with(store.clone());

        controller.set_visible("chartreuse", false);
        assert_eq!(store.saves(), 0);
        assert!(controller.apply(LegendIntent::Toggle("chartreuse".into())).is_empty());
    }

    #[test]
    fn restore_applies_saved_flags_and_is_idempotent() {
        let mut seed = VisibilityState::new();
        seed.insert(
            "blue".to_string(),
            CategoryState {
                visible: false,
                name: "Academic".to_string(),
            },
        );
        // a tag no current building carries
        seed.insert(
            "pink".to_string(),
            CategoryState {
                visible: false,
                name: "Retired".to_string(),
            },
        );
        let store = MemoryStore::seed(seed);
        let mut controller = controller_with(store);

        controller.restore_from_store();
        let flags: Vec<bool> = controller.registry().groups().iter().map(|g| g.visible).collect();
        assert_eq!(flags, [false, true]);
        assert!(controller.registry().group("pink").is_none());

        controller.restore_from_store();
        let again: Vec<bool> = controller.registry().groups().iter().map(|g| g.visible).collect();
        assert_eq!(flags, again);
    }

    #[test]
    fn restore_with_empty_store_keeps_defaults() {
        let mut controller = controller_with(MemoryStore::default());
        controller.restore_from_store();
        assert!(controller.registry().groups().iter().all(|g| g.visible));
    }

    #[test]
    fn intents_toggle_and_report_changes() {
        let mut controller = controller_with(MemoryStore::default());

        let changes = controller.apply(LegendIntent::Toggle("green".into()));
        assert_eq!(
            changes,
            [StateChange {
                tag: "green".into(),
                visible: false
            }]
        );

        let changes = controller.apply(LegendIntent::SetAll(true));
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.visible));
    }

    #[test]
    fn clicks_on_hidden_buildings_never_reach_the_detail_sink() {
        let mut controller = controller_with(MemoryStore::default());
        let inside_hall_a = LatLng { lat: 1.5, lng: 1.5 };

        controller.set_visible("blue", false);
        let mut sink = RecordingSink::default();
        controller.click(inside_hall_a, &mut sink);
        assert!(sink.presented.is_empty());

        controller.set_visible("blue", true);
        controller.click(inside_hall_a, &mut sink);
        assert_eq!(sink.presented.len(), 1);
        assert_eq!(sink.presented[0].0, "Hall A");
        assert_eq!(sink.presented[0].1, LatLng { lat: 1.5, lng: 1.5 });
    }

    #[test]
    fn toggles_still_apply_when_persistence_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "plain file").unwrap();

        // the store cannot write, the session keeps working regardless
        let store = crate::store::LegendStore::new(&blocker);
        let mut controller = VisibilityController::new(sample_registry(), Box::new(store));
        controller.set_visible("blue", false);
        assert!(!controller.registry().group("blue").unwrap().visible);
        let blue = group_ids(&controller, "blue");
        assert!(blue.iter().all(|id| !controller.layers().contains(*id)));
    }

    #[test]
    fn clicks_outside_every_polygon_do_nothing() {
        let controller = controller_with(MemoryStore::default());
        let mut sink = RecordingSink::default();
        controller.click(LatLng { lat: 50.0, lng: 50.0 }, &mut sink);
        assert!(sink.presented.is_empty());
    }
}

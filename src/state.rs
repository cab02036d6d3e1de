use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use log::debug;
use ratatui::layout::Rect;

use crate::controller::{DetailSink, LegendIntent, VisibilityController};
use crate::data::{BuildingRecord, LatLng};
use crate::map_draw::MapView;
use crate::registry::Registry;
use crate::store::LegendStore;

/// Popup contents for the building the user last clicked.
pub struct DetailView {
    pub name: String,
    pub info: String,
    pub image_note: String,
    pub center: LatLng,
}

impl DetailSink for Option<DetailView> {
    fn present(&mut self, building: &BuildingRecord, center: LatLng) {
        *self = Some(DetailView {
            name: building.name.clone(),
            info: building
                .info
                .clone()
                .unwrap_or_else(|| "No description available".to_string()),
            image_note: match &building.image_url {
                Some(url) if !url.trim().is_empty() => format!("Image: {url}"),
                _ => "No image available".to_string(),
            },
            center,
        });
    }
}

pub struct AppState {
    pub controller: VisibilityController,
    pub prefs: LegendStore,
    pub map: Option<MapView>,
    pub selected: usize,
    pub detail: Option<DetailView>,
    pub dark_mode: bool,
    pub map_area: Option<Rect>,
    pub status: String,
}

impl AppState {
    const HELP_TEXT: &'static str = "\
↑/↓: select category
Enter/Space: toggle it
a: show all   x: hide all
d: dark mode
click a building for details
Esc: close popup   q: quit";

    pub fn new(records: Vec<BuildingRecord>, store: LegendStore, status: String) -> Self {
        let registry = Registry::from_records(records);
        let dark_mode = store.dark_mode();
        let prefs = store.clone();

        let mut controller = VisibilityController::new(registry, Box::new(store));
        controller.restore_from_store();
        let map = MapView::new(controller.registry());

        Self {
            controller,
            prefs,
            map,
            selected: 0,
            detail: None,
            dark_mode,
            map_area: None,
            status,
        }
    }

    pub fn help_text(&self) -> &'static str {
        Self::HELP_TEXT
    }

    pub fn selected_tag(&self) -> Option<String> {
        self.controller
            .registry()
            .groups()
            .get(self.selected)
            .map(|g| g.tag.clone())
    }

    /// Returns true when the app should quit.
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        let group_count = self.controller.registry().groups().len();
        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected + 1 < group_count {
                    self.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(tag) = self.selected_tag() {
                    self.apply_intent(LegendIntent::Toggle(tag));
                }
            }
            KeyCode::Char('a') => self.apply_intent(LegendIntent::SetAll(true)),
            KeyCode::Char('x') => self.apply_intent(LegendIntent::SetAll(false)),
            KeyCode::Char('d') => {
                self.dark_mode = !self.dark_mode;
                self.prefs.set_dark_mode(self.dark_mode);
            }
            KeyCode::Esc => self.detail = None,
            _ => {}
        }
        false
    }

    fn apply_intent(&mut self, intent: LegendIntent) {
        for change in self.controller.apply(intent) {
            let shown = if change.visible { "shown" } else { "hidden" };
            debug!("legend: {} {shown}", change.tag);
        }
    }

    /// Left-clicks inside the map frame open the clicked building's details.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        let (Some(view), Some(area)) = (&self.map, self.map_area) else {
            return;
        };
        if let Some(pos) = view.hit_position(mouse.column, mouse.row, area) {
            let mut detail = self.detail.take();
            self.controller.click(pos, &mut detail);
            self.detail = detail;
        }
    }
}

use geo::{BoundingRect, Contains, LineString, Point, Polygon};
use log::debug;

use crate::data::{BuildingRecord, LatLng, descriptor};

/// Opaque handle to one renderable building shape. Each handle is owned by
/// exactly one category group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolyId(usize);

/// Leaflet-style shape styling. Hidden categories are taken off the map
/// instead of being faded out, so only the shown variants matter here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeStyle {
    pub opacity: f64,
    pub fill_opacity: f64,
    pub weight: u16,
}

impl ShapeStyle {
    /// Muted style a polygon carries until the controller first styles it.
    pub const DEFAULT: Self = Self {
        opacity: 1.0,
        fill_opacity: 0.4,
        weight: 2,
    };
    /// Opaque style for polygons of a visible category.
    pub const SHOWN: Self = Self {
        opacity: 1.0,
        fill_opacity: 0.6,
        weight: 3,
    };
}

pub struct BuildingPolygon {
    pub id: PolyId,
    pub record: BuildingRecord,
    pub ring: Vec<LatLng>,
    pub shape: Polygon<f64>,
    pub tag: String,
    pub interactive: bool,
    pub style: ShapeStyle,
}

pub struct CategoryGroup {
    pub tag: String,
    pub name: String,
    pub icon: &'static str,
    pub polygons: Vec<PolyId>,
    pub visible: bool,
}

/// All building polygons grouped by category tag, in first-seen order.
pub struct Registry {
    polygons: Vec<BuildingPolygon>,
    groups: Vec<CategoryGroup>,
}

impl Registry {
    /// Builds polygon handles and their category groups from fetched rows.
    /// Rows without a usable outline are skipped one by one.
    pub fn from_records(records: Vec<BuildingRecord>) -> Self {
        let mut registry = Self {
            polygons: Vec::new(),
            groups: Vec::new(),
        };

        for record in records {
            let Some(ring) = record.outline() else {
                debug!("skipping '{}': no usable outline", record.name);
                continue;
            };

            // x is longitude, y is latitude
            let exterior: Vec<(f64, f64)> = ring.iter().map(|p| (p.lng, p.lat)).collect();
            let shape = Polygon::new(LineString::from(exterior), vec![]);

            let tag = record.tag().to_string();
            let id = PolyId(registry.polygons.len());

            let group = match registry.groups.iter().position(|g| g.tag == tag) {
                Some(index) => index,
                None => {
                    let desc = descriptor(&tag, record.category.as_deref());
                    registry.groups.push(CategoryGroup {
                        tag: tag.clone(),
                        name: desc.name,
                        icon: desc.icon,
                        polygons: Vec::new(),
                        visible: true,
                    });
                    registry.groups.len() - 1
                }
            };
            registry.groups[group].polygons.push(id);

            registry.polygons.push(BuildingPolygon {
                id,
                record,
                ring,
                shape,
                tag,
                interactive: true,
                style: ShapeStyle::DEFAULT,
            });
        }

        registry
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn group(&self, tag: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.tag == tag)
    }

    pub(crate) fn group_mut(&mut self, tag: &str) -> Option<&mut CategoryGroup> {
        self.groups.iter_mut().find(|g| g.tag == tag)
    }

    pub fn polygons(&self) -> &[BuildingPolygon] {
        &self.polygons
    }

    pub fn polygon(&self, id: PolyId) -> &BuildingPolygon {
        &self.polygons[id.0]
    }

    pub(crate) fn polygon_mut(&mut self, id: PolyId) -> &mut BuildingPolygon {
        &mut self.polygons[id.0]
    }

    /// First polygon whose shape contains the position.
    pub fn polygon_at(&self, pos: LatLng) -> Option<PolyId> {
        let point = Point::new(pos.lng, pos.lat);
        self.polygons
            .iter()
            .find(|p| p.shape.contains(&point))
            .map(|p| p.id)
    }

    /// Bounding-rect center of one polygon, for the detail popup.
    pub fn center(&self, id: PolyId) -> LatLng {
        match self.polygons[id.0].shape.bounding_rect() {
            Some(rect) => {
                let c = rect.center();
                LatLng { lat: c.y, lng: c.x }
            }
            None => LatLng { lat: 0.0, lng: 0.0 },
        }
    }

    /// Coordinate bounds across every polygon, for the map canvas.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        if self.polygons.is_empty() {
            return None;
        }
        let (mut minx, mut miny, mut maxx, mut maxy) = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for poly in &self.polygons {
            for coord in &poly.shape.exterior().0 {
                minx = minx.min(coord.x);
                miny = miny.min(coord.y);
                maxx = maxx.max(coord.x);
                maxy = maxy.max(coord.y);
            }
        }
        Some(([minx, maxx], [miny, maxy]))
    }
}

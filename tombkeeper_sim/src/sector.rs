// Fine-grid sector lookup for movement reconciliation.
//
// Boxes are coarse; movement needs the per-sector answer to "what is under
// this point": which box owns the sector, its floor and ceiling heights, and
// which room it belongs to. `SectorQuery` is the seam the AI core reads that
// through, so a real level loader can answer from its own floor data.
//
// `SectorGrid` is the in-crate implementation: a dense 2D grid of one
// `Sector` per 1024×1024 cell, indexed by `sx + sz * size_x`. Out-of-bounds
// lookups return a sector with no box, which movement treats as a wall.
// Rooms stacked over the same column are out of scope for the grid; the
// `y` and `room` hints are accepted for implementations that need them.
//
// The grid is level geometry, not game state: `SimState` holds it as a
// `#[serde(skip)]` field and takes it back in `rebuild_transient_state()`.
//
// See also: `nav.rs` for the box graph the grid is painted from,
// `movement.rs` for the probes that read it.

use crate::nav::BoxGraph;
use crate::types::{BoxId, RoomId, SECTOR_SIZE};
use serde::{Deserialize, Serialize};

/// What lies at one sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// The box owning this sector, or `None` for solid wall / outside.
    pub box_id: Option<BoxId>,
    pub floor: i32,
    pub ceiling: i32,
    pub room: RoomId,
}

impl Sector {
    /// A sector no creature may enter.
    pub const fn wall(room: RoomId) -> Self {
        Self {
            box_id: None,
            floor: 0,
            ceiling: 0,
            room,
        }
    }
}

/// Per-position floor data, supplied by the level.
pub trait SectorQuery {
    /// The sector containing world point `(x, y, z)`. `room` is the caller's
    /// current room, a hint for implementations with overlapping rooms.
    fn sector_at(&self, x: i32, y: i32, z: i32, room: RoomId) -> Sector;
}

/// Dense sector grid anchored at the world origin.
#[derive(Clone, Debug, Default)]
pub struct SectorGrid {
    /// Flat storage: index = sx + sz * size_x.
    cells: Vec<Sector>,
    pub size_x: u32,
    pub size_z: u32,
}

impl SectorGrid {
    /// A grid of `size_x × size_z` wall sectors.
    pub fn new(size_x: u32, size_z: u32) -> Self {
        Self {
            cells: vec![Sector::wall(RoomId::default()); (size_x as usize) * (size_z as usize)],
            size_x,
            size_z,
        }
    }

    /// Build a grid just large enough for `graph`, painting every box with
    /// its own floor and the given ceiling, all in one room.
    pub fn from_graph(graph: &BoxGraph, ceiling: i32, room: RoomId) -> Self {
        let (mut max_sx, mut max_sz) = (0, 0);
        for b in graph.boxes() {
            max_sx = max_sx.max(sectors_spanned(b.x_max));
            max_sz = max_sz.max(sectors_spanned(b.z_max));
        }
        let mut grid = Self::new(max_sx.max(0) as u32, max_sz.max(0) as u32);
        for i in 0..graph.box_count() {
            grid.paint_box(graph, BoxId(i as u16), ceiling, room);
        }
        grid
    }

    /// Assign every sector under `id`'s footprint to that box.
    pub fn paint_box(&mut self, graph: &BoxGraph, id: BoxId, ceiling: i32, room: RoomId) {
        let b = graph.nav_box(id);
        let floor = b.floor;
        for sz in b.z_min.div_euclid(SECTOR_SIZE)..sectors_spanned(b.z_max) {
            for sx in b.x_min.div_euclid(SECTOR_SIZE)..sectors_spanned(b.x_max) {
                self.set(
                    sx,
                    sz,
                    Sector {
                        box_id: Some(id),
                        floor,
                        ceiling,
                        room,
                    },
                );
            }
        }
    }

    fn index(&self, sx: i32, sz: i32) -> Option<usize> {
        if sx < 0 || sz < 0 || sx as u32 >= self.size_x || sz as u32 >= self.size_z {
            return None;
        }
        Some(sx as usize + sz as usize * self.size_x as usize)
    }

    /// Read a sector by grid coordinates. Out of bounds reads as wall.
    pub fn get(&self, sx: i32, sz: i32) -> Sector {
        self.index(sx, sz)
            .map(|i| self.cells[i])
            .unwrap_or(Sector::wall(RoomId::default()))
    }

    /// Overwrite a sector. No-op out of bounds.
    pub fn set(&mut self, sx: i32, sz: i32, sector: Sector) {
        if let Some(i) = self.index(sx, sz) {
            self.cells[i] = sector;
        }
    }
}

/// Number of sectors needed to reach an exclusive max bound.
fn sectors_spanned(max: i32) -> i32 {
    (max + SECTOR_SIZE - 1).div_euclid(SECTOR_SIZE)
}

impl SectorQuery for SectorGrid {
    fn sector_at(&self, x: i32, _y: i32, z: i32, _room: RoomId) -> Sector {
        self.get(x.div_euclid(SECTOR_SIZE), z.div_euclid(SECTOR_SIZE))
    }
}

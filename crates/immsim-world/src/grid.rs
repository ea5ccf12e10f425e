//! 2D grid for the world.

use crate::agent::Agent;
use immsim_core::{AgentId, AgentKind, Error, Position, Result};
use serde::{Deserialize, Serialize};

/// One grid location with an independent occupancy slot per population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub position: Position,
    macrophage: Option<AgentId>,
    bacterium: Option<AgentId>,
}

impl Cell {
    fn new(position: Position) -> Self {
        Self {
            position,
            macrophage: None,
            bacterium: None,
        }
    }

    pub fn occupant(&self, kind: AgentKind) -> Option<AgentId> {
        match kind {
            AgentKind::Macrophage => self.macrophage,
            AgentKind::Bacterium => self.bacterium,
        }
    }

    pub fn has(&self, kind: AgentKind) -> bool {
        self.occupant(kind).is_some()
    }

    pub fn is_occupied(&self) -> bool {
        self.macrophage.is_some() || self.bacterium.is_some()
    }

    /// An agent may enter a cell whose slot for its own kind is free.
    /// This admits empty cells and cells holding only the opposite kind.
    pub fn is_enterable_by(&self, kind: AgentKind) -> bool {
        !self.has(kind)
    }

    fn slot_mut(&mut self, kind: AgentKind) -> &mut Option<AgentId> {
        match kind {
            AgentKind::Macrophage => &mut self.macrophage,
            AgentKind::Bacterium => &mut self.bacterium,
        }
    }
}

/// A square toroidal grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub size: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: i32) -> Self {
        let cells = (0..size * size)
            .map(|i| Cell::new(Position::new(i / size, i % size)))
            .collect();
        Self { size, cells }
    }

    /// Get cell at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> &Cell {
        let index = self.pos_to_index(pos.wrap(self.size));
        &self.cells[index]
    }

    fn get_mut(&mut self, pos: Position) -> &mut Cell {
        let index = self.pos_to_index(pos.wrap(self.size));
        &mut self.cells[index]
    }

    /// The eight surrounding cells, wrapped. Row-major order, self excluded.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        let mut neighbors = Vec::with_capacity(8);

        for drow in -1..=1 {
            for dcol in -1..=1 {
                if drow == 0 && dcol == 0 {
                    continue;
                }
                neighbors.push(pos.add(drow, dcol).wrap(self.size));
            }
        }

        neighbors
    }

    /// Neighbors an agent of `kind` standing at `pos` is allowed to enter
    pub fn candidate_moves(&self, kind: AgentKind, pos: Position) -> Vec<Position> {
        self.neighbors(pos)
            .into_iter()
            .filter(|&p| self.get(p).is_enterable_by(kind))
            .collect()
    }

    /// Put `agent` into the slot for its kind at `pos` and record the position on the agent.
    ///
    /// The slot must be free; callers vacate the source cell first.
    pub fn place(&mut self, agent: &mut Agent, pos: Position) -> Result<()> {
        let pos = pos.wrap(self.size);
        let kind = agent.kind;
        let slot = self.get_mut(pos).slot_mut(kind);

        if let Some(occupant) = *slot {
            return Err(Error::OccupancyViolation {
                row: pos.row,
                col: pos.col,
                kind,
                occupant,
            });
        }

        *slot = Some(agent.id);
        agent.set_position(pos);
        Ok(())
    }

    /// Clear the slot for `kind` at `pos`, returning whoever was there
    pub fn vacate(&mut self, pos: Position, kind: AgentKind) -> Option<AgentId> {
        self.get_mut(pos).slot_mut(kind).take()
    }

    /// ASCII map: `.` empty, `M` macrophage, `b` bacterium, `X` both
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.size as usize);
        for row in self.cells.chunks(self.size as usize) {
            for cell in row {
                let glyph = match (cell.macrophage, cell.bacterium) {
                    (None, None) => '.',
                    (Some(_), None) => AgentKind::Macrophage.glyph(),
                    (None, Some(_)) => AgentKind::Bacterium.glyph(),
                    (Some(_), Some(_)) => 'X',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.row * self.size + pos.col) as usize
    }

    /// Iterator over all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10);
        assert_eq!(grid.size, 10);
        assert_eq!(grid.cells.len(), 100);
        assert_eq!(grid.get(Position::new(3, 7)).position, Position::new(3, 7));
        assert!(grid.iter().all(|cell| !cell.is_occupied()));
    }

    #[test]
    fn test_toroidal_wrapping() {
        let grid = Grid::new(10);
        assert_eq!(grid.get(Position::new(-1, -1)).position, Position::new(9, 9));
        assert_eq!(grid.get(Position::new(10, 10)).position, Position::new(0, 0));
    }

    #[test]
    fn test_neighbors() {
        let grid = Grid::new(10);
        let neighbors = grid.neighbors(Position::new(5, 5));

        assert_eq!(neighbors.len(), 8);
        assert!(!neighbors.contains(&Position::new(5, 5)));
    }

    #[test]
    fn test_neighbors_wrap_corner() {
        let grid = Grid::new(4);
        let neighbors = grid.neighbors(Position::new(0, 0));

        assert_eq!(neighbors.len(), 8);
        assert!(neighbors.contains(&Position::new(3, 3)));
        assert!(neighbors.contains(&Position::new(0, 3)));
        assert!(neighbors.contains(&Position::new(3, 0)));
        assert!(neighbors.contains(&Position::new(1, 1)));
    }

    #[test]
    fn test_place_and_vacate() {
        let mut grid = Grid::new(3);
        let mut macrophage = Agent::new(AgentId(1), AgentKind::Macrophage);
        let mut bacterium = Agent::new(AgentId(2), AgentKind::Bacterium);

        grid.place(&mut macrophage, Position::new(1, 1)).unwrap();
        grid.place(&mut bacterium, Position::new(1, 1)).unwrap();

        let cell = grid.get(Position::new(1, 1));
        assert_eq!(cell.occupant(AgentKind::Macrophage), Some(AgentId(1)));
        assert_eq!(cell.occupant(AgentKind::Bacterium), Some(AgentId(2)));
        assert_eq!(macrophage.position().unwrap(), Position::new(1, 1));

        assert_eq!(grid.vacate(Position::new(1, 1), AgentKind::Bacterium), Some(AgentId(2)));
        assert!(!grid.get(Position::new(1, 1)).has(AgentKind::Bacterium));
        assert!(grid.get(Position::new(1, 1)).has(AgentKind::Macrophage));
    }

    #[test]
    fn test_place_same_kind_is_violation() {
        let mut grid = Grid::new(3);
        let mut first = Agent::new(AgentId(1), AgentKind::Bacterium);
        let mut second = Agent::new(AgentId(2), AgentKind::Bacterium);

        grid.place(&mut first, Position::new(0, 0)).unwrap();
        let err = grid.place(&mut second, Position::new(0, 0)).unwrap_err();

        assert!(matches!(
            err,
            Error::OccupancyViolation { occupant: AgentId(1), kind: AgentKind::Bacterium, .. }
        ));
        assert!(second.position().is_err());
    }

    #[test]
    fn test_candidate_moves() {
        let mut grid = Grid::new(3);
        let mut macrophage = Agent::new(AgentId(1), AgentKind::Macrophage);
        let mut other = Agent::new(AgentId(2), AgentKind::Macrophage);
        let mut prey = Agent::new(AgentId(3), AgentKind::Bacterium);

        grid.place(&mut macrophage, Position::new(1, 1)).unwrap();
        grid.place(&mut other, Position::new(0, 0)).unwrap();
        grid.place(&mut prey, Position::new(0, 1)).unwrap();

        let for_macrophage = grid.candidate_moves(AgentKind::Macrophage, Position::new(1, 1));
        assert_eq!(for_macrophage.len(), 7);
        assert!(!for_macrophage.contains(&Position::new(0, 0)));
        assert!(for_macrophage.contains(&Position::new(0, 1)));

        // Prey may walk into the predator cells but not onto itself.
        let for_prey = grid.candidate_moves(AgentKind::Bacterium, Position::new(0, 1));
        assert_eq!(for_prey.len(), 8);
        assert!(for_prey.contains(&Position::new(0, 0)));
        assert!(for_prey.contains(&Position::new(1, 1)));
    }

    #[test]
    fn test_render() {
        let mut grid = Grid::new(2);
        let mut macrophage = Agent::new(AgentId(1), AgentKind::Macrophage);
        let mut prey = Agent::new(AgentId(2), AgentKind::Bacterium);
        let mut trapped = Agent::new(AgentId(3), AgentKind::Bacterium);

        grid.place(&mut macrophage, Position::new(0, 0)).unwrap();
        grid.place(&mut trapped, Position::new(0, 0)).unwrap();
        grid.place(&mut prey, Position::new(1, 1)).unwrap();

        assert_eq!(grid.render(), "X.\n.b\n");
    }
}

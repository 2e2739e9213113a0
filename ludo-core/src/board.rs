//! Board geometry: the shared track, home stretches, bases and safe cells

use crate::pieces::Color;
use serde::{Deserialize, Serialize};

/// Cells on the shared outer track
pub const TRACK_LEN: i8 = 52;

/// Position of a piece still sitting in its base
pub const BASE_POSITION: i8 = -1;

/// First cell of every color's private home stretch
pub const HOME_STRETCH_START: i8 = 52;

/// Last cell of the home stretch; landing here exactly finishes the piece
pub const HOME_STRETCH_END: i8 = 57;

/// Terminal marker for a finished piece
pub const FINISHED_POSITION: i8 = 58;

/// Most pieces of one color allowed on a single cell
pub const MAX_STACK: usize = 4;

/// Track cells where capture never happens
pub const SAFE_CELLS: [i8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

/// Grid cell `[row, col]` on the 15x15 board. Base slots use half cells.
pub type GridCoord = [f32; 2];

/// Track index -> grid cell
pub const TRACK_COORDS: [[u8; 2]; 52] = [
    [6, 1], [6, 2], [6, 3], [6, 4], [6, 5],
    [5, 6], [4, 6], [3, 6], [2, 6], [1, 6],
    [0, 6], [0, 7], [0, 8],
    [1, 8], [2, 8], [3, 8], [4, 8], [5, 8],
    [6, 9], [6, 10], [6, 11], [6, 12], [6, 13],
    [6, 14], [7, 14], [8, 14],
    [8, 13], [8, 12], [8, 11], [8, 10], [8, 9],
    [9, 8], [10, 8], [11, 8], [12, 8], [13, 8],
    [14, 8], [14, 7], [14, 6],
    [13, 6], [12, 6], [11, 6], [10, 6], [9, 6],
    [8, 5], [8, 4], [8, 3], [8, 2], [8, 1],
    [8, 0], [7, 0], [6, 0],
];

/// Home stretch cells 52..=57 per color, indexed by `Color::index()`
pub const HOME_STRETCH_COORDS: [[[u8; 2]; 6]; 4] = [
    [[7, 1], [7, 2], [7, 3], [7, 4], [7, 5], [7, 6]],
    [[1, 7], [2, 7], [3, 7], [4, 7], [5, 7], [6, 7]],
    [[7, 13], [7, 12], [7, 11], [7, 10], [7, 9], [7, 8]],
    [[13, 7], [12, 7], [11, 7], [10, 7], [9, 7], [8, 7]],
];

/// Base slots per color, one per piece index
pub const BASE_COORDS: [[GridCoord; 4]; 4] = [
    [[1.5, 1.5], [1.5, 3.5], [3.5, 1.5], [3.5, 3.5]],
    [[1.5, 10.5], [1.5, 12.5], [3.5, 10.5], [3.5, 12.5]],
    [[10.5, 10.5], [10.5, 12.5], [12.5, 10.5], [12.5, 12.5]],
    [[10.5, 1.5], [10.5, 3.5], [12.5, 1.5], [12.5, 3.5]],
];

/// Shared centre where finished pieces are drawn
pub const FINISH_COORD: GridCoord = [7.0, 7.0];

/// Where a color's pieces enter the track from base
pub fn start_cell(color: Color) -> i8 {
    color.index() as i8 * 13
}

/// The track cell after which a color turns into its home stretch
pub fn home_entry_predecessor(color: Color) -> i8 {
    (start_cell(color) + TRACK_LEN - 1) % TRACK_LEN
}

pub fn is_safe(position: i8) -> bool {
    SAFE_CELLS.contains(&position)
}

/// True for cells on the shared ring (the only contested cells)
pub fn is_track(position: i8) -> bool {
    (0..TRACK_LEN).contains(&position)
}

pub fn is_home_stretch(position: i8) -> bool {
    (HOME_STRETCH_START..=HOME_STRETCH_END).contains(&position)
}

/// The cell one step further along `color`'s path.
///
/// Inside the home stretch this just increments; on the track it wraps
/// modulo 52 except at the color's entry predecessor, where it turns into
/// the home stretch instead.
pub fn next_cell(color: Color, position: i8) -> i8 {
    if position >= HOME_STRETCH_START {
        position + 1
    } else if position == home_entry_predecessor(color) {
        HOME_STRETCH_START
    } else {
        (position + 1) % TRACK_LEN
    }
}

/// Grid coordinate for a piece of `color` (slot `piece_index`) at `position`
pub fn cell_coords(color: Color, piece_index: usize, position: i8) -> Option<GridCoord> {
    let to_grid = |[row, col]: [u8; 2]| [row as f32, col as f32];
    match position {
        BASE_POSITION => BASE_COORDS[color.index()].get(piece_index).copied(),
        FINISHED_POSITION => Some(FINISH_COORD),
        p if is_track(p) => Some(to_grid(TRACK_COORDS[p as usize])),
        p if is_home_stretch(p) => Some(to_grid(
            HOME_STRETCH_COORDS[color.index()][(p - HOME_STRETCH_START) as usize],
        )),
        _ => None,
    }
}

/// Full geometry table handed to renderers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardLayout {
    pub track: Vec<[u8; 2]>,
    pub home_stretch: Vec<(Color, Vec<[u8; 2]>)>,
    pub bases: Vec<(Color, Vec<GridCoord>)>,
    pub start_cells: Vec<(Color, i8)>,
    pub safe_cells: Vec<i8>,
    pub finish: GridCoord,
}

impl BoardLayout {
    pub fn standard() -> Self {
        Self {
            track: TRACK_COORDS.to_vec(),
            home_stretch: Color::ALL
                .iter()
                .map(|&c| (c, HOME_STRETCH_COORDS[c.index()].to_vec()))
                .collect(),
            bases: Color::ALL
                .iter()
                .map(|&c| (c, BASE_COORDS[c.index()].to_vec()))
                .collect(),
            start_cells: Color::ALL.iter().map(|&c| (c, start_cell(c))).collect(),
            safe_cells: SAFE_CELLS.to_vec(),
            finish: FINISH_COORD,
        }
    }
}

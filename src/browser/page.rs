//! One page layout: board geometry, placement reads, banners
//!
//! Everything that knows what the chess page's DOM looks like lives here,
//! behind small methods the reader and player share. The rest of the crate
//! only sees boards, squares and pixel coordinates.

use serde_json::Value;
use tracing::debug;

use crate::chess::board::{
    on_board, square_at, Board, Color, Square, BISHOP_ID, KING_ID, KNIGHT_ID, PAWN_ID, QUEEN_ID,
    ROOK_ID, W_KING, B_KING,
};
use crate::chess::Promotion;
use crate::error::{BotError, BotResult};

use super::webdriver::WebDriver;

const BOARD_SELECTOR: &str = "cg-board";
const STATUS_SELECTOR: &str = "#main-wrap .status, #main-wrap .result-wrap";

/// Reads the rendered pieces out of the board container. Returns null when
/// the board is not there yet; each piece carries its grid cell as seen on
/// screen (0,0 = top-left), still unoriented.
const PLACEMENT_SCRIPT: &str = r#"
const wrap = document.querySelector('.cg-wrap');
const board = document.querySelector('cg-board');
if (!wrap || !board) return null;
const rect = board.getBoundingClientRect();
if (rect.width < 8) return null;
const step = rect.width / 8;
const pieces = [];
for (const el of board.querySelectorAll('piece')) {
    const cls = el.getAttribute('class') || '';
    if (cls.indexOf('ghost') !== -1) continue;
    const m = new DOMMatrixReadOnly(window.getComputedStyle(el).transform);
    pieces.push({
        cls: cls,
        col: Math.round(m.m41 / step),
        row: Math.round(m.m42 / step)
    });
}
return {
    flipped: wrap.className.indexOf('orientation-black') !== -1,
    pieces: pieces
};
"#;

const STATUS_SCRIPT: &str = r#"
const el = document.querySelector(arguments[0]);
return el ? el.textContent : null;
"#;

/// Which color sits at the bottom of the rendered board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    White,
    Black,
}

impl Orientation {
    pub fn color(self) -> Color {
        match self {
            Orientation::White => Color::White,
            Orientation::Black => Color::Black,
        }
    }
}

/// Pixel frame of the rendered board, for translating squares to clicks.
#[derive(Debug, Clone, Copy)]
pub struct BoardGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub square_size: f64,
    pub orientation: Orientation,
}

impl BoardGeometry {
    /// Center of a square in page coordinates.
    pub fn square_center(&self, sq: Square) -> (f64, f64) {
        let (col, row) = grid_cell(sq, self.orientation);
        (
            self.origin_x + (col as f64 + 0.5) * self.square_size,
            self.origin_y + (row as f64 + 0.5) * self.square_size,
        )
    }
}

/// Screen grid cell (0,0 top-left) of a square under an orientation.
fn grid_cell(sq: Square, orientation: Orientation) -> (i8, i8) {
    let file = crate::chess::board::file_of(sq);
    let rank = crate::chess::board::rank_of(sq);
    match orientation {
        Orientation::White => (file, 7 - rank),
        Orientation::Black => (7 - file, rank),
    }
}

/// Inverse of `grid_cell`.
fn square_from_cell(col: i8, row: i8, orientation: Orientation) -> Option<Square> {
    if !on_board(col, row) {
        return None;
    }
    Some(match orientation {
        Orientation::White => square_at(col, 7 - row),
        Orientation::Black => square_at(7 - col, row),
    })
}

/// Handle on the single game page of the session.
pub struct GamePage {
    driver: WebDriver,
}

impl GamePage {
    /// Navigate the session to the game page.
    pub fn open(driver: WebDriver, url: &str) -> BotResult<Self> {
        driver.goto(url)?;
        Ok(GamePage { driver })
    }

    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    /// Which side the session plays, per the rendered board orientation.
    pub fn orientation(&self) -> BotResult<Orientation> {
        let value = self.driver.execute(
            "const w = document.querySelector('.cg-wrap'); return w ? w.className : null;",
            vec![],
        )?;
        match value.as_str() {
            Some(class) if class.contains("orientation-black") => Ok(Orientation::Black),
            Some(_) => Ok(Orientation::White),
            None => Err(BotError::Page("board container not present".into())),
        }
    }

    /// Pixel frame of the board element.
    pub fn geometry(&self) -> BotResult<BoardGeometry> {
        let element = self
            .driver
            .find(BOARD_SELECTOR)?
            .ok_or_else(|| BotError::Page("board element not present".into()))?;
        let rect = self.driver.rect(&element)?;
        Ok(BoardGeometry {
            origin_x: rect.x,
            origin_y: rect.y,
            square_size: rect.width / 8.0,
            orientation: self.orientation()?,
        })
    }

    /// Best-effort read of the rendered placement. `Ok(None)` means the
    /// render is unusable right now (missing board, mid-animation overlap,
    /// a piece between squares) and the caller should poll again.
    pub fn read_placement(&self) -> BotResult<Option<Board>> {
        let value = self.driver.execute(PLACEMENT_SCRIPT, vec![])?;
        if value.is_null() {
            return Ok(None);
        }
        let flipped = value
            .get("flipped")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let orientation = if flipped {
            Orientation::Black
        } else {
            Orientation::White
        };
        let pieces = match value.get("pieces").and_then(Value::as_array) {
            Some(pieces) => pieces,
            None => return Ok(None),
        };

        let mut board: Board = [0; 64];
        for piece in pieces {
            let cls = piece.get("cls").and_then(Value::as_str).unwrap_or("");
            let col = piece.get("col").and_then(Value::as_i64).unwrap_or(-1) as i8;
            let row = piece.get("row").and_then(Value::as_i64).unwrap_or(-1) as i8;
            let sq = match square_from_cell(col, row, orientation) {
                Some(sq) => sq,
                None => {
                    debug!("[PAGE] piece off-grid at ({col},{row}), treating read as partial");
                    return Ok(None);
                }
            };
            let id = match piece_id_from_class(cls) {
                Some(id) => id,
                None => continue,
            };
            if board[sq as usize] != 0 {
                // Two pieces on one square: capture animation in flight.
                return Ok(None);
            }
            board[sq as usize] = id;
        }

        // Both kings must be visible for the read to be meaningful.
        if !board.contains(&W_KING) || !board.contains(&B_KING) {
            return Ok(None);
        }
        Ok(Some(board))
    }

    /// Text of the game-status banner, if the page shows one.
    pub fn status_banner(&self) -> BotResult<Option<String>> {
        let value = self
            .driver
            .execute(STATUS_SCRIPT, vec![Value::String(STATUS_SELECTOR.into())])?;
        Ok(value.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    /// Click the promotion chooser entry for a piece. Returns false when
    /// the chooser is not on screen (yet).
    pub fn click_promotion(&self, promo: Promotion) -> BotResult<bool> {
        let role = match promo {
            Promotion::Queen => "queen",
            Promotion::Rook => "rook",
            Promotion::Bishop => "bishop",
            Promotion::Knight => "knight",
        };
        let selector = format!("#promotion-choice piece.{role}");
        match self.driver.find(&selector)? {
            Some(element) => {
                self.driver.click(&element)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Signed piece id from a chessground class list like "white knight".
fn piece_id_from_class(class: &str) -> Option<i8> {
    let sign = if class.contains("white") {
        1
    } else if class.contains("black") {
        -1
    } else {
        return None;
    };
    let id = if class.contains("pawn") {
        PAWN_ID
    } else if class.contains("knight") {
        KNIGHT_ID
    } else if class.contains("bishop") {
        BISHOP_ID
    } else if class.contains("rook") {
        ROOK_ID
    } else if class.contains("queen") {
        QUEEN_ID
    } else if class.contains("king") {
        KING_ID
    } else {
        return None;
    };
    Some(sign * id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::board::parse_square;

    #[test]
    fn test_square_centers_white_orientation() {
        let geometry = BoardGeometry {
            origin_x: 100.0,
            origin_y: 200.0,
            square_size: 80.0,
            orientation: Orientation::White,
        };
        // a1 sits bottom-left for white.
        let (x, y) = geometry.square_center(parse_square("a1").unwrap());
        assert_eq!((x, y), (140.0, 200.0 + 7.0 * 80.0 + 40.0));
        let (x, y) = geometry.square_center(parse_square("h8").unwrap());
        assert_eq!((x, y), (100.0 + 7.0 * 80.0 + 40.0, 240.0));
    }

    #[test]
    fn test_square_centers_black_orientation() {
        let geometry = BoardGeometry {
            origin_x: 0.0,
            origin_y: 0.0,
            square_size: 100.0,
            orientation: Orientation::Black,
        };
        // For black the h1 corner renders top-left.
        let (x, y) = geometry.square_center(parse_square("h1").unwrap());
        assert_eq!((x, y), (50.0, 50.0));
    }

    #[test]
    fn test_grid_cell_roundtrip() {
        for orientation in [Orientation::White, Orientation::Black] {
            for sq in 0..64 {
                let (col, row) = grid_cell(sq, orientation);
                assert_eq!(square_from_cell(col, row, orientation), Some(sq));
            }
        }
    }

    #[test]
    fn test_piece_id_from_class() {
        assert_eq!(piece_id_from_class("white knight"), Some(KNIGHT_ID));
        assert_eq!(piece_id_from_class("black queen"), Some(-QUEEN_ID));
        assert_eq!(piece_id_from_class("last-move highlight"), None);
    }
}

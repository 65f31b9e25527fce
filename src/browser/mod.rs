//! Everything that talks to the game page: the WebDriver transport, the
//! page layout, the board reader and the move player.

pub mod page;
pub mod player;
pub mod reader;
pub mod webdriver;

pub use page::{BoardGeometry, GamePage, Orientation};
pub use player::MovePlayer;
pub use reader::{parse_banner, resolve_opponent_move, BannerOutcome, BoardReader, PageObservation, Resolution};
pub use webdriver::WebDriver;

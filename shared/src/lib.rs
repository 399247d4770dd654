pub mod diamond;
pub mod game_match;
pub mod geometry;
pub mod path;
pub mod protocol;
pub mod room;

pub use diamond::{Diamond, DiamondId};
pub use game_match::{player_rect, Match};
pub use geometry::{
    distance, Dimension, DimensionFactor, Direction, GeometryError, Movement, Point, Rect,
};
pub use path::{Line, Path};
pub use protocol::{
    Envelope, JoinAccepted, MatchInit, MessageType, PlayerJoin, PlayerLeft, ProtocolError,
    ServerEvent, Update, NO_DIAMOND,
};
pub use room::{Barrier, Room, RoomUnits, Wall};

pub const CANVAS_WIDTH: i32 = 1280;
pub const CANVAS_HEIGHT: i32 = 720;
pub const HORIZONTAL_UNIT_WIDTH_PX: i32 = 64;
pub const HORIZONTAL_UNIT_HEIGHT_PX: i32 = 12;
pub const WALL_WIDTH_PX: i32 = HORIZONTAL_UNIT_HEIGHT_PX;
pub const PATH_WIDTH_PX: i32 = 36;
pub const DIAMOND_WIDTH_PX: i32 = 32;
pub const DIAMOND_HEIGHT_PX: i32 = 26;
pub const PLAYER_SIZE_PX: i32 = 32;
pub const DIAMOND_REWARD: u32 = 30;

use serde::{Deserialize, Serialize};

/// On-disk description of a whole level: every room with its entity stacks
/// and portals, the player start, and the plot's starting state. The format
/// keeps the grid jagged (rows may differ in length) and stacks ordered
/// bottom-first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LevelDoc {
    pub level_version: u32,
    #[serde(default)]
    pub name: String,
    pub rooms: Vec<RoomDoc>,
    pub player: PlayerDoc,
    #[serde(default)]
    pub plot: PlotDoc,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomDoc {
    pub name: String,
    #[serde(default)]
    pub geometry: Option<GeometryDoc>,
    /// `rows[y][x]` is the stack of entity slots at (x, y); `null` slots are
    /// empty.
    pub rows: Vec<Vec<Vec<Option<EntityDoc>>>>,
    #[serde(default)]
    pub portals: Vec<PortalDoc>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GeometryDoc {
    pub origin_x: i32,
    pub origin_y: i32,
    pub tile_width: u32,
    pub tile_height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityDoc {
    #[serde(default)]
    pub name: String,
    pub walkable: bool,
    #[serde(default)]
    pub facing: Option<(i32, i32)>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub action: Option<ActionDoc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalDoc {
    pub x: i32,
    pub y: i32,
    pub dest: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerDoc {
    #[serde(default = "default_player_name")]
    pub name: String,
    pub room: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub facing: Option<(i32, i32)>,
}

fn default_player_name() -> String {
    "@".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlotDoc {
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<TriggerDoc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerDoc {
    #[serde(default)]
    pub requires: Vec<String>,
    pub fire: ActionDoc,
    #[serde(default)]
    pub unlocks: Vec<TriggerDoc>,
}

/// Data form of the behavior tree, discriminated by `kind`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionDoc {
    Iter { actions: Vec<ActionDoc> },
    Loop { actions: Vec<ActionDoc> },
    Cycle { times: u32, actions: Vec<ActionDoc> },
    Sequence { actions: Vec<ActionDoc> },
    Reset { action: Box<ActionDoc> },
    UpdatePlot { flags: Vec<String> },
    Alert { text: String },
    Talk {
        text: String,
        #[serde(default)]
        sep: Option<String>,
    },
    Move { dx: i32, dy: i32 },
}

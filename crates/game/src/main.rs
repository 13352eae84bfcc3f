use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::rc::Rc;

use engine::{
    build_world, load_level_file, Entity, EntityId, MessageSink, RenderSink, RoomGeometry,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LEVEL_ENV_VAR: &str = "GRIDVALE_LEVEL";
const DEFAULT_LEVEL_RELPATH: &str = "assets/demo.level.json";
const MESSAGE_PREFIX: &str = "> ";
const HELP_TEXT: &str = "move: w/a/s/d   interact: e or space   redraw: l   quit: q";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    x: i32,
    y: i32,
    z: usize,
    glyph: char,
}

/// Render sink that keeps a character per entity and draws the attached room
/// as a grid, highest stack index winning each cell. Cells never notified
/// stay blank.
#[derive(Debug, Default)]
struct AsciiRenderer {
    attached: Option<String>,
    placements: HashMap<EntityId, (String, Placement)>,
}

impl AsciiRenderer {
    fn draw(&self) -> String {
        let Some(room) = self.attached.as_deref() else {
            return String::new();
        };
        let cells: Vec<&Placement> = self
            .placements
            .values()
            .filter(|(placed_room, _)| placed_room == room)
            .map(|(_, placement)| placement)
            .collect();
        let Some(width) = cells.iter().map(|placement| placement.x + 1).max() else {
            return String::new();
        };
        let Some(height) = cells.iter().map(|placement| placement.y + 1).max() else {
            return String::new();
        };
        if width <= 0 || height <= 0 {
            return String::new();
        }

        let mut canvas = vec![vec![(' ', 0usize); width as usize]; height as usize];
        for placement in cells {
            if placement.x < 0 || placement.y < 0 {
                continue;
            }
            let cell = &mut canvas[placement.y as usize][placement.x as usize];
            if cell.0 == ' ' || placement.z >= cell.1 {
                *cell = (placement.glyph, placement.z);
            }
        }

        let mut output = String::new();
        for row in canvas.iter().rev() {
            for (glyph, _) in row {
                output.push(*glyph);
            }
            output.push('\n');
        }
        output
    }
}

fn glyph_for(entity: &Entity) -> char {
    entity
        .name
        .chars()
        .next()
        .unwrap_or(if entity.walkable { '.' } else { '#' })
}

impl RenderSink for AsciiRenderer {
    fn attach(&mut self, room: &str) {
        self.attached = Some(room.to_string());
    }

    fn detach(&mut self, room: &str) {
        if self.attached.as_deref() == Some(room) {
            self.attached = None;
        }
    }

    fn notify_position(&mut self, room: &str, entity: &Entity, _geometry: RoomGeometry) {
        self.placements.insert(
            entity.id,
            (
                room.to_string(),
                Placement {
                    x: entity.tile_x,
                    y: entity.tile_y,
                    z: entity.tile_z,
                    glyph: glyph_for(entity),
                },
            ),
        );
    }
}

/// Handle that lets the world own the render sink while the input loop keeps
/// drawing from the same renderer.
#[derive(Clone)]
struct SharedRenderer(Rc<RefCell<AsciiRenderer>>);

impl RenderSink for SharedRenderer {
    fn attach(&mut self, room: &str) {
        self.0.borrow_mut().attach(room);
    }

    fn detach(&mut self, room: &str) {
        self.0.borrow_mut().detach(room);
    }

    fn notify_position(&mut self, room: &str, entity: &Entity, geometry: RoomGeometry) {
        self.0.borrow_mut().notify_position(room, entity, geometry);
    }
}

struct ConsoleMessages;

impl MessageSink for ConsoleMessages {
    fn write(&mut self, text: &str) {
        println!("{MESSAGE_PREFIX}{text}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step(i32, i32),
    Interact,
    Redraw,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    if line == " " {
        return Some(Command::Interact);
    }
    match line.trim() {
        "w" => Some(Command::Step(0, 1)),
        "s" => Some(Command::Step(0, -1)),
        "a" => Some(Command::Step(-1, 0)),
        "d" => Some(Command::Step(1, 0)),
        "e" => Some(Command::Interact),
        "l" | "look" => Some(Command::Redraw),
        "h" | "help" | "?" => Some(Command::Help),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

fn main() {
    init_tracing();
    info!("=== Gridvale Startup ===");
    if let Err(error) = run() {
        error!(error = %error, "startup_failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let level_path = resolve_level_path()?;
    info!(path = %level_path.display(), "loading_level");
    let doc = load_level_file(&level_path).map_err(|error| error.to_string())?;

    let renderer = Rc::new(RefCell::new(AsciiRenderer::default()));
    let mut world = build_world(
        doc,
        Box::new(SharedRenderer(Rc::clone(&renderer))),
        Box::new(ConsoleMessages),
    )
    .map_err(|error| error.to_string())?;

    println!("{HELP_TEXT}");
    print!("{}", renderer.borrow().draw());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|error| format!("read stdin: {error}"))?;
        let Some(command) = parse_command(&line) else {
            println!("{HELP_TEXT}");
            continue;
        };
        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP_TEXT}");
                continue;
            }
            Command::Redraw => {}
            Command::Interact => world.interact(),
            Command::Step(dx, dy) => {
                // A failed step is just a bump against something; an error
                // here means the level data lied about its portals.
                world
                    .step_player(dx, dy)
                    .map_err(|error| error.to_string())?;
            }
        }
        print!("{}", renderer.borrow().draw());
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Level file resolution, most explicit first: the env var, the first CLI
/// argument, then a walk up from the executable directory looking for the
/// bundled demo level.
fn resolve_level_path() -> Result<PathBuf, String> {
    if let Ok(value) = env::var(LEVEL_ENV_VAR) {
        let path = PathBuf::from(value);
        if path.is_file() {
            return Ok(path);
        }
        return Err(format!(
            "{LEVEL_ENV_VAR} points at '{}', which is not a file",
            path.display()
        ));
    }
    if let Some(arg) = env::args().nth(1) {
        let path = PathBuf::from(arg);
        if path.is_file() {
            return Ok(path);
        }
        return Err(format!("'{}' is not a file", path.display()));
    }

    let exe = env::current_exe().map_err(|error| format!("resolve current exe: {error}"))?;
    let exe_dir = exe
        .parent()
        .ok_or_else(|| format!("executable path '{}' has no parent", exe.display()))?;
    for candidate in exe_dir.ancestors() {
        let path = candidate.join(DEFAULT_LEVEL_RELPATH);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(format!(
        "could not find {DEFAULT_LEVEL_RELPATH} above '{}'; set {LEVEL_ENV_VAR} to a level file",
        exe_dir.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{parse_level_json, World};

    struct VecMessages {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl VecMessages {
        fn new() -> (Self, Rc<RefCell<Vec<String>>>) {
            let log = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    log: Rc::clone(&log),
                },
                log,
            )
        }
    }

    impl MessageSink for VecMessages {
        fn write(&mut self, text: &str) {
            self.log.borrow_mut().push(text.to_string());
        }
    }

    fn demo_world() -> (World, Rc<RefCell<AsciiRenderer>>, Rc<RefCell<Vec<String>>>) {
        let doc = parse_level_json(include_str!("../../../assets/demo.level.json"))
            .expect("demo level parses");
        let renderer = Rc::new(RefCell::new(AsciiRenderer::default()));
        let (messages, log) = VecMessages::new();
        let world = build_world(
            doc,
            Box::new(SharedRenderer(Rc::clone(&renderer))),
            Box::new(messages),
        )
        .expect("demo level builds");
        (world, renderer, log)
    }

    #[test]
    fn commands_map_to_engine_calls() {
        assert_eq!(parse_command("w"), Some(Command::Step(0, 1)));
        assert_eq!(parse_command("s"), Some(Command::Step(0, -1)));
        assert_eq!(parse_command("a"), Some(Command::Step(-1, 0)));
        assert_eq!(parse_command(" d "), Some(Command::Step(1, 0)));
        assert_eq!(parse_command("e"), Some(Command::Interact));
        assert_eq!(parse_command(" "), Some(Command::Interact));
        assert_eq!(parse_command("look"), Some(Command::Redraw));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
    }

    #[test]
    fn glyphs_fall_back_to_terrain_marks_for_unnamed_entities() {
        let (world, ..) = demo_world();
        let player = world.arena().get(world.player()).expect("player");
        assert_eq!(glyph_for(player), '@');
        let floor = world
            .arena()
            .iter()
            .find(|entity| entity.name.is_empty() && entity.walkable)
            .expect("a floor entity");
        assert_eq!(glyph_for(floor), '.');
    }

    #[test]
    fn renderer_draws_the_attached_room_top_row_first() {
        let (_world, renderer, _log) = demo_world();
        let drawn = renderer.borrow().draw();
        assert_eq!(drawn, ".M..\n@...\n....\n");
    }

    #[test]
    fn renderer_goes_blank_when_detached() {
        let mut renderer = AsciiRenderer::default();
        renderer.attach("hall");
        renderer.detach("hall");
        assert_eq!(renderer.draw(), "");
    }

    #[test]
    fn demo_level_plays_the_opening_beat() {
        let (mut world, renderer, log) = demo_world();
        assert_eq!(world.focus_name(), "cottage");

        // Walk up to Maple and talk twice; the second line trips the plot.
        world.step_player(1, 0).expect("step east");
        world.step_player(0, 1).expect("bump into Maple");
        world.interact();
        world.interact();
        assert_eq!(
            *log.borrow(),
            [
                "Maple: Oh! A visitor. It has been a long winter.",
                "Maple: The meadow east of here hides something. Take the door.",
                "Maple hums an old tune as you go.",
            ]
        );

        // Through the door into the meadow.
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("portal step");
        assert_eq!(world.focus_name(), "meadow");
        assert_eq!(
            world.arena().get(world.player()).expect("player").coords(),
            (0, 1, 1)
        );

        // The chest is two tiles east; opening it fires the unlocked trigger.
        log.borrow_mut().clear();
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("bump into chest");
        world.interact();
        assert_eq!(
            *log.borrow(),
            [
                "The chest creaks open. Inside lies a silver locket.",
                "The locket glows faintly.",
                "Maple will want to see this.",
            ]
        );

        world.interact();
        assert_eq!(
            log.borrow().last().map(String::as_str),
            Some("The chest is empty now.")
        );

        // The meadow view shows the chest and the cat.
        let drawn = renderer.borrow().draw();
        assert_eq!(drawn.lines().count(), 3);
        assert!(drawn.contains('c'));
        assert!(drawn.contains('S'));
    }

    #[test]
    fn petting_the_cat_makes_it_hop() {
        let (mut world, _renderer, _log) = demo_world();
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("portal step");
        assert_eq!(world.focus_name(), "meadow");

        // Stand under the cat at (2, 2) and poke it.
        world.step_player(1, 0).expect("step east");
        world.step_player(1, 0).expect("step east");
        let smoke = world
            .room("meadow")
            .expect("meadow")
            .unique("smoke")
            .expect("cat");
        assert_eq!(world.arena().get(smoke).expect("cat").coords(), (2, 2, 1));

        world.step_player(0, 1).expect("face north");
        world.interact();
        assert_eq!(world.arena().get(smoke).expect("cat").coords(), (3, 2, 1));
    }
}
